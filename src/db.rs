use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{self, Document, doc, oid::ObjectId};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{
    ClientOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument,
};
use mongodb::{Client, Collection, Database, IndexModel};
use rust_decimal::prelude::ToPrimitive;

use crate::config::Config;
use crate::models::{ProfileUpdate, RecurringPatch, RecurringPayment, Transaction, User};
use crate::store::{Store, StoreError};

const USERS: &str = "users";
const TRANSACTIONS: &str = "transactions";
const RECURRING: &str = "recurringpayments";

pub async fn connect_to_mongo(config: &Config) -> Result<Database> {
    tracing::info!(database = %config.database_name, "connecting to MongoDB");
    let client_options = ClientOptions::parse(&config.mongodb_uri).await?;
    let client = Client::with_options(client_options)?;

    let db = client.database(&config.database_name);

    // Test the connection
    db.run_command(doc! {"ping": 1}, None).await?;

    Ok(db)
}

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users().create_index(unique_email, None).await?;
        self.transactions()
            .create_index(IndexModel::builder().keys(doc! { "user": 1, "date": -1 }).build(), None)
            .await?;
        self.recurring()
            .create_index(IndexModel::builder().keys(doc! { "user": 1, "dueDate": 1 }).build(), None)
            .await?;
        Ok(())
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    fn transactions(&self) -> Collection<Transaction> {
        self.db.collection(TRANSACTIONS)
    }

    fn recurring(&self) -> Collection<RecurringPayment> {
        self.db.collection(RECURRING)
    }
}

const DUPLICATE_KEY: i32 = 11000;

/// `insert_one` reports a duplicate as a write error, `find_one_and_update`
/// as a command error.
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY,
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn map_write_error(err: mongodb::error::Error) -> StoreError {
    if is_duplicate_key(&err) {
        StoreError::DuplicateEmail
    } else {
        StoreError::Database(err)
    }
}

fn optional_text(value: &Option<String>) -> bson::Bson {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => bson::Bson::String(text.to_string()),
        _ => bson::Bson::Null,
    }
}

fn profile_set(update: &ProfileUpdate) -> Document {
    let mut set = Document::new();
    if let Some(name) = &update.name {
        set.insert("name", name.trim());
    }
    if let Some(email) = &update.email {
        set.insert("email", crate::models::user::normalize_email(email));
    }
    for (key, value) in [
        ("occupation", &update.occupation),
        ("location", &update.location),
        ("bio", &update.bio),
        ("photo", &update.photo),
    ] {
        if value.is_some() {
            set.insert(key, optional_text(value));
        }
    }
    if let Some(socials) = &update.socials {
        let socials: Vec<String> = socials
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        set.insert("socials", socials);
    }
    set.insert("updatedAt", bson::DateTime::from_chrono(Utc::now()));
    set
}

fn recurring_set(patch: &RecurringPatch) -> Document {
    let mut set = Document::new();
    if let Some(name) = &patch.name {
        set.insert("name", name.trim());
    }
    if let Some(amount) = patch.amount {
        set.insert("amount", amount.to_f64().unwrap_or_default());
    }
    if let Some(due_date) = patch.due_date {
        set.insert("dueDate", bson::DateTime::from_chrono(due_date));
    }
    if let Some(frequency) = patch.frequency {
        set.insert("frequency", frequency.as_str());
    }
    if let Some(kind) = patch.kind {
        set.insert("type", kind.as_str());
    }
    set.insert("updatedAt", bson::DateTime::from_chrono(Utc::now()));
    set
}

fn return_updated() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

#[async_trait]
impl Store for MongoStore {
    fn backend_tag(&self) -> &'static str {
        "mongodb"
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        self.users()
            .insert_one(&user, None)
            .await
            .map_err(map_write_error)?;
        Ok(user)
    }

    async fn find_user(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.users().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users().find_one(doc! { "email": email }, None).await?)
    }

    async fn update_user(&self, id: ObjectId, update: &ProfileUpdate) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": profile_set(update) },
                return_updated(),
            )
            .await
            .map_err(map_write_error)
    }

    async fn delete_user(&self, id: ObjectId) -> Result<bool, StoreError> {
        let deleted = self.users().delete_one(doc! { "_id": id }, None).await?;
        if deleted.deleted_count == 0 {
            return Ok(false);
        }
        let transactions = self
            .transactions()
            .delete_many(doc! { "user": id }, None)
            .await?;
        let recurring = self.recurring().delete_many(doc! { "user": id }, None).await?;
        tracing::info!(
            user = %id,
            transactions = transactions.deleted_count,
            recurring = recurring.deleted_count,
            "deleted account and owned records"
        );
        Ok(true)
    }

    async fn list_transactions(&self, owner: ObjectId) -> Result<Vec<Transaction>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "date": -1 }).build();
        let cursor = self.transactions().find(doc! { "user": owner }, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_transactions(&self, transactions: Vec<Transaction>) -> Result<Vec<Transaction>, StoreError> {
        if transactions.is_empty() {
            return Ok(transactions);
        }
        self.transactions().insert_many(&transactions, None).await?;
        Ok(transactions)
    }

    async fn delete_transaction(&self, owner: ObjectId, id: ObjectId) -> Result<bool, StoreError> {
        let result = self
            .transactions()
            .delete_one(doc! { "_id": id, "user": owner }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn list_recurring(&self, owner: ObjectId) -> Result<Vec<RecurringPayment>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "dueDate": 1 }).build();
        let cursor = self.recurring().find(doc! { "user": owner }, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_recurring(&self, payment: RecurringPayment) -> Result<RecurringPayment, StoreError> {
        self.recurring().insert_one(&payment, None).await?;
        Ok(payment)
    }

    async fn update_recurring(
        &self,
        owner: ObjectId,
        id: ObjectId,
        patch: &RecurringPatch,
    ) -> Result<Option<RecurringPayment>, StoreError> {
        Ok(self
            .recurring()
            .find_one_and_update(
                doc! { "_id": id, "user": owner },
                doc! { "$set": recurring_set(patch) },
                return_updated(),
            )
            .await?)
    }

    async fn delete_recurring(&self, owner: ObjectId, id: ObjectId) -> Result<bool, StoreError> {
        let result = self
            .recurring()
            .delete_one(doc! { "_id": id, "user": owner }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }
}
