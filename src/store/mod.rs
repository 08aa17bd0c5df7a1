//! Persistence seam. Every transaction and recurring-payment operation is
//! scoped by the owner id, so a caller can never reach another user's records.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::models::{ProfileUpdate, RecurringPatch, RecurringPayment, Transaction, User};

mod memory;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("document encoding error: {0}")]
    Encoding(String),
}

#[async_trait]
pub trait Store: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn insert_user(&self, user: User) -> Result<User, StoreError>;
    async fn find_user(&self, id: ObjectId) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn update_user(&self, id: ObjectId, update: &ProfileUpdate) -> Result<Option<User>, StoreError>;
    /// Removes the user together with everything they own.
    async fn delete_user(&self, id: ObjectId) -> Result<bool, StoreError>;

    /// Newest first.
    async fn list_transactions(&self, owner: ObjectId) -> Result<Vec<Transaction>, StoreError>;
    async fn insert_transactions(&self, transactions: Vec<Transaction>) -> Result<Vec<Transaction>, StoreError>;
    async fn delete_transaction(&self, owner: ObjectId, id: ObjectId) -> Result<bool, StoreError>;

    /// Ordered by stored due date, earliest first.
    async fn list_recurring(&self, owner: ObjectId) -> Result<Vec<RecurringPayment>, StoreError>;
    async fn insert_recurring(&self, payment: RecurringPayment) -> Result<RecurringPayment, StoreError>;
    async fn update_recurring(
        &self,
        owner: ObjectId,
        id: ObjectId,
        patch: &RecurringPatch,
    ) -> Result<Option<RecurringPayment>, StoreError>;
    async fn delete_recurring(&self, owner: ObjectId, id: ObjectId) -> Result<bool, StoreError>;

    async fn insert_transaction(&self, transaction: Transaction) -> Result<Transaction, StoreError> {
        let mut inserted = self.insert_transactions(vec![transaction]).await?;
        inserted
            .pop()
            .ok_or_else(|| StoreError::Encoding("insert returned no document".to_string()))
    }
}
