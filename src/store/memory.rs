use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::{Store, StoreError};
use crate::models::{ProfileUpdate, RecurringPatch, RecurringPayment, Transaction, User};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    transactions: Vec<Transaction>,
    recurring: Vec<RecurringPayment>,
}

/// Process-local store with the same owner-scoping rules as the MongoDB one.
/// Used by the test suite and handy for running the API without a database.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn transaction_count(&self) -> usize {
        self.inner.read().await.transactions.len()
    }

    pub async fn recurring_count(&self) -> usize {
        self.inner.read().await.recurring.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: ObjectId) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: ObjectId, update: &ProfileUpdate) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(index) = inner.users.iter().position(|u| u.id == id) else {
            return Ok(None);
        };
        let mut user = inner.users[index].clone();
        update.apply(&mut user, Utc::now());
        if inner
            .users
            .iter()
            .any(|u| u.id != id && u.email == user.email)
        {
            return Err(StoreError::DuplicateEmail);
        }
        inner.users[index] = user.clone();
        Ok(Some(user))
    }

    async fn delete_user(&self, id: ObjectId) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.users.len();
        inner.users.retain(|u| u.id != id);
        if inner.users.len() == before {
            return Ok(false);
        }
        inner.transactions.retain(|t| t.user != id);
        inner.recurring.retain(|r| r.user != id);
        Ok(true)
    }

    async fn list_transactions(&self, owner: ObjectId) -> Result<Vec<Transaction>, StoreError> {
        let inner = self.inner.read().await;
        let mut list: Vec<_> = inner
            .transactions
            .iter()
            .filter(|t| t.user == owner)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(list)
    }

    async fn insert_transactions(&self, transactions: Vec<Transaction>) -> Result<Vec<Transaction>, StoreError> {
        let mut inner = self.inner.write().await;
        inner.transactions.extend(transactions.iter().cloned());
        Ok(transactions)
    }

    async fn delete_transaction(&self, owner: ObjectId, id: ObjectId) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.transactions.len();
        inner
            .transactions
            .retain(|t| !(t.id == id && t.user == owner));
        Ok(inner.transactions.len() != before)
    }

    async fn list_recurring(&self, owner: ObjectId) -> Result<Vec<RecurringPayment>, StoreError> {
        let inner = self.inner.read().await;
        let mut list: Vec<_> = inner
            .recurring
            .iter()
            .filter(|r| r.user == owner)
            .cloned()
            .collect();
        list.sort_by_key(|r| r.due_date);
        Ok(list)
    }

    async fn insert_recurring(&self, payment: RecurringPayment) -> Result<RecurringPayment, StoreError> {
        self.inner.write().await.recurring.push(payment.clone());
        Ok(payment)
    }

    async fn update_recurring(
        &self,
        owner: ObjectId,
        id: ObjectId,
        patch: &RecurringPatch,
    ) -> Result<Option<RecurringPayment>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(payment) = inner
            .recurring
            .iter_mut()
            .find(|r| r.id == id && r.user == owner)
        else {
            return Ok(None);
        };
        patch.apply(payment, Utc::now());
        Ok(Some(payment.clone()))
    }

    async fn delete_recurring(&self, owner: ObjectId, id: ObjectId) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.recurring.len();
        inner.recurring.retain(|r| !(r.id == id && r.user == owner));
        Ok(inner.recurring.len() != before)
    }
}
