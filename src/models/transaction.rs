use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Validate, check_amount, flexible_date, non_blank, trimmed_opt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// The shape shared by both kinds of entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDetails {
    pub amount: Decimal,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A ledger entry, tagged by its `type` field on the wire and in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entry {
    Income(EntryDetails),
    Expense(EntryDetails),
}

impl Entry {
    pub fn new(kind: TransactionKind, details: EntryDetails) -> Self {
        match kind {
            TransactionKind::Income => Self::Income(details),
            TransactionKind::Expense => Self::Expense(details),
        }
    }

    pub fn kind(&self) -> TransactionKind {
        match self {
            Self::Income(_) => TransactionKind::Income,
            Self::Expense(_) => TransactionKind::Expense,
        }
    }

    pub fn details(&self) -> &EntryDetails {
        match self {
            Self::Income(details) | Self::Expense(details) => details,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.details().amount
    }

    pub fn category(&self) -> &str {
        &self.details().category
    }

    pub fn description(&self) -> Option<&str> {
        self.details().description.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl Validate for Location {
    fn validate(&self) -> Result<(), String> {
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lng) {
            return Err("location is out of range".to_string());
        }
        if self.accuracy.is_some_and(|a| a < 0.0) {
            return Err("location accuracy must not be negative".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
    #[serde(flatten)]
    pub entry: Entry,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(rename = "createdAt", with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn kind(&self) -> TransactionKind {
        self.entry.kind()
    }

    pub fn amount(&self) -> Decimal {
        self.entry.amount()
    }

    pub fn category(&self) -> &str {
        self.entry.category()
    }
}

/// Client-facing form of a transaction: hex id, RFC 3339 date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: String,
    #[serde(flatten)]
    pub entry: Entry,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionView {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id.to_hex(),
            entry: tx.entry.clone(),
            date: tx.date,
            location: tx.location,
            created_at: tx.created_at,
            updated_at: tx.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flexible_date::option")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<Location>,
}

impl Validate for NewTransaction {
    fn validate(&self) -> Result<(), String> {
        check_amount(self.amount, false)?;
        non_blank(&self.category, "category")?;
        if let Some(location) = &self.location {
            location.validate()?;
        }
        Ok(())
    }
}

impl NewTransaction {
    pub fn into_transaction(self, owner: ObjectId, now: DateTime<Utc>) -> Transaction {
        let details = EntryDetails {
            amount: self.amount,
            category: self.category.trim().to_string(),
            description: trimmed_opt(self.description),
        };
        Transaction {
            id: ObjectId::new(),
            user: owner,
            entry: Entry::new(self.kind, details),
            date: self.date.unwrap_or(now),
            location: self.location,
            created_at: now,
            updated_at: now,
        }
    }
}
