use std::fmt;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{TransactionKind, Validate, check_amount, flexible_date, non_blank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPayment {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user: ObjectId,
    pub name: String,
    pub amount: Decimal,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub due_date: DateTime<Utc>,
    pub frequency: Frequency,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRecurringPayment {
    pub name: String,
    pub amount: Decimal,
    #[serde(deserialize_with = "flexible_date::deserialize")]
    pub due_date: DateTime<Utc>,
    pub frequency: Frequency,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
}

impl Validate for NewRecurringPayment {
    fn validate(&self) -> Result<(), String> {
        non_blank(&self.name, "name")?;
        check_amount(self.amount, true)?;
        Ok(())
    }
}

impl NewRecurringPayment {
    pub fn into_payment(self, owner: ObjectId, now: DateTime<Utc>) -> RecurringPayment {
        RecurringPayment {
            id: ObjectId::new(),
            user: owner,
            name: self.name.trim().to_string(),
            amount: self.amount,
            due_date: self.due_date,
            frequency: self.frequency,
            kind: self.kind,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial edit of a recurring payment. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecurringPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "flexible_date::option")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default, rename = "type")]
    pub kind: Option<TransactionKind>,
}

impl Validate for RecurringPatch {
    fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("nothing to update".to_string());
        }
        if let Some(name) = &self.name {
            non_blank(name, "name")?;
        }
        if let Some(amount) = self.amount {
            check_amount(amount, true)?;
        }
        Ok(())
    }
}

impl RecurringPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.amount.is_none()
            && self.due_date.is_none()
            && self.frequency.is_none()
            && self.kind.is_none()
    }

    pub fn apply(&self, payment: &mut RecurringPayment, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            payment.name = name.trim().to_string();
        }
        if let Some(amount) = self.amount {
            payment.amount = amount;
        }
        if let Some(due_date) = self.due_date {
            payment.due_date = due_date;
        }
        if let Some(frequency) = self.frequency {
            payment.frequency = frequency;
        }
        if let Some(kind) = self.kind {
            payment.kind = kind;
        }
        payment.updated_at = now;
    }
}
