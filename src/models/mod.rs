use rust_decimal::Decimal;

pub mod recurring;
pub mod transaction;
pub mod user;

pub use recurring::{Frequency, NewRecurringPayment, RecurringPatch, RecurringPayment};
pub use transaction::{
    Entry, EntryDetails, Location, NewTransaction, Transaction, TransactionKind, TransactionView,
};
pub use user::{ProfileUpdate, User, UserView};

/// Checks that run after a request body has been deserialized and before it
/// reaches the store. The error string is returned to the client verbatim.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Dates arrive either as RFC 3339 timestamps or as bare `YYYY-MM-DD` values
/// from date inputs. Bare dates are taken as midnight UTC.
pub mod flexible_date {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, de::Error};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(naive.and_utc());
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid date: {raw}")))
    }

    pub fn option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date: {raw}"))),
            None => Ok(None),
        }
    }

}

/// Largest amount accepted anywhere: 10^15. Sums of many such amounts stay
/// far inside `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

pub(crate) fn check_amount(amount: Decimal, allow_zero: bool) -> Result<(), String> {
    if allow_zero && amount < Decimal::ZERO {
        return Err("amount must not be negative".to_string());
    }
    if !allow_zero && amount <= Decimal::ZERO {
        return Err("amount must be greater than zero".to_string());
    }
    if amount > MAX_AMOUNT {
        return Err(format!("amount must not exceed {MAX_AMOUNT}"));
    }
    Ok(())
}

pub(crate) fn non_blank(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} is required"))
    } else {
        Ok(())
    }
}

pub(crate) fn trimmed_opt(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
