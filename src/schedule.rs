//! Recurring-payment due-date projection and the reminder window.
//!
//! Stored due dates are never advanced in the database. Every read projects
//! the stored date forward to the first occurrence that is not in the past.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::models::{Frequency, RecurringPayment};

/// Length of the reminder lookahead.
pub const UPCOMING_WINDOW_DAYS: i64 = 7;

/// Advances `due` one period at a time until it is no longer earlier than `now`.
/// A due date already at or after `now` is returned unchanged.
pub fn project_due_date(due: DateTime<Utc>, frequency: Frequency, now: DateTime<Utc>) -> DateTime<Utc> {
    let mut next = due;
    while next < now {
        next = step(next, frequency);
    }
    next
}

/// True when `next_due` falls inside `[now, now + 7 days]`.
pub fn is_upcoming(next_due: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    next_due >= now && next_due <= now + Duration::days(UPCOMING_WINDOW_DAYS)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection<'a> {
    pub payment: &'a RecurringPayment,
    pub next_due: DateTime<Utc>,
    pub upcoming: bool,
}

pub fn project(payment: &RecurringPayment, now: DateTime<Utc>) -> Projection<'_> {
    let next_due = project_due_date(payment.due_date, payment.frequency, now);
    Projection {
        payment,
        next_due,
        upcoming: is_upcoming(next_due, now),
    }
}

/// Payments whose projected due date lies in the reminder window, soonest first.
pub fn upcoming(payments: &[RecurringPayment], now: DateTime<Utc>) -> Vec<Projection<'_>> {
    let mut due: Vec<_> = payments
        .iter()
        .map(|p| project(p, now))
        .filter(|p| p.upcoming)
        .collect();
    due.sort_by_key(|p| p.next_due);
    due
}

fn step(date: DateTime<Utc>, frequency: Frequency) -> DateTime<Utc> {
    match frequency {
        Frequency::Weekly => date + Duration::days(7),
        Frequency::Monthly => add_months_overflowing(date, 1),
        Frequency::Yearly => add_months_overflowing(date, 12),
    }
}

/// Adds calendar months keeping the day of month. A day past the end of the
/// target month spills into the following month (Jan 31 + 1 month = Mar 3 in
/// a common year), and the time of day is preserved.
fn add_months_overflowing(date: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let total = date.month0() + months;
    let year = date.year() + (total / 12) as i32;
    let month = total % 12 + 1;
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return date;
    };
    let target = first + Duration::days(i64::from(date.day()) - 1);
    target.and_time(date.time()).and_utc()
}
