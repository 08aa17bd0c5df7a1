//! Aggregates over a user's transaction list. Everything here is a pure
//! function of the list and a reference date.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Transaction, TransactionKind, TransactionView};

const TOP_CATEGORIES: usize = 5;
const TREND_MONTHS: u32 = 6;
const RECENT_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

pub fn totals<'a, I>(transactions: I) -> Totals
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut totals = Totals::default();
    for tx in transactions {
        match tx.kind() {
            TransactionKind::Income => totals.income = totals.income.saturating_add(tx.amount()),
            TransactionKind::Expense => totals.expense = totals.expense.saturating_add(tx.amount()),
        }
    }
    totals.balance = totals.income.saturating_sub(totals.expense);
    totals
}

/// `part / whole` as a percentage with one decimal, 0 when `whole` is zero.
/// Results beyond `Decimal`'s range saturate.
pub fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    let saturated = if part.is_sign_negative() == whole.is_sign_negative() {
        Decimal::MAX
    } else {
        Decimal::MIN
    };
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map_or(saturated, |p| p.round_dp(1))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    pub category: String,
    pub amount: Decimal,
    pub percent: Decimal,
}

/// Sums per category for one kind, largest first, ties broken by name.
pub fn by_category(transactions: &[Transaction], kind: TransactionKind) -> Vec<CategoryShare> {
    let mut sums: HashMap<&str, Decimal> = HashMap::new();
    let mut total = Decimal::ZERO;
    for tx in transactions.iter().filter(|t| t.kind() == kind) {
        let sum = sums.entry(tx.category()).or_default();
        *sum = sum.saturating_add(tx.amount());
        total = total.saturating_add(tx.amount());
    }
    let mut shares: Vec<_> = sums
        .into_iter()
        .map(|(category, amount)| CategoryShare {
            category: category.to_string(),
            amount,
            percent: percent(amount, total),
        })
        .collect();
    shares.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.category.cmp(&b.category)));
    shares
}

pub fn top_categories(transactions: &[Transaction], kind: TransactionKind, n: usize) -> Vec<CategoryShare> {
    let mut shares = by_category(transactions, kind);
    shares.truncate(n);
    shares
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub income: Decimal,
    pub expense: Decimal,
}

/// The last `months` calendar months up to and including the one holding
/// `today`, oldest first.
pub fn monthly_buckets(transactions: &[Transaction], today: NaiveDate, months: u32) -> Vec<MonthBucket> {
    let current = today.year() * 12 + today.month0() as i32;
    (0..months as i32)
        .rev()
        .filter_map(|back| {
            let index = current - back;
            NaiveDate::from_ymd_opt(index.div_euclid(12), index.rem_euclid(12) as u32 + 1, 1)
        })
        .map(|first| {
            let in_month = transactions.iter().filter(|t| {
                let d = t.date.date_naive();
                d.year() == first.year() && d.month() == first.month()
            });
            let sums = totals(in_month);
            MonthBucket {
                year: first.year(),
                month: first.month(),
                label: first.format("%b '%y").to_string(),
                income: sums.income,
                expense: sums.expense,
            }
        })
        .collect()
}

fn average(transactions: &[Transaction], kind: TransactionKind) -> Decimal {
    let (sum, count) = transactions
        .iter()
        .filter(|t| t.kind() == kind)
        .fold((Decimal::ZERO, 0u32), |(sum, count), t| {
            (sum.saturating_add(t.amount()), count.saturating_add(1))
        });
    if count == 0 {
        return Decimal::ZERO;
    }
    sum.checked_div(Decimal::from(count))
        .map_or(Decimal::ZERO, |avg| avg.round_dp(2))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub balance: Decimal,
    pub monthly_income: Decimal,
    pub monthly_expense: Decimal,
    pub savings_rate: Decimal,
    pub expense_ratio: Decimal,
    pub average_income: Decimal,
    pub average_expense: Decimal,
    pub transaction_count: usize,
    pub expense_by_category: Vec<CategoryShare>,
    pub income_by_category: Vec<CategoryShare>,
    pub top_expense_categories: Vec<CategoryShare>,
    pub top_income_categories: Vec<CategoryShare>,
    pub monthly: Vec<MonthBucket>,
    pub recent: Vec<TransactionView>,
}

/// Dashboard numbers. `transactions` is expected newest first, as the store
/// returns them.
pub fn summary(transactions: &[Transaction], now: DateTime<Utc>) -> Summary {
    let today = now.date_naive();
    let overall = totals(transactions);
    let this_month = totals(transactions.iter().filter(|t| {
        let d = t.date.date_naive();
        d.year() == today.year() && d.month() == today.month()
    }));

    let expense_by_category = by_category(transactions, TransactionKind::Expense);
    let income_by_category = by_category(transactions, TransactionKind::Income);

    Summary {
        total_income: overall.income,
        total_expense: overall.expense,
        balance: overall.balance,
        monthly_income: this_month.income,
        monthly_expense: this_month.expense,
        savings_rate: percent(overall.balance, overall.income),
        expense_ratio: percent(overall.expense, overall.income),
        average_income: average(transactions, TransactionKind::Income),
        average_expense: average(transactions, TransactionKind::Expense),
        transaction_count: transactions.len(),
        top_expense_categories: top_categories(transactions, TransactionKind::Expense, TOP_CATEGORIES),
        top_income_categories: top_categories(transactions, TransactionKind::Income, TOP_CATEGORIES),
        expense_by_category,
        income_by_category,
        monthly: monthly_buckets(transactions, today, TREND_MONTHS),
        recent: transactions.iter().take(RECENT_COUNT).map(TransactionView::from).collect(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodMode {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodReport {
    pub mode: PeriodMode,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net: Decimal,
    pub transaction_count: usize,
}

/// Inclusive date range for a period containing `today`. Weeks start on Monday.
pub fn period_bounds(mode: PeriodMode, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    match mode {
        PeriodMode::Daily => (today, today),
        PeriodMode::Weekly => {
            let start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
            (start, start + Duration::days(6))
        }
        PeriodMode::Monthly => {
            let start = today.with_day(1).unwrap_or(today);
            let next_month = if today.month() == 12 {
                NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
            };
            let end = next_month.map_or(today, |d| d - Duration::days(1));
            (start, end)
        }
    }
}

pub fn period_report(transactions: &[Transaction], mode: PeriodMode, today: NaiveDate) -> PeriodReport {
    let (start, end) = period_bounds(mode, today);
    let in_period: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| {
            let d = t.date.date_naive();
            d >= start && d <= end
        })
        .collect();
    let sums = totals(in_period.iter().copied());
    let label = match mode {
        PeriodMode::Daily => start.format("%Y-%m-%d").to_string(),
        PeriodMode::Weekly => format!("{} to {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d")),
        PeriodMode::Monthly => start.format("%B %Y").to_string(),
    };
    PeriodReport {
        mode,
        label,
        start,
        end,
        total_income: sums.income,
        total_expense: sums.expense,
        net: sums.balance,
        transaction_count: in_period.len(),
    }
}

pub fn on_day(transactions: &[Transaction], day: NaiveDate) -> Vec<&Transaction> {
    transactions
        .iter()
        .filter(|t| t.date.date_naive() == day)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLine {
    pub category: String,
    pub limit: Decimal,
    pub spent: Decimal,
    pub percent: Decimal,
    pub exceeded: bool,
}

/// Expense spent against each category limit. The percentage is capped at 100.
pub fn budget_progress(transactions: &[Transaction], limits: &BTreeMap<String, Decimal>) -> Vec<BudgetLine> {
    let spent: HashMap<String, Decimal> = by_category(transactions, TransactionKind::Expense)
        .into_iter()
        .map(|share| (share.category, share.amount))
        .collect();
    limits
        .iter()
        .map(|(category, &limit)| {
            let spent = spent.get(category).copied().unwrap_or_default();
            BudgetLine {
                category: category.clone(),
                limit,
                spent,
                percent: percent(spent, limit).min(Decimal::ONE_HUNDRED),
                exceeded: spent > limit,
            }
        })
        .collect()
}

/// Formats an amount with thousands separators and at most two decimals,
/// dropping trailing zeros: 1234567.5 -> "1,234,567.5".
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2).normalize();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
