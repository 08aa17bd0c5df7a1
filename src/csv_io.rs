//! Bulk transaction export and import.
//!
//! Columns are `date,type,category,description,amount`; every field is quoted
//! and records end with CRLF.

use chrono::{DateTime, SecondsFormat, Utc};
use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, Trim, WriterBuilder};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{
    Entry, EntryDetails, Transaction, TransactionKind, check_amount, flexible_date, trimmed_opt,
};

pub const HEADER: [&str; 5] = ["date", "type", "category", "description", "amount"];

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV header must contain: {}", HEADER.join(", "))]
    Header,
    #[error("row {row}: {message}")]
    Row { row: usize, message: String },
    #[error("CSV file has no rows")]
    Empty,
    #[error("malformed CSV: {0}")]
    Parse(csv::Error),
    #[error("{0}")]
    Write(String),
}

pub fn export(transactions: &[Transaction]) -> Result<String, CsvError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());
    let write_err = |e: csv::Error| CsvError::Write(e.to_string());

    writer.write_record(HEADER).map_err(write_err)?;
    for tx in transactions {
        writer
            .write_record([
                tx.date.to_rfc3339_opts(SecondsFormat::Millis, true),
                tx.kind().to_string(),
                tx.category().to_string(),
                tx.entry.description().unwrap_or_default().to_string(),
                tx.amount().normalize().to_string(),
            ])
            .map_err(write_err)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::Write(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CsvError::Write(e.to_string()))
}

/// A row read back from a CSV file, not yet owned by anyone.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedRow {
    pub entry: Entry,
    pub date: DateTime<Utc>,
}

impl ImportedRow {
    pub fn into_transaction(self, owner: ObjectId, now: DateTime<Utc>) -> Transaction {
        Transaction {
            id: ObjectId::new(),
            user: owner,
            entry: self.entry,
            date: self.date,
            location: None,
            created_at: now,
            updated_at: now,
        }
    }
}

struct Columns {
    date: usize,
    kind: usize,
    category: usize,
    description: Option<usize>,
    amount: usize,
}

impl Columns {
    fn locate(header: &StringRecord) -> Result<Self, CsvError> {
        let find = |name: &str| header.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
        Ok(Self {
            date: find("date").ok_or(CsvError::Header)?,
            kind: find("type").ok_or(CsvError::Header)?,
            category: find("category").ok_or(CsvError::Header)?,
            description: find("description"),
            amount: find("amount").ok_or(CsvError::Header)?,
        })
    }
}

/// Parses an exported file. Blank lines are skipped; the first bad row aborts
/// the import with its 1-based line number.
pub fn import(text: &str) -> Result<Vec<ImportedRow>, CsvError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());
    let header = reader.headers().map_err(CsvError::Parse)?.clone();
    let columns = Columns::locate(&header)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row = index + 2;
        let record = record.map_err(|e| CsvError::Row {
            row,
            message: e.to_string(),
        })?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows.push(parse_row(&record, &columns).map_err(|message| CsvError::Row { row, message })?);
    }
    if rows.is_empty() {
        return Err(CsvError::Empty);
    }
    Ok(rows)
}

fn parse_row(record: &StringRecord, columns: &Columns) -> Result<ImportedRow, String> {
    let field = |index: usize| record.get(index).unwrap_or("").trim();

    let date = flexible_date::parse(field(columns.date))
        .ok_or_else(|| format!("invalid date {:?}", field(columns.date)))?;
    let kind: TransactionKind = field(columns.kind).parse()?;
    let category = field(columns.category);
    if category.is_empty() {
        return Err("category is required".to_string());
    }
    let amount: Decimal = field(columns.amount)
        .parse()
        .map_err(|_| format!("invalid amount {:?}", field(columns.amount)))?;
    check_amount(amount, false)?;
    let description = columns
        .description
        .map(|i| field(i).to_string())
        .and_then(|d| trimmed_opt(Some(d)));

    Ok(ImportedRow {
        entry: Entry::new(
            kind,
            EntryDetails {
                amount,
                category: category.to_string(),
                description,
            },
        ),
        date,
    })
}
