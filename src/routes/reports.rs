use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::Valid;
use crate::middlewares::auth::UserId;
use crate::models::{MAX_AMOUNT, TransactionView, Validate};
use crate::reports::{self, BudgetLine, PeriodMode, PeriodReport, Summary, Totals};

async fn summary(State(state): State<AppState>, UserId(owner): UserId) -> ApiResult<Json<Summary>> {
    let transactions = state.store.list_transactions(owner).await?;
    Ok(Json(reports::summary(&transactions, Utc::now())))
}

#[derive(Deserialize)]
struct PeriodQuery {
    #[serde(default)]
    mode: PeriodMode,
}

async fn period(
    State(state): State<AppState>,
    UserId(owner): UserId,
    query: Result<Query<PeriodQuery>, axum::extract::rejection::QueryRejection>,
) -> ApiResult<Json<PeriodReport>> {
    let Query(query) = query.map_err(|_| ApiError::bad_request("mode must be daily, weekly or monthly"))?;
    let transactions = state.store.list_transactions(owner).await?;
    Ok(Json(reports::period_report(
        &transactions,
        query.mode,
        Utc::now().date_naive(),
    )))
}

#[derive(Deserialize)]
struct CalendarQuery {
    date: Option<String>,
}

#[derive(Serialize)]
struct CalendarDay {
    date: NaiveDate,
    income: Decimal,
    expense: Decimal,
    transactions: Vec<TransactionView>,
}

async fn calendar(
    State(state): State<AppState>,
    UserId(owner): UserId,
    Query(query): Query<CalendarQuery>,
) -> ApiResult<Json<CalendarDay>> {
    let date = match query.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::bad_request(format!("invalid date: {raw}")))?,
        None => Utc::now().date_naive(),
    };
    let transactions = state.store.list_transactions(owner).await?;
    let day = reports::on_day(&transactions, date);
    let Totals { income, expense, .. } = reports::totals(day.iter().copied());
    Ok(Json(CalendarDay {
        date,
        income,
        expense,
        transactions: day.into_iter().map(TransactionView::from).collect(),
    }))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BudgetRequest {
    limits: BTreeMap<String, Decimal>,
}

impl Validate for BudgetRequest {
    fn validate(&self) -> Result<(), String> {
        if self.limits.is_empty() {
            return Err("at least one budget limit is required".to_string());
        }
        for (category, limit) in &self.limits {
            if category.trim().is_empty() {
                return Err("budget category is required".to_string());
            }
            if *limit <= Decimal::ZERO {
                return Err(format!("budget for {category} must be greater than zero"));
            }
            if *limit > MAX_AMOUNT {
                return Err(format!("budget for {category} must not exceed {MAX_AMOUNT}"));
            }
        }
        Ok(())
    }
}

async fn budget(
    State(state): State<AppState>,
    UserId(owner): UserId,
    Valid(req): Valid<BudgetRequest>,
) -> ApiResult<Json<Vec<BudgetLine>>> {
    let transactions = state.store.list_transactions(owner).await?;
    Ok(Json(reports::budget_progress(&transactions, &req.limits)))
}

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports/summary", get(summary))
        .route("/reports/period", get(period))
        .route("/reports/calendar", get(calendar))
        .route("/reports/budget", post(budget))
}
