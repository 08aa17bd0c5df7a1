use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Valid, parse_id};
use crate::middlewares::auth::UserId;
use crate::models::{Frequency, NewRecurringPayment, RecurringPatch, RecurringPayment, TransactionKind};
use crate::schedule::{self, Projection};

/// A stored payment plus its projected next occurrence.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecurringView {
    id: String,
    name: String,
    amount: Decimal,
    due_date: DateTime<Utc>,
    next_due_date: DateTime<Utc>,
    upcoming: bool,
    frequency: Frequency,
    #[serde(rename = "type")]
    kind: TransactionKind,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Projection<'_>> for RecurringView {
    fn from(projection: Projection<'_>) -> Self {
        let payment = projection.payment;
        Self {
            id: payment.id.to_hex(),
            name: payment.name.clone(),
            amount: payment.amount,
            due_date: payment.due_date,
            next_due_date: projection.next_due,
            upcoming: projection.upcoming,
            frequency: payment.frequency,
            kind: payment.kind,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}

fn view(payment: &RecurringPayment) -> RecurringView {
    schedule::project(payment, Utc::now()).into()
}

async fn list_recurring(
    State(state): State<AppState>,
    UserId(owner): UserId,
) -> ApiResult<Json<Vec<RecurringView>>> {
    let payments = state.store.list_recurring(owner).await?;
    Ok(Json(payments.iter().map(view).collect()))
}

async fn list_upcoming(
    State(state): State<AppState>,
    UserId(owner): UserId,
) -> ApiResult<Json<Vec<RecurringView>>> {
    let payments = state.store.list_recurring(owner).await?;
    let upcoming = schedule::upcoming(&payments, Utc::now());
    Ok(Json(upcoming.into_iter().map(RecurringView::from).collect()))
}

async fn create_recurring(
    State(state): State<AppState>,
    UserId(owner): UserId,
    Valid(input): Valid<NewRecurringPayment>,
) -> ApiResult<(StatusCode, Json<RecurringView>)> {
    let payment = state.store.insert_recurring(input.into_payment(owner, Utc::now())).await?;
    Ok((StatusCode::CREATED, Json(view(&payment))))
}

async fn update_recurring(
    State(state): State<AppState>,
    UserId(owner): UserId,
    Path(id): Path<String>,
    Valid(patch): Valid<RecurringPatch>,
) -> ApiResult<Json<RecurringView>> {
    let id = parse_id(&id, "Recurring payment")?;
    let payment = state
        .store
        .update_recurring(owner, id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Not found"))?;
    Ok(Json(view(&payment)))
}

async fn delete_recurring(
    State(state): State<AppState>,
    UserId(owner): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Recurring payment")?;
    if !state.store.delete_recurring(owner, id).await? {
        return Err(ApiError::not_found("Not found"));
    }
    Ok(Json(json!({ "message": "Deleted" })))
}

pub fn recurring_routes() -> Router<AppState> {
    Router::new()
        .route("/recurring", get(list_recurring).post(create_recurring))
        .route("/recurring/upcoming", get(list_upcoming))
        .route("/recurring/:id", put(update_recurring).delete(delete_recurring))
}
