use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, post},
};
use chrono::Utc;
use serde_json::{Value, json};

use crate::AppState;
use crate::csv_io;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Valid, parse_id};
use crate::middlewares::auth::UserId;
use crate::models::{NewTransaction, TransactionView};

async fn list_transactions(
    State(state): State<AppState>,
    UserId(owner): UserId,
) -> ApiResult<Json<Vec<TransactionView>>> {
    let transactions = state.store.list_transactions(owner).await?;
    Ok(Json(transactions.iter().map(TransactionView::from).collect()))
}

async fn create_transaction(
    State(state): State<AppState>,
    UserId(owner): UserId,
    Valid(input): Valid<NewTransaction>,
) -> ApiResult<(StatusCode, Json<TransactionView>)> {
    let tx = state
        .store
        .insert_transaction(input.into_transaction(owner, Utc::now()))
        .await?;
    Ok((StatusCode::CREATED, Json(TransactionView::from(&tx))))
}

async fn delete_transaction(
    State(state): State<AppState>,
    UserId(owner): UserId,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Transaction")?;
    if !state.store.delete_transaction(owner, id).await? {
        return Err(ApiError::not_found("Transaction not found"));
    }
    Ok(Json(json!({ "message": "Transaction deleted" })))
}

async fn export_transactions(
    State(state): State<AppState>,
    UserId(owner): UserId,
) -> ApiResult<impl IntoResponse> {
    let transactions = state.store.list_transactions(owner).await?;
    let body = csv_io::export(&transactions)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        body,
    ))
}

async fn import_transactions(
    State(state): State<AppState>,
    UserId(owner): UserId,
    body: String,
) -> ApiResult<(StatusCode, Json<Vec<TransactionView>>)> {
    let rows = csv_io::import(&body)?;
    let now = Utc::now();
    let transactions = rows.into_iter().map(|row| row.into_transaction(owner, now)).collect();
    let created = state.store.insert_transactions(transactions).await?;
    tracing::info!(user = %owner, count = created.len(), "imported transactions");
    Ok((
        StatusCode::CREATED,
        Json(created.iter().map(TransactionView::from).collect()),
    ))
}

pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route("/transactions/export", get(export_transactions))
        .route("/transactions/import", post(import_transactions))
        .route("/transactions/:id", delete(delete_transaction))
}
