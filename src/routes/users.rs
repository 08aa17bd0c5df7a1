use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use serde_json::{Value, json};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::Valid;
use crate::middlewares::auth::UserId;
use crate::models::user::normalize_email;
use crate::models::{ProfileUpdate, UserView};

async fn me(State(state): State<AppState>, UserId(user_id): UserId) -> ApiResult<Json<UserView>> {
    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserView::from(&user)))
}

async fn update_me(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Valid(update): Valid<ProfileUpdate>,
) -> ApiResult<Json<UserView>> {
    if let Some(email) = update.email.as_deref() {
        let taken = state.store.find_user_by_email(&normalize_email(email)).await?;
        if taken.is_some_and(|other| other.id != user_id) {
            return Err(ApiError::bad_request("Email already exists"));
        }
    }
    let user = state
        .store
        .update_user(user_id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserView::from(&user)))
}

async fn delete_me(State(state): State<AppState>, UserId(user_id): UserId) -> ApiResult<Json<Value>> {
    if !state.store.delete_user(user_id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!(user = %user_id, "account deleted");
    Ok(Json(json!({ "message": "Account deleted" })))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(me).put(update_me).delete(delete_me))
}
