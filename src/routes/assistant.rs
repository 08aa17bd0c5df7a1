use axum::{
    Json, Router,
    extract::State,
    routing::post,
};
use serde::Serialize;

use crate::AppState;
use crate::assistant::{self, ChatQuestion};
use crate::error::ApiResult;
use crate::extract::Valid;
use crate::middlewares::auth::UserId;

#[derive(Serialize)]
struct ChatReply {
    reply: String,
}

async fn chat(
    State(state): State<AppState>,
    UserId(owner): UserId,
    Valid(question): Valid<ChatQuestion>,
) -> ApiResult<Json<ChatReply>> {
    let transactions = state.store.list_transactions(owner).await?;
    let reply = assistant::answer(
        state.assistant.as_ref(),
        &state.config.assistant,
        question,
        &transactions,
        &state.config.currency_symbol,
    )
    .await?;
    Ok(Json(ChatReply { reply }))
}

pub fn assistant_routes() -> Router<AppState> {
    Router::new().route("/assistant/chat", post(chat))
}
