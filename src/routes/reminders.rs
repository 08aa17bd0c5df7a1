use axum::{
    Json, Router,
    extract::State,
    routing::post,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::ValidOrDefault;
use crate::mail::{Reminder, reminder_email};
use crate::middlewares::auth::UserId;
use crate::models::{Validate, check_amount};
use crate::schedule::{self, Projection};

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReminderRequest {
    #[serde(default)]
    reminders: Option<Vec<Reminder>>,
}

impl Validate for ReminderRequest {
    fn validate(&self) -> Result<(), String> {
        let supplied = self.reminders.iter().flatten();
        for reminder in supplied {
            if reminder.name.trim().is_empty() {
                return Err("reminder name is required".to_string());
            }
            check_amount(reminder.amount, true)?;
        }
        Ok(())
    }
}

fn to_reminder(projection: Projection<'_>) -> Reminder {
    let payment = projection.payment;
    Reminder {
        name: payment.name.clone(),
        amount: payment.amount,
        due_date: projection.next_due,
        frequency: payment.frequency,
        kind: payment.kind,
    }
}

async fn send_reminders(
    State(state): State<AppState>,
    UserId(owner): UserId,
    ValidOrDefault(req): ValidOrDefault<ReminderRequest>,
) -> ApiResult<Json<Value>> {
    let user = state
        .store
        .find_user(owner)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let reminders = match req.reminders {
        Some(list) if !list.is_empty() => list,
        _ => {
            let payments = state.store.list_recurring(owner).await?;
            schedule::upcoming(&payments, Utc::now())
                .into_iter()
                .map(to_reminder)
                .collect()
        }
    };
    if reminders.is_empty() {
        return Err(ApiError::bad_request("No upcoming reminders"));
    }

    let email = reminder_email(&user.email, &reminders, &state.config.currency_symbol);
    state.mailer.send(email).await?;
    tracing::info!(user = %owner, count = reminders.len(), "reminder email sent");
    Ok(Json(json!({ "message": "Reminder email sent" })))
}

pub fn reminder_routes() -> Router<AppState> {
    Router::new().route("/reminders/email", post(send_reminders))
}
