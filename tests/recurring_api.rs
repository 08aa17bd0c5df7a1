mod common;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Duration, Utc};
use common::TestApp;
use finance_tracker::mail::{REMINDER_SUBJECT, RecordingMailer};
use serde_json::{Value, json};

fn timestamp(value: &Value) -> DateTime<Utc> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .expect("rfc 3339 timestamp")
}

fn payment(name: &str, due_in_days: i64, frequency: &str) -> Value {
    json!({
        "name": name,
        "amount": 499,
        "dueDate": (Utc::now() + Duration::days(due_in_days)).to_rfc3339(),
        "frequency": frequency,
        "type": "expense"
    })
}

#[tokio::test]
async fn recurring_crud_projects_due_dates() {
    let app = TestApp::new();
    let (token, _) = app.signup("Asha", "asha@example.com").await;

    let (status, created) = app
        .call(Method::POST, "/api/recurring", Some(&token), Some(payment("Netflix", 3, "monthly")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["upcoming"], true);
    assert_eq!(created["nextDueDate"], created["dueDate"]);
    assert_eq!(created["createdAt"], created["updatedAt"]);
    let id = created["id"].as_str().expect("id").to_string();

    // Twenty days overdue on a weekly cycle lands one day ahead.
    let (_, stale) = app
        .call(Method::POST, "/api/recurring", Some(&token), Some(payment("Cleaner", -20, "weekly")))
        .await;
    assert_eq!(stale["upcoming"], true);
    assert_ne!(stale["nextDueDate"], stale["dueDate"]);

    app.call(Method::POST, "/api/recurring", Some(&token), Some(payment("Insurance", 60, "yearly")))
        .await;

    let (_, all) = app.call(Method::GET, "/api/recurring", Some(&token), None).await;
    let names: Vec<_> = all
        .as_array()
        .expect("array")
        .iter()
        .map(|p| p["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, ["Cleaner", "Netflix", "Insurance"]);

    let (_, upcoming) = app
        .call(Method::GET, "/api/recurring/upcoming", Some(&token), None)
        .await;
    let names: Vec<_> = upcoming
        .as_array()
        .expect("array")
        .iter()
        .map(|p| p["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, ["Cleaner", "Netflix"]);

    let uri = format!("/api/recurring/{id}");
    let (status, updated) = app
        .call(Method::PUT, &uri, Some(&token), Some(json!({ "amount": 649, "name": "Netflix 4K" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Netflix 4K");
    assert_eq!(updated["amount"].as_f64(), Some(649.0));
    assert_eq!(updated["frequency"], "monthly");
    assert_eq!(updated["createdAt"], created["createdAt"]);
    assert!(timestamp(&updated["updatedAt"]) > timestamp(&created["createdAt"]));

    let (status, body) = app.call(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Deleted");
    let (status, body) = app.call(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not found");
}

#[tokio::test]
async fn recurring_rejects_unknown_frequency_and_foreign_edits() {
    let app = TestApp::new();
    let (alice, _) = app.signup("Alice", "alice@example.com").await;
    let (bob, _) = app.signup("Bob", "bob@example.com").await;

    let (status, _) = app
        .call(Method::POST, "/api/recurring", Some(&alice), Some(payment("Gym", 2, "daily")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.recurring_count().await, 0);

    let (_, created) = app
        .call(Method::POST, "/api/recurring", Some(&alice), Some(payment("Gym", 2, "weekly")))
        .await;
    let uri = format!("/api/recurring/{}", created["id"].as_str().expect("id"));

    let (status, _) = app
        .call(Method::PUT, &uri, Some(&bob), Some(json!({ "amount": 1 })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call(Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call(Method::PUT, &uri, Some(&alice), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = app.call(Method::GET, "/api/recurring", Some(&alice), None).await;
    assert_eq!(list[0]["amount"].as_f64(), Some(499.0));
}

#[tokio::test]
async fn reminder_email_lists_upcoming_payments() {
    let app = TestApp::new();
    let (token, _) = app.signup("Asha", "asha@example.com").await;

    let (status, body) = app
        .call(Method::POST, "/api/reminders/email", Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No upcoming reminders");

    app.call(Method::POST, "/api/recurring", Some(&token), Some(payment("Electricity", 2, "monthly")))
        .await;
    app.call(Method::POST, "/api/recurring", Some(&token), Some(payment("Car loan", 20, "monthly")))
        .await;

    let (status, body) = app
        .call(Method::POST, "/api/reminders/email", Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Reminder email sent");

    let sent = app.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "asha@example.com");
    assert_eq!(sent[0].subject, REMINDER_SUBJECT);
    assert!(sent[0].text.contains("Electricity (expense) of ₹499"));
    assert!(!sent[0].text.contains("Car loan"));
}

#[tokio::test]
async fn reminder_email_needs_no_body() {
    let app = TestApp::new();
    let (token, _) = app.signup("Asha", "asha@example.com").await;

    let (status, body) = app
        .call(Method::POST, "/api/reminders/email", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No upcoming reminders");

    app.call(Method::POST, "/api/recurring", Some(&token), Some(payment("Internet", 1, "monthly")))
        .await;
    let (status, body) = app
        .call(Method::POST, "/api/reminders/email", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Reminder email sent");
    assert!(app.mailer.sent().await[0].text.starts_with("Internet (expense)"));

    let (status, _) = app
        .call(Method::POST, "/api/reminders/email", Some(&token), Some(json!({ "remind": true })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.mailer.sent().await.len(), 1);
}

#[tokio::test]
async fn reminder_email_accepts_a_supplied_list() {
    let app = TestApp::new();
    let (token, _) = app.signup("Asha", "asha@example.com").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/reminders/email",
            Some(&token),
            Some(json!({ "reminders": [{
                "name": "Water",
                "amount": 150,
                "dueDate": "2030-05-01",
                "frequency": "monthly",
                "type": "expense"
            }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let sent = app.mailer.sent().await;
    assert_eq!(sent[0].text, "Water (expense) of ₹150 due on 01 May 2030 (monthly)");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/reminders/email",
            Some(&token),
            Some(json!({ "reminders": [{
                "name": "Water",
                "amount": 150,
                "dueDate": "2030-05-01",
                "frequency": "fortnightly",
                "type": "expense"
            }] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.mailer.sent().await.len(), 1);
}

#[tokio::test]
async fn relay_failures_surface_as_server_errors() {
    let app = TestApp::with_mailer(RecordingMailer::rejecting());
    let (token, _) = app.signup("Asha", "asha@example.com").await;
    app.call(Method::POST, "/api/recurring", Some(&token), Some(payment("Rent", 1, "monthly")))
        .await;

    let (status, body) = app
        .call(Method::POST, "/api/reminders/email", Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to send email");
}
