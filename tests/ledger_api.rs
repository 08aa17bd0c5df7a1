mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use common::{CANNED_REPLY, TestApp};
use finance_tracker::assistant::ChatRole;
use serde_json::json;

#[tokio::test]
async fn transactions_are_owner_scoped() {
    let app = TestApp::new();
    let (alice, _) = app.signup("Alice", "alice@example.com").await;
    let (bob, _) = app.signup("Bob", "bob@example.com").await;

    let created = app
        .add_transaction(
            &alice,
            json!({
                "type": "expense",
                "amount": 42.5,
                "category": "Food",
                "description": "Lunch",
                "date": "2024-03-02",
                "location": { "lat": 12.97, "lng": 77.59 }
            }),
        )
        .await;
    let id = created["id"].as_str().expect("id").to_string();
    assert_eq!(created["type"], "expense");
    assert_eq!(created["date"], "2024-03-02T00:00:00Z");
    assert!(created["createdAt"].is_string());
    assert_eq!(created["createdAt"], created["updatedAt"]);

    let (_, bobs) = app.call(Method::GET, "/api/transactions", Some(&bob), None).await;
    assert_eq!(bobs, json!([]));

    let uri = format!("/api/transactions/{id}");
    let (status, body) = app.call(Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Transaction not found");
    assert_eq!(app.store.transaction_count().await, 1);

    let (status, _) = app
        .call(Method::DELETE, "/api/transactions/not-an-id", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call(Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.transaction_count().await, 0);
}

#[tokio::test]
async fn transactions_list_newest_first_and_reject_bad_input() {
    let app = TestApp::new();
    let (token, _) = app.signup("Asha", "asha@example.com").await;
    for date in ["2024-01-05", "2024-03-05", "2024-02-05"] {
        app.add_transaction(
            &token,
            json!({ "type": "income", "amount": 1, "category": "Misc", "date": date }),
        )
        .await;
    }
    let (_, list) = app.call(Method::GET, "/api/transactions", Some(&token), None).await;
    let dates: Vec<_> = list
        .as_array()
        .expect("array")
        .iter()
        .map(|t| t["date"].as_str().expect("date")[..10].to_string())
        .collect();
    assert_eq!(dates, ["2024-03-05", "2024-02-05", "2024-01-05"]);

    for bad in [
        json!({ "type": "transfer", "amount": 1, "category": "Misc" }),
        json!({ "type": "income", "amount": -3, "category": "Misc" }),
        json!({ "type": "income", "amount": 3, "category": "  " }),
        json!({ "type": "income", "amount": 3, "category": "Misc", "user": "someone" }),
        json!({ "type": "income", "amount": 5e28, "category": "Misc" }),
    ] {
        let (status, _) = app
            .call(Method::POST, "/api/transactions", Some(&token), Some(bad))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert_eq!(app.store.transaction_count().await, 3);
}

#[tokio::test]
async fn csv_export_can_be_imported_elsewhere() {
    let app = TestApp::new();
    let (alice, _) = app.signup("Alice", "alice@example.com").await;
    let (bob, _) = app.signup("Bob", "bob@example.com").await;
    app.add_transaction(
        &alice,
        json!({ "type": "expense", "amount": 12.75, "category": "Food", "description": "Tea, \"masala\"", "date": "2024-04-01T08:30:00Z" }),
    )
    .await;
    app.add_transaction(
        &alice,
        json!({ "type": "income", "amount": 900, "category": "Salary", "date": "2024-04-02" }),
    )
    .await;

    let export = Request::builder()
        .uri("/api/transactions/export")
        .header(header::AUTHORIZATION, format!("Bearer {alice}"))
        .body(Body::empty())
        .expect("request");
    let (status, bytes, content_type) = app.send(export).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.is_some_and(|c| c.starts_with("text/csv")));
    let csv = String::from_utf8(bytes).expect("utf-8");
    assert!(csv.starts_with("\"date\",\"type\",\"category\",\"description\",\"amount\"\r\n"));

    let import = Request::builder()
        .method(Method::POST)
        .uri("/api/transactions/import")
        .header(header::AUTHORIZATION, format!("Bearer {bob}"))
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv))
        .expect("request");
    let (status, bytes, _) = app.send(import).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(created.as_array().map(Vec::len), Some(2));

    let (_, bobs) = app.call(Method::GET, "/api/transactions", Some(&bob), None).await;
    assert_eq!(bobs[0]["category"], "Salary");
    assert_eq!(bobs[1]["description"], "Tea, \"masala\"");
    assert_eq!(bobs[1]["date"], "2024-04-01T08:30:00Z");
    assert_eq!(bobs[1]["amount"].as_f64(), Some(12.75));
}

#[tokio::test]
async fn bad_csv_rows_are_rejected_without_writing() {
    let app = TestApp::new();
    let (token, _) = app.signup("Asha", "asha@example.com").await;
    let import = Request::builder()
        .method(Method::POST)
        .uri("/api/transactions/import")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(
            "date,type,category,description,amount\n2024-01-01,income,Gift,,5\n2024-01-02,expense,Food,,zero\n",
        ))
        .expect("request");
    let (status, bytes, _) = app.send(import).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    assert!(body["message"].as_str().is_some_and(|m| m.starts_with("row 3")));
    assert_eq!(app.store.transaction_count().await, 0);
}

#[tokio::test]
async fn amounts_above_the_cap_are_rejected_everywhere() {
    let app = TestApp::new();
    let (token, _) = app.signup("Asha", "asha@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/transactions",
            Some(&token),
            Some(json!({ "type": "income", "amount": 2e15, "category": "Lottery" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "amount must not exceed 1000000000000000");

    app.add_transaction(&token, json!({ "type": "income", "amount": 1e15, "category": "Lottery" }))
        .await;
    app.add_transaction(&token, json!({ "type": "income", "amount": 1e15, "category": "Lottery" }))
        .await;
    let (status, summary) = app
        .call(Method::GET, "/api/reports/summary", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["totalIncome"].as_f64(), Some(2e15));

    let import = Request::builder()
        .method(Method::POST)
        .uri("/api/transactions/import")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(
            "date,type,category,description,amount\n2024-01-01,income,Gift,,2000000000000000\n",
        ))
        .expect("request");
    let (status, _, _) = app.send(import).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/reports/budget",
            Some(&token),
            Some(json!({ "limits": { "Food": 2e15 } })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/recurring",
            Some(&token),
            Some(json!({
                "name": "Yacht",
                "amount": 2e15,
                "dueDate": "2030-01-01",
                "frequency": "monthly",
                "type": "expense"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.transaction_count().await, 2);
    assert_eq!(app.store.recurring_count().await, 0);
}

#[tokio::test]
async fn summary_reports_balance_and_shares() {
    let app = TestApp::new();
    let (token, _) = app.signup("Asha", "asha@example.com").await;
    let today = Utc::now().to_rfc3339();
    app.add_transaction(
        &token,
        json!({ "type": "income", "amount": 1000, "category": "Salary", "date": today }),
    )
    .await;
    app.add_transaction(
        &token,
        json!({ "type": "expense", "amount": 400, "category": "Rent", "date": today }),
    )
    .await;

    let (status, summary) = app
        .call(Method::GET, "/api/reports/summary", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["totalIncome"].as_f64(), Some(1000.0));
    assert_eq!(summary["totalExpense"].as_f64(), Some(400.0));
    assert_eq!(summary["balance"].as_f64(), Some(600.0));
    assert_eq!(summary["monthlyIncome"].as_f64(), Some(1000.0));
    assert_eq!(summary["savingsRate"].as_f64(), Some(60.0));
    assert_eq!(summary["expenseRatio"].as_f64(), Some(40.0));
    assert_eq!(summary["expenseByCategory"][0]["category"], "Rent");
    assert_eq!(summary["expenseByCategory"][0]["percent"].as_f64(), Some(100.0));
    assert_eq!(summary["monthly"].as_array().map(Vec::len), Some(6));
    assert_eq!(summary["recent"].as_array().map(Vec::len), Some(2));

    let (status, period) = app
        .call(Method::GET, "/api/reports/period?mode=monthly", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(period["net"].as_f64(), Some(600.0));
    assert_eq!(period["transactionCount"], 2);

    let (status, _) = app
        .call(Method::GET, "/api/reports/period?mode=hourly", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let day = Utc::now().format("%Y-%m-%d").to_string();
    let (status, calendar) = app
        .call(Method::GET, &format!("/api/reports/calendar?date={day}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(calendar["transactions"].as_array().map(Vec::len), Some(2));
    assert_eq!(calendar["expense"].as_f64(), Some(400.0));

    let (status, budget) = app
        .call(
            Method::POST,
            "/api/reports/budget",
            Some(&token),
            Some(json!({ "limits": { "Rent": 300, "Food": 200 } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let food = &budget[0];
    let rent = &budget[1];
    assert_eq!(food["category"], "Food");
    assert_eq!(food["exceeded"], false);
    assert_eq!(rent["percent"].as_f64(), Some(100.0));
    assert_eq!(rent["exceeded"], true);
}

#[tokio::test]
async fn assistant_answers_balance_locally() {
    let app = TestApp::new();
    let (token, _) = app.signup("Asha", "asha@example.com").await;
    app.add_transaction(&token, json!({ "type": "income", "amount": 125000, "category": "Salary" }))
        .await;
    app.add_transaction(&token, json!({ "type": "expense", "amount": 5000, "category": "Rent" }))
        .await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/assistant/chat",
            Some(&token),
            Some(json!({ "message": "What's my net balance?" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "₹120,000");
    assert!(app.assistant.requests().await.is_empty());
}

#[tokio::test]
async fn assistant_forwards_other_questions() {
    let app = TestApp::new();
    let (token, _) = app.signup("Asha", "asha@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/assistant/chat",
            Some(&token),
            Some(json!({
                "message": "How can I save more?",
                "history": [
                    { "role": "user", "content": "Hi" },
                    { "role": "assistant", "content": "Hello!" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let expected: Vec<&str> = CANNED_REPLY.split(". ").take(3).collect();
    assert_eq!(body["reply"], format!("{}.", expected.join(". ")));

    let requests = app.assistant.requests().await;
    assert_eq!(requests.len(), 1);
    let roles: Vec<_> = requests[0].messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        [ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]
    );
}
