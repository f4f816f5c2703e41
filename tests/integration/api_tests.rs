//! API tests against a running server
//!
//! Start the server with the default configuration, then run with:
//! `cargo test -- --ignored`

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::common::{librarian_token, TEST_SECRET};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| TEST_SECRET.to_string())
}

/// Issue a lending of the given quantities and return its JSON
async fn issue(client: &Client, token: &str, quantities: &[i32]) -> Value {
    let items: Vec<Value> = quantities
        .iter()
        .map(|q| json!({ "book_id": Uuid::new_v4(), "quantity": q }))
        .collect();

    let response = client
        .post(format!("{}/lendings", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "borrower_id": Uuid::new_v4(),
            "site_id": Uuid::new_v4(),
            "due_date": Utc::now() + Duration::days(14),
            "items": items,
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_readiness() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_issue_and_return_lifecycle() {
    let client = Client::new();
    let token = librarian_token(&secret());

    let lending = issue(&client, &token, &[2, 1]).await;
    assert_eq!(lending["status"], "active");
    let id = lending["id"].as_str().expect("No lending ID").to_string();

    // Partial return
    let response = client
        .post(format!("{}/lendings/{}/return", BASE_URL, id))
        .bearer_auth(&token)
        .json(&json!({ "item_index": 0, "quantity": 1, "condition": "good" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "partially_returned");

    // Over-return is rejected
    let response = client
        .post(format!("{}/lendings/{}/return", BASE_URL, id))
        .bearer_auth(&token)
        .json(&json!({ "item_index": 0, "quantity": 2, "condition": "good" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    for (index, quantity) in [(0, 1), (1, 1)] {
        let response = client
            .post(format!("{}/lendings/{}/return", BASE_URL, id))
            .bearer_auth(&token)
            .json(&json!({ "item_index": index, "quantity": quantity, "condition": "fair" }))
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
    }

    let response = client
        .get(format!("{}/lendings/{}", BASE_URL, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "returned");
    assert_eq!(body["is_overdue"], false);

    let response = client
        .get(format!("{}/lendings/{}/activity", BASE_URL, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    let entries: Value = response.json().await.expect("Failed to parse response");
    let actions: Vec<&str> = entries
        .as_array()
        .expect("activity array")
        .iter()
        .filter_map(|e| e["action"].as_str())
        .collect();
    assert_eq!(actions.first(), Some(&"issued"));
    assert_eq!(actions.iter().filter(|a| **a == "item_returned").count(), 3);
}

#[tokio::test]
#[ignore]
async fn test_renew_and_fines() {
    let client = Client::new();
    let token = librarian_token(&secret());

    let lending = issue(&client, &token, &[1]).await;
    let id = lending["id"].as_str().expect("No lending ID").to_string();

    let new_due = Utc::now() + Duration::days(28);
    let response = client
        .post(format!("{}/lendings/{}/renew", BASE_URL, id))
        .bearer_auth(&token)
        .json(&json!({ "new_due_date": new_due }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["renewal_count"], 1);
    assert_eq!(body["renewal_history"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["renewal_history"][0]["previous_due_date"], lending["due_date"]);

    for amount in ["1.50", "2.25"] {
        let response = client
            .post(format!("{}/lendings/{}/fines", BASE_URL, id))
            .bearer_auth(&token)
            .json(&json!({ "reason": "damage", "amount": amount }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), 201);
    }

    let response = client
        .post(format!("{}/lendings/{}/fines/0/pay", BASE_URL, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["total_fines"], "3.75");
    assert_eq!(body["outstanding_fines"], "2.25");

    let response = client
        .post(format!("{}/lendings/{}/fines/0/pay", BASE_URL, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_lending_stats() {
    let client = Client::new();
    let token = librarian_token(&secret());

    let response = client
        .get(format!("{}/stats/lendings", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["total"].is_number());
    assert_eq!(body["by_status"].as_array().map(Vec::len), Some(4));
}

#[tokio::test]
#[ignore]
async fn test_concurrent_returns_never_over_return() {
    let client = Client::new();
    let token = librarian_token(&secret());

    let lending = issue(&client, &token, &[3]).await;
    let id = lending["id"].as_str().expect("No lending ID").to_string();

    let return_all = || {
        client
            .post(format!("{}/lendings/{}/return", BASE_URL, id))
            .bearer_auth(&token)
            .json(&json!({ "item_index": 0, "quantity": 3, "condition": "good" }))
            .send()
    };
    let (first, second) = tokio::join!(return_all(), return_all());
    let mut statuses = vec![
        first.expect("Failed to send request").status().as_u16(),
        second.expect("Failed to send request").status().as_u16(),
    ];
    statuses.sort_unstable();
    assert_eq!(statuses, vec![200, 422]);

    let response = client
        .get(format!("{}/lendings/{}", BASE_URL, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["items"][0]["quantity_returned"], 3);
    assert_eq!(body["status"], "returned");
}

#[tokio::test]
#[ignore]
async fn test_status_filters_match_derived_status() {
    let client = Client::new();
    let token = librarian_token(&secret());

    let lending = issue(&client, &token, &[2]).await;
    let id = lending["id"].as_str().expect("No lending ID").to_string();
    let borrower_id = lending["borrower_id"].as_str().expect("No borrower ID").to_string();

    let response = client
        .post(format!("{}/lendings/{}/return", BASE_URL, id))
        .bearer_auth(&token)
        .json(&json!({ "item_index": 0, "quantity": 1, "condition": "good" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let list = |status: &str, overdue: Option<bool>| {
        let mut query = vec![("borrower_id", borrower_id.clone()), ("status", status.to_string())];
        if let Some(overdue) = overdue {
            query.push(("overdue", overdue.to_string()));
        }
        client
            .get(format!("{}/lendings", BASE_URL))
            .bearer_auth(&token)
            .query(&query)
            .send()
    };

    let body: Value = list("partially_returned", None)
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(body["total"], 1);
    assert_eq!(body["lendings"][0]["id"], id.as_str());
    assert_eq!(body["lendings"][0]["status"], "partially_returned");

    let body: Value = list("active", None)
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(body["total"], 0);

    let body: Value = list("partially_returned", Some(true))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(body["total"], 0);
}
