//! In-process router tests for the paths that are decided before any query runs

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use circulation_server::{
    api, config::AppConfig, models::claims::Rights, repository::Repository, services::Services,
    AppState,
};

use crate::common::{claims, librarian_token, token_for, TEST_SECRET};

fn test_app() -> Router {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = TEST_SECRET.to_string();

    // Never connects unless a handler actually queries
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy(&config.database.url)
        .expect("Invalid database URL");

    api::create_router(AppState {
        config: Arc::new(config),
        services: Arc::new(Services::new(Repository::new(pool))),
    })
}

async fn send(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = test_app().oneshot(request).await.expect("Router failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn issue_body(due_in_days: i64, quantity: i32) -> Value {
    json!({
        "borrower_id": Uuid::new_v4(),
        "site_id": Uuid::new_v4(),
        "due_date": Utc::now() + chrono::Duration::days(due_in_days),
        "items": [{ "book_id": Uuid::new_v4(), "quantity": quantity }]
    })
}

#[tokio::test]
async fn test_health_check() {
    let (status, body) = send(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let (status, body) = send(Method::GET, "/api/v1/lendings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let request = Request::builder()
        .uri("/api/v1/lendings")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret() {
    let token = librarian_token("not-the-server-secret");
    let (status, _) = send(Method::GET, "/api/v1/lendings", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token() {
    let mut expired = claims(Rights::Write, Rights::Read);
    expired.exp = (Utc::now() - chrono::Duration::hours(2)).timestamp();
    let token = token_for(&expired, TEST_SECRET);
    let (status, _) = send(Method::GET, "/api/v1/lendings", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reader_cannot_issue() {
    let token = token_for(&claims(Rights::Read, Rights::None), TEST_SECRET);
    let (status, _) = send(Method::POST, "/api/v1/lendings", Some(&token), Some(issue_body(14, 1))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_issue_with_past_due_date_is_rejected() {
    let token = librarian_token(TEST_SECRET);
    let (status, body) =
        send(Method::POST, "/api/v1/lendings", Some(&token), Some(issue_body(-1, 1))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_issue_with_zero_quantity_is_rejected() {
    let token = librarian_token(TEST_SECRET);
    let (status, _) =
        send(Method::POST, "/api/v1/lendings", Some(&token), Some(issue_body(14, 0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_issue_without_items_is_rejected() {
    let token = librarian_token(TEST_SECRET);
    let mut body = issue_body(14, 1);
    body["items"] = json!([]);
    let (status, _) = send(Method::POST, "/api/v1/lendings", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_return_with_zero_quantity_is_rejected() {
    let token = librarian_token(TEST_SECRET);
    let uri = format!("/api/v1/lendings/{}/return", Uuid::new_v4());
    let body = json!({ "item_index": 0, "quantity": 0, "condition": "good" });
    let (status, _) = send(Method::POST, &uri, Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_require_stats_rights() {
    let token = token_for(&claims(Rights::Write, Rights::None), TEST_SECRET);
    let (status, _) = send(Method::GET, "/api/v1/stats/lendings", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_openapi_document_lists_lending_routes() {
    let (status, body) = send(Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let paths = body["paths"].as_object().expect("paths object");
    assert!(paths.contains_key("/lendings"));
    assert!(paths.contains_key("/lendings/{id}/return"));
    assert!(paths.contains_key("/lendings/{id}/fines/{index}/pay"));
}

#[tokio::test]
async fn test_fine_with_zero_amount_is_rejected() {
    let token = librarian_token(TEST_SECRET);
    let uri = format!("/api/v1/lendings/{}/fines", Uuid::new_v4());
    for amount in ["0", "-2.00", "1.005", "10000000000"] {
        let body = json!({ "reason": "damage", "amount": amount });
        let (status, body) = send(Method::POST, &uri, Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {}", amount);
        assert_eq!(body["error"], "BadValue");
    }
}

#[tokio::test]
async fn test_issue_with_oversized_quantity_is_rejected() {
    let token = librarian_token(TEST_SECRET);
    let mut body = issue_body(14, 1);
    body["items"] = json!([
        { "book_id": Uuid::new_v4(), "quantity": i32::MAX },
        { "book_id": Uuid::new_v4(), "quantity": 1 }
    ]);
    let (status, _) = send(Method::POST, "/api/v1/lendings", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_condition_gets_json_error_body() {
    let token = librarian_token(TEST_SECRET);
    let uri = format!("/api/v1/lendings/{}/return", Uuid::new_v4());
    let body = json!({ "item_index": 0, "quantity": 1, "condition": "broken" });
    let (status, body) = send(Method::POST, &uri, Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 5);
    assert_eq!(body["error"], "BadValue");
    assert!(body["message"].as_str().is_some_and(|m| m.contains("condition")));
}

#[tokio::test]
async fn test_malformed_json_gets_json_error_body() {
    let token = librarian_token(TEST_SECRET);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/lendings")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"borrower_id\":"))
        .unwrap();
    let response = test_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).expect("JSON error body");
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_invalid_lending_id_gets_json_error_body() {
    let token = librarian_token(TEST_SECRET);
    let (status, body) = send(Method::GET, "/api/v1/lendings/not-a-uuid", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_unknown_status_filter_gets_json_error_body() {
    let token = librarian_token(TEST_SECRET);
    let (status, body) =
        send(Method::GET, "/api/v1/lendings?status=lost", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}
