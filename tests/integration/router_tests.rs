//! Router tests against the in-memory store

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use lending_registry::{
    api,
    config::AppConfig,
    identity::derive_item_id,
    services::{notifications::LogNotifier, Services},
    store::MemoryStore,
    AppState,
};

fn app() -> Router {
    let config = AppConfig::default();
    let services = Services::new(
        Arc::new(MemoryStore::new()),
        config.catalog.clone(),
        Arc::new(LogNotifier),
    );
    api::router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(format!("/api/v1{}", uri))
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = app();

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_register_member() {
    let app = app();

    let (status, body) = send(&app, "POST", "/members", Some(json!({"member_id": "9876543210"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["member_id"], "9876543210");
    assert!(body["created_at"].is_string());

    let (status, body) = send(&app, "POST", "/members", Some(json!({"member_id": "9876543210"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "AlreadyExists");

    let (status, body) = send(&app, "GET", "/members/9876543210", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loan_count"], 0);
}

#[tokio::test]
async fn test_register_rejects_bad_format() {
    let app = app();

    for member_id in ["12345", "0123456789", "abcdefghij"] {
        let (status, body) =
            send(&app, "POST", "/members", Some(json!({"member_id": member_id}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidFormat");
    }

    let (status, body) = send(&app, "POST", "/members", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidArgument");
}

#[tokio::test]
async fn test_unknown_member_is_not_found() {
    let app = app();
    let (status, body) = send(&app, "GET", "/members/1234567890", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_upsert_validation() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/items",
        Some(json!({"title": "Dune", "author": "Frank Herbert", "edition": "1st", "copies": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidArgument");

    let (status, _) = send(
        &app,
        "POST",
        "/items",
        Some(json!({"title": "Dune", "author": "Frank Herbert", "copies": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_borrow_flow() {
    let app = app();

    send(&app, "POST", "/members", Some(json!({"member_id": "9876543210"}))).await;
    let (status, body) = send(
        &app,
        "POST",
        "/items",
        Some(json!({"title": "Clean Code", "author": "Robert Martin", "edition": "1st", "copies": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let item_id = body["item_id"].as_str().unwrap().to_string();
    assert_eq!(item_id, derive_item_id("Clean Code", "Robert Martin", "1st"));

    let loan = json!({"member_id": "9876543210", "item_id": item_id});
    for _ in 0..2 {
        let (status, body) = send(&app, "POST", "/loans", Some(loan.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["transaction_id"].is_string());
        assert!(body["borrowed_at"].is_string());
        assert_eq!(body["status"], "BORROWED");
    }

    let (status, body) = send(&app, "POST", "/loans", Some(loan.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "BorrowRejected");

    // same opaque answer for an unknown member
    let (status, other) = send(
        &app,
        "POST",
        "/loans",
        Some(json!({"member_id": "1111111111", "item_id": item_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(other["message"], body["message"]);

    send(
        &app,
        "POST",
        "/items",
        Some(json!({"title": "Clean Code", "author": "Robert Martin", "edition": "1st", "copies": 1})),
    )
    .await;
    let (_, item) = send(&app, "GET", &format!("/items/{}", item_id), None).await;
    assert_eq!(item["total_copies"], 3);
    assert_eq!(item["available_copies"], 1);

    let (_, member) = send(&app, "GET", "/members/9876543210", None).await;
    assert_eq!(member["loan_count"], 2);

    let (_, ledger) = send(&app, "GET", &format!("/items/{}/loans", item_id), None).await;
    assert_eq!(ledger.as_array().map(Vec::len), Some(2));
    let (_, ledger) = send(&app, "GET", "/members/9876543210/loans", None).await;
    assert_eq!(ledger.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_list_items_pagination() {
    let app = app();
    for n in 0..12 {
        send(
            &app,
            "POST",
            "/items",
            Some(json!({"title": format!("Title {n}"), "author": "Author", "edition": "1st", "copies": 1})),
        )
        .await;
    }

    let (status, page) = send(&app, "GET", "/items", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"].as_array().map(Vec::len), Some(10));
    let cursor = page["next_cursor"].as_str().unwrap().to_string();

    let (_, page) = send(&app, "GET", &format!("/items?limit=10&cursor={}", cursor), None).await;
    assert_eq!(page["items"].as_array().map(Vec::len), Some(2));
    assert!(page["next_cursor"].is_null());
}

#[tokio::test]
async fn test_upsert_overflowing_copies_is_bad_request() {
    let app = app();
    let item = json!({"title": "Dune", "author": "Frank Herbert", "edition": "1st", "copies": i32::MAX});

    let (status, _) = send(&app, "POST", "/items", Some(item)).await;
    assert_eq!(status, StatusCode::OK);

    let more = json!({"title": "Dune", "author": "Frank Herbert", "edition": "1st", "copies": 1});
    let (status, body) = send(&app, "POST", "/items", Some(more)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidArgument");

    let (status, _) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}
