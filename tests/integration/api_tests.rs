//! Live API tests against a running server

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Random 10-digit member id so reruns do not collide
fn fresh_member_id() -> String {
    let suffix = uuid::Uuid::new_v4().as_u128() % 1_000_000_000;
    format!("9{:09}", suffix)
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_register_and_get_member() {
    let client = Client::new();
    let member_id = fresh_member_id();

    let response = client
        .post(format!("{}/members", BASE_URL))
        .json(&json!({ "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/members", BASE_URL))
        .json(&json!({ "member_id": member_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let response = client
        .get(format!("{}/members/{}", BASE_URL, member_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["loan_count"], 0);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_grants_on_last_copy() {
    let client = Client::new();
    let title = format!("Race {}", uuid::Uuid::new_v4());

    let response = client
        .post(format!("{}/items", BASE_URL))
        .json(&json!({ "title": title, "author": "Tester", "edition": "1st", "copies": 1 }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let item_id = body["item_id"].as_str().expect("No item id").to_string();

    let mut members = Vec::new();
    for _ in 0..2 {
        let member_id = fresh_member_id();
        client
            .post(format!("{}/members", BASE_URL))
            .json(&json!({ "member_id": member_id }))
            .send()
            .await
            .expect("Failed to send request");
        members.push(member_id);
    }

    let handles: Vec<_> = members
        .into_iter()
        .map(|member_id| {
            let client = client.clone();
            let item_id = item_id.clone();
            tokio::spawn(async move {
                client
                    .post(format!("{}/loans", BASE_URL))
                    .json(&json!({ "member_id": member_id, "item_id": item_id }))
                    .send()
                    .await
                    .map(|response| response.status())
            })
        })
        .collect();

    let mut granted = 0;
    for handle in handles {
        let status = handle
            .await
            .expect("Task panicked")
            .expect("Failed to send request");
        if status == 201 {
            granted += 1;
        } else {
            assert_eq!(status, 409);
        }
    }
    assert_eq!(granted, 1);
}
