//! API integration tests
//!
//! Run against a live server whose database holds users 1 and 2 and author 1
//! (`LIBRARY_DATABASE__BACKEND=memory` with the default `config/seed.toml` does):
//! `cargo test -- --ignored`

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

const READER_ID: i32 = 1;
const OTHER_READER_ID: i32 = 2;
const AUTHOR_ID: i32 = 1;

/// Helper to create a fresh book and return its id
async fn create_book(client: &Client, title: &str) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": title,
            "author_ids": [AUTHOR_ID, AUTHOR_ID]
        }))
        .send()
        .await
        .expect("Failed to send create request");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse book");
    body["id"].as_i64().expect("No id in response")
}

async fn post(client: &Client, path: &str, body: Value) -> (StatusCode, Value) {
    let response = client
        .post(format!("{}{}", BASE_URL, path))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");

    let status = response.status();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
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

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_create_book_collapses_duplicate_authors() {
    let client = Client::new();
    let id = create_book(&client, "Integration: duplicate authors").await;

    let response = client
        .get(format!("{}/books/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status_name"], "Available");
    assert_eq!(body["authors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_borrow_return_borrow() {
    let client = Client::new();
    let id = create_book(&client, "Integration: lending cycle").await;

    let (status, rental) = post(&client, "/rentals/borrow", json!({ "book_id": id, "user_id": READER_ID })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(rental["return_time"].is_null());

    let (status, _) = post(&client, "/rentals/borrow", json!({ "book_id": id, "user_id": OTHER_READER_ID })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post(&client, "/rentals/extend", json!({ "book_id": id })).await;
    assert!(status.is_success());

    let (status, returned) = post(&client, "/rentals/return", json!({ "book_id": id })).await;
    assert!(status.is_success());
    assert!(returned["return_time"].is_string());

    let (status, _) = post(&client, "/rentals/borrow", json!({ "book_id": id, "user_id": OTHER_READER_ID })).await;
    assert_eq!(status, StatusCode::CREATED);

    let history: Value = client
        .get(format!("{}/books/{}/rentals", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(history.as_array().unwrap().len(), 2);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows() {
    let client = Client::new();
    let id = create_book(&client, "Integration: concurrent borrow").await;

    let attempts = (0..8).map(|i| {
        let client = client.clone();
        let user_id = if i % 2 == 0 { READER_ID } else { OTHER_READER_ID };
        async move { post(&client, "/rentals/borrow", json!({ "book_id": id, "user_id": user_id })).await.0 }
    });
    let statuses: Vec<StatusCode> = spawn_all(attempts).await;

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count(), 7);
}

/// Run futures concurrently on the test runtime
async fn spawn_all<F>(futures: impl Iterator<Item = F>) -> Vec<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    let handles: Vec<_> = futures.map(tokio::spawn).collect();
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.expect("task panicked"));
    }
    results
}

#[tokio::test]
#[ignore]
async fn test_force_operations_require_staff() {
    let client = Client::new();
    let id = create_book(&client, "Integration: force operations").await;

    let (status, _) = post(&client, "/rentals/force-borrow", json!({ "book_id": id, "user_id": READER_ID })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let response = client
        .post(format!("{}/rentals/force-borrow", BASE_URL))
        .header("X-User-Id", OTHER_READER_ID.to_string())
        .header("X-Admin-Staff", "true")
        .json(&json!({ "book_id": id, "user_id": READER_ID }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{}/books/{}/force-available", BASE_URL, id))
        .header("X-Admin-Staff", "true")
        .json(&json!({ "confirm": true }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["book"]["status_name"], "Available");
    assert_eq!(body["closed_rental"]["user_id"], READER_ID);
}
