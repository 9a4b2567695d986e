//! API integration tests
//!
//! Run against a live server: `cargo run` then `cargo test -- --ignored`.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:5000";

/// Create a local badge and return its id
async fn create_badge(client: &Client, last_name: &str, first_name: &str) -> i64 {
    let response = client
        .post(format!("{}/api/badges", BASE_URL))
        .json(&json!({
            "nom": last_name,
            "prenom": first_name
        }))
        .send()
        .await
        .expect("Failed to send create request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse create response");
    body["id"].as_i64().expect("No id in response")
}

async fn delete_badge(client: &Client, id: i64) {
    client
        .delete(format!("{}/api/badges/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send delete request");
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
async fn test_create_validate_and_list() {
    let client = Client::new();
    let id = create_badge(&client, "Integration", "Test").await;

    let response = client
        .post(format!("{}/api/validate/{}", BASE_URL, id))
        .json(&json!({ "valide": 1 }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/api/getbadges", BASE_URL))
        .query(&[("valide", "1"), ("source", "local"), ("search", "integration")])
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let badges = body.as_array().expect("Expected an array");
    assert!(badges.iter().any(|b| b["id"] == id && b["valide"] == 1));

    delete_badge(&client, id).await;
}

#[tokio::test]
#[ignore]
async fn test_create_without_names() {
    let client = Client::new();

    let response = client
        .post(format!("{}/api/badges", BASE_URL))
        .json(&json!({ "nom": "OnlyLastName" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_get_missing_badge() {
    let client = Client::new();

    let response = client
        .get(format!("{}/api/getbadges/999999999", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_stats() {
    let client = Client::new();

    let response = client
        .get(format!("{}/api/stats", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let total = body["total_badges"].as_i64().expect("total_badges");
    let validated = body["validated_badges"].as_i64().expect("validated_badges");
    assert_eq!(body["non_validated_badges"].as_i64(), Some(total - validated));
}

#[tokio::test]
#[ignore]
async fn test_label_preview() {
    let client = Client::new();

    let response = client
        .post(format!("{}/api/label-preview", BASE_URL))
        .json(&json!({ "first_name": "Omar", "last_name": "Tazi" }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    assert_eq!(response.headers()["content-type"], "image/png");
}

#[tokio::test]
#[ignore]
async fn test_export_excel() {
    let client = Client::new();

    let response = client
        .get(format!("{}/api/export-excel", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let bytes = response.bytes().await.expect("Failed to read body");
    // xlsx files are zip archives
    assert_eq!(&bytes[..2], b"PK");
}
