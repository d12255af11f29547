//! Integration tests for the users demo store
//!
//! Runs the demo wiring against a scripted HTTP client.

#![allow(clippy::unwrap_used)] // Test code

use rest_store_core::prelude::*;
use rest_store_core::{Value, json};
use rest_store_testing::MockHttpClient;
use std::sync::Arc;
use users_demo::build_store;

fn options(client: &MockHttpClient) -> ResourceOptions {
    ResourceOptions::new()
        .base_url("https://api.test")
        .client(Arc::new(client.clone()))
}

#[tokio::test]
async fn test_fetch_users_records_activity() {
    let client = MockHttpClient::new().respond(
        HttpMethod::Get,
        "/users",
        200,
        json!([{"id": 1, "name": "Leanne"}, {"id": 2, "name": "Ervin"}]),
    );
    let store = build_store(options(&client)).unwrap();

    store
        .dispatch("users/fetchUsers", ActionPayload::new())
        .await
        .unwrap();

    let users = store.module_state("users", |s| s["users"].clone()).await.unwrap();
    assert_eq!(users.as_array().map(Vec::len), Some(2));
    let events = store.module_state("activity", |s| s["events"].clone()).await;
    assert_eq!(events, Some(json!(1)));
    assert_eq!(
        client.last_request().unwrap().full_url(),
        "https://api.test/users"
    );
}

#[tokio::test]
async fn test_fetch_user_by_meta_id() {
    let client = MockHttpClient::new().respond(HttpMethod::Get, "/users/2", 200, json!({"id": 2}));
    let store = build_store(options(&client)).unwrap();

    store
        .dispatch("users/fetchUser", ActionPayload::new().meta_entry("id", json!(2)))
        .await
        .unwrap();

    let user = store.module_state("users", |s| s["user"].clone()).await;
    assert_eq!(user, Some(json!({"id": 2})));
}

#[tokio::test]
async fn test_failed_fetch_sets_error_state() {
    let client = MockHttpClient::new().respond(HttpMethod::Get, "/users", 500, json!({"message": "down"}));
    let store = build_store(options(&client)).unwrap();

    let outcome = store.dispatch("users/fetchUsers", ActionPayload::new()).await;

    assert!(outcome.is_err());
    let error = store
        .module_state("users", |s| s["error"]["users"]["error"].clone())
        .await;
    assert_eq!(error, Some(json!({"message": "down"})));
    let events = store.module_state("activity", |s| s["events"].clone()).await;
    assert_eq!(events, Some(json!(0)));
    let pending = store.module_state("users", |s| s["pending"]["users"].clone()).await;
    assert_eq!(pending, Some(Value::Bool(false)));
}

#[tokio::test]
async fn test_select_user_is_plain() {
    let client = MockHttpClient::new();
    let store = build_store(options(&client)).unwrap();

    store
        .dispatch("users/selectUser", ActionPayload::new().data(json!(3)))
        .await
        .unwrap();

    assert_eq!(
        store.module_state("users", |s| s["selected"].clone()).await,
        Some(json!(3))
    );
    assert_eq!(client.request_count(), 0);
}
