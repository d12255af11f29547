//! Integration tests for resources mounted in a Store
//!
//! Covers namespacing of synthesized modules, cross-module chained
//! dispatches and concurrent dispatches sharing one root state.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use futures::future::join_all;
use rest_store_core::prelude::*;
use rest_store_core::{Value, json};
use rest_store_runtime::{Store, StoreError};
use rest_store_testing::{MockHttpClient, helpers};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

fn users(client: &MockHttpClient, namespaced: bool) -> StoreModule {
    let mut resource = ResourceDefinition::new(
        ResourceOptions::new()
            .client(Arc::new(client.clone()))
            .namespaced(namespaced)
            .state(json!({"users": []})),
    );
    resource
        .get(
            ActionDescriptor::new("fetchUsers")
                .path("/users")
                .property("users")
                .resolved(Callback::dispatch("notifications/push").root()),
        )
        .unwrap()
        .add(ActionDescriptor::new("selectUser").property("selected"))
        .unwrap();
    resource.get_store(StoreOptions::default())
}

fn notifications() -> StoreModule {
    let mut resource = ResourceDefinition::new(
        ResourceOptions::new()
            .namespaced(true)
            .state(json!({"items": []})),
    );
    resource
        .add(
            ActionDescriptor::new("push")
                .property("items")
                .success_handler(|state, payload| {
                    if let Some(items) = state["items"].as_array_mut() {
                        items.push(payload["data"].clone());
                    }
                }),
        )
        .unwrap();
    resource.get_store(StoreOptions::default())
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn namespaced_resource_updates_its_own_state() {
    helpers::init_tracing();
    let client = MockHttpClient::new().respond(HttpMethod::Get, "/users", 200, json!([{"id": 1}]));
    let store = Store::builder()
        .module("users", users(&client, true))
        .module("notifications", notifications())
        .build()
        .unwrap();

    store
        .dispatch("users/fetchUsers", ActionPayload::new())
        .await
        .unwrap();

    let users = store.module_state("users", Clone::clone).await.unwrap();
    assert_eq!(users["users"], json!([{"id": 1}]));
    assert_eq!(users["pending"]["users"], false);
    assert_eq!(users["error"]["users"], Value::Null);

    // resolved chain reached the other module through the root namespace
    let items = store
        .module_state("notifications", |s| s["items"].clone())
        .await;
    assert_eq!(items, Some(json!([[{"id": 1}]])));
}

#[tokio::test]
async fn local_commit_names_resolve_inside_namespace() {
    let client = MockHttpClient::new();
    let store = Store::builder()
        .module("users", users(&client, true))
        .build()
        .unwrap();

    assert!(store.action_types().contains(&"users/selectUser"));
    assert!(store.mutation_types().contains(&"users/SELECT_USER"));

    store
        .dispatch("users/selectUser", ActionPayload::new().data(json!(7)))
        .await
        .unwrap();
    assert_eq!(
        store.module_state("users", |s| s["selected"].clone()).await,
        Some(json!(7))
    );
}

#[tokio::test]
async fn two_global_resources_with_same_action_conflict() {
    let client = MockHttpClient::new();
    let result = Store::builder()
        .module("users", users(&client, false))
        .module("admins", users(&client, false))
        .build();

    assert!(matches!(result, Err(StoreError::DuplicateAction { .. } | StoreError::DuplicateMutation { .. })));
}

#[tokio::test]
async fn failed_chained_dispatch_does_not_fail_the_caller() {
    // no notifications module: the chained root dispatch is unknown
    let client = MockHttpClient::new().respond(HttpMethod::Get, "/users", 200, json!([]));
    let store = Store::builder()
        .module("users", users(&client, true))
        .build()
        .unwrap();

    let outcome = store.dispatch("users/fetchUsers", ActionPayload::new()).await;

    assert!(outcome.is_ok());
}

#[tokio::test]
async fn concurrent_dispatches_share_one_state() {
    let client = MockHttpClient::new()
        .respond(HttpMethod::Get, "/users", 200, json!([{"id": 1}]))
        .hang(HttpMethod::Get, "/slow");
    let mut slow = ResourceDefinition::new(ResourceOptions::new().client(Arc::new(client.clone())));
    slow.get(ActionDescriptor::new("fetchSlow").path("/slow").property("slow"))
        .unwrap();
    let store = Store::builder()
        .module("users", users(&client, true))
        .module("slow", slow.get_store(StoreOptions::default()))
        .module("notifications", notifications())
        .build()
        .unwrap();

    let in_flight = {
        let store = store.clone();
        tokio::spawn(async move { store.dispatch("fetchSlow", ActionPayload::new()).await })
    };
    let results = join_all((0..4).map(|_| store.dispatch("users/fetchUsers", ActionPayload::new()))).await;
    assert!(results.iter().all(Result::is_ok));

    // the hanging request keeps its property pending
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
        store.module_state("slow", |s| s["pending"]["slow"].clone()).await,
        Some(json!(true))
    );
    assert_eq!(
        store
            .module_state("notifications", |s| s["items"].as_array().map(Vec::len))
            .await
            .flatten(),
        Some(4)
    );
    in_flight.abort();
}
