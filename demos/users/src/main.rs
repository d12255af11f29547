//! Users demo binary
//!
//! Fetches users from a JSON placeholder API through a synthesized store
//! module and prints the resulting state.

use rest_store_core::prelude::*;
use rest_store_core::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use users_demo::{api_url, build_store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "users_demo=debug,rest_store_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_url = api_url();
    tracing::info!(%base_url, "Starting users demo");
    let store = build_store(ResourceOptions::new().base_url(base_url))?;

    println!("=== Users Demo: REST resource as a store module ===\n");

    println!(">>> Dispatching: users/fetchUsers");
    match store.dispatch("users/fetchUsers", ActionPayload::new()).await {
        Ok(_) => {
            let count = store
                .module_state("users", |s| s["users"].as_array().map_or(0, Vec::len))
                .await
                .unwrap_or(0);
            println!("Fetched {count} users");
        },
        Err(error) => println!("Fetching users failed: {error}"),
    }

    println!("\n>>> Dispatching: users/fetchUser (id = 1)");
    let result = store
        .dispatch("users/fetchUser", ActionPayload::new().meta_entry("id", json!(1)))
        .await;
    if let Err(error) = result {
        println!("Fetching user failed: {error}");
    }
    let name = store
        .module_state("users", |s| s["user"]["name"].clone())
        .await;
    println!("User 1: {}", name.unwrap_or_default());

    println!("\n>>> Dispatching: users/selectUser");
    store
        .dispatch("users/selectUser", ActionPayload::new().data(json!(1)))
        .await?;

    let events = store.module_state("activity", |s| s["events"].clone()).await;
    println!("\nActivity events recorded: {}", events.unwrap_or_default());

    let course = store
        .module_state("users", |s| json!({"pending": s["pending"], "error": s["error"]}))
        .await;
    println!("Course state: {}", course.unwrap_or_default());

    println!("\n=== Demo Complete ===");
    Ok(())
}
