//! # Users Demo
//!
//! A users resource against a JSON placeholder API, mounted in a
//! [`Store`](rest_store_runtime::Store).
//!
//! This example showcases:
//! - Networked actions with static and meta-driven paths
//! - A plain action writing straight to state
//! - Resource-wide failure callbacks
//! - Namespaced modules and root dispatches between them
//!
//! ## Example
//!
//! ```no_run
//! use rest_store_core::prelude::*;
//! use users_demo::build_store;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = build_store(ResourceOptions::new().base_url("https://jsonplaceholder.typicode.com"))?;
//! store.dispatch("users/fetchUsers", ActionPayload::new()).await?;
//! # Ok(())
//! # }
//! ```

use rest_store_core::prelude::*;
use rest_store_core::{Map, Value, json};
use rest_store_runtime::Store;

/// Environment variable holding the API base URL
pub const API_URL_VAR: &str = "USERS_API_URL";

/// Base URL used when [`API_URL_VAR`] is unset
pub const DEFAULT_API_URL: &str = "https://jsonplaceholder.typicode.com";

/// The API base URL from the environment
#[must_use]
pub fn api_url() -> String {
    std::env::var(API_URL_VAR).unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

/// The users resource
///
/// # Errors
///
/// Returns a [`ConfigError`] if an action is misdeclared.
pub fn users_resource(options: ResourceOptions) -> Result<ResourceDefinition, ConfigError> {
    let mut resource = ResourceDefinition::new(
        options
            .namespaced(true)
            .state(json!({"users": [], "user": null, "selected": null}))
            .rejected(Callback::invoke(|reason, _rest| {
                tracing::warn!(%reason, "Users request failed");
            })),
    );
    let mut created = Map::new();
    created.insert("kind".to_string(), json!("created"));
    resource
        .get(
            ActionDescriptor::new("fetchUsers")
                .path("/users")
                .property("users")
                .resolved(Callback::dispatch("activity/record").root()),
        )?
        .get(
            ActionDescriptor::new("fetchUser")
                .path_with(|meta| match meta.get("id") {
                    Some(Value::String(id)) => format!("/users/{id}"),
                    Some(id) => format!("/users/{id}"),
                    None => "/users".to_string(),
                })
                .property("user"),
        )?
        .post(
            ActionDescriptor::new("createUser")
                .path("/users")
                .property("created")
                .resolved(Callback::dispatch_with("activity/record", created).root()),
        )?
        .add(ActionDescriptor::new("selectUser").property("selected"))?;
    Ok(resource)
}

/// A plain module counting what happened to users
#[must_use]
pub fn activity_module() -> StoreModule {
    let mut module = StoreModule::new(json!({"events": 0}))
        .with_mutation("RECORD", |state, _payload| {
            let events = state["events"].as_u64().unwrap_or(0);
            state["events"] = json!(events + 1);
        })
        .with_action("record", |ctx, payload| {
            Box::pin(async move {
                let data = payload.data.unwrap_or(Value::Null);
                ctx.commit("RECORD", json!({ "data": data })).await?;
                Ok::<_, ActionError>(None)
            })
        });
    module.namespaced = true;
    module
}

/// Mount the users resource and the activity module in a store
///
/// # Errors
///
/// Returns an error if the resource is misdeclared or the modules conflict.
pub fn build_store(options: ResourceOptions) -> anyhow::Result<Store> {
    let users = users_resource(options)?;
    let store = Store::builder()
        .module("users", users.get_store(StoreOptions::default()))
        .module("activity", activity_module())
        .build()?;
    Ok(store)
}
