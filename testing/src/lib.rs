//! # Rest Store Testing
//!
//! Testing utilities for resources and the store modules synthesized from
//! them.
//!
//! This crate provides:
//! - [`MockHttpClient`]: scripted HTTP responses, with request capture
//! - [`RecordingContext`]: an in-memory host that records commits and dispatches
//! - [`ActionTest`]: a Given-When-Then harness for module actions
//!
//! ## Example
//!
//! ```ignore
//! use rest_store_testing::{ActionTest, MockHttpClient, helpers};
//! use rest_store_core::prelude::*;
//!
//! #[tokio::test]
//! async fn fetches_user() {
//!     let client = MockHttpClient::new().respond(HttpMethod::Get, "/user", 200, json!({"id": 1}));
//!     let mut resource = ResourceDefinition::new(ResourceOptions::new().client(Arc::new(client.clone())));
//!     resource.get(ActionDescriptor::new("fetchUser").path("/user").property("user"))?;
//!
//!     ActionTest::new(resource.get_store(StoreOptions::default()))
//!         .when_dispatch("fetchUser", ActionPayload::new())
//!         .then_state(|state| assert_eq!(state["user"]["id"], 1))
//!         .run()
//!         .await;
//! }
//! ```

pub mod context;
pub mod mock_http;

/// Test helpers and utilities
pub mod helpers {
    use rest_store_core::http::HttpResponse;
    use serde_json::Value;

    /// Install a test-friendly tracing subscriber
    ///
    /// Honors `RUST_LOG`; safe to call from every test.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "rest_store_core=debug".into()),
            )
            .with_test_writer()
            .try_init();
    }

    /// A `200` response carrying `data`
    #[must_use]
    pub const fn ok(data: Value) -> HttpResponse {
        HttpResponse::new(200, data)
    }

    /// A response with an arbitrary status
    #[must_use]
    pub const fn status(status: u16, data: Value) -> HttpResponse {
        HttpResponse::new(status, data)
    }
}

// Re-export commonly used items
pub use action_test::{ActionTest, assertions};
pub use context::{Commit, Dispatched, RecordingContext};
pub use mock_http::{MockHttpClient, MockReply};
