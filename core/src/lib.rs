//! # Rest Store Core
//!
//! Declarative REST resources synthesized into state-store modules.
//!
//! Instead of hand-writing "send a request, flag it pending, store the result,
//! record the error" for every endpoint, describe the endpoint once and let
//! this crate generate the state, mutations and actions.
//!
//! ## Core Concepts
//!
//! - **Resource**: a set of action descriptors sharing a base URL and client
//! - **Action**: a named operation; *networked* when it has a path, *plain*
//!   when it only writes state
//! - **Mutation**: a named, synchronous state transition
//!   (`FETCH_USER`, `FETCH_USER_SUCCEEDED`, `FETCH_USER_FAILED`)
//! - **Course state**: `pending` / `error` maps tracking each networked
//!   property
//! - **Callback chain**: what runs after an action settles (dispatch another
//!   action, call a function, or both, nested arbitrarily)
//!
//! ## Architecture
//!
//! - The HTTP client sits behind [`http::HttpClient`]
//! - The host store sits behind [`context::ActionContext`]
//! - Everything in between is configuration merging
//!
//! ## Example
//!
//! ```ignore
//! use rest_store_core::prelude::*;
//!
//! let mut posts = ResourceDefinition::new(
//!     ResourceOptions::new().base_url("https://api.example.com"),
//! );
//! posts
//!     .get(ActionDescriptor::new("listPosts").path("/posts").property("posts"))?
//!     .post(
//!         ActionDescriptor::new("createPost")
//!             .path("/posts")
//!             .property("created")
//!             .resolved("listPosts"),
//!     )?;
//!
//! let module = posts.get_store(StoreOptions::default());
//! // mount `module` in a host store and dispatch "listPosts"
//! ```

// Re-export commonly used types
pub use serde_json::{Map, Value, json};

/// Callback and hook chains
pub mod callback;

/// Host container primitives (`commit`, `dispatch`)
pub mod context;

/// Shared resource defaults
pub mod defaults;

/// Error types
pub mod error;

/// Action execution
pub mod executor;

/// HTTP client abstraction and the `reqwest` implementation
pub mod http;

/// Merge utilities
pub mod merge;

/// Store module synthesis
pub mod module;

/// Derived action and mutation names
pub mod naming;

/// Dispatch payload
pub mod payload;

/// Resource definitions
pub mod resource;

/// Everything needed to define a resource and mount its module
pub mod prelude {
    pub use crate::callback::{Callback, Hook};
    pub use crate::context::{ActionContext, ActionResult, BoxFuture};
    pub use crate::defaults::ResourceDefaults;
    pub use crate::error::{ActionError, ConfigError, HttpError};
    pub use crate::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestClient};
    pub use crate::merge::{merge_as_array, merge_store};
    pub use crate::module::{Action, ModuleState, Mutation, StoreModule, StoreOptions};
    pub use crate::payload::ActionPayload;
    pub use crate::resource::{
        ActionDescriptor, RequestConfig, ResourceDefinition, ResourceOptions,
    };
}
