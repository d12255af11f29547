//! # Rest Store Runtime
//!
//! Host state container for modules synthesized by `rest-store-core`.
//!
//! This crate provides the [`Store`] that mounts modules, routes
//! dispatches and commits to them, and owns the shared state.
//!
//! ## Core Components
//!
//! - **Store**: root state behind an async `RwLock`, action and mutation registry
//! - **`StoreBuilder`**: assembles modules, rejecting conflicting registrations
//! - **`ModuleContext`**: the [`ActionContext`](rest_store_core::context::ActionContext)
//!   handed to actions, resolving names against the module's namespace
//!
//! ## Example
//!
//! ```ignore
//! use rest_store_runtime::Store;
//! use rest_store_core::prelude::*;
//!
//! let store = Store::builder()
//!     .module("users", users.get_store(StoreOptions::default()))
//!     .build()?;
//!
//! // Dispatch an action
//! store.dispatch("users/fetchUsers", ActionPayload::new()).await?;
//!
//! // Read state
//! let pending = store.module_state("users", |s| s["pending"]["users"].clone()).await;
//! ```

/// Error types for the Store runtime
pub mod error;

/// Store implementation
pub mod store;

pub use error::StoreError;
pub use store::{ModuleContext, Store, StoreBuilder};
