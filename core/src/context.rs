//! Host container primitives
//!
//! The action executor never touches state directly. It talks to the host
//! container through [`ActionContext`], which exposes the two primitives a
//! unidirectional store offers to actions: `commit` (run a mutation) and
//! `dispatch` (run another action).
//!
//! This trait uses explicit `Pin<Box<dyn Future>>` returns instead of
//! `async fn` so it stays object safe; actions receive it as
//! `Arc<dyn ActionContext>`.

use crate::error::ActionError;
use crate::http::HttpResponse;
use crate::payload::ActionPayload;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// Boxed, sendable future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a dispatched action
///
/// Networked actions resolve with the HTTP response; plain actions resolve
/// with `None`.
pub type ActionResult = Result<Option<HttpResponse>, ActionError>;

/// Commit and dispatch primitives supplied by the host container
pub trait ActionContext: Send + Sync {
    /// Run the mutation registered under `mutation` with `payload`
    ///
    /// The name is resolved relative to the calling module.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownMutation`] if nothing is registered under
    /// the name.
    fn commit<'a>(
        &'a self,
        mutation: &'a str,
        payload: Value,
    ) -> BoxFuture<'a, Result<(), ActionError>>;

    /// Dispatch the action registered under `action`
    ///
    /// When `root` is false the name is resolved relative to the calling
    /// module's namespace, otherwise it is looked up globally.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownAction`] if nothing is registered under
    /// the name, or whatever the action itself fails with.
    fn dispatch<'a>(
        &'a self,
        action: &'a str,
        payload: ActionPayload,
        root: bool,
    ) -> BoxFuture<'a, ActionResult>;
}
