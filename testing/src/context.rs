//! Recording host context
//!
//! [`RecordingContext`] stands in for a host store when testing a single
//! module: it applies the module's mutations to a local state and records
//! every commit and dispatch.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use rest_store_core::context::{ActionContext, ActionResult, BoxFuture};
use rest_store_core::error::ActionError;
use rest_store_core::module::StoreModule;
use rest_store_core::payload::ActionPayload;
use serde_json::Value;
use std::sync::{Arc, Mutex, Weak};

/// A recorded commit
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    /// Mutation type
    pub mutation: String,
    /// Mutation payload
    pub payload: Value,
}

/// A recorded dispatch
#[derive(Debug, Clone)]
pub struct Dispatched {
    /// Action type
    pub action: String,
    /// Action payload
    pub payload: ActionPayload,
    /// Whether the dispatch escaped the namespace
    pub root: bool,
}

/// In-memory host context for one module
///
/// Dispatches to actions of the module run them against this same context;
/// dispatches to any other action are only recorded and resolve with
/// `Ok(None)`.
///
/// # Example
///
/// ```ignore
/// let ctx = RecordingContext::new(&module);
/// ctx.dispatch_action("fetchUser", ActionPayload::new()).await?;
/// assert_eq!(ctx.commit_names(), vec!["FETCH_USER", "FETCH_USER_SUCCEEDED"]);
/// ```
#[derive(Debug)]
pub struct RecordingContext {
    module: StoreModule,
    state: Mutex<Value>,
    commits: Mutex<Vec<Commit>>,
    dispatches: Mutex<Vec<Dispatched>>,
    me: Weak<RecordingContext>,
}

impl RecordingContext {
    /// Create a context holding the module's initial state
    #[must_use]
    pub fn new(module: &StoreModule) -> Arc<Self> {
        Self::with_state(module, module.state.materialize())
    }

    /// Create a context holding `state`
    #[must_use]
    pub fn with_state(module: &StoreModule, state: Value) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            module: module.clone(),
            state: Mutex::new(state),
            commits: Mutex::new(Vec::new()),
            dispatches: Mutex::new(Vec::new()),
            me: me.clone(),
        })
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> Value {
        self.state.lock().unwrap().clone()
    }

    /// Every commit so far, in order
    #[must_use]
    pub fn commits(&self) -> Vec<Commit> {
        self.commits.lock().unwrap().clone()
    }

    /// Mutation types committed so far, in order
    #[must_use]
    pub fn commit_names(&self) -> Vec<String> {
        self.commits
            .lock()
            .unwrap()
            .iter()
            .map(|commit| commit.mutation.clone())
            .collect()
    }

    /// Every dispatch made through this context (chained ones included)
    #[must_use]
    pub fn dispatches(&self) -> Vec<Dispatched> {
        self.dispatches.lock().unwrap().clone()
    }

    /// Run one of the module's actions against this context
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownAction`] if the module has no such
    /// action, otherwise whatever the action returns.
    pub async fn dispatch_action(self: &Arc<Self>, action: &str, payload: ActionPayload) -> ActionResult {
        let Some(handler) = self.module.actions.get(action) else {
            return Err(ActionError::UnknownAction(action.to_string()));
        };
        let ctx: Arc<dyn ActionContext> = Arc::clone(self) as Arc<dyn ActionContext>;
        handler.call(ctx, payload).await
    }
}

impl ActionContext for RecordingContext {
    fn commit<'a>(
        &'a self,
        mutation: &'a str,
        payload: Value,
    ) -> BoxFuture<'a, Result<(), ActionError>> {
        Box::pin(async move {
            let Some(handler) = self.module.mutations.get(mutation) else {
                return Err(ActionError::UnknownMutation(mutation.to_string()));
            };
            handler.apply(&mut self.state.lock().unwrap(), &payload);
            self.commits.lock().unwrap().push(Commit {
                mutation: mutation.to_string(),
                payload,
            });
            Ok(())
        })
    }

    fn dispatch<'a>(
        &'a self,
        action: &'a str,
        payload: ActionPayload,
        root: bool,
    ) -> BoxFuture<'a, ActionResult> {
        Box::pin(async move {
            self.dispatches.lock().unwrap().push(Dispatched {
                action: action.to_string(),
                payload: payload.clone(),
                root,
            });
            let handler = self.module.actions.get(action).cloned();
            match (handler, self.me.upgrade()) {
                (Some(handler), Some(me)) => handler.call(me, payload).await,
                _ => Ok(None),
            }
        })
    }
}
