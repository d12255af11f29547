//! Action executor
//!
//! Runs one dispatch of a synthesized action:
//!
//! ```text
//! before hooks
//!     │
//!     ├── plain ──────► commit NAME {data, ...rest} ─► after hooks ─► resolved chain
//!     │
//!     └── networked ──► commit NAME
//!                          │
//!                       request ─► validate
//!                          │
//!              ┌───────────┴────────────┐
//!              ▼                        ▼
//!         after hooks               after hooks (error)
//!         commit NAME_SUCCEEDED     commit NAME_FAILED {error, msg}
//!         resolved chain            rejected chain
//!         Ok(Some(response))        Err(error)
//! ```
//!
//! Errors outside the request path (an unknown mutation, for instance) still
//! run the rejected chain, with null data, before the dispatch fails.

use crate::callback::{Callback, Hook};
use crate::context::{ActionContext, ActionResult};
use crate::error::ActionError;
use crate::http::HttpResponse;
use crate::payload::ActionPayload;
use crate::resource::{RequestFn, RequestPayload, ValidateFn};
use serde_json::{Map, Value};
use std::fmt;

/// Whether an action hits the network, and the mutations it commits
#[derive(Clone)]
pub enum ActionKind {
    /// Direct state update, single mutation
    Plain {
        /// Mutation committed with `{data, ...rest}`
        mutation: String,
    },
    /// HTTP request with begin/success/failure mutations
    Networked {
        /// Committed before the request
        begin: String,
        /// Committed with `{...rest, data}` on success
        success: String,
        /// Committed with `{error, msg}` on failure
        failure: String,
        /// Sends the request
        request: RequestFn,
    },
}

impl fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain { mutation } => f
                .debug_struct("ActionKind::Plain")
                .field("mutation", mutation)
                .finish(),
            Self::Networked {
                begin,
                success,
                failure,
                ..
            } => f
                .debug_struct("ActionKind::Networked")
                .field("begin", begin)
                .field("success", success)
                .field("failure", failure)
                .finish_non_exhaustive(),
        }
    }
}

/// Everything fixed at synthesis time for one action
#[derive(Clone)]
pub struct ActionPlan {
    /// Action name, for logs
    pub action: String,
    /// Plain or networked
    pub kind: ActionKind,
    /// Response validator
    pub validate: ValidateFn,
}

impl fmt::Debug for ActionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionPlan")
            .field("action", &self.action)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// How a dispatch failed
enum Failure {
    /// The failure path already ran (mutation committed, rejected chain invoked)
    Settled(ActionError),
    /// Orchestration itself failed; only the rejected chain is still owed
    Internal(ActionError),
}

/// Execute one dispatch
///
/// `payload` must already carry the merged callback and hook chains.
///
/// # Errors
///
/// Returns the request, validation or orchestration error after the
/// failure path has run.
#[tracing::instrument(skip_all, fields(action = %plan.action))]
pub async fn execute(
    ctx: &dyn ActionContext,
    plan: &ActionPlan,
    payload: ActionPayload,
) -> ActionResult {
    let ActionPayload {
        params,
        data,
        meta,
        resolved,
        rejected,
        before,
        after,
        rest,
    } = payload;

    run_hooks(&before, None, None, ctx);

    let outcome = match &plan.kind {
        ActionKind::Plain { mutation } => {
            run_plain(ctx, mutation, data.unwrap_or(Value::Null), &after, &resolved, &rest).await
        },
        ActionKind::Networked {
            begin,
            success,
            failure,
            request,
        } => {
            let call = Call {
                ctx,
                validate: &plan.validate,
                after: &after,
                resolved: &resolved,
                rejected: &rejected,
                rest: &rest,
            };
            call.run(begin, success, failure, request, RequestPayload { params, data, meta })
                .await
        },
    };

    match outcome {
        Ok(response) => Ok(response),
        Err(Failure::Settled(error)) => Err(error),
        Err(Failure::Internal(error)) => {
            tracing::error!(error = %error, "Action failed outside the request");
            invoke_callbacks(ctx, &rejected, &Value::Null, &rest).await;
            Err(error)
        },
    }
}

async fn run_plain(
    ctx: &dyn ActionContext,
    mutation: &str,
    data: Value,
    after: &[Hook],
    resolved: &[Callback],
    rest: &Map<String, Value>,
) -> Result<Option<HttpResponse>, Failure> {
    let mut body = Map::new();
    body.insert("data".to_string(), data.clone());
    body.extend(rest.clone());
    ctx.commit(mutation, Value::Object(body))
        .await
        .map_err(Failure::Internal)?;

    run_hooks(after, None, None, ctx);
    invoke_callbacks(ctx, resolved, &data, rest).await;
    Ok(None)
}

/// Borrowed pieces of a networked dispatch
struct Call<'a> {
    ctx: &'a dyn ActionContext,
    validate: &'a ValidateFn,
    after: &'a [Hook],
    resolved: &'a [Callback],
    rejected: &'a [Callback],
    rest: &'a Map<String, Value>,
}

impl Call<'_> {
    async fn run(
        &self,
        begin: &str,
        success: &str,
        failure: &str,
        request: &RequestFn,
        payload: RequestPayload,
    ) -> Result<Option<HttpResponse>, Failure> {
        self.ctx
            .commit(begin, Value::Null)
            .await
            .map_err(Failure::Internal)?;

        let response = request(payload).await.and_then(|response| {
            if (self.validate)(&response) {
                Ok(response)
            } else {
                Err(ActionError::Rejected(response.data))
            }
        });

        match response {
            Ok(response) => {
                let value = response.data.clone();
                run_hooks(self.after, None, Some(&value), self.ctx);

                let mut body = self.rest.clone();
                body.insert("data".to_string(), value.clone());
                self.ctx
                    .commit(success, Value::Object(body))
                    .await
                    .map_err(Failure::Internal)?;

                invoke_callbacks(self.ctx, self.resolved, &value, self.rest).await;
                Ok(Some(response))
            },
            Err(error) => {
                tracing::warn!(error = %error, "Action rejected");
                run_hooks(self.after, Some(&error), None, self.ctx);

                let reason = error.reason();
                let mut body = Map::new();
                body.insert("error".to_string(), reason.clone());
                body.insert("msg".to_string(), Value::String(error.to_string()));
                self.ctx
                    .commit(failure, Value::Object(body))
                    .await
                    .map_err(Failure::Internal)?;

                invoke_callbacks(self.ctx, self.rejected, &reason, self.rest).await;
                Err(Failure::Settled(error))
            },
        }
    }
}

fn run_hooks(
    hooks: &[Hook],
    error: Option<&ActionError>,
    data: Option<&Value>,
    ctx: &dyn ActionContext,
) {
    for hook in hooks {
        hook.call(error, data, ctx);
    }
}

/// Run a callback chain with `data` and the remaining payload
///
/// The chain is flattened completely first. Dispatches run in chain order
/// and are awaited; their failures are logged and do not propagate.
pub async fn invoke_callbacks(
    ctx: &dyn ActionContext,
    chain: &[Callback],
    data: &Value,
    rest: &Map<String, Value>,
) {
    let callbacks: Vec<Callback> = chain.iter().cloned().flat_map(Callback::flatten).collect();
    for callback in callbacks {
        match callback {
            Callback::Dispatch(action) => {
                let mut payload = Map::new();
                payload.insert("data".to_string(), data.clone());
                payload.extend(rest.clone());
                dispatch_chained(ctx, &action, payload, false).await;
            },
            Callback::Invoke(f) => f(data, rest),
            Callback::DispatchWith {
                action,
                root,
                payload: extra,
            } => {
                let mut payload = Map::new();
                payload.insert("data".to_string(), data.clone());
                payload.extend(extra);
                payload.extend(rest.clone());
                dispatch_chained(ctx, &action, payload, root).await;
            },
            // flattened above
            Callback::Sequence(_) => {},
        }
    }
}

async fn dispatch_chained(
    ctx: &dyn ActionContext,
    action: &str,
    payload: Map<String, Value>,
    root: bool,
) {
    tracing::debug!(chained = action, root, "Dispatching chained action");
    if let Err(error) = ctx
        .dispatch(action, ActionPayload::from_map(payload), root)
        .await
    {
        tracing::warn!(chained = action, error = %error, "Chained action failed");
    }
}
