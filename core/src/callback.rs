//! Callback and hook chains
//!
//! A [`Callback`] is what runs after an action settles: dispatch another
//! action, call a function, or dispatch with extra payload (optionally
//! escaping the module namespace). Callbacks nest through
//! [`Callback::Sequence`] and are flattened before they run.
//!
//! A [`Hook`] is a synchronous lifecycle observer (`before` / `after`)
//! invoked with the error or data of the action and the host context.

use crate::context::ActionContext;
use crate::error::ActionError;
use crate::merge::Mergeable;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Function callback: receives the action's data and the extra payload
pub type CallbackFn = Arc<dyn Fn(&Value, &Map<String, Value>) + Send + Sync>;

/// Lifecycle hook function: receives the error, the data and the context
pub type HookFn =
    Arc<dyn Fn(Option<&ActionError>, Option<&Value>, &dyn ActionContext) + Send + Sync>;

/// A single entry of a resolved/rejected chain
#[derive(Clone)]
pub enum Callback {
    /// Dispatch the named action with `{data, ...rest}`
    Dispatch(String),

    /// Call the function with `(data, rest)`
    Invoke(CallbackFn),

    /// Dispatch `action` with `{data, ...payload, ...rest}`
    DispatchWith {
        /// Action to dispatch
        action: String,
        /// Look the action up globally instead of in the module namespace
        root: bool,
        /// Extra payload merged under the call's own payload
        payload: Map<String, Value>,
    },

    /// Run every callback in order
    Sequence(Vec<Callback>),
}

impl Callback {
    /// Dispatch `action` when the chain runs
    #[must_use]
    pub fn dispatch(action: impl Into<String>) -> Self {
        Self::Dispatch(action.into())
    }

    /// Call `f` when the chain runs
    #[must_use]
    pub fn invoke<F>(f: F) -> Self
    where
        F: Fn(&Value, &Map<String, Value>) + Send + Sync + 'static,
    {
        Self::Invoke(Arc::new(f))
    }

    /// Dispatch `action` with extra payload when the chain runs
    #[must_use]
    pub fn dispatch_with(action: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self::DispatchWith {
            action: action.into(),
            root: false,
            payload,
        }
    }

    /// Resolve the dispatched action from the root namespace
    ///
    /// Has no effect on functions and sequences.
    #[must_use]
    pub fn root(self) -> Self {
        match self {
            Self::Dispatch(action) => Self::DispatchWith {
                action,
                root: true,
                payload: Map::new(),
            },
            Self::DispatchWith {
                action, payload, ..
            } => Self::DispatchWith {
                action,
                root: true,
                payload,
            },
            other => other,
        }
    }

    /// Flatten nested sequences completely, dropping falsy entries
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::Sequence(items) => items.into_iter().flat_map(Self::flatten).collect(),
            other if other.is_falsy() => Vec::new(),
            other => vec![other],
        }
    }
}

impl Mergeable for Callback {
    fn is_falsy(&self) -> bool {
        match self {
            Self::Dispatch(action) | Self::DispatchWith { action, .. } => action.is_empty(),
            Self::Invoke(_) | Self::Sequence(_) => false,
        }
    }

    fn spread(self) -> Vec<Self> {
        match self {
            Self::Sequence(items) => items,
            other => vec![other],
        }
    }
}

impl From<&str> for Callback {
    fn from(action: &str) -> Self {
        Self::Dispatch(action.to_string())
    }
}

impl From<String> for Callback {
    fn from(action: String) -> Self {
        Self::Dispatch(action)
    }
}

impl From<Vec<Callback>> for Callback {
    fn from(items: Vec<Callback>) -> Self {
        Self::Sequence(items)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatch(action) => f.debug_tuple("Callback::Dispatch").field(action).finish(),
            Self::Invoke(_) => write!(f, "Callback::Invoke(<fn>)"),
            Self::DispatchWith {
                action,
                root,
                payload,
            } => f
                .debug_struct("Callback::DispatchWith")
                .field("action", action)
                .field("root", root)
                .field("payload", payload)
                .finish(),
            Self::Sequence(items) => f.debug_tuple("Callback::Sequence").field(items).finish(),
        }
    }
}

/// A `before` / `after` lifecycle hook
///
/// Hooks are synchronous observers. The context is passed for inspection
/// only: the futures returned by its `commit` and `dispatch` cannot be
/// awaited from a hook, so follow-up work belongs in a [`Callback`].
#[derive(Clone)]
pub struct Hook(HookFn);

impl Hook {
    /// Wrap a hook function
    #[must_use]
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&ActionError>, Option<&Value>, &dyn ActionContext) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Run the hook
    pub fn call(&self, error: Option<&ActionError>, data: Option<&Value>, ctx: &dyn ActionContext) {
        (self.0)(error, data, ctx);
    }
}

impl Mergeable for Hook {
    fn is_falsy(&self) -> bool {
        false
    }

    fn spread(self) -> Vec<Self> {
        vec![self]
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook(<fn>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_as_array;

    fn names(chain: &[Callback]) -> Vec<String> {
        chain
            .iter()
            .map(|callback| match callback {
                Callback::Dispatch(action) | Callback::DispatchWith { action, .. } => {
                    action.clone()
                },
                Callback::Invoke(_) => "<fn>".to_string(),
                Callback::Sequence(_) => "<seq>".to_string(),
            })
            .collect()
    }

    #[test]
    fn flatten_is_recursive_and_drops_empty_names() {
        let chain = Callback::Sequence(vec![
            "a".into(),
            Callback::Sequence(vec!["".into(), Callback::Sequence(vec!["b".into()])]),
            Callback::invoke(|_, _| {}),
        ]);
        assert_eq!(names(&chain.flatten()), vec!["a", "b", "<fn>"]);
    }

    #[test]
    fn merge_spreads_one_level() {
        let merged = merge_as_array(
            Callback::Sequence(vec!["global".into()]),
            [Callback::Sequence(vec![
                "local".into(),
                Callback::Sequence(vec!["nested".into()]),
            ])],
        );
        assert_eq!(names(&merged), vec!["global", "local", "<seq>"]);
    }

    struct NoopContext;

    impl ActionContext for NoopContext {
        fn commit<'a>(
            &'a self,
            _mutation: &'a str,
            _payload: Value,
        ) -> crate::context::BoxFuture<'a, Result<(), ActionError>> {
            Box::pin(async { Ok(()) })
        }

        fn dispatch<'a>(
            &'a self,
            _action: &'a str,
            _payload: crate::payload::ActionPayload,
            _root: bool,
        ) -> crate::context::BoxFuture<'a, crate::context::ActionResult> {
            Box::pin(async { Ok(None) })
        }
    }

    #[test]
    fn hook_observes_error_and_data_synchronously() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hook = Hook::new(move |error, data, _ctx| {
            if let Ok(mut seen) = sink.lock() {
                seen.push((error.map(ToString::to_string), data.cloned()));
            }
        });

        let error = ActionError::Transport("down".to_string());
        hook.call(None, Some(&Value::from(1)), &NoopContext);
        hook.call(Some(&error), None, &NoopContext);

        let seen = seen.lock().map(|s| s.clone()).unwrap_or_default();
        assert_eq!(
            seen,
            vec![
                (None, Some(Value::from(1))),
                (Some("transport error: down".to_string()), None),
            ]
        );
    }

    #[test]
    fn root_turns_dispatch_into_dispatch_with() {
        match Callback::dispatch("refresh").root() {
            Callback::DispatchWith { action, root, .. } => {
                assert_eq!(action, "refresh");
                assert!(root);
            },
            other => unreachable!("unexpected callback {other:?}"),
        }
    }
}
