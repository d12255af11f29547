//! Dispatch payload

use crate::callback::{Callback, Hook};
use crate::context::ActionContext;
use crate::error::ActionError;
use serde_json::{Map, Value};

/// Payload accepted by a dispatched action
///
/// `params`, `data` and `meta` feed the HTTP request. `resolved`, `rejected`,
/// `before` and `after` extend the action's own chains for this call only.
/// Everything in `rest` flows unchanged into mutation payloads and callbacks.
///
/// # Example
///
/// ```
/// use rest_store_core::payload::ActionPayload;
/// use serde_json::json;
///
/// let payload = ActionPayload::new()
///     .data(json!({"name": "ada"}))
///     .param("page", json!(2))
///     .with("source", json!("form"));
/// assert_eq!(payload.rest["source"], json!("form"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ActionPayload {
    /// Query parameters
    pub params: Option<Map<String, Value>>,
    /// Request body, or the new value for plain actions
    pub data: Option<Value>,
    /// Metadata handed to path and header resolvers
    pub meta: Option<Map<String, Value>>,
    /// Extra success callbacks
    pub resolved: Vec<Callback>,
    /// Extra failure callbacks
    pub rejected: Vec<Callback>,
    /// Extra `before` hooks
    pub before: Vec<Hook>,
    /// Extra `after` hooks
    pub after: Vec<Hook>,
    /// Remaining payload
    pub rest: Map<String, Value>,
}

impl ActionPayload {
    /// Create an empty payload
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a JSON object into request parts and `rest`
    ///
    /// `params` and `meta` are only picked up when they are objects; any
    /// other value under those keys stays in `rest`.
    #[must_use]
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        let params = take_object(&mut map, "params");
        let meta = take_object(&mut map, "meta");
        let data = map.remove("data");
        Self {
            params,
            data,
            meta,
            rest: map,
            ..Self::default()
        }
    }

    /// Set the request body / plain value
    #[must_use]
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Replace the query parameters
    #[must_use]
    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    /// Add one query parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Replace the call metadata
    #[must_use]
    pub fn meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Add one metadata entry
    #[must_use]
    pub fn meta_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.get_or_insert_with(Map::new).insert(key.into(), value);
        self
    }

    /// Append a success callback for this call
    #[must_use]
    pub fn resolved(mut self, callback: impl Into<Callback>) -> Self {
        self.resolved.push(callback.into());
        self
    }

    /// Append a failure callback for this call
    #[must_use]
    pub fn rejected(mut self, callback: impl Into<Callback>) -> Self {
        self.rejected.push(callback.into());
        self
    }

    /// Append a `before` hook for this call
    #[must_use]
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&ActionError>, Option<&Value>, &dyn ActionContext) + Send + Sync + 'static,
    {
        self.before.push(Hook::new(hook));
        self
    }

    /// Append an `after` hook for this call
    #[must_use]
    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&ActionError>, Option<&Value>, &dyn ActionContext) + Send + Sync + 'static,
    {
        self.after.push(Hook::new(hook));
        self
    }

    /// Add an entry to `rest`
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.rest.insert(key.into(), value);
        self
    }
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Option<Map<String, Value>> {
    match map.remove(key) {
        Some(Value::Object(object)) => Some(object),
        Some(other) => {
            map.insert(key.to_string(), other);
            None
        },
        None => None,
    }
}
