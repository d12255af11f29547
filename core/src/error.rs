//! Error types for resource configuration and action execution.
//!
//! Two families exist:
//!
//! - [`ConfigError`]: raised while a resource is being defined. These are
//!   programming mistakes and should abort setup.
//! - [`ActionError`]: raised per dispatch. These are expected at runtime and
//!   are mirrored into the module's `error` state.

use serde_json::Value;
use thiserror::Error;

/// Errors raised while adding actions to a [`ResourceDefinition`](crate::resource::ResourceDefinition)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The descriptor has no action name
    #[error("\"action\" property must be set")]
    MissingAction,

    /// The action name is already registered on this resource
    #[error("illegal action set: \"{0}\" has been used")]
    DuplicateAction(String),

    /// Two action names derive the same mutation name
    #[error("illegal action set: \"{action}\" and \"{existing}\" both commit \"{commit}\"")]
    CommitNameConflict {
        /// Action being added
        action: String,
        /// Action already registered
        existing: String,
        /// Shared mutation name
        commit: String,
    },

    /// A networked action uses a method outside the supported set
    #[error(
        "illegal HTTP method set for \"{action}\": following methods are allowed: {allowed}. You chose \"{method}\""
    )]
    InvalidMethod {
        /// Action being added
        action: String,
        /// Method that was requested
        method: String,
        /// Comma separated list of supported methods
        allowed: String,
    },
}

/// Errors produced by the HTTP client
#[derive(Error, Debug, Clone)]
pub enum HttpError {
    /// The request could not be built (bad URL, bad header value, ...)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request was sent but no response was received
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The response body could not be read
    #[error("failed to read response: {0}")]
    ResponseReadFailed(String),
}

/// Errors produced while dispatching an action
///
/// `ActionError` is `Clone` so the same failure can be handed to hooks,
/// stored in state and returned to the caller.
#[derive(Error, Debug, Clone)]
pub enum ActionError {
    /// The HTTP client failed before a response was available
    #[error("transport error: {0}")]
    Transport(String),

    /// The response failed validation; carries the response body
    #[error("response rejected: {0}")]
    Rejected(Value),

    /// No action is registered under this type
    #[error("unknown action type: {0}")]
    UnknownAction(String),

    /// No mutation is registered under this type
    #[error("unknown mutation type: {0}")]
    UnknownMutation(String),
}

impl ActionError {
    /// The JSON value describing this failure
    ///
    /// For rejected responses this is the response body, otherwise the
    /// error message as a string.
    #[must_use]
    pub fn reason(&self) -> Value {
        match self {
            Self::Rejected(body) => body.clone(),
            other => Value::String(other.to_string()),
        }
    }
}

impl From<HttpError> for ActionError {
    fn from(error: HttpError) -> Self {
        Self::Transport(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejected_reason_is_response_body() {
        let error = ActionError::Rejected(json!({"code": 500}));
        assert_eq!(error.reason(), json!({"code": 500}));
    }

    #[test]
    fn transport_reason_is_message() {
        let error: ActionError = HttpError::RequestFailed("connection refused".into()).into();
        assert_eq!(
            error.reason(),
            json!("transport error: request failed: connection refused")
        );
    }
}
