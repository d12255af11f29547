//! Error types for the store runtime.

use thiserror::Error;

/// Errors raised while assembling a [`Store`](crate::Store)
///
/// Registration conflicts are programming mistakes, so they are reported
/// from [`StoreBuilder::build`](crate::StoreBuilder::build) rather than at
/// dispatch time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Two modules were registered under the same name
    #[error("module \"{0}\" is already registered")]
    DuplicateModule(String),

    /// Two modules register an action under the same type
    #[error("action type \"{action}\" registered by both \"{first}\" and \"{second}\"")]
    DuplicateAction {
        /// Fully qualified action type
        action: String,
        /// Module that registered it first
        first: String,
        /// Module that tried to register it again
        second: String,
    },

    /// Two modules register a mutation under the same type
    #[error("mutation type \"{mutation}\" registered by both \"{first}\" and \"{second}\"")]
    DuplicateMutation {
        /// Fully qualified mutation type
        mutation: String,
        /// Module that registered it first
        first: String,
        /// Module that tried to register it again
        second: String,
    },
}
