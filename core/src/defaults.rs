//! Shared resource defaults
//!
//! [`ResourceDefaults`] holds options shared by several resources (an API
//! base URL, a client, common metadata, app-wide callbacks). It is an
//! explicit value: create one at startup and derive every resource from it.

use crate::callback::Callback;
use crate::merge::merge_as_array;
use crate::resource::{Meta, ResourceDefinition, ResourceOptions};
use std::sync::Arc;

/// Defaults applied to every resource created through them
///
/// # Example
///
/// ```
/// use rest_store_core::defaults::ResourceDefaults;
/// use rest_store_core::resource::ResourceOptions;
///
/// let defaults = ResourceDefaults::new(
///     ResourceOptions::new()
///         .base_url("https://api.example.com")
///         .rejected("reportError"),
/// );
/// let users = defaults.resource(ResourceOptions::new().namespaced(true));
/// assert_eq!(users.base_url(), Some("https://api.example.com"));
/// assert!(users.namespaced());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResourceDefaults {
    options: ResourceOptions,
}

impl ResourceDefaults {
    /// Wrap shared options
    #[must_use]
    pub const fn new(options: ResourceOptions) -> Self {
        Self { options }
    }

    /// The shared options
    #[must_use]
    pub const fn options(&self) -> &ResourceOptions {
        &self.options
    }

    /// Fill unset fields of `options` from the defaults
    ///
    /// - metadata maps are merged, `options` winning per key
    /// - callback chains are concatenated, defaults first
    /// - every other field is inherited only when `options` leaves it unset
    #[must_use]
    pub fn apply(&self, options: ResourceOptions) -> ResourceOptions {
        let defaults = self.options.clone();
        ResourceOptions {
            base_url: options.base_url.or(defaults.base_url),
            client: options.client.or(defaults.client),
            namespaced: options.namespaced.or(defaults.namespaced),
            validate_response: options.validate_response.or(defaults.validate_response),
            meta: merge_meta(defaults.meta, options.meta),
            resolved: merge_as_array(
                Callback::Sequence(defaults.resolved),
                [Callback::Sequence(options.resolved)],
            ),
            rejected: merge_as_array(
                Callback::Sequence(defaults.rejected),
                [Callback::Sequence(options.rejected)],
            ),
            state: options.state.or(defaults.state),
        }
    }

    /// Create a resource from `options` completed with the defaults
    #[must_use]
    pub fn resource(&self, options: ResourceOptions) -> ResourceDefinition {
        ResourceDefinition::new(self.apply(options))
    }
}

fn merge_meta(defaults: Option<Meta>, meta: Option<Meta>) -> Option<Meta> {
    match (defaults, meta) {
        (None, meta) | (meta, None) => meta,
        (Some(Meta::Static(mut base)), Some(Meta::Static(extra))) => {
            base.extend(extra);
            Some(Meta::Static(base))
        },
        (Some(base), Some(extra)) => Some(Meta::Dynamic(Arc::new(move || {
            let mut meta = base.resolve();
            meta.extend(extra.resolve());
            meta
        }))),
    }
}
