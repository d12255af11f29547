//! Resource definitions
//!
//! A [`ResourceDefinition`] collects named action descriptors against one
//! HTTP API. Each descriptor says which endpoint to call and which state
//! property receives the result; descriptors without a path are *plain*
//! actions that only write state.
//!
//! Once every action is added, [`ResourceDefinition::get_store`] synthesizes
//! the state, mutations and actions for a host store.
//!
//! # Example
//!
//! ```
//! use rest_store_core::resource::{ActionDescriptor, ResourceDefinition, ResourceOptions};
//! use rest_store_core::module::StoreOptions;
//!
//! # fn main() -> Result<(), rest_store_core::error::ConfigError> {
//! let mut users = ResourceDefinition::new(
//!     ResourceOptions::new().base_url("https://api.example.com").namespaced(true),
//! );
//! users
//!     .get(ActionDescriptor::new("listUsers").path("/users").property("users"))?
//!     .get(
//!         ActionDescriptor::new("fetchUser")
//!             .path_with(|meta| format!("/users/{}", meta["id"]))
//!             .property("user"),
//!     )?
//!     .add(ActionDescriptor::new("selectUser").property("selected"))?;
//!
//! let module = users.get_store(StoreOptions::default());
//! assert!(module.mutations.contains_key("FETCH_USER_SUCCEEDED"));
//! assert!(module.mutations.contains_key("SELECT_USER"));
//! # Ok(())
//! # }
//! ```

use crate::callback::{Callback, Hook};
use crate::context::{ActionContext, BoxFuture};
use crate::error::{ActionError, ConfigError};
use crate::http::{HeaderMap, HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestClient};
use crate::merge::{Mergeable, merge_as_array};
use crate::module::{self, StoreModule, StoreOptions};
use crate::naming::{commit_name, dispatch_name};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Metadata handed to path and header resolvers
pub type MetaMap = Map<String, Value>;

/// Response validator: `true` resolves the action, `false` rejects it
pub type ValidateFn = Arc<dyn Fn(&HttpResponse) -> bool + Send + Sync>;

/// Custom state handler run by success/error mutations: `(state, payload)`
pub type StateHandler = Arc<dyn Fn(&mut Value, &Value) + Send + Sync>;

/// Request function of a networked action
pub type RequestFn =
    Arc<dyn Fn(RequestPayload) -> BoxFuture<'static, Result<HttpResponse, ActionError>> + Send + Sync>;

/// A value that is either fixed or computed from metadata at call time
#[derive(Clone)]
pub enum Resolver<T> {
    /// Always the same value
    Static(T),
    /// Computed from the merged metadata
    Dynamic(Arc<dyn Fn(&MetaMap) -> T + Send + Sync>),
}

impl<T: Clone> Resolver<T> {
    /// Produce the value for `meta`
    pub fn resolve(&self, meta: &MetaMap) -> T {
        match self {
            Self::Static(value) => value.clone(),
            Self::Dynamic(f) => f(meta),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Resolver::Static").field(value).finish(),
            Self::Dynamic(_) => write!(f, "Resolver::Dynamic(<fn>)"),
        }
    }
}

/// Metadata: a fixed map or a function producing one per call
#[derive(Clone)]
pub enum Meta {
    /// Fixed metadata
    Static(MetaMap),
    /// Metadata computed on every call
    Dynamic(Arc<dyn Fn() -> MetaMap + Send + Sync>),
}

impl Meta {
    /// Produce the metadata map
    #[must_use]
    pub fn resolve(&self) -> MetaMap {
        match self {
            Self::Static(meta) => meta.clone(),
            Self::Dynamic(f) => f(),
        }
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(meta) => f.debug_tuple("Meta::Static").field(meta).finish(),
            Self::Dynamic(_) => write!(f, "Meta::Dynamic(<fn>)"),
        }
    }
}

/// Initial resource state: a value, or a factory invoked once at construction
#[derive(Clone)]
pub enum InitialState {
    /// Use this value
    Value(Value),
    /// Call this factory
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl fmt::Debug for InitialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("InitialState::Value").field(value).finish(),
            Self::Factory(_) => write!(f, "InitialState::Factory(<fn>)"),
        }
    }
}

/// Per-action request overrides
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Base URL, takes precedence over the resource and client base URLs
    pub base_url: Option<String>,
    /// Headers, overridden by the action's header resolver
    pub headers: HeaderMap,
    /// Query parameters, overridden key by key by call-time params
    pub params: Option<MetaMap>,
    /// Body, overridden key by key by call-time data
    pub data: Option<Value>,
    /// Request timeout
    pub timeout: Option<Duration>,
}

impl RequestConfig {
    /// Create an empty request config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a default query parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Set the default body
    #[must_use]
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Construction options of a [`ResourceDefinition`]
#[derive(Clone, Default)]
pub struct ResourceOptions {
    pub(crate) base_url: Option<String>,
    pub(crate) client: Option<Arc<dyn HttpClient>>,
    pub(crate) namespaced: Option<bool>,
    pub(crate) validate_response: Option<ValidateFn>,
    pub(crate) meta: Option<Meta>,
    pub(crate) resolved: Vec<Callback>,
    pub(crate) rejected: Vec<Callback>,
    pub(crate) state: Option<InitialState>,
}

impl ResourceOptions {
    /// Create empty options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Base URL prepended to relative paths
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// HTTP client (defaults to [`ReqwestClient`])
    #[must_use]
    pub fn client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Whether the synthesized module is namespaced
    #[must_use]
    pub const fn namespaced(mut self, namespaced: bool) -> Self {
        self.namespaced = Some(namespaced);
        self
    }

    /// Replace the response validator (see [`validate_response`])
    #[must_use]
    pub fn validate_response<F>(mut self, validate: F) -> Self
    where
        F: Fn(&HttpResponse) -> bool + Send + Sync + 'static,
    {
        self.validate_response = Some(Arc::new(validate));
        self
    }

    /// Fixed metadata for every action
    #[must_use]
    pub fn meta(mut self, meta: MetaMap) -> Self {
        self.meta = Some(Meta::Static(meta));
        self
    }

    /// Metadata computed on every call
    #[must_use]
    pub fn meta_with<F>(mut self, meta: F) -> Self
    where
        F: Fn() -> MetaMap + Send + Sync + 'static,
    {
        self.meta = Some(Meta::Dynamic(Arc::new(meta)));
        self
    }

    /// Append a default success callback
    #[must_use]
    pub fn resolved(mut self, callback: impl Into<Callback>) -> Self {
        self.resolved.push(callback.into());
        self
    }

    /// Append a default failure callback
    #[must_use]
    pub fn rejected(mut self, callback: impl Into<Callback>) -> Self {
        self.rejected.push(callback.into());
        self
    }

    /// Initial state
    #[must_use]
    pub fn state(mut self, state: Value) -> Self {
        self.state = Some(InitialState::Value(state));
        self
    }

    /// Initial state factory, invoked once when the resource is created
    #[must_use]
    pub fn state_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.state = Some(InitialState::Factory(Arc::new(factory)));
        self
    }
}

impl fmt::Debug for ResourceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceOptions")
            .field("base_url", &self.base_url)
            .field("namespaced", &self.namespaced)
            .field("meta", &self.meta)
            .field("resolved", &self.resolved)
            .field("rejected", &self.rejected)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Description of one action, passed to [`ResourceDefinition::add`]
#[derive(Clone, Default)]
pub struct ActionDescriptor {
    action: String,
    path: Option<Resolver<String>>,
    method: String,
    request_config: RequestConfig,
    property: Option<String>,
    meta: Option<Meta>,
    resolved: Vec<Callback>,
    rejected: Vec<Callback>,
    before: Vec<Hook>,
    after: Vec<Hook>,
    success_handler: Option<StateHandler>,
    error_handler: Option<StateHandler>,
    headers: Option<Resolver<HeaderMap>>,
}

impl ActionDescriptor {
    /// Describe the action named `action` (GET, plain until a path is set)
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            method: HttpMethod::Get.into(),
            ..Self::default()
        }
    }

    /// Fixed request path; makes the action networked
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(Resolver::Static(path.into()));
        self
    }

    /// Request path computed from the merged metadata; makes the action networked
    #[must_use]
    pub fn path_with<F>(mut self, path: F) -> Self
    where
        F: Fn(&MetaMap) -> String + Send + Sync + 'static,
    {
        self.path = Some(Resolver::Dynamic(Arc::new(path)));
        self
    }

    /// HTTP method name (case-insensitive); validated by `add`
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Request overrides
    #[must_use]
    pub fn request_config(mut self, config: RequestConfig) -> Self {
        self.request_config = config;
        self
    }

    /// State property that receives the response data
    #[must_use]
    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Fixed action metadata, merged over the resource metadata
    #[must_use]
    pub fn meta(mut self, meta: MetaMap) -> Self {
        self.meta = Some(Meta::Static(meta));
        self
    }

    /// Action metadata computed on every call
    #[must_use]
    pub fn meta_with<F>(mut self, meta: F) -> Self
    where
        F: Fn() -> MetaMap + Send + Sync + 'static,
    {
        self.meta = Some(Meta::Dynamic(Arc::new(meta)));
        self
    }

    /// Append a success callback
    #[must_use]
    pub fn resolved(mut self, callback: impl Into<Callback>) -> Self {
        self.resolved.push(callback.into());
        self
    }

    /// Append a failure callback
    #[must_use]
    pub fn rejected(mut self, callback: impl Into<Callback>) -> Self {
        self.rejected.push(callback.into());
        self
    }

    /// Append a hook run before the action starts
    #[must_use]
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&ActionError>, Option<&Value>, &dyn ActionContext) + Send + Sync + 'static,
    {
        self.before.push(Hook::new(hook));
        self
    }

    /// Append a hook run once the request settles
    #[must_use]
    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&ActionError>, Option<&Value>, &dyn ActionContext) + Send + Sync + 'static,
    {
        self.after.push(Hook::new(hook));
        self
    }

    /// Replace the default success state update
    #[must_use]
    pub fn success_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut Value, &Value) + Send + Sync + 'static,
    {
        self.success_handler = Some(Arc::new(handler));
        self
    }

    /// Replace the default error state update
    #[must_use]
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut Value, &Value) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Fixed request headers
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(Resolver::Static(headers));
        self
    }

    /// Request headers computed from the merged metadata
    #[must_use]
    pub fn headers_with<F>(mut self, headers: F) -> Self
    where
        F: Fn(&MetaMap) -> HeaderMap + Send + Sync + 'static,
    {
        self.headers = Some(Resolver::Dynamic(Arc::new(headers)));
        self
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("action", &self.action)
            .field("path", &self.path)
            .field("method", &self.method)
            .field("property", &self.property)
            .finish_non_exhaustive()
    }
}

/// Request inputs supplied at dispatch time
#[derive(Debug, Clone, Default)]
pub struct RequestPayload {
    /// Query parameters
    pub params: Option<MetaMap>,
    /// Body
    pub data: Option<Value>,
    /// Call metadata
    pub meta: Option<MetaMap>,
}

/// An action registered on a resource, with its derived names
#[derive(Clone)]
pub struct ResourceAction {
    pub(crate) name: String,
    pub(crate) dispatch_name: String,
    pub(crate) commit_name: String,
    pub(crate) method: HttpMethod,
    pub(crate) property: Option<String>,
    pub(crate) success_handler: Option<StateHandler>,
    pub(crate) error_handler: Option<StateHandler>,
    pub(crate) resolved: Vec<Callback>,
    pub(crate) rejected: Vec<Callback>,
    pub(crate) before: Vec<Hook>,
    pub(crate) after: Vec<Hook>,
    pub(crate) request: Option<RequestFn>,
}

impl ResourceAction {
    /// Action name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name the action is dispatched under
    #[must_use]
    pub fn dispatch_name(&self) -> &str {
        &self.dispatch_name
    }

    /// Base mutation name
    #[must_use]
    pub fn commit_name(&self) -> &str {
        &self.commit_name
    }

    /// HTTP method
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Bound state property
    #[must_use]
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// Plain actions have no path and never hit the network
    #[must_use]
    pub const fn is_plain(&self) -> bool {
        self.request.is_none()
    }

    /// Success chain (resource defaults first)
    #[must_use]
    pub fn resolved(&self) -> &[Callback] {
        &self.resolved
    }

    /// Failure chain (resource defaults first)
    #[must_use]
    pub fn rejected(&self) -> &[Callback] {
        &self.rejected
    }

    /// Send the request for this action
    ///
    /// Returns `None` for plain actions.
    pub fn request(
        &self,
        payload: RequestPayload,
    ) -> Option<BoxFuture<'static, Result<HttpResponse, ActionError>>> {
        self.request.as_ref().map(|request| request(payload))
    }
}

impl fmt::Debug for ResourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceAction")
            .field("name", &self.name)
            .field("commit_name", &self.commit_name)
            .field("method", &self.method)
            .field("property", &self.property)
            .field("plain", &self.is_plain())
            .finish_non_exhaustive()
    }
}

/// A set of REST actions sharing a base URL, client and defaults
#[derive(Clone)]
pub struct ResourceDefinition {
    base_url: Option<String>,
    client: Arc<dyn HttpClient>,
    namespaced: bool,
    validate_response: ValidateFn,
    meta: Option<Meta>,
    resolved: Vec<Callback>,
    rejected: Vec<Callback>,
    state: Value,
    actions: Vec<ResourceAction>,
}

impl ResourceDefinition {
    /// Create a resource from `options`
    ///
    /// A state factory is invoked here, once.
    #[must_use]
    pub fn new(options: ResourceOptions) -> Self {
        let state = match options.state {
            Some(InitialState::Value(state)) => state,
            Some(InitialState::Factory(factory)) => factory(),
            None => Value::Object(Map::new()),
        };
        Self {
            base_url: options.base_url,
            client: options
                .client
                .unwrap_or_else(|| Arc::new(ReqwestClient::new())),
            namespaced: options.namespaced.unwrap_or(false),
            validate_response: options
                .validate_response
                .unwrap_or_else(|| Arc::new(validate_response)),
            meta: options.meta,
            resolved: options.resolved,
            rejected: options.rejected,
            state,
            actions: Vec::new(),
        }
    }

    /// Register an action
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingAction`] if the descriptor has no name
    /// - [`ConfigError::DuplicateAction`] if the name is already registered;
    ///   the existing action is left untouched
    /// - [`ConfigError::CommitNameConflict`] if another action already
    ///   derives the same mutation name (`fetchUser` and `fetch_user`)
    /// - [`ConfigError::InvalidMethod`] if a path is set and the method is
    ///   not one of get/delete/head/options/post/put/patch
    pub fn add(&mut self, descriptor: ActionDescriptor) -> Result<&mut Self, ConfigError> {
        let ActionDescriptor {
            action,
            path,
            method,
            request_config,
            property,
            meta,
            resolved,
            rejected,
            before,
            after,
            success_handler,
            error_handler,
            headers,
        } = descriptor;

        if action.is_empty() {
            return Err(ConfigError::MissingAction);
        }
        if self.action(&action).is_some() {
            return Err(ConfigError::DuplicateAction(action));
        }
        let commit = commit_name(&action);
        if let Some(existing) = self.actions.iter().find(|a| a.commit_name == commit) {
            return Err(ConfigError::CommitNameConflict {
                existing: existing.name.clone(),
                action,
                commit,
            });
        }
        let method = match (method.parse::<HttpMethod>(), &path) {
            (Ok(method), _) => method,
            // plain actions never send a request
            (Err(_), None) => HttpMethod::Get,
            (Err(error), Some(_)) => {
                return Err(ConfigError::InvalidMethod {
                    action,
                    method: error.0,
                    allowed: HttpMethod::allowed(),
                });
            },
        };

        let request = path.map(|path| {
            request_fn(RequestTemplate {
                action: action.clone(),
                method,
                client: Arc::clone(&self.client),
                base_url: self.base_url.clone(),
                resource_meta: self.meta.clone(),
                action_meta: meta,
                config: request_config,
                path,
                headers,
            })
        });

        let resolved = merge_as_array(
            Callback::Sequence(self.resolved.clone()),
            [Callback::Sequence(resolved)],
        );
        let rejected = merge_as_array(
            Callback::Sequence(self.rejected.clone()),
            [Callback::Sequence(rejected)],
        );

        let resource_action = ResourceAction {
            dispatch_name: dispatch_name(&action),
            commit_name: commit,
            name: action,
            method,
            property,
            success_handler,
            error_handler,
            resolved,
            rejected,
            before,
            after,
            request,
        };
        tracing::debug!(
            action = %resource_action.name,
            commit = %resource_action.commit_name,
            plain = resource_action.is_plain(),
            "Registered resource action"
        );
        self.actions.push(resource_action);
        Ok(self)
    }

    /// Register several actions in order, stopping at the first error
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add). Actions before the failing one stay registered.
    pub fn add_all<I>(&mut self, descriptors: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = ActionDescriptor>,
    {
        for descriptor in descriptors {
            self.add(descriptor)?;
        }
        Ok(self)
    }

    /// Register a GET action
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add).
    pub fn get(&mut self, descriptor: ActionDescriptor) -> Result<&mut Self, ConfigError> {
        self.add(descriptor.method(HttpMethod::Get))
    }

    /// Register a DELETE action
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add).
    pub fn delete(&mut self, descriptor: ActionDescriptor) -> Result<&mut Self, ConfigError> {
        self.add(descriptor.method(HttpMethod::Delete))
    }

    /// Register a HEAD action
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add).
    pub fn head(&mut self, descriptor: ActionDescriptor) -> Result<&mut Self, ConfigError> {
        self.add(descriptor.method(HttpMethod::Head))
    }

    /// Register an OPTIONS action
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add).
    pub fn options(&mut self, descriptor: ActionDescriptor) -> Result<&mut Self, ConfigError> {
        self.add(descriptor.method(HttpMethod::Options))
    }

    /// Register a POST action
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add).
    pub fn post(&mut self, descriptor: ActionDescriptor) -> Result<&mut Self, ConfigError> {
        self.add(descriptor.method(HttpMethod::Post))
    }

    /// Register a PUT action
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add).
    pub fn put(&mut self, descriptor: ActionDescriptor) -> Result<&mut Self, ConfigError> {
        self.add(descriptor.method(HttpMethod::Put))
    }

    /// Register a PATCH action
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add).
    pub fn patch(&mut self, descriptor: ActionDescriptor) -> Result<&mut Self, ConfigError> {
        self.add(descriptor.method(HttpMethod::Patch))
    }

    /// Synthesize the store module for this resource
    #[must_use]
    pub fn get_store(&self, options: StoreOptions) -> StoreModule {
        module::synthesize(self, &options)
    }

    /// Look up an action by name
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&ResourceAction> {
        self.actions.iter().find(|action| action.name == name)
    }

    /// Registered actions in insertion order
    #[must_use]
    pub fn actions(&self) -> &[ResourceAction] {
        &self.actions
    }

    /// Initial state snapshot
    #[must_use]
    pub const fn state(&self) -> &Value {
        &self.state
    }

    /// Whether synthesized modules are namespaced
    #[must_use]
    pub const fn namespaced(&self) -> bool {
        self.namespaced
    }

    /// Resource base URL
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Response validator
    #[must_use]
    pub fn validator(&self) -> ValidateFn {
        Arc::clone(&self.validate_response)
    }
}

impl fmt::Debug for ResourceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDefinition")
            .field("base_url", &self.base_url)
            .field("namespaced", &self.namespaced)
            .field("state", &self.state)
            .field("actions", &self.actions)
            .finish_non_exhaustive()
    }
}

/// Default response validator
///
/// Accepts a response when the status is 200 and, if the body is an object
/// carrying a truthy `code`, that code is 200 as well (either a number or a
/// numeric string).
#[must_use]
pub fn validate_response(response: &HttpResponse) -> bool {
    let server_ok = match response.data.get("code") {
        Some(code) if !code.is_falsy() => parse_code(code) == Some(200),
        _ => true,
    };
    response.status == 200 && server_ok
}

#[allow(clippy::cast_possible_truncation)] // codes are small integers
fn parse_code(code: &Value) -> Option<i64> {
    match code {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim_start();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|n| sign * n)
        },
        _ => None,
    }
}

/// Everything a networked action needs to build its request
struct RequestTemplate {
    action: String,
    method: HttpMethod,
    client: Arc<dyn HttpClient>,
    base_url: Option<String>,
    resource_meta: Option<Meta>,
    action_meta: Option<Meta>,
    config: RequestConfig,
    path: Resolver<String>,
    headers: Option<Resolver<HeaderMap>>,
}

impl RequestTemplate {
    fn build(&self, payload: RequestPayload) -> HttpRequest {
        let mut meta = self
            .resource_meta
            .as_ref()
            .map(Meta::resolve)
            .unwrap_or_default();
        if let Some(action_meta) = &self.action_meta {
            meta.extend(action_meta.resolve());
        }
        if let Some(call_meta) = payload.meta {
            meta.extend(call_meta);
        }

        let mut headers = self.config.headers.clone();
        if let Some(resolver) = &self.headers {
            headers.extend(resolver.resolve(&meta));
        }

        let params = match (self.config.params.clone(), payload.params) {
            (Some(mut base), Some(call)) => {
                base.extend(call);
                Some(base)
            },
            (base, call) => call.or(base),
        };

        let data = match (self.config.data.clone(), payload.data) {
            (Some(Value::Object(mut base)), Some(Value::Object(call))) => {
                base.extend(call);
                Some(Value::Object(base))
            },
            (base, call) => call.or(base),
        };

        let base_url = self
            .config
            .base_url
            .clone()
            .or_else(|| self.base_url.clone())
            .or_else(|| self.client.default_base_url().map(str::to_string));

        HttpRequest {
            method: self.method,
            base_url,
            url: self.path.resolve(&meta),
            params,
            data,
            headers,
            timeout: self.config.timeout,
        }
    }

    async fn send(&self, payload: RequestPayload) -> Result<HttpResponse, ActionError> {
        let request = self.build(payload);
        tracing::debug!(
            action = %self.action,
            method = %request.method,
            url = %request.full_url(),
            "Sending request"
        );

        let result = self.client.request(request).await;
        let outcome = match &result {
            Ok(response) => {
                tracing::debug!(action = %self.action, status = response.status, "Request completed");
                "completed"
            },
            Err(error) => {
                tracing::warn!(action = %self.action, error = %error, "Request failed");
                "failed"
            },
        };
        metrics::counter!(
            "store.requests",
            "action" => self.action.clone(),
            "outcome" => outcome
        )
        .increment(1);

        result.map_err(ActionError::from)
    }
}

fn request_fn(template: RequestTemplate) -> RequestFn {
    let template = Arc::new(template);
    Arc::new(move |payload| {
        let template = Arc::clone(&template);
        Box::pin(async move { template.send(payload).await })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingClient {
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl HttpClient for CapturingClient {
        fn default_base_url(&self) -> Option<&str> {
            Some("https://client.example.com")
        }

        fn request(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, HttpError>> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }
            Box::pin(async { Ok(HttpResponse::new(200, json!({"ok": true}))) })
        }
    }

    fn object(value: Value) -> MetaMap {
        value.as_object().cloned().unwrap_or_default()
    }

    fn last_request(client: &CapturingClient) -> HttpRequest {
        client
            .requests
            .lock()
            .ok()
            .and_then(|requests| requests.last().cloned())
            .unwrap_or_else(|| HttpRequest::new(HttpMethod::Get, "<none>"))
    }

    #[test]
    fn add_rejects_missing_name() {
        let mut resource = ResourceDefinition::new(ResourceOptions::new());
        let result = resource.add(ActionDescriptor::new(""));
        assert_eq!(result.err(), Some(ConfigError::MissingAction));
    }

    #[test]
    fn add_rejects_duplicates_and_keeps_first() {
        let mut resource = ResourceDefinition::new(ResourceOptions::new());
        assert!(
            resource
                .add(ActionDescriptor::new("fetchUser").path("/u").property("user"))
                .is_ok()
        );

        let result = resource.add(ActionDescriptor::new("fetchUser").property("other"));
        assert_eq!(
            result.err(),
            Some(ConfigError::DuplicateAction("fetchUser".to_string()))
        );

        let action = resource.action("fetchUser");
        assert_eq!(action.and_then(ResourceAction::property), Some("user"));
        assert_eq!(action.map(ResourceAction::is_plain), Some(false));
        assert_eq!(resource.actions().len(), 1);
    }

    #[test]
    fn add_rejects_unknown_method_with_path() {
        let mut resource = ResourceDefinition::new(ResourceOptions::new());
        let result = resource.add(ActionDescriptor::new("trace").path("/t").method("trace"));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidMethod { method, .. }) if method == "trace"
        ));
    }

    #[test]
    fn plain_actions_ignore_method() {
        let mut resource = ResourceDefinition::new(ResourceOptions::new());
        assert!(resource.add(ActionDescriptor::new("select").method("bogus")).is_ok());
        assert_eq!(resource.action("select").map(ResourceAction::is_plain), Some(true));
    }

    #[test]
    fn shorthand_sets_method() {
        let mut resource = ResourceDefinition::new(ResourceOptions::new());
        assert!(resource.post(ActionDescriptor::new("createUser").path("/users")).is_ok());
        let action = resource.action("createUser");
        assert_eq!(action.map(ResourceAction::method), Some(HttpMethod::Post));
        assert_eq!(action.map(ResourceAction::commit_name), Some("CREATE_USER"));
    }

    #[test]
    fn resource_callbacks_come_first() {
        let mut resource = ResourceDefinition::new(
            ResourceOptions::new().resolved("notify").rejected("report"),
        );
        assert!(
            resource
                .add(ActionDescriptor::new("load").path("/l").resolved("track"))
                .is_ok()
        );
        let action = resource.action("load");
        assert_eq!(action.map(|a| a.resolved().len()), Some(2));
        assert_eq!(action.map(|a| a.rejected().len()), Some(1));
    }

    #[test]
    fn state_factory_is_invoked_eagerly() {
        let resource =
            ResourceDefinition::new(ResourceOptions::new().state_with(|| json!({"users": []})));
        assert_eq!(resource.state(), &json!({"users": []}));
    }

    #[test]
    fn default_validator() {
        assert!(validate_response(&HttpResponse::new(200, json!({"value": 1}))));
        assert!(validate_response(&HttpResponse::new(200, json!({"code": 200}))));
        assert!(validate_response(&HttpResponse::new(200, json!({"code": "200"}))));
        assert!(validate_response(&HttpResponse::new(200, json!({"code": 0}))));
        assert!(validate_response(&HttpResponse::new(200, Value::Null)));
        assert!(!validate_response(&HttpResponse::new(200, json!({"code": 500}))));
        assert!(!validate_response(&HttpResponse::new(201, json!({}))));
        assert!(!validate_response(&HttpResponse::new(404, json!({"code": 200}))));
    }

    #[tokio::test]
    async fn request_merges_config_meta_and_call_values() {
        let client = Arc::new(CapturingClient::default());
        let mut resource = ResourceDefinition::new(
            ResourceOptions::new()
                .client(Arc::clone(&client) as Arc<dyn HttpClient>)
                .base_url("https://api.example.com")
                .meta(object(json!({"version": "v1", "id": 0}))),
        );
        let descriptor = ActionDescriptor::new("updateUser")
            .path_with(|meta| format!("/{}/users/{}", meta["version"].as_str().unwrap_or(""), meta["id"]))
            .method("put")
            .request_config(
                RequestConfig::new()
                    .header("Accept", "application/json")
                    .header("X-Trace", "config")
                    .param("expand", json!("roles"))
                    .param("page", json!(1))
                    .data(json!({"active": true, "name": "unset"})),
            )
            .headers_with(|meta| {
                HeaderMap::from([("X-Trace".to_string(), format!("user-{}", meta["id"]))])
            });
        assert!(resource.add(descriptor).is_ok());

        let payload = RequestPayload {
            params: Some(object(json!({"page": 2}))),
            data: Some(json!({"name": "ada"})),
            meta: Some(object(json!({"id": 7}))),
        };
        let response = resource
            .action("updateUser")
            .and_then(|action| action.request(payload));
        assert!(matches!(response, Some(_)));
        if let Some(response) = response {
            assert!(response.await.is_ok());
        }

        let request = last_request(&client);
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.full_url(), "https://api.example.com/v1/users/7");
        assert_eq!(request.params, Some(object(json!({"expand": "roles", "page": 2}))));
        assert_eq!(request.data, Some(json!({"active": true, "name": "ada"})));
        assert_eq!(request.headers["Accept"], "application/json");
        assert_eq!(request.headers["X-Trace"], "user-7");
    }

    #[tokio::test]
    async fn request_config_base_url_wins_then_client_default() {
        let client = Arc::new(CapturingClient::default());
        let mut resource = ResourceDefinition::new(
            ResourceOptions::new().client(Arc::clone(&client) as Arc<dyn HttpClient>),
        );
        assert!(
            resource
                .add(ActionDescriptor::new("a").path("/a"))
                .and_then(|r| r.add(
                    ActionDescriptor::new("b")
                        .path("/b")
                        .request_config(RequestConfig::new().base_url("https://cfg.example.com"))
                ))
                .is_ok()
        );

        for name in ["a", "b"] {
            if let Some(fut) = resource
                .action(name)
                .and_then(|action| action.request(RequestPayload::default()))
            {
                assert!(fut.await.is_ok());
            }
        }
        let requests = client.requests.lock().map(|r| r.clone()).unwrap_or_default();
        assert_eq!(requests[0].full_url(), "https://client.example.com/a");
        assert_eq!(requests[1].full_url(), "https://cfg.example.com/b");
    }

    #[test]
    fn add_all_registers_in_order_and_stops_at_duplicate() {
        let mut resource = ResourceDefinition::new(ResourceOptions::new());
        let result = resource.add_all([
            ActionDescriptor::new("load").path("/items"),
            ActionDescriptor::new("clear").property("items"),
            ActionDescriptor::new("load").path("/other"),
            ActionDescriptor::new("never"),
        ]);

        assert_eq!(
            result.err(),
            Some(ConfigError::DuplicateAction("load".to_string()))
        );
        let names: Vec<&str> = resource.actions().iter().map(ResourceAction::name).collect();
        assert_eq!(names, vec!["load", "clear"]);
        assert!(resource.action("never").is_none());
    }

    #[test]
    fn add_rejects_conflicting_commit_names() {
        let mut resource = ResourceDefinition::new(ResourceOptions::new());
        assert!(resource.add(ActionDescriptor::new("fetchUser").path("/u")).is_ok());

        let result = resource.add(ActionDescriptor::new("fetch_user").path("/u"));

        assert_eq!(
            result.err(),
            Some(ConfigError::CommitNameConflict {
                action: "fetch_user".to_string(),
                existing: "fetchUser".to_string(),
                commit: "FETCH_USER".to_string(),
            })
        );
        assert_eq!(resource.actions().len(), 1);
    }

    #[test]
    fn every_shorthand_forces_its_method() {
        let mut resource = ResourceDefinition::new(ResourceOptions::new());
        // a conflicting method on the descriptor is overridden
        let base = |name: &str| ActionDescriptor::new(name).path("/x").method("post");
        let added = resource
            .get(base("viaGet"))
            .and_then(|r| r.delete(base("viaDelete")))
            .and_then(|r| r.head(base("viaHead")))
            .and_then(|r| r.options(base("viaOptions")))
            .and_then(|r| r.put(base("viaPut")))
            .and_then(|r| r.patch(base("viaPatch")))
            .map(|_| ());
        assert_eq!(added, Ok(()));

        for (name, method) in [
            ("viaGet", HttpMethod::Get),
            ("viaDelete", HttpMethod::Delete),
            ("viaHead", HttpMethod::Head),
            ("viaOptions", HttpMethod::Options),
            ("viaPut", HttpMethod::Put),
            ("viaPatch", HttpMethod::Patch),
        ] {
            assert_eq!(
                resource.action(name).map(ResourceAction::method),
                Some(method),
                "{name}"
            );
        }
    }

    #[test]
    fn static_headers_and_action_meta_precedence() {
        let client = Arc::new(CapturingClient::default());
        let mut resource = ResourceDefinition::new(
            ResourceOptions::new()
                .client(Arc::clone(&client) as Arc<dyn HttpClient>)
                .meta(object(json!({"v": "v1", "id": 0, "scope": "resource"}))),
        );
        let descriptor = ActionDescriptor::new("patchItem")
            .path_with(|meta| {
                format!(
                    "/{}/items/{}?scope={}",
                    meta["v"].as_str().unwrap_or(""),
                    meta["id"],
                    meta["scope"].as_str().unwrap_or("")
                )
            })
            .meta(object(json!({"v": "v2", "id": 1})))
            .request_config(
                RequestConfig::new()
                    .header("X-A", "config")
                    .header("X-B", "config"),
            )
            .headers(HeaderMap::from([("X-A".to_string(), "1".to_string())]));
        assert!(resource.patch(descriptor).is_ok());

        let payload = RequestPayload {
            meta: Some(object(json!({"id": 9}))),
            ..RequestPayload::default()
        };
        let sent = resource
            .action("patchItem")
            .and_then(|action| action.request(payload))
            .map(tokio_test::block_on);
        assert!(matches!(sent, Some(Ok(_))));

        let request = last_request(&client);
        assert_eq!(request.method, HttpMethod::Patch);
        assert_eq!(request.url, "/v2/items/9?scope=resource");
        assert_eq!(
            request.headers,
            HeaderMap::from([
                ("X-A".to_string(), "1".to_string()),
                ("X-B".to_string(), "config".to_string()),
            ])
        );
    }
}
