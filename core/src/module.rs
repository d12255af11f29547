//! Store synthesis
//!
//! Turns a [`ResourceDefinition`] into a [`StoreModule`]: the initial state,
//! the mutations keyed by their derived names, and one dispatchable action
//! per resource action.
//!
//! For a networked action `fetchUser` bound to property `user`:
//!
//! | Mutation              | Course state                          | Property                    |
//! |-----------------------|---------------------------------------|-----------------------------|
//! | `FETCH_USER`          | `pending.user = true`, `error.user = null` | unchanged              |
//! | `FETCH_USER_SUCCEEDED`| `pending.user = false`, `error.user = null` | `user = payload.data` |
//! | `FETCH_USER_FAILED`   | `pending.user = false`, `error.user = payload` | optionally reset   |
//!
//! A plain action `selectUser` gets a single `SELECT_USER` mutation that
//! writes `payload.data` to its property.

use crate::callback::Callback;
use crate::context::{ActionContext, ActionResult, BoxFuture};
use crate::executor::{self, ActionKind, ActionPlan};
use crate::merge::{compact, merge_as_array, merge_store};
use crate::naming::suffixed;
use crate::payload::ActionPayload;
use crate::resource::{ResourceAction, ResourceDefinition, StateHandler};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Mutation function: `(module state, payload)`
pub type MutationFn = Arc<dyn Fn(&mut Value, &Value) + Send + Sync>;

/// Action function: `(context, payload) -> outcome`
pub type ActionFn =
    Arc<dyn Fn(Arc<dyn ActionContext>, ActionPayload) -> BoxFuture<'static, ActionResult> + Send + Sync>;

/// Store synthesis options
///
/// Deserializable so it can live in configuration files; missing fields take
/// their defaults.
///
/// ```
/// use rest_store_core::module::StoreOptions;
///
/// let options = StoreOptions::from_json(r#"{"error_suffix": "ERROR"}"#).unwrap_or_default();
/// assert_eq!(options.success_suffix, "SUCCEEDED");
/// assert_eq!(options.error_suffix, "ERROR");
/// assert!(options.course_state);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Suffix of the success mutation
    pub success_suffix: String,
    /// Suffix of the failure mutation
    pub error_suffix: String,
    /// Produce the state as a factory instead of a value
    pub create_state_fn: bool,
    /// Track `pending` / `error` per networked property
    pub course_state: bool,
    /// Reset the property to its initial value when a request fails
    pub reset_to_default_when_error: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            success_suffix: "SUCCEEDED".to_string(),
            error_suffix: "FAILED".to_string(),
            create_state_fn: false,
            course_state: true,
            reset_to_default_when_error: false,
        }
    }
}

impl StoreOptions {
    /// Parse options from JSON
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the input is not a valid options
    /// object.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Set the success suffix
    #[must_use]
    pub fn with_success_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.success_suffix = suffix.into();
        self
    }

    /// Set the error suffix
    #[must_use]
    pub fn with_error_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.error_suffix = suffix.into();
        self
    }

    /// Produce the state as a factory
    #[must_use]
    pub const fn with_state_fn(mut self, enabled: bool) -> Self {
        self.create_state_fn = enabled;
        self
    }

    /// Enable or disable `pending` / `error` tracking
    #[must_use]
    pub const fn with_course_state(mut self, enabled: bool) -> Self {
        self.course_state = enabled;
        self
    }

    /// Reset properties to their initial value on failure
    #[must_use]
    pub const fn with_reset_to_default_when_error(mut self, enabled: bool) -> Self {
        self.reset_to_default_when_error = enabled;
        self
    }
}

/// A named state transition
#[derive(Clone)]
pub struct Mutation(MutationFn);

impl Mutation {
    /// Wrap a mutation function
    #[must_use]
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Value, &Value) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Apply the mutation to `state`
    pub fn apply(&self, state: &mut Value, payload: &Value) {
        (self.0)(state, payload);
    }
}

impl fmt::Debug for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mutation(<fn>)")
    }
}

/// A dispatchable action
#[derive(Clone)]
pub struct Action(ActionFn);

impl Action {
    /// Wrap an action function
    #[must_use]
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Arc<dyn ActionContext>, ActionPayload) -> BoxFuture<'static, ActionResult>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(f))
    }

    /// Run the action against a host context
    #[must_use]
    pub fn call(
        &self,
        ctx: Arc<dyn ActionContext>,
        payload: ActionPayload,
    ) -> BoxFuture<'static, ActionResult> {
        (self.0)(ctx, payload)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action(<fn>)")
    }
}

/// Module state: a value, or a factory producing a fresh copy per mount
#[derive(Clone)]
pub enum ModuleState {
    /// Shared initial value
    Value(Value),
    /// Fresh value per call
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl ModuleState {
    /// The state to mount
    #[must_use]
    pub fn materialize(&self) -> Value {
        match self {
            Self::Value(state) => state.clone(),
            Self::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(state) => f.debug_tuple("ModuleState::Value").field(state).finish(),
            Self::Factory(_) => write!(f, "ModuleState::Factory(<fn>)"),
        }
    }
}

/// State, mutations and actions ready to be mounted in a host store
#[derive(Debug, Clone)]
pub struct StoreModule {
    /// Whether actions and mutations are registered under the module name
    pub namespaced: bool,
    /// Initial state
    pub state: ModuleState,
    /// Mutations by type
    pub mutations: BTreeMap<String, Mutation>,
    /// Actions by type
    pub actions: BTreeMap<String, Action>,
}

impl StoreModule {
    /// An empty, non-namespaced module with `state`
    #[must_use]
    pub const fn new(state: Value) -> Self {
        Self {
            namespaced: false,
            state: ModuleState::Value(state),
            mutations: BTreeMap::new(),
            actions: BTreeMap::new(),
        }
    }

    /// Add or replace a mutation
    #[must_use]
    pub fn with_mutation<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut Value, &Value) + Send + Sync + 'static,
    {
        self.mutations.insert(name.into(), Mutation::new(f));
        self
    }

    /// Add or replace an action
    #[must_use]
    pub fn with_action<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<dyn ActionContext>, ActionPayload) -> BoxFuture<'static, ActionResult>
            + Send
            + Sync
            + 'static,
    {
        self.actions.insert(name.into(), Action::new(f));
        self
    }

    /// Combine two modules, `other` winning on conflicts
    ///
    /// States are deep merged; mutation and action maps are unioned. The
    /// result is a factory if either side is.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        let state = match (self.state, other.state) {
            (ModuleState::Value(base), ModuleState::Value(extra)) => {
                ModuleState::Value(merge_store(base, [extra]))
            },
            (base, extra) => ModuleState::Factory(Arc::new(move || {
                merge_store(base.materialize(), [extra.materialize()])
            })),
        };
        self.mutations.extend(other.mutations);
        self.actions.extend(other.actions);
        Self {
            namespaced: self.namespaced || other.namespaced,
            state,
            mutations: self.mutations,
            actions: self.actions,
        }
    }
}

/// Synthesize a module from `resource`
#[must_use]
pub fn synthesize(resource: &ResourceDefinition, options: &StoreOptions) -> StoreModule {
    let default_state = create_state(resource, options.course_state);
    let state = if options.create_state_fn {
        let snapshot = default_state.clone();
        ModuleState::Factory(Arc::new(move || snapshot.clone()))
    } else {
        ModuleState::Value(default_state.clone())
    };

    let default_state = Arc::new(default_state);
    let mut mutations = BTreeMap::new();
    let mut actions = BTreeMap::new();
    for action in resource.actions() {
        create_mutations(&mut mutations, action, options, &default_state);
        actions.insert(
            action.dispatch_name.clone(),
            create_action(resource, action, options),
        );
    }

    tracing::debug!(
        actions = actions.len(),
        mutations = mutations.len(),
        namespaced = resource.namespaced(),
        "Synthesized store module"
    );
    StoreModule {
        namespaced: resource.namespaced(),
        state,
        mutations,
        actions,
    }
}

fn create_state(resource: &ResourceDefinition, course_state: bool) -> Value {
    let mut state = resource.state().clone();
    if course_state {
        state = merge_store(json!({"pending": {}, "error": {}}), [state]);
    }
    let Some(root) = state.as_object_mut() else {
        tracing::warn!("Resource state is not an object; bound properties are not seeded");
        return state;
    };

    for action in resource.actions() {
        let Some(property) = action.property.as_deref() else {
            continue;
        };
        root.entry(property).or_insert(Value::Null);
        if course_state && !action.is_plain() {
            set_course(root, "pending", property, Value::Bool(false));
            set_course(root, "error", property, Value::Null);
        }
    }
    state
}

fn set_course(root: &mut Map<String, Value>, section: &str, property: &str, value: Value) {
    let entry = root
        .entry(section)
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(section) = entry.as_object_mut() {
        section.insert(property.to_string(), value);
    }
}

fn set_state_course(state: &mut Value, property: &str, pending: bool, error: Value) {
    if let Some(root) = state.as_object_mut() {
        set_course(root, "pending", property, Value::Bool(pending));
        set_course(root, "error", property, error);
    }
}

fn set_property(state: &mut Value, property: &str, value: Value) {
    if let Some(root) = state.as_object_mut() {
        root.insert(property.to_string(), value);
    }
}

fn payload_data(payload: &Value) -> Value {
    payload.get("data").cloned().unwrap_or(Value::Null)
}

fn create_mutations(
    mutations: &mut BTreeMap<String, Mutation>,
    action: &ResourceAction,
    options: &StoreOptions,
    default_state: &Arc<Value>,
) {
    let property = action.property.clone();
    let success_handler: Option<StateHandler> = action.success_handler.clone();
    let error_handler: Option<StateHandler> = action.error_handler.clone();
    let course = options.course_state;

    if action.is_plain() {
        mutations.insert(
            action.commit_name.clone(),
            Mutation::new(move |state, payload| {
                let Some(property) = property.as_deref() else {
                    return;
                };
                match &success_handler {
                    Some(handler) => handler(state, payload),
                    None => set_property(state, property, payload_data(payload)),
                }
            }),
        );
        return;
    }

    let begin_property = property.clone();
    mutations.insert(
        action.commit_name.clone(),
        Mutation::new(move |state, _payload| {
            if let (true, Some(property)) = (course, begin_property.as_deref()) {
                set_state_course(state, property, true, Value::Null);
            }
        }),
    );

    let success_property = property.clone();
    mutations.insert(
        suffixed(&action.commit_name, &options.success_suffix),
        Mutation::new(move |state, payload| {
            if let (true, Some(property)) = (course, success_property.as_deref()) {
                set_state_course(state, property, false, Value::Null);
            }
            match (&success_handler, success_property.as_deref()) {
                (Some(handler), _) => handler(state, payload),
                (None, Some(property)) => set_property(state, property, payload_data(payload)),
                (None, None) => {},
            }
        }),
    );

    let reset = options.reset_to_default_when_error;
    let default_state = Arc::clone(default_state);
    mutations.insert(
        suffixed(&action.commit_name, &options.error_suffix),
        Mutation::new(move |state, payload| {
            if let (true, Some(property)) = (course, property.as_deref()) {
                set_state_course(state, property, false, payload.clone());
            }
            match (&error_handler, property.as_deref()) {
                (Some(handler), _) => handler(state, payload),
                (None, Some(property)) if reset => {
                    let initial = default_state.get(property).cloned().unwrap_or(Value::Null);
                    set_property(state, property, initial);
                },
                _ => {},
            }
        }),
    );
}

fn create_action(
    resource: &ResourceDefinition,
    action: &ResourceAction,
    options: &StoreOptions,
) -> Action {
    let kind = match &action.request {
        None => ActionKind::Plain {
            mutation: action.commit_name.clone(),
        },
        Some(request) => ActionKind::Networked {
            begin: action.commit_name.clone(),
            success: suffixed(&action.commit_name, &options.success_suffix),
            failure: suffixed(&action.commit_name, &options.error_suffix),
            request: Arc::clone(request),
        },
    };
    let plan = Arc::new(ActionPlan {
        action: action.name.clone(),
        kind,
        validate: resource.validator(),
    });
    let resolved = action.resolved.clone();
    let rejected = action.rejected.clone();
    let before = action.before.clone();
    let after = action.after.clone();

    Action::new(move |ctx, mut payload| {
        payload.resolved = merge_as_array(
            Callback::Sequence(resolved.clone()),
            [Callback::Sequence(payload.resolved)],
        );
        payload.rejected = merge_as_array(
            Callback::Sequence(rejected.clone()),
            [Callback::Sequence(payload.rejected)],
        );
        payload.before = compact(before.iter().cloned().chain(payload.before));
        payload.after = compact(after.iter().cloned().chain(payload.after));

        let plan = Arc::clone(&plan);
        Box::pin(async move { executor::execute(ctx.as_ref(), &plan, payload).await })
    })
}
