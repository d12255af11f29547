//! Store implementation
//!
//! The [`Store`] mounts synthesized modules under their names, routes
//! dispatches and commits to them and owns the root state.
//!
//! # Layout
//!
//! Every module's state lives at `root[name]`. A namespaced module registers
//! its actions and mutations as `"name/type"`; other modules register them
//! globally, so two non-namespaced modules must not share a type.
//!
//! # Concurrency
//!
//! - The root state sits behind a `tokio::sync::RwLock`
//! - Mutations are the only writers, each under a short write lock
//! - Actions never hold a lock across an `.await`
//! - Concurrent dispatches interleave; each commit is applied atomically

use crate::error::StoreError;
use metrics::counter;
use rest_store_core::context::{ActionContext, ActionResult, BoxFuture};
use rest_store_core::error::ActionError;
use rest_store_core::module::{Action, Mutation, StoreModule};
use rest_store_core::payload::ActionPayload;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A handler together with the module that registered it
#[derive(Debug, Clone)]
struct Registered<T> {
    module: String,
    namespace: Option<String>,
    handler: T,
}

struct Inner {
    state: RwLock<Value>,
    mutations: BTreeMap<String, Registered<Mutation>>,
    actions: BTreeMap<String, Registered<Action>>,
}

/// Host state container for synthesized modules
///
/// Cheap to clone; clones share state and registrations.
///
/// # Example
///
/// ```ignore
/// let store = Store::builder()
///     .module("users", users.get_store(StoreOptions::default()))
///     .build()?;
///
/// store.dispatch("users/fetchUsers", ActionPayload::new()).await?;
/// let users = store.module_state("users", |s| s["users"].clone()).await;
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Store {
    /// Start assembling a store
    #[must_use]
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    /// Dispatch an action by its fully qualified type
    ///
    /// Resolves once the action, and every chained dispatch it awaits, has
    /// finished.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownAction`] if no module registered
    /// `action`, otherwise whatever the action returns.
    #[tracing::instrument(skip(self, payload), name = "store_dispatch")]
    pub async fn dispatch(&self, action: &str, payload: ActionPayload) -> ActionResult {
        let Some(registered) = self.inner.actions.get(action) else {
            tracing::error!(action, "Unknown action type");
            counter!("store.dispatches", "outcome" => "unknown").increment(1);
            return Err(ActionError::UnknownAction(action.to_string()));
        };

        let ctx: Arc<dyn ActionContext> = Arc::new(ModuleContext {
            store: self.clone(),
            module: registered.module.clone(),
            namespace: registered.namespace.clone(),
        });
        let result = registered.handler.call(ctx, payload).await;

        let outcome = if result.is_ok() { "resolved" } else { "rejected" };
        counter!("store.dispatches", "outcome" => outcome).increment(1);
        result
    }

    /// Apply a mutation by its fully qualified type
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownMutation`] if no module registered
    /// `mutation`.
    #[tracing::instrument(skip(self, payload), name = "store_commit")]
    pub async fn commit(&self, mutation: &str, payload: Value) -> Result<(), ActionError> {
        let Some(registered) = self.inner.mutations.get(mutation) else {
            tracing::error!(mutation, "Unknown mutation type");
            counter!("store.commits", "outcome" => "unknown").increment(1);
            return Err(ActionError::UnknownMutation(mutation.to_string()));
        };

        {
            let mut root = self.inner.state.write().await;
            if let Some(state) = root.get_mut(&registered.module) {
                registered.handler.apply(state, &payload);
            }
        }

        tracing::trace!(module = %registered.module, "Mutation applied");
        counter!("store.commits", "outcome" => "applied").increment(1);
        Ok(())
    }

    /// Read the root state
    ///
    /// The closure runs under a read lock; keep it short.
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Value) -> T,
    {
        let state = self.inner.state.read().await;
        f(&state)
    }

    /// Read one module's state
    ///
    /// Returns `None` if no module is mounted under `module`.
    pub async fn module_state<F, T>(&self, module: &str, f: F) -> Option<T>
    where
        F: FnOnce(&Value) -> T,
    {
        let state = self.inner.state.read().await;
        state.get(module).map(f)
    }

    /// Registered action types
    #[must_use]
    pub fn action_types(&self) -> Vec<&str> {
        self.inner.actions.keys().map(String::as_str).collect()
    }

    /// Registered mutation types
    #[must_use]
    pub fn mutation_types(&self) -> Vec<&str> {
        self.inner.mutations.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("actions", &self.inner.actions.keys().collect::<Vec<_>>())
            .field("mutations", &self.inner.mutations.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Builder collecting the modules of a [`Store`]
#[derive(Debug, Default)]
pub struct StoreBuilder {
    modules: Vec<(String, StoreModule)>,
}

impl StoreBuilder {
    /// Mount `module` under `name`
    #[must_use]
    pub fn module(mut self, name: impl Into<String>, module: StoreModule) -> Self {
        self.modules.push((name.into(), module));
        self
    }

    /// Register every module and build the store
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if two modules share a name, or register the
    /// same action or mutation type.
    pub fn build(self) -> Result<Store, StoreError> {
        let mut root = Map::new();
        let mut mutations = BTreeMap::new();
        let mut actions = BTreeMap::new();

        for (name, module) in self.modules {
            if root.contains_key(&name) {
                return Err(StoreError::DuplicateModule(name));
            }
            root.insert(name.clone(), module.state.materialize());

            let namespace = module.namespaced.then(|| name.clone());
            let key = |local: &str| match &namespace {
                Some(namespace) => format!("{namespace}/{local}"),
                None => local.to_string(),
            };

            for (local, handler) in module.mutations {
                match mutations.entry(key(&local)) {
                    Entry::Occupied(entry) => {
                        let first: &Registered<Mutation> = entry.get();
                        return Err(StoreError::DuplicateMutation {
                            mutation: entry.key().clone(),
                            first: first.module.clone(),
                            second: name,
                        });
                    },
                    Entry::Vacant(entry) => {
                        entry.insert(Registered {
                            module: name.clone(),
                            namespace: namespace.clone(),
                            handler,
                        });
                    },
                }
            }

            for (local, handler) in module.actions {
                match actions.entry(key(&local)) {
                    Entry::Occupied(entry) => {
                        let first: &Registered<Action> = entry.get();
                        return Err(StoreError::DuplicateAction {
                            action: entry.key().clone(),
                            first: first.module.clone(),
                            second: name,
                        });
                    },
                    Entry::Vacant(entry) => {
                        entry.insert(Registered {
                            module: name.clone(),
                            namespace: namespace.clone(),
                            handler,
                        });
                    },
                }
            }

            tracing::debug!(module = %name, namespaced = namespace.is_some(), "Mounted module");
        }

        Ok(Store {
            inner: Arc::new(Inner {
                state: RwLock::new(Value::Object(root)),
                mutations,
                actions,
            }),
        })
    }
}

/// The context an action runs in
///
/// Local names resolve against the owning module's namespace; a dispatch
/// with `root` set uses the name as given.
#[derive(Clone)]
pub struct ModuleContext {
    store: Store,
    module: String,
    namespace: Option<String>,
}

impl ModuleContext {
    /// Name of the module the action belongs to
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    fn resolve(&self, local: &str, root: bool) -> String {
        match &self.namespace {
            Some(namespace) if !root => format!("{namespace}/{local}"),
            _ => local.to_string(),
        }
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("module", &self.module)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl ActionContext for ModuleContext {
    fn commit<'a>(
        &'a self,
        mutation: &'a str,
        payload: Value,
    ) -> BoxFuture<'a, Result<(), ActionError>> {
        Box::pin(async move {
            let mutation = self.resolve(mutation, false);
            self.store.commit(&mutation, payload).await
        })
    }

    fn dispatch<'a>(
        &'a self,
        action: &'a str,
        payload: ActionPayload,
        root: bool,
    ) -> BoxFuture<'a, ActionResult> {
        Box::pin(async move {
            let action = self.resolve(action, root);
            self.store.dispatch(&action, payload).await
        })
    }
}
