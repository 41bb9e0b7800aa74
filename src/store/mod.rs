//! The store: public routing surface over the installed module tree.
//!
//! A [`Store`] is a cheap, cloneable handle. Mutations are routed through
//! the flat tables built at installation time and always run inside a
//! committing scope; actions return futures; getters are computed values
//! held by the [`ReactiveBinding`].

mod context;
mod error;
mod install;
mod registry;

pub use context::{ActionContext, CommitOptions, DispatchOptions, Getters, LocalContext};
pub use error::{ActionError, Diagnostic, StoreError};

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::future::{self, try_join_all, FutureExt};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::binding::{MemoBinding, ReactiveBinding};
use crate::config::StoreConfig;
use crate::module::{ActionFuture, Module, ModuleDef, ModuleId, ModulePath, ModuleTree};
use error::DiagnosticLog;
use install::{install_module, reinstall, reset_binding, reset_store};
use registry::{get_nested_mut, Registry};

/// A committed mutation, as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationRecord {
    #[serde(rename = "type")]
    pub type_: String,
    pub payload: Value,
}

/// Callback run after every commit with the record and the new root state.
pub type MutationSubscriber = Arc<dyn Fn(&MutationRecord, &Value) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Options for [`Store::register_module_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Keep the state already present at the path instead of linking the
    /// module's fresh state.
    pub preserve_state: bool,
}

pub(crate) struct StoreInner {
    config: StoreConfig,
    committing: AtomicBool,
    pub(crate) modules: RwLock<ModuleTree>,
    pub(crate) registry: RwLock<Registry>,
    pub(crate) binding: RwLock<Arc<dyn ReactiveBinding>>,
    diagnostics: Mutex<DiagnosticLog>,
    subscribers: RwLock<Vec<(SubscriptionId, MutationSubscriber)>>,
    next_subscription: AtomicU64,
}

/// Hierarchical state container.
#[derive(Clone)]
pub struct Store {
    pub(crate) inner: Arc<StoreInner>,
}

impl Store {
    /// Builds a store with default configuration.
    pub fn new(root: ModuleDef) -> Self {
        Self::with_config(root, StoreConfig::default())
    }

    pub fn with_config(root: ModuleDef, config: StoreConfig) -> Self {
        Self::with_binding(root, config, |state| {
            Arc::new(MemoBinding::new(state)) as Arc<dyn ReactiveBinding>
        })
    }

    /// Builds a store from a TOML config file (defaults if it is missing).
    pub fn from_config_file(root: ModuleDef, path: &Path) -> Result<Self, StoreError> {
        let config = StoreConfig::load_from(path)?;
        Ok(Self::with_config(root, config))
    }

    /// Builds a store over a custom binding, created from the root state.
    pub fn with_binding<F>(root: ModuleDef, config: StoreConfig, make_binding: F) -> Self
    where
        F: FnOnce(Value) -> Arc<dyn ReactiveBinding>,
    {
        let mut tree = ModuleTree::new(root);
        let root_id = tree.root();
        let root_state = tree
            .module_mut(root_id)
            .and_then(Module::take_state)
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        let store = Store {
            inner: Arc::new(StoreInner {
                committing: AtomicBool::new(false),
                modules: RwLock::new(tree),
                registry: RwLock::new(Registry::default()),
                binding: RwLock::new(make_binding(root_state)),
                diagnostics: Mutex::new(DiagnosticLog::new(config.diagnostics_capacity)),
                subscribers: RwLock::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
                config,
            }),
        };

        {
            let mut tree = store.inner.modules.write();
            let mut registry = store.inner.registry.write();
            install_module(&store, &mut tree, &mut registry, &mut Vec::new(), root_id, false);
            reset_binding(&store, &mut registry);
        }

        tracing::debug!(strict = store.inner.config.strict, "Store created");
        store
    }

    pub(crate) fn upgrade(inner: &Weak<StoreInner>) -> Option<Store> {
        inner.upgrade().map(|inner| Store { inner })
    }

    pub(crate) fn binding(&self) -> Arc<dyn ReactiveBinding> {
        self.inner.binding.read().clone()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn is_strict(&self) -> bool {
        self.inner.config.strict
    }

    /// Current root state snapshot.
    pub fn state(&self) -> Arc<Value> {
        self.binding().state()
    }

    /// Value of the getter registered under `type_`.
    pub fn getter(&self, type_: &str) -> Option<Value> {
        self.binding().computed(type_)
    }

    /// Root view over all getters.
    pub fn getters(&self) -> Getters {
        Getters::root(self)
    }

    pub fn has_mutation(&self, type_: &str) -> bool {
        self.inner.registry.read().mutations.contains_key(type_)
    }

    pub fn has_action(&self, type_: &str) -> bool {
        self.inner.registry.read().actions.contains_key(type_)
    }

    pub fn has_getter(&self, type_: &str) -> bool {
        self.binding().has_computed(type_)
    }

    /// Runs every mutation handler registered under `type_`, in
    /// registration order, inside one committing scope.
    pub fn commit(&self, type_: &str, payload: Value) -> Result<(), Diagnostic> {
        let entries = self.inner.registry.read().mutations.get(type_).cloned();
        let Some(entries) = entries else {
            return Err(self.report(Diagnostic::UnknownMutation {
                type_: type_.to_string(),
            }));
        };

        if self.inner.config.trace_mutations {
            tracing::debug!(mutation = %type_, payload = %payload, "Commit");
        }

        self.with_commit(|| {
            self.binding().write_state(&mut |root: &mut Value| {
                for entry in &entries {
                    entry.apply(root, &payload);
                }
            })
        });

        self.notify_subscribers(type_, payload);
        Ok(())
    }

    /// Runs every action handler registered under `type_`.
    ///
    /// Every handler is started before this returns: its future runs up
    /// to its first `.await` that suspends, so work before that point
    /// happens even if the returned future is dropped. With several
    /// handlers the future resolves to an array of their results once all
    /// have resolved, or fails with the first failure. Unknown types yield
    /// an already failed future.
    pub fn dispatch(&self, type_: &str, payload: Value) -> ActionFuture {
        let entries = self.inner.registry.read().actions.get(type_).cloned();
        let Some(entries) = entries else {
            let diagnostic = self.report(Diagnostic::UnknownAction {
                type_: type_.to_string(),
            });
            return future::ready(Err(ActionError::from(diagnostic))).boxed();
        };

        tracing::debug!(action = %type_, handlers = entries.len(), "Dispatch");

        if let [entry] = entries.as_slice() {
            return entry.call(self, payload);
        }

        let pending: Vec<ActionFuture> = entries
            .iter()
            .map(|entry| entry.call(self, payload.clone()))
            .collect();
        async move { try_join_all(pending).await.map(Value::Array) }.boxed()
    }

    /// Replaces the root state wholesale.
    pub fn replace_state(&self, state: Value) {
        self.with_commit(|| self.binding().replace_state(state));
    }

    /// Writes the root state directly, bypassing mutations.
    ///
    /// In strict mode a write outside a committing scope is reported as
    /// [`Diagnostic::StrictModeViolation`]; the write still happens.
    pub fn write_state<F>(&self, write: F)
    where
        F: FnOnce(&mut Value),
    {
        if self.inner.config.strict && !self.is_committing() {
            self.report(Diagnostic::StrictModeViolation);
        }
        let mut write = Some(write);
        self.binding().write_state(&mut |root: &mut Value| {
            if let Some(write) = write.take() {
                write(root);
            }
        });
    }

    /// Whether a committing scope is currently open.
    pub fn is_committing(&self) -> bool {
        self.inner.committing.load(Ordering::SeqCst)
    }

    /// Runs `f` with the committing flag set, restoring the previous value
    /// afterwards (nested scopes keep the flag set).
    pub(crate) fn with_commit<R>(&self, f: impl FnOnce() -> R) -> R {
        let previous = self.inner.committing.swap(true, Ordering::SeqCst);
        let _restore = scopeguard::guard(previous, |previous| {
            self.inner.committing.store(previous, Ordering::SeqCst)
        });
        f()
    }

    pub fn register_module(
        &self,
        path: impl Into<ModulePath>,
        def: ModuleDef,
    ) -> Result<(), StoreError> {
        self.register_module_with(path, def, RegisterOptions::default())
    }

    /// Registers `def` at `path`, installs the new subtree and rebuilds the
    /// getter binding. Replacing a registered module rebuilds all routes,
    /// so none of the replaced module's handlers stay reachable.
    ///
    /// # Errors
    /// `RootModule` for an empty path, `MissingParent` if the parent path is
    /// not registered. The store is unchanged on error.
    pub fn register_module_with(
        &self,
        path: impl Into<ModulePath>,
        def: ModuleDef,
        options: RegisterOptions,
    ) -> Result<(), StoreError> {
        let path = path.into();
        if path.is_root() {
            return Err(StoreError::RootModule);
        }

        let mut tree = self.inner.modules.write();
        let replacing = tree.is_registered(path.segments());
        let id = tree.register(path.segments(), def, true)?;

        let mut registry = self.inner.registry.write();
        if replacing {
            // Routes of the replaced subtree must not survive.
            reinstall(self, &mut tree, &mut registry, options.preserve_state);
        } else {
            let mut segments = path.segments().to_vec();
            install_module(
                self,
                &mut tree,
                &mut registry,
                &mut segments,
                id,
                options.preserve_state,
            );
            reset_binding(self, &mut registry);
        }

        tracing::info!(path = %path, replaced = replacing, "Registered module");
        Ok(())
    }

    /// Removes a dynamically registered module and its state, then
    /// rebuilds all routes.
    pub fn unregister_module(&self, path: impl Into<ModulePath>) -> Result<(), Diagnostic> {
        let path = path.into();
        {
            let mut tree = self.inner.modules.write();
            let runtime = tree.get(path.segments()).map(Module::runtime);
            match (runtime, path.split_last()) {
                (Some(true), Some((parent_path, key))) => {
                    tree.unregister(path.segments());
                    self.with_commit(|| {
                        self.binding().write_state(&mut |root: &mut Value| {
                            if let Some(Value::Object(parent)) = get_nested_mut(root, parent_path)
                            {
                                parent.remove(key);
                            }
                        })
                    });
                }
                (Some(_), Some(_)) => {
                    return Err(self.report(Diagnostic::StaticModule {
                        path: path.to_string(),
                    }));
                }
                _ => {
                    return Err(self.report(Diagnostic::UnknownModule {
                        path: path.to_string(),
                    }));
                }
            }
        }

        reset_store(self);
        tracing::info!(path = %path, "Unregistered module");
        Ok(())
    }

    pub fn has_module(&self, path: impl Into<ModulePath>) -> bool {
        self.inner.modules.read().is_registered(path.into().segments())
    }

    /// Hot-swaps handler tables and namespaced flags across the tree,
    /// keeping all state.
    pub fn hot_update(&self, def: ModuleDef) {
        self.inner.modules.write().update(&def);
        reset_store(self);
        tracing::info!("Hot update applied");
    }

    /// Arena id of the module at `path`.
    pub fn module_id(&self, path: impl Into<ModulePath>) -> Option<ModuleId> {
        self.inner.modules.read().get_id(path.into().segments())
    }

    /// Accumulated namespace of the module at `path`.
    pub fn namespace_of(&self, path: impl Into<ModulePath>) -> Option<String> {
        self.inner.modules.read().get_namespace(path.into().segments())
    }

    /// Module registered for a namespace (e.g. `"user/"`).
    pub fn namespace_owner(&self, namespace: &str) -> Option<ModuleId> {
        self.inner.registry.read().namespaces.get(namespace).copied()
    }

    /// Local context of the module registered for `namespace`.
    pub fn module_by_namespace(&self, namespace: &str) -> Option<LocalContext> {
        let id = self.namespace_owner(namespace)?;
        self.inner.modules.read().module(id)?.context().cloned()
    }

    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(&MutationRecord, &Value) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::SeqCst));
        self.inner
            .subscribers
            .write()
            .push((id, Arc::new(subscriber)));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    /// Receives the state version after every write.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.binding().changes()
    }

    /// Diagnostics reported so far, oldest first.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.diagnostics.lock().snapshot()
    }

    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.diagnostics.lock().drain()
    }

    /// Logs and records a diagnostic, returning it for the caller.
    pub(crate) fn report(&self, diagnostic: Diagnostic) -> Diagnostic {
        tracing::error!(kind = diagnostic.kind(), "{}", diagnostic);
        self.inner.diagnostics.lock().push(diagnostic.clone());
        diagnostic
    }

    pub(crate) fn local_getter_map(&self, namespace: &str) -> Arc<BTreeMap<String, String>> {
        let mut registry = self.inner.registry.write();
        if let Some(projection) = registry.local_getters.get(namespace) {
            return Arc::clone(projection);
        }
        let projection = Arc::new(context::project_getters(
            namespace,
            registry.getters.keys(),
        ));
        registry
            .local_getters
            .insert(namespace.to_string(), Arc::clone(&projection));
        projection
    }

    fn notify_subscribers(&self, type_: &str, payload: Value) {
        let subscribers: Vec<MutationSubscriber> = self
            .inner
            .subscribers
            .read()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        if subscribers.is_empty() {
            return;
        }

        let record = MutationRecord {
            type_: type_.to_string(),
            payload,
        };
        let state = self.state();
        for subscriber in subscribers {
            subscriber(&record, &state);
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.inner.config)
            .field("committing", &self.is_committing())
            .finish_non_exhaustive()
    }
}
