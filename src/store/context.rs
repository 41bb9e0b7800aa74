//! Module-local views of the store.
//!
//! A [`LocalContext`] is attached to every installed module. It prefixes
//! commit/dispatch types with the module namespace and resolves the
//! module's state by walking its path from the current root state on every
//! access, so it keeps working after `replace_state` or re-registration.
//! It holds only a weak handle to the store; an [`ActionContext`] is the
//! strong, per-call variant handed to action handlers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use futures::future::{self, FutureExt};
use serde_json::Value;

use super::error::{ActionError, Diagnostic};
use super::registry::get_nested;
use super::{Store, StoreInner};
use crate::module::ActionFuture;

/// Options for a local commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOptions {
    /// Route the type as-is instead of prefixing the module namespace.
    pub root: bool,
}

/// Options for a local dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Route the type as-is instead of prefixing the module namespace.
    pub root: bool,
}

impl CommitOptions {
    pub fn root() -> Self {
        Self { root: true }
    }
}

impl DispatchOptions {
    pub fn root() -> Self {
        Self { root: true }
    }
}

/// Namespace-scoped view handed to a module's handlers.
#[derive(Clone)]
pub struct LocalContext {
    store: Weak<StoreInner>,
    namespace: String,
    path: Vec<String>,
}

impl LocalContext {
    pub(crate) fn new(store: &Store, namespace: &str, path: &[String]) -> Self {
        Self {
            store: Arc::downgrade(&store.inner),
            namespace: namespace.to_string(),
            path: path.to_vec(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The module's state, resolved from the current root state.
    ///
    /// `Value::Null` if the store is gone or the path no longer resolves.
    pub fn state(&self) -> Value {
        self.store()
            .and_then(|store| get_nested(&store.state(), &self.path).cloned())
            .unwrap_or(Value::Null)
    }

    /// Getters of this module's namespace, keyed without the prefix.
    pub fn getters(&self) -> Getters {
        Getters {
            store: self.store.clone(),
            namespace: self.namespace.clone(),
        }
    }

    pub fn commit(&self, type_: &str, payload: Value) -> Result<(), Diagnostic> {
        self.commit_with(type_, payload, CommitOptions::default())
    }

    pub fn commit_with(
        &self,
        type_: &str,
        payload: Value,
        options: CommitOptions,
    ) -> Result<(), Diagnostic> {
        let store = self.store().ok_or(Diagnostic::StoreDropped)?;
        commit_local(&store, &self.namespace, type_, payload, options)
    }

    pub fn dispatch(&self, type_: &str, payload: Value) -> ActionFuture {
        self.dispatch_with(type_, payload, DispatchOptions::default())
    }

    pub fn dispatch_with(
        &self,
        type_: &str,
        payload: Value,
        options: DispatchOptions,
    ) -> ActionFuture {
        match self.store() {
            Some(store) => dispatch_local(&store, &self.namespace, type_, payload, options),
            None => future::ready(Err(ActionError::from(Diagnostic::StoreDropped))).boxed(),
        }
    }

    fn store(&self) -> Option<Store> {
        Store::upgrade(&self.store)
    }
}

impl fmt::Debug for LocalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalContext")
            .field("namespace", &self.namespace)
            .field("path", &self.path)
            .finish()
    }
}

/// Context passed to action handlers.
///
/// `commit`, `dispatch`, `state` and `getters` are module-local;
/// `root_state` and `root_getters` see the whole store.
#[derive(Clone)]
pub struct ActionContext {
    store: Store,
    local: LocalContext,
}

impl ActionContext {
    pub(crate) fn new(store: Store, local: LocalContext) -> Self {
        Self { store, local }
    }

    pub fn commit(&self, type_: &str, payload: Value) -> Result<(), Diagnostic> {
        self.commit_with(type_, payload, CommitOptions::default())
    }

    pub fn commit_with(
        &self,
        type_: &str,
        payload: Value,
        options: CommitOptions,
    ) -> Result<(), Diagnostic> {
        commit_local(&self.store, &self.local.namespace, type_, payload, options)
    }

    pub fn dispatch(&self, type_: &str, payload: Value) -> ActionFuture {
        self.dispatch_with(type_, payload, DispatchOptions::default())
    }

    pub fn dispatch_with(
        &self,
        type_: &str,
        payload: Value,
        options: DispatchOptions,
    ) -> ActionFuture {
        dispatch_local(&self.store, &self.local.namespace, type_, payload, options)
    }

    pub fn state(&self) -> Value {
        get_nested(&self.store.state(), &self.local.path)
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn getters(&self) -> Getters {
        self.local.getters()
    }

    pub fn root_state(&self) -> Arc<Value> {
        self.store.state()
    }

    pub fn root_getters(&self) -> Getters {
        self.store.getters()
    }

    pub fn namespace(&self) -> &str {
        &self.local.namespace
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

/// Read-only view over getter values.
///
/// The root view exposes every getter under its full type. A namespaced
/// view exposes the getters under its prefix with the prefix stripped; the
/// key mapping is cached per namespace until the routing tables are
/// rebuilt.
#[derive(Clone)]
pub struct Getters {
    store: Weak<StoreInner>,
    namespace: String,
}

impl Getters {
    pub(crate) fn root(store: &Store) -> Self {
        Self {
            store: Arc::downgrade(&store.inner),
            namespace: String::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let store = Store::upgrade(&self.store)?;
        if self.namespace.is_empty() {
            return store.getter(key);
        }
        let projection = store.local_getter_map(&self.namespace);
        let global = projection.get(key)?;
        store.getter(global)
    }

    pub fn contains(&self, key: &str) -> bool {
        let Some(store) = Store::upgrade(&self.store) else {
            return false;
        };
        if self.namespace.is_empty() {
            return store.has_getter(key);
        }
        store.local_getter_map(&self.namespace).contains_key(key)
    }

    /// Visible keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let Some(store) = Store::upgrade(&self.store) else {
            return Vec::new();
        };
        if self.namespace.is_empty() {
            return store.binding().computed_keys();
        }
        store.local_getter_map(&self.namespace).keys().cloned().collect()
    }
}

impl fmt::Debug for Getters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Getters")
            .field("namespace", &self.namespace)
            .finish()
    }
}

/// Maps local getter keys to global types for `namespace`.
pub(crate) fn project_getters<'a>(
    namespace: &str,
    types: impl Iterator<Item = &'a String>,
) -> BTreeMap<String, String> {
    types
        .filter_map(|type_| {
            let local = type_.strip_prefix(namespace)?;
            Some((local.to_string(), type_.clone()))
        })
        .collect()
}

fn commit_local(
    store: &Store,
    namespace: &str,
    type_: &str,
    payload: Value,
    options: CommitOptions,
) -> Result<(), Diagnostic> {
    if namespace.is_empty() || options.root {
        return store.commit(type_, payload);
    }
    let global = format!("{namespace}{type_}");
    if !store.has_mutation(&global) {
        return Err(store.report(Diagnostic::UnknownLocalMutation {
            local: type_.to_string(),
            global,
        }));
    }
    store.commit(&global, payload)
}

fn dispatch_local(
    store: &Store,
    namespace: &str,
    type_: &str,
    payload: Value,
    options: DispatchOptions,
) -> ActionFuture {
    if namespace.is_empty() || options.root {
        return store.dispatch(type_, payload);
    }
    let global = format!("{namespace}{type_}");
    if !store.has_action(&global) {
        let diagnostic = store.report(Diagnostic::UnknownLocalAction {
            local: type_.to_string(),
            global,
        });
        return future::ready(Err(ActionError::from(diagnostic))).boxed();
    }
    store.dispatch(&global, payload)
}
