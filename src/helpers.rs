//! Accessor helpers: bind aliases to state, getters, mutations and actions,
//! optionally scoped to a namespaced module.
//!
//! Every helper resolves its namespace through
//! [`Store::module_by_namespace`] at call time. An unknown namespace is
//! reported as [`Diagnostic::NamespaceNotFound`] and the accessor returns
//! `None`.

use std::sync::Arc;

use serde_json::Value;

use crate::module::ActionFuture;
use crate::store::{Diagnostic, Getters, LocalContext, Store};

/// Selector over `(state, getters)`.
pub type StateSelector = Arc<dyn Fn(&Value, &Getters) -> Value + Send + Sync>;

/// What a mapped state alias reads.
#[derive(Clone)]
pub enum StateTarget {
    /// A property of the (module) state.
    Key(String),
    Select(StateSelector),
}

impl StateTarget {
    pub fn select<F>(selector: F) -> Self
    where
        F: Fn(&Value, &Getters) -> Value + Send + Sync + 'static,
    {
        StateTarget::Select(Arc::new(selector))
    }
}

impl From<&str> for StateTarget {
    fn from(key: &str) -> Self {
        StateTarget::Key(key.to_string())
    }
}

impl From<String> for StateTarget {
    fn from(key: String) -> Self {
        StateTarget::Key(key)
    }
}

/// `["a", "b"]` as `[("a", "a"), ("b", "b")]`.
pub fn same_keys<'a>(keys: &[&'a str]) -> Vec<(&'a str, &'a str)> {
    keys.iter().map(|key| (*key, *key)).collect()
}

/// Appends the trailing `/` a namespace needs; `None` stays root.
fn normalize_namespace(namespace: Option<&str>) -> String {
    match namespace {
        None | Some("") => String::new(),
        Some(ns) if ns.ends_with('/') => ns.to_string(),
        Some(ns) => format!("{ns}/"),
    }
}

fn lookup(store: &Store, helper: &'static str, namespace: &str) -> Option<LocalContext> {
    let context = store.module_by_namespace(namespace);
    if context.is_none() {
        store.report(Diagnostic::NamespaceNotFound {
            helper,
            namespace: namespace.to_string(),
        });
    }
    context
}

fn collect<K, T, U>(map: impl IntoIterator<Item = (K, T)>) -> Vec<(String, U)>
where
    K: Into<String>,
    T: Into<U>,
{
    map.into_iter()
        .map(|(alias, target)| (alias.into(), target.into()))
        .collect()
}

/// State accessors produced by [`map_state`].
#[derive(Clone)]
pub struct MappedState {
    namespace: String,
    entries: Vec<(String, StateTarget)>,
}

pub fn map_state<K, T>(namespace: Option<&str>, map: impl IntoIterator<Item = (K, T)>) -> MappedState
where
    K: Into<String>,
    T: Into<StateTarget>,
{
    MappedState {
        namespace: normalize_namespace(namespace),
        entries: collect(map),
    }
}

impl MappedState {
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(alias, _)| alias.as_str())
    }

    pub fn get(&self, store: &Store, alias: &str) -> Option<Value> {
        let (_, target) = self.entries.iter().find(|(a, _)| a == alias)?;

        let (state, getters) = if self.namespace.is_empty() {
            (store.state().as_ref().clone(), store.getters())
        } else {
            let context = lookup(store, "map_state", &self.namespace)?;
            (context.state(), context.getters())
        };

        match target {
            StateTarget::Key(key) => state.get(key).cloned(),
            StateTarget::Select(selector) => Some(selector(&state, &getters)),
        }
    }
}

/// Getter accessors produced by [`map_getters`].
#[derive(Debug, Clone)]
pub struct MappedGetters {
    namespace: String,
    entries: Vec<(String, String)>,
}

pub fn map_getters<K, T>(
    namespace: Option<&str>,
    map: impl IntoIterator<Item = (K, T)>,
) -> MappedGetters
where
    K: Into<String>,
    T: Into<String>,
{
    let namespace = normalize_namespace(namespace);
    let entries = map
        .into_iter()
        .map(|(alias, key)| {
            let key: String = key.into();
            (alias.into(), format!("{namespace}{key}"))
        })
        .collect();
    MappedGetters { namespace, entries }
}

impl MappedGetters {
    pub fn get(&self, store: &Store, alias: &str) -> Option<Value> {
        let (_, type_) = self.entries.iter().find(|(a, _)| a == alias)?;
        if !self.namespace.is_empty() {
            lookup(store, "map_getters", &self.namespace)?;
        }
        if !store.has_getter(type_) {
            store.report(Diagnostic::UnknownGetter {
                type_: type_.clone(),
            });
            return None;
        }
        store.getter(type_)
    }
}

/// Mutation accessors produced by [`map_mutations`].
#[derive(Debug, Clone)]
pub struct MappedMutations {
    namespace: String,
    entries: Vec<(String, String)>,
}

pub fn map_mutations<K, T>(
    namespace: Option<&str>,
    map: impl IntoIterator<Item = (K, T)>,
) -> MappedMutations
where
    K: Into<String>,
    T: Into<String>,
{
    MappedMutations {
        namespace: normalize_namespace(namespace),
        entries: collect(map),
    }
}

impl MappedMutations {
    /// `None` when the alias or the namespace is unknown.
    pub fn commit(
        &self,
        store: &Store,
        alias: &str,
        payload: Value,
    ) -> Option<Result<(), Diagnostic>> {
        let (_, type_) = self.entries.iter().find(|(a, _)| a == alias)?;
        if self.namespace.is_empty() {
            return Some(store.commit(type_, payload));
        }
        let context = lookup(store, "map_mutations", &self.namespace)?;
        Some(context.commit(type_, payload))
    }
}

/// Action accessors produced by [`map_actions`].
#[derive(Debug, Clone)]
pub struct MappedActions {
    namespace: String,
    entries: Vec<(String, String)>,
}

pub fn map_actions<K, T>(
    namespace: Option<&str>,
    map: impl IntoIterator<Item = (K, T)>,
) -> MappedActions
where
    K: Into<String>,
    T: Into<String>,
{
    MappedActions {
        namespace: normalize_namespace(namespace),
        entries: collect(map),
    }
}

impl MappedActions {
    /// `None` when the alias or the namespace is unknown.
    pub fn dispatch(&self, store: &Store, alias: &str, payload: Value) -> Option<ActionFuture> {
        let (_, type_) = self.entries.iter().find(|(a, _)| a == alias)?;
        if self.namespace.is_empty() {
            return Some(store.dispatch(type_, payload));
        }
        let context = lookup(store, "map_actions", &self.namespace)?;
        Some(context.dispatch(type_, payload))
    }
}
