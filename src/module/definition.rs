//! Raw module definitions.
//!
//! A [`ModuleDef`] is the declarative source a [`Module`](super::Module) is
//! built from: initial state, handler tables, the namespaced flag and nested
//! definitions. Handler tables keep declaration order, which is also the
//! order in which handlers sharing a type fire.

use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::{Map, Value};

use crate::store::{ActionContext, ActionError, Getters};

/// Mutation handler: `(local_state, payload)`.
pub type MutationFn = Arc<dyn Fn(&mut Value, &Value) + Send + Sync>;

/// Future returned by every action.
pub type ActionFuture = BoxFuture<'static, Result<Value, ActionError>>;

/// Action handler: `(context, payload) -> future`.
pub type ActionFn = Arc<dyn Fn(ActionContext, Value) -> ActionFuture + Send + Sync>;

/// Getter: `(local_state, local_getters, root_state, root_getters)`.
pub type GetterFn = Arc<dyn Fn(&Value, &Getters, &Value, &Getters) -> Value + Send + Sync>;

/// Initial state of a module.
#[derive(Clone)]
pub enum StateInit {
    /// Cloned for every instantiation.
    Value(Value),
    /// Invoked once per instantiation.
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl StateInit {
    /// Produces a fresh state value. `null` becomes an empty object.
    pub fn build(&self) -> Value {
        let value = match self {
            StateInit::Value(value) => value.clone(),
            StateInit::Factory(factory) => factory(),
        };
        match value {
            Value::Null => Value::Object(Map::new()),
            other => other,
        }
    }
}

impl std::fmt::Debug for StateInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateInit::Value(value) => f.debug_tuple("Value").field(value).finish(),
            StateInit::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// An action handler plus its routing scope.
#[derive(Clone)]
pub struct ActionDef {
    pub(crate) handler: ActionFn,
    /// Registered under the bare key, ignoring the module namespace.
    pub(crate) root: bool,
}

impl ActionDef {
    pub fn is_root(&self) -> bool {
        self.root
    }
}

/// Declarative module definition, built with chained calls.
///
/// ```
/// use serde_json::json;
/// use statehive::ModuleDef;
///
/// let counter = ModuleDef::new()
///     .namespaced(true)
///     .state(json!({ "count": 0 }))
///     .mutation("increment", |state, by| {
///         let next = state["count"].as_i64().unwrap_or(0) + by.as_i64().unwrap_or(1);
///         state["count"] = json!(next);
///     })
///     .getter("double", |state, _, _, _| {
///         json!(state["count"].as_i64().unwrap_or(0) * 2)
///     });
/// assert!(counter.is_namespaced());
/// ```
#[derive(Clone, Default)]
pub struct ModuleDef {
    pub(crate) state: Option<StateInit>,
    pub(crate) namespaced: bool,
    pub(crate) mutations: Vec<(String, MutationFn)>,
    pub(crate) actions: Vec<(String, ActionDef)>,
    pub(crate) getters: Vec<(String, GetterFn)>,
    pub(crate) modules: Vec<(String, ModuleDef)>,
}

impl ModuleDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial state, cloned for each instantiation.
    pub fn state(mut self, state: Value) -> Self {
        self.state = Some(StateInit::Value(state));
        self
    }

    /// Initial state factory, called once per instantiation.
    pub fn state_fn<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.state = Some(StateInit::Factory(Arc::new(factory)));
        self
    }

    pub fn namespaced(mut self, namespaced: bool) -> Self {
        self.namespaced = namespaced;
        self
    }

    pub fn mutation<F>(mut self, key: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Value, &Value) + Send + Sync + 'static,
    {
        upsert(&mut self.mutations, key.into(), Arc::new(handler) as MutationFn);
        self
    }

    /// Async action registered under the module namespace.
    pub fn action<F, Fut>(self, key: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ActionContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ActionError>> + Send + 'static,
    {
        self.push_action(key.into(), boxed_action(handler), false)
    }

    /// Async action registered under its bare key, even inside a namespace.
    pub fn root_action<F, Fut>(self, key: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ActionContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ActionError>> + Send + 'static,
    {
        self.push_action(key.into(), boxed_action(handler), true)
    }

    /// Synchronous action; its result is wrapped in a ready future.
    pub fn sync_action<F>(self, key: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ActionContext, Value) -> Result<Value, ActionError> + Send + Sync + 'static,
    {
        let handler: ActionFn = Arc::new(move |ctx, payload| {
            future::ready(handler(ctx, payload)).boxed()
        });
        self.push_action(key.into(), handler, false)
    }

    pub fn getter<F>(mut self, key: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&Value, &Getters, &Value, &Getters) -> Value + Send + Sync + 'static,
    {
        upsert(&mut self.getters, key.into(), Arc::new(getter) as GetterFn);
        self
    }

    /// Nested module definition. Re-using a key replaces the earlier one.
    pub fn module(mut self, key: impl Into<String>, def: ModuleDef) -> Self {
        upsert(&mut self.modules, key.into(), def);
        self
    }

    pub fn is_namespaced(&self) -> bool {
        self.namespaced
    }

    pub fn mutation_keys(&self) -> impl Iterator<Item = &str> {
        self.mutations.iter().map(|(key, _)| key.as_str())
    }

    pub fn action_keys(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|(key, _)| key.as_str())
    }

    pub fn getter_keys(&self) -> impl Iterator<Item = &str> {
        self.getters.iter().map(|(key, _)| key.as_str())
    }

    pub fn module_keys(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|(key, _)| key.as_str())
    }

    fn push_action(mut self, key: String, handler: ActionFn, root: bool) -> Self {
        upsert(&mut self.actions, key, ActionDef { handler, root });
        self
    }
}

impl std::fmt::Debug for ModuleDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDef")
            .field("state", &self.state)
            .field("namespaced", &self.namespaced)
            .field("mutations", &self.mutation_keys().collect::<Vec<_>>())
            .field("actions", &self.action_keys().collect::<Vec<_>>())
            .field("getters", &self.getter_keys().collect::<Vec<_>>())
            .field("modules", &self.modules)
            .finish()
    }
}

fn boxed_action<F, Fut>(handler: F) -> ActionFn
where
    F: Fn(ActionContext, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ActionError>> + Send + 'static,
{
    Arc::new(move |ctx, payload| handler(ctx, payload).boxed())
}

fn upsert<T>(entries: &mut Vec<(String, T)>, key: String, value: T) {
    match entries.iter_mut().find(|(existing, _)| *existing == key) {
        Some(slot) => slot.1 = value,
        None => entries.push((key, value)),
    }
}
