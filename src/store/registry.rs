//! Flat routing tables built by installation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{self, FutureExt};
use futures::task::noop_waker;
use serde_json::Value;

use super::context::{ActionContext, LocalContext};
use super::Store;
use crate::module::{ActionFn, ActionFuture, GetterFn, ModuleId, ModulePath, MutationFn};

/// Registered mutation handler bound to its module path.
pub(crate) struct MutationEntry {
    handler: MutationFn,
    path: Vec<String>,
}

impl MutationEntry {
    pub(crate) fn new(handler: MutationFn, path: &[String]) -> Self {
        Self {
            handler,
            path: path.to_vec(),
        }
    }

    /// Runs the handler against the module's slice of `root`.
    pub(crate) fn apply(&self, root: &mut Value, payload: &Value) {
        match get_nested_mut(root, &self.path) {
            Some(local) => (self.handler)(local, payload),
            None => tracing::warn!(
                path = %ModulePath::from(self.path.as_slice()),
                "Module state missing, mutation skipped"
            ),
        }
    }
}

/// Registered action handler bound to its module context.
pub(crate) struct ActionEntry {
    handler: ActionFn,
    context: LocalContext,
}

impl ActionEntry {
    pub(crate) fn new(handler: ActionFn, context: LocalContext) -> Self {
        Self { handler, context }
    }

    /// Invokes the handler and starts the returned future: it runs up to
    /// its first suspension point before this returns.
    pub(crate) fn call(&self, store: &Store, payload: Value) -> ActionFuture {
        let ctx = ActionContext::new(store.clone(), self.context.clone());
        start((self.handler)(ctx, payload))
    }
}

/// Registered getter bound to its module context.
pub(crate) struct GetterEntry {
    getter: GetterFn,
    context: LocalContext,
}

impl GetterEntry {
    pub(crate) fn new(getter: GetterFn, context: LocalContext) -> Self {
        Self { getter, context }
    }

    pub(crate) fn evaluate(&self, store: &Store) -> Value {
        let root = store.state();
        let missing = Value::Null;
        let local_state = get_nested(&root, self.context.path()).unwrap_or(&missing);
        let local_getters = self.context.getters();
        let root_getters = store.getters();
        (self.getter)(local_state, &local_getters, &*root, &root_getters)
    }
}

/// Polls `action` once. A pending future is handed back as is; the next
/// poll by the caller registers the real waker.
fn start(mut action: ActionFuture) -> ActionFuture {
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    match action.poll_unpin(&mut cx) {
        Poll::Ready(result) => future::ready(result).boxed(),
        Poll::Pending => action,
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) mutations: HashMap<String, Vec<Arc<MutationEntry>>>,
    pub(crate) actions: HashMap<String, Vec<Arc<ActionEntry>>>,
    pub(crate) getters: HashMap<String, Arc<GetterEntry>>,
    pub(crate) namespaces: HashMap<String, ModuleId>,
    pub(crate) local_getters: HashMap<String, Arc<BTreeMap<String, String>>>,
}

impl Registry {
    /// Drops every route; used before a full reinstall.
    pub(crate) fn clear(&mut self) {
        self.mutations.clear();
        self.actions.clear();
        self.getters.clear();
        self.namespaces.clear();
        self.local_getters.clear();
    }
}

pub(crate) fn get_nested<'a>(state: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(state, |state, key| state.get(key.as_str()))
}

pub(crate) fn get_nested_mut<'a>(state: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    path.iter()
        .try_fold(state, |state, key| state.get_mut(key.as_str()))
}
