//! Installation: walks the module tree, links module state into the root
//! state and fills the flat routing tables.

use std::sync::Arc;

use serde_json::Value;

use super::context::LocalContext;
use super::error::Diagnostic;
use super::registry::{get_nested_mut, ActionEntry, GetterEntry, MutationEntry, Registry};
use super::Store;
use crate::binding::ComputedFn;
use crate::module::{ModuleId, ModulePath, ModuleTree};

/// Installs the module `id` at `path` and, recursively, its children.
///
/// Handlers resolve state and getters at call time through the module's
/// [`LocalContext`], never through references captured here.
pub(crate) fn install_module(
    store: &Store,
    tree: &mut ModuleTree,
    registry: &mut Registry,
    path: &mut Vec<String>,
    id: ModuleId,
    preserve_state: bool,
) {
    let Some(namespace) = tree.get_namespace(path) else {
        tracing::warn!(path = %ModulePath::from(path.as_slice()), "Cannot install unresolved module");
        return;
    };
    let Some(module) = tree.module_mut(id) else {
        return;
    };

    if module.namespaced() {
        if !namespace.is_empty() && registry.namespaces.contains_key(&namespace) {
            store.report(Diagnostic::DuplicateNamespace {
                namespace: namespace.clone(),
                path: path.join("/"),
            });
        }
        registry.namespaces.insert(namespace.clone(), id);
    }

    let fresh_state = module.take_state();
    if let (Some((key, parent_path)), Some(state), false) =
        (path.split_last(), fresh_state, preserve_state)
    {
        link_state(store, parent_path, key, state);
    }

    let context = LocalContext::new(store, &namespace, path);
    module.set_context(context.clone());

    for (key, handler) in module.mutations() {
        registry
            .mutations
            .entry(format!("{namespace}{key}"))
            .or_default()
            .push(Arc::new(MutationEntry::new(Arc::clone(handler), path)));
    }

    for (key, action) in module.actions() {
        let type_ = if action.is_root() {
            key.to_string()
        } else {
            format!("{namespace}{key}")
        };
        registry
            .actions
            .entry(type_)
            .or_default()
            .push(Arc::new(ActionEntry::new(
                Arc::clone(&action.handler),
                context.clone(),
            )));
    }

    for (key, getter) in module.getters() {
        let type_ = format!("{namespace}{key}");
        if registry.getters.contains_key(&type_) {
            store.report(Diagnostic::DuplicateGetter { type_ });
            continue;
        }
        registry.getters.insert(
            type_,
            Arc::new(GetterEntry::new(Arc::clone(getter), context.clone())),
        );
    }

    tracing::debug!(
        path = %ModulePath::from(path.as_slice()),
        namespace = %namespace,
        "Installed module"
    );

    let children: Vec<(String, ModuleId)> = module
        .children()
        .map(|(key, child)| (key.to_string(), child))
        .collect();
    for (key, child) in children {
        path.push(key);
        install_module(store, tree, registry, path, child, preserve_state);
        path.pop();
    }
}

/// Sets `state` as property `key` of the state at `parent_path`, inside a
/// committing scope.
fn link_state(store: &Store, parent_path: &[String], key: &str, state: Value) {
    let mut state = Some(state);
    store.with_commit(|| {
        store.binding().write_state(&mut |root: &mut Value| {
            match get_nested_mut(root, parent_path) {
                Some(Value::Object(parent)) => {
                    if let Some(state) = state.take() {
                        parent.insert(key.to_string(), state);
                    }
                }
                _ => tracing::warn!(
                    path = %ModulePath::from(parent_path),
                    child = %key,
                    "Parent state is not an object, module state not linked"
                ),
            }
        })
    });
}

/// Swaps in a new binding whose computed values are the current getter
/// table, and drops the cached local getter projections.
pub(crate) fn reset_binding(store: &Store, registry: &mut Registry) {
    registry.local_getters.clear();

    let weak = Arc::downgrade(&store.inner);
    let computed: Vec<(String, ComputedFn)> = registry
        .getters
        .iter()
        .map(|(type_, entry)| {
            let entry = Arc::clone(entry);
            let weak = weak.clone();
            let compute: ComputedFn = Arc::new(move || match Store::upgrade(&weak) {
                Some(store) => entry.evaluate(&store),
                None => Value::Null,
            });
            (type_.clone(), compute)
        })
        .collect();

    let mut binding = store.inner.binding.write();
    let next = binding.rebind(computed);
    *binding = next;
}

/// Clears the routing tables and installs the whole tree again.
///
/// Modules already installed have no pending state left, so only a freshly
/// built subtree links state; `preserve_state` applies to that subtree.
pub(crate) fn reinstall(
    store: &Store,
    tree: &mut ModuleTree,
    registry: &mut Registry,
    preserve_state: bool,
) {
    registry.clear();
    let root = tree.root();
    install_module(store, tree, registry, &mut Vec::new(), root, preserve_state);
    reset_binding(store, registry);
}

/// Rebuilds every route from the module tree, keeping the current state.
pub(crate) fn reset_store(store: &Store) {
    let mut tree = store.inner.modules.write();
    let mut registry = store.inner.registry.write();
    reinstall(store, &mut tree, &mut registry, true);
}
