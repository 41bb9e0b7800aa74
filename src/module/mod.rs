//! Module records and the module tree.
//!
//! Modules live in an arena owned by [`ModuleTree`] and refer to their
//! children by [`ModuleId`]. A module's state is moved into the store's
//! root state when the module is installed, so the record never keeps a
//! detached copy.

mod definition;
mod path;
mod tree;

pub use definition::{
    ActionDef, ActionFn, ActionFuture, GetterFn, ModuleDef, MutationFn, StateInit,
};
pub use path::ModulePath;
pub use tree::ModuleTree;

use serde_json::Value;

use crate::store::LocalContext;

/// Stable arena index of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(pub(crate) usize);

impl ModuleId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One node of the module hierarchy.
#[derive(Debug)]
pub struct Module {
    raw: ModuleDef,
    /// Fresh state, present until the module is installed.
    state: Option<Value>,
    children: Vec<(String, ModuleId)>,
    /// Registered through `register_module` rather than at construction.
    runtime: bool,
    context: Option<LocalContext>,
}

impl Module {
    pub fn new(raw: ModuleDef, runtime: bool) -> Self {
        let state = raw.state.as_ref().map(|init| init.build()).unwrap_or_else(|| {
            Value::Object(serde_json::Map::new())
        });
        Self {
            raw,
            state: Some(state),
            children: Vec::new(),
            runtime,
            context: None,
        }
    }

    pub fn namespaced(&self) -> bool {
        self.raw.namespaced
    }

    pub fn runtime(&self) -> bool {
        self.runtime
    }

    pub fn raw(&self) -> &ModuleDef {
        &self.raw
    }

    /// State built for this module that has not been linked yet.
    pub fn pending_state(&self) -> Option<&Value> {
        self.state.as_ref()
    }

    pub(crate) fn take_state(&mut self) -> Option<Value> {
        self.state.take()
    }

    pub fn context(&self) -> Option<&LocalContext> {
        self.context.as_ref()
    }

    pub(crate) fn set_context(&mut self, context: LocalContext) {
        self.context = Some(context);
    }

    /// Adds or replaces a child. Returns the replaced child, if any.
    pub fn add_child(&mut self, key: impl Into<String>, id: ModuleId) -> Option<ModuleId> {
        let key = key.into();
        match self.children.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => Some(std::mem::replace(&mut slot.1, id)),
            None => {
                self.children.push((key, id));
                None
            }
        }
    }

    pub fn remove_child(&mut self, key: &str) -> Option<ModuleId> {
        let index = self.children.iter().position(|(existing, _)| existing == key)?;
        Some(self.children.remove(index).1)
    }

    pub fn get_child(&self, key: &str) -> Option<ModuleId> {
        self.children
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, id)| *id)
    }

    pub fn has_child(&self, key: &str) -> bool {
        self.get_child(key).is_some()
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, ModuleId)> {
        self.children.iter().map(|(key, id)| (key.as_str(), *id))
    }

    /// Replaces handler tables and the namespaced flag. State shape and
    /// nested definitions are left alone.
    pub fn update(&mut self, raw: &ModuleDef) {
        self.raw.namespaced = raw.namespaced;
        if !raw.mutations.is_empty() {
            self.raw.mutations = raw.mutations.clone();
        }
        if !raw.actions.is_empty() {
            self.raw.actions = raw.actions.clone();
        }
        if !raw.getters.is_empty() {
            self.raw.getters = raw.getters.clone();
        }
    }

    pub fn mutations(&self) -> impl Iterator<Item = (&str, &MutationFn)> {
        self.raw.mutations.iter().map(|(key, f)| (key.as_str(), f))
    }

    pub fn actions(&self) -> impl Iterator<Item = (&str, &ActionDef)> {
        self.raw.actions.iter().map(|(key, f)| (key.as_str(), f))
    }

    pub fn getters(&self) -> impl Iterator<Item = (&str, &GetterFn)> {
        self.raw.getters.iter().map(|(key, f)| (key.as_str(), f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_module_without_state_gets_empty_object() {
        let module = Module::new(ModuleDef::new(), false);
        assert_eq!(module.pending_state(), Some(&json!({})));
        assert!(!module.namespaced());
    }

    #[test]
    fn test_child_bookkeeping() {
        let mut module = Module::new(ModuleDef::new(), false);
        assert_eq!(module.add_child("a", ModuleId(1)), None);
        assert_eq!(module.add_child("a", ModuleId(2)), Some(ModuleId(1)));
        assert!(module.has_child("a"));
        assert_eq!(module.get_child("a"), Some(ModuleId(2)));
        assert_eq!(module.remove_child("a"), Some(ModuleId(2)));
        assert!(!module.has_child("a"));
    }

    #[test]
    fn test_update_keeps_state_and_replaces_tables() {
        let mut module = Module::new(
            ModuleDef::new()
                .state(json!({ "n": 1 }))
                .mutation("old", |_, _| {}),
            false,
        );
        module.update(&ModuleDef::new().namespaced(true).mutation("new", |_, _| {}));

        assert!(module.namespaced());
        assert_eq!(module.mutations().map(|(k, _)| k).collect::<Vec<_>>(), vec!["new"]);
        assert_eq!(module.pending_state(), Some(&json!({ "n": 1 })));
    }
}
