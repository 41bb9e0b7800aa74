//! Arena-backed module tree.

use super::{Module, ModuleDef, ModuleId, ModulePath};
use crate::store::StoreError;

/// The full module hierarchy, rooted at the store's root module.
///
/// Slots of removed subtrees are cleared rather than reused, so a
/// [`ModuleId`] never points at a different module later on.
#[derive(Debug)]
pub struct ModuleTree {
    slots: Vec<Option<Module>>,
    root: ModuleId,
}

impl ModuleTree {
    /// Builds the tree for a root definition and all of its nested modules.
    pub fn new(root: ModuleDef) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            root: ModuleId(0),
        };
        tree.root = tree.build(root, false);
        tree
    }

    pub fn root(&self) -> ModuleId {
        self.root
    }

    /// Registers `def` (and its nested definitions) at `path`.
    ///
    /// An empty path replaces the root. Otherwise every segment but the
    /// last must already resolve; an existing child under the same key is
    /// replaced and its subtree freed.
    pub fn register(
        &mut self,
        path: &[String],
        def: ModuleDef,
        runtime: bool,
    ) -> Result<ModuleId, StoreError> {
        let Some((key, parent_path)) = path.split_last() else {
            let old = self.root;
            self.root = self.build(def, runtime);
            self.free(old);
            return Ok(self.root);
        };

        let parent = self
            .get_id(parent_path)
            .ok_or_else(|| StoreError::MissingParent {
                path: ModulePath::from(path).to_string(),
            })?;

        let id = self.build(def, runtime);
        let replaced = self
            .module_mut(parent)
            .and_then(|parent| parent.add_child(key.clone(), id));
        if let Some(old) = replaced {
            tracing::debug!(path = %ModulePath::from(path), "Replacing registered module");
            self.free(old);
        }
        Ok(id)
    }

    /// Detaches the module at `path` and frees its subtree.
    pub fn unregister(&mut self, path: &[String]) -> Option<ModuleId> {
        let (key, parent_path) = path.split_last()?;
        let parent = self.get_id(parent_path)?;
        let removed = self.module_mut(parent)?.remove_child(key)?;
        self.free(removed);
        Some(removed)
    }

    pub fn get(&self, path: &[String]) -> Option<&Module> {
        self.get_id(path).and_then(|id| self.module(id))
    }

    pub fn get_id(&self, path: &[String]) -> Option<ModuleId> {
        path.iter().try_fold(self.root, |id, key| self.module(id)?.get_child(key))
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn module_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Accumulated namespace for `path`: `key/` for every namespaced module
    /// along the way, the root contributing nothing.
    ///
    /// Returns `None` if the path does not resolve.
    pub fn get_namespace(&self, path: &[String]) -> Option<String> {
        let mut id = self.root;
        let mut namespace = String::new();
        for key in path {
            id = self.module(id)?.get_child(key)?;
            if self.module(id)?.namespaced() {
                namespace.push_str(key);
                namespace.push('/');
            }
        }
        Some(namespace)
    }

    /// Whether the last segment of `path` is a child of its parent.
    pub fn is_registered(&self, path: &[String]) -> bool {
        let Some((key, parent_path)) = path.split_last() else {
            return false;
        };
        self.get(parent_path)
            .map(|parent| parent.has_child(key))
            .unwrap_or(false)
    }

    /// Hot update: replaces handler tables along the tree described by
    /// `def`. Nested definitions without a registered counterpart are
    /// skipped; adding modules needs a real registration.
    pub fn update(&mut self, def: &ModuleDef) {
        let mut path = Vec::new();
        self.update_at(self.root, &mut path, def);
    }

    fn update_at(&mut self, id: ModuleId, path: &mut Vec<String>, def: &ModuleDef) {
        let Some(module) = self.module_mut(id) else {
            return;
        };
        module.update(def);

        for (key, child_def) in &def.modules {
            path.push(key.clone());
            match self.module(id).and_then(|m| m.get_child(key)) {
                Some(child) => self.update_at(child, path, child_def),
                None => tracing::warn!(
                    path = %ModulePath::from(path.as_slice()),
                    "Hot update tried to add a new module; register it instead"
                ),
            }
            path.pop();
        }
    }

    fn build(&mut self, mut def: ModuleDef, runtime: bool) -> ModuleId {
        let nested = std::mem::take(&mut def.modules);
        let id = ModuleId(self.slots.len());
        self.slots.push(Some(Module::new(def, runtime)));

        for (key, child_def) in nested {
            let child = self.build(child_def, runtime);
            if let Some(module) = self.module_mut(id) {
                module.add_child(key, child);
            }
        }
        id
    }

    fn free(&mut self, id: ModuleId) {
        let Some(module) = self.slots.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        for (_, child) in module.children() {
            self.free(child);
        }
    }
}
