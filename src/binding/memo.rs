use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::watch;

use super::{ComputedFn, ReactiveBinding};

/// Default binding: copy-on-write state plus per-version memoization.
///
/// Every write bumps a version counter published on a `watch` channel.
/// Computed values are cached together with the version they were
/// computed at and recomputed on the first read after a write.
pub struct MemoBinding {
    state: Arc<RwLock<Arc<Value>>>,
    version: Arc<watch::Sender<u64>>,
    computed: HashMap<String, ComputedFn>,
    cache: Mutex<HashMap<String, (u64, Value)>>,
}

impl MemoBinding {
    pub fn new(state: Value) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(Arc::new(state))),
            version: Arc::new(version),
            computed: HashMap::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Current state version.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    fn bump(&self) {
        self.version.send_modify(|version| *version += 1);
    }
}

impl ReactiveBinding for MemoBinding {
    fn state(&self) -> Arc<Value> {
        self.state.read().clone()
    }

    fn write_state(&self, write: &mut dyn FnMut(&mut Value)) {
        {
            let mut guard = self.state.write();
            write(Arc::make_mut(&mut *guard));
        }
        self.bump();
    }

    fn replace_state(&self, state: Value) {
        *self.state.write() = Arc::new(state);
        self.bump();
    }

    fn computed(&self, key: &str) -> Option<Value> {
        let compute = self.computed.get(key)?;
        let version = self.version();

        if let Some((cached_at, value)) = self.cache.lock().get(key) {
            if *cached_at == version {
                return Some(value.clone());
            }
        }

        // Evaluated without holding the cache lock: getters read other getters.
        let value = compute();
        self.cache
            .lock()
            .insert(key.to_string(), (version, value.clone()));
        Some(value)
    }

    fn has_computed(&self, key: &str) -> bool {
        self.computed.contains_key(key)
    }

    fn computed_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.computed.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn rebind(&self, computed: Vec<(String, ComputedFn)>) -> Arc<dyn ReactiveBinding> {
        Arc::new(MemoBinding {
            state: Arc::clone(&self.state),
            version: Arc::clone(&self.version),
            computed: computed.into_iter().collect(),
            cache: Mutex::new(HashMap::new()),
        })
    }
}
