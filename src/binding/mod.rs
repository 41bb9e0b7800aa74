//! Reactive binding between the root state and derived getter values.
//!
//! The store owns exactly one live binding. Whenever the getter table
//! changes, the store asks the current binding for a successor via
//! [`ReactiveBinding::rebind`]; the successor shares the state cell and the
//! change channel, so state and subscribers survive the swap. The
//! superseded binding is released when the last in-flight reader drops its
//! `Arc`, never in the middle of a read.

mod memo;

pub use memo::MemoBinding;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

/// Derived value evaluated against the current store state.
pub type ComputedFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Holds the root state and memoizes computed values over it.
pub trait ReactiveBinding: Send + Sync {
    /// Current root state snapshot.
    fn state(&self) -> Arc<Value>;

    /// Writes the root state in place.
    fn write_state(&self, write: &mut dyn FnMut(&mut Value));

    /// Swaps the root state wholesale.
    fn replace_state(&self, state: Value);

    /// Value of a declared computed, or `None` if `key` is not declared.
    fn computed(&self, key: &str) -> Option<Value>;

    fn has_computed(&self, key: &str) -> bool;

    /// Declared computed keys, sorted.
    fn computed_keys(&self) -> Vec<String>;

    /// Receives the state version after every write.
    fn changes(&self) -> watch::Receiver<u64>;

    /// Successor binding over the same state with a new computed table.
    fn rebind(&self, computed: Vec<(String, ComputedFn)>) -> Arc<dyn ReactiveBinding>;
}
