//! Hierarchical, namespaced state container.
//!
//! A [`Store`] holds one JSON state tree assembled from a tree of
//! [`ModuleDef`]s. State changes only through synchronous mutations
//! ([`Store::commit`]); asynchronous work goes through actions
//! ([`Store::dispatch`]); derived values are getters ([`Store::getter`]).
//! Modules marked namespaced prefix their mutation, action and getter
//! types with `key/`.
//!
//! ```
//! use serde_json::{json, Value};
//! use statehive::{ModuleDef, Store};
//!
//! let store = Store::new(ModuleDef::new().module(
//!     "counter",
//!     ModuleDef::new()
//!         .namespaced(true)
//!         .state(json!({ "count": 0 }))
//!         .mutation("increment", |state, _| {
//!             let next = state["count"].as_i64().unwrap_or(0) + 1;
//!             state["count"] = json!(next);
//!         })
//!         .getter("double", |state, _, _, _| {
//!             json!(state["count"].as_i64().unwrap_or(0) * 2)
//!         }),
//! ));
//!
//! store.commit("counter/increment", Value::Null).unwrap();
//! assert_eq!(store.state()["counter"]["count"], json!(1));
//! assert_eq!(store.getter("counter/double"), Some(json!(2)));
//! ```

pub mod binding;
pub mod config;
pub mod helpers;
pub mod logging;
pub mod module;
pub mod store;

pub use binding::{MemoBinding, ReactiveBinding};
pub use config::{ConfigError, StoreConfig};
pub use module::{ModuleDef, ModuleId, ModulePath};
pub use store::{
    ActionContext, ActionError, CommitOptions, Diagnostic, DispatchOptions, Getters,
    LocalContext, MutationRecord, RegisterOptions, Store, StoreError, SubscriptionId,
};
