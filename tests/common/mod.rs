//! Shared module fixtures.

#![allow(dead_code)]

use serde_json::{json, Value};
use statehive::{ActionError, ModuleDef};
use std::time::Duration;

/// Namespaced `user` module: `setName`, `loadName` and `displayName`.
pub fn user_module() -> ModuleDef {
    ModuleDef::new()
        .namespaced(true)
        .state_fn(|| json!({ "name": "" }))
        .mutation("setName", |state, name| {
            state["name"] = name.clone();
        })
        .action("loadName", |ctx, _| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let user = json!({ "name": "x" });
            ctx.commit("setName", user["name"].clone())?;
            Ok::<_, ActionError>(user)
        })
        .getter("displayName", |state, _, _, _| {
            json!(state["name"].as_str().unwrap_or_default().to_uppercase())
        })
}

/// Plain counter with `increment` (payload = step, default 1) and `count`.
pub fn counter_module() -> ModuleDef {
    ModuleDef::new()
        .state(json!({ "count": 0 }))
        .mutation("increment", |state, by| {
            let next = count_of(state) + by.as_i64().unwrap_or(1);
            state["count"] = json!(next);
        })
        .getter("count", |state, _, _, _| json!(count_of(state)))
}

pub fn count_of(state: &Value) -> i64 {
    state["count"].as_i64().unwrap_or(0)
}
