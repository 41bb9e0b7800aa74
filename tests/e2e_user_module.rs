//! End-to-end flow through a namespaced module.

mod common;

use serde_json::{json, Value};
use statehive::{ModuleDef, Store};

#[tokio::test]
async fn test_load_name_updates_display_name() {
    let store = Store::new(ModuleDef::new().module("user", common::user_module()));

    assert_eq!(store.getter("user/displayName"), Some(json!("")));

    let loaded = store.dispatch("user/loadName", Value::Null).await.unwrap();

    assert_eq!(loaded, json!({ "name": "x" }));
    assert_eq!(store.state()["user"]["name"], json!("x"));
    assert_eq!(store.getter("user/displayName"), Some(json!("X")));
    assert!(store.diagnostics().is_empty());
}

#[tokio::test]
async fn test_action_context_sees_root_state_and_getters() {
    let store = Store::new(
        ModuleDef::new()
            .state(json!({ "greeting": "hello" }))
            .getter("greeting", |state, _, _, _| state["greeting"].clone())
            .module(
                "user",
                common::user_module().action("greet", |ctx, _| async move {
                    let greeting = ctx.root_getters().get("greeting").unwrap_or_default();
                    let local = ctx.getters().get("displayName").unwrap_or_default();
                    Ok::<_, statehive::ActionError>(json!({
                        "root_state": ctx.root_state()["greeting"].clone(),
                        "root_getter": greeting,
                        "local_getter": local,
                        "local_state": ctx.state(),
                        "namespace": ctx.namespace(),
                    }))
                }),
            ),
    );

    store.commit("user/setName", json!("ada")).unwrap();
    let result = store.dispatch("user/greet", Value::Null).await.unwrap();

    assert_eq!(result["root_state"], json!("hello"));
    assert_eq!(result["root_getter"], json!("hello"));
    assert_eq!(result["local_getter"], json!("ADA"));
    assert_eq!(result["local_state"], json!({ "name": "ada" }));
    assert_eq!(result["namespace"], json!("user/"));
}

#[tokio::test]
async fn test_sync_action_is_awaitable() {
    let store = Store::new(
        ModuleDef::new()
            .module("counter", common::counter_module())
            .sync_action("bump", |ctx, payload| {
                ctx.commit("increment", payload)?;
                Ok(json!("done"))
            }),
    );

    let result = store.dispatch("bump", json!(3)).await.unwrap();

    assert_eq!(result, json!("done"));
    assert_eq!(store.state()["counter"]["count"], json!(3));
}

#[tokio::test]
async fn test_rejection_reaches_caller() {
    let store = Store::new(ModuleDef::new().action("fail", |_, _| async {
        Err::<Value, _>(statehive::ActionError::rejected("nope"))
    }));

    let err = store.dispatch("fail", Value::Null).await.unwrap_err();
    assert_eq!(err.to_string(), "action rejected: nope");
}

#[tokio::test]
async fn test_getters_read_other_getters() {
    let store = Store::new(
        ModuleDef::new().module(
            "user",
            common::user_module().getter("greeting", |_, getters, _, _| {
                let name = getters.get("displayName").unwrap_or_default();
                json!(format!("Hi {}", name.as_str().unwrap_or_default()))
            }),
        ),
    );

    store.dispatch("user/loadName", Value::Null).await.unwrap();
    assert_eq!(store.getter("user/greeting"), Some(json!("Hi X")));
}
