mod common;

use serde_json::{json, Value};
use statehive::{CommitOptions, Diagnostic, DispatchOptions, ModuleDef, Store};

fn two_namespaces() -> Store {
    Store::new(
        ModuleDef::new()
            .module(
                "a",
                ModuleDef::new()
                    .namespaced(true)
                    .state(json!({ "hits": 0 }))
                    .mutation("onlyA", |state, _| {
                        state["hits"] = json!(state["hits"].as_i64().unwrap_or(0) + 1);
                    }),
            )
            .module(
                "b",
                ModuleDef::new()
                    .namespaced(true)
                    .state(json!({ "hits": 0 }))
                    .mutation("onlyB", |state, _| {
                        state["hits"] = json!(state["hits"].as_i64().unwrap_or(0) + 1);
                    }),
            ),
    )
}

#[test]
fn test_local_commit_cannot_reach_sibling_namespace() {
    let store = two_namespaces();
    let b = store.module_by_namespace("b/").unwrap();

    let err = b.commit("onlyA", Value::Null).unwrap_err();
    assert_eq!(
        err,
        Diagnostic::UnknownLocalMutation {
            local: "onlyA".into(),
            global: "b/onlyA".into(),
        }
    );

    // A fully qualified type is still prefixed without the root option.
    assert!(b.commit("a/onlyA", Value::Null).is_err());
    assert_eq!(store.state()["a"]["hits"], json!(0));

    b.commit_with("a/onlyA", Value::Null, CommitOptions::root())
        .unwrap();
    assert_eq!(store.state()["a"]["hits"], json!(1));
    assert_eq!(store.state()["b"]["hits"], json!(0));
}

#[test]
fn test_local_commit_reaches_own_namespace() {
    let store = two_namespaces();
    let a = store.module_by_namespace("a/").unwrap();

    a.commit("onlyA", Value::Null).unwrap();
    assert_eq!(a.state(), json!({ "hits": 1 }));
    assert!(store.has_mutation("a/onlyA"));
    assert!(!store.has_mutation("onlyA"));
}

#[tokio::test]
async fn test_local_dispatch_unknown_type_is_rejected() {
    let store = two_namespaces();
    let a = store.module_by_namespace("a/").unwrap();

    let err = a.dispatch("missing", Value::Null).await.unwrap_err();
    assert!(matches!(
        err,
        statehive::ActionError::Diagnostic(Diagnostic::UnknownLocalAction { ref global, .. })
            if global == "a/missing"
    ));
}

#[test]
fn test_namespace_skips_plain_middle_module() {
    let store = Store::new(ModuleDef::new().module(
        "outer",
        ModuleDef::new().namespaced(true).module(
            "middle",
            ModuleDef::new().module(
                "inner",
                ModuleDef::new()
                    .namespaced(true)
                    .mutation("touch", |state, _| state["touched"] = json!(true)),
            ),
        ),
    ));

    assert_eq!(store.namespace_of("outer").as_deref(), Some("outer/"));
    assert_eq!(
        store.namespace_of(["outer", "middle"]).as_deref(),
        Some("outer/")
    );
    assert_eq!(
        store.namespace_of(["outer", "middle", "inner"]).as_deref(),
        Some("outer/inner/")
    );

    store.commit("outer/inner/touch", Value::Null).unwrap();
    assert_eq!(
        store.state()["outer"]["middle"]["inner"]["touched"],
        json!(true)
    );
}

#[test]
fn test_plain_module_shares_parent_namespace() {
    let store = Store::new(
        ModuleDef::new().module("counter", common::counter_module()),
    );

    store.commit("increment", json!(2)).unwrap();
    assert_eq!(store.getter("count"), Some(json!(2)));
    assert_eq!(store.state()["counter"]["count"], json!(2));
}

#[test]
fn test_root_action_ignores_namespace() {
    let store = Store::new(ModuleDef::new().module(
        "user",
        common::user_module().root_action("reset", |ctx, _| async move {
            ctx.commit("setName", json!("root"))?;
            Ok::<_, statehive::ActionError>(Value::Null)
        }),
    ));

    assert!(store.has_action("reset"));
    assert!(!store.has_action("user/reset"));
    assert!(store.has_action("user/loadName"));
}

#[tokio::test]
async fn test_root_action_commits_locally() {
    let store = Store::new(ModuleDef::new().module(
        "user",
        common::user_module().root_action("reset", |ctx, _| async move {
            ctx.commit("setName", json!("root"))?;
            Ok::<_, statehive::ActionError>(Value::Null)
        }),
    ));

    store.dispatch("reset", Value::Null).await.unwrap();
    assert_eq!(store.state()["user"]["name"], json!("root"));
}

#[tokio::test]
async fn test_local_dispatch_with_root_option() {
    let store = Store::new(
        ModuleDef::new()
            .state(json!({ "log": [] }))
            .mutation("log", |state, entry| {
                if let Some(log) = state["log"].as_array_mut() {
                    log.push(entry.clone());
                }
            })
            .action("record", |ctx, payload| async move {
                ctx.commit("log", payload)?;
                Ok::<_, statehive::ActionError>(Value::Null)
            })
            .module("user", common::user_module()),
    );

    let user = store.module_by_namespace("user/").unwrap();
    user.dispatch_with("record", json!("from user"), DispatchOptions::root())
        .await
        .unwrap();

    assert_eq!(store.state()["log"], json!(["from user"]));
}

#[test]
fn test_local_getters_are_stripped_view() {
    let store = Store::new(
        ModuleDef::new()
            .getter("rootOnly", |_, _, _, _| json!(1))
            .module("user", common::user_module()),
    );

    let user = store.module_by_namespace("user/").unwrap();
    let getters = user.getters();

    assert_eq!(getters.keys(), vec!["displayName".to_string()]);
    assert!(getters.contains("displayName"));
    assert!(!getters.contains("rootOnly"));
    assert_eq!(getters.get("rootOnly"), None);

    let root_keys = store.getters().keys();
    assert_eq!(root_keys, vec!["rootOnly", "user/displayName"]);
}

#[test]
fn test_duplicate_getter_keeps_first() {
    let store = Store::new(
        ModuleDef::new()
            .getter("total", |_, _, _, _| json!("root"))
            .module(
                "plain",
                ModuleDef::new().getter("total", |_, _, _, _| json!("plain")),
            ),
    );

    assert_eq!(store.getter("total"), Some(json!("root")));
    assert_eq!(
        store.diagnostics(),
        vec![Diagnostic::DuplicateGetter {
            type_: "total".into()
        }]
    );
}
