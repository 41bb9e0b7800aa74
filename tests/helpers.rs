mod common;

use serde_json::{json, Value};
use statehive::helpers::{map_actions, map_getters, map_mutations, map_state, same_keys, StateTarget};
use statehive::{Diagnostic, ModuleDef, Store};

fn app_store() -> Store {
    Store::new(
        ModuleDef::new()
            .state(json!({ "title": "shop" }))
            .getter("loud", |state, _, _, _| {
                json!(state["title"].as_str().unwrap_or_default().to_uppercase())
            })
            .module("user", common::user_module()),
    )
}

#[test]
fn test_map_state_reads_root_and_namespaced_state() {
    let store = app_store();
    store.commit("user/setName", json!("ada")).unwrap();

    let root = map_state(None, [("title", StateTarget::from("title"))]);
    assert_eq!(root.get(&store, "title"), Some(json!("shop")));

    let user = map_state(
        Some("user"),
        [
            ("name", StateTarget::from("name")),
            (
                "shout",
                StateTarget::select(|_, getters| getters.get("displayName").unwrap_or_default()),
            ),
        ],
    );
    assert_eq!(user.get(&store, "name"), Some(json!("ada")));
    assert_eq!(user.get(&store, "shout"), Some(json!("ADA")));
    assert_eq!(user.get(&store, "unknownAlias"), None);
    assert_eq!(user.aliases().collect::<Vec<_>>(), vec!["name", "shout"]);
}

#[test]
fn test_map_getters_resolves_namespaced_types() {
    let store = app_store();
    store.commit("user/setName", json!("bo")).unwrap();

    let getters = map_getters(Some("user/"), same_keys(&["displayName"]));
    assert_eq!(getters.get(&store, "displayName"), Some(json!("BO")));

    let root = map_getters(None, [("title", "loud")]);
    assert_eq!(root.get(&store, "title"), Some(json!("SHOP")));
}

#[test]
fn test_map_getters_reports_unknown_getter() {
    let store = app_store();
    let getters = map_getters(Some("user"), [("missing", "nothingHere")]);

    assert_eq!(getters.get(&store, "missing"), None);
    assert_eq!(
        store.diagnostics(),
        vec![Diagnostic::UnknownGetter {
            type_: "user/nothingHere".into()
        }]
    );
}

#[test]
fn test_map_mutations_commits_locally() {
    let store = app_store();
    let mutations = map_mutations(Some("user"), [("rename", "setName")]);

    let result = mutations.commit(&store, "rename", json!("cy"));

    assert_eq!(result, Some(Ok(())));
    assert_eq!(store.state()["user"]["name"], json!("cy"));
    assert_eq!(mutations.commit(&store, "nope", Value::Null), None);
}

#[tokio::test]
async fn test_map_actions_dispatches_locally() {
    let store = app_store();
    let actions = map_actions(Some("user"), same_keys(&["loadName"]));

    let loaded = actions
        .dispatch(&store, "loadName", Value::Null)
        .unwrap()
        .await
        .unwrap();

    assert_eq!(loaded, json!({ "name": "x" }));
    assert_eq!(store.getter("user/displayName"), Some(json!("X")));
}

#[test]
fn test_unknown_namespace_is_reported_per_helper() {
    let store = app_store();

    let state = map_state(Some("ghost"), [("a", "a")]);
    let mutations = map_mutations(Some("ghost"), [("a", "a")]);
    let actions = map_actions(Some("ghost"), [("a", "a")]);

    assert_eq!(state.get(&store, "a"), None);
    assert_eq!(mutations.commit(&store, "a", Value::Null), None);
    assert!(actions.dispatch(&store, "a", Value::Null).is_none());

    let helpers: Vec<&str> = store
        .diagnostics()
        .into_iter()
        .filter_map(|diagnostic| match diagnostic {
            Diagnostic::NamespaceNotFound { helper, namespace } => {
                assert_eq!(namespace, "ghost/");
                Some(helper)
            }
            _ => None,
        })
        .collect();
    assert_eq!(helpers, vec!["map_state", "map_mutations", "map_actions"]);
}

#[test]
fn test_helpers_follow_later_registration() {
    let store = Store::new(ModuleDef::new());
    let mutations = map_mutations(Some("user"), [("rename", "setName")]);

    assert_eq!(mutations.commit(&store, "rename", json!("early")), None);

    store.register_module("user", common::user_module()).unwrap();
    assert_eq!(
        mutations.commit(&store, "rename", json!("late")),
        Some(Ok(()))
    );
    assert_eq!(store.state()["user"]["name"], json!("late"));
}
