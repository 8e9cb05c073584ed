//! Views over store models.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use actionstore::{CommitOptions, ModelDefinition, Store, ViewDefinition};
use serde_json::{json, Value};

use crate::support::{user_store, ScriptedTransport, User};

#[test]
fn view_follows_model_changes() {
    let store = user_store(ScriptedTransport::new());
    let count = store.view("user_count").unwrap();
    assert_eq!(*count.get().unwrap(), json!(0));

    store
        .model("users")
        .unwrap()
        .add(json!({ "id": 1, "name": "Ada" }), CommitOptions::new())
        .unwrap();
    assert_eq!(count.get_as::<usize>().unwrap(), 1);
}

#[test]
fn merged_view_recomputes_only_on_source_changes() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let store = Store::builder("views")
        .model(ModelDefinition::many("users"))
        .model(ModelDefinition::one("filter").default(json!({ "name": "Ada" })))
        .model(ModelDefinition::many("unrelated"))
        .view(ViewDefinition::merge("matching", ["users", "filter"], move |values| {
            counter.fetch_add(1, Ordering::SeqCst);
            let name = &values[1]["name"];
            let matching: Vec<Value> = values[0]
                .as_array()
                .into_iter()
                .flatten()
                .filter(|user| &user["name"] == name)
                .cloned()
                .collect();
            Value::Array(matching)
        }))
        .build()
        .unwrap();

    let users = store.model("users").unwrap();
    users
        .set(
            json!([{ "id": 1, "name": "Ada" }, { "id": 2, "name": "Grace" }]),
            CommitOptions::new(),
        )
        .unwrap();

    let view = store.view("matching").unwrap();
    assert_eq!(*view.get().unwrap(), json!([{ "id": 1, "name": "Ada" }]));

    store.model("unrelated").unwrap().add(json!({ "id": 1 }), CommitOptions::new()).unwrap();
    view.get().unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    store
        .model("filter")
        .unwrap()
        .set(json!({ "name": "Grace" }), CommitOptions::new())
        .unwrap();
    let matching: Vec<User> = view.get_as().unwrap();
    assert_eq!(matching[0].id, 2);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn owned_views_sort_without_touching_state() {
    let store = Store::builder("views")
        .model(ModelDefinition::many("scores").default(json!([3, 1, 2])))
        .view(ViewDefinition::from("ranked", "scores").resolve_owned(|mut scores| {
            if let Some(items) = scores.as_array_mut() {
                items.sort_by_key(|score| score.as_i64());
            }
            scores
        }))
        .view(ViewDefinition::merge_owned(
            "combined",
            ["scores", "bonus"],
            |mut values| {
                let bonus = values.pop().unwrap_or(Value::Null);
                let mut scores = values.pop().unwrap_or(Value::Null);
                if let Some(items) = scores.as_array_mut() {
                    items.push(bonus);
                }
                scores
            },
        ))
        .model(ModelDefinition::one("bonus").default(json!(10)))
        .build()
        .unwrap();

    assert_eq!(*store.view("ranked").unwrap().get().unwrap(), json!([1, 2, 3]));
    assert_eq!(*store.view("combined").unwrap().get().unwrap(), json!([3, 1, 2, 10]));
    assert_eq!(*store.model("scores").unwrap().get().unwrap(), json!([3, 1, 2]));
}

#[tokio::test]
async fn view_subscribers_are_notified() {
    let store = user_store(ScriptedTransport::new());
    let view = store.view("user_count").unwrap();
    let mut changes = view.subscribe();

    store
        .model("users")
        .unwrap()
        .add(json!({ "id": 1, "name": "Ada" }), CommitOptions::new())
        .unwrap();

    changes.changed().await.unwrap();
    assert_eq!(*view.get().unwrap(), json!(1));
}
