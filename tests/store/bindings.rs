//! Caller-owned status cells.

use std::time::Duration;

use actionstore::{ActionError, ActionStatus, Bind, CallOptions, StateRef};
use serde_json::json;

use crate::support::{user_store, Reply, ScriptedTransport};

fn cells() -> (StateRef<ActionStatus>, StateRef<Option<ActionError>>) {
    (StateRef::default(), StateRef::default())
}

#[tokio::test]
async fn bound_calls_leave_own_status_alone() {
    let transport = ScriptedTransport::new();
    transport.reply(Reply::status(500, "Internal Server Error", json!(null)));
    let store = user_store(transport);
    let fetch = store.action("fetch_users").unwrap();
    let (status, error) = cells();

    let err = fetch
        .execute(CallOptions::new().bind(Bind::new(status.clone(), error.clone())))
        .await
        .unwrap_err();

    assert_eq!(status.get(), ActionStatus::Error);
    assert_eq!(error.get(), Some(err));
    assert_eq!(fetch.status(), ActionStatus::Idle);
    assert!(fetch.error().is_none());
}

#[tokio::test]
async fn bound_success_clears_the_bound_error() {
    let transport = ScriptedTransport::new();
    transport
        .reply(Reply::status(404, "Not Found", json!({ "missing": true })))
        .reply(Reply::ok(json!([{ "id": 1, "name": "Ada" }])));
    let store = user_store(transport);
    let fetch = store.action("fetch_users").unwrap();
    let (status, error) = cells();
    let bind = Bind::new(status.clone(), error.clone());

    assert!(fetch.execute(CallOptions::new().bind(bind.clone())).await.is_err());
    assert!(error.get().is_some());

    fetch.execute(CallOptions::new().bind(bind)).await.unwrap();
    assert_eq!(status.get(), ActionStatus::Success);
    assert!(error.get().is_none());
    assert_eq!(fetch.last_data(), Some(json!([{ "id": 1, "name": "Ada" }])));
}

#[tokio::test]
async fn two_bindings_track_their_own_calls() {
    let transport = ScriptedTransport::new();
    transport
        .reply(Reply::ok(json!({ "id": 1, "name": "Ada" })))
        .reply(Reply::status(404, "Not Found", json!(null)));
    let store = user_store(transport);
    let fetch = store.action("fetch_user").unwrap();
    let (first_status, first_error) = cells();
    let (second_status, second_error) = cells();

    fetch
        .execute(
            CallOptions::new()
                .param("id", 1)
                .bind(Bind::new(first_status.clone(), first_error.clone())),
        )
        .await
        .unwrap();
    fetch
        .execute(
            CallOptions::new()
                .param("id", 2)
                .bind(Bind::new(second_status.clone(), second_error.clone())),
        )
        .await
        .unwrap_err();

    assert_eq!(first_status.get(), ActionStatus::Success);
    assert!(first_error.get().is_none());
    assert_eq!(second_status.get(), ActionStatus::Error);
    assert_eq!(second_error.get().and_then(|e| match e {
        ActionError::Api(api) => api.status,
        _ => None,
    }), Some(404));
}

#[tokio::test]
async fn blocked_bound_call_reports_error() {
    let transport = ScriptedTransport::new();
    transport.reply(Reply::ok(json!([])).after(Duration::from_millis(50)));
    let store = user_store(transport);
    let fetch = store.action("fetch_users").unwrap();
    let (status, error) = cells();

    let (first, second) = tokio::join!(
        fetch.execute(CallOptions::new()),
        fetch.execute(CallOptions::new().bind(Bind::new(status.clone(), error.clone())))
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(ActionError::Concurrent(_))));
    assert_eq!(status.get(), ActionStatus::Error);
    assert!(error.get().is_some_and(|e| e.is_concurrent()));
    assert_eq!(fetch.status(), ActionStatus::Success);
}

#[tokio::test]
async fn bound_cells_can_be_watched() {
    let transport = ScriptedTransport::new();
    transport.reply(Reply::ok(json!([])).after(Duration::from_millis(20)));
    let store = user_store(transport);
    let fetch = store.action("fetch_users").unwrap();
    let (status, error) = cells();
    let mut watching = status.subscribe();

    let running = tokio::spawn({
        let fetch = fetch.clone();
        let bind = Bind::new(status.clone(), error);
        async move { fetch.execute(CallOptions::new().bind(bind)).await }
    });

    watching.changed().await.unwrap();
    assert_eq!(*watching.borrow_and_update(), ActionStatus::Pending);
    running.await.unwrap().unwrap();
    watching.changed().await.unwrap();
    assert_eq!(*watching.borrow(), ActionStatus::Success);
}

#[tokio::test]
async fn blocked_behind_a_bound_call_marks_own_status() {
    let transport = ScriptedTransport::new();
    transport.reply(Reply::ok(json!([])).after(Duration::from_millis(50)));
    let store = user_store(transport);
    let fetch = store.action("fetch_users").unwrap();
    let (status, error) = cells();

    let (bound, own) = tokio::join!(
        fetch.execute(CallOptions::new().bind(Bind::new(status.clone(), error.clone()))),
        fetch.execute(CallOptions::new())
    );

    assert!(bound.is_ok());
    assert_eq!(status.get(), ActionStatus::Success);
    assert!(error.get().is_none());

    assert!(matches!(own, Err(ActionError::Concurrent(_))));
    assert_eq!(fetch.status(), ActionStatus::Error);
    assert!(fetch.error().is_some_and(|e| e.is_concurrent()));
    assert!(!fetch.is_pending());
}
