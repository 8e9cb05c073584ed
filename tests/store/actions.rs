//! Action execution: requests, handlers, commits and errors.

use std::time::Duration;

use actionstore::{
    ActionContext, ActionError, BoxError, ActionStatus, ApiDefinition, CallOptions, CommitMode, CommitOptions,
    CommitTemplate, HandlerDefinition, Method, ModelDefinition, Store, StoreConfig,
};
use serde_json::{json, Value};

use crate::handlers::{create_user, rename_profile};
use crate::support::{init_tracing, user_store, Post, Reply, ScriptedTransport, User};

#[tokio::test]
async fn api_result_is_committed() {
    let transport = ScriptedTransport::new();
    transport.reply(Reply::ok(json!([{ "id": 1, "name": "Ada" }])));
    let store = user_store(transport.clone());

    let fetch = store.action("fetch_users").unwrap();
    let data = fetch.execute(CallOptions::new()).await.unwrap();

    assert_eq!(data, json!([{ "id": 1, "name": "Ada" }]));
    assert_eq!(fetch.status(), ActionStatus::Success);
    assert_eq!(fetch.last_data(), Some(data));
    assert!(fetch.error().is_none());
    assert!(!fetch.is_pending());

    let users: Vec<User> = store.model("users").unwrap().get_as().unwrap();
    assert_eq!(users[0].name, "Ada");

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.url, "https://api.test/users");
    assert!(request.body.is_none());
}

#[tokio::test]
async fn path_params_and_call_values_are_applied() {
    let transport = ScriptedTransport::new();
    transport.reply(Reply::ok(json!({ "id": 7, "name": "Grace" })));
    let store = user_store(transport.clone());

    store
        .action("fetch_user")
        .unwrap()
        .execute(
            CallOptions::new()
                .param("id", 7)
                .query(json!({ "expand": "posts", "page": 2 }))
                .headers(json!({ "x-request-id": "abc" }))
                .body(json!({ "ignored": true }))
                .timeout(Duration::from_millis(300)),
        )
        .await
        .unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.url, "https://api.test/users/7");
    assert_eq!(request.query["expand"], "posts");
    assert_eq!(request.query["page"], "2");
    assert_eq!(request.headers["x-request-id"], "abc");
    assert_eq!(request.timeout, Some(Duration::from_millis(300)));
    assert!(request.body.is_none(), "GET never sends a body");
    assert_eq!(store.model("users").unwrap().get().unwrap()[0]["id"], 7);
}

#[tokio::test]
async fn missing_path_param_fails_without_request() {
    let transport = ScriptedTransport::new();
    let store = user_store(transport.clone());
    let fetch = store.action("fetch_user").unwrap();

    let err = fetch.execute(CallOptions::new()).await.unwrap_err();

    match &err {
        ActionError::Api(api) => assert_eq!(api.message, "missing path parameter `id`"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(transport.request_count(), 0);
    assert_eq!(fetch.status(), ActionStatus::Error);
    assert_eq!(fetch.error(), Some(err));
}

#[tokio::test]
async fn http_failures_keep_status_details() {
    let transport = ScriptedTransport::new();
    transport.reply(Reply::status(404, "Not Found", json!({ "error": "no such user" })));
    let store = user_store(transport);
    let fetch = store.action("fetch_user").unwrap();

    let err = fetch
        .execute(CallOptions::new().param("id", 1))
        .await
        .unwrap_err();

    let ActionError::Api(api) = err else {
        panic!("expected an api error");
    };
    assert_eq!(api.status, Some(404));
    assert_eq!(api.status_text.as_deref(), Some("Not Found"));
    assert_eq!(api.data, Some(json!({ "error": "no such user" })));
    assert_eq!(*store.model("users").unwrap().get().unwrap(), json!([]));
}

#[tokio::test]
async fn failed_actions_can_be_retried() {
    let transport = ScriptedTransport::new();
    transport
        .reply(Reply::status(500, "Internal Server Error", Value::Null))
        .reply(Reply::ok(json!([])));
    let store = user_store(transport);
    let fetch = store.action("fetch_users").unwrap();

    assert!(fetch.execute(CallOptions::new()).await.is_err());
    assert_eq!(fetch.status(), ActionStatus::Error);

    fetch.execute(CallOptions::new()).await.unwrap();
    assert_eq!(fetch.status(), ActionStatus::Success);
    assert!(fetch.error().is_none());

    fetch.reset();
    assert_eq!(fetch.status(), ActionStatus::Idle);
    assert!(fetch.last_data().is_none());
}

#[tokio::test]
async fn definition_values_merge_under_call_values() {
    init_tracing();
    let transport = ScriptedTransport::new();
    let store = Store::builder("merge")
        .config(
            StoreConfig::new()
                .endpoint("https://api.test/v1/")
                .header("authorization", "Bearer t")
                .timeout(Duration::from_secs(9)),
        )
        .transport(transport.clone())
        .model(ModelDefinition::one("profile"))
        .action(
            "save",
            ApiDefinition::put("/profile")
                .headers(json!({ "accept": "application/json", "x-client": "web" }))
                .body_with(|ctx| json!({ "source": "form", "user": ctx.payload()["user"] }))
                .commit(CommitTemplate::new("profile", CommitMode::Set)),
        )
        .build()
        .unwrap();

    store
        .action("save")
        .unwrap()
        .execute(
            CallOptions::new()
                .payload(json!({ "user": 3 }))
                .headers(json!({ "x-client": "cli" }))
                .body(json!({ "name": "Ada" })),
        )
        .await
        .unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::Put);
    assert_eq!(request.url, "https://api.test/v1/profile");
    assert_eq!(request.headers["authorization"], "Bearer t");
    assert_eq!(request.headers["accept"], "application/json");
    assert_eq!(request.headers["x-client"], "cli");
    assert_eq!(request.timeout, Some(Duration::from_secs(9)));
    assert_eq!(
        request.body,
        Some(json!({ "source": "form", "user": 3, "name": "Ada" }))
    );
    // The echoed body is committed.
    assert_eq!(store.model("profile").unwrap().get().unwrap()["name"], "Ada");
}

#[tokio::test]
async fn transformers_wrap_the_transport() {
    let transport = ScriptedTransport::new();
    transport.reply(Reply::ok(json!({ "data": [{ "id": 5, "name": "Linus" }] })));
    let store = user_store(transport.clone());

    store
        .action("fetch_users")
        .unwrap()
        .execute(
            CallOptions::new()
                .transform_request(|mut request| {
                    request.headers.insert("x-signed".into(), "yes".into());
                    request
                })
                .transform_response(|data| data["data"].clone()),
        )
        .await
        .unwrap();

    assert_eq!(transport.requests()[0].headers["x-signed"], "yes");
    let users: Vec<User> = store.model("users").unwrap().get_as().unwrap();
    assert_eq!(users[0].id, 5);
}

#[tokio::test]
async fn commit_mode_can_be_overridden_per_call() {
    let transport = ScriptedTransport::new();
    transport
        .reply(Reply::ok(json!([{ "id": 1, "name": "Ada" }])))
        .reply(Reply::ok(json!({ "id": 2, "name": "Grace" })));
    let store = user_store(transport);
    let fetch = store.action("fetch_users").unwrap();

    fetch.execute(CallOptions::new()).await.unwrap();
    fetch
        .execute(CallOptions::new().commit_mode(CommitMode::Add))
        .await
        .unwrap();

    assert_eq!(store.model("users").unwrap().get().unwrap().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn wire_aliases_are_decoded_on_commit() {
    let transport = ScriptedTransport::new();
    transport.reply(Reply::ok(json!([
        { "slug": "hello", "post-title": "Hello", "author-id": 1 }
    ])));
    let store = user_store(transport);

    store
        .action("fetch_posts")
        .unwrap()
        .execute(CallOptions::new())
        .await
        .unwrap();

    let posts = store.model("posts").unwrap();
    let typed: Vec<Post> = posts.get_as().unwrap();
    assert_eq!(typed[0].title, "Hello");
    assert_eq!(typed[0].author_id, 1);
    assert_eq!(
        posts.encode((*posts.get().unwrap()).clone()).unwrap(),
        json!([{ "slug": "hello", "post-title": "Hello", "author-id": 1 }])
    );
}

async fn fail(_ctx: ActionContext) -> Result<Value, BoxError> {
    Err("disk full".into())
}

async fn not_a_list(_ctx: ActionContext) -> Result<Value, BoxError> {
    Ok(json!({ "not": "a list" }))
}

async fn list_items(ctx: ActionContext) -> Result<Value, BoxError> {
    let response = ctx.api().ok_or("no response")?;
    Ok(response.data["items"].clone())
}

fn handler_store() -> Store {
    init_tracing();
    Store::builder("handlers")
        .model(ModelDefinition::many("users"))
        .model(ModelDefinition::one("profile"))
        .action(create_user::ACTION, HandlerDefinition::new(create_user::handle))
        .action(
            rename_profile::ACTION,
            HandlerDefinition::new(rename_profile::handle).commit(
                CommitTemplate::new("profile", CommitMode::Patch)
                    .with_options(CommitOptions::new().deep()),
            ),
        )
        .action(
            "fail",
            HandlerDefinition::new(fail),
        )
        .action(
            "bad_commit",
            HandlerDefinition::new(not_a_list)
                .commit(CommitTemplate::new("users", CommitMode::Set)),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn handlers_commit_explicitly() {
    let store = handler_store();
    let create = store.action(create_user::ACTION).unwrap();

    let user = create
        .execute(CallOptions::new().payload(json!({ "id": 1, "name": "Ada" })))
        .await
        .unwrap();
    create
        .execute(CallOptions::new().payload(json!({ "id": 1, "name": "Ada" })))
        .await
        .unwrap();

    assert_eq!(*store.model("users").unwrap().get().unwrap(), json!([user]));
}

#[tokio::test]
async fn typed_handler_errors_pass_through() {
    let store = handler_store();
    let create = store.action(create_user::ACTION).unwrap();

    let err = create
        .execute(CallOptions::new().payload(json!({ "id": 1, "name": " " })))
        .await
        .unwrap_err();
    match err {
        ActionError::Handler(handler) => assert_eq!(handler.message, "name must not be empty"),
        other => panic!("unexpected {other:?}"),
    }

    let err = create
        .execute(CallOptions::new().payload(json!({ "id": "one" })))
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("invalid payload"));
}

#[tokio::test]
async fn plain_handler_errors_become_handler_errors() {
    let store = handler_store();
    let fail = store.action("fail").unwrap();

    let err = fail.execute(CallOptions::new()).await.unwrap_err();

    match fail.error() {
        Some(ActionError::Handler(handler)) => {
            assert_eq!(handler.message, "disk full");
            assert_eq!(handler.cause().map(|c| c.to_string()).as_deref(), Some("disk full"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(fail.error(), Some(err));
    assert_eq!(fail.status(), ActionStatus::Error);
}

#[tokio::test]
async fn handler_results_go_through_the_template() {
    let store = handler_store();
    let profile = store.model("profile").unwrap();
    let rename = store.action(rename_profile::ACTION).unwrap();

    let err = rename
        .execute(CallOptions::new().payload(json!({ "name": "Grace" })))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "no profile loaded");

    profile
        .set(json!({ "name": "Ada", "meta": { "age": 36 } }), CommitOptions::new())
        .unwrap();
    rename
        .execute(CallOptions::new().payload(json!({ "name": "Grace" })))
        .await
        .unwrap();
    assert_eq!(
        *profile.get().unwrap(),
        json!({ "name": "Grace", "meta": { "age": 36 } })
    );
}

#[tokio::test]
async fn commit_failures_are_commit_errors() {
    let store = handler_store();
    let action = store.action("bad_commit").unwrap();

    let err = action.execute(CallOptions::new()).await.unwrap_err();

    assert!(matches!(&err, ActionError::Commit(commit) if commit.model == "users"));
    assert_eq!(action.status(), ActionStatus::Error);
    assert_eq!(*store.model("users").unwrap().get().unwrap(), json!([]));
}

#[tokio::test]
async fn api_handlers_receive_the_fetched_response() {
    init_tracing();
    let transport = ScriptedTransport::new();
    transport.reply(Reply::ok(json!({ "items": [{ "id": 1 }, { "id": 2 }], "total": 2 })));
    let store = Store::builder("api_handler")
        .transport(transport.clone())
        .model(ModelDefinition::many("items"))
        .action(
            "load",
            ApiDefinition::get("/items")
                .handler(list_items)
                .commit(CommitTemplate::new("items", CommitMode::Set)),
        )
        .build()
        .unwrap();

    let data = store.action("load").unwrap().execute(CallOptions::new()).await.unwrap();

    assert_eq!(data, json!([{ "id": 1 }, { "id": 2 }]));
    assert_eq!(transport.request_count(), 1);
    assert_eq!(*store.model("items").unwrap().get().unwrap(), data);
}
