//! Test domain and a scripted transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actionstore::{
    async_trait, ApiDefinition, CommitMode, CommitTemplate, ModelDefinition, Request, Response,
    Shape, Store, StoreConfig, Transport, TransportError, ViewDefinition,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Shape)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Shape)]
pub struct Post {
    #[shape(id)]
    pub slug: String,
    #[shape(alias = "post-title")]
    pub title: String,
    #[shape(alias = "author-id")]
    pub author_id: u64,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One scripted reply.
pub struct Reply {
    pub delay: Duration,
    pub result: Result<Response, TransportError>,
}

impl Reply {
    pub fn ok(data: Value) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(Response::ok(data)),
        }
    }

    pub fn status(status: u16, status_text: &str, data: Value) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(TransportError::Status {
                status,
                status_text: status_text.to_string(),
                data,
            }),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Reply>,
    requests: Vec<Request>,
}

/// Answers requests in order from a script, honoring abort signals.
/// Unscripted requests echo their body.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, reply: Reply) -> &Self {
        self.script.lock().unwrap().replies.push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, request: Request) -> Result<Response, TransportError> {
        let reply = {
            let mut script = self.script.lock().unwrap();
            script.requests.push(request.clone());
            script.replies.pop_front()
        };
        let reply = reply.unwrap_or_else(|| Reply::ok(request.body.clone().unwrap_or(Value::Null)));

        let wait = tokio::time::sleep(reply.delay);
        match &request.signal {
            Some(signal) => tokio::select! {
                _ = signal.aborted() => return Err(TransportError::Aborted),
                _ = wait => {}
            },
            None => wait.await,
        }
        reply.result
    }
}

/// A store with users, posts and a few API actions over `transport`.
pub fn user_store(transport: ScriptedTransport) -> Store {
    init_tracing();
    Store::builder("users")
        .config(StoreConfig::new().endpoint("https://api.test"))
        .transport(transport)
        .model(ModelDefinition::many("users").shape_of::<User>())
        .model(ModelDefinition::many("posts").shape_of::<Post>())
        .model(ModelDefinition::one("profile").shape_of::<User>())
        .view(ViewDefinition::from("user_count", "users").resolve(|users| {
            json!(users.as_array().map_or(0, Vec::len))
        }))
        .action(
            "fetch_users",
            ApiDefinition::get("/users").commit(CommitTemplate::new("users", CommitMode::Set)),
        )
        .action(
            "fetch_user",
            ApiDefinition::get("/users/:id").commit(
                CommitTemplate::new("users", CommitMode::Add)
                    .with_options(actionstore::CommitOptions::new().unique()),
            ),
        )
        .action(
            "fetch_posts",
            ApiDefinition::get("/posts").commit(CommitTemplate::new("posts", CommitMode::Set)),
        )
        .build()
        .unwrap()
}
