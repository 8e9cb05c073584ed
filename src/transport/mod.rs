//! Transport - how API actions reach their endpoint.
//!
//! The store only depends on the [`Transport`] trait. [`HttpTransport`]
//! (feature `http`) implements it with `reqwest`; tests plug in their own.
//!
//! Implementations must:
//! - reject non-success responses with [`TransportError::Status`], keeping
//!   the status, status text and decoded body
//! - resolve with [`TransportError::Aborted`] once the request signal aborts
//! - enforce `timeout` when one is set

#[cfg(feature = "http")]
mod http;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::action::AbortSignal;

#[cfg(feature = "http")]
pub use http::HttpTransport;

/// HTTP method of an API action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl Method {
    /// GET and HEAD requests never carry a body.
    pub fn allows_body(self) -> bool {
        !matches!(self, Method::Get | Method::Head)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        };
        f.write_str(name)
    }
}

/// A fully resolved request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
    pub signal: Option<AbortSignal>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            body: None,
            timeout: None,
            signal: None,
        }
    }
}

/// A successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    /// JSON body, or the raw text as a string when it is not JSON.
    pub data: Value,
}

impl Response {
    pub fn ok(data: Value) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            headers: BTreeMap::new(),
            data,
        }
    }
}

/// Error type for transport calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("request aborted")]
    Aborted,
    #[error("request timed out")]
    TimedOut,
    #[error("request failed with status {status} {status_text}")]
    Status {
        status: u16,
        status_text: String,
        data: Value,
    },
    #[error("network error: {0}")]
    Network(String),
}

/// Performs requests for API actions.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: Request) -> Result<Response, TransportError>;
}

/// Decodes a response body: JSON when it parses, the text otherwise.
pub(crate) fn decode_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
