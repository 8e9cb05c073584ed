//! `reqwest`-backed transport.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{decode_body, Method, Request, Response, Transport, TransportError};

/// Sends requests with a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let mut builder = self
            .client
            .request(reqwest_method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let text = response.text().await.map_err(transport_error)?;
        let data = decode_body(&text);

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                status_text,
                data,
            });
        }

        Ok(Response {
            status: status.as_u16(),
            status_text,
            headers,
            data,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: Request) -> Result<Response, TransportError> {
        let signal = request.signal.clone();
        let url = request.url.clone();
        let method = request.method;
        match signal {
            Some(signal) => {
                tokio::select! {
                    biased;
                    _ = signal.aborted() => {
                        tracing::warn!(%method, %url, "request aborted");
                        Err(TransportError::Aborted)
                    }
                    result = self.send(request) => result,
                }
            }
            None => self.send(request).await,
        }
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::TimedOut
    } else {
        TransportError::Network(err.to_string())
    }
}
