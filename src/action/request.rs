//! Builds the transport request of an API action.

use std::collections::BTreeMap;

use serde_json::Value;

use super::context::ActionContext;
use super::definition::ApiDefinition;
use super::error::ApiError;
use super::options::CallOptions;
use super::signal::AbortSignal;
use crate::store::StoreConfig;
use crate::transport::Request;

pub(crate) fn build(
    api: &ApiDefinition,
    config: &StoreConfig,
    ctx: &ActionContext,
    options: &CallOptions,
    signal: AbortSignal,
) -> Result<Request, ApiError> {
    let path = fill_params(&api.path, &options.params)?;
    let mut request = Request::new(api.method, join_url(&config.endpoint, &path));

    request.headers = config.headers.clone();
    for headers in [api.headers.as_ref().map(|h| h.resolve(ctx)), options.headers.clone()] {
        extend_strings(&mut request.headers, headers.as_ref());
    }
    for query in [api.query.as_ref().map(|q| q.resolve(ctx)), options.query.clone()] {
        extend_strings(&mut request.query, query.as_ref());
    }
    if api.method.allows_body() {
        let declared = api.body.as_ref().map(|b| b.resolve(ctx));
        request.body = merge_body(declared, options.body.clone());
    }

    request.timeout = options
        .timeout
        .or(api.timeout)
        .or_else(|| config.timeout_duration());
    request.signal = Some(signal);
    Ok(request)
}

/// Substitutes `:name` segments. A missing parameter fails the request.
fn fill_params(path: &str, params: &BTreeMap<String, String>) -> Result<String, ApiError> {
    let segments = path
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => params
                .get(name)
                .map(String::as_str)
                .ok_or_else(|| ApiError::new(format!("missing path parameter `{name}`"))),
            _ => Ok(segment),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(segments.join("/"))
}

fn join_url(endpoint: &str, path: &str) -> String {
    if endpoint.is_empty() || path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    if path.is_empty() {
        return endpoint.to_string();
    }
    format!(
        "{}/{}",
        endpoint.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Shallow-merges an object of header or query values. `null` removes a key.
fn extend_strings(target: &mut BTreeMap<String, String>, source: Option<&Value>) {
    let Some(Value::Object(fields)) = source else {
        return;
    };
    for (name, value) in fields {
        match value {
            Value::Null => {
                target.remove(name);
            }
            Value::String(text) => {
                target.insert(name.clone(), text.clone());
            }
            other => {
                target.insert(name.clone(), other.to_string());
            }
        }
    }
}

fn merge_body(declared: Option<Value>, call: Option<Value>) -> Option<Value> {
    match (declared, call) {
        (Some(Value::Object(mut base)), Some(Value::Object(overrides))) => {
            base.extend(overrides);
            Some(Value::Object(base))
        }
        (declared, call) => call.or(declared),
    }
}
