//! Request audit interceptor
//!
//! Wraps every request and writes exactly one audit record carrying the
//! final response status. The response body is buffered so the record can
//! be written after the handler has finished, then replayed unchanged.
//!
//! The write runs on its own task and is awaited before the response is
//! released. If the client disconnects, the task still completes.

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header::CONTENT_TYPE, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use http_body_util::LengthLimitError;
use serde_json::Value;
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::{debug, error, warn};

use crate::auth::{authenticate, AuthUser};
use crate::error::ApiError;
use crate::repositories::NewAuditRecord;
use crate::state::AppState;

const REDACTED: &str = "***";

/// What is known about a request before it is handled
struct RequestSnapshot {
    user: Option<AuthUser>,
    ip_address: Option<String>,
    method: String,
    path: String,
    query_string: String,
}

impl RequestSnapshot {
    fn capture(state: &AppState, parts: &Parts) -> Self {
        Self {
            user: authenticate(state, &parts.headers, &parts.uri).ok(),
            ip_address: client_ip(parts),
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            query_string: parts
                .uri
                .query()
                .map(|q| format!("?{q}"))
                .unwrap_or_default(),
        }
    }

    fn into_record(self, request_body: String, status_code: u16) -> NewAuditRecord {
        NewAuditRecord {
            user_id: self.user.map(|u| u.user_guid),
            ip_address: self.ip_address,
            method: self.method,
            path: self.path,
            query_string: self.query_string,
            request_body,
            status_code,
            created_at: Utc::now(),
        }
    }
}

/// Audit middleware, installed with `middleware::from_fn_with_state`
pub async fn audit_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let settings = state.config.audit.clone();
    if !settings.enabled {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let snapshot = RequestSnapshot::capture(&state, &parts);
    if let Some(user) = &snapshot.user {
        parts.extensions.insert(user.clone());
    }

    let request_bytes = match to_bytes(body, settings.max_request_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, path = %snapshot.path, "request body rejected");
            let response = body_read_error(e).into_response();
            let record = snapshot.into_record(String::new(), response.status().as_u16());
            return finish(&state, record, response, settings.fail_closed).await;
        }
    };
    let request_body = body_snapshot(&parts.headers, &request_bytes, settings.max_body_bytes);

    let response = next
        .run(Request::from_parts(parts, Body::from(request_bytes)))
        .await;

    let (response_parts, response_body) = response.into_parts();
    let response_bytes = match to_bytes(response_body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "failed to buffer response body");
            let response = ApiError::Internal(anyhow::anyhow!("response body: {e}")).into_response();
            let record = snapshot.into_record(request_body, response.status().as_u16());
            return finish(&state, record, response, settings.fail_closed).await;
        }
    };

    let record = snapshot.into_record(request_body, response_parts.status.as_u16());
    let response = Response::from_parts(response_parts, Body::from(response_bytes));
    finish(&state, record, response, settings.fail_closed).await
}

/// 413 only when the size limit was hit; anything else is a broken body
fn body_read_error(err: axum::Error) -> ApiError {
    let inner = err.into_inner();
    if inner.is::<LengthLimitError>() {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(format!("Failed to read request body: {inner}"))
    }
}

/// Persist the record, then release the response
async fn finish(state: &AppState, record: NewAuditRecord, response: Response, fail_closed: bool) -> Response {
    let store = state.audit.clone();
    let (method, path, status) = (record.method.clone(), record.path.clone(), record.status_code);

    let outcome = tokio::spawn(async move { store.insert(record).await }).await;
    let failure = match outcome {
        Ok(Ok(saved)) => {
            debug!(audit_id = saved.id, %method, %path, status, "request audited");
            return response;
        }
        Ok(Err(e)) => anyhow::Error::from(e),
        Err(e) => anyhow::anyhow!("audit task failed: {e}"),
    };

    error!(error = ?failure, %method, %path, status, "failed to write audit record");
    if fail_closed {
        ApiError::Internal(failure.context("audit write failed")).into_response()
    } else {
        response
    }
}

/// Caller address, as recorded in audit records
pub struct ClientIp(pub Option<String>);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip(parts)))
    }
}

/// Client address from the socket, falling back to `X-Forwarded-For`
fn client_ip(parts: &Parts) -> Option<String> {
    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        return Some(addr.ip().to_string());
    }

    parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Text stored as the request body of an audit record
///
/// JSON bodies have password fields masked. Multipart and binary bodies are
/// summarised rather than stored. Text is cut to `max_len` bytes.
fn body_snapshot(headers: &HeaderMap, bytes: &Bytes, max_len: usize) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/") {
        return format!("[multipart body, {} bytes]", bytes.len());
    }

    if content_type.contains("json") {
        if let Ok(mut value) = serde_json::from_slice::<Value>(bytes) {
            redact_passwords(&mut value);
            return truncate(value.to_string(), max_len);
        }
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => truncate(text.to_string(), max_len),
        Err(_) => format!("[binary body, {} bytes]", bytes.len()),
    }
}

fn redact_passwords(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if key.to_ascii_lowercase().contains("password") {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    redact_passwords(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_passwords),
        _ => {}
    }
}

fn truncate(mut text: String, max_len: usize) -> String {
    if text.len() <= max_len {
        return text;
    }
    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text
}
