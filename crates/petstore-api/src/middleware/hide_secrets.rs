//! Response secret scrubbing
//!
//! Last line of defense at the API boundary: any JSON response, success or
//! error, has credential fields removed at every depth before it is sent.
//! Handlers already return [`PublicUser`](crate::auth::PublicUser), so in
//! normal operation this finds nothing to remove.

use crate::error::AppError;
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// Keys that never leave the server
pub const SECRET_KEYS: &[&str] = &["password", "passwordHash", "password_hash"];

pub async fn hide_secrets_middleware(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if !is_json(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return AppError::Internal(format!("Failed to buffer response body: {e}"))
                .into_response()
        }
    };

    let mut value = match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => value,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };

    let body = if scrub_secrets(&mut value) {
        tracing::warn!("Removed credential fields from an outgoing response");
        match serde_json::to_vec(&value) {
            Ok(scrubbed) => Body::from(scrubbed),
            Err(e) => {
                return AppError::Internal(format!("Failed to re-encode response: {e}"))
                    .into_response()
            }
        }
    } else {
        Body::from(bytes)
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, body)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

/// Remove secret keys from `value` at any depth. Returns true if anything was removed.
pub fn scrub_secrets(value: &mut Value) -> bool {
    match value {
        Value::Object(map) => {
            let mut removed = false;
            for key in SECRET_KEYS {
                removed |= map.remove(*key).is_some();
            }
            for nested in map.values_mut() {
                removed |= scrub_secrets(nested);
            }
            removed
        }
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |removed, item| scrub_secrets(item) | removed),
        _ => false,
    }
}
