//! Error types for the OPDB API client.
//!
//! # Design
//! Response statuses map to a closed set of variants: the five codes the
//! remote distinguishes (400/401/403/404/422) each get their own kind, and
//! every other non-200 lands in `HttpError` with the raw status for
//! debugging. The payload of each response-derived variant is the raw body
//! re-encoded as JSON text: a body that parses as JSON re-serializes
//! compactly, anything else becomes a quoted JSON string. Callers wanting
//! structured failure detail parse that payload themselves.

use std::fmt;

use serde_json::Value;

/// Errors returned by `OpdbClient` operations.
#[derive(Debug)]
pub enum ApiError {
    /// The server returned 400.
    BadRequest(String),

    /// The server returned 401: the api token was missing or rejected.
    Unauthorized(String),

    /// The server returned 403.
    Forbidden(String),

    /// The server returned 404: no machine with the requested id.
    NotFound(String),

    /// The server returned 422: the query failed validation.
    UnprocessableEntity(String),

    /// The server returned a non-200 status outside the named set.
    HttpError { status: u16, body: String },

    /// An authenticated operation was invoked with no api token configured.
    /// Raised before any network I/O happens.
    MissingApiToken,

    /// The request produced no response at all (connect failure, socket
    /// error while reading the body).
    TransportError(String),

    /// The 200 response body was not valid JSON.
    DecodeError(String),
}

impl ApiError {
    /// Map a non-200 response to its error kind, re-encoding the body as
    /// JSON text for the payload.
    pub(crate) fn from_status(status: u16, body: &str) -> ApiError {
        let message = json_message(body);
        match status {
            400 => ApiError::BadRequest(message),
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            422 => ApiError::UnprocessableEntity(message),
            _ => ApiError::HttpError {
                status,
                body: message,
            },
        }
    }
}

/// Re-encode a raw response body as JSON text. An empty or non-JSON body
/// becomes a quoted JSON string, so the payload is always valid JSON.
fn json_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => value.to_string(),
        Err(_) => Value::String(body.to_string()).to_string(),
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(body) => write!(f, "bad request (400): {body}"),
            ApiError::Unauthorized(body) => write!(f, "unauthorized (401): {body}"),
            ApiError::Forbidden(body) => write!(f, "forbidden (403): {body}"),
            ApiError::NotFound(body) => write!(f, "not found (404): {body}"),
            ApiError::UnprocessableEntity(body) => {
                write!(f, "unprocessable entity (422): {body}")
            }
            ApiError::HttpError { status, body } => write!(f, "HTTP {status}: {body}"),
            ApiError::MissingApiToken => write!(f, "api token not set"),
            ApiError::TransportError(msg) => write!(f, "transport failed: {msg}"),
            ApiError::DecodeError(msg) => write!(f, "response decode failed: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}
