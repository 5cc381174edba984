//! Request descriptors and the blocking transport.
//!
//! # Design
//! `ApiRequest` and `ApiResponse` describe one exchange as plain data: the
//! client builds a descriptor per call and discards it afterwards. `execute`
//! performs the single blocking round trip through a shared `ureq::Agent`
//! and hands non-200 statuses back as data, so status interpretation stays
//! with the client rather than the transport.
//!
//! Query parameters live in a `BTreeMap` keyed by name: inserting a name
//! twice keeps the later value, which is exactly the merge behavior token
//! injection relies on.

use std::collections::BTreeMap;

use crate::error::ApiError;

/// Identification header sent with every request.
const USER_AGENT: &str = concat!("opdb rust client ", env!("CARGO_PKG_VERSION"));

/// HTTP method for an API request. Every endpoint this client covers is a
/// read, so only `Get` exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
}

/// One API request described as plain data: method, endpoint path relative
/// to the base URL, and named query parameters.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub endpoint: String,
    pub params: BTreeMap<String, String>,
}

impl ApiRequest {
    /// A GET request for `endpoint` with no parameters.
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            endpoint: endpoint.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add one query parameter, replacing any earlier value for `name`.
    pub fn param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Full request URL under `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url, self.endpoint)
    }
}

/// Status and body of one API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Execute `req` against `base_url` and collect the response.
///
/// Non-200 statuses come back as an `ApiResponse` rather than `Err`; only
/// failures that produce no response at all map to
/// [`ApiError::TransportError`].
pub(crate) fn execute(
    agent: &ureq::Agent,
    base_url: &str,
    req: &ApiRequest,
) -> Result<ApiResponse, ApiError> {
    let url = req.url(base_url);
    tracing::debug!(url = %url, params = req.params.len(), "sending request");

    let mut builder = match req.method {
        HttpMethod::Get => agent.get(&url),
    };
    builder = builder
        .header("Accept", "application/json")
        .header("User-Agent", USER_AGENT);
    for (name, value) in &req.params {
        builder = builder.query(name, value);
    }

    let mut response = builder
        .call()
        .map_err(|e| ApiError::TransportError(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| ApiError::TransportError(e.to_string()))?;
    tracing::debug!(status, body_len = body.len(), "response received");

    Ok(ApiResponse { status, body })
}
