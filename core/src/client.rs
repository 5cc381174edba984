//! Request dispatch and status interpretation for the OPDB API.
//!
//! # Design
//! `OpdbClient` holds the base URL, the optional api token, and an eagerly
//! built `ureq::Agent`; no other state survives between calls. Every public
//! operation builds an `ApiRequest` descriptor and funnels it through
//! `request`, which sends it and maps the response status. The five
//! operations that need credentials go through `private_request` instead,
//! which refuses before any I/O when no token is configured and otherwise
//! merges `api_token` into the query parameters.

use std::fmt;

use serde_json::Value;

use crate::error::ApiError;
use crate::http::{self, ApiRequest};
use crate::types::{flag, SearchOptions, TypeaheadOptions};

/// Production base URI of the Open Pinball Database API.
pub const API_BASE_URI: &str = "https://opdb.org/api";

/// Synchronous client for the OPDB API.
///
/// Construction is cheap and so is `Clone`: clones share the underlying
/// agent and its connection pool. Operations block the calling thread for
/// one round trip and return the decoded JSON body verbatim; the client
/// never reshapes responses.
#[derive(Clone)]
pub struct OpdbClient {
    base_url: String,
    api_token: Option<String>,
    agent: ureq::Agent,
}

impl OpdbClient {
    /// Create a client for [`API_BASE_URI`]. The token is opaque to the
    /// client; passing `None` restricts it to the public endpoints.
    pub fn new(api_token: Option<String>) -> Self {
        // Non-200 statuses must come back as data: this client owns the
        // status-to-error mapping.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            base_url: API_BASE_URI.to_string(),
            api_token,
            agent,
        }
    }

    /// Point the client at a different server, e.g. a local stub. Trailing
    /// slashes are trimmed.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// The configured api token, if any.
    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    // Public requests

    /// Fetch the list of OPDB id changes (moves and deletions).
    pub fn changelog(&self) -> Result<Value, ApiError> {
        self.request(ApiRequest::get("changelog"))
    }

    /// Type-ahead search over machine names.
    pub fn typeahead_search(
        &self,
        q: &str,
        options: &TypeaheadOptions,
    ) -> Result<Value, ApiError> {
        self.request(
            ApiRequest::get("search/typeahead")
                .param("q", q)
                .param("include_groups", flag(options.include_groups))
                .param("include_aliases", flag(options.include_aliases)),
        )
    }

    // Requests that require a valid api token

    /// Full machine search.
    pub fn search_machines(&self, q: &str, options: &SearchOptions) -> Result<Value, ApiError> {
        self.private_request(
            ApiRequest::get("search")
                .param("q", q)
                .param("require_opdb", flag(options.require_opdb))
                .param("include_groups", flag(options.include_groups))
                .param("include_aliases", flag(options.include_aliases))
                .param(
                    "include_grouping_entries",
                    flag(options.include_grouping_entries),
                ),
        )
    }

    /// Look up one machine by OPDB id.
    ///
    /// The id is interpolated into the request path as given, so callers
    /// must pass a well-formed OPDB id; an id containing `/` would address
    /// a different path.
    pub fn get_machine_info(&self, opdb_id: &str) -> Result<Value, ApiError> {
        self.private_request(ApiRequest::get(format!("machines/{opdb_id}")))
    }

    /// Look up one machine by its IPDB cross-reference id.
    pub fn get_machine_info_by_ipdb_id(&self, ipdb_id: u32) -> Result<Value, ApiError> {
        self.private_request(ApiRequest::get(format!("machines/ipdb/{ipdb_id}")))
    }

    /// Export the full machine catalog.
    pub fn export_machines(&self) -> Result<Value, ApiError> {
        self.private_request(ApiRequest::get("export"))
    }

    /// Export every machine group.
    pub fn export_machine_groups(&self) -> Result<Value, ApiError> {
        self.private_request(ApiRequest::get("export/groups"))
    }

    /// Send one request and map the response: a 200 body decodes to JSON
    /// and is returned verbatim, every other status becomes the error kind
    /// registered for it.
    fn request(&self, req: ApiRequest) -> Result<Value, ApiError> {
        let response = http::execute(&self.agent, &self.base_url, &req)?;
        if response.status != 200 {
            return Err(ApiError::from_status(response.status, &response.body));
        }
        serde_json::from_str(&response.body).map_err(|e| ApiError::DecodeError(e.to_string()))
    }

    /// Attach the configured token, then delegate to `request`.
    fn private_request(&self, req: ApiRequest) -> Result<Value, ApiError> {
        let req = self.authenticate(req)?;
        self.request(req)
    }

    /// Merge `api_token` into the request parameters, overwriting any
    /// caller-supplied value for that name. Fails without touching the
    /// network when no token is configured.
    fn authenticate(&self, req: ApiRequest) -> Result<ApiRequest, ApiError> {
        match &self.api_token {
            Some(token) => Ok(req.param("api_token", token.clone())),
            None => Err(ApiError::MissingApiToken),
        }
    }
}

impl fmt::Debug for OpdbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpdbClient")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A client whose requests could never succeed: if a refused call ever
    /// did reach the network it would surface as `TransportError` instead
    /// of `MissingApiToken`.
    fn tokenless() -> OpdbClient {
        OpdbClient::new(None).with_base_url("http://127.0.0.1:1")
    }

    #[test]
    fn new_targets_the_production_api() {
        let client = OpdbClient::new(None);
        assert_eq!(client.base_url, API_BASE_URI);
    }

    #[test]
    fn with_base_url_trims_trailing_slashes() {
        let client = OpdbClient::new(None).with_base_url("http://localhost:3000///");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn api_token_accessor_reflects_construction() {
        let with = OpdbClient::new(Some("secret".to_string()));
        assert_eq!(with.api_token(), Some("secret"));
        assert_eq!(OpdbClient::new(None).api_token(), None);
    }

    #[test]
    fn authenticate_merges_the_configured_token() {
        let client = OpdbClient::new(Some("secret".to_string()));
        let req = client.authenticate(ApiRequest::get("export")).unwrap();
        assert_eq!(
            req.params.get("api_token").map(String::as_str),
            Some("secret")
        );
    }

    #[test]
    fn authenticate_overwrites_a_caller_supplied_token() {
        let client = OpdbClient::new(Some("configured".to_string()));
        let req = ApiRequest::get("export").param("api_token", "caller");
        let req = client.authenticate(req).unwrap();
        assert_eq!(
            req.params.get("api_token").map(String::as_str),
            Some("configured")
        );
        assert_eq!(req.params.len(), 1);
    }

    #[test]
    fn authenticate_refuses_without_a_token() {
        let err = tokenless()
            .authenticate(ApiRequest::get("export"))
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingApiToken));
    }

    #[test]
    fn authenticated_operations_refuse_before_any_io() {
        let client = tokenless();
        let results = [
            client.search_machines("metallica", &SearchOptions::default()),
            client.get_machine_info("GRBE4-MQK1Z-A9Yn1"),
            client.get_machine_info_by_ipdb_id(6179),
            client.export_machines(),
            client.export_machine_groups(),
        ];
        for result in results {
            assert!(matches!(result.unwrap_err(), ApiError::MissingApiToken));
        }
    }

    #[test]
    fn debug_output_redacts_the_token() {
        let client = OpdbClient::new(Some("hunter2".to_string()));
        let rendered = format!("{client:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("hunter2"));
    }
}
