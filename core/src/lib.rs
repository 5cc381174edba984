//! Synchronous client for the Open Pinball Database (OPDB) HTTP API.
//!
//! # Overview
//! One operation per remote endpoint: the public `changelog` and
//! `typeahead_search`, plus five operations that require an api token
//! (`search_machines`, machine lookup by OPDB or IPDB id, and the two
//! exports). Every operation performs one blocking GET and returns the
//! response body as decoded JSON, or an `ApiError` classified by response
//! status.
//!
//! # Design
//! - `OpdbClient` holds the base URL, the optional token, and an eagerly
//!   built `ureq::Agent`; nothing else survives between calls.
//! - Each call builds a plain-data `ApiRequest` descriptor, so what goes on
//!   the wire stays inspectable and unit-testable without a socket.
//! - The token rides in the `api_token` query parameter because that is the
//!   remote's contract, not a header scheme. Merging it overwrites any
//!   caller-supplied value of the same name.
//! - Errors form a closed set keyed by status code; the payload is always
//!   the raw response body re-encoded as JSON text.

pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use client::{OpdbClient, API_BASE_URI};
pub use error::ApiError;
pub use http::{ApiRequest, ApiResponse, HttpMethod};
pub use types::{SearchOptions, TypeaheadOptions};
