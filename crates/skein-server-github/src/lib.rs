// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GitHub client for Skein.
//!
//! Everything goes through one primitive, [`GraphqlTransport::request_graphql`].
//! On top of it this crate fetches issues and pull requests in a normalized
//! [`ExternalThread`] shape, creates or reuses pull requests, and verifies
//! and parses webhook deliveries.

pub mod error;
pub mod fetch;
pub mod pull_request;
pub mod query;
pub mod transport;
pub mod types;
pub mod webhook;

pub use error::GithubError;
pub use fetch::{GraphqlThreadFetcher, ThreadFetcher};
pub use pull_request::{
	CreatePullRequest, GraphqlPullRequestService, PullRequestService, UpdatePullRequest,
};
pub use query::{ThreadQuery, OPEN_PULL_REQUEST_CANDIDATES, SEARCH_PAGE_SIZE};
pub use transport::{graphql_endpoint, GraphqlRequest, GraphqlTransport, ReqwestGraphqlTransport};
pub use types::{ExternalThread, SearchPage};
pub use webhook::{
	compute_webhook_signature, parse_thread_event, verify_webhook_signature, ThreadEvent,
};
