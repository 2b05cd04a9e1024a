// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The single GraphQL request primitive everything else is built on.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::error::GithubError;

const USER_AGENT: &str = concat!("skein/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct GraphqlRequest {
	pub query: String,
	pub variables: Value,
}

impl GraphqlRequest {
	pub fn new(query: impl Into<String>, variables: Value) -> Self {
		Self {
			query: query.into(),
			variables,
		}
	}
}

#[async_trait]
pub trait GraphqlTransport: Send + Sync {
	/// Executes a query or mutation and returns the `data` payload.
	async fn request_graphql(&self, request: GraphqlRequest) -> Result<Value, GithubError>;
}

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
	data: Option<Value>,
	#[serde(default)]
	errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
	message: String,
	#[serde(rename = "type")]
	kind: Option<String>,
}

/// GraphQL transport over HTTPS, authenticated with a bearer token.
#[derive(Clone)]
pub struct ReqwestGraphqlTransport {
	endpoint: Url,
	token: String,
	client: reqwest::Client,
}

impl fmt::Debug for ReqwestGraphqlTransport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReqwestGraphqlTransport")
			.field("endpoint", &self.endpoint.as_str())
			.field("token", &"<redacted>")
			.finish()
	}
}

impl ReqwestGraphqlTransport {
	/// Builds a transport for the API root of a code host, e.g.
	/// `https://api.github.com/` or `https://ghe.example.com/api/`.
	pub fn new(api_url: &Url, token: impl Into<String>) -> Result<Self, GithubError> {
		let client = reqwest::Client::builder()
			.user_agent(USER_AGENT)
			.timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(|e| GithubError::Config(format!("failed to build HTTP client: {e}")))?;

		Ok(Self {
			endpoint: graphql_endpoint(api_url)?,
			token: token.into(),
			client,
		})
	}

	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}
}

/// Resolves the GraphQL endpoint below an API root.
pub fn graphql_endpoint(api_url: &Url) -> Result<Url, GithubError> {
	let root = skein_common_codehost::normalize_base_url(api_url.clone());
	root
		.join("graphql")
		.map_err(|e| GithubError::Config(format!("invalid API URL {api_url}: {e}")))
}

#[async_trait]
impl GraphqlTransport for ReqwestGraphqlTransport {
	#[tracing::instrument(skip(self, request), fields(endpoint = %self.endpoint))]
	async fn request_graphql(&self, request: GraphqlRequest) -> Result<Value, GithubError> {
		let response = self
			.client
			.post(self.endpoint.clone())
			.bearer_auth(&self.token)
			.json(&json!({
				"query": request.query,
				"variables": request.variables,
			}))
			.send()
			.await?;

		let status = response.status();
		let rate_limit_exhausted = response
			.headers()
			.get("x-ratelimit-remaining")
			.and_then(|v| v.to_str().ok())
			.is_some_and(|v| v == "0");
		let body = response.text().await?;

		if !status.is_success() {
			tracing::debug!(status = status.as_u16(), "GraphQL request failed");
			return Err(match status.as_u16() {
				401 => GithubError::Unauthorized,
				429 => GithubError::RateLimited,
				403 if rate_limit_exhausted => GithubError::RateLimited,
				code => GithubError::api_error(code, truncate_for_error(&body)),
			});
		}

		let envelope: GraphqlEnvelope = serde_json::from_str(&body)
			.map_err(|e| GithubError::InvalidResponse(format!("invalid GraphQL envelope: {e}")))?;
		into_data(envelope)
	}
}

// NOT_FOUND errors come with a partial `data` payload where the missing
// entity is null; callers decide what a null means.
fn into_data(envelope: GraphqlEnvelope) -> Result<Value, GithubError> {
	let only_not_found = envelope
		.errors
		.iter()
		.all(|e| e.kind.as_deref() == Some("NOT_FOUND"));

	if !envelope.errors.is_empty() && !(only_not_found && envelope.data.is_some()) {
		if envelope.errors.iter().any(|e| e.kind.as_deref() == Some("RATE_LIMITED")) {
			return Err(GithubError::RateLimited);
		}
		let message = envelope
			.errors
			.into_iter()
			.map(|e| e.message)
			.collect::<Vec<_>>()
			.join("; ");
		return Err(GithubError::GraphQl(message));
	}

	envelope
		.data
		.ok_or_else(|| GithubError::InvalidResponse("response did not include data".to_string()))
}

fn truncate_for_error(body: &str) -> String {
	const MAX_LEN: usize = 200;
	if body.chars().count() <= MAX_LEN {
		body.to_owned()
	} else {
		format!("{}...", body.chars().take(MAX_LEN).collect::<String>())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wiremock::matchers::{header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	async fn transport_for(server: &MockServer) -> ReqwestGraphqlTransport {
		let api = Url::parse(&format!("{}/api", server.uri())).unwrap();
		ReqwestGraphqlTransport::new(&api, "t0ken").unwrap()
	}

	fn request() -> GraphqlRequest {
		GraphqlRequest::new("query { viewer { login } }", json!({}))
	}

	#[test]
	fn test_graphql_endpoint() {
		let github = Url::parse("https://api.github.com").unwrap();
		assert_eq!(
			graphql_endpoint(&github).unwrap().as_str(),
			"https://api.github.com/graphql"
		);

		let ghe = Url::parse("https://GHE.example.com/api").unwrap();
		assert_eq!(
			graphql_endpoint(&ghe).unwrap().as_str(),
			"https://ghe.example.com/api/graphql"
		);
	}

	#[test]
	fn test_debug_redacts_token() {
		let api = Url::parse("https://api.github.com/").unwrap();
		let transport = ReqwestGraphqlTransport::new(&api, "super-secret").unwrap();
		let debug = format!("{transport:?}");
		assert!(!debug.contains("super-secret"));
		assert!(debug.contains("<redacted>"));
	}

	#[test]
	fn test_truncate_for_error() {
		assert_eq!(truncate_for_error("short"), "short");
		let long = "x".repeat(300);
		let truncated = truncate_for_error(&long);
		assert_eq!(truncated.chars().count(), 203);
		assert!(truncated.ends_with("..."));
	}

	#[tokio::test]
	async fn test_returns_data_payload() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/api/graphql"))
			.and(header("authorization", "Bearer t0ken"))
			.respond_with(
				ResponseTemplate::new(200)
					.set_body_json(json!({ "data": { "viewer": { "login": "sd9" } } })),
			)
			.expect(1)
			.mount(&server)
			.await;

		let data = transport_for(&server)
			.await
			.request_graphql(request())
			.await
			.unwrap();
		assert_eq!(data["viewer"]["login"], "sd9");
	}

	#[tokio::test]
	async fn test_graphql_errors_are_surfaced() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"data": null,
				"errors": [
					{ "message": "first" },
					{ "message": "second" }
				]
			})))
			.mount(&server)
			.await;

		let err = transport_for(&server)
			.await
			.request_graphql(request())
			.await
			.unwrap_err();
		match err {
			GithubError::GraphQl(message) => assert_eq!(message, "first; second"),
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_not_found_errors_keep_partial_data() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"data": { "node": null },
				"errors": [{ "type": "NOT_FOUND", "message": "Could not resolve to a node" }]
			})))
			.mount(&server)
			.await;

		let data = transport_for(&server)
			.await
			.request_graphql(request())
			.await
			.unwrap();
		assert!(data["node"].is_null());
	}

	#[tokio::test]
	async fn test_status_mapping() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(401))
			.mount(&server)
			.await;
		let err = transport_for(&server)
			.await
			.request_graphql(request())
			.await
			.unwrap_err();
		assert!(matches!(err, GithubError::Unauthorized));

		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(403).insert_header("x-ratelimit-remaining", "0"))
			.mount(&server)
			.await;
		let err = transport_for(&server)
			.await
			.request_graphql(request())
			.await
			.unwrap_err();
		assert!(matches!(err, GithubError::RateLimited));

		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
			.mount(&server)
			.await;
		let err = transport_for(&server)
			.await
			.request_graphql(request())
			.await
			.unwrap_err();
		assert!(matches!(err, GithubError::ApiError { status: 502, .. }));
		assert!(err.is_retryable());
	}

	#[tokio::test]
	async fn test_invalid_json_is_invalid_response() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
			.mount(&server)
			.await;

		let err = transport_for(&server)
			.await
			.request_graphql(request())
			.await
			.unwrap_err();
		assert!(matches!(err, GithubError::InvalidResponse(_)));
	}
}
