// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Read-only lookups of issues and pull requests.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GithubError;
use crate::query::ThreadQuery;
use crate::transport::GraphqlTransport;
use crate::types::{ExternalThread, SearchPage};

#[async_trait]
pub trait ThreadFetcher: Send + Sync {
	/// Fails with [`GithubError::NodeNotFound`] if the node is missing or is
	/// not an issue or pull request.
	async fn by_node_id(
		&self,
		client: &dyn GraphqlTransport,
		node_id: &str,
	) -> Result<ExternalThread, GithubError>;

	/// Distinguishes a missing repository ([`GithubError::RepositoryNotFound`])
	/// from a missing number ([`GithubError::IssueOrPullRequestNotFound`]).
	async fn by_repository_and_number(
		&self,
		client: &dyn GraphqlTransport,
		repository_id: &str,
		number: i64,
	) -> Result<ExternalThread, GithubError>;

	/// Runs a single search capped at
	/// [`SEARCH_PAGE_SIZE`](crate::query::SEARCH_PAGE_SIZE) results. There is
	/// no pagination; `truncated` reports whether more matches exist.
	async fn by_query(
		&self,
		client: &dyn GraphqlTransport,
		query: &str,
	) -> Result<SearchPage, GithubError>;
}

/// [`ThreadFetcher`] backed by the GraphQL documents in [`crate::query`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphqlThreadFetcher;

#[async_trait]
impl ThreadFetcher for GraphqlThreadFetcher {
	#[tracing::instrument(skip(self, client))]
	async fn by_node_id(
		&self,
		client: &dyn GraphqlTransport,
		node_id: &str,
	) -> Result<ExternalThread, GithubError> {
		let data = client
			.request_graphql(ThreadQuery::ByNode { id: node_id }.request())
			.await?;

		ExternalThread::from_node(&data["node"])?.ok_or_else(|| GithubError::NodeNotFound {
			id: node_id.to_string(),
		})
	}

	#[tracing::instrument(skip(self, client))]
	async fn by_repository_and_number(
		&self,
		client: &dyn GraphqlTransport,
		repository_id: &str,
		number: i64,
	) -> Result<ExternalThread, GithubError> {
		let data = client
			.request_graphql(
				ThreadQuery::ByRepositoryAndNumber {
					repository_id,
					number,
				}
				.request(),
			)
			.await?;

		let repository = &data["repository"];
		if repository.get("__typename").and_then(Value::as_str) != Some("Repository") {
			return Err(GithubError::RepositoryNotFound {
				repository_id: repository_id.to_string(),
			});
		}

		ExternalThread::from_node(&repository["issueOrPullRequest"])?.ok_or_else(|| {
			GithubError::IssueOrPullRequestNotFound {
				repository_id: repository_id.to_string(),
				number,
			}
		})
	}

	#[tracing::instrument(skip(self, client))]
	async fn by_query(
		&self,
		client: &dyn GraphqlTransport,
		query: &str,
	) -> Result<SearchPage, GithubError> {
		let data = client
			.request_graphql(ThreadQuery::Search { query }.request())
			.await?;

		let search = &data["search"];
		let nodes = search["nodes"]
			.as_array()
			.ok_or_else(|| GithubError::InvalidResponse("search returned no nodes".to_string()))?;

		let mut threads = Vec::with_capacity(nodes.len());
		for node in nodes {
			// Search nodes may be null when the viewer lacks access.
			if let Some(thread) = ExternalThread::from_node(node)? {
				threads.push(thread);
			}
		}

		let truncated = search["pageInfo"]["hasNextPage"]
			.as_bool()
			.unwrap_or(false);
		if truncated {
			tracing::debug!(returned = threads.len(), "search results truncated");
		}

		Ok(SearchPage { threads, truncated })
	}
}
