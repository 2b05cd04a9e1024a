// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Idempotent pull request creation and updates.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GithubError;
use crate::query::ThreadQuery;
use crate::transport::GraphqlTransport;
use crate::types::ExternalThread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePullRequest {
	pub repository_id: String,
	pub base_ref: String,
	pub head_ref: String,
	pub title: String,
	pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePullRequest {
	pub pull_request_id: String,
	pub title: String,
	pub body: String,
}

#[async_trait]
pub trait PullRequestService: Send + Sync {
	/// Returns the open pull request for `head_ref` if one exists, otherwise
	/// creates it. Safe to call repeatedly for the same head branch.
	async fn create_or_get(
		&self,
		client: &dyn GraphqlTransport,
		request: &CreatePullRequest,
	) -> Result<ExternalThread, GithubError>;

	async fn update(
		&self,
		client: &dyn GraphqlTransport,
		request: &UpdatePullRequest,
	) -> Result<ExternalThread, GithubError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GraphqlPullRequestService;

impl GraphqlPullRequestService {
	async fn find_open_by_head(
		&self,
		client: &dyn GraphqlTransport,
		repository_id: &str,
		head_ref: &str,
	) -> Result<Option<ExternalThread>, GithubError> {
		let data = client
			.request_graphql(
				ThreadQuery::OpenPullRequestsByHead {
					repository_id,
					head_ref,
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

		let nodes = repository["pullRequests"]["nodes"]
			.as_array()
			.map(Vec::as_slice)
			.unwrap_or_default();
		for node in nodes {
			let Some(pull_request) = ExternalThread::from_node(node)? else {
				continue;
			};
			// A fork can hold a branch of the same name.
			if pull_request.head_repository_external_id.as_deref() == Some(repository_id) {
				return Ok(Some(pull_request));
			}
			tracing::debug!(
				number = pull_request.number,
				head_repository = ?pull_request.head_repository_external_id,
				"ignoring open pull request from another repository"
			);
		}
		Ok(None)
	}
}

#[async_trait]
impl PullRequestService for GraphqlPullRequestService {
	#[tracing::instrument(
		skip(self, client, request),
		fields(repository_id = %request.repository_id, head_ref = %request.head_ref)
	)]
	async fn create_or_get(
		&self,
		client: &dyn GraphqlTransport,
		request: &CreatePullRequest,
	) -> Result<ExternalThread, GithubError> {
		if let Some(existing) = self
			.find_open_by_head(client, &request.repository_id, &request.head_ref)
			.await?
		{
			tracing::debug!(number = existing.number, "reusing open pull request");
			return Ok(existing);
		}

		let created = client
			.request_graphql(
				ThreadQuery::CreatePullRequest {
					repository_id: &request.repository_id,
					base_ref: &request.base_ref,
					head_ref: &request.head_ref,
					title: &request.title,
					body: &request.body,
				}
				.request(),
			)
			.await;

		match created {
			Ok(data) => {
				let thread = ExternalThread::from_node(&data["createPullRequest"]["pullRequest"])?
					.ok_or_else(|| {
						GithubError::InvalidResponse(
							"createPullRequest returned no pull request".to_string(),
						)
					})?;
				tracing::info!(number = thread.number, "pull request created");
				Ok(thread)
			}
			// A concurrent creator won; pick up what it made.
			Err(e) if e.is_pull_request_already_exists() => {
				tracing::debug!("pull request created concurrently, fetching it");
				self
					.find_open_by_head(client, &request.repository_id, &request.head_ref)
					.await?
					.ok_or(e)
			}
			Err(e) => Err(e),
		}
	}

	#[tracing::instrument(skip(self, client, request), fields(pull_request_id = %request.pull_request_id))]
	async fn update(
		&self,
		client: &dyn GraphqlTransport,
		request: &UpdatePullRequest,
	) -> Result<ExternalThread, GithubError> {
		let data = client
			.request_graphql(
				ThreadQuery::UpdatePullRequest {
					pull_request_id: &request.pull_request_id,
					title: &request.title,
					body: &request.body,
				}
				.request(),
			)
			.await?;

		ExternalThread::from_node(&data["updatePullRequest"]["pullRequest"])?.ok_or_else(|| {
			GithubError::NodeNotFound {
				id: request.pull_request_id.clone(),
			}
		})
	}
}
