// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Error types for the GitHub client.

use thiserror::Error;

/// Errors that can occur when talking to a GitHub GraphQL endpoint.
#[derive(Debug, Error)]
pub enum GithubError {
	/// Network-level error during HTTP communication.
	#[error("Network error: {0}")]
	Network(#[from] reqwest::Error),

	/// Rate limit exceeded.
	#[error("Rate limit exceeded")]
	RateLimited,

	/// Invalid or missing token.
	#[error("Unauthorized")]
	Unauthorized,

	/// Non-success HTTP status.
	#[error("GitHub API error: {status} - {message}")]
	ApiError { status: u16, message: String },

	/// The GraphQL response carried an `errors` array.
	#[error("GitHub GraphQL error: {0}")]
	GraphQl(String),

	/// Invalid or unparseable response.
	#[error("Invalid response from GitHub: {0}")]
	InvalidResponse(String),

	#[error("repository not found: {repository_id}")]
	RepositoryNotFound { repository_id: String },

	#[error("issue or pull request #{number} not found in repository {repository_id}")]
	IssueOrPullRequestNotFound { repository_id: String, number: i64 },

	/// The node does not exist or is neither an issue nor a pull request.
	#[error("issue or pull request node not found: {id}")]
	NodeNotFound { id: String },

	/// Webhook signature verification failed.
	#[error("Invalid webhook signature")]
	InvalidWebhookSignature,

	/// Configuration error.
	#[error("Configuration error: {0}")]
	Config(String),
}

impl From<serde_json::Error> for GithubError {
	fn from(e: serde_json::Error) -> Self {
		GithubError::InvalidResponse(e.to_string())
	}
}

impl GithubError {
	/// Create an API error from status code and message.
	pub fn api_error(status: u16, message: impl Into<String>) -> Self {
		Self::ApiError {
			status,
			message: message.into(),
		}
	}

	/// True for the remote "does not exist" family.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			GithubError::RepositoryNotFound { .. }
				| GithubError::IssueOrPullRequestNotFound { .. }
				| GithubError::NodeNotFound { .. }
		)
	}

	/// Whether a caller could reasonably retry the whole operation. Nothing
	/// in this crate retries on its own.
	pub fn is_retryable(&self) -> bool {
		match self {
			GithubError::Network(e) => e.is_timeout() || e.is_connect(),
			GithubError::RateLimited => true,
			GithubError::ApiError { status, .. } => *status >= 500,
			_ => false,
		}
	}

	/// True if GitHub refused to create a pull request because one already
	/// exists for the head branch.
	pub fn is_pull_request_already_exists(&self) -> bool {
		match self {
			GithubError::GraphQl(message) | GithubError::ApiError { message, .. } => message
				.to_ascii_lowercase()
				.contains("a pull request already exists"),
			_ => false,
		}
	}
}
