// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use skein_server_db::DbError;
use skein_server_git::GitError;
use skein_server_github::GithubError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ThreadError>;

/// What could not be found. Remote repository and remote entity are kept
/// apart so callers can pick between a repository sync and a permanent skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundKind {
	RemoteRepository { repository_id: String },
	RemoteEntity { repository_id: String, number: i64 },
	RemoteNode { id: String },
	LocalRepository(String),
	Thread { id: i64 },
}

impl std::fmt::Display for NotFoundKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			NotFoundKind::RemoteRepository { repository_id } => {
				write!(f, "remote repository {repository_id}")
			}
			NotFoundKind::RemoteEntity {
				repository_id,
				number,
			} => write!(f, "#{number} in remote repository {repository_id}"),
			NotFoundKind::RemoteNode { id } => write!(f, "remote node {id}"),
			NotFoundKind::LocalRepository(repo) => write!(f, "repository {repo}"),
			NotFoundKind::Thread { id } => write!(f, "thread {id}"),
		}
	}
}

#[derive(Error, Debug)]
pub enum ThreadError {
	#[error("not found: {0}")]
	NotFound(NotFoundKind),

	#[error(
		"thread {thread_id} belongs to external service {thread_service_id}, \
		 but its repository resolves to {repository_service_id}"
	)]
	ServiceMismatch {
		thread_id: i64,
		thread_service_id: i64,
		repository_service_id: i64,
	},

	#[error("code host error: {0}")]
	Remote(GithubError),

	#[error("configuration error: {0}")]
	Config(String),

	#[error("git error: {0}")]
	Git(#[from] GitError),

	#[error("db error: {0}")]
	Db(#[from] DbError),

	#[error("refused: {0}")]
	Refused(String),

	#[error("invalid request: {0}")]
	InvalidRequest(String),

	#[error("deadline of {0:?} exceeded")]
	DeadlineExceeded(Duration),
}

impl ThreadError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, ThreadError::NotFound(_))
	}
}

impl From<GithubError> for ThreadError {
	fn from(e: GithubError) -> Self {
		match e {
			GithubError::RepositoryNotFound { repository_id } => {
				ThreadError::NotFound(NotFoundKind::RemoteRepository { repository_id })
			}
			GithubError::IssueOrPullRequestNotFound {
				repository_id,
				number,
			} => ThreadError::NotFound(NotFoundKind::RemoteEntity {
				repository_id,
				number,
			}),
			GithubError::NodeNotFound { id } => ThreadError::NotFound(NotFoundKind::RemoteNode { id }),
			other => ThreadError::Remote(other),
		}
	}
}
