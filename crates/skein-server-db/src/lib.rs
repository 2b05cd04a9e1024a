// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! SQLite persistence for Skein: the repository directory, threads linked to
//! external issues and pull requests, and comments.

pub mod comment;
pub mod error;
pub mod pool;
pub mod repo;
pub mod schema;
pub mod thread;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use comment::{
	CommentAuthor, CommentListOptions, CommentObject, CommentRecord, CommentRepository,
	CommentStore, NewComment,
};
pub use error::{DbError, Result};
pub use pool::create_pool;
pub use repo::{NewRepo, RepoListOptions, RepoRecord, RepoRepository, RepoStore};
pub use schema::create_schema;
pub use thread::{ExternalThreadStore, ThreadKey, ThreadMetadata, ThreadRecord, ThreadRepository};

use chrono::{DateTime, Utc};

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(raw)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid timestamp '{raw}': {e}")))
}
