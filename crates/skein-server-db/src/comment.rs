// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Comments attached to a campaign or a thread.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::parse_timestamp;

/// The entity a comment is attached to. Exactly one kind is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CommentObject {
	Campaign(i64),
	Thread(i64),
}

impl CommentObject {
	/// Builds the reference from the stored column pair, rejecting rows with
	/// neither or both set.
	pub fn from_columns(campaign_id: Option<i64>, thread_id: Option<i64>) -> Result<Self, DbError> {
		match (campaign_id, thread_id) {
			(Some(id), None) => Ok(CommentObject::Campaign(id)),
			(None, Some(id)) => Ok(CommentObject::Thread(id)),
			(None, None) => Err(DbError::InvalidInput(
				"comment must reference a campaign or a thread".to_string(),
			)),
			(Some(_), Some(_)) => Err(DbError::InvalidInput(
				"comment must reference only one of campaign or thread".to_string(),
			)),
		}
	}

	fn columns(&self) -> (Option<i64>, Option<i64>) {
		match *self {
			CommentObject::Campaign(id) => (Some(id), None),
			CommentObject::Thread(id) => (None, Some(id)),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAuthor {
	pub user_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewComment {
	pub object: CommentObject,
	pub author: CommentAuthor,
	pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
	pub id: i64,
	pub object: CommentObject,
	pub author: CommentAuthor,
	pub body: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct CommentListOptions {
	/// Substring match on the comment body.
	pub query: Option<String>,
	pub object: Option<CommentObject>,
	pub limit: Option<u32>,
}

#[async_trait]
pub trait CommentStore: Send + Sync {
	async fn create(&self, comment: &NewComment) -> Result<CommentRecord, DbError>;
	async fn get_by_id(&self, id: i64) -> Result<CommentRecord, DbError>;
	async fn list(&self, options: &CommentListOptions) -> Result<Vec<CommentRecord>, DbError>;
	async fn count(&self, options: &CommentListOptions) -> Result<u64, DbError>;
	async fn delete_by_id(&self, id: i64) -> Result<(), DbError>;
}

#[derive(Clone)]
pub struct CommentRepository {
	pool: SqlitePool,
}

impl CommentRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

const FILTER: &str = r#"
	WHERE (? IS NULL OR body LIKE '%' || ? || '%' ESCAPE '\')
		AND (? IS NULL OR campaign_id = ?)
		AND (? IS NULL OR thread_id = ?)
"#;

struct Filter {
	pattern: Option<String>,
	campaign_id: Option<i64>,
	thread_id: Option<i64>,
}

impl Filter {
	fn from_options(options: &CommentListOptions) -> Self {
		let (campaign_id, thread_id) = options
			.object
			.map(|o| o.columns())
			.unwrap_or((None, None));
		Self {
			pattern: options.query.as_deref().map(escape_like),
			campaign_id,
			thread_id,
		}
	}
}

fn escape_like(query: &str) -> String {
	let mut escaped = String::with_capacity(query.len());
	for c in query.chars() {
		if matches!(c, '\\' | '%' | '_') {
			escaped.push('\\');
		}
		escaped.push(c);
	}
	escaped
}

#[async_trait]
impl CommentStore for CommentRepository {
	#[tracing::instrument(skip(self, comment), fields(object = ?comment.object))]
	async fn create(&self, comment: &NewComment) -> Result<CommentRecord, DbError> {
		let now = Utc::now().to_rfc3339();
		let (campaign_id, thread_id) = comment.object.columns();

		let result = sqlx::query(
			r#"
			INSERT INTO comments (campaign_id, thread_id, author_user_id, body, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(campaign_id)
		.bind(thread_id)
		.bind(comment.author.user_id)
		.bind(&comment.body)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await?;

		let id = result.last_insert_rowid();
		tracing::debug!(comment_id = id, "comment created");
		self.get_by_id(id).await
	}

	#[tracing::instrument(skip(self))]
	async fn get_by_id(&self, id: i64) -> Result<CommentRecord, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, campaign_id, thread_id, author_user_id, body, created_at, updated_at
			FROM comments
			WHERE id = ?
			"#,
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		match row {
			Some(row) => row_to_comment(&row),
			None => Err(DbError::NotFound(format!("comment {id}"))),
		}
	}

	#[tracing::instrument(skip(self, options))]
	async fn list(&self, options: &CommentListOptions) -> Result<Vec<CommentRecord>, DbError> {
		let filter = Filter::from_options(options);
		let limit = options.limit.map(i64::from).unwrap_or(-1);
		let sql = format!(
			"SELECT id, campaign_id, thread_id, author_user_id, body, created_at, updated_at \
			 FROM comments {FILTER} ORDER BY id ASC LIMIT ?"
		);

		let rows = sqlx::query(&sql)
			.bind(&filter.pattern)
			.bind(&filter.pattern)
			.bind(filter.campaign_id)
			.bind(filter.campaign_id)
			.bind(filter.thread_id)
			.bind(filter.thread_id)
			.bind(limit)
			.fetch_all(&self.pool)
			.await?;

		rows.iter().map(row_to_comment).collect()
	}

	#[tracing::instrument(skip(self, options))]
	async fn count(&self, options: &CommentListOptions) -> Result<u64, DbError> {
		let filter = Filter::from_options(options);
		let sql = format!("SELECT COUNT(*) AS count FROM comments {FILTER}");

		let row = sqlx::query(&sql)
			.bind(&filter.pattern)
			.bind(&filter.pattern)
			.bind(filter.campaign_id)
			.bind(filter.campaign_id)
			.bind(filter.thread_id)
			.bind(filter.thread_id)
			.fetch_one(&self.pool)
			.await?;

		let count: i64 = row.get("count");
		Ok(count as u64)
	}

	#[tracing::instrument(skip(self))]
	async fn delete_by_id(&self, id: i64) -> Result<(), DbError> {
		let result = sqlx::query("DELETE FROM comments WHERE id = ?")
			.bind(id)
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("comment {id}")));
		}
		tracing::debug!(comment_id = id, "comment deleted");
		Ok(())
	}
}

fn row_to_comment(row: &sqlx::sqlite::SqliteRow) -> Result<CommentRecord, DbError> {
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	Ok(CommentRecord {
		id: row.get("id"),
		object: CommentObject::from_columns(row.get("campaign_id"), row.get("thread_id"))?,
		author: CommentAuthor {
			user_id: row.get("author_user_id"),
		},
		body: row.get("body"),
		created_at: parse_timestamp(&created_at)?,
		updated_at: parse_timestamp(&updated_at)?,
	})
}
