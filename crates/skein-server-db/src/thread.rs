// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Persistence for threads linked to an external issue or pull request.
//!
//! A thread row is keyed by `(repository_id, external_service_id,
//! external_id)`. The key is written once on insert and never touched by an
//! update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skein_common_codehost::{ThreadKind, ThreadState};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::parse_timestamp;

/// The uniqueness key mapping an external entity to a local thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadKey {
	pub repository_id: i64,
	pub external_service_id: i64,
	pub external_id: String,
}

/// Fields refreshed from the code host on every create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMetadata {
	pub number: i64,
	pub kind: ThreadKind,
	pub state: ThreadState,
	pub title: String,
	pub body: String,
	pub base_ref: Option<String>,
	pub head_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRecord {
	pub id: i64,
	pub repository_id: i64,
	pub external_service_id: i64,
	pub external_id: String,
	pub campaign_id: Option<i64>,
	pub number: i64,
	pub kind: ThreadKind,
	pub state: ThreadState,
	pub title: String,
	pub body: String,
	pub base_ref: Option<String>,
	pub head_ref: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait ExternalThreadStore: Send + Sync {
	/// Inserts a new thread. Returns `None` if a row with the same key
	/// already exists; the existing row is left untouched.
	async fn insert_thread(
		&self,
		key: &ThreadKey,
		metadata: &ThreadMetadata,
	) -> Result<Option<i64>, DbError>;

	/// Overwrites the metadata of an existing row. Fails with
	/// `DbError::NotFound` if no row has this id.
	async fn update_thread(&self, id: i64, metadata: &ThreadMetadata) -> Result<(), DbError>;

	async fn find_thread_by_tuple(&self, key: &ThreadKey) -> Result<Option<ThreadRecord>, DbError>;

	async fn find_thread_by_id(&self, id: i64) -> Result<Option<ThreadRecord>, DbError>;

	async fn set_thread_campaign(&self, id: i64, campaign_id: Option<i64>) -> Result<(), DbError>;
}

#[derive(Clone)]
pub struct ThreadRepository {
	pool: SqlitePool,
}

impl ThreadRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl ExternalThreadStore for ThreadRepository {
	#[tracing::instrument(
		skip(self, metadata),
		fields(
			repository_id = key.repository_id,
			external_service_id = key.external_service_id,
			external_id = %key.external_id
		)
	)]
	async fn insert_thread(
		&self,
		key: &ThreadKey,
		metadata: &ThreadMetadata,
	) -> Result<Option<i64>, DbError> {
		let now = Utc::now().to_rfc3339();

		let row = sqlx::query(
			r#"
			INSERT INTO threads (
				repository_id, external_service_id, external_id,
				number, kind, state, title, body, base_ref, head_ref,
				created_at, updated_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT (repository_id, external_service_id, external_id) DO NOTHING
			RETURNING id
			"#,
		)
		.bind(key.repository_id)
		.bind(key.external_service_id)
		.bind(&key.external_id)
		.bind(metadata.number)
		.bind(metadata.kind.as_str())
		.bind(metadata.state.as_str())
		.bind(&metadata.title)
		.bind(&metadata.body)
		.bind(&metadata.base_ref)
		.bind(&metadata.head_ref)
		.bind(&now)
		.bind(&now)
		.fetch_optional(&self.pool)
		.await?;

		let id = row.map(|r| r.get::<i64, _>("id"));
		match id {
			Some(id) => tracing::debug!(thread_id = id, "thread inserted"),
			None => tracing::debug!("thread insert lost to an existing row"),
		}
		Ok(id)
	}

	#[tracing::instrument(skip(self, metadata), fields(thread_id = id))]
	async fn update_thread(&self, id: i64, metadata: &ThreadMetadata) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();

		let result = sqlx::query(
			r#"
			UPDATE threads SET
				number = ?,
				kind = ?,
				state = ?,
				title = ?,
				body = ?,
				base_ref = ?,
				head_ref = ?,
				updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(metadata.number)
		.bind(metadata.kind.as_str())
		.bind(metadata.state.as_str())
		.bind(&metadata.title)
		.bind(&metadata.body)
		.bind(&metadata.base_ref)
		.bind(&metadata.head_ref)
		.bind(&now)
		.bind(id)
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("thread {id}")));
		}
		tracing::debug!("thread updated");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(external_id = %key.external_id))]
	async fn find_thread_by_tuple(&self, key: &ThreadKey) -> Result<Option<ThreadRecord>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, repository_id, external_service_id, external_id, campaign_id,
				number, kind, state, title, body, base_ref, head_ref,
				created_at, updated_at
			FROM threads
			WHERE repository_id = ? AND external_service_id = ? AND external_id = ?
			"#,
		)
		.bind(key.repository_id)
		.bind(key.external_service_id)
		.bind(&key.external_id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_thread(&r)).transpose()
	}

	#[tracing::instrument(skip(self))]
	async fn find_thread_by_id(&self, id: i64) -> Result<Option<ThreadRecord>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, repository_id, external_service_id, external_id, campaign_id,
				number, kind, state, title, body, base_ref, head_ref,
				created_at, updated_at
			FROM threads
			WHERE id = ?
			"#,
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_thread(&r)).transpose()
	}

	#[tracing::instrument(skip(self))]
	async fn set_thread_campaign(&self, id: i64, campaign_id: Option<i64>) -> Result<(), DbError> {
		let result = sqlx::query("UPDATE threads SET campaign_id = ?, updated_at = ? WHERE id = ?")
			.bind(campaign_id)
			.bind(Utc::now().to_rfc3339())
			.bind(id)
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("thread {id}")));
		}
		Ok(())
	}
}

fn row_to_thread(row: &sqlx::sqlite::SqliteRow) -> Result<ThreadRecord, DbError> {
	let kind: String = row.get("kind");
	let state: String = row.get("state");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	Ok(ThreadRecord {
		id: row.get("id"),
		repository_id: row.get("repository_id"),
		external_service_id: row.get("external_service_id"),
		external_id: row.get("external_id"),
		campaign_id: row.get("campaign_id"),
		number: row.get("number"),
		kind: kind.parse().map_err(DbError::Internal)?,
		state: state.parse().map_err(DbError::Internal)?,
		title: row.get("title"),
		body: row.get("body"),
		base_ref: row.get("base_ref"),
		head_ref: row.get("head_ref"),
		created_at: parse_timestamp(&created_at)?,
		updated_at: parse_timestamp(&updated_at)?,
	})
}
