// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Table definitions for the reconciliation store.
//!
//! `threads` carries the `(repository_id, external_service_id, external_id)`
//! uniqueness constraint that makes concurrent create-or-get calls safe.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const STATEMENTS: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS repos (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		name TEXT NOT NULL UNIQUE,
		external_id TEXT NOT NULL,
		service_type TEXT NOT NULL,
		service_id TEXT NOT NULL,
		external_service_id INTEGER NOT NULL,
		enabled INTEGER NOT NULL DEFAULT 1,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS threads (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		repository_id INTEGER NOT NULL,
		external_service_id INTEGER NOT NULL,
		external_id TEXT NOT NULL,
		campaign_id INTEGER,
		number INTEGER NOT NULL,
		kind TEXT NOT NULL CHECK (kind IN ('issue', 'pull_request')),
		state TEXT NOT NULL CHECK (state IN ('open', 'closed', 'merged')),
		title TEXT NOT NULL,
		body TEXT NOT NULL,
		base_ref TEXT,
		head_ref TEXT,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		UNIQUE (repository_id, external_service_id, external_id)
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_threads_campaign_id ON threads(campaign_id)",
	r#"
	CREATE TABLE IF NOT EXISTS comments (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		campaign_id INTEGER,
		thread_id INTEGER,
		author_user_id INTEGER NOT NULL,
		body TEXT NOT NULL,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		CHECK ((campaign_id IS NULL) <> (thread_id IS NULL))
	)
	"#,
	"CREATE INDEX IF NOT EXISTS idx_comments_campaign_id ON comments(campaign_id)",
	"CREATE INDEX IF NOT EXISTS idx_comments_thread_id ON comments(thread_id)",
];

/// Create all tables and indexes if they do not exist yet.
#[tracing::instrument(skip(pool))]
pub async fn create_schema(pool: &SqlitePool) -> Result<(), DbError> {
	for statement in STATEMENTS {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!(statements = STATEMENTS.len(), "schema ensured");
	Ok(())
}
