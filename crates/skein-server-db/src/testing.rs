// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// In-memory pool pinned to one connection so every query sees the same
/// database.
pub async fn create_test_pool() -> SqlitePool {
	SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:")
		.await
		.unwrap()
}

/// In-memory pool with the full schema applied.
pub async fn create_schema_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	crate::schema::create_schema(&pool).await.unwrap();
	pool
}
