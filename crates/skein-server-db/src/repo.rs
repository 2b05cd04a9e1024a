// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Local repository directory.
//!
//! Each row links a local repository name (e.g. `github.com/owner/name`) to
//! the repository's identity on its code host and to the configured
//! external service that serves it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::parse_timestamp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRecord {
	pub id: i64,
	pub name: String,
	pub external_id: String,
	pub service_type: String,
	pub service_id: String,
	pub external_service_id: i64,
	pub enabled: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRepo {
	pub name: String,
	pub external_id: String,
	pub service_type: String,
	pub service_id: String,
	pub external_service_id: i64,
	pub enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RepoListOptions {
	pub enabled_only: bool,
	pub limit: Option<u32>,
}

#[async_trait]
pub trait RepoStore: Send + Sync {
	async fn create_repo(&self, repo: &NewRepo) -> Result<RepoRecord, DbError>;
	async fn get_repo_by_id(&self, id: i64) -> Result<Option<RepoRecord>, DbError>;
	async fn get_repo_by_name(&self, name: &str) -> Result<Option<RepoRecord>, DbError>;
	async fn list_repos(&self, options: &RepoListOptions) -> Result<Vec<RepoRecord>, DbError>;
}

#[derive(Clone)]
pub struct RepoRepository {
	pool: SqlitePool,
}

impl RepoRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, repo), fields(name = %repo.name))]
	pub async fn create_repo(&self, repo: &NewRepo) -> Result<RepoRecord, DbError> {
		let now = Utc::now().to_rfc3339();

		let result = sqlx::query(
			r#"
			INSERT INTO repos (
				name, external_id, service_type, service_id, external_service_id,
				enabled, created_at, updated_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(&repo.name)
		.bind(&repo.external_id)
		.bind(&repo.service_type)
		.bind(&repo.service_id)
		.bind(repo.external_service_id)
		.bind(repo.enabled as i32)
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await
		.map_err(|e| match e {
			sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
				DbError::Conflict(format!("repository {} already exists", repo.name))
			}
			_ => DbError::Sqlx(e),
		})?;

		let id = result.last_insert_rowid();
		tracing::info!(repo_id = id, name = %repo.name, "repo: created");

		self
			.get_repo_by_id(id)
			.await?
			.ok_or_else(|| DbError::Internal("Repository not found after insert".to_string()))
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_repo_by_id(&self, id: i64) -> Result<Option<RepoRecord>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, external_id, service_type, service_id, external_service_id,
				enabled, created_at, updated_at
			FROM repos
			WHERE id = ?
			"#,
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_repo(&r)).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_repo_by_name(&self, name: &str) -> Result<Option<RepoRecord>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, external_id, service_type, service_id, external_service_id,
				enabled, created_at, updated_at
			FROM repos
			WHERE name = ?
			"#,
		)
		.bind(name)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_repo(&r)).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_repos(&self, options: &RepoListOptions) -> Result<Vec<RepoRecord>, DbError> {
		// SQLite treats a negative LIMIT as "no limit".
		let limit = options.limit.map(i64::from).unwrap_or(-1);

		let rows = sqlx::query(
			r#"
			SELECT id, name, external_id, service_type, service_id, external_service_id,
				enabled, created_at, updated_at
			FROM repos
			WHERE (? = 0 OR enabled = 1)
			ORDER BY id ASC
			LIMIT ?
			"#,
		)
		.bind(options.enabled_only as i32)
		.bind(limit)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_repo).collect()
	}
}

#[async_trait]
impl RepoStore for RepoRepository {
	async fn create_repo(&self, repo: &NewRepo) -> Result<RepoRecord, DbError> {
		RepoRepository::create_repo(self, repo).await
	}

	async fn get_repo_by_id(&self, id: i64) -> Result<Option<RepoRecord>, DbError> {
		RepoRepository::get_repo_by_id(self, id).await
	}

	async fn get_repo_by_name(&self, name: &str) -> Result<Option<RepoRecord>, DbError> {
		RepoRepository::get_repo_by_name(self, name).await
	}

	async fn list_repos(&self, options: &RepoListOptions) -> Result<Vec<RepoRecord>, DbError> {
		RepoRepository::list_repos(self, options).await
	}
}

fn row_to_repo(row: &sqlx::sqlite::SqliteRow) -> Result<RepoRecord, DbError> {
	let enabled: i64 = row.get("enabled");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	Ok(RepoRecord {
		id: row.get("id"),
		name: row.get("name"),
		external_id: row.get("external_id"),
		service_type: row.get("service_type"),
		service_id: row.get("service_id"),
		external_service_id: row.get("external_service_id"),
		enabled: enabled != 0,
		created_at: parse_timestamp(&created_at)?,
		updated_at: parse_timestamp(&updated_at)?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn make_repo() -> RepoRepository {
		let pool = crate::testing::create_schema_test_pool().await;
		RepoRepository::new(pool)
	}

	fn new_repo(name: &str, enabled: bool) -> NewRepo {
		NewRepo {
			name: name.to_string(),
			external_id: format!("R_{name}"),
			service_type: "github".to_string(),
			service_id: "https://github.com/".to_string(),
			external_service_id: 1,
			enabled,
		}
	}

	#[tokio::test]
	async fn test_create_and_get_repo() {
		let repo = make_repo().await;

		let created = repo
			.create_repo(&new_repo("github.com/sd9/a", true))
			.await
			.unwrap();
		assert!(created.id > 0);
		assert_eq!(created.external_id, "R_github.com/sd9/a");
		assert!(created.enabled);

		let by_id = repo.get_repo_by_id(created.id).await.unwrap().unwrap();
		assert_eq!(by_id, created);

		let by_name = repo
			.get_repo_by_name("github.com/sd9/a")
			.await
			.unwrap()
			.unwrap();
		assert_eq!(by_name.id, created.id);
	}

	#[tokio::test]
	async fn test_get_repo_not_found() {
		let repo = make_repo().await;
		assert!(repo.get_repo_by_id(42).await.unwrap().is_none());
		assert!(repo
			.get_repo_by_name("github.com/nobody/nothing")
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_create_duplicate_name_conflicts() {
		let repo = make_repo().await;
		repo
			.create_repo(&new_repo("github.com/sd9/a", true))
			.await
			.unwrap();

		let result = repo.create_repo(&new_repo("github.com/sd9/a", true)).await;
		assert!(matches!(result, Err(DbError::Conflict(_))));
	}

	#[tokio::test]
	async fn test_list_repos_enabled_and_limit() {
		let repo = make_repo().await;
		repo
			.create_repo(&new_repo("github.com/sd9/disabled", false))
			.await
			.unwrap();
		repo
			.create_repo(&new_repo("github.com/sd9/a", true))
			.await
			.unwrap();
		repo
			.create_repo(&new_repo("github.com/sd9/b", true))
			.await
			.unwrap();

		let all = repo.list_repos(&RepoListOptions::default()).await.unwrap();
		assert_eq!(all.len(), 3);

		let enabled = repo
			.list_repos(&RepoListOptions {
				enabled_only: true,
				limit: None,
			})
			.await
			.unwrap();
		assert_eq!(enabled.len(), 2);
		assert!(enabled.iter().all(|r| r.enabled));

		let first = repo
			.list_repos(&RepoListOptions {
				enabled_only: true,
				limit: Some(1),
			})
			.await
			.unwrap();
		assert_eq!(first.len(), 1);
		assert_eq!(first[0].name, "github.com/sd9/a");
	}
}
