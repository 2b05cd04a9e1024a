// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Fakes shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use skein_common_codehost::{
	CodeHost, ServiceKey, ThreadKind, ThreadState, GITHUB_SERVICE_TYPE,
};
use skein_server_db::testing::create_schema_test_pool;
use skein_server_db::{
	DbError, ExternalThreadStore, NewRepo, RepoRecord, RepoRepository, ThreadKey,
	ThreadMetadata, ThreadRecord, ThreadRepository,
};
use skein_server_github::{
	ExternalThread, GithubError, GraphqlRequest, GraphqlTransport, SearchPage, ThreadFetcher,
};
use sqlx::SqlitePool;

use crate::reconciler::ThreadReconciler;
use crate::resolver::ConfiguredClientResolver;

pub fn github_host() -> CodeHost {
	CodeHost::parse("https://github.com", GITHUB_SERVICE_TYPE).unwrap()
}

pub fn repo_node_id(full_name: &str) -> String {
	format!("R_{}", full_name.replace('/', "_"))
}

pub fn external_thread(id: &str, number: i64, full_name: &str, kind: ThreadKind) -> ExternalThread {
	let is_pr = kind == ThreadKind::PullRequest;
	ExternalThread {
		external_id: id.to_string(),
		number,
		kind,
		title: format!("thread {number}"),
		body: "body".to_string(),
		state: ThreadState::Open,
		base_ref: is_pr.then(|| "main".to_string()),
		head_ref: is_pr.then(|| format!("feature-{number}")),
		head_repository_external_id: is_pr.then(|| repo_node_id(full_name)),
		repository_full_name: full_name.to_string(),
		repository_external_id: repo_node_id(full_name),
		author_login: Some("octocat".to_string()),
		url: format!("https://github.com/{full_name}/issues/{number}"),
		created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
		updated_at: Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
	}
}

pub struct NoopTransport;

#[async_trait]
impl GraphqlTransport for NoopTransport {
	async fn request_graphql(&self, _request: GraphqlRequest) -> Result<Value, GithubError> {
		Ok(Value::Null)
	}
}

/// [`ThreadFetcher`] over an in-memory set of remote entities.
#[derive(Default)]
pub struct StaticFetcher {
	entities: Mutex<HashMap<String, ExternalThread>>,
	search: Mutex<SearchPage>,
}

impl StaticFetcher {
	pub fn insert(&self, entity: ExternalThread) {
		self
			.entities
			.lock()
			.unwrap()
			.insert(entity.external_id.clone(), entity);
	}

	pub fn set_search(&self, threads: Vec<ExternalThread>, truncated: bool) {
		*self.search.lock().unwrap() = SearchPage { threads, truncated };
	}
}

#[async_trait]
impl ThreadFetcher for StaticFetcher {
	async fn by_node_id(
		&self,
		_client: &dyn GraphqlTransport,
		node_id: &str,
	) -> Result<ExternalThread, GithubError> {
		self
			.entities
			.lock()
			.unwrap()
			.get(node_id)
			.cloned()
			.ok_or_else(|| GithubError::NodeNotFound {
				id: node_id.to_string(),
			})
	}

	async fn by_repository_and_number(
		&self,
		_client: &dyn GraphqlTransport,
		repository_id: &str,
		number: i64,
	) -> Result<ExternalThread, GithubError> {
		self
			.entities
			.lock()
			.unwrap()
			.values()
			.find(|e| e.repository_external_id == repository_id && e.number == number)
			.cloned()
			.ok_or_else(|| GithubError::IssueOrPullRequestNotFound {
				repository_id: repository_id.to_string(),
				number,
			})
	}

	async fn by_query(
		&self,
		_client: &dyn GraphqlTransport,
		_query: &str,
	) -> Result<SearchPage, GithubError> {
		Ok(self.search.lock().unwrap().clone())
	}
}

/// Store whose inserts always lose to a concurrent writer: the row is
/// written under a different title and the caller is told it already
/// existed.
pub struct RacingStore(pub ThreadRepository);

#[async_trait]
impl ExternalThreadStore for RacingStore {
	async fn insert_thread(
		&self,
		key: &ThreadKey,
		metadata: &ThreadMetadata,
	) -> Result<Option<i64>, DbError> {
		let winner = ThreadMetadata {
			title: "from the winner".to_string(),
			..metadata.clone()
		};
		self.0.insert_thread(key, &winner).await?;
		Ok(None)
	}

	async fn update_thread(&self, id: i64, metadata: &ThreadMetadata) -> Result<(), DbError> {
		self.0.update_thread(id, metadata).await
	}

	async fn find_thread_by_tuple(&self, key: &ThreadKey) -> Result<Option<ThreadRecord>, DbError> {
		self.0.find_thread_by_tuple(key).await
	}

	async fn find_thread_by_id(&self, id: i64) -> Result<Option<ThreadRecord>, DbError> {
		self.0.find_thread_by_id(id).await
	}

	async fn set_thread_campaign(&self, id: i64, campaign_id: Option<i64>) -> Result<(), DbError> {
		self.0.set_thread_campaign(id, campaign_id).await
	}
}

pub struct TestEnv {
	pub pool: SqlitePool,
	pub repos: Arc<RepoRepository>,
	pub threads: Arc<ThreadRepository>,
	pub fetcher: Arc<StaticFetcher>,
	pub reconciler: Arc<ThreadReconciler>,
}

impl TestEnv {
	pub async fn new() -> Self {
		Self::build(false).await
	}

	pub async fn with_racing_store() -> Self {
		Self::build(true).await
	}

	async fn build(racing: bool) -> Self {
		let pool = create_schema_test_pool().await;
		let repos = Arc::new(RepoRepository::new(pool.clone()));
		let threads = Arc::new(ThreadRepository::new(pool.clone()));
		let fetcher = Arc::new(StaticFetcher::default());
		let resolver =
			ConfiguredClientResolver::new().with_service(1, github_host(), Arc::new(NoopTransport));

		let store: Arc<dyn ExternalThreadStore> = if racing {
			Arc::new(RacingStore(ThreadRepository::new(pool.clone())))
		} else {
			threads.clone()
		};
		let reconciler = Arc::new(ThreadReconciler::new(
			store,
			repos.clone(),
			Arc::new(resolver),
			fetcher.clone(),
		));

		Self {
			pool,
			repos,
			threads,
			fetcher,
			reconciler,
		}
	}

	/// Registers `name` (e.g. `github.com/sd9/repo`) as a repository on
	/// github.com served by `external_service_id`.
	pub async fn add_repo(&self, name: &str, external_service_id: i64) -> RepoRecord {
		let host = github_host();
		let full_name = name.trim_start_matches("github.com/");
		self
			.repos
			.create_repo(&NewRepo {
				name: name.to_string(),
				external_id: repo_node_id(full_name),
				service_type: host.service_type().to_string(),
				service_id: host.service_id().to_string(),
				external_service_id,
				enabled: true,
			})
			.await
			.unwrap()
	}

	pub async fn thread(&self, id: i64) -> ThreadRecord {
		self.threads.find_thread_by_id(id).await.unwrap().unwrap()
	}

	pub async fn thread_count(&self) -> i64 {
		sqlx::query_scalar("SELECT COUNT(*) FROM threads")
			.fetch_one(&self.pool)
			.await
			.unwrap()
	}
}
