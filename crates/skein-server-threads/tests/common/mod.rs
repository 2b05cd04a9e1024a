// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use skein_common_codehost::{CodeHost, ServiceKey, GITHUB_SERVICE_TYPE};
use skein_server_db::testing::create_schema_test_pool;
use skein_server_db::{
	DbError, ExternalThreadStore, NewRepo, RepoRecord, RepoRepository, ThreadKey, ThreadMetadata,
	ThreadRecord, ThreadRepository,
};
use skein_server_github::{GithubError, GraphqlRequest, GraphqlThreadFetcher, GraphqlTransport};
use skein_server_threads::{ConfiguredClientResolver, ThreadReconciler};
use sqlx::SqlitePool;

pub const GITHUB: i64 = 1;
pub const ENTERPRISE: i64 = 2;

pub fn github_host() -> CodeHost {
	CodeHost::parse("https://github.com", GITHUB_SERVICE_TYPE).unwrap()
}

pub fn enterprise_host() -> CodeHost {
	CodeHost::parse("https://GHE.example.com", GITHUB_SERVICE_TYPE).unwrap()
}

pub fn repo_node_id(full_name: &str) -> String {
	format!("R_{}", full_name.replace('/', "_"))
}

/// An in-memory GitHub answering the GraphQL documents the fetcher and
/// pull request service send.
#[derive(Default)]
pub struct FakeGithub {
	nodes: Mutex<Vec<Value>>,
	pub creates: AtomicUsize,
	pub updates: AtomicUsize,
}

impl FakeGithub {
	pub fn add_issue(&self, id: &str, number: i64, full_name: &str, title: &str) {
		self.nodes.lock().unwrap().push(json!({
			"__typename": "Issue",
			"id": id,
			"number": number,
			"title": title,
			"body": "",
			"state": "OPEN",
			"url": format!("https://github.com/{full_name}/issues/{number}"),
			"createdAt": "2025-01-02T03:04:05Z",
			"updatedAt": "2025-01-02T03:04:05Z",
			"author": { "login": "octocat" },
			"repository": { "id": repo_node_id(full_name), "nameWithOwner": full_name },
		}));
	}

	pub fn set_title(&self, id: &str, title: &str) {
		let mut nodes = self.nodes.lock().unwrap();
		if let Some(node) = nodes.iter_mut().find(|n| n["id"] == id) {
			node["title"] = json!(title);
		}
	}

	pub fn pull_requests(&self) -> Vec<Value> {
		self
			.nodes
			.lock()
			.unwrap()
			.iter()
			.filter(|n| n["__typename"] == "PullRequest")
			.cloned()
			.collect()
	}

	fn answer(&self, request: &GraphqlRequest) -> Result<Value, GithubError> {
		let vars = &request.variables;
		let mut nodes = self.nodes.lock().unwrap();
		let repository_exists =
			|id: &Value, nodes: &[Value]| nodes.iter().any(|n| n["repository"]["id"] == *id);

		if request.query.contains("query ThreadByNode(") {
			let node = nodes.iter().find(|n| n["id"] == vars["id"]).cloned();
			return Ok(json!({ "node": node }));
		}
		if request.query.contains("query ThreadByNumber(") {
			if !repository_exists(&vars["repository"], nodes.as_slice()) {
				return Ok(json!({ "repository": null }));
			}
			let node = nodes
				.iter()
				.find(|n| n["repository"]["id"] == vars["repository"] && n["number"] == vars["number"])
				.cloned();
			return Ok(json!({ "repository": {
				"__typename": "Repository",
				"issueOrPullRequest": node,
			} }));
		}
		if request.query.contains("query SearchThreads(") {
			return Ok(json!({ "search": {
				"pageInfo": { "hasNextPage": false },
				"nodes": nodes.clone(),
			} }));
		}
		if request.query.contains("query OpenPullRequestsByHead(") {
			let open: Vec<Value> = nodes
				.iter()
				.filter(|n| {
					n["__typename"] == "PullRequest"
						&& n["state"] == "OPEN"
						&& n["repository"]["id"] == vars["repository"]
						&& n["headRefName"] == vars["head"]
				})
				.cloned()
				.collect();
			return Ok(json!({ "repository": {
				"__typename": "Repository",
				"pullRequests": { "nodes": open },
			} }));
		}
		if request.query.contains("mutation CreatePullRequest(") {
			self.creates.fetch_add(1, Ordering::SeqCst);
			let input = &vars["input"];
			let number = nodes.len() as i64 + 1;
			let repository_id = input["repositoryId"].as_str().unwrap_or_default();
			let full_name = repository_id
				.strip_prefix("R_")
				.unwrap_or(repository_id)
				.replacen('_', "/", 1);
			let node = json!({
				"__typename": "PullRequest",
				"id": format!("PR_{number}"),
				"number": number,
				"title": input["title"],
				"body": input["body"],
				"state": "OPEN",
				"url": format!("https://github.com/{full_name}/pull/{number}"),
				"createdAt": "2025-02-01T00:00:00Z",
				"updatedAt": "2025-02-01T00:00:00Z",
				"author": { "login": "skein-bot" },
				"repository": { "id": repository_id, "nameWithOwner": full_name },
				"baseRefName": input["baseRefName"],
				"headRefName": input["headRefName"],
				"headRepository": { "id": repository_id },
			});
			nodes.push(node.clone());
			return Ok(json!({ "createPullRequest": { "pullRequest": node } }));
		}
		if request.query.contains("mutation UpdatePullRequest(") {
			self.updates.fetch_add(1, Ordering::SeqCst);
			let input = &vars["input"];
			let Some(node) = nodes.iter_mut().find(|n| n["id"] == input["pullRequestId"]) else {
				return Err(GithubError::GraphQl(
					"Could not resolve to a node with the global id".to_string(),
				));
			};
			node["title"] = input["title"].clone();
			node["body"] = input["body"].clone();
			return Ok(json!({ "updatePullRequest": { "pullRequest": node.clone() } }));
		}
		Err(GithubError::GraphQl(format!(
			"unexpected document: {}",
			request.query
		)))
	}
}

#[async_trait]
impl GraphqlTransport for FakeGithub {
	async fn request_graphql(&self, request: GraphqlRequest) -> Result<Value, GithubError> {
		self.answer(&request)
	}
}

/// Counts inserts reaching the underlying store.
pub struct CountingStore {
	inner: ThreadRepository,
	pub inserts: AtomicUsize,
}

#[async_trait]
impl ExternalThreadStore for CountingStore {
	async fn insert_thread(
		&self,
		key: &ThreadKey,
		metadata: &ThreadMetadata,
	) -> Result<Option<i64>, DbError> {
		self.inserts.fetch_add(1, Ordering::SeqCst);
		self.inner.insert_thread(key, metadata).await
	}

	async fn update_thread(&self, id: i64, metadata: &ThreadMetadata) -> Result<(), DbError> {
		self.inner.update_thread(id, metadata).await
	}

	async fn find_thread_by_tuple(&self, key: &ThreadKey) -> Result<Option<ThreadRecord>, DbError> {
		self.inner.find_thread_by_tuple(key).await
	}

	async fn find_thread_by_id(&self, id: i64) -> Result<Option<ThreadRecord>, DbError> {
		self.inner.find_thread_by_id(id).await
	}

	async fn set_thread_campaign(&self, id: i64, campaign_id: Option<i64>) -> Result<(), DbError> {
		self.inner.set_thread_campaign(id, campaign_id).await
	}
}

pub struct Harness {
	pub pool: SqlitePool,
	pub repos: Arc<RepoRepository>,
	pub store: Arc<CountingStore>,
	pub github: Arc<FakeGithub>,
	pub enterprise: Arc<FakeGithub>,
	pub reconciler: Arc<ThreadReconciler>,
}

impl Harness {
	pub async fn new() -> Self {
		let pool = create_schema_test_pool().await;
		let repos = Arc::new(RepoRepository::new(pool.clone()));
		let store = Arc::new(CountingStore {
			inner: ThreadRepository::new(pool.clone()),
			inserts: AtomicUsize::new(0),
		});
		let github = Arc::new(FakeGithub::default());
		let enterprise = Arc::new(FakeGithub::default());
		let resolver = ConfiguredClientResolver::new()
			.with_service(GITHUB, github_host(), github.clone())
			.with_service(ENTERPRISE, enterprise_host(), enterprise.clone());
		let reconciler = Arc::new(ThreadReconciler::new(
			store.clone(),
			repos.clone(),
			Arc::new(resolver),
			Arc::new(GraphqlThreadFetcher),
		));

		Self {
			pool,
			repos,
			store,
			github,
			enterprise,
			reconciler,
		}
	}

	/// Registers `full_name` (`owner/name`) on the host of `external_service_id`.
	pub async fn add_repo(&self, full_name: &str, external_service_id: i64) -> RepoRecord {
		let host = if external_service_id == ENTERPRISE {
			enterprise_host()
		} else {
			github_host()
		};
		self
			.repos
			.create_repo(&NewRepo {
				name: host.repo_name_for(full_name),
				external_id: repo_node_id(full_name),
				service_type: host.service_type().to_string(),
				service_id: host.service_id().to_string(),
				external_service_id,
				enabled: true,
			})
			.await
			.unwrap()
	}

	pub fn inserts(&self) -> usize {
		self.store.inserts.load(Ordering::SeqCst)
	}

	pub async fn thread(&self, id: i64) -> ThreadRecord {
		self.store.find_thread_by_id(id).await.unwrap().unwrap()
	}

	pub async fn thread_count(&self) -> i64 {
		sqlx::query_scalar("SELECT COUNT(*) FROM threads")
			.fetch_one(&self.pool)
			.await
			.unwrap()
	}
}
