// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Service graph built from a [`ServerConfig`].

use std::sync::Arc;
use std::time::Duration;

use skein_common_codehost::ExternalRepoSpec;
use skein_server_config::{CodeHostConfig, ServerConfig};
use skein_server_db::{
	create_pool, create_schema, CommentAuthor, CommentListOptions, CommentObject, CommentRecord,
	CommentRepository, CommentStore, ExternalThreadStore, NewComment, NewRepo, RepoListOptions,
	RepoRecord, RepoRepository, ThreadRepository,
};
use skein_server_git::CommandGitService;
use skein_server_github::{
	parse_thread_event, verify_webhook_signature, GraphqlPullRequestService, GraphqlThreadFetcher,
	ReqwestGraphqlTransport,
};
use skein_server_threads::{
	ChangePublisher, ConfiguredClientResolver, NotFoundKind, PrefixAllowList, PublishOutcome,
	PublishRequest, PublisherConfig, ThreadError, ThreadReconciler,
};
use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::error::{Result, ServerError};

pub struct Services {
	pub pool: SqlitePool,
	pub repos: Arc<RepoRepository>,
	pub threads: Arc<ThreadRepository>,
	pub comments: Arc<CommentRepository>,
	pub reconciler: Arc<ThreadReconciler>,
	pub publisher: Arc<ChangePublisher>,
	code_hosts: Vec<CodeHostConfig>,
}

/// One GraphQL client per configured code host, keyed by its id.
pub fn build_resolver(code_hosts: &[CodeHostConfig]) -> Result<ConfiguredClientResolver> {
	let mut resolver = ConfiguredClientResolver::new();
	for host in code_hosts {
		let client = ReqwestGraphqlTransport::new(&host.api_url, host.token.expose())?;
		resolver = resolver.with_service(host.id, host.code_host(), Arc::new(client));
	}
	Ok(resolver)
}

fn publisher_config(config: &skein_server_config::PublisherConfig) -> PublisherConfig {
	PublisherConfig {
		author_name: config.author_name.clone(),
		author_email: config.author_email.clone(),
		branch_prefix: config.branch_prefix.clone(),
		commit_message_prefix: config.commit_message_prefix.clone(),
		deadline: Duration::from_secs(config.deadline_secs),
	}
}

impl Services {
	/// Opens the database, applies the schema and wires every service.
	#[instrument(skip(config), fields(database = %config.database.url))]
	pub async fn from_config(config: &ServerConfig) -> Result<Self> {
		let pool = create_pool(&config.database.url).await?;
		create_schema(&pool).await?;

		let repos = Arc::new(RepoRepository::new(pool.clone()));
		let threads = Arc::new(ThreadRepository::new(pool.clone()));
		let comments = Arc::new(CommentRepository::new(pool.clone()));
		let resolver = build_resolver(&config.code_hosts)?;

		let reconciler = Arc::new(ThreadReconciler::new(
			threads.clone(),
			repos.clone(),
			Arc::new(resolver),
			Arc::new(GraphqlThreadFetcher),
		));
		let publisher = Arc::new(ChangePublisher::new(
			reconciler.clone(),
			Arc::new(CommandGitService::new(
				config.git.repos_root.clone(),
				config.git.remote.clone(),
			)),
			Arc::new(GraphqlPullRequestService),
			Arc::new(PrefixAllowList::new(
				config.publisher.allowed_namespaces.iter().cloned(),
			)),
			publisher_config(&config.publisher),
		));

		info!(code_hosts = config.code_hosts.len(), "services ready");
		Ok(Self {
			pool,
			repos,
			threads,
			comments,
			reconciler,
			publisher,
			code_hosts: config.code_hosts.clone(),
		})
	}

	pub fn code_host(&self, id: i64) -> Result<&CodeHostConfig> {
		self
			.code_hosts
			.iter()
			.find(|h| h.id == id)
			.ok_or(ServerError::UnknownCodeHost(id))
	}

	/// Registers `owner/name` on the given code host. The local name is
	/// derived from the host, e.g. `github.com/owner/name`.
	#[instrument(skip(self))]
	pub async fn add_repo(
		&self,
		code_host_id: i64,
		name_with_owner: &str,
		external_id: &str,
	) -> Result<RepoRecord> {
		let code_host = self.code_host(code_host_id)?.code_host();
		let spec = ExternalRepoSpec::on(&code_host, external_id);

		let repo = self
			.repos
			.create_repo(&NewRepo {
				name: code_host.repo_name_for(name_with_owner),
				external_id: spec.id,
				service_type: spec.service_type,
				service_id: spec.service_id,
				external_service_id: code_host_id,
				enabled: true,
			})
			.await?;
		info!(repo_id = repo.id, name = %repo.name, "repository added");
		Ok(repo)
	}

	pub async fn list_repos(&self) -> Result<Vec<RepoRecord>> {
		Ok(self.repos.list_repos(&RepoListOptions::default()).await?)
	}

	/// Links issue or pull request `number` of a registered repository to a
	/// local thread.
	#[instrument(skip(self))]
	pub async fn link_thread(&self, repo_name: &str, number: i64) -> Result<i64> {
		let repo = self
			.repos
			.get_repo_by_name(repo_name)
			.await?
			.ok_or_else(|| ServerError::RepositoryNotFound(repo_name.to_string()))?;
		let spec = ExternalRepoSpec::new(&repo.external_id, &repo.service_type, &repo.service_id);

		Ok(self
			.reconciler
			.create_or_get_existing(repo.id, &spec, number)
			.await?)
	}

	/// Re-reads a linked thread from its code host.
	#[instrument(skip(self))]
	pub async fn refresh_thread(&self, thread_id: i64) -> Result<()> {
		let thread = self
			.threads
			.find_thread_by_id(thread_id)
			.await?
			.ok_or(ThreadError::NotFound(NotFoundKind::Thread { id: thread_id }))?;

		self
			.reconciler
			.update_metadata(
				thread.id,
				thread.external_service_id,
				&thread.external_id,
				thread.repository_id,
			)
			.await?;
		Ok(())
	}

	/// Attaches a comment to a campaign or a thread. A thread must exist
	/// locally; campaigns live outside this store and are taken as given.
	#[instrument(skip(self, body), fields(body_len = body.len()))]
	pub async fn add_comment(
		&self,
		object: CommentObject,
		user_id: i64,
		body: &str,
	) -> Result<CommentRecord> {
		if let CommentObject::Thread(id) = object {
			self
				.threads
				.find_thread_by_id(id)
				.await?
				.ok_or(ThreadError::NotFound(NotFoundKind::Thread { id }))?;
		}
		let comment = self
			.comments
			.create(&NewComment {
				object,
				author: CommentAuthor { user_id },
				body: body.to_string(),
			})
			.await?;
		info!(comment_id = comment.id, "comment added");
		Ok(comment)
	}

	pub async fn list_comments(&self, options: &CommentListOptions) -> Result<Vec<CommentRecord>> {
		Ok(self.comments.list(options).await?)
	}

	pub async fn delete_comment(&self, id: i64) -> Result<()> {
		self.comments.delete_by_id(id).await?;
		info!(comment_id = id, "comment deleted");
		Ok(())
	}

	pub async fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome> {
		Ok(self.publisher.publish_with_deadline(request).await?)
	}

	/// Verifies and applies one webhook delivery from code host
	/// `code_host_id`. Returns the refreshed thread, or `None` when the
	/// delivery does not concern a registered repository's thread.
	#[instrument(skip(self, signature, body), fields(body_len = body.len()))]
	pub async fn handle_webhook(
		&self,
		code_host_id: i64,
		event: &str,
		signature: &str,
		body: &[u8],
	) -> Result<Option<i64>> {
		let host = self.code_host(code_host_id)?;
		let secret = host
			.webhook_secret
			.as_ref()
			.ok_or(ServerError::WebhookSecretMissing(code_host_id))?;
		verify_webhook_signature(secret.expose(), signature, body)?;

		let Some(thread_event) = parse_thread_event(event, body)? else {
			return Ok(None);
		};
		Ok(self
			.reconciler
			.refresh_from_webhook(&host.code_host(), &thread_event)
			.await?)
	}
}
