// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Maps external issues and pull requests onto local thread rows.
//!
//! Each external entity maps to at most one thread, keyed by
//! `(repository_id, external_service_id, external_id)`. The reconciler takes
//! no locks and never retries: the store's uniqueness constraint decides
//! which of two concurrent creators inserts, and the loser updates the row
//! the winner wrote.

use std::sync::Arc;

use skein_common_codehost::{same_service, CodeHost, ExternalRepoSpec};
use skein_server_db::{
	DbError, ExternalThreadStore, RepoListOptions, RepoRecord, RepoStore, ThreadKey, ThreadMetadata,
};
use skein_server_github::{ExternalThread, ThreadEvent, ThreadFetcher};
use tracing::{debug, info, instrument, warn};

use crate::error::{NotFoundKind, Result, ThreadError};
use crate::resolver::ClientResolver;

/// A search result that was not imported because its repository is not
/// registered locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedThread {
	pub repository_name: String,
	pub number: i64,
	pub title: String,
}

/// Result of [`ThreadReconciler::import_by_query`]. Items are imported one
/// by one, so a failure leaves earlier imports in place.
#[derive(Debug, Default)]
pub struct ImportOutcome {
	pub thread_ids: Vec<i64>,
	pub skipped: Vec<SkippedThread>,
	/// The first per-item error. Later items were still attempted.
	pub first_error: Option<ThreadError>,
	/// The search matched more results than the single page returned.
	pub truncated: bool,
}

pub struct ThreadReconciler {
	threads: Arc<dyn ExternalThreadStore>,
	repos: Arc<dyn RepoStore>,
	resolver: Arc<dyn ClientResolver>,
	fetcher: Arc<dyn ThreadFetcher>,
}

impl ThreadReconciler {
	pub fn new(
		threads: Arc<dyn ExternalThreadStore>,
		repos: Arc<dyn RepoStore>,
		resolver: Arc<dyn ClientResolver>,
		fetcher: Arc<dyn ThreadFetcher>,
	) -> Self {
		Self {
			threads,
			repos,
			resolver,
			fetcher,
		}
	}

	pub(crate) fn threads(&self) -> &dyn ExternalThreadStore {
		self.threads.as_ref()
	}

	pub(crate) fn resolver(&self) -> &dyn ClientResolver {
		self.resolver.as_ref()
	}

	pub(crate) async fn repository(&self, repository_id: i64) -> Result<RepoRecord> {
		self
			.repos
			.get_repo_by_id(repository_id)
			.await?
			.ok_or_else(|| ThreadError::NotFound(NotFoundKind::LocalRepository(repository_id.to_string())))
	}

	/// Links the existing remote issue or pull request `number` to a thread,
	/// creating the thread on first use. Never creates anything remotely.
	#[instrument(skip(self, repo_spec), fields(repo_external_id = %repo_spec.id))]
	pub async fn create_or_get_existing(
		&self,
		repository_id: i64,
		repo_spec: &ExternalRepoSpec,
		number: i64,
	) -> Result<i64> {
		let repo = self.repository(repository_id).await?;
		let resolved = self.resolver.resolve(&repo).await?;
		if !resolved.code_host.is_host_of(repo_spec) {
			return Err(ThreadError::Config(format!(
				"code host {} does not serve repository {} on {}",
				resolved.code_host.base_url(),
				repo_spec.id,
				repo_spec.service_id
			)));
		}

		let entity = self
			.fetcher
			.by_repository_and_number(resolved.client.as_ref(), &repo_spec.id, number)
			.await?;
		self
			.create_or_update(repository_id, resolved.external_service_id, &entity, None)
			.await
	}

	/// Refreshes thread `thread_id` from the code host. A thread recorded
	/// against a different service than its repository now resolves to is
	/// rejected and left unchanged.
	#[instrument(skip(self))]
	pub async fn update_metadata(
		&self,
		thread_id: i64,
		thread_external_service_id: i64,
		external_id: &str,
		repository_id: i64,
	) -> Result<()> {
		let repo = self.repository(repository_id).await?;
		let resolved = self.resolver.resolve(&repo).await?;
		if resolved.external_service_id != thread_external_service_id {
			warn!(
				repository_service_id = resolved.external_service_id,
				"thread service does not match repository service"
			);
			return Err(ThreadError::ServiceMismatch {
				thread_id,
				thread_service_id: thread_external_service_id,
				repository_service_id: resolved.external_service_id,
			});
		}

		let entity = self
			.fetcher
			.by_node_id(resolved.client.as_ref(), external_id)
			.await?;
		self
			.create_or_update(
				repository_id,
				resolved.external_service_id,
				&entity,
				Some(thread_id),
			)
			.await?;
		Ok(())
	}

	/// Imports every issue and pull request matched by a code host search.
	///
	/// The search runs with the client of the first enabled repository. Only
	/// the first page is fetched; `truncated` reports whether more exist.
	/// Results from repositories not registered locally are skipped.
	#[instrument(skip(self))]
	pub async fn import_by_query(&self, query: &str) -> Result<ImportOutcome> {
		let search_repo = self
			.repos
			.list_repos(&RepoListOptions {
				enabled_only: true,
				limit: Some(1),
			})
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| {
				ThreadError::Config("no enabled repository to run the search with".to_string())
			})?;
		let search = self.resolver.resolve(&search_repo).await?;

		let page = self.fetcher.by_query(search.client.as_ref(), query).await?;
		let mut outcome = ImportOutcome {
			truncated: page.truncated,
			..Default::default()
		};
		if page.truncated {
			warn!(
				returned = page.threads.len(),
				"search matched more results than one page; split the query to import the rest"
			);
		}

		for entity in &page.threads {
			let repository_name = search.code_host.repo_name_for(&entity.repository_full_name);
			match self.import_one(&repository_name, entity).await {
				Ok(Some(thread_id)) => outcome.thread_ids.push(thread_id),
				Ok(None) => {
					warn!(
						repository = %repository_name,
						number = entity.number,
						title = %entity.title,
						"skipping search result from unknown repository"
					);
					outcome.skipped.push(SkippedThread {
						repository_name,
						number: entity.number,
						title: entity.title.clone(),
					});
				}
				Err(e) => {
					warn!(
						repository = %repository_name,
						number = entity.number,
						error = %e,
						"failed to import search result"
					);
					outcome.first_error.get_or_insert(e);
				}
			}
		}

		info!(
			imported = outcome.thread_ids.len(),
			skipped = outcome.skipped.len(),
			failed = outcome.first_error.is_some(),
			"import finished"
		);
		Ok(outcome)
	}

	async fn import_one(&self, repository_name: &str, entity: &ExternalThread) -> Result<Option<i64>> {
		let Some(repo) = self.repos.get_repo_by_name(repository_name).await? else {
			return Ok(None);
		};
		// The repository may be served by a different service than the one
		// that ran the search.
		let resolved = self.resolver.resolve(&repo).await?;
		let thread_id = self
			.create_or_update(repo.id, resolved.external_service_id, entity, None)
			.await?;
		Ok(Some(thread_id))
	}

	/// Applies a webhook event for a thread on `code_host`. Returns `None`
	/// when the event's repository is not registered locally.
	#[instrument(skip(self, code_host, event), fields(node_id = %event.node_id, action = %event.action))]
	pub async fn refresh_from_webhook(
		&self,
		code_host: &CodeHost,
		event: &ThreadEvent,
	) -> Result<Option<i64>> {
		let repository_name = code_host.repo_name_for(&event.repository_full_name);
		let Some(repo) = self.repos.get_repo_by_name(&repository_name).await? else {
			debug!(repository = %repository_name, "webhook for unknown repository");
			return Ok(None);
		};
		let resolved = self.resolver.resolve(&repo).await?;
		if !same_service(&resolved.code_host, code_host) {
			return Err(ThreadError::Config(format!(
				"webhook from {} for repository {} served by {}",
				code_host.base_url(),
				repo.name,
				resolved.code_host.base_url()
			)));
		}

		let key = ThreadKey {
			repository_id: repo.id,
			external_service_id: resolved.external_service_id,
			external_id: event.node_id.clone(),
		};
		if let Some(existing) = self.threads.find_thread_by_tuple(&key).await? {
			self
				.update_metadata(
					existing.id,
					existing.external_service_id,
					&existing.external_id,
					repo.id,
				)
				.await?;
			return Ok(Some(existing.id));
		}

		let entity = self
			.fetcher
			.by_node_id(resolved.client.as_ref(), &event.node_id)
			.await?;
		let thread_id = self
			.create_or_update(repo.id, resolved.external_service_id, &entity, None)
			.await?;
		Ok(Some(thread_id))
	}

	/// Writes `entity` to the thread it maps to and returns that thread's id.
	///
	/// With `pinned_thread_id` set, that exact row is updated. Otherwise the
	/// row is looked up by key and updated, or inserted if absent. A lost
	/// insert race turns into an update of the winner's row.
	#[instrument(skip(self, entity), fields(external_id = %entity.external_id))]
	pub async fn create_or_update(
		&self,
		repository_id: i64,
		external_service_id: i64,
		entity: &ExternalThread,
		pinned_thread_id: Option<i64>,
	) -> Result<i64> {
		let metadata = metadata_from(entity);

		if let Some(thread_id) = pinned_thread_id {
			self.update(thread_id, &metadata).await?;
			return Ok(thread_id);
		}

		let key = ThreadKey {
			repository_id,
			external_service_id,
			external_id: entity.external_id.clone(),
		};
		if let Some(existing) = self.threads.find_thread_by_tuple(&key).await? {
			self.update(existing.id, &metadata).await?;
			return Ok(existing.id);
		}

		if let Some(thread_id) = self.threads.insert_thread(&key, &metadata).await? {
			info!(thread_id, "thread created");
			return Ok(thread_id);
		}

		debug!("thread inserted concurrently, updating it instead");
		let existing = self.threads.find_thread_by_tuple(&key).await?.ok_or_else(|| {
			DbError::Internal(format!(
				"thread for {} vanished after a conflicting insert",
				key.external_id
			))
		})?;
		self.update(existing.id, &metadata).await?;
		Ok(existing.id)
	}

	async fn update(&self, thread_id: i64, metadata: &ThreadMetadata) -> Result<()> {
		match self.threads.update_thread(thread_id, metadata).await {
			Ok(()) => {
				debug!(thread_id, "thread updated");
				Ok(())
			}
			Err(DbError::NotFound(_)) => Err(ThreadError::NotFound(NotFoundKind::Thread { id: thread_id })),
			Err(e) => Err(e.into()),
		}
	}
}

fn metadata_from(entity: &ExternalThread) -> ThreadMetadata {
	ThreadMetadata {
		number: entity.number,
		kind: entity.kind,
		state: entity.state,
		title: entity.title.clone(),
		body: entity.body.clone(),
		base_ref: entity.base_ref.clone(),
		head_ref: entity.head_ref.clone(),
	}
}
