// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Publishes a patch as a branch and pull request.
//!
//! The sequence is commit, force-push, then create or reuse the pull request
//! and link it to a thread. Nothing is rolled back: a failure after the push
//! leaves the branch on the remote, and a retry picks it up again.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use skein_server_git::{CreateCommitFromPatchRequest, GitService, PatchCommitInfo};
use skein_server_github::{CreatePullRequest, ExternalThread, PullRequestService, UpdatePullRequest};
use tracing::{info, instrument, warn};

use crate::error::{NotFoundKind, Result, ThreadError};
use crate::reconciler::ThreadReconciler;

static BRANCH_UNSAFE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_.]+").unwrap());

/// Derives the branch for a campaign, e.g. `a8n` + `fix bug!` gives
/// `a8n/fix-bug`. Returns `None` if nothing usable is left of the name.
pub fn derive_branch_name(prefix: &str, campaign_name: &str) -> Option<String> {
	let slug = BRANCH_UNSAFE.replace_all(campaign_name, "-");
	let slug = slug.trim_end_matches('-');
	if slug.is_empty() || slug.starts_with('.') || slug.contains("..") || slug.ends_with(".lock") {
		return None;
	}
	Some(format!("{prefix}/{slug}"))
}

/// Decides which repositories may be published to.
pub trait NamespacePolicy: Send + Sync {
	fn allows(&self, repository_name: &str) -> bool;
}

/// Allows repositories whose name equals one of the prefixes or lies below
/// it, e.g. `github.com/sd9` allows `github.com/sd9/repo`. An empty list
/// allows nothing.
#[derive(Debug, Clone, Default)]
pub struct PrefixAllowList {
	prefixes: Vec<String>,
}

impl PrefixAllowList {
	pub fn new<I, S>(prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			prefixes: prefixes
				.into_iter()
				.map(|p| p.into().trim_end_matches('/').to_string())
				.filter(|p| !p.is_empty())
				.collect(),
		}
	}
}

impl NamespacePolicy for PrefixAllowList {
	fn allows(&self, repository_name: &str) -> bool {
		self.prefixes.iter().any(|prefix| {
			repository_name
				.strip_prefix(prefix.as_str())
				.is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
		})
	}
}

#[derive(Debug, Clone)]
pub struct PublisherConfig {
	pub author_name: String,
	pub author_email: String,
	pub branch_prefix: String,
	pub commit_message_prefix: String,
	/// Bound on the whole sequence in [`ChangePublisher::publish_with_deadline`].
	pub deadline: Duration,
}

#[derive(Debug, Clone)]
pub struct PublishRequest {
	pub repository_id: i64,
	pub campaign_name: String,
	pub campaign_id: Option<i64>,
	/// Unified diff applied on top of the default branch tip.
	pub patch: String,
	/// Pull request title; defaults to the campaign name.
	pub title: Option<String>,
	pub body: String,
	/// Thread of a previous publish. Its pull request is updated instead of
	/// a new one being created.
	pub existing_thread_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct PublishOutcome {
	pub thread_id: i64,
	pub branch: String,
	pub commit_oid: String,
	pub pull_request: ExternalThread,
}

pub struct ChangePublisher {
	reconciler: Arc<ThreadReconciler>,
	git: Arc<dyn GitService>,
	pull_requests: Arc<dyn PullRequestService>,
	namespaces: Arc<dyn NamespacePolicy>,
	config: PublisherConfig,
}

impl ChangePublisher {
	pub fn new(
		reconciler: Arc<ThreadReconciler>,
		git: Arc<dyn GitService>,
		pull_requests: Arc<dyn PullRequestService>,
		namespaces: Arc<dyn NamespacePolicy>,
		config: PublisherConfig,
	) -> Self {
		Self {
			reconciler,
			git,
			pull_requests,
			namespaces,
			config,
		}
	}

	/// [`publish`](Self::publish) bounded by the configured deadline. On
	/// expiry, whatever already reached the remote stays there.
	pub async fn publish_with_deadline(&self, request: &PublishRequest) -> Result<PublishOutcome> {
		let deadline = self.config.deadline;
		match tokio::time::timeout(deadline, self.publish(request)).await {
			Ok(result) => result,
			Err(_) => {
				warn!(
					repository_id = request.repository_id,
					campaign = %request.campaign_name,
					"publish deadline exceeded; remote branch may be left behind"
				);
				Err(ThreadError::DeadlineExceeded(deadline))
			}
		}
	}

	#[instrument(
		skip(self, request),
		fields(repository_id = request.repository_id, campaign = %request.campaign_name)
	)]
	pub async fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome> {
		let repo = self.reconciler.repository(request.repository_id).await?;
		let tip = self.git.default_branch(&repo.name).await?;

		let branch = derive_branch_name(&self.config.branch_prefix, &request.campaign_name)
			.ok_or_else(|| {
				ThreadError::InvalidRequest(format!(
					"campaign name {:?} yields no valid branch name",
					request.campaign_name
				))
			})?;

		if !self.namespaces.allows(&repo.name) {
			warn!(repository = %repo.name, "repository is outside the allowed namespaces");
			return Err(ThreadError::Refused(format!(
				"publishing to {} is not allowed",
				repo.name
			)));
		}

		// Everything that can fail on local data is checked before the first
		// remote write.
		let resolved = self.reconciler.resolver().resolve(&repo).await?;
		let existing = match request.existing_thread_id {
			Some(thread_id) => {
				let thread = self
					.reconciler
					.threads()
					.find_thread_by_id(thread_id)
					.await?
					.ok_or(ThreadError::NotFound(NotFoundKind::Thread { id: thread_id }))?;
				if thread.external_service_id != resolved.external_service_id {
					return Err(ThreadError::ServiceMismatch {
						thread_id,
						thread_service_id: thread.external_service_id,
						repository_service_id: resolved.external_service_id,
					});
				}
				if thread.repository_id != repo.id {
					return Err(ThreadError::InvalidRequest(format!(
						"thread {thread_id} belongs to repository {}, not {}",
						thread.repository_id, repo.id
					)));
				}
				Some(thread)
			}
			None => None,
		};

		let target_ref = format!("refs/heads/{branch}");
		let commit_oid = self
			.git
			.create_commit_from_patch(&CreateCommitFromPatchRequest {
				repo: repo.name.clone(),
				base_commit: tip.oid.clone(),
				target_ref: target_ref.clone(),
				patch: request.patch.clone(),
				commit_info: PatchCommitInfo {
					author_name: self.config.author_name.clone(),
					author_email: self.config.author_email.clone(),
					message: format!(
						"{}: {}",
						self.config.commit_message_prefix, request.campaign_name
					),
					date: None,
				},
			})
			.await?;

		self
			.git
			.push(&repo.name, &[format!("+{target_ref}:{target_ref}")], true)
			.await?;
		info!(branch = %branch, commit = %commit_oid, "branch pushed");

		let title = request
			.title
			.clone()
			.unwrap_or_else(|| request.campaign_name.clone());
		let body = pull_request_body(&request.body, &request.campaign_name);

		let (thread_id, pull_request) = match existing {
			Some(thread) => {
				let pull_request = self
					.pull_requests
					.update(
						resolved.client.as_ref(),
						&UpdatePullRequest {
							pull_request_id: thread.external_id.clone(),
							title,
							body,
						},
					)
					.await?;
				let thread_id = self
					.reconciler
					.create_or_update(
						repo.id,
						resolved.external_service_id,
						&pull_request,
						Some(thread.id),
					)
					.await?;
				(thread_id, pull_request)
			}
			None => {
				let pull_request = self
					.pull_requests
					.create_or_get(
						resolved.client.as_ref(),
						&CreatePullRequest {
							repository_id: repo.external_id.clone(),
							base_ref: tip.name.clone(),
							head_ref: branch.clone(),
							title,
							body,
						},
					)
					.await?;
				let thread_id = self
					.reconciler
					.create_or_update(repo.id, resolved.external_service_id, &pull_request, None)
					.await?;
				(thread_id, pull_request)
			}
		};

		if let Some(campaign_id) = request.campaign_id {
			self
				.reconciler
				.threads()
				.set_thread_campaign(thread_id, Some(campaign_id))
				.await?;
		}

		info!(thread_id, number = pull_request.number, "published");
		Ok(PublishOutcome {
			thread_id,
			branch,
			commit_oid,
			pull_request,
		})
	}
}

fn pull_request_body(body: &str, campaign_name: &str) -> String {
	let body = body.trim_end();
	if body.is_empty() {
		format!("Campaign: {campaign_name}")
	} else {
		format!("{body}\n\nCampaign: {campaign_name}")
	}
}
