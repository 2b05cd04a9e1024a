// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::command::GitCommand;
use crate::error::{GitError, Result};

/// A branch and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchTip {
	pub name: String,
	pub oid: String,
}

/// Author and message for a commit created from a patch. The author is
/// also recorded as committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchCommitInfo {
	pub author_name: String,
	pub author_email: String,
	pub message: String,
	pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommitFromPatchRequest {
	/// Repository name, e.g. `github.com/owner/name`.
	pub repo: String,
	pub base_commit: String,
	/// Full ref name, e.g. `refs/heads/a8n/fix-bug`.
	pub target_ref: String,
	/// Unified diff as produced by `git diff`.
	pub patch: String,
	pub commit_info: PatchCommitInfo,
}

#[async_trait]
pub trait GitService: Send + Sync {
	async fn default_branch(&self, repo: &str) -> Result<BranchTip>;

	/// Applies the patch on top of `base_commit` without touching any
	/// working tree, then points `target_ref` at the new commit. Returns the
	/// new commit id.
	async fn create_commit_from_patch(&self, request: &CreateCommitFromPatchRequest)
		-> Result<String>;

	/// Pushes `refspecs` to the configured remote and returns git's output.
	async fn push(&self, repo: &str, refspecs: &[String], force: bool) -> Result<String>;
}

/// [`GitService`] over local clones under `repos_root`, one directory per
/// repository name.
#[derive(Debug, Clone)]
pub struct CommandGitService {
	repos_root: PathBuf,
	remote: String,
}

impl CommandGitService {
	pub fn new(repos_root: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
		Self {
			repos_root: repos_root.into(),
			remote: remote.into(),
		}
	}

	pub fn repo_path(&self, repo: &str) -> Result<PathBuf> {
		let relative = Path::new(repo);
		let valid = !repo.is_empty()
			&& relative
				.components()
				.all(|c| matches!(c, Component::Normal(_)));
		if !valid {
			return Err(GitError::InvalidRepositoryName(repo.to_string()));
		}

		let path = self.repos_root.join(relative);
		if !path.is_dir() {
			return Err(GitError::RepositoryNotFound(repo.to_string()));
		}
		Ok(path)
	}
}

#[async_trait]
impl GitService for CommandGitService {
	#[instrument(skip(self))]
	async fn default_branch(&self, repo: &str) -> Result<BranchTip> {
		let path = self.repo_path(repo)?;

		let name = GitCommand::new(&path, ["symbolic-ref", "--short", "HEAD"])
			.run()
			.await
			.map_err(|_| GitError::NoDefaultBranch(repo.to_string()))?;
		let oid = GitCommand::new(
			&path,
			[
				"rev-parse".to_string(),
				"--verify".to_string(),
				format!("refs/heads/{name}^{{commit}}"),
			],
		)
		.run()
		.await
		.map_err(|_| GitError::NoDefaultBranch(repo.to_string()))?;

		debug!(branch = %name, oid = %oid, "resolved default branch");
		Ok(BranchTip { name, oid })
	}

	#[instrument(
		skip(self, request),
		fields(repo = %request.repo, base = %request.base_commit, target_ref = %request.target_ref)
	)]
	async fn create_commit_from_patch(
		&self,
		request: &CreateCommitFromPatchRequest,
	) -> Result<String> {
		let path = self.repo_path(&request.repo)?;

		// A private index keeps the repository's own index and working tree
		// untouched.
		let index_dir = tempfile::tempdir()?;
		let index = index_dir.path().join("index");

		GitCommand::new(&path, ["read-tree", request.base_commit.as_str()])
			.env("GIT_INDEX_FILE", &index)
			.run()
			.await?;
		GitCommand::new(&path, ["apply", "--cached", "--whitespace=nowarn", "-"])
			.env("GIT_INDEX_FILE", &index)
			.stdin(request.patch.as_bytes())
			.run()
			.await?;
		let tree = GitCommand::new(&path, ["write-tree"])
			.env("GIT_INDEX_FILE", &index)
			.run()
			.await?;

		let info = &request.commit_info;
		let mut commit_tree = GitCommand::new(
			&path,
			[
				"commit-tree",
				tree.as_str(),
				"-p",
				request.base_commit.as_str(),
				"-F",
				"-",
			],
		)
		.env("GIT_AUTHOR_NAME", &info.author_name)
		.env("GIT_AUTHOR_EMAIL", &info.author_email)
		.env("GIT_COMMITTER_NAME", &info.author_name)
		.env("GIT_COMMITTER_EMAIL", &info.author_email)
		.stdin(info.message.as_bytes());
		if let Some(date) = info.date {
			let date = date.to_rfc3339();
			commit_tree = commit_tree
				.env("GIT_AUTHOR_DATE", date.clone())
				.env("GIT_COMMITTER_DATE", date);
		}
		let oid = commit_tree.run().await?;

		GitCommand::new(&path, ["update-ref", request.target_ref.as_str(), oid.as_str()])
			.run()
			.await?;

		info!(oid = %oid, "created commit from patch");
		Ok(oid)
	}

	#[instrument(skip(self))]
	async fn push(&self, repo: &str, refspecs: &[String], force: bool) -> Result<String> {
		let path = self.repo_path(repo)?;

		let mut args = vec!["push".to_string()];
		if force {
			args.push("--force".to_string());
		}
		args.push("--".to_string());
		args.push(self.remote.clone());
		args.extend(refspecs.iter().cloned());

		let output = GitCommand::new(&path, args).run_combined().await?;
		info!(remote = %self.remote, refspecs = ?refspecs, "pushed");
		Ok(output)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{git, init_bare_remote, init_repo_with_commit};
	use proptest::prelude::*;
	use tempfile::TempDir;

	const REPO: &str = "github.com/sd9/repo";

	const ADD_FILE_PATCH: &str = "diff --git a/hello.txt b/hello.txt
new file mode 100644
index 0000000..ce01362
--- /dev/null
+++ b/hello.txt
@@ -0,0 +1 @@
+hello
";

	fn commit_request(base: &str, target_ref: &str, patch: &str) -> CreateCommitFromPatchRequest {
		CreateCommitFromPatchRequest {
			repo: REPO.to_string(),
			base_commit: base.to_string(),
			target_ref: target_ref.to_string(),
			patch: patch.to_string(),
			commit_info: PatchCommitInfo {
				author_name: "Skein".to_string(),
				author_email: "skein@example.com".to_string(),
				message: "a8n: fix-bug".to_string(),
				date: None,
			},
		}
	}

	#[tokio::test]
	async fn test_default_branch() {
		let root = TempDir::new().unwrap();
		let c1 = init_repo_with_commit(&root.path().join(REPO), "main");

		let service = CommandGitService::new(root.path(), "origin");
		let tip = service.default_branch(REPO).await.unwrap();
		assert_eq!(tip.name, "main");
		assert_eq!(tip.oid, c1);
	}

	#[tokio::test]
	async fn test_repo_path_validation() {
		let root = TempDir::new().unwrap();
		let service = CommandGitService::new(root.path(), "origin");

		for bad in ["", "../escape", "/etc", "github.com/../../x"] {
			assert!(
				matches!(service.repo_path(bad), Err(GitError::InvalidRepositoryName(_))),
				"{bad}"
			);
		}
		assert!(matches!(
			service.default_branch("github.com/nobody/nothing").await,
			Err(GitError::RepositoryNotFound(_))
		));
	}

	#[tokio::test]
	async fn test_create_commit_from_patch() {
		let root = TempDir::new().unwrap();
		let repo_dir = root.path().join(REPO);
		let c1 = init_repo_with_commit(&repo_dir, "main");

		let service = CommandGitService::new(root.path(), "origin");
		let oid = service
			.create_commit_from_patch(&commit_request(&c1, "refs/heads/a8n/fix-bug", ADD_FILE_PATCH))
			.await
			.unwrap();

		assert_eq!(git(&repo_dir, &["rev-parse", "refs/heads/a8n/fix-bug"]), oid);
		assert_eq!(git(&repo_dir, &["rev-parse", &format!("{oid}^")]), c1);
		assert_eq!(git(&repo_dir, &["show", &format!("{oid}:hello.txt")]), "hello");
		assert_eq!(
			git(&repo_dir, &["log", "-1", "--format=%an <%ae>|%cn|%s", &oid]),
			"Skein <skein@example.com>|Skein|a8n: fix-bug"
		);
		// The default branch and working tree are untouched.
		assert_eq!(git(&repo_dir, &["rev-parse", "main"]), c1);
		assert!(!repo_dir.join("hello.txt").exists());
	}

	#[tokio::test]
	async fn test_create_commit_from_bad_patch_fails() {
		let root = TempDir::new().unwrap();
		let c1 = init_repo_with_commit(&root.path().join(REPO), "main");

		let service = CommandGitService::new(root.path(), "origin");
		let result = service
			.create_commit_from_patch(&commit_request(&c1, "refs/heads/x", "not a patch"))
			.await;
		assert!(matches!(result, Err(GitError::CommandFailed { .. })));
	}

	#[tokio::test]
	async fn test_force_push_overwrites_branch() {
		let root = TempDir::new().unwrap();
		let repo_dir = root.path().join(REPO);
		let c1 = init_repo_with_commit(&repo_dir, "main");
		let remote = init_bare_remote(&root.path().join("remote.git"));
		git(&repo_dir, &["remote", "add", "origin", remote.to_str().unwrap()]);

		let service = CommandGitService::new(root.path(), "origin");
		let refspec = vec!["refs/heads/a8n/fix-bug:refs/heads/a8n/fix-bug".to_string()];

		let first = service
			.create_commit_from_patch(&commit_request(&c1, "refs/heads/a8n/fix-bug", ADD_FILE_PATCH))
			.await
			.unwrap();
		service.push(REPO, &refspec, true).await.unwrap();
		assert_eq!(git(&remote, &["rev-parse", "refs/heads/a8n/fix-bug"]), first);

		// A second, unrelated commit for the same branch replaces the first.
		let mut second_request =
			commit_request(&c1, "refs/heads/a8n/fix-bug", ADD_FILE_PATCH);
		second_request.commit_info.message = "a8n: fix-bug (again)".to_string();
		let second = service
			.create_commit_from_patch(&second_request)
			.await
			.unwrap();
		assert_ne!(first, second);
		service.push(REPO, &refspec, true).await.unwrap();
		assert_eq!(git(&remote, &["rev-parse", "refs/heads/a8n/fix-bug"]), second);

		// The default branch was never pushed.
		assert!(std::process::Command::new("git")
			.arg("-C")
			.arg(&remote)
			.args(["rev-parse", "--verify", "--quiet", "refs/heads/main"])
			.output()
			.map(|o| !o.status.success())
			.unwrap());
	}

	proptest! {
		#[test]
		fn prop_normal_relative_names_are_accepted(
			parts in proptest::collection::vec("[a-z0-9][a-z0-9._-]{0,8}", 1..4)
		) {
			let root = TempDir::new().unwrap();
			let name = parts.join("/");
			std::fs::create_dir_all(root.path().join(&name)).unwrap();
			let service = CommandGitService::new(root.path(), "origin");
			prop_assert!(service.repo_path(&name).is_ok());
		}
	}
}
