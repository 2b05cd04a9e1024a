// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Helpers for tests that need real git repositories on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs git in `dir`, panicking on failure, and returns trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
	let output = Command::new("git")
		.arg("-C")
		.arg(dir)
		.args(args)
		.output()
		.expect("failed to run git");
	assert!(
		output.status.success(),
		"git {} failed: {}",
		args.join(" "),
		String::from_utf8_lossy(&output.stderr)
	);
	String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Creates a repository at `dir` whose `branch` holds one commit with a
/// README, and returns that commit id.
pub fn init_repo_with_commit(dir: &Path, branch: &str) -> String {
	fs::create_dir_all(dir).expect("create repo dir");
	git(dir, &["init", "--quiet"]);
	git(dir, &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")]);
	git(dir, &["config", "user.email", "test@test.com"]);
	git(dir, &["config", "user.name", "Test"]);
	fs::write(dir.join("README.md"), "# Test\n").expect("write README");
	git(dir, &["add", "README.md"]);
	git(dir, &["commit", "--quiet", "-m", "Initial commit"]);
	git(dir, &["rev-parse", "HEAD"])
}

/// Creates an empty bare repository to push to.
pub fn init_bare_remote(dir: &Path) -> PathBuf {
	fs::create_dir_all(dir).expect("create remote dir");
	git(dir, &["init", "--quiet", "--bare"]);
	dir.to_path_buf()
}
