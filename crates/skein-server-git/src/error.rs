// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
	#[error("git is not installed or not in PATH")]
	GitNotInstalled,

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("{cmd} {} failed: {stderr}", .args.join(" "))]
	CommandFailed {
		cmd: &'static str,
		args: Vec<String>,
		stderr: String,
	},

	#[error("invalid repository name: {0}")]
	InvalidRepositoryName(String),

	#[error("repository not found: {0}")]
	RepositoryNotFound(String),

	#[error("repository {0} has no default branch")]
	NoDefaultBranch(String),
}

pub type Result<T> = std::result::Result<T, GitError>;
