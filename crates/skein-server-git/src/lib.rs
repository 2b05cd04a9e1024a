// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Version-control operations used when publishing a change: resolving a
//! repository's default branch, creating a commit from a patch, and pushing.
//!
//! Everything shells out to the `git` CLI.

mod command;
pub mod error;
pub mod service;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{GitError, Result};
pub use service::{
	BranchTip, CommandGitService, CreateCommitFromPatchRequest, GitService, PatchCommitInfo,
};
