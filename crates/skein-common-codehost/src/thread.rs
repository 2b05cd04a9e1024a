// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

/// Whether a remote thread is an issue or a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadKind {
	Issue,
	PullRequest,
}

impl ThreadKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			ThreadKind::Issue => "issue",
			ThreadKind::PullRequest => "pull_request",
		}
	}
}

impl std::str::FromStr for ThreadKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"issue" => Ok(ThreadKind::Issue),
			"pull_request" => Ok(ThreadKind::PullRequest),
			_ => Err(format!("unknown thread kind: {s}")),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadState {
	Open,
	Closed,
	Merged,
}

impl ThreadState {
	pub fn as_str(&self) -> &'static str {
		match self {
			ThreadState::Open => "open",
			ThreadState::Closed => "closed",
			ThreadState::Merged => "merged",
		}
	}

	/// Maps a GitHub `IssueState` / `PullRequestState` enum value.
	pub fn from_github(state: &str) -> Option<Self> {
		match state.to_ascii_uppercase().as_str() {
			"OPEN" => Some(ThreadState::Open),
			"CLOSED" => Some(ThreadState::Closed),
			"MERGED" => Some(ThreadState::Merged),
			_ => None,
		}
	}
}

impl std::str::FromStr for ThreadState {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"open" => Ok(ThreadState::Open),
			"closed" => Ok(ThreadState::Closed),
			"merged" => Ok(ThreadState::Merged),
			_ => Err(format!("unknown thread state: {s}")),
		}
	}
}
