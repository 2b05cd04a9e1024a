// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use skein_common_codehost::{ThreadKind, ThreadState};

use crate::error::GithubError;

/// An issue or pull request as seen on the code host.
///
/// Both kinds are normalized into this one shape; `base_ref` and `head_ref`
/// are only set for pull requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalThread {
	/// GraphQL node ID.
	pub external_id: String,
	pub number: i64,
	pub kind: ThreadKind,
	pub title: String,
	pub body: String,
	pub state: ThreadState,
	pub base_ref: Option<String>,
	pub head_ref: Option<String>,
	/// GraphQL node ID of the repository holding the head branch. Differs
	/// from `repository_external_id` for pull requests opened from a fork;
	/// `None` for issues and for deleted forks.
	pub head_repository_external_id: Option<String>,
	/// `owner/name` of the repository the thread lives in.
	pub repository_full_name: String,
	/// GraphQL node ID of the repository.
	pub repository_external_id: String,
	pub author_login: Option<String>,
	pub url: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// The single page returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPage {
	pub threads: Vec<ExternalThread>,
	/// The code host reported more matches than were returned.
	pub truncated: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawThreadNode {
	#[serde(rename = "__typename")]
	typename: String,
	id: String,
	number: i64,
	title: String,
	#[serde(default)]
	body: String,
	state: String,
	url: String,
	created_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
	author: Option<RawActor>,
	repository: RawRepositoryRef,
	base_ref_name: Option<String>,
	head_ref_name: Option<String>,
	head_repository: Option<RawNodeRef>,
}

#[derive(Debug, Deserialize)]
struct RawNodeRef {
	id: String,
}

#[derive(Debug, Deserialize)]
struct RawActor {
	login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRepositoryRef {
	id: String,
	name_with_owner: String,
}

impl ExternalThread {
	/// Converts a GraphQL node into a thread.
	///
	/// Returns `Ok(None)` for a null node or a node of any other type (a
	/// commit, a discussion, or a type the fragments did not match).
	pub fn from_node(node: &Value) -> Result<Option<Self>, GithubError> {
		let kind = match node.get("__typename").and_then(Value::as_str) {
			Some("Issue") => ThreadKind::Issue,
			Some("PullRequest") => ThreadKind::PullRequest,
			_ => return Ok(None),
		};

		let raw = RawThreadNode::deserialize(node)?;

		let state = ThreadState::from_github(&raw.state).ok_or_else(|| {
			GithubError::InvalidResponse(format!("unknown {} state {}", raw.typename, raw.state))
		})?;

		Ok(Some(ExternalThread {
			external_id: raw.id,
			number: raw.number,
			kind,
			title: raw.title,
			body: raw.body,
			state,
			base_ref: raw.base_ref_name,
			head_ref: raw.head_ref_name,
			head_repository_external_id: raw.head_repository.map(|r| r.id),
			repository_full_name: raw.repository.name_with_owner,
			repository_external_id: raw.repository.id,
			author_login: raw.author.map(|a| a.login),
			url: raw.url,
			created_at: raw.created_at,
			updated_at: raw.updated_at,
		}))
	}
}
