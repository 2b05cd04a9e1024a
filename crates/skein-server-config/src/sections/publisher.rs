// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity and guard rails for publishing changes.

use serde::Deserialize;

const DEFAULT_AUTHOR_NAME: &str = "skein-bot";
const DEFAULT_AUTHOR_EMAIL: &str = "skein-bot@localhost";
const DEFAULT_PREFIX: &str = "a8n";
const DEFAULT_DEADLINE_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
	pub author_name: String,
	pub author_email: String,
	pub branch_prefix: String,
	pub commit_message_prefix: String,
	/// Repository name prefixes that may be published to. Empty refuses all.
	pub allowed_namespaces: Vec<String>,
	pub deadline_secs: u64,
}

impl Default for PublisherConfig {
	fn default() -> Self {
		PublisherConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublisherConfigLayer {
	#[serde(default)]
	pub author_name: Option<String>,
	#[serde(default)]
	pub author_email: Option<String>,
	#[serde(default)]
	pub branch_prefix: Option<String>,
	#[serde(default)]
	pub commit_message_prefix: Option<String>,
	#[serde(default)]
	pub allowed_namespaces: Option<Vec<String>>,
	#[serde(default)]
	pub deadline_secs: Option<u64>,
}

impl PublisherConfigLayer {
	pub fn merge(&mut self, other: PublisherConfigLayer) {
		if other.author_name.is_some() {
			self.author_name = other.author_name;
		}
		if other.author_email.is_some() {
			self.author_email = other.author_email;
		}
		if other.branch_prefix.is_some() {
			self.branch_prefix = other.branch_prefix;
		}
		if other.commit_message_prefix.is_some() {
			self.commit_message_prefix = other.commit_message_prefix;
		}
		if other.allowed_namespaces.is_some() {
			self.allowed_namespaces = other.allowed_namespaces;
		}
		if other.deadline_secs.is_some() {
			self.deadline_secs = other.deadline_secs;
		}
	}

	pub fn finalize(self) -> PublisherConfig {
		PublisherConfig {
			author_name: self
				.author_name
				.unwrap_or_else(|| DEFAULT_AUTHOR_NAME.to_string()),
			author_email: self
				.author_email
				.unwrap_or_else(|| DEFAULT_AUTHOR_EMAIL.to_string()),
			branch_prefix: self
				.branch_prefix
				.unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
			commit_message_prefix: self
				.commit_message_prefix
				.unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
			allowed_namespaces: self.allowed_namespaces.unwrap_or_default(),
			deadline_secs: self.deadline_secs.unwrap_or(DEFAULT_DEADLINE_SECS),
		}
	}
}
