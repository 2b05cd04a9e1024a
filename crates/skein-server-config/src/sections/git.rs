// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Local clones used to commit and push published changes.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitConfig {
	/// One clone per repository name, e.g. `<root>/github.com/owner/name`.
	pub repos_root: PathBuf,
	pub remote: String,
}

impl Default for GitConfig {
	fn default() -> Self {
		GitConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitConfigLayer {
	#[serde(default)]
	pub repos_root: Option<PathBuf>,
	#[serde(default)]
	pub remote: Option<String>,
}

impl GitConfigLayer {
	pub fn merge(&mut self, other: GitConfigLayer) {
		if other.repos_root.is_some() {
			self.repos_root = other.repos_root;
		}
		if other.remote.is_some() {
			self.remote = other.remote;
		}
	}

	pub fn finalize(self) -> GitConfig {
		GitConfig {
			repos_root: self.repos_root.unwrap_or_else(|| PathBuf::from("./repos")),
			remote: self.remote.unwrap_or_else(|| "origin".to_string()),
		}
	}
}
