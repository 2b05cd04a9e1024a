// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Code host identity for Skein.
//!
//! A code host (GitHub.com, a GitHub Enterprise instance, ...) is identified
//! by the pair `(service_id, service_type)`. The `service_id` is the
//! normalized serialization of the host's base URL, so two configurations
//! that differ only in hostname case or a trailing slash resolve to the same
//! service. Raw URL equality is never used to compare services.

pub mod thread;

use serde::{Deserialize, Serialize};
use url::Url;

pub use thread::{ThreadKind, ThreadState};

/// Service type for GitHub.com and GitHub Enterprise.
pub const GITHUB_SERVICE_TYPE: &str = "github";

#[derive(Debug, thiserror::Error)]
pub enum CodeHostError {
	#[error("invalid base URL '{raw}': {message}")]
	InvalidBaseUrl { raw: String, message: String },
}

/// Anything that names an external service by `(service_id, service_type)`.
pub trait ServiceKey {
	fn service_id(&self) -> &str;
	fn service_type(&self) -> &str;
}

/// Returns true if both keys name the same external service.
pub fn same_service(a: &impl ServiceKey, b: &impl ServiceKey) -> bool {
	a.service_id() == b.service_id() && a.service_type() == b.service_type()
}

/// Normalizes a base URL so insignificant differences are eliminated.
///
/// Lower-cases the host and appends a trailing `/` to the path if absent.
/// The returned value should be used for [`ExternalRepoSpec::service_id`]
/// instead of a non-normalized base URL.
pub fn normalize_base_url(mut base_url: Url) -> Url {
	if let Some(host) = base_url.host_str() {
		let lowered = host.to_lowercase();
		if lowered != host {
			// Only fails for cannot-be-a-base URLs, which have no host.
			let _ = base_url.set_host(Some(&lowered));
		}
	}
	if !base_url.path().ends_with('/') {
		let path = format!("{}/", base_url.path());
		base_url.set_path(&path);
	}
	base_url
}

/// A configured external code host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeHost {
	service_id: String,
	service_type: String,
	base_url: Url,
}

impl CodeHost {
	/// Builds the identity from an already-validated base URL.
	pub fn new(base_url: Url, service_type: impl Into<String>) -> Self {
		let base_url = normalize_base_url(base_url);
		Self {
			service_id: base_url.to_string(),
			service_type: service_type.into(),
			base_url,
		}
	}

	/// Parses and validates a raw base URL, then builds the identity.
	pub fn parse(raw: &str, service_type: impl Into<String>) -> Result<Self, CodeHostError> {
		let url = Url::parse(raw).map_err(|e| CodeHostError::InvalidBaseUrl {
			raw: raw.to_string(),
			message: e.to_string(),
		})?;
		if url.cannot_be_a_base() || url.host_str().is_none() {
			return Err(CodeHostError::InvalidBaseUrl {
				raw: raw.to_string(),
				message: "base URL must include a host".to_string(),
			});
		}
		Ok(Self::new(url, service_type))
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Host portion of the base URL, lower-cased.
	pub fn host(&self) -> &str {
		self.base_url.host_str().unwrap_or_default()
	}

	/// True if this code host is the one that hosts the given repository.
	pub fn is_host_of(&self, repo: &ExternalRepoSpec) -> bool {
		same_service(self, repo)
	}

	/// Local repository name for an `owner/name` path on this host,
	/// e.g. `github.com/owner/name`.
	pub fn repo_name_for(&self, name_with_owner: &str) -> String {
		format!("{}/{}", self.host(), name_with_owner.trim_matches('/'))
	}
}

impl ServiceKey for CodeHost {
	fn service_id(&self) -> &str {
		&self.service_id
	}

	fn service_type(&self) -> &str {
		&self.service_type
	}
}

/// Identifies a repository on an external code host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalRepoSpec {
	/// Opaque repository ID on the code host (a GraphQL node ID for GitHub).
	pub id: String,
	pub service_type: String,
	pub service_id: String,
}

impl ExternalRepoSpec {
	pub fn new(
		id: impl Into<String>,
		service_type: impl Into<String>,
		service_id: impl Into<String>,
	) -> Self {
		Self {
			id: id.into(),
			service_type: service_type.into(),
			service_id: service_id.into(),
		}
	}

	/// Builds a spec for a repository hosted on `host`.
	pub fn on(host: &CodeHost, id: impl Into<String>) -> Self {
		Self::new(id, host.service_type(), host.service_id())
	}
}

impl ServiceKey for ExternalRepoSpec {
	fn service_id(&self) -> &str {
		&self.service_id
	}

	fn service_type(&self) -> &str {
		&self.service_type
	}
}
