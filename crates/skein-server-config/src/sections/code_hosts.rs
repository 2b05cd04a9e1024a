// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configured external code hosts.
//!
//! ```toml
//! [[code_hosts]]
//! id = 1
//! kind = "github"
//! base_url = "https://github.com"
//! token = "ghp_..."
//! ```
//!
//! Layers are merged entry by entry on `id`, so a file can declare a host
//! and the environment can supply its token.

use serde::Deserialize;
use skein_common_codehost::{CodeHost, GITHUB_SERVICE_TYPE};
use url::Url;

use crate::error::ConfigError;
use crate::secret::SecretString;

const GITHUB_DOT_COM: &str = "https://github.com/";
const GITHUB_DOT_COM_API: &str = "https://api.github.com/";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeHostKind {
	#[default]
	Github,
}

impl CodeHostKind {
	/// The service type recorded on repositories served by this kind.
	pub fn service_type(&self) -> &'static str {
		match self {
			CodeHostKind::Github => GITHUB_SERVICE_TYPE,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeHostConfigLayer {
	#[serde(default)]
	pub id: Option<i64>,
	#[serde(default)]
	pub kind: Option<CodeHostKind>,
	#[serde(default)]
	pub base_url: Option<String>,
	#[serde(default)]
	pub api_url: Option<String>,
	#[serde(default)]
	pub token: Option<SecretString>,
	#[serde(default)]
	pub webhook_secret: Option<SecretString>,
}

impl CodeHostConfigLayer {
	pub fn merge(&mut self, other: CodeHostConfigLayer) {
		if other.id.is_some() {
			self.id = other.id;
		}
		if other.kind.is_some() {
			self.kind = other.kind;
		}
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
		if other.api_url.is_some() {
			self.api_url = other.api_url;
		}
		if other.token.is_some() {
			self.token = other.token;
		}
		if other.webhook_secret.is_some() {
			self.webhook_secret = other.webhook_secret;
		}
	}

	pub fn is_empty(&self) -> bool {
		self.kind.is_none()
			&& self.base_url.is_none()
			&& self.api_url.is_none()
			&& self.token.is_none()
			&& self.webhook_secret.is_none()
	}

	pub fn finalize(self) -> Result<CodeHostConfig, ConfigError> {
		let id = self
			.id
			.ok_or_else(|| ConfigError::Validation("code host entry without an id".to_string()))?;
		let kind = self.kind.unwrap_or_default();

		let raw_base = self.base_url.as_deref().unwrap_or(GITHUB_DOT_COM);
		let code_host =
			CodeHost::parse(raw_base, kind.service_type()).map_err(|e| ConfigError::InvalidValue {
				key: format!("code_hosts[{id}].base_url"),
				message: e.to_string(),
			})?;

		let api_url = match self.api_url.as_deref() {
			Some(raw) => Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
				key: format!("code_hosts[{id}].api_url"),
				message: e.to_string(),
			})?,
			None => default_api_url(&code_host)?,
		};

		let token = self.token.ok_or_else(|| {
			ConfigError::Validation(format!("code host {id} ({raw_base}) has no token"))
		})?;

		Ok(CodeHostConfig {
			id,
			kind,
			base_url: code_host.base_url().clone(),
			api_url,
			token,
			webhook_secret: self.webhook_secret,
		})
	}
}

/// GitHub.com serves its API from `api.github.com`; GitHub Enterprise
/// serves it under `/api/` on the instance.
fn default_api_url(code_host: &CodeHost) -> Result<Url, ConfigError> {
	let raw = if code_host.host() == "github.com" {
		GITHUB_DOT_COM_API.to_string()
	} else {
		format!("{}api/", code_host.base_url())
	};
	Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
		key: "code_hosts.api_url".to_string(),
		message: e.to_string(),
	})
}

/// Merges `other` into `target`, entry by entry on `id`. Entries with a new
/// id are appended.
pub fn merge_code_hosts(target: &mut Vec<CodeHostConfigLayer>, other: Vec<CodeHostConfigLayer>) {
	for entry in other {
		match target
			.iter_mut()
			.find(|existing| existing.id.is_some() && existing.id == entry.id)
		{
			Some(existing) => existing.merge(entry),
			None => target.push(entry),
		}
	}
}

#[derive(Debug, Clone)]
pub struct CodeHostConfig {
	/// External service id recorded on repositories and threads.
	pub id: i64,
	pub kind: CodeHostKind,
	/// Normalized base URL.
	pub base_url: Url,
	pub api_url: Url,
	pub token: SecretString,
	pub webhook_secret: Option<SecretString>,
}

impl CodeHostConfig {
	pub fn code_host(&self) -> CodeHost {
		CodeHost::new(self.base_url.clone(), self.kind.service_type())
	}
}
