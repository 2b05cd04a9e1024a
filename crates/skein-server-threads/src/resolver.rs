// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Maps a local repository to the code host client that serves it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use skein_common_codehost::{CodeHost, ExternalRepoSpec};
use skein_server_db::RepoRecord;
use skein_server_github::GraphqlTransport;

use crate::error::{Result, ThreadError};

/// A client bound to one configured external service.
#[derive(Clone)]
pub struct ResolvedClient {
	pub client: Arc<dyn GraphqlTransport>,
	pub external_service_id: i64,
	pub code_host: CodeHost,
}

impl std::fmt::Debug for ResolvedClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ResolvedClient")
			.field("external_service_id", &self.external_service_id)
			.field("code_host", &self.code_host)
			.finish_non_exhaustive()
	}
}

#[async_trait]
pub trait ClientResolver: Send + Sync {
	/// Fails with [`ThreadError::Config`] if no client serves `repo`.
	async fn resolve(&self, repo: &RepoRecord) -> Result<ResolvedClient>;
}

/// [`ClientResolver`] over a fixed set of configured code hosts, keyed by
/// external service id.
#[derive(Default)]
pub struct ConfiguredClientResolver {
	services: HashMap<i64, (CodeHost, Arc<dyn GraphqlTransport>)>,
}

impl ConfiguredClientResolver {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_service(
		mut self,
		external_service_id: i64,
		code_host: CodeHost,
		client: Arc<dyn GraphqlTransport>,
	) -> Self {
		self
			.services
			.insert(external_service_id, (code_host, client));
		self
	}
}

#[async_trait]
impl ClientResolver for ConfiguredClientResolver {
	async fn resolve(&self, repo: &RepoRecord) -> Result<ResolvedClient> {
		let (code_host, client) = self.services.get(&repo.external_service_id).ok_or_else(|| {
			ThreadError::Config(format!(
				"no client configured for external service {} (repository {})",
				repo.external_service_id, repo.name
			))
		})?;

		let spec = ExternalRepoSpec::new(&repo.external_id, &repo.service_type, &repo.service_id);
		if !code_host.is_host_of(&spec) {
			return Err(ThreadError::Config(format!(
				"external service {} ({}) does not host repository {}",
				repo.external_service_id,
				code_host.base_url(),
				repo.name
			)));
		}

		Ok(ResolvedClient {
			client: Arc::clone(client),
			external_service_id: repo.external_service_id,
			code_host: code_host.clone(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use serde_json::Value;
	use skein_common_codehost::{ServiceKey, GITHUB_SERVICE_TYPE};
	use skein_server_github::{GithubError, GraphqlRequest};

	struct NoopTransport;

	#[async_trait]
	impl GraphqlTransport for NoopTransport {
		async fn request_graphql(&self, _request: GraphqlRequest) -> std::result::Result<Value, GithubError> {
			Ok(Value::Null)
		}
	}

	fn repo(service_id: &str, external_service_id: i64) -> RepoRecord {
		RepoRecord {
			id: 1,
			name: "github.com/sd9/repo".to_string(),
			external_id: "R_1".to_string(),
			service_type: GITHUB_SERVICE_TYPE.to_string(),
			service_id: service_id.to_string(),
			external_service_id,
			enabled: true,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	fn resolver() -> ConfiguredClientResolver {
		let host = CodeHost::parse("https://GitHub.com", GITHUB_SERVICE_TYPE).unwrap();
		ConfiguredClientResolver::new().with_service(1, host, Arc::new(NoopTransport))
	}

	#[tokio::test]
	async fn test_resolve_matches_normalized_service() {
		let resolved = resolver().resolve(&repo("https://github.com/", 1)).await.unwrap();
		assert_eq!(resolved.external_service_id, 1);
		assert_eq!(resolved.code_host.service_id(), "https://github.com/");
	}

	#[tokio::test]
	async fn test_resolve_unknown_service_is_config_error() {
		let err = resolver()
			.resolve(&repo("https://github.com/", 2))
			.await
			.unwrap_err();
		assert!(matches!(err, ThreadError::Config(_)));
	}

	#[tokio::test]
	async fn test_resolve_refuses_foreign_host() {
		let err = resolver()
			.resolve(&repo("https://ghe.example.com/", 1))
			.await
			.unwrap_err();
		assert!(matches!(err, ThreadError::Config(ref m) if m.contains("does not host")));
	}
}
