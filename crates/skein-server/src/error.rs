// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use skein_server_config::ConfigError;
use skein_server_db::DbError;
use skein_server_github::GithubError;
use skein_server_threads::ThreadError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error("Database error: {0}")]
	Db(#[from] DbError),

	#[error("GitHub error: {0}")]
	Github(#[from] GithubError),

	#[error(transparent)]
	Thread(#[from] ThreadError),

	#[error("no code host configured with id {0}")]
	UnknownCodeHost(i64),

	#[error("code host {0} has no webhook secret configured")]
	WebhookSecretMissing(i64),

	#[error("repository not found: {0}")]
	RepositoryNotFound(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;
