// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the Skein server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`SKEIN_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use skein_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("database at {}", config.database.url);
//! ```

pub mod error;
pub mod layer;
pub mod secret;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use secret::{load_secret_env, SecretString};
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::collections::HashSet;

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub code_hosts: Vec<CodeHostConfig>,
	pub publisher: PublisherConfig,
	pub git: GitConfig,
}

impl ServerConfig {
	pub fn code_host(&self, id: i64) -> Option<&CodeHostConfig> {
		self.code_hosts.iter().find(|h| h.id == id)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`SKEIN_SERVER_*`)
/// 2. Config file (`/etc/skein/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![Box::new(EnvSource)])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let publisher = layer.publisher.unwrap_or_default().finalize();
	let git = layer.git.unwrap_or_default().finalize();
	let code_hosts = layer
		.code_hosts
		.unwrap_or_default()
		.into_iter()
		.map(CodeHostConfigLayer::finalize)
		.collect::<Result<Vec<_>, _>>()?;

	validate_config(&code_hosts, &publisher)?;

	info!(
		database = %database.url,
		log_format = logging.format.as_str(),
		code_hosts = code_hosts.len(),
		allowed_namespaces = publisher.allowed_namespaces.len(),
		repos_root = %git.repos_root.display(),
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		database,
		logging,
		code_hosts,
		publisher,
		git,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(
	code_hosts: &[CodeHostConfig],
	publisher: &PublisherConfig,
) -> Result<(), ConfigError> {
	let mut ids = HashSet::new();
	let mut services = HashSet::new();
	for host in code_hosts {
		if !ids.insert(host.id) {
			return Err(ConfigError::Validation(format!(
				"code host id {} is configured more than once",
				host.id
			)));
		}
		// Hosts that differ only in URL case or a trailing slash are one
		// service.
		if !services.insert((host.kind, host.base_url.to_string())) {
			return Err(ConfigError::Validation(format!(
				"code host {} duplicates the service at {}",
				host.id, host.base_url
			)));
		}
	}

	if publisher.deadline_secs == 0 {
		return Err(ConfigError::InvalidValue {
			key: "publisher.deadline_secs".to_string(),
			message: "must be greater than zero".to_string(),
		});
	}
	if publisher.branch_prefix.trim_matches('/').is_empty() {
		return Err(ConfigError::InvalidValue {
			key: "publisher.branch_prefix".to_string(),
			message: "must not be empty".to_string(),
		});
	}

	Ok(())
}
