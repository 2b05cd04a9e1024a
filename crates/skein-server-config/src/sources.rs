// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::secret::load_secret_env;
use crate::sections::{
	CodeHostConfigLayer, CodeHostKind, DatabaseConfigLayer, GitConfigLayer, LogFormat,
	LoggingConfigLayer, PublisherConfigLayer,
};

/// Service id given to the code host defined through `SKEIN_SERVER_GITHUB_*`
/// when `SKEIN_SERVER_GITHUB_ID` is unset.
pub const DEFAULT_ENV_CODE_HOST_ID: i64 = 1;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/skein/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: SKEIN_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		let github = load_github_from_env()?;
		Ok(ServerConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: env_var("SKEIN_SERVER_DATABASE_URL"),
			}),
			logging: Some(load_logging_from_env()?),
			code_hosts: (!github.is_empty()).then(|| vec![github]),
			publisher: Some(load_publisher_from_env()?),
			git: Some(GitConfigLayer {
				repos_root: env_var("SKEIN_SERVER_GIT_REPOS_ROOT").map(PathBuf::from),
				remote: env_var("SKEIN_SERVER_GIT_REMOTE"),
			}),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T>(name: &str, what: &str) -> Result<Option<T>, ConfigError>
where
	T: std::str::FromStr,
{
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {what} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_list(name: &str) -> Option<Vec<String>> {
	env_var(name).map(|s| {
		s.split(',')
			.map(|s| s.trim().to_string())
			.filter(|s| !s.is_empty())
			.collect()
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("SKEIN_SERVER_LOG_FORMAT") {
		Some(raw) => Some(raw.parse::<LogFormat>().map_err(|message| {
			ConfigError::InvalidValue {
				key: "SKEIN_SERVER_LOG_FORMAT".to_string(),
				message,
			}
		})?),
		None => None,
	};
	Ok(LoggingConfigLayer {
		level: env_var("SKEIN_SERVER_LOG_LEVEL"),
		format,
	})
}

fn load_github_from_env() -> Result<CodeHostConfigLayer, ConfigError> {
	let mut layer = CodeHostConfigLayer {
		id: None,
		kind: None,
		base_url: env_var("SKEIN_SERVER_GITHUB_BASE_URL"),
		api_url: env_var("SKEIN_SERVER_GITHUB_API_URL"),
		token: load_secret_env("SKEIN_SERVER_GITHUB_TOKEN")?,
		webhook_secret: load_secret_env("SKEIN_SERVER_GITHUB_WEBHOOK_SECRET")?,
	};
	let id = env_parse::<i64>("SKEIN_SERVER_GITHUB_ID", "integer")?;
	if id.is_some() || !layer.is_empty() {
		layer.id = Some(id.unwrap_or(DEFAULT_ENV_CODE_HOST_ID));
		layer.kind = Some(CodeHostKind::Github);
	}
	Ok(layer)
}

fn load_publisher_from_env() -> Result<PublisherConfigLayer, ConfigError> {
	Ok(PublisherConfigLayer {
		author_name: env_var("SKEIN_SERVER_PUBLISHER_AUTHOR_NAME"),
		author_email: env_var("SKEIN_SERVER_PUBLISHER_AUTHOR_EMAIL"),
		branch_prefix: env_var("SKEIN_SERVER_PUBLISHER_BRANCH_PREFIX"),
		commit_message_prefix: env_var("SKEIN_SERVER_PUBLISHER_COMMIT_MESSAGE_PREFIX"),
		allowed_namespaces: env_list("SKEIN_SERVER_PUBLISHER_ALLOWED_NAMESPACES"),
		deadline_secs: env_parse("SKEIN_SERVER_PUBLISHER_DEADLINE_SECS", "u64")?,
	})
}
