// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tokens and webhook secrets: redacted in output, zeroed on drop.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer};
use zeroize::Zeroize;

use crate::error::ConfigError;

pub const REDACTED: &str = "[REDACTED]";

/// A string that never shows up in `Debug` or `Display` output. Call
/// [`expose`](Self::expose) to read it.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl Drop for SecretString {
	fn drop(&mut self) {
		self.0.zeroize();
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SecretString").field(&REDACTED).finish()
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString)
	}
}

/// Loads a secret from `VAR`, or from the file named by `VAR_FILE`, which
/// wins if both are set. One trailing newline is stripped from file
/// contents.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, ConfigError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path) = std::env::var(&file_var) {
		if path.is_empty() {
			return Err(ConfigError::Secret(format!("{file_var} is set but empty")));
		}
		let path = PathBuf::from(path);
		let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileRead {
			path: path.clone(),
			source: e,
		})?;
		let secret = content.strip_suffix('\n').unwrap_or(&content);
		return Ok(Some(SecretString::new(secret)));
	}

	Ok(std::env::var(var)
		.ok()
		.filter(|v| !v.is_empty())
		.map(SecretString::new))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_secret_is_redacted() {
		let secret = SecretString::new("ghp_abc");
		assert_eq!(format!("{secret:?}"), "SecretString(\"[REDACTED]\")");
		assert_eq!(secret.to_string(), "[REDACTED]");
		assert_eq!(secret.expose(), "ghp_abc");
	}

	#[test]
	fn test_load_secret_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("token");
		std::fs::write(&path, "ghp_from_file\n").unwrap();

		std::env::set_var("SKEIN_TEST_SECRET_A_FILE", &path);
		std::env::set_var("SKEIN_TEST_SECRET_A", "ghp_from_env");
		let secret = load_secret_env("SKEIN_TEST_SECRET_A").unwrap().unwrap();
		std::env::remove_var("SKEIN_TEST_SECRET_A_FILE");
		std::env::remove_var("SKEIN_TEST_SECRET_A");

		assert_eq!(secret.expose(), "ghp_from_file");
	}

	#[test]
	fn test_load_secret_unset() {
		assert!(load_secret_env("SKEIN_TEST_SECRET_UNSET").unwrap().is_none());
	}
}
