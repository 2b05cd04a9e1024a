// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{trace, warn};

use crate::error::GitError;

/// One `git` invocation against a repository directory.
pub(crate) struct GitCommand<'a> {
	path: &'a Path,
	args: Vec<String>,
	envs: Vec<(&'static str, OsString)>,
	stdin: Option<&'a [u8]>,
}

impl<'a> GitCommand<'a> {
	pub(crate) fn new<I, S>(path: &'a Path, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			path,
			args: args.into_iter().map(Into::into).collect(),
			envs: Vec::new(),
			stdin: None,
		}
	}

	pub(crate) fn env(mut self, key: &'static str, value: impl Into<OsString>) -> Self {
		self.envs.push((key, value.into()));
		self
	}

	pub(crate) fn stdin(mut self, input: &'a [u8]) -> Self {
		self.stdin = Some(input);
		self
	}

	/// Runs the command and returns trimmed stdout. Stderr is appended when
	/// `include_stderr` is set, since `git push` reports on stderr.
	async fn output(self, include_stderr: bool) -> Result<String, GitError> {
		let mut cmd = Command::new("git");
		cmd.arg("-C")
			.arg(self.path)
			.args(&self.args)
			.envs(self.envs.iter().map(|(k, v)| (*k, v.as_os_str())))
			.stdin(if self.stdin.is_some() {
				Stdio::piped()
			} else {
				Stdio::null()
			})
			.stdout(Stdio::piped())
			.stderr(Stdio::piped());

		trace!(
			cmd = %format!("git -C {} {}", self.path.display(), self.args.join(" ")),
			"running git command"
		);

		let mut child = cmd.spawn().map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				warn!("git not found in PATH");
				GitError::GitNotInstalled
			} else {
				GitError::Io(e)
			}
		})?;

		if let (Some(input), Some(mut pipe)) = (self.stdin, child.stdin.take()) {
			// A git that exits early closes the pipe; its status is reported below.
			if let Err(e) = pipe.write_all(input).await {
				if e.kind() != std::io::ErrorKind::BrokenPipe {
					return Err(e.into());
				}
			}
			// Dropping the pipe closes stdin so git sees EOF.
			drop(pipe);
		}

		let output = child.wait_with_output().await?;
		let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
		let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

		if output.status.success() {
			if include_stderr && !stderr.is_empty() {
				Ok(format!("{stdout}\n{stderr}").trim().to_string())
			} else {
				Ok(stdout)
			}
		} else {
			Err(GitError::CommandFailed {
				cmd: "git",
				args: self.args,
				stderr,
			})
		}
	}

	pub(crate) async fn run(self) -> Result<String, GitError> {
		self.output(false).await
	}

	pub(crate) async fn run_combined(self) -> Result<String, GitError> {
		self.output(true).await
	}
}
