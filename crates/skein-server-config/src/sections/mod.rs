// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for skein-server.

pub mod code_hosts;
pub mod database;
pub mod git;
pub mod logging;
pub mod publisher;

pub use code_hosts::{merge_code_hosts, CodeHostConfig, CodeHostConfigLayer, CodeHostKind};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use git::{GitConfig, GitConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use publisher::{PublisherConfig, PublisherConfigLayer};
