// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Skein server library: builds the service graph from configuration and
//! exposes the operations the `skein-server` binary drives.

pub mod error;
pub mod services;
pub mod version;

pub use error::{Result, ServerError};
pub use services::{build_resolver, Services};
pub use skein_server_threads::{ImportOutcome, PublishOutcome, PublishRequest};
