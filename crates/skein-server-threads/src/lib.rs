// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Reconciles local threads with issues and pull requests on a code host.
//!
//! - [`ClientResolver`] finds the client and external service for a
//!   repository.
//! - [`ThreadReconciler`] maps each external entity onto exactly one thread
//!   row, whether it arrives by direct lookup, search import or webhook.
//! - [`ChangePublisher`] turns a patch into a commit, a pushed branch and a
//!   pull request, then links the pull request to a thread.

pub mod error;
pub mod publisher;
pub mod reconciler;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use error::{NotFoundKind, Result, ThreadError};
pub use publisher::{
	derive_branch_name, ChangePublisher, NamespacePolicy, PrefixAllowList, PublishOutcome,
	PublishRequest, PublisherConfig,
};
pub use reconciler::{ImportOutcome, SkippedThread, ThreadReconciler};
pub use resolver::{ClientResolver, ConfiguredClientResolver, ResolvedClient};
