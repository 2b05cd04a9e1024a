// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GitHub webhook verification and `issues` / `pull_request` event parsing.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use skein_common_codehost::ThreadKind;
use tracing::{debug, warn};

use crate::error::GithubError;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a GitHub webhook signature.
///
/// `signature_header` is the value of `X-Hub-Signature-256`, formatted as
/// `sha256=<hex>`.
pub fn verify_webhook_signature(
	secret: &str,
	signature_header: &str,
	body: &[u8],
) -> Result<(), GithubError> {
	let Some(expected_hex) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
		warn!("Invalid webhook signature format: missing 'sha256=' prefix");
		return Err(GithubError::InvalidWebhookSignature);
	};

	let Ok(expected) = hex::decode(expected_hex) else {
		warn!("Invalid webhook signature format: not hex");
		return Err(GithubError::InvalidWebhookSignature);
	};

	let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
		.map_err(|_| GithubError::InvalidWebhookSignature)?;
	mac.update(body);

	if mac.verify_slice(&expected).is_ok() {
		debug!("Webhook signature verified successfully");
		Ok(())
	} else {
		warn!("Webhook signature verification failed");
		Err(GithubError::InvalidWebhookSignature)
	}
}

/// Compute the `sha256=<hex>` signature GitHub would send for `body`.
pub fn compute_webhook_signature(secret: &str, body: &[u8]) -> String {
	let mut mac =
		HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
	mac.update(body);
	format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// The parts of an `issues` or `pull_request` event needed to refresh a
/// thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadEvent {
	pub action: String,
	pub kind: ThreadKind,
	pub node_id: String,
	pub number: i64,
	/// `owner/name`.
	pub repository_full_name: String,
	pub repository_node_id: String,
}

#[derive(Deserialize)]
struct RawEvent {
	action: String,
	issue: Option<RawEntity>,
	pull_request: Option<RawEntity>,
	repository: RawRepository,
}

#[derive(Deserialize)]
struct RawEntity {
	node_id: String,
	number: i64,
}

#[derive(Deserialize)]
struct RawRepository {
	node_id: String,
	full_name: String,
}

/// Parses a webhook delivery. `event` is the `X-GitHub-Event` header.
///
/// Returns `Ok(None)` for event types that do not describe a thread.
pub fn parse_thread_event(event: &str, body: &[u8]) -> Result<Option<ThreadEvent>, GithubError> {
	let kind = match event {
		"issues" => ThreadKind::Issue,
		"pull_request" => ThreadKind::PullRequest,
		other => {
			debug!(event = other, "ignoring webhook event");
			return Ok(None);
		}
	};

	let raw: RawEvent = serde_json::from_slice(body)?;
	let entity = match kind {
		ThreadKind::Issue => raw.issue,
		ThreadKind::PullRequest => raw.pull_request,
	}
	.ok_or_else(|| {
		GithubError::InvalidResponse(format!("{event} event without a {} payload", kind.as_str()))
	})?;

	Ok(Some(ThreadEvent {
		action: raw.action,
		kind,
		node_id: entity.node_id,
		number: entity.number,
		repository_full_name: raw.repository.full_name,
		repository_node_id: raw.repository.node_id,
	}))
}
