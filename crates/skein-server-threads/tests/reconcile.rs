// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

mod common;

use common::*;
use skein_common_codehost::ExternalRepoSpec;
use skein_server_github::ThreadEvent;
use skein_server_threads::{NotFoundKind, ThreadError};

#[tokio::test]
async fn create_or_get_existing_twice_returns_same_thread_without_second_insert() {
	let h = Harness::new().await;
	let repo = h.add_repo("sd9/repo", GITHUB).await;
	h.github.add_issue("I_1", 7, "sd9/repo", "Crash on start");
	let spec = ExternalRepoSpec::on(&github_host(), &repo.external_id);

	let first = h
		.reconciler
		.create_or_get_existing(repo.id, &spec, 7)
		.await
		.unwrap();
	assert_eq!(h.inserts(), 1);

	let second = h
		.reconciler
		.create_or_get_existing(repo.id, &spec, 7)
		.await
		.unwrap();
	assert_eq!(first, second);
	assert_eq!(h.inserts(), 1);
	assert_eq!(h.thread_count().await, 1);

	let thread = h.thread(first).await;
	assert_eq!(thread.external_id, "I_1");
	assert_eq!(thread.external_service_id, GITHUB);
	assert_eq!(thread.title, "Crash on start");
}

#[tokio::test]
async fn concurrent_create_or_get_existing_yields_one_thread() {
	let h = Harness::new().await;
	let repo = h.add_repo("sd9/repo", GITHUB).await;
	h.github.add_issue("I_1", 7, "sd9/repo", "Crash on start");
	let spec = ExternalRepoSpec::on(&github_host(), &repo.external_id);

	let (a, b) = tokio::join!(
		h.reconciler.create_or_get_existing(repo.id, &spec, 7),
		h.reconciler.create_or_get_existing(repo.id, &spec, 7),
	);
	assert_eq!(a.unwrap(), b.unwrap());
	assert_eq!(h.thread_count().await, 1);
}

#[tokio::test]
async fn create_or_get_existing_distinguishes_remote_not_found() {
	let h = Harness::new().await;
	let repo = h.add_repo("sd9/repo", GITHUB).await;
	h.github.add_issue("I_1", 1, "sd9/repo", "exists");

	let missing_number = h
		.reconciler
		.create_or_get_existing(repo.id, &ExternalRepoSpec::on(&github_host(), &repo.external_id), 2)
		.await
		.unwrap_err();
	assert!(matches!(
		missing_number,
		ThreadError::NotFound(NotFoundKind::RemoteEntity { number: 2, .. })
	));

	let missing_repo = h
		.reconciler
		.create_or_get_existing(repo.id, &ExternalRepoSpec::on(&github_host(), "R_gone"), 1)
		.await
		.unwrap_err();
	assert!(matches!(
		missing_repo,
		ThreadError::NotFound(NotFoundKind::RemoteRepository { .. })
	));
	assert_eq!(h.inserts(), 0);
}

#[tokio::test]
async fn update_metadata_refreshes_pinned_thread() {
	let h = Harness::new().await;
	let repo = h.add_repo("sd9/repo", GITHUB).await;
	h.github.add_issue("I_1", 7, "sd9/repo", "before");
	let id = h
		.reconciler
		.create_or_get_existing(repo.id, &ExternalRepoSpec::on(&github_host(), &repo.external_id), 7)
		.await
		.unwrap();

	h.github.set_title("I_1", "after");
	h.reconciler
		.update_metadata(id, GITHUB, "I_1", repo.id)
		.await
		.unwrap();

	assert_eq!(h.thread(id).await.title, "after");
	assert_eq!(h.inserts(), 1);
}

#[tokio::test]
async fn update_metadata_with_mismatched_service_leaves_thread_unchanged() {
	let h = Harness::new().await;
	let repo = h.add_repo("sd9/repo", GITHUB).await;
	h.github.add_issue("I_1", 7, "sd9/repo", "before");
	let id = h
		.reconciler
		.create_or_get_existing(repo.id, &ExternalRepoSpec::on(&github_host(), &repo.external_id), 7)
		.await
		.unwrap();
	let before = h.thread(id).await;

	h.github.set_title("I_1", "after");
	let err = h
		.reconciler
		.update_metadata(id, ENTERPRISE, "I_1", repo.id)
		.await
		.unwrap_err();

	assert!(matches!(
		err,
		ThreadError::ServiceMismatch {
			thread_service_id: ENTERPRISE,
			repository_service_id: GITHUB,
			..
		}
	));
	assert_eq!(h.thread(id).await, before);
}

#[tokio::test]
async fn import_by_query_skips_unknown_repository() {
	let h = Harness::new().await;
	let known = h.add_repo("sd9/repo", GITHUB).await;
	h.add_repo("sd9/other", GITHUB).await;
	h.github.add_issue("I_1", 1, "sd9/repo", "one");
	h.github.add_issue("I_2", 2, "sd9/other", "two");
	h.github.add_issue("I_3", 3, "stranger/repo", "three");

	let outcome = h.reconciler.import_by_query("is:open").await.unwrap();

	assert_eq!(outcome.thread_ids.len(), 2);
	assert_eq!(outcome.skipped.len(), 1);
	assert_eq!(outcome.skipped[0].repository_name, "github.com/stranger/repo");
	assert_eq!(outcome.skipped[0].number, 3);
	assert!(outcome.first_error.is_none());
	assert!(!outcome.truncated);
	assert_eq!(h.thread(outcome.thread_ids[0]).await.repository_id, known.id);

	// Importing again maps onto the same threads.
	let again = h.reconciler.import_by_query("is:open").await.unwrap();
	assert_eq!(again.thread_ids, outcome.thread_ids);
	assert_eq!(h.inserts(), 2);
}

#[tokio::test]
async fn webhook_event_refreshes_linked_thread() {
	let h = Harness::new().await;
	let repo = h.add_repo("sd9/repo", GITHUB).await;
	h.github.add_issue("I_1", 7, "sd9/repo", "before");
	let event = ThreadEvent {
		action: "edited".to_string(),
		kind: skein_common_codehost::ThreadKind::Issue,
		node_id: "I_1".to_string(),
		number: 7,
		repository_full_name: "sd9/repo".to_string(),
		repository_node_id: repo.external_id.clone(),
	};

	let id = h
		.reconciler
		.refresh_from_webhook(&github_host(), &event)
		.await
		.unwrap()
		.unwrap();
	h.github.set_title("I_1", "after");
	let again = h
		.reconciler
		.refresh_from_webhook(&github_host(), &event)
		.await
		.unwrap();

	assert_eq!(again, Some(id));
	assert_eq!(h.thread(id).await.title, "after");
	assert_eq!(h.inserts(), 1);
}
