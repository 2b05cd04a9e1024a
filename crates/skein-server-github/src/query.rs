// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Precompiled GraphQL documents.
//!
//! Issues and pull requests share one field list; the pull request fragment
//! extends it with the ref names. Documents that may return either kind
//! embed both fragments; pull-request-only documents embed just the one they
//! spread, since GraphQL rejects unused fragments.

use serde_json::json;

use crate::transport::GraphqlRequest;

/// Maximum number of results requested from a single search call.
pub const SEARCH_PAGE_SIZE: u32 = 100;

/// Open pull requests considered when looking for one to reuse. Forks may
/// hold branches of the same name.
pub const OPEN_PULL_REQUEST_CANDIDATES: u32 = 20;

macro_rules! thread_fields {
	() => {
		"id number title body state url createdAt updatedAt \
		 author { login } repository { id nameWithOwner }"
	};
}

macro_rules! pull_request_fragment {
	() => {
		concat!(
			"fragment PullRequestFields on PullRequest { __typename ",
			thread_fields!(),
			" baseRefName headRefName headRepository { id } }\n",
		)
	};
}

macro_rules! thread_fragments {
	() => {
		concat!(
			"fragment IssueFields on Issue { __typename ",
			thread_fields!(),
			" }\n",
			pull_request_fragment!(),
		)
	};
}

const THREAD_BY_NODE: &str = concat!(
	"query ThreadByNode($id: ID!) {\n",
	"  node(id: $id) { __typename ...IssueFields ...PullRequestFields }\n",
	"}\n",
	thread_fragments!(),
);

const THREAD_BY_NUMBER: &str = concat!(
	"query ThreadByNumber($repository: ID!, $number: Int!) {\n",
	"  repository: node(id: $repository) {\n",
	"    __typename\n",
	"    ... on Repository {\n",
	"      issueOrPullRequest(number: $number) { __typename ...IssueFields ...PullRequestFields }\n",
	"    }\n",
	"  }\n",
	"}\n",
	thread_fragments!(),
);

const SEARCH_THREADS: &str = concat!(
	"query SearchThreads($query: String!, $first: Int!) {\n",
	"  search(type: ISSUE, first: $first, query: $query) {\n",
	"    pageInfo { hasNextPage }\n",
	"    nodes { __typename ...IssueFields ...PullRequestFields }\n",
	"  }\n",
	"}\n",
	thread_fragments!(),
);

const OPEN_PULL_REQUESTS_BY_HEAD: &str = concat!(
	"query OpenPullRequestsByHead($repository: ID!, $head: String!, $first: Int!) {\n",
	"  repository: node(id: $repository) {\n",
	"    __typename\n",
	"    ... on Repository {\n",
	"      pullRequests(headRefName: $head, states: OPEN, first: $first) { nodes { ...PullRequestFields } }\n",
	"    }\n",
	"  }\n",
	"}\n",
	pull_request_fragment!(),
);

const CREATE_PULL_REQUEST: &str = concat!(
	"mutation CreatePullRequest($input: CreatePullRequestInput!) {\n",
	"  createPullRequest(input: $input) { pullRequest { ...PullRequestFields } }\n",
	"}\n",
	pull_request_fragment!(),
);

const UPDATE_PULL_REQUEST: &str = concat!(
	"mutation UpdatePullRequest($input: UpdatePullRequestInput!) {\n",
	"  updatePullRequest(input: $input) { pullRequest { ...PullRequestFields } }\n",
	"}\n",
	pull_request_fragment!(),
);

/// Every document this crate sends to GitHub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadQuery<'a> {
	ByNode {
		id: &'a str,
	},
	ByRepositoryAndNumber {
		repository_id: &'a str,
		number: i64,
	},
	Search {
		query: &'a str,
	},
	OpenPullRequestsByHead {
		repository_id: &'a str,
		head_ref: &'a str,
	},
	CreatePullRequest {
		repository_id: &'a str,
		base_ref: &'a str,
		head_ref: &'a str,
		title: &'a str,
		body: &'a str,
	},
	UpdatePullRequest {
		pull_request_id: &'a str,
		title: &'a str,
		body: &'a str,
	},
}

impl ThreadQuery<'_> {
	pub fn document(&self) -> &'static str {
		match self {
			ThreadQuery::ByNode { .. } => THREAD_BY_NODE,
			ThreadQuery::ByRepositoryAndNumber { .. } => THREAD_BY_NUMBER,
			ThreadQuery::Search { .. } => SEARCH_THREADS,
			ThreadQuery::OpenPullRequestsByHead { .. } => OPEN_PULL_REQUESTS_BY_HEAD,
			ThreadQuery::CreatePullRequest { .. } => CREATE_PULL_REQUEST,
			ThreadQuery::UpdatePullRequest { .. } => UPDATE_PULL_REQUEST,
		}
	}

	pub fn request(&self) -> GraphqlRequest {
		let variables = match *self {
			ThreadQuery::ByNode { id } => json!({ "id": id }),
			ThreadQuery::ByRepositoryAndNumber {
				repository_id,
				number,
			} => json!({ "repository": repository_id, "number": number }),
			ThreadQuery::Search { query } => json!({ "query": query, "first": SEARCH_PAGE_SIZE }),
			ThreadQuery::OpenPullRequestsByHead {
				repository_id,
				head_ref,
			} => json!({
				"repository": repository_id,
				"head": head_ref,
				"first": OPEN_PULL_REQUEST_CANDIDATES,
			}),
			ThreadQuery::CreatePullRequest {
				repository_id,
				base_ref,
				head_ref,
				title,
				body,
			} => json!({
				"input": {
					"repositoryId": repository_id,
					"baseRefName": base_ref,
					"headRefName": head_ref,
					"title": title,
					"body": body,
				}
			}),
			ThreadQuery::UpdatePullRequest {
				pull_request_id,
				title,
				body,
			} => json!({
				"input": {
					"pullRequestId": pull_request_id,
					"title": title,
					"body": body,
				}
			}),
		};
		GraphqlRequest::new(self.document(), variables)
	}
}
