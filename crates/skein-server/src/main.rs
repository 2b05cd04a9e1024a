// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Skein server binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use skein_server::{version, PublishRequest, Services};
use skein_server_config::{LogFormat, ServerConfig};
use skein_server_db::{CommentListOptions, CommentObject};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Skein server - links code host threads to campaigns and publishes changes.
#[derive(Parser, Debug)]
#[command(
	name = "skein-server",
	about = "Skein campaign server",
	version
)]
struct Args {
	/// Config file to read instead of /etc/skein/server.toml
	#[arg(long, global = true, env = "SKEIN_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,

	/// Manage the repository directory
	#[command(subcommand)]
	Repo(RepoCommand),

	/// Manage comments on campaigns and threads
	#[command(subcommand)]
	Comment(CommentCommand),

	/// Import issues and pull requests matching a code host search
	Import {
		/// Search query, e.g. "is:open label:campaign"
		query: String,
	},

	/// Link an issue or pull request of a registered repository
	Link {
		/// Local repository name, e.g. github.com/owner/name
		repo: String,
		number: i64,
	},

	/// Re-read a linked thread from its code host
	Refresh { thread_id: i64 },

	/// Commit a patch to a campaign branch and open or update its pull request
	Publish {
		/// Local repository name, e.g. github.com/owner/name
		#[arg(long)]
		repo: String,
		#[arg(long)]
		campaign: String,
		#[arg(long)]
		campaign_id: Option<i64>,
		/// Unified diff to apply on the default branch
		#[arg(long)]
		patch: PathBuf,
		#[arg(long)]
		title: Option<String>,
		#[arg(long, default_value = "")]
		body: String,
		/// Thread of a previous publish to update instead of opening a new
		/// pull request
		#[arg(long)]
		thread: Option<i64>,
	},

	/// Apply a webhook delivery saved to a file
	Webhook {
		#[arg(long)]
		code_host: i64,
		/// Value of the X-GitHub-Event header
		#[arg(long)]
		event: String,
		/// Value of the X-Hub-Signature-256 header
		#[arg(long)]
		signature: String,
		payload: PathBuf,
	},
}

#[derive(Subcommand, Debug)]
enum RepoCommand {
	/// Register a repository served by a configured code host
	Add {
		#[arg(long)]
		code_host: i64,
		/// Repository node id on the code host
		#[arg(long)]
		external_id: String,
		/// owner/name
		name_with_owner: String,
	},
	/// List registered repositories
	List,
}

#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
struct CommentTarget {
	#[arg(long)]
	campaign: Option<i64>,
	#[arg(long)]
	thread: Option<i64>,
}

impl CommentTarget {
	fn object(&self) -> Option<CommentObject> {
		match (self.campaign, self.thread) {
			(Some(id), _) => Some(CommentObject::Campaign(id)),
			(None, Some(id)) => Some(CommentObject::Thread(id)),
			(None, None) => None,
		}
	}
}

#[derive(Subcommand, Debug)]
enum CommentCommand {
	/// Attach a comment to a campaign or a thread
	Add {
		#[command(flatten)]
		target: CommentTarget,
		#[arg(long)]
		author: i64,
		body: String,
	},
	/// List comments, optionally filtered by target and body text
	List {
		#[arg(long)]
		campaign: Option<i64>,
		#[arg(long, conflicts_with = "campaign")]
		thread: Option<i64>,
		#[arg(long)]
		query: Option<String>,
		#[arg(long)]
		limit: Option<u32>,
	},
	/// Delete a comment by id
	Delete { id: i64 },
}

fn init_tracing(config: &ServerConfig) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);
	match config.logging.format {
		LogFormat::Json => registry.with(fmt::layer().json()).init(),
		LogFormat::Pretty => registry.with(fmt::layer()).init(),
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Command::Version = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => skein_server_config::load_config_with_file(path)?,
		None => skein_server_config::load_config()?,
	};
	init_tracing(&config);

	tracing::info!(
		database = %config.database.url,
		code_hosts = config.code_hosts.len(),
		"starting skein-server"
	);

	let services = Services::from_config(&config).await?;

	match args.command {
		Command::Version => {}
		Command::Repo(RepoCommand::Add {
			code_host,
			external_id,
			name_with_owner,
		}) => {
			let repo = services
				.add_repo(code_host, &name_with_owner, &external_id)
				.await?;
			println!("{}\t{}", repo.id, repo.name);
		}
		Command::Repo(RepoCommand::List) => {
			for repo in services.list_repos().await? {
				let state = if repo.enabled { "enabled" } else { "disabled" };
				println!("{}\t{}\t{}", repo.id, repo.name, state);
			}
		}
		Command::Comment(CommentCommand::Add {
			target,
			author,
			body,
		}) => {
			let object = target
				.object()
				.ok_or("either --campaign or --thread is required")?;
			let comment = services.add_comment(object, author, &body).await?;
			println!("{}", comment.id);
		}
		Command::Comment(CommentCommand::List {
			campaign,
			thread,
			query,
			limit,
		}) => {
			let object = CommentTarget { campaign, thread }.object();
			let comments = services
				.list_comments(&CommentListOptions {
					query,
					object,
					limit,
				})
				.await?;
			for comment in comments {
				println!(
					"{}\t{}\t{}\t{}",
					comment.id,
					comment.author.user_id,
					comment.created_at.to_rfc3339(),
					comment.body
				);
			}
		}
		Command::Comment(CommentCommand::Delete { id }) => {
			services.delete_comment(id).await?;
		}
		Command::Import { query } => {
			let outcome = services.reconciler.import_by_query(&query).await?;
			for skipped in &outcome.skipped {
				println!(
					"skipped\t{}#{}\t{}",
					skipped.repository_name, skipped.number, skipped.title
				);
			}
			println!(
				"imported {} thread(s), skipped {}{}",
				outcome.thread_ids.len(),
				outcome.skipped.len(),
				if outcome.truncated {
					" (results truncated)"
				} else {
					""
				}
			);
			if let Some(err) = outcome.first_error {
				return Err(err.into());
			}
		}
		Command::Link { repo, number } => {
			let thread_id = services.link_thread(&repo, number).await?;
			println!("{thread_id}");
		}
		Command::Refresh { thread_id } => {
			services.refresh_thread(thread_id).await?;
		}
		Command::Publish {
			repo,
			campaign,
			campaign_id,
			patch,
			title,
			body,
			thread,
		} => {
			let repository = services
				.repos
				.get_repo_by_name(&repo)
				.await?
				.ok_or_else(|| skein_server::ServerError::RepositoryNotFound(repo.clone()))?;
			let outcome = services
				.publish(&PublishRequest {
					repository_id: repository.id,
					campaign_name: campaign,
					campaign_id,
					patch: std::fs::read_to_string(&patch)?,
					title,
					body,
					existing_thread_id: thread,
				})
				.await?;
			println!(
				"{}\t{}\t{}\t{}",
				outcome.thread_id, outcome.branch, outcome.commit_oid, outcome.pull_request.url
			);
		}
		Command::Webhook {
			code_host,
			event,
			signature,
			payload,
		} => {
			let body = std::fs::read(&payload)?;
			match services
				.handle_webhook(code_host, &event, &signature, &body)
				.await?
			{
				Some(thread_id) => println!("{thread_id}"),
				None => tracing::info!(event = %event, "delivery did not touch any thread"),
			}
		}
	}

	Ok(())
}
