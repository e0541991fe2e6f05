//! The review run: latest commit, its diff, one submission per role.

use crate::agent::build_roles;
use crate::config::Config;
use crate::llm::ChatBackend;
use crate::models::RevisionId;
use crate::repo::{commit_diff, head_revision};
use crate::runtime_log::RuntimeLogger;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a run ended, short of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every configured role returned a result.
    Completed { revision: RevisionId, reviews: usize },
    /// HEAD could not be resolved.
    NoCommit,
    /// The diff against the parent could not be produced or was empty.
    NoDiff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub session_id: String,
    pub outcome: RunOutcome,
}

pub struct Orchestrator {
    config: Config,
    backend: Arc<dyn ChatBackend>,
    logger: Arc<RuntimeLogger>,
    show_progress: bool,
}

impl Orchestrator {
    pub fn new(config: Config, backend: Arc<dyn ChatBackend>, logger: Arc<RuntimeLogger>) -> Self {
        Self {
            config,
            backend,
            logger,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run one review. The logging session is closed on every exit path.
    pub async fn run(&self) -> Result<RunSummary> {
        let session = self.logger.start()?;
        let session_id = session.id().to_string();
        println!("Logging session ID: {}", session_id);
        debug!(
            "Container execution {}",
            if self.config.runtime.use_docker {
                "allowed"
            } else {
                "disabled"
            }
        );

        let roles = build_roles(
            &self.config.general.roles,
            &self.config.llm,
            Arc::clone(&self.backend),
            Arc::clone(&self.logger),
            self.show_progress,
        );

        let repo_path = self.config.general.repo_path.as_str();
        info!("Reviewing repository at '{}'", repo_path);

        let revision = match head_revision(repo_path).await {
            Ok(rev) => rev,
            Err(e) => {
                println!("Error fetching latest commit: {}", e);
                println!("Could not fetch the latest commit.");
                return Ok(RunSummary {
                    session_id,
                    outcome: RunOutcome::NoCommit,
                });
            }
        };
        println!("Latest commit hash: {}", revision);

        let diff = match commit_diff(repo_path, &revision).await {
            Ok(diff) if !diff.is_empty() => diff,
            Ok(_) => {
                warn!("Commit {} has an empty diff", revision);
                println!("Could not fetch the commit diff.");
                return Ok(RunSummary {
                    session_id,
                    outcome: RunOutcome::NoDiff,
                });
            }
            Err(e) => {
                println!("Error fetching commit diff: {}", e);
                println!("Could not fetch the commit diff.");
                return Ok(RunSummary {
                    session_id,
                    outcome: RunOutcome::NoDiff,
                });
            }
        };
        println!("Commit diff fetched successfully.");
        debug!("Diff has {} lines", diff.line_count());

        let mut results = Vec::with_capacity(roles.len());
        for role in &roles {
            info!("Submitting diff for {}", role.kind());
            let result = role.submit(&diff).await?;
            results.push((role, result));
        }

        for (role, result) in &results {
            println!("\n{}", role.kind().heading());
            println!("{}", result);
            if let Some(note) = role.postscript(result) {
                println!("{}", note);
            }
        }

        drop(session);

        Ok(RunSummary {
            session_id,
            outcome: RunOutcome::Completed {
                revision,
                reviews: results.len(),
            },
        })
    }
}
