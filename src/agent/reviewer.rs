//! Reviewer agents and the two reviewer roles.

use super::conversation::{AgentReply, ChatResult, Dispatcher, Responder, TerminationPredicate};
use super::prompts::{build_prompt, SYSTEM_MESSAGE};
use crate::analysis::lint;
use crate::config::LlmConfig;
use crate::llm::{ChatBackend, ChatMessage, ChatRequest};
use crate::models::{DiffText, RoleKind};
use crate::runtime_log::{CompletionRecord, RuntimeLogger};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the dispatcher that talks to every reviewer.
pub const DISPATCHER_NAME: &str = "user_proxy";

/// A model-backed agent that answers one rendered prompt.
pub struct ReviewerAgent {
    name: String,
    role: RoleKind,
    llm: LlmConfig,
    backend: Arc<dyn ChatBackend>,
    logger: Arc<RuntimeLogger>,
    dispatcher: Dispatcher,
    show_progress: bool,
}

impl ReviewerAgent {
    pub fn new(
        name: impl Into<String>,
        role: RoleKind,
        llm: LlmConfig,
        backend: Arc<dyn ChatBackend>,
        logger: Arc<RuntimeLogger>,
    ) -> Self {
        let name = name.into();
        info!("Initializing {} with model {}", name, llm.model);

        if let Err(e) = logger.log_agent(&name, role) {
            warn!("Failed to record agent {}: {:#}", name, e);
        }

        Self {
            name,
            role,
            llm,
            backend,
            logger,
            dispatcher: Dispatcher::new(DISPATCHER_NAME).with_max_consecutive_auto_reply(1),
            show_progress: false,
        }
    }

    pub fn with_termination(mut self, predicate: TerminationPredicate) -> Self {
        self.dispatcher = self.dispatcher.with_termination(predicate);
        self
    }

    /// Draw a spinner while waiting for the model.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Render the prompt for `diff`, print it, and run the conversation.
    pub async fn submit(&self, diff: &DiffText) -> Result<ChatResult> {
        let prompt = build_prompt(diff, self.role);

        println!("Sending the following prompt to the user proxy:");
        println!("{}", prompt);

        self.dispatcher.initiate_chat(self, prompt).await
    }

    fn spinner(&self) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("{} is thinking...", self.name));
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    }
}

#[async_trait]
impl Responder for ReviewerAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_reply(&self, conversation: &[ChatMessage]) -> Result<AgentReply> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(ChatMessage::system(SYSTEM_MESSAGE));
        messages.extend_from_slice(conversation);

        let request = ChatRequest {
            model: self.llm.model.clone(),
            messages,
            temperature: self.llm.temperature,
            stream: false,
        };

        let spinner = self.spinner();
        let start_time = Utc::now();
        let outcome = self.backend.complete(&request).await;
        let end_time = Utc::now();
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let completion =
            outcome.with_context(|| format!("{} failed to get a model reply", self.name))?;
        let cost = completion.usage.cost(self.llm.price);

        let record = CompletionRecord {
            source_name: &self.name,
            request: &request,
            completion: &completion,
            cost,
            start_time,
            end_time,
        };
        if let Err(e) = self.logger.log_chat_completion(&record) {
            warn!("Failed to record chat completion: {:#}", e);
        }

        Ok(AgentReply {
            content: completion.content,
            usage: completion.usage,
            cost,
        })
    }
}

/// One flavor of feedback requested for a diff.
#[async_trait]
pub trait ReviewerRole: Send + Sync {
    fn kind(&self) -> RoleKind;

    /// Ask the model for this role's feedback on `diff`.
    async fn submit(&self, diff: &DiffText) -> Result<ChatResult>;

    /// Extra line printed after the result, if the role has one.
    fn postscript(&self, _result: &ChatResult) -> Option<String> {
        None
    }
}

/// Pull-request style reviewer.
pub struct CodeReviewer {
    agent: ReviewerAgent,
}

impl CodeReviewer {
    pub fn new(agent: ReviewerAgent) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl ReviewerRole for CodeReviewer {
    fn kind(&self) -> RoleKind {
        RoleKind::Review
    }

    async fn submit(&self, diff: &DiffText) -> Result<ChatResult> {
        self.agent.submit(diff).await
    }
}

/// Linter style analyzer.
pub struct StaticAnalyzer {
    agent: ReviewerAgent,
}

impl StaticAnalyzer {
    /// The agent's termination predicate is kept; it is the sentinel check
    /// unless the agent was built with another one.
    pub fn new(agent: ReviewerAgent) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl ReviewerRole for StaticAnalyzer {
    fn kind(&self) -> RoleKind {
        RoleKind::StaticAnalysis
    }

    async fn submit(&self, diff: &DiffText) -> Result<ChatResult> {
        self.agent.submit(diff).await
    }

    /// Counts of recognizable `line, type, message` findings.
    fn postscript(&self, result: &ChatResult) -> Option<String> {
        let findings = lint::parse_findings(&result.summary);
        if findings.is_empty() {
            return None;
        }
        for finding in &findings {
            debug!(
                "line {} [{}] {}",
                finding.line, finding.issue_type, finding.message
            );
        }
        Some(lint::LintSummary::from_findings(&findings).to_string())
    }
}

/// Construct the reviewer for each role in `kinds`, in order.
pub fn build_roles(
    kinds: &[RoleKind],
    llm: &LlmConfig,
    backend: Arc<dyn ChatBackend>,
    logger: Arc<RuntimeLogger>,
    show_progress: bool,
) -> Vec<Box<dyn ReviewerRole>> {
    kinds
        .iter()
        .map(|&kind| {
            let agent = ReviewerAgent::new(
                kind.agent_name(),
                kind,
                llm.clone(),
                Arc::clone(&backend),
                Arc::clone(&logger),
            )
            .with_progress(show_progress);

            let role: Box<dyn ReviewerRole> = match kind {
                RoleKind::Review => Box::new(CodeReviewer::new(agent)),
                RoleKind::StaticAnalysis => Box::new(StaticAnalyzer::new(agent)),
            };
            role
        })
        .collect()
}
