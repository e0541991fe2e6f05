//! Bounded conversation between a dispatcher and a reviewer agent.
//!
//! The dispatcher plays the user side: it never executes code and never
//! asks a human. It sends the prompt, relays the agent's reply through the
//! termination predicate, and answers with its default auto reply at most
//! `max_consecutive_auto_reply` times.
//!
//! ```text
//! IDLE -> PROMPT_SENT -> AWAITING_REPLY <-> REPLY_RECEIVED -> TERMINATED
//! ```

use super::prompts::TERMINATION_SENTINEL;
use crate::llm::{ChatMessage, Usage};
use crate::models::ReviewPrompt;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Decides whether a received message ends the conversation.
pub type TerminationPredicate = Arc<dyn Fn(&ChatMessage) -> bool + Send + Sync>;

/// Default predicate: the reply mentions the termination sentinel.
pub fn contains_sentinel(message: &ChatMessage) -> bool {
    message.content.contains(TERMINATION_SENTINEL)
}

/// The model-backed side of a conversation.
#[async_trait]
pub trait Responder: Send + Sync {
    fn name(&self) -> &str;

    /// Produce the next reply given everything said so far.
    async fn generate_reply(&self, conversation: &[ChatMessage]) -> Result<AgentReply>;
}

/// One reply from a [`Responder`].
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub content: String,
    pub usage: Usage,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    PromptSent,
    AwaitingReply,
    ReplyReceived,
    Terminated,
}

/// Why a conversation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A reply satisfied the termination predicate.
    Terminated,
    /// The dispatcher used up its auto replies.
    AutoReplyLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Terminated => write!(f, "termination message"),
            StopReason::AutoReplyLimit => write!(f, "auto-reply limit"),
        }
    }
}

/// Accumulated cost of a conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostSummary {
    pub total_cost: f64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl CostSummary {
    fn add(&mut self, reply: &AgentReply) {
        self.total_cost += reply.cost;
        self.prompt_tokens += reply.usage.prompt_tokens;
        self.completion_tokens += reply.usage.completion_tokens;
    }
}

/// Outcome of a conversation. Printed as is.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResult {
    pub chat_history: Vec<ChatMessage>,
    /// Content of the last message.
    pub summary: String,
    pub cost: CostSummary,
    pub stop_reason: StopReason,
}

impl fmt::Display for ChatResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in &self.chat_history {
            let speaker = message.name.as_deref().unwrap_or(&message.role);
            writeln!(f, "[{}]", speaker)?;
            writeln!(f, "{}", message.content)?;
            writeln!(f)?;
        }
        writeln!(f, "Summary: {}", self.summary)?;
        write!(
            f,
            "Ended by {} | cost ${:.4} ({} prompt + {} completion tokens)",
            self.stop_reason,
            self.cost.total_cost,
            self.cost.prompt_tokens,
            self.cost.completion_tokens
        )
    }
}

/// The user-side agent that starts and bounds a conversation.
#[derive(Clone)]
pub struct Dispatcher {
    name: String,
    max_consecutive_auto_reply: usize,
    default_auto_reply: String,
    is_termination: TerminationPredicate,
}

impl Dispatcher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_consecutive_auto_reply: 1,
            default_auto_reply: String::new(),
            is_termination: Arc::new(contains_sentinel),
        }
    }

    pub fn with_max_consecutive_auto_reply(mut self, max: usize) -> Self {
        self.max_consecutive_auto_reply = max;
        self
    }

    pub fn with_termination(mut self, predicate: TerminationPredicate) -> Self {
        self.is_termination = predicate;
        self
    }

    /// Send `prompt` to `agent` and relay replies until the conversation ends.
    ///
    /// Errors from the agent propagate unchanged.
    pub async fn initiate_chat(
        &self,
        agent: &dyn Responder,
        prompt: ReviewPrompt,
    ) -> Result<ChatResult> {
        let mut state = ConversationState::Idle;
        let mut history = vec![ChatMessage::user(prompt.into_string()).named(&self.name)];
        let mut cost = CostSummary::default();
        let mut auto_replies = 0;

        transition(&mut state, ConversationState::PromptSent);

        let stop_reason = loop {
            transition(&mut state, ConversationState::AwaitingReply);
            let reply = agent.generate_reply(&history).await?;
            cost.add(&reply);

            let message = ChatMessage::assistant(reply.content).named(agent.name());
            let done = (self.is_termination)(&message);
            history.push(message);
            transition(&mut state, ConversationState::ReplyReceived);

            if done {
                break StopReason::Terminated;
            }
            if auto_replies >= self.max_consecutive_auto_reply {
                break StopReason::AutoReplyLimit;
            }

            auto_replies += 1;
            history.push(ChatMessage::user(self.default_auto_reply.clone()).named(&self.name));
        };

        transition(&mut state, ConversationState::Terminated);
        debug!(
            "Conversation {} -> {} ended by {}",
            self.name,
            agent.name(),
            stop_reason
        );

        let summary = history
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        Ok(ChatResult {
            chat_history: history,
            summary,
            cost,
            stop_reason,
        })
    }
}

fn transition(state: &mut ConversationState, next: ConversationState) {
    use ConversationState::*;
    debug_assert!(
        matches!(
            (*state, next),
            (Idle, PromptSent)
                | (PromptSent, AwaitingReply)
                | (AwaitingReply, ReplyReceived)
                | (ReplyReceived, AwaitingReply)
                | (ReplyReceived, Terminated)
        ),
        "illegal conversation transition {:?} -> {:?}",
        state,
        next
    );
    *state = next;
}
