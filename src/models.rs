//! Data models for the commit reviewer.
//!
//! Thin newtypes around the strings that flow through a run, so the
//! revision, the diff and the rendered prompt cannot be mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A commit identifier as printed by `git rev-parse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionId(String);

impl RevisionId {
    /// Wrap a raw identifier, trimming surrounding whitespace.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `<rev>~1` spec naming this revision's first parent.
    pub fn parent_spec(&self) -> String {
        format!("{}~1", self.0)
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unified diff text, kept exactly as git produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffText(String);

impl DiffText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of lines in the diff.
    pub fn line_count(&self) -> usize {
        self.0.lines().count()
    }
}

impl From<&str> for DiffText {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A fully rendered prompt for one reviewer role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPrompt(String);

impl ReviewPrompt {
    pub fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ReviewPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The flavor of feedback a reviewer asks the model for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum RoleKind {
    /// Pull-request style review comments
    Review,
    /// Linter style findings
    StaticAnalysis,
}

impl RoleKind {
    /// Default display name of the agent playing this role.
    pub fn agent_name(&self) -> &'static str {
        match self {
            RoleKind::Review => "code_review_agent",
            RoleKind::StaticAnalysis => "static_analyzer_agent",
        }
    }

    /// Heading printed above this role's result.
    pub fn heading(&self) -> &'static str {
        match self {
            RoleKind::Review => "Code Review Feedback:",
            RoleKind::StaticAnalysis => "Static Analysis Feedback:",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleKind::Review => write!(f, "review"),
            RoleKind::StaticAnalysis => write!(f, "static-analysis"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_id_trims() {
        let rev = RevisionId::new("  abc123\n");
        assert_eq!(rev.as_str(), "abc123");
        assert_eq!(rev.parent_spec(), "abc123~1");
    }

    #[test]
    fn test_role_kind_serde_names() {
        let json = serde_json::to_string(&RoleKind::StaticAnalysis).unwrap();
        assert_eq!(json, "\"static-analysis\"");
        let parsed: RoleKind = serde_json::from_str("\"review\"").unwrap();
        assert_eq!(parsed, RoleKind::Review);
    }

    #[test]
    fn test_role_kind_agent_names() {
        assert_eq!(RoleKind::Review.agent_name(), "code_review_agent");
        assert_eq!(
            RoleKind::StaticAnalysis.agent_name(),
            "static_analyzer_agent"
        );
    }

    #[test]
    fn test_diff_text_line_count() {
        let diff = DiffText::from("a\nb\nc\n");
        assert_eq!(diff.line_count(), 3);
        assert!(DiffText::from("").is_empty());
    }
}
