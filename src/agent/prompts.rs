//! Prompt templates for the reviewer roles.
//!
//! Rendering is pure: the same diff and role always give the same prompt,
//! and the diff is embedded verbatim.

use crate::models::{DiffText, ReviewPrompt, RoleKind};

/// String a reply must contain to end the conversation early.
pub const TERMINATION_SENTINEL: &str = "TERMINATE";

/// System message given to every reviewer agent.
pub const SYSTEM_MESSAGE: &str = "You are a helpful AI Assistant.";

const REVIEW_INSTRUCTIONS: &str = "\
You are a senior software engineer performing a professional code review.
Your job is to provide **clear, concise, human-readable feedback** in the style of comments on a pull request.

For each issue you find:
- Describe *what* the issue is.
- Explain *why* it matters (e.g., readability, performance, correctness, security, or style).
- Suggest a fix or improvement if possible.
- Be constructive, respectful, and specific.

Use bullet points or numbered lists if there are multiple issues.

Format your response as if you're leaving comments on a GitHub pull request.

Be concise but helpful.";

const STATIC_ANALYSIS_INSTRUCTIONS: &str = "\
You are a static analysis engine. Review the code and return issues like:
- Unused imports
- Missing docstrings
- Style violations (e.g. PEP8)
- Type annotation suggestions
Format your response like a linter: Line number, issue type, message.";

/// Render the prompt for `role` around `diff`.
pub fn build_prompt(diff: &DiffText, role: RoleKind) -> ReviewPrompt {
    let instructions = match role {
        RoleKind::Review => REVIEW_INSTRUCTIONS,
        RoleKind::StaticAnalysis => STATIC_ANALYSIS_INSTRUCTIONS,
    };

    ReviewPrompt::new(format!(
        "{}\n\nReturn '{}' when the task is done. Here is the code diff:\n{}\n",
        instructions,
        TERMINATION_SENTINEL,
        diff.as_str()
    ))
}
