//! Best-effort reading of linter style model output.
//!
//! The static-analysis role asks for `line, issue type, message` lines.
//! Models follow that loosely, so anything that does not look like a
//! finding is skipped. The raw text is always what gets printed; this
//! only feeds a short summary.

use std::collections::BTreeMap;
use std::fmt;

/// One `line, issue type, message` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    pub line: usize,
    pub issue_type: String,
    pub message: String,
}

/// Parse every recognizable finding in `text`.
pub fn parse_findings(text: &str) -> Vec<LintFinding> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<LintFinding> {
    let line = strip_list_marker(line.trim());

    let mut parts = line.splitn(3, ',');
    let location = parts.next()?.trim();
    let issue_type = parts.next()?.trim();
    let message = parts.next()?.trim();

    let issue_type = issue_type.trim_matches('*').trim();
    // "2, 3, and 4 lack docstrings" is prose, not a finding
    if !issue_type.chars().any(|c| c.is_alphabetic()) || message.is_empty() {
        return None;
    }

    Some(LintFinding {
        line: parse_line_number(location)?,
        issue_type: issue_type.to_string(),
        message: message.to_string(),
    })
}

/// Accepts `12`, `Line 12`, `line 12:` and `L12`.
fn parse_line_number(location: &str) -> Option<usize> {
    let lower = location.to_lowercase();
    let digits = lower
        .trim_matches('*')
        .trim()
        .trim_start_matches("line")
        .trim_start_matches('l')
        .trim()
        .trim_end_matches(':');
    digits.parse().ok()
}

fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return rest.trim_start();
    }

    // "3. Line 12, ..." numbered lists
    if let Some((number, rest)) = line.split_once(". ") {
        if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
            return rest.trim_start();
        }
    }

    line
}

/// Finding counts by issue type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintSummary {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
}

impl LintSummary {
    pub fn from_findings(findings: &[LintFinding]) -> Self {
        let mut summary = Self {
            total: findings.len(),
            ..Self::default()
        };

        for finding in findings {
            *summary
                .by_type
                .entry(finding.issue_type.clone())
                .or_insert(0) += 1;
        }

        summary
    }
}

impl fmt::Display for LintSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.total == 1 { "finding" } else { "findings" };
        write!(f, "Static analysis: {} {}", self.total, noun)?;

        if !self.by_type.is_empty() {
            let parts: Vec<String> = self
                .by_type
                .iter()
                .map(|(kind, count)| format!("{}: {}", kind, count))
                .collect();
            write!(f, " ({})", parts.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_linter_lines() {
        let output = "\
Here is what I found:
Line 1, Missing docstring, Function `add` has no docstring.
- Line 4, Missing docstring, Function `subtract` has no docstring.
2. 1, Type annotation, Parameters `a` and `b` lack type hints, e.g. int.
TERMINATE";

        let findings = parse_findings(output);
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].line, 1);
        assert_eq!(findings[0].issue_type, "Missing docstring");
        assert_eq!(findings[1].line, 4);
        assert_eq!(findings[2].issue_type, "Type annotation");
        assert_eq!(
            findings[2].message,
            "Parameters `a` and `b` lack type hints, e.g. int."
        );
    }

    #[test]
    fn test_numeric_enumerations_are_ignored() {
        let output = "2, 3, and 4 lack docstrings\n10, 20, 30\nLine 5, E501, line too long";

        let findings = parse_findings(output);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 5);
        assert_eq!(findings[0].issue_type, "E501");
    }

    #[test]
    fn test_free_text_is_ignored() {
        let output = "The code looks fine overall, nothing major, just style.\nTERMINATE";
        assert!(parse_findings(output).is_empty());
    }

    #[test]
    fn test_line_number_variants() {
        assert_eq!(parse_line_number("12"), Some(12));
        assert_eq!(parse_line_number("Line 12"), Some(12));
        assert_eq!(parse_line_number("line 7:"), Some(7));
        assert_eq!(parse_line_number("L3"), Some(3));
        assert_eq!(parse_line_number("**Line 9**"), Some(9));
        assert_eq!(parse_line_number("somewhere"), None);
    }

    #[test]
    fn test_summary_display() {
        let findings = parse_findings(
            "1, Unused import, os is never used\n3, Unused import, sys is never used\n5, Style, line too long",
        );
        let summary = LintSummary::from_findings(&findings);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_type.get("Unused import"), Some(&2));
        assert_eq!(
            summary.to_string(),
            "Static analysis: 3 findings (Style: 1, Unused import: 2)"
        );
    }
}
