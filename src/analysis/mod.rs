//! Analysis of model output.
//!
//! Reviewer results are printed untouched; this module only derives
//! summaries from them.

pub mod lint;
