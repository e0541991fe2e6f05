//! Reviewer agents.
//!
//! Each role renders its prompt, then runs a bounded two-party
//! conversation with the model backend.

pub mod conversation;
pub mod prompts;
pub mod reviewer;

pub use reviewer::build_roles;
