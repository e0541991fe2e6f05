//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Most options are optional so that values from
//! `.commit-review.toml` survive unless overridden.

use crate::models::RoleKind;
use clap::Parser;
use std::path::PathBuf;

/// commit-review - review the latest git commit with a local LLM
///
/// Fetches the diff of HEAD against its parent and asks the model for a
/// pull-request style review and a linter style static analysis.
///
/// Examples:
///   commit-review
///   commit-review --repo ../my-project --model qwen2.5-coder
///   commit-review --roles static-analysis --cache-seed 42
///   commit-review --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Repository to review (defaults to the current directory)
    #[arg(short, long, value_name = "PATH")]
    pub repo: Option<String>,

    /// Model identifier
    #[arg(short, long, env = "COMMIT_REVIEW_MODEL")]
    pub model: Option<String>,

    /// OpenAI-compatible endpoint base URL
    #[arg(long, value_name = "URL", env = "COMMIT_REVIEW_BASE_URL")]
    pub base_url: Option<String>,

    /// API key sent to the endpoint
    #[arg(long, env = "COMMIT_REVIEW_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Reviewer roles to run (comma-separated)
    ///
    /// Example: --roles review,static-analysis
    #[arg(long, value_name = "ROLES", value_delimiter = ',')]
    pub roles: Option<Vec<RoleKind>>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .commit-review.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SQLite file for the runtime log
    #[arg(long, value_name = "FILE")]
    pub log_db: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Temperature for LLM responses (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable the response cache under this seed
    #[arg(long, value_name = "SEED", conflicts_with = "no_cache")]
    pub cache_seed: Option<u64>,

    /// Disable the response cache even if the config file sets a seed
    #[arg(long)]
    pub no_cache: bool,

    /// Allow containerized code execution in the agent runtime
    #[arg(long, env = "COMMIT_REVIEW_USE_DOCKER")]
    pub use_docker: bool,

    /// Generate a default .commit-review.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref roles) = self.roles {
            if roles.is_empty() {
                return Err("At least one role is required".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            repo: None,
            model: None,
            base_url: None,
            api_key: None,
            roles: None,
            config: None,
            log_db: None,
            verbose: false,
            quiet: false,
            temperature: None,
            timeout: None,
            cache_seed: None,
            no_cache: false,
            use_docker: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_roles() {
        let args = Args::try_parse_from(["commit-review", "--roles", "static-analysis,review"])
            .unwrap();
        assert_eq!(
            args.roles,
            Some(vec![RoleKind::StaticAnalysis, RoleKind::Review])
        );
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.base_url = Some("localhost:11434".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());
        args.timeout = Some(30);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_merge_only_explicit_values() {
        let mut config = crate::config::Config::default();
        config.llm.cache_seed = Some(7);
        config.llm.model = "from-file".to_string();

        let mut args = make_args();
        args.repo = Some("../other".to_string());
        config.merge_with_args(&args);
        assert_eq!(config.llm.model, "from-file");
        assert_eq!(config.llm.cache_seed, Some(7));
        assert_eq!(config.general.repo_path, "../other");

        args.no_cache = true;
        config.merge_with_args(&args);
        assert!(config.llm.cache_seed.is_none());
    }
}
