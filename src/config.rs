//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.commit-review.toml` files.

use crate::models::RoleKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".commit-review.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model backend settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Runtime log settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Agent runtime settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Repository to review. Passed to `git -C` as is.
    #[serde(default = "default_repo_path")]
    pub repo_path: String,

    /// Reviewer roles to run, in order.
    #[serde(default = "default_roles")]
    pub roles: Vec<RoleKind>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            repo_path: default_repo_path(),
            roles: default_roles(),
        }
    }
}

fn default_repo_path() -> String {
    ".".to_string()
}

fn default_roles() -> Vec<RoleKind> {
    vec![RoleKind::Review, RoleKind::StaticAnalysis]
}

/// Model backend settings shared by every reviewer agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Credential sent as a bearer token. Local backends ignore it.
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// OpenAI-compatible endpoint base, e.g. `http://localhost:11434/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Cost per 1000 tokens: `[prompt, completion]`.
    #[serde(default)]
    pub price: [f64; 2],

    /// Seed for the response cache. `None` disables caching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_seed: Option<u64>,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: default_api_key(),
            base_url: default_base_url(),
            price: [0.0, 0.0],
            cache_seed: None,
            temperature: 0.0,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_api_key() -> String {
    "ollama".to_string()
}

fn default_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_timeout() -> u64 {
    600
}

/// Runtime log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// SQLite file receiving sessions and chat completions.
    #[serde(default = "default_dbname")]
    pub dbname: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dbname: default_dbname(),
        }
    }
}

fn default_dbname() -> PathBuf {
    PathBuf::from("logs.db")
}

/// Agent runtime settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Whether code execution may run inside a container.
    ///
    /// Reviewer dispatchers never execute code, so this is recorded only.
    #[serde(default)]
    pub use_docker: bool,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line (or via env vars)
    /// override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref repo) = args.repo {
            self.general.repo_path = repo.clone();
        }
        if let Some(ref roles) = args.roles {
            self.general.roles = roles.clone();
        }

        if let Some(ref model) = args.model {
            self.llm.model = model.clone();
        }
        if let Some(ref base_url) = args.base_url {
            self.llm.base_url = base_url.clone();
        }
        if let Some(ref api_key) = args.api_key {
            self.llm.api_key = api_key.clone();
        }
        if let Some(temperature) = args.temperature {
            self.llm.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.llm.timeout_seconds = timeout;
        }
        if args.no_cache {
            self.llm.cache_seed = None;
        } else if let Some(seed) = args.cache_seed {
            self.llm.cache_seed = Some(seed);
        }

        if let Some(ref db) = args.log_db {
            self.logging.dbname = db.clone();
        }

        if args.use_docker {
            self.runtime.use_docker = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
