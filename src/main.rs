//! commit-review - review the latest git commit with a local LLM
//!
//! Fetches the diff between HEAD and its parent, then asks an
//! OpenAI-compatible model (Ollama by default) for a pull-request style
//! review and a linter style static analysis. Both are printed.
//!
//! Exit codes:
//!   0 - Every reviewer returned a result
//!   1 - No commit or diff to review, or a runtime error (config, backend, etc.)

mod agent;
mod analysis;
mod cli;
mod config;
mod llm;
mod models;
mod orchestrator;
mod repo;
mod runtime_log;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use orchestrator::{Orchestrator, RunOutcome};
use runtime_log::RuntimeLogger;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("commit-review v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_review(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Review failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .commit-review.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the model, endpoint, roles, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one review. Returns the process exit code.
async fn run_review(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    info!("Model {} at {}", config.llm.model, config.llm.base_url);

    let logger = Arc::new(RuntimeLogger::open(&config.logging.dbname)?);
    let backend = llm::backend_from_config(&config.llm, Path::new(llm::DEFAULT_CACHE_ROOT))?;

    let orchestrator = Orchestrator::new(config, backend, logger).with_progress(!args.quiet);
    let summary = orchestrator.run().await?;

    match summary.outcome {
        RunOutcome::Completed { revision, reviews } => {
            info!("Completed {} review(s) of {}", reviews, revision);
            Ok(0)
        }
        RunOutcome::NoCommit | RunOutcome::NoDiff => Ok(1),
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
