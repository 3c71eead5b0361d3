//! askstore CLI
//!
//! Main entry point for the askstore command-line tool.
//! Asks questions against a Gemini File Search store, manages its documents
//! and serves the JSON HTTP API.

mod commands;

use askstore_core::logging::{self, LogFormat};
use askstore_core::{config::AppConfig, AppError, AppResult};
use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, DocumentsCommand, QueryCommand, ServeCommand};
use std::path::PathBuf;

/// askstore - grounded answers from a Gemini File Search store
#[derive(Parser, Debug)]
#[command(name = "askstore")]
#[command(about = "Grounded answers from a Gemini File Search store", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "ASKSTORE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "ASKSTORE_CONFIG")]
    config: Option<PathBuf>,

    /// File search store resource name (fileSearchStores/...)
    #[arg(short, long, global = true)]
    store: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true, default_value = "pretty")]
    log_format: String,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Retrieve fragments and answer a question
    Ask(AskCommand),

    /// Retrieve ranked fragments without generating an answer
    Query(QueryCommand),

    /// Interactive multi-turn conversation
    Chat(ChatCommand),

    /// Manage documents in the store
    Documents(DocumentsCommand),

    /// Serve the JSON HTTP API
    Serve(ServeCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Query(_) => "query",
            Commands::Chat(_) => "chat",
            Commands::Documents(_) => "documents",
            Commands::Serve(_) => "serve",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let log_format = LogFormat::parse(&cli.log_format).ok_or_else(|| {
        AppError::Config(format!("Unknown log format: {}", cli.log_format))
    })?;

    // Load configuration (file, .env, environment), then apply CLI overrides
    let config = AppConfig::load_with(cli.workspace, cli.config)?.with_overrides(
        cli.store,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), log_format, config.no_color)?;

    tracing::info!("askstore CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Store: {:?}", config.store_name);
    tracing::debug!("Model: {}", config.model);

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Documents(cmd) => cmd.execute(&config).await,
        Commands::Serve(cmd) => cmd.execute(config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
