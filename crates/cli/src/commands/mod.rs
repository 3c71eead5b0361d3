//! Command handlers for the askstore CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod documents;
pub mod query;
pub mod serve;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use documents::DocumentsCommand;
pub use query::QueryCommand;
pub use serve::ServeCommand;

use askstore_core::{config::AppConfig, AppResult, Fragment};
use askstore_knowledge::{FileSearchStore, Pipeline};
use std::sync::Arc;

/// Store client for the configured store.
pub(crate) fn open_store(config: &AppConfig) -> AppResult<Arc<FileSearchStore>> {
    config.validate()?;
    Ok(Arc::new(FileSearchStore::from_config(config)?))
}

/// Pipeline over the configured store.
pub(crate) fn open_pipeline(config: &AppConfig) -> AppResult<Pipeline> {
    let store = open_store(config)?;
    Pipeline::from_config(config, store)
}

/// Print fragments as a numbered list with their sources and scores.
pub(crate) fn print_fragments(fragments: &[Fragment]) {
    for (i, fragment) in fragments.iter().enumerate() {
        println!(
            "[{}] {} (score {:.3})",
            i + 1,
            fragment.source_document,
            fragment.relevance_score
        );
        println!("    {}", fragment.text.replace('\n', "\n    "));
    }
}

/// Pretty-print a JSON value to stdout.
pub(crate) fn print_json(value: &serde_json::Value) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
