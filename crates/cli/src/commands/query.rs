//! Query command handler.
//!
//! Runs retrieval only and prints the ranked fragments.

use super::{open_pipeline, print_fragments, print_json};
use askstore_core::{config::AppConfig, AppResult};
use askstore_knowledge::RetrieveParams;
use clap::Args;

/// Retrieve ranked fragments without generating an answer
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Query text
    pub query: String,

    /// Restrict retrieval to one document
    #[arg(short, long)]
    pub document: Option<String>,

    /// Number of fragments to return (1-100)
    #[arg(short = 'n', long)]
    pub results_count: Option<u32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing query command");

        let pipeline = open_pipeline(config)?;
        let result = pipeline
            .retrieve_fragments(&RetrieveParams {
                query: self.query.clone(),
                document_name: self.document.clone(),
                results_count: self.results_count,
            })
            .await?;

        if self.json {
            return print_json(&serde_json::json!({
                "query": result.query,
                "relevant_chunks": result.fragments,
                "documents_searched": result.documents_searched,
                "total_chunks": result.fragments.len(),
            }));
        }

        if result.fragments.is_empty() {
            println!(
                "No fragments found ({} documents searched)",
                result.documents_searched
            );
            return Ok(());
        }

        println!(
            "{} fragments from {} documents:",
            result.fragments.len(),
            result.documents_searched
        );
        print_fragments(&result.fragments);

        Ok(())
    }
}
