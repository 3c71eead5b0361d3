//! Ask command handler.
//!
//! Retrieves fragments from the store and generates a grounded answer.

use super::{open_pipeline, print_fragments, print_json};
use askstore_core::{config::AppConfig, AppError, AppResult, ConversationTurn};
use askstore_knowledge::RetrieveParams;
use clap::Args;
use std::path::{Path, PathBuf};

/// Retrieve fragments and answer a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Restrict retrieval to one document (fileSearchStores/.../documents/...)
    #[arg(short, long)]
    pub document: Option<String>,

    /// Number of fragments to retrieve (1-100)
    #[arg(short = 'n', long)]
    pub results_count: Option<u32>,

    /// JSON file with earlier turns: [{"role": "user", "text": "..."}, ...]
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Print the fragments used after the answer
    #[arg(long)]
    pub sources: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.question_text()?;
        let history = match self.history {
            Some(ref path) => load_history(path)?,
            None => Vec::new(),
        };

        let pipeline = open_pipeline(config)?;
        let params = RetrieveParams {
            query: question,
            document_name: self.document.clone(),
            results_count: self.results_count,
        };

        let answer = pipeline.ask(&params, &history, None).await?;

        if self.json {
            return print_json(&serde_json::json!({
                "answer": answer.generation.text,
                "model": answer.generation.model,
                "query": answer.retrieval.query,
                "chunks_used": answer.generation.fragments_used,
                "documents_searched": answer.retrieval.documents_searched,
                "relevant_chunks": answer.retrieval.fragments,
            }));
        }

        println!("{}", answer.generation.text);

        if self.sources && !answer.retrieval.fragments.is_empty() {
            println!();
            println!(
                "Sources ({} fragments from {} documents):",
                answer.retrieval.fragments.len(),
                answer.retrieval.documents_searched
            );
            print_fragments(&answer.retrieval.fragments);
        }

        Ok(())
    }

    fn question_text(&self) -> AppResult<String> {
        if let Some(ref question) = self.question {
            return Ok(question.clone());
        }

        if let Some(ref path) = self.file {
            return Ok(std::fs::read_to_string(path)?);
        }

        Err(AppError::InvalidInput(
            "No question provided (pass it as an argument or with --file)".to_string(),
        ))
    }
}

/// Load conversation history from a JSON array of turns.
pub(crate) fn load_history(path: &Path) -> AppResult<Vec<ConversationTurn>> {
    let content = std::fs::read_to_string(path)?;
    let history: Vec<ConversationTurn> = serde_json::from_str(&content)?;
    tracing::debug!("Loaded {} history turns from {:?}", history.len(), path);
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use askstore_core::Role;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_history() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"role": "user", "text": "hi"}}, {{"role": "model", "text": "hello"}}]"#
        )
        .unwrap();

        let history = load_history(file.path()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Model);
    }

    #[test]
    fn test_load_history_rejects_bad_role() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"[{{"role": "system", "text": "x"}}]"#).unwrap();
        assert!(load_history(file.path()).is_err());
    }

    #[test]
    fn test_question_required() {
        let cmd = AskCommand {
            question: None,
            file: None,
            document: None,
            results_count: None,
            history: None,
            sources: false,
            json: false,
        };
        assert!(matches!(cmd.question_text(), Err(AppError::InvalidInput(_))));
    }
}
