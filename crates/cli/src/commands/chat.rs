//! Chat command handler.
//!
//! Interactive loop over the pipeline. History lives only in this process
//! and is capped at the most recent turns before every request.

use super::open_pipeline;
use askstore_core::{config::AppConfig, AppResult, ConversationTurn};
use askstore_knowledge::{Pipeline, RetrieveParams};
use clap::Args;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Most recent turns sent along with each question.
pub const MAX_HISTORY_TURNS: usize = 20;

/// Interactive multi-turn conversation
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Restrict retrieval to one document
    #[arg(short, long)]
    pub document: Option<String>,

    /// Number of fragments to retrieve per question (1-100)
    #[arg(short = 'n', long)]
    pub results_count: Option<u32>,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let pipeline = open_pipeline(config)?;
        let mut history: Vec<ConversationTurn> = Vec::new();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!(
            "Chatting with {} using {}. Type /clear to reset, /exit to quit.",
            config.store_name.as_deref().unwrap_or_default(),
            pipeline.default_model()
        );

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match line.trim() {
                "" => continue,
                "/exit" | "/quit" => break,
                "/clear" => {
                    history.clear();
                    println!("History cleared.");
                    continue;
                }
                question => match self.turn(&pipeline, question, &history).await {
                    Ok(answer) => {
                        println!("{}\n", answer);
                        history.push(ConversationTurn::user(question));
                        history.push(ConversationTurn::model(answer));
                        trim_history(&mut history);
                    }
                    Err(e) => eprintln!("Error: {}", e),
                },
            }
        }

        Ok(())
    }

    async fn turn(
        &self,
        pipeline: &Pipeline,
        question: &str,
        history: &[ConversationTurn],
    ) -> AppResult<String> {
        let params = RetrieveParams {
            query: question.to_string(),
            document_name: self.document.clone(),
            results_count: self.results_count,
        };

        let answer = pipeline.ask(&params, history, None).await?;
        tracing::debug!(
            "Answered from {} fragments",
            answer.generation.fragments_used
        );
        Ok(answer.generation.text)
    }
}

/// Drop the oldest turns so at most `MAX_HISTORY_TURNS` remain.
pub(crate) fn trim_history(history: &mut Vec<ConversationTurn>) {
    if history.len() > MAX_HISTORY_TURNS {
        let excess = history.len() - MAX_HISTORY_TURNS;
        history.drain(..excess);
    }
}
