//! Two-phase question answering: retrieve fragments, then generate.

use crate::gateway::DocumentIndex;
use crate::retrieval::RetrievalOrchestrator;
use crate::types::{validate_query_text, GenerateParams, RetrievalResult, RetrieveParams};
use askstore_core::config::DEFAULT_MODEL;
use askstore_core::{AppConfig, AppError, AppResult, ConversationTurn};
use askstore_llm::{generation_client_from_config, GenerationClient, GenerationResult, SamplingConfig};
use askstore_prompt::ContextBuilder;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Retrieval followed by grounded generation.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub retrieval: RetrievalResult,
    pub generation: GenerationResult,
}

/// Entry point shared by the CLI and the HTTP server.
pub struct Pipeline {
    retrieval: RetrievalOrchestrator,
    builder: ContextBuilder,
    generation: GenerationClient,
    default_model: String,
    default_results_count: u32,
}

impl Pipeline {
    pub fn new(index: Arc<dyn DocumentIndex>, generation: GenerationClient) -> AppResult<Self> {
        Ok(Self {
            retrieval: RetrievalOrchestrator::new(index),
            builder: ContextBuilder::new()?,
            generation,
            default_model: DEFAULT_MODEL.to_string(),
            default_results_count: crate::types::DEFAULT_RESULTS_COUNT,
        })
    }

    /// Build the pipeline described by `config` over `index`.
    pub fn from_config(config: &AppConfig, index: Arc<dyn DocumentIndex>) -> AppResult<Self> {
        let generation = generation_client_from_config(config)?;
        let builder =
            ContextBuilder::new()?.with_sampling(SamplingConfig::from(&config.generation));

        Ok(Self::new(index.clone(), generation)?
            .with_retrieval(RetrievalOrchestrator::from_settings(index, &config.retrieval))
            .with_builder(builder)
            .with_default_model(config.model.clone())
            .with_default_results_count(config.retrieval.results_count))
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalOrchestrator) -> Self {
        self.retrieval = retrieval;
        self
    }

    pub fn with_builder(mut self, builder: ContextBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_default_results_count(mut self, results_count: u32) -> Self {
        self.default_results_count = results_count;
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Validate the parameters and retrieve fragments.
    ///
    /// Invalid input is rejected before any store call is made.
    pub async fn retrieve_fragments(&self, params: &RetrieveParams) -> AppResult<RetrievalResult> {
        let query = params.to_query(self.default_results_count)?;
        self.retrieval.retrieve(&query).await
    }

    /// Validate the question and generate an answer grounded in the supplied fragments.
    #[instrument(skip_all, fields(fragments = params.relevant_chunks.len(), history = params.chat_history.len()))]
    pub async fn generate_answer(&self, params: &GenerateParams) -> AppResult<GenerationResult> {
        let question = validate_query_text(&params.query)?;
        let model = self.resolve_model(params.model.as_deref())?;

        let request =
            self.builder
                .build_request(question, &params.relevant_chunks, &params.chat_history)?;

        let result = self
            .generation
            .generate(&request, model, params.relevant_chunks.len())
            .await?;

        info!(
            "Generated {} chars with {} after {} attempt(s)",
            result.text.len(),
            result.model,
            result.attempts
        );

        Ok(result)
    }

    /// Retrieve fragments, then answer from the fragments found.
    pub async fn ask(
        &self,
        params: &RetrieveParams,
        history: &[ConversationTurn],
        model: Option<&str>,
    ) -> AppResult<Answer> {
        let retrieval = self.retrieve_fragments(params).await?;

        let generation = self
            .generate_answer(&GenerateParams {
                query: params.query.clone(),
                relevant_chunks: retrieval.fragments.clone(),
                chat_history: history.to_vec(),
                model: model.map(str::to_string),
            })
            .await?;

        Ok(Answer {
            retrieval,
            generation,
        })
    }

    fn resolve_model<'a>(&'a self, requested: Option<&'a str>) -> AppResult<&'a str> {
        let model = requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model);

        let valid = model
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !valid {
            return Err(AppError::InvalidInput(format!(
                "Invalid model identifier: {}",
                model
            )));
        }

        Ok(model)
    }
}
