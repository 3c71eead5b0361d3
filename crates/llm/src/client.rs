//! LLM client abstraction and response types.
//!
//! A `LlmClient` performs exactly one generation attempt. Retrying is the
//! job of `GenerationClient`, so providers only need to classify failures.

use crate::types::GenerationRequest;
use askstore_core::AppError;
use serde::{Deserialize, Serialize};

/// One candidate answer returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
}

/// Raw response of a single successful attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub candidates: Vec<Candidate>,
}

impl LlmResponse {
    /// Response carrying a single candidate.
    pub fn single(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate { text: text.into() }],
        }
    }
}

/// Why a single attempt failed.
#[derive(Debug)]
pub enum AttemptFailure {
    /// The service asked us to slow down (HTTP 429)
    RateLimited { message: String },

    /// Any other failure, surfaced without retrying
    Failed(AppError),
}

impl From<AppError> for AttemptFailure {
    fn from(err: AppError) -> Self {
        AttemptFailure::Failed(err)
    }
}

/// Trait for generation providers.
///
/// This trait abstracts the underlying service and provides a single
/// attempt at generating an answer.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "gemini").
    fn provider_name(&self) -> &str;

    /// Perform one generation attempt.
    ///
    /// # Arguments
    /// * `request` - Conversation turns and sampling parameters
    /// * `model` - Model identifier
    async fn attempt(
        &self,
        request: &GenerationRequest,
        model: &str,
    ) -> Result<LlmResponse, AttemptFailure>;
}
