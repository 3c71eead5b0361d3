//! Generation crate for askstore.
//!
//! This crate wraps the text-generation service behind a provider-agnostic
//! single-attempt trait ([`LlmClient`]) and layers rate-limit backoff on top
//! of it ([`GenerationClient`]).
//!
//! # Providers
//! - **Gemini**: `generateContent` (default)
//!
//! # Example
//! ```no_run
//! use askstore_core::ConversationTurn;
//! use askstore_llm::{GenerationClient, GenerationRequest, providers::GeminiClient};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GenerationClient::new(Arc::new(GeminiClient::new("api-key")?));
//! let request = GenerationRequest::new(vec![ConversationTurn::user("Hello")]);
//! let result = client.generate(&request, "gemini-2.5-flash-lite", 0).await?;
//! println!("{}", result.text);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod generation;
pub mod providers;
pub mod retry;
pub mod types;

// Re-export main types
pub use client::{AttemptFailure, Candidate, LlmClient, LlmResponse};
pub use factory::{create_client, generation_client_from_config};
pub use generation::GenerationClient;
pub use providers::GeminiClient;
pub use retry::{RetryEvent, RetryPolicy, RetryState, Sleeper, TokioSleeper};
pub use types::{GenerationRequest, GenerationResult, ProviderType, SamplingConfig};
