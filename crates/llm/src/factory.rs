//! Generation provider factory.
//!
//! Creates provider clients from a provider name and builds the retrying
//! `GenerationClient` from application configuration.

use crate::client::LlmClient;
use crate::generation::GenerationClient;
use crate::providers::GeminiClient;
use crate::retry::RetryPolicy;
use crate::types::ProviderType;
use askstore_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create a provider client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("gemini")
/// * `base_url` - API base URL
/// * `api_key` - API key (required)
/// * `timeout` - Per-attempt timeout
///
/// # Errors
/// Returns error if the provider is unknown or the key is missing.
pub fn create_client(
    provider: &str,
    base_url: &str,
    api_key: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    match ProviderType::parse(provider) {
        Some(ProviderType::Gemini) => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("Gemini provider requires an API key".to_string())
            })?;
            let client = GeminiClient::with_base_url(base_url, api_key, timeout)?;
            Ok(Arc::new(client))
        }
        None => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}

/// Build the retrying generation client described by `config`.
pub fn generation_client_from_config(config: &AppConfig) -> AppResult<GenerationClient> {
    let client = create_client(
        ProviderType::Gemini.as_str(),
        &config.base_url,
        Some(config.require_api_key()?),
        Duration::from_secs(config.generation.timeout_secs),
    )?;

    Ok(GenerationClient::new(client).with_policy(RetryPolicy::from(&config.generation)))
}
