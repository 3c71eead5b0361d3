//! Generation request and result types.
//!
//! These are provider-agnostic. Each provider converts a `GenerationRequest`
//! into its own wire format.

use askstore_core::config::GenerationSettings;
use askstore_core::ConversationTurn;
use serde::{Deserialize, Serialize};

/// Fixed sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

impl From<&GenerationSettings> for SamplingConfig {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            temperature: settings.temperature,
            top_k: settings.top_k,
            top_p: settings.top_p,
            max_output_tokens: settings.max_output_tokens,
        }
    }
}

/// A complete generation request.
///
/// `turns` always ends with the current user turn. Built fresh for every
/// call and never retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub turns: Vec<ConversationTurn>,
    pub sampling: SamplingConfig,
}

impl GenerationRequest {
    pub fn new(turns: Vec<ConversationTurn>) -> Self {
        Self {
            turns,
            sampling: SamplingConfig::default(),
        }
    }

    /// Replace the sampling parameters.
    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    /// The final turn, which is the question being asked.
    pub fn current_turn(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }
}

/// Answer produced by a successful generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Answer text from the first candidate
    pub text: String,

    /// Number of fragments that were placed in the context
    pub fragments_used: usize,

    /// Model that produced the answer
    pub model: String,

    /// Attempts made, rate-limited ones included
    pub attempts: u32,
}

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Gemini,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!(ProviderType::parse("gemini"), Some(ProviderType::Gemini));
        assert_eq!(ProviderType::parse("Google"), Some(ProviderType::Gemini));
        assert_eq!(ProviderType::parse("ollama"), None);
    }

    #[test]
    fn test_sampling_wire_names() {
        let json = serde_json::to_value(SamplingConfig::default()).unwrap();
        assert_eq!(json["topK"], 40);
        assert_eq!(json["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_sampling_from_settings() {
        let settings = GenerationSettings {
            temperature: 0.2,
            ..GenerationSettings::default()
        };
        let sampling = SamplingConfig::from(&settings);
        assert_eq!(sampling.temperature, 0.2);
        assert_eq!(sampling.top_k, 40);
    }

    #[test]
    fn test_current_turn() {
        let request = GenerationRequest::new(vec![
            ConversationTurn::user("earlier"),
            ConversationTurn::model("reply"),
            ConversationTurn::user("now"),
        ]);
        assert_eq!(request.current_turn().unwrap().text, "now");
    }
}
