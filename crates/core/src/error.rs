//! Error types for askstore.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! prompt rendering, and the retrieval/generation failure taxonomy. Each
//! variant carries enough detail to render a user-facing message without
//! going back to the raw transport error.

use thiserror::Error;

/// Unified error type for askstore.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Prompt rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Caller input rejected before any network call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Retrieval found no document in the active state
    #[error("No active documents found in the store")]
    NoActiveDocuments,

    /// A remote call failed for a reason other than rate limiting
    #[error("{operation} failed{}: {message}", upstream_context(.document, .status))]
    UpstreamUnavailable {
        operation: String,
        document: Option<String>,
        status: Option<u16>,
        message: String,
    },

    /// Generation stayed rate limited after every retry
    #[error("Generation service rate limited after {attempts} attempts: {message}")]
    RateLimited { attempts: u32, message: String },

    /// Generation succeeded but produced no candidate
    #[error("No response generated by model {model}")]
    NoCandidateGenerated { model: String },

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Build an `UpstreamUnavailable` error for an operation not tied to a document.
    pub fn upstream(
        operation: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        AppError::UpstreamUnavailable {
            operation: operation.into(),
            document: None,
            status,
            message: message.into(),
        }
    }

    /// Attach the offending document to an `UpstreamUnavailable` error.
    pub fn for_document(self, name: impl Into<String>) -> Self {
        match self {
            AppError::UpstreamUnavailable {
                operation,
                status,
                message,
                ..
            } => AppError::UpstreamUnavailable {
                operation,
                document: Some(name.into()),
                status,
                message,
            },
            other => other,
        }
    }

    /// Stable machine-readable code for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Prompt(_) => "prompt",
            AppError::Serialization(_) => "serialization",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NoActiveDocuments => "no_active_documents",
            AppError::UpstreamUnavailable { .. } => "upstream_unavailable",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::NoCandidateGenerated { .. } => "no_candidate_generated",
            AppError::NotFound(_) => "not_found",
            AppError::Other(_) => "internal",
        }
    }

    /// HTTP status code used when this error crosses the HTTP boundary.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::InvalidInput(_) => 400,
            AppError::NoActiveDocuments | AppError::NotFound(_) => 404,
            AppError::RateLimited { .. } => 429,
            AppError::UpstreamUnavailable { .. } => 502,
            _ => 500,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

fn upstream_context(document: &Option<String>, status: &Option<u16>) -> String {
    let mut context = String::new();
    if let Some(document) = document {
        context.push_str(&format!(" for {}", document));
    }
    if let Some(status) = status {
        context.push_str(&format!(" ({})", status));
    }
    context
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
