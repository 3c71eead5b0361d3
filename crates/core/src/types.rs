//! Types exchanged between retrieval and generation.

use serde::{Deserialize, Serialize};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Wire name used by the generation service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// A single prior turn supplied by the caller.
///
/// History is owned by the caller and passed in on every call; nothing in
/// the workspace persists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// A relevant text fragment returned by retrieval.
///
/// Serialized with the field names the HTTP API exposes so clients can send
/// the fragments straight back to the generation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Fragment text as stored by the remote index
    pub text: String,

    /// Display name of the document the fragment came from
    #[serde(rename = "source_document", default = "default_source")]
    pub source_document: String,

    /// Relevance score reported by the index (higher is better)
    #[serde(rename = "relevance_score", default)]
    pub relevance_score: f32,
}

fn default_source() -> String {
    "document".to_string()
}

impl Fragment {
    pub fn new(
        text: impl Into<String>,
        source_document: impl Into<String>,
        relevance_score: f32,
    ) -> Self {
        Self {
            text: text.into(),
            source_document: source_document.into(),
            relevance_score,
        }
    }
}
