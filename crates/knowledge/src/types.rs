//! Knowledge store types.

use askstore_core::{AppError, AppResult, ConversationTurn, Fragment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum query length, in characters.
pub const MAX_QUERY_CHARS: usize = 2000;

/// Fragments requested when the caller does not say.
pub const DEFAULT_RESULTS_COUNT: u32 = 10;

/// Largest fragment count a single query may ask for.
pub const MAX_RESULTS_COUNT: u32 = 100;

/// Largest page the store will return when listing documents.
pub const MAX_PAGE_SIZE: u32 = 20;

/// Processing state of a document in the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentState {
    #[serde(rename = "STATE_ACTIVE")]
    Active,
    #[serde(rename = "STATE_PENDING")]
    Processing,
    #[serde(rename = "STATE_FAILED")]
    Failed,
    #[serde(rename = "STATE_UNSPECIFIED")]
    Unspecified,
    #[serde(other)]
    Unknown,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::Unspecified
    }
}

/// Key/value pair attached to a document at upload time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMetadata {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
}

/// Snapshot of a document owned by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    /// Resource name, e.g. "fileSearchStores/s/documents/d"
    pub name: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub state: DocumentState,

    #[serde(default)]
    pub mime_type: Option<String>,

    /// int64 encoded as a string on the wire
    #[serde(default)]
    pub size_bytes: Option<String>,

    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub update_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_metadata: Vec<CustomMetadata>,
}

impl DocumentRef {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, state: DocumentState) -> Self {
        Self {
            name: name.into(),
            display_name: Some(display_name.into()),
            state,
            mime_type: None,
            size_bytes: None,
            create_time: None,
            update_time: None,
            custom_metadata: Vec::new(),
        }
    }

    /// Only active documents take part in retrieval.
    pub fn is_active(&self) -> bool {
        self.state == DocumentState::Active
    }

    /// Name shown to users and used to tag fragments.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.name)
    }
}

/// One page of the document listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPage {
    #[serde(default)]
    pub documents: Vec<DocumentRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Paging parameters for listing documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page_size: u32,
    pub page_token: Option<String>,
}

impl PageRequest {
    /// Request a page, clamping the size to what the store accepts.
    pub fn new(page_size: u32, page_token: Option<String>) -> Self {
        Self {
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            page_token: page_token.filter(|token| !token.is_empty()),
        }
    }

    pub fn first() -> Self {
        Self::new(MAX_PAGE_SIZE, None)
    }
}

/// A fragment as returned by one document index, before tagging.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredText {
    pub text: String,
    pub relevance_score: f32,
}

impl ScoredText {
    pub fn new(text: impl Into<String>, relevance_score: f32) -> Self {
        Self {
            text: text.into(),
            relevance_score,
        }
    }

    /// Attach the source document's display name.
    pub fn into_fragment(self, source: &str) -> Fragment {
        Fragment::new(self.text, source, self.relevance_score)
    }
}

/// Validate question text: non-empty after trimming, at most 2000 characters.
///
/// The text is never interpreted as code, so nothing else is filtered.
pub fn validate_query_text(text: &str) -> AppResult<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("Query text is required".to_string()));
    }

    let chars = text.chars().count();
    if chars > MAX_QUERY_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Query is too long ({} characters, maximum {})",
            chars, MAX_QUERY_CHARS
        )));
    }

    Ok(trimmed)
}

/// A validated retrieval query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    target_document: Option<String>,
    results_count: u32,
}

impl Query {
    /// Validate `text` and build a query over all active documents.
    pub fn new(text: &str) -> AppResult<Self> {
        Ok(Self {
            text: validate_query_text(text)?.to_string(),
            target_document: None,
            results_count: DEFAULT_RESULTS_COUNT,
        })
    }

    /// Restrict the query to a single document.
    pub fn with_target(mut self, document: impl Into<String>) -> Self {
        let document = document.into();
        self.target_document = if document.trim().is_empty() {
            None
        } else {
            Some(document)
        };
        self
    }

    /// Set the number of fragments to return (1 to 100).
    pub fn with_results_count(mut self, results_count: u32) -> AppResult<Self> {
        if results_count == 0 || results_count > MAX_RESULTS_COUNT {
            return Err(AppError::InvalidInput(format!(
                "results_count must be between 1 and {}, got {}",
                MAX_RESULTS_COUNT, results_count
            )));
        }
        self.results_count = results_count;
        Ok(self)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn target_document(&self) -> Option<&str> {
        self.target_document.as_deref()
    }

    pub fn results_count(&self) -> u32 {
        self.results_count
    }
}

/// Unvalidated retrieval parameters as received from a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrieveParams {
    pub query: String,

    #[serde(default)]
    pub document_name: Option<String>,

    #[serde(default)]
    pub results_count: Option<u32>,
}

impl RetrieveParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Validate into a `Query`, filling in `default_count` when no count was given.
    pub fn to_query(&self, default_count: u32) -> AppResult<Query> {
        let mut query =
            Query::new(&self.query)?.with_results_count(self.results_count.unwrap_or(default_count))?;
        if let Some(ref document) = self.document_name {
            query = query.with_target(document.clone());
        }
        Ok(query)
    }
}

/// Unvalidated generation parameters as received from a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateParams {
    pub query: String,

    #[serde(default)]
    pub relevant_chunks: Vec<Fragment>,

    #[serde(default)]
    pub chat_history: Vec<ConversationTurn>,

    #[serde(default)]
    pub model: Option<String>,
}

/// Outcome of a retrieval call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Query text as searched
    pub query: String,

    /// Fragments, best first
    pub fragments: Vec<Fragment>,

    /// Documents whose query succeeded
    pub documents_searched: usize,
}

/// Long-running store operation (upload processing).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Operation {
    pub fn succeeded(&self) -> bool {
        self.done && self.error.is_none()
    }

    pub fn failed(&self) -> bool {
        self.done && self.error.is_some()
    }
}

/// Longest display name the store accepts, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 512;

/// A file to add to the store.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub display_name: Option<String>,
    pub mime_type: Option<String>,
    pub custom_metadata: Vec<(String, String)>,
}

impl UploadRequest {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            ..Self::default()
        }
    }

    /// Reject uploads the store could never accept.
    pub fn validate(&self) -> AppResult<()> {
        if self.file_name.trim().is_empty() {
            return Err(AppError::InvalidInput("File name is empty".to_string()));
        }
        if self.bytes.is_empty() {
            return Err(AppError::InvalidInput("File is empty".to_string()));
        }
        Ok(())
    }

    /// MIME type given by the caller, else guessed from the file name.
    pub fn resolved_mime_type(&self) -> String {
        self.mime_type
            .clone()
            .filter(|mime| !mime.is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&self.file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            })
    }

    /// Display name, truncated to the store's limit.
    pub fn resolved_display_name(&self) -> String {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.file_name)
            .chars()
            .take(MAX_DISPLAY_NAME_CHARS)
            .collect()
    }

    /// File name safe to send as the multipart file name.
    pub fn safe_file_name(&self) -> String {
        let base = self
            .file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();
        let cleaned: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let cleaned = cleaned.trim_start_matches('.').to_string();
        if cleaned.is_empty() {
            "upload".to_string()
        } else {
            cleaned
        }
    }

    /// JSON metadata part sent alongside the file.
    pub fn metadata_json(&self) -> serde_json::Value {
        let mut metadata = serde_json::json!({
            "displayName": self.resolved_display_name(),
            "mimeType": self.resolved_mime_type(),
        });

        let custom: Vec<CustomMetadata> = self
            .custom_metadata
            .iter()
            .filter(|(key, value)| !key.is_empty() && !value.is_empty())
            .map(|(key, value)| CustomMetadata {
                key: key.clone(),
                string_value: Some(value.clone()),
            })
            .collect();

        if !custom.is_empty() {
            metadata["customMetadata"] = serde_json::json!(custom);
        }

        metadata
    }
}
