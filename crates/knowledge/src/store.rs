//! Gemini File Search store client.
//!
//! Speaks the REST surface of a single file search store:
//! - `GET  {base}/{store}/documents` lists documents
//! - `POST {base}/{document}:query` queries one document's index
//! - `POST {upload}/{store}:uploadToFileSearchStore` uploads a file
//! - `GET  {base}/{operation}` reads an upload operation
//! - `DELETE {base}/{document}?force=true` deletes a document with its chunks

use crate::gateway::{DocumentAdmin, DocumentIndex};
use crate::types::{DocumentPage, Operation, PageRequest, ScoredText, UploadRequest};
use askstore_core::config::{DEFAULT_BASE_URL, DEFAULT_UPLOAD_BASE_URL};
use askstore_core::{AppConfig, AppError, AppResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    query: &'a str,
    results_count: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    relevant_chunks: Vec<RelevantChunk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelevantChunk {
    #[serde(default)]
    chunk_relevance_score: f32,
    #[serde(default)]
    chunk: Option<ChunkBody>,
}

#[derive(Debug, Deserialize)]
struct ChunkBody {
    #[serde(default)]
    data: Option<ChunkData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChunkData {
    #[serde(default)]
    string_value: Option<String>,
}

impl From<QueryResponse> for Vec<ScoredText> {
    fn from(response: QueryResponse) -> Self {
        response
            .relevant_chunks
            .into_iter()
            .map(|chunk| {
                let text = chunk
                    .chunk
                    .and_then(|c| c.data)
                    .and_then(|d| d.string_value)
                    .unwrap_or_default();
                ScoredText::new(text, chunk.chunk_relevance_score)
            })
            .collect()
    }
}

/// REST client bound to one file search store.
pub struct FileSearchStore {
    /// Store resource name, e.g. "fileSearchStores/my-store"
    store_name: String,

    /// Base URL for the API (without trailing slash)
    base_url: String,

    /// Base URL for uploads (without trailing slash)
    upload_base_url: String,

    /// API key sent as `x-goog-api-key`
    api_key: String,

    /// Per-call timeout
    timeout: Duration,

    client: reqwest::Client,
}

impl FileSearchStore {
    /// Create a store client against the public endpoints.
    pub fn new(store_name: impl Into<String>, api_key: impl Into<String>) -> AppResult<Self> {
        Self::with_endpoints(
            store_name,
            api_key,
            DEFAULT_BASE_URL,
            DEFAULT_UPLOAD_BASE_URL,
            Duration::from_secs(30),
        )
    }

    /// Create a store client with custom endpoints and per-call timeout.
    pub fn with_endpoints(
        store_name: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        upload_base_url: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let store_name = store_name.into().trim().trim_matches('/').to_string();
        if store_name.is_empty() {
            return Err(AppError::Config("File search store name is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            store_name,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            upload_base_url: upload_base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
            client,
        })
    }

    /// Build the store client described by `config`.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Self::with_endpoints(
            config.require_store_name()?,
            config.require_api_key()?,
            &config.base_url,
            &config.upload_base_url,
            Duration::from_secs(config.retrieval.timeout_secs),
        )
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    fn resource_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }

    fn documents_url(&self) -> String {
        format!("{}/{}/documents", self.base_url, self.store_name)
    }

    fn query_url(&self, document: &str) -> String {
        format!("{}:query", self.resource_url(document))
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/{}:uploadToFileSearchStore",
            self.upload_base_url, self.store_name
        )
    }

    fn send_error(&self, operation: &str, error: reqwest::Error) -> AppError {
        let message = if error.is_timeout() {
            format!("timed out after {:?}", self.timeout)
        } else {
            error.to_string()
        };
        AppError::upstream(operation, None, message)
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(
        operation: &str,
        response: Response,
    ) -> AppResult<T> {
        let status = response.status().as_u16();
        response.json().await.map_err(|e| {
            AppError::upstream(
                operation,
                Some(status),
                format!("Failed to parse response: {}", e),
            )
        })
    }
}

/// Pass successful responses through; turn the rest into errors.
///
/// A 404 on a named resource becomes `NotFound` when `not_found` is given.
async fn check_status(
    operation: &str,
    response: Response,
    not_found: Option<&str>,
) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if let (StatusCode::NOT_FOUND, Some(resource)) = (status, not_found) {
        return Err(AppError::NotFound(resource.to_string()));
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    Err(AppError::upstream(operation, Some(status.as_u16()), error_text))
}

#[async_trait]
impl DocumentIndex for FileSearchStore {
    async fn list_documents(&self, page: PageRequest) -> AppResult<DocumentPage> {
        const OPERATION: &str = "Document listing";

        let mut params = vec![("pageSize", page.page_size.to_string())];
        if let Some(token) = page.page_token {
            params.push(("pageToken", token));
        }

        let response = self
            .client
            .get(self.documents_url())
            .header("x-goog-api-key", &self.api_key)
            .query(&params)
            .send()
            .await
            .map_err(|e| self.send_error(OPERATION, e))?;

        let response = check_status(OPERATION, response, None).await?;
        let listed: DocumentPage = Self::parse_json(OPERATION, response).await?;

        tracing::debug!(
            "Listed {} documents from {}",
            listed.documents.len(),
            self.store_name
        );

        Ok(listed)
    }

    async fn query_document(
        &self,
        document: &str,
        query: &str,
        results_count: u32,
    ) -> AppResult<Vec<ScoredText>> {
        const OPERATION: &str = "Document query";

        let response = self
            .client
            .post(self.query_url(document))
            .header("x-goog-api-key", &self.api_key)
            .json(&QueryBody {
                query,
                results_count,
            })
            .send()
            .await
            .map_err(|e| self.send_error(OPERATION, e).for_document(document))?;

        let response = check_status(OPERATION, response, None)
            .await
            .map_err(|e| e.for_document(document))?;

        let parsed: QueryResponse = Self::parse_json(OPERATION, response)
            .await
            .map_err(|e| e.for_document(document))?;

        Ok(parsed.into())
    }
}

#[async_trait]
impl DocumentAdmin for FileSearchStore {
    async fn upload_document(&self, upload: UploadRequest) -> AppResult<Operation> {
        const OPERATION: &str = "Upload";

        upload.validate()?;

        let file_name = upload.safe_file_name();
        let mime_type = upload.resolved_mime_type();
        let metadata = serde_json::to_string(&upload.metadata_json())?;

        tracing::info!(
            "Uploading {} ({} bytes, {}) to {}",
            file_name,
            upload.bytes.len(),
            mime_type,
            self.store_name
        );

        let metadata_part = Part::text(metadata)
            .mime_str("application/json")
            .map_err(|e| AppError::InvalidInput(format!("Invalid metadata part: {}", e)))?;
        let file_part = Part::bytes(upload.bytes)
            .file_name(file_name)
            .mime_str(&mime_type)
            .map_err(|e| AppError::InvalidInput(format!("Invalid MIME type: {}", e)))?;

        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let response = self
            .client
            .post(self.upload_url())
            .header("x-goog-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.send_error(OPERATION, e))?;

        let response = check_status(OPERATION, response, None).await?;
        let operation: Operation = Self::parse_json(OPERATION, response).await?;

        tracing::info!("Upload started, operation {}", operation.name);
        Ok(operation)
    }

    async fn get_operation(&self, name: &str) -> AppResult<Operation> {
        const OPERATION: &str = "Operation status";

        let response = self
            .client
            .get(self.resource_url(name))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| self.send_error(OPERATION, e))?;

        let response = check_status(OPERATION, response, Some(name)).await?;
        let operation: Operation = Self::parse_json(OPERATION, response).await?;

        if operation.failed() {
            tracing::warn!("Operation {} finished with an error", name);
        }

        Ok(operation)
    }

    async fn delete_document(&self, name: &str) -> AppResult<()> {
        const OPERATION: &str = "Document delete";

        let response = self
            .client
            .delete(self.resource_url(name))
            .header("x-goog-api-key", &self.api_key)
            .query(&[("force", "true")])
            .send()
            .await
            .map_err(|e| self.send_error(OPERATION, e))?;

        check_status(OPERATION, response, Some(name)).await?;

        tracing::info!("Deleted document {}", name);
        Ok(())
    }
}
