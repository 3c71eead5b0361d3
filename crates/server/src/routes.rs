//! Route handlers.

use crate::error::ApiError;
use crate::AppState;
use askstore_core::config::PublicConfig;
use askstore_core::Fragment;
use askstore_knowledge::{
    DocumentRef, GenerateParams, Operation, PageRequest, RetrieveParams, UploadRequest,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

type ApiResult<T> = Result<Json<T>, ApiError>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

// ============ GET /health ============

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ GET /api/config ============

#[derive(Serialize)]
pub struct ConfigResponse {
    success: bool,
    #[serde(flatten)]
    config: PublicConfig,
}

pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        success: true,
        config: state.public_config.as_ref().clone(),
    })
}

// ============ POST /api/chat/query ============

#[derive(Serialize)]
pub struct QueryResponse {
    success: bool,
    query: String,
    relevant_chunks: Vec<Fragment>,
    documents_searched: usize,
    total_chunks: usize,
}

pub async fn chat_query(
    State(state): State<AppState>,
    payload: Result<Json<RetrieveParams>, JsonRejection>,
) -> ApiResult<QueryResponse> {
    let params = body(payload)?;
    let result = state.pipeline.retrieve_fragments(&params).await?;

    Ok(Json(QueryResponse {
        success: true,
        query: result.query,
        total_chunks: result.fragments.len(),
        relevant_chunks: result.fragments,
        documents_searched: result.documents_searched,
    }))
}

// ============ POST /api/chat/generate ============

#[derive(Serialize)]
pub struct GenerateResponse {
    success: bool,
    answer: String,
    query: String,
    model: String,
    chunks_used: usize,
    attempts: u32,
}

pub async fn chat_generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateParams>, JsonRejection>,
) -> ApiResult<GenerateResponse> {
    let params = body(payload)?;
    let result = state.pipeline.generate_answer(&params).await?;

    Ok(Json(GenerateResponse {
        success: true,
        answer: result.text,
        query: params.query,
        model: result.model,
        chunks_used: result.fragments_used,
        attempts: result.attempts,
    }))
}

// ============ GET /api/documents ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    page_size: Option<u32>,
    page_token: Option<String>,
}

#[derive(Serialize)]
pub struct DocumentsResponse {
    success: bool,
    documents: Vec<DocumentRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_page_token: Option<String>,
}

pub async fn list_documents(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<DocumentsResponse> {
    let page = PageRequest::new(params.page_size.unwrap_or(20), params.page_token);
    let listed = state.admin.list_documents(page).await?;

    Ok(Json(DocumentsResponse {
        success: true,
        documents: listed.documents,
        next_page_token: listed.next_page_token,
    }))
}

// ============ POST /api/documents/upload ============

#[derive(Serialize)]
pub struct UploadResponse {
    success: bool,
    operation_name: String,
    operation: Operation,
}

/// Accepts `file` plus optional `displayName`, `mimeType` and paired
/// `metadataKeys[]` / `metadataValues[]` fields.
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    let mut upload: Option<UploadRequest> = None;
    let mut display_name = None;
    let mut mime_type = None;
    let mut keys = Vec::new();
    let mut values = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;
            upload = Some(UploadRequest::new(file_name, bytes.to_vec()));
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read field {}: {}", name, e)))?;

        match name.as_str() {
            "displayName" => display_name = Some(text),
            "mimeType" => mime_type = Some(text),
            "metadataKeys[]" => keys.push(text),
            "metadataValues[]" => values.push(text),
            other => tracing::debug!("Ignoring multipart field {}", other),
        }
    }

    let mut upload = upload.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    upload.display_name = display_name;
    upload.mime_type = mime_type;
    upload.custom_metadata = keys.into_iter().zip(values).collect();

    let operation = state.admin.upload_document(upload).await?;

    Ok(Json(UploadResponse {
        success: true,
        operation_name: operation.name.clone(),
        operation,
    }))
}

// ============ GET /api/operations/{*name} ============

#[derive(Serialize)]
pub struct OperationResponse {
    success: bool,
    done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<serde_json::Value>,
    operation: Operation,
}

pub async fn get_operation(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<OperationResponse> {
    let operation = state
        .admin
        .get_operation(name.trim_start_matches('/'))
        .await?;

    Ok(Json(OperationResponse {
        success: true,
        done: operation.done,
        error: operation.error.clone(),
        document: operation.done.then(|| operation.response.clone()).flatten(),
        operation,
    }))
}

// ============ DELETE /api/documents/{*name} ============

#[derive(Serialize)]
pub struct DeleteResponse {
    success: bool,
    message: String,
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<DeleteResponse> {
    let name = name.trim_start_matches('/');
    state.admin.delete_document(name).await?;

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Document {} deleted", name),
    }))
}
