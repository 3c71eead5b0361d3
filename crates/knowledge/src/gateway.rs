//! Document store gateways.
//!
//! [`DocumentIndex`] is what retrieval needs: list documents and query one
//! document's index. [`DocumentAdmin`] adds the management calls used by
//! the CLI and HTTP surfaces.

use crate::types::{DocumentPage, DocumentRef, Operation, PageRequest, ScoredText, UploadRequest};
use askstore_core::{AppError, AppResult};
use async_trait::async_trait;

/// Upper bound on pages followed by [`list_all_documents`].
const MAX_PAGES: usize = 1000;

/// Read access to the remote document store.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// List one page of documents.
    async fn list_documents(&self, page: PageRequest) -> AppResult<DocumentPage>;

    /// Query one document's index, returning fragments in index order.
    async fn query_document(
        &self,
        document: &str,
        query: &str,
        results_count: u32,
    ) -> AppResult<Vec<ScoredText>>;
}

/// Management operations on the remote document store.
#[async_trait]
pub trait DocumentAdmin: DocumentIndex {
    /// Start an upload. Processing continues in the returned operation.
    async fn upload_document(&self, upload: UploadRequest) -> AppResult<Operation>;

    /// Fetch the status of a long-running operation.
    async fn get_operation(&self, name: &str) -> AppResult<Operation>;

    /// Delete a document and its indexed content.
    async fn delete_document(&self, name: &str) -> AppResult<()>;
}

/// List every document by following page tokens.
pub async fn list_all_documents(index: &dyn DocumentIndex) -> AppResult<Vec<DocumentRef>> {
    let mut documents = Vec::new();
    let mut page = PageRequest::first();

    for _ in 0..MAX_PAGES {
        let listed = index.list_documents(page.clone()).await?;
        documents.extend(listed.documents);

        match listed.next_page_token {
            Some(token) if !token.is_empty() => {
                page = PageRequest::new(page.page_size, Some(token));
            }
            _ => return Ok(documents),
        }
    }

    Err(AppError::upstream(
        "Document listing",
        None,
        format!("more than {} pages returned", MAX_PAGES),
    ))
}
