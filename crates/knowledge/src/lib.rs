//! Retrieval over a Gemini File Search store.
//!
//! The store is reached through the [`DocumentIndex`] and [`DocumentAdmin`]
//! traits; [`FileSearchStore`] is the REST implementation. The
//! [`RetrievalOrchestrator`] fans a query out over active documents and the
//! [`Pipeline`] chains retrieval with grounded generation.

pub mod gateway;
pub mod pipeline;
pub mod retrieval;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use gateway::{list_all_documents, DocumentAdmin, DocumentIndex};
pub use pipeline::{Answer, Pipeline};
pub use retrieval::{merge_ranked, RetrievalOrchestrator};
pub use store::FileSearchStore;
pub use types::{
    DocumentPage, DocumentRef, DocumentState, GenerateParams, Operation, PageRequest, Query,
    RetrievalResult, RetrieveParams, ScoredText, UploadRequest,
};
