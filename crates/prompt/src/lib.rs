//! Context builder for askstore.
//!
//! Turns ranked fragments, the caller's question and prior conversation
//! turns into a single [`GenerationRequest`](askstore_llm::GenerationRequest):
//! - Handlebars-rendered grounding prompt
//! - Fragments numbered in the order retrieval ranked them
//! - History replayed verbatim ahead of the new user turn

pub mod builder;
pub mod templates;

// Re-export main types
pub use builder::{build_request, ContextBuilder};
