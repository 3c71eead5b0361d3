//! End-to-end pipeline behavior over the in-memory store.

use super::FakeStore;
use crate::pipeline::Pipeline;
use crate::types::{DocumentRef, DocumentState, GenerateParams, RetrieveParams, ScoredText};
use askstore_core::{AppError, ConversationTurn, Fragment};
use askstore_llm::{AttemptFailure, GenerationClient, GenerationRequest, LlmClient, LlmResponse};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingLlm {
    requests: Mutex<Vec<(GenerationRequest, String)>>,
}

impl RecordingLlm {
    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last(&self) -> (GenerationRequest, String) {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl LlmClient for RecordingLlm {
    fn provider_name(&self) -> &str {
        "recording"
    }

    async fn attempt(
        &self,
        request: &GenerationRequest,
        model: &str,
    ) -> Result<LlmResponse, AttemptFailure> {
        self.requests
            .lock()
            .unwrap()
            .push((request.clone(), model.to_string()));
        Ok(LlmResponse::single("grounded answer"))
    }
}

fn setup() -> (Pipeline, Arc<FakeStore>, Arc<RecordingLlm>) {
    let store = Arc::new(
        FakeStore::new()
            .with_document(
                DocumentRef::new("d/1", "doc1", DocumentState::Active),
                vec![ScoredText::new("A", 0.9)],
            )
            .with_document(
                DocumentRef::new("d/2", "doc2", DocumentState::Active),
                vec![ScoredText::new("B", 0.4)],
            ),
    );
    let llm = Arc::new(RecordingLlm::default());
    let pipeline = Pipeline::new(store.clone(), GenerationClient::new(llm.clone()))
        .unwrap()
        .with_default_model("default-model");
    (pipeline, store, llm)
}

#[tokio::test]
async fn test_invalid_query_makes_no_store_calls() {
    let (pipeline, store, _) = setup();

    let too_long = "x".repeat(2001);
    for text in ["", "   ", too_long.as_str()] {
        let err = pipeline
            .retrieve_fragments(&RetrieveParams::new(text))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    assert_eq!(store.list_calls(), 0);
    assert!(store.queried().is_empty());
}

#[tokio::test]
async fn test_invalid_question_makes_no_generation_calls() {
    let (pipeline, _, llm) = setup();

    let err = pipeline
        .generate_answer(&GenerateParams {
            query: " \n ".to_string(),
            ..GenerateParams::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_default_results_count_applies() {
    let (pipeline, _, _) = setup();
    let pipeline = pipeline.with_default_results_count(1);

    let result = pipeline
        .retrieve_fragments(&RetrieveParams::new("q"))
        .await
        .unwrap();

    assert_eq!(result.fragments, vec![Fragment::new("A", "doc1", 0.9)]);
    assert_eq!(result.documents_searched, 2);
}

#[tokio::test]
async fn test_generate_builds_grounded_request() {
    let (pipeline, _, llm) = setup();

    let result = pipeline
        .generate_answer(&GenerateParams {
            query: "Q".to_string(),
            relevant_chunks: vec![Fragment::new("A", "doc1", 0.9)],
            chat_history: vec![ConversationTurn::user("hi"), ConversationTurn::model("hello")],
            model: None,
        })
        .await
        .unwrap();

    assert_eq!(result.text, "grounded answer");
    assert_eq!(result.fragments_used, 1);
    assert_eq!(result.model, "default-model");

    let (request, model) = llm.last();
    assert_eq!(model, "default-model");
    assert_eq!(request.turns.len(), 3);
    let prompt = &request.current_turn().unwrap().text;
    assert!(prompt.contains("[Fragment 1 from doc1]: A"));
    assert!(prompt.contains("Question: Q"));
}

#[tokio::test]
async fn test_model_override() {
    let (pipeline, _, llm) = setup();

    let result = pipeline
        .generate_answer(&GenerateParams {
            query: "Q".to_string(),
            model: Some("gemini-2.5-pro".to_string()),
            ..GenerateParams::default()
        })
        .await
        .unwrap();

    assert_eq!(result.model, "gemini-2.5-pro");
    assert_eq!(llm.last().1, "gemini-2.5-pro");
}

#[tokio::test]
async fn test_invalid_model_rejected() {
    let (pipeline, _, llm) = setup();

    let err = pipeline
        .generate_answer(&GenerateParams {
            query: "Q".to_string(),
            model: Some("../files".to_string()),
            ..GenerateParams::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_ask_retrieves_then_generates() {
    let (pipeline, _, llm) = setup();

    let answer = pipeline
        .ask(&RetrieveParams::new("what is A?"), &[], None)
        .await
        .unwrap();

    assert_eq!(answer.retrieval.fragments.len(), 2);
    assert_eq!(answer.generation.fragments_used, 2);

    let prompt = llm.last().0.current_turn().unwrap().text.clone();
    let first = prompt.find("[Fragment 1 from doc1]: A").unwrap();
    let second = prompt.find("[Fragment 2 from doc2]: B").unwrap();
    assert!(first < second);
}

#[tokio::test]
async fn test_ask_without_active_documents() {
    let store = Arc::new(FakeStore::new());
    let llm = Arc::new(RecordingLlm::default());
    let pipeline = Pipeline::new(store, GenerationClient::new(llm.clone())).unwrap();

    let err = pipeline
        .ask(&RetrieveParams::new("q"), &[], None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NoActiveDocuments));
    assert_eq!(llm.calls(), 0);
}
