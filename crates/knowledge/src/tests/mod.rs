//! In-memory store used by the retrieval and pipeline tests.

mod pipeline_flow;

use crate::gateway::DocumentIndex;
use crate::types::{DocumentPage, DocumentRef, PageRequest, ScoredText};
use askstore_core::{AppError, AppResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct FakeStore {
    documents: Vec<DocumentRef>,
    chunks: HashMap<String, Vec<ScoredText>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    page_size: usize,
    fail_listing: bool,
    list_calls: AtomicUsize,
    queried: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
            chunks: HashMap::new(),
            failing: HashSet::new(),
            delays: HashMap::new(),
            page_size: 20,
            fail_listing: false,
            list_calls: AtomicUsize::new(0),
            queried: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_document(mut self, document: DocumentRef, chunks: Vec<ScoredText>) -> Self {
        self.chunks.insert(document.name.clone(), chunks);
        self.documents.push(document);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_delay(mut self, document: &str, delay: Duration) -> Self {
        self.delays.insert(document.to_string(), delay);
        self
    }

    pub fn failing_document(mut self, document: &str) -> Self {
        self.failing.insert(document.to_string());
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentIndex for FakeStore {
    async fn list_documents(&self, page: PageRequest) -> AppResult<DocumentPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_listing {
            return Err(AppError::upstream("Document listing", Some(503), "unavailable"));
        }

        let offset: usize = page
            .page_token
            .as_deref()
            .and_then(|token| token.parse().ok())
            .unwrap_or(0);
        let end = (offset + self.page_size).min(self.documents.len());

        Ok(DocumentPage {
            documents: self.documents[offset..end].to_vec(),
            next_page_token: (end < self.documents.len()).then(|| end.to_string()),
        })
    }

    async fn query_document(
        &self,
        document: &str,
        _query: &str,
        results_count: u32,
    ) -> AppResult<Vec<ScoredText>> {
        self.queried.lock().unwrap().push(document.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(document) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(document) {
            return Err(AppError::upstream("Document query", Some(500), "boom").for_document(document));
        }

        Ok(self
            .chunks
            .get(document)
            .map(|chunks| chunks.iter().take(results_count as usize).cloned().collect())
            .unwrap_or_default())
    }
}
