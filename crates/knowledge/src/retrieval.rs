//! Retrieval orchestration.
//!
//! Queries every active document in parallel and merges the fragments into
//! one ranked list. Document calls run with bounded concurrency and a
//! per-call timeout. A failing document is logged and skipped; only listing
//! failures and an empty active set abort the query.

use crate::gateway::{list_all_documents, DocumentIndex};
use crate::types::{DocumentRef, Query, RetrievalResult, ScoredText};
use askstore_core::config::RetrievalSettings;
use askstore_core::{AppError, AppResult, Fragment};
use futures::stream::{self, StreamExt};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default number of document queries in flight.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Default per-document timeout.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Fans a query out over the store's active documents.
pub struct RetrievalOrchestrator {
    index: Arc<dyn DocumentIndex>,
    max_concurrency: usize,
    timeout: Duration,
}

impl RetrievalOrchestrator {
    pub fn new(index: Arc<dyn DocumentIndex>) -> Self {
        Self {
            index,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Build an orchestrator using the configured concurrency cap and timeout.
    pub fn from_settings(index: Arc<dyn DocumentIndex>, settings: &RetrievalSettings) -> Self {
        Self::new(index)
            .with_max_concurrency(settings.max_concurrency)
            .with_timeout(Duration::from_secs(settings.timeout_secs))
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `query` against one document or every active document.
    ///
    /// With a target document exactly one document query is made and its
    /// fragments are returned in index order. Otherwise fragments from all
    /// active documents are sorted by descending score (ties keep document
    /// order, then index order) and cut to `results_count`.
    pub async fn retrieve(&self, query: &Query) -> AppResult<RetrievalResult> {
        match query.target_document() {
            Some(document) => self.retrieve_single(query, document).await,
            None => self.retrieve_all(query).await,
        }
    }

    /// No listing is made here, so fragments carry the requested resource
    /// name as their source rather than a display name.
    #[instrument(skip(self, query), fields(results_count = query.results_count()))]
    async fn retrieve_single(&self, query: &Query, document: &str) -> AppResult<RetrievalResult> {
        info!("Querying single document {}", document);

        let fragments = self
            .query_with_timeout(document, query)
            .await?
            .into_iter()
            .map(|scored| scored.into_fragment(document))
            .collect();

        Ok(RetrievalResult {
            query: query.text().to_string(),
            fragments,
            documents_searched: 1,
        })
    }

    #[instrument(skip(self, query), fields(results_count = query.results_count()))]
    async fn retrieve_all(&self, query: &Query) -> AppResult<RetrievalResult> {
        let active: Vec<DocumentRef> = list_all_documents(self.index.as_ref())
            .await?
            .into_iter()
            .filter(DocumentRef::is_active)
            .collect();

        if active.is_empty() {
            return Err(AppError::NoActiveDocuments);
        }

        let total = active.len();
        let concurrency = self.max_concurrency.min(total);
        info!(
            "Querying {} active documents ({} at a time)",
            total, concurrency
        );

        // `buffered` yields in input order, so merging is independent of
        // which call finishes first.
        let outcomes: Vec<(DocumentRef, AppResult<Vec<ScoredText>>)> = stream::iter(active)
            .map(|document| async move {
                let outcome = self.query_with_timeout(&document.name, query).await;
                (document, outcome)
            })
            .buffered(concurrency)
            .collect()
            .await;

        let (fragments, documents_searched) = outcomes.into_iter().fold(
            (Vec::new(), 0usize),
            |(mut fragments, searched), (document, outcome)| match outcome {
                Ok(scored) => {
                    debug!("{} returned {} fragments", document.label(), scored.len());
                    fragments.extend(
                        scored
                            .into_iter()
                            .map(|s| s.into_fragment(document.label())),
                    );
                    (fragments, searched + 1)
                }
                Err(e) => {
                    warn!("Skipping document {}: {}", document.label(), e);
                    (fragments, searched)
                }
            },
        );

        let fragments = merge_ranked(fragments, query.results_count() as usize);

        info!(
            "Retrieved {} fragments from {}/{} documents",
            fragments.len(),
            documents_searched,
            total
        );

        Ok(RetrievalResult {
            query: query.text().to_string(),
            fragments,
            documents_searched,
        })
    }

    async fn query_with_timeout(&self, document: &str, query: &Query) -> AppResult<Vec<ScoredText>> {
        let call = self
            .index
            .query_document(document, query.text(), query.results_count());

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::upstream(
                "Document query",
                None,
                format!("timed out after {:?}", self.timeout),
            )
            .for_document(document)),
        }
    }
}

/// NaN scores rank below every real score.
fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

/// Sort by descending relevance, keeping arrival order for ties, and keep `limit`.
pub fn merge_ranked(mut fragments: Vec<Fragment>, limit: usize) -> Vec<Fragment> {
    fragments.sort_by(|a, b| {
        rank_key(b.relevance_score)
            .partial_cmp(&rank_key(a.relevance_score))
            .unwrap_or(Ordering::Equal)
    });
    fragments.truncate(limit);
    fragments
}
