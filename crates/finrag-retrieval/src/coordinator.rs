use futures::future::join_all;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use finrag_core::config::{RetrievalSettings, Settings};
use finrag_core::traits::{Embedder, VectorIndex};
use finrag_core::types::validate_namespace;
use finrag_core::{
    format, AggregatedResult, Chunker, ConfidenceCalibration, DataType, Error, FinancialItem, IndexReport, Record, Result, ScoredHit,
};
use finrag_embed::get_default_embedder;
use finrag_vector::LanceNamespaceIndex;

use crate::aggregate::aggregate;

const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Owns the namespace index and the embedder; formats, chunks and indexes
/// records, and answers single and multi-namespace queries.
pub struct RetrievalCoordinator {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    calibration: ConfidenceCalibration,
    retrieval: RetrievalSettings,
}

impl RetrievalCoordinator {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>, settings: &Settings) -> Result<Self> {
        Ok(Self {
            index,
            embedder,
            chunker: Chunker::new(settings.chunking)?,
            calibration: settings.calibration()?,
            retrieval: settings.retrieval.clone(),
        })
    }

    /// Validates `settings`, then opens the LanceDB store and the configured
    /// embedding provider.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let index = LanceNamespaceIndex::open(&settings.store_root())
            .await?
            .with_call_timeout(Duration::from_millis(settings.retrieval.namespace_timeout_ms));
        let embedder = get_default_embedder(&settings.embedding)?;
        Self::new(Arc::new(index), embedder, settings)
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.retrieval
    }

    pub fn vector_index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.retrieval.namespace_timeout_ms)
    }

    /// Worst case for one namespace in [`Self::query`]: every attempt runs to
    /// the timeout and every backoff is slept.
    fn query_budget(&self) -> Duration {
        let retries = self.retrieval.max_retries;
        let backoff: u32 = (1..=retries).sum();
        self.timeout() * (retries + 1) + RETRY_BACKOFF * backoff
    }

    /// Runs `op`, retrying transient failures up to `max_retries` times with
    /// linear backoff. With `limit`, each attempt is bounded by it.
    async fn with_retries<T, F, Fut>(&self, what: &str, namespace: &str, limit: Option<Duration>, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            let outcome = match limit {
                Some(limit) => match tokio::time::timeout(limit, op()).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout(self.retrieval.namespace_timeout_ms)),
                },
                None => op().await,
            };
            match outcome {
                Err(e) if e.is_transient() && attempt < self.retrieval.max_retries => {
                    attempt += 1;
                    tracing::warn!(what, namespace, attempt, error = %e, "transient failure, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                other => return other,
            }
        }
    }

    /// Chunks, embeds and stores `records` in `namespace`.
    pub async fn index(&self, records: Vec<Record>, namespace: &str) -> IndexReport {
        let report = IndexReport::new(namespace, records.len());
        self.index_positioned(records.into_iter().enumerate().collect(), namespace, report).await
    }

    async fn index_positioned(&self, records: Vec<(usize, Record)>, namespace: &str, mut report: IndexReport) -> IndexReport {
        if let Err(e) = validate_namespace(namespace) {
            tracing::error!(namespace, error = %e, "indexing rejected");
            report.error = Some(e.to_string());
            return report;
        }
        let mut chunks = Vec::new();
        for (pos, record) in &records {
            let pieces = self.chunker.chunk_record(record, namespace);
            if pieces.is_empty() {
                tracing::warn!(namespace, position = pos, "record has no content, skipped");
                report.records_skipped.push((*pos, "empty content".to_string()));
            }
            chunks.extend(pieces);
        }
        report.records_skipped.sort_by_key(|(pos, _)| *pos);
        if chunks.is_empty() {
            if report.records_received > 0 {
                let e = format!("none of {} records could be indexed", report.records_received);
                tracing::error!(namespace, skipped = report.records_skipped.len(), "{e}");
                report.error = Some(e);
            } else {
                tracing::info!(namespace, "nothing to index");
            }
            return report;
        }

        // The index bounds each embedding request and write on its own, so a
        // large batch is not held to a single timeout window.
        let stored = self
            .with_retries("index", namespace, None, || self.index.create_or_append(namespace, &chunks, self.embedder.as_ref()))
            .await;
        match stored {
            Ok(n) => {
                report.chunks_indexed = n;
                tracing::info!(namespace, records = report.records_received, chunks = n, skipped = report.records_skipped.len(), "indexed");
            }
            Err(e) => {
                tracing::error!(namespace, chunks = chunks.len(), error = %e, "indexing failed");
                report.error = Some(e.to_string());
            }
        }
        report
    }

    /// Formats raw JSON items of `data_type` and indexes them into the
    /// namespace of the same name. Malformed items are skipped and listed.
    pub async fn index_financial_data_report(&self, items: Vec<Value>, data_type: &DataType) -> IndexReport {
        let namespace = data_type.namespace();
        let mut report = IndexReport::new(namespace, items.len());
        let mut records = Vec::with_capacity(items.len());
        for (pos, value) in items.into_iter().enumerate() {
            match FinancialItem::from_json(data_type, value) {
                Ok(item) => records.push((pos, format(&item, data_type))),
                Err(e) => {
                    tracing::warn!(namespace, position = pos, error = %e, "malformed item skipped");
                    report.records_skipped.push((pos, e.to_string()));
                }
            }
        }
        self.index_positioned(records, namespace, report).await
    }

    /// Boolean form of [`Self::index_financial_data_report`].
    pub async fn index_financial_data(&self, items: Vec<Value>, data_type: &str) -> bool {
        self.index_financial_data_report(items, &DataType::from(data_type)).await.success()
    }

    /// Top-`k` hits from one namespace. A namespace that was never written
    /// yields no hits.
    pub async fn query(&self, query_text: &str, namespace: &str, k: usize) -> Result<Vec<ScoredHit>> {
        validate_namespace(namespace)?;
        let found = self
            .with_retries("search", namespace, Some(self.timeout()), || self.index.search(namespace, query_text, self.embedder.as_ref(), k))
            .await;
        let hits = match found {
            Ok(hits) => hits,
            Err(Error::IndexNotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };
        tracing::debug!(namespace, k, hits = hits.len(), "namespace searched");
        Ok(hits
            .into_iter()
            .map(|(chunk, score)| ScoredHit {
                content: chunk.content,
                metadata: chunk.metadata,
                namespace: namespace.to_string(),
                score,
                confidence: self.calibration.to_confidence(score),
            })
            .collect())
    }

    /// Like [`Self::query`] but a failure is logged and reported as no hits.
    pub async fn retrieve(&self, query_text: &str, namespace: &str, k: usize) -> Vec<ScoredHit> {
        match self.query(query_text, namespace, k).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(namespace, error = %e, "retrieval failed");
                Vec::new()
            }
        }
    }

    /// Queries every distinct namespace concurrently on the caller's task and
    /// merges the hits. A namespace that fails or runs out of its time budget
    /// (retries included) contributes nothing.
    pub async fn query_many<S: AsRef<str>>(&self, query_text: &str, namespaces: &[S], per_namespace_k: usize, threshold: f32) -> AggregatedResult {
        let limit = self.query_budget();
        let mut distinct: Vec<&str> = Vec::with_capacity(namespaces.len());
        for ns in namespaces {
            if !distinct.contains(&ns.as_ref()) {
                distinct.push(ns.as_ref());
            }
        }
        let searches = distinct.iter().map(|&ns| {
            async move {
                match tokio::time::timeout(limit, self.query(query_text, ns, per_namespace_k)).await {
                    Ok(Ok(hits)) => hits,
                    Ok(Err(e)) => {
                        tracing::warn!(namespace = ns, error = %e, "namespace dropped from aggregate");
                        Vec::new()
                    }
                    Err(_) => {
                        tracing::warn!(namespace = ns, budget_ms = limit.as_millis() as u64, "namespace timed out");
                        Vec::new()
                    }
                }
            }
        });
        // join_all keeps input order, so hits stay grouped by namespace then rank.
        let hits: Vec<ScoredHit> = join_all(searches).await.into_iter().flatten().collect();
        let result = aggregate(hits, threshold);
        tracing::info!(
            namespaces = distinct.len(),
            kept = result.results.len(),
            avg_confidence = result.avg_confidence,
            below_threshold = result.below_threshold,
            "aggregated query"
        );
        result
    }

    pub async fn retrieve_aggregated<S: AsRef<str>>(&self, query_text: &str, namespaces: &[S], threshold: f32) -> AggregatedResult {
        self.query_many(query_text, namespaces, self.retrieval.per_namespace_k, threshold).await
    }

    /// Aggregated query over the configured market namespaces.
    pub async fn retrieve_market_overview(&self, query_text: &str, threshold: Option<f32>) -> AggregatedResult {
        let threshold = threshold.unwrap_or(self.retrieval.confidence_threshold);
        self.retrieve_aggregated(query_text, &self.retrieval.namespaces, threshold).await
    }
}
