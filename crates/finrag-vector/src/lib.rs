//! LanceDB-backed namespace index.
//!
//! Each namespace is one Lance table under the store root. Writes to a
//! namespace are serialized by a per-namespace lock and land as a single
//! commit, so a crash mid-write leaves the previous version readable.

use async_trait::async_trait;
use lancedb::{Connection, Table};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use finrag_core::traits::{Embedder, VectorIndex};
use finrag_core::types::validate_namespace;
use finrag_core::{Chunk, Error, Result};

pub mod registry;
pub mod schema;
mod search;
pub mod table;
mod writer;

use registry::NamespaceRegistry;
use schema::vector_dim;

/// Texts sent to the embedder per request while indexing.
const EMBED_BATCH: usize = 64;

pub struct LanceNamespaceIndex {
    root: PathBuf,
    conn: Connection,
    registry: NamespaceRegistry,
    embed_batch: usize,
    call_timeout: Option<Duration>,
}

impl LanceNamespaceIndex {
    /// Opens (creating if needed) the store rooted at `root`.
    pub async fn open(root: &Path) -> Result<Self> {
        let conn = table::open_db(root).await?;
        tracing::debug!(root = %root.display(), "opened vector store");
        Ok(Self { root: root.to_path_buf(), conn, registry: NamespaceRegistry::default(), embed_batch: EMBED_BATCH, call_timeout: None })
    }

    pub fn with_embed_batch(mut self, size: usize) -> Self {
        self.embed_batch = size.max(1);
        self
    }

    /// Bounds every embedding request and every table write individually.
    pub fn with_call_timeout(mut self, limit: Duration) -> Self {
        self.call_timeout = Some(limit);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or(Err(Error::Timeout(limit.as_millis() as u64))),
            None => call.await,
        }
    }

    async fn table(&self, namespace: &str) -> Result<Option<Table>> {
        let handle = self.registry.handle(namespace);
        if let Some(t) = handle.cached_table().await {
            return Ok(Some(t));
        }
        let opened = table::open_table_if_exists(&self.conn, namespace).await?;
        if let Some(t) = &opened {
            handle.cache(t.clone()).await;
        }
        Ok(opened)
    }

    async fn embed_chunks(&self, namespace: &str, chunks: &[Chunk], embedder: &dyn Embedder) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.embed_batch) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embedded = self.bounded(embedder.embed_batch(&texts)).await?;
            if embedded.len() != texts.len() {
                return Err(Error::EmbeddingUnavailable(format!(
                    "{} returned {} vectors for {} texts",
                    embedder.id(),
                    embedded.len(),
                    texts.len()
                )));
            }
            vectors.extend(embedded);
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != embedder.dim()) {
            return Err(Error::persist(namespace, format!("embedder {} produced dim {} (declared {})", embedder.id(), bad.len(), embedder.dim())));
        }
        Ok(vectors)
    }
}

#[async_trait]
impl VectorIndex for LanceNamespaceIndex {
    async fn create_or_append(&self, namespace: &str, chunks: &[Chunk], embedder: &dyn Embedder) -> Result<usize> {
        validate_namespace(namespace)?;
        if chunks.is_empty() {
            return Ok(0);
        }
        // Embedding happens outside the writer lock; only the commit is serialized.
        let vectors = self.embed_chunks(namespace, chunks, embedder).await?;
        let batch = writer::chunks_to_record_batch(chunks, &vectors, embedder.dim() as i32)?;

        let handle = self.registry.handle(namespace);
        let _guard = handle.write_lock.lock().await;
        self.bounded(writer::write_locked(&self.conn, &handle, namespace, batch)).await?;
        Ok(chunks.len())
    }

    async fn search(&self, namespace: &str, query_text: &str, embedder: &dyn Embedder, k: usize) -> Result<Vec<(Chunk, f32)>> {
        validate_namespace(namespace)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let Some(table) = self.table(namespace).await? else {
            tracing::debug!(namespace, "search on missing namespace");
            return Ok(Vec::new());
        };
        let stored = table.schema().await.map_err(|e| Error::load(namespace, e))?;
        let query_vec = embedder.embed_query(query_text).await?;
        if vector_dim(&stored) != Some(query_vec.len() as i32) {
            return Err(Error::load(
                namespace,
                format!("query dim {} does not match stored dim {:?}", query_vec.len(), vector_dim(&stored)),
            ));
        }
        search::nearest(&table, namespace, query_vec, k).await
    }

    async fn namespaces(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> =
            table::table_names(&self.conn).await?.into_iter().filter(|n| validate_namespace(n).is_ok()).collect();
        names.sort();
        Ok(names)
    }

    async fn count(&self, namespace: &str) -> Result<usize> {
        validate_namespace(namespace)?;
        match self.table(namespace).await? {
            Some(t) => t.count_rows(None).await.map_err(|e| Error::load(namespace, e)),
            None => Ok(0),
        }
    }
}
