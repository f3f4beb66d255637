use async_trait::async_trait;

use crate::error::Result;
use crate::types::Chunk;

/// Maps text to fixed-length vectors. Implementations must be deterministic
/// for a given `id()`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hash:d1024`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.embed_batch(&[text.to_string()]).await?;
        out.pop().ok_or_else(|| crate::error::Error::EmbeddingUnavailable("embedder returned no vector".into()))
    }
}

/// Namespace-partitioned vector index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Builds the namespace on first write, appends afterwards. Returns the
    /// number of chunks stored.
    async fn create_or_append(&self, namespace: &str, chunks: &[Chunk], embedder: &dyn Embedder) -> Result<usize>;

    /// `k` nearest chunks ascending by raw distance. An unknown namespace yields
    /// an empty vector.
    async fn search(&self, namespace: &str, query_text: &str, embedder: &dyn Embedder, k: usize) -> Result<Vec<(Chunk, f32)>>;

    async fn namespaces(&self) -> Result<Vec<String>>;

    async fn count(&self, namespace: &str) -> Result<usize>;
}
