//! Domain types shared by the formatter, the namespace index and the coordinator.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type ChunkId = String;
pub type Metadata = serde_json::Map<String, serde_json::Value>;

pub const DEFAULT_NAMESPACE: &str = "default";
const MAX_NAMESPACE_LEN: usize = 64;

/// A normalized unit of financial information ready for chunking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub content: String,
    pub metadata: Metadata,
}

impl Record {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self { content: content.into(), metadata }
    }
}

/// A bounded-length slice of a record that is independently embedded and stored.
///
/// - `id`: content hash of namespace, position and text; stable across re-indexing
/// - `metadata`: copy of the parent record's metadata
/// - `chunk_index`/`total_chunks`: position within the parent record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub namespace: String,
    pub content: String,
    pub metadata: Metadata,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

impl Chunk {
    pub fn new(namespace: &str, content: String, metadata: Metadata, chunk_index: usize, total_chunks: usize) -> Self {
        let id = chunk_id(namespace, chunk_index, &content);
        Self { id, namespace: namespace.to_string(), content, metadata, chunk_index, total_chunks }
    }
}

fn chunk_id(namespace: &str, chunk_index: usize, content: &str) -> ChunkId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(namespace.as_bytes());
    hasher.update(&[0]);
    hasher.update(&(chunk_index as u64).to_le_bytes());
    hasher.update(content.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// One retrieved passage. `score` is the backend's raw distance (lower is
/// better); `confidence` is its bounded 0..=100 transform (higher is better).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHit {
    pub content: String,
    pub metadata: Metadata,
    pub namespace: String,
    pub score: f32,
    pub confidence: f32,
}

/// Merged answer to a multi-namespace query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub results: Vec<ScoredHit>,
    pub avg_confidence: f32,
    pub below_threshold: bool,
    pub top_result: Option<ScoredHit>,
}

/// Outcome of one indexing request against a single namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexReport {
    pub namespace: String,
    pub records_received: usize,
    /// `(position in the input batch, reason)` for every record that was not indexed.
    pub records_skipped: Vec<(usize, String)>,
    pub chunks_indexed: usize,
    pub error: Option<String>,
}

impl IndexReport {
    pub fn new(namespace: &str, records_received: usize) -> Self {
        Self { namespace: namespace.to_string(), records_received, ..Self::default() }
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_partial(&self) -> bool {
        self.success() && !self.records_skipped.is_empty()
    }
}

/// Namespaces map one-to-one onto directories under the store root, so names
/// are restricted to a path-safe alphabet.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    let valid = !namespace.is_empty()
        && namespace.len() <= MAX_NAMESPACE_LEN
        && namespace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid { Ok(()) } else { Err(Error::InvalidNamespace(namespace.to_string())) }
}
