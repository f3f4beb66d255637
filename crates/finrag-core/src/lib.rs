//! Core types and pure logic for the financial retrieval engine: records and
//! chunks, the chunker, the document formatter, the confidence transform,
//! configuration and the `Embedder`/`VectorIndex` seams.

pub mod chunker;
pub mod confidence;
pub mod config;
pub mod error;
pub mod formatter;
pub mod traits;
pub mod types;

pub use chunker::{Chunker, ChunkingConfig};
pub use confidence::{to_confidence, ConfidenceCalibration};
pub use error::{Error, Result};
pub use formatter::{format, DataType, FinancialItem};
pub use types::{AggregatedResult, Chunk, IndexReport, Metadata, Record, ScoredHit};
