//! Embedding providers behind `finrag_core::traits::Embedder`.
//!
//! The hash provider is deterministic and offline (tests, development);
//! the OpenAI provider calls a remote embedding service.

use std::sync::Arc;

use finrag_core::config::{EmbeddingProvider, EmbeddingSettings};
use finrag_core::traits::Embedder;
use finrag_core::{Error, Result};

pub mod hash;
pub mod openai;

pub use hash::HashEmbedder;
pub use openai::OpenAiEmbedder;

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.dim == 0 {
        return Err(Error::InvalidConfig("embedding.dim must be positive".into()));
    }
    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbeddingProvider::Hash => Arc::new(HashEmbedder::new(settings.dim)),
        EmbeddingProvider::OpenAi => Arc::new(OpenAiEmbedder::new(settings)?),
    };
    tracing::info!(embedder = embedder.id(), "embedding provider ready");
    Ok(embedder)
}
