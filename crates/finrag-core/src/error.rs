use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// A namespace that has never been written. Query paths treat this as an
    /// empty result rather than a failure.
    #[error("Namespace not found: {0}")]
    IndexNotFound(String),

    #[error("Failed to load namespace '{namespace}': {reason}")]
    LoadFailure { namespace: String, reason: String },

    #[error("Failed to persist namespace '{namespace}': {reason}")]
    PersistFailure { namespace: String, reason: String },

    #[error("Invalid record shape: {0}")]
    InvalidRecordShape(String),

    #[error("Invalid namespace name: '{0}'")]
    InvalidNamespace(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),
}

impl Error {
    pub fn load(namespace: &str, reason: impl ToString) -> Self {
        Self::LoadFailure { namespace: namespace.to_string(), reason: reason.to_string() }
    }

    pub fn persist(namespace: &str, reason: impl ToString) -> Self {
        Self::PersistFailure { namespace: namespace.to_string(), reason: reason.to_string() }
    }

    /// Whether retrying the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::EmbeddingUnavailable(_) | Self::PersistFailure { .. } | Self::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
