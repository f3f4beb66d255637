use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::confidence::ConfidenceCalibration;
use crate::error::{Error, Result};
use crate::types::validate_namespace;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// Typed settings with legacy environment overrides applied
    /// (`VECTOR_STORE_PATH`, `OPENAI_API_KEY`, `APP_USE_FAKE_EMBEDDINGS`).
    pub fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if let Ok(root) = env::var("VECTOR_STORE_PATH") {
            settings.store.root = root;
        }
        if settings.embedding.api_key.is_none() {
            settings.embedding.api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty());
        }
        if use_fake_embeddings() {
            settings.embedding.provider = EmbeddingProvider::Hash;
        }
        Ok(settings)
    }
}

pub fn use_fake_embeddings() -> bool {
    env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub root: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { root: "./vector_store".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub default_k: usize,
    pub per_namespace_k: usize,
    pub confidence_threshold: f32,
    pub confidence_divisor: f32,
    pub namespace_timeout_ms: u64,
    pub max_retries: u32,
    pub namespaces: Vec<String>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            default_k: 5,
            per_namespace_k: 3,
            confidence_threshold: 70.0,
            confidence_divisor: crate::confidence::DEFAULT_DIVISOR,
            namespace_timeout_ms: 10_000,
            max_retries: 1,
            namespaces: ["news", "earnings", "stock_data", "sentiment"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Hash,
    OpenAi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub dim: usize,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAi,
            dim: 1024,
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            request_timeout_ms: 30_000,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings = Config::load()?.settings()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Store root resolved against the current directory.
    pub fn store_root(&self) -> PathBuf {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        resolve_with_base(&cwd, &self.store.root)
    }

    pub fn calibration(&self) -> Result<ConfidenceCalibration> {
        ConfidenceCalibration::new(self.retrieval.confidence_divisor).ok_or_else(|| {
            Error::InvalidConfig(format!("retrieval.confidence_divisor must be positive, got {}", self.retrieval.confidence_divisor))
        })
    }

    /// Startup checks. Everything rejected here is fatal; runtime failures are
    /// reported per request instead.
    pub fn validate(&self) -> Result<()> {
        if self.store.root.trim().is_empty() {
            return Err(Error::InvalidConfig("store.root must not be empty".into()));
        }
        let root = self.store_root();
        if root.exists() && !root.is_dir() {
            return Err(Error::InvalidConfig(format!("store.root {} exists and is not a directory", root.display())));
        }
        self.chunking.validate()?;
        self.calibration()?;
        if self.retrieval.default_k == 0 || self.retrieval.per_namespace_k == 0 {
            return Err(Error::InvalidConfig("retrieval.default_k and retrieval.per_namespace_k must be positive".into()));
        }
        if !self.retrieval.confidence_threshold.is_finite() {
            return Err(Error::InvalidConfig("retrieval.confidence_threshold must be finite".into()));
        }
        if self.retrieval.namespace_timeout_ms == 0 {
            return Err(Error::InvalidConfig("retrieval.namespace_timeout_ms must be positive".into()));
        }
        for ns in &self.retrieval.namespaces {
            validate_namespace(ns).map_err(|e| Error::InvalidConfig(format!("retrieval.namespaces: {e}")))?;
        }
        if self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be positive".into()));
        }
        if self.embedding.provider == EmbeddingProvider::OpenAi && self.embedding.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(Error::InvalidConfig("embedding.provider = \"openai\" requires embedding.api_key or OPENAI_API_KEY".into()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
