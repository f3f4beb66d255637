//! Shared plumbing for the `finrag` binaries.

use anyhow::Context;
use serde_json::Value;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use finrag_core::config::Settings;
use finrag_core::ScoredHit;

/// Logs go to stderr so stdout carries only command output.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

pub fn load_settings() -> anyhow::Result<Settings> {
    Settings::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        anyhow::Error::new(e)
    })
}

/// Data type for a file under `data_dir`: its parent directory relative to
/// `data_dir`, or the file stem for files directly in it.
pub fn infer_data_type(data_dir: &Path, file: &Path) -> Option<String> {
    let parent = file.parent()?;
    if let Ok(rel) = parent.strip_prefix(data_dir) {
        if let Some(first) = rel.components().next() {
            return Some(first.as_os_str().to_string_lossy().into_owned());
        }
    }
    file.file_stem().map(|s| s.to_string_lossy().into_owned())
}

/// A file holds either an array of items or one item.
pub fn read_items(file: &Path) -> anyhow::Result<Vec<Value>> {
    let raw = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let value: Value = serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;
    Ok(match value {
        Value::Array(items) => items,
        other => vec![other],
    })
}

pub fn print_hits(hits: &[ScoredHit]) {
    for (i, h) in hits.iter().enumerate() {
        println!("{}. [{}] confidence {:.1} (distance {:.4})", i + 1, h.namespace, h.confidence, h.score);
        for line in h.content.lines().filter(|l| !l.trim().is_empty()) {
            println!("   {line}");
        }
    }
}
