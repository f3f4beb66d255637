//! Overlapping, boundary-preferring text splitter.
//!
//! Lengths are counted in `char`s. Each chunk after the first starts exactly
//! `chunk_overlap` characters before the end of its predecessor, so dropping
//! the first `chunk_overlap` characters of every later chunk and concatenating
//! reproduces the input.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Chunk, Record};

const PARAGRAPH: &[&str] = &["\n\n"];
const SENTENCE: &[&str] = &[". ", "! ", "? ", "\n"];
const WORD: &[&str] = &[" ", "\t"];
const SEPARATOR_LEVELS: &[&[&str]] = &[PARAGRAPH, SENTENCE, WORD];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn split(&self, content: &str) -> Vec<String> {
        if content.is_empty() {
            return Vec::new();
        }
        // bounds[i] is the byte offset of char i; bounds[n] == content.len()
        let bounds: Vec<usize> = content.char_indices().map(|(i, _)| i).chain(std::iter::once(content.len())).collect();
        let n = bounds.len() - 1;
        let ChunkingConfig { chunk_size, chunk_overlap } = self.config;

        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            if n - start <= chunk_size {
                chunks.push(content[bounds[start]..].to_string());
                break;
            }
            let end = find_cut(content, &bounds, start, start + chunk_overlap + 1, start + chunk_size);
            chunks.push(content[bounds[start]..bounds[end]].to_string());
            start = end - chunk_overlap;
        }
        chunks
    }

    /// Splits a record into chunks bound for `namespace`, each carrying a copy
    /// of the record's metadata.
    pub fn chunk_record(&self, record: &Record, namespace: &str) -> Vec<Chunk> {
        let pieces = self.split(&record.content);
        let total = pieces.len();
        pieces
            .into_iter()
            .enumerate()
            .map(|(i, content)| Chunk::new(namespace, content, record.metadata.clone(), i, total))
            .collect()
    }
}

/// Picks the char index to end a chunk at, within `min_end..=max_end`. Cuts
/// land just after the last separator of the coarsest level that has one in
/// range, or at `max_end` when none does.
fn find_cut(text: &str, bounds: &[usize], start: usize, min_end: usize, max_end: usize) -> usize {
    let base = bounds[start];
    let window = &text[base..bounds[max_end]];
    for level in SEPARATOR_LEVELS {
        let last = level.iter().filter_map(|sep| window.rfind(sep).map(|p| base + p + sep.len())).max();
        if let Some(byte_end) = last {
            if let Ok(end) = bounds.binary_search(&byte_end) {
                if end >= min_end {
                    return end;
                }
            }
        }
    }
    max_end
}
