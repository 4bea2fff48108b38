use std::path::PathBuf;

use qcr_core::domain::{meta_or, Chunk, Metadata, META_FILE_TYPE, META_SOURCE_FILE, META_SOURCE_PATH, UNKNOWN};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared Euclidean distance.
    #[default]
    L2,
    /// `1 - cosine similarity`.
    Cosine,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L2 => "l2",
            Self::Cosine => "cosine",
        }
    }
}

/// A chunk as stored in the docstore sidecar, in vector order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedChunk {
    pub chunk_id: String,
    pub content: String,
    pub metadata: Metadata,
    pub text_sha256: String,
}

impl IndexedChunk {
    pub fn from_chunk(chunk: &Chunk) -> Self {
        let text_sha256 = sha256_hex(chunk.content.as_bytes());
        let chunk_id = chunk_id_for(chunk.source_path(), &text_sha256);
        Self {
            chunk_id,
            content: chunk.content.clone(),
            metadata: chunk.metadata.clone(),
            text_sha256,
        }
    }

    pub fn source_file(&self) -> &str {
        meta_or(&self.metadata, META_SOURCE_FILE, UNKNOWN)
    }

    pub fn source_path(&self) -> &str {
        meta_or(&self.metadata, META_SOURCE_PATH, "")
    }

    pub fn file_type(&self) -> &str {
        meta_or(&self.metadata, META_FILE_TYPE, UNKNOWN)
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Stable id: same file path and same chunk text always give the same id.
pub fn chunk_id_for(source_path: &str, text_sha256: &str) -> String {
    sha256_hex(format!("v1|{source_path}|{text_sha256}").as_bytes())
}

/// Written last on save; its presence marks a complete index directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexManifest {
    pub format_version: u32,
    pub model: String,
    pub metric: DistanceMetric,
    pub dims: u32,
    pub chunk_count: u32,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStatus {
    pub ready: bool,
    pub path: String,
    pub model: Option<String>,
    pub metric: Option<DistanceMetric>,
    pub dims: Option<u32>,
    pub chunk_count: u32,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: IndexedChunk,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateMode {
    /// Skip chunks whose id is already in the index.
    #[default]
    Deduplicate,
    /// Append every chunk, duplicates included.
    Append,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateReport {
    /// True when no index existed and a fresh one was built.
    pub created: bool,
    pub documents: usize,
    pub chunks_added: usize,
    pub chunks_skipped: usize,
    pub total_chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildReport {
    pub files_loaded: usize,
    pub files_failed: usize,
    pub documents: usize,
    pub chunks: usize,
    pub index_path: PathBuf,
}
