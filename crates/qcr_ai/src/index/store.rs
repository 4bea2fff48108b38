use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use qcr_core::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::model::{DistanceMetric, IndexManifest, IndexedChunk, SearchHit, FORMAT_VERSION};
use crate::retrieve::similarity;

pub const VECTORS_FILE: &str = "index.bin";
pub const DOCSTORE_FILE: &str = "docstore.json";
pub const MANIFEST_FILE: &str = "index_status.json";

const MAGIC: &[u8; 4] = b"QCRV";
const HEADER_LEN: usize = 16;

/// Flat in-memory vector index with a chunk sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    model: String,
    metric: DistanceMetric,
    dims: Option<usize>,
    entries: Vec<IndexedChunk>,
    vectors: Vec<Vec<f32>>,
    updated_at: Option<String>,
}

impl VectorIndex {
    pub fn new(model: impl Into<String>, metric: DistanceMetric) -> Self {
        Self {
            model: model.into(),
            metric,
            dims: None,
            entries: Vec::new(),
            vectors: Vec::new(),
            updated_at: None,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn dims(&self) -> Option<usize> {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn chunks(&self) -> &[IndexedChunk] {
        &self.entries
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    pub fn set_updated_at(&mut self, ts: impl Into<String>) {
        self.updated_at = Some(ts.into());
    }

    pub fn contains(&self, chunk_id: &str) -> bool {
        self.entries.iter().any(|c| c.chunk_id == chunk_id)
    }

    pub fn add(&mut self, chunk: IndexedChunk, vector: Vec<f32>) -> Result<(), AppError> {
        if vector.is_empty() {
            return Err(AppError::new("EMBEDDINGS_FAILED", "Embedding vector is empty")
                .with_details(format!("chunk_id={}", chunk.chunk_id)));
        }
        match self.dims {
            Some(d) if d != vector.len() => {
                return Err(AppError::new("EMBEDDINGS_FAILED", "Embedding dims do not match index dims")
                    .with_details(format!("chunk_id={}; expected={d}; got={}", chunk.chunk_id, vector.len())));
            }
            Some(_) => {}
            None => self.dims = Some(vector.len()),
        }
        self.entries.push(chunk);
        self.vectors.push(vector);
        Ok(())
    }

    /// Exact nearest neighbours, ascending distance; ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, AppError> {
        let Some(dims) = self.dims else {
            return Ok(Vec::new());
        };
        if query.len() != dims {
            return Err(AppError::new("INDEX_INCOMPATIBLE", "Query embedding dims do not match index dims")
                .with_details(format!("index_dims={dims}; query_dims={}", query.len())));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_norm = similarity::l2_norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let d = match self.metric {
                    DistanceMetric::L2 => similarity::squared_l2(query, v),
                    DistanceMetric::Cosine => similarity::cosine_distance(query, v, query_norm, similarity::l2_norm(v)),
                };
                (i, d)
            })
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, distance)| SearchHit {
                chunk: self.entries[i].clone(),
                distance,
            })
            .collect())
    }

    pub fn manifest(&self) -> IndexManifest {
        IndexManifest {
            format_version: FORMAT_VERSION,
            model: self.model.clone(),
            metric: self.metric,
            dims: self.dims.unwrap_or(0) as u32,
            chunk_count: self.entries.len() as u32,
            updated_at: self.updated_at.clone(),
        }
    }

    /// Write vectors, docstore and manifest (in that order) into `dir`.
    pub fn save(&self, dir: &Path) -> Result<(), AppError> {
        fs::create_dir_all(dir).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", "Failed to create index directory")
                .with_details(format!("path={}; err={}", dir.display(), e))
        })?;
        let dims = self.dims.unwrap_or(0) as u32;
        write_atomic(&dir.join(VECTORS_FILE), &encode_vectors(dims, &self.vectors))?;
        write_json(&dir.join(DOCSTORE_FILE), &self.entries)?;
        write_json(&dir.join(MANIFEST_FILE), &self.manifest())?;
        tracing::info!(path = %dir.display(), chunks = self.entries.len(), "saved vector index");
        Ok(())
    }

    pub fn open(dir: &Path) -> Result<Self, AppError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(AppError::new("INDEX_NOT_FOUND", "No vector index at path")
                .with_details(format!("path={}", dir.display())));
        }
        let manifest: IndexManifest = read_json(&manifest_path)?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(incompatible(dir, format!("format_version={}", manifest.format_version)));
        }
        let entries: Vec<IndexedChunk> = read_json(&dir.join(DOCSTORE_FILE))?;
        let vectors_path = dir.join(VECTORS_FILE);
        let bytes = fs::read(&vectors_path).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", "Failed to read index vectors")
                .with_details(format!("path={}; err={}", vectors_path.display(), e))
        })?;
        let (dims, vectors) = decode_vectors(&bytes).map_err(|reason| incompatible(dir, reason))?;

        if dims != manifest.dims
            || vectors.len() != entries.len()
            || entries.len() != manifest.chunk_count as usize
        {
            return Err(incompatible(
                dir,
                format!(
                    "manifest dims={} count={}; vectors dims={dims} count={}; docstore count={}",
                    manifest.dims,
                    manifest.chunk_count,
                    vectors.len(),
                    entries.len()
                ),
            ));
        }

        Ok(Self {
            model: manifest.model,
            metric: manifest.metric,
            dims: if dims == 0 { None } else { Some(dims as usize) },
            entries,
            vectors,
            updated_at: manifest.updated_at,
        })
    }
}

fn incompatible(dir: &Path, reason: String) -> AppError {
    AppError::new("INDEX_INCOMPATIBLE", "Index files are unreadable or incompatible")
        .with_details(format!("path={}; {}", dir.display(), reason))
}

fn encode_vectors(dims: u32, vectors: &[Vec<f32>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + vectors.len() * dims as usize * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&dims.to_le_bytes());
    out.extend_from_slice(&(vectors.len() as u32).to_le_bytes());
    for v in vectors {
        for x in v {
            out.extend_from_slice(&x.to_le_bytes());
        }
    }
    out
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn decode_vectors(bytes: &[u8]) -> Result<(u32, Vec<Vec<f32>>), String> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err("vector file header is invalid".to_string());
    }
    let version = read_u32(bytes, 4);
    if version != FORMAT_VERSION {
        return Err(format!("vector format_version={version}"));
    }
    let dims = read_u32(bytes, 8) as usize;
    let count = read_u32(bytes, 12) as usize;
    let expected = dims
        .checked_mul(count)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(HEADER_LEN));
    if expected != Some(bytes.len()) {
        return Err(format!("vector file length={} does not match dims={dims} count={count}", bytes.len()));
    }

    let floats: Vec<f32> = bytes[HEADER_LEN..]
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let vectors = if dims == 0 {
        vec![Vec::new(); count]
    } else {
        floats.chunks_exact(dims).map(|c| c.to_vec()).collect()
    };
    Ok((dims as u32, vectors))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        AppError::new("INDEX_STORE_FAILED", "Failed to encode index file")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    write_atomic(path, json.as_bytes())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::new("INDEX_STORE_FAILED", "Failed to read index file")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::new("INDEX_INCOMPATIBLE", "Failed to decode index file")
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let tmp: PathBuf = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|e| {
        AppError::new("INDEX_STORE_FAILED", "Failed to write index file")
            .with_details(format!("path={}; err={}", tmp.display(), e))
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        AppError::new("INDEX_STORE_FAILED", "Failed to finalize index file write")
            .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_blob_roundtrips_bit_exact() {
        let vectors = vec![vec![0.1f32, -2.5, f32::MIN_POSITIVE], vec![3.0, 0.0, 1e-7]];
        let bytes = encode_vectors(3, &vectors);
        assert_eq!(bytes.len(), HEADER_LEN + 6 * 4);
        let (dims, got) = decode_vectors(&bytes).unwrap();
        assert_eq!(dims, 3);
        assert_eq!(got, vectors);
    }

    #[test]
    fn truncated_or_foreign_blobs_are_rejected() {
        let mut bytes = encode_vectors(2, &[vec![1.0, 2.0]]);
        bytes.pop();
        assert!(decode_vectors(&bytes).is_err());
        assert!(decode_vectors(b"FAISS index").is_err());
    }
}
