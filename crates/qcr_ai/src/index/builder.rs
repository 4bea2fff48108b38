use std::collections::HashSet;
use std::path::Path;

use qcr_core::config::Settings;
use qcr_core::domain::{Chunk, Document};
use qcr_core::error::AppError;
use qcr_core::ingest::DocumentLoader;

use super::model::{BuildReport, DistanceMetric, IndexStatus, IndexedChunk, UpdateMode, UpdateReport};
use super::store::VectorIndex;
use crate::chunking::Chunker;
use crate::embeddings::Embedder;

/// Chunks documents, embeds them in batches and persists the resulting index.
pub struct IndexBuilder<'a> {
    embedder: &'a dyn Embedder,
    model: String,
    chunker: Chunker,
    metric: DistanceMetric,
    batch_size: usize,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(embedder: &'a dyn Embedder, model: impl Into<String>, chunker: Chunker) -> Self {
        Self {
            embedder,
            model: model.into(),
            chunker,
            metric: DistanceMetric::default(),
            batch_size: 64,
        }
    }

    pub fn from_settings(embedder: &'a dyn Embedder, settings: &Settings) -> Result<Self, AppError> {
        let chunker = Chunker::from_config(&settings.chunking)?;
        Ok(Self::new(embedder, settings.embedding_model.clone(), chunker)
            .with_batch_size(settings.embed_batch_size))
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build(&self, documents: &[Document]) -> Result<VectorIndex, AppError> {
        if documents.is_empty() {
            return Err(AppError::new("INDEX_EMPTY_INPUT", "No documents to index"));
        }
        self.build_from_chunks(self.chunker.split_documents(documents))
    }

    pub fn build_from_chunks(&self, chunks: Vec<Chunk>) -> Result<VectorIndex, AppError> {
        if chunks.is_empty() {
            return Err(AppError::new("INDEX_EMPTY_INPUT", "No chunks to index")
                .with_details("every document was blank"));
        }
        let mut index = VectorIndex::new(self.model.clone(), self.metric);
        let entries = chunks.iter().map(IndexedChunk::from_chunk).collect();
        self.embed_into(&mut index, entries)?;
        index.set_updated_at(crate::now_rfc3339());
        tracing::info!(chunks = index.len(), dims = ?index.dims(), "built vector index");
        Ok(index)
    }

    fn embed_into(&self, index: &mut VectorIndex, entries: Vec<IndexedChunk>) -> Result<usize, AppError> {
        let total = entries.len();
        let mut added = 0usize;
        let mut pending = entries.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<IndexedChunk> = pending.by_ref().take(self.batch_size).collect();
            let inputs: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embedder.embed_batch(&self.model, &inputs)?;
            if vectors.len() != batch.len() {
                return Err(AppError::new("EMBEDDINGS_FAILED", "Embedder returned the wrong number of vectors")
                    .with_details(format!("expected={}; got={}", batch.len(), vectors.len())));
            }
            for (chunk, vector) in batch.into_iter().zip(vectors) {
                index.add(chunk, vector)?;
                added += 1;
            }
            tracing::debug!(embedded = added, total, "embedding progress");
        }
        Ok(added)
    }

    pub fn save(&self, index: &VectorIndex, path: &Path) -> Result<(), AppError> {
        index.save(path)
    }

    /// Load a saved index; `None` when it is missing or cannot be read.
    pub fn load(&self, path: &Path) -> Option<VectorIndex> {
        load_index(path)
    }

    /// Add new documents to the index at `path`, building it when absent.
    pub fn update(&self, path: &Path, documents: &[Document], mode: UpdateMode) -> Result<UpdateReport, AppError> {
        let Some(mut index) = self.load(path) else {
            tracing::info!(path = %path.display(), "no existing index; building a new one");
            let index = self.build(documents)?;
            index.save(path)?;
            return Ok(UpdateReport {
                created: true,
                documents: documents.len(),
                chunks_added: index.len(),
                chunks_skipped: 0,
                total_chunks: index.len(),
            });
        };

        if index.model() != self.model {
            return Err(AppError::new(
                "INDEX_INCOMPATIBLE",
                "Existing index was built with a different embedding model; rebuild it",
            )
            .with_details(format!("index_model={}; configured_model={}", index.model(), self.model)));
        }

        let candidates: Vec<IndexedChunk> = self
            .chunker
            .split_documents(documents)
            .iter()
            .map(IndexedChunk::from_chunk)
            .collect();
        let (fresh, skipped) = match mode {
            UpdateMode::Append => (candidates, 0),
            UpdateMode::Deduplicate => {
                // Only ids already stored count; repeats inside the batch are kept, as `build` keeps them.
                let existing: HashSet<&str> = index.chunks().iter().map(|c| c.chunk_id.as_str()).collect();
                let before = candidates.len();
                let fresh: Vec<IndexedChunk> = candidates
                    .into_iter()
                    .filter(|c| !existing.contains(c.chunk_id.as_str()))
                    .collect();
                let skipped = before - fresh.len();
                (fresh, skipped)
            }
        };

        let added = self.embed_into(&mut index, fresh)?;
        if added > 0 {
            index.set_updated_at(crate::now_rfc3339());
            index.save(path)?;
        }
        tracing::info!(added, skipped, total = index.len(), "updated vector index");
        Ok(UpdateReport {
            created: false,
            documents: documents.len(),
            chunks_added: added,
            chunks_skipped: skipped,
            total_chunks: index.len(),
        })
    }
}

pub fn load_index(path: &Path) -> Option<VectorIndex> {
    match VectorIndex::open(path) {
        Ok(index) => {
            tracing::info!(path = %path.display(), chunks = index.len(), "loaded vector index");
            Some(index)
        }
        Err(e) if e.code == "INDEX_NOT_FOUND" => {
            tracing::warn!("no vector index at {}", path.display());
            None
        }
        Err(e) => {
            tracing::warn!(code = %e.code, details = ?e.details, "failed to load vector index: {}", e.message);
            None
        }
    }
}

/// Load every supported file under `data_folder`, build an index and save it to `index_path`.
pub fn build_index_from_folder(
    builder: &IndexBuilder<'_>,
    data_folder: &Path,
    index_path: &Path,
    pdftotext_bin: &str,
) -> Result<BuildReport, AppError> {
    if !data_folder.is_dir() {
        return Err(AppError::new("DATA_FOLDER_NOT_FOUND", "Data folder does not exist")
            .with_details(format!("path={}", data_folder.display())));
    }
    let report = DocumentLoader::new(data_folder)
        .with_pdftotext(pdftotext_bin)
        .load_all_with_report();
    if report.documents.is_empty() {
        return Err(AppError::new("INDEX_EMPTY_INPUT", "No documents were loaded from the data folder")
            .with_details(format!(
                "path={}; failed_files={}; skipped_files={}",
                data_folder.display(),
                report.failures.len(),
                report.skipped_files
            )));
    }

    let index = builder.build(&report.documents)?;
    index.save(index_path)?;
    Ok(BuildReport {
        files_loaded: report.loaded_files,
        files_failed: report.failures.len(),
        documents: report.documents.len(),
        chunks: index.len(),
        index_path: index_path.to_path_buf(),
    })
}

pub fn index_status(path: &Path) -> IndexStatus {
    match VectorIndex::open(path) {
        Ok(index) => {
            let m = index.manifest();
            IndexStatus {
                ready: true,
                path: path.display().to_string(),
                model: Some(m.model),
                metric: Some(m.metric),
                dims: Some(m.dims),
                chunk_count: m.chunk_count,
                updated_at: m.updated_at,
            }
        }
        Err(_) => IndexStatus {
            ready: false,
            path: path.display().to_string(),
            model: None,
            metric: None,
            dims: None,
            chunk_count: 0,
            updated_at: None,
        },
    }
}
