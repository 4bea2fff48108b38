use std::collections::HashSet;
use std::path::{Path, PathBuf};

use qcr_core::config::Settings;
use qcr_core::domain::Metadata;
use qcr_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::answer::{self, AnswerResponse};
use crate::embeddings::Embedder;
use crate::index::{load_index, sha256_hex, SearchHit, VectorIndex};
use crate::llm::Llm;

pub(crate) mod similarity;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarCase {
    pub content: String,
    pub metadata: Metadata,
    /// Distance to the query; smaller is more similar.
    pub similarity_score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelevantDocument {
    pub content: String,
    pub source_file: String,
    pub file_type: String,
    pub source_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordHit {
    pub content: String,
    pub metadata: Metadata,
    /// The first keyword whose results contained this content.
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub chat_model: String,
    pub answer_top_k: usize,
    pub preview_chars: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            chat_model: qcr_core::config::DEFAULT_CHAT_MODEL.to_string(),
            answer_top_k: 5,
            preview_chars: answer::PREVIEW_CHARS,
        }
    }
}

impl QueryOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            chat_model: settings.chat_model.clone(),
            answer_top_k: settings.answer_top_k,
            preview_chars: answer::PREVIEW_CHARS,
        }
    }
}

/// Answers questions and runs similarity lookups against a saved index.
///
/// A handler without an index is still usable: every operation returns an
/// empty result (or the not-ready answer) instead of failing.
pub struct QueryHandler {
    index_path: PathBuf,
    index: Option<VectorIndex>,
    embedder: Box<dyn Embedder>,
    llm: Box<dyn Llm>,
    options: QueryOptions,
}

impl QueryHandler {
    pub fn open(
        index_path: impl Into<PathBuf>,
        embedder: Box<dyn Embedder>,
        llm: Box<dyn Llm>,
        options: QueryOptions,
    ) -> Self {
        let index_path = index_path.into();
        let index = load_index(&index_path);
        Self {
            index_path,
            index,
            embedder,
            llm,
            options,
        }
    }

    /// Wrap an already loaded index; `reload` still reads from `index_path`.
    pub fn with_index(
        index_path: impl Into<PathBuf>,
        index: VectorIndex,
        embedder: Box<dyn Embedder>,
        llm: Box<dyn Llm>,
        options: QueryOptions,
    ) -> Self {
        Self {
            index_path: index_path.into(),
            index: Some(index),
            embedder,
            llm,
            options,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }

    pub fn index(&self) -> Option<&VectorIndex> {
        self.index.as_ref()
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Re-read the index from disk (after a rebuild or update).
    pub fn reload(&mut self) -> bool {
        self.index = load_index(&self.index_path);
        self.is_ready()
    }

    fn retrieve(&self, index: &VectorIndex, query: &str, k: usize) -> Result<Vec<SearchHit>, AppError> {
        let q = query.trim();
        if q.is_empty() {
            return Err(AppError::new("QUERY_EMPTY", "Query must not be empty"));
        }
        let qv = self.embedder.embed(index.model(), q)?;
        index.search(&qv, k)
    }

    pub fn search_similar_cases(&self, query: &str, k: usize) -> Result<Vec<SimilarCase>, AppError> {
        let Some(index) = self.index.as_ref() else {
            return Ok(Vec::new());
        };
        Ok(self
            .retrieve(index, query, k)?
            .into_iter()
            .map(|hit| SimilarCase {
                content: hit.chunk.content,
                metadata: hit.chunk.metadata,
                similarity_score: hit.distance,
            })
            .collect())
    }

    pub fn get_relevant_documents(&self, query: &str, k: usize) -> Result<Vec<RelevantDocument>, AppError> {
        let Some(index) = self.index.as_ref() else {
            return Ok(Vec::new());
        };
        Ok(self
            .retrieve(index, query, k)?
            .into_iter()
            .map(|hit| RelevantDocument {
                source_file: hit.chunk.source_file().to_string(),
                file_type: hit.chunk.file_type().to_string(),
                source_path: hit.chunk.source_path().to_string(),
                content: hit.chunk.content,
            })
            .collect())
    }

    /// One similarity query per keyword, merged in keyword order with exact-content dedup.
    pub fn search_by_keywords<S: AsRef<str>>(&self, keywords: &[S], k: usize) -> Result<Vec<KeywordHit>, AppError> {
        let Some(index) = self.index.as_ref() else {
            return Ok(Vec::new());
        };
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref();
            for hit in self.retrieve(index, keyword, k)? {
                if !seen.insert(sha256_hex(hit.chunk.content.as_bytes())) {
                    continue;
                }
                out.push(KeywordHit {
                    content: hit.chunk.content,
                    metadata: hit.chunk.metadata,
                    keyword: keyword.to_string(),
                });
            }
        }
        Ok(out)
    }

    /// Retrieve the top chunks for `query` and ask the LLM for a grounded answer.
    pub fn handle_query(&self, query: &str, return_sources: bool) -> Result<AnswerResponse, AppError> {
        let Some(index) = self.index.as_ref() else {
            return Ok(AnswerResponse::not_ready());
        };
        let hits = self.retrieve(index, query, self.options.answer_top_k)?;
        answer::synthesize(
            self.llm.as_ref(),
            &self.options.chat_model,
            query.trim(),
            &hits,
            return_sources,
            self.options.preview_chars,
        )
    }
}

/// Open the index at `index_path` and answer a single question, without sources.
pub fn answer_once(
    index_path: &Path,
    embedder: Box<dyn Embedder>,
    llm: Box<dyn Llm>,
    options: QueryOptions,
    query: &str,
) -> Result<String, AppError> {
    let handler = QueryHandler::open(index_path, embedder, llm, options);
    Ok(handler.handle_query(query, false)?.answer)
}
