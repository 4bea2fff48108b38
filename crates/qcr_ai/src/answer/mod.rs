use qcr_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::index::SearchHit;
use crate::llm::Llm;

pub mod prompts;

pub const NOT_READY_ANSWER: &str = "Error: the vector index is not loaded. Build the index first.";
pub const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourcePreview {
    pub file: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub content_preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerResponse {
    pub answer: String,
    pub sources: Vec<SourcePreview>,
}

impl AnswerResponse {
    pub fn not_ready() -> Self {
        Self {
            answer: NOT_READY_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }
}

/// First `max_chars` characters of `text`, with `...` appended only when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}...", &text[..i]),
        None => text.to_string(),
    }
}

pub fn synthesize(
    llm: &dyn Llm,
    model: &str,
    question: &str,
    hits: &[SearchHit],
    return_sources: bool,
    preview_chars: usize,
) -> Result<AnswerResponse, AppError> {
    let prompt = prompts::quality_answer_prompt(question, &prompts::context_blocks(hits));
    tracing::debug!(chunks = hits.len(), prompt_chars = prompt.chars().count(), "generating answer");
    let answer = llm.generate(model, &prompt)?;

    let sources = if return_sources {
        hits.iter()
            .map(|hit| SourcePreview {
                file: hit.chunk.source_file().to_string(),
                file_type: hit.chunk.file_type().to_string(),
                content_preview: preview(&hit.chunk.content, preview_chars),
            })
            .collect()
    } else {
        Vec::new()
    };
    Ok(AnswerResponse { answer, sources })
}
