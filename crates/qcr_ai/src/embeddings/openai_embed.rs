use qcr_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::Embedder;
use crate::openai::ApiClient;

#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: ApiClient,
}

impl OpenAiEmbedder {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let mut out = self.embed_batch(model, &[input.to_string()])?;
        out.pop()
            .ok_or_else(|| AppError::new("EMBEDDINGS_FAILED", "Embeddings response was empty"))
    }

    fn embed_batch(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let req = EmbeddingsRequest { model, input: inputs };
        let body = serde_json::to_value(req).map_err(|e| {
            AppError::new("EMBEDDINGS_FAILED", "Failed to encode embeddings request")
                .with_details(e.to_string())
        })?;
        let resp: EmbeddingsResponse = self.client.post_json("/embeddings", body, "EMBEDDINGS_FAILED")?;
        order_embeddings(resp.data, inputs.len())
    }
}

/// The API may return items out of order; place each by its `index`.
fn order_embeddings(items: Vec<EmbeddingItem>, expected: usize) -> Result<Vec<Vec<f32>>, AppError> {
    if items.len() != expected {
        return Err(AppError::new(
            "EMBEDDINGS_FAILED",
            "Embeddings response count does not match request",
        )
        .with_details(format!("expected={expected}; got={}", items.len())));
    }
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in items {
        if item.embedding.is_empty() {
            return Err(AppError::new("EMBEDDINGS_FAILED", "Embeddings response was empty")
                .with_details(format!("index={}", item.index)));
        }
        match slots.get_mut(item.index) {
            Some(slot) if slot.is_none() => *slot = Some(item.embedding),
            _ => {
                return Err(AppError::new("EMBEDDINGS_FAILED", "Embeddings response has a bad index")
                    .with_details(format!("index={}", item.index)))
            }
        }
    }
    slots
        .into_iter()
        .map(|v| v.ok_or_else(|| AppError::new("EMBEDDINGS_FAILED", "Embeddings response missing an item")))
        .collect()
}
