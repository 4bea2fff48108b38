use qcr_core::error::AppError;
use serde::{Deserialize, Serialize};

use super::Llm;
use crate::openai::ApiClient;

#[derive(Debug, Clone)]
pub struct OpenAiLlm {
    client: ApiClient,
    temperature: f32,
}

impl OpenAiLlm {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl Llm for OpenAiLlm {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, AppError> {
        let req = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };
        let body = serde_json::to_value(req).map_err(|e| {
            AppError::new("LLM_FAILED", "Failed to encode completion request").with_details(e.to_string())
        })?;
        let resp: ChatResponse = self.client.post_json("/chat/completions", body, "LLM_FAILED")?;

        let text = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AppError::new("LLM_FAILED", "Completion response was empty"));
        }
        Ok(text)
    }
}
