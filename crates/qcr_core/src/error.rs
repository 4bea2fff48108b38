use serde::{Deserialize, Serialize};
use std::fmt;

/// Single structured error shape used by every layer and printed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

/// Coarse classification of error codes.
///
/// Recovery is decided per category: missing resources and config problems are
/// surfaced to the user, parse errors skip a single file, empty input aborts a
/// build, and not-ready states are turned into empty results by the handler.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    MissingResource,
    Parse,
    EmptyInput,
    ExternalService,
    NotReady,
    Config,
    Storage,
    InvalidInput,
    Other,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn category(&self) -> ErrorCategory {
        match self.code.as_str() {
            "DATA_FOLDER_NOT_FOUND" | "INDEX_NOT_FOUND" => ErrorCategory::MissingResource,
            "INGEST_READ_FAILED" | "INGEST_PARSE_FAILED" | "INGEST_UNSUPPORTED_TYPE" => {
                ErrorCategory::Parse
            }
            "INDEX_EMPTY_INPUT" => ErrorCategory::EmptyInput,
            "EMBEDDINGS_FAILED" | "LLM_FAILED" | "API_UNREACHABLE" | "API_UNHEALTHY" => {
                ErrorCategory::ExternalService
            }
            "INDEX_NOT_READY" => ErrorCategory::NotReady,
            "CONFIG_INVALID" | "CONFIG_MISSING_API_KEY" => ErrorCategory::Config,
            "INDEX_STORE_FAILED" | "INDEX_INCOMPATIBLE" => ErrorCategory::Storage,
            "QUERY_EMPTY" | "CHUNKING_INVALID" => ErrorCategory::InvalidInput,
            _ => ErrorCategory::Other,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
