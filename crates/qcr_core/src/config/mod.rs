use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_DATA_FOLDER: &str = "./data";
pub const DEFAULT_INDEX_PATH: &str = "faiss_index";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Runtime settings resolved from the environment (and an optional `.env` file).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub data_folder: PathBuf,
    pub index_path: PathBuf,
    pub chunking: ChunkingConfig,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f32,
    pub answer_top_k: usize,
    pub embed_batch_size: usize,
    pub request_timeout_secs: u64,
    pub pdftotext_bin: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            data_folder: PathBuf::from(DEFAULT_DATA_FOLDER),
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            chunking: ChunkingConfig::default(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.0,
            answer_top_k: 5,
            embed_batch_size: 64,
            request_timeout_secs: 60,
            pdftotext_bin: "pdftotext".to_string(),
        }
    }
}

impl Settings {
    /// Load `.env` (if present) and resolve settings from the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Settings::default();
        let settings = Settings {
            api_key: get("OPENAI_API_KEY"),
            api_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.api_base_url),
            data_folder: get("QUALITY_DATA_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_folder),
            index_path: get("QCR_INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_path),
            chunking: ChunkingConfig {
                chunk_size: parse_or("QCR_CHUNK_SIZE", get("QCR_CHUNK_SIZE"), defaults.chunking.chunk_size)?,
                chunk_overlap: parse_or(
                    "QCR_CHUNK_OVERLAP",
                    get("QCR_CHUNK_OVERLAP"),
                    defaults.chunking.chunk_overlap,
                )?,
            },
            embedding_model: get("QCR_EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            chat_model: get("QCR_CHAT_MODEL").unwrap_or(defaults.chat_model),
            temperature: parse_or("QCR_TEMPERATURE", get("QCR_TEMPERATURE"), defaults.temperature)?,
            answer_top_k: parse_or("QCR_ANSWER_TOP_K", get("QCR_ANSWER_TOP_K"), defaults.answer_top_k)?,
            embed_batch_size: parse_or(
                "QCR_EMBED_BATCH_SIZE",
                get("QCR_EMBED_BATCH_SIZE"),
                defaults.embed_batch_size,
            )?,
            request_timeout_secs: parse_or(
                "QCR_REQUEST_TIMEOUT_SECS",
                get("QCR_REQUEST_TIMEOUT_SECS"),
                defaults.request_timeout_secs,
            )?,
            pdftotext_bin: get("QCR_PDFTOTEXT").unwrap_or(defaults.pdftotext_bin),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let c = self.chunking;
        if c.chunk_size == 0 || c.chunk_overlap >= c.chunk_size {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "Chunk overlap must be smaller than a non-zero chunk size",
            )
            .with_details(format!("chunk_size={}; chunk_overlap={}", c.chunk_size, c.chunk_overlap)));
        }
        if self.answer_top_k == 0 {
            return Err(AppError::new("CONFIG_INVALID", "QCR_ANSWER_TOP_K must be at least 1"));
        }
        if self.embed_batch_size == 0 {
            return Err(AppError::new("CONFIG_INVALID", "QCR_EMBED_BATCH_SIZE must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::new("CONFIG_INVALID", "QCR_TEMPERATURE must be within 0..=2")
                .with_details(format!("temperature={}", self.temperature)));
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn require_api_key(&self) -> Result<&str, AppError> {
        self.api_key.as_deref().ok_or_else(|| {
            AppError::new("CONFIG_MISSING_API_KEY", "OPENAI_API_KEY is not set")
                .with_details("export OPENAI_API_KEY='your-api-key' or add it to a .env file")
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.parse::<T>().map_err(|e| {
            AppError::new("CONFIG_INVALID", format!("{key} has an invalid value"))
                .with_details(format!("value={v}; err={e}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let s = Settings::from_lookup(lookup(&[])).expect("settings");
        assert_eq!(s, Settings::default());
        assert!(!s.has_api_key());
        assert_eq!(s.require_api_key().unwrap_err().code, "CONFIG_MISSING_API_KEY");
    }

    #[test]
    fn overrides_are_applied() {
        let s = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("QUALITY_DATA_FOLDER", "/srv/quality"),
            ("QCR_CHUNK_SIZE", "500"),
            ("QCR_CHUNK_OVERLAP", "50"),
            ("QCR_ANSWER_TOP_K", "8"),
        ]))
        .expect("settings");
        assert_eq!(s.require_api_key().unwrap(), "sk-test");
        assert_eq!(s.data_folder, PathBuf::from("/srv/quality"));
        assert_eq!(s.chunking, ChunkingConfig { chunk_size: 500, chunk_overlap: 50 });
        assert_eq!(s.answer_top_k, 8);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let s = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "   ")])).expect("settings");
        assert!(!s.has_api_key());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        let err = Settings::from_lookup(lookup(&[
            ("QCR_CHUNK_SIZE", "100"),
            ("QCR_CHUNK_OVERLAP", "100"),
        ]))
        .unwrap_err();
        assert_eq!(err.code, "CONFIG_INVALID");
    }

    #[test]
    fn rejects_unparseable_numbers() {
        let err = Settings::from_lookup(lookup(&[("QCR_ANSWER_TOP_K", "five")])).unwrap_err();
        assert_eq!(err.code, "CONFIG_INVALID");
        assert!(err.message.contains("QCR_ANSWER_TOP_K"));
    }
}
