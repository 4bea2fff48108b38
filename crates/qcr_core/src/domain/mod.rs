use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const META_SOURCE_FILE: &str = "source_file";
pub const META_SOURCE_PATH: &str = "source_path";
pub const META_FILE_TYPE: &str = "file_type";

/// Placeholder reported when a chunk carries no file name or type.
pub const UNKNOWN: &str = "unknown";

pub type Metadata = BTreeMap<String, String>;

/// A loaded source document.
///
/// Notes:
/// - `metadata` always carries `source_file`, `source_path` and `file_type` once the loader
///   has tagged it; format loaders may add `row`, `page` or `sheet`.
/// - Documents are never mutated after loading; chunking copies the metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
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

/// A bounded-length window over a document's text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub metadata: Metadata,
    /// Position of this chunk within its parent document (0-based).
    pub ordinal: u32,
    /// Offset of the first character in the parent text, counted in chars.
    pub start_char: usize,
}

impl Chunk {
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

pub fn meta_or<'a>(metadata: &'a Metadata, key: &str, default: &'a str) -> &'a str {
    metadata.get(key).map(|s| s.as_str()).unwrap_or(default)
}

pub fn normalize_text(s: &str) -> String {
    s.trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}
