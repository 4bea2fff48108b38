use std::fs;
use std::path::Path;

use crate::domain::normalize_text;
use crate::error::AppError;

use super::{FormatParser, ParsedText};

/// Plain UTF-8 text files. Invalid UTF-8 is a parse failure, not a lossy read.
pub struct TextParser;

impl FormatParser for TextParser {
    fn parse(&self, path: &Path) -> Result<Vec<ParsedText>, AppError> {
        let bytes = fs::read(path).map_err(|e| {
            AppError::new("INGEST_READ_FAILED", "Failed to read text file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        let text = String::from_utf8(bytes).map_err(|e| {
            AppError::new("INGEST_PARSE_FAILED", "Text file is not valid UTF-8")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        Ok(vec![ParsedText::plain(normalize_text(&text))])
    }
}
