use std::fs;
use std::path::Path;

use crate::domain::normalize_text;
use crate::error::AppError;

use super::{FormatParser, ParsedText};

/// CSV files: one record per data row, rendered as `header: value` lines.
pub struct CsvParser;

impl FormatParser for CsvParser {
    fn parse(&self, path: &Path) -> Result<Vec<ParsedText>, AppError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::new("INGEST_READ_FAILED", "Failed to read CSV file")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        rows_from_text(&normalize_text(&raw)).map_err(|e| {
            let inner = e.details.clone().unwrap_or_default();
            e.with_details(format!("path={}; {}", path.display(), inner))
        })
    }
}

pub(crate) fn rows_from_text(text: &str) -> Result<Vec<ParsedText>, AppError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| {
            AppError::new("INGEST_PARSE_FAILED", "Failed to read CSV header row")
                .with_details(e.to_string())
        })?
        .clone();

    let mut out = Vec::new();
    for (row, rec) in rdr.records().enumerate() {
        let rec = rec.map_err(|e| {
            AppError::new("INGEST_PARSE_FAILED", "Failed to parse CSV record")
                .with_details(format!("row={row}; err={e}"))
        })?;
        let lines = rec
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let header = headers
                    .get(i)
                    .map(|h| h.trim())
                    .filter(|h| !h.is_empty())
                    .map(|h| h.to_string())
                    .unwrap_or_else(|| format!("column_{}", i + 1));
                format!("{header}: {}", value.trim())
            })
            .collect::<Vec<_>>();
        let mut parsed = ParsedText::plain(lines.join("\n"));
        parsed.extra.insert("row".to_string(), row.to_string());
        out.push(parsed);
    }
    Ok(out)
}
