use std::path::Path;
use std::process::Command;

use crate::domain::normalize_text;
use crate::error::AppError;

use super::{FormatParser, ParsedText};

/// PDF text via the poppler `pdftotext` binary, one record per page.
pub struct PdfParser {
    bin: String,
}

impl PdfParser {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

impl FormatParser for PdfParser {
    fn parse(&self, path: &Path) -> Result<Vec<ParsedText>, AppError> {
        let output = Command::new(&self.bin)
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| {
                AppError::new("INGEST_PARSE_FAILED", "Failed to run pdftotext (is poppler installed?)")
                    .with_details(format!("bin={}; path={}; err={}", self.bin, path.display(), e))
            })?;
        if !output.status.success() {
            return Err(AppError::new("INGEST_PARSE_FAILED", "pdftotext failed")
                .with_details(format!(
                    "path={}; status={}; stderr={}",
                    path.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let pages = split_pages(&normalize_text(&text));
        if pages.is_empty() {
            return Err(AppError::new("INGEST_PARSE_FAILED", "PDF produced no pages")
                .with_details(format!("path={}", path.display())));
        }
        Ok(pages)
    }
}

/// pdftotext terminates every page with a form feed. Blank pages are dropped
/// but the remaining pages keep their position in the PDF as page number.
pub(crate) fn split_pages(text: &str) -> Vec<ParsedText> {
    text.split('\u{c}')
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| {
            let mut parsed = ParsedText::plain(page.trim_end().to_string());
            parsed.extra.insert("page".to_string(), (i + 1).to_string());
            parsed
        })
        .collect()
}
