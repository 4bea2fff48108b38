use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::AppError;

use super::{FormatParser, ParsedText};

const MAIN_PART: &str = "word/document.xml";

/// Word documents: the body text of `word/document.xml`, one line per paragraph.
///
/// Only Office Open XML packages are read; a binary Word 97 file fails as a parse error.
pub struct DocxParser;

impl FormatParser for DocxParser {
    fn parse(&self, path: &Path) -> Result<Vec<ParsedText>, AppError> {
        let xml = read_main_part(path)?;
        let text = document_text(&xml).map_err(|e| {
            let details = format!("path={}; err={}", path.display(), e.details.as_deref().unwrap_or(""));
            e.with_details(details)
        })?;
        Ok(vec![ParsedText::plain(text)])
    }
}

fn read_main_part(path: &Path) -> Result<String, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new("INGEST_READ_FAILED", "Failed to open document")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        AppError::new("INGEST_PARSE_FAILED", "Document is not an Office Open XML package")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    let mut entry = archive.by_name(MAIN_PART).map_err(|e| {
        AppError::new("INGEST_PARSE_FAILED", "Word package has no main document part")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml).map_err(|e| {
        AppError::new("INGEST_PARSE_FAILED", "Main document part is not valid UTF-8 XML")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    Ok(xml)
}

pub(crate) fn document_text(xml: &str) -> Result<String, AppError> {
    let malformed = |e: quick_xml::Error| {
        AppError::new("INGEST_PARSE_FAILED", "Word document XML is malformed").with_details(e.to_string())
    };

    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_run = false;
    let mut in_text = false;
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" => in_text = true,
                b"tab" if in_run => out.push('\t'),
                b"br" | b"cr" if in_run => out.push('\n'),
                _ => {}
            },
            // Tab stops in paragraph properties share the element name; only runs emit text.
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if in_run => out.push('\t'),
                b"br" | b"cr" if in_run => out.push('\n'),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => out.push_str(&t.unescape().map_err(malformed)?),
            Event::CData(c) if in_text => out.push_str(&String::from_utf8_lossy(&c)),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out.trim_end().to_string())
}
