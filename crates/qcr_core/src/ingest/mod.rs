use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::domain::{Document, Metadata, META_FILE_TYPE, META_SOURCE_FILE, META_SOURCE_PATH};
use crate::error::AppError;

pub mod csv_rows;
pub mod docx;
pub mod pdf;
pub mod text;
pub mod xlsx;

/// Extensions accepted by the loader (lower-case, with leading dot).
pub const SUPPORTED_EXTENSIONS: [&str; 7] = [".txt", ".pdf", ".xlsx", ".xls", ".docx", ".doc", ".csv"];

/// Text extracted from one file by a format parser, before source tagging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedText {
    pub text: String,
    /// Format-specific metadata such as `row`, `page` or `sheet`.
    pub extra: Metadata,
}

impl ParsedText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            extra: Metadata::new(),
        }
    }
}

pub trait FormatParser {
    fn parse(&self, path: &Path) -> Result<Vec<ParsedText>, AppError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileFailure {
    pub path: String,
    pub error: AppError,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub loaded_files: usize,
    pub failures: Vec<FileFailure>,
    pub skipped_files: usize,
}

impl LoadReport {
    pub fn merge(&mut self, other: LoadReport) {
        self.documents.extend(other.documents);
        self.loaded_files += other.loaded_files;
        self.failures.extend(other.failures);
        self.skipped_files += other.skipped_files;
    }
}

/// Walks a folder tree and turns every supported file into tagged documents.
///
/// Loading is best-effort: a file that fails to parse is logged and recorded in the
/// [`LoadReport`], and the walk continues.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    root: PathBuf,
    pdftotext_bin: String,
}

impl DocumentLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pdftotext_bin: "pdftotext".to_string(),
        }
    }

    pub fn with_pdftotext(mut self, bin: impl Into<String>) -> Self {
        self.pdftotext_bin = bin.into();
        self
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn parser_for(&self, ext: &str) -> Option<Box<dyn FormatParser>> {
        match ext {
            ".txt" => Some(Box::new(text::TextParser)),
            ".csv" => Some(Box::new(csv_rows::CsvParser)),
            ".docx" | ".doc" => Some(Box::new(docx::DocxParser)),
            ".xlsx" | ".xls" => Some(Box::new(xlsx::XlsxParser)),
            ".pdf" => Some(Box::new(pdf::PdfParser::new(self.pdftotext_bin.clone()))),
            _ => None,
        }
    }

    pub fn load_all(&self) -> Vec<Document> {
        self.load_all_with_report().documents
    }

    pub fn load_all_with_report(&self) -> LoadReport {
        let report = self.load_matching(|_| true);
        tracing::info!(
            documents = report.documents.len(),
            files = report.loaded_files,
            failed = report.failures.len(),
            "finished loading documents from {}",
            self.root.display()
        );
        report
    }

    /// Load only files with one extension (`"pdf"` and `".pdf"` are both accepted).
    pub fn load_by_type(&self, file_type: &str) -> Vec<Document> {
        let wanted = normalize_extension(file_type);
        self.load_matching(|ext| ext == wanted).documents
    }

    fn load_matching<F>(&self, accept: F) -> LoadReport
    where
        F: Fn(&str) -> bool,
    {
        let mut report = LoadReport::default();
        if !self.root.is_dir() {
            tracing::warn!("data folder not found: {}", self.root.display());
            return report;
        }

        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("skipping unreadable directory entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(ext) = extension_of(path) else {
                report.skipped_files += 1;
                continue;
            };
            if !is_supported_extension(&ext) || !accept(&ext) {
                tracing::debug!("skipping unsupported file: {}", path.display());
                report.skipped_files += 1;
                continue;
            }

            match self.load_file(path) {
                Ok(docs) => {
                    tracing::info!("loaded {} ({} documents)", file_name_of(path), docs.len());
                    report.loaded_files += 1;
                    report.documents.extend(docs);
                }
                Err(e) => {
                    tracing::warn!(code = %e.code, details = ?e.details, "failed to load {}: {}", file_name_of(path), e.message);
                    report.failures.push(FileFailure {
                        path: path.display().to_string(),
                        error: e,
                    });
                }
            }
        }
        report
    }

    /// Parse a single file and tag every resulting document with its source.
    pub fn load_file(&self, path: &Path) -> Result<Vec<Document>, AppError> {
        let ext = extension_of(path).unwrap_or_default();
        let parser = self.parser_for(&ext).ok_or_else(|| {
            AppError::new("INGEST_UNSUPPORTED_TYPE", "Unsupported file type")
                .with_details(format!("path={}; ext={ext}", path.display()))
        })?;
        if !path.is_file() {
            return Err(AppError::new("INGEST_READ_FAILED", "File does not exist")
                .with_details(format!("path={}", path.display())));
        }

        let parsed = parser.parse(path)?;
        let file_name = file_name_of(path);
        let source_path = path.display().to_string();
        Ok(parsed
            .into_iter()
            .map(|p| {
                let mut metadata = p.extra;
                metadata.insert(META_SOURCE_FILE.to_string(), file_name.clone());
                metadata.insert(META_SOURCE_PATH.to_string(), source_path.clone());
                metadata.insert(META_FILE_TYPE.to_string(), ext.clone());
                Document::new(p.text, metadata)
            })
            .collect())
    }
}

/// Load a mix of files and folders (used for incremental updates).
pub fn load_paths(paths: &[PathBuf], pdftotext_bin: &str) -> LoadReport {
    let mut report = LoadReport::default();
    for p in paths {
        if p.is_dir() {
            report.merge(
                DocumentLoader::new(p.clone())
                    .with_pdftotext(pdftotext_bin)
                    .load_all_with_report(),
            );
            continue;
        }
        let loader = DocumentLoader::new(p.parent().map(Path::to_path_buf).unwrap_or_default())
            .with_pdftotext(pdftotext_bin);
        match loader.load_file(p) {
            Ok(docs) => {
                report.loaded_files += 1;
                report.documents.extend(docs);
            }
            Err(e) => {
                tracing::warn!(code = %e.code, "failed to load {}: {}", p.display(), e.message);
                report.failures.push(FileFailure {
                    path: p.display().to_string(),
                    error: e,
                });
            }
        }
    }
    report
}

pub fn load_quality_documents(root: impl Into<PathBuf>) -> Vec<Document> {
    DocumentLoader::new(root).load_all()
}

pub fn is_supported_extension(ext: &str) -> bool {
    let ext = normalize_extension(ext);
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
