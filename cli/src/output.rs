//! Terminal and JSON rendering for command results.

use qcr_ai::answer::{preview, AnswerResponse, PREVIEW_CHARS};
use qcr_ai::index::{BuildReport, IndexStatus, UpdateReport};
use qcr_ai::retrieve::{KeywordHit, RelevantDocument, SimilarCase};
use qcr_core::config::Settings;
use qcr_core::domain::{meta_or, META_FILE_TYPE, META_SOURCE_FILE, UNKNOWN};
use qcr_core::ingest::FileFailure;
use serde::Serialize;

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_status(settings: &Settings, st: &IndexStatus) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Data folder: {}{}\n",
        settings.data_folder.display(),
        if settings.data_folder.is_dir() { "" } else { " (missing)" }
    ));
    if st.ready {
        out.push_str(&format!("Index: ready at {}\n", st.path));
        out.push_str(&format!("  chunks: {}\n", st.chunk_count));
        if let Some(model) = &st.model {
            out.push_str(&format!("  embedding model: {model}\n"));
        }
        if let Some(dims) = st.dims {
            out.push_str(&format!("  dims: {dims}\n"));
        }
        if let Some(metric) = st.metric {
            out.push_str(&format!("  metric: {}\n", metric.as_str()));
        }
        if let Some(ts) = &st.updated_at {
            out.push_str(&format!("  updated: {ts}\n"));
        }
    } else {
        out.push_str(&format!("Index: not built ({}). Run `qcr build`.\n", st.path));
    }
    out.push_str(&format!("Chat model: {}\n", settings.chat_model));
    out.push_str(&format!(
        "API key: {}",
        if settings.has_api_key() { "set" } else { "not set" }
    ));
    out
}

pub fn format_build_report(r: &BuildReport) -> String {
    let mut out = format!(
        "Indexed {} chunks from {} documents ({} files) into {}",
        r.chunks,
        r.documents,
        r.files_loaded,
        r.index_path.display()
    );
    if r.files_failed > 0 {
        out.push_str(&format!("\n{} file(s) could not be loaded; run with --verbose for details", r.files_failed));
    }
    out
}

pub fn format_update_report(r: &UpdateReport) -> String {
    if r.created {
        return format!(
            "No index existed; built a new one with {} chunks from {} documents",
            r.total_chunks, r.documents
        );
    }
    format!(
        "Added {} chunks ({} already indexed). Index now holds {} chunks.",
        r.chunks_added, r.chunks_skipped, r.total_chunks
    )
}

pub fn format_failures(failures: &[FileFailure]) -> String {
    let mut lines = vec![format!("{} file(s) failed to load:", failures.len())];
    for f in failures {
        lines.push(format!("  {}: {}", f.path, f.error));
    }
    lines.join("\n")
}

pub fn format_answer(res: &AnswerResponse) -> String {
    let mut out = format!("Answer:\n{}", res.answer.trim());
    if !res.sources.is_empty() {
        out.push_str("\n\nSources:");
        for (i, s) in res.sources.iter().enumerate() {
            out.push_str(&format!("\n{}. {} ({})", i + 1, s.file, s.file_type));
            out.push_str(&format!("\n   {}", indent(&s.content_preview, "   ")));
        }
    }
    out
}

pub fn format_similar_cases(query: &str, cases: &[SimilarCase]) -> String {
    if cases.is_empty() {
        return format!("No similar cases found for \"{query}\"");
    }
    let mut out = format!("Similar cases for \"{query}\":\n");
    for (i, c) in cases.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. {} ({}) distance: {:.4}\n   {}\n",
            i + 1,
            meta_or(&c.metadata, META_SOURCE_FILE, UNKNOWN),
            meta_or(&c.metadata, META_FILE_TYPE, UNKNOWN),
            c.similarity_score,
            indent(&preview(c.content.trim(), PREVIEW_CHARS), "   ")
        ));
    }
    out.trim_end().to_string()
}

pub fn format_documents(query: &str, docs: &[RelevantDocument]) -> String {
    if docs.is_empty() {
        return format!("No relevant documents found for \"{query}\"");
    }
    let mut out = format!("Relevant documents for \"{query}\":\n");
    for (i, d) in docs.iter().enumerate() {
        out.push_str(&format!("\n{}. {} ({})\n", i + 1, d.source_file, d.file_type));
        if !d.source_path.is_empty() {
            out.push_str(&format!("   Path: {}\n", d.source_path));
        }
        out.push_str(&format!("   {}\n", indent(d.content.trim(), "   ")));
    }
    out.trim_end().to_string()
}

pub fn format_keyword_hits(hits: &[KeywordHit]) -> String {
    if hits.is_empty() {
        return "No matches found".to_string();
    }
    let mut out = String::new();
    for (i, h) in hits.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}] {}\n   {}\n\n",
            i + 1,
            h.keyword,
            meta_or(&h.metadata, META_SOURCE_FILE, UNKNOWN),
            indent(&preview(h.content.trim(), PREVIEW_CHARS), "   ")
        ));
    }
    out.trim_end().to_string()
}

/// Indents every line after the first.
fn indent(text: &str, prefix: &str) -> String {
    text.lines().collect::<Vec<_>>().join(&format!("\n{prefix}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use qcr_ai::answer::SourcePreview;
    use qcr_core::domain::Metadata;

    #[test]
    fn answer_lists_sources_under_the_text() {
        let res = AnswerResponse {
            answer: "Restore gas flow.\n".to_string(),
            sources: vec![SourcePreview {
                file: "weld_defect.txt".to_string(),
                file_type: ".txt".to_string(),
                content_preview: "Case QC-2024-017\nSymptom: porosity".to_string(),
            }],
        };
        assert_eq!(
            format_answer(&res),
            "Answer:\nRestore gas flow.\n\nSources:\n1. weld_defect.txt (.txt)\n   Case QC-2024-017\n   Symptom: porosity"
        );
    }

    #[test]
    fn empty_results_say_so() {
        assert_eq!(format_similar_cases("weld", &[]), "No similar cases found for \"weld\"");
        assert_eq!(format_documents("weld", &[]), "No relevant documents found for \"weld\"");
        assert_eq!(format_keyword_hits(&[]), "No matches found");
    }

    #[test]
    fn relevant_documents_print_the_whole_chunk() {
        let body = format!("{}\nRoot cause: nozzle clog", "y".repeat(300));
        let docs = vec![RelevantDocument {
            content: body,
            source_file: "paint_defects.csv".to_string(),
            file_type: ".csv".to_string(),
            source_path: "/data/paint_defects.csv".to_string(),
        }];
        let text = format_documents("paint", &docs);
        assert!(text.contains("1. paint_defects.csv (.csv)"));
        assert!(text.contains("   Path: /data/paint_defects.csv"));
        assert!(text.contains(&format!("   {}\n   Root cause: nozzle clog", "y".repeat(300))));
        assert!(!text.contains("..."));
    }

    #[test]
    fn similar_cases_show_distance_and_truncated_preview() {
        let mut metadata = Metadata::new();
        metadata.insert(META_SOURCE_FILE.to_string(), "paint_defects.csv".to_string());
        metadata.insert(META_FILE_TYPE.to_string(), ".csv".to_string());
        let cases = vec![SimilarCase {
            content: "x".repeat(300),
            metadata,
            similarity_score: 0.25,
        }];
        let text = format_similar_cases("paint", &cases);
        assert!(text.contains("1. paint_defects.csv (.csv) distance: 0.2500"));
        assert!(text.contains(&format!("{}...", "x".repeat(200))));
        assert!(!text.contains(&"x".repeat(201)));
    }

    #[test]
    fn json_uses_type_key_for_sources() {
        let res = AnswerResponse {
            answer: "a".to_string(),
            sources: vec![SourcePreview {
                file: "f.txt".to_string(),
                file_type: ".txt".to_string(),
                content_preview: "p".to_string(),
            }],
        };
        let v: serde_json::Value = serde_json::from_str(&to_json(&res)).unwrap();
        assert_eq!(v["sources"][0]["type"], ".txt");
    }
}
