use pretty_assertions::assert_eq;
use qcr_ai::answer::NOT_READY_ANSWER;
use qcr_ai::chunking::Chunker;
use qcr_ai::embeddings::Embedder;
use qcr_ai::index::IndexBuilder;
use qcr_ai::llm::Llm;
use qcr_ai::retrieve::{QueryHandler, QueryOptions};
use qcr_core::domain::{Document, Metadata, META_FILE_TYPE, META_SOURCE_FILE, META_SOURCE_PATH};
use qcr_core::error::AppError;

struct CountABEmbedder;

impl Embedder for CountABEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let mut a = 0u32;
        let mut b = 0u32;
        for ch in input.chars() {
            if ch == 'a' {
                a += 1;
            } else if ch == 'b' {
                b += 1;
            }
        }
        Ok(vec![a as f32, b as f32])
    }
}

struct FailingLlm;

impl Llm for FailingLlm {
    fn generate(&self, _model: &str, _prompt: &str) -> Result<String, AppError> {
        Err(AppError::new("LLM_FAILED", "mock llm unavailable"))
    }
}

fn doc(name: &str, text: &str) -> Document {
    let mut metadata = Metadata::new();
    metadata.insert(META_SOURCE_FILE.to_string(), name.to_string());
    metadata.insert(META_SOURCE_PATH.to_string(), format!("/data/{name}"));
    metadata.insert(META_FILE_TYPE.to_string(), ".txt".to_string());
    Document::new(text, metadata)
}

fn handler_over(dir: &std::path::Path, docs: &[Document]) -> QueryHandler {
    let path = dir.join("idx");
    let b = IndexBuilder::new(&CountABEmbedder, "mock", Chunker::new(50, 10).unwrap());
    let index = b.build(docs).unwrap();
    index.save(&path).unwrap();
    QueryHandler::open(&path, Box::new(CountABEmbedder), Box::new(FailingLlm), QueryOptions::default())
}

#[test]
fn similar_cases_are_ordered_by_ascending_distance() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler_over(
        dir.path(),
        &[doc("b.txt", "bbbb"), doc("ab.txt", "aabb"), doc("a.txt", "aaaa")],
    );
    assert!(h.is_ready());

    let hits = h.search_similar_cases("aaaa", 3).unwrap();
    let contents: Vec<&str> = hits.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["aaaa", "aabb", "bbbb"]);
    let scores: Vec<f32> = hits.iter().map(|c| c.similarity_score).collect();
    assert_eq!(scores, vec![0.0, 8.0, 32.0]);
    assert_eq!(hits[0].metadata.get(META_SOURCE_FILE).map(String::as_str), Some("a.txt"));

    assert_eq!(h.search_similar_cases("aaaa", 1).unwrap().len(), 1);
}

#[test]
fn equal_distances_keep_insertion_order() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler_over(dir.path(), &[doc("first.txt", "ab"), doc("second.txt", "ba")]);
    let docs = h.get_relevant_documents("ab", 2).unwrap();
    let files: Vec<&str> = docs.iter().map(|d| d.source_file.as_str()).collect();
    assert_eq!(files, vec!["first.txt", "second.txt"]);
    assert_eq!(docs[0].file_type, ".txt");
    assert_eq!(docs[0].source_path, "/data/first.txt");
}

#[test]
fn keyword_search_dedups_content_and_first_keyword_wins() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler_over(
        dir.path(),
        &[doc("a.txt", "aaaa"), doc("ab.txt", "aabb"), doc("b.txt", "bbbb")],
    );

    let hits = h.search_by_keywords(&["a", "b"], 2).unwrap();
    let got: Vec<(&str, &str)> = hits.iter().map(|k| (k.content.as_str(), k.keyword.as_str())).collect();
    assert_eq!(got, vec![("aabb", "a"), ("aaaa", "a"), ("bbbb", "b")]);
}

#[test]
fn keyword_hits_echo_the_keyword_as_given() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler_over(dir.path(), &[doc("a.txt", "aaaa")]);

    let hits = h.search_by_keywords(&["  porosity a "], 1).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].keyword, "  porosity a ");
}

#[test]
fn identical_content_from_two_files_is_reported_once_by_keyword_search() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler_over(dir.path(), &[doc("one.txt", "abab"), doc("two.txt", "abab")]);

    assert_eq!(h.search_similar_cases("ab", 5).unwrap().len(), 2);
    assert_eq!(h.search_by_keywords(&["ab".to_string()], 5).unwrap().len(), 1);
}

#[test]
fn blank_query_is_rejected_when_ready() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler_over(dir.path(), &[doc("a.txt", "aaaa")]);
    assert_eq!(h.search_similar_cases("  ", 3).unwrap_err().code, "QUERY_EMPTY");
    assert_eq!(h.search_by_keywords(&["a", " "], 3).unwrap_err().code, "QUERY_EMPTY");
}

#[test]
fn llm_failure_propagates_from_handle_query() {
    let dir = tempfile::tempdir().unwrap();
    let h = handler_over(dir.path(), &[doc("a.txt", "aaaa")]);
    assert_eq!(h.handle_query("aa", true).unwrap_err().code, "LLM_FAILED");
}

#[test]
fn handler_without_index_returns_empty_results() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing");
    let mut h = QueryHandler::open(&path, Box::new(CountABEmbedder), Box::new(FailingLlm), QueryOptions::default());
    assert!(!h.is_ready());

    assert!(h.search_similar_cases("aaaa", 3).unwrap().is_empty());
    assert!(h.get_relevant_documents("aaaa", 3).unwrap().is_empty());
    assert!(h.search_by_keywords(&["a"], 3).unwrap().is_empty());
    let answer = h.handle_query("what happened?", true).unwrap();
    assert_eq!(answer.answer, NOT_READY_ANSWER);
    assert!(answer.sources.is_empty());

    let b = IndexBuilder::new(&CountABEmbedder, "mock", Chunker::new(50, 10).unwrap());
    b.build(&[doc("a.txt", "aaaa")]).unwrap().save(&path).unwrap();
    assert!(h.reload());
    assert_eq!(h.search_similar_cases("aaaa", 3).unwrap().len(), 1);
}
