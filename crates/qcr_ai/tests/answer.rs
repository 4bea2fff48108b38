use pretty_assertions::assert_eq;
use qcr_ai::chunking::Chunker;
use qcr_ai::embeddings::Embedder;
use qcr_ai::index::{build_index_from_folder, DistanceMetric, IndexBuilder};
use qcr_ai::llm::Llm;
use qcr_ai::retrieve::{answer_once, QueryHandler, QueryOptions};
use qcr_core::error::AppError;

const TERMS: [&str; 6] = ["weld", "gas", "bore", "tool", "paint", "spray"];

/// Unit-length term-count vectors, so ranking follows topical overlap.
struct TermEmbedder;

impl Embedder for TermEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let lower = input.to_lowercase();
        let mut v: Vec<f32> = TERMS.iter().map(|t| lower.matches(t).count() as f32).collect();
        v.push(0.1);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        Ok(v.into_iter().map(|x| x / norm).collect())
    }
}

/// Returns the prompt it was given.
struct EchoLlm;

impl Llm for EchoLlm {
    fn generate(&self, _model: &str, prompt: &str) -> Result<String, AppError> {
        Ok(prompt.to_string())
    }
}

fn seeded_index(dir: &std::path::Path) -> std::path::PathBuf {
    let data = dir.join("data");
    let path = dir.join("faiss_index");
    qcr_core::demo::seed_demo_folder(&data).unwrap();
    let b = IndexBuilder::new(&TermEmbedder, "mock-embed", Chunker::new(1000, 200).unwrap())
        .with_metric(DistanceMetric::Cosine);
    build_index_from_folder(&b, &data, &path, "pdftotext").unwrap();
    path
}

#[test]
fn welding_question_is_answered_from_the_weld_case() {
    let dir = tempfile::tempdir().unwrap();
    let path = seeded_index(dir.path());
    let h = QueryHandler::open(&path, Box::new(TermEmbedder), Box::new(EchoLlm), QueryOptions::default());

    let res = h.handle_query("What countermeasures worked for welding defects?", true).unwrap();
    assert!(res.answer.contains("file: weld_defect.txt"));
    assert!(res.answer.contains("Corrective action"));
    assert!(res.answer.contains("Question: What countermeasures worked for welding defects?"));

    assert!(!res.sources.is_empty());
    assert!(res.sources.len() <= 5);
    assert_eq!(res.sources[0].file, "weld_defect.txt");
    assert_eq!(res.sources[0].file_type, ".txt");
    for s in &res.sources {
        let n = s.content_preview.chars().count();
        assert!(n <= 200 || (n == 203 && s.content_preview.ends_with("...")));
    }
}

#[test]
fn sources_are_omitted_on_request() {
    let dir = tempfile::tempdir().unwrap();
    let path = seeded_index(dir.path());
    let h = QueryHandler::open(&path, Box::new(TermEmbedder), Box::new(EchoLlm), QueryOptions::default());
    let res = h.handle_query("paint peeling", false).unwrap();
    assert!(res.sources.is_empty());
    assert!(res.answer.contains("paint_defects.csv"));
}

#[test]
fn answer_once_opens_the_index_and_answers() {
    let dir = tempfile::tempdir().unwrap();
    let path = seeded_index(dir.path());
    let answer = answer_once(
        &path,
        Box::new(TermEmbedder),
        Box::new(EchoLlm),
        QueryOptions::default(),
        "bore tool wear",
    )
    .unwrap();
    assert!(answer.contains("dimension_defect.txt"));

    let missing = answer_once(
        &dir.path().join("none"),
        Box::new(TermEmbedder),
        Box::new(EchoLlm),
        QueryOptions::default(),
        "bore tool wear",
    )
    .unwrap();
    assert_eq!(missing, qcr_ai::answer::NOT_READY_ANSWER);
}
