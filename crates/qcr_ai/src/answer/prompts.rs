use crate::index::SearchHit;

pub fn quality_answer_prompt(question: &str, context: &str) -> String {
    format!(
        r#"You are an expert in manufacturing quality control. Answer the question using the past quality cases and documents below.

Guidelines:
1) Base the answer on the provided context. If the context does not cover the question, say so plainly.
2) Draw out lessons learned from similar past cases.
3) Describe the corrective actions that were taken and whether they worked.
4) Recommend preventive measures to stop the problem from recurring.
5) When a statement clearly comes from one document, cite its file name.

Context:
{context}

Question: {question}

Answer:"#
    )
}

/// Render retrieved chunks as numbered context blocks.
pub fn context_blocks(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] file: {} ({})\n{}",
                i + 1,
                hit.chunk.source_file(),
                hit.chunk.file_type(),
                hit.chunk.content.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
