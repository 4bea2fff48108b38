use qcr_core::config::ChunkingConfig;
use qcr_core::domain::{Chunk, Document};
use qcr_core::error::AppError;

/// Fixed-window splitter. Lengths are counted in Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, AppError> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(AppError::new(
                "CHUNKING_INVALID",
                "Chunk size must be positive and larger than the overlap",
            )
            .with_details(format!("chunk_size={chunk_size}; chunk_overlap={chunk_overlap}")));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(cfg: &ChunkingConfig) -> Result<Self, AppError> {
        Self::new(cfg.chunk_size, cfg.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split text into `(start_char, content)` windows.
    ///
    /// Each window starts `chunk_size - chunk_overlap` chars after the previous one,
    /// and the last window ends exactly at the end of the text.
    pub fn split_text(&self, text: &str) -> Vec<(usize, String)> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let total = offsets.len();
        let byte_at = |ci: usize| if ci >= total { text.len() } else { offsets[ci] };
        let step = self.chunk_size - self.chunk_overlap;

        let mut out = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + self.chunk_size).min(total);
            out.push((start, text[byte_at(start)..byte_at(end)].to_string()));
            if end == total {
                break;
            }
            start += step;
        }
        out
    }

    pub fn split_document(&self, doc: &Document) -> Vec<Chunk> {
        self.split_text(&doc.text)
            .into_iter()
            .enumerate()
            .map(|(ordinal, (start_char, content))| Chunk {
                content,
                metadata: doc.metadata.clone(),
                ordinal: ordinal as u32,
                start_char,
            })
            .collect()
    }

    pub fn split_documents(&self, docs: &[Document]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = docs.iter().flat_map(|d| self.split_document(d)).collect();
        tracing::info!(documents = docs.len(), chunks = chunks.len(), "split documents into chunks");
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_windows() {
        assert_eq!(Chunker::new(0, 0).unwrap_err().code, "CHUNKING_INVALID");
        assert_eq!(Chunker::new(10, 10).unwrap_err().code, "CHUNKING_INVALID");
        assert!(Chunker::new(10, 9).is_ok());
    }

    #[test]
    fn windows_step_by_size_minus_overlap() {
        let c = Chunker::new(4, 1).unwrap();
        let got = c.split_text("abcdefghij");
        assert_eq!(
            got,
            vec![
                (0, "abcd".to_string()),
                (3, "defg".to_string()),
                (6, "ghij".to_string()),
            ]
        );
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let c = Chunker::new(3, 1).unwrap();
        let got = c.split_text("溶接不良品");
        assert_eq!(got, vec![(0, "溶接不".to_string()), (2, "不良品".to_string())]);
    }
}
