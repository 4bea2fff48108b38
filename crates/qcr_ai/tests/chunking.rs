use pretty_assertions::assert_eq;
use qcr_ai::chunking::Chunker;
use qcr_core::domain::{Document, Metadata, META_FILE_TYPE, META_SOURCE_FILE};

fn doc(text: &str) -> Document {
    let mut metadata = Metadata::new();
    metadata.insert(META_SOURCE_FILE.to_string(), "case.txt".to_string());
    metadata.insert(META_FILE_TYPE.to_string(), ".txt".to_string());
    metadata.insert("page".to_string(), "2".to_string());
    Document::new(text, metadata)
}

#[test]
fn chunks_respect_size_and_exact_overlap() {
    let text: String = (0..2537).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let chunker = Chunker::new(1000, 200).unwrap();
    let chunks = chunker.split_document(&doc(&text));
    assert_eq!(chunks.len(), 3);

    for c in &chunks {
        assert!(c.content.chars().count() <= 1000);
    }
    for pair in chunks.windows(2) {
        let prev: Vec<char> = pair[0].content.chars().collect();
        let next: Vec<char> = pair[1].content.chars().collect();
        assert_eq!(prev[prev.len() - 200..], next[..200]);
        assert_eq!(pair[1].start_char, pair[0].start_char + 800);
    }

    let mut rebuilt = chunks[0].content.clone();
    for c in &chunks[1..] {
        rebuilt.extend(c.content.chars().skip(200));
    }
    assert_eq!(rebuilt, text);
}

#[test]
fn short_and_exact_size_documents_yield_one_chunk() {
    let chunker = Chunker::new(1000, 200).unwrap();
    assert_eq!(chunker.split_document(&doc("Porosity in weld seam.")).len(), 1);

    let exact = "x".repeat(1000);
    let chunks = chunker.split_document(&doc(&exact));
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, exact);
}

#[test]
fn blank_documents_yield_no_chunks() {
    let chunker = Chunker::new(100, 10).unwrap();
    assert!(chunker.split_document(&doc("")).is_empty());
    assert!(chunker.split_document(&doc(" \n\t ")).is_empty());
}

#[test]
fn metadata_is_copied_to_every_chunk() {
    let chunker = Chunker::new(10, 2).unwrap();
    let d = doc("Bore diameter out of tolerance on housings.");
    let chunks = chunker.split_documents(&[d.clone(), doc("second")]);
    assert!(chunks.len() > 2);
    for c in &chunks {
        assert_eq!(c.metadata, d.metadata);
    }
    let ordinals: Vec<u32> = chunks.iter().filter(|c| c.content != "second").map(|c| c.ordinal).collect();
    assert_eq!(ordinals, (0..ordinals.len() as u32).collect::<Vec<_>>());
}
