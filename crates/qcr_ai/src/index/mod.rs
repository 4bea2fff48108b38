mod builder;
mod model;
mod store;

pub use builder::{build_index_from_folder, index_status, load_index, IndexBuilder};
pub use model::{
    chunk_id_for, sha256_hex, BuildReport, DistanceMetric, IndexManifest, IndexStatus, IndexedChunk, SearchHit,
    UpdateMode, UpdateReport, FORMAT_VERSION,
};
pub use store::{VectorIndex, DOCSTORE_FILE, MANIFEST_FILE, VECTORS_FILE};
