pub mod answer;
pub mod chunking;
pub mod embeddings;
pub mod index;
pub mod llm;
pub mod openai;
pub mod retrieve;
pub mod session;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}
