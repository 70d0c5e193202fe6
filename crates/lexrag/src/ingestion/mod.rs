//! Text extraction, sanitization and chunking

mod chunker;
mod extractor;
mod pdf;
mod sanitizer;
mod tokens;

pub use chunker::TextChunker;
pub use extractor::{PdfMode, TextExtractor};
pub use sanitizer::sanitize;
pub use tokens::estimate_tokens;
