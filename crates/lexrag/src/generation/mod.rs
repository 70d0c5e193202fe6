//! Prompt construction and structured summary generation

pub mod prompt;
pub mod summary;

pub use prompt::PromptBuilder;
pub use summary::{parse_summary, SummaryGenerator};
