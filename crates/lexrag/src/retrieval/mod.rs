//! Question answering over retrieved chunks

mod service;

pub use service::{filter_matches, RetrievalQueryService};
