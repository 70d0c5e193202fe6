//! Token count approximation
//!
//! Not a tokenizer: one token is assumed per four characters. The chunker
//! and the stored `token_count` both depend on this exact formula, so it
//! must stay stable across reprocessing.

/// Estimated token count: `ceil(chars / 4)`
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
