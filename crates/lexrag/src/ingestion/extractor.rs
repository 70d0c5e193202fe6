//! Declared-type dispatch from raw bytes to text

use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::error::Result;

use super::pdf;

/// How PDF bytes are turned into text
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PdfMode {
    /// Content-stream text operators only
    Structural,
    /// Regex salvage of prose from the raw bytes only
    Salvage,
    /// Structural first, salvage when it yields nothing
    #[default]
    StructuralWithFallback,
}

/// Turns stored document bytes into raw (unsanitized) text
#[derive(Debug, Clone)]
pub struct TextExtractor {
    pdf_mode: PdfMode,
    min_text_length: usize,
}

impl TextExtractor {
    pub fn new(pdf_mode: PdfMode, min_text_length: usize) -> Self {
        Self {
            pdf_mode,
            min_text_length,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.pdf_mode, config.min_text_length)
    }

    /// Extract text according to the declared content type.
    ///
    /// Plain-text types and anything unrecognized are decoded as lossy
    /// UTF-8; PDFs go through the configured [`PdfMode`].
    pub fn extract(&self, data: &[u8], declared_type: &str) -> Result<String> {
        let declared_type = declared_type.to_ascii_lowercase();

        if declared_type.contains("text") || declared_type.contains("plain") {
            return Ok(String::from_utf8_lossy(data).into_owned());
        }

        if declared_type.contains("pdf") {
            return self.extract_pdf(data);
        }

        tracing::debug!(
            "No dedicated extractor for '{}', decoding as UTF-8",
            declared_type
        );
        Ok(String::from_utf8_lossy(data).into_owned())
    }

    fn extract_pdf(&self, data: &[u8]) -> Result<String> {
        match self.pdf_mode {
            PdfMode::Structural => pdf::extract_structural(data),
            PdfMode::Salvage => pdf::salvage_text(data, self.min_text_length),
            PdfMode::StructuralWithFallback => match pdf::extract_structural(data) {
                Ok(text) if !text.trim().is_empty() => Ok(text),
                Ok(_) => {
                    tracing::warn!("Structural PDF extraction produced no text, salvaging");
                    pdf::salvage_text(data, self.min_text_length)
                }
                Err(e) => {
                    tracing::warn!("Structural PDF extraction failed ({}), salvaging", e);
                    pdf::salvage_text(data, self.min_text_length)
                }
            },
        }
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ingestion::pdf::tests::{build_pdf, text_page};

    const SALVAGEABLE: &[u8] = b"%PDF-1.3\n1 0 obj << /Length 5 >> stream\nxx\nendstream endobj\n\
This lease begins on the first of the month and runs for twelve months. \
The tenant must keep the premises clean and in good repair at all times.\n%%EOF";

    #[test]
    fn test_plain_text_passthrough() {
        let extractor = TextExtractor::default();
        let text = extractor
            .extract("Section 1. Definitions.".as_bytes(), "text/plain")
            .unwrap();
        assert_eq!(text, "Section 1. Definitions.");
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let extractor = TextExtractor::default();
        let text = extractor.extract(&[b'o', b'k', 0xFF], "text/markdown").unwrap();
        assert_eq!(text, "ok\u{FFFD}");
    }

    #[test]
    fn test_unknown_type_decodes() {
        let extractor = TextExtractor::default();
        let text = extractor
            .extract(b"<p>clause</p>", "application/octet-stream")
            .unwrap();
        assert_eq!(text, "<p>clause</p>");
    }

    #[test]
    fn test_structural_pdf() {
        let pdf = build_pdf(&[text_page(&["Governing law is Delaware."])]);
        let extractor = TextExtractor::new(PdfMode::Structural, 100);
        assert_eq!(
            extractor.extract(&pdf, "application/pdf").unwrap(),
            "Governing law is Delaware."
        );
    }

    #[test]
    fn test_structural_only_does_not_salvage() {
        let extractor = TextExtractor::new(PdfMode::Structural, 100);
        assert!(matches!(
            extractor.extract(SALVAGEABLE, "application/pdf"),
            Err(Error::Extraction(_))
        ));
    }

    #[test]
    fn test_fallback_salvages_broken_pdf() {
        let extractor = TextExtractor::new(PdfMode::StructuralWithFallback, 100);
        let text = extractor.extract(SALVAGEABLE, "APPLICATION/PDF").unwrap();
        assert!(text.contains("The tenant must keep the premises clean"));
    }

    #[test]
    fn test_fallback_failure_is_extraction_error() {
        let extractor = TextExtractor::default();
        let err = extractor
            .extract(&[0x25, 0x50, 0x44, 0x46, 0x00, 0x9C], "application/pdf")
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}
