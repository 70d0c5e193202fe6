//! PDF text extraction
//!
//! Two strategies share one contract. The structural path walks each
//! page's content stream with lopdf and collects the strings shown by
//! text operators. The salvage path treats the raw bytes as text, strips
//! PDF syntax and keeps only runs that look like prose; it misfires on
//! image-based or heavily encoded files.

use lopdf::content::Content;
use lopdf::{Document as PdfDocument, Object};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

/// Salvaged sentences must have at least this many words longer than two characters
const MIN_SENTENCE_WORDS: usize = 3;
/// Salvaged sentence length bounds (characters)
const MIN_SENTENCE_LEN: usize = 20;
const MAX_SENTENCE_LEN: usize = 1000;
/// TJ kerning offsets below this (thousandths of an em) are treated as word gaps
const TJ_WORD_GAP: f64 = -200.0;

/// Extract text page by page: runs joined with single spaces, pages with blank lines
pub fn extract_structural(data: &[u8]) -> Result<String> {
    let doc = PdfDocument::load_mem(data)
        .map_err(|e| Error::extraction(format!("Failed to load PDF: {}", e)))?;

    let mut pages = Vec::new();

    for (page_number, page_id) in doc.get_pages() {
        let content = match doc.get_page_content(page_id) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("Could not get content for page {}: {}", page_number, e);
                continue;
            }
        };

        let runs = text_runs(&content);
        if !runs.is_empty() {
            pages.push(runs.join(" "));
        }
    }

    if pages.is_empty() {
        return Err(Error::extraction(
            "PDF has no extractable text runs; it may be image-based or encrypted",
        ));
    }

    Ok(pages.join("\n\n"))
}

/// Strings shown by `Tj`, `TJ`, `'` and `"` in one content stream
fn text_runs(content: &[u8]) -> Vec<String> {
    let content = match Content::decode(content) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!("Undecodable content stream: {}", e);
            return Vec::new();
        }
    };

    content
        .operations
        .iter()
        .filter_map(|op| match op.operator.as_str() {
            "Tj" | "'" | "\"" => op.operands.last().and_then(string_operand),
            "TJ" => op.operands.first().map(array_operand),
            _ => None,
        })
        .map(|run| collapse_whitespace(&run))
        .filter(|run| !run.is_empty())
        .collect()
}

fn string_operand(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
        _ => None,
    }
}

fn array_operand(object: &Object) -> String {
    let mut text = String::new();

    if let Object::Array(items) = object {
        for item in items {
            match item {
                Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
                Object::Integer(offset) if (*offset as f64) < TJ_WORD_GAP => text.push(' '),
                Object::Real(offset) if f64::from(*offset) < TJ_WORD_GAP => text.push(' '),
                _ => {}
            }
        }
    }

    text
}

/// UTF-16BE when BOM-prefixed, otherwise one byte per character
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    bytes.iter().map(|&b| b as char).collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

static DICTIONARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"<<[^>]*>>").expect("valid regex"));
static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"/[A-Za-z]+\s*").expect("valid regex"));
static OBJECT_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+\s+\d+\s+obj\b").expect("valid regex"));
static OBJECT_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bendobj\b").expect("valid regex"));
static STREAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bstream\b[\s\S]*?\bendstream\b").expect("valid regex"));
static XREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bxref\b[\s\S]*?\btrailer\b").expect("valid regex"));
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"%%[^%\n]*%%").expect("valid regex"));
static CONTROL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F-\x9F]").expect("valid regex")
});
static NON_PRINTABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\x20-\x7E\n\r\t]+").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static TERMINATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").expect("valid regex"));

/// Best-effort prose recovery from raw PDF bytes.
///
/// Fails when no candidate sentence survives or the result is shorter
/// than `min_text_length` characters.
pub fn salvage_text(data: &[u8], min_text_length: usize) -> Result<String> {
    let raw = String::from_utf8_lossy(data);
    let cleaned = strip_pdf_syntax(&raw);

    let sentences: Vec<&str> = TERMINATORS
        .split(&cleaned)
        .map(str::trim)
        .filter(|s| is_candidate_sentence(s))
        .collect();

    if sentences.is_empty() {
        return Err(salvage_failure("no readable sentences found in PDF"));
    }

    let text = sentences.join(". ").trim().to_string();

    if text.chars().count() < min_text_length {
        return Err(salvage_failure(&format!(
            "extracted text is too short for meaningful analysis ({} < {} characters)",
            text.chars().count(),
            min_text_length
        )));
    }

    tracing::debug!(
        "Salvaged {} sentences ({} chars) from PDF bytes",
        sentences.len(),
        text.len()
    );

    Ok(text)
}

fn strip_pdf_syntax(raw: &str) -> String {
    let text = DICTIONARY.replace_all(raw, " ");
    let text = NAME.replace_all(&text, " ");
    let text = OBJECT_HEADER.replace_all(&text, " ");
    let text = OBJECT_END.replace_all(&text, " ");
    let text = STREAM.replace_all(&text, " ");
    let text = XREF.replace_all(&text, " ");
    let text = COMMENT.replace_all(&text, " ");
    let text = CONTROL.replace_all(&text, " ");
    let text = NON_PRINTABLE.replace_all(&text, " ");
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

fn is_candidate_sentence(sentence: &str) -> bool {
    let words = sentence
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .count();
    let len = sentence.chars().count();

    words >= MIN_SENTENCE_WORDS && (MIN_SENTENCE_LEN..=MAX_SENTENCE_LEN).contains(&len)
}

fn salvage_failure(reason: &str) -> Error {
    Error::extraction(format!(
        "Failed to extract readable text from PDF: {}. Please try uploading a text-based PDF or convert to a text file.",
        reason
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{dictionary, Stream};

    /// Build a minimal PDF with one content stream per page
    pub(crate) fn build_pdf(pages: &[Vec<Operation>]) -> Vec<u8> {
        let mut doc = PdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for operations in pages {
            let content = Content {
                operations: operations.clone(),
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    pub(crate) fn text_page(lines: &[&str]) -> Vec<Operation> {
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        for line in lines {
            ops.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        }
        ops.push(Operation::new("ET", vec![]));
        ops
    }

    #[test]
    fn test_structural_joins_runs_and_pages() {
        let pdf = build_pdf(&[
            text_page(&["This Agreement is made", "between the parties."]),
            text_page(&["Rent is due monthly."]),
        ]);

        let text = extract_structural(&pdf).unwrap();
        assert_eq!(
            text,
            "This Agreement is made between the parties.\n\nRent is due monthly."
        );
    }

    #[test]
    fn test_structural_tj_array_spacing() {
        let tj = Operation::new(
            "TJ",
            vec![Object::Array(vec![
                Object::string_literal("Gov"),
                Object::Integer(-20),
                Object::string_literal("erning"),
                Object::Integer(-400),
                Object::string_literal("law"),
            ])],
        );
        let pdf = build_pdf(&[vec![Operation::new("BT", vec![]), tj, Operation::new("ET", vec![])]]);

        assert_eq!(extract_structural(&pdf).unwrap(), "Governing law");
    }

    #[test]
    fn test_structural_rejects_non_pdf() {
        assert!(matches!(
            extract_structural(b"plain bytes, not a pdf"),
            Err(Error::Extraction(_))
        ));
    }

    #[test]
    fn test_structural_rejects_textless_pdf() {
        let pdf = build_pdf(&[vec![Operation::new("BT", vec![]), Operation::new("ET", vec![])]]);
        assert!(extract_structural(&pdf).is_err());
    }

    #[test]
    fn test_decode_utf16_string() {
        let bytes = [0xFE, 0xFF, 0x00, 0x53, 0x00, 0xA7];
        assert_eq!(decode_pdf_string(&bytes), "S§");
    }

    #[test]
    fn test_salvage_keeps_prose() {
        let raw = b"%PDF-1.4\n1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n\
2 0 obj\nstream\n\x01\x02binary junk here\nendstream\nendobj\n\
The tenant shall pay monthly rent on the first day. \
The landlord is responsible for structural repairs to the building. \
Either party may terminate with thirty days written notice.\n\
xref\n0 3\n0000000000 65535 f\ntrailer\n%%EOF";

        let text = salvage_text(raw, 100).unwrap();
        assert!(text.contains("The landlord is responsible for structural repairs to the building"));
        assert!(text.contains("Either party may terminate with thirty days written notice"));
        assert!(!text.contains("endobj"));
        assert!(!text.contains("Catalog"));
        assert!(!text.contains("binary junk"));
        assert!(!text.contains("0000000000"));
    }

    #[test]
    fn test_salvage_no_sentences() {
        let err = salvage_text(&[0x00, 0xFF, 0x13, 0x88, b'%', b'%'], 100).unwrap_err();
        assert!(err.to_string().contains("no readable sentences"));
    }

    #[test]
    fn test_salvage_too_short() {
        let raw = b"The tenant shall pay rent. The landlord keeps the keys.";
        let err = salvage_text(raw, 100).unwrap_err();
        assert!(err.to_string().contains("too short"));

        // The same input passes a lower threshold
        assert!(salvage_text(raw, 50).is_ok());
    }

    #[test]
    fn test_candidate_sentence_rules() {
        assert!(is_candidate_sentence("The tenant shall pay rent"));
        assert!(!is_candidate_sentence("a b c d e f g h i j k l m n o"));
        assert!(!is_candidate_sentence("Too short ok"));
        assert!(!is_candidate_sentence(&"word ".repeat(250)));
    }
}
