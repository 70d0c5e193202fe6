//! Structured legal summary generation

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SummaryConfig;
use crate::error::{Error, Result};
use crate::processing::load_owned;
use crate::providers::{ChatOptions, ChatProvider};
use crate::storage::DocumentRepository;
use crate::types::SummaryData;

use super::prompt::PromptBuilder;

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("valid regex")
});

/// Asks the chat service for a structured analysis of a chunked document
pub struct SummaryGenerator {
    repository: Arc<dyn DocumentRepository>,
    chat: Arc<dyn ChatProvider>,
    config: SummaryConfig,
}

impl SummaryGenerator {
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        chat: Arc<dyn ChatProvider>,
        config: SummaryConfig,
    ) -> Self {
        Self {
            repository,
            chat,
            config,
        }
    }

    /// Analyze the document's text and store the result on the document
    pub async fn generate(&self, document_id: Uuid, user_id: &str) -> Result<SummaryData> {
        let mut document = load_owned(self.repository.as_ref(), document_id, user_id)?;

        let chunks = self.repository.get_chunks(&document_id)?;
        if chunks.is_empty() {
            return Err(Error::NotReady(format!(
                "Document {} has no chunks to summarize",
                document_id
            )));
        }

        let full_text: String = chunks
            .iter()
            .map(|c| c.chunk_text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .chars()
            .take(self.config.max_input_chars)
            .collect();

        tracing::info!(
            document_id = %document_id,
            "Generating summary from {} chars with {}",
            full_text.len(),
            self.chat.model()
        );

        let raw = self
            .chat
            .complete(
                &PromptBuilder::build_summary_messages(&full_text),
                ChatOptions {
                    temperature: self.config.temperature,
                    max_tokens: self.config.max_tokens,
                },
            )
            .await?;

        let summary = parse_summary(&raw);

        document.summary_data = Some(summary.clone());
        document.summary_generated = true;
        document.updated_at = chrono::Utc::now();
        if !self
            .repository
            .update_document_if(&document, document.processing_status)?
        {
            return Err(Error::Conflict(format!(
                "Document {} changed while its summary was generated",
                document_id
            )));
        }

        Ok(summary)
    }
}

/// Parse model output: direct JSON, then a fenced JSON block, then the
/// low-confidence fallback.
pub fn parse_summary(raw: &str) -> SummaryData {
    match parse_direct(raw).or_else(|_| parse_fenced(raw)) {
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!("Summary output unusable ({}), storing low-confidence fallback", e);
            SummaryData::low_confidence_fallback()
        }
    }
}

fn parse_direct(raw: &str) -> Result<SummaryData> {
    let summary: SummaryData = serde_json::from_str(raw.trim())
        .map_err(|e| Error::Parse(format!("not a JSON summary: {}", e)))?;
    non_empty(summary)
}

fn parse_fenced(raw: &str) -> Result<SummaryData> {
    let block = FENCED_JSON
        .captures(raw)
        .and_then(|c| c.get(1))
        .ok_or_else(|| Error::Parse("no fenced JSON block".into()))?;

    let summary: SummaryData = serde_json::from_str(block.as_str())
        .map_err(|e| Error::Parse(format!("fenced block is not a JSON summary: {}", e)))?;
    non_empty(summary)
}

fn non_empty(summary: SummaryData) -> Result<SummaryData> {
    if summary.is_empty() {
        return Err(Error::Parse("summary has no content".into()));
    }
    // Model output never gets to claim it is a fallback
    Ok(SummaryData {
        confidence: Default::default(),
        fallback: false,
        ..summary
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockChatProvider;
    use crate::test_support::Fixture;
    use crate::types::{Chunk, Document, RiskLevel, SummaryConfidence};

    const ANALYSIS: &str = r#"{
        "key_clauses": ["Term of twelve months"],
        "risks": [{"level": "High", "description": "Uncapped liability"}],
        "obligations": ["Pay rent monthly"],
        "recommendations": ["Negotiate a liability cap"]
    }"#;

    #[test]
    fn test_parse_direct() {
        let summary = parse_summary(ANALYSIS);
        assert_eq!(summary.key_clauses, vec!["Term of twelve months"]);
        assert_eq!(summary.risks[0].level, RiskLevel::High);
        assert_eq!(summary.confidence, SummaryConfidence::Model);
        assert!(!summary.fallback);
    }

    #[test]
    fn test_parse_fenced() {
        let raw = format!("Here is the analysis:\n```json\n{}\n```\nLet me know!", ANALYSIS);
        let summary = parse_summary(&raw);
        assert_eq!(summary.obligations, vec!["Pay rent monthly"]);
        assert!(!summary.fallback);
    }

    #[test]
    fn test_parse_lowercase_levels() {
        let summary = parse_summary(r#"{"risks": [{"level": "low", "description": "Minor"}]}"#);
        assert_eq!(summary.risks[0].level, RiskLevel::Low);
    }

    #[test]
    fn test_unparseable_falls_back_flagged() {
        let summary = parse_summary("I'm sorry, I cannot analyze this document.");
        assert_eq!(summary, SummaryData::low_confidence_fallback());
        assert_eq!(summary.confidence, SummaryConfidence::Low);
        assert!(summary.fallback);
    }

    #[test]
    fn test_empty_object_falls_back() {
        assert!(parse_summary("{}").fallback);
    }

    #[test]
    fn test_model_cannot_claim_fallback() {
        let summary =
            parse_summary(r#"{"key_clauses": ["A"], "confidence": "low", "fallback": true}"#);
        assert!(!summary.fallback);
        assert_eq!(summary.confidence, SummaryConfidence::Model);
    }

    fn chunked(fixture: &Fixture, texts: &[&str]) -> Document {
        let doc = Document::new(
            Uuid::new_v4(),
            "user-1",
            "MSA.pdf",
            "application/pdf",
            10,
            "user-1/msa.pdf",
        );
        fixture.repository.insert_document(&doc).unwrap();
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk::new(doc.id, "user-1", i as u32, t.to_string(), 1))
            .collect();
        fixture.repository.insert_chunks(&chunks).unwrap();
        doc
    }

    #[tokio::test]
    async fn test_generate_stores_summary() {
        let fixture = Fixture::new();
        let doc = chunked(&fixture, &["First clause.", "Second clause."]);

        let mut chat = MockChatProvider::new();
        chat.expect_model().return_const("gpt-4o-mini".to_string());
        chat.expect_complete()
            .withf(|messages, options| {
                messages[1].content.ends_with("First clause.\nSecond clause.")
                    && options.max_tokens == 1500
            })
            .times(1)
            .returning(|_, _| Ok(ANALYSIS.to_string()));

        let generator = SummaryGenerator::new(
            fixture.repository.clone(),
            Arc::new(chat),
            SummaryConfig::default(),
        );
        let summary = generator.generate(doc.id, "user-1").await.unwrap();
        assert_eq!(summary.recommendations, vec!["Negotiate a liability cap"]);

        let doc = fixture.reload(&doc);
        assert!(doc.summary_generated);
        assert_eq!(doc.summary_data, Some(summary));
    }

    #[tokio::test]
    async fn test_generate_truncates_input() {
        let fixture = Fixture::new();
        let long = "a".repeat(5000);
        let doc = chunked(&fixture, &[&long, &long]);

        let mut chat = MockChatProvider::new();
        chat.expect_model().return_const("m".to_string());
        chat.expect_complete()
            .withf(|messages, _| messages[1].content.matches('a').count() <= 100 + 8000)
            .returning(|_, _| Ok("not json".to_string()));

        let generator = SummaryGenerator::new(
            fixture.repository.clone(),
            Arc::new(chat),
            SummaryConfig::default(),
        );
        let summary = generator.generate(doc.id, "user-1").await.unwrap();
        assert!(summary.fallback);
        assert!(fixture.reload(&doc).summary_generated);
    }

    #[tokio::test]
    async fn test_generate_requires_chunks() {
        let fixture = Fixture::new();
        let doc = fixture.upload("user-1", "a.txt", "text/plain", b"x").await;

        let mut chat = MockChatProvider::new();
        chat.expect_complete().times(0);

        let generator = SummaryGenerator::new(
            fixture.repository.clone(),
            Arc::new(chat),
            SummaryConfig::default(),
        );
        assert!(matches!(
            generator.generate(doc.id, "user-1").await,
            Err(Error::NotReady(_))
        ));
    }

    #[tokio::test]
    async fn test_summary_dropped_when_document_is_reingested() {
        let fixture = Fixture::new();
        let doc = chunked(&fixture, &["Clause."]);

        let repository = fixture.repository.clone();
        let id = doc.id;
        let mut chat = MockChatProvider::new();
        chat.expect_model().return_const("m".to_string());
        chat.expect_complete().times(1).returning(move |_, _| {
            assert!(repository.claim_processing(&id).unwrap());
            Ok(ANALYSIS.to_string())
        });

        let generator = SummaryGenerator::new(
            fixture.repository.clone(),
            Arc::new(chat),
            SummaryConfig::default(),
        );
        let err = generator.generate(doc.id, "user-1").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let doc = fixture.reload(&doc);
        assert!(!doc.summary_generated);
        assert_eq!(doc.processing_status, crate::types::ProcessingStatus::Processing);
    }

    #[tokio::test]
    async fn test_chat_failure_propagates() {
        let fixture = Fixture::new();
        let doc = chunked(&fixture, &["Clause."]);

        let mut chat = MockChatProvider::new();
        chat.expect_model().return_const("m".to_string());
        chat.expect_complete()
            .returning(|_, _| Err(Error::external("openai", "502 Bad Gateway")));

        let generator = SummaryGenerator::new(
            fixture.repository.clone(),
            Arc::new(chat),
            SummaryConfig::default(),
        );
        assert!(generator.generate(doc.id, "user-1").await.is_err());
        assert!(!fixture.reload(&doc).summary_generated);
    }
}
