//! Structured legal analysis stored on a document

use serde::{Deserialize, Serialize};

/// Severity of an identified risk
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskLevel {
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
}

/// A risk called out by the analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Risk {
    pub level: RiskLevel,
    pub description: String,
}

/// How much the summary can be trusted
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummaryConfidence {
    /// Parsed from the model's structured output
    #[default]
    Model,
    /// Synthesized because the model output was unusable
    Low,
}

/// Structured summary of a legal document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryData {
    #[serde(default)]
    pub key_clauses: Vec<String>,
    #[serde(default)]
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub obligations: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub confidence: SummaryConfidence,
    /// True when this is the synthetic fallback, not a real analysis
    #[serde(default)]
    pub fallback: bool,
}

impl SummaryData {
    /// Placeholder used when the model output cannot be parsed.
    ///
    /// Flagged as low confidence so callers never mistake it for an analysis.
    pub fn low_confidence_fallback() -> Self {
        Self {
            key_clauses: vec![
                "Automated analysis unavailable for this document".to_string(),
            ],
            risks: vec![Risk {
                level: RiskLevel::Medium,
                description: "Document requires manual review for specific risk assessment"
                    .to_string(),
            }],
            obligations: vec![
                "Review document thoroughly".to_string(),
                "Consult legal counsel as needed".to_string(),
            ],
            recommendations: vec![
                "Manual document review recommended".to_string(),
                "Consider legal consultation".to_string(),
            ],
            confidence: SummaryConfidence::Low,
            fallback: true,
        }
    }

    /// Nothing useful was extracted
    pub fn is_empty(&self) -> bool {
        self.key_clauses.is_empty()
            && self.risks.is_empty()
            && self.obligations.is_empty()
            && self.recommendations.is_empty()
    }
}
