//! Per-document data flowing through the extraction pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::bill::{FieldKey, FieldValue};
use crate::error::ProviderError;

/// Identifier of an extraction provider (e.g. `"lopdf"`).
pub type ProviderId = String;

/// A 2-D grid of table cells, row-major.
pub type TableGrid = Vec<Vec<String>>;

/// One provider's raw output, or failure, for one document.
///
/// Built once by the provider and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionAttempt {
    /// Provider that produced the attempt.
    pub provider_id: ProviderId,
    /// Text blocks in reading order (usually one per page).
    pub raw_text: Vec<String>,
    /// Tables found in the document.
    pub raw_tables: Vec<TableGrid>,
    /// Whether the provider produced usable output.
    pub succeeded: bool,
    /// Failure or warning reported by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionAttempt {
    /// A successful attempt.
    pub fn success(
        provider_id: impl Into<ProviderId>,
        raw_text: Vec<String>,
        raw_tables: Vec<TableGrid>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            raw_text,
            raw_tables,
            succeeded: true,
            error: None,
        }
    }

    /// Attach a non-fatal warning to a successful attempt.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.error = Some(warning.into());
        self
    }

    /// A failed attempt carrying the failure reason.
    pub fn failure(provider_id: impl Into<ProviderId>, error: &ProviderError) -> Self {
        Self {
            provider_id: provider_id.into(),
            raw_text: Vec::new(),
            raw_tables: Vec::new(),
            succeeded: false,
            error: Some(error.to_string()),
        }
    }

    /// Total number of non-whitespace characters across text blocks.
    pub fn text_len(&self) -> usize {
        self.raw_text
            .iter()
            .map(|block| block.chars().filter(|c| !c.is_whitespace()).count())
            .sum()
    }

    /// Whether any table has at least two rows and two columns.
    pub fn has_table_structure(&self) -> bool {
        self.raw_tables
            .iter()
            .any(|t| t.len() >= 2 && t.iter().any(|row| row.len() >= 2))
    }
}

/// Where a candidate was found inside an attempt.
///
/// Text locations order before table locations; within each, by block or
/// table position. Used as the last-resort tie-break between candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchLocation {
    Text { block: usize },
    Table { table: usize, row: usize, col: usize },
}

/// Location plus byte range of a rule match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchSpan {
    pub location: MatchLocation,
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    pub fn text(block: usize, start: usize, end: usize) -> Self {
        Self {
            location: MatchLocation::Text { block },
            start,
            end,
        }
    }

    pub fn cell(table: usize, row: usize, col: usize, len: usize) -> Self {
        Self {
            location: MatchLocation::Table { table, row, col },
            start: 0,
            end: len,
        }
    }
}

/// A single rule's proposed value for one field, from one attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCandidate {
    pub field: FieldKey,
    pub value: FieldValue,
    pub source_provider_id: ProviderId,
    /// Rule specificity weight in [0, 1].
    pub local_confidence: f32,
    pub raw_match_span: MatchSpan,
    /// Name of the rule that produced the candidate.
    pub rule: &'static str,
}

/// The reconciled, per-document output row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Document identifier (file name).
    pub document_id: String,
    /// When reconciliation finished.
    pub extracted_at: DateTime<Local>,
    /// Chosen value per present field.
    pub fields: BTreeMap<FieldKey, FieldValue>,
    /// Confidence per field; absent fields carry 0.
    pub field_confidence: BTreeMap<FieldKey, f32>,
    /// Overall document quality in [0, 1].
    pub overall_confidence: f32,
    /// Provider whose candidate won each present field.
    pub winning_provider_per_field: BTreeMap<FieldKey, ProviderId>,
    /// Provider that contributed most of the record.
    pub primary_provider: Option<ProviderId>,
    /// Provider failures, reconciliation notes and other non-fatal issues.
    pub errors: Vec<String>,
}

impl CanonicalRecord {
    /// An empty record with no fields.
    pub fn empty(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            extracted_at: Local::now(),
            fields: BTreeMap::new(),
            field_confidence: BTreeMap::new(),
            overall_confidence: 0.0,
            winning_provider_per_field: BTreeMap::new(),
            primary_provider: None,
            errors: Vec::new(),
        }
    }

    /// Value of a field, if present.
    pub fn get(&self, key: impl Into<FieldKey>) -> Option<&FieldValue> {
        self.fields.get(&key.into())
    }

    /// Confidence of a field, 0 when absent.
    pub fn confidence_of(&self, key: &FieldKey) -> f32 {
        self.field_confidence.get(key).copied().unwrap_or(0.0)
    }
}

/// One discrepancy-log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancyEntry {
    pub document_id: String,
    pub overall_confidence: f32,
    pub missing_critical_fields: Vec<String>,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_attempt_carries_reason() {
        let attempt = ExtractionAttempt::failure("lopdf", &ProviderError::Encrypted);
        assert!(!attempt.succeeded);
        assert_eq!(attempt.error.as_deref(), Some("document is encrypted"));
        assert_eq!(attempt.text_len(), 0);
    }

    #[test]
    fn test_warning_keeps_attempt_successful() {
        let attempt = ExtractionAttempt::success("lopdf", vec!["testo".into()], vec![])
            .with_warning("page 2 unreadable");
        assert!(attempt.succeeded);
        assert_eq!(attempt.error.as_deref(), Some("page 2 unreadable"));
    }

    #[test]
    fn test_table_structure_needs_two_by_two() {
        let one_row = ExtractionAttempt::success("t", vec![], vec![vec![vec!["a".into(), "b".into()]]]);
        assert!(!one_row.has_table_structure());

        let grid = vec![
            vec!["Voce".to_string(), "Importo".to_string()],
            vec!["Totale".to_string(), "99,62".to_string()],
        ];
        let two_rows = ExtractionAttempt::success("t", vec![], vec![grid]);
        assert!(two_rows.has_table_structure());
    }

    #[test]
    fn test_span_ordering_prefers_text_then_position() {
        let early = MatchSpan::text(0, 5, 10);
        let later = MatchSpan::text(0, 20, 30);
        let next_page = MatchSpan::text(1, 0, 3);
        let cell = MatchSpan::cell(0, 0, 0, 4);
        assert!(early < later);
        assert!(later < next_page);
        assert!(next_page < cell);
    }
}
