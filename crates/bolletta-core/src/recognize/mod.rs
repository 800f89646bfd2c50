//! Field recognition: raw provider output to field candidates.
//!
//! Recognition is pure. It never fails; a rule that finds nothing, or only
//! unparseable matches, simply contributes no candidate.

pub mod rules;

use tracing::debug;

use crate::models::{ExtractionAttempt, FieldCandidate};
use rules::patterns::HORIZONTAL_SPACE;
use rules::tables::recognize_tables;
use rules::{recognize_supplier, TEXT_RULES};

/// Applies the pattern catalog to one extraction attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldRecognizer;

impl FieldRecognizer {
    pub fn new() -> Self {
        Self
    }

    /// Produce candidates from one attempt. Failed attempts yield nothing.
    pub fn recognize(&self, attempt: &ExtractionAttempt) -> Vec<FieldCandidate> {
        if !attempt.succeeded {
            return Vec::new();
        }

        let blocks: Vec<String> = attempt.raw_text.iter().map(|b| normalize_text(b)).collect();
        let provider = attempt.provider_id.as_str();

        let mut candidates: Vec<FieldCandidate> = TEXT_RULES
            .iter()
            .filter_map(|rule| rule.apply(provider, &blocks))
            .collect();
        candidates.extend(recognize_supplier(provider, &blocks));
        candidates.extend(recognize_tables(provider, &attempt.raw_tables));

        debug!(
            provider = provider,
            candidates = candidates.len(),
            "Recognized field candidates"
        );
        candidates
    }
}

/// Collapse runs of horizontal whitespace (including no-break spaces) into a
/// single space on every line. Line breaks are preserved.
pub fn normalize_text(text: &str) -> String {
    text.lines()
        .map(|line| HORIZONTAL_SPACE.replace_all(line.trim(), " "))
        .collect::<Vec<_>>()
        .join("\n")
}
