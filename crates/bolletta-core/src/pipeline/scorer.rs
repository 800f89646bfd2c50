//! Attempt scoring: a field-agnostic quality estimate for raw provider output.

use crate::models::config::ScoringConfig;
use crate::models::ExtractionAttempt;

/// Rates attempts in [0, 1]. Used as the per-provider multiplier of
/// candidate confidence during reconciliation.
#[derive(Debug, Clone)]
pub struct AttemptScorer {
    config: ScoringConfig,
}

impl AttemptScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Quality of one attempt. Failed attempts score 0.
    pub fn score(&self, attempt: &ExtractionAttempt) -> f32 {
        if !attempt.succeeded {
            return 0.0;
        }

        let saturation = self.config.text_saturation.max(1) as f32;
        let text = (attempt.text_len() as f32 / saturation).min(1.0);
        let table = if attempt.has_table_structure() { 1.0 } else { 0.0 };
        let clean = if attempt.error.is_none() { 1.0 } else { 0.0 };

        let quality = self.config.text_weight * text
            + self.config.table_weight * table
            + self.config.clean_weight * clean;

        if quality.is_finite() {
            quality.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for AttemptScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}
