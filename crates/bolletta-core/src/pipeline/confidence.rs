//! Document-level confidence from field-level outcomes.

use std::collections::BTreeMap;

use crate::models::config::ConfidenceConfig;
use crate::models::{BillField, CanonicalRecord, FieldKey};

/// Weighted average over the critical-field table plus a capped bonus for
/// any other field that was found.
///
/// ```text
/// overall = (Σ w·conf(critical) + min(Σ bonus·conf(other), cap)) / (Σ w + cap)
/// ```
///
/// Absent critical fields contribute 0 at full weight.
#[derive(Debug, Clone)]
pub struct ConfidenceAggregator {
    weights: BTreeMap<BillField, f32>,
    bonus_per_field: f32,
    bonus_cap: f32,
}

impl ConfidenceAggregator {
    pub fn new(config: &ConfidenceConfig) -> Self {
        let weights = config
            .critical_weights
            .iter()
            .filter_map(|(name, weight)| BillField::from_name(name).map(|f| (f, *weight)))
            .collect();
        Self {
            weights,
            bonus_per_field: config.bonus_per_field,
            bonus_cap: config.bonus_cap,
        }
    }

    /// Critical fields in declaration order.
    pub fn critical_fields(&self) -> impl Iterator<Item = BillField> + '_ {
        self.weights.keys().copied()
    }

    /// Overall confidence of a reconciled record, in [0, 1].
    pub fn score(&self, record: &CanonicalRecord) -> f32 {
        let denominator: f32 = self.weights.values().sum::<f32>() + self.bonus_cap;
        if denominator <= 0.0 {
            return 0.0;
        }

        let critical: f32 = self
            .weights
            .iter()
            .map(|(field, weight)| {
                let key = FieldKey::Known(*field);
                if record.fields.contains_key(&key) {
                    weight * record.confidence_of(&key)
                } else {
                    0.0
                }
            })
            .sum();

        let bonus: f32 = record
            .fields
            .keys()
            .filter(|key| !matches!(key, FieldKey::Known(f) if self.weights.contains_key(f)))
            .map(|key| self.bonus_per_field * record.confidence_of(key))
            .sum();

        let overall = (critical + bonus.min(self.bonus_cap)) / denominator;
        if overall.is_finite() {
            overall.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Populate `overall_confidence`.
    pub fn finalize(&self, mut record: CanonicalRecord) -> CanonicalRecord {
        record.overall_confidence = self.score(&record);
        record
    }

    /// Names of critical fields the record lacks.
    pub fn missing_critical(&self, record: &CanonicalRecord) -> Vec<String> {
        self.critical_fields()
            .filter(|field| !record.fields.contains_key(&FieldKey::Known(*field)))
            .map(|field| field.as_str().to_string())
            .collect()
    }
}

impl Default for ConfidenceAggregator {
    fn default() -> Self {
        Self::new(&ConfidenceConfig::default())
    }
}
