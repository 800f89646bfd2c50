//! Configuration structures for the extraction pipeline.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::bill::BillField;
use crate::error::{BollettaError, Result};
use crate::extraction::KNOWN_PROVIDERS;

/// Main configuration for the bolletta pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BollettaConfig {
    /// Extraction provider configuration.
    pub providers: ProviderConfig,

    /// Attempt scoring configuration.
    pub scoring: ScoringConfig,

    /// Candidate reconciliation configuration.
    pub reconcile: ReconcileConfig,

    /// Overall confidence weighting.
    pub confidence: ConfidenceConfig,

    /// Batch execution configuration.
    pub batch: BatchConfig,
}

/// Extraction provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Providers to run on every document.
    pub enabled: Vec<String>,

    /// Tie-break precedence, highest priority first.
    pub priority: Vec<String>,

    /// Per-provider call timeout in seconds.
    pub timeout_seconds: u64,

    /// Allow providers to fall back to OCR when they support it.
    pub ocr_enabled: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: KNOWN_PROVIDERS.iter().map(|s| s.to_string()).collect(),
            priority: KNOWN_PROVIDERS.iter().map(|s| s.to_string()).collect(),
            timeout_seconds: 30,
            ocr_enabled: false,
        }
    }
}

/// Attempt scoring weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of the (saturating) text length component.
    pub text_weight: f32,

    /// Weight of the table structure component.
    pub table_weight: f32,

    /// Weight of the "no provider error" component.
    pub clean_weight: f32,

    /// Number of non-whitespace characters at which text length saturates.
    pub text_saturation: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            text_weight: 0.6,
            table_weight: 0.2,
            clean_weight: 0.2,
            text_saturation: 400,
        }
    }
}

/// Reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Effective scores closer than this count as a disagreement.
    pub epsilon: f32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { epsilon: 0.05 }
    }
}

/// Overall confidence weighting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Critical field name to weight.
    pub critical_weights: BTreeMap<String, f32>,

    /// Bonus per present non-critical field, scaled by its confidence.
    pub bonus_per_field: f32,

    /// Upper bound of the non-critical bonus.
    pub bonus_cap: f32,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        let critical_weights = [
            (BillField::NumeroFattura, 0.20),
            (BillField::ImportoTotale, 0.20),
            (BillField::CodicePdr, 0.15),
            (BillField::CodiceCliente, 0.10),
            (BillField::ConsumoMc, 0.10),
            (BillField::DataEmissione, 0.10),
            (BillField::FornitoreNome, 0.10),
            (BillField::ClienteNome, 0.05),
        ]
        .into_iter()
        .map(|(field, weight)| (field.as_str().to_string(), weight))
        .collect();

        Self {
            critical_weights,
            bonus_per_field: 0.02,
            bonus_cap: 0.10,
        }
    }
}

/// Batch execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of documents processed concurrently.
    pub jobs: usize,

    /// Records below this overall confidence go to the discrepancy log.
    pub discrepancy_threshold: f32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: 4,
            discrepancy_threshold: 0.5,
        }
    }
}

impl BollettaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BollettaError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            BollettaError::Config(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the configuration for values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.providers.enabled.is_empty() {
            return Err(BollettaError::Config("no extraction provider enabled".into()));
        }
        for id in self.providers.enabled.iter().chain(&self.providers.priority) {
            if !KNOWN_PROVIDERS.contains(&id.as_str()) {
                return Err(BollettaError::Config(format!(
                    "unknown provider {:?} (known: {})",
                    id,
                    KNOWN_PROVIDERS.join(", ")
                )));
            }
        }
        if self.providers.timeout_seconds == 0 {
            return Err(BollettaError::Config("timeout_seconds must be positive".into()));
        }
        if self.batch.jobs == 0 {
            return Err(BollettaError::Config("jobs must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.batch.discrepancy_threshold) {
            return Err(BollettaError::Config(
                "discrepancy_threshold must be within [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.reconcile.epsilon) {
            return Err(BollettaError::Config("epsilon must be within [0, 1]".into()));
        }

        let scoring = &self.scoring;
        if [scoring.text_weight, scoring.table_weight, scoring.clean_weight]
            .iter()
            .any(|w| *w < 0.0)
        {
            return Err(BollettaError::Config("scoring weights must be non-negative".into()));
        }
        if scoring.text_saturation == 0 {
            return Err(BollettaError::Config("text_saturation must be positive".into()));
        }

        let confidence = &self.confidence;
        for (name, weight) in &confidence.critical_weights {
            if BillField::from_name(name).is_none() {
                return Err(BollettaError::Config(format!("unknown critical field {:?}", name)));
            }
            if *weight < 0.0 {
                return Err(BollettaError::Config(format!("negative weight for {}", name)));
            }
        }
        if confidence.bonus_per_field < 0.0 || confidence.bonus_cap < 0.0 {
            return Err(BollettaError::Config("bonus values must be non-negative".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        BollettaConfig::default().validate().unwrap();
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let sum: f32 = ConfidenceConfig::default().critical_weights.values().sum();
        assert!((sum - 1.0).abs() < 1e-6, "sum = {}", sum);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = BollettaConfig::default();
        config.providers.enabled.push("tesseract".to_string());
        assert!(matches!(config.validate(), Err(BollettaError::Config(_))));
    }

    #[test]
    fn test_unknown_critical_field_rejected() {
        let mut config = BollettaConfig::default();
        config.confidence.critical_weights.insert("colore".to_string(), 0.1);
        assert!(matches!(config.validate(), Err(BollettaError::Config(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BollettaConfig =
            serde_json::from_str(r#"{"batch": {"jobs": 2}}"#).unwrap();
        assert_eq!(config.batch.jobs, 2);
        assert_eq!(config.batch.discrepancy_threshold, 0.5);
        assert_eq!(config.providers.timeout_seconds, 30);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = BollettaConfig::default();
        config.batch.jobs = 8;
        config.save(&path).unwrap();

        let loaded = BollettaConfig::from_file(&path).unwrap();
        assert_eq!(loaded.batch.jobs, 8);
    }
}
