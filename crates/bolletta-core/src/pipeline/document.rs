//! Per-document processing: providers, scoring, recognition, reconciliation
//! and confidence for one document.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ProviderError;
use crate::extraction::{DocumentHandle, ExtractionProvider, ProviderOptions};
use crate::models::{BollettaConfig, CanonicalRecord, ExtractionAttempt, FieldCandidate, ProviderId};
use crate::recognize::FieldRecognizer;

use super::confidence::ConfidenceAggregator;
use super::reconciler::Reconciler;
use super::scorer::AttemptScorer;

/// Error recorded when no configured provider handles the document type.
pub const NO_PROVIDER_ERROR: &str = "no extraction provider supports this document type";

/// Error recorded when every applicable provider failed.
pub const ALL_FAILED_ERROR: &str = "all extraction providers failed";

/// Outcome of one provider attempt, kept for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptSummary {
    pub provider_id: ProviderId,
    pub succeeded: bool,
    pub quality: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A finalized record plus how its attempts went.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub record: CanonicalRecord,
    pub attempts: Vec<AttemptSummary>,
}

impl ProcessedDocument {
    /// Whether no provider produced usable output.
    pub fn is_total_failure(&self) -> bool {
        !self.attempts.iter().any(|a| a.succeeded)
    }
}

/// The pure part of the pipeline plus the provider set. Shared by all
/// workers; holds no per-document state.
pub struct DocumentPipeline {
    providers: Vec<Arc<dyn ExtractionProvider>>,
    options: ProviderOptions,
    scorer: AttemptScorer,
    recognizer: FieldRecognizer,
    reconciler: Reconciler,
    aggregator: ConfidenceAggregator,
}

impl DocumentPipeline {
    pub fn new(providers: Vec<Arc<dyn ExtractionProvider>>, config: &BollettaConfig) -> Self {
        Self {
            providers,
            options: ProviderOptions::from(&config.providers),
            scorer: AttemptScorer::new(config.scoring.clone()),
            recognizer: FieldRecognizer::new(),
            reconciler: Reconciler::new(config.providers.priority.clone(), config.reconcile.epsilon),
            aggregator: ConfidenceAggregator::new(&config.confidence),
        }
    }

    pub fn aggregator(&self) -> &ConfidenceAggregator {
        &self.aggregator
    }

    /// Run every applicable provider, then reconcile.
    pub async fn process(&self, document: &DocumentHandle) -> ProcessedDocument {
        let mut attempts = Vec::new();
        for provider in &self.providers {
            if !provider.supports(document) {
                continue;
            }
            attempts.push(self.run_provider(Arc::clone(provider), document.clone()).await);
        }
        self.process_attempts(document.id(), attempts)
    }

    /// Call one provider off the async runtime, bounded by the timeout.
    /// Panics and timeouts become failed attempts.
    async fn run_provider(
        &self,
        provider: Arc<dyn ExtractionProvider>,
        document: DocumentHandle,
    ) -> ExtractionAttempt {
        let provider_id = provider.id().to_string();
        let options = self.options;
        let task = tokio::task::spawn_blocking(move || provider.extract(&document, &options));

        match tokio::time::timeout(Duration::from_secs(options.timeout_seconds), task).await {
            Ok(Ok(attempt)) => attempt,
            Ok(Err(e)) => {
                let reason = if e.is_panic() {
                    panic_message(e.into_panic())
                } else {
                    e.to_string()
                };
                ExtractionAttempt::failure(provider_id, &ProviderError::Panicked(reason))
            }
            Err(_) => ExtractionAttempt::failure(
                provider_id,
                &ProviderError::Timeout(options.timeout_seconds),
            ),
        }
    }

    /// Score, recognize, reconcile and finalize a set of attempts.
    pub fn process_attempts(
        &self,
        document_id: &str,
        attempts: Vec<ExtractionAttempt>,
    ) -> ProcessedDocument {
        let qualities: BTreeMap<ProviderId, f32> = attempts
            .iter()
            .map(|a| (a.provider_id.clone(), self.scorer.score(a)))
            .collect();

        let summaries: Vec<AttemptSummary> = attempts
            .iter()
            .map(|a| AttemptSummary {
                provider_id: a.provider_id.clone(),
                succeeded: a.succeeded,
                quality: qualities.get(&a.provider_id).copied().unwrap_or(0.0),
                error: a.error.clone(),
            })
            .collect();

        if !attempts.iter().any(|a| a.succeeded) {
            let mut record = self.reconciler.reconcile(document_id, Vec::new(), &qualities);
            if attempts.is_empty() {
                record.errors.push(NO_PROVIDER_ERROR.to_string());
            }
            for attempt in &attempts {
                record.errors.push(format!(
                    "{}: {}",
                    attempt.provider_id,
                    attempt.error.as_deref().unwrap_or("failed")
                ));
            }
            if !attempts.is_empty() {
                record.errors.push(ALL_FAILED_ERROR.to_string());
            }
            record.overall_confidence = 0.0;
            warn!(document = document_id, "Extraction failed: {}", record.errors.join("; "));
            return ProcessedDocument {
                record,
                attempts: summaries,
            };
        }

        for attempt in attempts.iter().filter(|a| !a.succeeded) {
            warn!(
                document = document_id,
                provider = %attempt.provider_id,
                "Provider failed: {}",
                attempt.error.as_deref().unwrap_or("unknown error")
            );
        }

        let candidates: Vec<FieldCandidate> = attempts
            .iter()
            .flat_map(|a| self.recognizer.recognize(a))
            .collect();
        let record = self.reconciler.reconcile(document_id, candidates, &qualities);
        let record = self.aggregator.finalize(record);

        info!(
            document = document_id,
            fields = record.fields.len(),
            confidence = record.overall_confidence,
            "Extracted document"
        );

        ProcessedDocument {
            record,
            attempts: summaries,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
