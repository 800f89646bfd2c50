//! Batch driver: schedules documents, isolates failures, and streams
//! finalized records through the schema registry to the output sinks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{BollettaError, Result};
use crate::extraction::{providers_from_config, DocumentHandle, ExtractionProvider};
use crate::models::{BollettaConfig, CanonicalRecord, DiscrepancyEntry};

use super::document::{AttemptSummary, DocumentPipeline, ProcessedDocument};
use super::schema::SchemaRegistry;

/// Shared early-termination switch.
///
/// Raising it stops new documents from being scheduled; documents already
/// in flight still finish and are emitted.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives finalized records in emission order.
///
/// `schema` is the full column order at the time of the call; it only ever
/// grows, so rows written earlier need right-padding at most.
pub trait RecordSink {
    fn write(&mut self, schema: &[String], document: &ProcessedDocument) -> Result<()>;

    /// Called once after the last record with the final schema.
    fn finish(&mut self, _schema: &[String]) -> Result<()> {
        Ok(())
    }
}

/// Receives one entry per low-confidence or erroneous document.
pub trait DiscrepancySink {
    fn report(&mut self, entry: &DiscrepancyEntry) -> Result<()>;
}

impl RecordSink for Vec<CanonicalRecord> {
    fn write(&mut self, _schema: &[String], document: &ProcessedDocument) -> Result<()> {
        self.push(document.record.clone());
        Ok(())
    }
}

impl DiscrepancySink for Vec<DiscrepancyEntry> {
    fn report(&mut self, entry: &DiscrepancyEntry) -> Result<()> {
        self.push(entry.clone());
        Ok(())
    }
}

/// Totals for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Documents that produced a record.
    pub processed: usize,
    /// Documents reported to the discrepancy sink.
    pub flagged: usize,
    /// Documents for which every provider failed.
    pub total_failures: usize,
    /// Documents never scheduled because the batch was cancelled.
    pub skipped: usize,
    /// Mean overall confidence of processed documents.
    pub average_confidence: f32,
}

/// Drives a batch of documents through the pipeline.
pub struct BatchDriver {
    pipeline: Arc<DocumentPipeline>,
    jobs: usize,
    discrepancy_threshold: f32,
    cancel: CancelFlag,
}

impl BatchDriver {
    /// Build a driver with the providers enabled in `config`.
    pub fn new(config: &BollettaConfig) -> Result<Self> {
        Self::with_providers(providers_from_config(&config.providers), config)
    }

    /// Build a driver with an explicit provider set.
    pub fn with_providers(
        providers: Vec<Arc<dyn ExtractionProvider>>,
        config: &BollettaConfig,
    ) -> Result<Self> {
        config.validate()?;
        if providers.is_empty() {
            return Err(BollettaError::Config("no extraction provider available".into()));
        }
        Ok(Self {
            pipeline: Arc::new(DocumentPipeline::new(providers, config)),
            jobs: config.batch.jobs,
            discrepancy_threshold: config.batch.discrepancy_threshold,
            cancel: CancelFlag::new(),
        })
    }

    /// Handle for raising cancellation from elsewhere (e.g. a signal handler).
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Process every document, emitting exactly one record per scheduled
    /// document. Only sink errors abort the run.
    pub async fn run<R, D>(
        &self,
        documents: Vec<DocumentHandle>,
        records: &mut R,
        discrepancies: &mut D,
    ) -> Result<BatchSummary>
    where
        R: RecordSink + ?Sized,
        D: DiscrepancySink + ?Sized,
    {
        info!(documents = documents.len(), jobs = self.jobs, "Starting batch");

        let mut registry = SchemaRegistry::new();
        let mut summary = BatchSummary::default();
        let mut confidence_sum = 0.0f64;
        let mut pending = documents.into_iter();
        let mut in_flight: JoinSet<ProcessedDocument> = JoinSet::new();

        loop {
            while in_flight.len() < self.jobs && !self.cancel.is_cancelled() {
                let Some(document) = pending.next() else {
                    break;
                };
                let pipeline = Arc::clone(&self.pipeline);
                in_flight.spawn(process_isolated(pipeline, document));
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let processed = match joined {
                Ok(processed) => processed,
                Err(e) => {
                    // process_isolated never panics; a JoinError here means the
                    // runtime is shutting down.
                    warn!("Worker task aborted: {}", e);
                    continue;
                }
            };

            let schema = registry.register(&processed.record);
            records.write(schema, &processed)?;

            let record = &processed.record;
            summary.processed += 1;
            confidence_sum += f64::from(record.overall_confidence);
            if processed.is_total_failure() {
                summary.total_failures += 1;
            }

            if let Some(entry) = self.discrepancy(record) {
                discrepancies.report(&entry)?;
                summary.flagged += 1;
            }
        }

        records.finish(registry.columns())?;

        summary.skipped = pending.count();
        if summary.processed > 0 {
            summary.average_confidence = (confidence_sum / summary.processed as f64) as f32;
        }
        if summary.skipped > 0 {
            warn!(skipped = summary.skipped, "Batch cancelled");
        }
        info!(
            processed = summary.processed,
            flagged = summary.flagged,
            total_failures = summary.total_failures,
            "Batch complete"
        );
        Ok(summary)
    }

    /// The discrepancy entry for a record, if it qualifies.
    pub fn discrepancy(&self, record: &CanonicalRecord) -> Option<DiscrepancyEntry> {
        if record.overall_confidence >= self.discrepancy_threshold && record.errors.is_empty() {
            return None;
        }
        Some(DiscrepancyEntry {
            document_id: record.document_id.clone(),
            overall_confidence: record.overall_confidence,
            missing_critical_fields: self.pipeline.aggregator().missing_critical(record),
            errors: record.errors.clone(),
        })
    }
}

/// Run one document on its own task so that a panic anywhere in the
/// pipeline still yields a record for that document.
async fn process_isolated(pipeline: Arc<DocumentPipeline>, document: DocumentHandle) -> ProcessedDocument {
    let document_id = document.id().to_string();
    let task = tokio::spawn(async move { pipeline.process(&document).await });

    match task.await {
        Ok(processed) => processed,
        Err(e) => {
            debug!(document = %document_id, "Pipeline task failed: {}", e);
            let mut record = CanonicalRecord::empty(&document_id);
            record.errors.push(format!("processing failed: {}", e));
            ProcessedDocument {
                record,
                attempts: Vec::<AttemptSummary>::new(),
            }
        }
    }
}
