//! The per-document pipeline and the batch driver around it.

pub mod batch;
pub mod confidence;
pub mod document;
pub mod reconciler;
pub mod schema;
pub mod scorer;

pub use batch::{BatchDriver, BatchSummary, CancelFlag, DiscrepancySink, RecordSink};
pub use confidence::ConfidenceAggregator;
pub use document::{AttemptSummary, DocumentPipeline, ProcessedDocument};
pub use reconciler::Reconciler;
pub use schema::{render_row, SchemaRegistry, METADATA_COLUMNS};
pub use scorer::AttemptScorer;
