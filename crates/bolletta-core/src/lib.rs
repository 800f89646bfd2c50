//! Core library for Italian gas bill extraction.
//!
//! This crate provides:
//! - Extraction providers turning PDF and text documents into raw text and tables
//! - Rule-based recognition of bill fields (codes, dates, amounts, consumption)
//! - Cross-provider reconciliation and document confidence scoring
//! - A batch driver streaming records into a growing output schema

pub mod error;
pub mod extraction;
pub mod models;
pub mod pipeline;
pub mod recognize;

pub use error::{BollettaError, FieldParseError, ProviderError, Result};
pub use extraction::{
    providers_from_config, DocumentHandle, ExtractionProvider, ProviderOptions, KNOWN_PROVIDERS,
};
pub use models::{
    BillField, BollettaConfig, CanonicalRecord, DiscrepancyEntry, ExtractionAttempt,
    FieldCandidate, FieldKey, FieldValue,
};
pub use pipeline::{
    BatchDriver, BatchSummary, CancelFlag, DiscrepancySink, ProcessedDocument, RecordSink,
    SchemaRegistry,
};
pub use recognize::FieldRecognizer;
