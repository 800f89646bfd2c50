//! Data models for bills, extraction attempts, records and configuration.

pub mod bill;
pub mod config;
pub mod record;

pub use bill::{BillField, FieldKey, FieldValue, FIELD_SET_VERSION};
pub use config::BollettaConfig;
pub use record::{
    CanonicalRecord, DiscrepancyEntry, ExtractionAttempt, FieldCandidate, MatchLocation,
    MatchSpan, ProviderId, TableGrid,
};
