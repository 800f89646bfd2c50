//! Error types for the bolletta-core library.
//!
//! Only [`BollettaError`] ever crosses the batch boundary. Provider and
//! field-parse failures are converted into data (failed attempts, missing
//! candidates) by the layer that observes them.

use thiserror::Error;

/// Main error type for the bolletta library.
#[derive(Error, Debug)]
pub enum BollettaError {
    /// Invalid configuration, input path or output path. Fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An output collaborator could not accept a record.
    #[error("output error: {0}")]
    Output(String),
}

/// Reasons a single extraction provider produced no output for a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The document bytes could not be read.
    #[error("failed to read document: {0}")]
    Read(String),

    /// The document could not be parsed by this provider.
    #[error("failed to parse document: {0}")]
    Parse(String),

    /// The document is encrypted with a non-empty password.
    #[error("document is encrypted")]
    Encrypted,

    /// The document has no pages or no extractable content.
    #[error("document is empty")]
    Empty,

    /// The provider does not handle this kind of document.
    #[error("unsupported document type: {0}")]
    Unsupported(String),

    /// The provider did not answer within the configured timeout.
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// The provider panicked.
    #[error("provider panicked: {0}")]
    Panicked(String),
}

/// A recognized pattern whose value failed typed conversion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldParseError {
    /// Not a valid amount or quantity.
    #[error("invalid number: {0:?}")]
    Number(String),

    /// Not a valid calendar date.
    #[error("invalid date: {0:?}")]
    Date(String),

    /// Text value rejected by the rule's shape check.
    #[error("invalid value: {0:?}")]
    Shape(String),
}

/// Result type for the bolletta library.
pub type Result<T> = std::result::Result<T, BollettaError>;
