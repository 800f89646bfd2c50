//! Extraction providers: independent strategies that turn a document into
//! raw text blocks and table grids.
//!
//! The pipeline is written against [`ExtractionProvider`] only; it neither
//! knows nor cares how many providers are configured.

mod lopdf_text;
mod pdf_text;
mod plain_text;
pub mod tables;

pub use lopdf_text::LopdfProvider;
pub use pdf_text::PdfExtractProvider;
pub use plain_text::PlainTextProvider;

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ProviderError;
use crate::models::config::ProviderConfig;
use crate::models::record::{ExtractionAttempt, TableGrid};

/// Identifiers of the providers shipped with the library.
pub const KNOWN_PROVIDERS: &[&str] = &[
    PdfExtractProvider::ID,
    LopdfProvider::ID,
    PlainTextProvider::ID,
];

/// Options passed to every provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderOptions {
    pub timeout_seconds: u64,
    pub ocr_enabled: bool,
}

impl From<&ProviderConfig> for ProviderOptions {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            timeout_seconds: config.timeout_seconds,
            ocr_enabled: config.ocr_enabled,
        }
    }
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self::from(&ProviderConfig::default())
    }
}

#[derive(Debug, Clone)]
enum DocumentSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// A document to process: an identifier plus a way to read its bytes.
///
/// Cheap to clone; bytes are read lazily by each provider.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    id: String,
    source: DocumentSource,
}

impl DocumentHandle {
    /// A document on disk, identified by its file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            id,
            source: DocumentSource::Path(path),
        }
    }

    /// A document on disk under an explicit identifier, for callers that
    /// need ids unique across folders (e.g. the path relative to an input
    /// root).
    pub fn from_path_with_id(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            source: DocumentSource::Path(path.into()),
        }
    }

    /// An in-memory document.
    pub fn from_bytes(id: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id: id.into(),
            source: DocumentSource::Memory(bytes.into()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Path on disk, for file-backed documents.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            DocumentSource::Path(p) => Some(p),
            DocumentSource::Memory(_) => None,
        }
    }

    /// Lowercase extension of the document identifier.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.id)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Read the document bytes.
    pub fn read(&self) -> Result<Cow<'_, [u8]>, ProviderError> {
        match &self.source {
            DocumentSource::Path(p) => std::fs::read(p)
                .map(Cow::Owned)
                .map_err(|e| ProviderError::Read(format!("{}: {}", p.display(), e))),
            DocumentSource::Memory(bytes) => Ok(Cow::Borrowed(&bytes[..])),
        }
    }
}

/// A strategy that extracts raw content from a document.
///
/// `extract` must not panic or return early with an error: any internal
/// failure becomes an [`ExtractionAttempt`] with `succeeded == false`.
pub trait ExtractionProvider: Send + Sync {
    /// Stable identifier, used for priority and reporting.
    fn id(&self) -> &str;

    /// Whether this provider applies to the document at all. Providers that
    /// do not apply produce no attempt.
    fn supports(&self, document: &DocumentHandle) -> bool;

    /// Extract raw content from the document.
    fn extract(&self, document: &DocumentHandle, options: &ProviderOptions) -> ExtractionAttempt;
}

/// Convert a provider's internal result into an attempt.
pub(crate) fn into_attempt(
    provider_id: &str,
    result: Result<(Vec<String>, Vec<TableGrid>), ProviderError>,
) -> ExtractionAttempt {
    match result {
        Ok((text, tables)) => ExtractionAttempt::success(provider_id, text, tables),
        Err(e) => ExtractionAttempt::failure(provider_id, &e),
    }
}

/// Instantiate the enabled providers.
///
/// Unknown identifiers are skipped here; [`crate::BollettaConfig::validate`]
/// rejects them before a batch starts.
pub fn providers_from_config(config: &ProviderConfig) -> Vec<Arc<dyn ExtractionProvider>> {
    config
        .enabled
        .iter()
        .filter_map(|id| -> Option<Arc<dyn ExtractionProvider>> {
            match id.as_str() {
                PdfExtractProvider::ID => Some(Arc::new(PdfExtractProvider::new())),
                LopdfProvider::ID => Some(Arc::new(LopdfProvider::new())),
                PlainTextProvider::ID => Some(Arc::new(PlainTextProvider::new())),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_from_path_uses_file_name() {
        let handle = DocumentHandle::from_path("/tmp/bollette/Enel_Maggio.PDF");
        assert_eq!(handle.id(), "Enel_Maggio.PDF");
        assert_eq!(handle.extension().as_deref(), Some("pdf"));
    }

    #[test]
    fn test_explicit_id_keeps_extension_lookup() {
        let handle = DocumentHandle::from_path_with_id("2024/bolletta.PDF", "/bills/2024/bolletta.PDF");
        assert_eq!(handle.id(), "2024/bolletta.PDF");
        assert_eq!(handle.extension().as_deref(), Some("pdf"));
        assert_eq!(handle.path(), Some(Path::new("/bills/2024/bolletta.PDF")));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let handle = DocumentHandle::from_path("/definitely/not/here.pdf");
        assert!(matches!(handle.read(), Err(ProviderError::Read(_))));
    }

    #[test]
    fn test_providers_from_default_config() {
        let providers = providers_from_config(&ProviderConfig::default());
        let ids: Vec<&str> = providers.iter().map(|p| p.id()).collect();
        assert_eq!(ids, KNOWN_PROVIDERS);
    }
}
