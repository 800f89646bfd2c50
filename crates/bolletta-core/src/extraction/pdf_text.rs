//! Whole-document text extraction using pdf-extract.

use tracing::debug;

use super::tables::detect_tables;
use super::{into_attempt, DocumentHandle, ExtractionProvider, ProviderOptions};
use crate::error::ProviderError;
use crate::models::record::{ExtractionAttempt, TableGrid};

/// Extracts the full text layer in one pass.
///
/// Tends to keep column alignment, which makes it the better source for
/// table inference.
pub struct PdfExtractProvider;

impl PdfExtractProvider {
    pub const ID: &'static str = "pdf_extract";

    pub fn new() -> Self {
        Self
    }

    fn try_extract(
        &self,
        document: &DocumentHandle,
    ) -> Result<(Vec<String>, Vec<TableGrid>), ProviderError> {
        let data = document.read()?;
        let text = pdf_extract::extract_text_from_mem(&data)
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        if text.trim().is_empty() {
            return Err(ProviderError::Empty);
        }

        let tables = detect_tables(&text);
        debug!(
            "pdf_extract: {} chars, {} tables from {}",
            text.len(),
            tables.len(),
            document.id()
        );
        Ok((vec![text], tables))
    }
}

impl Default for PdfExtractProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionProvider for PdfExtractProvider {
    fn id(&self) -> &str {
        Self::ID
    }

    fn supports(&self, document: &DocumentHandle) -> bool {
        document.extension().as_deref() == Some("pdf")
    }

    fn extract(&self, document: &DocumentHandle, _options: &ProviderOptions) -> ExtractionAttempt {
        into_attempt(Self::ID, self.try_extract(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_only_pdf() {
        let provider = PdfExtractProvider::new();
        assert!(provider.supports(&DocumentHandle::from_path("a.pdf")));
        assert!(!provider.supports(&DocumentHandle::from_path("a.txt")));
    }
}
