//! Pre-extracted text dumps (`.txt`).

use super::tables::detect_tables;
use super::{into_attempt, DocumentHandle, ExtractionProvider, ProviderOptions};
use crate::error::ProviderError;
use crate::models::record::{ExtractionAttempt, TableGrid};

/// Reads UTF-8 text files. Form feeds separate pages.
pub struct PlainTextProvider;

impl PlainTextProvider {
    pub const ID: &'static str = "plain_text";

    pub fn new() -> Self {
        Self
    }

    fn try_extract(
        &self,
        document: &DocumentHandle,
    ) -> Result<(Vec<String>, Vec<TableGrid>), ProviderError> {
        let data = document.read()?;
        let text = String::from_utf8(data.into_owned())
            .map_err(|e| ProviderError::Parse(format!("not UTF-8: {}", e)))?;

        if text.trim().is_empty() {
            return Err(ProviderError::Empty);
        }

        let blocks: Vec<String> = text.split('\u{000c}').map(str::to_string).collect();
        let tables = blocks.iter().flat_map(|b| detect_tables(b)).collect();
        Ok((blocks, tables))
    }
}

impl Default for PlainTextProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionProvider for PlainTextProvider {
    fn id(&self) -> &str {
        Self::ID
    }

    fn supports(&self, document: &DocumentHandle) -> bool {
        document.extension().as_deref() == Some("txt")
    }

    fn extract(&self, document: &DocumentHandle, _options: &ProviderOptions) -> ExtractionAttempt {
        into_attempt(Self::ID, self.try_extract(document))
    }
}
