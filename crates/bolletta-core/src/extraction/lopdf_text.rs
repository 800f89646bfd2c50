//! Page-by-page text extraction using lopdf.

use lopdf::Document;
use tracing::{debug, trace};

use super::tables::detect_tables_in_blocks;
use super::{DocumentHandle, ExtractionProvider, ProviderOptions};
use crate::error::ProviderError;
use crate::models::record::{ExtractionAttempt, TableGrid};

/// Extracts text one page at a time, producing one block per page.
pub struct LopdfProvider;

impl LopdfProvider {
    pub const ID: &'static str = "lopdf";

    pub fn new() -> Self {
        Self
    }

    fn load(data: &[u8]) -> Result<Document, ProviderError> {
        let mut doc = Document::load_mem(data).map_err(|e| ProviderError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(ProviderError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        Ok(doc)
    }

    fn try_extract(&self, document: &DocumentHandle) -> Result<PageText, ProviderError> {
        let data = document.read()?;
        let doc = Self::load(&data)?;

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(ProviderError::Empty);
        }

        let mut blocks = Vec::with_capacity(pages.len());
        let mut unreadable = Vec::new();
        for page_num in pages.keys() {
            match doc.extract_text(&[*page_num]) {
                Ok(text) => blocks.push(text),
                Err(e) => {
                    trace!("lopdf: page {} of {} unreadable: {}", page_num, document.id(), e);
                    unreadable.push(*page_num);
                    blocks.push(String::new());
                }
            }
        }

        if blocks.iter().all(|b| b.trim().is_empty()) {
            return Err(ProviderError::Empty);
        }

        let tables = detect_tables_in_blocks(&blocks);
        debug!(
            "lopdf: {} pages, {} tables from {}",
            blocks.len(),
            tables.len(),
            document.id()
        );
        Ok(PageText {
            blocks,
            tables,
            unreadable,
        })
    }
}

struct PageText {
    blocks: Vec<String>,
    tables: Vec<TableGrid>,
    unreadable: Vec<u32>,
}

/// Warning for pages whose text could not be extracted.
fn unreadable_warning(pages: &[u32]) -> Option<String> {
    match pages {
        [] => None,
        [page] => Some(format!("page {} unreadable", page)),
        _ => {
            let list: Vec<String> = pages.iter().map(u32::to_string).collect();
            Some(format!("pages {} unreadable", list.join(", ")))
        }
    }
}

impl Default for LopdfProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionProvider for LopdfProvider {
    fn id(&self) -> &str {
        Self::ID
    }

    fn supports(&self, document: &DocumentHandle) -> bool {
        document.extension().as_deref() == Some("pdf")
    }

    fn extract(&self, document: &DocumentHandle, _options: &ProviderOptions) -> ExtractionAttempt {
        match self.try_extract(document) {
            Ok(pages) => {
                let attempt = ExtractionAttempt::success(Self::ID, pages.blocks, pages.tables);
                match unreadable_warning(&pages.unreadable) {
                    Some(warning) => attempt.with_warning(warning),
                    None => attempt,
                }
            }
            Err(e) => ExtractionAttempt::failure(Self::ID, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_pdf_is_failed_attempt() {
        let provider = LopdfProvider::new();
        let handle = DocumentHandle::from_bytes("rotto.pdf", b"%PDF-1.4 garbage".to_vec());
        let attempt = provider.extract(&handle, &ProviderOptions::default());
        assert!(!attempt.succeeded);
        assert_eq!(attempt.provider_id, "lopdf");
        assert!(attempt.error.is_some());
    }

    #[test]
    fn test_unreadable_pages_warning() {
        assert_eq!(unreadable_warning(&[]), None);
        assert_eq!(unreadable_warning(&[2]).as_deref(), Some("page 2 unreadable"));
        assert_eq!(unreadable_warning(&[1, 3]).as_deref(), Some("pages 1, 3 unreadable"));
    }
}
