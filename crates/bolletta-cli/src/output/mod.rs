//! Output collaborators: CSV table, discrepancy log and JSON reports.

pub mod discrepancy;
pub mod json;
pub mod table;

use indicatif::ProgressBar;
use tracing::debug;

use bolletta_core::{BollettaError, ProcessedDocument, RecordSink};

use json::{DocumentResult, JsonDir};
use table::CsvTableWriter;

/// Fans each finalized record out to the table, optional JSON files and the
/// progress bar. Per-document results are kept only when a report will be
/// written.
pub struct BatchOutput {
    table: CsvTableWriter,
    json_dir: Option<JsonDir>,
    progress: ProgressBar,
    results: Option<Vec<DocumentResult>>,
}

impl BatchOutput {
    pub fn new(table: CsvTableWriter, json_dir: Option<JsonDir>, progress: ProgressBar) -> Self {
        Self {
            table,
            json_dir,
            progress,
            results: None,
        }
    }

    /// Keep a summary of every document for [`BatchOutput::into_results`].
    pub fn collect_results(mut self) -> Self {
        self.results = Some(Vec::new());
        self
    }

    pub fn into_results(self) -> Vec<DocumentResult> {
        self.results.unwrap_or_default()
    }
}

fn output_error(e: anyhow::Error) -> BollettaError {
    BollettaError::Output(format!("{:#}", e))
}

impl RecordSink for BatchOutput {
    fn write(&mut self, schema: &[String], document: &ProcessedDocument) -> bolletta_core::Result<()> {
        self.table
            .write(schema, &document.record)
            .map_err(output_error)?;

        if let Some(json_dir) = &mut self.json_dir {
            let full = DocumentResult::from_processed(document, true);
            let path = json_dir.write(&full).map_err(output_error)?;
            debug!("Wrote {}", path.display());
        }

        if let Some(results) = &mut self.results {
            results.push(DocumentResult::from_processed(document, false));
        }
        self.progress.set_message(document.record.document_id.clone());
        self.progress.inc(1);
        Ok(())
    }

    fn finish(&mut self, schema: &[String]) -> bolletta_core::Result<()> {
        self.progress.finish_and_clear();
        self.table.finish(schema).map_err(output_error)
    }
}
