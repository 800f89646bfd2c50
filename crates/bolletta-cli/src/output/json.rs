//! Per-document JSON files and the batch report.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use bolletta_core::pipeline::AttemptSummary;
use bolletta_core::{BatchSummary, CanonicalRecord, ProcessedDocument};

/// Outcome of one document, as written to JSON.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResult {
    pub file: String,
    pub success: bool,
    pub confidence: f32,
    pub attempts: Vec<AttemptSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CanonicalRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentResult {
    pub fn from_processed(document: &ProcessedDocument, with_data: bool) -> Self {
        let success = !document.is_total_failure();
        let record = &document.record;
        Self {
            file: record.document_id.clone(),
            success,
            confidence: record.overall_confidence,
            attempts: document.attempts.clone(),
            data: (success && with_data).then(|| record.clone()),
            error: (!success).then(|| record.errors.join("; ")),
        }
    }
}

/// Batch report written to `extraction_summary.json`.
#[derive(Debug, Serialize)]
pub struct ExtractionReport {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub flagged: usize,
    pub skipped: usize,
    pub average_confidence: f32,
    pub results: Vec<DocumentResult>,
}

impl ExtractionReport {
    pub fn new(summary: &BatchSummary, results: Vec<DocumentResult>) -> Self {
        Self {
            total_files: summary.processed + summary.skipped,
            successful: summary.processed - summary.total_failures,
            failed: summary.total_failures,
            flagged: summary.flagged,
            skipped: summary.skipped,
            average_confidence: summary.average_confidence,
            results,
        }
    }
}

/// Directory of per-document `<name>_extracted.json` files.
///
/// The file name is derived from the whole document id, so `2024/bolletta.pdf`
/// becomes `2024_bolletta_extracted.json`. A name already written during this
/// batch gets a numeric suffix instead of being overwritten.
pub struct JsonDir {
    dir: PathBuf,
    written: HashSet<String>,
}

impl JsonDir {
    pub fn create(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create JSON directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: HashSet::new(),
        })
    }

    /// Write one result and return its path.
    pub fn write(&mut self, result: &DocumentResult) -> anyhow::Result<PathBuf> {
        let base = file_base(&result.file);
        let mut name = format!("{}_extracted.json", base);
        let mut n = 2;
        while !self.written.insert(name.clone()) {
            name = format!("{}_{}_extracted.json", base, n);
            n += 1;
        }

        let path = self.dir.join(name);
        let content = serde_json::to_string_pretty(result)?;
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Document id without its extension, path separators flattened to `_`.
fn file_base(document_id: &str) -> String {
    let id = Path::new(document_id);
    let stem = id.with_extension("");
    let flat: Vec<String> = stem
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if flat.is_empty() {
        "document".to_string()
    } else {
        flat.join("_")
    }
}

pub fn write_report(path: &Path, report: &ExtractionReport) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(report)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
