//! Append-only discrepancy log.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use chrono::Local;

use bolletta_core::{BollettaError, DiscrepancyEntry, DiscrepancySink};

/// One line per flagged document:
/// `timestamp | document | confidence | missing: ... | errors: ...`.
pub struct DiscrepancyLog<W: Write> {
    out: W,
    entries: usize,
}

impl DiscrepancyLog<BufWriter<File>> {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Cannot open discrepancy log {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> DiscrepancyLog<W> {
    pub fn new(out: W) -> Self {
        Self { out, entries: 0 }
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn format_entry(entry: &DiscrepancyEntry) -> String {
    let missing = if entry.missing_critical_fields.is_empty() {
        "-".to_string()
    } else {
        entry.missing_critical_fields.join(", ")
    };
    let errors = if entry.errors.is_empty() {
        "-".to_string()
    } else {
        entry.errors.join("; ")
    };
    format!(
        "{} | {} | confidence {:.2} | missing: {} | errors: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        entry.document_id,
        entry.overall_confidence,
        missing,
        errors
    )
}

impl<W: Write> DiscrepancySink for DiscrepancyLog<W> {
    fn report(&mut self, entry: &DiscrepancyEntry) -> bolletta_core::Result<()> {
        writeln!(self.out, "{}", format_entry(entry))
            .and_then(|_| self.out.flush())
            .map_err(|e| BollettaError::Output(format!("discrepancy log: {}", e)))?;
        self.entries += 1;
        Ok(())
    }
}

/// Discards entries; used when no log path is configured.
#[derive(Debug, Default)]
pub struct NoDiscrepancyLog;

impl DiscrepancySink for NoDiscrepancyLog {
    fn report(&mut self, _entry: &DiscrepancyEntry) -> bolletta_core::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> DiscrepancyEntry {
        DiscrepancyEntry {
            document_id: "bolletta_03.pdf".into(),
            overall_confidence: 0.2345,
            missing_critical_fields: vec!["codice_pdr".into(), "consumo_mc".into()],
            errors: vec![],
        }
    }

    #[test]
    fn test_entry_line() {
        let line = format_entry(&entry());
        assert!(line.contains("| bolletta_03.pdf | confidence 0.23 |"), "{}", line);
        assert!(line.ends_with("missing: codice_pdr, consumo_mc | errors: -"), "{}", line);
    }

    #[test]
    fn test_one_line_per_entry() {
        let mut log = DiscrepancyLog::new(Vec::new());
        log.report(&entry()).unwrap();
        log.report(&entry()).unwrap();
        assert_eq!(log.entries(), 2);
        let text = String::from_utf8(log.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_open_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discrepancies.log");
        std::fs::write(&path, "earlier run\n").unwrap();

        let mut log = DiscrepancyLog::open(&path).unwrap();
        log.report(&entry()).unwrap();
        drop(log);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("earlier run\n"));
        assert_eq!(text.lines().count(), 2);
    }
}
