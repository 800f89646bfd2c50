//! CSV table writer with schema backfill.
//!
//! Rows are spooled while the batch runs, each rendered against the schema
//! known at that moment. The schema only ever grows at the end, so on
//! finish every spooled row is right-padded to the final width and written
//! under the final header.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tempfile::NamedTempFile;

use bolletta_core::pipeline::render_row;
use bolletta_core::CanonicalRecord;

pub struct CsvTableWriter {
    destination: PathBuf,
    spool: csv::Writer<File>,
    rows: usize,
}

impl CsvTableWriter {
    /// Prepare a writer for `destination`. Fails when the destination
    /// directory is missing or not writable.
    pub fn create(destination: &Path) -> anyhow::Result<Self> {
        let dir = parent_dir(destination);
        let spool = tempfile::tempfile_in(&dir)
            .with_context(|| format!("Output directory {} is not writable", dir.display()))?;

        Ok(Self {
            destination: destination.to_path_buf(),
            spool: csv::WriterBuilder::new().flexible(true).from_writer(spool),
            rows: 0,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn write(&mut self, schema: &[String], record: &CanonicalRecord) -> anyhow::Result<()> {
        self.spool.write_record(render_row(schema, record))?;
        self.rows += 1;
        Ok(())
    }

    /// Write the destination file with the final header and padded rows.
    pub fn finish(&mut self, schema: &[String]) -> anyhow::Result<()> {
        self.spool.flush()?;
        let mut spool = self.spool.get_ref().try_clone()?;
        spool.seek(SeekFrom::Start(0))?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(spool);

        let dir = parent_dir(&self.destination);
        let staged = NamedTempFile::new_in(&dir)?;
        let mut out = csv::Writer::from_writer(staged);
        out.write_record(schema)?;

        for row in reader.records() {
            let row = row?;
            let mut cells: Vec<&str> = row.iter().collect();
            cells.resize(schema.len(), "");
            out.write_record(&cells)?;
        }

        let staged = out.into_inner().map_err(|e| e.into_error())?;
        staged
            .persist(&self.destination)
            .with_context(|| format!("Failed to write {}", self.destination.display()))?;
        Ok(())
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bolletta_core::{BillField, FieldKey, FieldValue, SchemaRegistry};
    use pretty_assertions::assert_eq;

    fn record(id: &str, fields: &[(FieldKey, &str)]) -> CanonicalRecord {
        let mut record = CanonicalRecord::empty(id);
        for (key, value) in fields {
            record.fields.insert(key.clone(), FieldValue::Text(value.to_string()));
        }
        record
    }

    #[test]
    fn test_rows_are_backfilled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut writer = CsvTableWriter::create(&path).unwrap();
        let mut registry = SchemaRegistry::new();

        let first = record("a.pdf", &[(BillField::NumeroFattura.into(), "FT1")]);
        writer.write(registry.register(&first), &first).unwrap();
        let second = record(
            "b.pdf",
            &[
                (BillField::NumeroFattura.into(), "FT2"),
                (BillField::CodicePdr.into(), "12345678901234"),
            ],
        );
        writer.write(registry.register(&second), &second).unwrap();
        writer.finish(registry.columns()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, registry.columns());

        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), header.len());
        assert_eq!(rows[0][0], "a.pdf");
        assert_eq!(rows[0][4], "FT1");
        assert_eq!(rows[0][5], "");
        assert_eq!(rows[1][5], "12345678901234");
        assert_eq!(writer.rows(), 2);
    }

    #[test]
    fn test_missing_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.csv");
        assert!(CsvTableWriter::create(&path).is_err());
    }
}
