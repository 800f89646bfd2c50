//! Batch-wide, append-only output column order.

use std::collections::{HashMap, HashSet};

use crate::models::CanonicalRecord;

/// Leading columns present in every output, in this order.
pub const METADATA_COLUMNS: &[&str] = &[
    "document_id",
    "extracted_at",
    "overall_confidence",
    "extraction_method",
];

/// Ordered set of output columns.
///
/// Not synchronized: the batch coordinator is its only user. Columns are
/// appended in discovery order and never removed or reordered.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    columns: Vec<String>,
    known: HashSet<String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        let columns: Vec<String> = METADATA_COLUMNS.iter().map(|c| c.to_string()).collect();
        let known = columns.iter().cloned().collect();
        Self { columns, known }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Append the record's unseen field names and return the full schema.
    pub fn register(&mut self, record: &CanonicalRecord) -> &[String] {
        for key in record.fields.keys() {
            let name = key.name();
            if !self.known.contains(name) {
                self.known.insert(name.to_string());
                self.columns.push(name.to_string());
            }
        }
        &self.columns
    }

    /// Render a record against the current schema. Absent fields are empty.
    pub fn render_row(&self, record: &CanonicalRecord) -> Vec<String> {
        render_row(&self.columns, record)
    }
}

/// Render a record against a schema snapshot, one cell per column.
pub fn render_row(columns: &[String], record: &CanonicalRecord) -> Vec<String> {
    let values: HashMap<&str, String> = record
        .fields
        .iter()
        .map(|(key, value)| (key.name(), value.to_string()))
        .collect();

    columns
        .iter()
        .map(|column| match column.as_str() {
            "document_id" => record.document_id.clone(),
            "extracted_at" => record.extracted_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "overall_confidence" => format!("{:.3}", record.overall_confidence),
            "extraction_method" => record.primary_provider.clone().unwrap_or_default(),
            name => values.get(name).cloned().unwrap_or_default(),
        })
        .collect()
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BillField, FieldKey, FieldValue};
    use pretty_assertions::assert_eq;

    fn record(id: &str, fields: &[(FieldKey, &str)]) -> CanonicalRecord {
        let mut record = CanonicalRecord::empty(id);
        for (key, value) in fields {
            record.fields.insert(key.clone(), FieldValue::Text(value.to_string()));
        }
        record
    }

    #[test]
    fn test_metadata_columns_lead() {
        let registry = SchemaRegistry::new();
        assert_eq!(registry.columns(), METADATA_COLUMNS);
    }

    #[test]
    fn test_columns_append_in_discovery_order() {
        let mut registry = SchemaRegistry::new();
        registry.register(&record("a", &[(BillField::NumeroFattura.into(), "FT1")]));
        registry.register(&record(
            "b",
            &[
                (BillField::CodicePdr.into(), "12345678901234"),
                (BillField::NumeroFattura.into(), "FT2"),
            ],
        ));
        registry.register(&record("c", &[]));

        assert_eq!(
            &registry.columns()[METADATA_COLUMNS.len()..],
            &["numero_fattura".to_string(), "codice_pdr".to_string()]
        );
    }

    #[test]
    fn test_late_column_renders_empty_for_earlier_rows() {
        let mut registry = SchemaRegistry::new();
        let first = record("a.pdf", &[(BillField::NumeroFattura.into(), "FT1")]);
        registry.register(&first);
        let extra = FieldKey::extra("Bonus sociale").unwrap();
        let late = record("b.pdf", &[(extra, "-12,00")]);
        registry.register(&late);

        let row = registry.render_row(&first);
        assert_eq!(row.len(), registry.len());
        assert_eq!(row[0], "a.pdf");
        assert_eq!(row[4], "FT1");
        assert_eq!(row[5], "");
        assert_eq!(registry.columns()[5], "extra_bonus_sociale");
    }

    #[test]
    fn test_registered_once() {
        let mut registry = SchemaRegistry::new();
        for _ in 0..3 {
            registry.register(&record("a", &[(BillField::ClienteNome.into(), "Mario")]));
        }
        let count = registry.columns().iter().filter(|c| *c == "cliente_nome").count();
        assert_eq!(count, 1);
    }
}
