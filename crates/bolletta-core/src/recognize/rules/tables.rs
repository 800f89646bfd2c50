//! Field rules over extracted table grids.
//!
//! Three passes, each yielding at most one candidate per field:
//! header columns (`Consumo (Smc)` above a value), key/value rows
//! (`Totale da pagare | 99,62`), and unmapped two-column rows, which
//! become extra fields.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{BillField, FieldCandidate, FieldKey, FieldValue, MatchSpan, TableGrid};

use super::ValueKind;

const HEADER_CONFIDENCE: f32 = 0.6;
const KEY_VALUE_CONFIDENCE: f32 = 0.75;
const EXTRA_CONFIDENCE: f32 = 0.5;

/// Longest row label accepted as an extra field name.
const MAX_EXTRA_LABEL: usize = 40;

/// Column header labels, most specific first. Matched case-insensitively
/// on word boundaries.
const HEADER_LABELS: &[(&str, BillField, ValueKind)] = &[
    (r"\bsmc\b", BillField::ConsumoSmc, ValueKind::Decimal),
    (r"\bimpost[ae]\b", BillField::ImportoAccise, ValueKind::Decimal),
    (r"\bconsumo\b", BillField::ConsumoMc, ValueKind::Decimal),
    (r"\blettura\s+precedente\b", BillField::LetturaPrecedente, ValueKind::Decimal),
    (r"\blettura\s+attuale\b", BillField::LetturaAttuale, ValueKind::Decimal),
    (r"\btotale\b", BillField::ImportoTotale, ValueKind::Decimal),
    (r"\bmateria\b", BillField::ImportoEnergia, ValueKind::Decimal),
    (r"\btrasporto\b", BillField::ImportoTrasporto, ValueKind::Decimal),
    (r"\boneri\b", BillField::ImportoOneriSistema, ValueKind::Decimal),
    (r"\baccise\b", BillField::ImportoAccise, ValueKind::Decimal),
];

/// Row labels, most specific first. Matched case-insensitively on word
/// boundaries; consumption labels must open the row.
const ROW_LABELS: &[(&str, BillField, ValueKind)] = &[
    (r"\bpartita\s+iva\b", BillField::FornitorePartitaIva, ValueKind::Code),
    (r"\bp\.\s?iva\b", BillField::FornitorePartitaIva, ValueKind::Code),
    (r"\btotale\s+da\s+pagare\b", BillField::ImportoTotale, ValueKind::Decimal),
    (r"\bimporto\s+totale\b", BillField::ImportoTotale, ValueKind::Decimal),
    (r"\btotale\s+(?:bolletta|fattura)\b", BillField::ImportoTotale, ValueKind::Decimal),
    (r"\bmateria\s+(?:gas|prima)\b", BillField::ImportoEnergia, ValueKind::Decimal),
    (r"\btrasporto\b", BillField::ImportoTrasporto, ValueKind::Decimal),
    (r"\boneri\b", BillField::ImportoOneriSistema, ValueKind::Decimal),
    (r"\baccise\b", BillField::ImportoAccise, ValueKind::Decimal),
    (r"\bimpost[ae]\b", BillField::ImportoAccise, ValueKind::Decimal),
    (r"\biva\b", BillField::ImportoIva, ValueKind::Decimal),
    (r"\bricalcol[oi]\b", BillField::ImportoRicalcoli, ValueKind::Decimal),
    (r"\blettura\s+precedente\b", BillField::LetturaPrecedente, ValueKind::Decimal),
    (r"\blettura\s+attuale\b", BillField::LetturaAttuale, ValueKind::Decimal),
    (r"^\W*consumo\s+(?:in\s+)?smc\b", BillField::ConsumoSmc, ValueKind::Decimal),
    (r"^\W*consumo\b", BillField::ConsumoMc, ValueKind::Decimal),
    (r"\bcoefficiente\s+c\b", BillField::CoefficienteC, ValueKind::Decimal),
    (r"\bpdr\b", BillField::CodicePdr, ValueKind::Code),
    (r"\bremi\b", BillField::CodiceRemi, ValueKind::Code),
    (r"\bcodice\s+cliente\b", BillField::CodiceCliente, ValueKind::Code),
    (r"\bmatricola\b", BillField::MatricolaContatore, ValueKind::Code),
    (r"\bnumero\s+fattura\b", BillField::NumeroFattura, ValueKind::Code),
    (r"\bdata\s+emissione\b", BillField::DataEmissione, ValueKind::Date),
    (r"\bscadenza\b", BillField::DataScadenza, ValueKind::Date),
];

/// A compiled label pattern and the field it maps to.
struct LabelRule {
    pattern: Regex,
    field: BillField,
    kind: ValueKind,
}

fn compile(labels: &[(&str, BillField, ValueKind)]) -> Vec<LabelRule> {
    labels
        .iter()
        .map(|(pattern, field, kind)| LabelRule {
            pattern: Regex::new(&format!("(?i){}", pattern)).unwrap(),
            field: *field,
            kind: *kind,
        })
        .collect()
}

lazy_static! {
    static ref HEADER_RULES: Vec<LabelRule> = compile(HEADER_LABELS);
    static ref ROW_RULES: Vec<LabelRule> = compile(ROW_LABELS);
}

fn lookup(label: &str, rules: &[LabelRule]) -> Option<(BillField, ValueKind)> {
    let label = label.trim();
    rules
        .iter()
        .find(|rule| rule.pattern.is_match(label))
        .map(|rule| (rule.field, rule.kind))
}

fn candidate(
    provider_id: &str,
    field: FieldKey,
    value: FieldValue,
    confidence: f32,
    span: MatchSpan,
    rule: &'static str,
) -> FieldCandidate {
    FieldCandidate {
        field,
        value,
        source_provider_id: provider_id.to_string(),
        local_confidence: confidence,
        raw_match_span: span,
        rule,
    }
}

/// Run all table rules over the grids of one attempt.
pub fn recognize_tables(provider_id: &str, tables: &[TableGrid]) -> Vec<FieldCandidate> {
    let mut out = Vec::new();
    let mut seen: BTreeSet<(&'static str, FieldKey)> = BTreeSet::new();
    let mut push = |c: FieldCandidate, out: &mut Vec<FieldCandidate>| {
        if seen.insert((c.rule, c.field.clone())) {
            out.push(c);
        }
    };

    for (t, grid) in tables.iter().enumerate() {
        for c in header_columns(provider_id, t, grid) {
            push(c, &mut out);
        }
        for c in key_value_rows(provider_id, t, grid) {
            push(c, &mut out);
        }
    }
    out
}

fn header_columns(provider_id: &str, t: usize, grid: &TableGrid) -> Vec<FieldCandidate> {
    let Some(header) = grid.first() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for (col, title) in header.iter().enumerate() {
        let Some((field, kind)) = lookup(title, &HEADER_RULES) else {
            continue;
        };
        let found = grid.iter().enumerate().skip(1).find_map(|(row, cells)| {
            let cell = cells.get(col)?;
            let value = kind.parse(cell).ok()?;
            Some((row, cell.len(), value))
        });
        if let Some((row, len, value)) = found {
            out.push(candidate(
                provider_id,
                field.into(),
                value,
                HEADER_CONFIDENCE,
                MatchSpan::cell(t, row, col, len),
                "table_header",
            ));
        }
    }
    out
}

fn key_value_rows(provider_id: &str, t: usize, grid: &TableGrid) -> Vec<FieldCandidate> {
    let mut out = Vec::new();

    for (row, cells) in grid.iter().enumerate() {
        let filled: Vec<(usize, &String)> =
            cells.iter().enumerate().filter(|(_, c)| !c.trim().is_empty()).collect();
        if filled.len() < 2 {
            continue;
        }
        let (_, label) = filled[0];
        let (col, raw) = filled[filled.len() - 1];

        match lookup(label, &ROW_RULES) {
            Some((field, kind)) => {
                if let Ok(value) = kind.parse(raw) {
                    out.push(candidate(
                        provider_id,
                        field.into(),
                        value,
                        KEY_VALUE_CONFIDENCE,
                        MatchSpan::cell(t, row, col, raw.len()),
                        "table_key_value",
                    ));
                }
            }
            None if filled.len() == 2 => {
                if let Some(c) = extra_row(provider_id, t, row, col, label, raw) {
                    out.push(c);
                }
            }
            None => {}
        }
    }
    out
}

fn extra_row(
    provider_id: &str,
    t: usize,
    row: usize,
    col: usize,
    label: &str,
    raw: &str,
) -> Option<FieldCandidate> {
    let label = label.trim().trim_end_matches(':');
    if label.chars().count() > MAX_EXTRA_LABEL || !label.starts_with(char::is_alphabetic) {
        return None;
    }
    if !raw.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let key = FieldKey::extra(label)?;
    let value = ValueKind::Text.parse(raw).ok()?;
    Some(candidate(
        provider_id,
        key,
        value,
        EXTRA_CONFIDENCE,
        MatchSpan::cell(t, row, col, raw.len()),
        "table_extra",
    ))
}
