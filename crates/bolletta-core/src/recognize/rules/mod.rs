//! Rule-based field recognizers for Italian gas bills.
//!
//! Every rule reads one field and yields at most one candidate per attempt:
//! the first match, in block order, whose value parses.

pub mod amounts;
pub mod codes;
pub mod dates;
pub mod patterns;
pub mod tables;

pub use amounts::parse_italian_decimal;
pub use codes::{checked_partita_iva, normalize_code, validate_partita_iva};
pub use dates::parse_italian_date;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::error::FieldParseError;
use crate::models::{BillField, FieldCandidate, FieldKey, FieldValue, MatchSpan};
use patterns::*;

/// How the captured text of a rule is turned into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Free text, whitespace collapsed.
    Text,
    /// Alphanumeric identifier with at least one digit.
    Code,
    /// Partita IVA with a valid check digit.
    PartitaIva,
    /// Italian-formatted number or amount.
    Decimal,
    /// Italian date.
    Date,
}

impl ValueKind {
    pub fn parse(&self, raw: &str) -> Result<FieldValue, FieldParseError> {
        match self {
            ValueKind::Text => {
                let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
                if text.is_empty() {
                    Err(FieldParseError::Shape(raw.to_string()))
                } else {
                    Ok(FieldValue::Text(text))
                }
            }
            ValueKind::Code => normalize_code(raw).map(FieldValue::Text),
            ValueKind::PartitaIva => checked_partita_iva(raw).map(FieldValue::Text),
            ValueKind::Decimal => parse_italian_decimal(raw).map(FieldValue::Decimal),
            ValueKind::Date => parse_italian_date(raw).map(FieldValue::Date),
        }
    }
}

/// A labeled or standalone regex rule for one field.
pub struct PatternRule {
    pub name: &'static str,
    pub field: BillField,
    pub pattern: &'static Regex,
    /// Capture group holding the value.
    pub group: usize,
    pub kind: ValueKind,
    pub confidence: f32,
}

impl PatternRule {
    /// Scan `blocks` in order and return the first match whose value parses.
    pub fn apply(&self, provider_id: &str, blocks: &[String]) -> Option<FieldCandidate> {
        for (index, block) in blocks.iter().enumerate() {
            for caps in self.pattern.captures_iter(block) {
                let Some(m) = caps.get(self.group) else {
                    continue;
                };
                match self.kind.parse(m.as_str()) {
                    Ok(value) => {
                        return Some(FieldCandidate {
                            field: FieldKey::Known(self.field),
                            value,
                            source_provider_id: provider_id.to_string(),
                            local_confidence: self.confidence,
                            raw_match_span: MatchSpan::text(index, m.start(), m.end()),
                            rule: self.name,
                        });
                    }
                    Err(e) => debug!(rule = self.name, "Skipping unparseable match: {}", e),
                }
            }
        }
        None
    }
}

macro_rules! rule {
    ($name:literal, $field:ident, $pattern:ident, $group:literal, $kind:ident, $conf:literal) => {
        PatternRule {
            name: $name,
            field: BillField::$field,
            pattern: &*$pattern,
            group: $group,
            kind: ValueKind::$kind,
            confidence: $conf,
        }
    };
}

lazy_static! {
    /// All text rules, labeled rules before their standalone fallbacks.
    pub static ref TEXT_RULES: Vec<PatternRule> = vec![
        rule!("invoice_number", NumeroFattura, INVOICE_NUMBER, 1, Code, 0.95),
        rule!("invoice_number_alt", NumeroFattura, INVOICE_NUMBER_ALT, 1, Code, 0.85),
        rule!("customer_code", CodiceCliente, CUSTOMER_CODE, 1, Code, 0.9),
        rule!("contract_number", NumeroContratto, CONTRACT_NUMBER, 1, Code, 0.85),
        rule!("pdr_labeled", CodicePdr, PDR, 1, Code, 0.95),
        rule!("pdr_standalone", CodicePdr, PDR_STANDALONE, 1, Code, 0.4),
        rule!("remi", CodiceRemi, REMI, 1, Code, 0.9),
        rule!("meter_serial", MatricolaContatore, METER_SERIAL, 1, Code, 0.85),
        rule!("vat_number_checked", FornitorePartitaIva, VAT_NUMBER, 1, PartitaIva, 0.95),
        rule!("vat_number", FornitorePartitaIva, VAT_NUMBER, 1, Code, 0.6),
        rule!("meter_class", ClasseContatore, METER_CLASS, 1, Code, 0.9),
        rule!("tariff", TariffaTipo, TARIFF, 1, Text, 0.75),
        rule!("delivery_pressure", PressioneErogazione, DELIVERY_PRESSURE, 1, Text, 0.8),
        rule!("calorific_value", PotereCalorifico, CALORIFIC_VALUE, 1, Decimal, 0.85),
        rule!("coefficient_c", CoefficienteC, COEFFICIENT_C, 1, Decimal, 0.85),
        rule!("issue_date", DataEmissione, ISSUE_DATE, 1, Date, 0.95),
        rule!("issue_date_inline", DataEmissione, ISSUE_DATE_INLINE, 1, Date, 0.8),
        rule!("due_date", DataScadenza, DUE_DATE, 1, Date, 0.9),
        rule!("billing_period_start", PeriodoInizio, BILLING_PERIOD, 1, Date, 0.95),
        rule!("billing_period_end", PeriodoFine, BILLING_PERIOD, 2, Date, 0.95),
        rule!("period_from", PeriodoInizio, PERIOD_FROM, 1, Date, 0.55),
        rule!("period_to", PeriodoFine, PERIOD_TO, 1, Date, 0.5),
        rule!("total_due", ImportoTotale, TOTAL_DUE, 1, Decimal, 0.95),
        rule!("total_generic", ImportoTotale, TOTAL_GENERIC, 1, Decimal, 0.6),
        rule!("energy_amount", ImportoEnergia, ENERGY_AMOUNT, 1, Decimal, 0.85),
        rule!("transport_amount", ImportoTrasporto, TRANSPORT_AMOUNT, 1, Decimal, 0.85),
        rule!("system_charges", ImportoOneriSistema, SYSTEM_CHARGES, 1, Decimal, 0.8),
        rule!("excise_amount", ImportoAccise, EXCISE_AMOUNT, 1, Decimal, 0.85),
        rule!("vat_amount", ImportoIva, VAT_AMOUNT, 1, Decimal, 0.85),
        rule!("recalculation_amount", ImportoRicalcoli, RECALCULATION_AMOUNT, 1, Decimal, 0.8),
        rule!("consumption_smc_labeled", ConsumoSmc, CONSUMPTION_SMC_LABELED, 1, Decimal, 0.9),
        rule!("consumption_mc_labeled", ConsumoMc, CONSUMPTION_MC_LABELED, 1, Decimal, 0.9),
        rule!("consumption_smc_unit", ConsumoSmc, CONSUMPTION_SMC_UNIT, 1, Decimal, 0.7),
        rule!("consumption_mc_unit", ConsumoMc, CONSUMPTION_MC_UNIT, 1, Decimal, 0.65),
        rule!("previous_reading", LetturaPrecedente, PREVIOUS_READING, 1, Decimal, 0.9),
        rule!("current_reading", LetturaAttuale, CURRENT_READING, 1, Decimal, 0.9),
        rule!("holder_first_name", ClienteNome, HOLDER_NAME, 1, Text, 0.85),
        rule!("holder_last_name", ClienteCognome, HOLDER_NAME, 2, Text, 0.85),
        rule!("holder_first_name_upper", ClienteNome, HOLDER_NAME_UPPER, 1, Text, 0.7),
        rule!("holder_last_name_upper", ClienteCognome, HOLDER_NAME_UPPER, 2, Text, 0.7),
        rule!("name_before_street_first", ClienteNome, NAME_BEFORE_STREET, 1, Text, 0.45),
        rule!("name_before_street_last", ClienteCognome, NAME_BEFORE_STREET, 2, Text, 0.45),
        rule!("street_address", ClienteIndirizzo, STREET_ADDRESS, 1, Text, 0.7),
        rule!("postal_code_city", ClienteCap, POSTAL_CITY_PROVINCE, 1, Code, 0.9),
        rule!("city", ClienteCitta, POSTAL_CITY_PROVINCE, 2, Text, 0.85),
        rule!("province", ClienteProvincia, POSTAL_CITY_PROVINCE, 3, Text, 0.9),
        rule!("postal_code", ClienteCap, POSTAL_CODE, 1, Code, 0.3),
    ];
}

/// Confidence of a supplier found by name.
const SUPPLIER_CONFIDENCE: f32 = 0.8;

/// Find the known supplier named earliest in the text.
pub fn recognize_supplier(provider_id: &str, blocks: &[String]) -> Option<FieldCandidate> {
    let mut best: Option<(usize, usize, usize, &'static str)> = None;

    for (index, block) in blocks.iter().enumerate() {
        for (name, pattern) in SUPPLIER_PATTERNS.iter() {
            if let Some(m) = pattern.find(block) {
                let key = (index, m.start(), m.end(), *name);
                if best.is_none_or(|b| (key.0, key.1) < (b.0, b.1)) {
                    best = Some(key);
                }
            }
        }
        if best.is_some() {
            break;
        }
    }

    best.map(|(index, start, end, name)| FieldCandidate {
        field: FieldKey::Known(BillField::FornitoreNome),
        value: FieldValue::Text(name.to_string()),
        source_provider_id: provider_id.to_string(),
        local_confidence: SUPPLIER_CONFIDENCE,
        raw_match_span: MatchSpan::text(index, start, end),
        rule: "known_supplier",
    })
}
