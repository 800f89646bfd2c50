//! Gas bill field vocabulary and typed field values.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Version of the recognized field set. Bumped whenever a [`BillField`] is
/// added, renamed or removed.
pub const FIELD_SET_VERSION: u32 = 1;

/// Prefix of columns discovered through the extension path.
pub const EXTRA_PREFIX: &str = "extra_";

macro_rules! bill_fields {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// A field recognized on Italian gas bills.
        ///
        /// Declaration order is the canonical column order used when several
        /// fields are first discovered by the same document.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum BillField {
            $($variant),+
        }

        impl BillField {
            /// All recognized fields in canonical order.
            pub const ALL: &'static [BillField] = &[$(BillField::$variant),+];

            /// Column name of the field.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(BillField::$variant => $name),+
                }
            }

            /// Look up a field by its column name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(BillField::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

bill_fields! {
    // Customer
    ClienteNome => "cliente_nome",
    ClienteCognome => "cliente_cognome",
    ClienteIndirizzo => "cliente_indirizzo",
    ClienteCap => "cliente_cap",
    ClienteCitta => "cliente_citta",
    ClienteProvincia => "cliente_provincia",
    // Contract
    CodiceCliente => "codice_cliente",
    NumeroContratto => "numero_contratto",
    CodicePdr => "codice_pdr",
    CodiceRemi => "codice_remi",
    // Bill
    NumeroFattura => "numero_fattura",
    DataEmissione => "data_emissione",
    DataScadenza => "data_scadenza",
    PeriodoInizio => "periodo_fatturazione_inizio",
    PeriodoFine => "periodo_fatturazione_fine",
    // Consumption
    LetturaPrecedente => "lettura_precedente",
    LetturaAttuale => "lettura_attuale",
    ConsumoMc => "consumo_mc",
    ConsumoSmc => "consumo_smc",
    CoefficienteC => "coefficiente_c",
    // Amounts
    ImportoEnergia => "importo_energia",
    ImportoTrasporto => "importo_trasporto",
    ImportoOneriSistema => "importo_oneri_sistema",
    ImportoAccise => "importo_accise",
    ImportoIva => "importo_iva",
    ImportoTotale => "importo_totale",
    ImportoRicalcoli => "importo_ricalcoli",
    // Tariff
    TariffaTipo => "tariffa_tipo",
    ClasseContatore => "classe_contatore",
    // Supplier
    FornitoreNome => "fornitore_nome",
    FornitorePartitaIva => "fornitore_partita_iva",
    // Technical
    MatricolaContatore => "matricola_contatore",
    PressioneErogazione => "pressione_erogazione",
    PotereCalorifico => "potere_calorifico",
}

impl fmt::Display for BillField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a field in a canonical record.
///
/// `Known` fields come from the versioned vocabulary; `Extra` fields are
/// labels found in key/value tables that the vocabulary does not cover.
/// Known fields order before extras.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    Known(BillField),
    Extra(String),
}

impl FieldKey {
    /// Build an extension key from a free-form label.
    ///
    /// Returns `None` when the label has no alphanumeric content.
    pub fn extra(label: &str) -> Option<Self> {
        let slug = slugify(label);
        if slug.is_empty() {
            None
        } else {
            Some(FieldKey::Extra(format!("{}{}", EXTRA_PREFIX, slug)))
        }
    }

    /// Column name of the key.
    pub fn name(&self) -> &str {
        match self {
            FieldKey::Known(field) => field.as_str(),
            FieldKey::Extra(name) => name,
        }
    }

    /// Parse a column name back into a key.
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(field) = BillField::from_name(name) {
            return Some(FieldKey::Known(field));
        }
        name.starts_with(EXTRA_PREFIX)
            .then(|| FieldKey::Extra(name.to_string()))
    }
}

impl From<BillField> for FieldKey {
    fn from(field: BillField) -> Self {
        FieldKey::Known(field)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for FieldKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for FieldKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        FieldKey::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown field: {}", name)))
    }
}

fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for c in label.trim().to_lowercase().chars() {
        let c = match c {
            'à' | 'á' => 'a',
            'è' | 'é' => 'e',
            'ì' | 'í' => 'i',
            'ò' | 'ó' => 'o',
            'ù' | 'ú' => 'u',
            other => other,
        };
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Decimal(Decimal),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Decimal(d) => write!(f, "{}", d),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}
