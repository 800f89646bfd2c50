//! Common regex patterns for Italian gas bill extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// Money with mandatory cents: `1.234,56`, `99,62`, `99.62`, optional `€`.
const MONEY: &str = r"(?:€|eur(?:o)?)?\s*(-?\d{1,3}(?:\.\d{3})*,\d{2}|-?\d+[.,]\d{2})\b";

/// Quantity: `1.234`, `130`, `125,5`.
const QUANTITY: &str = r"(\d{1,3}(?:\.\d{3})+(?:,\d{1,6})?|\d+(?:[.,]\d{1,6})?)";

/// Numeric or long-form Italian date.
const DATE: &str = r"(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}|\d{1,2}\s+(?:gennaio|febbraio|marzo|aprile|maggio|giugno|luglio|agosto|settembre|ottobre|novembre|dicembre)\s+\d{4})";

const SEP: &str = r"[:\s]*";

fn labeled(label: &str, value: &str) -> Regex {
    Regex::new(&format!("{}{}{}", label, SEP, value)).unwrap()
}

lazy_static! {
    // Identifiers
    pub static ref INVOICE_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:fattura|bolletta)\s*(?:n(?:umero)?\.?|nr\.?|n°)\s*:?\s*([A-Z0-9][A-Z0-9/\-]{5,24})"
    ).unwrap();

    pub static ref INVOICE_NUMBER_ALT: Regex = Regex::new(
        r"(?i)\bnumero\s+(?:documento|fattura|bolletta)[:\s]*([A-Z0-9][A-Z0-9/\-]{5,24})"
    ).unwrap();

    pub static ref CUSTOMER_CODE: Regex = Regex::new(
        r"(?i)\b(?:cod(?:ice)?\.?\s*client[ei]|client[ei]\s*cod(?:ice)?)[:\s]*(?:n\.?\s*)?([A-Z0-9]{6,20})\b"
    ).unwrap();

    pub static ref CONTRACT_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:n(?:umero)?\.?\s*contratto|codice\s+contratto|contratto\s+n\.?)[:\s]*([A-Z0-9/\-]{5,20})\b"
    ).unwrap();

    pub static ref PDR: Regex = Regex::new(
        r"(?i)\b(?:PDR|punto\s+di\s+riconsegna)\b[^\d\n]{0,15}(\d{14})\b"
    ).unwrap();

    pub static ref PDR_STANDALONE: Regex = Regex::new(r"\b(\d{14})\b").unwrap();

    pub static ref REMI: Regex = Regex::new(
        r"(?i)\b(?:cod(?:ice)?\.?\s*)?REMI\b[:\s]*([0-9A-Z]{8,15})\b"
    ).unwrap();

    pub static ref METER_SERIAL: Regex = Regex::new(
        r"(?i)\b(?:matricola(?:\s+(?:del\s+)?contatore)?|contatore\s+n\.?)[:\s]*([A-Z0-9]{6,15})\b"
    ).unwrap();

    pub static ref VAT_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:p\.?\s*iva|partita\s*iva)[:\s]*(?:IT\s*)?(\d{11})\b"
    ).unwrap();

    pub static ref METER_CLASS: Regex = Regex::new(
        r"(?i)\bclasse\s+(?:del\s+)?(?:contatore|misuratore)[:\s]*(G\s?\d{1,3})\b"
    ).unwrap();

    pub static ref TARIFF: Regex = Regex::new(
        r"(?i)\b(?:tipologia\s+(?:di\s+)?(?:tariffa|offerta)|tipo\s+(?:di\s+)?tariffa|nome\s+offerta)[:\s]+([^\n]{3,60})"
    ).unwrap();

    pub static ref DELIVERY_PRESSURE: Regex = Regex::new(
        r"(?i)\bpressione\s+(?:di\s+)?(?:erogazione|fornitura)[:\s]*(\d+(?:[.,]\d+)?\s*(?:mbar|bar)?)"
    ).unwrap();

    pub static ref CALORIFIC_VALUE: Regex = labeled(
        r"(?i)\bpotere\s+calorifico(?:\s+superiore)?(?:\s*\(?PCS\)?)?",
        QUANTITY,
    );

    pub static ref COEFFICIENT_C: Regex = labeled(
        r"(?i)\bcoeff(?:iciente|\.)?\s*(?:C\b|di\s+(?:adeguamento|conversione))",
        QUANTITY,
    );

    // Dates
    pub static ref ISSUE_DATE: Regex = labeled(
        r"(?i)\b(?:data\s*(?:di\s*)?emissione|emess[ao]\s*il)",
        DATE,
    );

    pub static ref ISSUE_DATE_INLINE: Regex = Regex::new(&format!(
        r"(?i)\b(?:fattura|bolletta)\b[^\n]{{0,40}}?\bdel{}{}", SEP, DATE
    )).unwrap();

    pub static ref DUE_DATE: Regex = labeled(
        r"(?i)\b(?:data\s*(?:di\s*)?scadenza|scadenza(?:\s+pagamento)?|scade\s*il|(?:pagare\s+)?entro\s*il)",
        DATE,
    );

    pub static ref BILLING_PERIOD: Regex = Regex::new(&format!(
        r"(?i)\bperiodo(?:\s+di)?(?:\s+fatturazione|\s+riferimento|\s+consumi)?{}(?:dal\s*)?{}\s*(?:al|-|–)\s*{}",
        SEP, DATE, DATE
    )).unwrap();

    pub static ref PERIOD_FROM: Regex = Regex::new(&format!(r"(?i)\bdal\s+{}", DATE)).unwrap();

    pub static ref PERIOD_TO: Regex = Regex::new(&format!(r"(?i)\bal\s+{}", DATE)).unwrap();

    // Amounts
    pub static ref TOTAL_DUE: Regex = labeled(
        r"(?i)\b(?:totale\s+(?:da\s+pagare|bolletta|fattura|documento|importo)|importo\s+(?:totale|da\s+pagare|fattura)|da\s+pagare)",
        MONEY,
    );

    pub static ref TOTAL_GENERIC: Regex = labeled(r"(?i)\btotale\b", MONEY);

    pub static ref ENERGY_AMOUNT: Regex = labeled(
        r"(?i)\b(?:spesa\s+per\s+la\s+materia\s+(?:prima\s+)?gas(?:\s+naturale)?|materia\s+(?:prima\s+)?gas|spesa\s+(?:per\s+)?(?:la\s+)?vendita|energia)",
        MONEY,
    );

    pub static ref TRANSPORT_AMOUNT: Regex = labeled(
        r"(?i)\b(?:spesa\s+per\s+(?:il\s+)?trasporto(?:\s+e\s+(?:la\s+)?gestione\s+del\s+contatore)?|trasporto(?:\s+e\s+gestione\s+(?:del\s+)?contatore)?|distribuzione)",
        MONEY,
    );

    pub static ref SYSTEM_CHARGES: Regex = labeled(
        r"(?i)\b(?:spesa\s+per\s+)?oneri(?:\s+generali)?(?:\s+di)?(?:\s+sistema)?",
        MONEY,
    );

    pub static ref EXCISE_AMOUNT: Regex = labeled(
        r"(?i)\b(?:accis[ae](?:\s+e\s+addizional[ei](?:\s+regional[ei])?)?|imposte(?:\s+erariali)?)",
        MONEY,
    );

    pub static ref VAT_AMOUNT: Regex = labeled(
        r"(?i)\b(?:iva|i\.v\.a\.?)(?:\s*\d{1,2}(?:[.,]\d+)?\s*%)?",
        MONEY,
    );

    pub static ref RECALCULATION_AMOUNT: Regex = labeled(r"(?i)\bricalcol[io]", MONEY);

    // Consumption
    pub static ref CONSUMPTION_SMC_LABELED: Regex = Regex::new(&format!(
        r"(?i)\bconsumo[^\n:\d]{{0,30}}{}{}\s*(?:smc\b|sm³|sm3\b|standard\s*metri\s*cubi\b)",
        SEP, QUANTITY
    )).unwrap();

    pub static ref CONSUMPTION_MC_LABELED: Regex = Regex::new(&format!(
        r"(?i)\bconsumo[^\n:\d]{{0,30}}{}{}\s*(?:mc\b|m³|m3\b|metri\s*cubi\b)",
        SEP, QUANTITY
    )).unwrap();

    pub static ref CONSUMPTION_SMC_UNIT: Regex = Regex::new(&format!(
        r"(?i)\b{}\s*(?:smc\b|sm³|sm3\b|standard\s*metri\s*cubi\b)",
        QUANTITY
    )).unwrap();

    pub static ref CONSUMPTION_MC_UNIT: Regex = Regex::new(&format!(
        r"(?i)\b{}\s*(?:mc\b|m³|m3\b|metri\s*cubi\b)",
        QUANTITY
    )).unwrap();

    pub static ref PREVIOUS_READING: Regex = Regex::new(&format!(
        r"(?i)\blettura\s+(?:precedente|iniziale)(?:\s*\(?(?:rilevata|stimata|effettiva)\)?)?{}{}\b",
        SEP, QUANTITY
    )).unwrap();

    pub static ref CURRENT_READING: Regex = Regex::new(&format!(
        r"(?i)\blettura\s+(?:attuale|finale)(?:\s*\(?(?:rilevata|stimata|effettiva)\)?)?{}{}\b",
        SEP, QUANTITY
    )).unwrap();

    // Customer
    pub static ref HOLDER_NAME: Regex = Regex::new(
        r"(?i:\b(?:intestatario|cliente|titolare)(?:\s+(?:del\s+)?contratto)?)[:\s]+([A-ZÀ-Ý][a-zà-ÿ']+)[ \t]+([A-ZÀ-Ý][a-zà-ÿ']+)"
    ).unwrap();

    pub static ref HOLDER_NAME_UPPER: Regex = Regex::new(
        r"(?i:\b(?:intestatario|cliente|titolare)(?:\s+(?:del\s+)?contratto)?)[:\s]+([A-Z][A-Z']+)[ \t]+([A-Z][A-Z']+)\b"
    ).unwrap();

    pub static ref NAME_BEFORE_STREET: Regex = Regex::new(
        r"\b([A-Z][a-zà-ÿ']+)[ \t]+([A-Z][a-zà-ÿ']+)\s+(?i:via|viale|piazza|corso)\b"
    ).unwrap();

    pub static ref STREET_ADDRESS: Regex = Regex::new(
        r"(?i)\b((?:via|viale|v\.le|piazza|p\.zza|corso|largo|vicolo|strada|località|loc\.)\s+[^\n,\d]{2,40}?,?\s*\d+[A-Za-z]?(?:/[A-Za-z0-9]+)?)"
    ).unwrap();

    pub static ref POSTAL_CITY_PROVINCE: Regex = Regex::new(
        r"\b(\d{5})[ \t]+([A-ZÀ-Ý][A-Za-zÀ-ÿ' ]*?[A-Za-zà-ÿ])[ \t]*\(([A-Z]{2})\)"
    ).unwrap();

    pub static ref POSTAL_CODE: Regex = Regex::new(r"\b(\d{5})\b").unwrap();

    // Text normalization
    pub static ref HORIZONTAL_SPACE: Regex = Regex::new(r"[ \t\u{00a0}\u{2007}\u{202f}]+").unwrap();
}

/// Well-known Italian gas suppliers, matched as whole words.
pub const KNOWN_SUPPLIERS: &[&str] = &[
    "ENEL", "ENI", "A2A", "HERA", "IREN", "ACEA", "EDISON", "SORGENIA",
    "GREEN NETWORK", "WEKIWI", "PLENITUDE", "OCTOPUS", "ILLUMIA",
    "GAS NATURAL", "ITALGAS", "TOSCANA ENERGIA",
];

lazy_static! {
    pub static ref SUPPLIER_PATTERNS: Vec<(&'static str, Regex)> = KNOWN_SUPPLIERS
        .iter()
        .map(|name| {
            let words: Vec<String> = name.split(' ').map(regex::escape).collect();
            let pattern = format!(r"(?i)\b{}\b", words.join(r"\s+"));
            (*name, Regex::new(&pattern).expect("valid supplier pattern"))
        })
        .collect();
}
