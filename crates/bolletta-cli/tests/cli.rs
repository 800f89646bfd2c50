use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const FULL_BILL: &str = "\
ENEL ENERGIA SPA - Servizio clienti gas naturale, bolletta sintetica mensile
Partita IVA: 00743110157
Fattura n. FT123456789 relativa alla fornitura di gas naturale per uso domestico
Data emissione: 15/05/2024
Scadenza: 30/06/2024
Codice Cliente: CL987654321
Intestatario: Mario Rossi
Via Roma 123
20121 Milano (MI)
PDR: 12345678901234
Periodo di fatturazione: dal 01/03/2024 al 30/04/2024
Lettura precedente: 1.234
Lettura attuale: 1.364
Consumo: 130 mc
Consumo standard: 125 smc
Coefficiente C: 1,020000
Spesa per la materia gas naturale: € 45,10
Spesa per il trasporto e la gestione del contatore: € 22,30
Spesa per oneri di sistema: € 8,12
Accise e addizionale regionale: € 15,00
IVA 10%: € 9,10
TOTALE DA PAGARE: €99,62
";

const PARTIAL_BILL: &str = "Totale da pagare: € 42,00\nFattura n. FT000000042\n";

fn bolletta(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bolletta").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home).env_remove("RUST_LOG");
    cmd
}

fn bills_dir(root: &Path) -> std::path::PathBuf {
    let dir = root.join("bollette");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("full.txt"), FULL_BILL).unwrap();
    fs::write(dir.join("partial.txt"), PARTIAL_BILL).unwrap();
    fs::write(dir.join("broken.txt"), [0xff, 0xfe, 0x00, 0x81]).unwrap();
    dir
}

#[test]
fn extract_writes_one_row_per_document() {
    let tmp = tempfile::tempdir().unwrap();
    let bills = bills_dir(tmp.path());
    let out = tmp.path().join("bollette.csv");
    let log = tmp.path().join("discrepancies.log");
    let summary = tmp.path().join("extraction_summary.json");
    let json_dir = tmp.path().join("json");

    bolletta(tmp.path())
        .arg("extract")
        .arg(&bills)
        .arg("--output")
        .arg(&out)
        .arg("--discrepancy-log")
        .arg(&log)
        .arg("--summary")
        .arg(&summary)
        .arg("--json-dir")
        .arg(&json_dir)
        .arg("--no-progress")
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 3 documents"));

    let mut reader = csv::Reader::from_path(&out).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        &header[..4],
        &["document_id", "extracted_at", "overall_confidence", "extraction_method"]
    );
    assert!(header.contains(&"codice_pdr".to_string()));

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.len() == header.len()));

    let pdr_col = header.iter().position(|c| c == "codice_pdr").unwrap();
    let full = rows.iter().find(|r| &r[0] == "full.txt").unwrap();
    assert_eq!(&full[pdr_col], "12345678901234");
    assert_eq!(&full[3], "plain_text");
    let partial = rows.iter().find(|r| &r[0] == "partial.txt").unwrap();
    assert_eq!(&partial[pdr_col], "");

    let log_text = fs::read_to_string(&log).unwrap();
    assert!(log_text.contains("broken.txt"));
    assert!(log_text.contains("partial.txt"));
    assert!(!log_text.contains("full.txt"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary).unwrap()).unwrap();
    assert_eq!(report["total_files"], 3);
    assert_eq!(report["failed"], 1);

    assert!(json_dir.join("full_extracted.json").exists());
    assert!(json_dir.join("broken_extracted.json").exists());
}

#[test]
fn extract_missing_input_fails() {
    let tmp = tempfile::tempdir().unwrap();
    bolletta(tmp.path())
        .args(["extract", "/no/such/folder", "--output"])
        .arg(tmp.path().join("out.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input path not found"));
}

#[test]
fn extract_unwritable_output_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let bills = bills_dir(tmp.path());
    bolletta(tmp.path())
        .arg("extract")
        .arg(&bills)
        .arg("--output")
        .arg(tmp.path().join("missing").join("out.csv"))
        .arg("--no-progress")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not writable"));
}

#[test]
fn extract_rejects_invalid_config() {
    let tmp = tempfile::tempdir().unwrap();
    let bills = bills_dir(tmp.path());
    let config = tmp.path().join("config.json");
    fs::write(&config, r#"{"providers": {"enabled": ["ocr_magic"]}}"#).unwrap();

    bolletta(tmp.path())
        .arg("--config")
        .arg(&config)
        .arg("extract")
        .arg(&bills)
        .arg("--output")
        .arg(tmp.path().join("out.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown provider"));
}

#[test]
fn extract_rejects_zero_jobs() {
    let tmp = tempfile::tempdir().unwrap();
    let bills = bills_dir(tmp.path());
    bolletta(tmp.path())
        .arg("extract")
        .arg(&bills)
        .args(["--jobs", "0", "--output"])
        .arg(tmp.path().join("out.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("jobs"));
}

#[test]
fn config_init_then_show() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("bolletta.json");

    bolletta(tmp.path())
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    bolletta(tmp.path())
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    bolletta(tmp.path())
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("discrepancy_threshold"));
}

#[test]
fn config_path_points_into_config_dir() {
    let tmp = tempfile::tempdir().unwrap();
    bolletta(tmp.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bolletta"))
        .stdout(predicate::str::contains("not created"));
}

#[test]
fn extract_keeps_same_named_documents_apart() {
    let tmp = tempfile::tempdir().unwrap();
    let bills = tmp.path().join("bollette");
    for year in ["2024", "2025"] {
        let folder = bills.join(year);
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("bolletta.txt"), FULL_BILL).unwrap();
    }
    let out = tmp.path().join("out.csv");
    let json_dir = tmp.path().join("json");

    bolletta(tmp.path())
        .arg("extract")
        .arg(&bills)
        .arg("--recursive")
        .arg("--output")
        .arg(&out)
        .arg("--json-dir")
        .arg(&json_dir)
        .arg("--no-progress")
        .assert()
        .success();

    let mut reader = csv::Reader::from_path(&out).unwrap();
    let mut ids: Vec<String> = reader.records().map(|r| r.unwrap()[0].to_string()).collect();
    ids.sort();
    assert_eq!(ids, vec!["2024/bolletta.txt", "2025/bolletta.txt"]);

    assert!(json_dir.join("2024_bolletta_extracted.json").exists());
    assert!(json_dir.join("2025_bolletta_extracted.json").exists());
}
