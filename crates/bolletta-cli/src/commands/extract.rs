//! Extract command: run a batch of bills into a CSV table.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::{glob_with, MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use bolletta_core::{BatchDriver, DocumentHandle};

use crate::output::discrepancy::{DiscrepancyLog, NoDiscrepancyLog};
use crate::output::json::{write_report, ExtractionReport, JsonDir};
use crate::output::table::CsvTableWriter;
use crate::output::BatchOutput;

/// Document extensions picked up when scanning directories.
const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt"];

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output CSV file
    #[arg(short, long)]
    output: PathBuf,

    /// Append low-confidence and failed documents to this log
    #[arg(long)]
    discrepancy_log: Option<PathBuf>,

    /// Also write one <name>_extracted.json per document into this directory
    #[arg(long)]
    json_dir: Option<PathBuf>,

    /// Write a JSON batch report to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Scan input directories recursively
    #[arg(short, long)]
    recursive: bool,

    /// Number of documents processed in parallel
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

pub async fn run(args: ExtractArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = super::load_config(config_path)?;
    if let Some(jobs) = args.jobs {
        config.batch.jobs = jobs;
    }
    let driver = BatchDriver::new(&config)?;

    let documents = collect_inputs(&args.inputs, args.recursive)?;
    if documents.is_empty() {
        anyhow::bail!("No PDF or text documents found in the given inputs");
    }
    println!("{} Found {} documents to process", style("ℹ").blue(), documents.len());

    if args.output.is_dir() {
        anyhow::bail!("Output path {} is a directory", args.output.display());
    }
    let table = CsvTableWriter::create(&args.output)?;

    let json_dir = args.json_dir.as_deref().map(JsonDir::create).transpose()?;

    let progress = progress_bar(documents.len(), args.no_progress)?;
    let mut output = BatchOutput::new(table, json_dir, progress);
    if args.summary.is_some() {
        output = output.collect_results();
    }

    let cancel = driver.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing documents in flight");
            cancel.cancel();
        }
    });

    let summary = match &args.discrepancy_log {
        Some(path) => {
            let mut log = DiscrepancyLog::open(path)?;
            driver.run(documents, &mut output, &mut log).await?
        }
        None => driver.run(documents, &mut output, &mut NoDiscrepancyLog).await?,
    };
    info!("Wrote {}", args.output.display());

    if let Some(path) = &args.summary {
        let report = ExtractionReport::new(&summary, output.into_results());
        write_report(path, &report)?;
        println!("{} Report written to {}", style("✓").green(), path.display());
    }

    println!(
        "{} Processed {} documents in {:?}",
        style("✓").green(),
        summary.processed,
        start.elapsed()
    );
    println!(
        "   {} extracted, {} failed, {} flagged, average confidence {:.1}%",
        style(summary.processed - summary.total_failures).green(),
        style(summary.total_failures).red(),
        style(summary.flagged).yellow(),
        summary.average_confidence * 100.0
    );
    if summary.skipped > 0 {
        println!("   {} skipped after interruption", style(summary.skipped).yellow());
    }
    println!("{} Table written to {}", style("✓").green(), args.output.display());

    Ok(())
}

/// Expand input paths into a sorted, de-duplicated list of documents.
/// Files are taken as given; directories are scanned for supported
/// extensions.
///
/// A document found under a directory is identified by its path relative to
/// that directory, an explicit file by its name. Ids that would still clash
/// fall back to the full path.
fn collect_inputs(inputs: &[PathBuf], recursive: bool) -> anyhow::Result<Vec<DocumentHandle>> {
    let options = MatchOptions {
        case_sensitive: false,
        ..Default::default()
    };
    let mut files: BTreeMap<PathBuf, String> = BTreeMap::new();

    for input in inputs {
        if input.is_file() {
            files.entry(input.clone()).or_insert_with(|| file_name_id(input));
        } else if input.is_dir() {
            let base = Pattern::escape(&input.to_string_lossy());
            for ext in SUPPORTED_EXTENSIONS {
                let pattern = if recursive {
                    format!("{}/**/*.{}", base, ext)
                } else {
                    format!("{}/*.{}", base, ext)
                };
                for entry in glob_with(&pattern, options)? {
                    match entry {
                        Ok(path) if path.is_file() => {
                            let id = relative_id(input, &path);
                            files.entry(path).or_insert(id);
                        }
                        Ok(_) => {}
                        Err(e) => warn!("Skipping unreadable path: {}", e),
                    }
                }
            }
        } else {
            anyhow::bail!("Input path not found: {}", input.display());
        }
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    for id in files.values() {
        *seen.entry(id.clone()).or_default() += 1;
    }

    Ok(files
        .into_iter()
        .map(|(path, id)| {
            let id = if seen[&id] > 1 {
                path.display().to_string()
            } else {
                id
            };
            DocumentHandle::from_path_with_id(id, path)
        })
        .collect())
}

fn file_name_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `path` relative to `root`, `/`-separated.
fn relative_id(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => file_name_id(path),
    }
}

fn progress_bar(len: usize, disabled: bool) -> anyhow::Result<ProgressBar> {
    if disabled || !console::Term::stderr().is_term() {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );
    Ok(bar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use pretty_assertions::assert_eq;

    fn ids(documents: &[DocumentHandle]) -> Vec<&str> {
        documents.iter().map(|d| d.id()).collect()
    }

    #[test]
    fn test_collect_inputs_scans_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2024");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("a.pdf"), b"").unwrap();
        fs::write(dir.path().join("b.TXT"), b"").unwrap();
        fs::write(dir.path().join("notes.docx"), b"").unwrap();
        fs::write(nested.join("c.pdf"), b"").unwrap();

        let flat = collect_inputs(&[dir.path().to_path_buf()], false).unwrap();
        assert_eq!(ids(&flat), vec!["a.pdf", "b.TXT"]);

        let deep = collect_inputs(&[dir.path().to_path_buf()], true).unwrap();
        assert_eq!(ids(&deep), vec!["2024/c.pdf", "a.pdf", "b.TXT"]);
    }

    #[test]
    fn test_same_file_name_in_sibling_folders_gets_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        for year in ["2024", "2025"] {
            let folder = dir.path().join(year);
            fs::create_dir(&folder).unwrap();
            fs::write(folder.join("bolletta.pdf"), b"").unwrap();
        }

        let scanned = collect_inputs(&[dir.path().to_path_buf()], true).unwrap();
        assert_eq!(ids(&scanned), vec!["2024/bolletta.pdf", "2025/bolletta.pdf"]);

        let first = dir.path().join("2024").join("bolletta.pdf");
        let second = dir.path().join("2025").join("bolletta.pdf");
        let explicit = collect_inputs(&[first.clone(), second.clone()], false).unwrap();
        assert_eq!(
            ids(&explicit),
            vec![first.display().to_string(), second.display().to_string()]
        );
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let result = collect_inputs(&[PathBuf::from("/no/such/bills")], false);
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_files_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.pdf");
        fs::write(&file, b"").unwrap();
        let documents = collect_inputs(&[file.clone(), file.clone()], false).unwrap();
        assert_eq!(ids(&documents), vec!["a.pdf"]);
        assert_eq!(documents[0].path(), Some(file.as_path()));
    }
}
