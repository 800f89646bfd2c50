//! CLI application for batch extraction of Italian gas bills.

mod commands;
mod output;

use std::future::Future;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commands::{config, extract};

/// Italian gas bill extraction - turn bills into a reconciled CSV table
#[derive(Parser)]
#[command(name = "bolletta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Raise the log level (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log level
    #[arg(short, long, value_enum, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract bills into a CSV table
    Extract(extract::ExtractArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The level after `steps` increments of `-v`.
    fn raised(self, steps: u8) -> Level {
        const LEVELS: [Level; 5] = [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE];
        let index = (self as usize + steps as usize).min(LEVELS.len() - 1);
        LEVELS[index]
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = cli.log_level.raised(cli.verbose);
    let filter = EnvFilter::new(format!("{},lopdf=error,pdf_extract=error", level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    run_to_completion(async move {
        match cli.command {
            Commands::Extract(args) => extract::run(args, cli.config.as_deref()).await,
            Commands::Config(args) => config::run(args, cli.config.as_deref()).await,
        }
    })?
}

/// Drive `future` on a fresh runtime, then shut the runtime down without
/// waiting for blocking tasks. Provider calls that outlived their timeout
/// are abandoned instead of holding the process open.
fn run_to_completion<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_abandoned_blocking_work_does_not_delay_exit() {
        let start = Instant::now();
        let value = run_to_completion(async {
            let stuck = tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(10)));
            let waited = tokio::time::timeout(Duration::from_millis(50), stuck).await;
            assert!(waited.is_err());
            7
        })
        .unwrap();

        assert_eq!(value, 7);
        assert!(start.elapsed() < Duration::from_secs(5), "{:?}", start.elapsed());
    }

    #[test]
    fn test_log_level_raised_by_verbose_count() {
        assert_eq!(LogLevel::Info.raised(0), Level::INFO);
        assert_eq!(LogLevel::Info.raised(1), Level::DEBUG);
        assert_eq!(LogLevel::Warn.raised(9), Level::TRACE);
    }
}
