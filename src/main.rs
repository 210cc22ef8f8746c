use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use pngverify::cli::{Cli, FileReport, check_file, collect_inputs};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let level = if debug {
        Level::DEBUG
    } else if verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Returns whether every checked file came out clean.
fn run(cli: &Cli) -> Result<bool> {
    let options = cli.inspect_options();
    let files = collect_inputs(&cli.paths, cli.recursive)?;

    if files.is_empty() {
        tracing::warn!("no png files found");
        return Ok(true);
    }

    tracing::info!(files = files.len(), "checking files");

    let reports = files
        .iter()
        .map(|path| check_file(path, &options))
        .collect::<Result<Vec<FileReport>>>()?;

    if cli.json {
        let out = serde_json::to_string_pretty(&reports).context("Failed to serialize report")?;
        println!("{out}");
    } else {
        for report in &reports {
            for line in report.render_text() {
                println!("{line}");
            }
        }
    }

    let damaged = reports.iter().filter(|r| !r.is_clean()).count();
    if damaged > 0 {
        tracing::warn!(damaged, total = reports.len(), "damaged files found");
    }

    Ok(damaged == 0)
}
