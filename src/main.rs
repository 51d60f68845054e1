use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::error;

use club_ledger::config::AppConfig;
use club_ledger::logging;
use club_ledger::pipeline::{ProviderTally, ReconciliationPipeline, RunMode, RunReport};
use club_ledger::store::Store;

fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    match run() {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "reconciliation run aborted");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<RunReport> {
    let cfg = AppConfig::from_env();
    let mode = match arg_value("--mode") {
        Some(raw) => raw.parse::<RunMode>()?,
        None => RunMode::default(),
    };
    let db_path = arg_value("--db")
        .map(PathBuf::from)
        .or_else(|| cfg.db_path.clone())
        .context("unable to resolve sqlite path")?;

    let store = Store::open(&db_path, &cfg.tracked_club)?;
    let today = Local::now().date_naive();
    let mut pipeline = ReconciliationPipeline::from_config(&cfg, store, today)?;
    pipeline.run(mode)
}

fn print_report(report: &RunReport) {
    println!("Reconciliation run complete ({} mode)", report.mode);
    println!("Season: {}", report.season);
    print_tallies("matches", &report.matches);
    print_tallies("squad", &report.squad);
    print_tallies("team", &report.team_info);
}

fn print_tallies(label: &str, tallies: &[ProviderTally]) {
    for tally in tallies {
        println!(
            "{label} {}: fetched={} created={} updated={} skipped={} failed={}",
            tally.provider, tally.fetched, tally.created, tally.updated, tally.skipped, tally.failed
        );
        for err in tally.errors.iter().take(6) {
            println!("   - {err}");
        }
    }
}

/// `--name value` or `--name=value`.
fn arg_value(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
