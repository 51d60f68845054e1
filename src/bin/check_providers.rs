use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;

use club_ledger::adapter::SourceAdapter;
use club_ledger::config::AppConfig;
use club_ledger::football_data::FootballDataAdapter;
use club_ledger::logging;
use club_ledger::sportsdb::SportsDbAdapter;
use club_ledger::store::Store;

const SAMPLE_MATCHES: usize = 3;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let cfg = AppConfig::from_env();
    let db_path = parse_db_path_arg()
        .or_else(|| cfg.db_path.clone())
        .context("unable to resolve sqlite path")?;

    let store = Store::open(&db_path, &cfg.tracked_club)?;
    store.ping()?;
    let counts = store.table_counts()?;
    println!("Store: {}", db_path.display());
    println!(
        "  seasons={} teams={} competitions={} matches={} players={} goals={}",
        counts.seasons, counts.teams, counts.competitions, counts.matches, counts.players, counts.goals
    );

    let today = Local::now().date_naive();
    let mut adapters: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(FootballDataAdapter::from_config(&cfg.football_data)?),
        Box::new(SportsDbAdapter::from_config(&cfg.sportsdb, &cfg.tracked_club)?.with_today(today)),
    ];

    let mut healthy = 0usize;
    for adapter in adapters.iter_mut() {
        let provider = adapter.provider();
        println!("{provider}");
        match adapter.fetch_team_info() {
            Ok(Some(team)) => println!("  team: {}", team.name),
            Ok(None) => println!("  team: not found"),
            Err(err) => {
                println!("  team: FAILED ({err})");
                continue;
            }
        }
        match adapter.fetch_recent_matches(SAMPLE_MATCHES) {
            Ok(matches) => {
                healthy += 1;
                println!("  recent matches: {}", matches.len());
                for m in &matches {
                    let score = m
                        .score
                        .value()
                        .map(|s| format!("{}-{}", s.home, s.away))
                        .unwrap_or_else(|| "v".to_string());
                    println!(
                        "   - {} {} {} {} ({})",
                        m.date, m.home.name, score, m.away.name, m.competition.name
                    );
                }
            }
            Err(err) => println!("  recent matches: FAILED ({err})"),
        }
    }

    println!("Providers reachable: {healthy}/{}", adapters.len());
    Ok(())
}

fn parse_db_path_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--db=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--db" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
