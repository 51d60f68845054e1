//! One reconciliation run: pull from every provider, push through the store.
//!
//! Provider failures are tallied and the run carries on. Only a store that
//! cannot be reached aborts the run.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::adapter::SourceAdapter;
use crate::config::AppConfig;
use crate::error::is_store_unavailable;
use crate::football_data::FootballDataAdapter;
use crate::model::{CanonicalMatch, Provider, TeamRef};
use crate::season::current_season;
use crate::sportsdb::SportsDbAdapter;
use crate::store::Store;
use crate::upsert::MatchUpsert;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    FetchingRecent,
    FetchingUpcoming,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Recent results and upcoming fixtures.
    #[default]
    Daily,
    /// The daily passes plus squad and team details.
    Season,
}

impl FromStr for RunMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(RunMode::Daily),
            "season" => Ok(RunMode::Season),
            other => Err(anyhow!("unknown run mode {other:?} (expected daily or season)")),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::Daily => "daily",
            RunMode::Season => "season",
        })
    }
}

/// Per-provider outcome counts for one kind of record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTally {
    pub provider: Provider,
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Tolerated errors, one line each.
    pub errors: Vec<String>,
}

impl ProviderTally {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            fetched: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            errors: Vec::new(),
        }
    }

    fn record_error(&mut self, err: impl fmt::Display) {
        self.failed += 1;
        self.errors.push(err.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mode: RunMode,
    pub season: String,
    pub phase: RunPhase,
    pub matches: Vec<ProviderTally>,
    pub squad: Vec<ProviderTally>,
    pub team_info: Vec<ProviderTally>,
}

impl RunReport {
    fn new(mode: RunMode, season: String) -> Self {
        Self {
            mode,
            season,
            phase: RunPhase::Idle,
            matches: Vec::new(),
            squad: Vec::new(),
            team_info: Vec::new(),
        }
    }

    pub fn match_tally(&self, provider: Provider) -> Option<&ProviderTally> {
        self.matches.iter().find(|t| t.provider == provider)
    }

    pub fn total_failed(&self) -> usize {
        self.matches
            .iter()
            .chain(&self.squad)
            .chain(&self.team_info)
            .map(|t| t.failed)
            .sum()
    }

    pub fn total_written(&self) -> usize {
        self.matches
            .iter()
            .chain(&self.squad)
            .chain(&self.team_info)
            .map(|t| t.created + t.updated)
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassLimits {
    pub recent: usize,
    pub upcoming: usize,
}

pub struct ReconciliationPipeline {
    store: Store,
    adapters: Vec<Box<dyn SourceAdapter>>,
    limits: PassLimits,
    tracked_club: String,
    today: NaiveDate,
    phase: RunPhase,
}

impl ReconciliationPipeline {
    pub fn new(
        store: Store,
        adapters: Vec<Box<dyn SourceAdapter>>,
        limits: PassLimits,
        tracked_club: impl Into<String>,
        today: NaiveDate,
    ) -> Self {
        Self {
            store,
            adapters,
            limits,
            tracked_club: tracked_club.into(),
            today,
            phase: RunPhase::Idle,
        }
    }

    /// Both providers over HTTP, configured from `cfg`.
    pub fn from_config(cfg: &AppConfig, store: Store, today: NaiveDate) -> Result<Self> {
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(
                FootballDataAdapter::from_config(&cfg.football_data)
                    .context("build football-data.org adapter")?
                    .with_recent_window(today, cfg.recent_window_days),
            ),
            Box::new(
                SportsDbAdapter::from_config(&cfg.sportsdb, &cfg.tracked_club)
                    .context("build thesportsdb adapter")?
                    .with_today(today),
            ),
        ];
        let limits = PassLimits {
            recent: cfg.recent_limit,
            upcoming: cfg.upcoming_limit,
        };
        Ok(Self::new(store, adapters, limits, cfg.tracked_club.clone(), today))
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn run(&mut self, mode: RunMode) -> Result<RunReport> {
        self.phase = RunPhase::Idle;
        self.store.ping()?;
        let season = current_season(self.today);
        self.store
            .ensure_season(&season)
            .with_context(|| format!("ensure current season {season}"))?;
        let mut report = RunReport::new(mode, season.clone());
        info!(%mode, %season, today = %self.today, "reconciliation run started");

        let mut tallies = self
            .adapters
            .iter()
            .map(|a| ProviderTally::new(a.provider()))
            .collect::<Vec<_>>();

        self.enter(RunPhase::FetchingRecent, &mut report);
        for (adapter, tally) in self.adapters.iter_mut().zip(tallies.iter_mut()) {
            let club = ClubIdentity::of(&**adapter, &self.tracked_club);
            match adapter.fetch_recent_matches(self.limits.recent) {
                Ok(records) => apply_matches(&mut self.store, records, &season, &club, tally)?,
                Err(err) => {
                    warn!(provider = %tally.provider, entity = "match", error = %err, "recent matches unavailable");
                    tally.record_error(err);
                }
            }
        }

        self.enter(RunPhase::FetchingUpcoming, &mut report);
        for (adapter, tally) in self.adapters.iter_mut().zip(tallies.iter_mut()) {
            let club = ClubIdentity::of(&**adapter, &self.tracked_club);
            match adapter.fetch_upcoming_matches(self.limits.upcoming) {
                Ok(records) => apply_matches(&mut self.store, records, &season, &club, tally)?,
                Err(err) => {
                    warn!(provider = %tally.provider, entity = "match", error = %err, "upcoming matches unavailable");
                    tally.record_error(err);
                }
            }
        }
        report.matches = tallies;

        if mode == RunMode::Season {
            report.squad = self.sync_squad()?;
            report.team_info = self.sync_team_info()?;
        }

        self.enter(RunPhase::Done, &mut report);
        info!(
            %mode,
            written = report.total_written(),
            failed = report.total_failed(),
            "reconciliation run finished"
        );
        Ok(report)
    }

    /// Upserts every provider's squad list, attaching each provider's player id.
    pub fn sync_squad(&mut self) -> Result<Vec<ProviderTally>> {
        let mut tallies = Vec::with_capacity(self.adapters.len());
        for adapter in self.adapters.iter_mut() {
            let mut tally = ProviderTally::new(adapter.provider());
            match adapter.fetch_squad() {
                Ok(players) => {
                    tally.fetched = players.len();
                    for player in &players {
                        match self.store.upsert_player(player) {
                            Ok(out) if out.is_created() => tally.created += 1,
                            Ok(_) => tally.updated += 1,
                            Err(err) => {
                                if is_store_unavailable(&err) {
                                    return Err(err);
                                }
                                warn!(provider = %tally.provider, entity = "player", key = %player.name, error = %format!("{err:#}"), "player upsert failed");
                                tally.record_error(format!("{err:#}"));
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(provider = %tally.provider, entity = "player", error = %err, "squad unavailable");
                    tally.record_error(err);
                }
            }
            tallies.push(tally);
        }
        Ok(tallies)
    }

    /// Enriches the tracked club's row from every provider's team details.
    ///
    /// Providers name the club differently, so the record is stored under the
    /// configured tracked club name.
    pub fn sync_team_info(&mut self) -> Result<Vec<ProviderTally>> {
        let mut tallies = Vec::with_capacity(self.adapters.len());
        for adapter in self.adapters.iter_mut() {
            let mut tally = ProviderTally::new(adapter.provider());
            match adapter.fetch_team_info() {
                Ok(Some(mut team)) => {
                    tally.fetched = 1;
                    if team.name != self.tracked_club {
                        info!(provider = %tally.provider, provider_name = %team.name, "storing team details under tracked club name");
                        team.name = self.tracked_club.clone();
                    }
                    match self.store.upsert_team(&team) {
                        Ok(out) if out.is_created() => tally.created += 1,
                        Ok(_) => tally.updated += 1,
                        Err(err) => {
                            if is_store_unavailable(&err) {
                                return Err(err);
                            }
                            warn!(provider = %tally.provider, entity = "team", key = %team.name, error = %format!("{err:#}"), "team upsert failed");
                            tally.record_error(format!("{err:#}"));
                        }
                    }
                }
                Ok(None) => {
                    warn!(provider = %tally.provider, entity = "team", "provider returned no team details");
                }
                Err(err) => {
                    warn!(provider = %tally.provider, entity = "team", error = %err, "team details unavailable");
                    tally.record_error(err);
                }
            }
            tallies.push(tally);
        }
        Ok(tallies)
    }

    fn enter(&mut self, phase: RunPhase, report: &mut RunReport) {
        self.phase = phase;
        report.phase = phase;
        info!(?phase, "run phase");
    }
}

/// How one provider identifies the tracked club.
struct ClubIdentity {
    provider_team_id: Option<String>,
    name: String,
}

impl ClubIdentity {
    fn of(adapter: &dyn SourceAdapter, tracked_club: &str) -> Self {
        Self {
            provider_team_id: adapter.tracked_team_id().map(str::to_string),
            name: tracked_club.to_string(),
        }
    }

    /// Providers spell the club differently; its provider id settles it.
    fn claim(&self, team: &mut TeamRef) {
        let Some(club_id) = self.provider_team_id.as_deref() else {
            return;
        };
        if team.provider_id.as_deref() == Some(club_id) && team.name != self.name {
            team.name = self.name.clone();
        }
    }
}

fn apply_matches(
    store: &mut Store,
    mut records: Vec<CanonicalMatch>,
    season: &str,
    club: &ClubIdentity,
    tally: &mut ProviderTally,
) -> Result<()> {
    tally.fetched += records.len();
    for record in records.iter_mut() {
        club.claim(&mut record.home);
        club.claim(&mut record.away);
    }
    for record in &records {
        let outcome = match store.upsert_match(record, season) {
            Ok(outcome) => outcome,
            Err(err) => {
                if is_store_unavailable(&err) {
                    return Err(err);
                }
                warn!(provider = %record.provider, entity = "match", key = %record.provider_id, error = %format!("{err:#}"), "match upsert failed");
                tally.record_error(format!("{err:#}"));
                continue;
            }
        };
        let match_id = match outcome {
            MatchUpsert::Created(id) => {
                tally.created += 1;
                id
            }
            MatchUpsert::Updated(id) => {
                tally.updated += 1;
                id
            }
            MatchUpsert::Skipped(_) => {
                tally.skipped += 1;
                continue;
            }
        };
        if let Some(stats) = record.stats.as_ref().filter(|_| record.has_statistics()) {
            if let Err(err) = store.replace_match_statistics(match_id, stats) {
                if is_store_unavailable(&err) {
                    return Err(err);
                }
                warn!(provider = %record.provider, entity = "match_statistics", key = %record.provider_id, error = %format!("{err:#}"), "statistics upsert failed");
                tally.record_error(format!("{err:#}"));
            }
        }
    }
    Ok(())
}
