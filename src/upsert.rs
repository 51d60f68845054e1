//! Write side of the store.
//!
//! Every public operation runs in its own transaction. On create, every
//! supplied field is written. On update, only supplied fields are written:
//! `Patch::Omit` leaves the stored value, `Patch::Clear` writes NULL.
//! Match statistics are the exception and are replaced wholesale.

use std::fmt;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use tracing::{debug, warn};

use crate::identity::{
    MatchKey, date_text, resolve_competition_ref, resolve_match, resolve_player, resolve_season,
    resolve_team, resolve_team_by_provider_id,
};
use crate::model::{
    CanonicalMatch, CanonicalPlayer, CanonicalTeam, CompetitionRef, GoalRecord, MatchStatistics,
    Patch, Provider, Score, SeasonInfo, SideStats,
};
use crate::season::default_bounds;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created(i64),
    Updated(i64),
}

impl Upserted {
    pub fn id(self) -> i64 {
        match self {
            Upserted::Created(id) | Upserted::Updated(id) => id,
        }
    }

    pub fn is_created(self) -> bool {
        matches!(self, Upserted::Created(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnknownCompetition(String),
    MissingSeason,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownCompetition(name) => write!(f, "unknown competition {name:?}"),
            SkipReason::MissingSeason => f.write_str("no season label and no fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchUpsert {
    Created(i64),
    Updated(i64),
    Skipped(SkipReason),
}

impl MatchUpsert {
    pub fn match_id(&self) -> Option<i64> {
        match self {
            MatchUpsert::Created(id) | MatchUpsert::Updated(id) => Some(*id),
            MatchUpsert::Skipped(_) => None,
        }
    }
}

impl Store {
    pub fn upsert_team(&mut self, team: &CanonicalTeam) -> Result<Upserted> {
        let tx = self.conn.transaction().context("begin team upsert")?;
        let out = write_team(&tx, team)?;
        tx.commit().context("commit team upsert")?;
        Ok(out)
    }

    /// Lookup only. Competitions are seeded with the schema and never created here.
    pub fn upsert_competition_ref(
        &self,
        provider: Provider,
        competition: &CompetitionRef,
    ) -> Result<Option<i64>> {
        resolve_competition_ref(&self.conn, provider, competition)
    }

    pub fn upsert_season(&mut self, season: &SeasonInfo) -> Result<Upserted> {
        let tx = self.conn.transaction().context("begin season upsert")?;
        let out = write_season(&tx, season)?;
        tx.commit().context("commit season upsert")?;
        Ok(out)
    }

    /// Creates `label` with its default bounds if it does not exist yet.
    pub fn ensure_season(&mut self, label: &str) -> Result<i64> {
        let season = SeasonInfo {
            label: label.to_string(),
            ..SeasonInfo::default()
        };
        Ok(self.upsert_season(&season)?.id())
    }

    pub fn upsert_player(&mut self, player: &CanonicalPlayer) -> Result<Upserted> {
        let tx = self.conn.transaction().context("begin player upsert")?;
        let out = write_player(&tx, player)?;
        tx.commit().context("commit player upsert")?;
        Ok(out)
    }

    /// Creates or updates the match, creating its season and teams on demand.
    ///
    /// `fallback_season` labels the match when the provider sent no usable
    /// season. An unresolvable competition skips the record with no writes.
    pub fn upsert_match(
        &mut self,
        record: &CanonicalMatch,
        fallback_season: &str,
    ) -> Result<MatchUpsert> {
        let tx = self.conn.transaction().context("begin match upsert")?;
        let out = write_match(&tx, record, fallback_season).with_context(|| {
            format!("upsert {} match {}", record.provider, record.provider_id)
        })?;
        tx.commit().context("commit match upsert")?;
        Ok(out)
    }

    /// Overwrites every statistics column for `match_id`, including with NULL.
    pub fn replace_match_statistics(
        &mut self,
        match_id: i64,
        stats: &MatchStatistics,
    ) -> Result<()> {
        let tx = self.conn.transaction().context("begin statistics replace")?;
        let mut cols = Columns::default();
        cols.set("match_id", Value::Integer(match_id));
        side_columns(&mut cols, &HOME_STAT_COLUMNS, &stats.home);
        side_columns(&mut cols, &AWAY_STAT_COLUMNS, &stats.away);
        cols.set("updated_at", Value::Text(now_text()));
        cols.upsert_on(&tx, "match_statistics", "match_id")?;
        tx.commit().context("commit statistics replace")?;
        debug!(match_id, "match statistics replaced");
        Ok(())
    }

    pub fn append_goal(&mut self, goal: &GoalRecord) -> Result<i64> {
        let tx = self.conn.transaction().context("begin goal insert")?;
        let mut cols = Columns::default();
        cols.set("match_id", Value::Integer(goal.match_id));
        cols.set("player_id", Value::Integer(goal.scorer_id));
        cols.set("team_id", Value::Integer(goal.team_id));
        cols.set("minute", goal.minute.map_or(Value::Null, int_value));
        let goal_type = if goal.goal_type.trim().is_empty() {
            GoalRecord::DEFAULT_TYPE
        } else {
            goal.goal_type.as_str()
        };
        cols.set("goal_type", Value::Text(goal_type.to_string()));
        cols.set("is_penalty", Value::Integer(goal.is_penalty as i64));
        cols.set("is_own_goal", Value::Integer(goal.is_own_goal as i64));
        cols.set("assist_player_id", goal.assist_id.map_or(Value::Null, Value::Integer));
        cols.set("created_at", Value::Text(now_text()));
        let id = cols.insert(&tx, "goals")?;
        tx.commit().context("commit goal insert")?;
        Ok(id)
    }
}

fn write_team(conn: &Connection, team: &CanonicalTeam) -> Result<Upserted> {
    let name = team.name.trim();
    if name.is_empty() {
        bail!("team without a name");
    }
    let mut cols = Columns::default();
    cols.patch("short_name", &team.short_name, text_value);
    cols.patch("stadium", &team.stadium, text_value);
    cols.patch("city", &team.city, text_value);
    cols.patch("country", &team.country, text_value);
    cols.patch("founded_year", &team.founded_year, |v| int_value(*v));
    cols.patch("website", &team.website, text_value);
    cols.patch("colors", &team.colors, text_value);
    if let Some(pid) = &team.provider_id {
        cols.set(team.provider.id_column(), Value::Text(pid.clone()));
    }
    cols.set("updated_at", Value::Text(now_text()));

    // A known provider id wins over the name, which differs between providers.
    let by_provider_id = match team.provider_id.as_deref() {
        Some(pid) => resolve_team_by_provider_id(conn, team.provider, pid)?,
        None => None,
    };
    let existing = match by_provider_id {
        Some(id) => Some(id),
        None => resolve_team(conn, name)?,
    };
    match existing {
        Some(id) => {
            cols.update(conn, "teams", id)?;
            Ok(Upserted::Updated(id))
        }
        None => {
            cols.set("team_name", Value::Text(name.to_string()));
            let id = cols.insert(conn, "teams")?;
            debug!(team = name, id, "team created");
            Ok(Upserted::Created(id))
        }
    }
}

fn write_season(conn: &Connection, season: &SeasonInfo) -> Result<Upserted> {
    let label = season.label.trim();
    if label.is_empty() {
        bail!("season without a label");
    }
    match resolve_season(conn, label)? {
        Some(id) => {
            let mut cols = Columns::default();
            cols.patch("start_date", &Patch::from_option(season.start), |d| date_value(*d));
            cols.patch("end_date", &Patch::from_option(season.end), |d| date_value(*d));
            cols.update(conn, "seasons", id)?;
            Ok(Upserted::Updated(id))
        }
        None => {
            let defaults = default_bounds(label);
            let start = season.start.or(defaults.map(|(s, _)| s));
            let end = season.end.or(defaults.map(|(_, e)| e));
            let mut cols = Columns::default();
            cols.set("season_name", Value::Text(label.to_string()));
            cols.set("start_date", start.map_or(Value::Null, date_value));
            cols.set("end_date", end.map_or(Value::Null, date_value));
            let id = cols.insert(conn, "seasons")?;
            debug!(season = label, id, "season created");
            Ok(Upserted::Created(id))
        }
    }
}

fn write_player(conn: &Connection, player: &CanonicalPlayer) -> Result<Upserted> {
    let name = player.name.trim();
    if name.is_empty() {
        bail!("player without a name");
    }
    let mut cols = Columns::default();
    cols.patch("date_of_birth", &player.date_of_birth, |d| date_value(*d));
    cols.patch("nationality", &player.nationality, text_value);
    cols.patch("position", &player.position, text_value);
    cols.patch("squad_number", &player.squad_number, |v| int_value(*v));
    cols.patch("joined_date", &player.joined, |d| date_value(*d));
    cols.patch("left_date", &player.left, |d| date_value(*d));
    if let Some(pid) = &player.provider_id {
        cols.set(player.provider.id_column(), Value::Text(pid.clone()));
    }
    cols.set("updated_at", Value::Text(now_text()));

    match resolve_player(conn, name)? {
        Some(id) => {
            cols.update(conn, "players", id)?;
            Ok(Upserted::Updated(id))
        }
        None => {
            cols.set("player_name", Value::Text(name.to_string()));
            let id = cols.insert(conn, "players")?;
            Ok(Upserted::Created(id))
        }
    }
}

fn write_match(
    conn: &Connection,
    record: &CanonicalMatch,
    fallback_season: &str,
) -> Result<MatchUpsert> {
    let Some(competition_id) = resolve_competition_ref(conn, record.provider, &record.competition)?
    else {
        warn!(
            provider = %record.provider,
            entity = "match",
            key = %record.provider_id,
            competition = %record.competition.name,
            "unknown competition, skipping match"
        );
        return Ok(MatchUpsert::Skipped(SkipReason::UnknownCompetition(
            record.competition.name.clone(),
        )));
    };

    let season = if record.season.label.trim().is_empty() {
        SeasonInfo {
            label: fallback_season.to_string(),
            ..SeasonInfo::default()
        }
    } else {
        record.season.clone()
    };
    if season.label.trim().is_empty() {
        warn!(
            provider = %record.provider,
            entity = "match",
            key = %record.provider_id,
            "no season for match, skipping"
        );
        return Ok(MatchUpsert::Skipped(SkipReason::MissingSeason));
    }

    let season_id = write_season(conn, &season)?.id();
    let home_team_id = write_team(conn, &CanonicalTeam::from_ref(record.provider, &record.home))?.id();
    let away_team_id = write_team(conn, &CanonicalTeam::from_ref(record.provider, &record.away))?.id();
    let key = MatchKey {
        season_id,
        competition_id,
        date: record.date,
        home_team_id,
        away_team_id,
    };
    let existing = resolve_match(conn, record.provider, Some(record.provider_id.as_str()), &key)?;

    let mut cols = Columns::default();
    cols.set("season_id", Value::Integer(season_id));
    cols.set("competition_id", Value::Integer(competition_id));
    cols.set("match_date", Value::Text(date_text(record.date)));
    cols.set("home_team_id", Value::Integer(home_team_id));
    cols.set("away_team_id", Value::Integer(away_team_id));
    cols.set("match_status", Value::Text(record.status.as_str().to_string()));
    cols.patch("kick_off_time", &record.kickoff, |t| time_value(*t));
    cols.score_pair("home_score", "away_score", &record.score);
    cols.score_pair("half_time_home_score", "half_time_away_score", &record.half_time);
    cols.patch("venue", &record.venue, text_value);
    cols.patch("attendance", &record.attendance, |v| int_value(*v));
    cols.patch("referee", &record.referee, text_value);
    cols.patch("match_round", &record.round, text_value);
    cols.set(record.provider.id_column(), Value::Text(record.provider_id.clone()));
    let now = now_text();
    cols.set("updated_at", Value::Text(now.clone()));

    match existing {
        Some(id) => {
            cols.update(conn, "matches", id)?;
            debug!(provider = %record.provider, key = %record.provider_id, id, "match updated");
            Ok(MatchUpsert::Updated(id))
        }
        None => {
            cols.set("created_at", Value::Text(now));
            let id = cols.insert(conn, "matches")?;
            debug!(provider = %record.provider, key = %record.provider_id, id, "match created");
            Ok(MatchUpsert::Created(id))
        }
    }
}

const HOME_STAT_COLUMNS: [&str; 10] = [
    "home_possession",
    "home_shots",
    "home_shots_on_target",
    "home_corners",
    "home_fouls",
    "home_offsides",
    "home_passes",
    "home_pass_accuracy",
    "home_yellow_cards",
    "home_red_cards",
];

const AWAY_STAT_COLUMNS: [&str; 10] = [
    "away_possession",
    "away_shots",
    "away_shots_on_target",
    "away_corners",
    "away_fouls",
    "away_offsides",
    "away_passes",
    "away_pass_accuracy",
    "away_yellow_cards",
    "away_red_cards",
];

fn side_columns(cols: &mut Columns, names: &[&'static str; 10], side: &SideStats) {
    let real = |v: Option<f64>| v.map_or(Value::Null, Value::Real);
    let int = |v: Option<u32>| v.map_or(Value::Null, int_value);
    let values = [
        real(side.possession),
        int(side.shots),
        int(side.shots_on_target),
        int(side.corners),
        int(side.fouls),
        int(side.offsides),
        int(side.passes),
        real(side.pass_accuracy),
        int(side.yellow_cards),
        int(side.red_cards),
    ];
    for (name, value) in names.iter().zip(values) {
        cols.set(*name, value);
    }
}

fn now_text() -> String {
    Utc::now().to_rfc3339()
}

fn text_value(value: &String) -> Value {
    Value::Text(value.clone())
}

fn int_value(value: u32) -> Value {
    Value::Integer(i64::from(value))
}

fn date_value(value: NaiveDate) -> Value {
    Value::Text(date_text(value))
}

fn time_value(value: NaiveTime) -> Value {
    Value::Text(value.format("%H:%M:%S").to_string())
}

/// Column/value list for one dynamic INSERT or UPDATE.
#[derive(Default)]
struct Columns {
    names: Vec<&'static str>,
    values: Vec<Value>,
}

impl Columns {
    fn set(&mut self, name: &'static str, value: Value) {
        self.names.push(name);
        self.values.push(value);
    }

    fn patch<T>(&mut self, name: &'static str, patch: &Patch<T>, to_value: impl Fn(&T) -> Value) {
        match patch {
            Patch::Omit => {}
            Patch::Clear => self.set(name, Value::Null),
            Patch::Set(v) => self.set(name, to_value(v)),
        }
    }

    /// Both sides or neither.
    fn score_pair(&mut self, home: &'static str, away: &'static str, score: &Patch<Score>) {
        match score {
            Patch::Omit => {}
            Patch::Clear => {
                self.set(home, Value::Null);
                self.set(away, Value::Null);
            }
            Patch::Set(s) => {
                self.set(home, int_value(s.home));
                self.set(away, int_value(s.away));
            }
        }
    }

    fn placeholders(&self) -> String {
        (1..=self.values.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn insert(self, conn: &Connection, table: &str) -> Result<i64> {
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            self.names.join(", "),
            self.placeholders()
        );
        conn.execute(&sql, params_from_iter(self.values))
            .with_context(|| format!("insert into {table}"))?;
        Ok(conn.last_insert_rowid())
    }

    fn update(mut self, conn: &Connection, table: &str, id: i64) -> Result<()> {
        if self.names.is_empty() {
            return Ok(());
        }
        let assignments = self
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{name} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {table} SET {assignments} WHERE id = ?{}",
            self.values.len() + 1
        );
        self.values.push(Value::Integer(id));
        conn.execute(&sql, params_from_iter(self.values))
            .with_context(|| format!("update {table} row {id}"))?;
        Ok(())
    }

    fn upsert_on(self, conn: &Connection, table: &str, conflict: &str) -> Result<()> {
        let assignments = self
            .names
            .iter()
            .filter(|name| **name != conflict)
            .map(|name| format!("{name} = excluded.{name}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({}) ON CONFLICT({conflict}) DO UPDATE SET {assignments}",
            self.names.join(", "),
            self.placeholders()
        );
        conn.execute(&sql, params_from_iter(self.values))
            .with_context(|| format!("upsert into {table}"))?;
        Ok(())
    }
}
