//! Read-only reports over the store views.

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use rusqlite::{OptionalExtension, Row, params};

use crate::identity::date_text;
use crate::store::Store;

/// One row of `tracked_club_matches`, seen from the tracked club's side.
#[derive(Debug, Clone, PartialEq)]
pub struct ClubMatch {
    pub match_id: i64,
    pub season: String,
    pub competition: String,
    pub date: String,
    pub kickoff: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub venue: Option<String>,
    pub status: String,
    pub round: Option<String>,
    pub side: String,
    pub opponent: String,
    pub result: Option<String>,
}

impl ClubMatch {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            match_id: row.get("match_id")?,
            season: row.get("season_name")?,
            competition: row.get("competition")?,
            date: row.get("match_date")?,
            kickoff: row.get("kick_off_time")?,
            home_team: row.get("home_team")?,
            away_team: row.get("away_team")?,
            home_score: row.get("home_score")?,
            away_score: row.get("away_score")?,
            venue: row.get("venue")?,
            status: row.get("match_status")?,
            round: row.get("match_round")?,
            side: row.get("venue_side")?,
            opponent: row.get("opponent")?,
            result: row.get("result")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scorer {
    pub player: String,
    pub goals: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSummary {
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

impl RecordSummary {
    pub fn points(&self) -> u32 {
        self.wins * 3 + self.draws
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub seasons: u64,
    pub teams: u64,
    pub competitions: u64,
    pub matches: u64,
    pub players: u64,
    pub goals: u64,
}

const CLUB_MATCH_COLUMNS: &str = "match_id, season_name, competition, match_date, kick_off_time, \
     home_team, away_team, home_score, away_score, venue, match_status, match_round, \
     venue_side, opponent, result";

impl Store {
    pub fn season_matches(&self, season: &str) -> Result<Vec<ClubMatch>> {
        let sql = format!(
            "SELECT {CLUB_MATCH_COLUMNS} FROM tracked_club_matches
             WHERE season_name = ?1
             ORDER BY match_date, kick_off_time"
        );
        let mut stmt = self.conn.prepare(&sql).context("prepare season matches")?;
        let rows = stmt
            .query_map(params![season], ClubMatch::from_row)
            .context("query season matches")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("read season matches")
    }

    /// Scheduled fixtures dated between `today` and `today + days`, inclusive.
    pub fn upcoming_matches(&self, today: NaiveDate, days: u64) -> Result<Vec<ClubMatch>> {
        let until = today.checked_add_days(Days::new(days)).unwrap_or(today);
        let sql = format!(
            "SELECT {CLUB_MATCH_COLUMNS} FROM tracked_club_matches
             WHERE match_date BETWEEN ?1 AND ?2 AND match_status = 'scheduled'
             ORDER BY match_date, kick_off_time"
        );
        let mut stmt = self.conn.prepare(&sql).context("prepare upcoming matches")?;
        let rows = stmt
            .query_map(
                params![date_text(today), date_text(until)],
                ClubMatch::from_row,
            )
            .context("query upcoming matches")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("read upcoming matches")
    }

    pub fn top_scorers(&self, season: Option<&str>, limit: usize) -> Result<Vec<Scorer>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let scorers = match season {
            Some(season) => {
                let mut stmt = self
                    .conn
                    .prepare(
                        "SELECT p.player_name, COUNT(g.id) AS goals
                         FROM goals g
                         JOIN players p ON p.id = g.player_id
                         JOIN matches m ON m.id = g.match_id
                         JOIN seasons s ON s.id = m.season_id
                         JOIN teams t ON t.id = g.team_id
                         JOIN ledger_settings club ON club.key = 'tracked_club'
                         WHERE t.team_name = club.value
                           AND g.is_own_goal = 0
                           AND s.season_name = ?1
                         GROUP BY p.player_name
                         ORDER BY goals DESC, p.player_name ASC
                         LIMIT ?2",
                    )
                    .context("prepare season top scorers")?;
                let rows = stmt
                    .query_map(params![season, limit], scorer_from_row)
                    .context("query season top scorers")?
                    .collect::<rusqlite::Result<Vec<_>>>();
                rows
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT player_name, goals FROM top_scorers LIMIT ?1")
                    .context("prepare top scorers")?;
                let rows = stmt
                    .query_map(params![limit], scorer_from_row)
                    .context("query top scorers")?
                    .collect::<rusqlite::Result<Vec<_>>>();
                rows
            }
        };
        scorers.context("read top scorers")
    }

    /// Finished-match record for one season, or `None` before any result.
    pub fn season_statistics(&self, season: &str) -> Result<Option<RecordSummary>> {
        self.conn
            .query_row(
                "SELECT played, wins, draws, losses, goals_for, goals_against
                 FROM season_statistics WHERE season_name = ?1",
                params![season],
                summary_from_row,
            )
            .optional()
            .with_context(|| format!("season statistics for {season}"))
    }

    /// Finished-match record against one opponent.
    pub fn head_to_head(&self, opponent: &str) -> Result<RecordSummary> {
        self.conn
            .query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN result = 'Win' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN result = 'Draw' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN result = 'Loss' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(club_score), 0),
                        COALESCE(SUM(opponent_score), 0)
                 FROM tracked_club_matches
                 WHERE opponent = ?1 AND match_status = 'finished' AND result IS NOT NULL",
                params![opponent],
                summary_from_row,
            )
            .with_context(|| format!("head to head against {opponent}"))
    }

    pub fn table_counts(&self) -> Result<TableCounts> {
        let count = |table: &str| -> Result<u64> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .with_context(|| format!("count {table}"))?;
            Ok(n.max(0) as u64)
        };
        Ok(TableCounts {
            seasons: count("seasons")?,
            teams: count("teams")?,
            competitions: count("competitions")?,
            matches: count("matches")?,
            players: count("players")?,
            goals: count("goals")?,
        })
    }
}

fn scorer_from_row(row: &Row<'_>) -> rusqlite::Result<Scorer> {
    Ok(Scorer {
        player: row.get(0)?,
        goals: row.get(1)?,
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<RecordSummary> {
    Ok(RecordSummary {
        played: row.get(0)?,
        wins: row.get(1)?,
        draws: row.get(2)?,
        losses: row.get(3)?,
        goals_for: row.get(4)?,
        goals_against: row.get(5)?,
    })
}
