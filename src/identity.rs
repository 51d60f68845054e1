//! Natural-key lookups. Absence is a normal answer (`Ok(None)`), never an
//! error; it drives the create path in `upsert.rs`.
//!
//! These take a `&Connection` so they run unchanged inside a transaction.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};

use crate::model::{CompetitionRef, Provider};

/// Composite identity of a match used when no provider id matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchKey {
    pub season_id: i64,
    pub competition_id: i64,
    pub date: NaiveDate,
    pub home_team_id: i64,
    pub away_team_id: i64,
}

pub(crate) fn date_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn resolve_team(conn: &Connection, name: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM teams WHERE team_name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("resolve team {name}"))
}

/// A team already carrying `provider_id` in the provider's id column.
pub fn resolve_team_by_provider_id(
    conn: &Connection,
    provider: Provider,
    provider_id: &str,
) -> Result<Option<i64>> {
    let sql = format!(
        "SELECT id FROM teams WHERE {} = ?1 ORDER BY id LIMIT 1",
        provider.id_column()
    );
    conn.query_row(&sql, params![provider_id], |row| row.get(0))
        .optional()
        .with_context(|| format!("resolve team by {provider} id {provider_id}"))
}

pub fn resolve_season(conn: &Connection, name: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM seasons WHERE season_name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("resolve season {name}"))
}

pub fn resolve_competition(conn: &Connection, name: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM competitions WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("resolve competition {name}"))
}

/// By name first, then by the supplying provider's competition id.
pub fn resolve_competition_ref(
    conn: &Connection,
    provider: Provider,
    competition: &CompetitionRef,
) -> Result<Option<i64>> {
    if let Some(id) = resolve_competition(conn, &competition.name)? {
        return Ok(Some(id));
    }
    let Some(provider_id) = competition.provider_id.as_deref() else {
        return Ok(None);
    };
    let sql = format!(
        "SELECT id FROM competitions WHERE {} = ?1",
        provider.id_column()
    );
    conn.query_row(&sql, params![provider_id], |row| row.get(0))
        .optional()
        .with_context(|| format!("resolve competition by {provider} id {provider_id}"))
}

pub fn resolve_player(conn: &Connection, name: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM players WHERE player_name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("resolve player {name}"))
}

/// Provider id column first. The composite fallback only considers rows
/// that carry no other id from the same provider.
pub fn resolve_match(
    conn: &Connection,
    provider: Provider,
    provider_id: Option<&str>,
    key: &MatchKey,
) -> Result<Option<i64>> {
    let column = provider.id_column();
    if let Some(pid) = provider_id {
        let sql = format!("SELECT id FROM matches WHERE {column} = ?1");
        let found = conn
            .query_row(&sql, params![pid], |row| row.get::<_, i64>(0))
            .optional()
            .with_context(|| format!("resolve match by {provider} id {pid}"))?;
        if found.is_some() {
            return Ok(found);
        }
    }

    let sql = format!(
        "SELECT id FROM matches
         WHERE season_id = ?1 AND competition_id = ?2 AND match_date = ?3
           AND home_team_id = ?4 AND away_team_id = ?5
           AND ({column} IS NULL OR {column} = ?6)
         ORDER BY id
         LIMIT 1"
    );
    conn.query_row(
        &sql,
        params![
            key.season_id,
            key.competition_id,
            date_text(key.date),
            key.home_team_id,
            key.away_team_id,
            provider_id,
        ],
        |row| row.get(0),
    )
    .optional()
    .context("resolve match by fallback key")
}
