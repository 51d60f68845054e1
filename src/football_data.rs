//! football-data.org (v4): identifier-keyed team and match lookups.

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use serde_json::Value;

use crate::adapter::{
    SourceAdapter, array_at, non_empty, normalize_batch, parse_date, parse_date_opt, parse_time,
    required,
};
use crate::config::ProviderConfig;
use crate::error::{FetchError, NormalizeError};
use crate::fetcher::{RateLimitPolicy, RateLimitedFetcher, Transport};
use crate::http_client::HttpTransport;
use crate::model::{
    CanonicalMatch, CanonicalPlayer, CanonicalTeam, CompetitionRef, Patch, Provider, Score,
    SeasonInfo, TeamRef,
};
use crate::season::season_label;
use crate::status::map_football_data_status;

const AUTH_HEADER: &str = "X-Auth-Token";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMatch {
    pub id: Option<u64>,
    pub utc_date: Option<String>,
    pub status: Option<String>,
    pub matchday: Option<u32>,
    pub venue: Option<String>,
    pub attendance: Option<u32>,
    pub referees: Option<Vec<RawReferee>>,
    pub home_team: Option<RawTeamRef>,
    pub away_team: Option<RawTeamRef>,
    pub competition: Option<RawCompetition>,
    pub season: Option<RawSeason>,
    pub score: Option<RawScore>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTeamRef {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub short_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCompetition {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSeason {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScore {
    pub full_time: Option<RawScorePair>,
    pub half_time: Option<RawScorePair>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawScorePair {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawReferee {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTeam {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub venue: Option<String>,
    pub founded: Option<u32>,
    pub website: Option<String>,
    pub club_colors: Option<String>,
    pub area: Option<RawArea>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawArea {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlayer {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub position: Option<String>,
    pub date_of_birth: Option<String>,
    pub nationality: Option<String>,
    pub shirt_number: Option<u32>,
}

pub fn normalize_match(raw: &RawMatch) -> Result<CanonicalMatch, NormalizeError> {
    let id = raw.id.ok_or(NormalizeError::MissingField("id"))?;
    let utc_date = required("utcDate", raw.utc_date.as_deref())?;
    let date = parse_date("utcDate", utc_date)?;
    let kickoff = utc_date
        .split_once('T')
        .and_then(|(_, clock)| parse_time(clock));

    let home = team_ref(raw.home_team.as_ref(), "homeTeam.name")?;
    let away = team_ref(raw.away_team.as_ref(), "awayTeam.name")?;

    let competition = raw
        .competition
        .as_ref()
        .ok_or(NormalizeError::MissingField("competition"))?;
    let competition = CompetitionRef {
        name: required("competition.name", competition.name.as_deref())?.to_string(),
        provider_id: non_empty(competition.code.as_deref())
            .or_else(|| competition.id.map(|id| id.to_string())),
    };

    let season = raw
        .season
        .as_ref()
        .map(|s| {
            let start = parse_date_opt(s.start_date.as_deref());
            let end = parse_date_opt(s.end_date.as_deref());
            SeasonInfo {
                label: season_label(start, end),
                start,
                end,
            }
        })
        .unwrap_or_default();

    let score = raw.score.as_ref();
    let full_time = score.and_then(|s| s.full_time.as_ref()).and_then(pair);
    let half_time = score.and_then(|s| s.half_time.as_ref()).and_then(pair);

    let referee = raw.referees.as_deref().and_then(|refs| {
        refs.iter()
            .find(|r| r.role.as_deref() == Some("REFEREE"))
            .or_else(|| refs.first())
            .and_then(|r| non_empty(r.name.as_deref()))
    });

    Ok(CanonicalMatch {
        provider: Provider::FootballData,
        provider_id: id.to_string(),
        date,
        kickoff: Patch::from_option(kickoff),
        home,
        away,
        competition,
        season,
        status: map_football_data_status(raw.status.as_deref().unwrap_or_default()),
        score: Patch::from_option(full_time),
        half_time: Patch::from_option(half_time),
        venue: Patch::from_option(non_empty(raw.venue.as_deref())),
        attendance: Patch::from_option(raw.attendance),
        referee: Patch::from_option(referee),
        round: Patch::from_option(raw.matchday.map(|m| m.to_string())),
        stats: None,
    })
}

pub fn normalize_player(raw: &RawPlayer) -> Result<CanonicalPlayer, NormalizeError> {
    let name = required("name", raw.name.as_deref())?;
    Ok(CanonicalPlayer {
        provider_id: raw.id.map(|id| id.to_string()),
        date_of_birth: Patch::from_option(parse_date_opt(raw.date_of_birth.as_deref())),
        nationality: Patch::from_option(non_empty(raw.nationality.as_deref())),
        position: Patch::from_option(non_empty(raw.position.as_deref())),
        squad_number: Patch::from_option(raw.shirt_number),
        ..CanonicalPlayer::named(Provider::FootballData, name)
    })
}

pub fn normalize_team(raw: &RawTeam) -> Result<CanonicalTeam, NormalizeError> {
    let name = required("name", raw.name.as_deref())?;
    Ok(CanonicalTeam {
        provider: Provider::FootballData,
        provider_id: raw.id.map(|id| id.to_string()),
        name: name.to_string(),
        short_name: Patch::from_option(non_empty(raw.short_name.as_deref())),
        stadium: Patch::from_option(non_empty(raw.venue.as_deref())),
        city: Patch::Omit,
        country: Patch::from_option(
            raw.area.as_ref().and_then(|a| non_empty(a.name.as_deref())),
        ),
        founded_year: Patch::from_option(raw.founded),
        website: Patch::from_option(non_empty(raw.website.as_deref())),
        colors: Patch::from_option(non_empty(raw.club_colors.as_deref())),
    })
}

/// Canonical matches from a `/teams/{id}/matches` payload.
pub fn parse_matches_json(raw: &str) -> Result<Vec<CanonicalMatch>> {
    let root = parse_root(raw).context("invalid football-data matches json")?;
    Ok(matches_from_value(&root))
}

pub fn parse_squad_json(raw: &str) -> Result<Vec<CanonicalPlayer>> {
    let root = parse_root(raw).context("invalid football-data team json")?;
    Ok(squad_from_value(&root))
}

pub fn parse_team_json(raw: &str) -> Result<Option<CanonicalTeam>> {
    let root = parse_root(raw).context("invalid football-data team json")?;
    Ok(team_from_value(&root))
}

fn parse_root(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(trimmed)?)
}

fn matches_from_value(root: &Value) -> Vec<CanonicalMatch> {
    normalize_batch(
        Provider::FootballData,
        "match",
        array_at(root, "matches"),
        normalize_match,
    )
}

fn squad_from_value(root: &Value) -> Vec<CanonicalPlayer> {
    normalize_batch(
        Provider::FootballData,
        "player",
        array_at(root, "squad"),
        normalize_player,
    )
}

fn team_from_value(root: &Value) -> Option<CanonicalTeam> {
    if root.is_null() {
        return None;
    }
    normalize_batch(
        Provider::FootballData,
        "team",
        std::slice::from_ref(root),
        normalize_team,
    )
    .pop()
}

fn team_ref(raw: Option<&RawTeamRef>, field: &'static str) -> Result<TeamRef, NormalizeError> {
    let raw = raw.ok_or(NormalizeError::MissingField(field))?;
    Ok(TeamRef {
        name: required(field, raw.name.as_deref())?.to_string(),
        provider_id: raw.id.map(|id| id.to_string()),
    })
}

fn pair(raw: &RawScorePair) -> Option<Score> {
    Score::from_sides(raw.home, raw.away)
}

pub struct FootballDataAdapter<T> {
    fetcher: RateLimitedFetcher<T>,
    team_id: String,
    has_credentials: bool,
    recent_window: Option<RecentWindow>,
}

/// Recent results as a date window ending yesterday instead of a
/// status-filtered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecentWindow {
    today: NaiveDate,
    days: u64,
}

impl RecentWindow {
    fn bounds(self) -> (NaiveDate, NaiveDate) {
        let to = self.today.pred_opt().unwrap_or(self.today);
        let from = self
            .today
            .checked_sub_days(Days::new(self.days))
            .unwrap_or(NaiveDate::MIN);
        (from, to)
    }
}

impl FootballDataAdapter<HttpTransport> {
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let transport = HttpTransport::new(cfg.timeout, cfg.user_agent.clone())?;
        Ok(Self::new(cfg, transport))
    }
}

impl<T: Transport> FootballDataAdapter<T> {
    pub fn new(cfg: &ProviderConfig, transport: T) -> Self {
        let mut fetcher = RateLimitedFetcher::new(
            Provider::FootballData,
            cfg.base_url.clone(),
            transport,
            RateLimitPolicy::from(cfg),
        );
        if let Some(key) = cfg.api_key.as_deref() {
            fetcher = fetcher.with_header(AUTH_HEADER, key);
        }
        Self {
            fetcher,
            team_id: cfg.team_id.clone(),
            has_credentials: cfg.api_key.is_some(),
            recent_window: None,
        }
    }

    /// Fetches recent results for the `days` before `today` (up to
    /// yesterday). Zero days keeps the status-filtered list.
    pub fn with_recent_window(mut self, today: NaiveDate, days: u64) -> Self {
        self.recent_window = (days > 0).then_some(RecentWindow { today, days });
        self
    }

    fn ensure_credentials(&self) -> Result<(), FetchError> {
        if self.has_credentials {
            Ok(())
        } else {
            Err(FetchError::MissingCredentials {
                provider: Provider::FootballData,
            })
        }
    }

    fn team_matches(&mut self, status: &str, limit: usize) -> Result<Vec<CanonicalMatch>, FetchError> {
        self.ensure_credentials()?;
        let endpoint = format!("/teams/{}/matches", self.team_id);
        let limit_param = limit.to_string();
        let root = self
            .fetcher
            .fetch_json(&endpoint, &[("status", status), ("limit", limit_param.as_str())])?;
        Ok(matches_from_value(&root))
    }

    fn team_payload(&mut self) -> Result<Value, FetchError> {
        self.ensure_credentials()?;
        let endpoint = format!("/teams/{}", self.team_id);
        self.fetcher.fetch_json(&endpoint, &[])
    }

    /// Matches in a date window, both ends inclusive.
    pub fn fetch_matches_between(
        &mut self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CanonicalMatch>, FetchError> {
        self.ensure_credentials()?;
        let endpoint = format!("/teams/{}/matches", self.team_id);
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        let root = self
            .fetcher
            .fetch_json(&endpoint, &[("dateFrom", from.as_str()), ("dateTo", to.as_str())])?;
        Ok(matches_from_value(&root))
    }
}

impl<T: Transport> SourceAdapter for FootballDataAdapter<T> {
    fn provider(&self) -> Provider {
        Provider::FootballData
    }

    fn tracked_team_id(&self) -> Option<&str> {
        Some(self.team_id.as_str())
    }

    fn fetch_recent_matches(&mut self, limit: usize) -> Result<Vec<CanonicalMatch>, FetchError> {
        let mut matches = match self.recent_window {
            Some(window) => {
                let (from, to) = window.bounds();
                self.fetch_matches_between(from, to)?
            }
            None => self.team_matches("FINISHED", limit)?,
        };
        matches.sort_by(|a, b| b.date.cmp(&a.date));
        matches.truncate(limit);
        Ok(matches)
    }

    fn fetch_upcoming_matches(&mut self, limit: usize) -> Result<Vec<CanonicalMatch>, FetchError> {
        let mut matches = self.team_matches("SCHEDULED", limit)?;
        matches.sort_by(|a, b| a.date.cmp(&b.date));
        matches.truncate(limit);
        Ok(matches)
    }

    fn fetch_squad(&mut self) -> Result<Vec<CanonicalPlayer>, FetchError> {
        let root = self.team_payload()?;
        Ok(squad_from_value(&root))
    }

    fn fetch_team_info(&mut self) -> Result<Option<CanonicalTeam>, FetchError> {
        let root = self.team_payload()?;
        Ok(team_from_value(&root))
    }
}
