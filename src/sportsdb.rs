//! TheSportsDB (v1 JSON): flat event records with `str`/`int` prefixed fields,
//! numbers frequently sent as strings and no match state.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::Value;

use crate::adapter::{
    SourceAdapter, array_at, lenient, non_empty, normalize_batch, parse_date, parse_date_opt,
    parse_f64, parse_time, parse_u32,
};
use crate::config::ProviderConfig;
use crate::error::{FetchError, NormalizeError};
use crate::fetcher::{RateLimitPolicy, RateLimitedFetcher, Transport};
use crate::http_client::HttpTransport;
use crate::model::{
    CanonicalMatch, CanonicalPlayer, CanonicalTeam, CompetitionRef, MatchStatistics, Patch,
    Provider, Score, SeasonInfo, SideStats, TeamRef,
};
use crate::season::label_from_season_field;
use crate::status::infer_sportsdb_status;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(deserialize_with = "lenient::string")]
    pub id_event: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub date_event: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_time: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_timestamp: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_home_team: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_away_team: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub id_home_team: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub id_away_team: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub int_home_score: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub int_away_score: Option<String>,
    #[serde(rename = "intHomeScoreHT", deserialize_with = "lenient::string")]
    pub int_home_score_ht: Option<String>,
    #[serde(rename = "intAwayScoreHT", deserialize_with = "lenient::string")]
    pub int_away_score_ht: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_league: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub id_league: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_season: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_venue: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub int_round: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_referee: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub int_spectators: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub int_home_shots: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub int_away_shots: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub int_home_possession: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub int_away_possession: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub int_home_yellow_cards: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub int_away_yellow_cards: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub int_home_red_cards: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub int_away_red_cards: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPlayer {
    #[serde(deserialize_with = "lenient::string")]
    pub id_player: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_player: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_position: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_nationality: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub date_born: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_number: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub date_signed: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTeam {
    #[serde(deserialize_with = "lenient::string")]
    pub id_team: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_team: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_team_short: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_stadium: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_location: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_country: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub int_formed_year: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_website: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_colour1: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub str_colour2: Option<String>,
}

/// `today` drives status inference for events that carry no score.
pub fn normalize_event(raw: &RawEvent, today: NaiveDate) -> Result<CanonicalMatch, NormalizeError> {
    let id = non_empty(raw.id_event.as_deref()).ok_or(NormalizeError::MissingField("idEvent"))?;
    let date_raw = raw
        .date_event
        .as_deref()
        .or(raw.str_timestamp.as_deref())
        .ok_or(NormalizeError::MissingField("dateEvent"))?;
    let date = parse_date("dateEvent", date_raw)?;
    let kickoff = raw.str_time.as_deref().and_then(parse_time).or_else(|| {
        raw.str_timestamp
            .as_deref()
            .and_then(|ts| ts.split_once('T'))
            .and_then(|(_, clock)| parse_time(clock))
    });

    let home = TeamRef {
        name: non_empty(raw.str_home_team.as_deref())
            .ok_or(NormalizeError::MissingField("strHomeTeam"))?,
        provider_id: non_empty(raw.id_home_team.as_deref()),
    };
    let away = TeamRef {
        name: non_empty(raw.str_away_team.as_deref())
            .ok_or(NormalizeError::MissingField("strAwayTeam"))?,
        provider_id: non_empty(raw.id_away_team.as_deref()),
    };
    let competition = CompetitionRef {
        name: non_empty(raw.str_league.as_deref())
            .ok_or(NormalizeError::MissingField("strLeague"))?,
        provider_id: non_empty(raw.id_league.as_deref()),
    };

    let home_score = parse_u32(raw.int_home_score.as_deref());
    let away_score = parse_u32(raw.int_away_score.as_deref());
    let half_time = Score::from_sides(
        parse_u32(raw.int_home_score_ht.as_deref()),
        parse_u32(raw.int_away_score_ht.as_deref()),
    );

    let stats = MatchStatistics {
        home: SideStats {
            possession: parse_f64(raw.int_home_possession.as_deref()),
            shots: parse_u32(raw.int_home_shots.as_deref()),
            yellow_cards: parse_u32(raw.int_home_yellow_cards.as_deref()),
            red_cards: parse_u32(raw.int_home_red_cards.as_deref()),
            ..SideStats::default()
        },
        away: SideStats {
            possession: parse_f64(raw.int_away_possession.as_deref()),
            shots: parse_u32(raw.int_away_shots.as_deref()),
            yellow_cards: parse_u32(raw.int_away_yellow_cards.as_deref()),
            red_cards: parse_u32(raw.int_away_red_cards.as_deref()),
            ..SideStats::default()
        },
    };

    Ok(CanonicalMatch {
        provider: Provider::SportsDb,
        provider_id: id,
        date,
        kickoff: Patch::from_option(kickoff),
        home,
        away,
        competition,
        season: SeasonInfo {
            label: label_from_season_field(raw.str_season.as_deref().unwrap_or_default()),
            start: None,
            end: None,
        },
        status: infer_sportsdb_status(home_score, away_score, Some(date), today),
        score: Patch::from_option(Score::from_sides(home_score, away_score)),
        half_time: Patch::from_option(half_time),
        venue: Patch::from_option(non_empty(raw.str_venue.as_deref())),
        attendance: Patch::from_option(parse_u32(raw.int_spectators.as_deref())),
        referee: Patch::from_option(non_empty(raw.str_referee.as_deref())),
        round: Patch::from_option(non_empty(raw.int_round.as_deref())),
        stats: (!stats.is_empty()).then_some(stats),
    })
}

pub fn normalize_player(raw: &RawPlayer) -> Result<CanonicalPlayer, NormalizeError> {
    let name = non_empty(raw.str_player.as_deref()).ok_or(NormalizeError::MissingField("strPlayer"))?;
    Ok(CanonicalPlayer {
        provider_id: non_empty(raw.id_player.as_deref()),
        date_of_birth: Patch::from_option(parse_date_opt(raw.date_born.as_deref())),
        nationality: Patch::from_option(non_empty(raw.str_nationality.as_deref())),
        position: Patch::from_option(non_empty(raw.str_position.as_deref())),
        squad_number: Patch::from_option(parse_u32(raw.str_number.as_deref())),
        joined: Patch::from_option(parse_date_opt(raw.date_signed.as_deref())),
        ..CanonicalPlayer::named(Provider::SportsDb, name)
    })
}

pub fn normalize_team(raw: &RawTeam) -> Result<CanonicalTeam, NormalizeError> {
    let name = non_empty(raw.str_team.as_deref()).ok_or(NormalizeError::MissingField("strTeam"))?;
    let colors = match (
        non_empty(raw.str_colour1.as_deref()),
        non_empty(raw.str_colour2.as_deref()),
    ) {
        (Some(a), Some(b)) => Some(format!("{a} / {b}")),
        (a, b) => a.or(b),
    };
    Ok(CanonicalTeam {
        provider: Provider::SportsDb,
        provider_id: non_empty(raw.id_team.as_deref()),
        name,
        short_name: Patch::from_option(non_empty(raw.str_team_short.as_deref())),
        stadium: Patch::from_option(non_empty(raw.str_stadium.as_deref())),
        city: Patch::from_option(non_empty(raw.str_location.as_deref())),
        country: Patch::from_option(non_empty(raw.str_country.as_deref())),
        founded_year: Patch::from_option(parse_u32(raw.int_formed_year.as_deref())),
        website: Patch::from_option(non_empty(raw.str_website.as_deref())),
        colors: Patch::from_option(colors),
    })
}

/// Events under `key` (`results` for past events, `events` for upcoming).
pub fn parse_events_json(raw: &str, key: &str, today: NaiveDate) -> Result<Vec<CanonicalMatch>> {
    let root = parse_root(raw).context("invalid thesportsdb events json")?;
    Ok(events_from_value(&root, key, today))
}

pub fn parse_players_json(raw: &str) -> Result<Vec<CanonicalPlayer>> {
    let root = parse_root(raw).context("invalid thesportsdb players json")?;
    Ok(players_from_value(&root))
}

/// The team whose id equals `team_id`, else the first search hit.
pub fn parse_team_search_json(raw: &str, team_id: &str) -> Result<Option<CanonicalTeam>> {
    let root = parse_root(raw).context("invalid thesportsdb team json")?;
    Ok(team_from_value(&root, team_id))
}

fn parse_root(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(trimmed)?)
}

fn events_from_value(root: &Value, key: &str, today: NaiveDate) -> Vec<CanonicalMatch> {
    normalize_batch(Provider::SportsDb, "match", array_at(root, key), |raw: &RawEvent| {
        normalize_event(raw, today)
    })
}

fn players_from_value(root: &Value) -> Vec<CanonicalPlayer> {
    normalize_batch(
        Provider::SportsDb,
        "player",
        array_at(root, "player"),
        normalize_player,
    )
}

fn team_from_value(root: &Value, team_id: &str) -> Option<CanonicalTeam> {
    let teams = normalize_batch(
        Provider::SportsDb,
        "team",
        array_at(root, "teams"),
        normalize_team,
    );
    let preferred = teams
        .iter()
        .position(|t| t.provider_id.as_deref() == Some(team_id))
        .unwrap_or(0);
    teams.into_iter().nth(preferred)
}

pub struct SportsDbAdapter<T> {
    fetcher: RateLimitedFetcher<T>,
    team_id: String,
    team_name: String,
    today: Option<NaiveDate>,
}

impl SportsDbAdapter<HttpTransport> {
    pub fn from_config(cfg: &ProviderConfig, team_name: &str) -> Result<Self> {
        let transport = HttpTransport::new(cfg.timeout, cfg.user_agent.clone())?;
        Ok(Self::new(cfg, team_name, transport))
    }
}

impl<T: Transport> SportsDbAdapter<T> {
    /// The API key is a path segment, so it lives in the fetcher's base URL.
    pub fn new(cfg: &ProviderConfig, team_name: &str, transport: T) -> Self {
        let key = cfg.api_key.as_deref().unwrap_or("3");
        let base_url = format!("{}/{}", cfg.base_url.trim_end_matches('/'), key);
        Self {
            fetcher: RateLimitedFetcher::new(
                Provider::SportsDb,
                base_url,
                transport,
                RateLimitPolicy::from(cfg),
            ),
            team_id: cfg.team_id.clone(),
            team_name: team_name.to_string(),
            today: None,
        }
    }

    /// Pins the date used for status inference.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn team_events(&mut self, endpoint: &str, key: &str, limit: usize) -> Result<Vec<CanonicalMatch>, FetchError> {
        let team_id = self.team_id.clone();
        let root = self.fetcher.fetch_json(endpoint, &[("id", team_id.as_str())])?;
        let mut events = events_from_value(&root, key, self.today());
        events.truncate(limit);
        Ok(events)
    }
}

impl<T: Transport> SourceAdapter for SportsDbAdapter<T> {
    fn provider(&self) -> Provider {
        Provider::SportsDb
    }

    fn tracked_team_id(&self) -> Option<&str> {
        Some(self.team_id.as_str())
    }

    fn fetch_recent_matches(&mut self, limit: usize) -> Result<Vec<CanonicalMatch>, FetchError> {
        self.team_events("/eventslast.php", "results", limit)
    }

    fn fetch_upcoming_matches(&mut self, limit: usize) -> Result<Vec<CanonicalMatch>, FetchError> {
        self.team_events("/eventsnext.php", "events", limit)
    }

    fn fetch_squad(&mut self) -> Result<Vec<CanonicalPlayer>, FetchError> {
        let team_id = self.team_id.clone();
        let root = self
            .fetcher
            .fetch_json("/lookup_all_players.php", &[("id", team_id.as_str())])?;
        Ok(players_from_value(&root))
    }

    fn fetch_team_info(&mut self) -> Result<Option<CanonicalTeam>, FetchError> {
        let team_name = self.team_name.clone();
        let root = self
            .fetcher
            .fetch_json("/searchteams.php", &[("t", team_name.as_str())])?;
        Ok(team_from_value(&root, &self.team_id))
    }
}
