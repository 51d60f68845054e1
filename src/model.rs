//! Canonical, provider-agnostic record shapes.
//!
//! Adapters produce these values; the store consumes them. Nothing here knows
//! about a provider's field vocabulary.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};

use crate::status::MatchStatus;

/// Upstream provider that supplied a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    FootballData,
    SportsDb,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::FootballData, Provider::SportsDb];

    pub fn key(self) -> &'static str {
        match self {
            Provider::FootballData => "football_data",
            Provider::SportsDb => "thesportsdb",
        }
    }

    /// Column holding this provider's identifier on every table that tracks one.
    pub fn id_column(self) -> &'static str {
        match self {
            Provider::FootballData => "api_id_football_data",
            Provider::SportsDb => "api_id_thesportsdb",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Provider::FootballData => "football-data.org",
            Provider::SportsDb => "thesportsdb",
        };
        f.write_str(label)
    }
}

/// A field of a partial record.
///
/// `Omit` leaves whatever the store already holds, `Clear` writes NULL and
/// `Set` writes the value. Adapters only ever emit `Omit` or `Set`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Omit,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Patch::Set(v),
            None => Patch::Omit,
        }
    }

    pub fn is_supplied(&self) -> bool {
        !matches!(self, Patch::Omit)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Patch::Set(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        Patch::from_option(value)
    }
}

/// A home/away pair that only exists when both sides are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn from_sides(home: Option<u32>, away: Option<u32>) -> Option<Score> {
        match (home, away) {
            (Some(home), Some(away)) => Some(Score { home, away }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRef {
    pub name: String,
    pub provider_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitionRef {
    pub name: String,
    pub provider_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeasonInfo {
    /// Canonical label; empty when the provider gave nothing usable.
    pub label: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Per-side match statistics. Every field is optional; a provider rarely
/// supplies all of them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SideStats {
    pub possession: Option<f64>,
    pub shots: Option<u32>,
    pub shots_on_target: Option<u32>,
    pub corners: Option<u32>,
    pub fouls: Option<u32>,
    pub offsides: Option<u32>,
    pub passes: Option<u32>,
    pub pass_accuracy: Option<f64>,
    pub yellow_cards: Option<u32>,
    pub red_cards: Option<u32>,
}

impl SideStats {
    pub fn is_empty(&self) -> bool {
        self.possession.is_none()
            && self.shots.is_none()
            && self.shots_on_target.is_none()
            && self.corners.is_none()
            && self.fouls.is_none()
            && self.offsides.is_none()
            && self.passes.is_none()
            && self.pass_accuracy.is_none()
            && self.yellow_cards.is_none()
            && self.red_cards.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MatchStatistics {
    pub home: SideStats,
    pub away: SideStats,
}

impl MatchStatistics {
    pub fn is_empty(&self) -> bool {
        self.home.is_empty() && self.away.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalMatch {
    pub provider: Provider,
    pub provider_id: String,
    pub date: NaiveDate,
    pub kickoff: Patch<NaiveTime>,
    pub home: TeamRef,
    pub away: TeamRef,
    pub competition: CompetitionRef,
    pub season: SeasonInfo,
    pub status: MatchStatus,
    pub score: Patch<Score>,
    pub half_time: Patch<Score>,
    pub venue: Patch<String>,
    pub attendance: Patch<u32>,
    pub referee: Patch<String>,
    pub round: Patch<String>,
    pub stats: Option<MatchStatistics>,
}

impl CanonicalMatch {
    pub fn has_statistics(&self) -> bool {
        self.stats.as_ref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPlayer {
    pub provider: Provider,
    pub provider_id: Option<String>,
    pub name: String,
    pub date_of_birth: Patch<NaiveDate>,
    pub nationality: Patch<String>,
    pub position: Patch<String>,
    pub squad_number: Patch<u32>,
    pub joined: Patch<NaiveDate>,
    pub left: Patch<NaiveDate>,
}

impl CanonicalPlayer {
    pub fn named(provider: Provider, name: impl Into<String>) -> Self {
        Self {
            provider,
            provider_id: None,
            name: name.into(),
            date_of_birth: Patch::Omit,
            nationality: Patch::Omit,
            position: Patch::Omit,
            squad_number: Patch::Omit,
            joined: Patch::Omit,
            left: Patch::Omit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTeam {
    pub provider: Provider,
    pub provider_id: Option<String>,
    pub name: String,
    pub short_name: Patch<String>,
    pub stadium: Patch<String>,
    pub city: Patch<String>,
    pub country: Patch<String>,
    pub founded_year: Patch<u32>,
    pub website: Patch<String>,
    pub colors: Patch<String>,
}

impl CanonicalTeam {
    /// A bare reference: only the name and, when known, the provider id.
    pub fn from_ref(provider: Provider, team: &TeamRef) -> Self {
        Self {
            provider,
            provider_id: team.provider_id.clone(),
            name: team.name.clone(),
            short_name: Patch::Omit,
            stadium: Patch::Omit,
            city: Patch::Omit,
            country: Patch::Omit,
            founded_year: Patch::Omit,
            website: Patch::Omit,
            colors: Patch::Omit,
        }
    }
}

/// A scored goal. Goals are appended, never reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalRecord {
    pub match_id: i64,
    pub scorer_id: i64,
    pub team_id: i64,
    pub minute: Option<u32>,
    pub goal_type: String,
    pub is_penalty: bool,
    pub is_own_goal: bool,
    pub assist_id: Option<i64>,
}

impl GoalRecord {
    pub const DEFAULT_TYPE: &'static str = "Open Play";
}
