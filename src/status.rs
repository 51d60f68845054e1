use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchStatus {
    #[default]
    Scheduled,
    Live,
    Finished,
    Postponed,
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
            MatchStatus::Postponed => "postponed",
            MatchStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "live" => Ok(MatchStatus::Live),
            "finished" => Ok(MatchStatus::Finished),
            "postponed" => Ok(MatchStatus::Postponed),
            "cancelled" => Ok(MatchStatus::Cancelled),
            other => Err(anyhow::anyhow!("unknown match status {other:?}")),
        }
    }
}

/// football-data.org match states. Anything unrecognized stays `Scheduled`
/// so the next pass looks at it again.
pub fn map_football_data_status(raw: &str) -> MatchStatus {
    match raw.trim().to_ascii_uppercase().as_str() {
        "SCHEDULED" | "TIMED" => MatchStatus::Scheduled,
        "IN_PLAY" | "PAUSED" | "LIVE" => MatchStatus::Live,
        "FINISHED" | "AWARDED" => MatchStatus::Finished,
        "POSTPONED" | "SUSPENDED" => MatchStatus::Postponed,
        "CANCELLED" => MatchStatus::Cancelled,
        _ => MatchStatus::Scheduled,
    }
}

/// TheSportsDB has no state field on its team event lists.
///
/// Both scores present means the match is over; a date strictly before
/// `today` also counts as finished; everything else is scheduled.
pub fn infer_sportsdb_status(
    home_score: Option<u32>,
    away_score: Option<u32>,
    date: Option<NaiveDate>,
    today: NaiveDate,
) -> MatchStatus {
    if home_score.is_some() && away_score.is_some() {
        return MatchStatus::Finished;
    }
    match date {
        Some(date) if date < today => MatchStatus::Finished,
        _ => MatchStatus::Scheduled,
    }
}
