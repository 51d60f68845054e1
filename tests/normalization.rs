use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};

use club_ledger::football_data::{parse_matches_json, parse_squad_json, parse_team_json};
use club_ledger::model::{Patch, Provider, Score};
use club_ledger::sportsdb::{parse_events_json, parse_players_json, parse_team_search_json};
use club_ledger::status::MatchStatus;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn football_data_matches_fixture() {
    let raw = read_fixture("football_data_matches.json");
    let matches = parse_matches_json(&raw).expect("fixture should parse");
    // The third match has no away team name and is dropped.
    assert_eq!(matches.len(), 2);

    let opener = &matches[0];
    assert_eq!(opener.provider, Provider::FootballData);
    assert_eq!(opener.provider_id, "497401");
    assert_eq!(opener.date, date(2024, 8, 17));
    assert_eq!(
        opener.kickoff,
        Patch::Set(NaiveTime::from_hms_opt(11, 30, 0).expect("valid time"))
    );
    assert_eq!(opener.home.name, "Ipswich Town FC");
    assert_eq!(opener.home.provider_id.as_deref(), Some("349"));
    assert_eq!(opener.away.name, "Liverpool FC");
    assert_eq!(opener.competition.name, "Premier League");
    assert_eq!(opener.competition.provider_id.as_deref(), Some("PL"));
    assert_eq!(opener.season.label, "2024/25");
    assert_eq!(opener.status, MatchStatus::Finished);
    assert_eq!(opener.score, Patch::Set(Score { home: 0, away: 2 }));
    assert_eq!(opener.half_time, Patch::Set(Score { home: 0, away: 0 }));
    assert_eq!(opener.venue, Patch::Set("Portman Road".to_string()));
    assert_eq!(opener.attendance, Patch::Set(29645));
    assert_eq!(opener.referee, Patch::Set("Tim Robinson Sr".to_string()));
    assert_eq!(opener.round, Patch::Set("1".to_string()));
    assert!(!opener.has_statistics());
}

#[test]
fn football_data_unplayed_match_has_no_score() {
    let raw = read_fixture("football_data_matches.json");
    let matches = parse_matches_json(&raw).expect("fixture should parse");
    let derby = &matches[1];
    assert_eq!(derby.status, MatchStatus::Scheduled);
    assert_eq!(derby.score, Patch::Omit);
    assert_eq!(derby.half_time, Patch::Omit);
    assert_eq!(derby.referee, Patch::Omit);
    assert_eq!(derby.competition.provider_id.as_deref(), Some("ELC"));
}

#[test]
fn football_data_team_and_squad() {
    let raw = read_fixture("football_data_team.json");
    let team = parse_team_json(&raw)
        .expect("fixture should parse")
        .expect("team present");
    assert_eq!(team.name, "Ipswich Town FC");
    assert_eq!(team.provider_id.as_deref(), Some("349"));
    assert_eq!(team.stadium, Patch::Set("Portman Road".to_string()));
    assert_eq!(team.founded_year, Patch::Set(1878));
    assert_eq!(team.colors, Patch::Set("Blue / White".to_string()));
    assert_eq!(team.country, Patch::Set("England".to_string()));
    assert_eq!(team.city, Patch::Omit);

    let squad = parse_squad_json(&raw).expect("fixture should parse");
    assert_eq!(squad.len(), 2);
    assert_eq!(squad[0].name, "Leif Davis");
    assert_eq!(squad[0].squad_number, Patch::Set(3));
    assert_eq!(squad[0].date_of_birth, Patch::Set(date(1999, 12, 31)));
    assert_eq!(squad[1].squad_number, Patch::Omit);
}

#[test]
fn football_data_null_is_empty() {
    assert!(parse_matches_json("null").expect("null should parse").is_empty());
    assert!(parse_team_json("").expect("empty should parse").is_none());
    assert!(parse_matches_json("{\"matches\": null}")
        .expect("null list should parse")
        .is_empty());
}

#[test]
fn sportsdb_recent_events_fixture() {
    let raw = read_fixture("sportsdb_events_last.json");
    let events = parse_events_json(&raw, "results", date(2025, 10, 1)).expect("fixture should parse");
    // The third event has no home team and is dropped.
    assert_eq!(events.len(), 2);

    let opener = &events[0];
    assert_eq!(opener.provider, Provider::SportsDb);
    assert_eq!(opener.provider_id, "2071234");
    assert_eq!(opener.date, date(2024, 8, 17));
    assert_eq!(opener.home.name, "Ipswich");
    assert_eq!(opener.competition.provider_id.as_deref(), Some("4328"));
    assert_eq!(opener.season.label, "2024/25");
    assert_eq!(opener.status, MatchStatus::Finished);
    assert_eq!(opener.score, Patch::Set(Score { home: 0, away: 2 }));
    assert_eq!(opener.attendance, Patch::Set(29645));
    assert_eq!(opener.referee, Patch::Omit);

    let stats = opener.stats.expect("shots and cards supplied");
    assert_eq!(stats.home.shots, Some(7));
    assert_eq!(stats.away.shots, Some(18));
    assert_eq!(stats.home.yellow_cards, Some(2));
    assert_eq!(stats.away.yellow_cards, Some(1));
    assert_eq!(stats.home.possession, None);
}

#[test]
fn sportsdb_past_event_without_score_is_finished() {
    let raw = read_fixture("sportsdb_events_last.json");
    let events = parse_events_json(&raw, "results", date(2025, 10, 1)).expect("fixture should parse");
    let late = &events[1];
    assert_eq!(late.status, MatchStatus::Finished);
    assert_eq!(late.score, Patch::Omit);
    assert_eq!(late.season.label, "2023/24");
    assert_eq!(
        late.kickoff,
        Patch::Set(NaiveTime::from_hms_opt(12, 30, 0).expect("valid time"))
    );
    assert!(late.stats.is_none());
}

#[test]
fn sportsdb_upcoming_event_is_scheduled() {
    let raw = read_fixture("sportsdb_events_next.json");
    let events = parse_events_json(&raw, "events", date(2025, 10, 1)).expect("fixture should parse");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, MatchStatus::Scheduled);
    assert_eq!(events[0].competition.provider_id.as_deref(), Some("4330"));
    assert_eq!(events[0].season.label, "2025/26");

    // Read on the day after kickoff, the same unscored event counts as played.
    let later = parse_events_json(&raw, "events", date(2025, 10, 27)).expect("fixture should parse");
    assert_eq!(later[0].status, MatchStatus::Finished);
}

#[test]
fn sportsdb_players_fixture() {
    let raw = read_fixture("sportsdb_players.json");
    let players = parse_players_json(&raw).expect("fixture should parse");
    assert_eq!(players.len(), 2);
    assert_eq!(players[0].provider_id.as_deref(), Some("34161542"));
    assert_eq!(players[0].squad_number, Patch::Set(3));
    assert_eq!(players[0].joined, Patch::Set(date(2022, 7, 1)));
    assert_eq!(players[1].name, "Christian Walton");
    assert_eq!(players[1].date_of_birth, Patch::Omit);
    assert_eq!(players[1].squad_number, Patch::Omit);
}

#[test]
fn sportsdb_team_search_prefers_configured_id() {
    let raw = read_fixture("sportsdb_team_search.json");
    let team = parse_team_search_json(&raw, "133884")
        .expect("fixture should parse")
        .expect("team present");
    assert_eq!(team.name, "Ipswich");
    assert_eq!(team.founded_year, Patch::Set(1878));
    assert_eq!(team.colors, Patch::Set("#0000FF / #FFFFFF".to_string()));
    assert_eq!(team.city, Patch::Set("Ipswich, Suffolk".to_string()));

    let fallback = parse_team_search_json(&raw, "1")
        .expect("fixture should parse")
        .expect("first hit used");
    assert_eq!(fallback.name, "Ipswich Town Women");
}

#[test]
fn sportsdb_null_lists_are_empty() {
    let events = parse_events_json("{\"results\": null}", "results", date(2025, 1, 1))
        .expect("null list should parse");
    assert!(events.is_empty());
    assert!(parse_team_search_json("{\"teams\": null}", "133884")
        .expect("null list should parse")
        .is_none());
}
