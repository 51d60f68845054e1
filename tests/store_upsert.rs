use chrono::{NaiveDate, NaiveTime};
use rusqlite::params;

use club_ledger::model::{
    CanonicalMatch, CanonicalPlayer, CanonicalTeam, CompetitionRef, GoalRecord, MatchStatistics,
    Patch, Provider, Score, SeasonInfo, SideStats, TeamRef,
};
use club_ledger::status::MatchStatus;
use club_ledger::store::Store;
use club_ledger::upsert::{MatchUpsert, SkipReason, Upserted};

const CLUB: &str = "Ipswich Town";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn store() -> Store {
    Store::open_in_memory(CLUB).expect("in-memory store")
}

fn team(name: &str, id: &str) -> TeamRef {
    TeamRef {
        name: name.to_string(),
        provider_id: Some(id.to_string()),
    }
}

fn fixture(provider: Provider, id: &str) -> CanonicalMatch {
    CanonicalMatch {
        provider,
        provider_id: id.to_string(),
        date: date(2024, 8, 17),
        kickoff: Patch::Set(NaiveTime::from_hms_opt(11, 30, 0).expect("valid time")),
        home: team(CLUB, "349"),
        away: team("Liverpool", "64"),
        competition: CompetitionRef {
            name: "Premier League".to_string(),
            provider_id: None,
        },
        season: SeasonInfo {
            label: "2024/25".to_string(),
            start: Some(date(2024, 8, 16)),
            end: Some(date(2025, 5, 25)),
        },
        status: MatchStatus::Scheduled,
        score: Patch::Omit,
        half_time: Patch::Omit,
        venue: Patch::Set("Portman Road".to_string()),
        attendance: Patch::Omit,
        referee: Patch::Omit,
        round: Patch::Set("1".to_string()),
        stats: None,
    }
}

fn count(store: &Store, table: &str) -> i64 {
    store
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("count query")
}

type MatchRow = (
    String,
    Option<i64>,
    Option<i64>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn match_row(store: &Store, id: i64) -> MatchRow {
    store
        .connection()
        .query_row(
            "SELECT match_status, home_score, away_score, venue, referee,
                    api_id_football_data, api_id_thesportsdb
             FROM matches WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            },
        )
        .expect("match row")
}

#[test]
fn schema_seeds_competitions_once() {
    let store = store();
    assert_eq!(count(&store, "competitions"), 4);
    store.ping().expect("ping");
}

#[test]
fn reapplying_a_match_is_idempotent() {
    let mut store = store();
    let record = fixture(Provider::FootballData, "497401");

    let first = store.upsert_match(&record, "2024/25").expect("first upsert");
    let MatchUpsert::Created(id) = first else {
        panic!("expected create, got {first:?}");
    };
    let second = store.upsert_match(&record, "2024/25").expect("second upsert");
    assert_eq!(second, MatchUpsert::Updated(id));

    assert_eq!(count(&store, "matches"), 1);
    assert_eq!(count(&store, "teams"), 2);
    assert_eq!(count(&store, "seasons"), 1);
    let (status, home, away, venue, _, fd_id, _) = match_row(&store, id);
    assert_eq!(status, "scheduled");
    assert_eq!((home, away), (None, None));
    assert_eq!(venue.as_deref(), Some("Portman Road"));
    assert_eq!(fd_id.as_deref(), Some("497401"));
}

#[test]
fn partial_update_keeps_omitted_fields() {
    let mut store = store();
    let mut record = fixture(Provider::FootballData, "497401");
    record.referee = Patch::Set("Tim Robinson".to_string());
    let id = store
        .upsert_match(&record, "2024/25")
        .expect("create")
        .match_id()
        .expect("written");

    let mut result = fixture(Provider::FootballData, "497401");
    result.venue = Patch::Omit;
    result.status = MatchStatus::Finished;
    result.score = Patch::Set(Score { home: 0, away: 2 });
    store.upsert_match(&result, "2024/25").expect("update");

    let (status, home, away, venue, referee, _, _) = match_row(&store, id);
    assert_eq!(status, "finished");
    assert_eq!((home, away), (Some(0), Some(2)));
    assert_eq!(venue.as_deref(), Some("Portman Road"));
    assert_eq!(referee.as_deref(), Some("Tim Robinson"));
}

#[test]
fn explicit_clear_overwrites_stored_value() {
    let mut store = store();
    let mut record = fixture(Provider::FootballData, "497401");
    record.status = MatchStatus::Finished;
    record.score = Patch::Set(Score { home: 1, away: 1 });
    let id = store
        .upsert_match(&record, "2024/25")
        .expect("create")
        .match_id()
        .expect("written");

    let mut voided = fixture(Provider::FootballData, "497401");
    voided.status = MatchStatus::Postponed;
    voided.score = Patch::Clear;
    voided.venue = Patch::Clear;
    store.upsert_match(&voided, "2024/25").expect("update");

    let (status, home, away, venue, _, _, _) = match_row(&store, id);
    assert_eq!(status, "postponed");
    assert_eq!((home, away), (None, None));
    assert_eq!(venue, None);
}

#[test]
fn half_set_score_is_rejected_by_schema() {
    let mut store = store();
    let id = store
        .upsert_match(&fixture(Provider::FootballData, "1"), "2024/25")
        .expect("create")
        .match_id()
        .expect("written");
    let err = store
        .connection()
        .execute(
            "UPDATE matches SET home_score = 3 WHERE id = ?1",
            params![id],
        )
        .expect_err("score pair constraint");
    assert!(err.to_string().contains("CHECK"), "unexpected error: {err}");
}

#[test]
fn providers_meet_on_the_fallback_key() {
    let mut store = store();
    let from_fd = fixture(Provider::FootballData, "497401");
    let mut from_sdb = fixture(Provider::SportsDb, "2071234");
    from_sdb.status = MatchStatus::Finished;
    from_sdb.score = Patch::Set(Score { home: 0, away: 2 });
    from_sdb.referee = Patch::Set("Tim Robinson".to_string());

    let a = store.upsert_match(&from_fd, "2024/25").expect("football-data upsert");
    let b = store.upsert_match(&from_sdb, "2024/25").expect("thesportsdb upsert");
    let id = a.match_id().expect("written");
    assert_eq!(b, MatchUpsert::Updated(id));
    assert_eq!(count(&store, "matches"), 1);

    let (status, home, away, _, referee, fd_id, sdb_id) = match_row(&store, id);
    assert_eq!(status, "finished");
    assert_eq!((home, away), (Some(0), Some(2)));
    assert_eq!(referee.as_deref(), Some("Tim Robinson"));
    assert_eq!(fd_id.as_deref(), Some("497401"));
    assert_eq!(sdb_id.as_deref(), Some("2071234"));

    // Later sightings resolve straight through either provider id.
    let again = store.upsert_match(&from_sdb, "2024/25").expect("repeat");
    assert_eq!(again, MatchUpsert::Updated(id));
}

#[test]
fn unknown_competition_is_skipped_without_writes() {
    let mut store = store();
    let mut record = fixture(Provider::FootballData, "77");
    record.competition = CompetitionRef {
        name: "Pre-season Friendly".to_string(),
        provider_id: Some("CLI".to_string()),
    };

    let out = store.upsert_match(&record, "2024/25").expect("upsert");
    assert_eq!(
        out,
        MatchUpsert::Skipped(SkipReason::UnknownCompetition(
            "Pre-season Friendly".to_string()
        ))
    );
    assert_eq!(count(&store, "matches"), 0);
    assert_eq!(count(&store, "teams"), 0);
    assert_eq!(count(&store, "seasons"), 0);
    assert_eq!(count(&store, "competitions"), 4);
}

#[test]
fn competition_resolves_through_provider_id() {
    let mut store = store();
    let mut record = fixture(Provider::SportsDb, "2071300");
    record.competition = CompetitionRef {
        name: "English League Championship".to_string(),
        provider_id: Some("4330".to_string()),
    };
    let id = store
        .upsert_match(&record, "2024/25")
        .expect("upsert")
        .match_id()
        .expect("resolved by provider id");
    let competition: String = store
        .connection()
        .query_row(
            "SELECT c.name FROM matches m JOIN competitions c ON c.id = m.competition_id WHERE m.id = ?1",
            params![id],
            |row| row.get(0),
        )
        .expect("competition name");
    assert_eq!(competition, "Championship");
}

#[test]
fn empty_season_label_uses_fallback_with_default_dates() {
    let mut store = store();
    let mut record = fixture(Provider::SportsDb, "5");
    record.season = SeasonInfo::default();
    store.upsert_match(&record, "2025/26").expect("upsert");

    let (start, end): (String, String) = store
        .connection()
        .query_row(
            "SELECT start_date, end_date FROM seasons WHERE season_name = '2025/26'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("fallback season row");
    assert_eq!(start, "2025-08-01");
    assert_eq!(end, "2026-05-31");

    let mut orphan = fixture(Provider::SportsDb, "6");
    orphan.season = SeasonInfo::default();
    let out = store.upsert_match(&orphan, "").expect("upsert");
    assert_eq!(out, MatchUpsert::Skipped(SkipReason::MissingSeason));
}

#[test]
fn statistics_are_replaced_wholesale() {
    let mut store = store();
    let id = store
        .upsert_match(&fixture(Provider::SportsDb, "9"), "2024/25")
        .expect("create")
        .match_id()
        .expect("written");

    let first = MatchStatistics {
        home: SideStats {
            possession: Some(38.0),
            shots: Some(7),
            ..SideStats::default()
        },
        away: SideStats {
            possession: Some(62.0),
            shots: Some(18),
            ..SideStats::default()
        },
    };
    store.replace_match_statistics(id, &first).expect("first write");

    let second = MatchStatistics {
        home: SideStats {
            yellow_cards: Some(2),
            ..SideStats::default()
        },
        away: SideStats::default(),
    };
    store.replace_match_statistics(id, &second).expect("second write");

    assert_eq!(count(&store, "match_statistics"), 1);
    let (possession, shots, yellow): (Option<f64>, Option<i64>, Option<i64>) = store
        .connection()
        .query_row(
            "SELECT home_possession, home_shots, home_yellow_cards FROM match_statistics WHERE match_id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("statistics row");
    assert_eq!(possession, None);
    assert_eq!(shots, None);
    assert_eq!(yellow, Some(2));
}

#[test]
fn team_details_enrich_existing_row() {
    let mut store = store();
    store
        .upsert_match(&fixture(Provider::FootballData, "1"), "2024/25")
        .expect("match creates bare team");

    let mut details = CanonicalTeam::from_ref(Provider::SportsDb, &team(CLUB, "133884"));
    details.stadium = Patch::Set("Portman Road".to_string());
    details.founded_year = Patch::Set(1878);
    let out = store.upsert_team(&details).expect("enrich");
    assert!(matches!(out, Upserted::Updated(_)));

    let mut website_only = CanonicalTeam::from_ref(Provider::FootballData, &team(CLUB, "349"));
    website_only.website = Patch::Set("http://www.itfc.co.uk".to_string());
    store.upsert_team(&website_only).expect("enrich again");

    let row: (Option<String>, Option<i64>, Option<String>, Option<String>, Option<String>) = store
        .connection()
        .query_row(
            "SELECT stadium, founded_year, website, api_id_football_data, api_id_thesportsdb
             FROM teams WHERE team_name = ?1",
            params![CLUB],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .expect("team row");
    assert_eq!(row.0.as_deref(), Some("Portman Road"));
    assert_eq!(row.1, Some(1878));
    assert_eq!(row.2.as_deref(), Some("http://www.itfc.co.uk"));
    assert_eq!(row.3.as_deref(), Some("349"));
    assert_eq!(row.4.as_deref(), Some("133884"));
}

#[test]
fn players_merge_across_providers() {
    let mut store = store();
    let mut from_fd = CanonicalPlayer::named(Provider::FootballData, "Leif Davis");
    from_fd.provider_id = Some("3215".to_string());
    from_fd.position = Patch::Set("Defence".to_string());
    from_fd.squad_number = Patch::Set(3);
    assert!(store.upsert_player(&from_fd).expect("create").is_created());

    let mut from_sdb = CanonicalPlayer::named(Provider::SportsDb, "Leif Davis");
    from_sdb.provider_id = Some("34161542".to_string());
    from_sdb.joined = Patch::Set(date(2022, 7, 1));
    assert!(!store.upsert_player(&from_sdb).expect("update").is_created());

    assert_eq!(count(&store, "players"), 1);
    let row: (Option<String>, Option<i64>, Option<String>, Option<String>) = store
        .connection()
        .query_row(
            "SELECT position, squad_number, joined_date, api_id_thesportsdb FROM players",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .expect("player row");
    assert_eq!(row.0.as_deref(), Some("Defence"));
    assert_eq!(row.1, Some(3));
    assert_eq!(row.2.as_deref(), Some("2022-07-01"));
    assert_eq!(row.3.as_deref(), Some("34161542"));
}

#[test]
fn goals_are_appended() {
    let mut store = store();
    let match_id = store
        .upsert_match(&fixture(Provider::FootballData, "1"), "2024/25")
        .expect("create")
        .match_id()
        .expect("written");
    let scorer = store
        .upsert_player(&CanonicalPlayer::named(Provider::FootballData, "Liam Delap"))
        .expect("player")
        .id();
    let team_id: i64 = store
        .connection()
        .query_row("SELECT id FROM teams WHERE team_name = ?1", params![CLUB], |row| row.get(0))
        .expect("team id");

    let goal = GoalRecord {
        match_id,
        scorer_id: scorer,
        team_id,
        minute: Some(44),
        goal_type: String::new(),
        is_penalty: false,
        is_own_goal: false,
        assist_id: None,
    };
    let a = store.append_goal(&goal).expect("first goal");
    let b = store.append_goal(&goal).expect("second goal");
    assert_ne!(a, b);
    assert_eq!(count(&store, "goals"), 2);

    let goal_type: String = store
        .connection()
        .query_row("SELECT goal_type FROM goals WHERE id = ?1", params![a], |row| row.get(0))
        .expect("goal type");
    assert_eq!(goal_type, GoalRecord::DEFAULT_TYPE);
}

#[test]
fn competition_refs_resolve_without_creating_rows() {
    let store = store();
    let by_name = store
        .upsert_competition_ref(
            Provider::FootballData,
            &CompetitionRef {
                name: "FA Cup".to_string(),
                provider_id: None,
            },
        )
        .expect("lookup");
    let by_fd_code = store
        .upsert_competition_ref(
            Provider::FootballData,
            &CompetitionRef {
                name: "EFL Cup".to_string(),
                provider_id: Some("LC".to_string()),
            },
        )
        .expect("lookup");
    let by_sdb_id = store
        .upsert_competition_ref(
            Provider::SportsDb,
            &CompetitionRef {
                name: "English League Cup".to_string(),
                provider_id: Some("4331".to_string()),
            },
        )
        .expect("lookup");
    assert!(by_name.is_some());
    assert!(by_fd_code.is_some());
    assert_eq!(by_fd_code, by_sdb_id);

    // A football-data code is not a TheSportsDB id.
    let crossed = store
        .upsert_competition_ref(
            Provider::SportsDb,
            &CompetitionRef {
                name: "EFL Cup".to_string(),
                provider_id: Some("LC".to_string()),
            },
        )
        .expect("lookup");
    assert_eq!(crossed, None);
    assert_eq!(count(&store, "competitions"), 4);
}

#[test]
fn team_provider_id_beats_a_different_name() {
    let mut store = store();
    store
        .upsert_match(&fixture(Provider::FootballData, "497401"), "2024/25")
        .expect("match creates club row");

    let mut renamed = CanonicalTeam::from_ref(
        Provider::FootballData,
        &team("Ipswich Town FC", "349"),
    );
    renamed.short_name = Patch::Set("Ipswich".to_string());
    let out = store.upsert_team(&renamed).expect("upsert");
    assert!(matches!(out, Upserted::Updated(_)));
    assert_eq!(count(&store, "teams"), 2);

    let name: String = store
        .connection()
        .query_row(
            "SELECT team_name FROM teams WHERE api_id_football_data = '349'",
            [],
            |row| row.get(0),
        )
        .expect("club row");
    assert_eq!(name, CLUB);
}
