use chrono::NaiveDate;

use club_ledger::model::{
    CanonicalMatch, CanonicalPlayer, CompetitionRef, GoalRecord, Patch, Provider, Score,
    SeasonInfo, TeamRef,
};
use club_ledger::status::MatchStatus;
use club_ledger::store::Store;

const CLUB: &str = "Ipswich Town";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn side(name: &str) -> TeamRef {
    TeamRef {
        name: name.to_string(),
        provider_id: None,
    }
}

fn game(
    id: &str,
    day: NaiveDate,
    home: &str,
    away: &str,
    score: Option<(u32, u32)>,
    season: &str,
) -> CanonicalMatch {
    CanonicalMatch {
        provider: Provider::FootballData,
        provider_id: id.to_string(),
        date: day,
        kickoff: Patch::Omit,
        home: side(home),
        away: side(away),
        competition: CompetitionRef {
            name: "Championship".to_string(),
            provider_id: None,
        },
        season: SeasonInfo {
            label: season.to_string(),
            start: None,
            end: None,
        },
        status: if score.is_some() {
            MatchStatus::Finished
        } else {
            MatchStatus::Scheduled
        },
        score: Patch::from_option(score.map(|(home, away)| Score { home, away })),
        half_time: Patch::Omit,
        venue: Patch::Omit,
        attendance: Patch::Omit,
        referee: Patch::Omit,
        round: Patch::Omit,
        stats: None,
    }
}

/// Three results and one fixture in 2023/24, one result in 2022/23, and one
/// 2023/24 match the club did not play in.
fn seeded() -> Store {
    let mut store = Store::open_in_memory(CLUB).expect("in-memory store");
    let games = [
        game("1", date(2023, 8, 5), CLUB, "Sunderland", Some((2, 1)), "2023/24"),
        game("2", date(2023, 8, 12), "Norwich City", CLUB, Some((1, 1)), "2023/24"),
        game("3", date(2023, 8, 19), "Leeds United", CLUB, Some((3, 0)), "2023/24"),
        game("4", date(2024, 4, 20), CLUB, "Norwich City", None, "2023/24"),
        game("5", date(2023, 2, 11), CLUB, "Norwich City", Some((4, 0)), "2022/23"),
        game("6", date(2023, 9, 2), "Leeds United", "Norwich City", Some((1, 1)), "2023/24"),
    ];
    for g in &games {
        store.upsert_match(g, "2023/24").expect("seed match");
    }
    store
}

fn team_id(store: &Store, name: &str) -> i64 {
    store
        .connection()
        .query_row("SELECT id FROM teams WHERE team_name = ?1", [name], |row| row.get(0))
        .expect("team id")
}

fn match_id(store: &Store, provider_id: &str) -> i64 {
    store
        .connection()
        .query_row(
            "SELECT id FROM matches WHERE api_id_football_data = ?1",
            [provider_id],
            |row| row.get(0),
        )
        .expect("match id")
}

#[test]
fn season_matches_only_involve_the_tracked_club() {
    let store = seeded();
    let rows = store.season_matches("2023/24").expect("season matches");
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].opponent, "Sunderland");
    assert_eq!(rows[0].side, "Home");
    assert_eq!(rows[0].result.as_deref(), Some("Win"));
    assert_eq!(rows[1].side, "Away");
    assert_eq!(rows[1].result.as_deref(), Some("Draw"));
    assert_eq!(rows[2].result.as_deref(), Some("Loss"));
    assert_eq!(rows[3].result, None);
    assert_eq!(rows[3].status, "scheduled");
}

#[test]
fn upcoming_window_is_inclusive() {
    let store = seeded();
    let upcoming = store
        .upcoming_matches(date(2024, 4, 6), 14)
        .expect("upcoming");
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].opponent, "Norwich City");

    let too_soon = store
        .upcoming_matches(date(2024, 4, 6), 13)
        .expect("upcoming");
    assert!(too_soon.is_empty());
}

#[test]
fn season_statistics_count_finished_matches() {
    let store = seeded();
    let summary = store
        .season_statistics("2023/24")
        .expect("statistics")
        .expect("season has results");
    assert_eq!(summary.played, 3);
    assert_eq!((summary.wins, summary.draws, summary.losses), (1, 1, 1));
    assert_eq!((summary.goals_for, summary.goals_against), (3, 5));
    assert_eq!(summary.points(), 4);

    assert!(store.season_statistics("1999/00").expect("statistics").is_none());
}

#[test]
fn head_to_head_spans_seasons() {
    let store = seeded();
    let record = store.head_to_head("Norwich City").expect("head to head");
    assert_eq!(record.played, 2);
    assert_eq!((record.wins, record.draws, record.losses), (1, 1, 0));
    assert_eq!((record.goals_for, record.goals_against), (5, 1));

    let none = store.head_to_head("Real Madrid").expect("head to head");
    assert_eq!(none.played, 0);
}

#[test]
fn top_scorers_skip_own_goals() {
    let mut store = seeded();
    let club = team_id(&store, CLUB);
    let opener = match_id(&store, "1");
    let old = match_id(&store, "5");
    let hirst = store
        .upsert_player(&CanonicalPlayer::named(Provider::FootballData, "George Hirst"))
        .expect("player")
        .id();
    let chaplin = store
        .upsert_player(&CanonicalPlayer::named(Provider::FootballData, "Conor Chaplin"))
        .expect("player")
        .id();

    let goal = |match_id, scorer_id, own| GoalRecord {
        match_id,
        scorer_id,
        team_id: club,
        minute: None,
        goal_type: GoalRecord::DEFAULT_TYPE.to_string(),
        is_penalty: false,
        is_own_goal: own,
        assist_id: None,
    };
    store.append_goal(&goal(opener, chaplin, false)).expect("goal");
    store.append_goal(&goal(opener, hirst, false)).expect("goal");
    store.append_goal(&goal(old, chaplin, false)).expect("goal");
    store.append_goal(&goal(old, hirst, true)).expect("goal");

    let all_time = store.top_scorers(None, 10).expect("scorers");
    assert_eq!(all_time[0].player, "Conor Chaplin");
    assert_eq!(all_time[0].goals, 2);
    assert_eq!(all_time[1].goals, 1);

    let season = store.top_scorers(Some("2023/24"), 1).expect("scorers");
    assert_eq!(season.len(), 1);
    assert_eq!(season[0].player, "Conor Chaplin");
}

#[test]
fn table_counts_cover_every_table() {
    let store = seeded();
    let counts = store.table_counts().expect("counts");
    assert_eq!(counts.competitions, 4);
    assert_eq!(counts.matches, 6);
    assert_eq!(counts.seasons, 2);
    assert_eq!(counts.teams, 4);
    assert_eq!(counts.goals, 0);
}

#[test]
fn unbounded_scorer_limit_returns_everyone() {
    let mut store = seeded();
    let club = team_id(&store, CLUB);
    let opener = match_id(&store, "1");
    for name in ["George Hirst", "Conor Chaplin", "Omari Hutchinson"] {
        let scorer_id = store
            .upsert_player(&CanonicalPlayer::named(Provider::FootballData, name))
            .expect("player")
            .id();
        store
            .append_goal(&GoalRecord {
                match_id: opener,
                scorer_id,
                team_id: club,
                minute: None,
                goal_type: GoalRecord::DEFAULT_TYPE.to_string(),
                is_penalty: false,
                is_own_goal: false,
                assist_id: None,
            })
            .expect("goal");
    }

    assert_eq!(store.top_scorers(None, usize::MAX).expect("scorers").len(), 3);
    assert_eq!(
        store
            .top_scorers(Some("2023/24"), usize::MAX)
            .expect("scorers")
            .len(),
        3
    );
    assert!(store.top_scorers(None, 0).expect("scorers").is_empty());
}
