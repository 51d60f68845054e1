use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use tracing::info;

/// Competitions the tracked club takes part in, with each provider's
/// identifier. These are the only competition rows the crate ever creates.
pub const SEEDED_COMPETITIONS: &[(&str, &str, &str)] = &[
    ("Championship", "ELC", "4330"),
    ("Premier League", "PL", "4328"),
    ("FA Cup", "FAC", "4329"),
    ("League Cup", "LC", "4331"),
];

/// Owner of every persisted canonical row. Identity lookups live in
/// `identity.rs`, writes in `upsert.rs`, reads in `queries.rs`.
pub struct Store {
    pub(crate) conn: Connection,
}

impl Store {
    pub fn open(path: &Path, tracked_club: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .context("enable wal journal")?;
        let store = Self { conn };
        store.init(tracked_club)?;
        info!(path = %path.display(), "store ready");
        Ok(store)
    }

    pub fn open_in_memory(tracked_club: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        let store = Self { conn };
        store.init(tracked_club)?;
        Ok(store)
    }

    /// Cheap reachability check run before every pipeline run.
    pub fn ping(&self) -> Result<()> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .context("store unreachable")?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn init(&self, tracked_club: &str) -> Result<()> {
        init_schema(&self.conn)?;
        self.conn
            .execute(
                "INSERT INTO ledger_settings(key, value) VALUES ('tracked_club', ?1)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![tracked_club],
            )
            .context("record tracked club")?;
        seed_competitions(&self.conn)?;
        Ok(())
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS ledger_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS seasons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            season_name TEXT NOT NULL UNIQUE,
            start_date TEXT NULL,
            end_date TEXT NULL
        );

        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_name TEXT NOT NULL UNIQUE,
            short_name TEXT NULL,
            stadium TEXT NULL,
            city TEXT NULL,
            country TEXT NULL,
            founded_year INTEGER NULL,
            website TEXT NULL,
            colors TEXT NULL,
            api_id_football_data TEXT NULL,
            api_id_thesportsdb TEXT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS competitions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            api_id_football_data TEXT NULL,
            api_id_thesportsdb TEXT NULL
        );

        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            season_id INTEGER NOT NULL REFERENCES seasons(id),
            competition_id INTEGER NOT NULL REFERENCES competitions(id),
            match_date TEXT NOT NULL,
            kick_off_time TEXT NULL,
            home_team_id INTEGER NOT NULL REFERENCES teams(id),
            away_team_id INTEGER NOT NULL REFERENCES teams(id),
            home_score INTEGER NULL,
            away_score INTEGER NULL,
            half_time_home_score INTEGER NULL,
            half_time_away_score INTEGER NULL,
            venue TEXT NULL,
            attendance INTEGER NULL,
            referee TEXT NULL,
            match_status TEXT NOT NULL DEFAULT 'scheduled',
            match_round TEXT NULL,
            api_id_football_data TEXT NULL UNIQUE,
            api_id_thesportsdb TEXT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK ((home_score IS NULL) = (away_score IS NULL)),
            CHECK ((half_time_home_score IS NULL) = (half_time_away_score IS NULL))
        );
        CREATE INDEX IF NOT EXISTS idx_matches_fallback
            ON matches(season_id, competition_id, match_date, home_team_id, away_team_id);
        CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(match_date);

        CREATE TABLE IF NOT EXISTS players (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_name TEXT NOT NULL UNIQUE,
            date_of_birth TEXT NULL,
            nationality TEXT NULL,
            position TEXT NULL,
            squad_number INTEGER NULL,
            joined_date TEXT NULL,
            left_date TEXT NULL,
            api_id_football_data TEXT NULL,
            api_id_thesportsdb TEXT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS match_statistics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id INTEGER NOT NULL UNIQUE REFERENCES matches(id),
            home_possession REAL NULL,
            away_possession REAL NULL,
            home_shots INTEGER NULL,
            away_shots INTEGER NULL,
            home_shots_on_target INTEGER NULL,
            away_shots_on_target INTEGER NULL,
            home_corners INTEGER NULL,
            away_corners INTEGER NULL,
            home_fouls INTEGER NULL,
            away_fouls INTEGER NULL,
            home_offsides INTEGER NULL,
            away_offsides INTEGER NULL,
            home_passes INTEGER NULL,
            away_passes INTEGER NULL,
            home_pass_accuracy REAL NULL,
            away_pass_accuracy REAL NULL,
            home_yellow_cards INTEGER NULL,
            away_yellow_cards INTEGER NULL,
            home_red_cards INTEGER NULL,
            away_red_cards INTEGER NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS goals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id INTEGER NOT NULL REFERENCES matches(id),
            player_id INTEGER NOT NULL REFERENCES players(id),
            team_id INTEGER NOT NULL REFERENCES teams(id),
            minute INTEGER NULL,
            goal_type TEXT NOT NULL DEFAULT 'Open Play',
            is_penalty INTEGER NOT NULL DEFAULT 0,
            is_own_goal INTEGER NOT NULL DEFAULT 0,
            assist_player_id INTEGER NULL REFERENCES players(id),
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_goals_match ON goals(match_id);

        CREATE VIEW IF NOT EXISTS tracked_club_matches AS
        SELECT
            m.id AS match_id,
            s.season_name,
            c.name AS competition,
            m.match_date,
            m.kick_off_time,
            ht.team_name AS home_team,
            awt.team_name AS away_team,
            m.home_score,
            m.away_score,
            m.venue,
            m.attendance,
            m.referee,
            m.match_status,
            m.match_round,
            CASE WHEN ht.team_name = club.value THEN 'Home' ELSE 'Away' END AS venue_side,
            CASE WHEN ht.team_name = club.value THEN awt.team_name ELSE ht.team_name END AS opponent,
            CASE WHEN ht.team_name = club.value THEN m.home_score ELSE m.away_score END AS club_score,
            CASE WHEN ht.team_name = club.value THEN m.away_score ELSE m.home_score END AS opponent_score,
            CASE
                WHEN m.home_score IS NULL THEN NULL
                WHEN m.home_score = m.away_score THEN 'Draw'
                WHEN (ht.team_name = club.value) = (m.home_score > m.away_score) THEN 'Win'
                ELSE 'Loss'
            END AS result
        FROM matches m
        JOIN seasons s ON s.id = m.season_id
        JOIN competitions c ON c.id = m.competition_id
        JOIN teams ht ON ht.id = m.home_team_id
        JOIN teams awt ON awt.id = m.away_team_id
        JOIN ledger_settings club ON club.key = 'tracked_club'
        WHERE ht.team_name = club.value OR awt.team_name = club.value;

        CREATE VIEW IF NOT EXISTS top_scorers AS
        SELECT p.player_name, COUNT(g.id) AS goals
        FROM goals g
        JOIN players p ON p.id = g.player_id
        JOIN teams t ON t.id = g.team_id
        JOIN ledger_settings club ON club.key = 'tracked_club'
        WHERE t.team_name = club.value AND g.is_own_goal = 0
        GROUP BY p.player_name
        ORDER BY goals DESC, p.player_name ASC;

        CREATE VIEW IF NOT EXISTS season_statistics AS
        SELECT
            season_name,
            COUNT(*) AS played,
            SUM(CASE WHEN result = 'Win' THEN 1 ELSE 0 END) AS wins,
            SUM(CASE WHEN result = 'Draw' THEN 1 ELSE 0 END) AS draws,
            SUM(CASE WHEN result = 'Loss' THEN 1 ELSE 0 END) AS losses,
            COALESCE(SUM(club_score), 0) AS goals_for,
            COALESCE(SUM(opponent_score), 0) AS goals_against
        FROM tracked_club_matches
        WHERE match_status = 'finished' AND result IS NOT NULL
        GROUP BY season_name;
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

fn seed_competitions(conn: &Connection) -> Result<()> {
    for (name, football_data, sportsdb) in SEEDED_COMPETITIONS {
        conn.execute(
            "INSERT INTO competitions(name, api_id_football_data, api_id_thesportsdb)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO NOTHING",
            params![name, football_data, sportsdb],
        )
        .with_context(|| format!("seed competition {name}"))?;
    }
    Ok(())
}
