//! SQLite storage for game results and logged predictions

use crate::{GameRecord, Prediction, Result, TeamId};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                home_score INTEGER NOT NULL CHECK (home_score >= 0),
                away_score INTEGER NOT NULL CHECK (away_score >= 0),
                UNIQUE(date, home_team, away_team)
            );

            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                as_of TEXT,
                prob_home_win REAL NOT NULL,
                model TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_games_date ON games(date);
            CREATE INDEX IF NOT EXISTS idx_games_teams ON games(home_team, away_team);
            "#,
        )?;
        Ok(())
    }

    // ==================== Game Operations ====================

    /// Insert multiple games in one transaction
    pub fn upsert_games(&mut self, games: &[GameRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO games (date, home_team, away_team, home_score, away_score)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(date, home_team, away_team) DO UPDATE SET
                    home_score = excluded.home_score,
                    away_score = excluded.away_score
                "#,
            )?;
            for game in games {
                stmt.execute(params![
                    game.date,
                    game.home_team.as_str(),
                    game.away_team.as_str(),
                    game.home_score,
                    game.away_score,
                ])?;
            }
        }
        tx.commit()?;
        Ok(games.len())
    }

    /// All games, oldest first
    pub fn get_all_games(&self) -> Result<Vec<GameRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, home_team, away_team, home_score, away_score
             FROM games
             ORDER BY date, home_team, away_team",
        )?;

        let games = stmt
            .query_map([], Self::row_to_game)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(games)
    }

    /// Distinct team codes appearing in the games table, sorted
    pub fn get_teams(&self) -> Result<Vec<TeamId>> {
        let mut stmt = self.conn.prepare(
            "SELECT home_team FROM games UNION SELECT away_team FROM games ORDER BY 1",
        )?;
        let teams = stmt
            .query_map([], |row| Ok(TeamId(row.get(0)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(teams)
    }

    fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<GameRecord> {
        Ok(GameRecord {
            date: row.get(0)?,
            home_team: TeamId(row.get(1)?),
            away_team: TeamId(row.get(2)?),
            home_score: row.get(3)?,
            away_score: row.get(4)?,
        })
    }

    // ==================== Prediction Log ====================

    /// Record a served prediction
    pub fn log_prediction(&self, prediction: &Prediction, model: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO predictions (home_team, away_team, as_of, prob_home_win, model)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                prediction.home_team.as_str(),
                prediction.away_team.as_str(),
                prediction.as_of,
                prediction.prob_home_win as f64,
                model,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ==================== Statistics ====================

    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let game_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;

        let prediction_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))?;

        let (earliest, latest): (Option<NaiveDate>, Option<NaiveDate>) = self
            .conn
            .query_row("SELECT MIN(date), MAX(date) FROM games", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?
            .unwrap_or((None, None));

        Ok(DatabaseStats {
            team_count: self.get_teams()?.len(),
            game_count: game_count as usize,
            prediction_count: prediction_count as usize,
            earliest_game: earliest,
            latest_game: latest,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub team_count: usize,
    pub game_count: usize,
    pub prediction_count: usize,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
}
