//! Games CSV ingestion
//!
//! Reads `GAME_DATE, home_team, home_score, away_team, away_score[, home_win]`
//! files, normalizes team labels and validates every row. Bad rows are an
//! error naming the line; nothing is coerced.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use log::{info, warn};

use crate::data::teams::normalize_team;
use crate::{GameRecord, PredictorError, Result, TeamId};

const REQUIRED_COLUMNS: [&str; 5] = [
    "GAME_DATE",
    "home_team",
    "home_score",
    "away_team",
    "away_score",
];

/// Teams booked per date; a team plays at most one game a day
#[derive(Debug, Default)]
pub(crate) struct Schedule {
    booked: HashSet<(NaiveDate, TeamId)>,
}

impl Schedule {
    /// Book both sides of a game, rejecting self-play and double-booking
    pub(crate) fn book(&mut self, game: &GameRecord) -> Result<()> {
        if game.home_team == game.away_team {
            return Err(PredictorError::Validation(format!(
                "{} plays itself on {}",
                game.home_team, game.date
            )));
        }
        for team in [&game.home_team, &game.away_team] {
            if !self.booked.insert((game.date, team.clone())) {
                return Err(PredictorError::Validation(format!(
                    "{} appears in more than one game on {}",
                    team, game.date
                )));
            }
        }
        Ok(())
    }
}

/// Prefix a row-level error with its line, keeping the variant
fn at_line(line: u64, err: PredictorError) -> PredictorError {
    match err {
        PredictorError::Validation(msg) => PredictorError::Validation(format!("line {line}: {msg}")),
        PredictorError::UnknownTeam(msg) => PredictorError::UnknownTeam(format!("line {line}: {msg}")),
        other => other,
    }
}

/// Column positions resolved from the header row
struct Columns {
    date: usize,
    home_team: usize,
    home_score: usize,
    away_team: usize,
    away_score: usize,
    home_win: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim().trim_start_matches('\u{feff}') == name);

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| find(c).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(PredictorError::Validation(format!(
                "games CSV is missing columns: {}",
                missing.join(", ")
            )));
        }

        let position = |name: &str| {
            find(name).ok_or_else(|| PredictorError::Validation(format!("missing column {name}")))
        };
        Ok(Columns {
            date: position("GAME_DATE")?,
            home_team: position("home_team")?,
            home_score: position("home_score")?,
            away_team: position("away_team")?,
            away_score: position("away_score")?,
            home_win: find("home_win"),
        })
    }
}

fn field<'r>(record: &'r csv::StringRecord, idx: usize, line: u64, name: &str) -> Result<&'r str> {
    match record.get(idx).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(PredictorError::Validation(format!(
            "line {line}: missing {name}"
        ))),
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time component
fn parse_date(raw: &str, line: u64) -> Result<NaiveDate> {
    let day = raw.split([' ', 'T']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
        PredictorError::Validation(format!("line {line}: bad GAME_DATE {raw:?}: {e}"))
    })
}

fn parse_score(raw: &str, line: u64, name: &str) -> Result<u32> {
    raw.parse::<u32>().map_err(|_| {
        PredictorError::Validation(format!("line {line}: non-numeric {name} {raw:?}"))
    })
}

/// Parse games from any CSV reader
pub fn read_games<R: Read>(reader: R) -> Result<Vec<GameRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let columns = Columns::from_headers(reader.headers()?)?;

    let mut games = Vec::new();
    let mut scores: HashMap<(NaiveDate, TeamId, TeamId), (u32, u32)> = HashMap::new();
    let mut schedule = Schedule::default();
    let mut duplicates = 0usize;

    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());

        let date = parse_date(field(&record, columns.date, line, "GAME_DATE")?, line)?;
        let home_team = normalize_team(field(&record, columns.home_team, line, "home_team")?)
            .map_err(|e| at_line(line, e))?;
        let away_team = normalize_team(field(&record, columns.away_team, line, "away_team")?)
            .map_err(|e| at_line(line, e))?;
        let home_score = parse_score(
            field(&record, columns.home_score, line, "home_score")?,
            line,
            "home_score",
        )?;
        let away_score = parse_score(
            field(&record, columns.away_score, line, "away_score")?,
            line,
            "away_score",
        )?;

        let game = GameRecord {
            date,
            home_team,
            away_team,
            home_score,
            away_score,
        };

        if let Some(idx) = columns.home_win {
            let flag = field(&record, idx, line, "home_win")?;
            if flag.parse::<u8>().ok() != Some(game.home_win()) {
                return Err(PredictorError::Validation(format!(
                    "line {line}: home_win {flag:?} disagrees with score {home_score}-{away_score}"
                )));
            }
        }

        // Identical repeats are skipped; a repeat with another score is an error
        let key = (game.date, game.home_team.clone(), game.away_team.clone());
        if let Some(&(first_home, first_away)) = scores.get(&key) {
            if (first_home, first_away) != (home_score, away_score) {
                return Err(PredictorError::Validation(format!(
                    "line {line}: {} vs {} on {} repeated with score {}-{}, first seen as {}-{}",
                    game.home_team, game.away_team, game.date, home_score, away_score, first_home, first_away
                )));
            }
            duplicates += 1;
            continue;
        }
        schedule.book(&game).map_err(|e| at_line(line, e))?;
        scores.insert(key, (home_score, away_score));
        games.push(game);
    }

    if duplicates > 0 {
        warn!("Skipped {} duplicate game rows", duplicates);
    }

    games.sort_by(|a, b| {
        (a.date, &a.home_team, &a.away_team).cmp(&(b.date, &b.home_team, &b.away_team))
    });
    Ok(games)
}

/// Parse a games CSV file
pub fn read_games_csv<P: AsRef<Path>>(path: P) -> Result<Vec<GameRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        PredictorError::Validation(format!("cannot open games file {}: {}", path.display(), e))
    })?;
    let games = read_games(file)?;
    info!("Read {} games from {}", games.len(), path.display());
    Ok(games)
}
