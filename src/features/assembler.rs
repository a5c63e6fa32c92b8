//! Feature assembly
//!
//! Joins rolling form and pre-game Elo onto the matchup rows and turns them
//! into home-minus-away deltas. The same code path evaluates a pending
//! matchup for serving, so training and inference see identical features.

use std::collections::HashMap;

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::data::games::Schedule;
use crate::data::teams::normalize_team;
use crate::features::elo::{self, EloConfig, PreGameRatings};
use crate::features::rolling::{self, PendingForm, RollingConfig, TeamForm};
use crate::features::table::{FeatureRow, FeatureTable, MatchupDeltas};
use crate::{GameRecord, PredictorError, Result, TeamId};

/// Settings for one feature pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub rolling: RollingConfig,
    pub elo: EloConfig,
}

/// Exact identity of a game used when merging ratings back onto rows
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GameKey {
    date: NaiveDate,
    home_team: TeamId,
    home_score: u32,
    away_team: TeamId,
    away_score: u32,
}

impl From<&GameRecord> for GameKey {
    fn from(game: &GameRecord) -> Self {
        GameKey {
            date: game.date,
            home_team: game.home_team.clone(),
            home_score: game.home_score,
            away_team: game.away_team.clone(),
            away_score: game.away_score,
        }
    }
}

/// Normalize labels and reject histories that would make joins ambiguous
fn prepare_games(games: &[GameRecord]) -> Result<Vec<GameRecord>> {
    let mut schedule = Schedule::default();
    let mut out = Vec::with_capacity(games.len());

    for game in games {
        let game = GameRecord {
            home_team: normalize_team(game.home_team.as_str())?,
            away_team: normalize_team(game.away_team.as_str())?,
            ..game.clone()
        };
        schedule.book(&game)?;
        out.push(game);
    }

    Ok(out)
}

fn sub(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? - b?)
}

/// Build the leakage-safe feature table for a game history
///
/// Every value attached to a game comes from strictly earlier games. Rows
/// whose offense, defense or rest deltas are undefined are dropped.
pub fn build_feature_table(games: &[GameRecord], config: &FeatureConfig) -> Result<FeatureTable> {
    let games = prepare_games(games)?;

    let team_rows = rolling::team_game_rows(&games);
    let forms = rolling::rolling_form(&team_rows, &config.rolling);
    let form_by_key: HashMap<(NaiveDate, &TeamId), &TeamForm> =
        forms.iter().map(|f| ((f.date, &f.team), f)).collect();

    let pre_game = elo::pre_game_ratings(&games, config.elo);
    let elo_by_key: HashMap<GameKey, PreGameRatings> = games
        .iter()
        .map(GameKey::from)
        .zip(pre_game)
        .collect();

    let mut rows = Vec::with_capacity(games.len());
    for game in &games {
        let home = form_by_key.get(&(game.date, &game.home_team));
        let away = form_by_key.get(&(game.date, &game.away_team));

        let delta_off = sub(home.and_then(|f| f.off_rolling), away.and_then(|f| f.off_rolling));
        // Defense strength is minus points allowed: home - away = away_pa - home_pa
        let delta_def = sub(away.and_then(|f| f.def_rolling), home.and_then(|f| f.def_rolling));
        let delta_rest = sub(
            home.and_then(|f| f.rest_days).map(|d| d as f64),
            away.and_then(|f| f.rest_days).map(|d| d as f64),
        );

        let (Some(delta_off), Some(delta_def), Some(delta_rest)) = (delta_off, delta_def, delta_rest)
        else {
            continue;
        };

        let delta_elo = elo_by_key
            .get(&GameKey::from(game))
            .map(PreGameRatings::delta)
            .ok_or_else(|| {
                PredictorError::Validation(format!(
                    "no pre-game rating for {} vs {} on {}",
                    game.home_team, game.away_team, game.date
                ))
            })?;

        rows.push(FeatureRow {
            date: game.date,
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            delta_off,
            delta_def,
            delta_rest,
            delta_elo,
            home_win: game.home_win(),
        });
    }

    info!(
        "Assembled {} feature rows from {} games ({} dropped for missing history)",
        rows.len(),
        games.len(),
        games.len() - rows.len()
    );

    Ok(FeatureTable::from_rows(rows))
}

/// Deltas for a single pending matchup
///
/// The game is evaluated as if it were a row dated `on` appended to the
/// history: only games strictly before `on` count. Without `on` the whole
/// history is used and `delta_rest` is left out.
pub fn matchup_deltas(
    games: &[GameRecord],
    home: &TeamId,
    away: &TeamId,
    on: Option<NaiveDate>,
    config: &FeatureConfig,
) -> Result<MatchupDeltas> {
    let games = prepare_games(games)?;
    let home = normalize_team(home.as_str())?;
    let away = normalize_team(away.as_str())?;
    if home == away {
        return Err(PredictorError::Validation(format!(
            "home and away are both {}",
            home
        )));
    }

    for team in [&home, &away] {
        if !games.iter().any(|g| g.involves(team)) {
            return Err(PredictorError::UnknownTeam(format!(
                "{} has no games in the supplied history",
                team
            )));
        }
    }

    let prior: Vec<GameRecord> = games
        .into_iter()
        .filter(|g| on.map_or(true, |d| g.date < d))
        .collect();
    let team_rows = rolling::team_game_rows(&prior);

    let home_form = rolling::pending_form(&team_rows, &home, on, &config.rolling);
    let away_form = rolling::pending_form(&team_rows, &away, on, &config.rolling);

    let insufficient = |team: &TeamId, form: &PendingForm| PredictorError::InsufficientHistory {
        team: team.to_string(),
        games: form.prior_games,
        required: config.rolling.min_periods,
    };
    let (Some(home_off), Some(home_def)) = (home_form.off_rolling, home_form.def_rolling) else {
        return Err(insufficient(&home, &home_form));
    };
    let (Some(away_off), Some(away_def)) = (away_form.off_rolling, away_form.def_rolling) else {
        return Err(insufficient(&away, &away_form));
    };
    let delta_off = home_off - away_off;
    let delta_def = away_def - home_def;

    let delta_rest = sub(
        home_form.rest_days.map(|d| d as f64),
        away_form.rest_days.map(|d| d as f64),
    );

    let ratings = elo::ratings_after(&prior, config.elo);
    let delta_elo = ratings.rating(&home) - ratings.rating(&away);

    debug!(
        "{} vs {} on {:?}: off {:.2} def {:.2} rest {:?} elo {:.2}",
        home, away, on, delta_off, delta_def, delta_rest, delta_elo
    );

    Ok(MatchupDeltas {
        delta_off,
        delta_def,
        delta_rest,
        delta_elo: Some(delta_elo),
    })
}
