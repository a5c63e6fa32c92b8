//! Model inference for matchup predictions

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::info;

use crate::data::teams::normalize_team;
use crate::data::Database;
use crate::features::{matchup_deltas, FeatureConfig};
use crate::predict::cache::FileCache;
use crate::training::classifier::sidecar_path;
use crate::training::{load_classifier, Classifier, BEST_MODEL_FILE};
use crate::{Config, GameRecord, Prediction, PredictorError, Result, TeamId};

fn load_games(path: &Path) -> Result<Vec<GameRecord>> {
    if !path.exists() {
        return Err(PredictorError::Validation(format!(
            "no games database at {}; run `nba data import` first",
            path.display()
        )));
    }
    let games = Database::open(path)?.get_all_games()?;
    info!("Loaded {} games from {}", games.len(), path.display());
    Ok(games)
}

fn load_model(path: &Path) -> Result<Box<dyn Classifier>> {
    if !path.exists() {
        return Err(PredictorError::NoModel);
    }
    load_classifier(path)
}

/// Serves predictions from the games database and the selected model
///
/// Both are read lazily and reloaded when their files change on disk.
pub struct Predictor {
    games: FileCache<Vec<GameRecord>>,
    model: FileCache<Box<dyn Classifier>>,
    features: FeatureConfig,
}

impl Predictor {
    pub fn new(config: &Config) -> Self {
        Self::with_paths(
            config.data.database_path(),
            config.data.artifacts_dir.join(BEST_MODEL_FILE),
            config.feature_config(),
        )
    }

    pub fn with_paths(database_path: PathBuf, model_path: PathBuf, features: FeatureConfig) -> Self {
        Predictor {
            games: FileCache::new(database_path),
            model: FileCache::new(&model_path).with_companion(sidecar_path(&model_path)),
            features,
        }
    }

    /// Forget cached games and model
    pub fn invalidate(&mut self) {
        self.games.invalidate();
        self.model.invalidate();
    }

    /// Sorted team codes present in the game history
    pub fn teams(&mut self) -> Result<Vec<TeamId>> {
        let games = self.games.get_or_load(load_games)?;
        let mut teams: Vec<TeamId> = games
            .iter()
            .flat_map(|g| [g.home_team.clone(), g.away_team.clone()])
            .collect();
        teams.sort();
        teams.dedup();
        Ok(teams)
    }

    /// Registry name of the served model
    pub fn model_name(&mut self) -> Result<&'static str> {
        Ok(self.model.get_or_load(load_model)?.name())
    }

    /// Predict P(home win) using only games strictly before `as_of`
    ///
    /// Without `as_of` the whole history is used and the game is evaluated
    /// on the day after the most recent game.
    pub fn predict(&mut self, home: &str, away: &str, as_of: Option<NaiveDate>) -> Result<Prediction> {
        let home = normalize_team(home)?;
        let away = normalize_team(away)?;

        let games = self.games.get_or_load(load_games)?;
        let history: Vec<GameRecord> = games
            .iter()
            .filter(|g| as_of.map_or(true, |d| g.date < d))
            .cloned()
            .collect();
        let on = as_of.or_else(|| {
            history
                .iter()
                .map(|g| g.date)
                .max()
                .and_then(|d| d.succ_opt())
        });

        let deltas = matchup_deltas(&history, &home, &away, on, &self.features)?;

        let model = self.model.get_or_load(load_model)?;
        let columns = model
            .feature_columns()
            .ok_or_else(|| PredictorError::Model("model has no feature columns".into()))?;
        let row = columns
            .iter()
            .map(|c| {
                deltas.get(c).map(|v| v as f32).ok_or_else(|| {
                    PredictorError::InsufficientHistory {
                        team: format!("{} vs {} ({} unavailable)", home, away, c),
                        games: history.iter().filter(|g| g.involves(&home)).count(),
                        required: self.features.rolling.min_periods,
                    }
                })
            })
            .collect::<Result<Vec<f32>>>()?;

        let prob_home_win = model.predict_one(&row)?;

        Ok(Prediction {
            features: deltas.restricted_to(columns),
            home_team: home,
            away_team: away,
            as_of: on,
            prob_home_win,
        })
    }
}
