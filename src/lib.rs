//! NBA win probability prediction
//!
//! Point-in-time (leakage-safe) team strength features, classifier training
//! and an HTTP prediction service.

pub mod data;
pub mod features;
pub mod predict;
pub mod service;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::features::MatchupDeltas;

/// Canonical Basketball-Reference team code (e.g. `NYK`, `POR`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub String);

impl TeamId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single completed game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub date: NaiveDate,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_score: u32,
    pub away_score: u32,
}

impl GameRecord {
    pub fn new(
        date: NaiveDate,
        home_team: &str,
        away_team: &str,
        home_score: u32,
        away_score: u32,
    ) -> Self {
        GameRecord {
            date,
            home_team: TeamId(home_team.to_string()),
            away_team: TeamId(away_team.to_string()),
            home_score,
            away_score,
        }
    }

    /// 1 if the home team won, 0 otherwise (ties count as 0)
    pub fn home_win(&self) -> u8 {
        u8::from(self.home_score > self.away_score)
    }

    /// Check if a team played in this game
    pub fn involves(&self, team: &TeamId) -> bool {
        &self.home_team == team || &self.away_team == team
    }
}

/// Served prediction for one matchup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub home_team: TeamId,
    pub away_team: TeamId,
    /// History cutoff: only games strictly before this date were used
    pub as_of: Option<NaiveDate>,
    /// Feature values the model consumed
    pub features: MatchupDeltas,
    pub prob_home_win: f32,
}

impl Prediction {
    /// Get the predicted winner (team with >=50% win probability)
    pub fn predicted_winner(&self) -> &TeamId {
        if self.prob_home_win >= 0.5 {
            &self.home_team
        } else {
            &self.away_team
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Insufficient history for {team}: has {games} games, need {required}")]
    InsufficientHistory {
        team: String,
        games: usize,
        required: usize,
    },

    #[error("Model not trained - run `nba train` first")]
    NoModel,

    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PredictorError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub features: FeaturesConfig,
    pub elo: features::EloConfig,
    pub training: TrainingConfig,
    pub data: DataConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Trailing games in the rolling window
    pub window: usize,
    /// Prior games required before a rolling value is emitted
    pub min_periods: usize,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        FeaturesConfig {
            window: 10,
            min_periods: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub test_frac: f64,
    pub min_features: usize,
    pub preferred_features: Vec<String>,
    pub models: Vec<String>,
    pub epochs: usize,
    pub learning_rate: f64,
    pub hidden_dim: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            test_frac: 0.25,
            min_features: 2,
            preferred_features: features::FEATURE_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            models: vec!["logreg".to_string()],
            epochs: 500,
            learning_rate: 0.1,
            hidden_dim: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    pub features_file: String,
    pub artifacts_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            data_dir: PathBuf::from("data_cache"),
            database_file: "games.db".to_string(),
            features_file: "features.csv".to_string(),
            artifacts_dir: PathBuf::from("artifacts"),
        }
    }
}

impl DataConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn features_path(&self) -> PathBuf {
        self.data_dir.join(&self.features_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PredictorError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| PredictorError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PredictorError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `NBA_*` environment overrides for data and artifact locations
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("NBA_DATA_DIR") {
            self.data.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("NBA_ART_DIR") {
            self.data.artifacts_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup("NBA_DB_FILE") {
            self.data.database_file = file;
        }
        if let Some(file) = lookup("NBA_FEATS_FILE") {
            self.data.features_file = file;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.features.window == 0 {
            return Err(PredictorError::Config("features.window must be > 0".into()));
        }
        if self.features.min_periods == 0 || self.features.min_periods > self.features.window {
            return Err(PredictorError::Config(format!(
                "features.min_periods must be in 1..={}",
                self.features.window
            )));
        }
        if !(0.0..1.0).contains(&self.training.test_frac) || self.training.test_frac == 0.0 {
            return Err(PredictorError::Config(
                "training.test_frac must be in (0, 1)".into(),
            ));
        }
        Ok(())
    }

    /// Feature pipeline settings derived from this config
    pub fn feature_config(&self) -> features::FeatureConfig {
        features::FeatureConfig {
            rolling: features::RollingConfig {
                window: self.features.window,
                min_periods: self.features.min_periods,
            },
            elo: self.elo,
        }
    }
}
