//! Train, compare and persist win-probability models

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::features::FeatureTable;
use crate::training::classifier::{build_classifier, sidecar_path};
use crate::training::dataset::{baseline_home_rate, pick_features, time_split, to_xy};
use crate::training::metrics::{pick_best, RunMetrics, TrainingReport};
use crate::{Config, PredictorError, Result, TrainingConfig};

/// Stable file names inside the artifacts directory
pub const BEST_MODEL_FILE: &str = "model.mpk";
pub const METRICS_FILE: &str = "metrics.json";

/// Record path for a named model run
pub fn run_model_path(artifacts_dir: &Path, name: &str) -> PathBuf {
    artifacts_dir.join(format!("model-{name}.mpk"))
}

/// Orchestrates feature loading, the chronological split, model fitting and
/// selection of the best run
pub struct Trainer {
    features_path: PathBuf,
    artifacts_dir: PathBuf,
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: &Config) -> Self {
        Trainer {
            features_path: config.data.features_path(),
            artifacts_dir: config.data.artifacts_dir.clone(),
            config: config.training.clone(),
        }
    }

    /// Override locations (tests, experiments)
    pub fn with_paths(mut self, features_path: PathBuf, artifacts_dir: PathBuf) -> Self {
        self.features_path = features_path;
        self.artifacts_dir = artifacts_dir;
        self
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Train every requested model and persist the best one
    pub fn run(&self, model_names: &[String]) -> Result<TrainingReport> {
        if model_names.is_empty() {
            return Err(PredictorError::Config("no models requested".into()));
        }

        let table = FeatureTable::read_csv(&self.features_path)?;
        if table.len() < 2 {
            return Err(PredictorError::Validation(format!(
                "need at least 2 feature rows to train, found {}",
                table.len()
            )));
        }

        let used = pick_features(&self.config.preferred_features, self.config.min_features)?;
        let (train_rows, test_rows) = time_split(table.rows(), self.config.test_frac, 1);
        let train = to_xy(train_rows, &used)?;
        let test = to_xy(test_rows, &used)?;
        info!(
            "Training on {} rows, testing on {} rows with features {:?}",
            train.len(),
            test.len(),
            used
        );

        // Each model trains once, in request order
        let mut names: Vec<&str> = Vec::with_capacity(model_names.len());
        for name in model_names {
            if names.contains(&name.as_str()) {
                warn!("Model {} requested more than once; training it once", name);
            } else {
                names.push(name);
            }
        }

        // Fail on unknown names before spending time on fits
        let mut models = names
            .iter()
            .map(|name| build_classifier(name, &self.config))
            .collect::<Result<Vec<_>>>()?;

        std::fs::create_dir_all(&self.artifacts_dir)?;
        let mut runs: Vec<(String, RunMetrics)> = Vec::with_capacity(models.len());
        for model in models.iter_mut() {
            model.fit(&train)?;
            let probs = model.predict_proba(&test.features)?;
            let metrics = RunMetrics::evaluate(train.len(), &test.labels, &probs);
            info!("{}: {}", model.name(), metrics);

            model.save(&run_model_path(&self.artifacts_dir, model.name()))?;
            runs.push((model.name().to_string(), metrics));
        }

        let (best_name, best) = pick_best(&runs)
            .cloned()
            .ok_or_else(|| PredictorError::Model("no model runs".into()))?;
        self.persist_best(&best_name)?;

        let baseline = baseline_home_rate(test_rows);
        let report = TrainingReport {
            n_train: best.n_train,
            n_test: best.n_test,
            accuracy: best.accuracy,
            roc_auc: best.roc_auc,
            features_used: used,
            best_model: best_name,
            runs: runs.into_iter().collect::<BTreeMap<_, _>>(),
            baseline_home_rate: baseline,
            baseline_home_acc: baseline,
        };

        let metrics_path = self.artifacts_dir.join(METRICS_FILE);
        std::fs::write(&metrics_path, serde_json::to_string_pretty(&report)?)?;
        info!(
            "Best model: {} (roc_auc={:.3}, accuracy={:.3}); metrics written to {}",
            report.best_model,
            report.roc_auc,
            report.accuracy,
            metrics_path.display()
        );

        Ok(report)
    }

    /// Copy `model-{name}.mpk` and its sidecar to the stable `model.*` paths
    fn persist_best(&self, name: &str) -> Result<PathBuf> {
        let src = run_model_path(&self.artifacts_dir, name);
        let dst = self.artifacts_dir.join(BEST_MODEL_FILE);
        if !src.exists() {
            return Err(PredictorError::Model(format!(
                "missing trained model file: {}",
                src.display()
            )));
        }
        std::fs::copy(sidecar_path(&src), sidecar_path(&dst))?;
        std::fs::copy(&src, &dst)?;
        Ok(dst)
    }
}
