//! Win-probability classifiers on burn
//!
//! Two registered models share one network shape: `logreg` is a single
//! linear layer, `mlp` adds a hidden ReLU layer. Both are trained full-batch
//! with SGD on z-scored inputs and binary cross-entropy, then persisted as a
//! burn `.mpk` record plus a JSON sidecar carrying the feature columns and
//! scaling needed to serve them.

use std::path::{Path, PathBuf};

use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Module};
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::optim::{GradientsParams, Optimizer, SgdConfig};
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::activation::{relu, sigmoid};
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor, TensorData};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::training::dataset::{FeatureScaler, Samples};
use crate::{PredictorError, Result, TrainingConfig};

type TrainBackend = Autodiff<NdArray<f32>>;
type InferBackend = NdArray<f32>;

/// Registered model names
pub const AVAILABLE_MODELS: [&str; 2] = ["logreg", "mlp"];

/// A binary classifier producing P(home win)
pub trait Classifier: Send {
    /// Registry name (`logreg`, `mlp`)
    fn name(&self) -> &'static str;

    /// Fit on labelled samples; replaces any previous fit
    fn fit(&mut self, samples: &Samples) -> Result<()>;

    /// Home-win probability per row, rows in `feature_columns` order
    fn predict_proba(&self, rows: &[Vec<f32>]) -> Result<Vec<f32>>;

    /// Columns the fitted model consumes, in order
    fn feature_columns(&self) -> Option<&[String]>;

    /// Write the `.mpk` record at `path` and its `.json` sidecar next to it
    fn save(&self, path: &Path) -> Result<()>;

    fn predict_one(&self, row: &[f32]) -> Result<f32> {
        self.predict_proba(&[row.to_vec()])?
            .into_iter()
            .next()
            .ok_or_else(|| PredictorError::Model("empty prediction".into()))
    }
}

/// Linear layer, optionally preceded by one hidden ReLU layer
#[derive(Module, Debug)]
pub struct Network<B: Backend> {
    hidden: Option<Linear<B>>,
    output: Linear<B>,
}

impl<B: Backend> Network<B> {
    pub fn new(device: &B::Device, input_dim: usize, hidden_dim: Option<usize>) -> Self {
        match hidden_dim {
            Some(hidden_dim) => Network {
                hidden: Some(LinearConfig::new(input_dim, hidden_dim).init(device)),
                output: LinearConfig::new(hidden_dim, 1).init(device),
            },
            None => Network {
                hidden: None,
                output: LinearConfig::new(input_dim, 1)
                    .with_initializer(Initializer::Zeros)
                    .init(device),
            },
        }
    }

    /// Logits `[batch, 1]`
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = match &self.hidden {
            Some(hidden) => relu(hidden.forward(x)),
            None => x,
        };
        self.output.forward(x)
    }
}

/// JSON sidecar stored next to each `.mpk` record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub kind: String,
    pub feature_columns: Vec<String>,
    pub hidden_dim: Option<usize>,
    #[serde(flatten)]
    pub scaler: FeatureScaler,
}

/// Optimisation settings shared by both models
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSettings {
    pub epochs: usize,
    pub learning_rate: f64,
}

impl From<&TrainingConfig> for FitSettings {
    fn from(config: &TrainingConfig) -> Self {
        FitSettings {
            epochs: config.epochs,
            learning_rate: config.learning_rate,
        }
    }
}

struct Fitted {
    network: Network<InferBackend>,
    scaler: FeatureScaler,
    columns: Vec<String>,
}

fn device() -> <InferBackend as Backend>::Device {
    Default::default()
}

fn feature_tensor<B: Backend>(scaler: &FeatureScaler, rows: &[Vec<f32>], device: &B::Device) -> Tensor<B, 2> {
    let flat: Vec<f32> = rows.iter().flat_map(|r| scaler.transform(r)).collect();
    Tensor::from_data(TensorData::new(flat, [rows.len(), scaler.dim()]), device)
}

/// Binary cross-entropy on probabilities, clamped away from 0 and 1
fn binary_cross_entropy<B: Backend>(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let eps = 1e-7;
    let probs_clamped = probs.clamp(eps, 1.0 - eps);
    let loss = targets.clone().neg() * probs_clamped.clone().log()
        - (targets.neg() + 1.0) * (probs_clamped.neg() + 1.0).log();
    loss.mean()
}

fn train_network(
    samples: &Samples,
    hidden_dim: Option<usize>,
    settings: FitSettings,
) -> Result<Fitted> {
    if samples.is_empty() {
        return Err(PredictorError::Validation(
            "cannot fit a classifier on an empty training fold".into(),
        ));
    }

    let device = device();
    let scaler = FeatureScaler::fit(&samples.features);
    let x = feature_tensor::<TrainBackend>(&scaler, &samples.features, &device);
    let labels: Vec<f32> = samples.labels.iter().map(|&y| y as f32).collect();
    let y = Tensor::<TrainBackend, 1>::from_data(TensorData::new(labels, [samples.len()]), &device)
        .unsqueeze_dim(1);

    let mut model = Network::<TrainBackend>::new(&device, scaler.dim(), hidden_dim);
    let mut optimizer = SgdConfig::new().init::<TrainBackend, Network<TrainBackend>>();

    for epoch in 0..settings.epochs {
        let probs = sigmoid(model.forward(x.clone()));
        let loss = binary_cross_entropy(probs, y.clone());

        if epoch % 100 == 0 || epoch + 1 == settings.epochs {
            let loss_val: f32 = loss.clone().into_scalar().elem();
            debug!("Epoch {}/{}: loss={:.4}", epoch + 1, settings.epochs, loss_val);
        }

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optimizer.step(settings.learning_rate, model, grads);
    }

    Ok(Fitted {
        network: model.valid(),
        scaler,
        columns: samples.columns.clone(),
    })
}

fn predict_network(fitted: &Fitted, rows: &[Vec<f32>]) -> Result<Vec<f32>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(bad) = rows.iter().find(|r| r.len() != fitted.scaler.dim()) {
        return Err(PredictorError::Validation(format!(
            "expected {} features, got {}",
            fitted.scaler.dim(),
            bad.len()
        )));
    }

    let x = feature_tensor::<InferBackend>(&fitted.scaler, rows, &device());
    sigmoid(fitted.network.forward(x))
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| PredictorError::Model(format!("reading probabilities: {e:?}")))
}

/// JSON sidecar stored next to a `.mpk` record
pub(crate) fn sidecar_path(path: &Path) -> PathBuf {
    path.with_extension("json")
}

fn save_network(kind: &str, hidden_dim: Option<usize>, fitted: &Fitted, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    fitted
        .network
        .clone()
        .save_file(path.to_path_buf(), &recorder)
        .map_err(|e| PredictorError::Model(format!("Failed to save model: {}", e)))?;

    let meta = ModelMeta {
        kind: kind.to_string(),
        feature_columns: fitted.columns.clone(),
        hidden_dim,
        scaler: fitted.scaler.clone(),
    };
    std::fs::write(sidecar_path(path), serde_json::to_string_pretty(&meta)?)?;
    Ok(())
}

fn not_fitted(name: &str) -> PredictorError {
    PredictorError::Model(format!("{name} has not been fitted"))
}

/// Logistic regression: one linear layer and a sigmoid
pub struct LogisticRegression {
    settings: FitSettings,
    fitted: Option<Fitted>,
}

impl LogisticRegression {
    pub fn new(settings: FitSettings) -> Self {
        LogisticRegression {
            settings,
            fitted: None,
        }
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &'static str {
        "logreg"
    }

    fn fit(&mut self, samples: &Samples) -> Result<()> {
        self.fitted = Some(train_network(samples, None, self.settings)?);
        Ok(())
    }

    fn predict_proba(&self, rows: &[Vec<f32>]) -> Result<Vec<f32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        predict_network(fitted, rows)
    }

    fn feature_columns(&self) -> Option<&[String]> {
        self.fitted.as_ref().map(|f| f.columns.as_slice())
    }

    fn save(&self, path: &Path) -> Result<()> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        save_network(self.name(), None, fitted, path)
    }
}

/// Multi-layer perceptron with one hidden ReLU layer
pub struct MlpClassifier {
    hidden_dim: usize,
    settings: FitSettings,
    fitted: Option<Fitted>,
}

impl MlpClassifier {
    pub fn new(hidden_dim: usize, settings: FitSettings) -> Self {
        MlpClassifier {
            hidden_dim,
            settings,
            fitted: None,
        }
    }
}

impl Classifier for MlpClassifier {
    fn name(&self) -> &'static str {
        "mlp"
    }

    fn fit(&mut self, samples: &Samples) -> Result<()> {
        self.fitted = Some(train_network(samples, Some(self.hidden_dim), self.settings)?);
        Ok(())
    }

    fn predict_proba(&self, rows: &[Vec<f32>]) -> Result<Vec<f32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        predict_network(fitted, rows)
    }

    fn feature_columns(&self) -> Option<&[String]> {
        self.fitted.as_ref().map(|f| f.columns.as_slice())
    }

    fn save(&self, path: &Path) -> Result<()> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        save_network(self.name(), Some(self.hidden_dim), fitted, path)
    }
}

/// Build an unfitted classifier by registry name
pub fn build_classifier(name: &str, config: &TrainingConfig) -> Result<Box<dyn Classifier>> {
    let settings = FitSettings::from(config);
    match name {
        "logreg" => Ok(Box::new(LogisticRegression::new(settings))),
        "mlp" => Ok(Box::new(MlpClassifier::new(config.hidden_dim, settings))),
        other => Err(PredictorError::Config(format!(
            "unknown model '{}'. available: {:?}",
            other, AVAILABLE_MODELS
        ))),
    }
}

/// Load a fitted classifier from its `.mpk` record and `.json` sidecar
pub fn load_classifier(path: &Path) -> Result<Box<dyn Classifier>> {
    let meta_path = sidecar_path(path);
    let meta: ModelMeta = serde_json::from_str(&std::fs::read_to_string(&meta_path).map_err(|e| {
        PredictorError::Model(format!("reading {}: {}", meta_path.display(), e))
    })?)?;

    let device = device();
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let network = Network::<InferBackend>::new(&device, meta.scaler.dim(), meta.hidden_dim)
        .load_file(path.to_path_buf(), &recorder, &device)
        .map_err(|e| PredictorError::Model(format!("Failed to load model: {}", e)))?;

    let fitted = Fitted {
        network,
        scaler: meta.scaler,
        columns: meta.feature_columns,
    };
    info!("Loaded {} model from {}", meta.kind, path.display());

    // Epoch settings only matter for refitting
    let settings = FitSettings {
        epochs: 0,
        learning_rate: 0.0,
    };
    match (meta.kind.as_str(), meta.hidden_dim) {
        ("logreg", _) => Ok(Box::new(LogisticRegression {
            settings,
            fitted: Some(fitted),
        })),
        ("mlp", Some(hidden_dim)) => Ok(Box::new(MlpClassifier {
            hidden_dim,
            settings,
            fitted: Some(fitted),
        })),
        (kind, _) => Err(PredictorError::Model(format!(
            "unsupported model kind '{}' in {}",
            kind,
            meta_path.display()
        ))),
    }
}
