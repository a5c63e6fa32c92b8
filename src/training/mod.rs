//! Model training
//!
//! Dataset preparation, classifiers, evaluation metrics and the trainer that
//! selects and persists the best model.

pub mod classifier;
pub mod dataset;
pub mod metrics;
pub mod trainer;

pub use classifier::{
    build_classifier, load_classifier, Classifier, LogisticRegression, MlpClassifier, ModelMeta,
    AVAILABLE_MODELS,
};
pub use dataset::{baseline_home_rate, pick_features, time_split, to_xy, FeatureScaler, Samples};
pub use metrics::{accuracy, pick_best, roc_auc, selection_key, RunMetrics, TrainingReport};
pub use trainer::{Trainer, BEST_MODEL_FILE, METRICS_FILE};
