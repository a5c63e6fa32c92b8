//! Prediction and inference
//!
//! Load trained models and game history, generate matchup predictions.

pub mod cache;
pub mod inference;

pub use cache::FileCache;
pub use inference::Predictor;
