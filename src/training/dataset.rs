//! Training data preparation: feature selection, chronological split, scaling

use serde::{Deserialize, Serialize};

use crate::features::{FeatureRow, FEATURE_COLUMNS};
use crate::{PredictorError, Result};

/// Ordered subset of `preferred` usable as model inputs
///
/// Names that are not feature columns are skipped. Fails when fewer than
/// `min_features` remain.
pub fn pick_features(preferred: &[String], min_features: usize) -> Result<Vec<String>> {
    let mut used: Vec<String> = Vec::new();
    for name in preferred {
        if FEATURE_COLUMNS.contains(&name.as_str()) && !used.contains(name) {
            used.push(name.clone());
        }
    }
    if used.len() < min_features {
        return Err(PredictorError::Validation(format!(
            "Not enough features. Found {:?}, need >= {} among {:?}",
            used, min_features, preferred
        )));
    }
    Ok(used)
}

/// Chronological split: the last `test_frac` of rows (at least `min_test`)
/// become the test fold, always leaving one training row
///
/// A single row goes to training and the test fold is empty.
pub fn time_split<T>(rows: &[T], test_frac: f64, min_test: usize) -> (&[T], &[T]) {
    let n = rows.len();
    let n_test = ((test_frac * n as f64).round() as usize)
        .max(min_test)
        .min(n.saturating_sub(1));
    rows.split_at(n - n_test)
}

/// Labelled samples for a fixed column order
#[derive(Debug, Clone, PartialEq)]
pub struct Samples {
    pub columns: Vec<String>,
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<u8>,
}

impl Samples {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Extract the named columns and the home-win label
pub fn to_xy(rows: &[FeatureRow], columns: &[String]) -> Result<Samples> {
    let mut features = Vec::with_capacity(rows.len());
    for row in rows {
        let values = columns
            .iter()
            .map(|c| {
                row.feature(c).map(|v| v as f32).ok_or_else(|| {
                    PredictorError::Validation(format!("unknown feature column {c}"))
                })
            })
            .collect::<Result<Vec<f32>>>()?;
        features.push(values);
    }
    Ok(Samples {
        columns: columns.to_vec(),
        features,
        labels: rows.iter().map(|r| r.home_win).collect(),
    })
}

/// Home-win rate of a fold (also the accuracy of always picking home)
pub fn baseline_home_rate(rows: &[FeatureRow]) -> f64 {
    if rows.is_empty() {
        return f64::NAN;
    }
    rows.iter().map(|r| r.home_win as f64).sum::<f64>() / rows.len() as f64
}

/// Per-column z-score parameters fitted on the training fold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    #[serde(rename = "feature_mean")]
    pub mean: Vec<f32>,
    #[serde(rename = "feature_std")]
    pub std: Vec<f32>,
}

impl FeatureScaler {
    pub fn fit(rows: &[Vec<f32>]) -> Self {
        let dim = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f32;

        let mut sum = vec![0.0f32; dim];
        let mut sum_sq = vec![0.0f32; dim];
        for row in rows {
            for (j, v) in row.iter().enumerate() {
                sum[j] += v;
                sum_sq[j] += v * v;
            }
        }

        let mean: Vec<f32> = sum.iter().map(|s| s / n).collect();
        let std: Vec<f32> = sum_sq
            .iter()
            .zip(mean.iter())
            .map(|(sq, m)| (sq / n - m * m).max(0.0).sqrt().max(0.001))
            .collect();

        FeatureScaler { mean, std }
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    use super::*;
    use crate::TeamId;

    fn rows(n: usize) -> Vec<FeatureRow> {
        (0..n)
            .map(|i| FeatureRow {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64),
                home_team: TeamId("NYK".into()),
                away_team: TeamId("BOS".into()),
                delta_off: i as f64,
                delta_def: -(i as f64),
                delta_rest: 1.0,
                delta_elo: 10.0 * i as f64,
                home_win: (i % 2) as u8,
            })
            .collect()
    }

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_pick_features_keeps_preferred_order() {
        let used = pick_features(&names(&["delta_elo", "bogus", "delta_off"]), 2).unwrap();
        assert_eq!(used, names(&["delta_elo", "delta_off"]));
    }

    #[test]
    fn test_pick_features_too_few() {
        let err = pick_features(&names(&["delta_elo", "bogus"]), 2).unwrap_err();
        assert!(matches!(err, PredictorError::Validation(_)));
    }

    #[test]
    fn test_time_split_sizes() {
        let data = rows(8);
        let (train, test) = time_split(&data, 0.25, 1);
        assert_eq!((train.len(), test.len()), (6, 2));
        assert!(train.last().unwrap().date < test[0].date);

        let data = rows(3);
        let (train, test) = time_split(&data, 0.1, 1);
        assert_eq!((train.len(), test.len()), (2, 1));

        // Test fold never swallows the whole table
        let data = rows(2);
        let (train, test) = time_split(&data, 0.9, 5);
        assert_eq!((train.len(), test.len()), (1, 1));

        let data = rows(1);
        let (train, test) = time_split(&data, 0.25, 1);
        assert_eq!((train.len(), test.len()), (1, 0));

        let (train, test) = time_split::<FeatureRow>(&[], 0.25, 1);
        assert!(train.is_empty() && test.is_empty());
    }

    #[test]
    fn test_to_xy_column_order() {
        let data = rows(3);
        let samples = to_xy(&data, &names(&["delta_elo", "delta_off"])).unwrap();
        assert_eq!(samples.features[2], vec![20.0, 2.0]);
        assert_eq!(samples.labels, vec![0, 1, 0]);
    }

    #[test]
    fn test_baseline_home_rate() {
        assert_relative_eq!(baseline_home_rate(&rows(4)), 0.5);
        assert!(baseline_home_rate(&[]).is_nan());
    }

    #[test]
    fn test_scaler_standardizes() {
        let data = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = FeatureScaler::fit(&data);
        assert_relative_eq!(scaler.mean[0], 2.0);
        assert_relative_eq!(scaler.std[0], 1.0);
        // Constant column gets the floor instead of dividing by zero
        assert_relative_eq!(scaler.std[1], 0.001);
        assert_eq!(scaler.transform(&[3.0, 5.0]), vec![1.0, 0.0]);
    }
}
