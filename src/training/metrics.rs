//! Evaluation metrics and model selection

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Fraction of rows where `prob >= 0.5` agrees with the label
pub fn accuracy(labels: &[u8], probs: &[f32]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = labels
        .iter()
        .zip(probs.iter())
        .filter(|(y, p)| (**p >= 0.5) == (**y == 1))
        .count();
    correct as f64 / labels.len() as f64
}

/// Area under the ROC curve (rank statistic, ties averaged)
///
/// Returns 0.5 when the labels contain a single class.
pub fn roc_auc(labels: &[u8], probs: &[f32]) -> f64 {
    let positives = labels.iter().filter(|&&y| y == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|&a, &b| probs[a].partial_cmp(&probs[b]).unwrap_or(Ordering::Equal));

    // Average 1-based ranks over tied scores
    let mut ranks = vec![0.0f64; probs.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && probs[order[j + 1]] == probs[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let positive_rank_sum: f64 = labels
        .iter()
        .zip(ranks.iter())
        .filter(|(y, _)| **y == 1)
        .map(|(_, r)| r)
        .sum();
    let p = positives as f64;
    (positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64)
}

/// Test-fold scores for one trained model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub n_train: usize,
    pub n_test: usize,
    pub accuracy: f64,
    pub roc_auc: f64,
}

impl RunMetrics {
    pub fn evaluate(n_train: usize, labels: &[u8], probs: &[f32]) -> Self {
        RunMetrics {
            n_train,
            n_test: labels.len(),
            accuracy: accuracy(labels, probs),
            roc_auc: roc_auc(labels, probs),
        }
    }
}

impl fmt::Display for RunMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accuracy={:.3} roc_auc={:.3} (train={}, test={})",
            self.accuracy, self.roc_auc, self.n_train, self.n_test
        )
    }
}

/// Ranking key: ROC AUC first (NaN ranks lowest), then accuracy
pub fn selection_key(metrics: &RunMetrics) -> (f64, f64) {
    let roc = if metrics.roc_auc.is_nan() {
        f64::NEG_INFINITY
    } else {
        metrics.roc_auc
    };
    (roc, metrics.accuracy)
}

/// Best run by [`selection_key`]; the earliest run wins ties
pub fn pick_best(runs: &[(String, RunMetrics)]) -> Option<&(String, RunMetrics)> {
    let mut best: Option<&(String, RunMetrics)> = None;
    for run in runs {
        let better = match best {
            None => true,
            Some((_, current)) => selection_key(&run.1)
                .partial_cmp(&selection_key(current))
                .is_some_and(|o| o == Ordering::Greater),
        };
        if better {
            best = Some(run);
        }
    }
    best
}

/// Contents of `metrics.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub n_train: usize,
    pub n_test: usize,
    pub accuracy: f64,
    pub roc_auc: f64,
    pub features_used: Vec<String>,
    pub best_model: String,
    pub runs: BTreeMap<String, RunMetrics>,
    pub baseline_home_rate: f64,
    pub baseline_home_acc: f64,
}
