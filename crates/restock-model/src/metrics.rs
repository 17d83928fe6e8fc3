//! Training-set evaluation: confusion matrix, baseline and importances.

use std::fmt;

use crate::status::RestockStatus;
use crate::ModelError;

/// Confusion matrix over the restock label space.
///
/// Entry `[true][predicted]` counts samples with true status `true`
/// predicted as `predicted`, both in class-index order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConfusionMatrix {
    matrix: [[usize; RestockStatus::N_CLASSES]; RestockStatus::N_CLASSES],
}

/// Precision, recall and F1 for one status.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClassMetrics {
    /// The status these metrics describe.
    pub status: RestockStatus,
    /// TP / (TP + FP); 0.0 if the status was never predicted.
    pub precision: f64,
    /// TP / (TP + FN); 0.0 if the status never occurs.
    pub recall: f64,
    /// Harmonic mean of precision and recall; 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples with this status.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from aligned true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::InsufficientData`] | no labels |
    /// | [`ModelError::LengthMismatch`] | the slices differ in length |
    pub fn from_labels(
        truth: &[RestockStatus],
        predicted: &[RestockStatus],
    ) -> Result<Self, ModelError> {
        if truth.is_empty() {
            return Err(ModelError::InsufficientData {
                n_rows: 0,
                n_labels: predicted.len(),
            });
        }
        if truth.len() != predicted.len() {
            return Err(ModelError::LengthMismatch {
                n_rows: truth.len(),
                n_labels: predicted.len(),
            });
        }
        let mut matrix = [[0usize; RestockStatus::N_CLASSES]; RestockStatus::N_CLASSES];
        for (t, p) in truth.iter().zip(predicted) {
            matrix[t.class_index()][p.class_index()] += 1;
        }
        Ok(Self { matrix })
    }

    /// Count of samples with status `truth` predicted as `predicted`.
    #[must_use]
    pub fn get(&self, truth: RestockStatus, predicted: RestockStatus) -> usize {
        self.matrix[truth.class_index()][predicted.class_index()]
    }

    /// Total number of samples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Proportion of samples on the diagonal.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..RestockStatus::N_CLASSES).map(|i| self.matrix[i][i]).sum();
        match self.total() {
            0 => 0.0,
            total => correct as f64 / total as f64,
        }
    }

    /// Accuracy of always predicting the most frequent true status.
    #[must_use]
    pub fn majority_baseline(&self) -> f64 {
        let largest = self
            .matrix
            .iter()
            .map(|row| row.iter().sum::<usize>())
            .max()
            .unwrap_or(0);
        match self.total() {
            0 => 0.0,
            total => largest as f64 / total as f64,
        }
    }

    /// Per-status precision, recall, F1 and support, in class-index order.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        RestockStatus::ALL
            .iter()
            .map(|&status| {
                let c = status.class_index();
                let tp = self.matrix[c][c];
                let predicted: usize = self.matrix.iter().map(|row| row[c]).sum();
                let support: usize = self.matrix[c].iter().sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    status,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = RestockStatus::ALL
            .iter()
            .map(|s| s.as_str().len())
            .max()
            .unwrap_or(0);
        write!(f, "{:>width$}", "")?;
        for status in RestockStatus::ALL {
            write!(f, " | {:>width$}", status.as_str())?;
        }
        writeln!(f)?;
        for status in RestockStatus::ALL {
            write!(f, "{:>width$}", status.as_str())?;
            for count in &self.matrix[status.class_index()] {
                write!(f, " | {count:>width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// A feature with its normalized importance and 1-based rank.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Mean decrease in impurity, normalized to sum to 1.0.
    pub importance: f64,
    /// 1 = most important.
    pub rank: usize,
}

/// Pair importances with names and rank them, most important first.
///
/// Equal importances keep schema order.
pub(crate) fn rank_importances(importances: &[f64], names: &[String]) -> Vec<RankedFeature> {
    let mut features: Vec<RankedFeature> = names
        .iter()
        .zip(importances)
        .map(|(name, &importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();
    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feature) in features.iter_mut().enumerate() {
        feature.rank = i + 1;
    }
    features
}

/// How well the fitted tree reproduces its own training labels.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrainingEvaluation {
    /// Training-set accuracy.
    pub accuracy: f64,
    /// Accuracy of predicting the majority status everywhere.
    pub majority_baseline: f64,
    /// Confusion matrix of training predictions.
    pub confusion: ConfusionMatrix,
    /// Per-status metrics.
    pub class_metrics: Vec<ClassMetrics>,
    /// Features ranked by importance.
    pub feature_importances: Vec<RankedFeature>,
    /// Nodes in the fitted tree.
    pub n_nodes: usize,
    /// Leaves in the fitted tree.
    pub n_leaves: usize,
    /// Depth of the fitted tree.
    pub depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use RestockStatus::{NeedsRestock as N, NoRestockNeeded as Y};

    #[test]
    fn perfect_predictions() {
        let labels = [N, N, Y];
        let cm = ConfusionMatrix::from_labels(&labels, &labels).unwrap();
        assert!((cm.accuracy() - 1.0).abs() < f64::EPSILON);
        assert!((cm.majority_baseline() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(cm.get(N, N), 2);
        assert_eq!(cm.get(Y, N), 0);
        for m in cm.class_metrics() {
            assert!((m.f1 - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn off_diagonal_counts() {
        let cm = ConfusionMatrix::from_labels(&[N, N, Y, Y], &[N, Y, Y, N]).unwrap();
        assert_eq!(cm.get(N, Y), 1);
        assert_eq!(cm.get(Y, N), 1);
        assert!((cm.accuracy() - 0.5).abs() < f64::EPSILON);
        let metrics = cm.class_metrics();
        assert_eq!(metrics[0].status, N);
        assert_eq!(metrics[0].support, 2);
        assert!((metrics[0].precision - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn never_predicted_class_has_zero_precision() {
        let cm = ConfusionMatrix::from_labels(&[N, Y], &[N, N]).unwrap();
        let metrics = cm.class_metrics();
        assert_eq!(metrics[1].precision, 0.0);
        assert_eq!(metrics[1].f1, 0.0);
    }

    #[test]
    fn rejects_empty_and_mismatched() {
        assert!(matches!(
            ConfusionMatrix::from_labels(&[], &[]),
            Err(ModelError::InsufficientData { .. })
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[N, Y], &[N]),
            Err(ModelError::LengthMismatch { n_rows: 2, n_labels: 1 })
        ));
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let ranked = rank_importances(&[0.25, 0.5, 0.25], &names);
        let order: Vec<&str> = ranked.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn display_lists_every_status() {
        let cm = ConfusionMatrix::from_labels(&[N, Y], &[N, Y]).unwrap();
        let text = cm.to_string();
        assert!(text.contains("Needs Restock"));
        assert!(text.contains("No Restock Needed"));
        assert_eq!(text.lines().count(), 3);
    }
}
