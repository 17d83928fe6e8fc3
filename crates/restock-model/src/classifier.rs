//! Single decision tree over encoded inventory rows.

use restock_tree::{DecisionTree, DecisionTreeConfig, SplitCriterion};
use tracing::{info, instrument};

use crate::preprocess::EncodedRecord;
use crate::status::RestockStatus;
use crate::ModelError;

/// Hyperparameters for [`RestockClassifier`].
///
/// # Defaults
///
/// | Parameter           | Default    |
/// |---------------------|------------|
/// | `criterion`         | `Entropy`  |
/// | `max_depth`         | `None`     |
/// | `min_samples_split` | 2          |
/// | `min_samples_leaf`  | 1          |
/// | `seed`              | 42         |
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    tree: DecisionTreeConfig,
}

impl ClassifierConfig {
    /// Create a config with the defaults above.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: DecisionTreeConfig::new()
                .with_criterion(SplitCriterion::Entropy)
                .with_seed(42),
        }
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.tree = self.tree.with_max_depth(max_depth);
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.tree = self.tree.with_min_samples_split(min_samples_split);
        self
    }

    /// Set the minimum number of samples required in each leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.tree = self.tree.with_min_samples_leaf(min_samples_leaf);
        self
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.tree = self.tree.with_seed(seed);
        self
    }

    /// Return the underlying tree configuration.
    #[must_use]
    pub fn tree(&self) -> &DecisionTreeConfig {
        &self.tree
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A decision tree fitted on restock labels, with the feature names it was
/// trained on. Never mutated after fit.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    tree: DecisionTree,
    feature_names: Vec<String>,
}

impl TrainedModel {
    /// Return the fitted tree, read-only.
    #[must_use]
    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    /// Return the feature names, in encoding order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

#[derive(Debug, Clone)]
enum ModelState {
    Unfit,
    Fit(TrainedModel),
}

/// Fit-once restock classifier.
///
/// Starts unfit; [`RestockClassifier::fit`] moves it to fitted exactly once.
/// Predicting before fit, or fitting twice, is [`ModelError::FatalUsage`].
#[derive(Debug, Clone)]
pub struct RestockClassifier {
    config: ClassifierConfig,
    state: ModelState,
}

impl RestockClassifier {
    /// Create an unfit classifier.
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            state: ModelState::Unfit,
        }
    }

    /// Fit the tree on an encoded matrix and its labels.
    ///
    /// A table whose rows all share one status produces a single-leaf tree
    /// that predicts that status with probability 1.0.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::FatalUsage`] | the classifier is already fitted |
    /// | [`ModelError::InsufficientData`] | `matrix` is empty or `labels.len() != matrix.len()` |
    /// | [`ModelError::Tree`] | the tree rejects the data or configuration |
    #[instrument(skip_all, fields(n_rows = matrix.len()))]
    pub fn fit(
        &mut self,
        matrix: &[EncodedRecord],
        labels: &[RestockStatus],
        feature_names: &[String],
    ) -> Result<&TrainedModel, ModelError> {
        if matches!(self.state, ModelState::Fit(_)) {
            return Err(ModelError::FatalUsage {
                operation: "fit",
                reason: "classifier is already fitted; build a new one for a new dataset",
            });
        }
        if matrix.is_empty() || labels.len() != matrix.len() {
            return Err(ModelError::InsufficientData {
                n_rows: matrix.len(),
                n_labels: labels.len(),
            });
        }

        let features: Vec<Vec<f64>> = matrix.iter().map(|r| r.values().to_vec()).collect();
        let classes: Vec<usize> = labels.iter().map(|s| s.class_index()).collect();
        let tree = self.config.tree.fit(&features, &classes, RestockStatus::N_CLASSES)?;

        info!(
            n_rows = matrix.len(),
            n_nodes = tree.n_nodes(),
            depth = tree.depth(),
            "restock classifier fitted"
        );

        self.state = ModelState::Fit(TrainedModel {
            tree,
            feature_names: feature_names.to_vec(),
        });
        self.model()
    }

    /// Return the trained model.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::FatalUsage`] before fit.
    pub fn model(&self) -> Result<&TrainedModel, ModelError> {
        match &self.state {
            ModelState::Fit(model) => Ok(model),
            ModelState::Unfit => Err(ModelError::FatalUsage {
                operation: "predict",
                reason: "classifier has not been fitted",
            }),
        }
    }

    /// Return `true` once the classifier has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        matches!(self.state, ModelState::Fit(_))
    }

    /// Predict a status per row, in row order.
    ///
    /// # Errors
    ///
    /// [`ModelError::FatalUsage`] before fit; [`ModelError::Tree`] for rows of
    /// the wrong width.
    pub fn predict(&self, matrix: &[EncodedRecord]) -> Result<Vec<RestockStatus>, ModelError> {
        let tree = &self.model()?.tree;
        matrix
            .iter()
            .map(|row| RestockStatus::from_class_index(tree.predict(row.values())?))
            .collect()
    }

    /// Return one probability per status (in class-index order) for every row.
    ///
    /// # Errors
    ///
    /// Same conditions as [`RestockClassifier::predict`].
    pub fn predict_proba(&self, matrix: &[EncodedRecord]) -> Result<Vec<Vec<f64>>, ModelError> {
        let tree = &self.model()?.tree;
        matrix
            .iter()
            .map(|row| tree.predict_proba(row.values()).map_err(ModelError::from))
            .collect()
    }

    /// Predict a single row and report the winning probability as confidence.
    ///
    /// # Errors
    ///
    /// Same conditions as [`RestockClassifier::predict`].
    pub fn predict_one(&self, row: &EncodedRecord) -> Result<(RestockStatus, f64), ModelError> {
        let proba = self.model()?.tree.predict_proba(row.values())?;
        let (class, confidence) = most_probable(&proba);
        Ok((RestockStatus::from_class_index(class)?, confidence))
    }
}

/// Index and value of the highest probability; the lowest index wins ties.
fn most_probable(proba_row: &[f64]) -> (usize, f64) {
    proba_row
        .iter()
        .copied()
        .enumerate()
        .fold((0, 0.0), |best, (class, p)| if p > best.1 { (class, p) } else { best })
}

/// Maximum probability in a row; 0.0 for an empty row.
#[must_use]
pub fn confidence(proba_row: &[f64]) -> f64 {
    proba_row.iter().copied().fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: &[[f64; 2]]) -> Vec<EncodedRecord> {
        values.iter().map(|v| EncodedRecord::from_values(v.to_vec())).collect()
    }

    fn names() -> Vec<String> {
        vec!["a".into(), "b".into()]
    }

    #[test]
    fn predict_before_fit_is_fatal() {
        let clf = RestockClassifier::new(ClassifierConfig::new());
        let err = clf.predict(&rows(&[[0.0, 0.0]])).unwrap_err();
        assert!(matches!(err, ModelError::FatalUsage { .. }));
        let err = clf.predict_proba(&rows(&[[0.0, 0.0]])).unwrap_err();
        assert!(matches!(err, ModelError::FatalUsage { .. }));
        assert!(!clf.is_fitted());
    }

    #[test]
    fn second_fit_is_fatal() {
        let matrix = rows(&[[0.0, 0.0], [1.0, 1.0]]);
        let labels = [RestockStatus::NeedsRestock, RestockStatus::NoRestockNeeded];
        let mut clf = RestockClassifier::new(ClassifierConfig::new());
        clf.fit(&matrix, &labels, &names()).unwrap();
        let err = clf.fit(&matrix, &labels, &names()).unwrap_err();
        assert!(matches!(err, ModelError::FatalUsage { operation: "fit", .. }));
    }

    #[test]
    fn empty_or_mismatched_is_insufficient() {
        let mut clf = RestockClassifier::new(ClassifierConfig::new());
        let err = clf.fit(&[], &[], &names()).unwrap_err();
        assert!(matches!(err, ModelError::InsufficientData { n_rows: 0, n_labels: 0 }));

        let err = clf
            .fit(&rows(&[[0.0, 0.0]]), &[], &names())
            .unwrap_err();
        assert!(matches!(err, ModelError::InsufficientData { n_rows: 1, n_labels: 0 }));
        assert!(!clf.is_fitted());
    }

    #[test]
    fn wrong_width_row_is_tree_error() {
        let mut clf = RestockClassifier::new(ClassifierConfig::new());
        clf.fit(
            &rows(&[[0.0, 0.0], [1.0, 1.0]]),
            &[RestockStatus::NeedsRestock, RestockStatus::NoRestockNeeded],
            &names(),
        )
        .unwrap();
        let err = clf
            .predict(&[EncodedRecord::from_values(vec![1.0])])
            .unwrap_err();
        assert!(matches!(err, ModelError::Tree(_)));
    }

    #[test]
    fn confidence_is_max_probability() {
        assert!((confidence(&[0.25, 0.75]) - 0.75).abs() < f64::EPSILON);
        assert!((confidence(&[1.0, 0.0]) - 1.0).abs() < f64::EPSILON);
        assert_eq!(confidence(&[]), 0.0);
    }

    #[test]
    fn most_probable_prefers_lowest_index_on_tie() {
        assert_eq!(most_probable(&[0.5, 0.5]), (0, 0.5));
        assert_eq!(most_probable(&[0.2, 0.8]), (1, 0.8));
    }

    #[test]
    fn predict_one_matches_predict_on_tied_leaf() {
        // Identical rows with opposite labels leave a 50/50 root leaf.
        let matrix = rows(&[[3.0, 3.0], [3.0, 3.0]]);
        let labels = [RestockStatus::NoRestockNeeded, RestockStatus::NeedsRestock];
        let mut clf = RestockClassifier::new(ClassifierConfig::new());
        clf.fit(&matrix, &labels, &names()).unwrap();

        let (status, conf) = clf.predict_one(&matrix[0]).unwrap();
        assert_eq!(status, RestockStatus::NeedsRestock);
        assert_eq!(clf.predict(&matrix[..1]).unwrap(), vec![status]);
        assert!((conf - 0.5).abs() < f64::EPSILON);
    }
}
