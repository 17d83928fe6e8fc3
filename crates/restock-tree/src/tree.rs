use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    TreeError,
    node::{Impurity, Node, NodeIndex, majority},
    split::{SplitCriterion, find_best_split},
};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Entropy`             |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `seed`              | 42                    |
///
/// The seed only matters when `max_features` restricts the candidate
/// features per node; with all features considered, fitting draws no
/// random numbers at all.
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Entropy,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth.
    ///
    /// `None` means grow until all leaves are pure or stopping conditions
    /// are met. `Some(d)` limits depth to `d` levels (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the maximum number of features to consider at each split.
    ///
    /// `None` means consider all features.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed used for feature subsampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the minimum samples required to split a node.
    #[must_use]
    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Return the minimum samples required in each leaf.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the maximum features to consider per split, if set.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a decision tree on the provided row-major dataset.
    ///
    /// `features[sample_idx][feature_idx]`, row-major layout.
    /// `labels[sample_idx]`: class labels in `[0, n_classes)`.
    ///
    /// The class space is fixed by `n_classes` rather than inferred from the
    /// labels, so every leaf distribution has the same width even when some
    /// class never occurs in the training set. A single-class dataset yields
    /// a one-leaf tree.
    ///
    /// # Errors
    ///
    /// | Variant                                | When                                            |
    /// |----------------------------------------|-------------------------------------------------|
    /// | [`TreeError::InvalidClassCount`]       | `n_classes` is zero                             |
    /// | [`TreeError::EmptyDataset`]            | `features` is empty                             |
    /// | [`TreeError::ZeroFeatures`]            | rows have zero feature columns                  |
    /// | [`TreeError::LabelCountMismatch`]      | `labels.len() != features.len()`                |
    /// | [`TreeError::FeatureCountMismatch`]    | rows have inconsistent lengths                  |
    /// | [`TreeError::NonFiniteValue`]          | any value is NaN or infinite                    |
    /// | [`TreeError::LabelOutOfRange`]         | a label is `>= n_classes`                       |
    /// | [`TreeError::InvalidMaxFeatures`]      | `max_features` resolves outside [1, n_features] |
    /// | [`TreeError::InvalidMaxDepth`]         | `max_depth` is `Some(0)`                        |
    /// | [`TreeError::InvalidMinSamplesSplit`]  | `min_samples_split` < 2                         |
    /// | [`TreeError::InvalidMinSamplesLeaf`]   | `min_samples_leaf` < 1                          |
    #[instrument(skip(self, features, labels), fields(n_samples = features.len()))]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<DecisionTree, TreeError> {
        // --- Validate inputs ---
        if n_classes == 0 {
            return Err(TreeError::InvalidClassCount { n_classes });
        }
        if features.is_empty() {
            return Err(TreeError::EmptyDataset);
        }

        let n_samples = features.len();
        let n_features = features[0].len();

        if n_features == 0 {
            return Err(TreeError::ZeroFeatures);
        }
        if labels.len() != n_samples {
            return Err(TreeError::LabelCountMismatch {
                n_samples,
                n_labels: labels.len(),
            });
        }

        for (sample_index, row) in features.iter().enumerate() {
            if row.len() != n_features {
                return Err(TreeError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    sample_index,
                });
            }
            if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
                return Err(TreeError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }

        if let Some((sample_index, &label)) =
            labels.iter().enumerate().find(|&(_, &l)| l >= n_classes)
        {
            return Err(TreeError::LabelOutOfRange {
                label,
                n_classes,
                sample_index,
            });
        }

        // --- Validate config ---
        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(TreeError::InvalidMaxDepth { max_depth: 0 });
        }

        if self.min_samples_split < 2 {
            return Err(TreeError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }

        if self.min_samples_leaf < 1 {
            return Err(TreeError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }

        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(TreeError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        debug!(
            n_samples,
            n_features,
            n_classes,
            max_features,
            criterion = self.criterion.name(),
            "fitting decision tree"
        );

        // Column-major layout for split finding.
        let col_features: Vec<Vec<f64>> = (0..n_features)
            .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
            .collect();

        let mut grower = Grower {
            col_features: &col_features,
            labels,
            n_classes,
            max_features,
            config: self,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        let sample_indices: Vec<usize> = (0..n_samples).collect();
        let root = grower.grow(&sample_indices, 0);
        let nodes = grower.arena;

        debug!(
            root_index = root.index(),
            n_nodes = nodes.len(),
            "decision tree built"
        );

        Ok(DecisionTree {
            nodes,
            n_features,
            n_classes,
            criterion: self.criterion,
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursive tree construction state.
struct Grower<'a> {
    col_features: &'a [Vec<f64>],
    labels: &'a [usize],
    n_classes: usize,
    max_features: usize,
    config: &'a DecisionTreeConfig,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl Grower<'_> {
    /// Build the subtree for `sample_indices` and return its arena index.
    ///
    /// Nodes are laid out in pre-order: a split reserves its slot before
    /// its children are grown, so the root is always index 0.
    fn grow(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let n_samples = sample_indices.len();

        let mut class_counts = vec![0usize; self.n_classes];
        for &si in sample_indices {
            class_counts[self.labels[si]] += 1;
        }
        let impurity = self.config.criterion.impurity(&class_counts, n_samples);

        let depth_exceeded = self
            .config
            .max_depth
            .is_some_and(|max_d| depth >= max_d);
        let too_few = n_samples < self.config.min_samples_split;
        let pure = impurity.value() == 0.0;

        if too_few || pure || depth_exceeded {
            return self.push_leaf(class_counts, impurity, n_samples);
        }

        let candidates = self.candidate_features();
        let Some(split) = find_best_split(
            self.col_features,
            self.labels,
            sample_indices,
            self.n_classes,
            self.config.criterion,
            &candidates,
            self.config.min_samples_leaf,
        ) else {
            return self.push_leaf(class_counts, impurity, n_samples);
        };

        // Reserve the slot, grow children, then overwrite with the split.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction: 0,
            distribution: vec![0.0; self.n_classes],
            class_counts: Vec::new(),
            impurity,
            n_samples,
        });

        let left = self.grow(&split.left_indices, depth + 1);
        let right = self.grow(&split.right_indices, depth + 1);

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            class_counts,
            impurity_decrease: split.impurity_decrease,
        };

        NodeIndex::new(node_idx)
    }

    fn push_leaf(
        &mut self,
        class_counts: Vec<usize>,
        impurity: Impurity,
        n_samples: usize,
    ) -> NodeIndex {
        let total = n_samples as f64;
        let distribution: Vec<f64> = class_counts.iter().map(|&c| c as f64 / total).collect();
        let prediction = majority(&class_counts);
        let idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction,
            distribution,
            class_counts,
            impurity,
            n_samples,
        });
        NodeIndex::new(idx)
    }

    /// Features to evaluate at the current node, in ascending column order.
    ///
    /// With subsampling, a partial Fisher-Yates draw picks the subset and the
    /// result is re-sorted so the split tie rule still follows column order.
    fn candidate_features(&mut self) -> Vec<usize> {
        let n_features = self.col_features.len();
        if self.max_features >= n_features {
            return (0..n_features).collect();
        }
        let mut order: Vec<usize> = (0..n_features).collect();
        for i in 0..self.max_features {
            let j = self.rng.gen_range(i..n_features);
            order.swap(i, j);
        }
        order.truncate(self.max_features);
        order.sort_unstable();
        order
    }
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>` in pre-order with index references.
/// Immutable after [`DecisionTreeConfig::fit`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) criterion: SplitCriterion,
}

impl DecisionTree {
    /// Predict the class label for a single sample.
    ///
    /// Traverses from the root (index 0): at each `Split`, goes left when
    /// `sample[feature] <= threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::PredictionFeatureMismatch`] when `sample.len() != n_features`
    /// and [`TreeError::NonFiniteValue`] when the sample contains NaN or infinity.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, TreeError> {
        self.leaf_for(sample, 0).map(|leaf| leaf.prediction)
    }

    /// Return the class probability distribution for a single sample.
    ///
    /// The returned `Vec` has length `n_classes` and sums to 1.0.
    ///
    /// # Errors
    ///
    /// Same conditions as [`DecisionTree::predict`].
    pub fn predict_proba(&self, sample: &[f64]) -> Result<Vec<f64>, TreeError> {
        self.leaf_for(sample, 0).map(|leaf| leaf.distribution.to_vec())
    }

    /// Predict class labels for a batch of samples, preserving order.
    ///
    /// # Errors
    ///
    /// Returns the first per-sample error, with `sample_index` set for
    /// non-finite values.
    pub fn predict_batch(&self, samples: &[Vec<f64>]) -> Result<Vec<usize>, TreeError> {
        samples
            .iter()
            .enumerate()
            .map(|(i, sample)| self.leaf_for(sample, i).map(|leaf| leaf.prediction))
            .collect()
    }

    /// Return class probability distributions for a batch of samples, preserving order.
    ///
    /// # Errors
    ///
    /// Same conditions as [`DecisionTree::predict_batch`].
    pub fn predict_proba_batch(&self, samples: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, TreeError> {
        samples
            .iter()
            .enumerate()
            .map(|(i, sample)| self.leaf_for(sample, i).map(|leaf| leaf.distribution.to_vec()))
            .collect()
    }

    /// Compute Mean Decrease in Impurity (MDI) feature importances.
    ///
    /// For each `Split` node, the `impurity_decrease` is accumulated by
    /// feature index, then the totals are normalized so they sum to 1.0.
    /// Returns a `Vec` of length `n_features`; all zeros when the tree is
    /// a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Return the nodes in pre-order; the root is at index 0.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the node at `index`, if it exists.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.index())
    }

    /// Return the number of features this tree was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the size of the class space.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the criterion the tree was grown with.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }

        max_depth
    }

    fn leaf_for(&self, sample: &[f64], sample_index: usize) -> Result<LeafRef<'_>, TreeError> {
        if sample.len() != self.n_features {
            return Err(TreeError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        if let Some(feature_index) = sample.iter().position(|v| !v.is_finite()) {
            return Err(TreeError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
        Ok(self.traverse(sample))
    }

    /// Walk from the root to the leaf `sample` falls into.
    fn traverse(&self, sample: &[f64]) -> LeafRef<'_> {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf {
                    prediction,
                    distribution,
                    ..
                } => {
                    return LeafRef {
                        prediction: *prediction,
                        distribution,
                    };
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}

/// The parts of a leaf that prediction reads.
struct LeafRef<'a> {
    prediction: usize,
    distribution: &'a [f64],
}
