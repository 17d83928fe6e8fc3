use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Shannon entropy in bits: -Σ(p_i · log2(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its class counts.
    ///
    /// An empty node (`n_samples == 0`) has impurity 0.0.
    ///
    /// With `p_i = count_i / n_samples`, `Gini` is `1 - Σ(p_i²)` and
    /// `Entropy` is `-Σ(p_i · log2(p_i))` over the classes present, so a
    /// balanced binary node scores exactly 1.0 bit.
    #[must_use]
    pub fn impurity(&self, class_counts: &[usize], n_samples: usize) -> Impurity {
        if n_samples == 0 {
            return Impurity::new(0.0);
        }
        let n = n_samples as f64;
        let proportions = class_counts
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| c as f64 / n);
        let value = match self {
            SplitCriterion::Gini => 1.0 - proportions.map(|p| p * p).sum::<f64>(),
            SplitCriterion::Entropy => proportions.map(|p| p * (1.0 / p).log2()).sum::<f64>(),
        };
        // Rounding can leave a pure node a hair below zero.
        Impurity::new(if value > 0.0 { value } else { 0.0 })
    }

    /// Return the lowercase criterion name, as shown next to node impurities.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SplitCriterion::Gini => "gini",
            SplitCriterion::Entropy => "entropy",
        }
    }
}

/// The chosen split of a node, with the samples routed to each side.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    /// Samples with `value <= threshold` go left.
    pub(crate) threshold: f64,
    /// `n·I(parent) - n_left·I(left) - n_right·I(right)`.
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Class counts and impurity of the node being split.
struct ParentNode<'a> {
    labels: &'a [usize],
    counts: Vec<usize>,
    weighted_impurity: f64,
    criterion: SplitCriterion,
    min_samples_leaf: usize,
}

impl ParentNode<'_> {
    /// Best `(threshold, decrease)` on one column, or `None` if the column
    /// has no admissible boundary.
    ///
    /// `sorted` holds `(value, sample)` pairs in ascending value order.
    fn best_threshold(&self, sorted: &[(f64, usize)]) -> Option<(f64, f64)> {
        let n = sorted.len();
        let mut left = vec![0usize; self.counts.len()];
        let mut right = self.counts.clone();
        let mut best: Option<(f64, f64)> = None;

        for (i, pair) in sorted.windows(2).enumerate() {
            let [(value, sample), (next_value, _)] = [pair[0], pair[1]];
            let class = self.labels[sample];
            left[class] += 1;
            right[class] -= 1;

            let n_left = i + 1;
            let n_right = n - n_left;
            if value == next_value || n_left.min(n_right) < self.min_samples_leaf {
                continue;
            }

            let decrease = self.weighted_impurity
                - n_left as f64 * self.criterion.impurity(&left, n_left).value()
                - n_right as f64 * self.criterion.impurity(&right, n_right).value();
            if best.is_none_or(|(_, incumbent)| decrease > incumbent) {
                best = Some((midpoint(value, next_value), decrease));
            }
        }
        best
    }
}

/// Threshold between two adjacent distinct values, `lo < hi`.
///
/// Falls back to `lo` when the midpoint rounds up to `hi` (neighbouring
/// floats) or overflows, so `lo <= threshold < hi` always holds.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid.is_finite() && mid < hi { mid } else { lo }
}

/// Find the best split among the given candidate features.
///
/// Tie rule: candidates are visited in the order of `candidate_features`
/// (callers pass them in ascending column order) and thresholds in
/// ascending order; a candidate only replaces the incumbent when its
/// impurity decrease is strictly greater. The first-encountered best
/// split therefore wins, and identical inputs always yield the same split.
///
/// Returns `None` when no valid split exists: all values identical, every
/// boundary would violate `min_samples_leaf`, or the threshold leaves one
/// side empty.
///
/// `features` is column-major (`features[feature_idx][sample_idx]`) and
/// `sample_indices` index into its inner vectors.
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    labels: &[usize],
    sample_indices: &[usize],
    n_classes: usize,
    criterion: SplitCriterion,
    candidate_features: &[usize],
    min_samples_leaf: usize,
) -> Option<SplitResult> {
    let n_samples = sample_indices.len();
    if n_samples < 2 {
        return None;
    }

    let mut counts = vec![0usize; n_classes];
    sample_indices.iter().for_each(|&si| counts[labels[si]] += 1);
    let parent = ParentNode {
        labels,
        weighted_impurity: n_samples as f64 * criterion.impurity(&counts, n_samples).value(),
        counts,
        criterion,
        min_samples_leaf,
    };

    let mut best: Option<(usize, f64, f64)> = None;
    for &feature in candidate_features {
        let column = &features[feature];
        let mut sorted: Vec<(f64, usize)> =
            sample_indices.iter().map(|&si| (column[si], si)).collect();
        // Stable, so equal values keep sample order.
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        if let Some((threshold, decrease)) = parent.best_threshold(&sorted)
            && best.is_none_or(|(_, _, incumbent)| decrease > incumbent)
        {
            best = Some((feature, threshold, decrease));
        }
    }

    let (feature, threshold, impurity_decrease) = best?;
    let column = &features[feature];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .copied()
        .partition(|&si| column[si] <= threshold);
    if left_indices.is_empty() || right_indices.is_empty() {
        return None;
    }

    Some(SplitResult {
        feature: FeatureIndex::new(feature),
        threshold,
        impurity_decrease,
        left_indices,
        right_indices,
    })
}
