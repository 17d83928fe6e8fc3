//! Accuracy regression tests for restock-tree.
//!
//! A deterministic synthetic dataset guards against algorithmic changes that
//! would degrade fitting quality or break reproducibility.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use restock_tree::{DecisionTreeConfig, Node, SplitCriterion};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic restock dataset
// ---------------------------------------------------------------------------

/// 400 samples, 6 features, 2 classes.
///
/// Class 0 when remaining stock is below 30% of opening stock, class 1 otherwise.
/// Features 0-2 (codes, price) are noise.
fn make_dataset(seed: u64) -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(400);
    let mut labels = Vec::with_capacity(400);
    for _ in 0..400 {
        let opening = rng.gen_range(20..300) as f64;
        let sold = (opening * rng.r#gen::<f64>()).floor();
        let remaining = opening - sold;
        labels.push(usize::from(remaining >= 0.3 * opening));
        features.push(vec![
            rng.gen_range(0..5) as f64,
            rng.gen_range(0..3) as f64,
            rng.gen_range(1_000..100_000) as f64,
            opening,
            sold,
            remaining,
        ]);
    }
    (features, labels)
}

fn accuracy(predicted: &[usize], truth: &[usize]) -> f64 {
    let correct = predicted.iter().zip(truth).filter(|(p, t)| p == t).count();
    correct as f64 / truth.len() as f64
}

/// An unlimited-depth tree reproduces its training labels (no duplicate rows
/// with conflicting labels exist in the generator).
#[test]
fn training_accuracy_is_perfect_without_depth_limit() {
    let (features, labels) = make_dataset(42);
    let tree = DecisionTreeConfig::new().fit(&features, &labels, 2).unwrap();
    let predicted = tree.predict_batch(&features).unwrap();
    assert!((accuracy(&predicted, &labels) - 1.0).abs() < f64::EPSILON);
}

/// Held-out accuracy on a second draw must beat the majority baseline.
#[test]
fn holdout_accuracy_beats_majority_baseline() {
    let (train_x, train_y) = make_dataset(42);
    let (test_x, test_y) = make_dataset(7);
    let tree = DecisionTreeConfig::new()
        .with_max_depth(Some(8))
        .fit(&train_x, &train_y, 2)
        .unwrap();
    let predicted = tree.predict_batch(&test_x).unwrap();

    let ones = test_y.iter().filter(|&&y| y == 1).count();
    let baseline = ones.max(test_y.len() - ones) as f64 / test_y.len() as f64;
    let acc = accuracy(&predicted, &test_y);
    assert!(acc > baseline, "holdout accuracy {acc} <= baseline {baseline}");
    assert!(acc > 0.8, "holdout accuracy {acc} <= 0.8");
}

/// Two fits on the same data produce identical trees node for node.
#[test]
fn refit_produces_identical_tree() {
    let (features, labels) = make_dataset(42);
    let config = DecisionTreeConfig::new().with_criterion(SplitCriterion::Entropy);
    let a = config.fit(&features, &labels, 2).unwrap();
    let b = config.fit(&features, &labels, 2).unwrap();
    assert_eq!(a.n_nodes(), b.n_nodes());
    for (na, nb) in a.nodes().iter().zip(b.nodes()) {
        match (na, nb) {
            (
                Node::Split { feature: fa, threshold: ta, .. },
                Node::Split { feature: fb, threshold: tb, .. },
            ) => {
                assert_eq!(fa, fb);
                assert_eq!(ta.to_bits(), tb.to_bits());
            }
            (Node::Leaf { class_counts: ca, .. }, Node::Leaf { class_counts: cb, .. }) => {
                assert_eq!(ca, cb);
            }
            _ => panic!("node kinds differ"),
        }
    }
}

/// Every probability row sums to 1 within 1e-6.
#[test]
fn probability_rows_sum_to_one() {
    let (features, labels) = make_dataset(42);
    let tree = DecisionTreeConfig::new()
        .with_max_depth(Some(3))
        .fit(&features, &labels, 2)
        .unwrap();
    let (test_x, _) = make_dataset(99);
    for row in tree.predict_proba_batch(&test_x).unwrap() {
        assert_eq!(row.len(), 2);
        let sum: f64 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "row sums to {sum}");
    }
}

/// Neighbouring and near-overflow values still separate into two pure leaves.
#[test]
fn extreme_but_finite_values_fit() {
    let cases = [
        [1.0 + f64::EPSILON, 1.0 + 2.0 * f64::EPSILON],
        [1e308, 1.7e308],
    ];
    for [lo, hi] in cases {
        let tree = DecisionTreeConfig::new()
            .fit(&[vec![lo], vec![hi]], &[0, 1], 2)
            .unwrap();
        assert_eq!(tree.n_nodes(), 3, "values {lo} and {hi}");
        assert_eq!(tree.predict(&[lo]).unwrap(), 0);
        assert_eq!(tree.predict(&[hi]).unwrap(), 1);
    }
}
