//! Criterion benchmarks for restock-tree: fitting and batch prediction.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use restock_tree::DecisionTreeConfig;

/// Catalog-sized synthetic inventory: two categorical codes and four stock figures.
fn make_inventory(n_samples: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let opening = rng.gen_range(10..500) as f64;
        let sold = (opening * rng.r#gen::<f64>()).floor();
        let remaining = opening - sold;
        labels.push(usize::from(remaining >= opening * 0.3));
        features.push(vec![
            rng.gen_range(0..6) as f64,
            rng.gen_range(0..4) as f64,
            rng.gen_range(1_000..200_000) as f64,
            opening,
            sold,
            remaining,
        ]);
    }
    (features, labels)
}

fn bench_fit(c: &mut Criterion) {
    let (features, labels) = make_inventory(5_000, 42);
    let cfg = DecisionTreeConfig::new();

    c.bench_function("tree_fit_5000x6_entropy", |b| {
        b.iter(|| cfg.fit(&features, &labels, 2).unwrap());
    });
}

fn bench_predict_batch(c: &mut Criterion) {
    let (features, labels) = make_inventory(5_000, 42);
    let tree = DecisionTreeConfig::new().fit(&features, &labels, 2).unwrap();

    c.bench_function("tree_predict_proba_batch_5000x6", |b| {
        b.iter(|| tree.predict_proba_batch(&features).unwrap());
    });
}

criterion_group!(benches, bench_fit, bench_predict_batch);
criterion_main!(benches);
