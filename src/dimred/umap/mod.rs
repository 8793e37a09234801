//! Uniform manifold approximation and projection.
//!
//! Compact 2D-only implementation: smooth k-NN membership strengths, fuzzy
//! union symmetrization, a min_dist-fitted low-dimensional curve, PCA
//! initialization and SGD with negative sampling. All randomness comes from
//! a fixed-seed ChaCha stream so repeated runs agree.

use ndarray::{Array2, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::dimred::{pairwise_distances, pca, UmapParams};
use crate::error::AnalysisError;

const SEED: u64 = 42;
const N_EPOCHS: usize = 200;
const NEGATIVE_SAMPLE_RATE: usize = 5;
const INITIAL_ALPHA: f64 = 1.0;
const SMOOTH_K_TOLERANCE: f64 = 1e-5;
const MIN_SIGMA: f64 = 1e-3;
const GRAD_CLIP: f64 = 4.0;

/// Embed the feature matrix into 2D.
pub fn embed(x: ArrayView2<f64>, params: &UmapParams) -> Result<Array2<f64>, AnalysisError> {
    let n = x.nrows();
    let k = params.n_neighbors;
    let distances = pairwise_distances(x);

    // k nearest neighbors of each point, self excluded
    let mut neighbors: Vec<Vec<(usize, f64)>> = Vec::with_capacity(n);
    for i in 0..n {
        let mut order: Vec<usize> = (0..n).filter(|&j| j != i).collect();
        order.sort_by(|&a, &b| {
            distances[[i, a]]
                .partial_cmp(&distances[[i, b]])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        neighbors.push(
            order
                .into_iter()
                .take(k)
                .map(|j| (j, distances[[i, j]]))
                .collect(),
        );
    }

    // directed membership strengths: exp(-(d - rho) / sigma) with rho the
    // nearest-neighbor distance and sigma calibrated to log2(k)
    let target = (k as f64).log2().max(SMOOTH_K_TOLERANCE);
    let mut memberships = Array2::zeros((n, n));
    for i in 0..n {
        let rho = neighbors[i].first().map(|&(_, d)| d).unwrap_or(0.0);
        let sigma = smooth_sigma(&neighbors[i], rho, target);
        for &(j, d) in &neighbors[i] {
            memberships[[i, j]] = (-((d - rho).max(0.0)) / sigma).exp();
        }
    }

    // fuzzy set union: a + b - a*b
    let mut graph = Array2::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let a = memberships[[i, j]];
            let b = memberships[[j, i]];
            let union = a + b - a * b;
            graph[[i, j]] = union;
            graph[[j, i]] = union;
        }
    }

    let (curve_a, curve_b) = fit_curve(params.min_dist);
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    let mut embedding = initial_embedding(x, &mut rng)?;

    for epoch in 0..N_EPOCHS {
        let alpha = INITIAL_ALPHA * (1.0 - epoch as f64 / N_EPOCHS as f64);
        for i in 0..n {
            for j in 0..n {
                let weight = graph[[i, j]];
                if j == i || weight <= 0.0 {
                    continue;
                }

                // attraction along the edge, scaled by its membership
                let dx = embedding[[i, 0]] - embedding[[j, 0]];
                let dy = embedding[[i, 1]] - embedding[[j, 1]];
                let d2 = dx * dx + dy * dy;
                if d2 > 0.0 {
                    let coeff = (-2.0 * curve_a * curve_b * d2.powf(curve_b - 1.0))
                        / (1.0 + curve_a * d2.powf(curve_b));
                    let gx = clip(coeff * dx) * weight;
                    let gy = clip(coeff * dy) * weight;
                    embedding[[i, 0]] += alpha * gx;
                    embedding[[i, 1]] += alpha * gy;
                    embedding[[j, 0]] -= alpha * gx;
                    embedding[[j, 1]] -= alpha * gy;
                }

                // repulsion from sampled non-neighbors
                for _ in 0..NEGATIVE_SAMPLE_RATE {
                    let l = rng.random_range(0..n);
                    if l == i {
                        continue;
                    }
                    let dx = embedding[[i, 0]] - embedding[[l, 0]];
                    let dy = embedding[[i, 1]] - embedding[[l, 1]];
                    let d2 = dx * dx + dy * dy;
                    let coeff = (2.0 * curve_b)
                        / ((0.001 + d2) * (1.0 + curve_a * d2.powf(curve_b)));
                    embedding[[i, 0]] += alpha * clip(coeff * dx);
                    embedding[[i, 1]] += alpha * clip(coeff * dy);
                }
            }
        }
    }

    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::AlgorithmFailure {
            algorithm: "UMAP",
            reason: "embedding optimization diverged".to_string(),
        });
    }
    Ok(embedding)
}

/// Binary search for the bandwidth making the membership sum hit the target.
fn smooth_sigma(neighbors: &[(usize, f64)], rho: f64, target: f64) -> f64 {
    let mut lo = 0.0;
    let mut hi = f64::INFINITY;
    let mut mid = 1.0;

    for _ in 0..64 {
        let sum: f64 = neighbors
            .iter()
            .map(|&(_, d)| (-((d - rho).max(0.0)) / mid).exp())
            .sum();
        if (sum - target).abs() < SMOOTH_K_TOLERANCE {
            break;
        }
        if sum > target {
            hi = mid;
            mid = (lo + hi) / 2.0;
        } else {
            lo = mid;
            mid = if hi.is_finite() { (lo + hi) / 2.0 } else { mid * 2.0 };
        }
    }

    mid.max(MIN_SIGMA)
}

/// Least-squares fit of `1 / (1 + a*x^(2b))` against the min_dist-shifted
/// exponential target curve.
fn fit_curve(min_dist: f64) -> (f64, f64) {
    let xs: Vec<f64> = (1..=300).map(|i| 3.0 * i as f64 / 300.0).collect();
    let ys: Vec<f64> = xs
        .iter()
        .map(|&x| if x <= min_dist { 1.0 } else { (-(x - min_dist)).exp() })
        .collect();

    let mut a = 1.0;
    let mut b = 1.0;
    let rate = 0.1;
    for _ in 0..500 {
        let mut grad_a = 0.0;
        let mut grad_b = 0.0;
        for (&x, &y) in xs.iter().zip(&ys) {
            let xp = x.powf(2.0 * b);
            let f = 1.0 / (1.0 + a * xp);
            let err = f - y;
            grad_a += 2.0 * err * (-xp * f * f);
            grad_b += 2.0 * err * (-a * xp * 2.0 * x.ln() * f * f);
        }
        a -= rate * grad_a / xs.len() as f64;
        b -= rate * grad_b / xs.len() as f64;
        a = a.max(1e-3);
        b = b.clamp(1e-3, 2.0);
    }
    (a, b)
}

/// PCA layout rescaled to a compact extent, plus a little seeded jitter to
/// break exact symmetries.
fn initial_embedding(
    x: ArrayView2<f64>,
    rng: &mut ChaCha8Rng,
) -> Result<Array2<f64>, AnalysisError> {
    let mut embedding = pca::project(x).map_err(|e| AnalysisError::AlgorithmFailure {
        algorithm: "UMAP",
        reason: format!("initialization failed: {e}"),
    })?;
    let max_abs = embedding.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if max_abs > 0.0 {
        embedding.mapv_inplace(|v| 10.0 * v / max_abs);
    }
    for v in embedding.iter_mut() {
        *v += rng.random_range(-1e-4..1e-4);
    }
    Ok(embedding)
}

fn clip(v: f64) -> f64 {
    v.clamp(-GRAD_CLIP, GRAD_CLIP)
}
