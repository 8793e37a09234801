//! Density-based spatial clustering (DBSCAN) over a 2D embedding.

use std::collections::VecDeque;

use ndarray::ArrayView2;

use crate::cluster::NOISE_LABEL;
use crate::dimred::pairwise_distances;

/// Label every point: clusters are numbered 0.. in discovery order, points
/// reachable from no core point get [`NOISE_LABEL`].
///
/// Neighborhoods are inclusive (`distance <= eps`) and contain the point
/// itself, so a core point needs `min_samples` points in its eps-ball
/// counting itself. Border points join the first cluster that reaches them.
pub fn run(points: ArrayView2<f64>, eps: f64, min_samples: usize) -> Vec<i32> {
    let n = points.nrows();
    let distances = pairwise_distances(points);

    let neighborhoods: Vec<Vec<usize>> = (0..n)
        .map(|i| (0..n).filter(|&j| distances[[i, j]] <= eps).collect())
        .collect();
    let is_core: Vec<bool> = neighborhoods
        .iter()
        .map(|hood| hood.len() >= min_samples)
        .collect();

    let mut labels: Vec<Option<i32>> = vec![None; n];
    let mut next_cluster = 0;

    for seed in 0..n {
        if labels[seed].is_some() || !is_core[seed] {
            continue;
        }

        labels[seed] = Some(next_cluster);
        let mut queue = VecDeque::from([seed]);
        while let Some(point) = queue.pop_front() {
            for &neighbor in &neighborhoods[point] {
                if labels[neighbor].is_none() {
                    labels[neighbor] = Some(next_cluster);
                    if is_core[neighbor] {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        next_cluster += 1;
    }

    labels
        .into_iter()
        .map(|label| label.unwrap_or(NOISE_LABEL))
        .collect()
}
