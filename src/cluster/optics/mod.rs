//! OPTICS ordering with xi-based cluster extraction.
//!
//! The ordering pass is the textbook sequential algorithm: repeatedly take
//! the unprocessed point with the smallest reachability and relax its
//! neighbors' reachabilities through `max(core_distance, distance)`.
//! Clusters are then read off the reachability plot by steep-down/steep-up
//! detection.

use ndarray::ArrayView2;

use crate::cluster::NOISE_LABEL;
use crate::dimred::pairwise_distances;

/// Steepness threshold for the extraction pass.
const XI: f64 = 0.05;

/// Label every point; plot valleys become clusters 0.., the rest is noise.
pub fn run(points: ArrayView2<f64>, min_samples: usize) -> Vec<i32> {
    let n = points.nrows();
    let min_samples = min_samples.max(1);
    let distances = pairwise_distances(points);

    // core distance: min_samples-th closest point, the point itself counts
    let core_distances: Vec<f64> = (0..n)
        .map(|i| {
            let mut row: Vec<f64> = (0..n).map(|j| distances[[i, j]]).collect();
            row.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            if min_samples <= n {
                row[min_samples - 1]
            } else {
                f64::INFINITY
            }
        })
        .collect();

    let mut reachability = vec![f64::INFINITY; n];
    let mut processed = vec![false; n];
    let mut ordering = Vec::with_capacity(n);

    for _ in 0..n {
        // next: unprocessed point with the smallest reachability
        let mut current = None;
        for j in 0..n {
            if processed[j] {
                continue;
            }
            match current {
                Some(best) if reachability[j] >= reachability[best] => {}
                _ => current = Some(j),
            }
        }
        let Some(current) = current else { break };

        processed[current] = true;
        ordering.push(current);

        for j in 0..n {
            if processed[j] {
                continue;
            }
            let candidate = core_distances[current].max(distances[[current, j]]);
            if candidate < reachability[j] {
                reachability[j] = candidate;
            }
        }
    }

    let plot: Vec<f64> = ordering.iter().map(|&i| reachability[i]).collect();
    extract_xi_clusters(&plot, &ordering, n)
}

/// Simplified xi extraction: a steep-down edge (or the initial undefined
/// reachability falling into a finite one) opens a cluster region, a steep
/// up edge closes it. Points outside every region stay noise.
fn extract_xi_clusters(plot: &[f64], ordering: &[usize], n: usize) -> Vec<i32> {
    let factor = 1.0 - XI;
    let mut labels = vec![NOISE_LABEL; n];
    let mut cluster_id = 0;
    let mut open_start: Option<usize> = None;

    let close = |start: usize, end_inclusive: usize, cluster_id: &mut i32,
                 labels: &mut Vec<i32>| {
        for &original in &ordering[start..=end_inclusive] {
            labels[original] = *cluster_id;
        }
        *cluster_id += 1;
    };

    for t in 0..n.saturating_sub(1) {
        let current = plot[t];
        let next = plot[t + 1];

        if current.is_infinite() {
            if next.is_finite() && open_start.is_none() {
                open_start = Some(t);
            }
            continue;
        }
        if next.is_infinite() {
            if let Some(start) = open_start.take() {
                close(start, t, &mut cluster_id, &mut labels);
            }
            continue;
        }

        if current * factor >= next {
            // steep down: begin a valley
            if open_start.is_none() {
                open_start = Some(t);
            }
        } else if current <= next * factor {
            // steep up: the valley ends here
            if let Some(start) = open_start.take() {
                close(start, t, &mut cluster_id, &mut labels);
            }
        }
    }

    if let Some(start) = open_start {
        close(start, n - 1, &mut cluster_id, &mut labels);
    }

    labels
}
