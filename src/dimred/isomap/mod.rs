//! Isomap: geodesic distances over a k-nearest-neighbor graph, then
//! classical scaling.

use ndarray::{Array2, ArrayView2};
use petgraph::algo::{connected_components, dijkstra};
use petgraph::graph::UnGraph;

use crate::dimred::mds::classical_scaling;
use crate::dimred::{pairwise_distances, IsomapParams};
use crate::error::AnalysisError;

/// Embed the feature matrix into 2D through geodesic distances on the
/// symmetric k-NN graph.
///
/// A disconnected neighborhood graph leaves geodesics undefined and is
/// reported as a failure rather than patched up.
pub fn embed(x: ArrayView2<f64>, params: &IsomapParams) -> Result<Array2<f64>, AnalysisError> {
    let n = x.nrows();
    let k = params.n_neighbors;
    let distances = pairwise_distances(x);

    let mut graph = UnGraph::<(), f64>::with_capacity(n, n * k);
    let nodes: Vec<_> = (0..n).map(|_| graph.add_node(())).collect();

    for i in 0..n {
        let mut order: Vec<usize> = (0..n).filter(|&j| j != i).collect();
        order.sort_by(|&a, &b| {
            distances[[i, a]]
                .partial_cmp(&distances[[i, b]])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for &j in order.iter().take(k) {
            if graph.find_edge(nodes[i], nodes[j]).is_none() {
                graph.add_edge(nodes[i], nodes[j], distances[[i, j]]);
            }
        }
    }

    if connected_components(&graph) != 1 {
        return Err(AnalysisError::AlgorithmFailure {
            algorithm: "Isomap",
            reason: format!(
                "the {k}-nearest-neighbor graph over {n} routes is disconnected; \
                 geodesic distances are undefined"
            ),
        });
    }

    let mut geodesics = Array2::zeros((n, n));
    for i in 0..n {
        let costs = dijkstra(&graph, nodes[i], None, |edge| *edge.weight());
        for (node, cost) in costs {
            geodesics[[i, node.index()]] = cost;
        }
    }

    classical_scaling(&geodesics, "Isomap")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_chain_unrolls_by_geodesic_length() {
        // four points on a line, each linked to its neighbors
        let x = array![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0]];
        let coords = embed(x.view(), &IsomapParams { n_neighbors: 1 }).unwrap();
        // geodesic end-to-end distance is 3, preserved on the first axis
        let d = ((coords[[0, 0]] - coords[[3, 0]]).powi(2)
            + (coords[[0, 1]] - coords[[3, 1]]).powi(2))
        .sqrt();
        assert_relative_eq!(d, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_disconnected_graph_is_reported() {
        // two pairs, far apart; k = 1 links only within each pair
        let x = array![[0.0, 0.0], [0.1, 0.0], [50.0, 50.0], [50.1, 50.0]];
        let err = embed(x.view(), &IsomapParams { n_neighbors: 1 }).unwrap_err();
        assert!(matches!(err, AnalysisError::AlgorithmFailure { .. }));
        assert_eq!(err.algorithm(), "Isomap");
    }

    #[test]
    fn test_two_samples_with_one_neighbor() {
        let x = array![[0.0, 0.0, 0.0], [3.0, 4.0, 0.0]];
        let coords = embed(x.view(), &IsomapParams { n_neighbors: 1 }).unwrap();
        let d = ((coords[[0, 0]] - coords[[1, 0]]).powi(2)
            + (coords[[0, 1]] - coords[[1, 1]]).powi(2))
        .sqrt();
        assert_relative_eq!(d, 5.0, epsilon = 1e-9);
    }
}
