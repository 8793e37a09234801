//! Classical (Torgerson) multidimensional scaling.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array2, ArrayView2};

use crate::dimred::pairwise_distances;
use crate::error::AnalysisError;

/// Embed the feature matrix into 2D by classically scaling its Euclidean
/// distance matrix.
pub fn project(x: ArrayView2<f64>) -> Result<Array2<f64>, AnalysisError> {
    let distances = pairwise_distances(x);
    classical_scaling(&distances, "MDS")
}

/// Classical scaling of a symmetric distance matrix: double-center the
/// squared distances and take the two leading eigenpairs of the Gram
/// matrix. Also the final step of Isomap, which feeds geodesic distances.
pub(crate) fn classical_scaling(
    distances: &Array2<f64>,
    algorithm: &'static str,
) -> Result<Array2<f64>, AnalysisError> {
    let n = distances.nrows();
    let squared = distances.mapv(|d| d * d);

    let grand = squared.sum() / (n * n) as f64;
    let row_means: Vec<f64> = (0..n).map(|i| squared.row(i).sum() / n as f64).collect();
    let col_means: Vec<f64> = (0..n).map(|j| squared.column(j).sum() / n as f64).collect();

    // B = -1/2 * J * D^2 * J
    let gram = DMatrix::from_fn(n, n, |i, j| {
        -0.5 * (squared[[i, j]] - row_means[i] - col_means[j] + grand)
    });

    let eigen = SymmetricEigen::try_new(gram, 1e-12, 10_000).ok_or_else(|| {
        AnalysisError::AlgorithmFailure {
            algorithm,
            reason: "eigendecomposition of the Gram matrix did not converge".to_string(),
        }
    })?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // negative eigenvalues (non-Euclidean residue) contribute nothing
    let mut coords = Array2::zeros((n, 2));
    for (c, &idx) in order.iter().take(2).enumerate() {
        let scale = eigen.eigenvalues[idx].max(0.0).sqrt();
        for i in 0..n {
            coords[[i, c]] = eigen.eigenvectors[(i, idx)] * scale;
        }
    }

    Ok(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn embedded_distance(coords: &Array2<f64>, i: usize, j: usize) -> f64 {
        ((coords[[i, 0]] - coords[[j, 0]]).powi(2) + (coords[[i, 1]] - coords[[j, 1]]).powi(2))
            .sqrt()
    }

    #[test]
    fn test_planar_distances_are_reproduced() {
        // a 3-4-5 right triangle lifted into 4D
        let x = array![
            [0.0, 0.0, 1.0, 1.0],
            [3.0, 0.0, 1.0, 1.0],
            [0.0, 4.0, 1.0, 1.0]
        ];
        let coords = project(x.view()).unwrap();
        assert_relative_eq!(embedded_distance(&coords, 0, 1), 3.0, epsilon = 1e-9);
        assert_relative_eq!(embedded_distance(&coords, 0, 2), 4.0, epsilon = 1e-9);
        assert_relative_eq!(embedded_distance(&coords, 1, 2), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_two_points_keep_their_separation() {
        let x = array![[0.0, 0.0, 0.0], [6.0, 8.0, 0.0]];
        let coords = project(x.view()).unwrap();
        assert_relative_eq!(embedded_distance(&coords, 0, 1), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_coincident_points_collapse_to_origin() {
        let x = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let coords = project(x.view()).unwrap();
        for v in coords.iter() {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-9);
        }
    }
}
