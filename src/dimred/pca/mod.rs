//! Principal component analysis onto the first two components.

use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

use crate::error::AnalysisError;

/// Project the feature matrix onto its first two principal components.
///
/// Columns are mean-centered, the thin SVD of the centered matrix is taken
/// and rows are projected onto the two leading right singular vectors.
pub fn project(x: ArrayView2<f64>) -> Result<Array2<f64>, AnalysisError> {
    let (n_samples, n_features) = x.dim();

    let mean = x.mean_axis(Axis(0)).expect("matrix has rows");
    let mut centered = x.to_owned();
    centered
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .for_each(|mut row| {
            row -= &mean;
        });

    let matrix = DMatrix::from_row_iterator(n_samples, n_features, centered.iter().cloned());
    let svd = matrix.svd(false, true);
    let v_t = svd.v_t.ok_or_else(|| AnalysisError::AlgorithmFailure {
        algorithm: "PCA",
        reason: "SVD produced no right singular vectors".to_string(),
    })?;

    // v_t rows are ordered by descending singular value; project onto the
    // first two. With only one effective component the second axis stays 0.
    let n_components = 2.min(v_t.nrows());
    let mut coords = Array2::zeros((n_samples, 2));
    for i in 0..n_samples {
        for c in 0..n_components {
            let mut dot = 0.0;
            for (j, v) in v_t.row(c).iter().enumerate() {
                dot += centered[[i, j]] * v;
            }
            coords[[i, c]] = dot;
        }
    }

    Ok(coords)
}
