//! Barnes-Hut t-SNE via the `bhtsne` crate.

use std::panic::{catch_unwind, AssertUnwindSafe};

use ndarray::{Array2, ArrayView2};

use crate::dimred::TsneParams;
use crate::error::AnalysisError;

const EPOCHS: usize = 1000;
const THETA: f64 = 0.5;

/// Embed the feature matrix into 2D with Barnes-Hut t-SNE.
///
/// The routine is treated as a black box; `bhtsne` asserts its own
/// preconditions, so any panic it raises is converted into an
/// [`AnalysisError::AlgorithmFailure`] instead of unwinding the caller.
/// Parameter-range checks happen upstream in [`Reduction::validate`].
///
/// [`Reduction::validate`]: crate::dimred::Reduction::validate
pub fn embed(x: ArrayView2<f64>, params: &TsneParams) -> Result<Array2<f64>, AnalysisError> {
    let n_obs = x.nrows();
    let n_dim = x.ncols();

    let owned = x.to_owned();
    let x_slice = owned
        .as_slice()
        .ok_or_else(|| AnalysisError::AlgorithmFailure {
            algorithm: "t-SNE",
            reason: "feature matrix is not contiguous".to_string(),
        })?;
    let x_chunked_slice: Vec<&[f64]> = x_slice.chunks(n_dim).collect();

    let perplexity = params.perplexity;
    let learning_rate = params.learning_rate;
    let tsne_result = catch_unwind(AssertUnwindSafe(|| {
        bhtsne::tSNE::new(&x_chunked_slice)
            .embedding_dim(2)
            .perplexity(perplexity)
            .learning_rate(learning_rate)
            .epochs(EPOCHS)
            .barnes_hut(THETA, |sample_a, sample_b| {
                sample_a
                    .iter()
                    .zip(sample_b.iter())
                    .map(|(&a, &b)| num_traits::Float::powi(a - b, 2))
                    .sum::<f64>()
                    .sqrt()
            })
            .embedding()
    }))
    .map_err(|_| AnalysisError::AlgorithmFailure {
        algorithm: "t-SNE",
        reason: "the t-SNE routine raised".to_string(),
    })?;

    Array2::from_shape_vec((n_obs, 2), tsne_result).map_err(|e| {
        AnalysisError::AlgorithmFailure {
            algorithm: "t-SNE",
            reason: format!("unexpected embedding shape: {e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimred::TsneParams;
    use ndarray::Array2;

    #[test]
    fn test_embedding_has_one_row_per_sample() {
        // two loose groups in 5D
        let mut rows = Vec::new();
        for i in 0..6 {
            let base = if i < 3 { 0.0 } else { 20.0 };
            rows.push(vec![
                base + i as f64 * 0.1,
                base,
                base + 0.5,
                base - 0.25,
                base + i as f64 * 0.05,
            ]);
        }
        let x = Array2::from_shape_vec((6, 5), rows.concat()).unwrap();
        let params = TsneParams {
            perplexity: 1.0,
            learning_rate: 200.0,
        };
        let coords = embed(x.view(), &params).unwrap();
        assert_eq!(coords.dim(), (6, 2));
    }
}
