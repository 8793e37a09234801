//! # Dimensionality Reduction
//!
//! The closed set of projection algorithms the analysis dialog offers:
//! UMAP, t-SNE, PCA, MDS and Isomap, each reducing the route feature matrix
//! to one 2D point per route.
//!
//! Every algorithm is invoked through the same contract,
//! `feature matrix × params -> (n_routes × 2) matrix`; parameter records are
//! carried by the [`Reduction`] variants so the set stays closed and
//! exhaustively matchable.
//!
//! ## Algorithm selection guide
//! - **PCA** for linear structure and interpretability
//! - **t-SNE** for local cluster structure (may distort global layout)
//! - **UMAP** for preserving both local and global structure
//! - **MDS** for preserving pairwise distances
//! - **Isomap** for non-linear manifolds via geodesic distances

use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;

use crate::error::AnalysisError;
use crate::features::FeatureConfig;

pub mod isomap;
pub mod mds;
pub mod pca;
pub mod tsne;
pub mod umap;

/// UMAP parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct UmapParams {
    pub n_neighbors: usize,
    pub min_dist: f64,
}

impl Default for UmapParams {
    fn default() -> Self {
        UmapParams {
            n_neighbors: 15,
            min_dist: 0.1,
        }
    }
}

impl UmapParams {
    /// Default parameters sized to the available route count.
    pub fn adapted_to(n_samples: usize) -> Self {
        UmapParams {
            n_neighbors: 15.min(n_samples.saturating_sub(1)).max(1),
            ..UmapParams::default()
        }
    }
}

/// t-SNE parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TsneParams {
    pub perplexity: f64,
    pub learning_rate: f64,
}

impl Default for TsneParams {
    fn default() -> Self {
        TsneParams {
            perplexity: 30.0,
            learning_rate: 200.0,
        }
    }
}

impl TsneParams {
    /// Default parameters sized to the available route count.
    pub fn adapted_to(n_samples: usize) -> Self {
        TsneParams {
            perplexity: 30.0_f64.min(n_samples.saturating_sub(1) as f64 / 3.0),
            ..TsneParams::default()
        }
    }
}

/// Isomap parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct IsomapParams {
    pub n_neighbors: usize,
}

impl Default for IsomapParams {
    fn default() -> Self {
        IsomapParams { n_neighbors: 5 }
    }
}

impl IsomapParams {
    /// Default parameters sized to the available route count.
    pub fn adapted_to(n_samples: usize) -> Self {
        IsomapParams {
            n_neighbors: 5.min(n_samples.saturating_sub(1)).max(1),
        }
    }
}

/// One dimensionality-reduction algorithm plus its parameter record.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    Umap(UmapParams),
    Tsne(TsneParams),
    Pca,
    Mds,
    Isomap(IsomapParams),
}

impl Reduction {
    pub fn name(&self) -> &'static str {
        match self {
            Reduction::Umap(_) => "UMAP",
            Reduction::Tsne(_) => "t-SNE",
            Reduction::Pca => "PCA",
            Reduction::Mds => "MDS",
            Reduction::Isomap(_) => "Isomap",
        }
    }

    /// One-line description for the comparison view.
    pub fn description(&self) -> &'static str {
        match self {
            Reduction::Umap(_) => "Preserves local and global structure",
            Reduction::Tsne(_) => "Good for local structure, may distort global",
            Reduction::Pca => "Linear, preserves variance",
            Reduction::Mds => "Preserves pairwise distances",
            Reduction::Isomap(_) => "Non-linear, preserves geodesic distances",
        }
    }

    /// The full algorithm set with defaults adapted to the route count, in
    /// the order the comparison view lists them.
    pub fn all_with_defaults(n_samples: usize) -> Vec<Reduction> {
        vec![
            Reduction::Umap(UmapParams::adapted_to(n_samples)),
            Reduction::Tsne(TsneParams::adapted_to(n_samples)),
            Reduction::Pca,
            Reduction::Mds,
            Reduction::Isomap(IsomapParams::adapted_to(n_samples)),
        ]
    }

    /// Check the parameter record against the sample count. Out-of-range
    /// values are reported, never clamped.
    pub fn validate(&self, n_samples: usize) -> Result<(), AnalysisError> {
        let algorithm = self.name();
        let max_neighbors = n_samples.saturating_sub(1);
        match self {
            Reduction::Umap(p) => {
                if p.n_neighbors < 1 || p.n_neighbors > max_neighbors {
                    return Err(AnalysisError::InvalidParameter {
                        algorithm,
                        parameter: "n_neighbors",
                        reason: format!(
                            "{} is outside 1..={} for {} routes",
                            p.n_neighbors, max_neighbors, n_samples
                        ),
                    });
                }
                if !(0.0..=1.0).contains(&p.min_dist) {
                    return Err(AnalysisError::InvalidParameter {
                        algorithm,
                        parameter: "min_dist",
                        reason: format!("{} is outside 0.0..=1.0", p.min_dist),
                    });
                }
            }
            Reduction::Tsne(p) => {
                if !p.perplexity.is_finite() || p.perplexity <= 0.0 {
                    return Err(AnalysisError::InvalidParameter {
                        algorithm,
                        parameter: "perplexity",
                        reason: format!("{} is not positive", p.perplexity),
                    });
                }
                if 3.0 * p.perplexity > max_neighbors as f64 {
                    return Err(AnalysisError::InvalidParameter {
                        algorithm,
                        parameter: "perplexity",
                        reason: format!(
                            "{} needs 3*perplexity <= {} for {} routes",
                            p.perplexity, max_neighbors, n_samples
                        ),
                    });
                }
                if !p.learning_rate.is_finite() || p.learning_rate <= 0.0 {
                    return Err(AnalysisError::InvalidParameter {
                        algorithm,
                        parameter: "learning_rate",
                        reason: format!("{} is not positive", p.learning_rate),
                    });
                }
            }
            Reduction::Pca | Reduction::Mds => {}
            Reduction::Isomap(p) => {
                if p.n_neighbors < 1 || p.n_neighbors > max_neighbors {
                    return Err(AnalysisError::InvalidParameter {
                        algorithm,
                        parameter: "n_neighbors",
                        reason: format!(
                            "{} is outside 1..={} for {} routes",
                            p.n_neighbors, max_neighbors, n_samples
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Run the algorithm on an already-standardized feature matrix.
    pub fn compute(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, AnalysisError> {
        match self {
            Reduction::Umap(p) => umap::embed(x, p),
            Reduction::Tsne(p) => tsne::embed(x, p),
            Reduction::Pca => pca::project(x),
            Reduction::Mds => mds::project(x),
            Reduction::Isomap(p) => isomap::embed(x, p),
        }
    }

    /// Normalized parameter signature for structural cache keys. Floats are
    /// keyed by bit pattern so equal values built separately hash alike.
    pub(crate) fn cache_signature(&self) -> Vec<u64> {
        match self {
            Reduction::Umap(p) => vec![p.n_neighbors as u64, p.min_dist.to_bits()],
            Reduction::Tsne(p) => vec![p.perplexity.to_bits(), p.learning_rate.to_bits()],
            Reduction::Pca | Reduction::Mds => Vec::new(),
            Reduction::Isomap(p) => vec![p.n_neighbors as u64],
        }
    }
}

/// A reduction request as issued by the analysis dialog: the algorithm with
/// its parameters, plus the feature schema to extract.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub reduction: Reduction,
    pub features: FeatureConfig,
}

impl AnalysisRequest {
    pub fn new(reduction: Reduction, features: FeatureConfig) -> Self {
        AnalysisRequest {
            reduction,
            features,
        }
    }
}

/// Zero-mean/unit-variance scaling per column, in place. Zero-variance
/// columns are left centered instead of divided.
pub fn standardize(x: &mut Array2<f64>) {
    if x.nrows() == 0 {
        return;
    }
    let mean = x.mean_axis(Axis(0)).expect("matrix has rows");
    let std_dev = x
        .std_axis(Axis(0), 0.0)
        .mapv(|s| if s > 0.0 { s } else { 1.0 });

    x.axis_iter_mut(Axis(0))
        .into_par_iter()
        .for_each(|mut row| {
            row -= &mean;
            row /= &std_dev;
        });
}

/// Dense pairwise Euclidean distance matrix, rows in parallel.
pub(crate) fn pairwise_distances(x: ArrayView2<f64>) -> Array2<f64> {
    let n = x.nrows();
    let mut distances = Array2::zeros((n, n));
    distances
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut row)| {
            let a = x.row(i);
            for j in 0..n {
                let b = x.row(j);
                let d2: f64 = a
                    .iter()
                    .zip(b.iter())
                    .map(|(&p, &q)| (p - q) * (p - q))
                    .sum();
                row[j] = d2.sqrt();
            }
        });
    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_standardize_centers_and_scales() {
        let mut x = array![[1.0, 10.0], [3.0, 10.0], [5.0, 10.0]];
        standardize(&mut x);
        // first column has unit variance around zero
        assert_relative_eq!(x.column(0).sum(), 0.0, epsilon = 1e-12);
        let var: f64 = x.column(0).mapv(|v| v * v).sum() / 3.0;
        assert_relative_eq!(var, 1.0, epsilon = 1e-12);
        // constant column stays centered at zero, not NaN
        assert!(x.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_pairwise_distances_symmetry() {
        let x = array![[0.0, 0.0], [3.0, 4.0], [6.0, 8.0]];
        let d = pairwise_distances(x.view());
        assert_relative_eq!(d[[0, 1]], 5.0);
        assert_relative_eq!(d[[1, 2]], 5.0);
        assert_relative_eq!(d[[0, 2]], 10.0);
        assert_eq!(d[[2, 2]], 0.0);
        assert_relative_eq!(d[[1, 0]], d[[0, 1]]);
    }

    #[test]
    fn test_adapted_defaults_shrink_with_small_data() {
        assert_eq!(UmapParams::adapted_to(2).n_neighbors, 1);
        assert_eq!(UmapParams::adapted_to(100).n_neighbors, 15);
        assert_eq!(IsomapParams::adapted_to(3).n_neighbors, 2);
        assert_relative_eq!(TsneParams::adapted_to(2).perplexity, 1.0 / 3.0);
        assert_relative_eq!(TsneParams::adapted_to(1000).perplexity, 30.0);
    }

    #[test]
    fn test_validate_rejects_oversized_neighbors() {
        let reduction = Reduction::Umap(UmapParams {
            n_neighbors: 10,
            min_dist: 0.1,
        });
        let err = reduction.validate(5).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter { .. }));
        assert_eq!(err.algorithm(), "UMAP");

        let reduction = Reduction::Isomap(IsomapParams { n_neighbors: 4 });
        assert!(reduction.validate(4).is_err());
        assert!(reduction.validate(5).is_ok());
    }

    #[test]
    fn test_validate_rejects_oversized_perplexity() {
        let reduction = Reduction::Tsne(TsneParams::default());
        assert!(reduction.validate(10).is_err());
        assert!(reduction.validate(91).is_ok());
    }

    #[test]
    fn test_cache_signature_is_structural() {
        let a = Reduction::Umap(UmapParams {
            n_neighbors: 15,
            min_dist: 0.1,
        });
        let b = Reduction::Umap(UmapParams {
            n_neighbors: 15,
            min_dist: 0.1,
        });
        assert_eq!(a.cache_signature(), b.cache_signature());
        let c = Reduction::Umap(UmapParams {
            n_neighbors: 15,
            min_dist: 0.2,
        });
        assert_ne!(a.cache_signature(), c.cache_signature());
    }
}
