//! # Clustering
//!
//! The closed pair of density-based clustering algorithms offered over a 2D
//! embedding: DBSCAN and OPTICS. Label `-1` is the shared "noise" convention;
//! all other labels are small non-negative integers whose identity is stable
//! only within a single result.

use std::collections::BTreeMap;

use ndarray::ArrayView2;

use crate::error::AnalysisError;
use crate::store::RouteId;

pub mod dbscan;
pub mod optics;

/// Reserved label for points assigned to no dense region.
pub const NOISE_LABEL: i32 = -1;

/// Which clustering algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterMethod {
    Dbscan,
    Optics,
}

impl ClusterMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ClusterMethod::Dbscan => "DBSCAN",
            ClusterMethod::Optics => "OPTICS",
        }
    }
}

/// Shared parameter record; `eps` is required by DBSCAN and dropped (with a
/// recorded note) by OPTICS.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    pub eps: Option<f64>,
    pub min_samples: usize,
}

impl ClusterParams {
    /// Dialog defaults sized to the number of embedded routes.
    pub fn defaults_for(n_routes: usize) -> Self {
        ClusterParams {
            eps: Some(0.5),
            min_samples: (n_routes / 4).max(2),
        }
    }
}

/// A clustering request against one embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRequest {
    pub method: ClusterMethod,
    pub params: ClusterParams,
}

impl ClusterRequest {
    pub fn new(method: ClusterMethod, params: ClusterParams) -> Self {
        ClusterRequest { method, params }
    }

    /// Check the parameter record. Out-of-range values are reported, never
    /// corrected.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let algorithm = self.method.name();
        match self.method {
            ClusterMethod::Dbscan => {
                match self.params.eps {
                    Some(eps) if eps.is_finite() && eps > 0.0 => {}
                    Some(eps) => {
                        return Err(AnalysisError::InvalidParameter {
                            algorithm,
                            parameter: "eps",
                            reason: format!("{eps} is not a positive finite value"),
                        })
                    }
                    None => {
                        return Err(AnalysisError::InvalidParameter {
                            algorithm,
                            parameter: "eps",
                            reason: "DBSCAN requires eps".to_string(),
                        })
                    }
                }
                if self.params.min_samples < 1 {
                    return Err(AnalysisError::InvalidParameter {
                        algorithm,
                        parameter: "min_samples",
                        reason: "must be at least 1".to_string(),
                    });
                }
            }
            ClusterMethod::Optics => {
                if self.params.min_samples < 2 {
                    return Err(AnalysisError::InvalidParameter {
                        algorithm,
                        parameter: "min_samples",
                        reason: "must be at least 2; single-point clusters are undefined"
                            .to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Normalized parameter signature for the cache key, plus the note
    /// recorded when an ignored parameter was dropped.
    pub(crate) fn normalized(&self) -> (Vec<u64>, Option<String>) {
        match self.method {
            ClusterMethod::Dbscan => (
                vec![
                    self.params.eps.unwrap_or(f64::NAN).to_bits(),
                    self.params.min_samples as u64,
                ],
                None,
            ),
            ClusterMethod::Optics => {
                let note = self
                    .params
                    .eps
                    .map(|eps| format!("OPTICS ignores eps; dropped supplied eps={eps}"));
                (vec![self.params.min_samples as u64], note)
            }
        }
    }

    /// Run the algorithm over the embedded coordinates (one row per route).
    pub(crate) fn compute(&self, coords: ArrayView2<f64>) -> Result<Vec<i32>, AnalysisError> {
        match self.method {
            ClusterMethod::Dbscan => {
                let Some(eps) = self.params.eps else {
                    return Err(AnalysisError::InvalidParameter {
                        algorithm: self.method.name(),
                        parameter: "eps",
                        reason: "DBSCAN requires eps".to_string(),
                    });
                };
                Ok(dbscan::run(coords, eps, self.params.min_samples))
            }
            ClusterMethod::Optics => Ok(optics::run(coords, self.params.min_samples)),
        }
    }
}

/// Per-route labels produced by one clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResult {
    labels: BTreeMap<RouteId, i32>,
    n_clusters: usize,
    n_noise: usize,
    notes: Vec<String>,
}

impl ClusterResult {
    pub(crate) fn from_labels(
        ids: impl IntoIterator<Item = RouteId>,
        labels: Vec<i32>,
        notes: Vec<String>,
    ) -> Self {
        let labels: BTreeMap<RouteId, i32> = ids.into_iter().zip(labels).collect();
        let mut cluster_ids: Vec<i32> =
            labels.values().copied().filter(|&l| l >= 0).collect();
        cluster_ids.sort_unstable();
        cluster_ids.dedup();
        let n_noise = labels.values().filter(|&&l| l == NOISE_LABEL).count();
        ClusterResult {
            n_clusters: cluster_ids.len(),
            n_noise,
            labels,
            notes,
        }
    }

    pub fn labels(&self) -> &BTreeMap<RouteId, i32> {
        &self.labels
    }

    pub fn label(&self, id: RouteId) -> Option<i32> {
        self.labels.get(&id).copied()
    }

    /// Number of distinct non-noise clusters.
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Number of routes labeled as noise.
    pub fn n_noise(&self) -> usize {
        self.n_noise
    }

    /// Notes recorded while normalizing the request (e.g. a dropped eps).
    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dbscan_requires_eps() {
        let request = ClusterRequest::new(
            ClusterMethod::Dbscan,
            ClusterParams {
                eps: None,
                min_samples: 2,
            },
        );
        let err = request.validate().unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter { .. }));
        assert_eq!(err.algorithm(), "DBSCAN");

        let request = ClusterRequest::new(
            ClusterMethod::Dbscan,
            ClusterParams {
                eps: Some(0.0),
                min_samples: 2,
            },
        );
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_optics_requires_two_min_samples() {
        let request = ClusterRequest::new(
            ClusterMethod::Optics,
            ClusterParams {
                eps: None,
                min_samples: 1,
            },
        );
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_optics_drops_eps_with_note() {
        let request = ClusterRequest::new(
            ClusterMethod::Optics,
            ClusterParams {
                eps: Some(0.7),
                min_samples: 3,
            },
        );
        let (signature, note) = request.normalized();
        assert_eq!(signature, vec![3]);
        assert!(note.unwrap().contains("0.7"));

        // eps does not influence the normalized identity
        let bare = ClusterRequest::new(
            ClusterMethod::Optics,
            ClusterParams {
                eps: None,
                min_samples: 3,
            },
        );
        assert_eq!(bare.normalized().0, vec![3]);
    }

    #[test]
    fn test_defaults_scale_with_route_count() {
        assert_eq!(ClusterParams::defaults_for(4).min_samples, 2);
        assert_eq!(ClusterParams::defaults_for(40).min_samples, 10);
        assert_eq!(ClusterParams::defaults_for(4).eps, Some(0.5));
    }

    #[test]
    fn test_result_counts() {
        let result =
            ClusterResult::from_labels([10, 11, 12, 13], vec![0, 0, 1, -1], Vec::new());
        assert_eq!(result.n_clusters(), 2);
        assert_eq!(result.n_noise(), 1);
        assert_eq!(result.label(13), Some(NOISE_LABEL));
        assert_eq!(result.label(99), None);
    }
}
