//! # Analysis pipeline
//!
//! The two stateful pipeline stages: the reduction orchestrator
//! ([`Reducer`]) and the clustering engine ([`ClusterEngine`]). Both own a
//! cache of derived results keyed structurally by (algorithm, normalized
//! parameters, feature schema, route-set fingerprint); any route mutation
//! observed through a new fingerprint conservatively clears the whole cache.
//!
//! Both stages are synchronous: a call blocks until its result or failure
//! is available, and a failure never touches previously cached results.
//! The caches sit behind a mutex so the compute methods take `&self`; under
//! the editor's single-threaded request model the lock is uncontended.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};
use ndarray::Array2;
use parking_lot::Mutex;

use crate::cluster::{ClusterMethod, ClusterRequest, ClusterResult};
use crate::dimred::{self, AnalysisRequest, Reduction};
use crate::error::AnalysisError;
use crate::features::{self, FeatureConfig, FeatureMatrix};
use crate::store::{Fingerprint, RouteId, RouteSnapshot};

/// A 2D reduction below this many surviving routes is degenerate.
pub const MIN_ROUTES: usize = 2;

/// Structural identity of an embedding: what was computed, over which
/// feature schema, against which route-set state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct EmbeddingKey {
    algorithm: &'static str,
    signature: Vec<u64>,
    features: FeatureConfig,
    fingerprint: Fingerprint,
}

/// One 2D point per surviving route, tagged with the request that produced
/// it and the fingerprint of the snapshot it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    request: AnalysisRequest,
    coords: BTreeMap<RouteId, [f64; 2]>,
    pub(crate) key: EmbeddingKey,
}

impl Embedding {
    pub fn request(&self) -> &AnalysisRequest {
        &self.request
    }

    pub fn coords(&self) -> &BTreeMap<RouteId, [f64; 2]> {
        &self.coords
    }

    pub fn get(&self, id: RouteId) -> Option<[f64; 2]> {
        self.coords.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Fingerprint of the route set this embedding was computed from. The
    /// UI compares it against the live store to discard superseded results.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.key.fingerprint
    }
}

/// Embeddings and per-algorithm failures from a compare-all run.
#[derive(Debug, Clone, Default)]
pub struct Comparison {
    pub embeddings: BTreeMap<&'static str, Embedding>,
    pub failures: BTreeMap<&'static str, AnalysisError>,
}

#[derive(Default)]
struct ReducerState {
    cache: HashMap<EmbeddingKey, Embedding>,
    last_fingerprint: Option<Fingerprint>,
    recomputations: u64,
    invalidations: u64,
}

impl ReducerState {
    /// Conservative invalidation: any fingerprint change drops every entry.
    fn observe(&mut self, fingerprint: &Fingerprint, what: &str) {
        if self.last_fingerprint.as_ref() != Some(fingerprint) {
            if !self.cache.is_empty() {
                info!(
                    "route set changed, invalidating {} cached {what}(s)",
                    self.cache.len()
                );
                self.invalidations += 1;
                self.cache.clear();
            }
            self.last_fingerprint = Some(fingerprint.clone());
        }
    }
}

/// Reduction orchestrator: validates requests, plumbs parameters into the
/// algorithms and packages their output into route-keyed embeddings.
#[derive(Default)]
pub struct Reducer {
    state: Mutex<ReducerState>,
}

impl Reducer {
    pub fn new() -> Self {
        Reducer::default()
    }

    /// Compute (or fetch from cache) the embedding for one request.
    pub fn embed(
        &self,
        snapshot: &RouteSnapshot,
        request: &AnalysisRequest,
    ) -> Result<Embedding, AnalysisError> {
        let matrix = features::extract(snapshot, &request.features);
        self.embed_extracted(snapshot, &matrix, request)
    }

    /// Run every algorithm with defaults adapted to the route count.
    /// Failures are isolated per algorithm; the comparison itself succeeds
    /// as long as the data suffices.
    pub fn compare_all(
        &self,
        snapshot: &RouteSnapshot,
        features_config: &FeatureConfig,
    ) -> Result<Comparison, AnalysisError> {
        let matrix = features::extract(snapshot, features_config);
        let n = matrix.n_routes();
        if n < MIN_ROUTES {
            return Err(AnalysisError::InsufficientData {
                algorithm: "compare-all",
                required: MIN_ROUTES,
                available: n,
            });
        }

        let mut comparison = Comparison::default();
        for reduction in Reduction::all_with_defaults(n) {
            let name = reduction.name();
            let request = AnalysisRequest::new(reduction, *features_config);
            match self.embed_extracted(snapshot, &matrix, &request) {
                Ok(embedding) => {
                    comparison.embeddings.insert(name, embedding);
                }
                Err(error) => {
                    warn!("{name} failed during comparison: {error}");
                    comparison.failures.insert(name, error);
                }
            }
        }
        Ok(comparison)
    }

    /// How many embeddings were actually computed (cache misses).
    pub fn recompute_count(&self) -> u64 {
        self.state.lock().recomputations
    }

    /// How many times a route-set change cleared the cache.
    pub fn invalidation_count(&self) -> u64 {
        self.state.lock().invalidations
    }

    fn embed_extracted(
        &self,
        snapshot: &RouteSnapshot,
        matrix: &FeatureMatrix,
        request: &AnalysisRequest,
    ) -> Result<Embedding, AnalysisError> {
        let n = matrix.n_routes();
        let algorithm = request.reduction.name();
        if n < MIN_ROUTES {
            return Err(AnalysisError::InsufficientData {
                algorithm,
                required: MIN_ROUTES,
                available: n,
            });
        }

        let key = EmbeddingKey {
            algorithm,
            signature: request.reduction.cache_signature(),
            features: request.features,
            fingerprint: snapshot.fingerprint().clone(),
        };

        {
            let mut state = self.state.lock();
            state.observe(&key.fingerprint, "embedding");
            if let Some(hit) = state.cache.get(&key) {
                debug!("{algorithm}: embedding served from cache");
                return Ok(hit.clone());
            }
        }

        request.reduction.validate(n)?;
        let mut standardized = matrix.matrix.clone();
        dimred::standardize(&mut standardized);
        let coords = request.reduction.compute(standardized.view())?;

        let embedding = Embedding {
            request: request.clone(),
            coords: matrix
                .route_ids
                .iter()
                .enumerate()
                .map(|(row, &id)| (id, [coords[[row, 0]], coords[[row, 1]]]))
                .collect(),
            key: key.clone(),
        };

        let mut state = self.state.lock();
        state.recomputations += 1;
        state.cache.insert(key, embedding.clone());
        Ok(embedding)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClusterKey {
    embedding: EmbeddingKey,
    method: ClusterMethod,
    signature: Vec<u64>,
}

#[derive(Default)]
struct ClusterEngineState {
    cache: HashMap<ClusterKey, ClusterResult>,
    last_fingerprint: Option<Fingerprint>,
    recomputations: u64,
    invalidations: u64,
}

/// Clustering engine over computed embeddings.
#[derive(Default)]
pub struct ClusterEngine {
    state: Mutex<ClusterEngineState>,
}

impl ClusterEngine {
    pub fn new() -> Self {
        ClusterEngine::default()
    }

    /// Compute (or fetch from cache) the cluster labels for one embedding.
    pub fn cluster(
        &self,
        embedding: &Embedding,
        request: &ClusterRequest,
    ) -> Result<ClusterResult, AnalysisError> {
        request.validate()?;
        let (signature, note) = request.normalized();
        if let Some(note) = &note {
            warn!("{note}");
        }

        let key = ClusterKey {
            embedding: embedding.key.clone(),
            method: request.method,
            signature,
        };

        {
            let mut state = self.state.lock();
            let fingerprint = embedding.fingerprint().clone();
            if state.last_fingerprint.as_ref() != Some(&fingerprint) {
                if !state.cache.is_empty() {
                    info!(
                        "route set changed, invalidating {} cached cluster result(s)",
                        state.cache.len()
                    );
                    state.invalidations += 1;
                    state.cache.clear();
                }
                state.last_fingerprint = Some(fingerprint);
            }
            if let Some(hit) = state.cache.get(&key) {
                debug!("{}: cluster labels served from cache", request.method.name());
                return Ok(hit.clone());
            }
        }

        let n = embedding.len();
        let mut coords = Array2::zeros((n, 2));
        let ids: Vec<RouteId> = embedding
            .coords()
            .iter()
            .enumerate()
            .map(|(row, (&id, point))| {
                coords[[row, 0]] = point[0];
                coords[[row, 1]] = point[1];
                id
            })
            .collect();

        let labels = request.compute(coords.view())?;
        let result = ClusterResult::from_labels(ids, labels, note.into_iter().collect());

        let mut state = self.state.lock();
        state.recomputations += 1;
        state.cache.insert(key, result.clone());
        Ok(result)
    }

    /// How many clusterings were actually computed (cache misses).
    pub fn recompute_count(&self) -> u64 {
        self.state.lock().recomputations
    }

    /// How many times a route-set change cleared the cache.
    pub fn invalidation_count(&self) -> u64 {
        self.state.lock().invalidations
    }
}
