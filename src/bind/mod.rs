//! # Result Binder
//!
//! Maps cluster labels and embedding coordinates back onto route identities
//! for the canvas and scatterplot: a stable label-to-color assignment for
//! highlighting, and the reverse lookup from a selected route to its feature
//! vector, embedded position and label.

use std::collections::BTreeMap;

use crate::cluster::ClusterResult;
use crate::features::FeatureMatrix;
use crate::pipeline::Embedding;
use crate::store::RouteId;

/// Cluster highlight colors, assigned round-robin by label.
pub const CLUSTER_PALETTE: [&str; 15] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E9",
    "#F8C471", "#82E0AA", "#F1948A", "#85C9F5", "#F9E79F", "#D7BDE2", "#A9DFBF",
];

/// Reserved color for noise points, distinct from every palette entry.
pub const NOISE_COLOR: &str = "#808080";

/// Display color of one label: a palette slot, or the reserved noise color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorIndex {
    Noise,
    Cluster(usize),
}

/// Deterministic label-to-color assignment; `-1` (and any negative label)
/// always maps to [`ColorIndex::Noise`].
pub fn color_index(label: i32) -> ColorIndex {
    if label < 0 {
        ColorIndex::Noise
    } else {
        ColorIndex::Cluster(label as usize % CLUSTER_PALETTE.len())
    }
}

/// Hex color for a display color.
pub fn color_hex(index: ColorIndex) -> &'static str {
    match index {
        ColorIndex::Noise => NOISE_COLOR,
        ColorIndex::Cluster(slot) => CLUSTER_PALETTE[slot],
    }
}

/// Display-ready highlight for one route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Highlight {
    pub label: i32,
    pub color: ColorIndex,
    pub color_hex: &'static str,
}

/// Per-route highlights for canvas re-coloring. Routes absent from the
/// result (added after the embedding was computed, or excluded as
/// degenerate) are simply absent; the canvas keeps its default color for
/// them.
pub fn highlights(result: &ClusterResult) -> BTreeMap<RouteId, Highlight> {
    result
        .labels()
        .iter()
        .map(|(&id, &label)| {
            let color = color_index(label);
            (
                id,
                Highlight {
                    label,
                    color,
                    color_hex: color_hex(color),
                },
            )
        })
        .collect()
}

/// Everything the inspector shows for one selected route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteInsight {
    pub feature_vector: Vec<f64>,
    pub position: [f64; 2],
    pub label: Option<i32>,
}

/// Reverse lookup for a selection in the scatterplot: feature vector,
/// embedded position and (when clustering ran) the cluster label.
pub fn inspect(
    id: RouteId,
    features: &FeatureMatrix,
    embedding: &Embedding,
    clusters: Option<&ClusterResult>,
) -> Option<RouteInsight> {
    let position = embedding.get(id)?;
    let feature_vector = features.vector(id)?;
    Some(RouteInsight {
        feature_vector,
        position,
        label: clusters.and_then(|result| result.label(id)),
    })
}
