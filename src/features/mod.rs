//! # Feature Extractor
//!
//! Turns each route into a fixed-schema numeric vector: start and end
//! coordinates, arc length, and optionally the interpolated midpoint, the
//! 1/3 and 2/3 points, and the straight-line start-to-end distance.
//!
//! Values are emitted as drawn; scaling/normalization is the reduction
//! stage's concern.

use log::warn;
use ndarray::Array2;

use crate::store::{Point, Route, RouteId, RouteSnapshot};

/// Which optional columns the feature schema carries.
///
/// The base schema is always `start_x, start_y, end_x, end_y, length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeatureConfig {
    pub include_middle_point: bool,
    pub include_third_points: bool,
    pub include_euclidean_distance: bool,
}

impl FeatureConfig {
    /// Width of a feature vector under this configuration.
    pub fn vector_len(&self) -> usize {
        5 + if self.include_middle_point { 2 } else { 0 }
            + if self.include_third_points { 4 } else { 0 }
            + if self.include_euclidean_distance { 1 } else { 0 }
    }

    /// Column names in schema order, for dialogs and plot axes.
    pub fn feature_names(&self) -> Vec<&'static str> {
        let mut names = vec!["start_x", "start_y", "end_x", "end_y", "length"];
        if self.include_middle_point {
            names.extend(["middle_x", "middle_y"]);
        }
        if self.include_third_points {
            names.extend(["third1_x", "third1_y", "third2_x", "third2_y"]);
        }
        if self.include_euclidean_distance {
            names.push("euclidean_dist");
        }
        names
    }
}

/// Feature matrix over the surviving routes, rows in `route_ids` order.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub matrix: Array2<f64>,
    pub route_ids: Vec<RouteId>,
    /// Routes skipped because they have fewer than 2 points.
    pub excluded: Vec<RouteId>,
}

impl FeatureMatrix {
    pub fn n_routes(&self) -> usize {
        self.route_ids.len()
    }

    /// Feature vector of one route, if it survived extraction.
    pub fn vector(&self, id: RouteId) -> Option<Vec<f64>> {
        let row = self.route_ids.iter().position(|&r| r == id)?;
        Some(self.matrix.row(row).to_vec())
    }
}

/// Extract the feature matrix for a snapshot. Routes with fewer than 2
/// points are excluded with a warning, not a failure.
pub fn extract(snapshot: &RouteSnapshot, config: &FeatureConfig) -> FeatureMatrix {
    let mut rows = Vec::new();
    let mut route_ids = Vec::new();
    let mut excluded = Vec::new();

    for route in snapshot.routes() {
        if !route.is_analyzable() {
            warn!(
                "route {} has {} point(s), excluding it from the feature matrix",
                route.id(),
                route.point_count()
            );
            excluded.push(route.id());
            continue;
        }
        rows.push(route_features(route, config));
        route_ids.push(route.id());
    }

    let width = config.vector_len();
    let mut matrix = Array2::zeros((rows.len(), width));
    for (i, row) in rows.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            matrix[[i, j]] = *value;
        }
    }

    FeatureMatrix {
        matrix,
        route_ids,
        excluded,
    }
}

fn route_features(route: &Route, config: &FeatureConfig) -> Vec<f64> {
    let points = route.points();
    let start = points[0];
    let end = points[points.len() - 1];
    let length = route.length();

    let mut vector = vec![start.x, start.y, end.x, end.y, length];

    if config.include_middle_point {
        let mid = point_at_distance(points, length / 2.0);
        vector.extend([mid.x, mid.y]);
    }
    if config.include_third_points {
        let first = point_at_distance(points, length / 3.0);
        let second = point_at_distance(points, 2.0 * length / 3.0);
        vector.extend([first.x, first.y, second.x, second.y]);
    }
    if config.include_euclidean_distance {
        vector.push(start.distance(&end));
    }

    vector
}

/// Point at a given arc-length distance along a polyline, walking the
/// cumulative-length array and interpolating inside the straddling segment.
///
/// A non-positive target returns the first point; a target beyond the total
/// length returns the last; a zero-length segment contributes its start. A
/// fully degenerate route (all points coincident) therefore answers every
/// query with its first point.
pub fn point_at_distance(points: &[Point], target: f64) -> Point {
    if target <= 0.0 {
        return points[0];
    }

    let mut walked = 0.0;
    for seg in points.windows(2) {
        let segment_length = seg[0].distance(&seg[1]);
        if walked + segment_length >= target {
            if segment_length == 0.0 {
                return seg[0];
            }
            let ratio = (target - walked) / segment_length;
            return Point::new(
                seg[0].x + ratio * (seg[1].x - seg[0].x),
                seg[0].y + ratio * (seg[1].y - seg[0].y),
            );
        }
        walked += segment_length;
    }

    points[points.len() - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RouteStore;
    use approx::assert_relative_eq;

    fn snapshot_of(routes: &[&[(f64, f64)]]) -> RouteSnapshot {
        let mut store = RouteStore::new();
        for route in routes {
            let id = store.start_route();
            for &(x, y) in *route {
                store.push_point(id, Point::new(x, y));
            }
        }
        store.snapshot()
    }

    #[test]
    fn test_vector_len_for_all_configs() {
        for mid in [false, true] {
            for third in [false, true] {
                for eucl in [false, true] {
                    let config = FeatureConfig {
                        include_middle_point: mid,
                        include_third_points: third,
                        include_euclidean_distance: eucl,
                    };
                    let expected = 5
                        + 2 * usize::from(mid)
                        + 4 * usize::from(third)
                        + usize::from(eucl);
                    assert_eq!(config.vector_len(), expected);
                    assert_eq!(config.feature_names().len(), expected);

                    let snapshot = snapshot_of(&[&[(0.0, 0.0), (1.0, 2.0), (4.0, 2.0)]]);
                    let features = extract(&snapshot, &config);
                    assert_eq!(features.matrix.ncols(), expected);
                }
            }
        }
    }

    #[test]
    fn test_straight_segment_features() {
        let snapshot = snapshot_of(&[&[(0.0, 0.0), (10.0, 0.0)]]);
        let config = FeatureConfig {
            include_middle_point: true,
            include_third_points: true,
            include_euclidean_distance: true,
        };
        let features = extract(&snapshot, &config);
        let row = features.matrix.row(0);

        // start, end
        assert_eq!(&row.to_vec()[..4], &[0.0, 0.0, 10.0, 0.0]);
        // length
        assert_relative_eq!(row[4], 10.0);
        // middle point
        assert_relative_eq!(row[5], 5.0);
        assert_relative_eq!(row[6], 0.0);
        // third points
        assert_relative_eq!(row[7], 10.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(row[9], 20.0 / 3.0, epsilon = 1e-9);
        // euclidean distance
        assert_relative_eq!(row[11], 10.0);
    }

    #[test]
    fn test_single_point_route_is_excluded() {
        let snapshot = snapshot_of(&[&[(5.0, 5.0)], &[(0.0, 0.0), (1.0, 0.0)]]);
        let features = extract(&snapshot, &FeatureConfig::default());
        assert_eq!(features.n_routes(), 1);
        assert_eq!(features.excluded.len(), 1);
        assert!(features.vector(features.excluded[0]).is_none());
    }

    #[test]
    fn test_degenerate_route_has_zero_length() {
        let snapshot = snapshot_of(&[&[(2.0, 3.0), (2.0, 3.0)]]);
        let config = FeatureConfig {
            include_middle_point: true,
            include_third_points: true,
            include_euclidean_distance: true,
        };
        let features = extract(&snapshot, &config);
        let row = features.matrix.row(0);

        assert_eq!(row[4], 0.0);
        // every fractional-length query collapses to the coincident point
        assert_eq!((row[5], row[6]), (2.0, 3.0));
        assert_eq!((row[7], row[8]), (2.0, 3.0));
        assert_eq!(row[11], 0.0);
    }

    #[test]
    fn test_point_at_distance_multi_segment() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
        ];
        let mid = point_at_distance(&points, 4.0);
        assert_eq!((mid.x, mid.y), (4.0, 0.0));
        let inside = point_at_distance(&points, 6.0);
        assert_relative_eq!(inside.x, 4.0);
        assert_relative_eq!(inside.y, 2.0);
        let past = point_at_distance(&points, 100.0);
        assert_eq!((past.x, past.y), (4.0, 4.0));
    }
}
