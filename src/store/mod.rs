//! # Route Store
//!
//! Holds the ordered set of user-drawn routes. The store is owned by the
//! editor; the pipeline only ever reads an immutable [`RouteSnapshot`] taken
//! before a computation starts, so in-progress drags are never observed.
//!
//! Every mutation bumps a monotonically increasing revision counter. The
//! counter, together with the per-route point counts, forms the
//! [`Fingerprint`] used by the caches to detect stale derived data without
//! relying on object identity.

use std::fmt;

/// Stable identifier of a route, assigned in creation order.
pub type RouteId = u64;

/// A single 2D coordinate on the sketch grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// An ordered polyline drawn by the user. Always has at least one point once
/// the first click lands; routes with fewer than 2 points are kept in the
/// store but excluded from analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    id: RouteId,
    points: Vec<Point>,
}

impl Route {
    pub fn id(&self) -> RouteId {
        self.id
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Whether the route can contribute a feature vector.
    pub fn is_analyzable(&self) -> bool {
        self.points.len() >= 2
    }

    /// Total arc length: sum of Euclidean distances between consecutive points.
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|seg| seg[0].distance(&seg[1]))
            .sum()
    }
}

impl fmt::Display for Route {
    /// Route-list line for the editor's side pane.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.points.as_slice() {
            [] => write!(f, "Route {}: (empty)", self.id),
            [only] => write!(
                f,
                "Route {}: ({},{}) (single point)",
                self.id, only.x, only.y
            ),
            [start, .., end] => write!(
                f,
                "Route {}: ({},{}) \u{2192} ({},{}) | Len: {:.2}",
                self.id,
                start.x,
                start.y,
                end.x,
                end.y,
                self.length()
            ),
        }
    }
}

/// Structural summary of the route set at one revision. Two fingerprints are
/// equal exactly when no mutation happened between them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    revision: u64,
    routes: Vec<(RouteId, usize)>,
}

/// Immutable point-in-time copy of the route set handed to the pipeline.
#[derive(Debug, Clone)]
pub struct RouteSnapshot {
    routes: Vec<Route>,
    fingerprint: Fingerprint,
}

impl RouteSnapshot {
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn get(&self, id: RouteId) -> Option<&Route> {
        self.routes.iter().find(|r| r.id == id)
    }
}

/// Owner of all route lifetimes. Derived data (feature vectors, embeddings,
/// cluster labels) lives elsewhere and is recomputed from snapshots.
#[derive(Debug, Default)]
pub struct RouteStore {
    routes: Vec<Route>,
    next_id: RouteId,
    revision: u64,
}

impl RouteStore {
    pub fn new() -> Self {
        RouteStore::default()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn get(&self, id: RouteId) -> Option<&Route> {
        self.routes.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Current revision counter; bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Begin a new empty route and return its id.
    pub fn start_route(&mut self) -> RouteId {
        let id = self.next_id;
        self.next_id += 1;
        self.routes.push(Route {
            id,
            points: Vec::new(),
        });
        self.bump();
        id
    }

    /// Append a point to the end of a route.
    pub fn push_point(&mut self, id: RouteId, point: Point) -> bool {
        match self.route_mut(id) {
            Some(route) => {
                route.points.push(point);
                self.bump();
                true
            }
            None => false,
        }
    }

    /// Move an existing point (drag release).
    pub fn move_point(&mut self, id: RouteId, index: usize, point: Point) -> bool {
        match self.route_mut(id) {
            Some(route) if index < route.points.len() => {
                route.points[index] = point;
                self.bump();
                true
            }
            _ => false,
        }
    }

    /// Insert a point into a segment (right click on a line).
    pub fn insert_point(&mut self, id: RouteId, index: usize, point: Point) -> bool {
        match self.route_mut(id) {
            Some(route) if index <= route.points.len() => {
                route.points.insert(index, point);
                self.bump();
                true
            }
            _ => false,
        }
    }

    /// Remove a point; a route emptied by the removal is dropped entirely.
    pub fn remove_point(&mut self, id: RouteId, index: usize) -> bool {
        let now_empty = match self.route_mut(id) {
            Some(route) if index < route.points.len() => {
                route.points.remove(index);
                route.points.is_empty()
            }
            _ => return false,
        };
        if now_empty {
            self.routes.retain(|r| r.id != id);
        }
        self.bump();
        true
    }

    /// Drop the most recently added point of a route.
    pub fn undo_last_point(&mut self, id: RouteId) -> bool {
        match self.route_mut(id) {
            Some(route) if !route.points.is_empty() => {
                route.points.pop();
                self.bump();
                true
            }
            _ => false,
        }
    }

    /// Remove every route.
    pub fn clear(&mut self) {
        self.routes.clear();
        self.bump();
    }

    /// Immutable copy of the current state for the pipeline to read.
    pub fn snapshot(&self) -> RouteSnapshot {
        RouteSnapshot {
            routes: self.routes.clone(),
            fingerprint: self.fingerprint(),
        }
    }

    /// Structural fingerprint of the current route set.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            revision: self.revision,
            routes: self
                .routes
                .iter()
                .map(|r| (r.id, r.points.len()))
                .collect(),
        }
    }

    fn route_mut(&mut self, id: RouteId) -> Option<&mut Route> {
        self.routes.iter_mut().find(|r| r.id == id)
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}
