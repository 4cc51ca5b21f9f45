//! Walking paths between places.
//!
//! Walks come from three sources, in order of preference: a stored walking
//! edge, a pedestrian-routing service, and a straight-line estimate at a
//! fixed walking speed. This module provides the router abstraction, an HTTP
//! client for an OSRM-compatible foot router, a response cache, and the
//! straight-line fallback.

mod cache;
mod error;
mod osrm;

pub use cache::{CachedRouter, RouteCacheConfig};
pub use error::WalkRouteError;
pub use osrm::{OsrmClient, OsrmConfig};

use crate::domain::Point;
use crate::geometry::{haversine_m, travel_minutes};

/// A walking path between two coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkPath {
    pub minutes: f64,
    pub distance_m: f64,
    pub geometry: Vec<Point>,
}

impl WalkPath {
    /// Straight-line estimate: haversine distance scaled by a detour factor,
    /// walked at `speed_kmh`.
    ///
    /// # Examples
    ///
    /// ```
    /// use matatu_planner::domain::Point;
    /// use matatu_planner::walking::WalkPath;
    ///
    /// let a = Point::new(-1.2864, 36.8250).unwrap();
    /// let path = WalkPath::straight_line(a, a, 5.0, 1.2);
    /// assert_eq!(path.minutes, 0.0);
    /// assert_eq!(path.geometry.len(), 2);
    /// ```
    pub fn straight_line(from: Point, to: Point, speed_kmh: f64, detour_factor: f64) -> Self {
        let distance_m = haversine_m(from, to) * detour_factor.max(1.0);
        Self {
            minutes: travel_minutes(distance_m, speed_kmh),
            distance_m,
            geometry: vec![from, to],
        }
    }
}

/// A pedestrian-routing service.
///
/// This abstraction allows the planner to be tested with mock routers.
pub trait PedestrianRouter {
    /// Find a walking path from `from` to `to`.
    async fn route(&self, from: Point, to: Point) -> Result<WalkPath, WalkRouteError>;
}

/// Router used when no pedestrian-routing service is configured.
///
/// Always fails, so every walk takes the straight-line fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRouter;

impl PedestrianRouter for NoRouter {
    async fn route(&self, _from: Point, _to: Point) -> Result<WalkPath, WalkRouteError> {
        Err(WalkRouteError::Unavailable)
    }
}

impl<R: PedestrianRouter> PedestrianRouter for &R {
    async fn route(&self, from: Point, to: Point) -> Result<WalkPath, WalkRouteError> {
        (**self).route(from, to).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lng: f64) -> Point {
        Point::new(lat, lng).unwrap()
    }

    #[test]
    fn straight_line_applies_detour() {
        let a = pt(-1.2864, 36.8250);
        let b = pt(-1.2764, 36.8250);
        let plain = WalkPath::straight_line(a, b, 5.0, 1.0);
        let detoured = WalkPath::straight_line(a, b, 5.0, 1.5);
        assert!((detoured.distance_m - plain.distance_m * 1.5).abs() < 1e-6);
        assert!(detoured.minutes > plain.minutes);
    }

    #[test]
    fn detour_below_one_is_clamped() {
        let a = pt(-1.2864, 36.8250);
        let b = pt(-1.2764, 36.8250);
        let path = WalkPath::straight_line(a, b, 5.0, 0.5);
        assert!((path.distance_m - haversine_m(a, b)).abs() < 1e-6);
    }

    #[tokio::test]
    async fn no_router_is_unavailable() {
        let a = pt(-1.2864, 36.8250);
        let result = NoRouter.route(a, a).await;
        assert!(matches!(result, Err(WalkRouteError::Unavailable)));
    }
}
