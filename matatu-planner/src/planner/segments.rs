//! Per-route segment precomputation.
//!
//! For each route touched by a search we compute, once, the cumulative
//! great-circle distance at every stop index. Downstream scan targets are a
//! bounded set of indices per boarding, so a route with a hundred stops
//! still costs a constant fan-out per boarding.

use std::collections::HashMap;
use std::rc::Rc;

use crate::geometry::haversine_m;

use super::config::PlannerConfig;
use super::network::Network;

/// Cumulative distance along one route.
#[derive(Debug, Clone)]
pub struct RouteSegments {
    /// Metres from the first stop; missing stops add no distance.
    cumulative: Vec<f64>,
}

impl RouteSegments {
    /// Precompute cumulative distances for route `route`.
    pub fn compute(network: &Network, route: usize) -> Self {
        let stops = &network.route(route).stops;
        let mut cumulative = Vec::with_capacity(stops.len());
        let mut total = 0.0;
        let mut prev = None;
        for id in stops {
            let here = network.stop(id).map(|s| s.location);
            if let (Some(a), Some(b)) = (prev, here) {
                total += haversine_m(a, b);
            }
            if here.is_some() {
                prev = here;
            }
            cumulative.push(total);
        }
        Self { cumulative }
    }

    /// Distance from `board` to `alight`, if both are on the route.
    pub fn between(&self, board: usize, alight: usize) -> Option<f64> {
        let a = self.cumulative.get(board)?;
        let b = self.cumulative.get(alight)?;
        Some((b - a).max(0.0))
    }

    /// Total route length.
    pub fn total_m(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }
}

/// Downstream indices to scan when boarding at `board` on a route of `len`
/// stops.
///
/// A dense window follows the boarding stop when it lies in the CBD; the
/// rest of the route is sampled at geometrically growing offsets so that at
/// most `fanout` indices are produced. The final index is always included.
pub fn scan_targets(board: usize, len: usize, in_cbd: bool, config: &PlannerConfig) -> Vec<usize> {
    if len == 0 || board + 1 >= len {
        return Vec::new();
    }
    let last = len - 1;
    let remaining = last - board;

    let mut targets = Vec::new();
    if in_cbd {
        let end = (board + config.cbd_dense_window).min(last);
        targets.extend(board + 1..=end);
    }

    let fanout = config.scan_fanout.max(1);
    if remaining <= fanout {
        targets.extend(board + 1..=last);
    } else {
        let base = (remaining as f64).ln();
        for k in 1..=fanout {
            let offset = (base * k as f64 / fanout as f64).exp().round() as usize;
            targets.push(board + offset.clamp(1, remaining));
        }
    }
    targets.push(last);

    targets.sort_unstable();
    targets.dedup();
    targets
}

/// Lazily filled segment cache, scoped to one request.
#[derive(Debug, Default)]
pub struct SegmentCache {
    routes: HashMap<usize, Rc<RouteSegments>>,
}

impl SegmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Segments for `route`, computed on first use.
    pub fn get(&mut self, network: &Network, route: usize) -> Rc<RouteSegments> {
        Rc::clone(
            self.routes
                .entry(route)
                .or_insert_with(|| Rc::new(RouteSegments::compute(network, route))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::testkit::Fixture;

    #[test]
    fn cumulative_distance() {
        let mut f = Fixture::new();
        f.stop("A", -1.30, 36.80)
            .stop("B", -1.29, 36.80)
            .stop("C", -1.28, 36.80)
            .route("R1", "Op", "1", &["A", "GHOST", "B", "C"]);
        let net = f.network();

        let segments = RouteSegments::compute(&net, 0);
        let ab = haversine_m(f.location("A"), f.location("B"));
        let bc = haversine_m(f.location("B"), f.location("C"));
        assert_eq!(segments.between(0, 1), Some(0.0));
        assert!((segments.between(0, 2).unwrap() - ab).abs() < 1e-6);
        assert!((segments.total_m() - (ab + bc)).abs() < 1e-6);
        assert_eq!(segments.between(3, 1), Some(0.0));
        assert_eq!(segments.between(0, 9), None);
    }

    #[test]
    fn short_route_scans_everything() {
        let config = PlannerConfig::default();
        assert_eq!(scan_targets(2, 6, false, &config), vec![3, 4, 5]);
        assert!(scan_targets(5, 6, false, &config).is_empty());
    }

    #[test]
    fn long_route_is_sampled() {
        let config = PlannerConfig::default();
        let targets = scan_targets(0, 150, false, &config);
        assert!(targets.len() <= config.scan_fanout + 1);
        assert_eq!(targets.first(), Some(&1));
        assert_eq!(targets.last(), Some(&149));
        assert!(targets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn cbd_boarding_adds_dense_window() {
        let config = PlannerConfig::default();
        let targets = scan_targets(10, 150, true, &config);
        for idx in 11..=25 {
            assert!(targets.contains(&idx), "missing {idx}");
        }
        assert_eq!(targets.last(), Some(&149));
    }

    #[test]
    fn cache_computes_once() {
        let mut f = Fixture::new();
        f.stop("A", -1.30, 36.80)
            .stop("B", -1.29, 36.80)
            .route("R1", "Op", "1", &["A", "B"]);
        let net = f.network();

        let mut cache = SegmentCache::new();
        let first = cache.get(&net, 0);
        let second = cache.get(&net, 0);
        assert!(Rc::ptr_eq(&first, &second));
        assert!(first.total_m() > 0.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn targets_bounded_sorted_and_end_at_last(
            len in 2usize..400,
            board_frac in 0.0f64..1.0,
            in_cbd in any::<bool>(),
        ) {
            let config = PlannerConfig::default();
            let board = ((len - 1) as f64 * board_frac) as usize;
            let targets = scan_targets(board, len, in_cbd, &config);

            if board + 1 < len {
                prop_assert_eq!(targets.last().copied(), Some(len - 1));
            }
            prop_assert!(targets.iter().all(|&t| t > board && t < len));
            prop_assert!(targets.windows(2).all(|w| w[0] < w[1]));
            let bound = config.scan_fanout + 1 + if in_cbd { config.cbd_dense_window } else { 0 };
            prop_assert!(targets.len() <= bound);
        }
    }
}
