//! Geospatial stop resolution.
//!
//! Maps a coordinate to nearby stops: a ring search over the cell index,
//! a full distance scan when the rings are too sparse, then hub stops of the
//! surrounding region merged in.

use std::collections::HashSet;

use tracing::trace;

use crate::domain::{Point, StopId};
use crate::geometry::haversine_m;

use super::config::PlannerConfig;
use super::network::Network;

/// A stop considered for boarding or alighting near an endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub stop_id: StopId,
    /// Straight-line distance from the endpoint.
    pub distance_m: f64,
    pub is_hub: bool,
}

/// Candidate stops for `point`, nearest first, hubs after.
///
/// Returns at least the nearest stop whenever the network has any stop, and
/// never the same stop twice.
pub fn resolve(network: &Network, point: Point, config: &PlannerConfig) -> Vec<Candidate> {
    let count = config.nearby_stop_count.max(1);

    let mut nearest = ring_search(network, point, count, config.max_ring);
    if nearest.len() < count {
        trace!(found = nearest.len(), "rings too sparse, scanning all stops");
        nearest = scan_all(network, point, count);
    }

    let hubs = nearby_hubs(network, point, config);

    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(nearest.len() + hubs.len());
    for (stop_id, distance_m) in nearest.into_iter().chain(hubs) {
        if !seen.insert(stop_id.clone()) {
            continue;
        }
        merged.push(Candidate {
            is_hub: network.is_hub(&stop_id),
            stop_id,
            distance_m,
        });
    }
    merged.truncate(config.candidate_cap.max(1));
    merged
}

/// Expanding ring search. After the ring that completes `count`, one more
/// ring is scanned so stops just across a cell edge are not missed.
fn ring_search(network: &Network, point: Point, count: usize, max_ring: u32) -> Vec<(StopId, f64)> {
    let Some(origin) = network.cell_of(point) else {
        return Vec::new();
    };

    let mut visited = HashSet::new();
    let mut found: Vec<(StopId, f64)> = Vec::new();
    let mut extra_ring = false;

    for k in 0..=max_ring {
        for cell in origin.grid_disk::<Vec<_>>(k) {
            if !visited.insert(cell) {
                continue;
            }
            for id in network.stops_in_cell(cell) {
                if let Some(stop) = network.stop(id) {
                    found.push((id.clone(), haversine_m(point, stop.location)));
                }
            }
        }
        if extra_ring {
            break;
        }
        if found.len() >= count {
            extra_ring = true;
        }
    }

    found.sort_by(|a, b| a.1.total_cmp(&b.1));
    found.truncate(count);
    found
}

fn scan_all(network: &Network, point: Point, count: usize) -> Vec<(StopId, f64)> {
    let mut all: Vec<(StopId, f64)> = network
        .stops()
        .map(|s| (s.id.clone(), haversine_m(point, s.location)))
        .collect();
    all.sort_by(|a, b| a.1.total_cmp(&b.1));
    all.truncate(count);
    all
}

/// Hubs of the regions containing `point`, or the nearest hubs when no
/// region does.
fn nearby_hubs(network: &Network, point: Point, config: &PlannerConfig) -> Vec<(StopId, f64)> {
    let mut in_region = Vec::new();
    let mut elsewhere = Vec::new();

    for (id, region) in network.hubs() {
        let Some(stop) = network.stop(id) else {
            continue;
        };
        let d = haversine_m(point, stop.location);
        if d > config.max_hub_distance_m {
            continue;
        }
        match network.region(region) {
            Some(r) if r.contains(point) => in_region.push((id.clone(), d)),
            _ => elsewhere.push((id.clone(), d)),
        }
    }

    let mut hubs = if in_region.is_empty() {
        elsewhere
    } else {
        in_region
    };
    hubs.sort_by(|a, b| a.1.total_cmp(&b.1));
    hubs.truncate(config.hub_cap);
    hubs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::testkit::{Fixture, pt};

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.stop_id.as_str()).collect()
    }

    fn config(count: usize) -> PlannerConfig {
        PlannerConfig {
            nearby_stop_count: count,
            ..PlannerConfig::default()
        }
    }

    fn fixture() -> Fixture {
        let mut f = Fixture::new();
        f.stop("A", -1.2840, 36.8260)
            .stop("B", -1.2830, 36.8240)
            .stop("C", -1.2800, 36.8200)
            .stop("HUB", -1.2650, 36.8030)
            .stop("OTHERHUB", -1.2200, 36.8900)
            .hub("HUB", "Westlands")
            .hub("OTHERHUB", "Kasarani")
            .region("Westlands", &[(-1.30, 36.79), (-1.30, 36.84), (-1.25, 36.84), (-1.25, 36.79)]);
        f
    }

    #[test]
    fn nearest_first() {
        let net = fixture().network();
        let found = resolve(&net, pt(-1.2841, 36.8259), &config(2));
        assert_eq!(&ids(&found)[..2], &["A", "B"]);
        assert!(found[0].distance_m < found[1].distance_m);
    }

    #[test]
    fn hubs_of_containing_region_are_merged() {
        let net = fixture().network();
        let found = resolve(&net, pt(-1.2841, 36.8259), &config(2));
        assert_eq!(ids(&found), vec!["A", "B", "HUB"]);
        assert!(found[2].is_hub);
    }

    #[test]
    fn no_duplicates_when_hub_is_also_nearest() {
        let net = fixture().network();
        let found = resolve(&net, pt(-1.2650, 36.8030), &config(3));
        let unique: HashSet<_> = found.iter().map(|c| &c.stop_id).collect();
        assert_eq!(unique.len(), found.len());
        assert_eq!(found[0].stop_id.as_str(), "HUB");
        assert!(found[0].is_hub);
    }

    #[test]
    fn sparse_area_falls_back_to_scan() {
        let net = fixture().network();
        // ~100 km away: far beyond any ring
        let found = resolve(&net, pt(-0.40, 36.95), &config(1));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].stop_id.as_str(), "OTHERHUB");
    }

    #[test]
    fn empty_network_resolves_nothing() {
        let net = Fixture::new().network();
        assert!(resolve(&net, pt(-1.28, 36.82), &config(3)).is_empty());
    }

    #[test]
    fn candidate_cap_applies() {
        let net = fixture().network();
        let cfg = PlannerConfig {
            nearby_stop_count: 4,
            candidate_cap: 2,
            ..PlannerConfig::default()
        };
        assert_eq!(resolve(&net, pt(-1.2841, 36.8259), &cfg).len(), 2);
    }
}
