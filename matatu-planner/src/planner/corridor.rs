//! Corridor whitelist for long trips.
//!
//! A corridor is the set of coarse cells along the straight line between
//! origin and destination (with a one-cell margin), plus explicitly allowed
//! stops: the endpoint candidates, hubs near them, the best-connected
//! "portal" stop of each corridor cell, and the busiest CBD stops when
//! either endpoint is in the CBD.

use std::collections::{HashMap, HashSet};

use h3o::CellIndex;
use tracing::debug;

use crate::domain::{Point, StopId};
use crate::geometry::{haversine_m, neighbor_spacing_m, sample_segment};

use super::config::PlannerConfig;
use super::network::Network;
use super::resolver::Candidate;

/// Stops and coarse cells a search may pass through.
#[derive(Debug, Clone, Default)]
pub struct Corridor {
    stops: HashSet<StopId>,
    cells: HashSet<CellIndex>,
}

impl Corridor {
    /// Build a corridor between two endpoints.
    pub fn build(
        network: &Network,
        origin: Point,
        destination: Point,
        origin_candidates: &[Candidate],
        destination_candidates: &[Candidate],
        config: &PlannerConfig,
    ) -> Self {
        let mut corridor = Corridor::default();

        if let Some(start) = network.coarse_cell_of(origin) {
            let step = neighbor_spacing_m(start).min(haversine_m(origin, destination));
            for p in sample_segment(origin, destination, step.max(1.0)) {
                if let Some(cell) = network.coarse_cell_of(p) {
                    corridor.cells.extend(cell.grid_disk::<Vec<_>>(1));
                }
            }
        }

        let seeds: Vec<&Candidate> = origin_candidates
            .iter()
            .chain(destination_candidates)
            .collect();
        corridor
            .stops
            .extend(seeds.iter().map(|c| c.stop_id.clone()));

        // Hubs near the seeds
        for (hub, _) in network.hubs() {
            let Some(hub_stop) = network.stop(hub) else {
                continue;
            };
            let near_seed = seeds.iter().any(|c| {
                network
                    .stop(&c.stop_id)
                    .is_some_and(|s| haversine_m(s.location, hub_stop.location) <= config.max_hub_distance_m)
            });
            if near_seed {
                corridor.stops.insert(hub.clone());
            }
        }

        // Portal: best-connected stop in each corridor cell
        let mut portals: HashMap<CellIndex, (usize, StopId)> = HashMap::new();
        for stop in network.stops() {
            let Some(cell) = network.coarse_cell_of(stop.location) else {
                continue;
            };
            if !corridor.cells.contains(&cell) {
                continue;
            }
            let degree = network.route_degree(&stop.id);
            if degree == 0 {
                continue;
            }
            let better = portals
                .get(&cell)
                .is_none_or(|(d, id)| degree > *d || (degree == *d && stop.id.as_str() < id.as_str()));
            if better {
                portals.insert(cell, (degree, stop.id.clone()));
            }
        }
        corridor
            .stops
            .extend(portals.into_values().map(|(_, id)| id));

        if network.point_in_cbd(origin) || network.point_in_cbd(destination) {
            let mut cbd: Vec<(usize, &StopId)> = network
                .cbd_stops()
                .map(|id| (network.route_degree(id), id))
                .collect();
            cbd.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.as_str().cmp(b.1.as_str())));
            corridor.stops.extend(
                cbd.into_iter()
                    .take(config.corridor_cbd_top)
                    .map(|(_, id)| id.clone()),
            );
        }

        debug!(
            cells = corridor.cells.len(),
            stops = corridor.stops.len(),
            "corridor built"
        );
        corridor
    }

    /// Returns true if the corridor itself lists `stop` or its cell.
    pub fn contains(&self, network: &Network, stop: &StopId) -> bool {
        if self.stops.contains(stop) {
            return true;
        }
        network
            .stop(stop)
            .and_then(|s| network.coarse_cell_of(s.location))
            .is_some_and(|cell| self.cells.contains(&cell))
    }
}

/// Whether the search may pass through `stop`.
///
/// Destination, hub and CBD stops are always allowed; otherwise the stop
/// must be in the corridor. No corridor means no restriction.
pub fn allowed(
    network: &Network,
    corridor: Option<&Corridor>,
    stop: &StopId,
    is_destination: bool,
) -> bool {
    if is_destination || network.is_hub(stop) || network.in_cbd(stop) {
        return true;
    }
    corridor.is_none_or(|c| c.contains(network, stop))
}
