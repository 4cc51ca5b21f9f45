//! Tuning parameters for the journey planner.
//!
//! Distances are metres, speeds km/h, times minutes unless a field name says
//! otherwise. Every field can be overridden from a partial JSON document.

use std::time::Duration;

use serde::Deserialize;

use crate::geometry::travel_minutes;

/// Configuration parameters for journey planning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Maximum number of search rounds (one extra transfer each).
    pub max_rounds: usize,

    /// Wall-clock budget for the search, in milliseconds.
    pub deadline_ms: u64,

    /// Assumed average bus speed.
    pub bus_speed_kmh: f64,

    /// Assumed walking speed.
    pub walk_speed_kmh: f64,

    /// Factor from straight-line to street walking distance.
    pub walk_detour_factor: f64,

    /// Cost weight of one walking minute relative to one riding minute.
    pub walk_weight: f64,

    /// Cost charged per change of route.
    pub transfer_penalty_mins: f64,

    /// Wait charged per boarding when no schedule applies.
    pub assumed_wait_mins: f64,

    /// Cell resolution of the stop index.
    pub cell_resolution: u8,

    /// Coarse cell resolution for corridors and "same area" checks.
    pub coarse_resolution: u8,

    /// Nearest stops collected per endpoint.
    pub nearby_stop_count: usize,

    /// Largest ring searched before falling back to a full scan.
    pub max_ring: u32,

    /// Hub stops merged into each endpoint's candidates.
    pub hub_cap: usize,

    /// Hubs farther than this from the endpoint are ignored.
    pub max_hub_distance_m: f64,

    /// Total candidates per endpoint.
    pub candidate_cap: usize,

    /// Stops scanned densely after boarding in the CBD.
    pub cbd_dense_window: usize,

    /// Sampled downstream stops per boarding index.
    pub scan_fanout: usize,

    /// Shortest bus leg accepted outside the CBD.
    pub min_leg_m: f64,

    /// Shortest bus leg accepted when boarding in the CBD.
    pub min_leg_cbd_m: f64,

    /// Routes longer than this are "long".
    pub long_route_m: f64,

    /// Smallest share of a long route a leg may cover.
    pub long_route_min_fraction: f64,

    /// Backtracking allowance as a share of the trip length.
    pub backtrack_ratio: f64,
    pub backtrack_min_m: f64,
    pub backtrack_max_m: f64,

    /// Solutions within this share of the best cost are kept.
    pub soft_window_ratio: f64,

    /// Lower bound on the soft window.
    pub soft_window_min_mins: f64,

    /// Accepted solutions per transfer count.
    pub bucket_cap: usize,

    /// Accepted solutions overall.
    pub max_solutions: usize,

    /// Longest walk between two stops during a transfer.
    pub max_transfer_walk_m: f64,

    /// Longest access or egress walk; longer itineraries are dropped.
    pub max_access_walk_m: f64,

    /// CBD bus hops shorter than this on foot become walks.
    pub cbd_short_hop_m: f64,

    /// Bus legs shorter than this count as urban hops.
    pub urban_leg_max_m: f64,

    /// A run of urban hops is collapsed only if the walk stays under this.
    pub urban_walk_cap_m: f64,

    /// Farthest a substitute operator's stop may be from the original.
    pub stitch_tolerance_m: f64,

    /// Trips shorter than this get no itinerary at all.
    pub min_trip_m: f64,

    /// Trips longer than this use a corridor whitelist.
    pub corridor_min_trip_m: f64,

    /// Best-connected CBD stops added to a corridor.
    pub corridor_cbd_top: usize,

    /// Timeout for one pedestrian-router call, in milliseconds.
    pub router_timeout_ms: u64,

    /// Itineraries returned.
    pub max_results: usize,
}

impl PlannerConfig {
    /// Returns the search deadline as a Duration.
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// Returns the router timeout as a Duration.
    pub fn router_timeout(&self) -> Duration {
        Duration::from_millis(self.router_timeout_ms)
    }

    /// Minutes on board for `distance_m` at the assumed bus speed.
    pub fn ride_minutes(&self, distance_m: f64) -> f64 {
        travel_minutes(distance_m, self.bus_speed_kmh)
    }

    /// Estimated walking distance for a straight-line distance.
    pub fn walk_distance_m(&self, straight_m: f64) -> f64 {
        straight_m * self.walk_detour_factor.max(1.0)
    }

    /// Estimated walking minutes for a straight-line distance.
    pub fn walk_minutes(&self, straight_m: f64) -> f64 {
        travel_minutes(self.walk_distance_m(straight_m), self.walk_speed_kmh)
    }

    /// Backtracking allowance for a trip of `trip_m`.
    pub fn backtrack_allowance_m(&self, trip_m: f64) -> f64 {
        (trip_m * self.backtrack_ratio).clamp(self.backtrack_min_m, self.backtrack_max_m)
    }

    /// Soft acceptance window around `best_cost`.
    pub fn soft_window(&self, best_cost: f64) -> f64 {
        (best_cost * self.soft_window_ratio).max(self.soft_window_min_mins)
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_rounds: 4,
            deadline_ms: 1500,
            bus_speed_kmh: 18.0,
            walk_speed_kmh: 4.8,
            walk_detour_factor: 1.25,
            walk_weight: 1.5,
            transfer_penalty_mins: 8.0,
            assumed_wait_mins: 4.0,
            cell_resolution: 9,
            coarse_resolution: 7,
            nearby_stop_count: 8,
            max_ring: 8,
            hub_cap: 3,
            max_hub_distance_m: 6000.0,
            candidate_cap: 12,
            cbd_dense_window: 15,
            scan_fanout: 24,
            min_leg_m: 900.0,
            min_leg_cbd_m: 350.0,
            long_route_m: 120_000.0,
            long_route_min_fraction: 1.0 / 15.0,
            backtrack_ratio: 0.12,
            backtrack_min_m: 400.0,
            backtrack_max_m: 4000.0,
            soft_window_ratio: 0.35,
            soft_window_min_mins: 12.0,
            bucket_cap: 3,
            max_solutions: 40,
            max_transfer_walk_m: 700.0,
            max_access_walk_m: 1500.0,
            cbd_short_hop_m: 1200.0,
            urban_leg_max_m: 1500.0,
            urban_walk_cap_m: 2000.0,
            stitch_tolerance_m: 400.0,
            min_trip_m: 40.0,
            corridor_min_trip_m: 15_000.0,
            corridor_cbd_top: 10,
            router_timeout_ms: 2500,
            max_results: 8,
        }
    }
}
