//! Per-request view of the transit network.
//!
//! Everything the search reads is loaded from the repository once, indexed,
//! and dropped when the request finishes.

use std::collections::{HashMap, HashSet};

use h3o::{CellIndex, Resolution};
use tracing::debug;

use crate::domain::{Point, Region, Route, RouteId, Stop, StopId, TransferEdge, Trip};
use crate::geometry::{cell_at, haversine_m, neighbor_spacing_m, resolution};
use crate::repository::{RepositoryError, TransitRepository};

use super::config::PlannerConfig;

/// Indexed, read-only snapshot of stops, routes, trips, edges and regions.
#[derive(Debug)]
pub struct Network {
    stops: HashMap<StopId, Stop>,
    routes: Vec<Route>,
    route_ids: HashMap<RouteId, usize>,
    /// (route index, position on route) for every stop.
    serving: HashMap<StopId, Vec<(usize, usize)>>,
    cells: HashMap<CellIndex, Vec<StopId>>,
    resolution: Resolution,
    coarse_resolution: Resolution,
    /// Hub stop -> region name.
    hubs: HashMap<StopId, String>,
    regions: HashMap<String, Region>,
    cbd: Option<Region>,
    cbd_stops: HashSet<StopId>,
    edges: HashMap<StopId, Vec<TransferEdge>>,
    trips: HashMap<usize, Vec<Trip>>,
}

impl Network {
    /// Load and index everything a search needs.
    ///
    /// Trips are only read when `with_trips` is set, since they matter only
    /// for requests with a departure time.
    pub fn load<R: TransitRepository + ?Sized>(
        repo: &R,
        config: &PlannerConfig,
        with_trips: bool,
    ) -> Result<Self, RepositoryError> {
        let res = resolution(config.cell_resolution);
        let coarse = resolution(config.coarse_resolution);
        let cbd = repo.cbd()?;

        let mut stops = HashMap::new();
        let mut cells: HashMap<CellIndex, Vec<StopId>> = HashMap::new();
        let mut cbd_stops = HashSet::new();
        for stop in repo.stops()? {
            if let Some(cell) = cell_at(stop.location, res) {
                cells.entry(cell).or_default().push(stop.id.clone());
            }
            if cbd.as_ref().is_some_and(|r| r.contains(stop.location)) {
                cbd_stops.insert(stop.id.clone());
            }
            stops.insert(stop.id.clone(), stop);
        }

        let routes = repo.routes()?;
        let mut route_ids = HashMap::new();
        let mut serving: HashMap<StopId, Vec<(usize, usize)>> = HashMap::new();
        for (idx, route) in routes.iter().enumerate() {
            route_ids.insert(route.id.clone(), idx);
            for (pos, stop_id) in route.stops.iter().enumerate() {
                if stops.contains_key(stop_id) {
                    serving.entry(stop_id.clone()).or_default().push((idx, pos));
                }
            }
        }

        let mut trips = HashMap::new();
        if with_trips {
            for (idx, route) in routes.iter().enumerate() {
                let route_trips = repo.trips(&route.id)?;
                if !route_trips.is_empty() {
                    trips.insert(idx, route_trips);
                }
            }
        }

        let mut edges: HashMap<StopId, Vec<TransferEdge>> = HashMap::new();
        for edge in repo.transfer_edges()? {
            if stops.contains_key(&edge.from) && stops.contains_key(&edge.to) {
                edges.entry(edge.from.clone()).or_default().push(edge);
            }
        }

        let hubs = repo
            .hubs()?
            .into_iter()
            .filter(|hub| stops.contains_key(&hub.stop_id))
            .map(|hub| (hub.stop_id, hub.region))
            .collect();

        let regions = repo
            .regions()?
            .into_iter()
            .map(|region| (region.name.clone(), region))
            .collect();

        debug!(
            stops = stops.len(),
            routes = routes.len(),
            cbd_stops = cbd_stops.len(),
            "network loaded"
        );

        Ok(Self {
            stops,
            routes,
            route_ids,
            serving,
            cells,
            resolution: res,
            coarse_resolution: coarse,
            hubs,
            regions,
            cbd,
            cbd_stops,
            edges,
            trips,
        })
    }

    pub fn stop(&self, id: &StopId) -> Option<&Stop> {
        self.stops.get(id)
    }

    pub fn stops(&self) -> impl Iterator<Item = &Stop> {
        self.stops.values()
    }

    pub fn has_stops(&self) -> bool {
        !self.stops.is_empty()
    }

    /// Route by index. Indices come from this network's own tables.
    pub fn route(&self, idx: usize) -> &Route {
        &self.routes[idx]
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route_index(&self, id: &RouteId) -> Option<usize> {
        self.route_ids.get(id).copied()
    }

    /// Every (route index, position) at which `stop` is served.
    pub fn serving(&self, stop: &StopId) -> &[(usize, usize)] {
        self.serving.get(stop).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct routes serving `stop`.
    pub fn route_degree(&self, stop: &StopId) -> usize {
        let mut seen: Vec<usize> = self.serving(stop).iter().map(|(r, _)| *r).collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }

    pub fn is_hub(&self, stop: &StopId) -> bool {
        self.hubs.contains_key(stop)
    }

    /// Hub stops with their region names.
    pub fn hubs(&self) -> impl Iterator<Item = (&StopId, &str)> {
        self.hubs.iter().map(|(id, region)| (id, region.as_str()))
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.get(name)
    }

    pub fn in_cbd(&self, stop: &StopId) -> bool {
        self.cbd_stops.contains(stop)
    }

    pub fn point_in_cbd(&self, point: Point) -> bool {
        self.cbd.as_ref().is_some_and(|r| r.contains(point))
    }

    pub fn cbd_stops(&self) -> impl Iterator<Item = &StopId> {
        self.cbd_stops.iter()
    }

    /// Stored walking edges leaving `stop`.
    pub fn edges_from(&self, stop: &StopId) -> &[TransferEdge] {
        self.edges.get(stop).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edge(&self, from: &StopId, to: &StopId) -> Option<&TransferEdge> {
        self.edges_from(from).iter().find(|e| &e.to == to)
    }

    /// Scheduled trips of a route; empty when trips were not loaded.
    pub fn trips(&self, route: usize) -> &[Trip] {
        self.trips.get(&route).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn cell_of(&self, point: Point) -> Option<CellIndex> {
        cell_at(point, self.resolution)
    }

    pub fn coarse_cell_of(&self, point: Point) -> Option<CellIndex> {
        cell_at(point, self.coarse_resolution)
    }

    pub fn stops_in_cell(&self, cell: CellIndex) -> &[StopId] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Stops within `radius_m` of `point`, nearest first.
    pub fn stops_within(&self, point: Point, radius_m: f64) -> Vec<(StopId, f64)> {
        let Some(cell) = self.cell_of(point) else {
            return Vec::new();
        };
        let spacing = neighbor_spacing_m(cell);
        let k = if spacing.is_finite() && spacing > 0.0 {
            (radius_m / spacing).ceil() as u32 + 1
        } else {
            1
        };

        let mut found: Vec<(StopId, f64)> = cell
            .grid_disk::<Vec<_>>(k)
            .into_iter()
            .flat_map(|c| self.stops_in_cell(c))
            .filter_map(|id| {
                let stop = self.stops.get(id)?;
                let d = haversine_m(point, stop.location);
                (d <= radius_m).then(|| (id.clone(), d))
            })
            .collect();
        found.sort_by(|a, b| a.1.total_cmp(&b.1));
        found
    }
}
