//! Leg building.
//!
//! Raw search paths become itineraries here. Bus legs get a geometry slice,
//! a fare and a duration; walk legs come from the [`WalkResolver`], which
//! resolves every walk a stage needs concurrently before the stage builds
//! anything.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use futures::future::join_all;
use tracing::{debug, trace, warn};

use crate::domain::{BusLeg, Itinerary, Leg, Place, Point, Route, Stop, TransferEdge, TripChoice, WalkLeg};
use crate::fare::{FarePolicy, FareQuery};
use crate::geometry::{haversine_m, nearest_index, polyline_length_m};
use crate::repository::TransferEdgeStore;
use crate::walking::{PedestrianRouter, WalkPath};

use super::acceptance::Solution;
use super::config::PlannerConfig;
use super::network::Network;
use super::schedule::{after_minutes, minutes_between};
use super::search::Step;

/// Walks closer than this are never sent to the router.
const TRIVIAL_WALK_M: f64 = 1.0;

type WalkKey = ((i64, i64), (i64, i64));

fn walk_key(from: Point, to: Point) -> WalkKey {
    let snap = |p: Point| ((p.lat * 1e6).round() as i64, (p.lng * 1e6).round() as i64);
    (snap(from), snap(to))
}

/// Per-request walking-path resolver.
///
/// Preference order: a stored edge, a router path, a straight line. Router
/// paths between two stops are written back through the edge store so later
/// requests find them as stored edges.
pub struct WalkResolver<'a, P, S: ?Sized> {
    network: &'a Network,
    config: &'a PlannerConfig,
    router: &'a P,
    store: &'a S,
    paths: HashMap<WalkKey, WalkPath>,
    persisted: usize,
}

impl<'a, P, S> WalkResolver<'a, P, S>
where
    P: PedestrianRouter,
    S: TransferEdgeStore + ?Sized,
{
    pub fn new(network: &'a Network, config: &'a PlannerConfig, router: &'a P, store: &'a S) -> Self {
        Self {
            network,
            config,
            router,
            store,
            paths: HashMap::new(),
            persisted: 0,
        }
    }

    /// Resolve every pair not yet known, querying the router concurrently.
    ///
    /// Router failures and timeouts fall back to a straight line; nothing
    /// here fails the request.
    pub async fn prefetch(&mut self, pairs: impl IntoIterator<Item = (Place, Place)>) {
        let mut queued = HashSet::new();
        let mut missing = Vec::new();
        for (from, to) in pairs {
            let key = walk_key(from.location(), to.location());
            if self.paths.contains_key(&key)
                || self.stored(&from, &to).is_some()
                || haversine_m(from.location(), to.location()) < TRIVIAL_WALK_M
                || !queued.insert(key)
            {
                continue;
            }
            missing.push((from, to));
        }
        if missing.is_empty() {
            return;
        }

        let router = self.router;
        let timeout = self.config.router_timeout();
        let results = join_all(missing.iter().map(|(from, to)| {
            let (a, b) = (from.location(), to.location());
            async move { tokio::time::timeout(timeout, router.route(a, b)).await }
        }))
        .await;

        let mut fallbacks = 0;
        for ((from, to), result) in missing.iter().zip(results) {
            let path = match result {
                Ok(Ok(path)) => {
                    self.persist(from, to, &path);
                    path
                }
                Ok(Err(e)) => {
                    trace!(error = %e, "pedestrian router failed");
                    fallbacks += 1;
                    self.straight(from, to)
                }
                Err(_) => {
                    warn!(from = %from.location(), to = %to.location(), "pedestrian router timed out");
                    fallbacks += 1;
                    self.straight(from, to)
                }
            };
            self.paths.insert(walk_key(from.location(), to.location()), path);
        }

        debug!(
            requested = missing.len(),
            fallbacks,
            persisted = self.persisted,
            "walks resolved"
        );
    }

    /// Walk leg between two places, from whatever source is available.
    pub fn walk(&self, from: &Place, to: &Place) -> WalkLeg {
        let path = self
            .paths
            .get(&walk_key(from.location(), to.location()))
            .cloned()
            .or_else(|| self.stored(from, to))
            .unwrap_or_else(|| self.straight(from, to));
        WalkLeg {
            from: from.clone(),
            to: to.clone(),
            minutes: path.minutes,
            distance_m: path.distance_m,
            geometry: path.geometry,
        }
    }

    /// Number of edges written back to the store.
    pub fn persisted(&self) -> usize {
        self.persisted
    }

    fn stored(&self, from: &Place, to: &Place) -> Option<WalkPath> {
        let edge = self.network.edge(from.stop_id()?, to.stop_id()?)?;
        let geometry = if edge.geometry.len() >= 2 {
            edge.geometry.clone()
        } else {
            vec![from.location(), to.location()]
        };
        Some(WalkPath {
            minutes: edge.minutes,
            distance_m: edge.distance_m,
            geometry,
        })
    }

    fn straight(&self, from: &Place, to: &Place) -> WalkPath {
        WalkPath::straight_line(
            from.location(),
            to.location(),
            self.config.walk_speed_kmh,
            self.config.walk_detour_factor,
        )
    }

    fn persist(&mut self, from: &Place, to: &Place, path: &WalkPath) {
        let (Some(a), Some(b)) = (from.stop_id(), to.stop_id()) else {
            return;
        };
        if a == b {
            return;
        }
        let edge = match TransferEdge::new(
            a.clone(),
            b.clone(),
            path.minutes,
            path.distance_m,
            path.geometry.clone(),
        ) {
            Ok(edge) => edge,
            Err(e) => {
                debug!(from = %a, to = %b, error = %e, "router returned an unusable walk");
                return;
            }
        };
        match self.store.upsert_transfer_edge(&edge) {
            Ok(()) => self.persisted += 1,
            Err(e) => warn!(from = %a, to = %b, error = %e, "failed to persist walking edge"),
        }
    }
}

/// Builds bus legs and whole itineraries.
pub struct LegBuilder<'a, F: ?Sized> {
    network: &'a Network,
    config: &'a PlannerConfig,
    fares: &'a F,
    departure: NaiveDateTime,
    event_day: bool,
}

impl<'a, F: FarePolicy + ?Sized> LegBuilder<'a, F> {
    pub fn new(
        network: &'a Network,
        config: &'a PlannerConfig,
        fares: &'a F,
        departure: NaiveDateTime,
        event_day: bool,
    ) -> Self {
        Self {
            network,
            config,
            fares,
            departure,
            event_day,
        }
    }

    pub fn network(&self) -> &'a Network {
        self.network
    }

    pub fn config(&self) -> &'a PlannerConfig {
        self.config
    }

    pub fn departure(&self) -> NaiveDateTime {
        self.departure
    }

    /// Walks a solution needs, for prefetching.
    pub fn walk_pairs(&self, solution: &Solution) -> Vec<(Place, Place)> {
        solution
            .steps
            .iter()
            .filter_map(|step| match step {
                Step::Walk { from, to, .. } => Some((
                    Place::stop(self.network.stop(from)?),
                    Place::stop(self.network.stop(to)?),
                )),
                Step::Ride { .. } => None,
            })
            .collect()
    }

    /// Build the itinerary for a raw path, from its first stop to its last.
    ///
    /// Returns `None` when a stop is missing, a leg is invalid, or a transfer
    /// walk is longer than the transfer cap.
    pub fn itinerary<P, S>(&self, solution: &Solution, walks: &WalkResolver<'_, P, S>) -> Option<Itinerary>
    where
        P: PedestrianRouter,
        S: TransferEdgeStore + ?Sized,
    {
        let mut legs = Vec::with_capacity(solution.steps.len());
        let mut elapsed = 0.0;

        for step in &solution.steps {
            match step {
                Step::Ride {
                    route,
                    board,
                    alight,
                    wait_minutes,
                    trip,
                    ..
                } => {
                    let boarding_at = after_minutes(self.departure, elapsed + wait_minutes);
                    let Some(leg) =
                        self.bus_leg(*route, *board, *alight, *wait_minutes, trip.clone(), boarding_at)
                    else {
                        trace!(route, board, alight, "dropping path with an unbuildable bus leg");
                        return None;
                    };
                    elapsed += leg.wait_minutes + leg.minutes;
                    legs.push(Leg::Bus(leg));
                }
                Step::Walk { from, to, .. } => {
                    let from = Place::stop(self.network.stop(from)?);
                    let to = Place::stop(self.network.stop(to)?);
                    let walk = walks.walk(&from, &to);
                    if walk.distance_m > self.config.max_transfer_walk_m {
                        trace!(distance_m = walk.distance_m, "dropping path with a long transfer walk");
                        return None;
                    }
                    elapsed += walk.minutes;
                    legs.push(Leg::Walk(walk));
                }
            }
        }

        match Itinerary::new(legs) {
            Ok(itinerary) => Some(itinerary),
            Err(e) => {
                trace!(error = %e, "dropping inconsistent path");
                None
            }
        }
    }

    /// A bus leg on route `route` from position `board` to `alight`.
    ///
    /// Ride minutes come from the trip when one was chosen, else from the
    /// leg's polyline length at the assumed bus speed.
    pub fn bus_leg(
        &self,
        route: usize,
        board: usize,
        alight: usize,
        wait_minutes: f64,
        trip: Option<TripChoice>,
        boarding_at: NaiveDateTime,
    ) -> Option<BusLeg> {
        if alight <= board {
            return None;
        }
        let route = self.network.routes().get(route)?;
        let board_stop = self.network.stop(route.stops.get(board)?)?;
        let alight_stop = self.network.stop(route.stops.get(alight)?)?;

        let (geometry, alternate_alignment) = leg_geometry(route, board_stop, alight_stop);
        let distance_m = polyline_length_m(&geometry);
        let minutes = match &trip {
            Some(t) => minutes_between(t.departs, t.arrives),
            None => self.config.ride_minutes(distance_m),
        };

        let fare = self.fares.fare(&FareQuery {
            leg_m: distance_m,
            route_m: route_length_m(self.network, route),
            time: boarding_at,
            event_day: self.event_day,
            band: route.fare.as_ref(),
            origin_in_cbd: self.network.in_cbd(&board_stop.id),
            destination_in_cbd: self.network.in_cbd(&alight_stop.id),
        });

        let leg = BusLeg {
            route_id: route.id.clone(),
            operator: route.operator.clone(),
            base_route: route.base_route.clone(),
            board: Place::stop(board_stop),
            alight: Place::stop(alight_stop),
            board_index: board,
            alight_index: alight,
            fare,
            distance_m,
            geometry,
            alternate_alignment,
            minutes,
            wait_minutes,
            trip,
        };
        leg.validate().ok()?;
        Some(leg)
    }
}

/// Geometry for a ride: a slice of the matching variation, else a slice of
/// the base polyline, else a straight line. The flag is set for variations.
fn leg_geometry(route: &Route, board: &Stop, alight: &Stop) -> (Vec<Point>, bool) {
    if let Some(variation) = route.variation_for(&board.id, &alight.id) {
        if let Some(slice) = slice_between(&variation.geometry, board.location, alight.location) {
            return (slice, true);
        }
    }
    if let Some(slice) = slice_between(&route.geometry, board.location, alight.location) {
        return (slice, false);
    }
    (vec![board.location, alight.location], false)
}

fn slice_between(points: &[Point], from: Point, to: Point) -> Option<Vec<Point>> {
    let start = nearest_index(points, from, 0)?;
    let end = nearest_index(points, to, start)?;
    (end > start).then(|| points[start..=end].to_vec())
}

/// Length of the route polyline, or of the chain of its stops when it has
/// no polyline.
fn route_length_m(network: &Network, route: &Route) -> f64 {
    if route.geometry.len() >= 2 {
        return polyline_length_m(&route.geometry);
    }
    let points: Vec<Point> = route
        .stops
        .iter()
        .filter_map(|id| network.stop(id).map(|s| s.location))
        .collect();
    polyline_length_m(&points)
}
