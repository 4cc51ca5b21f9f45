//! RAPTOR-lite journey search.
//!
//! Rounds alternate route relaxation (board a route at a reached stop and
//! ride it to a bounded set of downstream stops) with walking relaxation
//! (walk from a stop just reached by bus to nearby stops). Each round allows
//! one more ride. The search stops after `max_rounds`, when a round improves
//! nothing, or at the deadline, and returns every complete path the
//! soft-window accumulator kept.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, trace};

use crate::domain::{Point, StopId, TripChoice};
use crate::geometry::haversine_m;

use super::acceptance::{Solution, SolutionAccumulator};
use super::config::PlannerConfig;
use super::corridor::{Corridor, allowed};
use super::network::Network;
use super::resolver::Candidate;
use super::schedule::{after_minutes, earliest_ride, extend_ride, minutes_between};
use super::segments::{SegmentCache, scan_targets};

/// Stops visited in the walking loop between two deadline checks.
const WALK_DEADLINE_STRIDE: usize = 32;

/// One hop of a raw search path.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Ride route `route` (a network route index) from stop position
    /// `board` to `alight`.
    Ride {
        route: usize,
        board: usize,
        alight: usize,
        minutes: f64,
        wait_minutes: f64,
        distance_m: f64,
        trip: Option<TripChoice>,
    },
    /// Walk between two stops.
    Walk {
        from: StopId,
        to: StopId,
        minutes: f64,
        distance_m: f64,
    },
}

impl Step {
    /// Returns true if both steps make the same hop, whatever their timings.
    pub fn same_hop(&self, other: &Step) -> bool {
        match (self, other) {
            (
                Step::Ride {
                    route: r1,
                    board: b1,
                    alight: a1,
                    ..
                },
                Step::Ride {
                    route: r2,
                    board: b2,
                    alight: a2,
                    ..
                },
            ) => r1 == r2 && b1 == b2 && a1 == a2,
            (Step::Walk { from: f1, to: t1, .. }, Step::Walk { from: f2, to: t2, .. }) => {
                f1 == f2 && t1 == t2
            }
            _ => false,
        }
    }
}

/// Everything one search needs besides the network.
#[derive(Debug, Clone)]
pub struct SearchInput<'a> {
    pub origin: Point,
    pub destination: Point,
    pub origins: &'a [Candidate],
    pub destinations: &'a [Candidate],
    /// Departure time; scheduled trips are only consulted when set.
    pub departure: Option<NaiveDateTime>,
    pub include_walking: bool,
    pub corridor: Option<&'a Corridor>,
}

/// Counters reported alongside the results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchStats {
    pub rounds: usize,
    pub labels_improved: usize,
    pub solutions_accepted: usize,
    pub routes_scanned: usize,
    /// True if the deadline cut the search short.
    pub deadline_hit: bool,
}

/// Result of one search.
#[derive(Debug, Clone)]
pub struct SearchOutput {
    /// Accepted complete paths, cheapest first.
    pub solutions: Vec<Solution>,
    pub stats: SearchStats,
}

/// Best known way of reaching a stop.
#[derive(Debug, Clone)]
struct Label {
    cost: f64,
    /// Real minutes since departure, access walk included.
    elapsed: f64,
    rides: usize,
    /// Route last ridden and the position it was left at.
    last_ride: Option<(usize, usize)>,
    last_was_walk: bool,
    steps: Vec<Step>,
}

/// Run a bounded search.
///
/// Never fails: an expired deadline returns whatever was accepted so far.
pub fn search(
    network: &Network,
    config: &PlannerConfig,
    input: &SearchInput<'_>,
    deadline: Instant,
) -> SearchOutput {
    let mut context = SearchContext::new(network, config, input);
    context.run(deadline);
    SearchOutput {
        solutions: context.accepted.into_solutions(),
        stats: context.stats,
    }
}

/// Per-request search state.
struct SearchContext<'a> {
    network: &'a Network,
    config: &'a PlannerConfig,
    input: &'a SearchInput<'a>,
    labels: HashMap<StopId, Label>,
    segments: SegmentCache,
    accepted: SolutionAccumulator,
    stats: SearchStats,
    /// Destination stop -> straight-line egress distance.
    destinations: HashMap<StopId, f64>,
    backtrack_allowance_m: f64,
}

impl<'a> SearchContext<'a> {
    fn new(network: &'a Network, config: &'a PlannerConfig, input: &'a SearchInput<'a>) -> Self {
        // Endpoints beyond the access cap would be dropped after the search
        let destinations = input
            .destinations
            .iter()
            .filter(|c| config.walk_distance_m(c.distance_m) <= config.max_access_walk_m)
            .map(|c| (c.stop_id.clone(), c.distance_m))
            .collect();
        let trip_m = haversine_m(input.origin, input.destination);

        Self {
            network,
            config,
            input,
            labels: HashMap::new(),
            segments: SegmentCache::new(),
            accepted: SolutionAccumulator::new(config),
            stats: SearchStats::default(),
            destinations,
            backtrack_allowance_m: config.backtrack_allowance_m(trip_m),
        }
    }

    fn seed(&mut self) -> Vec<StopId> {
        let mut frontier = Vec::new();
        for candidate in self.input.origins {
            if self.config.walk_distance_m(candidate.distance_m) > self.config.max_access_walk_m
                || self.network.stop(&candidate.stop_id).is_none()
            {
                continue;
            }
            self.labels.insert(
                candidate.stop_id.clone(),
                Label {
                    cost: 0.0,
                    elapsed: self.config.walk_minutes(candidate.distance_m),
                    rides: 0,
                    last_ride: None,
                    last_was_walk: false,
                    steps: Vec::new(),
                },
            );
            frontier.push(candidate.stop_id.clone());
        }
        frontier
    }

    fn run(&mut self, deadline: Instant) {
        let mut frontier = self.seed();
        trace!(seeds = frontier.len(), destinations = self.destinations.len(), "search seeded");

        for round in 0..self.config.max_rounds {
            if frontier.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                self.stats.deadline_hit = true;
                debug!(round, accepted = self.accepted.len(), "deadline reached");
                break;
            }
            self.stats.rounds += 1;

            let snapshot: Vec<(StopId, Label)> = frontier
                .iter()
                .filter_map(|id| self.labels.get(id).map(|l| (id.clone(), l.clone())))
                .collect();

            let mut ridden = Vec::new();
            for (stop, label) in &snapshot {
                self.relax_routes(stop, label, &mut ridden);
            }
            ridden.sort_unstable();
            ridden.dedup();

            let mut marked = ridden.clone();
            if self.input.include_walking {
                marked.extend(self.relax_walks(&ridden, deadline));
                marked.sort_unstable();
                marked.dedup();
            }

            debug!(
                round,
                frontier = snapshot.len(),
                improved = marked.len(),
                accepted = self.accepted.len(),
                best = ?self.accepted.best_cost(),
                "round finished"
            );
            frontier = marked;
        }
    }

    /// Board every route serving `stop` and ride to its scan targets.
    fn relax_routes(&mut self, stop: &StopId, label: &Label, improved: &mut Vec<StopId>) {
        let network = self.network;
        let config = self.config;
        let Some(board_stop) = network.stop(stop) else {
            return;
        };
        let board_in_cbd = network.in_cbd(stop);
        let remaining_before = haversine_m(board_stop.location, self.input.destination);

        for &(route_idx, pos) in network.serving(stop) {
            let continuing = match label.last_ride {
                Some((last, left_at)) if last == route_idx => {
                    // Re-boarding the route just left is dominated by
                    // staying on board.
                    if label.last_was_walk || left_at != pos {
                        continue;
                    }
                    true
                }
                _ => false,
            };
            self.stats.routes_scanned += 1;

            let route = network.route(route_idx);
            let segments = self.segments.get(network, route_idx);
            let total_m = segments.total_m();

            let mut targets = scan_targets(pos, route.len(), board_in_cbd, config);
            targets.extend(
                route
                    .stops
                    .iter()
                    .enumerate()
                    .skip(pos + 1)
                    .filter(|(_, s)| self.destinations.contains_key(*s))
                    .map(|(i, _)| i),
            );
            targets.sort_unstable();
            targets.dedup();

            let previous = continuing.then(|| label.steps.last()).flatten();

            for target in targets {
                let target_id = &route.stops[target];
                let Some(target_stop) = network.stop(target_id) else {
                    continue;
                };
                let is_destination = self.destinations.contains_key(target_id);
                let hop_m = segments
                    .between(pos, target)
                    .unwrap_or_else(|| haversine_m(board_stop.location, target_stop.location));
                let leg_m = match previous {
                    Some(Step::Ride { distance_m, .. }) => distance_m + hop_m,
                    _ => hop_m,
                };

                if !is_destination {
                    let min_leg = if board_in_cbd {
                        config.min_leg_cbd_m
                    } else {
                        config.min_leg_m
                    };
                    if leg_m < min_leg {
                        continue;
                    }
                    if total_m > config.long_route_m
                        && leg_m < total_m * config.long_route_min_fraction
                    {
                        continue;
                    }
                    let remaining_after = haversine_m(target_stop.location, self.input.destination);
                    if remaining_after - remaining_before > self.backtrack_allowance_m
                        && !continuing
                        && !network.is_hub(target_id)
                        && !self
                            .input
                            .corridor
                            .is_some_and(|c| c.contains(network, target_id))
                    {
                        trace!(stop = %target_id, "backtracking leg rejected");
                        continue;
                    }
                    if !allowed(network, self.input.corridor, target_id, false) {
                        continue;
                    }
                }

                let candidate = match previous {
                    Some(Step::Ride {
                        board,
                        minutes,
                        wait_minutes,
                        trip,
                        ..
                    }) => {
                        let (extra, trip) = self.extension(route_idx, trip.as_ref(), target, hop_m);
                        let mut steps = label.steps.clone();
                        steps.pop();
                        steps.push(Step::Ride {
                            route: route_idx,
                            board: *board,
                            alight: target,
                            minutes: minutes + extra,
                            wait_minutes: *wait_minutes,
                            distance_m: leg_m,
                            trip,
                        });
                        Label {
                            cost: label.cost + extra,
                            elapsed: label.elapsed + extra,
                            rides: label.rides,
                            last_ride: Some((route_idx, target)),
                            last_was_walk: false,
                            steps,
                        }
                    }
                    _ => {
                        let (wait, ride, trip) =
                            self.timing(route_idx, pos, target, hop_m, label.elapsed);
                        let penalty = if label.rides > 0 {
                            config.transfer_penalty_mins
                        } else {
                            0.0
                        };
                        let mut steps = label.steps.clone();
                        steps.push(Step::Ride {
                            route: route_idx,
                            board: pos,
                            alight: target,
                            minutes: ride,
                            wait_minutes: wait,
                            distance_m: hop_m,
                            trip,
                        });
                        Label {
                            cost: label.cost + wait + ride + penalty,
                            elapsed: label.elapsed + wait + ride,
                            rides: label.rides + 1,
                            last_ride: Some((route_idx, target)),
                            last_was_walk: false,
                            steps,
                        }
                    }
                };

                self.arrive(target_id, candidate, improved);
            }
        }
    }

    /// Wait and ride minutes for a fresh boarding, from the timetable when a
    /// departure time was given and a trip matches.
    fn timing(
        &self,
        route: usize,
        board: usize,
        alight: usize,
        distance_m: f64,
        elapsed: f64,
    ) -> (f64, f64, Option<TripChoice>) {
        let scheduled = self.input.departure.and_then(|departure| {
            let trips = self.network.trips(route);
            if trips.is_empty() {
                return None;
            }
            earliest_ride(trips, board, alight, after_minutes(departure, elapsed))
        });

        match scheduled {
            Some(ride) => (ride.wait_minutes, ride.ride_minutes, Some(ride.trip)),
            None => (
                self.config.assumed_wait_mins,
                self.config.ride_minutes(distance_m),
                None,
            ),
        }
    }

    /// Extra minutes for staying on board to `alight`.
    fn extension(
        &self,
        route: usize,
        trip: Option<&TripChoice>,
        alight: usize,
        hop_m: f64,
    ) -> (f64, Option<TripChoice>) {
        if let Some(choice) = trip {
            if let Some(extended) = extend_ride(self.network.trips(route), choice, alight) {
                let extra = minutes_between(choice.arrives, extended.arrives);
                return (extra, Some(extended));
            }
        }
        (self.config.ride_minutes(hop_m), None)
    }

    /// Walk from every stop just reached by bus.
    fn relax_walks(&mut self, sources: &[StopId], deadline: Instant) -> Vec<StopId> {
        let mut improved = Vec::new();

        for (i, stop) in sources.iter().enumerate() {
            if i % WALK_DEADLINE_STRIDE == 0 && Instant::now() >= deadline {
                self.stats.deadline_hit = true;
                trace!(visited = i, "deadline reached while walking");
                break;
            }
            let Some(label) = self.labels.get(stop).cloned() else {
                continue;
            };
            if label.last_was_walk {
                continue;
            }

            for (to, minutes, distance_m) in self.walk_neighbours(stop) {
                let is_destination = self.destinations.contains_key(&to);
                if !allowed(self.network, self.input.corridor, &to, is_destination) {
                    continue;
                }
                let mut steps = label.steps.clone();
                steps.push(Step::Walk {
                    from: stop.clone(),
                    to: to.clone(),
                    minutes,
                    distance_m,
                });
                let candidate = Label {
                    cost: label.cost + self.config.walk_weight * minutes,
                    elapsed: label.elapsed + minutes,
                    rides: label.rides,
                    last_ride: label.last_ride,
                    last_was_walk: true,
                    steps,
                };
                self.arrive(&to, candidate, &mut improved);
            }
        }

        improved
    }

    /// Stops reachable on foot from `stop`: stored edges first, then any
    /// stop within the transfer cap at the straight-line estimate.
    fn walk_neighbours(&self, stop: &StopId) -> Vec<(StopId, f64, f64)> {
        let cap = self.config.max_transfer_walk_m;
        let mut seen = HashSet::new();
        let mut neighbours = Vec::new();

        for edge in self.network.edges_from(stop) {
            if edge.to != *stop && edge.distance_m <= cap && seen.insert(edge.to.clone()) {
                neighbours.push((edge.to.clone(), edge.minutes, edge.distance_m));
            }
        }

        if let Some(from) = self.network.stop(stop) {
            let radius = cap / self.config.walk_detour_factor.max(1.0);
            for (id, straight_m) in self.network.stops_within(from.location, radius) {
                if id == *stop || !seen.insert(id.clone()) {
                    continue;
                }
                let minutes = self.config.walk_minutes(straight_m);
                let distance_m = self.config.walk_distance_m(straight_m).min(cap);
                neighbours.push((id, minutes, distance_m));
            }
        }

        neighbours
    }

    /// Record a relaxation: offer it as a solution if `stop` is a
    /// destination, and keep it if it improves the stop's label.
    fn arrive(&mut self, stop: &StopId, candidate: Label, improved: &mut Vec<StopId>) {
        if let Some(&egress_m) = self.destinations.get(stop) {
            let egress = self.config.walk_weight * self.config.walk_minutes(egress_m);
            let solution = Solution {
                steps: candidate.steps.clone(),
                cost: candidate.cost + egress,
                transfers: candidate.rides.saturating_sub(1),
                destination: stop.clone(),
            };
            if self.accepted.offer(solution) {
                self.stats.solutions_accepted += 1;
                trace!(stop = %stop, cost = candidate.cost + egress, "solution accepted");
            }
        }

        let better = self
            .labels
            .get(stop)
            .is_none_or(|current| candidate.cost < current.cost);
        if better {
            self.labels.insert(stop.clone(), candidate);
            self.stats.labels_improved += 1;
            improved.push(stop.clone());
        }
    }
}
