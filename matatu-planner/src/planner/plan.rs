//! The planning entry point.
//!
//! A [`Planner`] answers one [`PlanRequest`] at a time: it loads a fresh
//! network snapshot, resolves both endpoints to candidate stops, runs the
//! search, builds and refines itineraries, and reports how it went.

use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{Itinerary, Place, Point};
use crate::fare::{BandedFarePolicy, FarePolicy};
use crate::geometry::haversine_m;
use crate::repository::{RepositoryError, TransferEdgeStore, TransitRepository};
use crate::walking::PedestrianRouter;

use super::config::PlannerConfig;
use super::corridor::Corridor;
use super::legs::{LegBuilder, WalkResolver};
use super::network::Network;
use super::refine::{RefineContext, refine};
use super::resolver::{Candidate, resolve};
use super::search::{SearchInput, SearchOutput, SearchStats, search};

/// Error from planning.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The request itself is unusable
    #[error("invalid plan request: {0}")]
    InvalidRequest(String),

    /// Reference data could not be read
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Request for a journey plan.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub origin: Point,
    pub destination: Point,

    /// Desired departure. When absent, fares use the current local time and
    /// rides use the heuristic wait.
    pub departure: Option<NaiveDateTime>,

    /// Whether walking transfers between stops are explored.
    pub include_walking: bool,

    /// Event days carry a fare surcharge.
    pub event_day: bool,

    /// Operators never moved away from during diversification.
    pub preferred_operators: Vec<String>,
}

impl PlanRequest {
    /// Create a new plan request with default options.
    pub fn new(origin: Point, destination: Point) -> Self {
        Self {
            origin,
            destination,
            departure: None,
            include_walking: true,
            event_day: false,
            preferred_operators: Vec::new(),
        }
    }

    pub fn departing_at(mut self, departure: NaiveDateTime) -> Self {
        self.departure = Some(departure);
        self
    }

    pub fn with_walking(mut self, include_walking: bool) -> Self {
        self.include_walking = include_walking;
        self
    }

    pub fn on_event_day(mut self, event_day: bool) -> Self {
        self.event_day = event_day;
        self
    }

    pub fn preferring(mut self, operators: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.preferred_operators = operators.into_iter().map(Into::into).collect();
        self
    }

    /// Validate the plan request.
    pub fn validate(&self) -> Result<(), PlanError> {
        if !self.origin.is_valid() {
            return Err(PlanError::InvalidRequest(format!(
                "origin {} is not a valid coordinate",
                self.origin
            )));
        }
        if !self.destination.is_valid() {
            return Err(PlanError::InvalidRequest(format!(
                "destination {} is not a valid coordinate",
                self.destination
            )));
        }
        Ok(())
    }
}

/// How a plan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Found,
    NoRouteFound,
    NoStopsNearOrigin,
    NoStopsNearDestination,
    /// Origin and destination are closer than `min_trip_m`.
    TooShort,
}

/// Result of planning.
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    pub status: PlanStatus,
    /// Itineraries, best first.
    pub itineraries: Vec<Itinerary>,
    pub stats: SearchStats,
}

impl PlanOutcome {
    /// An outcome with no itineraries.
    pub fn empty(status: PlanStatus) -> Self {
        Self {
            status,
            itineraries: Vec::new(),
            stats: SearchStats::default(),
        }
    }
}

/// Journey planner over a repository, a pedestrian router and a fare policy.
pub struct Planner<'a, D: ?Sized, P, F = BandedFarePolicy> {
    repository: &'a D,
    router: &'a P,
    config: &'a PlannerConfig,
    fares: F,
}

impl<'a, D, P> Planner<'a, D, P>
where
    D: TransitRepository + TransferEdgeStore + ?Sized,
    P: PedestrianRouter,
{
    /// Create a new planner with the default fare policy.
    pub fn new(repository: &'a D, router: &'a P, config: &'a PlannerConfig) -> Self {
        Self {
            repository,
            router,
            config,
            fares: BandedFarePolicy::default(),
        }
    }
}

impl<'a, D, P, F> Planner<'a, D, P, F>
where
    D: TransitRepository + TransferEdgeStore + ?Sized,
    P: PedestrianRouter,
    F: FarePolicy,
{
    /// Replace the fare policy.
    pub fn with_fare_policy<G: FarePolicy>(self, fares: G) -> Planner<'a, D, P, G> {
        Planner {
            repository: self.repository,
            router: self.router,
            config: self.config,
            fares,
        }
    }

    /// Plan journeys for a request.
    ///
    /// Only an invalid request or a repository failure is an error. Running
    /// out of time, router failures and unbuildable paths all degrade to
    /// fewer itineraries.
    pub async fn plan(&self, request: &PlanRequest) -> Result<PlanOutcome, PlanError> {
        request.validate()?;
        let config = self.config;
        let network = Network::load(self.repository, config, request.departure.is_some())?;

        let origins = candidates(&network, request.origin, config);
        if origins.is_empty() {
            info!(origin = %request.origin, "no stops near origin");
            return Ok(PlanOutcome::empty(PlanStatus::NoStopsNearOrigin));
        }
        let destinations = candidates(&network, request.destination, config);
        if destinations.is_empty() {
            info!(destination = %request.destination, "no stops near destination");
            return Ok(PlanOutcome::empty(PlanStatus::NoStopsNearDestination));
        }

        let mut walks = WalkResolver::new(&network, config, self.router, self.repository);

        if origins[0].stop_id == destinations[0].stop_id {
            if let Some(outcome) = self.walk_only(request, &mut walks).await {
                return Ok(outcome);
            }
        }

        let trip_m = haversine_m(request.origin, request.destination);
        let corridor = (trip_m >= config.corridor_min_trip_m).then(|| {
            Corridor::build(
                &network,
                request.origin,
                request.destination,
                &origins,
                &destinations,
                config,
            )
        });

        let input = SearchInput {
            origin: request.origin,
            destination: request.destination,
            origins: &origins,
            destinations: &destinations,
            departure: request.departure,
            include_walking: request.include_walking,
            corridor: corridor.as_ref(),
        };
        let deadline = Instant::now() + config.deadline();
        let SearchOutput { solutions, stats } = search(&network, config, &input, deadline);

        let departure = request
            .departure
            .unwrap_or_else(|| Local::now().naive_local());
        let legs = LegBuilder::new(&network, config, &self.fares, departure, request.event_day);

        let pairs: Vec<(Place, Place)> = solutions.iter().flat_map(|s| legs.walk_pairs(s)).collect();
        walks.prefetch(pairs).await;
        let built: Vec<Itinerary> = solutions
            .iter()
            .filter_map(|s| legs.itinerary(s, &walks))
            .collect();
        debug!(solutions = solutions.len(), built = built.len(), "itineraries built");

        let context = RefineContext {
            legs: &legs,
            origin: request.origin,
            destination: request.destination,
            preferred_operators: &request.preferred_operators,
        };
        let mut itineraries = refine(&context, &mut walks, built).await;
        itineraries.truncate(config.max_results);

        let status = if itineraries.is_empty() {
            PlanStatus::NoRouteFound
        } else {
            PlanStatus::Found
        };
        info!(
            ?status,
            itineraries = itineraries.len(),
            rounds = stats.rounds,
            deadline_hit = stats.deadline_hit,
            edges_persisted = walks.persisted(),
            "plan complete"
        );

        Ok(PlanOutcome {
            status,
            itineraries,
            stats,
        })
    }

    /// Both endpoints share their nearest stop: walk, or nothing if the trip
    /// is trivially short.
    ///
    /// Returns `None` when the walk is longer than `max_access_walk_m`, as
    /// with endpoints on either side of the shared stop; the search then
    /// runs as usual.
    async fn walk_only<S: TransferEdgeStore + ?Sized>(
        &self,
        request: &PlanRequest,
        walks: &mut WalkResolver<'_, P, S>,
    ) -> Option<PlanOutcome> {
        let straight_m = haversine_m(request.origin, request.destination);
        if straight_m < self.config.min_trip_m {
            debug!(straight_m, "trip too short to plan");
            return Some(PlanOutcome::empty(PlanStatus::TooShort));
        }

        let from = Place::coordinate(request.origin);
        let to = Place::coordinate(request.destination);
        walks.prefetch([(from.clone(), to.clone())]).await;
        let walk = walks.walk(&from, &to);
        if walk.distance_m > self.config.max_access_walk_m {
            debug!(distance_m = walk.distance_m, "shared stop but too far to walk");
            return None;
        }
        debug!(distance_m = walk.distance_m, "endpoints share a stop, walking");

        Some(PlanOutcome {
            status: PlanStatus::Found,
            itineraries: vec![Itinerary::walk_only(walk)],
            stats: SearchStats::default(),
        })
    }
}

/// Resolved candidates within walking reach of `point`, measured the way
/// access and egress walks are capped.
fn candidates(network: &Network, point: Point, config: &PlannerConfig) -> Vec<Candidate> {
    let mut found = resolve(network, point, config);
    found.retain(|c| config.walk_distance_m(c.distance_m) <= config.max_access_walk_m);
    found
}
