//! Result refinement.
//!
//! Built itineraries go through a fixed pipeline: deduplicate by route
//! signature, collapse CBD hops into walks, collapse short urban runs, add
//! access and egress walks, diversify repeated operators, and rank. Stages
//! that need walks first collect every pair they might use and resolve them
//! in one concurrent batch.

mod bookend;
mod collapse;
mod diversify;
mod rank;

pub use rank::{deduplicate, hub_score, rank};

use tracing::{debug, trace};

use crate::domain::{Itinerary, Point};
use crate::fare::FarePolicy;
use crate::repository::TransferEdgeStore;
use crate::walking::PedestrianRouter;

use super::config::PlannerConfig;
use super::legs::{LegBuilder, WalkResolver};
use super::network::Network;

/// What every refinement stage reads.
pub struct RefineContext<'a, F: ?Sized> {
    pub legs: &'a LegBuilder<'a, F>,
    pub origin: Point,
    pub destination: Point,
    pub preferred_operators: &'a [String],
}

impl<'a, F: FarePolicy + ?Sized> RefineContext<'a, F> {
    pub fn network(&self) -> &'a Network {
        self.legs.network()
    }

    pub fn config(&self) -> &'a PlannerConfig {
        self.legs.config()
    }

    fn prefers(&self, operator: &str) -> bool {
        self.preferred_operators
            .iter()
            .any(|p| p.trim().eq_ignore_ascii_case(operator.trim()))
    }
}

/// Run the whole pipeline. The result is ranked best first.
pub async fn refine<F, P, S>(
    context: &RefineContext<'_, F>,
    walks: &mut WalkResolver<'_, P, S>,
    itineraries: Vec<Itinerary>,
) -> Vec<Itinerary>
where
    F: FarePolicy + ?Sized,
    P: PedestrianRouter,
    S: TransferEdgeStore + ?Sized,
{
    let built = itineraries.len();
    let itineraries = deduplicate(itineraries, context.network(), context.config());
    let unique = itineraries.len();

    let uncollapsed = itineraries.clone();
    walks
        .prefetch(collapse::cbd_hop_walks(context, &itineraries))
        .await;
    let itineraries: Vec<Itinerary> = itineraries
        .into_iter()
        .map(|i| collapse::collapse_cbd_hops(context, walks, i))
        .collect();

    walks
        .prefetch(collapse::urban_run_walks(context, &itineraries))
        .await;
    let itineraries: Vec<Itinerary> = itineraries
        .into_iter()
        .map(|i| collapse::collapse_urban_runs(context, walks, i))
        .collect();

    // A collapsed walk can push the access or egress walk over the cap; the
    // itinerary as searched is then bookended instead.
    let fallbacks: Vec<Option<Itinerary>> = uncollapsed
        .into_iter()
        .zip(&itineraries)
        .map(|(original, collapsed)| (original != *collapsed).then_some(original))
        .collect();

    walks
        .prefetch(bookend::bookend_walks(
            context,
            itineraries.iter().chain(fallbacks.iter().flatten()),
        ))
        .await;
    let itineraries: Vec<Itinerary> = itineraries
        .into_iter()
        .zip(fallbacks)
        .filter_map(|(collapsed, fallback)| {
            bookend::bookend(context, walks, collapsed).or_else(|| {
                let original = fallback?;
                trace!("collapsed itinerary over the walk cap, keeping the ride");
                bookend::bookend(context, walks, original)
            })
        })
        .collect();
    let bookended = itineraries.len();

    let substitutions = diversify::plan(context, &itineraries);
    walks
        .prefetch(diversify::stitch_walks(&substitutions))
        .await;
    let itineraries = diversify::apply(context, walks, itineraries, substitutions);

    debug!(built, unique, bookended, "itineraries refined");
    rank(itineraries, context.config())
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::domain::{Itinerary, Leg};
    use crate::fare::BandedFarePolicy;
    use crate::planner::acceptance::Solution;
    use crate::planner::config::PlannerConfig;
    use crate::planner::legs::{LegBuilder, WalkResolver};
    use crate::planner::network::Network;
    use crate::planner::search::Step;
    use crate::planner::testkit::{hm, sid};
    use crate::repository::InMemoryRepository;
    use crate::walking::NoRouter;

    pub fn monday_noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap().and_time(hm(12, 0))
    }

    pub fn builder<'a>(
        net: &'a Network,
        config: &'a PlannerConfig,
        fares: &'a BandedFarePolicy,
    ) -> LegBuilder<'a, BandedFarePolicy> {
        LegBuilder::new(net, config, fares, monday_noon(), false)
    }

    pub fn resolver<'a>(
        net: &'a Network,
        config: &'a PlannerConfig,
        store: &'a InMemoryRepository,
    ) -> WalkResolver<'a, NoRouter, InMemoryRepository> {
        WalkResolver::new(net, config, &NoRouter, store)
    }

    pub fn ride(route: usize, board: usize, alight: usize) -> Step {
        Step::Ride {
            route,
            board,
            alight,
            minutes: 0.0,
            wait_minutes: 4.0,
            distance_m: 0.0,
            trip: None,
        }
    }

    pub fn walk(from: &str, to: &str) -> Step {
        Step::Walk {
            from: sid(from),
            to: sid(to),
            minutes: 0.0,
            distance_m: 0.0,
        }
    }

    /// Build an itinerary from raw steps, panicking if it is unbuildable.
    pub fn build(
        legs: &LegBuilder<'_, BandedFarePolicy>,
        walks: &WalkResolver<'_, NoRouter, InMemoryRepository>,
        steps: Vec<Step>,
    ) -> Itinerary {
        let solution = Solution {
            steps,
            cost: 0.0,
            transfers: 0,
            destination: sid("UNUSED"),
        };
        legs.itinerary(&solution, walks).unwrap()
    }

    pub fn modes(itinerary: &Itinerary) -> Vec<&'static str> {
        itinerary
            .legs()
            .iter()
            .map(|l| match l {
                Leg::Bus(_) => "bus",
                Leg::Walk(_) => "walk",
            })
            .collect()
    }
}
