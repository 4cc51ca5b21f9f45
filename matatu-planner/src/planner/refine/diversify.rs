//! Operator diversification.
//!
//! Saccos running the same base route are interchangeable to a passenger.
//! When several itineraries ride the same operator route at the same bus-leg
//! position, later ones are moved to another operator on that base route if
//! one serves the same stops, or stops within `stitch_tolerance_m` of them.

use std::collections::HashSet;

use tracing::trace;

use crate::domain::{BusLeg, Itinerary, Leg, Place, Route, RouteId};
use crate::fare::FarePolicy;
use crate::geometry::haversine_m;
use crate::planner::legs::WalkResolver;
use crate::planner::schedule::after_minutes;
use crate::repository::TransferEdgeStore;
use crate::walking::PedestrianRouter;

use super::RefineContext;

/// A planned swap of one bus leg onto another operator's route.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Substitution {
    itinerary: usize,
    leg: usize,
    route: usize,
    board: usize,
    alight: usize,
    /// From the original boarding stop to the substitute's.
    stitch_before: Option<(Place, Place)>,
    /// From the substitute's alighting stop to the original one.
    stitch_after: Option<(Place, Place)>,
}

struct Match {
    board: usize,
    alight: usize,
    stitch_before: Option<(Place, Place)>,
    stitch_after: Option<(Place, Place)>,
    penalty: f64,
}

/// Nearest position on `route` at or after `from` to `target`, within `tolerance_m`.
fn nearest_position<F: FarePolicy + ?Sized>(
    context: &RefineContext<'_, F>,
    route: &Route,
    target: &Place,
    from: usize,
    tolerance_m: f64,
) -> Option<(usize, f64)> {
    let network = context.network();
    route
        .stops
        .iter()
        .enumerate()
        .skip(from)
        .filter_map(|(i, id)| {
            let stop = network.stop(id)?;
            Some((i, haversine_m(stop.location, target.location())))
        })
        .filter(|(_, d)| *d <= tolerance_m)
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

fn match_route<F: FarePolicy + ?Sized>(
    context: &RefineContext<'_, F>,
    route: &Route,
    bus: &BusLeg,
) -> Option<Match> {
    let board_id = bus.board.stop_id()?;
    let alight_id = bus.alight.stop_id()?;

    if let Some(board) = route.index_of(board_id, 0) {
        if let Some(alight) = route.index_of(alight_id, board + 1) {
            return Some(Match {
                board,
                alight,
                stitch_before: None,
                stitch_after: None,
                penalty: 0.0,
            });
        }
    }

    let config = context.config();
    let tolerance = config.stitch_tolerance_m;
    let (board, board_m) = nearest_position(context, route, &bus.board, 0, tolerance)?;
    let (alight, alight_m) = nearest_position(context, route, &bus.alight, board + 1, tolerance)?;

    let network = context.network();
    let place_at = |i: usize| network.stop(&route.stops[i]).map(Place::stop);
    let new_board = place_at(board)?;
    let new_alight = place_at(alight)?;

    Some(Match {
        board,
        alight,
        stitch_before: (!new_board.same_as(&bus.board)).then(|| (bus.board.clone(), new_board)),
        stitch_after: (!new_alight.same_as(&bus.alight)).then(|| (new_alight, bus.alight.clone())),
        penalty: config.walk_minutes(board_m) + config.walk_minutes(alight_m),
    })
}

/// Decide which legs to move, without resolving any walks yet.
pub(super) fn plan<F: FarePolicy + ?Sized>(
    context: &RefineContext<'_, F>,
    itineraries: &[Itinerary],
) -> Vec<Substitution> {
    let network = context.network();
    let mut seen: HashSet<(usize, RouteId)> = HashSet::new();
    let mut substitutions = Vec::new();

    for (i, itinerary) in itineraries.iter().enumerate() {
        let buses = itinerary
            .legs()
            .iter()
            .enumerate()
            .filter_map(|(leg, l)| l.as_bus().map(|bus| (leg, bus)));

        for (position, (leg, bus)) in buses.enumerate() {
            let key = (position, bus.route_id.clone());
            if !seen.contains(&key) || context.prefers(&bus.operator) {
                seen.insert(key);
                continue;
            }

            let best = network
                .routes()
                .iter()
                .enumerate()
                .filter(|(_, r)| {
                    r.base_route == bus.base_route
                        && r.id != bus.route_id
                        && !r.operator.trim().eq_ignore_ascii_case(bus.operator.trim())
                })
                .filter_map(|(idx, r)| match_route(context, r, bus).map(|m| (idx, r, m)))
                .min_by(|(_, a, ma), (_, b, mb)| {
                    let rank = |r: &Route| {
                        (
                            !context.prefers(&r.operator),
                            seen.contains(&(position, r.id.clone())),
                        )
                    };
                    rank(a)
                        .cmp(&rank(b))
                        .then_with(|| ma.penalty.total_cmp(&mb.penalty))
                });

            if let Some((route, r, m)) = best {
                trace!(from = %bus.route_id, to = %r.id, penalty = m.penalty, "diversifying leg");
                seen.insert((position, r.id.clone()));
                substitutions.push(Substitution {
                    itinerary: i,
                    leg,
                    route,
                    board: m.board,
                    alight: m.alight,
                    stitch_before: m.stitch_before,
                    stitch_after: m.stitch_after,
                });
            }
        }
    }

    substitutions
}

/// Stitching walks the substitutions need.
pub(super) fn stitch_walks(substitutions: &[Substitution]) -> Vec<(Place, Place)> {
    substitutions
        .iter()
        .flat_map(|s| s.stitch_before.iter().chain(s.stitch_after.iter()).cloned())
        .collect()
}

/// A walk leg next to a substituted leg must respect the cap for its kind.
fn walk_within_cap<F: FarePolicy + ?Sized>(context: &RefineContext<'_, F>, leg: Option<&Leg>) -> bool {
    let Some(Leg::Walk(walk)) = leg else {
        return true;
    };
    let config = context.config();
    let bookend = matches!(walk.from, Place::Coordinate { .. }) || matches!(walk.to, Place::Coordinate { .. });
    let cap = if bookend {
        config.max_access_walk_m
    } else {
        config.max_transfer_walk_m
    };
    walk.distance_m <= cap
}

/// Apply substitutions. One that would need an over-long walk, or that no
/// longer yields a consistent itinerary, is skipped.
pub(super) fn apply<F, P, S>(
    context: &RefineContext<'_, F>,
    walks: &WalkResolver<'_, P, S>,
    mut itineraries: Vec<Itinerary>,
    substitutions: Vec<Substitution>,
) -> Vec<Itinerary>
where
    F: FarePolicy + ?Sized,
    P: PedestrianRouter,
    S: TransferEdgeStore + ?Sized,
{
    // Later legs first, so earlier leg indices stay valid.
    for sub in substitutions.into_iter().rev() {
        let Some(itinerary) = itineraries.get(sub.itinerary) else {
            continue;
        };
        let legs = itinerary.legs();
        let Some(Leg::Bus(original)) = legs.get(sub.leg) else {
            continue;
        };

        let before = sub.stitch_before.as_ref().map(|(a, b)| walks.walk(a, b));
        let after = sub.stitch_after.as_ref().map(|(a, b)| walks.walk(a, b));

        let elapsed: f64 = legs[..sub.leg].iter().map(Leg::minutes).sum::<f64>()
            + before.as_ref().map_or(0.0, |w| w.minutes)
            + original.wait_minutes;
        let boarding_at = after_minutes(context.legs.departure(), elapsed);
        let Some(replacement) = context.legs.bus_leg(
            sub.route,
            sub.board,
            sub.alight,
            original.wait_minutes,
            None,
            boarding_at,
        ) else {
            continue;
        };
        let replacement_id = replacement.route_id.clone();

        let mut rebuilt: Vec<Leg> = legs[..sub.leg].to_vec();
        rebuilt.extend(before.map(Leg::Walk));
        rebuilt.push(Leg::Bus(replacement));
        rebuilt.extend(after.map(Leg::Walk));
        rebuilt.extend(legs[sub.leg + 1..].iter().cloned());

        let Ok(candidate) = Itinerary::new(rebuilt) else {
            continue;
        };
        let position = candidate
            .legs()
            .iter()
            .position(|l| l.as_bus().is_some_and(|b| b.route_id == replacement_id));
        let within = position.is_some_and(|p| {
            walk_within_cap(context, p.checked_sub(1).and_then(|q| candidate.legs().get(q)))
                && walk_within_cap(context, candidate.legs().get(p + 1))
        });
        if !within {
            trace!(route = %replacement_id, "substitution needs a long walk");
            continue;
        }
        itineraries[sub.itinerary] = candidate;
    }

    itineraries
}
