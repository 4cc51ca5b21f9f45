//! Replacing short bus hops with walks.
//!
//! Two passes. A bus leg with both ends in the CBD becomes a walk when the
//! walk is shorter than `cbd_short_hop_m` and not disproportionately slower.
//! Then a run of two or more short urban bus legs (touching the CBD or staying
//! in one coarse cell) becomes a single walk when that walk stays under
//! `urban_walk_cap_m`.

use tracing::trace;

use crate::domain::{BusLeg, Itinerary, Leg, Place};
use crate::fare::FarePolicy;
use crate::geometry::haversine_m;
use crate::repository::TransferEdgeStore;
use crate::walking::PedestrianRouter;

use super::RefineContext;
use crate::planner::legs::WalkResolver;

fn is_cbd_hop<F: FarePolicy + ?Sized>(context: &RefineContext<'_, F>, bus: &BusLeg) -> bool {
    let network = context.network();
    let in_cbd = |p: &Place| p.stop_id().is_some_and(|id| network.in_cbd(id));
    in_cbd(&bus.board)
        && in_cbd(&bus.alight)
        && haversine_m(bus.board.location(), bus.alight.location()) < context.config().cbd_short_hop_m
}

fn is_urban<F: FarePolicy + ?Sized>(context: &RefineContext<'_, F>, bus: &BusLeg) -> bool {
    let network = context.network();
    if bus.distance_m >= context.config().urban_leg_max_m {
        return false;
    }
    let in_cbd = |p: &Place| p.stop_id().is_some_and(|id| network.in_cbd(id));
    if in_cbd(&bus.board) || in_cbd(&bus.alight) {
        return true;
    }
    match (
        network.coarse_cell_of(bus.board.location()),
        network.coarse_cell_of(bus.alight.location()),
    ) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Walks the CBD pass may need.
pub(super) fn cbd_hop_walks<F: FarePolicy + ?Sized>(
    context: &RefineContext<'_, F>,
    itineraries: &[Itinerary],
) -> Vec<(Place, Place)> {
    itineraries
        .iter()
        .flat_map(Itinerary::bus_legs)
        .filter(|bus| is_cbd_hop(context, bus))
        .map(|bus| (bus.board.clone(), bus.alight.clone()))
        .collect()
}

/// Replace short CBD-to-CBD bus legs with walks.
///
/// A walk replaces a leg only if it takes no longer than the leg (wait
/// included) scaled by the bus-to-walk speed ratio and the detour factor.
pub(super) fn collapse_cbd_hops<F, P, S>(
    context: &RefineContext<'_, F>,
    walks: &WalkResolver<'_, P, S>,
    itinerary: Itinerary,
) -> Itinerary
where
    F: FarePolicy + ?Sized,
    P: PedestrianRouter,
    S: TransferEdgeStore + ?Sized,
{
    let config = context.config();
    let ratio = config.bus_speed_kmh / config.walk_speed_kmh * config.walk_detour_factor.max(1.0);

    let mut changed = false;
    let legs: Vec<Leg> = itinerary
        .legs()
        .iter()
        .map(|leg| match leg {
            Leg::Bus(bus) if is_cbd_hop(context, bus) => {
                let walk = walks.walk(&bus.board, &bus.alight);
                if walk.distance_m < config.cbd_short_hop_m && walk.minutes <= leg.minutes() * ratio {
                    trace!(route = %bus.route_id, distance_m = walk.distance_m, "CBD hop walked");
                    changed = true;
                    Leg::Walk(walk)
                } else {
                    leg.clone()
                }
            }
            _ => leg.clone(),
        })
        .collect();

    if !changed {
        return itinerary;
    }
    Itinerary::new(legs).unwrap_or(itinerary)
}

/// Index ranges `[first, last]` of urban runs. Runs start and end on a bus
/// leg, may contain walks, and hold at least two bus legs.
fn urban_runs<F: FarePolicy + ?Sized>(
    context: &RefineContext<'_, F>,
    legs: &[Leg],
) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut current: Option<(usize, usize, usize)> = None; // (first, last bus, bus count)

    let close = |run: Option<(usize, usize, usize)>, runs: &mut Vec<(usize, usize)>| {
        if let Some((first, last, buses)) = run {
            if buses >= 2 {
                runs.push((first, last));
            }
        }
    };

    for (i, leg) in legs.iter().enumerate() {
        match leg {
            Leg::Bus(bus) if is_urban(context, bus) => {
                current = Some(match current {
                    Some((first, _, buses)) => (first, i, buses + 1),
                    None => (i, i, 1),
                });
            }
            Leg::Walk(_) => {}
            Leg::Bus(_) => close(current.take(), &mut runs),
        }
    }
    close(current, &mut runs);
    runs
}

/// Walks the urban pass may need.
pub(super) fn urban_run_walks<F: FarePolicy + ?Sized>(
    context: &RefineContext<'_, F>,
    itineraries: &[Itinerary],
) -> Vec<(Place, Place)> {
    itineraries
        .iter()
        .flat_map(|itinerary| {
            let legs = itinerary.legs();
            urban_runs(context, legs)
                .into_iter()
                .map(|(first, last)| (legs[first].start().clone(), legs[last].end().clone()))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Replace each urban run with one direct walk when it is short enough.
pub(super) fn collapse_urban_runs<F, P, S>(
    context: &RefineContext<'_, F>,
    walks: &WalkResolver<'_, P, S>,
    itinerary: Itinerary,
) -> Itinerary
where
    F: FarePolicy + ?Sized,
    P: PedestrianRouter,
    S: TransferEdgeStore + ?Sized,
{
    let runs = urban_runs(context, itinerary.legs());
    if runs.is_empty() {
        return itinerary;
    }

    let mut legs = itinerary.legs().to_vec();
    let mut changed = false;
    for (first, last) in runs.into_iter().rev() {
        let walk = walks.walk(legs[first].start(), legs[last].end());
        if walk.distance_m <= context.config().urban_walk_cap_m {
            trace!(legs = last - first + 1, distance_m = walk.distance_m, "urban run walked");
            legs.splice(first..=last, [Leg::Walk(walk)]);
            changed = true;
        }
    }

    if !changed {
        return itinerary;
    }
    Itinerary::new(legs).unwrap_or(itinerary)
}
