//! Deduplication and ranking of itineraries.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::{Itinerary, RouteId};
use crate::planner::config::PlannerConfig;
use crate::planner::network::Network;

/// Number of boarding and alighting stops that are hubs.
pub fn hub_score(itinerary: &Itinerary, network: &Network) -> usize {
    itinerary
        .bus_legs()
        .flat_map(|b| [&b.board, &b.alight])
        .filter(|p| p.stop_id().is_some_and(|id| network.is_hub(id)))
        .count()
}

fn cost(itinerary: &Itinerary, config: &PlannerConfig) -> f64 {
    itinerary.cost(config.walk_weight, config.transfer_penalty_mins)
}

/// Keep one itinerary per route signature.
///
/// Among itineraries riding the same routes in the same order, the cheaper
/// one wins; on equal cost the one with the higher hub score wins, else the
/// first seen. Survivors keep their first-seen order.
pub fn deduplicate(
    itineraries: Vec<Itinerary>,
    network: &Network,
    config: &PlannerConfig,
) -> Vec<Itinerary> {
    if itineraries.len() <= 1 {
        return itineraries;
    }

    let mut slots: HashMap<Vec<RouteId>, usize> = HashMap::new();
    let mut kept: Vec<Itinerary> = Vec::with_capacity(itineraries.len());

    for itinerary in itineraries {
        let signature = itinerary.route_signature();
        match slots.get(&signature) {
            Some(&slot) => {
                let current = &kept[slot];
                let (new_cost, old_cost) = (cost(&itinerary, config), cost(current, config));
                let replace = new_cost < old_cost
                    || (new_cost == old_cost
                        && hub_score(&itinerary, network) > hub_score(current, network));
                if replace {
                    kept[slot] = itinerary;
                }
            }
            None => {
                slots.insert(signature, kept.len());
                kept.push(itinerary);
            }
        }
    }

    kept
}

/// Rank itineraries best first.
///
/// Itineraries are ranked by:
/// 1. Cost (ride minutes + weighted walk minutes + transfer penalties)
/// 2. Number of transfers (fewer is better)
/// 3. Total duration (shorter is better)
pub fn rank(mut itineraries: Vec<Itinerary>, config: &PlannerConfig) -> Vec<Itinerary> {
    itineraries.sort_by(|a, b| compare(a, b, config));
    itineraries
}

fn compare(a: &Itinerary, b: &Itinerary, config: &PlannerConfig) -> Ordering {
    cost(a, config)
        .total_cmp(&cost(b, config))
        .then_with(|| a.transfer_count().cmp(&b.transfer_count()))
        .then_with(|| a.total_minutes().total_cmp(&b.total_minutes()))
}
