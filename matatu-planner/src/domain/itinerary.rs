//! Itinerary type.
//!
//! An `Itinerary` is a complete trip from origin to destination: bus legs
//! and walk legs in order, each starting where the previous one ended.

use serde::Serialize;

use super::{BusLeg, DomainError, Leg, Place, RouteId, WalkLeg};

/// A complete itinerary.
///
/// # Invariants
///
/// - At least one leg
/// - Consecutive legs connect (end of one = start of next)
/// - No two walk legs are adjacent (they are merged at construction)
/// - Every bus leg travels forward on its route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Itinerary {
    legs: Vec<Leg>,
    total_minutes: f64,
}

impl Itinerary {
    /// Constructs an itinerary, merging adjacent walk legs.
    ///
    /// # Errors
    ///
    /// Returns `Err` if:
    /// - `legs` is empty
    /// - consecutive legs don't connect
    /// - a bus leg is invalid
    pub fn new(legs: Vec<Leg>) -> Result<Self, DomainError> {
        if legs.is_empty() {
            return Err(DomainError::EmptyItinerary);
        }

        for window in legs.windows(2) {
            if !window[0].end().same_as(window[1].start()) {
                return Err(DomainError::LegsNotConnected);
            }
        }

        let mut merged: Vec<Leg> = Vec::with_capacity(legs.len());
        for leg in legs {
            if let Leg::Bus(bus) = &leg {
                bus.validate()?;
            }
            match (merged.pop(), leg) {
                (Some(Leg::Walk(prev)), Leg::Walk(next)) => {
                    merged.push(Leg::Walk(prev.join(next)?));
                }
                (prev, leg) => {
                    merged.extend(prev);
                    merged.push(leg);
                }
            }
        }

        let total_minutes = merged.iter().map(Leg::minutes).sum();
        Ok(Itinerary {
            legs: merged,
            total_minutes,
        })
    }

    /// A single-walk itinerary.
    pub fn walk_only(walk: WalkLeg) -> Self {
        Itinerary {
            total_minutes: walk.minutes,
            legs: vec![Leg::Walk(walk)],
        }
    }

    /// Returns all legs in order.
    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    /// Consumes the itinerary, returning its legs.
    pub fn into_legs(self) -> Vec<Leg> {
        self.legs
    }

    /// Returns all bus legs in order.
    pub fn bus_legs(&self) -> impl Iterator<Item = &BusLeg> {
        self.legs.iter().filter_map(Leg::as_bus)
    }

    /// Returns all walk legs in order.
    pub fn walk_legs(&self) -> impl Iterator<Item = &WalkLeg> {
        self.legs.iter().filter_map(Leg::as_walk)
    }

    /// Number of bus legs.
    pub fn bus_leg_count(&self) -> usize {
        self.bus_legs().count()
    }

    /// Number of transfers (bus legs - 1, or 0).
    pub fn transfer_count(&self) -> usize {
        self.bus_leg_count().saturating_sub(1)
    }

    /// Where the itinerary starts.
    pub fn origin(&self) -> &Place {
        // never empty, checked in `new`
        self.legs[0].start()
    }

    /// Where the itinerary ends.
    pub fn destination(&self) -> &Place {
        // never empty, checked in `new`
        self.legs[self.legs.len() - 1].end()
    }

    /// Total estimated duration in minutes, waits included.
    pub fn total_minutes(&self) -> f64 {
        self.total_minutes
    }

    /// Minutes spent on board, waits included.
    pub fn ride_minutes(&self) -> f64 {
        self.bus_legs().map(|b| b.minutes + b.wait_minutes).sum()
    }

    /// Minutes spent walking.
    pub fn walk_minutes(&self) -> f64 {
        self.walk_legs().map(|w| w.minutes).sum()
    }

    /// Total metres walked.
    pub fn walk_distance_m(&self) -> f64 {
        self.walk_legs().map(|w| w.distance_m).sum()
    }

    /// Ranking cost: ride minutes + weighted walk minutes + transfer penalties.
    pub fn cost(&self, walk_weight: f64, transfer_penalty_mins: f64) -> f64 {
        self.ride_minutes()
            + walk_weight * self.walk_minutes()
            + self.transfer_count() as f64 * transfer_penalty_mins
    }

    /// Ordered route ids of the bus legs.
    pub fn route_signature(&self) -> Vec<RouteId> {
        self.bus_legs().map(|b| b.route_id.clone()).collect()
    }

    /// Sum of fares over the bus legs.
    pub fn total_fare(&self) -> f64 {
        self.bus_legs().map(|b| b.fare.amount).sum()
    }
}
