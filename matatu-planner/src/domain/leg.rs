//! Leg types.
//!
//! A `Leg` is one contiguous bus ride or walk. Legs are built once by the
//! leg builder and never mutated afterwards; refinement replaces whole legs.

use chrono::NaiveTime;
use serde::Serialize;

use super::{DomainError, Point, RouteId, Stop, StopId, TripId};

/// Where a leg starts or ends: a stop, or a raw coordinate for access and
/// egress walks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Place {
    Stop {
        id: StopId,
        name: String,
        location: Point,
    },
    Coordinate {
        location: Point,
    },
}

impl Place {
    /// A place at a stop.
    pub fn stop(stop: &Stop) -> Self {
        Place::Stop {
            id: stop.id.clone(),
            name: stop.name.clone(),
            location: stop.location,
        }
    }

    /// A place at a raw coordinate.
    pub fn coordinate(location: Point) -> Self {
        Place::Coordinate { location }
    }

    /// The coordinate of this place.
    pub fn location(&self) -> Point {
        match self {
            Place::Stop { location, .. } | Place::Coordinate { location } => *location,
        }
    }

    /// The stop id, if this place is a stop.
    pub fn stop_id(&self) -> Option<&StopId> {
        match self {
            Place::Stop { id, .. } => Some(id),
            Place::Coordinate { .. } => None,
        }
    }

    /// Returns true if both places denote the same point of the journey.
    ///
    /// Stops compare by id, coordinates by value.
    pub fn same_as(&self, other: &Place) -> bool {
        match (self, other) {
            (Place::Stop { id: a, .. }, Place::Stop { id: b, .. }) => a == b,
            (Place::Coordinate { location: a }, Place::Coordinate { location: b }) => a == b,
            _ => false,
        }
    }
}

/// Fare charged for one bus leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fare {
    pub amount: f64,
    pub currency: String,
    /// Full-route peak fare, for reference.
    pub peak: f64,
    /// Full-route off-peak fare, for reference.
    pub off_peak: f64,
    pub is_peak: bool,
    /// Set when the distance-based amount is not authoritative.
    pub requires_manual_fare: bool,
}

/// The scheduled trip chosen for a bus leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripChoice {
    pub trip_id: TripId,
    pub departs: NaiveTime,
    pub arrives: NaiveTime,
}

/// A bus ride from boarding to alighting on one route.
///
/// # Invariants
///
/// - `board_index < alight_index` (no backward boarding)
/// - `board` and `alight` are stop places
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusLeg {
    pub route_id: RouteId,
    pub operator: String,
    pub base_route: String,
    pub board: Place,
    pub alight: Place,
    pub board_index: usize,
    pub alight_index: usize,
    pub fare: Fare,
    pub distance_m: f64,
    pub geometry: Vec<Point>,
    /// True when the geometry comes from an alternate alignment.
    pub alternate_alignment: bool,
    /// Minutes on board.
    pub minutes: f64,
    /// Minutes waiting at the boarding stop.
    pub wait_minutes: f64,
    pub trip: Option<TripChoice>,
}

impl BusLeg {
    /// Check the leg invariants.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.alight_index <= self.board_index {
            return Err(DomainError::InvalidLeg(
                "alight index must be after board index",
            ));
        }
        if self.board.stop_id().is_none() || self.alight.stop_id().is_none() {
            return Err(DomainError::InvalidLeg("bus legs must start and end at stops"));
        }
        if !self.minutes.is_finite() || self.minutes < 0.0 {
            return Err(DomainError::InvalidLeg("ride minutes must be non-negative"));
        }
        Ok(())
    }
}

/// A walk between two places.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkLeg {
    pub from: Place,
    pub to: Place,
    pub minutes: f64,
    pub distance_m: f64,
    pub geometry: Vec<Point>,
}

impl WalkLeg {
    /// Join this walk with the one that follows it.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `next` does not start where this walk ends.
    pub fn join(self, next: WalkLeg) -> Result<WalkLeg, DomainError> {
        if !self.to.same_as(&next.from) {
            return Err(DomainError::LegsNotConnected);
        }
        let mut geometry = self.geometry;
        let skip = usize::from(geometry.last().is_some() && geometry.last() == next.geometry.first());
        geometry.extend(next.geometry.into_iter().skip(skip));
        Ok(WalkLeg {
            from: self.from,
            to: next.to,
            minutes: self.minutes + next.minutes,
            distance_m: self.distance_m + next.distance_m,
            geometry,
        })
    }
}

/// A leg of an itinerary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Leg {
    Bus(BusLeg),
    Walk(WalkLeg),
}

impl Leg {
    /// Where this leg starts.
    pub fn start(&self) -> &Place {
        match self {
            Leg::Bus(bus) => &bus.board,
            Leg::Walk(walk) => &walk.from,
        }
    }

    /// Where this leg ends.
    pub fn end(&self) -> &Place {
        match self {
            Leg::Bus(bus) => &bus.alight,
            Leg::Walk(walk) => &walk.to,
        }
    }

    /// Minutes spent on this leg, including any wait before boarding.
    pub fn minutes(&self) -> f64 {
        match self {
            Leg::Bus(bus) => bus.wait_minutes + bus.minutes,
            Leg::Walk(walk) => walk.minutes,
        }
    }

    /// Distance covered, in metres.
    pub fn distance_m(&self) -> f64 {
        match self {
            Leg::Bus(bus) => bus.distance_m,
            Leg::Walk(walk) => walk.distance_m,
        }
    }

    /// Returns true if this is a bus leg.
    pub fn is_bus(&self) -> bool {
        matches!(self, Leg::Bus(_))
    }

    /// Returns true if this is a walk leg.
    pub fn is_walk(&self) -> bool {
        matches!(self, Leg::Walk(_))
    }

    /// Returns the bus leg, if this is one.
    pub fn as_bus(&self) -> Option<&BusLeg> {
        match self {
            Leg::Bus(bus) => Some(bus),
            Leg::Walk(_) => None,
        }
    }

    /// Returns the walk leg, if this is one.
    pub fn as_walk(&self) -> Option<&WalkLeg> {
        match self {
            Leg::Bus(_) => None,
            Leg::Walk(walk) => Some(walk),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lng: f64) -> Point {
        Point::new(lat, lng).unwrap()
    }

    fn stop_place(id: &str, lat: f64) -> Place {
        Place::Stop {
            id: StopId::parse(id).unwrap(),
            name: id.to_string(),
            location: pt(lat, 36.8),
        }
    }

    fn walk(from: Place, to: Place, minutes: f64) -> WalkLeg {
        let geometry = vec![from.location(), to.location()];
        WalkLeg {
            from,
            to,
            minutes,
            distance_m: minutes * 80.0,
            geometry,
        }
    }

    #[test]
    fn same_as_compares_stops_by_id() {
        let a = stop_place("A", -1.0);
        let mut a_renamed = stop_place("A", -1.0);
        if let Place::Stop { name, .. } = &mut a_renamed {
            *name = "Renamed".into();
        }
        assert!(a.same_as(&a_renamed));
        assert!(!a.same_as(&stop_place("B", -1.0)));
        assert!(!a.same_as(&Place::coordinate(pt(-1.0, 36.8))));
    }

    #[test]
    fn walk_join_concatenates() {
        let a = stop_place("A", -1.00);
        let b = stop_place("B", -1.01);
        let c = stop_place("C", -1.02);
        let joined = walk(a.clone(), b.clone(), 3.0)
            .join(walk(b, c.clone(), 4.0))
            .unwrap();
        assert!(joined.from.same_as(&a));
        assert!(joined.to.same_as(&c));
        assert_eq!(joined.minutes, 7.0);
        assert_eq!(joined.geometry.len(), 3); // shared vertex kept once
    }

    #[test]
    fn walk_join_rejects_gap() {
        let a = stop_place("A", -1.00);
        let b = stop_place("B", -1.01);
        let c = stop_place("C", -1.02);
        let result = walk(a.clone(), b, 3.0).join(walk(c, a, 4.0));
        assert!(matches!(result, Err(DomainError::LegsNotConnected)));
    }

    #[test]
    fn leg_minutes_include_wait() {
        let leg = Leg::Bus(BusLeg {
            route_id: RouteId::parse("R1").unwrap(),
            operator: "Op".into(),
            base_route: "1".into(),
            board: stop_place("A", -1.0),
            alight: stop_place("B", -1.1),
            board_index: 0,
            alight_index: 1,
            fare: Fare {
                amount: 50.0,
                currency: "KES".into(),
                peak: 80.0,
                off_peak: 50.0,
                is_peak: false,
                requires_manual_fare: false,
            },
            distance_m: 5000.0,
            geometry: vec![],
            alternate_alignment: false,
            minutes: 15.0,
            wait_minutes: 4.0,
            trip: None,
        });
        assert_eq!(leg.minutes(), 19.0);
        assert!(leg.is_bus());
        assert!(leg.as_bus().unwrap().validate().is_ok());
    }
}
