//! Scheduled trip types.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use super::stop::string_id;
use super::RouteId;

string_id!(
    /// Stable identifier of a scheduled trip.
    TripId,
    "TripId"
);

/// Clock times at one stop of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopTime {
    pub arrival: NaiveTime,
    pub departure: NaiveTime,
}

impl StopTime {
    /// A stop time where the vehicle does not dwell.
    pub fn at(time: NaiveTime) -> Self {
        Self {
            arrival: time,
            departure: time,
        }
    }
}

/// A scheduled instance of a route.
///
/// `stop_times` is aligned with the route's stop list; `None` means the trip
/// skips that stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub route_id: RouteId,
    pub days: Vec<Weekday>,
    pub stop_times: Vec<Option<StopTime>>,
}

impl Trip {
    /// Returns true if the trip runs on `day`.
    pub fn runs_on(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    /// Departure time at stop index `idx`, if served.
    pub fn departure_at(&self, idx: usize) -> Option<NaiveTime> {
        self.stop_times.get(idx).copied().flatten().map(|t| t.departure)
    }

    /// Arrival time at stop index `idx`, if served.
    pub fn arrival_at(&self, idx: usize) -> Option<NaiveTime> {
        self.stop_times.get(idx).copied().flatten().map(|t| t.arrival)
    }

    /// Returns true if the trip serves `board` and later `alight`.
    pub fn serves(&self, board: usize, alight: usize) -> bool {
        board < alight && self.departure_at(board).is_some() && self.arrival_at(alight).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn trip() -> Trip {
        Trip {
            id: TripId::parse("T1").unwrap(),
            route_id: RouteId::parse("R1").unwrap(),
            days: vec![Weekday::Mon, Weekday::Tue],
            stop_times: vec![Some(StopTime::at(t(7, 0))), None, Some(StopTime::at(t(7, 30)))],
        }
    }

    #[test]
    fn runs_on_days() {
        let trip = trip();
        assert!(trip.runs_on(Weekday::Mon));
        assert!(!trip.runs_on(Weekday::Sun));
    }

    #[test]
    fn serves_only_forward_pairs_with_times() {
        let trip = trip();
        assert!(trip.serves(0, 2));
        assert!(!trip.serves(2, 0));
        assert!(!trip.serves(0, 1)); // skipped stop
        assert!(!trip.serves(0, 9)); // out of range
    }

    #[test]
    fn deserializes_weekdays_and_times() {
        let json = r#"{
            "id": "T9",
            "route_id": "R9",
            "days": ["Sat", "Sun"],
            "stop_times": [{"arrival": "06:00:00", "departure": "06:01:00"}, null]
        }"#;
        let trip: Trip = serde_json::from_str(json).unwrap();
        assert!(trip.runs_on(Weekday::Sat));
        assert_eq!(trip.departure_at(0), Some(t(6, 1)));
        assert_eq!(trip.departure_at(1), None);
    }
}
