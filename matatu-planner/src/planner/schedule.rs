//! Scheduled-trip lookup.
//!
//! Only used when the caller supplies a departure time. A miss is never an
//! error: the search keeps its heuristic ride time.

use chrono::{Datelike, NaiveDateTime, NaiveTime, TimeDelta};

use crate::domain::{Trip, TripChoice};

/// A trip picked for a board/alight pair, with the resulting timings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledRide {
    pub trip: TripChoice,
    pub wait_minutes: f64,
    pub ride_minutes: f64,
}

/// Minutes from `from` to `to`, wrapping past midnight.
pub fn minutes_between(from: NaiveTime, to: NaiveTime) -> f64 {
    let mins = (to - from).num_seconds() as f64 / 60.0;
    if mins < 0.0 { mins + 24.0 * 60.0 } else { mins }
}

/// `at` shifted by a fractional number of minutes, to the nearest second.
pub fn after_minutes(at: NaiveDateTime, minutes: f64) -> NaiveDateTime {
    at + TimeDelta::seconds((minutes * 60.0).round() as i64)
}

/// The earliest trip running on `at`'s weekday that departs `board` at or
/// after `at` and later reaches `alight`.
pub fn earliest_ride(
    trips: &[Trip],
    board: usize,
    alight: usize,
    at: NaiveDateTime,
) -> Option<ScheduledRide> {
    let day = at.weekday();
    let now = at.time();

    trips
        .iter()
        .filter(|t| t.runs_on(day) && t.serves(board, alight))
        .filter_map(|t| {
            let departs = t.departure_at(board)?;
            let arrives = t.arrival_at(alight)?;
            (departs >= now).then_some((t, departs, arrives))
        })
        .min_by_key(|(_, departs, _)| *departs)
        .map(|(trip, departs, arrives)| ScheduledRide {
            trip: TripChoice {
                trip_id: trip.id.clone(),
                departs,
                arrives,
            },
            wait_minutes: minutes_between(now, departs),
            ride_minutes: minutes_between(departs, arrives),
        })
}

/// Extend a chosen trip to a later alighting index.
pub fn extend_ride(trips: &[Trip], choice: &TripChoice, alight: usize) -> Option<TripChoice> {
    let trip = trips.iter().find(|t| t.id == choice.trip_id)?;
    let arrives = trip.arrival_at(alight)?;
    Some(TripChoice {
        arrives,
        ..choice.clone()
    })
}
