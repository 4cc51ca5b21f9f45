//! Fare estimation for bus legs.
//!
//! Saccos publish a full-route fare for peak and off-peak hours. A leg's
//! fare is derived from that band, the share of the route ridden, the time of
//! day and whether the day is an event day.

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};

use crate::domain::{Fare, FareBand};

/// Everything a fare policy needs to price one leg.
#[derive(Debug, Clone, Copy)]
pub struct FareQuery<'a> {
    /// Distance ridden, in metres.
    pub leg_m: f64,
    /// Total length of the route, in metres.
    pub route_m: f64,
    /// When the leg is ridden.
    pub time: NaiveDateTime,
    pub event_day: bool,
    /// The route's published fares, if any.
    pub band: Option<&'a FareBand>,
    pub origin_in_cbd: bool,
    pub destination_in_cbd: bool,
}

/// Prices a bus leg.
pub trait FarePolicy {
    fn fare(&self, query: &FareQuery<'_>) -> Fare;
}

/// A clock-time window, start inclusive, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl PeakWindow {
    fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }
}

/// Distance-banded fare policy.
#[derive(Debug, Clone)]
pub struct BandedFarePolicy {
    /// Weekday windows charged at the peak fare.
    pub peak_windows: Vec<PeakWindow>,
    /// Minimum share of the full fare charged for any leg.
    pub min_share: f64,
    /// Multiplier applied on event days.
    pub event_multiplier: f64,
    /// Share of the base fare charged when both ends are in the CBD.
    pub cbd_flat_share: f64,
    /// Amounts are rounded up to a multiple of this.
    pub rounding: f64,
    /// Currency reported when a route has no fare band.
    pub default_currency: String,
}

impl Default for BandedFarePolicy {
    fn default() -> Self {
        Self {
            peak_windows: vec![window((6, 0), (9, 30)), window((16, 30), (20, 0))],
            min_share: 0.3,
            event_multiplier: 1.25,
            cbd_flat_share: 0.4,
            rounding: 10.0,
            default_currency: "KES".to_string(),
        }
    }
}

fn window(start: (u32, u32), end: (u32, u32)) -> PeakWindow {
    PeakWindow {
        start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap_or(NaiveTime::MIN),
        end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap_or(NaiveTime::MIN),
    }
}

impl BandedFarePolicy {
    /// Returns true if `time` falls in a weekday peak window.
    pub fn is_peak(&self, time: NaiveDateTime) -> bool {
        let weekend = matches!(time.weekday(), Weekday::Sat | Weekday::Sun);
        !weekend && self.peak_windows.iter().any(|w| w.contains(time.time()))
    }

    fn round_up(&self, amount: f64) -> f64 {
        if self.rounding <= 0.0 {
            return amount;
        }
        (amount / self.rounding).ceil() * self.rounding
    }
}

impl FarePolicy for BandedFarePolicy {
    fn fare(&self, query: &FareQuery<'_>) -> Fare {
        let is_peak = self.is_peak(query.time);

        let Some(band) = query.band else {
            return Fare {
                amount: 0.0,
                currency: self.default_currency.clone(),
                peak: 0.0,
                off_peak: 0.0,
                is_peak,
                requires_manual_fare: true,
            };
        };

        let base = if is_peak { band.peak } else { band.off_peak };
        let measurable = query.route_m.is_finite()
            && query.route_m > 0.0
            && query.leg_m.is_finite()
            && query.leg_m >= 0.0;

        let mut amount = if query.origin_in_cbd && query.destination_in_cbd {
            base * self.cbd_flat_share
        } else if measurable {
            base * (query.leg_m / query.route_m).clamp(self.min_share, 1.0)
        } else {
            base
        };

        if query.event_day {
            amount *= self.event_multiplier;
        }

        Fare {
            amount: self.round_up(amount),
            currency: band.currency.clone(),
            peak: band.peak,
            off_peak: band.off_peak,
            is_peak,
            requires_manual_fare: !measurable,
        }
    }
}
