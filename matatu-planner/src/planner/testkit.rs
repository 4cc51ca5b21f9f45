//! Test fixtures: a small builder for in-memory networks.

use std::collections::HashMap;

use chrono::{NaiveTime, Weekday};

use crate::domain::{
    FareBand, Hub, Point, Region, Route, RouteId, RouteVariation, Stop, StopId, StopTime,
    TransferEdge, Trip, TripId,
};
use crate::repository::{InMemoryRepository, Snapshot};

use super::config::PlannerConfig;
use super::network::Network;

pub fn pt(lat: f64, lng: f64) -> Point {
    Point::new(lat, lng).unwrap()
}

pub fn sid(s: &str) -> StopId {
    StopId::parse(s).unwrap()
}

pub fn rid(s: &str) -> RouteId {
    RouteId::parse(s).unwrap()
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Builds a snapshot stop by stop and route by route.
#[derive(Debug, Clone, Default)]
pub struct Fixture {
    snapshot: Snapshot,
    locations: HashMap<String, Point>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&mut self, id: &str, lat: f64, lng: f64) -> &mut Self {
        let location = pt(lat, lng);
        self.locations.insert(id.to_string(), location);
        self.snapshot
            .stops
            .push(Stop::new(sid(id), format!("{id} Stage"), location));
        self
    }

    /// A route whose geometry runs through its known stops, with a
    /// 100/70 KES fare band.
    pub fn route(&mut self, id: &str, operator: &str, base: &str, stops: &[&str]) -> &mut Self {
        let geometry: Vec<Point> = stops
            .iter()
            .filter_map(|s| self.locations.get(*s).copied())
            .collect();
        let route = Route::new(
            rid(id),
            operator,
            base,
            stops.iter().map(|s| sid(s)).collect(),
            geometry,
        )
        .unwrap()
        .with_fare(FareBand {
            peak: 100.0,
            off_peak: 70.0,
            currency: "KES".into(),
        });
        self.snapshot.routes.push(route);
        self
    }

    /// Adds an alternate alignment to the most recently added route.
    pub fn variation(&mut self, stops: &[&str], geometry: Vec<Point>) -> &mut Self {
        let route = self.snapshot.routes.pop().unwrap();
        let route = route
            .with_variation(RouteVariation {
                stops: stops.iter().map(|s| sid(s)).collect(),
                geometry,
            })
            .unwrap();
        self.snapshot.routes.push(route);
        self
    }

    pub fn edge(&mut self, from: &str, to: &str, minutes: f64, distance_m: f64) -> &mut Self {
        self.snapshot
            .transfer_edges
            .push(TransferEdge::new(sid(from), sid(to), minutes, distance_m, vec![]).unwrap());
        self
    }

    pub fn hub(&mut self, stop: &str, region: &str) -> &mut Self {
        self.snapshot.hubs.push(Hub {
            stop_id: sid(stop),
            region: region.to_string(),
        });
        self
    }

    pub fn region(&mut self, name: &str, ring: &[(f64, f64)]) -> &mut Self {
        let ring = ring.iter().map(|(lat, lng)| pt(*lat, *lng)).collect();
        self.snapshot
            .regions
            .push(Region::polygon(name, ring).unwrap());
        self
    }

    pub fn cbd_polygon(&mut self, ring: &[(f64, f64)]) -> &mut Self {
        let ring = ring.iter().map(|(lat, lng)| pt(*lat, *lng)).collect();
        self.snapshot.cbd = Some(Region::polygon("CBD", ring).unwrap());
        self
    }

    /// A trip running every day with one (arrival = departure) time per stop.
    pub fn trip(&mut self, id: &str, route: &str, times: &[Option<(u32, u32)>]) -> &mut Self {
        self.snapshot.trips.push(Trip {
            id: TripId::parse(id).unwrap(),
            route_id: rid(route),
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ],
            stop_times: times
                .iter()
                .map(|t| t.map(|(h, m)| StopTime::at(hm(h, m))))
                .collect(),
        });
        self
    }

    pub fn location(&self, id: &str) -> Point {
        self.locations[id]
    }

    pub fn repository(&self) -> InMemoryRepository {
        InMemoryRepository::new(self.snapshot.clone())
    }

    pub fn network(&self) -> Network {
        Network::load(&self.repository(), &PlannerConfig::default(), false).unwrap()
    }

    pub fn network_with_trips(&self) -> Network {
        Network::load(&self.repository(), &PlannerConfig::default(), true).unwrap()
    }
}
