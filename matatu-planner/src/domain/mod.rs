//! Domain types for the journey planner.
//!
//! This module contains the core domain model types that represent
//! validated transit data. All types enforce their invariants at construction
//! time, so code that receives these types can trust their validity.

mod error;
mod itinerary;
mod leg;
mod point;
mod region;
mod route;
mod stop;
mod transfer;
mod trip;

pub use error::DomainError;
pub use itinerary::Itinerary;
pub use leg::{BusLeg, Fare, Leg, Place, TripChoice, WalkLeg};
pub use point::{InvalidPoint, Point};
pub use region::{Hub, Region, RegionShape};
pub use route::{FareBand, Route, RouteId, RouteVariation};
pub use stop::{InvalidId, Stop, StopId};
pub use transfer::TransferEdge;
pub use trip::{StopTime, Trip, TripId};
