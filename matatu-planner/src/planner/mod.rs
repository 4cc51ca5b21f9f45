//! Journey planner using a bounded round-based search.
//!
//! This module implements the core planning algorithm that answers:
//! "How do I get from this coordinate to that one by matatu and on foot?"
//!
//! Each round extends every stop improved in the previous round by one bus
//! ride (board any route serving it, alight at sampled downstream stops),
//! then by one walking transfer. Complete paths are kept in a soft window
//! around the best cost, then built into itineraries and refined.

mod acceptance;
mod config;
mod corridor;
mod legs;
mod network;
mod plan;
mod refine;
mod resolver;
mod schedule;
mod search;
mod segments;

#[cfg(test)]
mod testkit;

pub use config::PlannerConfig;
pub use network::Network;
pub use plan::{PlanError, PlanOutcome, PlanRequest, PlanStatus, Planner};
pub use refine::{deduplicate, hub_score, rank};
pub use resolver::{Candidate, resolve};
pub use search::SearchStats;
