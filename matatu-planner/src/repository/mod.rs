//! Access to transit reference data.
//!
//! The planner reads stops, routes, trips, walking edges, hubs and regions
//! through [`TransitRepository`] and persists newly computed walking edges
//! through [`TransferEdgeStore`]. Storage itself lives outside this crate;
//! [`InMemoryRepository`] serves a JSON snapshot for tests and the binary.

mod error;
mod memory;

pub use error::RepositoryError;
pub use memory::{InMemoryRepository, Snapshot};

use crate::domain::{Hub, Region, Route, RouteId, Stop, TransferEdge, Trip};

/// Read interface over transit reference data.
///
/// Implementations return owned snapshots; the planner loads everything it
/// needs once at the start of a request.
pub trait TransitRepository {
    /// All stops.
    fn stops(&self) -> Result<Vec<Stop>, RepositoryError>;

    /// All routes.
    fn routes(&self) -> Result<Vec<Route>, RepositoryError>;

    /// Scheduled trips for one route.
    fn trips(&self, route: &RouteId) -> Result<Vec<Trip>, RepositoryError>;

    /// All known walking edges.
    fn transfer_edges(&self) -> Result<Vec<TransferEdge>, RepositoryError>;

    /// All hub stops.
    fn hubs(&self) -> Result<Vec<Hub>, RepositoryError>;

    /// Regions that hubs belong to.
    fn regions(&self) -> Result<Vec<Region>, RepositoryError>;

    /// The designated high-density zone, if configured.
    fn cbd(&self) -> Result<Option<Region>, RepositoryError>;
}

/// Write interface for walking edges discovered during planning.
///
/// Writes are idempotent upserts keyed by the (from, to) stop pair; when two
/// requests race on the same pair, the last writer wins.
pub trait TransferEdgeStore {
    fn upsert_transfer_edge(&self, edge: &TransferEdge) -> Result<(), RepositoryError>;
}
