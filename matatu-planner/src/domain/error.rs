//! Domain error types.
//!
//! These errors represent validation failures and data inconsistencies
//! in the domain layer. They are distinct from repository and I/O errors.

use super::RouteId;

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    /// Route data breaks a route invariant
    #[error("invalid route {0}: {1}")]
    InvalidRoute(RouteId, &'static str),

    /// Walking edge with a negative or non-finite cost
    #[error("invalid transfer edge: {0}")]
    InvalidTransfer(&'static str),

    /// Region with no usable shape
    #[error("invalid region {0}")]
    InvalidRegion(String),

    /// Invalid leg construction (e.g., alight before board)
    #[error("invalid leg: {0}")]
    InvalidLeg(&'static str),

    /// Consecutive legs don't connect
    #[error("consecutive legs are not connected")]
    LegsNotConnected,

    /// Itinerary has no legs
    #[error("itinerary must have at least one leg")]
    EmptyItinerary,
}
