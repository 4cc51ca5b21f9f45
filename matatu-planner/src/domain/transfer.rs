//! Walking transfer edges between stops.

use serde::{Deserialize, Serialize};

use super::{DomainError, Point, StopId};

/// A directed walking edge between two stops.
///
/// # Invariants
///
/// - `minutes` and `distance_m` are finite and non-negative
///
/// A missing edge does not mean two stops are unreachable on foot; the
/// planner falls back to a straight-line estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferEdge {
    pub from: StopId,
    pub to: StopId,
    pub minutes: f64,
    pub distance_m: f64,
    #[serde(default)]
    pub geometry: Vec<Point>,
}

impl TransferEdge {
    /// Construct an edge, rejecting negative or non-finite costs.
    pub fn new(
        from: StopId,
        to: StopId,
        minutes: f64,
        distance_m: f64,
        geometry: Vec<Point>,
    ) -> Result<Self, DomainError> {
        let edge = Self {
            from,
            to,
            minutes,
            distance_m,
            geometry,
        };
        edge.validate()?;
        Ok(edge)
    }

    /// Check the edge invariants. Used after deserializing snapshot data.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.minutes.is_finite() || self.minutes < 0.0 {
            return Err(DomainError::InvalidTransfer("minutes must be non-negative"));
        }
        if !self.distance_m.is_finite() || self.distance_m < 0.0 {
            return Err(DomainError::InvalidTransfer("distance must be non-negative"));
        }
        Ok(())
    }

    /// The (from, to) key this edge is stored under.
    pub fn key(&self) -> (StopId, StopId) {
        (self.from.clone(), self.to.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    #[test]
    fn accepts_zero_cost() {
        assert!(TransferEdge::new(sid("A"), sid("B"), 0.0, 0.0, vec![]).is_ok());
    }

    #[test]
    fn rejects_negative_minutes() {
        let result = TransferEdge::new(sid("A"), sid("B"), -1.0, 10.0, vec![]);
        assert!(matches!(result, Err(DomainError::InvalidTransfer(_))));
    }

    #[test]
    fn rejects_nan_distance() {
        let result = TransferEdge::new(sid("A"), sid("B"), 1.0, f64::NAN, vec![]);
        assert!(result.is_err());
    }
}
