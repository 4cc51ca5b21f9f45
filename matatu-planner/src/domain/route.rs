//! Sacco route types.
//!
//! A `Route` is one operator's run over an ordered stop sequence, with the
//! polyline it follows and the fares it charges.

use serde::{Deserialize, Serialize};

use super::stop::{InvalidId, string_id, validate_id};
use super::{DomainError, Point, StopId};

string_id!(
    /// Stable identifier of an operator route.
    RouteId,
    "RouteId"
);

/// Peak and off-peak base fares for a full-length ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareBand {
    pub peak: f64,
    pub off_peak: f64,
    pub currency: String,
}

/// An alternate alignment over a contiguous run of the route's stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteVariation {
    pub stops: Vec<StopId>,
    pub geometry: Vec<Point>,
}

impl RouteVariation {
    /// Position of `board` then `alight` within this variation, board first.
    pub fn span(&self, board: &StopId, alight: &StopId) -> Option<(usize, usize)> {
        let b = self.stops.iter().position(|s| s == board)?;
        let a = self.stops.iter().skip(b + 1).position(|s| s == alight)? + b + 1;
        Some((b, a))
    }
}

/// A sacco route.
///
/// # Invariants
///
/// - At least two stops
/// - Every variation covers a contiguous subsequence of `stops` (two or more)
/// - Every geometry vertex is a valid coordinate
///
/// Stop order is assumed monotonic along `geometry`; the repository owns
/// that guarantee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    /// Operator (sacco) running this route.
    pub operator: String,
    /// Public route number shared by every operator serving the corridor.
    pub base_route: String,
    #[serde(default)]
    pub name: String,
    pub stops: Vec<StopId>,
    #[serde(default)]
    pub geometry: Vec<Point>,
    #[serde(default)]
    pub variations: Vec<RouteVariation>,
    #[serde(default)]
    pub fare: Option<FareBand>,
}

impl Route {
    /// Construct a route and check its invariants.
    pub fn new(
        id: RouteId,
        operator: impl Into<String>,
        base_route: impl Into<String>,
        stops: Vec<StopId>,
        geometry: Vec<Point>,
    ) -> Result<Self, DomainError> {
        let route = Route {
            id,
            operator: operator.into(),
            base_route: base_route.into(),
            name: String::new(),
            stops,
            geometry,
            variations: Vec::new(),
            fare: None,
        };
        route.validate()?;
        Ok(route)
    }

    /// Attach a fare band.
    pub fn with_fare(mut self, fare: FareBand) -> Self {
        self.fare = Some(fare);
        self
    }

    /// Attach an alternate alignment, checking it is contiguous.
    pub fn with_variation(mut self, variation: RouteVariation) -> Result<Self, DomainError> {
        self.variations.push(variation);
        self.validate()?;
        Ok(self)
    }

    /// Check the route invariants. Used after deserializing snapshot data.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_id(&self.operator).map_err(|_: InvalidId| {
            DomainError::InvalidRoute(self.id.clone(), "operator must not be blank")
        })?;
        if self.stops.len() < 2 {
            return Err(DomainError::InvalidRoute(
                self.id.clone(),
                "route needs at least two stops",
            ));
        }
        if self.geometry.iter().any(|p| !p.is_valid()) {
            return Err(DomainError::InvalidRoute(
                self.id.clone(),
                "geometry has an invalid coordinate",
            ));
        }
        for variation in &self.variations {
            let n = variation.stops.len();
            if n < 2 || !self.stops.windows(n).any(|w| w == variation.stops.as_slice()) {
                return Err(DomainError::InvalidRoute(
                    self.id.clone(),
                    "variation must cover a contiguous stop subsequence",
                ));
            }
            if variation.geometry.iter().any(|p| !p.is_valid()) {
                return Err(DomainError::InvalidRoute(
                    self.id.clone(),
                    "variation geometry has an invalid coordinate",
                ));
            }
        }
        Ok(())
    }

    /// Number of stops.
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Always false: a valid route has at least two stops.
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Indices at which `stop` occurs on this route.
    pub fn positions_of<'a>(&'a self, stop: &'a StopId) -> impl Iterator<Item = usize> + 'a {
        self.stops
            .iter()
            .enumerate()
            .filter(move |(_, s)| *s == stop)
            .map(|(i, _)| i)
    }

    /// First index of `stop` at or after `from`.
    pub fn index_of(&self, stop: &StopId, from: usize) -> Option<usize> {
        self.stops
            .iter()
            .skip(from)
            .position(|s| s == stop)
            .map(|i| i + from)
    }

    /// The variation that contains `board` before `alight`, if any.
    pub fn variation_for(&self, board: &StopId, alight: &StopId) -> Option<&RouteVariation> {
        self.variations
            .iter()
            .find(|v| v.geometry.len() >= 2 && v.span(board, alight).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn rid(s: &str) -> RouteId {
        RouteId::parse(s).unwrap()
    }

    fn stops(ids: &[&str]) -> Vec<StopId> {
        ids.iter().map(|s| sid(s)).collect()
    }

    #[test]
    fn route_construction_valid() {
        let route = Route::new(rid("R1"), "Super Metro", "105", stops(&["A", "B", "C"]), vec![])
            .unwrap();
        assert_eq!(route.len(), 3);
        assert_eq!(route.index_of(&sid("B"), 0), Some(1));
        assert_eq!(route.index_of(&sid("A"), 1), None);
    }

    #[test]
    fn rejects_single_stop() {
        let result = Route::new(rid("R1"), "Op", "1", stops(&["A"]), vec![]);
        assert!(matches!(result, Err(DomainError::InvalidRoute(_, _))));
    }

    #[test]
    fn rejects_blank_operator() {
        let result = Route::new(rid("R1"), " ", "1", stops(&["A", "B"]), vec![]);
        assert!(matches!(result, Err(DomainError::InvalidRoute(_, _))));
    }

    #[test]
    fn variation_must_be_contiguous() {
        let route = Route::new(rid("R1"), "Op", "1", stops(&["A", "B", "C", "D"]), vec![])
            .unwrap();

        let contiguous = RouteVariation {
            stops: stops(&["B", "C"]),
            geometry: vec![],
        };
        assert!(route.clone().with_variation(contiguous).is_ok());

        let gap = RouteVariation {
            stops: stops(&["A", "C"]),
            geometry: vec![],
        };
        assert!(route.with_variation(gap).is_err());
    }

    #[test]
    fn loop_route_positions() {
        let route = Route::new(rid("R1"), "Op", "1", stops(&["A", "B", "A"]), vec![]).unwrap();
        let positions: Vec<_> = route.positions_of(&sid("A")).collect();
        assert_eq!(positions, vec![0, 2]);
    }

    #[test]
    fn variation_span_requires_order() {
        let v = RouteVariation {
            stops: stops(&["B", "C", "D"]),
            geometry: vec![],
        };
        assert_eq!(v.span(&sid("B"), &sid("D")), Some((0, 2)));
        assert_eq!(v.span(&sid("D"), &sid("B")), None);
        assert_eq!(v.span(&sid("A"), &sid("B")), None);
    }
}
