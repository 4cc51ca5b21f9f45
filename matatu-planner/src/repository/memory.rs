//! In-memory repository backed by a JSON snapshot.
//!
//! Useful for tests and offline runs without a database.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{Hub, Region, Route, RouteId, Stop, StopId, TransferEdge, Trip};

use super::{RepositoryError, TransferEdgeStore, TransitRepository};

/// On-disk snapshot format. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub stops: Vec<Stop>,
    pub routes: Vec<Route>,
    pub trips: Vec<Trip>,
    pub transfer_edges: Vec<TransferEdge>,
    pub hubs: Vec<Hub>,
    pub regions: Vec<Region>,
    pub cbd: Option<Region>,
}

/// Repository that serves a validated snapshot from memory.
///
/// Walking edges can be upserted while serving; everything else is
/// read-only after construction.
#[derive(Debug)]
pub struct InMemoryRepository {
    stops: Vec<Stop>,
    routes: Vec<Route>,
    trips: HashMap<RouteId, Vec<Trip>>,
    edges: RwLock<HashMap<(StopId, StopId), TransferEdge>>,
    hubs: Vec<Hub>,
    regions: Vec<Region>,
    cbd: Option<Region>,
}

impl InMemoryRepository {
    /// Build a repository from a snapshot.
    ///
    /// Records that break their invariants are skipped with a warning
    /// rather than failing the whole load.
    pub fn new(snapshot: Snapshot) -> Self {
        let stops: Vec<Stop> = snapshot
            .stops
            .into_iter()
            .filter(|stop| {
                let ok = stop.location.is_valid();
                if !ok {
                    warn!(stop = %stop.id, "skipping stop with invalid coordinate");
                }
                ok
            })
            .collect();

        let routes: Vec<Route> = snapshot
            .routes
            .into_iter()
            .filter(|route| match route.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(route = %route.id, error = %e, "skipping invalid route");
                    false
                }
            })
            .collect();

        let mut trips: HashMap<RouteId, Vec<Trip>> = HashMap::new();
        for trip in snapshot.trips {
            trips.entry(trip.route_id.clone()).or_default().push(trip);
        }

        let edges = snapshot
            .transfer_edges
            .into_iter()
            .filter(|edge| match edge.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(from = %edge.from, to = %edge.to, error = %e, "skipping invalid edge");
                    false
                }
            })
            .map(|edge| (edge.key(), edge))
            .collect();

        debug!(
            stops = stops.len(),
            routes = routes.len(),
            "loaded transit snapshot"
        );

        Self {
            stops,
            routes,
            trips,
            edges: RwLock::new(edges),
            hubs: snapshot.hubs,
            regions: snapshot.regions,
            cbd: snapshot.cbd,
        }
    }

    /// Parse a snapshot from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, RepositoryError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Ok(Self::new(snapshot))
    }

    /// Load a snapshot from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| RepositoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Number of walking edges currently stored.
    pub fn edge_count(&self) -> usize {
        self.edges.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Look up one walking edge.
    pub fn edge(&self, from: &StopId, to: &StopId) -> Option<TransferEdge> {
        self.edges
            .read()
            .ok()?
            .get(&(from.clone(), to.clone()))
            .cloned()
    }
}

impl TransitRepository for InMemoryRepository {
    fn stops(&self) -> Result<Vec<Stop>, RepositoryError> {
        Ok(self.stops.clone())
    }

    fn routes(&self) -> Result<Vec<Route>, RepositoryError> {
        Ok(self.routes.clone())
    }

    fn trips(&self, route: &RouteId) -> Result<Vec<Trip>, RepositoryError> {
        Ok(self.trips.get(route).cloned().unwrap_or_default())
    }

    fn transfer_edges(&self) -> Result<Vec<TransferEdge>, RepositoryError> {
        let edges = self
            .edges
            .read()
            .map_err(|_| RepositoryError::Unavailable("edge store lock poisoned".into()))?;
        Ok(edges.values().cloned().collect())
    }

    fn hubs(&self) -> Result<Vec<Hub>, RepositoryError> {
        Ok(self.hubs.clone())
    }

    fn regions(&self) -> Result<Vec<Region>, RepositoryError> {
        Ok(self.regions.clone())
    }

    fn cbd(&self) -> Result<Option<Region>, RepositoryError> {
        Ok(self.cbd.clone())
    }
}

impl TransferEdgeStore for InMemoryRepository {
    fn upsert_transfer_edge(&self, edge: &TransferEdge) -> Result<(), RepositoryError> {
        let mut edges = self
            .edges
            .write()
            .map_err(|_| RepositoryError::Unavailable("edge store lock poisoned".into()))?;
        edges.insert(edge.key(), edge.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SNAPSHOT: &str = r#"{
        "stops": [
            {"id": "A", "name": "Archives", "lat": -1.2840, "lng": 36.8260},
            {"id": "B", "name": "Odeon", "lat": -1.2830, "lng": 36.8240},
            {"id": "BAD", "name": "Nowhere", "lat": 123.0, "lng": 36.0}
        ],
        "routes": [
            {"id": "R1", "operator": "Super Metro", "base_route": "105", "stops": ["A", "B"]},
            {"id": "R2", "operator": "Lonely", "base_route": "9", "stops": ["A"]}
        ],
        "trips": [
            {"id": "T1", "route_id": "R1", "days": ["Mon"], "stop_times": [null, null]}
        ],
        "transfer_edges": [
            {"from": "A", "to": "B", "minutes": 3.0, "distance_m": 240.0},
            {"from": "B", "to": "A", "minutes": -1.0, "distance_m": 240.0}
        ]
    }"#;

    fn sid(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    #[test]
    fn load_skips_invalid_records() {
        let repo = InMemoryRepository::from_json(SNAPSHOT).unwrap();
        assert_eq!(repo.stops().unwrap().len(), 2);
        assert_eq!(repo.routes().unwrap().len(), 1);
        assert_eq!(repo.edge_count(), 1);
        assert_eq!(repo.trips(&RouteId::parse("R1").unwrap()).unwrap().len(), 1);
        assert!(repo.trips(&RouteId::parse("R9").unwrap()).unwrap().is_empty());
        assert!(repo.cbd().unwrap().is_none());
    }

    #[test]
    fn upsert_is_last_writer_wins() {
        let repo = InMemoryRepository::from_json(SNAPSHOT).unwrap();
        let edge = TransferEdge::new(sid("A"), sid("B"), 9.0, 700.0, vec![]).unwrap();
        repo.upsert_transfer_edge(&edge).unwrap();
        repo.upsert_transfer_edge(&edge).unwrap();

        assert_eq!(repo.edge_count(), 1);
        assert_eq!(repo.edge(&sid("A"), &sid("B")).unwrap().minutes, 9.0);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SNAPSHOT.as_bytes()).unwrap();

        let repo = InMemoryRepository::from_path(file.path()).unwrap();
        assert_eq!(repo.routes().unwrap().len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = InMemoryRepository::from_path("/definitely/not/here.json");
        assert!(matches!(result, Err(RepositoryError::Io { .. })));
    }

    #[test]
    fn malformed_json_is_json_error() {
        let result = InMemoryRepository::from_json("{ not json");
        assert!(matches!(result, Err(RepositoryError::Json(_))));
    }
}
