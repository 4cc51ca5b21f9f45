//! Named regions and hub stops.
//!
//! A region is either a polygon or a set of geospatial cells. Hubs are
//! high-connectivity stops flagged within a region; the CBD is a region too.

use std::collections::HashSet;

use h3o::CellIndex;
use serde::Deserialize;

use super::{DomainError, Point, StopId};
use crate::geometry::{cell_at, point_in_polygon};

/// Shape of a region as stored in the snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RegionShapeRecord {
    Polygon { ring: Vec<Point> },
    Cells { cells: Vec<u64> },
}

#[derive(Debug, Clone, Deserialize)]
struct RegionRecord {
    name: String,
    #[serde(flatten)]
    shape: RegionShapeRecord,
}

/// Parsed region shape.
#[derive(Debug, Clone)]
pub enum RegionShape {
    Polygon(Vec<Point>),
    Cells(HashSet<CellIndex>),
}

/// A named geographic region.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RegionRecord")]
pub struct Region {
    pub name: String,
    pub shape: RegionShape,
}

impl Region {
    /// A polygon region. The ring needs at least three valid vertices.
    pub fn polygon(name: impl Into<String>, ring: Vec<Point>) -> Result<Self, DomainError> {
        let name = name.into();
        if ring.len() < 3 || ring.iter().any(|p| !p.is_valid()) {
            return Err(DomainError::InvalidRegion(name));
        }
        Ok(Self {
            name,
            shape: RegionShape::Polygon(ring),
        })
    }

    /// A region made of geospatial cells, possibly mixing resolutions.
    pub fn cells(name: impl Into<String>, cells: HashSet<CellIndex>) -> Result<Self, DomainError> {
        let name = name.into();
        if cells.is_empty() {
            return Err(DomainError::InvalidRegion(name));
        }
        Ok(Self {
            name,
            shape: RegionShape::Cells(cells),
        })
    }

    /// Returns true if `point` lies inside the region.
    pub fn contains(&self, point: Point) -> bool {
        match &self.shape {
            RegionShape::Polygon(ring) => point_in_polygon(point, ring),
            RegionShape::Cells(cells) => {
                // A set rarely mixes more than a couple of resolutions.
                let mut seen = Vec::new();
                cells.iter().any(|cell| {
                    let res = cell.resolution();
                    if seen.contains(&res) {
                        return false;
                    }
                    seen.push(res);
                    cell_at(point, res).is_some_and(|c| cells.contains(&c))
                })
            }
        }
    }
}

impl TryFrom<RegionRecord> for Region {
    type Error = DomainError;

    fn try_from(record: RegionRecord) -> Result<Self, Self::Error> {
        match record.shape {
            RegionShapeRecord::Polygon { ring } => Region::polygon(record.name, ring),
            RegionShapeRecord::Cells { cells } => {
                let parsed = cells
                    .into_iter()
                    .map(CellIndex::try_from)
                    .collect::<Result<HashSet<_>, _>>()
                    .map_err(|_| DomainError::InvalidRegion(record.name.clone()))?;
                Region::cells(record.name, parsed)
            }
        }
    }
}

/// A stop flagged as high-connectivity within a named region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Hub {
    pub stop_id: StopId,
    pub region: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::resolution;

    fn pt(lat: f64, lng: f64) -> Point {
        Point::new(lat, lng).unwrap()
    }

    fn cbd() -> Region {
        Region::polygon(
            "CBD",
            vec![
                pt(-1.2920, 36.8150),
                pt(-1.2920, 36.8300),
                pt(-1.2800, 36.8300),
                pt(-1.2800, 36.8150),
            ],
        )
        .unwrap()
    }

    #[test]
    fn polygon_region_contains() {
        let region = cbd();
        assert!(region.contains(pt(-1.2864, 36.8250)));
        assert!(!region.contains(pt(-1.3000, 36.8250)));
    }

    #[test]
    fn polygon_needs_three_vertices() {
        let result = Region::polygon("bad", vec![pt(0.0, 0.0), pt(0.0, 1.0)]);
        assert!(matches!(result, Err(DomainError::InvalidRegion(_))));
    }

    #[test]
    fn cell_region_contains() {
        let inside = pt(-1.2864, 36.8250);
        let cell = cell_at(inside, resolution(7)).unwrap();
        let region = Region::cells("Westlands", HashSet::from([cell])).unwrap();
        assert!(region.contains(inside));
        assert!(!region.contains(pt(-1.10, 37.00)));
    }

    #[test]
    fn deserialize_polygon_region() {
        let json = r#"{
            "name": "CBD",
            "kind": "polygon",
            "ring": [
                {"lat": -1.292, "lng": 36.815},
                {"lat": -1.292, "lng": 36.830},
                {"lat": -1.280, "lng": 36.830}
            ]
        }"#;
        let region: Region = serde_json::from_str(json).unwrap();
        assert_eq!(region.name, "CBD");
        assert!(matches!(region.shape, RegionShape::Polygon(_)));
    }

    #[test]
    fn deserialize_rejects_bad_cells() {
        let json = r#"{"name": "X", "kind": "cells", "cells": [0]}"#;
        assert!(serde_json::from_str::<Region>(json).is_err());
    }
}
