//! Geographic coordinate type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a coordinate is outside the valid WGS84 range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid coordinate ({lat}, {lng}): {reason}")]
pub struct InvalidPoint {
    lat: f64,
    lng: f64,
    reason: &'static str,
}

/// A WGS84 coordinate with named axes.
///
/// Field names are explicit so latitude and longitude can never be swapped
/// by position. The only place the crate reads `[lng, lat]` pairs is the
/// GeoJSON returned by the pedestrian router, which converts through
/// [`Point::from_lng_lat`].
///
/// # Examples
///
/// ```
/// use matatu_planner::domain::Point;
///
/// let kencom = Point::new(-1.2864, 36.8250).unwrap();
/// assert_eq!(kencom.lat, -1.2864);
///
/// assert!(Point::new(91.0, 36.8).is_err());
/// assert!(Point::new(-1.28, f64::NAN).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude in degrees, -90..=90.
    pub lat: f64,
    /// Longitude in degrees, -180..=180.
    pub lng: f64,
}

impl Point {
    /// Create a point, validating the coordinate range.
    pub fn new(lat: f64, lng: f64) -> Result<Self, InvalidPoint> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(InvalidPoint {
                lat,
                lng,
                reason: "must be finite",
            });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(InvalidPoint {
                lat,
                lng,
                reason: "latitude must be within -90..=90",
            });
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(InvalidPoint {
                lat,
                lng,
                reason: "longitude must be within -180..=180",
            });
        }
        Ok(Self { lat, lng })
    }

    /// Create a point from a GeoJSON-ordered `[lng, lat]` pair.
    pub fn from_lng_lat(pair: [f64; 2]) -> Result<Self, InvalidPoint> {
        Self::new(pair[1], pair[0])
    }

    /// Returns true if the coordinate is within the valid range.
    pub fn is_valid(&self) -> bool {
        Self::new(self.lat, self.lng).is_ok()
    }

    /// Converts to a `geo` point (x = longitude, y = latitude).
    pub fn to_geo(self) -> geo::Point<f64> {
        geo::Point::new(self.lng, self.lat)
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({:.6}, {:.6})", self.lat, self.lng)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_points() {
        assert!(Point::new(0.0, 0.0).is_ok());
        assert!(Point::new(-90.0, 180.0).is_ok());
        assert!(Point::new(90.0, -180.0).is_ok());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Point::new(90.5, 0.0).is_err());
        assert!(Point::new(0.0, 180.5).is_err());
        assert!(Point::new(f64::INFINITY, 0.0).is_err());
    }

    #[test]
    fn lng_lat_pair_is_swapped_explicitly() {
        let p = Point::from_lng_lat([36.8219, -1.2921]).unwrap();
        assert_eq!(p.lat, -1.2921);
        assert_eq!(p.lng, 36.8219);
    }

    #[test]
    fn geo_conversion_uses_x_for_longitude() {
        let p = Point::new(-1.2921, 36.8219).unwrap().to_geo();
        assert_eq!(p.x(), 36.8219);
        assert_eq!(p.y(), -1.2921);
    }

    #[test]
    fn display() {
        let p = Point::new(-1.5, 36.25).unwrap();
        assert_eq!(p.to_string(), "-1.500000,36.250000");
    }
}
