//! Geometry utilities.
//!
//! Pure functions over [`Point`]s: great-circle distance, polyline length,
//! point-in-polygon, nearest-vertex lookup, and geospatial cell helpers.
//! Distances are metres, speeds km/h, times minutes.

use geo::line_measures::LengthMeasurable;
use geo::{Contains, Coord, Distance, Haversine, LineString, Polygon};
use h3o::{CellIndex, LatLng, Resolution};

use crate::domain::Point;

/// Great-circle distance between two points, in metres.
pub fn haversine_m(a: Point, b: Point) -> f64 {
    Haversine.distance(a.to_geo(), b.to_geo())
}

/// Length of a polyline as the sum of its great-circle segments, in metres.
pub fn polyline_length_m(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    to_line_string(points).length(&Haversine)
}

/// Returns true if `point` lies strictly inside the polygon ring.
///
/// The ring does not need to be closed; fewer than three vertices is never
/// a polygon.
pub fn point_in_polygon(point: Point, ring: &[Point]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let polygon = Polygon::new(to_line_string(ring), vec![]);
    polygon.contains(&point.to_geo())
}

/// Index of the polyline vertex closest to `target`, searching from `start`.
pub fn nearest_index(points: &[Point], target: Point, start: usize) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .skip(start)
        .map(|(i, p)| (i, haversine_m(*p, target)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Minutes to cover `distance_m` at `speed_kmh`.
pub fn travel_minutes(distance_m: f64, speed_kmh: f64) -> f64 {
    if speed_kmh <= 0.0 {
        return f64::INFINITY;
    }
    distance_m.max(0.0) / 1000.0 / speed_kmh * 60.0
}

/// Parses a cell resolution, clamping out-of-range values to the finest one.
pub fn resolution(level: u8) -> Resolution {
    Resolution::try_from(level).unwrap_or(Resolution::Fifteen)
}

/// Geospatial cell containing `point` at `res`.
pub fn cell_at(point: Point, res: Resolution) -> Option<CellIndex> {
    LatLng::new(point.lat, point.lng)
        .ok()
        .map(|ll| ll.to_cell(res))
}

/// Centre of a cell as a [`Point`].
pub fn cell_center(cell: CellIndex) -> Point {
    let ll = LatLng::from(cell);
    Point {
        lat: ll.lat(),
        lng: ll.lng(),
    }
}

/// Distance from the centre of `cell` to its closest neighbour's centre.
pub fn neighbor_spacing_m(cell: CellIndex) -> f64 {
    let center = cell_center(cell);
    cell.grid_disk::<Vec<_>>(1)
        .into_iter()
        .filter(|c| *c != cell)
        .map(|c| haversine_m(center, cell_center(c)))
        .fold(f64::INFINITY, f64::min)
}

/// Evenly spaced points from `a` to `b` (inclusive), at most `step_m` apart.
pub fn sample_segment(a: Point, b: Point, step_m: f64) -> Vec<Point> {
    let total = haversine_m(a, b);
    let steps = if step_m > 0.0 {
        (total / step_m).ceil().max(1.0) as usize
    } else {
        1
    };
    (0..=steps)
        .map(|i| {
            if i == steps {
                return b;
            }
            let t = i as f64 / steps as f64;
            Point {
                lat: a.lat + (b.lat - a.lat) * t,
                lng: a.lng + (b.lng - a.lng) * t,
            }
        })
        .collect()
}

fn to_line_string(points: &[Point]) -> LineString<f64> {
    points
        .iter()
        .map(|p| Coord { x: p.lng, y: p.lat })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lng: f64) -> Point {
        Point::new(lat, lng).unwrap()
    }

    #[test]
    fn haversine_one_degree_latitude() {
        let d = haversine_m(pt(0.0, 36.0), pt(1.0, 36.0));
        assert!((d - 111_195.0).abs() < 500.0, "got {d}");
    }

    #[test]
    fn haversine_zero() {
        let p = pt(-1.29, 36.82);
        assert_eq!(haversine_m(p, p), 0.0);
    }

    #[test]
    fn polyline_length_sums_segments() {
        let a = pt(-1.30, 36.80);
        let b = pt(-1.29, 36.80);
        let c = pt(-1.28, 36.80);
        let total = polyline_length_m(&[a, b, c]);
        let expected = haversine_m(a, b) + haversine_m(b, c);
        assert!((total - expected).abs() < 1.0);
        assert_eq!(polyline_length_m(&[a]), 0.0);
    }

    #[test]
    fn polygon_containment() {
        let square = [pt(0.0, 0.0), pt(0.0, 1.0), pt(1.0, 1.0), pt(1.0, 0.0)];
        assert!(point_in_polygon(pt(0.5, 0.5), &square));
        assert!(!point_in_polygon(pt(1.5, 0.5), &square));
        assert!(!point_in_polygon(pt(0.5, 0.5), &square[..2]));
    }

    #[test]
    fn nearest_index_respects_start() {
        let line = [pt(0.0, 0.0), pt(0.0, 0.01), pt(0.0, 0.02), pt(0.0, 0.0)];
        assert_eq!(nearest_index(&line, pt(0.0, 0.0), 0), Some(0));
        assert_eq!(nearest_index(&line, pt(0.0, 0.0), 1), Some(3));
        assert_eq!(nearest_index(&line, pt(0.0, 0.0), 4), None);
    }

    #[test]
    fn travel_minutes_at_speed() {
        assert!((travel_minutes(6000.0, 18.0) - 20.0).abs() < 1e-9);
        assert!(travel_minutes(100.0, 0.0).is_infinite());
    }

    #[test]
    fn cells_are_stable_for_nearby_points() {
        let res = resolution(7);
        let a = cell_at(pt(-1.2864, 36.8250), res).unwrap();
        let b = cell_at(pt(-1.2865, 36.8251), res).unwrap();
        assert_eq!(a, b);
        let centre = cell_center(a);
        assert!(haversine_m(centre, pt(-1.2864, 36.8250)) < 3000.0);
    }

    #[test]
    fn neighbor_spacing_matches_resolution() {
        let fine = cell_at(pt(-1.2864, 36.8250), resolution(9)).unwrap();
        let coarse = cell_at(pt(-1.2864, 36.8250), resolution(7)).unwrap();
        let fine_m = neighbor_spacing_m(fine);
        let coarse_m = neighbor_spacing_m(coarse);
        assert!(fine_m > 100.0 && fine_m < 600.0, "got {fine_m}");
        assert!(coarse_m > fine_m * 4.0);
    }

    #[test]
    fn sample_segment_includes_endpoints() {
        let a = pt(-1.30, 36.80);
        let b = pt(-1.20, 36.80);
        let samples = sample_segment(a, b, 1000.0);
        assert_eq!(samples.first(), Some(&a));
        assert_eq!(samples.last(), Some(&b));
        assert!(samples.len() >= 12);
    }
}
