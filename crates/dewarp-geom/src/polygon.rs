//! Polygon utilities
//!
//! Polygons are plain `&[Point]` vertex lists; the closing edge from the
//! last vertex back to the first is implied.
//!
//! # See also
//!
//! ScanTailor: `math/LineBoundedByPolygon.h`

use crate::{Line, LineProjector, Point};

/// Signed area of a polygon (shoelace formula).
///
/// Positive for counter-clockwise winding in a y-up coordinate system.
/// Returns 0 for fewer than 3 vertices.
pub fn signed_area(poly: &[Point]) -> f64 {
    if poly.len() < 3 {
        return 0.0;
    }

    let mut sum = 0.0;
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    0.5 * sum
}

/// Clip an *infinite* line to a polygon.
///
/// If the line through `line.p1` and `line.p2` intersects the polygon
/// boundary, returns the segment between the two most distant intersection
/// points, oriented the same way as the input line. Returns `None` if the
/// line misses the polygon entirely or only touches it at a single point.
pub fn line_bounded_by_polygon(line: &Line, poly: &[Point]) -> Option<Line> {
    if poly.len() < 3 {
        return None;
    }

    let delta = line.delta();
    if delta.squared_length() <= f64::EPSILON {
        return None;
    }

    let projector = LineProjector::new(line);
    let mut min_t = f64::INFINITY;
    let mut max_t = f64::NEG_INFINITY;

    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];

        let denom = (a - b).cross(delta);
        if denom.abs() < 1e-12 {
            // Edge parallel to the line. If collinear, its endpoints still
            // register through the adjacent edges.
            continue;
        }

        let u = (a - line.p1).cross(delta) / denom;
        if !(-1e-9..=1.0 + 1e-9).contains(&u) {
            continue;
        }

        let pt = a + (b - a) * u;
        let t = projector.projection_scalar(pt);
        min_t = min_t.min(t);
        max_t = max_t.max(t);
    }

    if max_t - min_t > 1e-12 {
        Some(Line::new(line.point_at(min_t), line.point_at(max_t)))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_signed_area_square() {
        assert!((signed_area(&unit_square()) - 1.0).abs() < 1e-12);
        let mut rev = unit_square();
        rev.reverse();
        assert!((signed_area(&rev) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_signed_area_degenerate() {
        assert_eq!(signed_area(&[]), 0.0);
        assert_eq!(signed_area(&[Point::new(0.0, 0.0), Point::new(1.0, 1.0)]), 0.0);
    }

    #[test]
    fn test_line_crossing_square() {
        let poly = unit_square();
        let line = Line::new(Point::new(0.5, -5.0), Point::new(0.5, 5.0));
        let bounded = line_bounded_by_polygon(&line, &poly).unwrap();
        assert!((bounded.p1.y - 0.0).abs() < 1e-9);
        assert!((bounded.p2.y - 1.0).abs() < 1e-9);
        assert!((bounded.p1.x - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_line_preserves_orientation() {
        let poly = unit_square();
        let line = Line::new(Point::new(0.5, 5.0), Point::new(0.5, -5.0));
        let bounded = line_bounded_by_polygon(&line, &poly).unwrap();
        // Input runs top-down in y, so the bounded segment must as well.
        assert!(bounded.p1.y > bounded.p2.y);
    }

    #[test]
    fn test_line_missing_polygon() {
        let poly = unit_square();
        let line = Line::new(Point::new(5.0, -5.0), Point::new(5.0, 5.0));
        assert!(line_bounded_by_polygon(&line, &poly).is_none());
    }

    #[test]
    fn test_diagonal_line() {
        let poly = unit_square();
        let line = Line::new(Point::new(-1.0, -1.0), Point::new(2.0, 2.0));
        let bounded = line_bounded_by_polygon(&line, &poly).unwrap();
        let len = bounded.length();
        assert!((len - std::f64::consts::SQRT_2).abs() < 1e-9);
    }
}
