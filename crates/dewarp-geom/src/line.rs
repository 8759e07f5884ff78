//! Lines and projection onto lines
//!
//! A [`Line`] is defined by two points and evaluated parametrically:
//! `point_at(0)` is the first point, `point_at(1)` the second, and values
//! outside [0, 1] extend the line beyond its endpoints. Most callers in
//! this workspace treat a `Line` as infinite and work with the parameter.
//!
//! # See also
//!
//! ScanTailor: `ToLineProjector.h`

use crate::Point;

/// A line through two points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Line {
    /// First point (parameter 0)
    pub p1: Point,
    /// Second point (parameter 1)
    pub p2: Point,
}

impl Line {
    /// Create a line through two points.
    #[inline]
    pub fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    /// Direction vector `p2 - p1`.
    #[inline]
    pub fn delta(&self) -> Point {
        self.p2 - self.p1
    }

    /// Length of the segment between the two defining points.
    #[inline]
    pub fn length(&self) -> f64 {
        self.delta().length()
    }

    /// Evaluate the line at parameter `t`.
    #[inline]
    pub fn point_at(&self, t: f64) -> Point {
        self.p1 + self.delta() * t
    }

    /// Intersection of two lines, both treated as infinite.
    ///
    /// Returns `None` for parallel (or degenerate) lines.
    pub fn intersection(&self, other: &Line) -> Option<Point> {
        let d1 = self.delta();
        let d2 = other.delta();
        let denom = d1.cross(d2);
        if denom.abs() < 1e-12 {
            return None;
        }
        let t = (other.p1 - self.p1).cross(d2) / denom;
        Some(self.point_at(t))
    }
}

/// Projects points onto a line, returning the projection parameter.
///
/// The parameter is 0 at the line's first point and 1 at its second, so a
/// projection scalar in [0, 1] means the closest point lies within the
/// segment. Construction is O(1) and queries are a dot product, which
/// matters because generatrix mapping projects three to five points onto
/// the same line.
#[derive(Debug, Clone, Copy)]
pub struct LineProjector {
    origin: Point,
    vec: Point,
    mult: f64,
}

impl LineProjector {
    /// Create a projector for the given line.
    ///
    /// A degenerate (zero-length) line projects every point to 0.
    pub fn new(line: &Line) -> Self {
        let vec = line.delta();
        let sqlen = vec.squared_length();
        let mult = if sqlen > f64::EPSILON { 1.0 / sqlen } else { 0.0 };
        Self {
            origin: line.p1,
            vec,
            mult,
        }
    }

    /// The projection parameter of `pt` along the line.
    #[inline]
    pub fn projection_scalar(&self, pt: Point) -> f64 {
        (pt - self.origin).dot(self.vec) * self.mult
    }

    /// The point on the line closest to `pt`.
    pub fn projection_point(&self, pt: Point) -> Point {
        self.origin + self.vec * self.projection_scalar(pt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_at() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert_eq!(line.point_at(0.0), Point::new(0.0, 0.0));
        assert_eq!(line.point_at(1.0), Point::new(10.0, 0.0));
        assert_eq!(line.point_at(0.5), Point::new(5.0, 0.0));
        assert_eq!(line.point_at(-1.0), Point::new(-10.0, 0.0));
    }

    #[test]
    fn test_intersection() {
        let a = Line::new(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        let b = Line::new(Point::new(5.0, -1.0), Point::new(5.0, 1.0));
        let p = a.intersection(&b).unwrap();
        assert!((p.x - 5.0).abs() < 1e-12);
        assert!((p.y - 0.0).abs() < 1e-12);

        // Parallel lines have no intersection.
        let c = Line::new(Point::new(0.0, 1.0), Point::new(1.0, 1.0));
        assert!(a.intersection(&c).is_none());
    }

    #[test]
    fn test_projection_scalar() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let proj = LineProjector::new(&line);
        assert!((proj.projection_scalar(Point::new(5.0, 3.0)) - 0.5).abs() < 1e-12);
        assert!((proj.projection_scalar(Point::new(-10.0, 1.0)) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_projection_point() {
        let line = Line::new(Point::new(0.0, 0.0), Point::new(0.0, 4.0));
        let proj = LineProjector::new(&line);
        let p = proj.projection_point(Point::new(7.0, 1.0));
        assert!((p.x - 0.0).abs() < 1e-12);
        assert!((p.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_line_projects_to_zero() {
        let line = Line::new(Point::new(2.0, 2.0), Point::new(2.0, 2.0));
        let proj = LineProjector::new(&line);
        assert_eq!(proj.projection_scalar(Point::new(100.0, 100.0)), 0.0);
    }
}
