//! Locating where a line crosses a polyline
//!
//! A boundary curve traced across a page crosses any given generatrix line
//! at most once, so the crossing can be located by bisecting on which side
//! of the line each vertex falls. When the line misses the polyline
//! entirely, the nearer end segment is extended and intersected instead, so
//! queries slightly beyond the traced curve still produce a usable point.
//!
//! As with the arc-length mapper, a [`Hint`] threaded through a run of
//! nearby queries replaces the bisection with a neighbor check.
//!
//! # See also
//!
//! ScanTailor: `PolylineIntersector.h`, `PolylineIntersector.cpp`

use crate::{Line, Point};

/// Cursor caching the segment the previous query resolved to.
///
/// A performance cache only; a fresh `Hint::default()` gives identical
/// results.
#[derive(Debug, Clone, Copy)]
pub struct Hint {
    last_segment: usize,
    direction: isize,
}

impl Default for Hint {
    fn default() -> Self {
        Self {
            last_segment: 0,
            direction: 1,
        }
    }
}

impl Hint {
    fn update(&mut self, new_segment: usize) {
        self.direction = if new_segment < self.last_segment { -1 } else { 1 };
        self.last_segment = new_segment;
    }

    fn probe(&self, offset: isize, num_segments: usize) -> Option<usize> {
        let idx = self.last_segment.checked_add_signed(offset * self.direction)?;
        (idx < num_segments).then_some(idx)
    }
}

/// Intersects lines with a fixed polyline.
#[derive(Debug, Clone)]
pub struct PolylineIntersector {
    polyline: Vec<Point>,
}

impl PolylineIntersector {
    /// Wrap a polyline of at least 2 vertices.
    ///
    /// Returns `None` for shorter polylines, which cannot be intersected.
    pub fn new(polyline: &[Point]) -> Option<Self> {
        (polyline.len() >= 2).then(|| Self {
            polyline: polyline.to_vec(),
        })
    }

    fn num_segments(&self) -> usize {
        self.polyline.len() - 1
    }

    /// Signed distance factor of a vertex from the line (sign only is used).
    fn side(&self, line: &Line, idx: usize) -> f64 {
        line.delta().cross(self.polyline[idx] - line.p1)
    }

    fn segment_straddles(&self, line: &Line, segment: usize) -> bool {
        if segment >= self.num_segments() {
            return false;
        }
        self.side(line, segment) * self.side(line, segment + 1) <= 0.0
    }

    fn intersect_with_segment(&self, line: &Line, segment: usize) -> Option<Point> {
        let span = Line::new(self.polyline[segment], self.polyline[segment + 1]);
        line.intersection(&span)
    }

    /// The point where `line` crosses the polyline.
    ///
    /// If the line misses the polyline, the end segment nearer to the line
    /// is extended to infinity and intersected. Returns `None` only when
    /// the relevant segment is parallel to the line.
    pub fn intersect(&self, line: &Line, hint: &mut Hint) -> Option<Point> {
        if self.segment_straddles(line, hint.last_segment) {
            return self.intersect_with_segment(line, hint.last_segment);
        }
        for offset in [1, -1] {
            if let Some(segment) = hint.probe(offset, self.num_segments()) {
                if self.segment_straddles(line, segment) {
                    hint.update(segment);
                    return self.intersect_with_segment(line, segment);
                }
            }
        }

        if let Some(pt) = self.intersect_outside_polyline(line, hint) {
            return Some(pt);
        }

        // The polyline crosses the line somewhere between its ends; bisect
        // on side signs.
        let mut left_idx = 0;
        let mut left_side = self.side(line, 0);
        let mut right_idx = self.polyline.len() - 1;
        while left_idx + 1 < right_idx {
            let mid_idx = (left_idx + right_idx) >> 1;
            let side = self.side(line, mid_idx);
            if (side > 0.0) == (left_side > 0.0) {
                left_idx = mid_idx;
                left_side = side;
            } else {
                right_idx = mid_idx;
            }
        }
        hint.update(left_idx);
        self.intersect_with_segment(line, left_idx)
    }

    /// Handle a line passing entirely beyond one end of the polyline.
    ///
    /// Applies only when both polyline ends lie on the same side of the
    /// line; the nearer end segment is then extended and intersected.
    fn intersect_outside_polyline(&self, line: &Line, hint: &mut Hint) -> Option<Point> {
        let front_side = self.side(line, 0);
        let back_side = self.side(line, self.polyline.len() - 1);
        if (front_side > 0.0) != (back_side > 0.0) {
            return None;
        }

        let num_segments = self.num_segments();
        if front_side.abs() < back_side.abs() {
            hint.update(0);
            self.intersect_with_segment(line, 0)
        } else {
            hint.update(num_segments - 1);
            self.intersect_with_segment(line, num_segments - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wavy_polyline() -> Vec<Point> {
        (0..=20)
            .map(|i| {
                let x = i as f64 * 10.0;
                Point::new(x, 5.0 * (x * 0.1).sin())
            })
            .collect()
    }

    fn vertical_line(x: f64) -> Line {
        Line::new(Point::new(x, -100.0), Point::new(x, 100.0))
    }

    #[test]
    fn test_crossing_found() {
        let intersector = PolylineIntersector::new(&wavy_polyline()).unwrap();
        let mut hint = Hint::default();
        let pt = intersector.intersect(&vertical_line(42.0), &mut hint).unwrap();
        assert!((pt.x - 42.0).abs() < 1e-9);
        assert!((pt.y - 5.0 * (4.2f64).sin()).abs() < 0.5);
    }

    #[test]
    fn test_hint_agrees_with_fresh_search() {
        let intersector = PolylineIntersector::new(&wavy_polyline()).unwrap();
        let mut running = Hint::default();
        for i in (0..=100).chain((0..=100).rev()) {
            let line = vertical_line(i as f64 * 2.0);
            let with_hint = intersector.intersect(&line, &mut running).unwrap();
            let fresh = intersector
                .intersect(&line, &mut Hint::default())
                .unwrap();
            assert!((with_hint.x - fresh.x).abs() < 1e-9);
            assert!((with_hint.y - fresh.y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_extrapolates_beyond_front() {
        let polyline = vec![Point::new(0.0, 0.0), Point::new(100.0, 10.0)];
        let intersector = PolylineIntersector::new(&polyline).unwrap();
        let mut hint = Hint::default();
        let pt = intersector.intersect(&vertical_line(-50.0), &mut hint).unwrap();
        assert!((pt.x + 50.0).abs() < 1e-9);
        assert!((pt.y + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_extrapolates_beyond_back() {
        let polyline: Vec<Point> = (0..=10)
            .map(|i| Point::new(i as f64 * 10.0, 0.0))
            .collect();
        let intersector = PolylineIntersector::new(&polyline).unwrap();
        let mut hint = Hint::default();
        let pt = intersector.intersect(&vertical_line(130.0), &mut hint).unwrap();
        assert!((pt.x - 130.0).abs() < 1e-9);
        assert!((pt.y - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_line_is_none() {
        let polyline = vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)];
        let intersector = PolylineIntersector::new(&polyline).unwrap();
        let line = Line::new(Point::new(0.0, 5.0), Point::new(100.0, 5.0));
        assert!(intersector.intersect(&line, &mut Hint::default()).is_none());
    }

    #[test]
    fn test_too_short_polyline_rejected() {
        assert!(PolylineIntersector::new(&[Point::new(0.0, 0.0)]).is_none());
        assert!(PolylineIntersector::new(&[]).is_none());
    }
}
