//! Directrix profile construction
//!
//! To parameterize the page by arc length, the dewarper needs a profile of
//! one boundary curve: how far each of its points departs from flat, as a
//! function of horizontal position. The profile is measured by placing a
//! viewing plane through the curve's endpoints plus two synthetic anchor
//! points elevated above the page, and projecting every curve point into
//! that plane's unit-square coordinates.
//!
//! A placement is only usable if its anchor segments have a meaningful
//! component perpendicular to the curve's chord; the quality score
//! measures exactly that. Near-degenerate placements get a rotated plane
//! instead, with the anchors swung out to a floor perpendicular offset, so
//! the projection stays numerically stable.
//!
//! # See also
//!
//! ScanTailor: `Directrix.h`, `Directrix.cpp`

use dewarp_geom::{Point, four_point_homography};

use crate::perspective::PerspectiveTransform;
use crate::{ModelError, ModelResult};

/// A boundary curve projected into viewing-plane coordinates.
///
/// The curve's endpoints map to (0, 0) and (1, 0); the y coordinate of
/// each projected point measures elevation toward the anchor points.
#[derive(Debug, Clone)]
pub struct Plane {
    points: Vec<Point>,
}

impl Plane {
    fn new(
        img_pt_00: Point,
        img_pt_01: Point,
        img_pt_10: Point,
        img_pt_11: Point,
        img_directrix: &[Point],
    ) -> ModelResult<Self> {
        let img2pln = four_point_homography(&[
            (img_pt_00, Point::new(0.0, 0.0)),
            (img_pt_10, Point::new(1.0, 0.0)),
            (img_pt_01, Point::new(0.0, 1.0)),
            (img_pt_11, Point::new(1.0, 1.0)),
        ])?;

        Ok(Self {
            points: img_directrix.iter().map(|&pt| img2pln.apply(pt)).collect(),
        })
    }

    /// The projected curve points.
    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

/// A candidate placement of the viewing plane on one boundary curve.
#[derive(Debug, Clone)]
pub struct Place<'a> {
    img_directrix: &'a [Point],
    img_pt_01: Point,
    img_pt_11: Point,
    quality: f64,
}

impl<'a> Place<'a> {
    /// Anchor the plane on `img_directrix` at model height `mdl_y`, with
    /// anchor points elevated by `height` above the page surface.
    ///
    /// The curve must have at least 2 points.
    pub fn new(
        mdl2img: &PerspectiveTransform,
        img_directrix: &'a [Point],
        mdl_y: f64,
        height: f64,
    ) -> Self {
        let img_pt_01 = mdl2img.apply(0.0, mdl_y, height);
        let img_pt_11 = mdl2img.apply(1.0, mdl_y, height);

        let front = img_directrix[0];
        let back = img_directrix[img_directrix.len() - 1];
        let quality = Self::calc_quality(front, img_pt_01, back, img_pt_11);

        Self {
            img_directrix,
            img_pt_01,
            img_pt_11,
            quality,
        }
    }

    /// How perpendicular the anchor segments are to the curve's chord.
    ///
    /// Zero means at least one anchor is collapsed onto the chord and
    /// projections through this placement are unusable.
    pub fn quality(&self) -> f64 {
        self.quality
    }

    fn calc_quality(img_pt_00: Point, img_pt_01: Point, img_pt_10: Point, img_pt_11: Point) -> f64 {
        let chord = img_pt_10 - img_pt_00;
        let chord_len = chord.length();
        if chord_len < f64::EPSILON {
            return 0.0;
        }
        let normal = Point::new(chord.y, -chord.x) * (1.0 / chord_len);

        let projection1 = (img_pt_01 - img_pt_00).dot(normal);
        let projection2 = (img_pt_11 - img_pt_10).dot(normal);

        (projection1.min(projection2) / chord_len).abs()
    }

    /// Project the curve through this placement.
    pub fn create_plane(&self) -> ModelResult<Plane> {
        let front = self.img_directrix[0];
        let back = self.img_directrix[self.img_directrix.len() - 1];
        Plane::new(front, self.img_pt_01, back, self.img_pt_11, self.img_directrix)
    }

    /// Project through a stabilized placement whose anchors are swung out
    /// to a perpendicular offset of at least `min_quality` times the chord
    /// length.
    ///
    /// Used when [`quality`](Self::quality) falls below the caller's
    /// threshold. Anchor lengths are preserved where possible; an anchor
    /// shorter than the required offset is extended to it.
    pub fn create_rotated_plane(&self, min_quality: f64) -> ModelResult<Plane> {
        let front = self.img_directrix[0];
        let back = self.img_directrix[self.img_directrix.len() - 1];

        let chord = back - front;
        let chord_len = chord.length();
        if chord_len < f64::EPSILON {
            return Err(ModelError::InvalidDistortionModel(
                "boundary curve collapses to a point",
            ));
        }

        let t_hat = chord * (1.0 / chord_len);
        let n_hat = Point::new(t_hat.y, -t_hat.x);
        let target = min_quality * chord_len;

        let v1 = self.img_pt_01 - front;
        let v2 = self.img_pt_11 - back;
        // Keep both anchors on the side they already lean toward.
        let side = if v1.dot(n_hat) + v2.dot(n_hat) < 0.0 {
            -1.0
        } else {
            1.0
        };

        let rotate = |base: Point, v: Point| {
            let perp = side * target;
            let tang_len = (v.squared_length() - perp * perp).max(0.0).sqrt();
            let tang = if v.dot(t_hat) < 0.0 { -tang_len } else { tang_len };
            base + t_hat * tang + n_hat * perp
        };

        Plane::new(
            front,
            rotate(front, v1),
            back,
            rotate(back, v2),
            self.img_directrix,
        )
    }
}

/// The 1D elevation profile extracted from a projected plane.
#[derive(Debug, Clone)]
pub struct Profile {
    points: Vec<Point>,
}

impl Profile {
    /// Extract the profile from a projected plane.
    pub fn new(plane: &Plane) -> Self {
        Self {
            points: plane.points().to_vec(),
        }
    }

    /// Profile points: x is horizontal position, y is elevation.
    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{FovParams, FrameParams};
    use crate::perspective::build_mdl_to_img;
    use dewarp_geom::four_point_homography as solve2d;

    fn flat_mdl2img() -> PerspectiveTransform {
        let pln2img = solve2d(&[
            (Point::new(0.0, 0.0), Point::new(0.0, 0.0)),
            (Point::new(1.0, 0.0), Point::new(100.0, 0.0)),
            (Point::new(0.0, 1.0), Point::new(0.0, 50.0)),
            (Point::new(1.0, 1.0), Point::new(100.0, 50.0)),
        ])
        .unwrap();
        build_mdl_to_img(&pln2img, &FovParams::default(), &FrameParams::default()).transform
    }

    #[test]
    fn test_straight_curve_projects_flat() {
        let mdl2img = flat_mdl2img();
        let curve: Vec<Point> = (0..=10)
            .map(|i| Point::new(i as f64 * 10.0, 0.0))
            .collect();

        let place = Place::new(&mdl2img, &curve, 0.0, 0.1);
        let plane = place.create_plane().unwrap();

        // The anchor points of a flat camera sit very close to the chord,
        // so the quad is thin; positions stay near-linear and elevations
        // near zero, but only to a loose tolerance.
        for (i, pt) in plane.points().iter().enumerate() {
            assert!((pt.x - i as f64 * 0.1).abs() < 0.01, "{pt:?}");
            assert!(pt.y.abs() < 1e-6, "{pt:?}");
        }
    }

    #[test]
    fn test_bowed_curve_has_nonzero_profile() {
        let mdl2img = flat_mdl2img();
        let curve: Vec<Point> = (0..=10)
            .map(|i| {
                let x = i as f64 * 10.0;
                Point::new(x, 5.0 * (std::f64::consts::PI * x / 100.0).sin())
            })
            .collect();

        let place = Place::new(&mdl2img, &curve, 0.0, 0.1);
        let plane = place.create_plane().unwrap();
        let peak = plane
            .points()
            .iter()
            .map(|pt| pt.y.abs())
            .fold(0.0, f64::max);
        assert!(peak > 1e-3);
        // Endpoints are pinned to the chord.
        assert!(plane.points()[0].y.abs() < 1e-9);
        assert!(plane.points()[10].y.abs() < 1e-9);
    }

    #[test]
    fn test_rotated_plane_meets_quality_floor() {
        let mdl2img = flat_mdl2img();
        let curve: Vec<Point> = (0..=10)
            .map(|i| Point::new(i as f64 * 10.0, 0.0))
            .collect();

        let place = Place::new(&mdl2img, &curve, 0.0, 0.1);
        let plane = place.create_rotated_plane(1e-3);
        assert!(plane.is_ok());
    }
}
