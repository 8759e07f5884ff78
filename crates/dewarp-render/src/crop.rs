//! Safe crop-area constraining
//!
//! The dewarping model extrapolates beyond the traced curves, but not
//! indefinitely: far from the page the projected pixel density collapses
//! or explodes and the output would be garbage. This module walks
//! candidate generatrices outward from the page, keeps the portion of each
//! that stays inside the original crop polygon *and* within a pixel
//! density corridor derived from the model's corners, and assembles the
//! survivors into a constrained crop polygon.
//!
//! Pixel density along a generatrix is the derivative of its 1D homography
//! times the generatrix length: image pixels per unit of dewarped y. The
//! corridor is the corner density range widened by 0.6/1.4 to leave slack.
//!
//! # See also
//!
//! ScanTailor: `DewarpingImageTransform.cpp`
//! (`ConstrainedCropAreaBuilder`)

use std::collections::BTreeMap;

use log::debug;

use dewarp_geom::{Line, LineProjector, Point, line_bounded_by_polygon};
use dewarp_model::{CylindricalSurfaceDewarper, Generatrix, State};

/// Total-order wrapper so crv_x can key a BTreeMap.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrdF64(f64);

impl Eq for OrdF64 {}

impl PartialOrd for OrdF64 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdF64 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Collects density-safe vertical segments and builds the constrained
/// crop polygon from them.
pub(crate) struct ConstrainedCropAreaBuilder<'a> {
    orig_crop_area: &'a [Point],
    min_density: f64,
    max_density: f64,
    dewarper: &'a CylindricalSurfaceDewarper,
    state: State,
    /// Segments in original image coordinates corresponding to vertical
    /// lines in dewarped coordinates, keyed and ordered by crv_x. Each
    /// line runs from the dewarped-top end to the dewarped-bottom end.
    vert_segments: BTreeMap<OrdF64, Line>,
}

impl<'a> ConstrainedCropAreaBuilder<'a> {
    pub(crate) fn new(
        orig_crop_area: &'a [Point],
        min_density: f64,
        max_density: f64,
        dewarper: &'a CylindricalSurfaceDewarper,
    ) -> Self {
        Self {
            orig_crop_area,
            min_density,
            max_density,
            dewarper,
            state: State::default(),
            vert_segments: BTreeMap::new(),
        }
    }

    /// Sample crv_x values from `from` toward `to` with a dynamically
    /// adjusted step.
    ///
    /// A rejected generatrix halves the step and backs up one step, so
    /// the walk closes in on the boundary of the feasible region; the
    /// walk stops once the step shrinks below an eighth of its initial
    /// size or `to` is passed. Each kept generatrix contributes two
    /// points to the final crop area.
    pub(crate) fn sample_crv_x_range(&mut self, from: f64, to: f64, forward_direction: f64) {
        let initial_step = 0.1;
        let min_step = initial_step / 8.0;
        let mut step = initial_step;
        let mut direction = forward_direction;

        let mut last_segment: Option<(f64, f64)> = None;

        let mut crv_x = from;
        while (crv_x - to) * (from - to) > -f64::EPSILON && step > min_step - f64::EPSILON {
            match self.process_generatrix(crv_x) {
                None => {
                    step *= 0.5;
                    direction = -forward_direction;
                }
                Some(segment_len) => {
                    if let Some((last_crv_x, last_len)) = last_segment {
                        self.maybe_add_extra_vertical_segments(
                            last_crv_x, last_len, crv_x, segment_len,
                        );
                    }
                    last_segment = Some((crv_x, segment_len));
                    direction = forward_direction;
                }
            }
            crv_x += step * direction;
        }
    }

    /// The constrained crop polygon: kept top points in crv_x order,
    /// then kept bottom points in reverse order.
    pub(crate) fn build(self) -> Vec<Point> {
        let n = self.vert_segments.len();
        let mut crop_area = vec![Point::ZERO; n * 2];

        for (i, line) in self.vert_segments.values().enumerate() {
            crop_area[i] = line.p1;
            crop_area[n * 2 - 1 - i] = line.p2;
        }

        debug!("constrained crop area: {} vertical segments", n);
        crop_area
    }

    /// Bound the generatrix at `crv_x` to the crop polygon and the
    /// density corridor; keep it if anything remains.
    ///
    /// Returns the kept segment's length, or `None` if the generatrix
    /// lies outside the feasible region (including mapping failures on
    /// degenerate extrapolated generatrices).
    fn process_generatrix(&mut self, crv_x: f64) -> Option<f64> {
        let generatrix = self.dewarper.map_generatrix(crv_x, &mut self.state).ok()?;

        let (lower_bound, upper_bound) = self.density_bounds(&generatrix);

        let bounded_line = line_bounded_by_polygon(&generatrix.img_line, self.orig_crop_area)?;

        let projector = LineProjector::new(&generatrix.img_line);
        let mut min_proj = projector.projection_scalar(bounded_line.p1);
        let mut max_proj = projector.projection_scalar(bounded_line.p2);

        if let Some(crv_y) = lower_bound {
            min_proj = min_proj.max(generatrix.pln2img.apply(crv_y));
        }
        if let Some(crv_y) = upper_bound {
            max_proj = max_proj.min(generatrix.pln2img.apply(crv_y));
        }

        if min_proj >= max_proj {
            return None;
        }

        let p1 = generatrix.img_line.point_at(min_proj);
        let p2 = generatrix.img_line.point_at(max_proj);
        let segment = Line::new(p1, p2);
        let len = segment.length();
        self.vert_segments.insert(OrdF64(crv_x), segment);
        Some(len)
    }

    /// Locate the crv_y values where pixel density crosses the corridor
    /// thresholds, classified into a lower and an upper bound.
    ///
    /// A critical point on the mirror side of the homography's pole is
    /// discarded. The second derivative's sign tells which side of the
    /// crossing is in-corridor: density rising through the maximum
    /// threshold caps the range from above, density falling through the
    /// minimum threshold caps it from below.
    fn density_bounds(&self, generatrix: &Generatrix) -> (Option<f64>, Option<f64>) {
        let mut lower_bound = None;
        let mut upper_bound = None;

        let recip_len = 1.0 / generatrix.img_line.length();

        let mut process = |crv_y: f64, upper_threshold: bool| {
            if generatrix.pln2img.mirror_side(crv_y) {
                return;
            }
            let second_deriv = generatrix.pln2img.second_derivative_at(crv_y);
            if second_deriv.is_sign_negative() == upper_threshold {
                lower_bound = Some(crv_y);
            } else {
                upper_bound = Some(crv_y);
            }
        };

        generatrix
            .pln2img
            .solve_for_derivative(self.min_density * recip_len, |crv_y| process(crv_y, false));
        generatrix
            .pln2img
            .solve_for_derivative(self.max_density * recip_len, |crv_y| process(crv_y, true));

        (lower_bound, upper_bound)
    }

    /// Bisect between two kept generatrices whose segment lengths differ
    /// by more than 10%, so sharp transitions of the feasible region are
    /// not stepped over.
    fn maybe_add_extra_vertical_segments(
        &mut self,
        crv_x1: f64,
        len1: f64,
        crv_x2: f64,
        len2: f64,
    ) {
        let lengths_close_enough = (len1.max(len2) - len1.min(len2)) < 0.1 * (len1 + len2);
        if lengths_close_enough {
            return;
        }

        if (crv_x1 - crv_x2).abs() < 1e-8 {
            return;
        }

        let mid_crv_x = 0.5 * (crv_x1 + crv_x2);
        let Some(mid_len) = self.process_generatrix(mid_crv_x) else {
            return;
        };

        self.maybe_add_extra_vertical_segments(crv_x1, len1, mid_crv_x, mid_len);
        self.maybe_add_extra_vertical_segments(mid_crv_x, mid_len, crv_x2, len2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dewarp_model::{BendParams, DistortionModel, FovParams, FrameParams};

    fn flat_dewarper() -> CylindricalSurfaceDewarper {
        let model = DistortionModel::new(
            vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
            vec![Point::new(0.0, 50.0), Point::new(100.0, 50.0)],
        )
        .unwrap();
        CylindricalSurfaceDewarper::new(
            &model,
            &FovParams::default(),
            &FrameParams::default(),
            &BendParams::default(),
        )
        .unwrap()
    }

    fn full_crop() -> Vec<Point> {
        vec![
            Point::new(-100.0, -100.0),
            Point::new(200.0, -100.0),
            Point::new(200.0, 150.0),
            Point::new(-100.0, 150.0),
        ]
    }

    #[test]
    fn test_flat_model_keeps_segments() {
        let dewarper = flat_dewarper();
        let crop = full_crop();
        let mut builder = ConstrainedCropAreaBuilder::new(&crop, 20.0, 80.0, &dewarper);
        builder.sample_crv_x_range(0.3, -0.6, -1.0);
        builder.sample_crv_x_range(0.7, 1.6, 1.0);
        let area = builder.build();

        assert!(area.len() >= 8);
        // Top points come first in crv_x order, bottom points reversed.
        let n = area.len() / 2;
        for i in 1..n {
            assert!(area[i].x > area[i - 1].x);
        }
        for i in n + 1..2 * n {
            assert!(area[i].x < area[i - 1].x);
        }
    }

    #[test]
    fn test_tight_crop_polygon_bounds_segments() {
        let dewarper = flat_dewarper();
        let crop = vec![
            Point::new(10.0, 5.0),
            Point::new(90.0, 5.0),
            Point::new(90.0, 45.0),
            Point::new(10.0, 45.0),
        ];
        let mut builder = ConstrainedCropAreaBuilder::new(&crop, 20.0, 80.0, &dewarper);
        builder.sample_crv_x_range(0.3, -0.6, -1.0);
        builder.sample_crv_x_range(0.7, 1.6, 1.0);
        let area = builder.build();

        assert!(!area.is_empty());
        for pt in &area {
            assert!(pt.x >= 10.0 - 1e-6 && pt.x <= 90.0 + 1e-6, "{pt:?}");
            assert!(pt.y >= 5.0 - 1e-6 && pt.y <= 45.0 + 1e-6, "{pt:?}");
        }
    }

    fn bowed_dewarper() -> CylindricalSurfaceDewarper {
        let top: Vec<Point> = (0..=20)
            .map(|i| {
                let x = i as f64 * 5.0;
                Point::new(x, 10.0 - 8.0 * (std::f64::consts::PI * x / 100.0).sin())
            })
            .collect();
        let bottom: Vec<Point> = (0..=20)
            .map(|i| {
                let x = i as f64 * 5.0;
                Point::new(x, 90.0 - 6.0 * (std::f64::consts::PI * x / 100.0).sin())
            })
            .collect();
        let model = DistortionModel::new(top, bottom).unwrap();
        CylindricalSurfaceDewarper::new(
            &model,
            &FovParams::default(),
            &FrameParams::default(),
            &BendParams::default(),
        )
        .unwrap()
    }

    fn corner_density_corridor(dewarper: &CylindricalSurfaceDewarper) -> (f64, f64) {
        let mut state = State::default();
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for crv_x in [0.0, 1.0] {
            let gtx = dewarper.map_generatrix(crv_x, &mut state).unwrap();
            let len = gtx.img_line.length();
            for crv_y in [0.0, 1.0] {
                let density = gtx.pln2img.derivative_at(crv_y) * len;
                min = min.min(density);
                max = max.max(density);
            }
        }
        (0.6 * min, 1.4 * max)
    }

    #[test]
    fn test_kept_segments_stay_in_density_corridor() {
        let dewarper = bowed_dewarper();
        let (min_density, max_density) = corner_density_corridor(&dewarper);

        let crop = vec![
            Point::new(-100.0, -100.0),
            Point::new(200.0, -100.0),
            Point::new(200.0, 200.0),
            Point::new(-100.0, 200.0),
        ];
        let mut builder =
            ConstrainedCropAreaBuilder::new(&crop, min_density, max_density, &dewarper);
        builder.sample_crv_x_range(0.3, -0.6, -1.0);
        builder.sample_crv_x_range(0.7, 1.6, 1.0);
        assert!(!builder.vert_segments.is_empty());

        // Every endpoint of every kept segment, including the
        // extrapolated ones beyond the page, must project to an
        // in-corridor pixel density.
        let mut state = State::default();
        for (crv_x, segment) in &builder.vert_segments {
            let gtx = dewarper.map_generatrix(crv_x.0, &mut state).unwrap();
            let len = gtx.img_line.length();
            let projector = LineProjector::new(&gtx.img_line);
            let img2crv = gtx.pln2img.invert().unwrap();
            for pt in [segment.p1, segment.p2] {
                let crv_y = img2crv.apply(projector.projection_scalar(pt));
                let density = gtx.pln2img.derivative_at(crv_y) * len;
                assert!(
                    density >= min_density * (1.0 - 1e-6)
                        && density <= max_density * (1.0 + 1e-6),
                    "crv_x={} density={density} corridor=[{min_density}, {max_density}]",
                    crv_x.0
                );
            }
        }
    }

    #[test]
    fn test_disjoint_crop_yields_empty_area() {
        let dewarper = flat_dewarper();
        // Crop polygon entirely to the side of the page.
        let crop = vec![
            Point::new(500.0, 0.0),
            Point::new(600.0, 0.0),
            Point::new(600.0, 50.0),
            Point::new(500.0, 50.0),
        ];
        let mut builder = ConstrainedCropAreaBuilder::new(&crop, 20.0, 80.0, &dewarper);
        builder.sample_crv_x_range(0.3, -0.6, -1.0);
        builder.sample_crv_x_range(0.7, 1.6, 1.0);
        assert!(builder.build().is_empty());
    }
}
