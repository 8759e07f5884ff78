//! Validated pair of boundary curves
//!
//! A distortion model is the raw input to the dewarper: the traced top and
//! bottom text-block boundaries, as polylines in source image coordinates,
//! both running in the same direction (nominally left to right).
//!
//! Validation here is structural only. Curves that pass validation can
//! still turn out to be geometrically unusable (e.g. identical top and
//! bottom curves), which the homography solver reports when the dewarper
//! is constructed.
//!
//! # See also
//!
//! ScanTailor: `DistortionModel.h`, `DistortionModel.cpp`

use dewarp_geom::Point;

use crate::{ModelError, ModelResult};

/// The traced top and bottom boundary curves of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct DistortionModel {
    top_curve: Vec<Point>,
    bottom_curve: Vec<Point>,
}

impl DistortionModel {
    /// Validate a pair of boundary curves.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidDistortionModel`] if either curve has fewer
    /// than 2 points, contains non-finite coordinates, or the two curves
    /// run in opposite directions (their endpoint quadrilateral
    /// self-intersects).
    pub fn new(top_curve: Vec<Point>, bottom_curve: Vec<Point>) -> ModelResult<Self> {
        for curve in [&top_curve, &bottom_curve] {
            if curve.len() < 2 {
                return Err(ModelError::InvalidDistortionModel(
                    "boundary curve has fewer than 2 points",
                ));
            }
            if curve.iter().any(|pt| !pt.is_finite()) {
                return Err(ModelError::InvalidDistortionModel(
                    "boundary curve contains non-finite coordinates",
                ));
            }
        }

        // The endpoint quadrilateral, walked top-left, top-right,
        // bottom-right, bottom-left, must not self-intersect. Turn
        // directions of mixed sign mean the curves run in opposite
        // directions or cross each other.
        let quad = [
            top_curve[0],
            top_curve[top_curve.len() - 1],
            bottom_curve[bottom_curve.len() - 1],
            bottom_curve[0],
        ];
        let mut has_positive = false;
        let mut has_negative = false;
        for i in 0..4 {
            let prev = quad[(i + 3) % 4];
            let cur = quad[i];
            let next = quad[(i + 1) % 4];
            let turn = (cur - prev).cross(next - cur);
            has_positive |= turn > 0.0;
            has_negative |= turn < 0.0;
        }
        if has_positive && has_negative {
            return Err(ModelError::InvalidDistortionModel(
                "boundary curves cross or run in opposite directions",
            ));
        }

        Ok(Self {
            top_curve,
            bottom_curve,
        })
    }

    /// The top boundary curve.
    pub fn top_curve(&self) -> &[Point] {
        &self.top_curve
    }

    /// The bottom boundary curve.
    pub fn bottom_curve(&self) -> &[Point] {
        &self.bottom_curve
    }
}
