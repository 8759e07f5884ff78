//! Model-space to image-space perspective projection
//!
//! The plane homography fixes where the four corners of the page land in
//! the image, but says nothing about depth. This module lifts it into a
//! 3x4 projective camera able to place points *above* the page plane,
//! which is how the cylindrical bend of the page is expressed: a model
//! point is `(x, y, height)` with `height` the elevation of the page
//! surface over the flat reference plane.
//!
//! Building the camera requires an effective focal length. In manual mode
//! it comes straight from [`FovParams`]; in auto mode it is solved from
//! the homography's perspective coefficients and clamped to the configured
//! range.
//!
//! # See also
//!
//! ScanTailor: `PerspectiveTransform.h`, `PerspectiveTransform.cpp`,
//! `CylindricalSurfaceDewarper::calcMdlToImgTransform`

use nalgebra::{Matrix3, Matrix3x4, Vector3, Vector4};

use dewarp_geom::{Homography2d, Point};

use crate::params::{FovParams, FrameParams, Mode};

/// A 3x4 projective transform from 3D model space to 2D image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveTransform {
    mat: Matrix3x4<f64>,
}

impl PerspectiveTransform {
    /// Assemble from a plane homography matrix and an elevation column.
    ///
    /// The homography's first two columns act on `(x, y)`, `hvec` acts on
    /// the elevation coordinate, and the homography's translation column
    /// becomes the translation of the camera.
    pub fn new(hmat: &Matrix3<f64>, hvec: Vector3<f64>) -> Self {
        let mut mat = Matrix3x4::zeros();
        mat.set_column(0, &hmat.column(0).into_owned());
        mat.set_column(1, &hmat.column(1).into_owned());
        mat.set_column(2, &hvec);
        mat.set_column(3, &hmat.column(2).into_owned());
        Self { mat }
    }

    /// The underlying 3x4 matrix.
    pub fn mat(&self) -> &Matrix3x4<f64> {
        &self.mat
    }

    /// Project a 3D model point to image space.
    pub fn apply(&self, x: f64, y: f64, z: f64) -> Point {
        let v = self.mat * Vector4::new(x, y, z, 1.0);
        let mut w = v[2];
        if w.abs() < 1e-12 {
            w = if w.is_sign_negative() { -1e-12 } else { 1e-12 };
        }
        Point::new(v[0] / w, v[1] / w)
    }

    /// The smallest-magnitude elevation at which the projection becomes
    /// singular over any of the given plane positions.
    ///
    /// For a plane position `(x, y)` the projective denominator vanishes
    /// at `z = -(m20*x + m21*y + m23) / m22`. The returned elevation
    /// bounds how high the model may be lifted before some corner crosses
    /// the camera plane. Returns infinity if the camera has no elevation
    /// perspective at all (`m22 == 0`).
    pub fn z_singular(&self, plane_positions: &[Point]) -> f64 {
        let m22 = self.mat[(2, 2)];
        if m22.abs() < 1e-15 {
            return f64::INFINITY;
        }

        let mut best = f64::INFINITY;
        for pt in plane_positions {
            let z = -(self.mat[(2, 0)] * pt.x + self.mat[(2, 1)] * pt.y + self.mat[(2, 3)]) / m22;
            if z.abs() < best.abs() {
                best = z;
            }
        }
        best
    }
}

/// A model-to-image camera along with the scalars derived while building
/// it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MdlToImg {
    /// The camera itself
    pub transform: PerspectiveTransform,
    /// Effective field of view (auto-solved or taken from the params)
    pub fov: f64,
    /// Horizontal model scale in image pixels per model unit
    pub sx: f64,
    /// Vertical model scale in image pixels per model unit
    pub sy: f64,
}

impl MdlToImg {
    /// Whether the derived scales are usable.
    ///
    /// An extremely skewed `sx`/`sy` ratio means the page quadrilateral is
    /// nearly degenerate and any dewarped output would be meaningless.
    pub fn is_well_conditioned(&self) -> bool {
        const MAX_SKEW: f64 = 1e6;
        self.sx.is_finite()
            && self.sy.is_finite()
            && self.sx > 0.0
            && self.sy > 0.0
            && self.sx < self.sy * MAX_SKEW
            && self.sy < self.sx * MAX_SKEW
    }
}

/// Build the model-to-image camera from the plane homography.
///
/// The homography is first recentered on the optical center from
/// `frame_params`. The inverse-focal-length-squared is either derived from
/// the manual fov, or in auto mode solved from the recentered perspective
/// coefficients and clamped to `[fov_min, fov_max]` (a non-finite solution,
/// arising for distortion-free flat input, degrades to the lower bound).
pub fn build_mdl_to_img(
    pln2img: &Homography2d,
    fov_params: &FovParams,
    frame_params: &FrameParams,
) -> MdlToImg {
    let hmat = pln2img.mat();

    let dx = frame_params.center_x;
    let dy = frame_params.center_y;

    let h00 = hmat[(0, 0)] - hmat[(2, 0)] * dx;
    let h10 = hmat[(1, 0)] - hmat[(2, 0)] * dy;
    let h20 = hmat[(2, 0)];

    let h01 = hmat[(0, 1)] - hmat[(2, 1)] * dx;
    let h11 = hmat[(1, 1)] - hmat[(2, 1)] * dy;
    let h21 = hmat[(2, 1)];

    let frame_size = frame_params.size();

    let (f_inv_square, fov) = match fov_params.mode {
        Mode::Auto => {
            let f_inv_min = fov_params.fov_min / frame_size;
            let f_inv_max = fov_params.fov_max / frame_size;
            let lo = f_inv_min * f_inv_min;
            let hi = f_inv_max * f_inv_max;

            let raw = -(h20 * h21) / (h00 * h01 + h10 * h11);
            let f_inv_square = if raw.is_finite() { raw.clamp(lo, hi) } else { lo };

            (f_inv_square, frame_size * f_inv_square.sqrt())
        }
        Mode::Manual => {
            let f_inv = fov_params.fov / frame_size;
            (f_inv * f_inv, fov_params.fov)
        }
    };

    let sx = (h20 * h20 + (h00 * h00 + h10 * h10) * f_inv_square).sqrt();
    let sy = (h21 * h21 + (h01 * h01 + h11 * h11) * f_inv_square).sqrt();

    let k = 1.0 / sy;
    let h02 = (h11 * h20 - h10 * h21) * k;
    let h12 = (h00 * h21 - h01 * h20) * k;
    let h22 = (h01 * h10 - h00 * h11) * k * f_inv_square;

    let hvec = Vector3::new(h02 + h22 * dx, h12 + h22 * dy, h22);

    MdlToImg {
        transform: PerspectiveTransform::new(hmat, hvec),
        fov,
        sx,
        sy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dewarp_geom::four_point_homography;

    fn flat_pln2img() -> Homography2d {
        // Unit square to a 100x50 axis-aligned rectangle.
        four_point_homography(&[
            (Point::new(0.0, 0.0), Point::new(0.0, 0.0)),
            (Point::new(1.0, 0.0), Point::new(100.0, 0.0)),
            (Point::new(0.0, 1.0), Point::new(0.0, 50.0)),
            (Point::new(1.0, 1.0), Point::new(100.0, 50.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_flat_model_scales() {
        let mdl2img = build_mdl_to_img(
            &flat_pln2img(),
            &FovParams::default(),
            &FrameParams::default(),
        );
        // An affine homography has no vanishing behavior, so auto fov
        // degrades to the lower bound and sx/sy reduce to the plain
        // scale factors.
        assert!((mdl2img.fov - 0.2).abs() < 1e-9);
        assert!((mdl2img.sx / mdl2img.sy - 2.0).abs() < 1e-6);
        assert!(mdl2img.is_well_conditioned());
    }

    #[test]
    fn test_flat_projection_matches_homography() {
        let pln2img = flat_pln2img();
        let mdl2img = build_mdl_to_img(&pln2img, &FovParams::default(), &FrameParams::default());
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (0.5, 0.5), (0.25, 0.75)] {
            let via_camera = mdl2img.transform.apply(x, y, 0.0);
            let via_homography = pln2img.apply(Point::new(x, y));
            assert!((via_camera.x - via_homography.x).abs() < 1e-9);
            assert!((via_camera.y - via_homography.y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_manual_fov_used_directly() {
        let fov_params = FovParams {
            mode: Mode::Manual,
            fov: 1.0,
            ..FovParams::default()
        };
        let mdl2img = build_mdl_to_img(&flat_pln2img(), &fov_params, &FrameParams::default());
        assert_eq!(mdl2img.fov, 1.0);
    }

    #[test]
    fn test_z_singular_flat_camera() {
        let mdl2img = build_mdl_to_img(
            &flat_pln2img(),
            &FovParams::default(),
            &FrameParams::default(),
        );
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
        ];
        let z = mdl2img.transform.z_singular(&corners);
        // A flat affine model keeps the singular elevation far away.
        assert!(z.abs() > 1.0);
    }
}
