//! Dewarping image transform
//!
//! Ties the cylindrical model to actual images: computes the intrinsic
//! output scale from the recommended image size, constrains the crop area
//! to the density-safe region, and exposes materialization plus point
//! mappers to the surrounding pipeline.
//!
//! # See also
//!
//! ScanTailor: `DewarpingImageTransform.h`, `DewarpingImageTransform.cpp`

use std::sync::atomic::AtomicBool;

use image::{Rgba, RgbaImage};

use dewarp_geom::{Point, signed_area};
use dewarp_model::{
    BendParams, CylindricalSurfaceDewarper, DistortionModel, FovParams, FrameParams, ImageSize,
    ModelResult, SizeParams, State,
};

use crate::crop::ConstrainedCropAreaBuilder;
use crate::raster::{self, ModelDomain};
use crate::{RenderError, RenderResult};

/// An integer pixel rectangle in destination coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Create a rectangle.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the rectangle contains no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A ready-to-use dewarping transform for one page image.
#[derive(Debug, Clone)]
pub struct DewarpingImageTransform {
    orig_size: (u32, u32),
    top_polyline: Vec<Point>,
    bottom_polyline: Vec<Point>,
    size_params: SizeParams,
    dewarper: CylindricalSurfaceDewarper,
    orig_crop_area: Vec<Point>,
    intrinsic_scale_x: f64,
    intrinsic_scale_y: f64,
    user_scale_x: f64,
    user_scale_y: f64,
}

impl DewarpingImageTransform {
    /// Build a transform from the source image size, its crop polygon,
    /// a validated curve pair, and the parameter set.
    ///
    /// The frame parameters are resolved against the image first (auto
    /// mode derives the frame from the image dimensions). The crop
    /// polygon is immediately constrained to the density-safe region.
    ///
    /// # Errors
    ///
    /// Model construction errors propagate;
    /// [`RenderError::UnsafeCropArea`] if constraining rejects every
    /// generatrix.
    pub fn new(
        orig_size: (u32, u32),
        orig_crop_area: &[Point],
        model: &DistortionModel,
        fov_params: &FovParams,
        frame_params: &FrameParams,
        bend_params: &BendParams,
        size_params: &SizeParams,
    ) -> RenderResult<Self> {
        let frame_params =
            frame_params.updated_for_image(orig_size.0 as f64, orig_size.1 as f64);
        let dewarper =
            CylindricalSurfaceDewarper::new(model, fov_params, &frame_params, bend_params)?;

        let mut transform = Self {
            orig_size,
            top_polyline: model.top_curve().to_vec(),
            bottom_polyline: model.bottom_curve().to_vec(),
            size_params: *size_params,
            dewarper,
            orig_crop_area: Vec::new(),
            intrinsic_scale_x: 1.0,
            intrinsic_scale_y: 1.0,
            user_scale_x: 1.0,
            user_scale_y: 1.0,
        };

        transform.orig_crop_area = transform.constrain_crop_area(orig_crop_area)?;
        transform.setup_intrinsic_scale();
        Ok(transform)
    }

    /// Source image dimensions the transform was built for.
    pub fn orig_size(&self) -> (u32, u32) {
        self.orig_size
    }

    /// The constrained crop polygon in source image coordinates.
    pub fn orig_crop_area(&self) -> &[Point] {
        &self.orig_crop_area
    }

    /// Effective field of view of the underlying model.
    pub fn fov(&self) -> f64 {
        self.dewarper.fov()
    }

    /// Measured page bend of the underlying model.
    pub fn bend(&self) -> f64 {
        self.dewarper.bend()
    }

    /// Recommended output dimensions per the stored size parameters.
    pub fn image_size(&self) -> ImageSize {
        self.dewarper
            .image_size(&self.top_polyline, &self.bottom_polyline, &self.size_params)
    }

    /// The constrained crop polygon mapped to output coordinates.
    pub fn transformed_crop_area(&self) -> RenderResult<Vec<Point>> {
        let mut state = State::default();
        let mut poly = Vec::with_capacity(self.orig_crop_area.len());
        for &pt in &self.orig_crop_area {
            let crv = self.dewarper.map_to_dewarped_space(pt, &mut state)?;
            poly.push(self.post_scale(crv));
        }
        Ok(poly)
    }

    /// Compose additional output scaling into the transform.
    ///
    /// Returns the factors applied, for callers maintaining a matching
    /// linear transform of their own.
    pub fn scale(&mut self, xscale: f64, yscale: f64) -> (f64, f64) {
        self.user_scale_x *= xscale;
        self.user_scale_y *= yscale;
        (xscale, yscale)
    }

    /// A copy of this transform with additional output scaling applied.
    pub fn scaled(&self, xscale: f64, yscale: f64) -> Self {
        let mut transform = self.clone();
        transform.scale(xscale, yscale);
        transform
    }

    /// Rasterize `target_rect` of the dewarped output.
    ///
    /// Destination pixels with no valid source mapping are filled with
    /// `outside_color`.
    pub fn materialize(
        &self,
        image: &RgbaImage,
        target_rect: Rect,
        outside_color: Rgba<u8>,
    ) -> RenderResult<RgbaImage> {
        self.materialize_with_cancel(image, target_rect, outside_color, None)
    }

    /// Like [`materialize`](Self::materialize), polling `cancel_flag`
    /// between output columns.
    ///
    /// # Errors
    ///
    /// [`RenderError::Cancelled`] as soon as the flag reads true;
    /// [`RenderError::InvalidTargetRect`] for an empty target.
    pub fn materialize_with_cancel(
        &self,
        image: &RgbaImage,
        target_rect: Rect,
        outside_color: Rgba<u8>,
        cancel_flag: Option<&AtomicBool>,
    ) -> RenderResult<RgbaImage> {
        if target_rect.is_empty() {
            return Err(RenderError::InvalidTargetRect);
        }

        let model_domain = ModelDomain {
            x: -f64::from(target_rect.x),
            y: -f64::from(target_rect.y),
            width: self.intrinsic_scale_x * self.user_scale_x,
            height: self.intrinsic_scale_y * self.user_scale_y,
        };

        raster::dewarp_image(
            image,
            target_rect.width,
            target_rect.height,
            &self.dewarper,
            model_domain,
            outside_color,
            cancel_flag,
        )
    }

    /// A closure mapping source image points to output coordinates.
    ///
    /// For callers mapping isolated points (overlay rendering) without
    /// materializing an image.
    pub fn forward_mapper(&self) -> Box<dyn Fn(Point) -> ModelResult<Point> + Send + Sync> {
        let dewarper = self.dewarper.clone();
        let xscale = self.intrinsic_scale_x * self.user_scale_x;
        let yscale = self.intrinsic_scale_y * self.user_scale_y;
        Box::new(move |pt| {
            let mut state = State::default();
            let crv = dewarper.map_to_dewarped_space(pt, &mut state)?;
            Ok(Point::new(crv.x * xscale, crv.y * yscale))
        })
    }

    /// A closure mapping output coordinates back to source image points.
    pub fn backward_mapper(&self) -> Box<dyn Fn(Point) -> ModelResult<Point> + Send + Sync> {
        let dewarper = self.dewarper.clone();
        let xscale = self.intrinsic_scale_x * self.user_scale_x;
        let yscale = self.intrinsic_scale_y * self.user_scale_y;
        Box::new(move |pt| {
            dewarper.map_to_warped_space(Point::new(pt.x / xscale, pt.y / yscale))
        })
    }

    fn post_scale(&self, pt: Point) -> Point {
        Point::new(
            pt.x * self.intrinsic_scale_x * self.user_scale_x,
            pt.y * self.intrinsic_scale_y * self.user_scale_y,
        )
    }

    /// Match per-pixel density in the model's unit square to the
    /// recommended output size.
    fn setup_intrinsic_scale(&mut self) {
        let image_size = self.image_size();
        self.intrinsic_scale_x = image_size.width;
        self.intrinsic_scale_y = image_size.height;
    }

    fn constrain_crop_area(&self, orig_crop_area: &[Point]) -> RenderResult<Vec<Point>> {
        let (min_density, max_density) = self.calc_min_max_densities()?;

        let mut builder = ConstrainedCropAreaBuilder::new(
            orig_crop_area,
            min_density,
            max_density,
            &self.dewarper,
        );
        builder.sample_crv_x_range(0.3, -0.6, -1.0);
        builder.sample_crv_x_range(0.7, 1.6, 1.0);
        let area = builder.build();

        if area.len() < 4 || signed_area(&area).abs() < f64::EPSILON {
            return Err(RenderError::UnsafeCropArea);
        }
        Ok(area)
    }

    /// The density corridor: corner densities of the model widened by
    /// 0.6 below and 1.4 above.
    fn calc_min_max_densities(&self) -> RenderResult<(f64, f64)> {
        let mut state = State::default();
        let left_bound = self.dewarper.map_generatrix(0.0, &mut state)?;
        let right_bound = self.dewarper.map_generatrix(1.0, &mut state)?;

        let left_len = left_bound.img_line.length();
        let right_len = right_bound.img_line.length();
        let corner_densities = [
            left_bound.pln2img.derivative_at(0.0) * left_len,
            left_bound.pln2img.derivative_at(1.0) * left_len,
            right_bound.pln2img.derivative_at(0.0) * right_len,
            right_bound.pln2img.derivative_at(1.0) * right_len,
        ];

        let min = corner_densities.iter().copied().fold(f64::INFINITY, f64::min);
        let max = corner_densities
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        Ok((0.6 * min, 1.4 * max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_setup() -> (DistortionModel, Vec<Point>) {
        let model = DistortionModel::new(
            vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
            vec![Point::new(0.0, 50.0), Point::new(100.0, 50.0)],
        )
        .unwrap();
        let crop = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 50.0),
            Point::new(0.0, 50.0),
        ];
        (model, crop)
    }

    fn flat_transform() -> DewarpingImageTransform {
        let (model, crop) = flat_setup();
        DewarpingImageTransform::new(
            (100, 50),
            &crop,
            &model,
            &FovParams::default(),
            &FrameParams::default(),
            &BendParams::default(),
            &SizeParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_flat_image_size() {
        let size = flat_transform().image_size();
        assert!((size.width - 100.0).abs() < 1e-3);
        assert!((size.height - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_transformed_crop_area_covers_page() {
        let transform = flat_transform();
        let poly = transform.transformed_crop_area().unwrap();
        assert!(poly.len() >= 4);
        // Flat model with matching crop: output coordinates stay within
        // the recommended image bounds.
        for pt in &poly {
            assert!(pt.x >= -1e-3 && pt.x <= 100.0 + 1e-3, "{pt:?}");
            assert!(pt.y >= -1e-3 && pt.y <= 50.0 + 1e-3, "{pt:?}");
        }
        // And it spans essentially the whole page.
        let area = signed_area(&poly).abs();
        assert!(area > 0.9 * 100.0 * 50.0, "area = {area}");
    }

    #[test]
    fn test_scale_composes() {
        let mut transform = flat_transform();
        transform.scale(2.0, 3.0);
        transform.scale(0.5, 1.0);
        let poly = transform.transformed_crop_area().unwrap();
        for pt in &poly {
            assert!(pt.y <= 3.0 * 50.0 + 1e-3);
        }
    }

    #[test]
    fn test_unsafe_crop_area_detected() {
        let (model, _) = flat_setup();
        let crop = vec![
            Point::new(500.0, 0.0),
            Point::new(600.0, 0.0),
            Point::new(600.0, 50.0),
            Point::new(500.0, 50.0),
        ];
        let err = DewarpingImageTransform::new(
            (100, 50),
            &crop,
            &model,
            &FovParams::default(),
            &FrameParams::default(),
            &BendParams::default(),
            &SizeParams::default(),
        );
        assert_eq!(err.err(), Some(RenderError::UnsafeCropArea));
    }

    #[test]
    fn test_mappers_are_inverse_for_flat_model() {
        let transform = flat_transform();
        let forward = transform.forward_mapper();
        let backward = transform.backward_mapper();
        for &(x, y) in &[(50.0, 25.0), (10.0, 40.0), (90.0, 5.0)] {
            let out = forward(Point::new(x, y)).unwrap();
            let back = backward(out).unwrap();
            assert!((back.x - x).abs() < 1e-6);
            assert!((back.y - y).abs() < 1e-6);
        }
    }
}
