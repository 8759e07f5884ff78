//! Rasterization of a dewarped image
//!
//! The dewarped output is produced by inverse mapping: every destination
//! pixel is mapped back through the model to a source position, and the
//! source image is sampled bilinearly there. Destination pixels whose
//! mapping fails or lands outside the source are filled with the caller's
//! outside color.
//!
//! Destination columns share a generatrix (a column is a line of constant
//! crv_x), so the expensive per-position work of the model runs once per
//! column, with only the 1D homography evaluated per pixel. The
//! cancellation flag, if supplied, is polled once per column.
//!
//! # See also
//!
//! ScanTailor: `RasterDewarper.cpp`

use std::sync::atomic::{AtomicBool, Ordering};

use image::{Rgba, RgbaImage};

use dewarp_geom::Point;
use dewarp_model::{CylindricalSurfaceDewarper, State};

use crate::{RenderError, RenderResult};

/// The axis-aligned rectangle in destination pixels that the model's unit
/// square maps onto.
#[derive(Debug, Clone, Copy)]
pub struct ModelDomain {
    /// Left edge in destination coordinates
    pub x: f64,
    /// Top edge in destination coordinates
    pub y: f64,
    /// Width in destination pixels
    pub width: f64,
    /// Height in destination pixels
    pub height: f64,
}

/// Rasterize a dewarped view of `src`.
///
/// Destination pixel centers are mapped into the model's unit square via
/// `model_domain`, then through the dewarper into source coordinates.
///
/// # Errors
///
/// [`RenderError::InvalidTargetRect`] for a zero destination size or a
/// degenerate model domain; [`RenderError::Cancelled`] if the
/// cancellation flag becomes set.
pub fn dewarp_image(
    src: &RgbaImage,
    dst_width: u32,
    dst_height: u32,
    dewarper: &CylindricalSurfaceDewarper,
    model_domain: ModelDomain,
    outside_color: Rgba<u8>,
    cancel_flag: Option<&AtomicBool>,
) -> RenderResult<RgbaImage> {
    if dst_width == 0
        || dst_height == 0
        || model_domain.width.abs() < f64::EPSILON
        || model_domain.height.abs() < f64::EPSILON
    {
        return Err(RenderError::InvalidTargetRect);
    }

    let mut dst = RgbaImage::from_pixel(dst_width, dst_height, outside_color);
    let mut state = State::default();

    for dst_x in 0..dst_width {
        if let Some(flag) = cancel_flag {
            if flag.load(Ordering::Relaxed) {
                return Err(RenderError::Cancelled);
            }
        }

        let crv_x = (f64::from(dst_x) + 0.5 - model_domain.x) / model_domain.width;
        let Ok(generatrix) = dewarper.map_generatrix(crv_x, &mut state) else {
            // Degenerate column; stays filled with the outside color.
            continue;
        };

        for dst_y in 0..dst_height {
            let crv_y = (f64::from(dst_y) + 0.5 - model_domain.y) / model_domain.height;
            let proj = generatrix.pln2img.apply(crv_y);
            let src_pt = generatrix.img_line.point_at(proj);
            if let Some(pixel) = sample_bilinear(src, src_pt) {
                dst.put_pixel(dst_x, dst_y, pixel);
            }
        }
    }

    Ok(dst)
}

/// Bilinear sample at a floating-point source position.
///
/// Pixel centers sit at integer + 0.5. Returns `None` when the position
/// lies outside the source image (beyond half a pixel past its border);
/// positions within the border half-pixel clamp to edge texels.
fn sample_bilinear(src: &RgbaImage, pt: Point) -> Option<Rgba<u8>> {
    let (width, height) = src.dimensions();
    if !pt.is_finite() {
        return None;
    }

    let fx = pt.x - 0.5;
    let fy = pt.y - 0.5;
    if fx < -1.0 || fy < -1.0 || fx > f64::from(width) || fy > f64::from(height) {
        return None;
    }

    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;

    let clamp_x = |v: f64| (v.max(0.0) as u32).min(width - 1);
    let clamp_y = |v: f64| (v.max(0.0) as u32).min(height - 1);
    let x0c = clamp_x(x0);
    let x1c = clamp_x(x0 + 1.0);
    let y0c = clamp_y(y0);
    let y1c = clamp_y(y0 + 1.0);

    let p00 = src.get_pixel(x0c, y0c);
    let p10 = src.get_pixel(x1c, y0c);
    let p01 = src.get_pixel(x0c, y1c);
    let p11 = src.get_pixel(x1c, y1c);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(p00.0[c]) * (1.0 - tx) + f64::from(p10.0[c]) * tx;
        let bottom = f64::from(p01.0[c]) * (1.0 - tx) + f64::from(p11.0[c]) * tx;
        let value = top * (1.0 - ty) + bottom * ty;
        out[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    Some(Rgba(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dewarp_model::{BendParams, DistortionModel, FovParams, FrameParams};

    const OUTSIDE: Rgba<u8> = Rgba([255, 0, 255, 255]);

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

    fn quadrant_image() -> RgbaImage {
        RgbaImage::from_fn(100, 50, |x, y| match (x < 50, y < 25) {
            (true, true) => Rgba([255, 0, 0, 255]),
            (false, true) => Rgba([0, 255, 0, 255]),
            (true, false) => Rgba([0, 0, 255, 255]),
            (false, false) => Rgba([255, 255, 0, 255]),
        })
    }

    fn identity_domain() -> ModelDomain {
        ModelDomain {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 50.0,
        }
    }

    #[test]
    fn test_flat_identity_reproduces_source() {
        let dewarper = flat_dewarper();
        let src = quadrant_image();
        let dst =
            dewarp_image(&src, 100, 50, &dewarper, identity_domain(), OUTSIDE, None).unwrap();
        assert_eq!(src, dst);
    }

    #[test]
    fn test_outside_domain_filled() {
        let dewarper = flat_dewarper();
        let src = quadrant_image();
        // A domain half the destination width leaves the right half of
        // the output mapping beyond the source image.
        let domain = ModelDomain {
            x: 0.0,
            y: 0.0,
            width: 50.0,
            height: 50.0,
        };
        let dst = dewarp_image(&src, 100, 50, &dewarper, domain, OUTSIDE, None).unwrap();
        assert_eq!(*dst.get_pixel(99, 25), OUTSIDE);
        assert_ne!(*dst.get_pixel(10, 25), OUTSIDE);
    }

    #[test]
    fn test_cancellation() {
        let dewarper = flat_dewarper();
        let src = quadrant_image();
        let flag = AtomicBool::new(true);
        let result = dewarp_image(
            &src,
            100,
            50,
            &dewarper,
            identity_domain(),
            OUTSIDE,
            Some(&flag),
        );
        assert_eq!(result.err(), Some(RenderError::Cancelled));
    }

    #[test]
    fn test_empty_target_rejected() {
        let dewarper = flat_dewarper();
        let src = quadrant_image();
        let result = dewarp_image(&src, 0, 50, &dewarper, identity_domain(), OUTSIDE, None);
        assert_eq!(result.err(), Some(RenderError::InvalidTargetRect));
    }
}
