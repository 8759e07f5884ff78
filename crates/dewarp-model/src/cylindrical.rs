//! Cylindrical surface dewarper
//!
//! Three coordinate systems are in play:
//!
//! - `img`: pixel coordinates in the warped source image.
//! - `pln`: coordinates on the plane the four curve endpoints are assumed
//!   to lie on. The top curve's endpoints map to (0, 0) and (1, 0), the
//!   bottom curve's to (0, 1) and (1, 1). `pln` and `img` are linked by a
//!   2D homography.
//! - `crv`: dewarped normalized coordinates. `crv` x is linked to `pln` x
//!   through the arc-length mapper; y is linked by a 1D homography that
//!   differs per generatrix.
//!
//! # See also
//!
//! ScanTailor: `CylindricalSurfaceDewarper.h`,
//! `CylindricalSurfaceDewarper.cpp`

use log::debug;

use dewarp_geom::{
    ArcLengthMapper, GeometryError, Homography1d, Homography2d, Line, LineProjector, Point,
    PolylineIntersector, arc_length, four_point_homography, intersector, signed_area,
    three_point_homography,
};

use crate::directrix;
use crate::distortion_model::DistortionModel;
use crate::params::{BendParams, FovParams, FrameParams, Mode, SizeMode, SizeParams};
use crate::perspective::{MdlToImg, build_mdl_to_img};
use crate::{ModelError, ModelResult};

/// Search hints threaded through repeated mapping calls.
///
/// Purely a cache of last-used search positions; a fresh default state at
/// any point changes performance, never results. Must not be shared
/// between interleaved call chains.
#[derive(Debug, Clone, Default)]
pub struct State {
    arc_length_hint: arc_length::Hint,
    intersection_hint1: intersector::Hint,
    intersection_hint2: intersector::Hint,
}

/// A vertical cross-section of the page in image space.
#[derive(Debug, Clone)]
pub struct Generatrix {
    /// The generatrix line; parameter 0 is the model's top edge,
    /// parameter 1 the bottom edge
    pub img_line: Line,
    /// Maps normalized vertical position to a projection scalar along
    /// `img_line`
    pub pln2img: Homography1d,
}

/// Recommended output dimensions for a dewarped image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSize {
    /// Output width in pixels
    pub width: f64,
    /// Output height in pixels
    pub height: f64,
    /// The scale factor (camera distance analog) the size was derived with
    pub distance: f64,
}

/// Bidirectional mapping between a warped image and dewarped page space.
#[derive(Debug, Clone)]
pub struct CylindricalSurfaceDewarper {
    pln2img: Homography2d,
    img2pln: Homography2d,
    mdl2img: MdlToImg,
    arc_length_mapper: ArcLengthMapper,
    directrix_arc_length: f64,
    bend: f64,
    top_intersector: PolylineIntersector,
    bottom_intersector: PolylineIntersector,
}

impl CylindricalSurfaceDewarper {
    /// Build a dewarper from a validated curve pair and the parameter set.
    ///
    /// # Errors
    ///
    /// [`GeometryError::SingularHomography`] (wrapped) if the curve
    /// endpoints are degenerate, including identical top and bottom
    /// curves; [`GeometryError::NumericDegeneracy`] if the derived model
    /// scales are unusable.
    pub fn new(
        model: &DistortionModel,
        fov_params: &FovParams,
        frame_params: &FrameParams,
        bend_params: &BendParams,
    ) -> ModelResult<Self> {
        let top = model.top_curve();
        let bottom = model.bottom_curve();

        let pln2img = calc_pln_to_img_homography(top, bottom)?;
        let img2pln = pln2img.invert()?;
        let mdl2img = build_mdl_to_img(&pln2img, fov_params, frame_params);
        if !mdl2img.is_well_conditioned() {
            return Err(GeometryError::NumericDegeneracy("model scale derivation").into());
        }

        // Validation guarantees >= 2 points per curve.
        let top_intersector = PolylineIntersector::new(top)
            .ok_or(ModelError::InvalidDistortionModel("top curve too short"))?;
        let bottom_intersector = PolylineIntersector::new(bottom)
            .ok_or(ModelError::InvalidDistortionModel("bottom curve too short"))?;

        let mut dewarper = Self {
            pln2img,
            img2pln,
            mdl2img,
            arc_length_mapper: ArcLengthMapper::new(),
            directrix_arc_length: 1.0,
            bend: 0.0,
            top_intersector,
            bottom_intersector,
        };
        dewarper.init_arc_length_mapper(top, bottom, bend_params)?;

        debug!(
            "dewarper: fov={:.4} sx={:.4} sy={:.4} bend={:.4} arc_len={:.6}",
            dewarper.mdl2img.fov,
            dewarper.mdl2img.sx,
            dewarper.mdl2img.sy,
            dewarper.bend,
            dewarper.directrix_arc_length
        );

        Ok(dewarper)
    }

    /// Effective field of view the model was built with.
    pub fn fov(&self) -> f64 {
        self.mdl2img.fov
    }

    /// Measured page bend after clamping/rescaling.
    pub fn bend(&self) -> f64 {
        self.bend
    }

    /// Arc length of the chosen directrix before normalization.
    pub fn directrix_arc_length(&self) -> f64 {
        self.directrix_arc_length
    }

    /// Recommended output dimensions per the requested size mode.
    ///
    /// # Panics
    ///
    /// Panics if either curve is empty. Curves obtained from a
    /// [`DistortionModel`] always have at least 2 points.
    pub fn image_size(
        &self,
        top_curve: &[Point],
        bottom_curve: &[Point],
        size_params: &SizeParams,
    ) -> ImageSize {
        let model_width = self.mdl2img.sx * self.directrix_arc_length;
        let model_height = self.mdl2img.sy;

        match size_params.mode {
            SizeMode::ByArea => {
                let quad = [
                    top_curve[0],
                    top_curve[top_curve.len() - 1],
                    bottom_curve[bottom_curve.len() - 1],
                    bottom_curve[0],
                ];
                let image_area = signed_area(&quad).abs();
                let model_area = model_width * model_height;
                let scale_factor = (image_area / model_area).sqrt();
                ImageSize {
                    width: scale_factor * model_width,
                    height: scale_factor * model_height,
                    distance: scale_factor,
                }
            }
            SizeMode::Fit => {
                let scale_factor =
                    (size_params.width / model_width).min(size_params.height / model_height);
                ImageSize {
                    width: scale_factor * model_width,
                    height: scale_factor * model_height,
                    distance: scale_factor,
                }
            }
            SizeMode::Stretch => {
                let scale_factor = 0.5
                    * (size_params.width / model_width + size_params.height / model_height);
                ImageSize {
                    width: size_params.width,
                    height: size_params.height,
                    distance: scale_factor,
                }
            }
            SizeMode::ByDistance => {
                let scale_factor = size_params.distance;
                ImageSize {
                    width: scale_factor * model_width,
                    height: scale_factor * model_height,
                    distance: scale_factor,
                }
            }
        }
    }

    /// The vertical page cross-section at dewarped position `crv_x`.
    ///
    /// The returned 1D homography is corrected against the actual curve
    /// crossings so that 0 and 1 land exactly on the top and bottom
    /// boundary curves.
    pub fn map_generatrix(&self, crv_x: f64, state: &mut State) -> ModelResult<Generatrix> {
        let sample = self
            .arc_length_mapper
            .arc_len_to_x_sample(crv_x, &mut state.arc_length_hint);

        let (img_generatrix, projector, img_middle_proj, d1_proj, d2_proj) =
            self.project_generatrix(sample.x, sample.fx, state)?;

        let (pln_middle_corrected, img_middle_corrected_proj) = self.correct_middle(
            sample.x,
            sample.fx,
            &projector,
            img_middle_proj,
            d1_proj,
            d2_proj,
        )?;

        let pln2img = three_point_homography(&[
            (0.0, d1_proj),
            (pln_middle_corrected, img_middle_corrected_proj),
            (1.0, d2_proj),
        ])?;

        Ok(Generatrix {
            img_line: img_generatrix,
            pln2img,
        })
    }

    /// Map an image point to dewarped coordinates.
    pub fn map_to_dewarped_space(&self, img_pt: Point, state: &mut State) -> ModelResult<Point> {
        let pln_x = self.img2pln.apply(img_pt).x;
        let sample = self
            .arc_length_mapper
            .x_to_arc_len_sample(pln_x, &mut state.arc_length_hint);

        let (_, projector, img_middle_proj, d1_proj, d2_proj) =
            self.project_generatrix(pln_x, sample.fx, state)?;

        let (pln_middle_corrected, img_middle_corrected_proj) = self.correct_middle(
            pln_x,
            sample.fx,
            &projector,
            img_middle_proj,
            d1_proj,
            d2_proj,
        )?;

        let img2pln_corrected = three_point_homography(&[
            (d1_proj, 0.0),
            (img_middle_corrected_proj, pln_middle_corrected),
            (d2_proj, 1.0),
        ])?;

        let crv_y = img2pln_corrected.apply(projector.projection_scalar(img_pt));
        Ok(Point::new(sample.arc_len, crv_y))
    }

    /// Map a dewarped point back to image coordinates.
    pub fn map_to_warped_space(&self, crv_pt: Point) -> ModelResult<Point> {
        let mut state = State::default();
        let gtx = self.map_generatrix(crv_pt.x, &mut state)?;
        Ok(gtx.img_line.point_at(gtx.pln2img.apply(crv_pt.y)))
    }

    /// Sample the model column at plane position `pln_x` and locate the
    /// actual curve crossings along it.
    ///
    /// Returns the generatrix line, its projector, and the projection
    /// scalars of the projected midpoint and of the two curve crossings.
    fn project_generatrix(
        &self,
        pln_x: f64,
        fx: f64,
        state: &mut State,
    ) -> ModelResult<(Line, LineProjector, f64, f64, f64)> {
        let img_top_pt = self.mdl2img.transform.apply(pln_x, 0.0, fx);
        let img_middle_pt = self.mdl2img.transform.apply(pln_x, 0.5, fx);
        let img_bottom_pt = self.mdl2img.transform.apply(pln_x, 1.0, fx);

        let img_generatrix = Line::new(img_top_pt, img_bottom_pt);

        let img_directrix1_pt = self
            .top_intersector
            .intersect(&img_generatrix, &mut state.intersection_hint1)
            .ok_or(GeometryError::NumericDegeneracy(
                "generatrix parallel to top curve",
            ))?;
        let img_directrix2_pt = self
            .bottom_intersector
            .intersect(&img_generatrix, &mut state.intersection_hint2)
            .ok_or(GeometryError::NumericDegeneracy(
                "generatrix parallel to bottom curve",
            ))?;

        let projector = LineProjector::new(&img_generatrix);
        let img_middle_proj = projector.projection_scalar(img_middle_pt);
        let d1_proj = projector.projection_scalar(img_directrix1_pt);
        let d2_proj = projector.projection_scalar(img_directrix2_pt);

        Ok((img_generatrix, projector, img_middle_proj, d1_proj, d2_proj))
    }

    /// Re-derive the midpoint consistent with the actual curve crossings.
    ///
    /// The naive projected midpoint assumes the curves pass exactly
    /// through the model's top and bottom edges, which they do not between
    /// endpoints. Mapping the crossings into plane space, averaging, and
    /// projecting back yields the midpoint the corrected homography is
    /// pinned to.
    fn correct_middle(
        &self,
        pln_x: f64,
        fx: f64,
        projector: &LineProjector,
        img_middle_proj: f64,
        d1_proj: f64,
        d2_proj: f64,
    ) -> ModelResult<(f64, f64)> {
        let img2pln =
            three_point_homography(&[(0.0, 0.0), (img_middle_proj, 0.5), (1.0, 1.0)])?;

        let pln_directrix1_proj = img2pln.apply(d1_proj);
        let pln_directrix2_proj = img2pln.apply(d2_proj);

        let pln_middle_corrected = 0.5 * (pln_directrix1_proj + pln_directrix2_proj);
        let img_middle_corrected_pt =
            self.mdl2img.transform.apply(pln_x, pln_middle_corrected, fx);
        let img_middle_corrected_proj = projector.projection_scalar(img_middle_corrected_pt);

        Ok((pln_middle_corrected, img_middle_corrected_proj))
    }

    fn init_arc_length_mapper(
        &mut self,
        top_curve: &[Point],
        bottom_curve: &[Point],
        bend_params: &BendParams,
    ) -> ModelResult<()> {
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
        ];
        // Anchor elevation: the default bend, backed off below the height
        // at which the camera projection becomes singular.
        let height = (0.15 * self.mdl2img.transform.z_singular(&corners).abs()).min(0.15);

        let place1 = directrix::Place::new(&self.mdl2img.transform, top_curve, 0.0, height);
        let place2 = directrix::Place::new(&self.mdl2img.transform, bottom_curve, 1.0, height);
        let best_place = if place1.quality() > place2.quality() {
            place1
        } else {
            place2
        };

        let min_quality = 1e-3;
        let plane = if best_place.quality() < min_quality {
            best_place.create_rotated_plane(min_quality)?
        } else {
            best_place.create_plane()?
        };

        let profile = directrix::Profile::new(&plane);

        // Keep only strictly advancing points; the curves are traced
        // left-to-right but may locally fold back.
        let mut points = Vec::with_capacity(profile.points().len());
        let mut y_min = f64::INFINITY;
        let mut y_max = f64::NEG_INFINITY;
        let mut prev_x = f64::NEG_INFINITY;
        for &point in profile.points() {
            if point.x > prev_x {
                y_min = y_min.min(point.y);
                y_max = y_max.max(point.y);
                points.push(point);
                prev_x = point.x;
            }
        }

        if points.len() < 2 {
            return Err(ModelError::InvalidDistortionModel(
                "directrix profile has no horizontal extent",
            ));
        }

        let src_bend = if y_min.abs() > y_max.abs() { y_min } else { y_max };
        let dst_bend = match bend_params.mode {
            Mode::Auto => src_bend.clamp(bend_params.bend_min, bend_params.bend_max),
            Mode::Manual => bend_params.bend,
        };

        // A src_bend at solver-noise level means a flat page.
        let k = dst_bend / src_bend;
        if src_bend.abs() < 1e-9 || !k.is_finite() || k == 0.0 {
            // Flat page: no measurable bend to parameterize by.
            self.arc_length_mapper.add_sample(0.0, 0.0);
            self.arc_length_mapper.add_sample(1.0, 0.0);
            self.bend = 0.0;
        } else {
            for point in &points {
                self.arc_length_mapper.add_sample(point.x, k * point.y);
            }
            self.bend = dst_bend;
        }

        if !self.arc_length_mapper.is_usable() {
            return Err(ModelError::InvalidDistortionModel(
                "directrix profile has no horizontal extent",
            ));
        }

        // Must be read off before normalization.
        self.directrix_arc_length = self.arc_length_mapper.total_arc_length();
        self.arc_length_mapper.normalize_range(1.0);
        Ok(())
    }
}

fn calc_pln_to_img_homography(
    top_curve: &[Point],
    bottom_curve: &[Point],
) -> ModelResult<Homography2d> {
    let pairs = [
        (Point::new(0.0, 0.0), top_curve[0]),
        (Point::new(1.0, 0.0), top_curve[top_curve.len() - 1]),
        (Point::new(0.0, 1.0), bottom_curve[0]),
        (Point::new(1.0, 1.0), bottom_curve[bottom_curve.len() - 1]),
    ];
    Ok(four_point_homography(&pairs)?)
}
