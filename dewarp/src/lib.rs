//! Dewarp - Cylindrical page dewarping for Rust
//!
//! Takes the traced top and bottom boundary curves of a photographed or
//! scanned page plus a small set of camera parameters, and produces a
//! bidirectional mapping between the warped source image and a flattened,
//! rectangular output.
//!
//! # Overview
//!
//! - Geometric primitives and solvers (homographies, arc-length
//!   parameterization, polyline intersection)
//! - The cylindrical surface model itself
//! - Safe crop-area constraining and image rasterization
//!
//! # Example
//!
//! ```
//! use dewarp::{
//!     BendParams, CylindricalSurfaceDewarper, DistortionModel, FovParams, FrameParams, Point,
//!     State,
//! };
//!
//! let model = DistortionModel::new(
//!     vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
//!     vec![Point::new(0.0, 50.0), Point::new(100.0, 50.0)],
//! )?;
//! let dewarper = CylindricalSurfaceDewarper::new(
//!     &model,
//!     &FovParams::default(),
//!     &FrameParams::default(),
//!     &BendParams::default(),
//! )?;
//!
//! let mut state = State::default();
//! let crv = dewarper.map_to_dewarped_space(Point::new(50.0, 25.0), &mut state)?;
//! assert!((crv.x - 0.5).abs() < 1e-6);
//! assert!((crv.y - 0.5).abs() < 1e-6);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export geometry types (used throughout the public API)
pub use dewarp_geom::*;

// Re-export the model and render crates' public surfaces
pub use dewarp_model::{
    BendParams, CylindricalSurfaceDewarper, DistortionModel, DistortionType, FovParams,
    FrameParams, Generatrix, ImageSize, MdlToImg, Mode, ModelError, ModelResult,
    PerspectiveTransform, SizeMode, SizeParams, State, build_mdl_to_img,
};
pub use dewarp_render::{
    DewarpingImageTransform, ModelDomain, Rect, RenderError, RenderResult, dewarp_image,
};
