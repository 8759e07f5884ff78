//! dewarp-model - Cylindrical page surface model
//!
//! This crate turns a pair of traced boundary curves plus camera
//! parameters into a bidirectional mapping between the warped source image
//! and flattened page coordinates:
//!
//! - Parameter value structs (fov, frame, bend, output size)
//! - Validated boundary curve pairs ([`DistortionModel`])
//! - The model-to-image perspective camera
//! - Directrix profile extraction
//! - The dewarper itself ([`CylindricalSurfaceDewarper`])

pub mod cylindrical;
pub mod directrix;
pub mod distortion_model;
mod error;
pub mod params;
pub mod perspective;

pub use cylindrical::{CylindricalSurfaceDewarper, Generatrix, ImageSize, State};
pub use distortion_model::DistortionModel;
pub use error::{ModelError, ModelResult};
pub use params::{
    BendParams, DistortionType, FovParams, FrameParams, Mode, SizeMode, SizeParams,
};
pub use perspective::{MdlToImg, PerspectiveTransform, build_mdl_to_img};
