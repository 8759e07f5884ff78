//! dewarp-render - Crop constraining and rasterization for page dewarping
//!
//! This crate connects the cylindrical surface model to images:
//!
//! - Safe crop-area constraining (pixel density corridor)
//! - The per-page [`DewarpingImageTransform`]
//! - Inverse-mapping rasterization with bilinear sampling and
//!   cooperative cancellation

mod crop;
mod error;
pub mod raster;
pub mod transform;

pub use error::{RenderError, RenderResult};
pub use raster::{ModelDomain, dewarp_image};
pub use transform::{DewarpingImageTransform, Rect};
