//! Error types for dewarp-model

use dewarp_geom::GeometryError;
use thiserror::Error;

/// Errors produced while constructing or querying a dewarping model
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ModelError {
    /// A geometric solver failed; typically degenerate boundary curves.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// The supplied boundary curves cannot form a distortion model.
    #[error("invalid distortion model: {0}")]
    InvalidDistortionModel(&'static str),
}

/// Result type alias for model operations
pub type ModelResult<T> = std::result::Result<T, ModelError>;
