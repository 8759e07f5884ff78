//! Error types for dewarp-render

use dewarp_model::ModelError;
use thiserror::Error;

/// Errors produced while constraining crop areas or rasterizing
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    /// The underlying dewarping model failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Constraining the crop area rejected every generatrix; the curves
    /// are geometrically unusable for this image. Callers should fall
    /// back to an identity transform rather than produce an empty image.
    #[error("constrained crop area is empty or degenerate")]
    UnsafeCropArea,

    /// The requested target rectangle has no pixels.
    #[error("target rectangle is empty")]
    InvalidTargetRect,

    /// Rasterization was cancelled through the cancellation flag.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type alias for render operations
pub type RenderResult<T> = std::result::Result<T, RenderError>;
