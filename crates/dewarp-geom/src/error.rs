//! Error types for dewarp-geom
//!
//! The geometry crate has exactly two failure modes: a linear system built
//! from degenerate point correspondences, and a solver producing non-finite
//! values. Everything else in this crate is total.

use thiserror::Error;

/// Errors produced by geometric solvers
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// The point correspondences are collinear or coincident and do not
    /// determine a homography.
    #[error("degenerate point correspondences: singular homography")]
    SingularHomography,

    /// A solver produced a non-finite intermediate value.
    #[error("numeric degeneracy in {0}")]
    NumericDegeneracy(&'static str),
}

/// Result type alias for geometry operations
pub type GeometryResult<T> = std::result::Result<T, GeometryError>;
