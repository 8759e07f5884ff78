//! dewarp-geom - Geometric primitives and solvers for page dewarping
//!
//! This crate provides the floating-point geometry the dewarping model is
//! built on:
//!
//! - 2D points, lines, and projection onto lines
//! - Polygon utilities (signed area, clipping a line to a polygon)
//! - 1D and 2D homographies solved from exact correspondence sets
//! - Arc-length parameterization of a sampled profile
//! - Hint-accelerated line/polyline intersection

pub mod arc_length;
mod error;
pub mod homography;
pub mod intersector;
pub mod line;
pub mod point;
pub mod polygon;

pub use arc_length::{ArcLenSample, ArcLengthMapper, XSample};
pub use error::{GeometryError, GeometryResult};
pub use homography::{
    Homography1d, Homography2d, four_point_homography, three_point_homography,
};
pub use intersector::PolylineIntersector;
pub use line::{Line, LineProjector};
pub use point::Point;
pub use polygon::{line_bounded_by_polygon, signed_area};
