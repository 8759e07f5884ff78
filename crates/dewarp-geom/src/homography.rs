//! Projective (homographic) transforms in one and two dimensions
//!
//! A 2D homography is determined by exactly 4 point correspondences, a 1D
//! homography by exactly 3. Both are solved as small dense linear systems
//! via column-pivoting QR, with a degenerate system reported as
//! [`GeometryError::SingularHomography`].
//!
//! The 1D transform carries the extra machinery the dewarping model needs:
//! derivatives, a pole-side test, and solving for the positions where the
//! derivative reaches a target value (used to bound projected pixel
//! density along a generatrix).
//!
//! # See also
//!
//! ScanTailor: `HomographicTransform.h`, `HomographicTransform.cpp`

use nalgebra::{Matrix2, Matrix3, SMatrix, SVector, Vector3};

use crate::{GeometryError, GeometryResult, Point};

/// Smallest denominator magnitude used in projective division.
///
/// Denominators closer to zero than this are clamped, keeping evaluation
/// total at the cost of a bounded error near the horizon line.
const MIN_DENOMINATOR: f64 = 1e-12;

#[inline]
fn clamp_denominator(w: f64) -> f64 {
    if w.abs() >= MIN_DENOMINATOR {
        w
    } else if w.is_sign_negative() {
        -MIN_DENOMINATOR
    } else {
        MIN_DENOMINATOR
    }
}

/// A 2D projective transform represented by a 3x3 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography2d {
    mat: Matrix3<f64>,
}

impl Homography2d {
    /// Wrap an existing matrix.
    pub fn from_matrix(mat: Matrix3<f64>) -> Self {
        Self { mat }
    }

    /// The underlying 3x3 matrix.
    pub fn mat(&self) -> &Matrix3<f64> {
        &self.mat
    }

    /// Apply the transform to a point.
    pub fn apply(&self, pt: Point) -> Point {
        let v = self.mat * Vector3::new(pt.x, pt.y, 1.0);
        let w = clamp_denominator(v[2]);
        Point::new(v[0] / w, v[1] / w)
    }

    /// The inverse transform.
    ///
    /// # Errors
    ///
    /// [`GeometryError::SingularHomography`] if the matrix is not
    /// invertible.
    pub fn invert(&self) -> GeometryResult<Self> {
        self.mat
            .try_inverse()
            .map(Self::from_matrix)
            .ok_or(GeometryError::SingularHomography)
    }
}

/// Solve a 2D homography from exactly 4 point correspondences.
///
/// Each pair is `(from, to)`. The system has 8 unknowns (the ninth matrix
/// element is fixed at 1) and 8 equations.
///
/// # Errors
///
/// [`GeometryError::SingularHomography`] if the correspondences are
/// degenerate (three collinear source or destination points, coincident
/// points, or a destination collapsing to a line).
pub fn four_point_homography(pairs: &[(Point, Point); 4]) -> GeometryResult<Homography2d> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for (i, (from, to)) in pairs.iter().enumerate() {
        let r = i * 2;

        a[(r, 0)] = -from.x;
        a[(r, 1)] = -from.y;
        a[(r, 2)] = -1.0;
        a[(r, 6)] = to.x * from.x;
        a[(r, 7)] = to.x * from.y;
        b[r] = -to.x;

        a[(r + 1, 3)] = -from.x;
        a[(r + 1, 4)] = -from.y;
        a[(r + 1, 5)] = -1.0;
        a[(r + 1, 6)] = to.y * from.x;
        a[(r + 1, 7)] = to.y * from.y;
        b[r + 1] = -to.y;
    }

    let qr = a.col_piv_qr();
    if !qr.is_invertible() {
        return Err(GeometryError::SingularHomography);
    }

    let h = qr.solve(&b).ok_or(GeometryError::SingularHomography)?;
    if h.iter().any(|v| !v.is_finite()) {
        return Err(GeometryError::NumericDegeneracy("2D homography solve"));
    }

    Ok(Homography2d::from_matrix(Matrix3::new(
        h[0], h[1], h[2], //
        h[3], h[4], h[5], //
        h[6], h[7], 1.0,
    )))
}

/// A 1D projective transform represented by a 2x2 matrix.
///
/// Maps `x` to `(a*x + b) / (c*x + d)`. The transform has a pole at
/// `x = -d/c` (unless `c` is zero, in which case it is affine); values on
/// the far side of the pole belong to the "mirror" branch and are not
/// meaningful for interpolation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography1d {
    mat: Matrix2<f64>,
}

impl Homography1d {
    /// Wrap an existing matrix.
    pub fn from_matrix(mat: Matrix2<f64>) -> Self {
        Self { mat }
    }

    #[inline]
    fn coeffs(&self) -> (f64, f64, f64, f64) {
        (
            self.mat[(0, 0)],
            self.mat[(0, 1)],
            self.mat[(1, 0)],
            self.mat[(1, 1)],
        )
    }

    /// Apply the transform.
    pub fn apply(&self, x: f64) -> f64 {
        let (a, b, c, d) = self.coeffs();
        (a * x + b) / clamp_denominator(c * x + d)
    }

    /// The inverse transform.
    ///
    /// Homographies are scale-invariant, so the adjugate matrix suffices.
    ///
    /// # Errors
    ///
    /// [`GeometryError::SingularHomography`] if the matrix determinant
    /// vanishes.
    pub fn invert(&self) -> GeometryResult<Self> {
        let (a, b, c, d) = self.coeffs();
        let det = a * d - b * c;
        if det.abs() < 1e-15 || !det.is_finite() {
            return Err(GeometryError::SingularHomography);
        }
        Ok(Self::from_matrix(Matrix2::new(d, -b, -c, a)))
    }

    /// First derivative at `x`.
    pub fn derivative_at(&self, x: f64) -> f64 {
        let (a, b, c, d) = self.coeffs();
        let den = clamp_denominator(c * x + d);
        (a * d - b * c) / (den * den)
    }

    /// Second derivative at `x`.
    pub fn second_derivative_at(&self, x: f64) -> f64 {
        let (a, b, c, d) = self.coeffs();
        let den = clamp_denominator(c * x + d);
        -2.0 * c * (a * d - b * c) / (den * den * den)
    }

    /// Whether `x` lies on the opposite side of the pole from `x = 0`.
    ///
    /// Values on the mirror side belong to the other branch of the
    /// hyperbola and must not be used as interpolation bounds.
    pub fn mirror_side(&self, x: f64) -> bool {
        let (_, _, c, d) = self.coeffs();
        (c * x + d).is_sign_negative() != d.is_sign_negative()
    }

    /// Visit the (up to two) values of `x` where the derivative equals
    /// `target`.
    ///
    /// The derivative `(ad - bc) / (cx + d)^2` takes each value of its own
    /// sign exactly twice, once on each side of the pole. An affine
    /// transform (`c == 0`) has a constant derivative and yields no
    /// isolated solutions. Non-finite solutions are skipped.
    pub fn solve_for_derivative(&self, target: f64, mut visit: impl FnMut(f64)) {
        let (a, b, c, d) = self.coeffs();
        if c.abs() < 1e-15 {
            return;
        }

        let det = a * d - b * c;
        let ratio = det / target;
        if !(ratio > 0.0) || !ratio.is_finite() {
            return;
        }

        let den = ratio.sqrt();
        for root in [(den - d) / c, (-den - d) / c] {
            if root.is_finite() {
                visit(root);
            }
        }
    }
}

/// Solve a 1D homography from exactly 3 scalar correspondences.
///
/// Each pair is `(from, to)`.
///
/// # Errors
///
/// [`GeometryError::SingularHomography`] if two `from` values (or two `to`
/// values) coincide.
pub fn three_point_homography(pairs: &[(f64, f64); 3]) -> GeometryResult<Homography1d> {
    let mut a = Matrix3::<f64>::zeros();
    let mut b = Vector3::<f64>::zeros();

    for (i, (from, to)) in pairs.iter().enumerate() {
        a[(i, 0)] = -from;
        a[(i, 1)] = -1.0;
        a[(i, 2)] = from * to;
        b[i] = -to;
    }

    let qr = a.col_piv_qr();
    if !qr.is_invertible() {
        return Err(GeometryError::SingularHomography);
    }

    let h = qr.solve(&b).ok_or(GeometryError::SingularHomography)?;
    if h.iter().any(|v| !v.is_finite()) {
        return Err(GeometryError::NumericDegeneracy("1D homography solve"));
    }

    Ok(Homography1d::from_matrix(Matrix2::new(h[0], h[1], h[2], 1.0)))
}
