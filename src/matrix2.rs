//! 2x2 matrix.
//!
//! Row-major storage, `m[row][col]`. Vectors are columns for `M * v` and rows
//! for `v * M`. Rotation matrices have the form
//!
//! ```text
//!   | cos a  -sin a |
//!   | sin a   cos a |
//! ```
//!
//! where a positive angle rotates counter-clockwise.

use crate::scalar::{Fixed, Scalar, Value};
use crate::vector2::Vector2;
use core::ops::{Add, Index, IndexMut, Mul, Neg, Sub};

/// 2x2 row-major matrix.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Matrix2<T = Value> {
    m: [[T; 2]; 2],
}

impl<T: Scalar> Matrix2<T> {
    pub const ZERO: Self = Self {
        m: [[T::ZERO, T::ZERO], [T::ZERO, T::ZERO]],
    };
    pub const IDENTITY: Self = Self {
        m: [[T::ONE, T::ZERO], [T::ZERO, T::ONE]],
    };

    pub const fn new(m00: T, m01: T, m10: T, m11: T) -> Self {
        Self {
            m: [[m00, m01], [m10, m11]],
        }
    }

    pub const fn from_array(m: [[T; 2]; 2]) -> Self {
        Self { m }
    }

    /// Matrix with `c0` and `c1` as its columns.
    pub fn from_columns(c0: Vector2<T>, c1: Vector2<T>) -> Self {
        Self::new(c0.x, c1.x, c0.y, c1.y)
    }

    /// Diagonal scaling matrix.
    pub fn from_scale(sx: T, sy: T) -> Self {
        Self::new(sx, T::ZERO, T::ZERO, sy)
    }

    /// Rotation by `radians` (counter-clockwise).
    pub fn from_angle(radians: T) -> Self {
        let (s, c) = (radians.sin(), radians.cos());
        Self::new(c, -s, s, c)
    }

    /// Rotation angle of a rotation matrix, in `(-PI, PI]`.
    pub fn to_angle(&self) -> T {
        self.m[1][0].atan2(self.m[0][0])
    }

    pub fn to_array(&self) -> [[T; 2]; 2] {
        self.m
    }

    pub fn row(&self, r: usize) -> Vector2<T> {
        Vector2::new(self.m[r][0], self.m[r][1])
    }

    pub fn column(&self, c: usize) -> Vector2<T> {
        Vector2::new(self.m[0][c], self.m[1][c])
    }

    pub fn transpose(&self) -> Self {
        Self::new(self.m[0][0], self.m[1][0], self.m[0][1], self.m[1][1])
    }

    pub fn determinant(&self) -> T {
        self.m[0][0] * self.m[1][1] - self.m[0][1] * self.m[1][0]
    }

    /// Inverse, or `None` when `|det| < tolerance`.
    pub fn try_inverse(&self, tolerance: T) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < tolerance {
            return None;
        }
        Some(Self::new(
            self.m[1][1] / det,
            -self.m[0][1] / det,
            -self.m[1][0] / det,
            self.m[0][0] / det,
        ))
    }

    /// Inverse, or [`Matrix2::ZERO`] when `|det| < tolerance`.
    ///
    /// A singular input cannot be told apart from a legitimately zero result
    /// here; use [`Matrix2::try_inverse`] when that matters.
    pub fn inverse(&self, tolerance: T) -> Self {
        self.try_inverse(tolerance).unwrap_or(Self::ZERO)
    }

    pub fn scale(&self, s: T) -> Self {
        Self::new(
            self.m[0][0] * s,
            self.m[0][1] * s,
            self.m[1][0] * s,
            self.m[1][1] * s,
        )
    }

    /// `true` if both off-diagonal entries are zero.
    pub fn is_diagonal(&self) -> bool {
        self.m[0][1] == T::ZERO && self.m[1][0] == T::ZERO
    }
}

impl<T: Scalar> Add for Matrix2<T> {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self::new(
            self.m[0][0] + o.m[0][0],
            self.m[0][1] + o.m[0][1],
            self.m[1][0] + o.m[1][0],
            self.m[1][1] + o.m[1][1],
        )
    }
}

impl<T: Scalar> Sub for Matrix2<T> {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        Self::new(
            self.m[0][0] - o.m[0][0],
            self.m[0][1] - o.m[0][1],
            self.m[1][0] - o.m[1][0],
            self.m[1][1] - o.m[1][1],
        )
    }
}

impl<T: Scalar> Neg for Matrix2<T> {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.m[0][0], -self.m[0][1], -self.m[1][0], -self.m[1][1])
    }
}

impl<T: Scalar> Mul for Matrix2<T> {
    type Output = Self;
    fn mul(self, o: Self) -> Self {
        let a = &self.m;
        let b = &o.m;
        Self::new(
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        )
    }
}

impl<T: Scalar> Mul<T> for Matrix2<T> {
    type Output = Self;
    fn mul(self, s: T) -> Self {
        self.scale(s)
    }
}

impl<T: Scalar> Mul<Vector2<T>> for Matrix2<T> {
    type Output = Vector2<T>;
    #[inline]
    fn mul(self, v: Vector2<T>) -> Vector2<T> {
        Vector2::new(
            self.m[0][0] * v.x + self.m[0][1] * v.y,
            self.m[1][0] * v.x + self.m[1][1] * v.y,
        )
    }
}

/// Row vector times matrix.
impl<T: Scalar> Mul<Matrix2<T>> for Vector2<T> {
    type Output = Vector2<T>;
    #[inline]
    fn mul(self, m: Matrix2<T>) -> Vector2<T> {
        Vector2::new(
            self.x * m.m[0][0] + self.y * m.m[1][0],
            self.x * m.m[0][1] + self.y * m.m[1][1],
        )
    }
}

impl<T> Index<usize> for Matrix2<T> {
    type Output = [T; 2];
    fn index(&self, row: usize) -> &[T; 2] {
        &self.m[row]
    }
}

impl<T> IndexMut<usize> for Matrix2<T> {
    fn index_mut(&mut self, row: usize) -> &mut [T; 2] {
        &mut self.m[row]
    }
}

macro_rules! impl_scalar_mul_matrix2 {
    ($($t:ty),*) => {$(
        impl Mul<Matrix2<$t>> for $t {
            type Output = Matrix2<$t>;
            fn mul(self, m: Matrix2<$t>) -> Matrix2<$t> {
                m.scale(self)
            }
        }
    )*};
}

impl_scalar_mul_matrix2!(f32, f64, Fixed);

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::PI;

    type M = Matrix2<f32>;
    type V = Vector2<f32>;

    #[test]
    fn test_identity_and_zero() {
        let v = V::new(3.0, -2.0);
        assert_eq!(M::IDENTITY * v, v);
        assert_eq!(M::ZERO * v, V::ZERO);
        assert_eq!(M::IDENTITY.determinant(), 1.0);
    }

    #[test]
    fn test_rotation_90() {
        let m = M::from_angle(PI / 2.0);
        let r = m * V::UNIT_X;
        assert_abs_diff_eq!(r.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(r.y, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(m.to_angle(), PI / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_vector_times_matrix_uses_rows() {
        let m = M::new(1.0, 2.0, 3.0, 4.0);
        let v = V::new(1.0, 1.0);
        assert_eq!(v * m, V::new(4.0, 6.0));
        assert_eq!(m * v, V::new(3.0, 7.0));
        assert_eq!(v * m, m.transpose() * v);
    }

    #[test]
    fn test_inverse_round_trip() {
        let m = M::new(4.0, 7.0, 2.0, 6.0);
        let inv = m.try_inverse(1e-6).expect("non-singular");
        let p = m * inv;
        assert_abs_diff_eq!(p[0][0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p[0][1], 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p[1][0], 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(p[1][1], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_singular_inverse() {
        let m = M::new(1.0, 2.0, 2.0, 4.0);
        assert!(m.try_inverse(1e-6).is_none());
        assert_eq!(m.inverse(1e-6), M::ZERO);
    }

    #[test]
    fn test_arithmetic() {
        let a = M::new(1.0, 2.0, 3.0, 4.0);
        let b = M::IDENTITY;
        assert_eq!(a + b, M::new(2.0, 2.0, 3.0, 5.0));
        assert_eq!(a - a, M::ZERO);
        assert_eq!(-a, M::new(-1.0, -2.0, -3.0, -4.0));
        assert_eq!(2.0 * a, M::new(2.0, 4.0, 6.0, 8.0));
        assert_eq!(a * b, a);
    }

    #[test]
    fn test_columns_rows() {
        let m = M::from_columns(V::new(1.0, 2.0), V::new(3.0, 4.0));
        assert_eq!(m.column(0), V::new(1.0, 2.0));
        assert_eq!(m.row(0), V::new(1.0, 3.0));
        assert!(M::from_scale(2.0, 3.0).is_diagonal());
        assert!(!m.is_diagonal());
    }

    #[test]
    fn test_fixed_inverse() {
        let m = Matrix2::new(
            Fixed::from_int(2),
            Fixed::ZERO,
            Fixed::ZERO,
            Fixed::from_int(4),
        );
        let inv = m.inverse(Fixed::default_tolerance());
        assert_abs_diff_eq!(inv[0][0].to_f32(), 0.5);
        assert_abs_diff_eq!(inv[1][1].to_f32(), 0.25);
    }
}
