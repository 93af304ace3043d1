//! 3x3 matrix.
//!
//! Row-major storage, `m[row][col]`. The coordinate system is right-handed
//! and a positive angle rotates counter-clockwise when looking from the
//! positive axis towards the origin:
//!
//! ```text
//!   RX = | 1   0    0  |   RY = |  cy  0  sy |   RZ = | cz -sz  0 |
//!        | 0  cx  -sx  |        |  0   1  0  |        | sz  cz  0 |
//!        | 0  sx   cx  |        | -sy  0  cy |        | 0   0   1 |
//! ```
//!
//! The Euler conversions are named after the product order, so
//! `from_euler_angles_xyz(x, y, z)` builds `RX * RY * RZ`. Decomposition
//! reports `unique == false` in gimbal lock, where only a sum or difference
//! of two angles is defined; the returned angles then reproduce the matrix
//! with the last angle set to zero.

use crate::matrix2::Matrix2;
use crate::scalar::{Fixed, Scalar, Value};
use crate::vector2::Vector2;
use crate::vector3::Vector3;
use core::ops::{Add, Index, IndexMut, Mul, Neg, Sub};

// ============================================================================
// EulerAngles
// ============================================================================

/// Result of an Euler decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles<T = Value> {
    pub x: T,
    pub y: T,
    pub z: T,
    /// `false` when the decomposition is not unique (gimbal lock).
    pub unique: bool,
}

impl<T: Scalar> EulerAngles<T> {
    fn new(x: T, y: T, z: T, unique: bool) -> Self {
        Self { x, y, z, unique }
    }
}

// ============================================================================
// Matrix3
// ============================================================================

/// 3x3 row-major matrix.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Matrix3<T = Value> {
    m: [[T; 3]; 3],
}

impl<T: Scalar> Matrix3<T> {
    pub const ZERO: Self = Self {
        m: [
            [T::ZERO, T::ZERO, T::ZERO],
            [T::ZERO, T::ZERO, T::ZERO],
            [T::ZERO, T::ZERO, T::ZERO],
        ],
    };
    pub const IDENTITY: Self = Self {
        m: [
            [T::ONE, T::ZERO, T::ZERO],
            [T::ZERO, T::ONE, T::ZERO],
            [T::ZERO, T::ZERO, T::ONE],
        ],
    };

    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        m00: T,
        m01: T,
        m02: T,
        m10: T,
        m11: T,
        m12: T,
        m20: T,
        m21: T,
        m22: T,
    ) -> Self {
        Self {
            m: [[m00, m01, m02], [m10, m11, m12], [m20, m21, m22]],
        }
    }

    pub const fn from_array(m: [[T; 3]; 3]) -> Self {
        Self { m }
    }

    /// Matrix with `c0`, `c1`, `c2` as its columns.
    pub fn from_columns(c0: Vector3<T>, c1: Vector3<T>, c2: Vector3<T>) -> Self {
        Self::new(c0.x, c1.x, c2.x, c0.y, c1.y, c2.y, c0.z, c1.z, c2.z)
    }

    /// Embed a 2x2 matrix top-left, padding with `(0, 0, 1)`.
    pub fn from_matrix2(m2: &Matrix2<T>) -> Self {
        Self::new(
            m2[0][0],
            m2[0][1],
            T::ZERO,
            m2[1][0],
            m2[1][1],
            T::ZERO,
            T::ZERO,
            T::ZERO,
            T::ONE,
        )
    }

    pub fn from_scale(sx: T, sy: T, sz: T) -> Self {
        let z = T::ZERO;
        Self::new(sx, z, z, z, sy, z, z, z, sz)
    }

    pub fn from_rotation_x(radians: T) -> Self {
        let (s, c) = (radians.sin(), radians.cos());
        let (o, l) = (T::ZERO, T::ONE);
        Self::new(l, o, o, o, c, -s, o, s, c)
    }

    pub fn from_rotation_y(radians: T) -> Self {
        let (s, c) = (radians.sin(), radians.cos());
        let (o, l) = (T::ZERO, T::ONE);
        Self::new(c, o, s, o, l, o, -s, o, c)
    }

    pub fn from_rotation_z(radians: T) -> Self {
        let (s, c) = (radians.sin(), radians.cos());
        let (o, l) = (T::ZERO, T::ONE);
        Self::new(c, -s, o, s, c, o, o, o, l)
    }

    pub fn to_array(&self) -> [[T; 3]; 3] {
        self.m
    }

    /// Top-left 2x2 block.
    pub fn to_matrix2(&self) -> Matrix2<T> {
        Matrix2::new(self.m[0][0], self.m[0][1], self.m[1][0], self.m[1][1])
    }

    pub fn row(&self, r: usize) -> Vector3<T> {
        Vector3::new(self.m[r][0], self.m[r][1], self.m[r][2])
    }

    pub fn column(&self, c: usize) -> Vector3<T> {
        Vector3::new(self.m[0][c], self.m[1][c], self.m[2][c])
    }

    pub fn transpose(&self) -> Self {
        let m = &self.m;
        Self::new(
            m[0][0], m[1][0], m[2][0], m[0][1], m[1][1], m[2][1], m[0][2], m[1][2], m[2][2],
        )
    }

    pub fn determinant(&self) -> T {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            + m[0][1] * (m[1][2] * m[2][0] - m[1][0] * m[2][2])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Inverse via the adjugate, or `None` when `|det| < tolerance`.
    pub fn try_inverse(&self, tolerance: T) -> Option<Self> {
        let m = &self.m;
        let a00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
        let a01 = m[0][2] * m[2][1] - m[0][1] * m[2][2];
        let a02 = m[0][1] * m[1][2] - m[0][2] * m[1][1];
        let a10 = m[1][2] * m[2][0] - m[1][0] * m[2][2];
        let a11 = m[0][0] * m[2][2] - m[0][2] * m[2][0];
        let a12 = m[0][2] * m[1][0] - m[0][0] * m[1][2];
        let a20 = m[1][0] * m[2][1] - m[1][1] * m[2][0];
        let a21 = m[0][1] * m[2][0] - m[0][0] * m[2][1];
        let a22 = m[0][0] * m[1][1] - m[0][1] * m[1][0];

        let det = m[0][0] * a00 + m[0][1] * a10 + m[0][2] * a20;
        if det.abs() < tolerance {
            return None;
        }
        Some(Self::new(
            a00 / det,
            a01 / det,
            a02 / det,
            a10 / det,
            a11 / det,
            a12 / det,
            a20 / det,
            a21 / det,
            a22 / det,
        ))
    }

    /// Inverse, or [`Matrix3::ZERO`] when `|det| < tolerance`.
    ///
    /// A singular input cannot be told apart from a legitimately zero result
    /// here; use [`Matrix3::try_inverse`] when that matters.
    pub fn inverse(&self, tolerance: T) -> Self {
        self.try_inverse(tolerance).unwrap_or(Self::ZERO)
    }

    pub fn scale(&self, s: T) -> Self {
        let mut r = *self;
        for row in r.m.iter_mut() {
            for v in row.iter_mut() {
                *v = *v * s;
            }
        }
        r
    }

    /// `true` if all off-diagonal entries are zero.
    pub fn is_diagonal(&self) -> bool {
        let z = T::ZERO;
        let m = &self.m;
        m[0][1] == z && m[0][2] == z && m[1][0] == z && m[1][2] == z && m[2][0] == z && m[2][1] == z
    }

    /// Apply the top-left 2x2 block to a 2D vector.
    #[inline]
    pub fn transform_xy(&self, v: Vector2<T>) -> Vector2<T> {
        Vector2::new(
            self.m[0][0] * v.x + self.m[0][1] * v.y,
            self.m[1][0] * v.x + self.m[1][1] * v.y,
        )
    }

    // ------------------------------------------------------------------------
    // Axis-angle
    // ------------------------------------------------------------------------

    /// Rotation by `angle` around the unit vector `axis`.
    pub fn from_axis_angle(axis: Vector3<T>, angle: T) -> Self {
        let (s, c) = (angle.sin(), angle.cos());
        let t = T::ONE - c;
        let (x, y, z) = (axis.x, axis.y, axis.z);
        Self::new(
            x * x * t + c,
            x * y * t - z * s,
            x * z * t + y * s,
            x * y * t + z * s,
            y * y * t + c,
            y * z * t - x * s,
            x * z * t - y * s,
            y * z * t + x * s,
            z * z * t + c,
        )
    }

    /// Decompose a rotation matrix into a unit axis and an angle in `[0, PI]`.
    ///
    /// A zero rotation reports `UNIT_X` as its axis.
    pub fn to_axis_angle(&self) -> (Vector3<T>, T) {
        let m = &self.m;
        let two = T::from_int(2);
        let trace = m[0][0] + m[1][1] + m[2][2];
        let cos = (trace - T::ONE) / two;
        let angle = cos.acos();
        let tolerance = T::default_tolerance();

        if angle <= tolerance {
            return (Vector3::UNIT_X, T::ZERO);
        }

        let anti = Vector3::new(m[2][1] - m[1][2], m[0][2] - m[2][0], m[1][0] - m[0][1]);
        if cos > T::from_f32(-0.9) {
            return (anti.unitize(tolerance), angle);
        }

        // Near PI the antisymmetric part vanishes; recover the axis from the
        // symmetric part `cos*I + (1-cos)*a*a^T` instead.
        let one_minus_cos = T::ONE - cos;
        let diag = [m[0][0], m[1][1], m[2][2]];
        let mut axis = if diag[0] >= diag[1] && diag[0] >= diag[2] {
            let x = ((diag[0] - cos) / one_minus_cos).sqrt();
            let d = two * one_minus_cos * x;
            Vector3::new(x, (m[0][1] + m[1][0]) / d, (m[0][2] + m[2][0]) / d)
        } else if diag[1] >= diag[2] {
            let y = ((diag[1] - cos) / one_minus_cos).sqrt();
            let d = two * one_minus_cos * y;
            Vector3::new((m[0][1] + m[1][0]) / d, y, (m[1][2] + m[2][1]) / d)
        } else {
            let z = ((diag[2] - cos) / one_minus_cos).sqrt();
            let d = two * one_minus_cos * z;
            Vector3::new((m[0][2] + m[2][0]) / d, (m[1][2] + m[2][1]) / d, z)
        };
        if axis.dot(&anti) < T::ZERO {
            axis = -axis;
        }
        (axis.unitize(tolerance), angle)
    }

    // ------------------------------------------------------------------------
    // Euler angles
    // ------------------------------------------------------------------------

    pub fn from_euler_angles_xyz(x: T, y: T, z: T) -> Self {
        Self::from_rotation_x(x) * Self::from_rotation_y(y) * Self::from_rotation_z(z)
    }

    pub fn from_euler_angles_xzy(x: T, y: T, z: T) -> Self {
        Self::from_rotation_x(x) * Self::from_rotation_z(z) * Self::from_rotation_y(y)
    }

    pub fn from_euler_angles_yxz(x: T, y: T, z: T) -> Self {
        Self::from_rotation_y(y) * Self::from_rotation_x(x) * Self::from_rotation_z(z)
    }

    pub fn from_euler_angles_yzx(x: T, y: T, z: T) -> Self {
        Self::from_rotation_y(y) * Self::from_rotation_z(z) * Self::from_rotation_x(x)
    }

    pub fn from_euler_angles_zxy(x: T, y: T, z: T) -> Self {
        Self::from_rotation_z(z) * Self::from_rotation_x(x) * Self::from_rotation_y(y)
    }

    pub fn from_euler_angles_zyx(x: T, y: T, z: T) -> Self {
        Self::from_rotation_z(z) * Self::from_rotation_y(y) * Self::from_rotation_x(x)
    }

    pub fn to_euler_angles_xyz(&self) -> EulerAngles<T> {
        let m = &self.m;
        let half_pi = T::PI.half();
        if m[0][2] < T::ONE {
            if m[0][2] > -T::ONE {
                return EulerAngles::new(
                    (-m[1][2]).atan2(m[2][2]),
                    m[0][2].asin(),
                    (-m[0][1]).atan2(m[0][0]),
                    true,
                );
            }
            return EulerAngles::new(-m[1][0].atan2(m[1][1]), -half_pi, T::ZERO, false);
        }
        EulerAngles::new(m[1][0].atan2(m[1][1]), half_pi, T::ZERO, false)
    }

    pub fn to_euler_angles_xzy(&self) -> EulerAngles<T> {
        let m = &self.m;
        let half_pi = T::PI.half();
        if m[0][1] < T::ONE {
            if m[0][1] > -T::ONE {
                return EulerAngles::new(
                    m[2][1].atan2(m[1][1]),
                    m[0][2].atan2(m[0][0]),
                    (-m[0][1]).asin(),
                    true,
                );
            }
            return EulerAngles::new(m[2][0].atan2(m[2][2]), T::ZERO, half_pi, false);
        }
        EulerAngles::new((-m[2][0]).atan2(m[2][2]), T::ZERO, -half_pi, false)
    }

    pub fn to_euler_angles_yxz(&self) -> EulerAngles<T> {
        let m = &self.m;
        let half_pi = T::PI.half();
        if m[1][2] < T::ONE {
            if m[1][2] > -T::ONE {
                return EulerAngles::new(
                    (-m[1][2]).asin(),
                    m[0][2].atan2(m[2][2]),
                    m[1][0].atan2(m[1][1]),
                    true,
                );
            }
            return EulerAngles::new(half_pi, m[0][1].atan2(m[0][0]), T::ZERO, false);
        }
        EulerAngles::new(-half_pi, (-m[0][1]).atan2(m[0][0]), T::ZERO, false)
    }

    pub fn to_euler_angles_yzx(&self) -> EulerAngles<T> {
        let m = &self.m;
        let half_pi = T::PI.half();
        if m[1][0] < T::ONE {
            if m[1][0] > -T::ONE {
                return EulerAngles::new(
                    (-m[1][2]).atan2(m[1][1]),
                    (-m[2][0]).atan2(m[0][0]),
                    m[1][0].asin(),
                    true,
                );
            }
            return EulerAngles::new(T::ZERO, (-m[2][1]).atan2(m[2][2]), -half_pi, false);
        }
        EulerAngles::new(T::ZERO, m[2][1].atan2(m[2][2]), half_pi, false)
    }

    pub fn to_euler_angles_zxy(&self) -> EulerAngles<T> {
        let m = &self.m;
        let half_pi = T::PI.half();
        if m[2][1] < T::ONE {
            if m[2][1] > -T::ONE {
                return EulerAngles::new(
                    m[2][1].asin(),
                    (-m[2][0]).atan2(m[2][2]),
                    (-m[0][1]).atan2(m[1][1]),
                    true,
                );
            }
            return EulerAngles::new(-half_pi, T::ZERO, (-m[0][2]).atan2(m[0][0]), false);
        }
        EulerAngles::new(half_pi, T::ZERO, m[0][2].atan2(m[0][0]), false)
    }

    pub fn to_euler_angles_zyx(&self) -> EulerAngles<T> {
        let m = &self.m;
        let half_pi = T::PI.half();
        if m[2][0] < T::ONE {
            if m[2][0] > -T::ONE {
                return EulerAngles::new(
                    m[2][1].atan2(m[2][2]),
                    (-m[2][0]).asin(),
                    m[1][0].atan2(m[0][0]),
                    true,
                );
            }
            return EulerAngles::new(m[0][1].atan2(m[0][2]), half_pi, T::ZERO, false);
        }
        EulerAngles::new((-m[0][1]).atan2(-m[0][2]), -half_pi, T::ZERO, false)
    }
}

impl<T: Scalar> From<Matrix2<T>> for Matrix3<T> {
    fn from(m2: Matrix2<T>) -> Self {
        Self::from_matrix2(&m2)
    }
}

// ============================================================================
// Operators
// ============================================================================

impl<T: Scalar> Add for Matrix3<T> {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        let mut r = self;
        for (row, orow) in r.m.iter_mut().zip(o.m.iter()) {
            for (v, ov) in row.iter_mut().zip(orow.iter()) {
                *v += *ov;
            }
        }
        r
    }
}

impl<T: Scalar> Sub for Matrix3<T> {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        let mut r = self;
        for (row, orow) in r.m.iter_mut().zip(o.m.iter()) {
            for (v, ov) in row.iter_mut().zip(orow.iter()) {
                *v -= *ov;
            }
        }
        r
    }
}

impl<T: Scalar> Neg for Matrix3<T> {
    type Output = Self;
    fn neg(self) -> Self {
        let mut r = self;
        for row in r.m.iter_mut() {
            for v in row.iter_mut() {
                *v = -*v;
            }
        }
        r
    }
}

impl<T: Scalar> Mul for Matrix3<T> {
    type Output = Self;
    fn mul(self, o: Self) -> Self {
        let mut r = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                r.m[i][j] =
                    self.m[i][0] * o.m[0][j] + self.m[i][1] * o.m[1][j] + self.m[i][2] * o.m[2][j];
            }
        }
        r
    }
}

impl<T: Scalar> Mul<T> for Matrix3<T> {
    type Output = Self;
    fn mul(self, s: T) -> Self {
        self.scale(s)
    }
}

impl<T: Scalar> Mul<Vector3<T>> for Matrix3<T> {
    type Output = Vector3<T>;
    #[inline]
    fn mul(self, v: Vector3<T>) -> Vector3<T> {
        let m = &self.m;
        Vector3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }
}

/// Row vector times matrix.
impl<T: Scalar> Mul<Matrix3<T>> for Vector3<T> {
    type Output = Vector3<T>;
    #[inline]
    fn mul(self, m: Matrix3<T>) -> Vector3<T> {
        let m = &m.m;
        Vector3::new(
            self.x * m[0][0] + self.y * m[1][0] + self.z * m[2][0],
            self.x * m[0][1] + self.y * m[1][1] + self.z * m[2][1],
            self.x * m[0][2] + self.y * m[1][2] + self.z * m[2][2],
        )
    }
}

impl<T> Index<usize> for Matrix3<T> {
    type Output = [T; 3];
    fn index(&self, row: usize) -> &[T; 3] {
        &self.m[row]
    }
}

impl<T> IndexMut<usize> for Matrix3<T> {
    fn index_mut(&mut self, row: usize) -> &mut [T; 3] {
        &mut self.m[row]
    }
}

macro_rules! impl_scalar_mul_matrix3 {
    ($($t:ty),*) => {$(
        impl Mul<Matrix3<$t>> for $t {
            type Output = Matrix3<$t>;
            fn mul(self, m: Matrix3<$t>) -> Matrix3<$t> {
                m.scale(self)
            }
        }
    )*};
}

impl_scalar_mul_matrix3!(f32, f64, Fixed);

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    type M = Matrix3<f64>;
    type V = Vector3<f64>;

    const EPS: f64 = 1e-9;

    fn assert_matrix_eq(a: &M, b: &M, eps: f64) {
        for i in 0..3 {
            for j in 0..3 {
                assert_abs_diff_eq!(a[i][j], b[i][j], epsilon = eps);
            }
        }
    }

    fn sample() -> M {
        M::new(2.0, -1.0, 0.5, 0.0, 3.0, 1.0, 4.0, 1.0, -2.0)
    }

    #[test]
    fn test_inverse_round_trip() {
        let m = sample();
        let inv = m.try_inverse(1e-6).expect("non-singular");
        assert_matrix_eq(&(m * inv), &M::IDENTITY, EPS);
        assert_matrix_eq(&(inv * m), &M::IDENTITY, EPS);
    }

    #[test]
    fn test_inverse_singular() {
        let m = M::new(1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 1.0, 1.0);
        assert_abs_diff_eq!(m.determinant(), 0.0, epsilon = EPS);
        assert!(m.try_inverse(1e-6).is_none());
        assert_eq!(m.inverse(1e-6), M::ZERO);
    }

    #[test]
    fn test_inverse_f32_round_trip() {
        let m = Matrix3::<f32>::from_euler_angles_zyx(0.3, -0.7, 1.1) * Matrix3::from_scale(2.0, 3.0, 0.5);
        let p = m * m.inverse(1e-6);
        for i in 0..3 {
            for j in 0..3 {
                let e = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(p[i][j], e, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_determinant_and_transpose() {
        let m = sample();
        assert_abs_diff_eq!(m.determinant(), m.transpose().determinant(), epsilon = EPS);
        assert_eq!(m.transpose().transpose(), m);
        assert_eq!(m.row(2), m.transpose().column(2));
    }

    #[test]
    fn test_vector_products() {
        let m = sample();
        let v = V::new(1.0, 2.0, 3.0);
        assert_eq!(m * v, V::new(1.5, 9.0, 0.0));
        assert_eq!(v * m, m.transpose() * v);
    }

    #[test]
    fn test_from_matrix2_embeds_top_left() {
        let m2 = Matrix2::new(1.0, 2.0, 3.0, 4.0);
        let m3 = Matrix3::from(m2);
        assert_eq!(m3, M::new(1.0, 2.0, 0.0, 3.0, 4.0, 0.0, 0.0, 0.0, 1.0));
        assert_eq!(m3.to_matrix2(), m2);
    }

    #[test]
    fn test_from_columns() {
        let m = M::from_columns(V::UNIT_Y, V::UNIT_Z, V::UNIT_X);
        assert_eq!(m * V::UNIT_X, V::UNIT_Y);
        assert_eq!(m.column(1), V::UNIT_Z);
    }

    #[test]
    fn test_arithmetic() {
        let a = sample();
        assert_eq!(a - a, M::ZERO);
        assert_eq!(a + (-a), M::ZERO);
        assert_eq!(2.0 * a, a + a);
        assert_eq!(a * M::IDENTITY, a);
        assert!(M::from_scale(1.0, 2.0, 3.0).is_diagonal());
    }

    #[test]
    fn test_rotation_is_counter_clockwise() {
        let q = core::f64::consts::FRAC_PI_2;
        let r = M::from_rotation_z(q) * V::UNIT_X;
        assert_abs_diff_eq!(r.y, 1.0, epsilon = EPS);
        let r = M::from_rotation_x(q) * V::UNIT_Y;
        assert_abs_diff_eq!(r.z, 1.0, epsilon = EPS);
        let r = M::from_rotation_y(q) * V::UNIT_Z;
        assert_abs_diff_eq!(r.x, 1.0, epsilon = EPS);
    }

    #[test]
    fn test_axis_angle_round_trip() {
        let axis = V::new(1.0, 2.0, -2.0).unitize(1e-9);
        let m = M::from_axis_angle(axis, 1.2);
        let (a, angle) = m.to_axis_angle();
        assert_abs_diff_eq!(angle, 1.2, epsilon = 1e-9);
        assert_abs_diff_eq!(a.x, axis.x, epsilon = 1e-9);
        assert_abs_diff_eq!(a.y, axis.y, epsilon = 1e-9);
        assert_abs_diff_eq!(a.z, axis.z, epsilon = 1e-9);
    }

    #[test]
    fn test_axis_angle_half_turn() {
        let axis = V::new(0.0, 0.6, 0.8);
        let m = M::from_axis_angle(axis, core::f64::consts::PI);
        let (a, angle) = m.to_axis_angle();
        assert_abs_diff_eq!(angle, core::f64::consts::PI, epsilon = 1e-6);
        assert_matrix_eq(&M::from_axis_angle(a, angle), &m, 1e-6);
    }

    #[test]
    fn test_axis_angle_identity() {
        let (a, angle) = M::IDENTITY.to_axis_angle();
        assert_eq!(angle, 0.0);
        assert_eq!(a, V::UNIT_X);
    }

    #[test]
    fn test_euler_round_trip_all_orders() {
        let (x, y, z) = (0.4, -0.3, 1.1);
        type Build = fn(f64, f64, f64) -> M;
        type Split = fn(&M) -> EulerAngles<f64>;
        let orders: [(Build, Split); 6] = [
            (M::from_euler_angles_xyz, M::to_euler_angles_xyz),
            (M::from_euler_angles_xzy, M::to_euler_angles_xzy),
            (M::from_euler_angles_yxz, M::to_euler_angles_yxz),
            (M::from_euler_angles_yzx, M::to_euler_angles_yzx),
            (M::from_euler_angles_zxy, M::to_euler_angles_zxy),
            (M::from_euler_angles_zyx, M::to_euler_angles_zyx),
        ];
        for (build, split) in orders.iter() {
            let m = build(x, y, z);
            let e = split(&m);
            assert!(e.unique);
            assert_abs_diff_eq!(e.x, x, epsilon = 1e-9);
            assert_abs_diff_eq!(e.y, y, epsilon = 1e-9);
            assert_abs_diff_eq!(e.z, z, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_euler_gimbal_lock_reproduces_matrix() {
        let half_pi = core::f64::consts::FRAC_PI_2;
        let m = M::from_euler_angles_xyz(0.5, half_pi, 0.25);
        let mut exact = m;
        exact[0][2] = 1.0;
        let e = exact.to_euler_angles_xyz();
        assert!(!e.unique);
        assert_eq!(e.z, 0.0);
        assert_matrix_eq(&M::from_euler_angles_xyz(e.x, e.y, e.z), &m, 1e-9);

        let m = M::from_euler_angles_zyx(0.5, -half_pi, 0.25);
        let mut exact = m;
        exact[2][0] = 1.0;
        let e = exact.to_euler_angles_zyx();
        assert!(!e.unique);
        assert_matrix_eq(&M::from_euler_angles_zyx(e.x, e.y, e.z), &m, 1e-9);
    }

    #[test]
    fn test_transform_xy() {
        let m = M::from_matrix2(&Matrix2::from_scale(2.0, 3.0));
        assert_eq!(m.transform_xy(Vector2::new(1.0, 1.0)), Vector2::new(2.0, 3.0));
    }
}
