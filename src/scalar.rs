//! Scalar abstraction for all geometry math.
//!
//! Geometry code is written against the [`Scalar`] trait. The crate-wide
//! [`Value`] alias picks the concrete type at build time: `f32` by default,
//! or the 16.16 [`Fixed`] type with the `fixed-point` feature, for targets
//! without a floating point unit.
//!
//! Degenerate arithmetic never faults: division by zero and overflow saturate
//! to [`Scalar::MAX`], which doubles as the "infinite / undefined" sentinel.

use bytemuck::{Pod, Zeroable};
use core::fmt::Debug;
use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

// ============================================================================
// Scalar trait
// ============================================================================

/// Numeric type usable by vectors, matrices, the clipper and primitives.
pub trait Scalar:
    Copy
    + Debug
    + Default
    + PartialEq
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
{
    const ZERO: Self;
    const ONE: Self;
    /// Largest representable positive value; the saturation sentinel.
    const MAX: Self;
    /// Smallest representable value larger than zero.
    const MIN_POSITIVE: Self;
    const PI: Self;

    fn from_f32(v: f32) -> Self;
    fn to_f32(self) -> f32;
    fn from_int(v: i32) -> Self;

    fn abs(self) -> Self;
    fn sqrt(self) -> Self;

    fn sin(self) -> Self {
        Self::from_f32(self.to_f32().sin())
    }

    fn cos(self) -> Self {
        Self::from_f32(self.to_f32().cos())
    }

    fn acos(self) -> Self {
        Self::from_f32(self.to_f32().clamp(-1.0, 1.0).acos())
    }

    fn asin(self) -> Self {
        Self::from_f32(self.to_f32().clamp(-1.0, 1.0).asin())
    }

    fn atan2(self, x: Self) -> Self {
        Self::from_f32(self.to_f32().atan2(x.to_f32()))
    }

    #[inline]
    fn half(self) -> Self {
        self / Self::from_int(2)
    }

    /// `self / d`, or [`Scalar::MAX`] when `d` is zero.
    #[inline]
    fn div_or_max(self, d: Self) -> Self {
        if d == Self::ZERO {
            Self::MAX
        } else {
            self / d
        }
    }

    /// `1 / self`, or [`Scalar::MAX`] when `self` is zero.
    #[inline]
    fn recip_or_max(self) -> Self {
        Self::ONE.div_or_max(self)
    }

    /// Default tolerance for unitize/inverse (1e-6, at least one unit in the
    /// last place).
    fn default_tolerance() -> Self {
        let t = Self::from_f32(1e-6);
        if t < Self::MIN_POSITIVE {
            Self::MIN_POSITIVE
        } else {
            t
        }
    }

    #[inline]
    fn min_of(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }

    #[inline]
    fn max_of(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }
}

impl Scalar for f32 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const MAX: Self = f32::MAX;
    const MIN_POSITIVE: Self = f32::MIN_POSITIVE;
    const PI: Self = core::f32::consts::PI;

    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
    #[inline]
    fn from_int(v: i32) -> Self {
        v as f32
    }
    #[inline]
    fn abs(self) -> Self {
        f32::abs(self)
    }
    #[inline]
    fn sqrt(self) -> Self {
        if self <= 0.0 {
            0.0
        } else {
            f32::sqrt(self)
        }
    }
    fn sin(self) -> Self {
        f32::sin(self)
    }
    fn cos(self) -> Self {
        f32::cos(self)
    }
    fn acos(self) -> Self {
        f32::acos(self.clamp(-1.0, 1.0))
    }
    fn asin(self) -> Self {
        f32::asin(self.clamp(-1.0, 1.0))
    }
    fn atan2(self, x: Self) -> Self {
        f32::atan2(self, x)
    }
    #[inline]
    fn half(self) -> Self {
        self * 0.5
    }
}

impl Scalar for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const MAX: Self = f64::MAX;
    const MIN_POSITIVE: Self = f64::MIN_POSITIVE;
    const PI: Self = core::f64::consts::PI;

    #[inline]
    fn from_f32(v: f32) -> Self {
        v as f64
    }
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
    #[inline]
    fn from_int(v: i32) -> Self {
        v as f64
    }
    #[inline]
    fn abs(self) -> Self {
        f64::abs(self)
    }
    #[inline]
    fn sqrt(self) -> Self {
        if self <= 0.0 {
            0.0
        } else {
            f64::sqrt(self)
        }
    }
    fn sin(self) -> Self {
        f64::sin(self)
    }
    fn cos(self) -> Self {
        f64::cos(self)
    }
    fn acos(self) -> Self {
        f64::acos(self.clamp(-1.0, 1.0))
    }
    fn asin(self) -> Self {
        f64::asin(self.clamp(-1.0, 1.0))
    }
    fn atan2(self, x: Self) -> Self {
        f64::atan2(self, x)
    }
    #[inline]
    fn half(self) -> Self {
        self * 0.5
    }
    fn default_tolerance() -> Self {
        1e-6
    }
}

// ============================================================================
// Fixed-point 16.16
// ============================================================================

/// Number of fractional bits of [`Fixed`].
pub const FIXED_SHIFT: u32 = 16;
const FIXED_ONE_RAW: i32 = 1 << FIXED_SHIFT;

/// Signed 16.16 fixed-point number.
///
/// Arithmetic saturates at `±Fixed::MAX` instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Fixed(i32);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(FIXED_ONE_RAW);
    pub const MAX: Fixed = Fixed(i32::MAX);
    pub const MIN_POSITIVE: Fixed = Fixed(1);

    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Fixed(raw)
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    #[inline]
    fn saturate(v: i64) -> Self {
        if v > i32::MAX as i64 {
            Fixed(i32::MAX)
        } else if v < -(i32::MAX as i64) {
            Fixed(-i32::MAX)
        } else {
            Fixed(v as i32)
        }
    }
}

/// Integer square root of a 64-bit value (floor).
fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

impl Add for Fixed {
    type Output = Fixed;
    #[inline]
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed::saturate(self.0 as i64 + rhs.0 as i64)
    }
}

impl Sub for Fixed {
    type Output = Fixed;
    #[inline]
    fn sub(self, rhs: Fixed) -> Fixed {
        Fixed::saturate(self.0 as i64 - rhs.0 as i64)
    }
}

impl Mul for Fixed {
    type Output = Fixed;
    #[inline]
    fn mul(self, rhs: Fixed) -> Fixed {
        Fixed::saturate((self.0 as i64 * rhs.0 as i64) >> FIXED_SHIFT)
    }
}

impl Div for Fixed {
    type Output = Fixed;
    #[inline]
    fn div(self, rhs: Fixed) -> Fixed {
        if rhs.0 == 0 {
            return Fixed::MAX;
        }
        Fixed::saturate(((self.0 as i64) << FIXED_SHIFT) / rhs.0 as i64)
    }
}

impl Neg for Fixed {
    type Output = Fixed;
    #[inline]
    fn neg(self) -> Fixed {
        Fixed(self.0.saturating_neg())
    }
}

impl AddAssign for Fixed {
    #[inline]
    fn add_assign(&mut self, rhs: Fixed) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fixed {
    #[inline]
    fn sub_assign(&mut self, rhs: Fixed) {
        *self = *self - rhs;
    }
}

impl Scalar for Fixed {
    const ZERO: Self = Fixed::ZERO;
    const ONE: Self = Fixed::ONE;
    const MAX: Self = Fixed::MAX;
    const MIN_POSITIVE: Self = Fixed::MIN_POSITIVE;
    const PI: Self = Fixed(205_887);

    #[inline]
    fn from_f32(v: f32) -> Self {
        Fixed::saturate((v as f64 * FIXED_ONE_RAW as f64).round() as i64)
    }
    #[inline]
    fn to_f32(self) -> f32 {
        self.0 as f32 / FIXED_ONE_RAW as f32
    }
    #[inline]
    fn from_int(v: i32) -> Self {
        Fixed::saturate((v as i64) << FIXED_SHIFT)
    }
    #[inline]
    fn abs(self) -> Self {
        Fixed(self.0.saturating_abs())
    }
    fn sqrt(self) -> Self {
        if self.0 <= 0 {
            return Fixed::ZERO;
        }
        Fixed(isqrt((self.0 as u64) << FIXED_SHIFT) as i32)
    }
    #[inline]
    fn half(self) -> Self {
        Fixed(self.0 >> 1)
    }
}

// ============================================================================
// Build-time value type
// ============================================================================

/// The scalar used by clipping and primitive buffers.
#[cfg(not(feature = "fixed-point"))]
pub type Value = f32;

/// The scalar used by clipping and primitive buffers.
#[cfg(feature = "fixed-point")]
pub type Value = Fixed;

/// Shorthand for `Value::from_f32`.
#[inline]
pub fn value(v: f32) -> Value {
    <Value as Scalar>::from_f32(v)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_fixed_conversions() {
        assert_eq!(Fixed::from_int(3).raw(), 3 << 16);
        assert_abs_diff_eq!(Fixed::from_f32(1.25).to_f32(), 1.25);
        assert_abs_diff_eq!(Fixed::from_f32(-0.5).to_f32(), -0.5);
    }

    #[test]
    fn test_fixed_mul_div() {
        let a = Fixed::from_f32(2.5);
        let b = Fixed::from_f32(-4.0);
        assert_abs_diff_eq!((a * b).to_f32(), -10.0);
        assert_abs_diff_eq!((a / b).to_f32(), -0.625);
    }

    #[test]
    fn test_fixed_div_by_zero_saturates() {
        assert_eq!(Fixed::ONE / Fixed::ZERO, Fixed::MAX);
    }

    #[test]
    fn test_fixed_mul_saturates() {
        let big = Fixed::from_int(30_000);
        assert_eq!(big * big, Fixed::MAX);
        assert_eq!(-big * big, -Fixed::MAX);
    }

    #[test]
    fn test_fixed_add_saturates() {
        assert_eq!(Fixed::MAX + Fixed::ONE, Fixed::MAX);
        assert_eq!(-Fixed::MAX - Fixed::ONE, -Fixed::MAX);
    }

    #[test]
    fn test_fixed_sqrt() {
        assert_abs_diff_eq!(Fixed::from_int(16).sqrt().to_f32(), 4.0);
        assert_abs_diff_eq!(Fixed::from_f32(2.0).sqrt().to_f32(), 1.41421, epsilon = 1e-4);
        assert_eq!(Fixed::from_int(-4).sqrt(), Fixed::ZERO);
    }

    #[test]
    fn test_fixed_trig() {
        assert_abs_diff_eq!(Fixed::PI.to_f32(), core::f32::consts::PI, epsilon = 1e-4);
        assert_abs_diff_eq!(Fixed::ZERO.cos().to_f32(), 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(Fixed::ONE.atan2(Fixed::ONE).to_f32(), 0.785398, epsilon = 1e-4);
    }

    #[test]
    fn test_default_tolerance_is_positive() {
        assert!(Fixed::default_tolerance() > Fixed::ZERO);
        assert!(f32::default_tolerance() > 0.0);
    }

    #[test]
    fn test_div_or_max() {
        assert_eq!(1.0f32.div_or_max(0.0), f32::MAX);
        assert_eq!(6.0f32.div_or_max(2.0), 3.0);
        assert_eq!(0.0f32.recip_or_max(), f32::MAX);
        assert_eq!(4.0f32.recip_or_max(), 0.25);
    }
}
