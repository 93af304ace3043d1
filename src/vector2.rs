//! 2D vector.
//!
//! Vectors are position vectors from the origin. All binary operators return
//! new values; only the compound-assignment operators modify in place.
//!
//! Division never faults: a zero divisor produces [`Scalar::MAX`] in the
//! affected components.

use crate::scalar::{Fixed, Scalar, Value};
use core::ops::{Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

/// 2D vector with `x` and `y` components.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2<T = Value> {
    pub x: T,
    pub y: T,
}

impl<T: Scalar> Vector2<T> {
    pub const ZERO: Self = Self {
        x: T::ZERO,
        y: T::ZERO,
    };
    pub const UNIT_X: Self = Self {
        x: T::ONE,
        y: T::ZERO,
    };
    pub const UNIT_Y: Self = Self {
        x: T::ZERO,
        y: T::ONE,
    };

    #[inline]
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    pub fn from_array(a: [T; 2]) -> Self {
        Self::new(a[0], a[1])
    }

    pub fn to_array(self) -> [T; 2] {
        [self.x, self.y]
    }

    /// Euclidean length.
    #[inline]
    pub fn length(&self) -> T {
        self.squared_length().sqrt()
    }

    #[inline]
    pub fn squared_length(&self) -> T {
        self.x * self.x + self.y * self.y
    }

    #[inline]
    pub fn dot(&self, v: &Self) -> T {
        self.x * v.x + self.y * v.y
    }

    /// 2D cross product: the signed area of the parallelogram spanned by
    /// `self` and `v` (`x1*y2 - y1*x2`).
    #[inline]
    pub fn cross(&self, v: &Self) -> T {
        self.x * v.y - self.y * v.x
    }

    /// Unit vector in the direction of `self`.
    ///
    /// If the length is below `tolerance` the result is exactly
    /// [`Vector2::UNIT_X`], which is not related to the input direction.
    pub fn unitize(&self, tolerance: T) -> Self {
        let len = self.length();
        if len < tolerance {
            return Self::UNIT_X;
        }
        *self / len
    }

    /// Vector rotated clockwise by 90 degrees: `(y, -x)`.
    #[inline]
    pub fn orthogonal(&self) -> Self {
        Self::new(self.y, -self.x)
    }

    #[inline]
    pub fn scale(&self, s: T) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    /// Component-wise product.
    #[inline]
    pub fn mul_elements(&self, v: &Self) -> Self {
        Self::new(self.x * v.x, self.y * v.y)
    }

    /// Component-wise quotient; zero divisor components yield `MAX`.
    #[inline]
    pub fn div_elements(&self, v: &Self) -> Self {
        Self::new(self.x.div_or_max(v.x), self.y.div_or_max(v.y))
    }
}

impl<T: Scalar> Add for Vector2<T> {
    type Output = Self;
    #[inline]
    fn add(self, v: Self) -> Self {
        Self::new(self.x + v.x, self.y + v.y)
    }
}

impl<T: Scalar> Sub for Vector2<T> {
    type Output = Self;
    #[inline]
    fn sub(self, v: Self) -> Self {
        Self::new(self.x - v.x, self.y - v.y)
    }
}

impl<T: Scalar> Neg for Vector2<T> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl<T: Scalar> Mul<T> for Vector2<T> {
    type Output = Self;
    #[inline]
    fn mul(self, s: T) -> Self {
        self.scale(s)
    }
}

impl<T: Scalar> Div<T> for Vector2<T> {
    type Output = Self;
    fn div(self, s: T) -> Self {
        if s == T::ZERO {
            return Self::new(T::MAX, T::MAX);
        }
        Self::new(self.x / s, self.y / s)
    }
}

impl<T: Scalar> AddAssign for Vector2<T> {
    #[inline]
    fn add_assign(&mut self, v: Self) {
        self.x += v.x;
        self.y += v.y;
    }
}

impl<T: Scalar> SubAssign for Vector2<T> {
    #[inline]
    fn sub_assign(&mut self, v: Self) {
        self.x -= v.x;
        self.y -= v.y;
    }
}

impl<T: Scalar> MulAssign<T> for Vector2<T> {
    #[inline]
    fn mul_assign(&mut self, s: T) {
        *self = self.scale(s);
    }
}

impl<T: Scalar> DivAssign<T> for Vector2<T> {
    #[inline]
    fn div_assign(&mut self, s: T) {
        *self = *self / s;
    }
}

impl<T> Index<usize> for Vector2<T> {
    type Output = T;
    fn index(&self, i: usize) -> &T {
        match i {
            0 => &self.x,
            1 => &self.y,
            _ => panic!("Vector2 index {} out of range", i),
        }
    }
}

impl<T> IndexMut<usize> for Vector2<T> {
    fn index_mut(&mut self, i: usize) -> &mut T {
        match i {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => panic!("Vector2 index {} out of range", i),
        }
    }
}

macro_rules! impl_scalar_mul_vector2 {
    ($($t:ty),*) => {$(
        impl Mul<Vector2<$t>> for $t {
            type Output = Vector2<$t>;
            #[inline]
            fn mul(self, v: Vector2<$t>) -> Vector2<$t> {
                v.scale(self)
            }
        }
    )*};
}

impl_scalar_mul_vector2!(f32, f64, Fixed);

// ============================================================================
// Tests
// ============================================================================
