//! 3D vector.

use crate::scalar::{Fixed, Scalar, Value};
use crate::vector2::Vector2;
use core::ops::{Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

/// 3D vector with `x`, `y` and `z` components.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3<T = Value> {
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T: Scalar> Vector3<T> {
    pub const ZERO: Self = Self::new(T::ZERO, T::ZERO, T::ZERO);
    pub const UNIT_X: Self = Self::new(T::ONE, T::ZERO, T::ZERO);
    pub const UNIT_Y: Self = Self::new(T::ZERO, T::ONE, T::ZERO);
    pub const UNIT_Z: Self = Self::new(T::ZERO, T::ZERO, T::ONE);

    #[inline]
    pub const fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(a: [T; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    pub fn to_array(self) -> [T; 3] {
        [self.x, self.y, self.z]
    }

    /// Extend a 2D vector with the given depth.
    pub fn from_vector2(v: Vector2<T>, z: T) -> Self {
        Self::new(v.x, v.y, z)
    }

    /// Drop the z component.
    pub fn xy(&self) -> Vector2<T> {
        Vector2::new(self.x, self.y)
    }

    #[inline]
    pub fn length(&self) -> T {
        self.squared_length().sqrt()
    }

    #[inline]
    pub fn squared_length(&self) -> T {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    #[inline]
    pub fn dot(&self, v: &Self) -> T {
        self.x * v.x + self.y * v.y + self.z * v.z
    }

    /// Cross product, perpendicular to both operands (right-handed).
    #[inline]
    pub fn cross(&self, v: &Self) -> Self {
        Self::new(
            self.y * v.z - self.z * v.y,
            self.z * v.x - self.x * v.z,
            self.x * v.y - self.y * v.x,
        )
    }

    /// Unitized cross product.
    pub fn unit_cross(&self, v: &Self, tolerance: T) -> Self {
        self.cross(v).unitize(tolerance)
    }

    /// Unit vector in the direction of `self`, or exactly
    /// [`Vector3::UNIT_X`] when the length is below `tolerance`.
    pub fn unitize(&self, tolerance: T) -> Self {
        let len = self.length();
        if len < tolerance {
            return Self::UNIT_X;
        }
        *self / len
    }

    #[inline]
    pub fn scale(&self, s: T) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    #[inline]
    pub fn mul_elements(&self, v: &Self) -> Self {
        Self::new(self.x * v.x, self.y * v.y, self.z * v.z)
    }

    /// Component-wise quotient; zero divisor components yield `MAX`.
    #[inline]
    pub fn div_elements(&self, v: &Self) -> Self {
        Self::new(
            self.x.div_or_max(v.x),
            self.y.div_or_max(v.y),
            self.z.div_or_max(v.z),
        )
    }
}

impl<T: Scalar> Add for Vector3<T> {
    type Output = Self;
    #[inline]
    fn add(self, v: Self) -> Self {
        Self::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }
}

impl<T: Scalar> Sub for Vector3<T> {
    type Output = Self;
    #[inline]
    fn sub(self, v: Self) -> Self {
        Self::new(self.x - v.x, self.y - v.y, self.z - v.z)
    }
}

impl<T: Scalar> Neg for Vector3<T> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl<T: Scalar> Mul<T> for Vector3<T> {
    type Output = Self;
    #[inline]
    fn mul(self, s: T) -> Self {
        self.scale(s)
    }
}

impl<T: Scalar> Div<T> for Vector3<T> {
    type Output = Self;
    fn div(self, s: T) -> Self {
        if s == T::ZERO {
            return Self::new(T::MAX, T::MAX, T::MAX);
        }
        Self::new(self.x / s, self.y / s, self.z / s)
    }
}

impl<T: Scalar> AddAssign for Vector3<T> {
    #[inline]
    fn add_assign(&mut self, v: Self) {
        self.x += v.x;
        self.y += v.y;
        self.z += v.z;
    }
}

impl<T: Scalar> SubAssign for Vector3<T> {
    #[inline]
    fn sub_assign(&mut self, v: Self) {
        self.x -= v.x;
        self.y -= v.y;
        self.z -= v.z;
    }
}

impl<T: Scalar> MulAssign<T> for Vector3<T> {
    #[inline]
    fn mul_assign(&mut self, s: T) {
        *self = self.scale(s);
    }
}

impl<T: Scalar> DivAssign<T> for Vector3<T> {
    #[inline]
    fn div_assign(&mut self, s: T) {
        *self = *self / s;
    }
}

impl<T> Index<usize> for Vector3<T> {
    type Output = T;
    fn index(&self, i: usize) -> &T {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vector3 index {} out of range", i),
        }
    }
}

impl<T> IndexMut<usize> for Vector3<T> {
    fn index_mut(&mut self, i: usize) -> &mut T {
        match i {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("Vector3 index {} out of range", i),
        }
    }
}

macro_rules! impl_scalar_mul_vector3 {
    ($($t:ty),*) => {$(
        impl Mul<Vector3<$t>> for $t {
            type Output = Vector3<$t>;
            #[inline]
            fn mul(self, v: Vector3<$t>) -> Vector3<$t> {
                v.scale(self)
            }
        }
    )*};
}

impl_scalar_mul_vector3!(f32, f64, Fixed);
