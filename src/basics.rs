//! Foundation types shared by the clipper and the primitive buffers.

use crate::scalar::Scalar;

// ============================================================================
// Rect
// ============================================================================

/// An axis-aligned rectangle defined by its min and max corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<T: Copy> {
    pub x1: T,
    pub y1: T,
    pub x2: T,
    pub y2: T,
}

impl<T: Copy + PartialOrd> Rect<T> {
    pub fn new(x1: T, y1: T, x2: T, y2: T) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Normalize so that x1 <= x2 and y1 <= y2, swapping if needed.
    pub fn normalize(&mut self) -> &Self {
        if self.x1 > self.x2 {
            core::mem::swap(&mut self.x1, &mut self.x2);
        }
        if self.y1 > self.y2 {
            core::mem::swap(&mut self.y1, &mut self.y2);
        }
        self
    }
}

impl<T: Scalar> Rect<T> {
    /// Move the min edges by (`dx1`, `dy1`) and the max edges by (`dx2`, `dy2`).
    pub fn offset_edges(&self, dx1: T, dy1: T, dx2: T, dy2: T) -> Self {
        Self::new(self.x1 + dx1, self.y1 + dy1, self.x2 + dx2, self.y2 + dy2)
    }

    /// Grow the rectangle by `margin` on every side.
    pub fn expand(&self, margin: T) -> Self {
        self.offset_edges(-margin, -margin, margin, margin)
    }
}

// ============================================================================
// Tests
// ============================================================================
