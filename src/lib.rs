//! # embgfx
//!
//! Geometry and resource core for embedded 2D/3D user interfaces: the parts
//! that sit between application code and the rasterizer.
//!
//! - Fixed-point (16.16) or `f32` scalars, selected at build time
//! - 2D/3D vectors and 2x2/3x3 matrices with Euler and axis-angle conversion
//! - Rectangular and depth-range clipping of lines, polylines and polygons
//! - Primitive buffers with 2D/3D transform and perspective projection
//! - Image cache with pluggable replacement policies
//!
//! ## Architecture
//!
//! Geometry flows through three stages:
//!
//! 1. **Primitive**: typed vertex, attribute and index buffers
//! 2. **Transform / Project**: matrices applied into the transformed buffer
//! 3. **Clipper**: cuts the result to the screen region and depth range
//!
//! Independently, the **image cache** keeps loaded bitmaps within a byte
//! budget, asking a replacement policy which image to unload next.
//!
//! All types are single-threaded.

// Scalars & Math
pub mod basics;
pub mod matrix2;
pub mod matrix3;
pub mod scalar;
pub mod vector2;
pub mod vector3;

// Clipping
pub mod clipper;

// Primitive Buffers
pub mod heap;
pub mod primitive;

// Image Cache
pub mod config;
pub mod error;
pub mod image_cache;
pub mod replacement;
