//! Rectangular and depth-range clipping.
//!
//! Outcode classification plus Liang-Barsky parametric clipping for line
//! segments, Sutherland-Hodgman for polygons, and the one-dimensional
//! analogues against a `[min, max]` depth range.
//!
//! A [`Clipper`] is bound to a [`ClipRegion`] (and optionally a
//! [`ClipRange`]) once and then used for any number of clip calls. Screen
//! coordinates grow downwards, so `TOP` means `y < ymin`:
//!
//! ```text
//!        |        |
//!  0110  |  0010  | 0011
//!        |        |
//! -------+--------+-------- ymin
//!        |        |
//!  0100  |  0000  | 0001
//!        |        |
//! -------+--------+-------- ymax
//!        |        |
//!  1100  |  1000  | 1001
//!        |        |
//!      xmin     xmax
//! ```
//!
//! Points exactly on a boundary are inside, so adjacent polygons sharing an
//! edge both keep it.

use crate::basics::Rect;
use crate::scalar::{value, Scalar, Value};
use crate::vector2::Vector2;
use crate::vector3::Vector3;
use core::ops::{BitAnd, BitOr, BitOrAssign};

// ============================================================================
// Codes and flags
// ============================================================================

pub const REGION_INSIDE: u32 = 0;
pub const REGION_RIGHT: u32 = 1;
pub const REGION_TOP: u32 = 2;
pub const REGION_LEFT: u32 = 4;
pub const REGION_BOTTOM: u32 = 8;

pub const PLANE_NONE: u32 = 0;
pub const PLANE_MIN: u32 = 1;
pub const PLANE_MAX: u32 = 2;

/// Default boundary tolerance.
pub fn default_epsilon() -> Value {
    value(1e-4)
}

/// Result of a clip operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClipFlags(u32);

impl ClipFlags {
    pub const NOT_VISIBLE: ClipFlags = ClipFlags(0);
    /// Entirely inside, points untouched.
    pub const VISIBLE: ClipFlags = ClipFlags(1);
    /// Partly inside, points moved onto the boundary.
    pub const CLIPPED: ClipFlags = ClipFlags(2);
    /// A result point lies outside the nominal region and must be clipped
    /// per pixel by the renderer.
    pub const OUT_OF_BOUND: ClipFlags = ClipFlags(4);
    /// An input point exceeded the overflow protection margin.
    pub const OVERFLOW: ClipFlags = ClipFlags(8);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        ClipFlags(bits)
    }

    pub const fn contains(self, other: ClipFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` for `VISIBLE` or `CLIPPED` results.
    pub const fn is_visible(self) -> bool {
        self.0 & (Self::VISIBLE.0 | Self::CLIPPED.0) != 0
    }
}

impl BitOr for ClipFlags {
    type Output = ClipFlags;
    fn bitor(self, rhs: ClipFlags) -> ClipFlags {
        ClipFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ClipFlags {
    fn bitor_assign(&mut self, rhs: ClipFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ClipFlags {
    type Output = ClipFlags;
    fn bitand(self, rhs: ClipFlags) -> ClipFlags {
        ClipFlags(self.0 & rhs.0)
    }
}

// ============================================================================
// Region, range, per-call bounds
// ============================================================================

/// Immutable rectangular clip region with a boundary tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRegion {
    rect: Rect<Value>,
    epsilon: Value,
}

impl ClipRegion {
    /// Region from `Value` coordinates. Min and max are swapped if needed.
    pub fn new(xmin: Value, ymin: Value, xmax: Value, ymax: Value, epsilon: Value) -> Self {
        let mut rect = Rect::new(xmin, ymin, xmax, ymax);
        rect.normalize();
        Self {
            rect,
            epsilon: epsilon.abs(),
        }
    }

    /// Region from integer pixel coordinates.
    pub fn from_int(xmin: i32, ymin: i32, xmax: i32, ymax: i32, epsilon: Value) -> Self {
        Self::new(
            Value::from_int(xmin),
            Value::from_int(ymin),
            Value::from_int(xmax),
            Value::from_int(ymax),
            epsilon,
        )
    }

    pub fn xmin(&self) -> Value {
        self.rect.x1
    }

    pub fn ymin(&self) -> Value {
        self.rect.y1
    }

    pub fn xmax(&self) -> Value {
        self.rect.x2
    }

    pub fn ymax(&self) -> Value {
        self.rect.y2
    }

    pub fn epsilon(&self) -> Value {
        self.epsilon
    }

    pub fn rect(&self) -> &Rect<Value> {
        &self.rect
    }
}

/// Depth range `[min, max]` for z-clipping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRange {
    min: Value,
    max: Value,
    epsilon: Value,
}

impl ClipRange {
    pub fn new(min: Value, max: Value, epsilon: Value) -> Self {
        let (min, max) = if max < min { (max, min) } else { (min, max) };
        Self {
            min,
            max,
            epsilon: epsilon.abs(),
        }
    }

    pub fn from_int(min: i32, max: i32, epsilon: Value) -> Self {
        Self::new(Value::from_int(min), Value::from_int(max), epsilon)
    }

    pub fn min(&self) -> Value {
        self.min
    }

    pub fn max(&self) -> Value {
        self.max
    }

    pub fn epsilon(&self) -> Value {
        self.epsilon
    }

    /// Plane code of a depth value (strict, boundary is inside).
    pub fn classify(&self, z: Value) -> u32 {
        if z < self.min {
            PLANE_MIN
        } else if z > self.max {
            PLANE_MAX
        } else {
            PLANE_NONE
        }
    }

    /// Clip a 3D segment to the range, moving the endpoints in place and
    /// returning the parameters along the original segment.
    pub fn clip_segment(&self, start: &mut Vector3, end: &mut Vector3) -> (ClipFlags, Value, Value) {
        let c0 = self.classify(start.z);
        let c1 = self.classify(end.z);
        if c0 | c1 == PLANE_NONE {
            return (ClipFlags::VISIBLE, Value::ZERO, Value::ONE);
        }
        if c0 & c1 != 0 {
            return (ClipFlags::NOT_VISIBLE, Value::ZERO, Value::ZERO);
        }

        let swapped = end.z < start.z;
        let (p0, p1) = if swapped { (*end, *start) } else { (*start, *end) };
        let d = p1 - p0;
        let mut t0 = Value::ZERO;
        let mut t1 = Value::ONE;
        let mut q0 = p0;
        let mut q1 = p1;
        if p0.z < self.min {
            t0 = (self.min - p0.z) / d.z;
            q0 = p0 + d * t0;
            q0.z = self.min;
        }
        if p1.z > self.max {
            t1 = (self.max - p0.z) / d.z;
            q1 = p0 + d * t1;
            q1.z = self.max;
        }

        if swapped {
            *start = q1;
            *end = q0;
            (ClipFlags::CLIPPED, Value::ONE - t1, Value::ONE - t0)
        } else {
            *start = q0;
            *end = q1;
            (ClipFlags::CLIPPED, t0, t1)
        }
    }

    /// Clip an open or closed polyline to the range into `dest`.
    ///
    /// Stretches outside the range are replaced by a run along the crossed
    /// plane. Fewer than two surviving points give `NOT_VISIBLE` with `dest`
    /// empty.
    pub fn clip_polyline(&self, source: &[Vector3], closed: bool, dest: &mut Vec<Vector3>) -> ClipFlags {
        dest.clear();
        if source.len() < 2 {
            return ClipFlags::NOT_VISIBLE;
        }

        let mut any = PLANE_NONE;
        let mut all = PLANE_MIN | PLANE_MAX;
        for p in source {
            let c = self.classify(p.z);
            any |= c;
            all &= c;
        }
        if any == PLANE_NONE {
            dest.extend_from_slice(source);
            return ClipFlags::VISIBLE;
        }
        if all != 0 {
            return ClipFlags::NOT_VISIBLE;
        }

        let (min, max) = (self.min, self.max);
        let near = z_clip_chain(source, closed, |z| z >= min, min, self.epsilon);
        let both = z_clip_chain(&near, closed, |z| z <= max, max, self.epsilon);
        if both.len() < 2 {
            return ClipFlags::NOT_VISIBLE;
        }
        *dest = both;
        ClipFlags::CLIPPED
    }
}

/// Per-call edge offsets for anti-aliased clipping: the effective rectangle
/// is `(xmin + x1, ymin + y1) - (xmax + x2, ymax + y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelBounds {
    pub x1: Value,
    pub y1: Value,
    pub x2: Value,
    pub y2: Value,
}

impl PixelBounds {
    pub fn new(x1: Value, y1: Value, x2: Value, y2: Value) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Bounds that grow the region by `margin` on every side.
    pub fn uniform(margin: Value) -> Self {
        Self::new(-margin, -margin, margin, margin)
    }
}

// ============================================================================
// Segment clipping core
// ============================================================================

#[inline]
fn outcode(p: &Vector2, r: &Rect<Value>) -> u32 {
    ((p.x > r.x2) as u32)
        | (((p.y < r.y1) as u32) << 1)
        | (((p.x < r.x1) as u32) << 2)
        | (((p.y > r.y2) as u32) << 3)
}

#[inline]
fn lex_less(a: &Vector2, b: &Vector2) -> bool {
    a.x < b.x || (a.x == b.x && a.y < b.y)
}

enum SegmentClip {
    Inside,
    Outside,
    Clipped {
        start: Vector2,
        end: Vector2,
        t_start: Value,
        t_end: Value,
    },
}

/// Liang-Barsky against `r`. Endpoints are processed in lexicographic order
/// so that both directions of a segment produce identical points.
fn clip_segment(a: Vector2, b: Vector2, r: &Rect<Value>) -> SegmentClip {
    let c0 = outcode(&a, r);
    let c1 = outcode(&b, r);
    if c0 | c1 == REGION_INSIDE {
        return SegmentClip::Inside;
    }
    if c0 & c1 != 0 {
        return SegmentClip::Outside;
    }

    let swapped = lex_less(&b, &a);
    let (p0, p1) = if swapped { (b, a) } else { (a, b) };
    let d = p1 - p0;

    let mut t0 = Value::ZERO;
    let mut t1 = Value::ONE;
    let mut enter = REGION_INSIDE;
    let mut leave = REGION_INSIDE;

    let planes = [
        (REGION_LEFT, -d.x, p0.x - r.x1),
        (REGION_RIGHT, d.x, r.x2 - p0.x),
        (REGION_TOP, -d.y, p0.y - r.y1),
        (REGION_BOTTOM, d.y, r.y2 - p0.y),
    ];
    for &(code, p, q) in planes.iter() {
        if p == Value::ZERO {
            if q < Value::ZERO {
                return SegmentClip::Outside;
            }
            continue;
        }
        let t = q / p;
        if p < Value::ZERO {
            if t > t1 {
                return SegmentClip::Outside;
            }
            if t > t0 {
                t0 = t;
                enter = code;
            }
        } else {
            if t < t0 {
                return SegmentClip::Outside;
            }
            if t < t1 {
                t1 = t;
                leave = code;
            }
        }
    }

    let q0 = if enter != REGION_INSIDE {
        snap(p0 + d * t0, enter, r)
    } else {
        p0
    };
    let q1 = if leave != REGION_INSIDE {
        snap(p0 + d * t1, leave, r)
    } else {
        p1
    };

    if swapped {
        SegmentClip::Clipped {
            start: q1,
            end: q0,
            t_start: Value::ONE - t1,
            t_end: Value::ONE - t0,
        }
    } else {
        SegmentClip::Clipped {
            start: q0,
            end: q1,
            t_start: t0,
            t_end: t1,
        }
    }
}

/// Put the crossed coordinate exactly on the boundary and keep the other one
/// within the region.
#[inline]
fn snap(mut p: Vector2, code: u32, r: &Rect<Value>) -> Vector2 {
    match code {
        REGION_LEFT => p.x = r.x1,
        REGION_RIGHT => p.x = r.x2,
        REGION_TOP => p.y = r.y1,
        REGION_BOTTOM => p.y = r.y2,
        _ => {}
    }
    p.x = p.x.max_of(r.x1).min_of(r.x2);
    p.y = p.y.max_of(r.y1).min_of(r.y2);
    p
}

// ============================================================================
// Polygon clipping helpers
// ============================================================================

#[derive(Clone, Copy)]
enum Edge {
    Left(Value),
    Right(Value),
    Top(Value),
    Bottom(Value),
}

impl Edge {
    #[inline]
    fn inside(&self, p: &Vector2) -> bool {
        match *self {
            Edge::Left(x) => p.x >= x,
            Edge::Right(x) => p.x <= x,
            Edge::Top(y) => p.y >= y,
            Edge::Bottom(y) => p.y <= y,
        }
    }

    /// Crossing point of `a`-`b` with this edge, computed in a fixed
    /// endpoint order.
    fn intersect(&self, a: &Vector2, b: &Vector2) -> Vector2 {
        let (p, q) = if lex_less(b, a) { (b, a) } else { (a, b) };
        let d = *q - *p;
        match *self {
            Edge::Left(x) | Edge::Right(x) => {
                let t = (x - p.x).div_or_max(d.x);
                Vector2::new(x, p.y + d.y * t)
            }
            Edge::Top(y) | Edge::Bottom(y) => {
                let t = (y - p.y).div_or_max(d.y);
                Vector2::new(p.x + d.x * t, y)
            }
        }
    }
}

fn push_distinct(out: &mut Vec<Vector2>, p: Vector2, eps: Value) {
    if let Some(last) = out.last() {
        if (last.x - p.x).abs() < eps && (last.y - p.y).abs() < eps {
            return;
        }
    }
    out.push(p);
}

fn close_distinct(out: &mut Vec<Vector2>, eps: Value) {
    while out.len() > 1 {
        let (first, last) = (out[0], out[out.len() - 1]);
        if (last.x - first.x).abs() < eps && (last.y - first.y).abs() < eps {
            out.pop();
        } else {
            break;
        }
    }
}

fn clip_against_edge(input: &[Vector2], edge: Edge, eps: Value) -> Vec<Vector2> {
    let mut out = Vec::with_capacity(input.len() + 2);
    let n = input.len();
    for i in 0..n {
        let cur = input[i];
        let prev = input[(i + n - 1) % n];
        let cur_in = edge.inside(&cur);
        let prev_in = edge.inside(&prev);
        if cur_in {
            if !prev_in {
                push_distinct(&mut out, edge.intersect(&prev, &cur), eps);
            }
            push_distinct(&mut out, cur, eps);
        } else if prev_in {
            push_distinct(&mut out, edge.intersect(&prev, &cur), eps);
        }
    }
    close_distinct(&mut out, eps);
    out
}

// ============================================================================
// Depth clipping helpers
// ============================================================================

/// Point on `a`-`b` at depth `z`, computed from the nearer-z endpoint.
fn z_intersect(a: &Vector3, b: &Vector3, z: Value) -> Vector3 {
    let (p, q) = if b.z < a.z { (b, a) } else { (a, b) };
    let d = *q - *p;
    let t = (z - p.z).div_or_max(d.z);
    Vector3::new(p.x + d.x * t, p.y + d.y * t, z)
}

fn push_distinct3(out: &mut Vec<Vector3>, p: Vector3, eps: Value) {
    if let Some(last) = out.last() {
        let d = *last - p;
        if d.x.abs() < eps && d.y.abs() < eps && d.z.abs() < eps {
            return;
        }
    }
    out.push(p);
}

/// One pass of chain clipping against a depth plane. Closed chains wrap
/// around; open chains do not.
fn z_clip_chain(
    input: &[Vector3],
    closed: bool,
    keep: impl Fn(Value) -> bool,
    plane: Value,
    eps: Value,
) -> Vec<Vector3> {
    let mut out = Vec::with_capacity(input.len() + 2);
    let n = input.len();
    for i in 0..n {
        let cur = input[i];
        let cur_in = keep(cur.z);
        let prev = if i > 0 {
            Some(input[i - 1])
        } else if closed {
            Some(input[n - 1])
        } else {
            None
        };
        if let Some(prev) = prev {
            if keep(prev.z) != cur_in {
                push_distinct3(&mut out, z_intersect(&prev, &cur, plane), eps);
            }
        }
        if cur_in {
            push_distinct3(&mut out, cur, eps);
        }
    }
    out
}

// ============================================================================
// Clipper
// ============================================================================

/// Clipping context: a region, an optional depth range and an overflow
/// protection margin.
#[derive(Debug, Clone, PartialEq)]
pub struct Clipper {
    region: ClipRegion,
    range: Option<ClipRange>,
    overflow_margin: Value,
}

impl Clipper {
    pub fn new(region: ClipRegion) -> Self {
        Self {
            region,
            range: None,
            overflow_margin: Value::ZERO,
        }
    }

    pub fn with_range(region: ClipRegion, range: ClipRange) -> Self {
        Self {
            region,
            range: Some(range),
            overflow_margin: Value::ZERO,
        }
    }

    pub fn region(&self) -> &ClipRegion {
        &self.region
    }

    pub fn set_region(&mut self, region: ClipRegion) {
        self.region = region;
    }

    pub fn range(&self) -> Option<&ClipRange> {
        self.range.as_ref()
    }

    pub fn set_range(&mut self, range: ClipRange) {
        self.range = Some(range);
    }

    pub fn overflow_margin(&self) -> Value {
        self.overflow_margin
    }

    /// Distance outside the region beyond which input points are reported
    /// as `OVERFLOW`. Zero disables the check.
    pub fn set_overflow_margin(&mut self, margin: Value) {
        self.overflow_margin = margin.abs();
    }

    // ------------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------------

    /// Strict outcode; a point on a boundary is inside for that boundary.
    #[inline]
    pub fn quick_classify_point(&self, p: &Vector2) -> u32 {
        outcode(p, &self.region.rect)
    }

    /// Outcode against the region grown by epsilon.
    pub fn classify_point(&self, p: &Vector2) -> u32 {
        outcode(p, &self.region.rect.expand(self.region.epsilon))
    }

    /// Bits of `code` whose edge `p` lies exactly on.
    pub fn border_classify(&self, p: &Vector2, code: u32) -> u32 {
        let r = &self.region.rect;
        let mut on = REGION_INSIDE;
        if code & REGION_RIGHT != 0 && p.x == r.x2 {
            on |= REGION_RIGHT;
        }
        if code & REGION_TOP != 0 && p.y == r.y1 {
            on |= REGION_TOP;
        }
        if code & REGION_LEFT != 0 && p.x == r.x1 {
            on |= REGION_LEFT;
        }
        if code & REGION_BOTTOM != 0 && p.y == r.y2 {
            on |= REGION_BOTTOM;
        }
        on
    }

    fn overflow_flag(&self, start: &Vector2, end: &Vector2) -> ClipFlags {
        if self.overflow_margin == Value::ZERO {
            return ClipFlags::NOT_VISIBLE;
        }
        let guard = self.region.rect.expand(self.overflow_margin);
        if outcode(start, &guard) | outcode(end, &guard) != REGION_INSIDE {
            ClipFlags::OVERFLOW
        } else {
            ClipFlags::NOT_VISIBLE
        }
    }

    fn apply(
        &self,
        start: &mut Vector2,
        end: &mut Vector2,
        rect: &Rect<Value>,
    ) -> (ClipFlags, Value, Value) {
        match clip_segment(*start, *end, rect) {
            SegmentClip::Inside => (ClipFlags::VISIBLE, Value::ZERO, Value::ONE),
            SegmentClip::Outside => (ClipFlags::NOT_VISIBLE, Value::ZERO, Value::ZERO),
            SegmentClip::Clipped {
                start: s,
                end: e,
                t_start,
                t_end,
            } => {
                let flags = ClipFlags::CLIPPED | self.overflow_flag(start, end);
                *start = s;
                *end = e;
                (flags, t_start, t_end)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Lines
    // ------------------------------------------------------------------------

    /// Clip a segment to the region, moving the endpoints in place.
    ///
    /// `VISIBLE` and `NOT_VISIBLE` leave the points untouched. `CLIPPED`
    /// moves them exactly onto the crossed boundaries and may carry
    /// `OVERFLOW`.
    pub fn clip_line(&self, start: &mut Vector2, end: &mut Vector2) -> ClipFlags {
        self.apply(start, end, &self.region.rect).0
    }

    /// Clip against the region offset by `bounds`, leaving the region itself
    /// unchanged. Adds `OUT_OF_BOUND` if a result point lies outside the
    /// nominal region.
    pub fn clip_line_aa(
        &self,
        start: &mut Vector2,
        end: &mut Vector2,
        bounds: PixelBounds,
    ) -> ClipFlags {
        let rect = self
            .region
            .rect
            .offset_edges(bounds.x1, bounds.y1, bounds.x2, bounds.y2);
        let (mut flags, _, _) = self.apply(start, end, &rect);
        if flags.is_visible()
            && (self.quick_classify_point(start) | self.quick_classify_point(end)) != REGION_INSIDE
        {
            flags |= ClipFlags::OUT_OF_BOUND;
        }
        flags
    }

    /// Same decision as [`Clipper::clip_line`] without modifying anything.
    pub fn is_line_visible(&self, start: &Vector2, end: &Vector2) -> bool {
        !matches!(
            clip_segment(*start, *end, &self.region.rect),
            SegmentClip::Outside
        )
    }

    /// Like [`Clipper::clip_line`], also returning the parameters of the
    /// clipped endpoints along the original segment. `VISIBLE` yields
    /// `(0, 1)`, `NOT_VISIBLE` yields `(0, 0)`.
    pub fn clip_line_para(&self, start: &mut Vector2, end: &mut Vector2) -> (ClipFlags, Value, Value) {
        self.apply(start, end, &self.region.rect)
    }

    // ------------------------------------------------------------------------
    // Polygons
    // ------------------------------------------------------------------------

    /// Sutherland-Hodgman clip of a closed polygon.
    ///
    /// A polygon entirely inside is returned unchanged; one entirely outside
    /// gives an empty result. Consecutive output points closer than epsilon
    /// are merged.
    pub fn clip_polygon(&self, vertices: &[Vector2]) -> Vec<Vector2> {
        if vertices.is_empty() {
            return Vec::new();
        }
        let mut any = REGION_INSIDE;
        let mut all = !0u32;
        for v in vertices {
            let c = self.quick_classify_point(v);
            any |= c;
            all &= c;
        }
        if any == REGION_INSIDE {
            return vertices.to_vec();
        }
        if all != 0 {
            return Vec::new();
        }

        let r = &self.region.rect;
        let eps = self.region.epsilon;
        let mut poly = vertices.to_vec();
        for edge in [Edge::Left(r.x1), Edge::Right(r.x2), Edge::Top(r.y1), Edge::Bottom(r.y2)] {
            poly = clip_against_edge(&poly, edge, eps);
            if poly.is_empty() {
                break;
            }
        }
        if poly.len() < 3 {
            poly.clear();
        }
        poly
    }

    /// [`Clipper::clip_polygon`] over interleaved vertex data: `x` and `y`
    /// are the first two values of every `stride`-sized element.
    pub fn clip_polygon_strided(&self, data: &[Value], stride: usize) -> Vec<Vector2> {
        if stride < 2 {
            log::warn!("clip_polygon_strided: stride {} holds no 2D vertex", stride);
            return Vec::new();
        }
        let vertices: Vec<Vector2> = data
            .chunks_exact(stride)
            .map(|c| Vector2::new(c[0], c[1]))
            .collect();
        self.clip_polygon(&vertices)
    }

    // ------------------------------------------------------------------------
    // Depth
    // ------------------------------------------------------------------------

    fn z_apply(&self, start: &mut Vector3, end: &mut Vector3) -> (ClipFlags, Value, Value) {
        match self.range {
            Some(range) => range.clip_segment(start, end),
            None => {
                log::warn!("depth clip without a range; treating everything as visible");
                (ClipFlags::VISIBLE, Value::ZERO, Value::ONE)
            }
        }
    }

    /// Clip a 3D segment to the depth range, moving the endpoints in place.
    pub fn z_clip_line(&self, start: &mut Vector3, end: &mut Vector3) -> ClipFlags {
        self.z_apply(start, end).0
    }

    /// Depth clip returning the parameters along the original segment.
    pub fn z_clip_line_para(
        &self,
        start: &mut Vector3,
        end: &mut Vector3,
    ) -> (ClipFlags, Value, Value) {
        self.z_apply(start, end)
    }

    /// Depth clip of a polyline, see [`ClipRange::clip_polyline`].
    pub fn z_clip_polyline(
        &self,
        source: &[Vector3],
        closed: bool,
        dest: &mut Vec<Vector3>,
    ) -> ClipFlags {
        match self.range {
            Some(range) => range.clip_polyline(source, closed, dest),
            None => {
                log::warn!("depth clip without a range; treating everything as visible");
                dest.clear();
                if source.len() < 2 {
                    return ClipFlags::NOT_VISIBLE;
                }
                dest.extend_from_slice(source);
                ClipFlags::VISIBLE
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn v(x: f32, y: f32) -> Vector2 {
        Vector2::new(value(x), value(y))
    }

    fn v3(x: f32, y: f32, z: f32) -> Vector3 {
        Vector3::new(value(x), value(y), value(z))
    }

    fn clipper() -> Clipper {
        Clipper::new(ClipRegion::from_int(0, 0, 10, 10, default_epsilon()))
    }

    fn same_point(a: &Vector2, b: &Vector2) -> bool {
        (a.x - b.x).abs() <= value(1e-3) && (a.y - b.y).abs() <= value(1e-3)
    }

    // ------------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------------

    #[test]
    fn test_quick_classify_codes() {
        let c = clipper();
        assert_eq!(c.quick_classify_point(&v(5.0, 5.0)), REGION_INSIDE);
        assert_eq!(c.quick_classify_point(&v(11.0, 5.0)), REGION_RIGHT);
        assert_eq!(c.quick_classify_point(&v(5.0, -1.0)), REGION_TOP);
        assert_eq!(c.quick_classify_point(&v(-1.0, 5.0)), REGION_LEFT);
        assert_eq!(c.quick_classify_point(&v(5.0, 11.0)), REGION_BOTTOM);
        assert_eq!(
            c.quick_classify_point(&v(-1.0, -1.0)),
            REGION_LEFT | REGION_TOP
        );
    }

    #[test]
    fn test_boundary_points_are_inside() {
        let c = clipper();
        assert_eq!(c.quick_classify_point(&v(0.0, 0.0)), REGION_INSIDE);
        assert_eq!(c.quick_classify_point(&v(10.0, 10.0)), REGION_INSIDE);
        assert_eq!(c.quick_classify_point(&v(10.0, 3.0)), REGION_INSIDE);
    }

    #[test]
    fn test_classify_point_uses_epsilon() {
        let c = Clipper::new(ClipRegion::from_int(0, 0, 10, 10, value(0.5)));
        assert_eq!(c.classify_point(&v(10.25, 5.0)), REGION_INSIDE);
        assert_eq!(c.quick_classify_point(&v(10.25, 5.0)), REGION_RIGHT);
        assert_eq!(c.classify_point(&v(10.75, 5.0)), REGION_RIGHT);
    }

    #[test]
    fn test_border_classify() {
        let c = clipper();
        assert_eq!(
            c.border_classify(&v(10.0, 0.0), REGION_RIGHT | REGION_TOP),
            REGION_RIGHT | REGION_TOP
        );
        assert_eq!(c.border_classify(&v(10.0, 5.0), REGION_RIGHT | REGION_TOP), REGION_RIGHT);
        assert_eq!(c.border_classify(&v(12.0, 5.0), REGION_RIGHT), REGION_INSIDE);
    }

    #[test]
    fn test_region_normalizes_corners() {
        let r = ClipRegion::from_int(10, 10, 0, 0, default_epsilon());
        assert_eq!(r.xmin(), value(0.0));
        assert_eq!(r.ymax(), value(10.0));
    }

    // ------------------------------------------------------------------------
    // Lines
    // ------------------------------------------------------------------------

    #[test]
    fn test_inside_line_untouched() {
        let c = clipper();
        for (a, b) in [
            (v(1.0, 1.0), v(9.0, 9.0)),
            (v(0.0, 0.0), v(10.0, 10.0)),
            (v(0.0, 5.0), v(0.0, 7.0)),
            (v(3.5, 2.25), v(3.5, 2.25)),
        ] {
            let (mut s, mut e) = (a, b);
            assert_eq!(c.clip_line(&mut s, &mut e), ClipFlags::VISIBLE);
            assert_eq!((s, e), (a, b));
        }
    }

    #[test]
    fn test_trivial_reject_untouched() {
        let c = clipper();
        let (a, b) = (v(-5.0, -5.0), v(-1.0, -1.0));
        let (mut s, mut e) = (a, b);
        assert_eq!(c.clip_line(&mut s, &mut e), ClipFlags::NOT_VISIBLE);
        assert_eq!((s, e), (a, b));
        assert!(!c.is_line_visible(&a, &b));
    }

    #[test]
    fn test_clip_crossing_line() {
        let c = clipper();
        let mut s = v(-5.0, 5.0);
        let mut e = v(15.0, 5.0);
        assert_eq!(c.clip_line(&mut s, &mut e), ClipFlags::CLIPPED);
        assert_eq!(s, v(0.0, 5.0));
        assert_eq!(e, v(10.0, 5.0));
    }

    #[test]
    fn test_clip_diagonal_snaps_to_boundary() {
        let c = clipper();
        let mut s = v(-2.0, 3.0);
        let mut e = v(4.0, -3.0);
        assert_eq!(c.clip_line(&mut s, &mut e), ClipFlags::CLIPPED);
        assert_eq!(s.x, value(0.0));
        assert_eq!(e.y, value(0.0));
        assert!(same_point(&s, &v(0.0, 1.0)));
        assert!(same_point(&e, &v(1.0, 0.0)));
    }

    #[test]
    fn test_line_missing_corner_not_visible() {
        let c = clipper();
        // Codes share no bit but the segment passes outside the corner.
        let mut s = v(-2.0, 1.0);
        let mut e = v(1.0, -2.0);
        assert_eq!(c.clip_line(&mut s, &mut e), ClipFlags::NOT_VISIBLE);
        assert_eq!((s, e), (v(-2.0, 1.0), v(1.0, -2.0)));
        assert!(!c.is_line_visible(&v(-2.0, 1.0), &v(1.0, -2.0)));
    }

    #[test]
    fn test_clip_symmetry() {
        let c = Clipper::new(ClipRegion::new(
            value(-3.5),
            value(1.25),
            value(7.0),
            value(9.75),
            default_epsilon(),
        ));
        let segments = [
            (v(-10.0, -10.0), v(20.0, 17.0)),
            (v(-4.0, 5.0), v(3.0, 12.0)),
            (v(6.0, 0.0), v(6.5, 11.0)),
            (v(-7.3, 2.2), v(9.1, 8.4)),
            (v(1.0, 1.0), v(12.0, 3.0)),
        ];
        for (a, b) in segments {
            let (mut s1, mut e1) = (a, b);
            let (mut s2, mut e2) = (b, a);
            let f1 = c.clip_line(&mut s1, &mut e1);
            let f2 = c.clip_line(&mut s2, &mut e2);
            assert_eq!(f1, f2);
            assert_eq!(s1, e2);
            assert_eq!(e1, s2);
        }
    }

    #[test]
    fn test_clip_line_para() {
        let c = clipper();
        let mut s = v(-10.0, 5.0);
        let mut e = v(10.0, 5.0);
        let (flags, t0, t1) = c.clip_line_para(&mut s, &mut e);
        assert_eq!(flags, ClipFlags::CLIPPED);
        assert_abs_diff_eq!(t0.to_f32(), 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(t1.to_f32(), 1.0, epsilon = 1e-4);

        // Reversed direction reports parameters along the reversed segment.
        let mut s = v(10.0, 5.0);
        let mut e = v(-10.0, 5.0);
        let (_, t0, t1) = c.clip_line_para(&mut s, &mut e);
        assert_abs_diff_eq!(t0.to_f32(), 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(t1.to_f32(), 0.5, epsilon = 1e-4);

        let mut s = v(1.0, 1.0);
        let mut e = v(2.0, 2.0);
        let (flags, t0, t1) = c.clip_line_para(&mut s, &mut e);
        assert_eq!(flags, ClipFlags::VISIBLE);
        assert_eq!((t0, t1), (value(0.0), value(1.0)));
    }

    #[test]
    fn test_overflow_margin() {
        let mut c = clipper();
        c.set_overflow_margin(value(100.0));
        let mut s = v(-50.0, 5.0);
        let mut e = v(5.0, 5.0);
        assert_eq!(c.clip_line(&mut s, &mut e), ClipFlags::CLIPPED);

        let mut s = v(-500.0, 5.0);
        let mut e = v(5.0, 5.0);
        let flags = c.clip_line(&mut s, &mut e);
        assert!(flags.contains(ClipFlags::CLIPPED));
        assert!(flags.contains(ClipFlags::OVERFLOW));
        assert_eq!(s, v(0.0, 5.0));
    }

    #[test]
    fn test_overflow_disabled_by_default() {
        let c = clipper();
        let mut s = v(-5000.0, 5.0);
        let mut e = v(5.0, 5.0);
        assert_eq!(c.clip_line(&mut s, &mut e), ClipFlags::CLIPPED);
    }

    #[test]
    fn test_clip_line_aa_grows_region() {
        let c = clipper();
        let mut s = v(-5.0, 5.0);
        let mut e = v(5.0, 5.0);
        let flags = c.clip_line_aa(&mut s, &mut e, PixelBounds::uniform(value(1.0)));
        assert!(flags.contains(ClipFlags::CLIPPED));
        assert!(flags.contains(ClipFlags::OUT_OF_BOUND));
        assert_eq!(s, v(-1.0, 5.0));
        // Region itself is unchanged.
        assert_eq!(c.region().xmin(), value(0.0));
    }

    #[test]
    fn test_clip_line_aa_shrunk_region() {
        let c = clipper();
        let mut s = v(-5.0, 5.0);
        let mut e = v(5.0, 5.0);
        let flags = c.clip_line_aa(
            &mut s,
            &mut e,
            PixelBounds::new(value(1.0), value(1.0), value(-1.0), value(-1.0)),
        );
        assert_eq!(flags, ClipFlags::CLIPPED);
        assert_eq!(s, v(1.0, 5.0));
    }

    // ------------------------------------------------------------------------
    // Polygons
    // ------------------------------------------------------------------------

    #[test]
    fn test_polygon_inside_unmodified() {
        let c = clipper();
        let poly = [v(1.0, 1.0), v(9.0, 1.0), v(9.0, 9.0), v(1.0, 9.0)];
        assert_eq!(c.clip_polygon(&poly), poly.to_vec());
    }

    #[test]
    fn test_polygon_outside_empty() {
        let c = clipper();
        let poly = [v(11.0, 1.0), v(19.0, 1.0), v(15.0, 9.0)];
        assert!(c.clip_polygon(&poly).is_empty());
        assert!(c.clip_polygon(&[]).is_empty());
    }

    #[test]
    fn test_polygon_enclosing_region_becomes_region() {
        let c = clipper();
        let poly = [v(-5.0, -5.0), v(15.0, -5.0), v(15.0, 15.0), v(-5.0, 15.0)];
        let out = c.clip_polygon(&poly);
        assert_eq!(out.len(), 4);
        for corner in [v(0.0, 0.0), v(10.0, 0.0), v(10.0, 10.0), v(0.0, 10.0)] {
            assert!(out.iter().any(|p| same_point(p, &corner)));
        }
    }

    #[test]
    fn test_polygon_partial_triangle() {
        let c = clipper();
        let poly = [v(5.0, 5.0), v(15.0, 5.0), v(5.0, 15.0)];
        let out = c.clip_polygon(&poly);
        assert_eq!(out.len(), 4);
        for p in &out {
            assert_eq!(c.quick_classify_point(p), REGION_INSIDE);
        }
        assert!(out.iter().any(|p| same_point(p, &v(10.0, 5.0))));
        assert!(out.iter().any(|p| same_point(p, &v(5.0, 10.0))));
    }

    #[test]
    fn test_polygon_corner_touch_degenerates() {
        let c = clipper();
        // Only a corner of the region is touched; nothing with area remains.
        let poly = [v(10.0, 10.0), v(20.0, 10.0), v(20.0, 20.0), v(10.0, 20.0)];
        assert!(c.clip_polygon(&poly).is_empty());
    }

    #[test]
    fn test_polygon_strided() {
        let c = clipper();
        let data: Vec<Value> = [-5.0, 5.0, 99.0, 5.0, -5.0, 99.0, 5.0, 5.0, 99.0]
            .iter()
            .map(|&f| value(f))
            .collect();
        let out = c.clip_polygon_strided(&data, 3);
        assert_eq!(out.len(), 4);
        assert!(c.clip_polygon_strided(&data, 1).is_empty());
    }

    // ------------------------------------------------------------------------
    // Depth
    // ------------------------------------------------------------------------

    fn z_clipper() -> Clipper {
        Clipper::with_range(
            ClipRegion::from_int(0, 0, 10, 10, default_epsilon()),
            ClipRange::from_int(1, 100, default_epsilon()),
        )
    }

    #[test]
    fn test_z_clip_line() {
        let c = z_clipper();
        let mut s = v3(0.0, 0.0, 0.0);
        let mut e = v3(10.0, 20.0, 10.0);
        assert_eq!(c.z_clip_line(&mut s, &mut e), ClipFlags::CLIPPED);
        assert_eq!(s.z, value(1.0));
        assert_abs_diff_eq!(s.x.to_f32(), 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(s.y.to_f32(), 2.0, epsilon = 1e-3);
        assert_eq!(e, v3(10.0, 20.0, 10.0));

        let mut s = v3(0.0, 0.0, 200.0);
        let mut e = v3(0.0, 0.0, 300.0);
        assert_eq!(c.z_clip_line(&mut s, &mut e), ClipFlags::NOT_VISIBLE);
        assert_eq!(s.z, value(200.0));
    }

    #[test]
    fn test_z_clip_line_para_reversed() {
        let c = z_clipper();
        let mut s = v3(0.0, 0.0, 150.0);
        let mut e = v3(0.0, 0.0, 50.0);
        let (flags, t0, t1) = c.z_clip_line_para(&mut s, &mut e);
        assert_eq!(flags, ClipFlags::CLIPPED);
        assert_eq!(s.z, value(100.0));
        assert_eq!(e.z, value(50.0));
        assert_abs_diff_eq!(t0.to_f32(), 0.5, epsilon = 1e-3);
        assert_abs_diff_eq!(t1.to_f32(), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_z_clip_without_range_is_visible() {
        let c = clipper();
        let mut s = v3(0.0, 0.0, -1000.0);
        let mut e = v3(0.0, 0.0, 1000.0);
        assert_eq!(c.z_clip_line(&mut s, &mut e), ClipFlags::VISIBLE);
        let mut dest = Vec::new();
        assert_eq!(
            c.z_clip_polyline(&[s, e], false, &mut dest),
            ClipFlags::VISIBLE
        );
        assert_eq!(dest.len(), 2);
    }

    #[test]
    fn test_z_clip_polyline_open() {
        let c = z_clipper();
        let src = [v3(0.0, 0.0, 50.0), v3(1.0, 0.0, -50.0), v3(2.0, 0.0, 50.0)];
        let mut dest = vec![v3(9.0, 9.0, 9.0)];
        assert_eq!(c.z_clip_polyline(&src, false, &mut dest), ClipFlags::CLIPPED);
        assert!(dest.len() >= 3);
        assert_eq!(dest[0], src[0]);
        assert_eq!(dest[dest.len() - 1], src[2]);
        for p in &dest {
            assert!(p.z >= value(1.0) && p.z <= value(100.0));
        }
    }

    #[test]
    fn test_z_clip_polyline_closed_and_degenerate() {
        let c = z_clipper();
        let src = [v3(0.0, 0.0, 50.0), v3(4.0, 0.0, 150.0), v3(0.0, 4.0, 50.0)];
        let mut dest = Vec::new();
        assert_eq!(c.z_clip_polyline(&src, true, &mut dest), ClipFlags::CLIPPED);
        assert_eq!(dest.len(), 4);

        let inside = [v3(0.0, 0.0, 5.0), v3(1.0, 1.0, 6.0)];
        assert_eq!(c.z_clip_polyline(&inside, false, &mut dest), ClipFlags::VISIBLE);
        assert_eq!(dest, inside.to_vec());

        let behind = [v3(0.0, 0.0, -5.0), v3(1.0, 1.0, -6.0)];
        assert_eq!(c.z_clip_polyline(&behind, false, &mut dest), ClipFlags::NOT_VISIBLE);
        assert!(dest.is_empty());

        assert_eq!(c.z_clip_polyline(&inside[..1], false, &mut dest), ClipFlags::NOT_VISIBLE);
    }

    #[test]
    fn test_flags_helpers() {
        let f = ClipFlags::CLIPPED | ClipFlags::OVERFLOW;
        assert_eq!(f.bits(), 10);
        assert!(f.is_visible());
        assert!(!ClipFlags::NOT_VISIBLE.is_visible());
        assert!(!ClipFlags::OVERFLOW.is_visible());
        assert_eq!(f & ClipFlags::OVERFLOW, ClipFlags::OVERFLOW);
    }
}
