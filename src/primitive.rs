//! Primitive geometry buffers.
//!
//! A [`Primitive`] holds up to one sub-buffer per [`BufferType`] for a batch
//! of vertices: coordinates, per-vertex attributes, normals, the transformed
//! coordinates and index data. The element pitch of every sub-buffer follows
//! from its layout flags; typed access goes through [`Primitive::lock`],
//! which hands out a guard viewing the raw words as a slice of one of the
//! vertex structs below.
//!
//! Sub-buffers can be shared: the source primitive owns the memory and
//! dependents hold a weak reference, which reads as absent once the source
//! is gone.
//!
//! Transforming never touches `Coord`; results go to `Transformed`, which is
//! always `x, y, z`. Committing new coordinates (unlocking `Coord` for
//! writing) discards the transformed data.

use crate::clipper::{default_epsilon, ClipFlags, ClipRange};
use crate::heap::{words_for, BufferHeap, SystemHeap};
use crate::matrix2::Matrix2;
use crate::matrix3::Matrix3;
use crate::scalar::{Scalar, Value};
use crate::vector2::Vector2;
use crate::vector3::Vector3;
use bytemuck::{Pod, Zeroable};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::rc::{Rc, Weak};

// ============================================================================
// Layout, transform, state and projection flags
// ============================================================================

/// 2D coordinates.
pub const CLF_XY: u32 = 1;
/// Depth.
pub const CLF_Z: u32 = 2;
/// 3D coordinates.
pub const CLF_XYZ: u32 = CLF_XY | CLF_Z;
/// Colour per vertex.
pub const ALF_COLOR: u32 = 4;
/// Normal per vertex.
pub const NLF_NORMAL: u32 = 8;
/// First texture mapping.
pub const ALF_UV1: u32 = 16;
/// Second texture mapping (implies the first).
pub const ALF_UV2: u32 = 32;
/// Reference length.
pub const ALF_RL: u32 = 64;
const ALF_MASK: u32 = ALF_COLOR | ALF_UV1 | ALF_UV2 | ALF_RL;

pub const IBLT_TRILIST: u32 = 32;
pub const IBLT_LINELIST: u32 = 64;
pub const IBLT_STRIPE: u32 = 128;
pub const IBLT_FAN: u32 = 256;
/// Colour per index.
pub const IALF_COLOR: u32 = 512;

/// Translation is zero.
pub const TF_NO_TRANSLATION: u32 = 1;
/// Matrix is the identity.
pub const TF_TRANSLATION_ONLY: u32 = 2;
/// Only the main diagonal of the matrix is non-zero.
pub const TF_SCALE_ONLY: u32 = 4;
/// Matrix is the identity and translation is `(0, 0, z)`.
pub const TF_ASSIGN_DEPTH: u32 = 8 | TF_TRANSLATION_ONLY;

pub const SF_EMPTY: u32 = 0;
pub const SF_FILLED: u32 = 1;
pub const SF_LOCKED: u32 = 2;
pub const SF_TRANSFORMED2D: u32 = 4;
pub const SF_TRANSFORMED3D: u32 = 8;
pub const SF_TRANSFORMED: u32 = SF_TRANSFORMED2D | SF_TRANSFORMED3D;
pub const SF_PROJECTED: u32 = 16;

/// Project the transformed vertices if present.
pub const PF_REUSE_TRANSFORM: u32 = 1;
/// Apply the full 3x3 matrix instead of its diagonal.
pub const PF_INCLUDE_ROTATION: u32 = 2;
/// Clip the vertex chain against `[near, far]` before projecting.
pub const PF_ZCLIP: u32 = 16;
/// Treat the chain as closed when z-clipping.
pub const PF_ZCLIP_CLOSED: u32 = 32;

// ============================================================================
// Vertex layouts
// ============================================================================

pub type Color = u32;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Coord2D {
    pub x: Value,
    pub y: Value,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Coord3D {
    pub x: Value,
    pub y: Value,
    pub z: Value,
}

impl Coord2D {
    pub fn new(x: Value, y: Value) -> Self {
        Self { x, y }
    }
}

impl Coord3D {
    pub fn new(x: Value, y: Value, z: Value) -> Self {
        Self { x, y, z }
    }
}

impl From<Coord3D> for Vector3 {
    fn from(c: Coord3D) -> Self {
        Vector3::new(c.x, c.y, c.z)
    }
}

impl From<Vector3> for Coord3D {
    fn from(v: Vector3) -> Self {
        Coord3D::new(v.x, v.y, v.z)
    }
}

impl From<Coord2D> for Vector2 {
    fn from(c: Coord2D) -> Self {
        Vector2::new(c.x, c.y)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VCol {
    pub col: Color,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VRL {
    pub reflength: Value,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VColRL {
    pub col: Color,
    pub reflength: Value,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VCoordUV {
    pub u: Value,
    pub v: Value,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VCoordUV2 {
    pub u1: Value,
    pub v1: Value,
    pub u2: Value,
    pub v2: Value,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VColUV1 {
    pub col: Color,
    pub u: Value,
    pub v: Value,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VColUV2 {
    pub col: Color,
    pub u1: Value,
    pub v1: Value,
    pub u2: Value,
    pub v2: Value,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Normal {
    pub nx: Value,
    pub ny: Value,
    pub nz: Value,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct LineList {
    pub id1: u16,
    pub id2: u16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct TriList {
    pub id1: u16,
    pub id2: u16,
    pub id3: u16,
}

// ============================================================================
// Buffer types and pitches
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferType {
    Coord = 0,
    Attrib = 1,
    Normal = 2,
    Transformed = 3,
    Index = 4,
    IndexAttrib = 5,
    IndexNormal = 6,
}

const BUFFER_TYPE_COUNT: usize = 7;

impl BufferType {
    pub const ALL: [BufferType; BUFFER_TYPE_COUNT] = [
        BufferType::Coord,
        BufferType::Attrib,
        BufferType::Normal,
        BufferType::Transformed,
        BufferType::Index,
        BufferType::IndexAttrib,
        BufferType::IndexNormal,
    ];

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockFlags {
    #[default]
    ReadWrite,
    /// The content is not modified; dependent data stays valid.
    ReadOnly,
    WriteOnly,
}

const VALUE_BYTES: usize = size_of::<Value>();

/// Bytes per element of a sub-buffer of type `ty` with `layout`; zero if
/// the layout describes nothing for that type.
pub fn pitch_for(ty: BufferType, layout: u32) -> usize {
    match ty {
        BufferType::Coord => {
            if layout & CLF_Z != 0 {
                3 * VALUE_BYTES
            } else {
                2 * VALUE_BYTES
            }
        }
        BufferType::Attrib => {
            let mut pitch = 0;
            if layout & ALF_COLOR != 0 {
                pitch += size_of::<Color>();
            }
            if layout & ALF_RL != 0 {
                pitch += VALUE_BYTES;
            }
            if layout & ALF_UV2 != 0 {
                pitch += 4 * VALUE_BYTES;
            } else if layout & ALF_UV1 != 0 {
                pitch += 2 * VALUE_BYTES;
            }
            pitch
        }
        BufferType::Normal | BufferType::Transformed | BufferType::IndexNormal => 3 * VALUE_BYTES,
        BufferType::Index => {
            if layout & IBLT_TRILIST != 0 {
                size_of::<TriList>()
            } else if layout & IBLT_LINELIST != 0 {
                size_of::<LineList>()
            } else if layout & (IBLT_STRIPE | IBLT_FAN) != 0 {
                size_of::<u16>()
            } else {
                0
            }
        }
        BufferType::IndexAttrib => {
            if layout & IALF_COLOR != 0 {
                size_of::<Color>()
            } else {
                0
            }
        }
    }
}

// ============================================================================
// Sub-buffers
// ============================================================================

struct SubBuffer {
    count: Cell<usize>,
    pitch: Cell<usize>,
    layout: Cell<u32>,
    /// Bumped whenever the contents may have been rewritten.
    generation: Cell<u32>,
    data: RefCell<Vec<u32>>,
    heap: Rc<dyn BufferHeap>,
}

impl SubBuffer {
    fn allocate(heap: &Rc<dyn BufferHeap>, count: usize, pitch: usize, layout: u32) -> Option<Self> {
        let data = heap.allocate(count * pitch)?;
        Some(Self {
            count: Cell::new(count),
            pitch: Cell::new(pitch),
            layout: Cell::new(layout),
            generation: Cell::new(0),
            data: RefCell::new(data),
            heap: Rc::clone(heap),
        })
    }

    fn byte_len(&self) -> usize {
        self.count.get() * self.pitch.get()
    }

    fn touch(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
    }

    /// Change count and pitch, keeping the common byte prefix and zeroing the
    /// rest.
    fn reshape(&self, count: usize, pitch: usize, layout: u32) -> bool {
        let Ok(mut data) = self.data.try_borrow_mut() else {
            log::warn!("sub-buffer is in use and can not be resized");
            return false;
        };
        let new_bytes = count * pitch;
        let keep = self.byte_len().min(new_bytes);
        if words_for(new_bytes) <= data.len() {
            let bytes: &mut [u8] = bytemuck::cast_slice_mut(data.as_mut_slice());
            bytes[keep..].fill(0);
        } else {
            let Some(mut fresh) = self.heap.allocate(new_bytes) else {
                return false;
            };
            {
                let dst: &mut [u8] = bytemuck::cast_slice_mut(fresh.as_mut_slice());
                let src: &[u8] = bytemuck::cast_slice(data.as_slice());
                dst[..keep].copy_from_slice(&src[..keep]);
            }
            let old = std::mem::replace(&mut *data, fresh);
            self.heap.release(old);
        }
        self.count.set(count);
        self.pitch.set(pitch);
        self.layout.set(layout);
        self.touch();
        true
    }
}

impl Drop for SubBuffer {
    fn drop(&mut self) {
        let data = std::mem::take(self.data.get_mut());
        self.heap.release(data);
    }
}

fn typed<T: Pod>(words: &[u32], byte_len: usize) -> &[T] {
    let bytes: &[u8] = bytemuck::cast_slice(words);
    bytemuck::try_cast_slice(&bytes[..byte_len.min(bytes.len())]).unwrap_or_default()
}

fn typed_mut<T: Pod>(words: &mut [u32], byte_len: usize) -> &mut [T] {
    let bytes: &mut [u8] = bytemuck::cast_slice_mut(words);
    let len = byte_len.min(bytes.len());
    bytemuck::try_cast_slice_mut(&mut bytes[..len]).unwrap_or_default()
}

#[derive(Default)]
enum Slot {
    #[default]
    Empty,
    Owned(Rc<SubBuffer>),
    Shared(Weak<SubBuffer>),
}

impl Slot {
    fn get(&self) -> Option<Rc<SubBuffer>> {
        match self {
            Slot::Empty => None,
            Slot::Owned(rc) => Some(Rc::clone(rc)),
            Slot::Shared(weak) => weak.upgrade(),
        }
    }
}

// ============================================================================
// Primitive
// ============================================================================

/// Geometry container for a batch of vertices.
pub struct Primitive {
    layout: u32,
    basesize: usize,
    state: u32,
    /// Coordinate generation the transformed buffer was computed from.
    transformed_from: u32,
    heap: Rc<dyn BufferHeap>,
    slots: [Slot; BUFFER_TYPE_COUNT],
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitive")
            .field("layout", &self.layout)
            .field("basesize", &self.basesize)
            .field("state", &self.state)
            .finish()
    }
}

impl Primitive {
    /// Primitive with `size` vertices on the system heap.
    pub fn new(layout: u32, size: usize) -> Option<Self> {
        Self::with_heap(layout, size, Rc::new(SystemHeap))
    }

    /// Primitive allocating from `heap`. Creates `Coord`, plus `Attrib` and
    /// `Normal` when the layout asks for them. `None` if the heap refuses.
    pub fn with_heap(layout: u32, size: usize, heap: Rc<dyn BufferHeap>) -> Option<Self> {
        let layout = if layout & CLF_XYZ == 0 { layout | CLF_XY } else { layout };
        let mut p = Self {
            layout,
            basesize: 0,
            state: SF_EMPTY,
            transformed_from: 0,
            heap,
            slots: Default::default(),
        };
        if !p.add_buffer(BufferType::Coord, size, 0) {
            return None;
        }
        if layout & ALF_MASK != 0 && !p.add_buffer(BufferType::Attrib, size, 0) {
            return None;
        }
        if layout & NLF_NORMAL != 0 && !p.add_buffer(BufferType::Normal, size, 0) {
            return None;
        }
        Some(p)
    }

    fn default_layout(&self, ty: BufferType) -> u32 {
        match ty {
            BufferType::Coord => self.layout & CLF_XYZ,
            BufferType::Attrib => self.layout & ALF_MASK,
            BufferType::Normal | BufferType::IndexNormal => NLF_NORMAL,
            BufferType::Transformed => CLF_XYZ,
            BufferType::Index => IBLT_TRILIST,
            BufferType::IndexAttrib => IALF_COLOR,
        }
    }

    // ------------------------------------------------------------------------
    // Buffer management
    // ------------------------------------------------------------------------

    /// Allocate a sub-buffer of `size` elements, or resize an existing one.
    /// A zero `layout` picks the default for the type. New memory is zeroed;
    /// a resize keeps the common prefix.
    pub fn add_buffer(&mut self, ty: BufferType, size: usize, layout: u32) -> bool {
        let layout = if layout == 0 { self.default_layout(ty) } else { layout };
        let pitch = pitch_for(ty, layout);
        if pitch == 0 {
            log::warn!("layout {:#x} describes no {:?} element", layout, ty);
            return false;
        }

        let existing = match &self.slots[ty.slot()] {
            Slot::Shared(_) => {
                log::warn!("shared {:?} buffer can not be resized by a dependent", ty);
                return false;
            }
            Slot::Owned(rc) => Some(Rc::clone(rc)),
            Slot::Empty => None,
        };

        match existing {
            Some(buffer) => {
                if !buffer.reshape(size, pitch, layout) {
                    log::warn!("resizing {:?} buffer to {} elements failed", ty, size);
                    return false;
                }
                log::debug!("resized {:?} buffer to {} x {} bytes", ty, size, pitch);
            }
            None => {
                let Some(buffer) = SubBuffer::allocate(&self.heap, size, pitch, layout) else {
                    log::warn!("allocating {:?} buffer of {} elements failed", ty, size);
                    return false;
                };
                self.slots[ty.slot()] = Slot::Owned(Rc::new(buffer));
                log::debug!("allocated {:?} buffer of {} x {} bytes", ty, size, pitch);
            }
        }

        if ty == BufferType::Coord {
            self.basesize = size;
        }
        true
    }

    /// `true` if the sub-buffer exists, holds at least `min_size` elements
    /// and, for a non-zero `layout`, was created with that layout.
    pub fn check_buffer(&self, ty: BufferType, min_size: usize, layout: u32) -> bool {
        match self.slots[ty.slot()].get() {
            Some(b) => b.count.get() >= min_size && (layout == 0 || b.layout.get() == layout),
            None => false,
        }
    }

    /// Free an owned sub-buffer. Shared buffers belong to their source and
    /// are refused.
    pub fn remove_buffer(&mut self, ty: BufferType) -> bool {
        match self.slots[ty.slot()] {
            Slot::Owned(_) => {
                self.slots[ty.slot()] = Slot::Empty;
                if ty == BufferType::Coord {
                    self.basesize = 0;
                    self.invalidate_transformed();
                }
                true
            }
            Slot::Shared(_) => {
                log::warn!("dependents can not free the shared {:?} buffer", ty);
                false
            }
            Slot::Empty => false,
        }
    }

    /// Reference `source`'s sub-buffer of type `ty` instead of an own one.
    ///
    /// The source keeps ownership; once it drops the buffer this primitive
    /// sees it as absent. When the source rewrites shared coordinates, this
    /// primitive stops reporting itself transformed or projected until it
    /// transforms again.
    pub fn share_buffer_from(&mut self, source: &Primitive, ty: BufferType) -> bool {
        let weak = match &source.slots[ty.slot()] {
            Slot::Owned(rc) => Rc::downgrade(rc),
            Slot::Shared(weak) if weak.strong_count() > 0 => weak.clone(),
            _ => {
                log::warn!("source has no {:?} buffer to share", ty);
                return false;
            }
        };
        self.slots[ty.slot()] = Slot::Shared(weak);
        if ty == BufferType::Coord {
            self.basesize = source.count(ty);
            self.invalidate_transformed();
        }
        true
    }

    /// Stop referencing a shared sub-buffer.
    pub fn drop_share(&mut self, ty: BufferType) -> bool {
        if matches!(self.slots[ty.slot()], Slot::Shared(_)) {
            self.slots[ty.slot()] = Slot::Empty;
            true
        } else {
            false
        }
    }

    pub fn is_shared(&self, ty: BufferType) -> bool {
        matches!(self.slots[ty.slot()], Slot::Shared(_))
    }

    /// Elements in the sub-buffer, 0 if absent.
    pub fn count(&self, ty: BufferType) -> usize {
        self.slots[ty.slot()].get().map_or(0, |b| b.count.get())
    }

    /// Bytes per element of the sub-buffer, 0 if absent.
    pub fn pitch(&self, ty: BufferType) -> usize {
        self.slots[ty.slot()].get().map_or(0, |b| b.pitch.get())
    }

    /// Number of vertices (the coordinate buffer size).
    pub fn basesize(&self) -> usize {
        self.basesize
    }

    pub fn layout(&self) -> u32 {
        self.layout
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    pub fn is_coord_3d(&self) -> bool {
        self.layout & CLF_Z != 0
    }

    pub fn is_filled(&self) -> bool {
        self.state & SF_FILLED != 0
    }

    /// `true` while the transformed buffer holds a transform of the
    /// current coordinates.
    pub fn is_transformed(&self) -> bool {
        self.state & SF_TRANSFORMED != 0 && self.transformed_is_current()
    }

    /// `true` while the transformed buffer holds a projection of the
    /// current coordinates.
    pub fn is_projected(&self) -> bool {
        self.state & SF_PROJECTED != 0 && self.transformed_is_current()
    }

    fn coord_generation(&self) -> Option<u32> {
        self.slots[BufferType::Coord.slot()].get().map(|b| b.generation.get())
    }

    fn transformed_is_current(&self) -> bool {
        self.coord_generation() == Some(self.transformed_from)
    }

    // ------------------------------------------------------------------------
    // Locking
    // ------------------------------------------------------------------------

    /// Typed access to a sub-buffer. `None` if the buffer is absent or `T`
    /// does not match its pitch.
    pub fn lock<T: Pod>(&mut self, ty: BufferType, flags: LockFlags) -> Option<BufferLock<'_, T>> {
        let buffer = self.slots[ty.slot()].get()?;
        if buffer.pitch.get() != size_of::<T>() || align_of::<T>() > align_of::<u32>() {
            log::warn!(
                "{:?} buffer has pitch {}, requested element has {} bytes",
                ty,
                buffer.pitch.get(),
                size_of::<T>()
            );
            return None;
        }
        self.state |= SF_LOCKED;
        Some(BufferLock {
            primitive: self,
            buffer,
            ty,
            flags,
            _marker: PhantomData,
        })
    }

    fn unlock(&mut self, ty: BufferType, flags: LockFlags) {
        self.state &= !SF_LOCKED;
        if ty == BufferType::Coord {
            if flags != LockFlags::ReadOnly {
                self.invalidate_transformed();
            }
            self.state |= SF_FILLED;
        }
    }

    fn invalidate_transformed(&mut self) {
        let slot = BufferType::Transformed.slot();
        if !matches!(self.slots[slot], Slot::Empty) {
            log::debug!("coordinates changed, dropping transformed buffer");
            self.slots[slot] = Slot::Empty;
        }
        self.state &= !(SF_TRANSFORMED | SF_PROJECTED);
    }

    // ------------------------------------------------------------------------
    // Transform and projection
    // ------------------------------------------------------------------------

    fn read_points(&self, ty: BufferType) -> Option<Vec<Vector3>> {
        let buffer = self.slots[ty.slot()].get()?;
        let count = buffer.count.get();
        if count == 0 {
            return None;
        }
        let data = buffer.data.try_borrow().ok()?;
        let byte_len = buffer.byte_len();
        let points = if buffer.pitch.get() == size_of::<Coord3D>() {
            typed::<Coord3D>(&data, byte_len)
                .iter()
                .map(|&c| Vector3::from(c))
                .collect()
        } else {
            typed::<Coord2D>(&data, byte_len)
                .iter()
                .map(|c| Vector3::new(c.x, c.y, Value::ZERO))
                .collect()
        };
        Some(points)
    }

    fn store_transformed(&mut self, points: &[Coord3D]) -> bool {
        let slot = BufferType::Transformed.slot();
        if matches!(self.slots[slot], Slot::Shared(_)) {
            self.slots[slot] = Slot::Empty;
        }
        if !self.add_buffer(BufferType::Transformed, points.len(), CLF_XYZ) {
            return false;
        }
        let Some(buffer) = self.slots[slot].get() else {
            return false;
        };
        let byte_len = buffer.byte_len();
        let Ok(mut data) = buffer.data.try_borrow_mut() else {
            return false;
        };
        for (dst, src) in typed_mut::<Coord3D>(&mut data, byte_len).iter_mut().zip(points) {
            *dst = *src;
        }
        true
    }

    /// Write `rotation * xy + translation` of every vertex to `Transformed`,
    /// keeping z (0 for 2D coordinates). `flags` are `TF_*` hints and must
    /// describe the arguments truthfully.
    pub fn transform_2d(&mut self, rotation: &Matrix2, translation: &Vector2, flags: u32) -> bool {
        let Some(source) = self.read_points(BufferType::Coord) else {
            return false;
        };
        let out: Vec<Coord3D> = source
            .iter()
            .map(|p| {
                let xy = if flags & TF_TRANSLATION_ONLY != 0 {
                    p.xy()
                } else if flags & TF_SCALE_ONLY != 0 {
                    Vector2::new(rotation[0][0] * p.x, rotation[1][1] * p.y)
                } else {
                    *rotation * p.xy()
                };
                let xy = if flags & TF_NO_TRANSLATION != 0 {
                    xy
                } else {
                    xy + *translation
                };
                Coord3D::new(xy.x, xy.y, p.z)
            })
            .collect();
        if !self.store_transformed(&out) {
            return false;
        }
        self.state = (self.state & !(SF_TRANSFORMED | SF_PROJECTED)) | SF_TRANSFORMED2D;
        self.transformed_from = self.coord_generation().unwrap_or_default();
        true
    }

    /// Write `rotation * p + translation` of every vertex to `Transformed`.
    /// 2D coordinates are taken with z = 0.
    pub fn transform_3d(&mut self, rotation: &Matrix3, translation: &Vector3, flags: u32) -> bool {
        let Some(source) = self.read_points(BufferType::Coord) else {
            return false;
        };
        let out: Vec<Coord3D> = source
            .iter()
            .map(|p| {
                if flags & TF_ASSIGN_DEPTH == TF_ASSIGN_DEPTH {
                    return Coord3D::new(p.x, p.y, p.z + translation.z);
                }
                let q = if flags & TF_TRANSLATION_ONLY != 0 {
                    *p
                } else if flags & TF_SCALE_ONLY != 0 {
                    Vector3::new(rotation[0][0] * p.x, rotation[1][1] * p.y, rotation[2][2] * p.z)
                } else {
                    *rotation * *p
                };
                let q = if flags & TF_NO_TRANSLATION != 0 {
                    q
                } else {
                    q + *translation
                };
                Coord3D::from(q)
            })
            .collect();
        if !self.store_transformed(&out) {
            return false;
        }
        self.state = (self.state & !(SF_TRANSFORMED | SF_PROJECTED)) | SF_TRANSFORMED3D;
        self.transformed_from = self.coord_generation().unwrap_or_default();
        true
    }

    /// Perspective projection into `Transformed`:
    /// `x' = cx + sx * x / z`, `y' = cy + sy * y / z`, keeping the depth.
    ///
    /// `scale` contributes its diagonal, or the whole matrix with
    /// `PF_INCLUDE_ROTATION`. The source is `Transformed` with
    /// `PF_REUSE_TRANSFORM` when transformed data exists, otherwise `Coord`.
    /// With `PF_ZCLIP` the vertex chain is first clipped to `[near, far]`,
    /// which may change the vertex count; without it depths are clamped to
    /// `near`. A chain with nothing left inside the range drops the
    /// transformed buffer and fails.
    pub fn project_3d(
        &mut self,
        scale: &Matrix3,
        center: &Vector2,
        near: Value,
        far: Value,
        flags: u32,
    ) -> bool {
        let reuse = flags & PF_REUSE_TRANSFORM != 0 && self.is_transformed();
        let source = if reuse {
            self.read_points(BufferType::Transformed)
        } else {
            self.read_points(BufferType::Coord)
        };
        let Some(mut points) = source else {
            return false;
        };
        let generation = self.coord_generation().unwrap_or_default();

        if flags & PF_ZCLIP != 0 {
            let range = ClipRange::new(near, far, default_epsilon());
            let mut clipped = Vec::with_capacity(points.len() + 2);
            let result = range.clip_polyline(&points, flags & PF_ZCLIP_CLOSED != 0, &mut clipped);
            if result == ClipFlags::NOT_VISIBLE {
                log::debug!("vertex chain lies outside the depth range [{}, {}]", near.to_f32(), far.to_f32());
                self.invalidate_transformed();
                return false;
            }
            points = clipped;
        } else {
            for p in points.iter_mut() {
                p.z = p.z.max_of(near);
            }
        }

        let full = flags & PF_INCLUDE_ROTATION != 0;
        let out: Vec<Coord3D> = points
            .iter()
            .map(|p| {
                let (q, depth) = if full {
                    let q = *scale * *p;
                    (q, q.z.max_of(near))
                } else {
                    (Vector3::new(scale[0][0] * p.x, scale[1][1] * p.y, p.z), p.z)
                };
                Coord3D::new(
                    center.x + q.x.div_or_max(depth),
                    center.y + q.y.div_or_max(depth),
                    depth,
                )
            })
            .collect();
        if !self.store_transformed(&out) {
            return false;
        }
        self.state = (self.state & !SF_TRANSFORMED) | SF_PROJECTED;
        self.transformed_from = generation;
        true
    }
}

// ============================================================================
// BufferLock
// ============================================================================

/// Typed view of a locked sub-buffer. Unlocks when dropped.
///
/// Views borrow the underlying storage dynamically; viewing the same shared
/// buffer mutably through two locks at once panics.
pub struct BufferLock<'a, T> {
    primitive: &'a mut Primitive,
    buffer: Rc<SubBuffer>,
    ty: BufferType,
    flags: LockFlags,
    _marker: PhantomData<T>,
}

impl<T: Pod> BufferLock<'_, T> {
    pub fn buffer_type(&self) -> BufferType {
        self.ty
    }

    pub fn flags(&self) -> LockFlags {
        self.flags
    }

    pub fn len(&self) -> usize {
        self.buffer.count.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> Ref<'_, [T]> {
        let byte_len = self.buffer.byte_len();
        Ref::map(self.buffer.data.borrow(), |d| typed::<T>(d, byte_len))
    }

    pub fn as_mut_slice(&mut self) -> RefMut<'_, [T]> {
        let byte_len = self.buffer.byte_len();
        RefMut::map(self.buffer.data.borrow_mut(), |d| typed_mut::<T>(d, byte_len))
    }

    /// Copy `src` to the front of the buffer; returns the number of elements
    /// written.
    pub fn copy_from(&mut self, src: &[T]) -> usize {
        let mut dst = self.as_mut_slice();
        let n = dst.len().min(src.len());
        dst[..n].copy_from_slice(&src[..n]);
        n
    }
}

impl<T> Drop for BufferLock<'_, T> {
    fn drop(&mut self) {
        if self.flags != LockFlags::ReadOnly {
            self.buffer.touch();
        }
        self.primitive.unlock(self.ty, self.flags);
    }
}

// ============================================================================
// Tests
// ============================================================================
