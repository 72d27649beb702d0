//! Compositing engine interface
//!
//! The renderer talks to the compositing hardware through this trait. Every
//! parameter the hardware call takes is a named field of a per-call-shape
//! struct, so a missing parameter is a compile error instead of a runtime
//! tag-scan bug. An in-memory implementation lives in [`software`].

mod software;

pub use software::SoftwareCompositor;

use crate::geometry::{Rect, Vertex};
use bitflags::bitflags;

/// Opaque handle to an engine-owned off-screen pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitmapId(pub(crate) u32);

/// Hardware composite operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeOp {
    /// Destination is replaced by the source
    Src,
    /// Source-over-destination alpha blending
    SrcOverDest,
    /// Additive: destination plus source, saturating
    Plus,
}

bitflags! {
    /// Modifier bits for a composite request
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CompositeFlags: u32 {
        /// Treat the destination as fully opaque
        const IGNORE_DEST_ALPHA = 1 << 0;
        /// Reject software emulation instead of silently degrading
        const HARDWARE_ONLY = 1 << 1;
        /// Filter the source when scaling (smooth scale quality)
        const SRC_FILTER = 1 << 2;
        /// Ignore the source's own alpha channel; use the request alpha only
        const SRC_ALPHA_OVERRIDE = 1 << 3;
    }
}

/// Nonzero return code from a composite or blit call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeError {
    pub code: u32,
}

impl CompositeError {
    pub const BAD_BITMAP: CompositeError = CompositeError { code: 1 };
    pub const BAD_GEOMETRY: CompositeError = CompositeError { code: 2 };
}

/// Axis-aligned blit: source rectangle plus destination offset and scale
/// factors. Cannot express rotation.
#[derive(Debug, Clone, Copy)]
pub struct BlitParams {
    pub op: CompositeOp,
    /// Global source alpha, 0.0..=1.0
    pub src_alpha: f32,
    pub src_rect: Rect,
    pub offset_x: i32,
    pub offset_y: i32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Destination bounds; no pixel outside is written
    pub dest_clip: Rect,
    pub flags: CompositeFlags,
}

/// Explicit two-triangle quad blit, used when the geometry is rotated or
/// synthetic (solid color fills)
#[derive(Debug, Clone, Copy)]
pub struct QuadParams {
    pub op: CompositeOp,
    /// Global source alpha, 0.0..=1.0
    pub src_alpha: f32,
    /// Destination bounds; no pixel outside is written
    pub dest_clip: Rect,
    pub flags: CompositeFlags,
    pub vertices: [Vertex; 4],
    pub indices: [u16; 6],
}

/// Scoped access to a locked bitmap's pixels (ARGB8888).
/// The lock is released when the value is dropped, on every exit path.
pub struct PixelLock<'a> {
    pub pixels: &'a mut [u32],
    pub width: u32,
    pub height: u32,
}

/// Destination view for presentation blits: a window's paint surface
pub struct SurfaceView<'a> {
    pub pixels: &'a mut [u32],
    /// Pixels per row
    pub stride: usize,
}

/// The compositing engine: blends source bitmaps onto destination bitmaps
/// under an operation, geometry and modifier flags.
pub trait CompositeEngine {
    /// Allocate a displayable ARGB8888 bitmap. None on exhaustion.
    fn alloc_bitmap(&mut self, width: u32, height: u32, depth: u32) -> Option<BitmapId>;

    /// Free a bitmap. Callers must null their own handle right after; there
    /// is no double-free protection here.
    fn free_bitmap(&mut self, bitmap: BitmapId);

    fn bitmap_size(&self, bitmap: BitmapId) -> Option<(u32, u32)>;

    /// Lock a bitmap for direct pixel access
    fn lock(&mut self, bitmap: BitmapId) -> Option<PixelLock<'_>>;

    /// Opaque rectangle fill with inclusive corner coordinates
    fn rect_fill(&mut self, target: BitmapId, x1: i32, y1: i32, x2: i32, y2: i32, color: u32);

    /// Axis-aligned composite from `src` onto `dst`
    fn composite_blit(
        &mut self,
        src: BitmapId,
        dst: BitmapId,
        params: &BlitParams,
    ) -> Result<(), CompositeError>;

    /// Vertex-geometry composite from `src` onto `dst`
    fn composite_quad(
        &mut self,
        src: BitmapId,
        dst: BitmapId,
        params: &QuadParams,
    ) -> Result<(), CompositeError>;

    /// Copy a rectangle of `src` into `out` (ARGB8888, `pitch` u32s per row)
    fn read_pixels(
        &self,
        src: BitmapId,
        rect: &Rect,
        out: &mut [u32],
        pitch: usize,
    ) -> Result<(), CompositeError>;

    /// Blit the full `width`x`height` area of `src` onto a window paint
    /// surface at (dest_x, dest_y)
    fn blit_to_surface(
        &self,
        src: BitmapId,
        surface: &mut SurfaceView<'_>,
        dest_x: i32,
        dest_y: i32,
        width: u32,
        height: u32,
    ) -> Result<(), CompositeError>;
}
