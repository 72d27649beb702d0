//! Rectangles, vertices and quad construction for the compositing path

use bitflags::bitflags;

/// Integer rectangle in destination or source pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Geometric intersection of two rectangles.
    /// Returns None when the rectangles do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.w).min(other.x + other.w);
        let y2 = (self.y + self.h).min(other.y + other.h);

        if x1 < x2 && y1 < y2 {
            Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
        } else {
            None
        }
    }
}

/// Floating point rectangle, used for destination geometry before it is
/// snapped to integer pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl FRect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

/// Floating point 2D point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FPoint {
    pub x: f32,
    pub y: f32,
}

impl FPoint {
    pub const ZERO: FPoint = FPoint { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

bitflags! {
    /// Mirroring applied to a blit's texture coordinates
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flip: u32 {
        const HORIZONTAL = 1 << 0;
        const VERTICAL = 1 << 1;
    }
}

/// One corner of a destination quad: position, texture coordinate and
/// homogeneous weight (always 1.0, there is no perspective)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub s: f32,
    pub t: f32,
    pub w: f32,
}

/// Fixed decomposition of a quad into two triangles, independent of the
/// rectangle values
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Rotate quad positions about `center` by `angle` degrees.
/// Texture coordinates are never touched.
fn rotate_vertices(vertices: &mut [Vertex; 4], angle: f64, center: FPoint) {
    let rads = (angle * std::f64::consts::PI / 180.0) as f32;

    let sina = rads.sin();
    let cosa = rads.cos();

    for v in vertices.iter_mut() {
        let x = v.x - center.x;
        let y = v.y - center.y;

        v.x = x * cosa - y * sina + center.x;
        v.y = x * sina + y * cosa + center.y;
    }
}

/// Build a destination quad for one blit.
///
/// Texture coordinates come from `src`'s inclusive edges (right = x + w - 1),
/// positions from `dst` the same way. Flips swap texture coordinates only.
///
/// Vertex layout:
///
/// ```text
/// v0-v3
/// | \ |
/// v1-v2
/// ```
pub fn build_quad(src: &Rect, dst: &Rect, angle: f64, center: FPoint, flip: Flip) -> [Vertex; 4] {
    let mut left = src.x as f32;
    let mut right = (src.x + src.w - 1) as f32;
    let mut top = src.y as f32;
    let mut bottom = (src.y + src.h - 1) as f32;

    if flip.contains(Flip::HORIZONTAL) {
        std::mem::swap(&mut left, &mut right);
    }

    if flip.contains(Flip::VERTICAL) {
        std::mem::swap(&mut top, &mut bottom);
    }

    let x0 = dst.x as f32;
    let y0 = dst.y as f32;
    let x1 = (dst.x + dst.w - 1) as f32;
    let y1 = (dst.y + dst.h - 1) as f32;

    let mut vertices = [
        Vertex { x: x0, y: y0, s: left, t: top, w: 1.0 },
        Vertex { x: x0, y: y1, s: left, t: bottom, w: 1.0 },
        Vertex { x: x1, y: y1, s: right, t: bottom, w: 1.0 },
        Vertex { x: x1, y: y0, s: right, t: top, w: 1.0 },
    ];

    if angle != 0.0 {
        rotate_vertices(&mut vertices, angle, center);
    }

    vertices
}
