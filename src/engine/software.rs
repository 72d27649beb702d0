//! In-memory compositing engine
//!
//! Implements the full [`CompositeEngine`] contract on plain ARGB8888 pixel
//! vectors: opaque rectangle fills, scaled axis-aligned blits with nearest or
//! bilinear sampling, and scanline rasterization of two-triangle quads.

use super::{
    BitmapId, BlitParams, CompositeEngine, CompositeError, CompositeFlags, CompositeOp, PixelLock,
    QuadParams, SurfaceView,
};
use crate::geometry::{Rect, Vertex};

// ============================================================================
// Pixel math
// ============================================================================

/// Alpha blend a single color channel
/// Uses fast approximation: (x + 1 + (x >> 8)) >> 8 instead of x / 255
#[inline]
fn blend_channel(src: u32, dst: u32, alpha: u32) -> u32 {
    let result = src * alpha + dst * (255 - alpha);
    (result + 1 + (result >> 8)) >> 8
}

/// Scale a channel by an alpha value with rounding
#[inline]
fn scale_channel(c: u32, alpha: u32) -> u32 {
    (c * alpha + 127) / 255
}

/// Apply one composite operation to a destination pixel.
///
/// `alpha` is the effective source alpha (request alpha already combined
/// with the per-pixel alpha unless SRC_ALPHA_OVERRIDE suppressed it).
/// The destination's own alpha never participates; output alpha is opaque.
#[inline]
fn compose(op: CompositeOp, src: u32, dst: u32, alpha: u32) -> u32 {
    let sr = (src >> 16) & 0xFF;
    let sg = (src >> 8) & 0xFF;
    let sb = src & 0xFF;

    let dr = (dst >> 16) & 0xFF;
    let dg = (dst >> 8) & 0xFF;
    let db = dst & 0xFF;

    let (r, g, b) = match op {
        CompositeOp::Src => (
            scale_channel(sr, alpha),
            scale_channel(sg, alpha),
            scale_channel(sb, alpha),
        ),
        CompositeOp::SrcOverDest => (
            blend_channel(sr, dr, alpha),
            blend_channel(sg, dg, alpha),
            blend_channel(sb, db, alpha),
        ),
        CompositeOp::Plus => (
            (dr + scale_channel(sr, alpha)).min(255),
            (dg + scale_channel(sg, alpha)).min(255),
            (db + scale_channel(sb, alpha)).min(255),
        ),
    };

    0xFF00_0000 | r << 16 | g << 8 | b
}

/// Combine the request alpha with a source pixel's own alpha channel
#[inline]
fn effective_alpha(pixel: u32, request_alpha: u32, flags: CompositeFlags) -> u32 {
    if flags.contains(CompositeFlags::SRC_ALPHA_OVERRIDE) {
        request_alpha
    } else {
        scale_channel(pixel >> 24, request_alpha)
    }
}

// ============================================================================
// Bitmap store
// ============================================================================

struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Bitmap {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height) as usize],
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    /// Nearest-neighbor sample at texel coordinates, clamped to the bitmap
    #[inline]
    fn sample_nearest(&self, s: f32, t: f32) -> u32 {
        let x = (s.round().max(0.0) as u32).min(self.width - 1);
        let y = (t.round().max(0.0) as u32).min(self.height - 1);
        self.pixels[self.index(x, y)]
    }

    /// Bilinear sample at texel coordinates, clamped to the bitmap
    fn sample_bilinear(&self, s: f32, t: f32) -> u32 {
        let s = s.max(0.0);
        let t = t.max(0.0);

        let x0 = (s.floor() as u32).min(self.width - 1);
        let y0 = (t.floor() as u32).min(self.height - 1);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = s.fract();
        let fy = t.fract();

        let c00 = self.pixels[self.index(x0, y0)];
        let c10 = self.pixels[self.index(x1, y0)];
        let c01 = self.pixels[self.index(x0, y1)];
        let c11 = self.pixels[self.index(x1, y1)];

        let lerp = |a: u32, b: u32, f: f32| -> u32 {
            (a as f32 + (b as f32 - a as f32) * f).clamp(0.0, 255.0) as u32
        };

        let mut out = 0u32;
        for shift in [24, 16, 8, 0] {
            let top = lerp((c00 >> shift) & 0xFF, (c10 >> shift) & 0xFF, fx);
            let bottom = lerp((c01 >> shift) & 0xFF, (c11 >> shift) & 0xFF, fx);
            out |= lerp(top, bottom, fy) << shift;
        }
        out
    }

    #[inline]
    fn sample(&self, s: f32, t: f32, flags: CompositeFlags) -> u32 {
        if flags.contains(CompositeFlags::SRC_FILTER) {
            self.sample_bilinear(s, t)
        } else {
            self.sample_nearest(s, t)
        }
    }
}

/// Software implementation of the compositing engine
#[derive(Default)]
pub struct SoftwareCompositor {
    bitmaps: Vec<Option<Bitmap>>,
    free_slots: Vec<u32>,
}

impl SoftwareCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live bitmaps, for leak checks
    pub fn live_bitmaps(&self) -> usize {
        self.bitmaps.iter().filter(|b| b.is_some()).count()
    }

    fn get(&self, id: BitmapId) -> Option<&Bitmap> {
        self.bitmaps.get(id.0 as usize)?.as_ref()
    }

    fn get_mut(&mut self, id: BitmapId) -> Option<&mut Bitmap> {
        self.bitmaps.get_mut(id.0 as usize)?.as_mut()
    }

    /// Borrow source immutably and destination mutably at the same time
    fn src_dst(&mut self, src: BitmapId, dst: BitmapId) -> Option<(&Bitmap, &mut Bitmap)> {
        let (si, di) = (src.0 as usize, dst.0 as usize);
        if si == di || si >= self.bitmaps.len() || di >= self.bitmaps.len() {
            return None;
        }

        if si < di {
            let (head, tail) = self.bitmaps.split_at_mut(di);
            Some((head[si].as_ref()?, tail[0].as_mut()?))
        } else {
            let (head, tail) = self.bitmaps.split_at_mut(si);
            let source = tail[0].as_ref()?;
            Some((source, head[di].as_mut()?))
        }
    }
}

impl CompositeEngine for SoftwareCompositor {
    fn alloc_bitmap(&mut self, width: u32, height: u32, _depth: u32) -> Option<BitmapId> {
        if width == 0 || height == 0 {
            return None;
        }

        let bitmap = Bitmap::new(width, height);

        if let Some(slot) = self.free_slots.pop() {
            self.bitmaps[slot as usize] = Some(bitmap);
            Some(BitmapId(slot))
        } else {
            self.bitmaps.push(Some(bitmap));
            Some(BitmapId(self.bitmaps.len() as u32 - 1))
        }
    }

    fn free_bitmap(&mut self, bitmap: BitmapId) {
        if let Some(slot) = self.bitmaps.get_mut(bitmap.0 as usize) {
            if slot.take().is_some() {
                self.free_slots.push(bitmap.0);
            }
        }
    }

    fn bitmap_size(&self, bitmap: BitmapId) -> Option<(u32, u32)> {
        self.get(bitmap).map(|b| (b.width, b.height))
    }

    fn lock(&mut self, bitmap: BitmapId) -> Option<PixelLock<'_>> {
        let b = self.get_mut(bitmap)?;
        Some(PixelLock {
            width: b.width,
            height: b.height,
            pixels: &mut b.pixels,
        })
    }

    fn rect_fill(&mut self, target: BitmapId, x1: i32, y1: i32, x2: i32, y2: i32, color: u32) {
        let Some(b) = self.get_mut(target) else {
            return;
        };

        let x1 = x1.max(0);
        let y1 = y1.max(0);
        let x2 = x2.min(b.width as i32 - 1);
        let y2 = y2.min(b.height as i32 - 1);
        if x1 > x2 || y1 > y2 {
            return;
        }

        for y in y1..=y2 {
            let start = b.index(x1 as u32, y as u32);
            let end = b.index(x2 as u32, y as u32);
            b.pixels[start..=end].fill(color);
        }
    }

    fn composite_blit(
        &mut self,
        src: BitmapId,
        dst: BitmapId,
        params: &BlitParams,
    ) -> Result<(), CompositeError> {
        let (source, dest) = self.src_dst(src, dst).ok_or(CompositeError::BAD_BITMAP)?;

        if params.scale_x <= 0.0 || params.scale_y <= 0.0 {
            return Err(CompositeError::BAD_GEOMETRY);
        }

        let request_alpha = (params.src_alpha.clamp(0.0, 1.0) * 255.0).round() as u32;

        let out_w = (params.src_rect.w as f32 * params.scale_x).round() as i32;
        let out_h = (params.src_rect.h as f32 * params.scale_y).round() as i32;

        let bounds = Rect::new(0, 0, dest.width as i32, dest.height as i32);
        let Some(clip) = params.dest_clip.intersect(&bounds) else {
            return Ok(());
        };

        for dy in 0..out_h {
            let py = params.offset_y + dy;
            if py < clip.y || py >= clip.y + clip.h {
                continue;
            }

            // Map the destination row center back into the source rectangle
            let sy = params.src_rect.y as f32 + (dy as f32 + 0.5) / params.scale_y - 0.5;

            for dx in 0..out_w {
                let px = params.offset_x + dx;
                if px < clip.x || px >= clip.x + clip.w {
                    continue;
                }

                let sx = params.src_rect.x as f32 + (dx as f32 + 0.5) / params.scale_x - 0.5;

                let pixel = source.sample(sx, sy, params.flags);
                let alpha = effective_alpha(pixel, request_alpha, params.flags);

                let di = dest.index(px as u32, py as u32);
                dest.pixels[di] = compose(params.op, pixel, dest.pixels[di], alpha);
            }
        }

        Ok(())
    }

    fn composite_quad(
        &mut self,
        src: BitmapId,
        dst: BitmapId,
        params: &QuadParams,
    ) -> Result<(), CompositeError> {
        let (source, dest) = self.src_dst(src, dst).ok_or(CompositeError::BAD_BITMAP)?;

        let request_alpha = (params.src_alpha.clamp(0.0, 1.0) * 255.0).round() as u32;

        let bounds = Rect::new(0, 0, dest.width as i32, dest.height as i32);
        let Some(clip) = params.dest_clip.intersect(&bounds) else {
            return Ok(());
        };

        let v = &params.vertices;

        if is_axis_aligned(v) {
            raster_axis_aligned(source, dest, v, &clip, params, request_alpha);
        } else {
            raster_triangles(source, dest, params, &clip, request_alpha);
        }

        Ok(())
    }

    fn read_pixels(
        &self,
        src: BitmapId,
        rect: &Rect,
        out: &mut [u32],
        pitch: usize,
    ) -> Result<(), CompositeError> {
        let b = self.get(src).ok_or(CompositeError::BAD_BITMAP)?;

        if rect.x < 0
            || rect.y < 0
            || rect.x + rect.w > b.width as i32
            || rect.y + rect.h > b.height as i32
        {
            return Err(CompositeError::BAD_GEOMETRY);
        }

        for row in 0..rect.h {
            let src_start = b.index(rect.x as u32, (rect.y + row) as u32);
            let dst_start = row as usize * pitch;
            out[dst_start..dst_start + rect.w as usize]
                .copy_from_slice(&b.pixels[src_start..src_start + rect.w as usize]);
        }

        Ok(())
    }

    fn blit_to_surface(
        &self,
        src: BitmapId,
        surface: &mut SurfaceView<'_>,
        dest_x: i32,
        dest_y: i32,
        width: u32,
        height: u32,
    ) -> Result<(), CompositeError> {
        let b = self.get(src).ok_or(CompositeError::BAD_BITMAP)?;

        let width = width.min(b.width);
        let height = height.min(b.height);
        let surface_rows = surface.pixels.len() / surface.stride.max(1);

        for row in 0..height {
            let sy = dest_y + row as i32;
            if sy < 0 || sy as usize >= surface_rows {
                continue;
            }

            for col in 0..width {
                let sx = dest_x + col as i32;
                if sx < 0 || sx as usize >= surface.stride {
                    continue;
                }

                surface.pixels[sy as usize * surface.stride + sx as usize] =
                    b.pixels[b.index(col, row)];
            }
        }

        Ok(())
    }
}

// ============================================================================
// Quad rasterization
// ============================================================================

/// True when the quad is an unrotated rectangle in the canonical
/// TL, BL, BR, TR vertex order
fn is_axis_aligned(v: &[Vertex; 4]) -> bool {
    v[0].x == v[1].x && v[2].x == v[3].x && v[0].y == v[3].y && v[1].y == v[2].y
}

/// Fill an axis-aligned quad by interpolating texture coordinates across the
/// inclusive destination rectangle. Also covers degenerate one-pixel quads
/// whose triangles have zero area.
fn raster_axis_aligned(
    source: &Bitmap,
    dest: &mut Bitmap,
    v: &[Vertex; 4],
    clip: &Rect,
    params: &QuadParams,
    request_alpha: u32,
) {
    let x0 = v[0].x.min(v[2].x);
    let x1 = v[0].x.max(v[2].x);
    let y0 = v[0].y.min(v[2].y);
    let y1 = v[0].y.max(v[2].y);

    let span_x = x1 - x0;
    let span_y = y1 - y0;

    for py in (y0 as i32)..=(y1 as i32) {
        if py < clip.y || py >= clip.y + clip.h {
            continue;
        }

        let fy = if span_y > 0.0 {
            (py as f32 - y0) / span_y
        } else {
            0.0
        };
        let t = v[0].t + (v[1].t - v[0].t) * fy;

        for px in (x0 as i32)..=(x1 as i32) {
            if px < clip.x || px >= clip.x + clip.w {
                continue;
            }

            let fx = if span_x > 0.0 {
                (px as f32 - x0) / span_x
            } else {
                0.0
            };
            let s = v[0].s + (v[3].s - v[0].s) * fx;

            let pixel = source.sample(s, t, params.flags);
            let alpha = effective_alpha(pixel, request_alpha, params.flags);

            let di = dest.index(px as u32, py as u32);
            dest.pixels[di] = compose(params.op, pixel, dest.pixels[di], alpha);
        }
    }
}

/// Barycentric weights of point (px, py) in triangle (a, b, c).
/// None when the point is outside or the triangle is degenerate.
fn barycentric(a: &Vertex, b: &Vertex, c: &Vertex, px: f32, py: f32) -> Option<(f32, f32, f32)> {
    let denom = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
    if denom.abs() < 1e-6 {
        return None;
    }

    let wa = ((b.y - c.y) * (px - c.x) + (c.x - b.x) * (py - c.y)) / denom;
    let wb = ((c.y - a.y) * (px - c.x) + (a.x - c.x) * (py - c.y)) / denom;
    let wc = 1.0 - wa - wb;

    // Small tolerance keeps shared-edge pixels from falling through the crack
    let eps = -1e-4;
    if wa >= eps && wb >= eps && wc >= eps {
        Some((wa, wb, wc))
    } else {
        None
    }
}

/// Rasterize the quad as indexed triangles. Each destination pixel is
/// composed at most once even where the triangles share an edge.
fn raster_triangles(
    source: &Bitmap,
    dest: &mut Bitmap,
    params: &QuadParams,
    clip: &Rect,
    request_alpha: u32,
) {
    let v = &params.vertices;

    let min_x = v.iter().map(|p| p.x).fold(f32::MAX, f32::min).floor() as i32;
    let max_x = v.iter().map(|p| p.x).fold(f32::MIN, f32::max).ceil() as i32;
    let min_y = v.iter().map(|p| p.y).fold(f32::MAX, f32::min).floor() as i32;
    let max_y = v.iter().map(|p| p.y).fold(f32::MIN, f32::max).ceil() as i32;

    let min_x = min_x.max(clip.x);
    let max_x = max_x.min(clip.x + clip.w - 1);
    let min_y = min_y.max(clip.y);
    let max_y = max_y.min(clip.y + clip.h - 1);

    for py in min_y..=max_y {
        for px in min_x..=max_x {
            let fx = px as f32;
            let fy = py as f32;

            let mut hit = None;
            for tri in params.indices.chunks_exact(3) {
                let (a, b, c) = (
                    &v[tri[0] as usize],
                    &v[tri[1] as usize],
                    &v[tri[2] as usize],
                );
                if let Some((wa, wb, wc)) = barycentric(a, b, c, fx, fy) {
                    let s = a.s * wa + b.s * wb + c.s * wc;
                    let t = a.t * wa + b.t * wb + c.t * wc;
                    hit = Some((s, t));
                    break;
                }
            }

            if let Some((s, t)) = hit {
                let pixel = source.sample(s, t, params.flags);
                let alpha = effective_alpha(pixel, request_alpha, params.flags);

                let di = dest.index(px as u32, py as u32);
                dest.pixels[di] = compose(params.op, pixel, dest.pixels[di], alpha);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{build_quad, FPoint, Flip, QUAD_INDICES};

    const RED: u32 = 0xFFFF_0000;
    const BLACK: u32 = 0xFF00_0000;

    fn engine_with_bitmaps(sizes: &[(u32, u32)]) -> (SoftwareCompositor, Vec<BitmapId>) {
        let mut engine = SoftwareCompositor::new();
        let ids = sizes
            .iter()
            .map(|&(w, h)| engine.alloc_bitmap(w, h, 32).unwrap())
            .collect();
        (engine, ids)
    }

    fn pixel(engine: &SoftwareCompositor, id: BitmapId, x: u32, y: u32) -> u32 {
        let b = engine.get(id).unwrap();
        b.pixels[b.index(x, y)]
    }

    #[test]
    fn test_alloc_free_reuses_slots() {
        let mut engine = SoftwareCompositor::new();
        let a = engine.alloc_bitmap(4, 4, 32).unwrap();
        engine.free_bitmap(a);
        assert_eq!(engine.live_bitmaps(), 0);

        let b = engine.alloc_bitmap(8, 8, 32).unwrap();
        assert_eq!(a, b);
        assert_eq!(engine.bitmap_size(b), Some((8, 8)));
    }

    #[test]
    fn test_alloc_zero_size_fails() {
        let mut engine = SoftwareCompositor::new();
        assert!(engine.alloc_bitmap(0, 4, 32).is_none());
    }

    #[test]
    fn test_rect_fill_clamps_to_bitmap() {
        let (mut engine, ids) = engine_with_bitmaps(&[(4, 4)]);
        engine.rect_fill(ids[0], -2, -2, 10, 10, RED);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(pixel(&engine, ids[0], x, y), RED);
            }
        }
    }

    #[test]
    fn test_blit_unscaled_replaces_pixels() {
        let (mut engine, ids) = engine_with_bitmaps(&[(2, 2), (4, 4)]);
        engine.rect_fill(ids[0], 0, 0, 1, 1, RED);

        let params = BlitParams {
            op: CompositeOp::Src,
            src_alpha: 1.0,
            src_rect: Rect::new(0, 0, 2, 2),
            offset_x: 1,
            offset_y: 1,
            scale_x: 1.0,
            scale_y: 1.0,
            dest_clip: Rect::new(0, 0, 4, 4),
            flags: CompositeFlags::SRC_ALPHA_OVERRIDE,
        };
        engine.composite_blit(ids[0], ids[1], &params).unwrap();

        assert_eq!(pixel(&engine, ids[1], 0, 0), 0);
        assert_eq!(pixel(&engine, ids[1], 1, 1), RED);
        assert_eq!(pixel(&engine, ids[1], 2, 2), RED);
        assert_eq!(pixel(&engine, ids[1], 3, 3), 0);
    }

    #[test]
    fn test_blit_respects_dest_clip() {
        let (mut engine, ids) = engine_with_bitmaps(&[(4, 4), (8, 8)]);
        engine.rect_fill(ids[0], 0, 0, 3, 3, RED);

        let params = BlitParams {
            op: CompositeOp::Src,
            src_alpha: 1.0,
            src_rect: Rect::new(0, 0, 4, 4),
            offset_x: 0,
            offset_y: 0,
            scale_x: 1.0,
            scale_y: 1.0,
            dest_clip: Rect::new(0, 0, 2, 2),
            flags: CompositeFlags::SRC_ALPHA_OVERRIDE,
        };
        engine.composite_blit(ids[0], ids[1], &params).unwrap();

        assert_eq!(pixel(&engine, ids[1], 1, 1), RED);
        assert_eq!(pixel(&engine, ids[1], 2, 1), 0);
        assert_eq!(pixel(&engine, ids[1], 1, 2), 0);
    }

    #[test]
    fn test_blit_scales_up() {
        let (mut engine, ids) = engine_with_bitmaps(&[(2, 2), (8, 8)]);
        engine.rect_fill(ids[0], 0, 0, 1, 1, RED);

        let params = BlitParams {
            op: CompositeOp::Src,
            src_alpha: 1.0,
            src_rect: Rect::new(0, 0, 2, 2),
            offset_x: 0,
            offset_y: 0,
            scale_x: 4.0,
            scale_y: 4.0,
            dest_clip: Rect::new(0, 0, 8, 8),
            flags: CompositeFlags::SRC_ALPHA_OVERRIDE,
        };
        engine.composite_blit(ids[0], ids[1], &params).unwrap();

        // Every destination pixel maps back inside the 2x2 red source
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(pixel(&engine, ids[1], x, y), RED);
            }
        }
    }

    #[test]
    fn test_blit_to_missing_bitmap_is_error() {
        let (mut engine, ids) = engine_with_bitmaps(&[(2, 2)]);
        let params = BlitParams {
            op: CompositeOp::Src,
            src_alpha: 1.0,
            src_rect: Rect::new(0, 0, 2, 2),
            offset_x: 0,
            offset_y: 0,
            scale_x: 1.0,
            scale_y: 1.0,
            dest_clip: Rect::new(0, 0, 2, 2),
            flags: CompositeFlags::empty(),
        };
        let missing = BitmapId(99);
        assert_eq!(
            engine.composite_blit(ids[0], missing, &params),
            Err(CompositeError::BAD_BITMAP)
        );
    }

    #[test]
    fn test_src_over_half_alpha() {
        let (mut engine, ids) = engine_with_bitmaps(&[(1, 1), (1, 1)]);
        engine.rect_fill(ids[0], 0, 0, 0, 0, RED);
        engine.rect_fill(ids[1], 0, 0, 0, 0, BLACK);

        let params = BlitParams {
            op: CompositeOp::SrcOverDest,
            src_alpha: 128.0 / 255.0,
            src_rect: Rect::new(0, 0, 1, 1),
            offset_x: 0,
            offset_y: 0,
            scale_x: 1.0,
            scale_y: 1.0,
            dest_clip: Rect::new(0, 0, 1, 1),
            flags: CompositeFlags::SRC_ALPHA_OVERRIDE,
        };
        engine.composite_blit(ids[0], ids[1], &params).unwrap();

        let out = pixel(&engine, ids[1], 0, 0);
        let r = (out >> 16) & 0xFF;
        assert!((r as i32 - 128).abs() <= 1, "red channel was {}", r);
        assert_eq!(out & 0xFF, 0);
    }

    #[test]
    fn test_plus_saturates() {
        let (mut engine, ids) = engine_with_bitmaps(&[(1, 1), (1, 1)]);
        engine.rect_fill(ids[0], 0, 0, 0, 0, 0xFFC0_C0C0);
        engine.rect_fill(ids[1], 0, 0, 0, 0, 0xFF80_8080);

        let params = BlitParams {
            op: CompositeOp::Plus,
            src_alpha: 1.0,
            src_rect: Rect::new(0, 0, 1, 1),
            offset_x: 0,
            offset_y: 0,
            scale_x: 1.0,
            scale_y: 1.0,
            dest_clip: Rect::new(0, 0, 1, 1),
            flags: CompositeFlags::SRC_ALPHA_OVERRIDE,
        };
        engine.composite_blit(ids[0], ids[1], &params).unwrap();

        assert_eq!(pixel(&engine, ids[1], 0, 0), 0xFFFF_FFFF);
    }

    #[test]
    fn test_quad_covers_destination_rect() {
        let (mut engine, ids) = engine_with_bitmaps(&[(1, 1), (8, 8)]);
        engine.rect_fill(ids[0], 0, 0, 0, 0, RED);

        let vertices = build_quad(
            &Rect::new(0, 0, 1, 1),
            &Rect::new(2, 2, 4, 4),
            0.0,
            FPoint::ZERO,
            Flip::empty(),
        );
        let params = QuadParams {
            op: CompositeOp::SrcOverDest,
            src_alpha: 1.0,
            dest_clip: Rect::new(0, 0, 8, 8),
            flags: CompositeFlags::empty(),
            vertices,
            indices: QUAD_INDICES,
        };
        engine.composite_quad(ids[0], ids[1], &params).unwrap();

        for y in 0..8u32 {
            for x in 0..8u32 {
                let inside = (2..6).contains(&x) && (2..6).contains(&y);
                let expect = if inside { RED } else { 0 };
                assert_eq!(pixel(&engine, ids[1], x, y), expect, "at {},{}", x, y);
            }
        }
    }

    #[test]
    fn test_degenerate_one_pixel_quad() {
        let (mut engine, ids) = engine_with_bitmaps(&[(1, 1), (4, 4)]);
        engine.rect_fill(ids[0], 0, 0, 0, 0, RED);

        let vertices = build_quad(
            &Rect::new(0, 0, 1, 1),
            &Rect::new(1, 1, 1, 1),
            0.0,
            FPoint::ZERO,
            Flip::empty(),
        );
        let params = QuadParams {
            op: CompositeOp::SrcOverDest,
            src_alpha: 1.0,
            dest_clip: Rect::new(0, 0, 4, 4),
            flags: CompositeFlags::empty(),
            vertices,
            indices: QUAD_INDICES,
        };
        engine.composite_quad(ids[0], ids[1], &params).unwrap();

        assert_eq!(pixel(&engine, ids[1], 1, 1), RED);
        assert_eq!(pixel(&engine, ids[1], 0, 0), 0);
        assert_eq!(pixel(&engine, ids[1], 2, 2), 0);
    }

    #[test]
    fn test_rotated_quad_stays_inside_clip() {
        let (mut engine, ids) = engine_with_bitmaps(&[(1, 1), (16, 16)]);
        engine.rect_fill(ids[0], 0, 0, 0, 0, RED);

        let vertices = build_quad(
            &Rect::new(0, 0, 1, 1),
            &Rect::new(4, 4, 8, 8),
            45.0,
            FPoint::new(8.0, 8.0),
            Flip::empty(),
        );
        let params = QuadParams {
            op: CompositeOp::SrcOverDest,
            src_alpha: 1.0,
            dest_clip: Rect::new(0, 0, 8, 16),
            flags: CompositeFlags::empty(),
            vertices,
            indices: QUAD_INDICES,
        };
        engine.composite_quad(ids[0], ids[1], &params).unwrap();

        // Rotation pivot is covered, nothing escapes the clip
        assert_eq!(pixel(&engine, ids[1], 8 - 1, 8), RED);
        for y in 0..16u32 {
            for x in 8..16u32 {
                assert_eq!(pixel(&engine, ids[1], x, y), 0, "leak at {},{}", x, y);
            }
        }
    }

    #[test]
    fn test_read_pixels_rejects_out_of_bounds() {
        let (engine, ids) = engine_with_bitmaps(&[(4, 4)]);
        let mut out = vec![0u32; 16];
        assert_eq!(
            engine.read_pixels(ids[0], &Rect::new(2, 2, 4, 4), &mut out, 4),
            Err(CompositeError::BAD_GEOMETRY)
        );
    }

    #[test]
    fn test_blit_to_surface_offsets() {
        let (mut engine, ids) = engine_with_bitmaps(&[(2, 2)]);
        engine.rect_fill(ids[0], 0, 0, 1, 1, RED);

        let mut pixels = vec![0u32; 16];
        let mut surface = SurfaceView {
            pixels: &mut pixels,
            stride: 4,
        };
        engine
            .blit_to_surface(ids[0], &mut surface, 1, 1, 2, 2)
            .unwrap();

        assert_eq!(pixels[0], 0);
        assert_eq!(pixels[5], RED); // (1,1)
        assert_eq!(pixels[10], RED); // (2,2)
    }
}
