//! Drawing entry points of the compositing renderer
//!
//! Every operation here activates the render target first, translates
//! destination geometry by the viewport, then hands the engine either a
//! direct rectangle fill or a composite request built from the current
//! blend mode and hints.

use super::{BlendMode, Renderer};
use crate::engine::{BlitParams, CompositeEngine, CompositeFlags, CompositeOp, QuadParams};
use crate::error::RenderError;
use crate::geometry::{build_quad, FPoint, FRect, Flip, Rect, QUAD_INDICES};
use crate::hints::ScaleQuality;
use crate::texture::Texture;
use crate::window::Window;
use log::{debug, warn};

/// Pixel formats accepted for readback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Argb8888,
    Rgba8888,
}

/// Map a blend mode onto the composite operation the engine understands.
/// Modulate has no hardware equivalent and degrades to alpha blending.
fn convert_blend_mode(mode: BlendMode) -> CompositeOp {
    match mode {
        BlendMode::None => CompositeOp::Src,
        BlendMode::Blend => CompositeOp::SrcOverDest,
        BlendMode::Add => CompositeOp::Plus,
        BlendMode::Mod => CompositeOp::SrcOverDest,
    }
}

/// Modifier flags for a composite request under the given blend mode and
/// sampling quality
fn composite_flags(mode: BlendMode, quality: ScaleQuality) -> CompositeFlags {
    let mut flags = CompositeFlags::IGNORE_DEST_ALPHA | CompositeFlags::HARDWARE_ONLY;

    if quality == ScaleQuality::Linear {
        flags |= CompositeFlags::SRC_FILTER;
    }

    if mode == BlendMode::None {
        flags |= CompositeFlags::SRC_ALPHA_OVERRIDE;
    }

    flags
}

/// Global source alpha for a texture blit. Opaque blits ignore the
/// texture's alpha modulation entirely.
fn composite_alpha(texture: &Texture) -> f32 {
    if texture.blend_mode() == BlendMode::None {
        1.0
    } else {
        texture.alpha_mod() as f32 / 255.0
    }
}

/// Destination/source scale factor; a zero-sized source means no scaling
fn compute_scale(dst: i32, src: i32) -> f32 {
    if src != 0 {
        dst as f32 / src as f32
    } else {
        1.0
    }
}

impl<E: CompositeEngine, W: Window> Renderer<E, W> {
    /// Fill the whole output with the draw color, ignoring clip and viewport
    pub fn clear(&mut self) -> Result<(), RenderError> {
        let target = self.activate().ok_or(RenderError::NoRenderTarget)?;

        let (width, height) = self.window.size();

        self.engine.rect_fill(
            target,
            0,
            0,
            width as i32 - 1,
            height as i32 - 1,
            self.draw_color.to_argb(),
        );

        Ok(())
    }

    /// Fill rectangles with the draw color under the current blend mode.
    ///
    /// Opaque fills clip on the CPU and go straight to the engine's
    /// rectangle fill. Blended fills stretch the 1x1 solid color bitmap
    /// over each rectangle as a quad composite.
    pub fn fill_rects(&mut self, rects: &[FRect]) -> Result<(), RenderError> {
        let target = self.activate().ok_or(RenderError::NoRenderTarget)?;

        let (ox, oy) = self.viewport_offset();

        let final_rects: Vec<Rect> = rects
            .iter()
            .map(|r| {
                Rect::new(
                    ox + r.x as i32,
                    oy + r.y as i32,
                    (r.w as i32).max(1),
                    (r.h as i32).max(1),
                )
            })
            .collect();

        if self.blend_mode == BlendMode::None {
            let color = self.draw_color.to_argb();

            for rect in &final_rects {
                if let Some(c) = rect.intersect(&self.cliprect) {
                    self.engine
                        .rect_fill(target, c.x, c.y, c.x + c.w - 1, c.y + c.h - 1, color);
                }
            }

            return Ok(());
        }

        let source = self.solid_color.ok_or(RenderError::NoSolidColor)?;
        let color = self.draw_color.to_argb();

        if !self.set_solid_color(color) {
            return Err(RenderError::NoSolidColor);
        }

        let src = Rect::new(0, 0, 1, 1);
        let op = convert_blend_mode(self.blend_mode);
        let flags = composite_flags(self.blend_mode, self.hints.scale_quality());

        for rect in &final_rects {
            let params = QuadParams {
                op,
                src_alpha: 1.0,
                dest_clip: self.cliprect,
                flags,
                vertices: build_quad(&src, rect, 0.0, FPoint::ZERO, Flip::empty()),
                indices: QUAD_INDICES,
            };

            if let Err(e) = self.engine.composite_quad(source, target, &params) {
                if let Some(total) = self.composite_failures.tick() {
                    warn!("Composite failed: {} (failures: {})", e.code, total);
                }
            }
        }

        Ok(())
    }

    /// Copy a texture rectangle onto the render target
    pub fn copy(
        &mut self,
        texture: &Texture,
        src_rect: &Rect,
        dst_rect: &FRect,
    ) -> Result<(), RenderError> {
        let target = self.activate().ok_or(RenderError::NoRenderTarget)?;

        let (ox, oy) = self.viewport_offset();

        let final_rect = Rect::new(
            ox + dst_rect.x as i32,
            oy + dst_rect.y as i32,
            dst_rect.w as i32,
            dst_rect.h as i32,
        );

        let params = BlitParams {
            op: convert_blend_mode(texture.blend_mode()),
            src_alpha: composite_alpha(texture),
            src_rect: *src_rect,
            offset_x: final_rect.x,
            offset_y: final_rect.y,
            scale_x: compute_scale(final_rect.w, src_rect.w),
            scale_y: compute_scale(final_rect.h, src_rect.h),
            dest_clip: self.cliprect,
            flags: composite_flags(texture.blend_mode(), self.hints.scale_quality()),
        };

        match self
            .engine
            .composite_blit(texture.source_bitmap(), target, &params)
        {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Some(total) = self.composite_failures.tick() {
                    warn!("Composite failed: {} (failures: {})", e.code, total);
                }
                Err(RenderError::CompositeFailed { code: e.code })
            }
        }
    }

    /// Copy a texture rectangle with rotation and mirroring.
    ///
    /// `center` is relative to the destination rectangle's untranslated
    /// origin; the viewport offset moves the rectangle but not the pivot.
    pub fn copy_ex(
        &mut self,
        texture: &Texture,
        src_rect: &Rect,
        dst_rect: &FRect,
        angle: f64,
        center: FPoint,
        flip: Flip,
    ) -> Result<(), RenderError> {
        let target = self.activate().ok_or(RenderError::NoRenderTarget)?;

        let (ox, oy) = self.viewport_offset();

        let final_rect = Rect::new(
            ox + dst_rect.x as i32,
            oy + dst_rect.y as i32,
            dst_rect.w as i32,
            dst_rect.h as i32,
        );

        let final_center = FPoint::new(dst_rect.x + center.x, dst_rect.y + center.y);

        let params = QuadParams {
            op: convert_blend_mode(texture.blend_mode()),
            src_alpha: composite_alpha(texture),
            dest_clip: self.cliprect,
            flags: composite_flags(texture.blend_mode(), self.hints.scale_quality()),
            vertices: build_quad(src_rect, &final_rect, angle, final_center, flip),
            indices: QUAD_INDICES,
        };

        match self
            .engine
            .composite_quad(texture.source_bitmap(), target, &params)
        {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Some(total) = self.composite_failures.tick() {
                    warn!("Composite failed: {} (failures: {})", e.code, total);
                }
                Err(RenderError::CompositeFailed { code: e.code })
            }
        }
    }

    /// Read back a rectangle of the render target as ARGB8888.
    /// `pitch` is the output row stride in pixels.
    pub fn read_pixels(
        &mut self,
        rect: &Rect,
        format: PixelFormat,
        out: &mut [u32],
        pitch: usize,
    ) -> Result<(), RenderError> {
        let target = self.activate().ok_or(RenderError::NoRenderTarget)?;

        if format != PixelFormat::Argb8888 {
            return Err(RenderError::UnsupportedFormat);
        }

        let (ox, oy) = self.viewport_offset();
        let rect = Rect::new(rect.x + ox, rect.y + oy, rect.w, rect.h);

        let (width, height) = self.window.size();
        if rect.x < 0
            || rect.y < 0
            || rect.x + rect.w > width as i32
            || rect.y + rect.h > height as i32
        {
            return Err(RenderError::ReadOutOfBounds);
        }

        if rect.h > 0 && (rect.h as usize - 1) * pitch + rect.w as usize > out.len() {
            return Err(RenderError::BufferTooSmall {
                width: rect.w as u32,
                height: rect.h as u32,
            });
        }

        self.engine
            .read_pixels(target, &rect, out, pitch)
            .map_err(|e| RenderError::CompositeFailed { code: e.code })
    }

    /// Present the frame: wait for vertical blank if requested, lock the
    /// window's paint surface, blit the render bitmap onto it.
    /// A failed blit loses one frame and is only logged.
    pub fn present(&mut self) {
        let Some(source) = self.activate() else {
            return;
        };

        if self.hints.vsync_enabled() {
            self.window.wait_vertical_blank();
        }

        let (width, height) = self.window.size();

        let Some(mut session) = self.window.paint() else {
            return;
        };

        if let Err(e) = self.engine.blit_to_surface(
            source,
            &mut session.surface,
            session.origin_x,
            session.origin_y,
            width,
            height,
        ) {
            debug!("Surface blit failed: {}", e.code);
        }
    }
}
