//! Compositing renderer: lifecycle, render target and clip state
//!
//! The drawing entry points live in [`draw`]; this module owns the driver
//! lifecycle, the lazily allocated render-target bitmap, the 1x1 solid color
//! bitmap and the viewport/clip tracking.

mod draw;

pub use draw::PixelFormat;

use crate::color::Color;
use crate::engine::{BitmapId, CompositeEngine};
use crate::error::RenderError;
use crate::geometry::Rect;
use crate::hints::Hints;
use crate::texture::Texture;
use crate::util::RateLimiter;
use crate::window::{Window, WindowEvent};
use bitflags::bitflags;
use log::debug;

/// How sustained composite failures are throttled in the log
const FAILURE_LOG_INTERVAL: u64 = 100;

/// Abstract blend mode requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// No blending; the destination is replaced
    #[default]
    None,
    /// Source-over-destination alpha blending
    Blend,
    /// Additive blending
    Add,
    /// Color modulation. Unsupported by the compositing path and
    /// approximated by [`BlendMode::Blend`].
    Mod,
}

bitflags! {
    /// Advertised renderer capabilities
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DriverFlags: u32 {
        const ACCELERATED = 1 << 0;
        const TARGET_TEXTURE = 1 << 1;
        const PRESENT_VSYNC = 1 << 2;
    }
}

/// Fixed capability descriptor exposed to renderer registration
#[derive(Debug, Clone, Copy)]
pub struct DriverInfo {
    pub name: &'static str,
    pub flags: DriverFlags,
    pub formats: &'static [PixelFormat],
}

pub const DRIVER_INFO: DriverInfo = DriverInfo {
    name: "compositing",
    flags: DriverFlags::ACCELERATED
        .union(DriverFlags::TARGET_TEXTURE)
        .union(DriverFlags::PRESENT_VSYNC),
    formats: &[PixelFormat::Argb8888],
};

/// The compositing renderer. Owns its engine and window collaborators and
/// all bitmaps it allocates.
pub struct Renderer<E: CompositeEngine, W: Window> {
    engine: E,
    window: W,
    hints: Hints,

    draw_color: Color,
    blend_mode: BlendMode,
    viewport: Option<Rect>,
    clip_rect: Option<Rect>,
    /// Current destination clip, derived from viewport or clip rect
    cliprect: Rect,

    /// Window-sized render target, allocated lazily
    bitmap: Option<BitmapId>,
    /// Active target: a bound texture's bitmap, or `bitmap`
    target: Option<BitmapId>,
    /// 1x1 fill texture for blended solid fills
    solid_color: Option<BitmapId>,

    composite_failures: RateLimiter,
}

impl<E: CompositeEngine, W: Window> Renderer<E, W> {
    pub fn new(engine: E, window: W, hints: Hints) -> Self {
        debug!("Creating renderer for '{}'", window.title());
        debug!(
            "VSYNC: {}",
            if hints.vsync_enabled() { "on" } else { "off" }
        );

        Self {
            engine,
            window,
            hints,
            draw_color: Color::default(),
            blend_mode: BlendMode::None,
            viewport: None,
            clip_rect: None,
            cliprect: Rect::default(),
            bitmap: None,
            target: None,
            solid_color: None,
            composite_failures: RateLimiter::new(FAILURE_LOG_INTERVAL),
        }
    }

    pub fn info(&self) -> DriverInfo {
        DRIVER_INFO
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn hints(&self) -> &Hints {
        &self.hints
    }

    pub fn hints_mut(&mut self) -> &mut Hints {
        &mut self.hints
    }

    pub fn set_draw_color(&mut self, color: Color) {
        self.draw_color = color;
    }

    pub fn draw_color(&self) -> Color {
        self.draw_color
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    // ========================================================================
    // Texture management
    // ========================================================================

    pub fn create_texture(&mut self, width: u32, height: u32) -> Result<Texture, RenderError> {
        Texture::new(&mut self.engine, width, height)
            .ok_or(RenderError::AllocationFailed { width, height })
    }

    pub fn destroy_texture(&mut self, texture: Texture) {
        texture.destroy(&mut self.engine);
    }

    /// Bind a texture as the render target, or None to draw to the window
    /// bitmap again
    pub fn set_render_target(&mut self, texture: Option<&Texture>) {
        self.target = texture.map(Texture::bitmap);
    }

    // ========================================================================
    // Render target activation
    // ========================================================================

    /// Make sure a render target exists, allocating the window bitmap and
    /// the solid color bitmap lazily. Returns the active target.
    pub(crate) fn activate(&mut self) -> Option<BitmapId> {
        if self.target.is_none() {
            self.target = self.bitmap;
        }

        if self.target.is_none() {
            let (width, height) = self.window.size();

            debug!("Allocating {}*{}*32 bitmap for renderer", width, height);

            match self.engine.alloc_bitmap(width, height, 32) {
                Some(id) => {
                    self.bitmap = Some(id);
                    self.target = Some(id);
                    self.update_viewport();
                    self.update_clip_rect();
                }
                None => debug!("Allocation failed"),
            }
        }

        if self.solid_color.is_none() {
            self.solid_color = self.engine.alloc_bitmap(1, 1, 32);

            if self.solid_color.is_none() {
                debug!("Failed to allocate solid color bitmap");
            }
        }

        self.target
    }

    /// Write one color into the 1x1 solid color bitmap through a scoped lock
    pub(crate) fn set_solid_color(&mut self, color: u32) -> bool {
        let Some(id) = self.solid_color else {
            return false;
        };

        match self.engine.lock(id) {
            Some(lock) => {
                lock.pixels[0] = color;
                true
            }
            None => {
                debug!("Lock failed");
                false
            }
        }
    }

    // ========================================================================
    // Viewport / clip tracking
    // ========================================================================

    fn full_window_rect(&self) -> Rect {
        let (w, h) = self.window.size();
        Rect::new(0, 0, w as i32, h as i32)
    }

    /// Destination offset applied by the active viewport
    pub(crate) fn viewport_offset(&self) -> (i32, i32) {
        self.viewport.map_or((0, 0), |v| (v.x, v.y))
    }

    pub fn set_viewport(&mut self, viewport: Option<Rect>) {
        self.viewport = viewport;
        self.update_viewport();
    }

    pub fn set_clip_rect(&mut self, rect: Option<Rect>) {
        self.clip_rect = rect;
        self.update_clip_rect();
    }

    /// Recompute the clip from the viewport. A no-op until the target bitmap
    /// exists; activation re-runs it. The viewport and clip rect updates share
    /// one clip slot; whichever ran last wins.
    pub fn update_viewport(&mut self) {
        if self.bitmap.is_none() {
            // Recomputed again once the bitmap is recreated
            return;
        }

        let rect = self.viewport.unwrap_or_else(|| self.full_window_rect());
        self.apply_cliprect(rect);
    }

    /// Recompute the clip from the explicit clip rectangle. An unset or
    /// empty rectangle resets the clip to the full window bounds.
    pub fn update_clip_rect(&mut self) {
        if self.bitmap.is_none() {
            return;
        }

        let rect = match self.clip_rect {
            Some(rect) if !rect.is_empty() => rect,
            _ => self.full_window_rect(),
        };
        self.apply_cliprect(rect);
    }

    /// Logged only when the clip actually changes
    fn apply_cliprect(&mut self, rect: Rect) {
        if self.cliprect != rect {
            self.cliprect = rect;
            debug!("Cliprect: ({},{}) - {}*{}", rect.x, rect.y, rect.w, rect.h);
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// React to a window event. A size change frees the target bitmap so the
    /// next activation reallocates it at the new dimensions.
    pub fn window_event(&mut self, event: WindowEvent) {
        debug!("Called with event {:?}", event);

        if event == WindowEvent::SizeChanged {
            if let Some(id) = self.bitmap.take() {
                debug!("Freeing renderer bitmap {:?}", id);

                self.engine.free_bitmap(id);
                self.target = None;
            }
        }
    }

    /// Current output size, allocating the target bitmap if needed
    pub fn output_size(&mut self) -> Result<(u32, u32), RenderError> {
        let bitmap = self.activate().ok_or(RenderError::NoRenderTarget)?;
        self.engine
            .bitmap_size(bitmap)
            .ok_or(RenderError::NoRenderTarget)
    }

    /// Free renderer-owned bitmaps and give the collaborators back
    pub fn destroy(mut self) -> (E, W) {
        if let Some(id) = self.bitmap.take() {
            debug!("Freeing renderer bitmap {:?}", id);
            self.engine.free_bitmap(id);
        }

        if let Some(id) = self.solid_color.take() {
            self.engine.free_bitmap(id);
        }

        (self.engine, self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SoftwareCompositor;
    use crate::window::BufferWindow;

    fn renderer(w: u32, h: u32) -> Renderer<SoftwareCompositor, BufferWindow> {
        Renderer::new(
            SoftwareCompositor::new(),
            BufferWindow::new("test", w, h),
            Hints::new(),
        )
    }

    #[test]
    fn test_driver_info() {
        let r = renderer(4, 4);
        let info = r.info();
        assert_eq!(info.name, "compositing");
        assert!(info.flags.contains(DriverFlags::ACCELERATED));
        assert!(info.flags.contains(DriverFlags::TARGET_TEXTURE));
        assert!(info.flags.contains(DriverFlags::PRESENT_VSYNC));
        assert_eq!(info.formats, [PixelFormat::Argb8888]);
    }

    #[test]
    fn test_lazy_allocation_on_first_use() {
        let mut r = renderer(8, 6);
        assert_eq!(r.engine().live_bitmaps(), 0);

        assert_eq!(r.output_size().unwrap(), (8, 6));
        // Window bitmap plus the 1x1 solid color bitmap
        assert_eq!(r.engine().live_bitmaps(), 2);
    }

    #[test]
    fn test_resize_frees_and_reallocates() {
        let mut r = renderer(8, 8);
        r.output_size().unwrap();
        assert_eq!(r.engine().live_bitmaps(), 2);

        r.window_mut().resize(16, 4);
        r.window_event(WindowEvent::SizeChanged);
        assert_eq!(r.engine().live_bitmaps(), 1); // solid color bitmap survives

        assert_eq!(r.output_size().unwrap(), (16, 4));
        assert_eq!(r.engine().live_bitmaps(), 2);
    }

    #[test]
    fn test_destroy_frees_bitmaps() {
        let mut r = renderer(4, 4);
        r.output_size().unwrap();

        let (engine, _window) = r.destroy();
        assert_eq!(engine.live_bitmaps(), 0);
    }

    #[test]
    fn test_viewport_update_deferred_until_bitmap_exists() {
        let mut r = renderer(10, 10);

        // No bitmap yet: stays at the default until a bitmap exists
        r.set_viewport(Some(Rect::new(1, 1, 4, 4)));
        assert_eq!(r.cliprect, Rect::default());

        r.activate().unwrap();
        r.update_viewport();
        assert_eq!(r.cliprect, Rect::new(1, 1, 4, 4));
    }

    #[test]
    fn test_viewport_none_defaults_to_window_bounds() {
        let mut r = renderer(10, 10);
        r.activate().unwrap();
        assert_eq!(r.cliprect, Rect::new(0, 0, 10, 10));

        r.set_viewport(Some(Rect::new(2, 2, 4, 4)));
        assert_eq!(r.cliprect, Rect::new(2, 2, 4, 4));

        r.set_viewport(None);
        assert_eq!(r.cliprect, Rect::new(0, 0, 10, 10));
    }

    #[test]
    fn test_empty_clip_rect_defaults_to_window_bounds() {
        let mut r = renderer(10, 10);
        r.activate().unwrap();

        r.set_clip_rect(Some(Rect::new(3, 3, 2, 2)));
        assert_eq!(r.cliprect, Rect::new(3, 3, 2, 2));

        r.set_clip_rect(Some(Rect::new(3, 3, 0, 0)));
        assert_eq!(r.cliprect, Rect::new(0, 0, 10, 10));

        r.set_clip_rect(None);
        assert_eq!(r.cliprect, Rect::new(0, 0, 10, 10));
    }

    #[test]
    fn test_cleared_clip_rect_resets_to_window_bounds_over_viewport() {
        let mut r = renderer(10, 10);
        r.activate().unwrap();

        r.set_viewport(Some(Rect::new(2, 2, 4, 4)));
        assert_eq!(r.cliprect, Rect::new(2, 2, 4, 4));

        r.set_clip_rect(Some(Rect::new(3, 3, 2, 2)));
        assert_eq!(r.cliprect, Rect::new(3, 3, 2, 2));

        // Clearing the clip rect opens up the whole window, not the viewport
        r.set_clip_rect(None);
        assert_eq!(r.cliprect, Rect::new(0, 0, 10, 10));
    }

    #[test]
    fn test_create_texture_reports_allocation_failure() {
        let mut r = renderer(4, 4);
        let err = r.create_texture(0, 4).err().unwrap();
        assert_eq!(
            err,
            RenderError::AllocationFailed {
                width: 0,
                height: 4
            }
        );
    }

    #[test]
    fn test_render_target_binding() {
        let mut r = renderer(8, 8);
        let tex = r.create_texture(4, 4).unwrap();

        r.set_render_target(Some(&tex));
        assert_eq!(r.output_size().unwrap(), (4, 4));

        r.set_render_target(None);
        assert_eq!(r.output_size().unwrap(), (8, 8));

        r.destroy_texture(tex);
    }
}
