//! Texture management for the compositing renderer
//!
//! A texture owns a primary engine bitmap and, while RGB color modulation is
//! active, a second "final" bitmap holding the pre-modulated pixels. The
//! compositing hardware cannot tint during a blit, so modulation is baked in
//! on the CPU whenever the pixels or the modulation color change.

use crate::engine::{BitmapId, CompositeEngine};
use crate::renderer::BlendMode;

/// A texture uploaded to the compositing engine
pub struct Texture {
    width: u32,
    height: u32,
    bitmap: BitmapId,
    /// Color-modulated copy; present only while modulation is active
    final_bitmap: Option<BitmapId>,
    /// CPU-side copy of the uploaded pixels, kept for re-modulation
    staging: Vec<u32>,
    blend_mode: BlendMode,
    alpha_mod: u8,
    color_mod: (u8, u8, u8),
}

impl Texture {
    /// Create a texture backed by a freshly allocated engine bitmap.
    /// Returns None when allocation fails.
    pub fn new<E: CompositeEngine>(engine: &mut E, width: u32, height: u32) -> Option<Self> {
        let bitmap = engine.alloc_bitmap(width, height, 32)?;

        Some(Self {
            width,
            height,
            bitmap,
            final_bitmap: None,
            staging: vec![0; (width * height) as usize],
            blend_mode: BlendMode::None,
            alpha_mod: 255,
            color_mod: (255, 255, 255),
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    pub fn alpha_mod(&self) -> u8 {
        self.alpha_mod
    }

    pub fn set_alpha_mod(&mut self, alpha: u8) {
        self.alpha_mod = alpha;
    }

    pub fn color_mod(&self) -> (u8, u8, u8) {
        self.color_mod
    }

    /// True when the modulation color is anything but pure white
    pub fn is_color_mod_active(&self) -> bool {
        let (r, g, b) = self.color_mod;
        (r & g & b) != 255
    }

    /// The bitmap a blit should read from: the pre-modulated copy while
    /// color modulation is active, the primary bitmap otherwise
    pub fn source_bitmap(&self) -> BitmapId {
        if self.is_color_mod_active() {
            self.final_bitmap.unwrap_or(self.bitmap)
        } else {
            self.bitmap
        }
    }

    /// Primary bitmap, also the render target when this texture is bound
    pub fn bitmap(&self) -> BitmapId {
        self.bitmap
    }

    /// Upload ARGB8888 pixels. Data beyond the texture size is ignored,
    /// shorter data updates only the leading pixels.
    pub fn update<E: CompositeEngine>(&mut self, engine: &mut E, pixels: &[u32]) {
        let count = pixels.len().min(self.staging.len());
        self.staging[..count].copy_from_slice(&pixels[..count]);

        if let Some(lock) = engine.lock(self.bitmap) {
            lock.pixels[..count].copy_from_slice(&pixels[..count]);
        }

        if self.is_color_mod_active() {
            self.regenerate_final(engine);
        }
    }

    /// Set the RGB modulation color, rebuilding or dropping the final bitmap
    /// as needed
    pub fn set_color_mod<E: CompositeEngine>(&mut self, engine: &mut E, r: u8, g: u8, b: u8) {
        self.color_mod = (r, g, b);

        if self.is_color_mod_active() {
            self.regenerate_final(engine);
        } else if let Some(id) = self.final_bitmap.take() {
            engine.free_bitmap(id);
        }
    }

    /// Bake the modulation color into the final bitmap
    fn regenerate_final<E: CompositeEngine>(&mut self, engine: &mut E) {
        let id = match self.final_bitmap {
            Some(id) => id,
            None => {
                let Some(id) = engine.alloc_bitmap(self.width, self.height, 32) else {
                    log::debug!("Failed to allocate final bitmap");
                    return;
                };
                self.final_bitmap = Some(id);
                id
            }
        };

        let (mr, mg, mb) = self.color_mod;

        if let Some(lock) = engine.lock(id) {
            for (out, &src) in lock.pixels.iter_mut().zip(self.staging.iter()) {
                let a = src >> 24;
                let r = ((src >> 16) & 0xFF) * mr as u32 / 255;
                let g = ((src >> 8) & 0xFF) * mg as u32 / 255;
                let b = (src & 0xFF) * mb as u32 / 255;
                *out = a << 24 | r << 16 | g << 8 | b;
            }
        }
    }

    /// Free the engine bitmaps. Must be called before the texture is dropped;
    /// the engine owns the pixel storage.
    pub fn destroy<E: CompositeEngine>(mut self, engine: &mut E) {
        engine.free_bitmap(self.bitmap);
        if let Some(id) = self.final_bitmap.take() {
            engine.free_bitmap(id);
        }
    }
}
