//! Window collaborator interface
//!
//! The renderer only needs a few things from a window: its pixel size, a
//! title for diagnostics, and a paint surface it can blit the finished frame
//! onto. Acquiring the paint session locks the window's compositing layer so
//! the window system cannot repaint (and tear) the region mid-blit; dropping
//! the session releases the lock on every exit path.

use crate::engine::SurfaceView;

/// Event subset the renderer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    SizeChanged,
}

/// A locked paint surface, valid for the duration of one present blit
pub struct PaintSession<'a> {
    pub surface: SurfaceView<'a>,
    /// Border decoration offset where client content starts
    pub origin_x: i32,
    pub origin_y: i32,
}

/// The windowing collaborator consumed by the renderer
pub trait Window {
    /// Current client area size in pixels
    fn size(&self) -> (u32, u32);

    /// Window title, diagnostics only
    fn title(&self) -> &str;

    /// Block until the next vertical blank. Bounded by frame timing.
    fn wait_vertical_blank(&mut self) {}

    /// Lock the compositing layer and expose the paint surface.
    /// None when the window currently has no native surface.
    fn paint(&mut self) -> Option<PaintSession<'_>>;
}

/// In-memory window with a plain pixel buffer as its paint surface.
/// Useful for headless rendering and tests.
pub struct BufferWindow {
    title: String,
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    vblank_waits: u32,
    paint_sessions: u32,
}

impl BufferWindow {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            pixels: vec![0; (width * height) as usize],
            vblank_waits: 0,
            paint_sessions: 0,
        }
    }

    /// Change the client size. The caller is expected to forward a
    /// `SizeChanged` event to the renderer afterwards.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![0; (width * height) as usize];
    }

    /// Presented frame contents (ARGB8888, row-major)
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Number of vertical blanks waited for, for vsync tests
    pub fn vblank_waits(&self) -> u32 {
        self.vblank_waits
    }

    /// Number of paint sessions opened, for layer-lock tests
    pub fn paint_sessions(&self) -> u32 {
        self.paint_sessions
    }
}

impl Window for BufferWindow {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn wait_vertical_blank(&mut self) {
        self.vblank_waits += 1;
    }

    fn paint(&mut self) -> Option<PaintSession<'_>> {
        self.paint_sessions += 1;
        let stride = self.width as usize;
        Some(PaintSession {
            surface: SurfaceView {
                pixels: &mut self.pixels,
                stride,
            },
            origin_x: 0,
            origin_y: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_reallocates_surface() {
        let mut window = BufferWindow::new("test", 4, 4);
        window.resize(8, 2);
        assert_eq!(window.size(), (8, 2));
        assert_eq!(window.pixels().len(), 16);
    }

    #[test]
    fn test_paint_session_counts() {
        let mut window = BufferWindow::new("test", 2, 2);
        {
            let session = window.paint().unwrap();
            assert_eq!(session.surface.stride, 2);
        }
        assert_eq!(window.paint_sessions(), 1);
    }
}
