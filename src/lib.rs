//! Compositing 2D render backend.
//!
//! A [`Renderer`] draws colored rectangles and textured quads onto a lazily
//! allocated off-screen bitmap and presents finished frames onto a window's
//! paint surface. All pixel work is delegated to a [`engine::CompositeEngine`];
//! the bundled [`SoftwareCompositor`] implements the contract on in-memory
//! ARGB8888 buffers, and [`BufferWindow`] provides a headless window for
//! tests and off-screen use.
//!
//! ```
//! use quadblit::{BufferWindow, Color, FRect, Hints, Renderer, SoftwareCompositor};
//!
//! let mut renderer = Renderer::new(
//!     SoftwareCompositor::new(),
//!     BufferWindow::new("demo", 64, 48),
//!     Hints::new(),
//! );
//!
//! renderer.set_draw_color(Color::opaque(32, 32, 64));
//! renderer.clear().unwrap();
//! renderer.set_draw_color(Color::opaque(255, 200, 0));
//! renderer.fill_rects(&[FRect::new(8.0, 8.0, 16.0, 16.0)]).unwrap();
//! renderer.present();
//! ```

pub mod color;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod hints;
pub mod renderer;
pub mod texture;
pub mod util;
pub mod window;

pub use color::Color;
pub use engine::SoftwareCompositor;
pub use error::RenderError;
pub use geometry::{FPoint, FRect, Flip, Rect};
pub use hints::{Hints, ScaleQuality, HINT_SCALE_QUALITY, HINT_VSYNC};
pub use renderer::{BlendMode, DriverFlags, DriverInfo, PixelFormat, Renderer, DRIVER_INFO};
pub use texture::Texture;
pub use window::{BufferWindow, PaintSession, Window, WindowEvent};
