//! Error taxonomy for the compositing backend
//!
//! Nothing here is fatal to the process: every failure is scoped to the
//! current operation or frame.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The renderer has no output bitmap and could not allocate one
    #[error("renderer doesn't have an output bitmap")]
    NoRenderTarget,

    /// Bitmap allocation was rejected by the engine
    #[error("allocation of {width}x{height} bitmap failed")]
    AllocationFailed { width: u32, height: u32 },

    /// The 1x1 solid color bitmap needed for blended fills is unavailable
    #[error("solid color bitmap is not available")]
    NoSolidColor,

    /// The engine rejected a composite request
    #[error("composite failed with code {code}")]
    CompositeFailed { code: u32 },

    /// Pixel readback rectangle extends outside the window bounds
    #[error("tried to read outside of surface bounds")]
    ReadOutOfBounds,

    /// Only ARGB8888 readback is supported
    #[error("unsupported pixel format")]
    UnsupportedFormat,

    /// Caller-provided pixel buffer cannot hold the requested rectangle
    #[error("pixel buffer too small for {width}x{height} read")]
    BufferTooSmall { width: u32, height: u32 },
}
