//! bootsplash Graphics Core
//!
//! This crate provides the display layer used by the bootsplash early-boot
//! splash. It talks to raw Linux display devices before any windowing system
//! exists: either the legacy fbdev linear framebuffer or a KMS device with
//! two dumb buffers.
//!
//! # Architecture
//!
//! The graphics core is organized into:
//!
//! - `color`: `Color` value type and its packed RGBA8 word
//! - `format`: pixel format resolution and colour packing
//! - `surface`: the `DisplaySurface` contract shared by every backend
//! - `fbdev`: memory-mapped legacy framebuffer backend
//! - `kms`: double-buffered mode-setting backend
//! - `flip`: front/back bookkeeping for page-flipped surfaces
//! - `memory`: process-memory surface for headless rendering
//! - `window`: clipped, offset drawing window
//! - `raster`: pixel, line, rectangle and circle primitives
//! - `blit`: RGBA8 image compositor
//! - `display`: the caller-facing context tying it all together

pub mod blit;
pub mod color;
pub mod display;
pub mod fbdev;
pub mod flip;
pub mod format;
pub mod kms;
pub mod memory;
pub mod raster;
pub mod surface;
pub mod window;

mod sys;

use std::io;
use std::path::PathBuf;

pub use blit::{Bitmap, BlitOp, Blitter};
pub use color::Color;
pub use display::{Display, Palette};
pub use fbdev::MappedSurface;
pub use flip::FlipChain;
pub use format::{Channel, PixelFormat};
pub use kms::KmsSurface;
pub use memory::MemorySurface;
pub use raster::Canvas;
pub use surface::{AcquireFlags, ClipRect, DisplaySurface, Geometry, PresentModel, Rotation};
pub use window::Window;

/// Result alias used across the graphics core.
pub type Result<T> = core::result::Result<T, GraphicsError>;

/// Graphics error types.
///
/// Variants fall into four categories (see [`ErrorKind`]):
/// - **Acquisition**: device open/ioctl/mmap/tty/allocation failures
/// - **Configuration**: the hardware cannot be driven the way we need
/// - **Presentation**: a single flip or commit failed; the surface stays usable
/// - **Usage**: the caller passed something unusable
#[derive(thiserror::Error, Debug)]
pub enum GraphicsError {
    // ── Acquisition ──────────────────────────────────────────────────

    #[error("cannot open {}: {source}", path.display())]
    OpenFailed { path: PathBuf, source: io::Error },

    #[error("{op} failed: {source}")]
    IoctlFailed { op: &'static str, source: io::Error },

    #[error("cannot switch tty {} to graphics mode: {source}", path.display())]
    TtyModeSetFailed { path: PathBuf, source: io::Error },

    #[error("cannot map {len} bytes of display memory: {source}")]
    MmapFailed { len: usize, source: io::Error },

    #[error("cannot allocate a {len} byte shadow buffer")]
    OutOfMemory { len: usize },

    #[error("cannot create dumb buffer {width}x{height}: {source}")]
    BufferCreateFailed { width: u32, height: u32, source: io::Error },

    #[error("initial mode-set on CRTC {crtc} failed: {source}")]
    ModeSetFailed { crtc: u32, source: io::Error },

    // ── Configuration ────────────────────────────────────────────────

    #[error("unsupported pixel format: {reason}")]
    UnsupportedFormat { reason: String },

    #[error("device does not support dumb buffers")]
    DumbBuffersUnsupported,

    #[error("no connected display with a usable mode")]
    NoConnectedDisplay,

    #[error("no suitable CRTC for connector {connector}")]
    NoSuitableCrtc { connector: u32 },

    // ── Presentation ─────────────────────────────────────────────────

    #[error("present failed: {source}")]
    PresentFailed { source: io::Error },

    // ── Usage ────────────────────────────────────────────────────────

    #[error("window {width}x{height} does not fit a {screen_width}x{screen_height} screen")]
    InvalidWindow {
        width: u32,
        height: u32,
        screen_width: u32,
        screen_height: u32,
    },

    #[error("source buffer holds {len} bytes, {needed} needed")]
    SourceTooSmall { len: usize, needed: usize },
}

/// Broad classification of a [`GraphicsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Failed to obtain a device resource. Fatal to the acquire call.
    Acquisition,
    /// The device cannot be driven as required. Fatal to the acquire call.
    Configuration,
    /// A single present failed. The caller may retry on the next frame.
    Presentation,
    /// Invalid input from the caller.
    Usage,
}

impl GraphicsError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OpenFailed { .. }
            | Self::IoctlFailed { .. }
            | Self::TtyModeSetFailed { .. }
            | Self::MmapFailed { .. }
            | Self::OutOfMemory { .. }
            | Self::BufferCreateFailed { .. }
            | Self::ModeSetFailed { .. } => ErrorKind::Acquisition,

            Self::UnsupportedFormat { .. }
            | Self::DumbBuffersUnsupported
            | Self::NoConnectedDisplay
            | Self::NoSuitableCrtc { .. } => ErrorKind::Configuration,

            Self::PresentFailed { .. } => ErrorKind::Presentation,

            Self::InvalidWindow { .. } | Self::SourceTooSmall { .. } => ErrorKind::Usage,
        }
    }

    /// Whether the surface is still usable after this error.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Presentation
    }

    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            reason: reason.into(),
        }
    }
}
