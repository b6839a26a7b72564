//! The display surface contract.
//!
//! A surface is a hardware-backed (or, for headless use, process-memory)
//! pixel region driving the display. Every backend exposes the same shape:
//! geometry, pixel format, the buffer drawing goes to, and what "present"
//! means for it. The backend is picked once, at acquisition time.
//!
//! Releasing a surface is dropping it.

use bitflags::bitflags;

use crate::format::{PixelFormat, BYTES_PER_PIXEL};
use crate::Result;

bitflags! {
    /// Flags accepted when acquiring a framebuffer surface.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AcquireFlags: u32 {
        /// Leave the controlling tty in text mode.
        const NO_TTY_GRAPHICS = 1 << 0;
        /// Draw into a process-memory shadow buffer, copy on flush.
        const SHADOW_BUFFER = 1 << 1;
    }
}

/// Screen rotation, clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Rotation from a count of quarter turns; wraps modulo 4.
    pub fn from_quarter_turns(turns: u32) -> Self {
        match turns % 4 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    /// Number of clockwise quarter turns.
    pub fn quarter_turns(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    /// Rotation by an extra number of quarter turns.
    pub fn rotate(self, turns: u32) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + turns)
    }

    /// Whether width and height swap under this rotation.
    pub fn is_transposed(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Physical description of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Width in millimeters, 0 when unknown.
    pub width_mm: u32,
    /// Height in millimeters, 0 when unknown.
    pub height_mm: u32,
    pub rotation: Rotation,
    /// Horizontal panning offset of the visible area.
    pub base_x: u32,
    /// Vertical panning offset of the visible area.
    pub base_y: u32,
}

/// How changes drawn into the write buffer become visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentModel {
    /// The write buffer is scanned out directly.
    Direct,
    /// The write buffer is a shadow copy; flushing copies rows to the
    /// scanned-out buffer.
    Shadow,
    /// Two scan-out buffers; committing flips which one is displayed.
    PageFlip,
}

/// An absolute rectangle already clipped to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClipRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl ClipRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Contract shared by every display backend.
pub trait DisplaySurface {
    /// Size, physical size and rotation.
    fn geometry(&self) -> Geometry;

    /// Channel layout of the surface's pixels.
    fn pixel_format(&self) -> PixelFormat;

    /// Bytes per scanline; at least `width * 4`.
    fn pitch(&self) -> usize;

    /// The buffer drawing goes to.
    fn write_buffer(&mut self) -> &mut [u8];

    /// The buffer currently being displayed.
    fn front_buffer(&self) -> &[u8];

    /// How flushes and commits behave.
    fn present_model(&self) -> PresentModel;

    /// Make a region of the write buffer visible. Only meaningful for
    /// [`PresentModel::Shadow`]; a no-op otherwise.
    fn present_rect(&mut self, rect: ClipRect);

    /// Hand the finished frame to the display controller.
    ///
    /// Failures are reported as [`crate::GraphicsError::PresentFailed`]; the
    /// surface stays usable.
    fn commit(&mut self) -> Result<()>;
}

/// Copy the rows of `rect` from `src` to `dst`, both laid out with `pitch`.
pub(crate) fn copy_rect(src: &[u8], dst: &mut [u8], pitch: usize, rect: ClipRect) {
    if rect.is_empty() {
        return;
    }
    let row_bytes = rect.width * BYTES_PER_PIXEL;
    for row in rect.y..rect.y + rect.height {
        let start = row * pitch + rect.x * BYTES_PER_PIXEL;
        let end = start + row_bytes;
        if end > src.len() || end > dst.len() {
            break;
        }
        dst[start..end].copy_from_slice(&src[start..end]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(Rotation::from_quarter_turns(5), Rotation::Deg90);
        assert_eq!(Rotation::Deg270.rotate(2), Rotation::Deg90);
        assert!(Rotation::Deg270.is_transposed());
        assert!(!Rotation::Deg180.is_transposed());
    }

    #[test]
    fn test_copy_rect_rows_only() {
        let pitch = 4 * 4;
        let src = vec![0xaau8; pitch * 3];
        let mut dst = vec![0u8; pitch * 3];
        copy_rect(
            &src,
            &mut dst,
            pitch,
            ClipRect {
                x: 1,
                y: 1,
                width: 2,
                height: 1,
            },
        );
        assert!(dst[..pitch].iter().all(|&b| b == 0));
        assert!(dst[pitch..pitch + 4].iter().all(|&b| b == 0));
        assert!(dst[pitch + 4..pitch + 12].iter().all(|&b| b == 0xaa));
        assert!(dst[pitch + 12..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_acquire_flags() {
        let flags = AcquireFlags::NO_TTY_GRAPHICS | AcquireFlags::SHADOW_BUFFER;
        assert!(flags.contains(AcquireFlags::SHADOW_BUFFER));
        assert!(AcquireFlags::default().is_empty());
    }
}
