//! Process-memory display surface.
//!
//! Behaves like a hardware surface of any present model without touching a
//! device: used for headless rendering and throughout the tests.

use std::io;

use crate::flip::FlipChain;
use crate::format::{PixelFormat, BYTES_PER_PIXEL};
use crate::surface::{copy_rect, ClipRect, DisplaySurface, Geometry, PresentModel, Rotation};
use crate::{GraphicsError, Result};

enum Storage {
    Direct(Vec<u8>),
    Shadow { shadow: Vec<u8>, front: Vec<u8> },
    PageFlip(FlipChain<Vec<u8>>),
}

impl Storage {
    fn new(model: PresentModel, len: usize) -> Self {
        match model {
            PresentModel::Direct => Storage::Direct(vec![0; len]),
            PresentModel::Shadow => Storage::Shadow {
                shadow: vec![0; len],
                front: vec![0; len],
            },
            PresentModel::PageFlip => Storage::PageFlip(FlipChain::new(vec![0; len], vec![0; len])),
        }
    }
}

/// A surface backed by ordinary vectors.
pub struct MemorySurface {
    geometry: Geometry,
    format: PixelFormat,
    pitch: usize,
    model: PresentModel,
    storage: Storage,
    commits: u64,
    fail_next_commit: bool,
}

impl MemorySurface {
    /// XRGB8888 surface with a tight pitch.
    pub fn new(width: u32, height: u32, model: PresentModel) -> Self {
        let pitch = width as usize * BYTES_PER_PIXEL;
        Self {
            geometry: Geometry {
                width,
                height,
                ..Geometry::default()
            },
            format: PixelFormat::xrgb8888(),
            pitch,
            model,
            storage: Storage::new(model, pitch * height as usize),
            commits: 0,
            fail_next_commit: false,
        }
    }

    /// Pad every scanline with `extra` bytes. Clears the contents.
    pub fn with_row_padding(mut self, extra: usize) -> Self {
        self.pitch = self.geometry.width as usize * BYTES_PER_PIXEL + extra;
        self.storage = Storage::new(self.model, self.pitch * self.geometry.height as usize);
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.geometry.rotation = rotation;
        self
    }

    pub fn with_physical_size(mut self, width_mm: u32, height_mm: u32) -> Self {
        self.geometry.width_mm = width_mm;
        self.geometry.height_mm = height_mm;
        self
    }

    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> u64 {
        self.commits
    }

    /// Slot on screen, for page-flipped surfaces.
    pub fn front_index(&self) -> Option<usize> {
        match &self.storage {
            Storage::PageFlip(chain) => Some(chain.front_index()),
            _ => None,
        }
    }

    /// Make the next commit fail with `EBUSY`.
    pub fn fail_next_commit(&mut self) {
        self.fail_next_commit = true;
    }

    fn take_injected_failure(&mut self) -> io::Result<()> {
        if std::mem::take(&mut self.fail_next_commit) {
            Err(io::Error::from_raw_os_error(libc::EBUSY))
        } else {
            Ok(())
        }
    }
}

impl DisplaySurface for MemorySurface {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn pitch(&self) -> usize {
        self.pitch
    }

    fn write_buffer(&mut self) -> &mut [u8] {
        match &mut self.storage {
            Storage::Direct(buf) => buf.as_mut_slice(),
            Storage::Shadow { shadow, .. } => shadow.as_mut_slice(),
            Storage::PageFlip(chain) => chain.back_mut(),
        }
    }

    fn front_buffer(&self) -> &[u8] {
        match &self.storage {
            Storage::Direct(buf) => buf.as_slice(),
            Storage::Shadow { front, .. } => front.as_slice(),
            Storage::PageFlip(chain) => chain.front(),
        }
    }

    fn present_model(&self) -> PresentModel {
        self.model
    }

    fn present_rect(&mut self, rect: ClipRect) {
        if let Storage::Shadow { shadow, front } = &mut self.storage {
            copy_rect(shadow, front, self.pitch, rect);
        }
    }

    fn commit(&mut self) -> Result<()> {
        let injected = self.take_injected_failure();
        match &mut self.storage {
            Storage::PageFlip(chain) => chain.flip(|_| injected)?,
            _ => injected.map_err(|source| GraphicsError::PresentFailed { source })?,
        }
        self.commits += 1;
        Ok(())
    }
}
