//! Legacy fbdev backend.
//!
//! Maps the linear framebuffer of `/dev/fbN` into the process. Drawing goes
//! straight to the mapping, or, with [`AcquireFlags::SHADOW_BUFFER`], to a
//! process-memory copy that is flushed row by row.
//!
//! Unless told otherwise the controlling tty is switched to graphics mode so
//! the console stops drawing over the splash; it goes back to text mode when
//! the surface is dropped.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};

use crate::format::PixelFormat;
use crate::surface::{
    copy_rect, AcquireFlags, ClipRect, DisplaySurface, Geometry, PresentModel, Rotation,
};
use crate::sys::fb::{self, FbVarScreeninfo};
use crate::{GraphicsError, Result};

pub const DEFAULT_FB_DEVICE: &str = "/dev/fb0";
pub const DEFAULT_TTY: &str = "/dev/tty";

/// Holds a tty in graphics mode until dropped.
struct TtyGuard {
    file: File,
    path: PathBuf,
}

impl TtyGuard {
    fn enter(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| GraphicsError::OpenFailed {
                path: path.to_path_buf(),
                source,
            })?;
        fb::set_kd_mode(file.as_raw_fd(), fb::KD_GRAPHICS).map_err(|source| {
            GraphicsError::TtyModeSetFailed {
                path: path.to_path_buf(),
                source,
            }
        })?;
        log::debug!("{} switched to graphics mode", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for TtyGuard {
    fn drop(&mut self) {
        match fb::set_kd_mode(self.file.as_raw_fd(), fb::KD_TEXT) {
            Ok(()) => log::debug!("{} back in text mode", self.path.display()),
            Err(err) => log::warn!("cannot restore text mode on {}: {err}", self.path.display()),
        }
    }
}

/// A memory-mapped fbdev framebuffer.
pub struct MappedSurface {
    // Fields drop in declaration order: the reverse of acquisition.
    shadow: Option<Vec<u8>>,
    map: MmapMut,
    tty: Option<TtyGuard>,
    file: File,
    var: FbVarScreeninfo,
    format: PixelFormat,
    pitch: usize,
    geometry: Geometry,
}

impl MappedSurface {
    /// Open and map a framebuffer device.
    ///
    /// `device` defaults to `/dev/fb0`, `tty` to `/dev/tty`.
    pub fn acquire(device: Option<&Path>, tty: Option<&Path>, flags: AcquireFlags) -> Result<Self> {
        let device = device.unwrap_or(Path::new(DEFAULT_FB_DEVICE));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(device)
            .map_err(|source| GraphicsError::OpenFailed {
                path: device.to_path_buf(),
                source,
            })?;
        let fd = file.as_raw_fd();

        let fix = fb::get_fix_screeninfo(fd).map_err(|source| GraphicsError::IoctlFailed {
            op: "FBIOGET_FSCREENINFO",
            source,
        })?;
        let var = fb::get_var_screeninfo(fd).map_err(|source| GraphicsError::IoctlFailed {
            op: "FBIOGET_VSCREENINFO",
            source,
        })?;

        let format = PixelFormat::from_bitfields(
            var.bits_per_pixel,
            var.red.into(),
            var.green.into(),
            var.blue.into(),
        )?;

        let pitch = fix.line_length as usize;
        let size = pitch * var.yres as usize;
        log::info!(
            "{}: {} {}x{} pitch {} ({} bytes)",
            device.display(),
            fix.id(),
            var.xres,
            var.yres,
            pitch,
            size
        );

        let tty = if flags.contains(AcquireFlags::NO_TTY_GRAPHICS) {
            None
        } else {
            Some(TtyGuard::enter(tty.unwrap_or(Path::new(DEFAULT_TTY)))?)
        };

        // SAFETY: the mapping covers the device's own framebuffer memory and
        // is only accessed through this surface.
        let map = unsafe { MmapOptions::new().len(size).map_mut(&file) }
            .map_err(|source| GraphicsError::MmapFailed { len: size, source })?;

        let shadow = if flags.contains(AcquireFlags::SHADOW_BUFFER) {
            let mut buf = Vec::new();
            buf.try_reserve_exact(size)
                .map_err(|_| GraphicsError::OutOfMemory { len: size })?;
            buf.resize(size, 0);
            Some(buf)
        } else {
            None
        };

        let geometry = Geometry {
            width: var.xres,
            height: var.yres,
            width_mm: var.width,
            height_mm: var.height,
            rotation: Rotation::from_quarter_turns(var.rotate),
            base_x: var.xoffset,
            base_y: var.yoffset,
        };

        Ok(Self {
            shadow,
            map,
            tty,
            file,
            var,
            format,
            pitch,
            geometry,
        })
    }

    /// Whether the tty was switched to graphics mode.
    pub fn owns_tty(&self) -> bool {
        self.tty.is_some()
    }
}

impl DisplaySurface for MappedSurface {
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
        match self.shadow.as_mut() {
            Some(shadow) => shadow.as_mut_slice(),
            None => &mut self.map[..],
        }
    }

    fn front_buffer(&self) -> &[u8] {
        &self.map[..]
    }

    fn present_model(&self) -> PresentModel {
        if self.shadow.is_some() {
            PresentModel::Shadow
        } else {
            PresentModel::Direct
        }
    }

    fn present_rect(&mut self, rect: ClipRect) {
        if let Some(shadow) = &self.shadow {
            copy_rect(shadow, &mut self.map[..], self.pitch, rect);
        }
    }

    fn commit(&mut self) -> Result<()> {
        self.var.activate |= fb::FB_ACTIVATE_NOW | fb::FB_ACTIVATE_FORCE;
        fb::put_var_screeninfo(self.file.as_raw_fd(), &mut self.var)
            .map_err(|source| GraphicsError::PresentFailed { source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_device_reports_path() {
        let path = Path::new("/nonexistent/fb9");
        let err = MappedSurface::acquire(Some(path), None, AcquireFlags::NO_TTY_GRAPHICS)
            .err()
            .unwrap();
        match err {
            GraphicsError::OpenFailed { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_regular_file_is_not_a_framebuffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fb");
        std::fs::write(&path, [0u8; 64]).unwrap();
        let err = MappedSurface::acquire(Some(&path), None, AcquireFlags::NO_TTY_GRAPHICS)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            GraphicsError::IoctlFailed {
                op: "FBIOGET_FSCREENINFO",
                ..
            }
        ));
    }
}
