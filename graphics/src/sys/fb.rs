//! fbdev and console ioctls.

use std::io;
use std::os::unix::io::RawFd;

use libc::c_ulong;

use super::{ioctl_ptr, ioctl_value};
use crate::format::Bitfield;

pub(crate) const FBIOGET_VSCREENINFO: u64 = 0x4600;
pub(crate) const FBIOPUT_VSCREENINFO: u64 = 0x4601;
pub(crate) const FBIOGET_FSCREENINFO: u64 = 0x4602;

pub(crate) const FB_ACTIVATE_NOW: u32 = 0;
pub(crate) const FB_ACTIVATE_FORCE: u32 = 128;

pub(crate) const KDSETMODE: u64 = 0x4b3a;
pub(crate) const KD_TEXT: c_ulong = 0x00;
pub(crate) const KD_GRAPHICS: c_ulong = 0x01;

/// `struct fb_bitfield`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FbBitfield {
    pub offset: u32,
    pub length: u32,
    pub msb_right: u32,
}

impl From<FbBitfield> for Bitfield {
    fn from(f: FbBitfield) -> Self {
        Bitfield {
            offset: f.offset,
            length: f.length,
            msb_right: f.msb_right,
        }
    }
}

/// `struct fb_var_screeninfo`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FbVarScreeninfo {
    pub xres: u32,
    pub yres: u32,
    pub xres_virtual: u32,
    pub yres_virtual: u32,
    pub xoffset: u32,
    pub yoffset: u32,
    pub bits_per_pixel: u32,
    pub grayscale: u32,
    pub red: FbBitfield,
    pub green: FbBitfield,
    pub blue: FbBitfield,
    pub transp: FbBitfield,
    pub nonstd: u32,
    pub activate: u32,
    /// Height of the picture in mm.
    pub height: u32,
    /// Width of the picture in mm.
    pub width: u32,
    pub accel_flags: u32,
    pub pixclock: u32,
    pub left_margin: u32,
    pub right_margin: u32,
    pub upper_margin: u32,
    pub lower_margin: u32,
    pub hsync_len: u32,
    pub vsync_len: u32,
    pub sync: u32,
    pub vmode: u32,
    /// Rotation in quarter turns, `FB_ROTATE_*`.
    pub rotate: u32,
    pub colorspace: u32,
    pub reserved: [u32; 4],
}

/// `struct fb_fix_screeninfo`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FbFixScreeninfo {
    pub id: [u8; 16],
    pub smem_start: c_ulong,
    pub smem_len: u32,
    pub type_: u32,
    pub type_aux: u32,
    pub visual: u32,
    pub xpanstep: u16,
    pub ypanstep: u16,
    pub ywrapstep: u16,
    /// Bytes per scanline.
    pub line_length: u32,
    pub mmio_start: c_ulong,
    pub mmio_len: u32,
    pub accel: u32,
    pub capabilities: u16,
    pub reserved: [u16; 2],
}

impl FbFixScreeninfo {
    /// Driver identification string.
    pub fn id(&self) -> String {
        let len = self.id.iter().position(|&b| b == 0).unwrap_or(self.id.len());
        String::from_utf8_lossy(&self.id[..len]).into_owned()
    }
}

pub(crate) fn get_var_screeninfo(fd: RawFd) -> io::Result<FbVarScreeninfo> {
    let mut var = FbVarScreeninfo::default();
    // SAFETY: FBIOGET_VSCREENINFO fills a struct fb_var_screeninfo.
    unsafe { ioctl_ptr(fd, FBIOGET_VSCREENINFO, &mut var)? };
    Ok(var)
}

pub(crate) fn put_var_screeninfo(fd: RawFd, var: &mut FbVarScreeninfo) -> io::Result<()> {
    // SAFETY: FBIOPUT_VSCREENINFO reads and updates a struct fb_var_screeninfo.
    unsafe { ioctl_ptr(fd, FBIOPUT_VSCREENINFO, var) }
}

pub(crate) fn get_fix_screeninfo(fd: RawFd) -> io::Result<FbFixScreeninfo> {
    let mut fix = FbFixScreeninfo::default();
    // SAFETY: FBIOGET_FSCREENINFO fills a struct fb_fix_screeninfo.
    unsafe { ioctl_ptr(fd, FBIOGET_FSCREENINFO, &mut fix)? };
    Ok(fix)
}

pub(crate) fn set_kd_mode(fd: RawFd, mode: c_ulong) -> io::Result<()> {
    ioctl_value(fd, KDSETMODE, mode)
}
