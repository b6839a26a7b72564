//! Raw Linux display interfaces.
//!
//! Thin, typed wrappers over the fbdev, console and DRM ioctls. Structure
//! layouts follow the kernel UAPI headers (`linux/fb.h`, `linux/kd.h`,
//! `drm/drm.h`, `drm/drm_mode.h`).

pub(crate) mod drm;
pub(crate) mod fb;

use std::io;
use std::os::unix::io::RawFd;

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;

const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;

const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

/// Encode an `_IOWR(ty, nr, size)` request number.
pub(crate) const fn iowr(ty: u8, nr: u8, size: usize) -> u64 {
    (((IOC_READ | IOC_WRITE) << IOC_DIRSHIFT)
        | ((ty as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
        | ((size as u32) << IOC_SIZESHIFT)) as u64
}

/// Issue an ioctl whose argument is a pointer to `T`, retrying on
/// `EINTR`/`EAGAIN`.
///
/// # Safety
///
/// `T` must be the argument type the kernel expects for `request`, and any
/// user pointers stored inside `arg` must be valid for the sizes they claim.
pub(crate) unsafe fn ioctl_ptr<T>(fd: RawFd, request: u64, arg: &mut T) -> io::Result<()> {
    loop {
        // SAFETY: upheld by the caller.
        let ret = unsafe { libc::ioctl(fd, request as _, arg as *mut T) };
        if ret != -1 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EINTR) | Some(libc::EAGAIN) => continue,
            _ => return Err(err),
        }
    }
}

/// Issue an ioctl whose argument is a plain integer.
pub(crate) fn ioctl_value(fd: RawFd, request: u64, value: libc::c_ulong) -> io::Result<()> {
    // SAFETY: the argument is passed by value; the kernel reads no memory.
    let ret = unsafe { libc::ioctl(fd, request as _, value) };
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iowr_encoding() {
        // DRM_IOCTL_MODE_CREATE_DUMB from drm.h on x86_64
        assert_eq!(iowr(b'd', 0xb2, 32), 0xc020_64b2);
        // DRM_IOCTL_GET_CAP
        assert_eq!(iowr(b'd', 0x0c, 16), 0xc010_640c);
    }
}
