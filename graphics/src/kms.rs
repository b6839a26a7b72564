//! KMS dumb-buffer backend.
//!
//! Drives the first connected output of a DRM device with two CPU-mapped
//! dumb buffers. One is scanned out while the other is drawn into; each
//! commit re-points the CRTC at the drawn buffer.
//!
//! Dropping the surface puts the CRTC back the way it was found, then
//! destroys both buffers, the second one first.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

use memmap2::{MmapMut, MmapOptions};

use crate::flip::FlipChain;
use crate::format::{PixelFormat, BITS_PER_PIXEL};
use crate::surface::{ClipRect, DisplaySurface, Geometry, PresentModel, Rotation};
use crate::sys::drm::{self, Connector, CrtcState, Encoder, ModeInfo, Resources};
use crate::{GraphicsError, Result};

pub const DEFAULT_DRM_DEVICE: &str = "/dev/dri/card0";

/// Colour depth handed to ADDFB for XRGB8888.
const FB_DEPTH: u32 = 24;

/// A dumb buffer handle, destroyed on drop.
struct DumbHandle {
    fd: RawFd,
    handle: u32,
}

impl Drop for DumbHandle {
    fn drop(&mut self) {
        if let Err(err) = drm::destroy_dumb(self.fd, self.handle) {
            log::warn!("DESTROY_DUMB {} failed: {err}", self.handle);
        }
    }
}

/// A framebuffer object wrapping a dumb buffer. Removed before its handle
/// is destroyed.
struct FbObject {
    fb_id: u32,
    handle: DumbHandle,
}

impl Drop for FbObject {
    fn drop(&mut self) {
        if let Err(err) = drm::rm_fb(self.handle.fd, self.fb_id) {
            log::warn!("RMFB {} failed: {err}", self.fb_id);
        }
    }
}

/// A mapped, scan-out capable dumb buffer.
pub(crate) struct DumbBuffer {
    // Unmapped first, then the framebuffer object goes.
    map: MmapMut,
    fb: FbObject,
    pitch: usize,
}

impl DumbBuffer {
    fn create(file: &File, width: u32, height: u32) -> Result<Self> {
        let fd = file.as_raw_fd();
        let dumb = drm::create_dumb(fd, width, height, BITS_PER_PIXEL).map_err(|source| {
            GraphicsError::BufferCreateFailed {
                width,
                height,
                source,
            }
        })?;
        let handle = DumbHandle {
            fd,
            handle: dumb.handle,
        };

        let fb_id = drm::add_fb(fd, width, height, FB_DEPTH, BITS_PER_PIXEL, dumb.pitch, dumb.handle)
            .map_err(|source| GraphicsError::IoctlFailed {
                op: "DRM_IOCTL_MODE_ADDFB",
                source,
            })?;
        let fb = FbObject { fb_id, handle };

        let offset = drm::map_dumb(fd, dumb.handle).map_err(|source| GraphicsError::IoctlFailed {
            op: "DRM_IOCTL_MODE_MAP_DUMB",
            source,
        })?;

        let len = dumb.size as usize;
        // SAFETY: the offset was handed out by MAP_DUMB for this buffer and
        // the mapping is owned by the returned value alone.
        let mut map = unsafe { MmapOptions::new().offset(offset).len(len).map_mut(file) }
            .map_err(|source| GraphicsError::MmapFailed { len, source })?;
        map.fill(0);

        log::debug!(
            "dumb buffer {} fb {} pitch {} size {}",
            dumb.handle,
            fb_id,
            dumb.pitch,
            dumb.size
        );
        Ok(Self {
            map,
            fb,
            pitch: dumb.pitch as usize,
        })
    }

    fn fb_id(&self) -> u32 {
        self.fb.fb_id
    }
}

impl AsRef<[u8]> for DumbBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.map[..]
    }
}

impl AsMut<[u8]> for DumbBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.map[..]
    }
}

/// Puts a CRTC back into its saved configuration on drop.
struct CrtcRestore {
    fd: RawFd,
    connector: u32,
    saved: CrtcState,
}

impl Drop for CrtcRestore {
    fn drop(&mut self) {
        let saved = &self.saved;
        match drm::set_crtc(
            self.fd,
            saved.crtc_id,
            saved.fb_id,
            saved.x,
            saved.y,
            &[self.connector],
            saved.mode.as_ref(),
        ) {
            Ok(()) => log::debug!("CRTC {} restored", saved.crtc_id),
            Err(err) => log::warn!("cannot restore CRTC {}: {err}", saved.crtc_id),
        }
    }
}

/// A double-buffered KMS output.
pub struct KmsSurface {
    // Drop order: restore the CRTC, destroy buffers (slot 1, then slot 0),
    // close the device.
    restore: CrtcRestore,
    chain: FlipChain<DumbBuffer>,
    file: File,
    fb_ids: [u32; 2],
    crtc_id: u32,
    connector_id: u32,
    mode: ModeInfo,
    geometry: Geometry,
    pitch: usize,
}

impl KmsSurface {
    /// Open a DRM device and take over its first connected output.
    ///
    /// `device` defaults to `/dev/dri/card0`.
    pub fn acquire(device: Option<&Path>) -> Result<Self> {
        let device = device.unwrap_or(Path::new(DEFAULT_DRM_DEVICE));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_CLOEXEC)
            .open(device)
            .map_err(|source| GraphicsError::OpenFailed {
                path: device.to_path_buf(),
                source,
            })?;
        let fd = file.as_raw_fd();

        let has_dumb = drm::get_cap(fd, drm::DRM_CAP_DUMB_BUFFER).map_err(|source| {
            GraphicsError::IoctlFailed {
                op: "DRM_IOCTL_GET_CAP",
                source,
            }
        })?;
        if has_dumb == 0 {
            return Err(GraphicsError::DumbBuffersUnsupported);
        }

        let res = drm::get_resources(fd).map_err(|source| GraphicsError::IoctlFailed {
            op: "DRM_IOCTL_MODE_GETRESOURCES",
            source,
        })?;
        log::debug!(
            "{}: {} connectors, {} encoders, {} CRTCs",
            device.display(),
            res.connectors.len(),
            res.encoders.len(),
            res.crtcs.len()
        );

        let mut last_err = None;
        for &connector_id in &res.connectors {
            let conn = match drm::get_connector(fd, connector_id) {
                Ok(conn) => conn,
                Err(err) => {
                    log::warn!("cannot read connector {connector_id}: {err}");
                    continue;
                }
            };
            if !conn.is_connected() || conn.modes.is_empty() {
                log::debug!("connector {connector_id} not connected or has no modes");
                continue;
            }
            match find_crtc(fd, &res, &conn) {
                Some(crtc_id) => return Self::take_over(file, &conn, crtc_id),
                None => {
                    log::warn!("no suitable CRTC for connector {connector_id}");
                    last_err = Some(GraphicsError::NoSuitableCrtc {
                        connector: connector_id,
                    });
                }
            }
        }
        Err(last_err.unwrap_or(GraphicsError::NoConnectedDisplay))
    }

    fn take_over(file: File, conn: &Connector, crtc_id: u32) -> Result<Self> {
        let fd = file.as_raw_fd();
        let mode = conn.modes[0];
        let (width, height) = (mode.hdisplay as u32, mode.vdisplay as u32);
        log::info!(
            "connector {} mode {} ({}x{}@{}) on CRTC {}",
            conn.id,
            mode.name(),
            width,
            height,
            mode.vrefresh,
            crtc_id
        );

        let first = DumbBuffer::create(&file, width, height)?;
        let second = DumbBuffer::create(&file, width, height)?;
        let fb_ids = [first.fb_id(), second.fb_id()];
        let pitch = first.pitch;

        let saved = drm::get_crtc(fd, crtc_id).map_err(|source| GraphicsError::IoctlFailed {
            op: "DRM_IOCTL_MODE_GETCRTC",
            source,
        })?;
        let restore = CrtcRestore {
            fd,
            connector: conn.id,
            saved,
        };

        drm::set_crtc(fd, crtc_id, fb_ids[0], 0, 0, &[conn.id], Some(&mode))
            .map_err(|source| GraphicsError::ModeSetFailed {
                crtc: crtc_id,
                source,
            })?;

        Ok(Self {
            restore,
            chain: FlipChain::new(first, second),
            file,
            fb_ids,
            crtc_id,
            connector_id: conn.id,
            mode,
            geometry: Geometry {
                width,
                height,
                width_mm: conn.mm_width,
                height_mm: conn.mm_height,
                rotation: Rotation::Deg0,
                base_x: 0,
                base_y: 0,
            },
            pitch,
        })
    }

    /// Slot currently scanned out.
    pub fn front_index(&self) -> usize {
        self.chain.front_index()
    }
}

impl DisplaySurface for KmsSurface {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::xrgb8888()
    }

    fn pitch(&self) -> usize {
        self.pitch
    }

    fn write_buffer(&mut self) -> &mut [u8] {
        self.chain.back_mut()
    }

    fn front_buffer(&self) -> &[u8] {
        self.chain.front()
    }

    fn present_model(&self) -> PresentModel {
        PresentModel::PageFlip
    }

    fn present_rect(&mut self, _rect: ClipRect) {}

    fn commit(&mut self) -> Result<()> {
        let fd = self.file.as_raw_fd();
        let (crtc, connector, mode, fb_ids) =
            (self.crtc_id, self.connector_id, self.mode, self.fb_ids);
        self.chain
            .flip(|slot| drm::set_crtc(fd, crtc, fb_ids[slot], 0, 0, &[connector], Some(&mode)))
    }
}

fn find_crtc(fd: RawFd, res: &Resources, conn: &Connector) -> Option<u32> {
    let bound = if conn.encoder_id != 0 {
        drm::get_encoder(fd, conn.encoder_id).ok().map(|enc| enc.crtc_id)
    } else {
        None
    };
    let encoders: Vec<Encoder> = conn
        .encoders
        .iter()
        .filter_map(|&id| match drm::get_encoder(fd, id) {
            Ok(enc) => Some(enc),
            Err(err) => {
                log::debug!("cannot read encoder {id}: {err}");
                None
            }
        })
        .collect();
    pick_crtc(bound, &encoders, &res.crtcs)
}

/// The CRTC already driving the connector, else the first CRTC any of its
/// encoders can drive.
fn pick_crtc(bound: Option<u32>, encoders: &[Encoder], crtcs: &[u32]) -> Option<u32> {
    if let Some(crtc) = bound.filter(|&id| id != 0) {
        return Some(crtc);
    }
    encoders.iter().find_map(|enc| {
        crtcs
            .iter()
            .enumerate()
            .take(32)
            .find(|&(index, _)| enc.possible_crtcs & (1 << index) != 0)
            .map(|(_, &crtc)| crtc)
    })
}
