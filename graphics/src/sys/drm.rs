//! DRM/KMS ioctls used for dumb-buffer mode-setting.

use std::io;
use std::mem::size_of;
use std::os::unix::io::RawFd;

use super::{ioctl_ptr, iowr};

const DRM_IOCTL_BASE: u8 = b'd';

pub(crate) const DRM_IOCTL_GET_CAP: u64 = iowr(DRM_IOCTL_BASE, 0x0c, size_of::<DrmGetCap>());
pub(crate) const DRM_IOCTL_MODE_GETRESOURCES: u64 =
    iowr(DRM_IOCTL_BASE, 0xa0, size_of::<DrmModeCardRes>());
pub(crate) const DRM_IOCTL_MODE_GETCRTC: u64 = iowr(DRM_IOCTL_BASE, 0xa1, size_of::<DrmModeCrtc>());
pub(crate) const DRM_IOCTL_MODE_SETCRTC: u64 = iowr(DRM_IOCTL_BASE, 0xa2, size_of::<DrmModeCrtc>());
pub(crate) const DRM_IOCTL_MODE_GETENCODER: u64 =
    iowr(DRM_IOCTL_BASE, 0xa6, size_of::<DrmModeGetEncoder>());
pub(crate) const DRM_IOCTL_MODE_GETCONNECTOR: u64 =
    iowr(DRM_IOCTL_BASE, 0xa7, size_of::<DrmModeGetConnector>());
pub(crate) const DRM_IOCTL_MODE_ADDFB: u64 = iowr(DRM_IOCTL_BASE, 0xae, size_of::<DrmModeFbCmd>());
pub(crate) const DRM_IOCTL_MODE_RMFB: u64 = iowr(DRM_IOCTL_BASE, 0xaf, size_of::<u32>());
pub(crate) const DRM_IOCTL_MODE_CREATE_DUMB: u64 =
    iowr(DRM_IOCTL_BASE, 0xb2, size_of::<DrmModeCreateDumb>());
pub(crate) const DRM_IOCTL_MODE_MAP_DUMB: u64 =
    iowr(DRM_IOCTL_BASE, 0xb3, size_of::<DrmModeMapDumb>());
pub(crate) const DRM_IOCTL_MODE_DESTROY_DUMB: u64 =
    iowr(DRM_IOCTL_BASE, 0xb4, size_of::<DrmModeDestroyDumb>());

pub(crate) const DRM_CAP_DUMB_BUFFER: u64 = 0x1;
pub(crate) const DRM_MODE_CONNECTED: u32 = 1;

/// Attempts before giving up on a resource list that keeps changing size.
const MAX_ENUMERATION_RETRIES: usize = 4;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DrmGetCap {
    pub capability: u64,
    pub value: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DrmModeCardRes {
    pub fb_id_ptr: u64,
    pub crtc_id_ptr: u64,
    pub connector_id_ptr: u64,
    pub encoder_id_ptr: u64,
    pub count_fbs: u32,
    pub count_crtcs: u32,
    pub count_connectors: u32,
    pub count_encoders: u32,
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
}

/// `struct drm_mode_modeinfo`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeInfo {
    pub clock: u32,
    pub hdisplay: u16,
    pub hsync_start: u16,
    pub hsync_end: u16,
    pub htotal: u16,
    pub hskew: u16,
    pub vdisplay: u16,
    pub vsync_start: u16,
    pub vsync_end: u16,
    pub vtotal: u16,
    pub vscan: u16,
    pub vrefresh: u32,
    pub flags: u32,
    pub type_: u32,
    pub name: [u8; 32],
}

impl ModeInfo {
    pub fn name(&self) -> String {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..len]).into_owned()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DrmModeCrtc {
    pub set_connectors_ptr: u64,
    pub count_connectors: u32,
    pub crtc_id: u32,
    pub fb_id: u32,
    pub x: u32,
    pub y: u32,
    pub gamma_size: u32,
    pub mode_valid: u32,
    pub mode: ModeInfo,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DrmModeGetEncoder {
    pub encoder_id: u32,
    pub encoder_type: u32,
    pub crtc_id: u32,
    pub possible_crtcs: u32,
    pub possible_clones: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DrmModeGetConnector {
    pub encoders_ptr: u64,
    pub modes_ptr: u64,
    pub props_ptr: u64,
    pub prop_values_ptr: u64,
    pub count_modes: u32,
    pub count_props: u32,
    pub count_encoders: u32,
    pub encoder_id: u32,
    pub connector_id: u32,
    pub connector_type: u32,
    pub connector_type_id: u32,
    pub connection: u32,
    pub mm_width: u32,
    pub mm_height: u32,
    pub subpixel: u32,
    pub pad: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DrmModeFbCmd {
    pub fb_id: u32,
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
    pub bpp: u32,
    pub depth: u32,
    pub handle: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DrmModeCreateDumb {
    pub height: u32,
    pub width: u32,
    pub bpp: u32,
    pub flags: u32,
    pub handle: u32,
    pub pitch: u32,
    pub size: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DrmModeMapDumb {
    pub handle: u32,
    pub pad: u32,
    pub offset: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DrmModeDestroyDumb {
    pub handle: u32,
}

// ── Typed results ────────────────────────────────────────────────────

/// Object ids of a card.
#[derive(Debug, Clone, Default)]
pub(crate) struct Resources {
    pub crtcs: Vec<u32>,
    pub connectors: Vec<u32>,
    pub encoders: Vec<u32>,
}

#[derive(Debug, Clone)]
pub(crate) struct Connector {
    pub id: u32,
    pub connection: u32,
    pub encoder_id: u32,
    pub encoders: Vec<u32>,
    pub modes: Vec<ModeInfo>,
    pub mm_width: u32,
    pub mm_height: u32,
}

impl Connector {
    pub fn is_connected(&self) -> bool {
        self.connection == DRM_MODE_CONNECTED
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Encoder {
    pub crtc_id: u32,
    pub possible_crtcs: u32,
}

/// A CRTC configuration, as saved before mode-setting.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CrtcState {
    pub crtc_id: u32,
    pub fb_id: u32,
    pub x: u32,
    pub y: u32,
    pub mode: Option<ModeInfo>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct DumbBuffer {
    pub handle: u32,
    pub pitch: u32,
    pub size: u64,
}

fn vec_ptr<T>(v: &mut [T]) -> u64 {
    v.as_mut_ptr() as usize as u64
}

// ── Calls ────────────────────────────────────────────────────────────

pub(crate) fn get_cap(fd: RawFd, capability: u64) -> io::Result<u64> {
    let mut cap = DrmGetCap {
        capability,
        value: 0,
    };
    // SAFETY: DRM_IOCTL_GET_CAP takes a struct drm_get_cap.
    unsafe { ioctl_ptr(fd, DRM_IOCTL_GET_CAP, &mut cap)? };
    Ok(cap.value)
}

pub(crate) fn get_resources(fd: RawFd) -> io::Result<Resources> {
    for _ in 0..MAX_ENUMERATION_RETRIES {
        let mut res = DrmModeCardRes::default();
        // SAFETY: all array pointers are null with zero counts.
        unsafe { ioctl_ptr(fd, DRM_IOCTL_MODE_GETRESOURCES, &mut res)? };

        let mut out = Resources {
            crtcs: vec![0; res.count_crtcs as usize],
            connectors: vec![0; res.count_connectors as usize],
            encoders: vec![0; res.count_encoders as usize],
        };
        let counts = (res.count_crtcs, res.count_connectors, res.count_encoders);

        let mut fill = DrmModeCardRes {
            crtc_id_ptr: vec_ptr(&mut out.crtcs),
            connector_id_ptr: vec_ptr(&mut out.connectors),
            encoder_id_ptr: vec_ptr(&mut out.encoders),
            count_crtcs: counts.0,
            count_connectors: counts.1,
            count_encoders: counts.2,
            ..DrmModeCardRes::default()
        };
        // SAFETY: each pointer addresses a vector holding exactly its count
        // of u32 elements; the fb list is not requested.
        unsafe { ioctl_ptr(fd, DRM_IOCTL_MODE_GETRESOURCES, &mut fill)? };

        if (fill.count_crtcs, fill.count_connectors, fill.count_encoders) == counts {
            return Ok(out);
        }
        log::debug!("DRM resources changed during enumeration, retrying");
    }
    Err(io::Error::from_raw_os_error(libc::EAGAIN))
}

pub(crate) fn get_connector(fd: RawFd, connector_id: u32) -> io::Result<Connector> {
    for _ in 0..MAX_ENUMERATION_RETRIES {
        let mut counts = DrmModeGetConnector {
            connector_id,
            ..DrmModeGetConnector::default()
        };
        // SAFETY: zero counts and null pointers; the kernel only reports sizes.
        unsafe { ioctl_ptr(fd, DRM_IOCTL_MODE_GETCONNECTOR, &mut counts)? };

        let mut modes = vec![ModeInfo::default(); counts.count_modes as usize];
        let mut encoders = vec![0u32; counts.count_encoders as usize];
        let mut fill = DrmModeGetConnector {
            connector_id,
            modes_ptr: vec_ptr(&mut modes),
            encoders_ptr: vec_ptr(&mut encoders),
            count_modes: counts.count_modes,
            count_encoders: counts.count_encoders,
            ..DrmModeGetConnector::default()
        };
        // SAFETY: the mode and encoder arrays hold exactly the counts passed;
        // properties are not requested.
        unsafe { ioctl_ptr(fd, DRM_IOCTL_MODE_GETCONNECTOR, &mut fill)? };

        if fill.count_modes == counts.count_modes && fill.count_encoders == counts.count_encoders {
            return Ok(Connector {
                id: fill.connector_id,
                connection: fill.connection,
                encoder_id: fill.encoder_id,
                encoders,
                modes,
                mm_width: fill.mm_width,
                mm_height: fill.mm_height,
            });
        }
    }
    Err(io::Error::from_raw_os_error(libc::EAGAIN))
}

pub(crate) fn get_encoder(fd: RawFd, encoder_id: u32) -> io::Result<Encoder> {
    let mut enc = DrmModeGetEncoder {
        encoder_id,
        ..DrmModeGetEncoder::default()
    };
    // SAFETY: DRM_IOCTL_MODE_GETENCODER takes a struct drm_mode_get_encoder.
    unsafe { ioctl_ptr(fd, DRM_IOCTL_MODE_GETENCODER, &mut enc)? };
    Ok(Encoder {
        crtc_id: enc.crtc_id,
        possible_crtcs: enc.possible_crtcs,
    })
}

pub(crate) fn get_crtc(fd: RawFd, crtc_id: u32) -> io::Result<CrtcState> {
    let mut crtc = DrmModeCrtc {
        crtc_id,
        ..DrmModeCrtc::default()
    };
    // SAFETY: no connector list is passed when reading a CRTC.
    unsafe { ioctl_ptr(fd, DRM_IOCTL_MODE_GETCRTC, &mut crtc)? };
    Ok(CrtcState {
        crtc_id: crtc.crtc_id,
        fb_id: crtc.fb_id,
        x: crtc.x,
        y: crtc.y,
        mode: (crtc.mode_valid != 0).then_some(crtc.mode),
    })
}

pub(crate) fn set_crtc(
    fd: RawFd,
    crtc_id: u32,
    fb_id: u32,
    x: u32,
    y: u32,
    connectors: &[u32],
    mode: Option<&ModeInfo>,
) -> io::Result<()> {
    let mut crtc = DrmModeCrtc {
        set_connectors_ptr: connectors.as_ptr() as usize as u64,
        count_connectors: connectors.len() as u32,
        crtc_id,
        fb_id,
        x,
        y,
        mode_valid: mode.is_some() as u32,
        mode: mode.copied().unwrap_or_default(),
        ..DrmModeCrtc::default()
    };
    // SAFETY: the connector pointer addresses `count_connectors` u32 ids,
    // which the kernel only reads.
    unsafe { ioctl_ptr(fd, DRM_IOCTL_MODE_SETCRTC, &mut crtc) }
}

pub(crate) fn create_dumb(fd: RawFd, width: u32, height: u32, bpp: u32) -> io::Result<DumbBuffer> {
    let mut req = DrmModeCreateDumb {
        width,
        height,
        bpp,
        ..DrmModeCreateDumb::default()
    };
    // SAFETY: DRM_IOCTL_MODE_CREATE_DUMB takes a struct drm_mode_create_dumb.
    unsafe { ioctl_ptr(fd, DRM_IOCTL_MODE_CREATE_DUMB, &mut req)? };
    Ok(DumbBuffer {
        handle: req.handle,
        pitch: req.pitch,
        size: req.size,
    })
}

pub(crate) fn add_fb(
    fd: RawFd,
    width: u32,
    height: u32,
    depth: u32,
    bpp: u32,
    pitch: u32,
    handle: u32,
) -> io::Result<u32> {
    let mut cmd = DrmModeFbCmd {
        fb_id: 0,
        width,
        height,
        pitch,
        bpp,
        depth,
        handle,
    };
    // SAFETY: DRM_IOCTL_MODE_ADDFB takes a struct drm_mode_fb_cmd.
    unsafe { ioctl_ptr(fd, DRM_IOCTL_MODE_ADDFB, &mut cmd)? };
    Ok(cmd.fb_id)
}

pub(crate) fn map_dumb(fd: RawFd, handle: u32) -> io::Result<u64> {
    let mut req = DrmModeMapDumb {
        handle,
        ..DrmModeMapDumb::default()
    };
    // SAFETY: DRM_IOCTL_MODE_MAP_DUMB takes a struct drm_mode_map_dumb.
    unsafe { ioctl_ptr(fd, DRM_IOCTL_MODE_MAP_DUMB, &mut req)? };
    Ok(req.offset)
}

pub(crate) fn rm_fb(fd: RawFd, fb_id: u32) -> io::Result<()> {
    let mut id = fb_id;
    // SAFETY: DRM_IOCTL_MODE_RMFB takes a pointer to the framebuffer id.
    unsafe { ioctl_ptr(fd, DRM_IOCTL_MODE_RMFB, &mut id) }
}

pub(crate) fn destroy_dumb(fd: RawFd, handle: u32) -> io::Result<()> {
    let mut req = DrmModeDestroyDumb { handle };
    // SAFETY: DRM_IOCTL_MODE_DESTROY_DUMB takes a struct drm_mode_destroy_dumb.
    unsafe { ioctl_ptr(fd, DRM_IOCTL_MODE_DESTROY_DUMB, &mut req) }
}
