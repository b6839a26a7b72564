//! The display context.
//!
//! [`Display`] owns an acquired surface together with everything drawing
//! needs to know about it: the pixel format, the active window and the
//! compositor. It is the API the splash program talks to.

use std::path::Path;

use crate::blit::{BlitOp, Bitmap, Blitter};
use crate::color::Color;
use crate::fbdev::MappedSurface;
use crate::format::{PixelFormat, BYTES_PER_PIXEL};
use crate::kms::KmsSurface;
use crate::raster::Canvas;
use crate::surface::{AcquireFlags, DisplaySurface, Geometry, PresentModel, Rotation};
use crate::window::Window;
use crate::Result;

/// Common colours packed for one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub white: u32,
    pub gray: u32,
    pub black: u32,
}

impl Palette {
    pub fn new(format: &PixelFormat) -> Self {
        Self {
            red: format.pack_color(Color::RED),
            green: format.pack_color(Color::GREEN),
            blue: format.pack_color(Color::BLUE),
            white: format.pack_color(Color::WHITE),
            gray: format.pack_color(Color::GRAY),
            black: format.pack_color(Color::BLACK),
        }
    }
}

/// An acquired display and its drawing state.
pub struct Display {
    surface: Box<dyn DisplaySurface>,
    format: PixelFormat,
    geometry: Geometry,
    window: Window,
    blitter: Blitter,
    palette: Palette,
}

impl Display {
    /// Wrap an already acquired surface. The window starts out covering the
    /// whole screen.
    pub fn from_surface<S: DisplaySurface + 'static>(surface: S) -> Self {
        let format = surface.pixel_format();
        let geometry = surface.geometry();
        log::debug!(
            "display {}x{} ({}x{} mm) rotation {:?}, {:?}",
            geometry.width,
            geometry.height,
            geometry.width_mm,
            geometry.height_mm,
            geometry.rotation,
            surface.present_model()
        );
        Self {
            surface: Box::new(surface),
            format,
            geometry,
            window: Window::full(&geometry),
            blitter: Blitter::new(format, geometry.rotation),
            palette: Palette::new(&format),
        }
    }

    /// Acquire an fbdev framebuffer.
    pub fn acquire_fb(flags: AcquireFlags, device: Option<&Path>, tty: Option<&Path>) -> Result<Self> {
        MappedSurface::acquire(device, tty, flags).map(Self::from_surface)
    }

    /// Acquire a KMS device.
    pub fn acquire_drm(device: Option<&Path>) -> Result<Self> {
        KmsSurface::acquire(device).map(Self::from_surface)
    }

    /// Give the display back: restores the console and the display
    /// controller, unmaps and closes everything.
    pub fn release(self) {
        log::debug!("releasing display");
        drop(self);
    }

    // ── Window ───────────────────────────────────────────────────────

    pub fn set_window(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.window = Window::new(x, y, width, height, &self.geometry);
    }

    /// Centre a `width` x `height` window on the screen.
    pub fn set_center_window(&mut self, width: u32, height: u32) -> Result<()> {
        self.window = Window::centered(width, height, &self.geometry)?;
        Ok(())
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    // ── Colours ──────────────────────────────────────────────────────

    pub fn make_color(&self, color: Color) -> u32 {
        self.format.pack_color(color)
    }

    pub fn colors(&self) -> &Palette {
        &self.palette
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    // ── Drawing ──────────────────────────────────────────────────────

    fn canvas(&mut self) -> Canvas<'_> {
        let pitch = self.surface.pitch();
        Canvas::new(
            self.surface.write_buffer(),
            pitch,
            self.geometry.width as usize,
            &self.window,
        )
    }

    pub fn draw_pixel(&mut self, x: i32, y: i32, color: u32) {
        self.canvas().draw_pixel(x, y, color);
    }

    pub fn draw_hline(&mut self, x: i32, y: i32, len: i32, color: u32) {
        self.canvas().draw_hline(x, y, len, color);
    }

    pub fn draw_vline(&mut self, x: i32, y: i32, len: i32, color: u32) {
        self.canvas().draw_vline(x, y, len, color);
    }

    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        self.canvas().draw_line(x0, y0, x1, y1, color);
    }

    pub fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        self.canvas().draw_rect(x, y, w, h, color);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        self.canvas().fill_rect(x, y, w, h, color);
    }

    pub fn draw_circle(&mut self, cx: i32, cy: i32, r: i32, color: u32) {
        self.canvas().draw_circle(cx, cy, r, color);
    }

    pub fn fill_circle(&mut self, cx: i32, cy: i32, r: i32, color: u32) {
        self.canvas().fill_circle(cx, cy, r, color);
    }

    pub fn clear_screen(&mut self, color: u32) {
        self.canvas().clear_screen(color);
    }

    pub fn clear_window(&mut self, color: u32) {
        self.canvas().clear_window(color);
    }

    /// Packed word in the write buffer at a window-relative position.
    pub fn read_pixel(&mut self, x: i32, y: i32) -> Option<u32> {
        self.canvas().read_pixel(x, y)
    }

    /// Composite an RGBA8 image, `width * 4` bytes per row, at `(x, y)`.
    ///
    /// `key` is the background: partially transparent pixels are blended
    /// onto it and pixels of exactly that colour are skipped.
    #[allow(clippy::too_many_arguments)]
    pub fn blit(
        &mut self,
        pixels: &[u8],
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        key: Color,
        vflip: bool,
    ) -> Result<()> {
        let image = Bitmap::new(pixels, width, height)?;
        let op = BlitOp {
            dst_x: x,
            dst_y: y,
            key,
            vflip,
        };
        let pitch = self.surface.pitch();
        let mut canvas = Canvas::new(
            self.surface.write_buffer(),
            pitch,
            self.geometry.width as usize,
            &self.window,
        );
        self.blitter.blit(&mut canvas, &image, &op);
        Ok(())
    }

    // ── Presenting ───────────────────────────────────────────────────

    /// Make a window-relative region visible. Only shadow-buffered surfaces
    /// need this; elsewhere it does nothing.
    pub fn flush_rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        if self.surface.present_model() != PresentModel::Shadow {
            return;
        }
        if let Some(rect) = self.window.clip_rect(x, y, w, h) {
            self.surface.present_rect(rect);
        }
    }

    /// [`flush_rect`](Self::flush_rect) over the whole window.
    pub fn flush_window(&mut self) {
        if self.surface.present_model() != PresentModel::Shadow {
            return;
        }
        let rect = self.window.bounds();
        if !rect.is_empty() {
            self.surface.present_rect(rect);
        }
    }

    /// Hand the frame to the display controller.
    ///
    /// A failure leaves the display usable; drawing may continue and the
    /// next call retries.
    pub fn flush_surface(&mut self) -> Result<()> {
        self.surface.commit().inspect_err(|err| {
            log::error!("present failed: {err}");
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn screen_width(&self) -> u32 {
        self.geometry.width
    }

    pub fn screen_height(&self) -> u32 {
        self.geometry.height
    }

    pub fn screen_width_mm(&self) -> u32 {
        self.geometry.width_mm
    }

    pub fn screen_height_mm(&self) -> u32 {
        self.geometry.height_mm
    }

    pub fn window_width(&self) -> u32 {
        self.window.width()
    }

    pub fn window_height(&self) -> u32 {
        self.window.height()
    }

    pub fn rotation(&self) -> Rotation {
        self.geometry.rotation
    }

    pub fn present_model(&self) -> PresentModel {
        self.surface.present_model()
    }

    /// What is on screen, as tightly packed RGBA8 rows.
    pub fn snapshot_rgba(&self) -> Vec<u8> {
        let width = self.geometry.width as usize;
        let height = self.geometry.height as usize;
        let pitch = self.surface.pitch();
        let front = self.surface.front_buffer();

        let mut out = Vec::with_capacity(width * height * BYTES_PER_PIXEL);
        for row in 0..height {
            let start = row * pitch;
            let Some(line) = front.get(start..start + width * BYTES_PER_PIXEL) else {
                break;
            };
            for px in line.chunks_exact(BYTES_PER_PIXEL) {
                let word = u32::from_ne_bytes([px[0], px[1], px[2], px[3]]);
                let c = self.format.unpack(word);
                out.extend_from_slice(&[c.r, c.g, c.b, 0xff]);
            }
        }
        out
    }
}
