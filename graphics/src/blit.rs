//! RGBA8 image compositor
//!
//! Copies a non-premultiplied RGBA8 bitmap into the active window. Partial
//! alpha is blended against the solid key colour rather than against what is
//! already in the framebuffer; fully transparent pixels and pixels matching
//! the key are skipped, leaving the destination as it was.

use crate::color::Color;
use crate::format::{PixelFormat, BYTES_PER_PIXEL};
use crate::raster::Canvas;
use crate::surface::Rotation;
use crate::{GraphicsError, Result};

/// A borrowed row-major RGBA8 image, stride `width * 4`.
#[derive(Debug, Clone, Copy)]
pub struct Bitmap<'a> {
    pixels: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> Bitmap<'a> {
    /// Wrap `pixels`, which must hold at least `width * height * 4` bytes.
    pub fn new(pixels: &'a [u8], width: u32, height: u32) -> Result<Self> {
        let needed = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
            .unwrap_or(usize::MAX);
        if pixels.len() < needed {
            return Err(GraphicsError::SourceTooSmall {
                len: pixels.len(),
                needed,
            });
        }
        Ok(Self {
            pixels: &pixels[..needed],
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn pixel(&self, i: usize, j: usize) -> Color {
        let off = (j * self.width as usize + i) * BYTES_PER_PIXEL;
        Color::from_rgba_bytes(&self.pixels[off..off + BYTES_PER_PIXEL])
    }
}

/// Blit operation configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct BlitOp {
    /// Window-relative destination anchor
    pub dst_x: i32,
    pub dst_y: i32,
    /// Background colour: blend target, and skipped when matched exactly
    pub key: Color,
    /// Mirror vertically
    pub vflip: bool,
}

/// Compositor for one surface.
pub struct Blitter {
    format: PixelFormat,
    rotation: Rotation,
    /// Last blended colour and its framebuffer word
    cache: Option<(Color, u32)>,
}

impl Blitter {
    pub fn new(format: PixelFormat, rotation: Rotation) -> Self {
        Self {
            format,
            rotation,
            cache: None,
        }
    }

    #[inline]
    fn pack(&mut self, color: Color) -> u32 {
        match self.cache {
            Some((cached, word)) if cached.rgb_eq(color) => word,
            _ => {
                let word = self.format.pack_color(color);
                self.cache = Some((color, word));
                word
            }
        }
    }

    /// Composite `image` into the canvas.
    ///
    /// The destination box is remapped for the surface rotation; a vertical
    /// flip adds half a turn to it.
    pub fn blit(&mut self, canvas: &mut Canvas<'_>, image: &Bitmap<'_>, op: &BlitOp) {
        let rotation = self.rotation.rotate(if op.vflip { 2 } else { 0 });
        let (w, h) = (image.width as i64, image.height as i64);
        let key = op.key;
        log::trace!(
            "blit {}x{} at ({}, {}) rotation {:?}",
            w,
            h,
            op.dst_x,
            op.dst_y,
            rotation
        );

        for j in 0..image.height as usize {
            for i in 0..image.width as usize {
                let src = image.pixel(i, j);
                if src.a == 0 || src.rgb_eq(key) {
                    continue;
                }
                let color = if src.a == u8::MAX { src } else { blend(src, key) };
                let word = self.pack(color);

                let (i, j) = (i as i64, j as i64);
                let (dx, dy) = match rotation {
                    Rotation::Deg0 => (i, j),
                    Rotation::Deg90 => (h - 1 - j, i),
                    Rotation::Deg180 => (w - 1 - i, h - 1 - j),
                    Rotation::Deg270 => (j, w - 1 - i),
                };
                let x = op.dst_x as i64 + dx;
                let y = op.dst_y as i64 + dy;
                if let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) {
                    canvas.draw_pixel(x, y, word);
                }
            }
        }
    }
}

/// `(src * a + bg * (255 - a)) >> 8` per channel.
#[inline]
pub fn blend(src: Color, bg: Color) -> Color {
    let a = src.a as u32;
    let mix = |s: u8, b: u8| ((s as u32 * a + b as u32 * (255 - a)) >> 8) as u8;
    Color::with_alpha(mix(src.r, bg.r), mix(src.g, bg.g), mix(src.b, bg.b), src.a)
}
