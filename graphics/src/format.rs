//! Pixel format resolution.
//!
//! The fbdev backend reads the channel layout from the variable screen info;
//! the KMS backend always uses XRGB8888. Either way the result is three
//! `(position, width, mask)` triples inside a 32-bit pixel.

use crate::color::Color;
use crate::{GraphicsError, Result};

/// Bits per pixel of every supported surface.
pub const BITS_PER_PIXEL: u32 = 32;

/// Bytes per pixel of every supported surface.
pub const BYTES_PER_PIXEL: usize = 4;

/// One color channel inside a pixel word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    /// Bit offset of the least significant bit.
    pub position: u8,
    /// Number of bits.
    pub width: u8,
    /// `((1 << width) - 1) << position`
    pub mask: u32,
}

impl Channel {
    /// Build a channel, rejecting layouts that do not fit a 32-bit pixel.
    pub fn new(position: u32, width: u32) -> Result<Self> {
        let fits = matches!(position.checked_add(width), Some(end) if end <= BITS_PER_PIXEL);
        if width == 0 || !fits {
            return Err(GraphicsError::unsupported(format!(
                "channel at bit {position} with width {width} does not fit 32 bits"
            )));
        }
        let ones = u32::MAX >> (BITS_PER_PIXEL - width);
        Ok(Self {
            position: position as u8,
            width: width as u8,
            mask: ones << position,
        })
    }

    const fn byte(position: u8) -> Self {
        Self {
            position,
            width: 8,
            mask: 0xff << position,
        }
    }

    #[inline]
    fn place(self, value: u8) -> u32 {
        ((value as u32) << self.position) & self.mask
    }

    #[inline]
    fn extract(self, word: u32) -> u8 {
        ((word & self.mask) >> self.position) as u8
    }
}

/// A channel as reported by the driver: offset, length and bit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bitfield {
    pub offset: u32,
    pub length: u32,
    /// Non-zero when the most significant bit comes first.
    pub msb_right: u32,
}

/// Channel layout of a 32-bit surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    pub red: Channel,
    pub green: Channel,
    pub blue: Channel,
}

impl PixelFormat {
    /// The fixed layout used for KMS dumb buffers.
    pub const fn xrgb8888() -> Self {
        Self {
            red: Channel::byte(16),
            green: Channel::byte(8),
            blue: Channel::byte(0),
        }
    }

    /// Resolve the layout reported by a driver.
    pub fn from_bitfields(
        bits_per_pixel: u32,
        red: Bitfield,
        green: Bitfield,
        blue: Bitfield,
    ) -> Result<Self> {
        if bits_per_pixel != BITS_PER_PIXEL {
            return Err(GraphicsError::unsupported(format!(
                "{BITS_PER_PIXEL} bpp required, got {bits_per_pixel}"
            )));
        }
        if red.msb_right != 0 || green.msb_right != 0 || blue.msb_right != 0 {
            return Err(GraphicsError::unsupported(format!(
                "msb-first channels ({} {} {})",
                red.msb_right, green.msb_right, blue.msb_right
            )));
        }

        let format = Self {
            red: Channel::new(red.offset, red.length)?,
            green: Channel::new(green.offset, green.length)?,
            blue: Channel::new(blue.offset, blue.length)?,
        };

        let (r, g, b) = (format.red.mask, format.green.mask, format.blue.mask);
        if r & g != 0 || r & b != 0 || g & b != 0 {
            return Err(GraphicsError::unsupported(format!(
                "overlapping channel masks {r:#010x} {g:#010x} {b:#010x}"
            )));
        }
        Ok(format)
    }

    /// Framebuffer word for the given channels.
    #[inline]
    pub fn pack(&self, r: u8, g: u8, b: u8) -> u32 {
        self.red.place(r) | self.green.place(g) | self.blue.place(b)
    }

    /// Framebuffer word for a color; alpha is ignored.
    #[inline]
    pub fn pack_color(&self, color: Color) -> u32 {
        self.pack(color.r, color.g, color.b)
    }

    /// Opaque color stored in a framebuffer word.
    ///
    /// Channels narrower than 8 bits come back unscaled.
    pub fn unpack(&self, word: u32) -> Color {
        Color::new(
            self.red.extract(word),
            self.green.extract(word),
            self.blue.extract(word),
        )
    }
}
