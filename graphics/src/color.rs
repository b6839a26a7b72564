//! Color representation.
//!
//! A [`Color`] is four 8-bit channels. Its packed form is the 32-bit word
//! obtained by reading one pixel of an RGBA8 buffer as little-endian:
//! `r | g << 8 | b << 16 | a << 24`. This packed word is *not* the
//! framebuffer representation; use [`crate::PixelFormat::pack_color`] for that.

/// Non-premultiplied RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);
    pub const GRAY: Color = Color::new(128, 128, 128);

    /// Opaque color from channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Color from a packed RGBA8 word.
    pub const fn from_packed(word: u32) -> Self {
        let [r, g, b, a] = word.to_le_bytes();
        Self { r, g, b, a }
    }

    /// Packed RGBA8 word.
    pub const fn to_packed(self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }

    /// Color from the first four bytes of an RGBA8 pixel.
    #[inline]
    pub fn from_rgba_bytes(px: &[u8]) -> Self {
        Self::with_alpha(px[0], px[1], px[2], px[3])
    }

    /// Compare only the red, green and blue channels.
    #[inline]
    pub const fn rgb_eq(self, other: Color) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }

    /// Color from a `0xRRGGBB` value.
    pub const fn from_hex(hex: u32) -> Self {
        Self::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_views() {
        let c = Color::with_alpha(0x11, 0x22, 0x33, 0x44);
        assert_eq!(c.to_packed(), 0x4433_2211);
        assert_eq!(Color::from_packed(0x4433_2211), c);
        assert_eq!(Color::from_rgba_bytes(&[0x11, 0x22, 0x33, 0x44]), c);
    }

    #[test]
    fn test_rgb_eq_ignores_alpha() {
        let a = Color::with_alpha(1, 2, 3, 0);
        let b = Color::with_alpha(1, 2, 3, 255);
        assert!(a.rgb_eq(b));
        assert_ne!(a, b);
        assert!(!a.rgb_eq(Color::new(1, 2, 4)));
    }

    #[test]
    fn test_from_hex() {
        assert_eq!(Color::from_hex(0xff8000), Color::new(255, 128, 0));
    }
}
