//! Property 4: Compositor blending
//!
//! Opaque source pixels come out unchanged, fully transparent ones leave
//! the destination alone, and half-alpha pixels over black come out at
//! half intensity (integer floor).

use bootsplash_graphics::blit::blend;
use bootsplash_graphics::{Color, Display, MemorySurface, PresentModel};
use proptest::prelude::*;

fn blit_one(rgba: [u8; 4], key: Color) -> [u8; 3] {
    let mut display = Display::from_surface(MemorySurface::new(4, 4, PresentModel::Direct));
    let gray = display.colors().gray;
    display.clear_screen(gray);
    display.blit(&rgba, 1, 1, 1, 1, key, false).unwrap();
    let shot = display.snapshot_rgba();
    let off = (4 + 1) * 4;
    [shot[off], shot[off + 1], shot[off + 2]]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn opaque_is_copied(r: u8, g: u8, b: u8) {
        let key = Color::new(r.wrapping_add(1), g, b);
        prop_assert_eq!(blit_one([r, g, b, 255], key), [r, g, b]);
    }

    #[test]
    fn transparent_is_skipped(r: u8, g: u8, b: u8) {
        prop_assert_eq!(blit_one([r, g, b, 0], Color::BLACK), [128, 128, 128]);
    }

    #[test]
    fn key_colour_is_skipped(r: u8, g: u8, b: u8, a in 1..=255u8) {
        prop_assert_eq!(blit_one([r, g, b, a], Color::new(r, g, b)), [128, 128, 128]);
    }

    #[test]
    fn half_alpha_on_black_halves(r in 1..=255u8, g: u8, b: u8) {
        let out = blend(Color::with_alpha(r, g, b, 128), Color::BLACK);
        prop_assert_eq!(out.r, r / 2);
        prop_assert_eq!(out.g, g / 2);
        prop_assert_eq!(out.b, b / 2);
        prop_assert_eq!(blit_one([r, g, b, 128], Color::BLACK), [r / 2, g / 2, b / 2]);
    }
}
