//! Property 5: Window clear round trip
//!
//! After `set_window` and `clear_window(c)`, every pixel inside the window
//! reads back as `c` and every pixel just outside keeps its old value.
//! Includes the fixed scenario of a rectangle anchored above and left of
//! an offset window.

use bootsplash_graphics::{Color, Display, MemorySurface, PresentModel};
use proptest::prelude::*;

const W: u32 = 200;
const H: u32 = 200;

fn rgb_at(shot: &[u8], x: u32, y: u32) -> [u8; 3] {
    let off = ((y * W + x) * 4) as usize;
    [shot[off], shot[off + 1], shot[off + 2]]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn clear_window_round_trip(
        x in 1..W / 2,
        y in 1..H / 2,
        w in 1..W / 2 - 1,
        h in 1..H / 2 - 1,
        r: u8, g: u8, b: u8,
    ) {
        let mut display = Display::from_surface(MemorySurface::new(W, H, PresentModel::Direct));
        let black = display.colors().black;
        display.clear_screen(black);
        display.set_window(x as i32, y as i32, w, h);
        let color = display.make_color(Color::new(r, g, b));
        display.clear_window(color);

        prop_assert_eq!(display.read_pixel(0, 0), Some(color));
        prop_assert_eq!(display.read_pixel(w as i32 - 1, h as i32 - 1), Some(color));

        let shot = display.snapshot_rgba();
        prop_assert_eq!(rgb_at(&shot, x, y), [r, g, b]);
        prop_assert_eq!(rgb_at(&shot, x + w - 1, y + h - 1), [r, g, b]);
        prop_assert_eq!(rgb_at(&shot, x - 1, y), [0, 0, 0]);
        prop_assert_eq!(rgb_at(&shot, x, y - 1), [0, 0, 0]);
        prop_assert_eq!(rgb_at(&shot, x + w, y + h - 1), [0, 0, 0]);
        prop_assert_eq!(rgb_at(&shot, x + w - 1, y + h), [0, 0, 0]);
    }
}

#[test]
fn fill_rect_clipped_to_offset_window() {
    let mut display = Display::from_surface(MemorySurface::new(W, H, PresentModel::Direct));
    display.set_window(10, 10, 100, 100);
    let red = display.colors().red;
    display.fill_rect(-5, -5, 20, 20, red);

    let shot = display.snapshot_rgba();
    let mut painted = 0;
    for y in 0..H {
        for x in 0..W {
            let expected = if (10..25).contains(&x) && (10..25).contains(&y) {
                painted += 1;
                [255, 0, 0]
            } else {
                [0, 0, 0]
            };
            assert_eq!(rgb_at(&shot, x, y), expected, "pixel ({x}, {y})");
        }
    }
    assert_eq!(painted, 15 * 15);
}
