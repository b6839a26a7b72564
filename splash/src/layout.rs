//! Screen density, logo and message placement.
//!
//! Panels report their physical size, from which the logo and text are sized
//! so they look the same on a phone as on a monitor. A missing physical size
//! falls back to an assumed density.

use bootsplash_graphics::Geometry;

use crate::config::{ANIMATION_GAP_MM, B_MESSAGE_OFFSET_MM, FALLBACK_DPI, PT_TO_MM, TALL_LOGO_MM};

/// Convert millimetres to pixels at `dpi`.
pub fn mm_to_px(dpi: u32, mm: f32) -> f32 {
    (dpi as f64 / 25.4 * mm as f64) as f32
}

/// Screen density and the logo size derived from it.
///
/// Physical sizes are whole millimetres and the density is whole pixels per
/// millimetre; logo sizes are derived from those truncated values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenMetrics {
    pub width: u32,
    pub height: u32,
    pub width_mm: u32,
    pub height_mm: u32,
    pub dpi: u32,
    /// Whole pixels per millimetre, never zero.
    pub px_per_mm: u32,
    /// Largest logo edge, reduced so it fits the screen.
    pub max_logo_mm: u32,
    /// Logo size for images that are not tall.
    pub logo_px: f32,
}

impl ScreenMetrics {
    /// Largest logo edge in pixels.
    pub fn max_logo_px(&self) -> f32 {
        (self.max_logo_mm * self.px_per_mm) as f32
    }
}

/// Work out the density of `geometry`.
///
/// A `requested_dpi` overrides whatever the panel reports; the physical size
/// is then derived from it.
pub fn calculate_dpi(geometry: &Geometry, requested_dpi: Option<u32>, max_logo_mm: f32) -> ScreenMetrics {
    let (width, height) = (geometry.width, geometry.height);
    let mut dpi = requested_dpi.unwrap_or(0);

    if (geometry.width_mm < 1 || geometry.height_mm < 1) && dpi == 0 {
        log::warn!("display reports no physical size, assuming {FALLBACK_DPI} dpi");
        dpi = FALLBACK_DPI;
    }

    let (width_mm, height_mm) = if dpi > 0 {
        let to_mm = |px: u32| ((px as f32 / dpi as f32) as f64 * 25.4) as u32;
        (to_mm(width), to_mm(height))
    } else {
        dpi = ((width as f32 / geometry.width_mm as f32) as f64 * 25.4) as u32;
        (geometry.width_mm, geometry.height_mm)
    };

    let px_per_mm = ((width as f32 / width_mm.max(1) as f32) as u32).max(1);

    let mut max_logo_mm = max_logo_mm as u32;
    if max_logo_mm * px_per_mm > width {
        max_logo_mm = (width as f32 * 0.75 / px_per_mm as f32) as u32;
    }

    let mut logo_px = width.min(height) as f32 * 0.75;
    if width_mm > 0 && height_mm > 0 && width_mm.min(height_mm) as f32 > max_logo_mm as f32 * 1.2 {
        logo_px = (max_logo_mm * px_per_mm) as f32;
    }

    log::debug!(
        "{width}x{height} px, {width_mm}x{height_mm} mm, {dpi} dpi, {px_per_mm} px/mm, \
         logo {logo_px:.0} px (max {max_logo_mm} mm)"
    );

    ScreenMetrics {
        width,
        height,
        width_mm,
        height_mm,
        dpi,
        px_per_mm,
        max_logo_mm,
        logo_px,
    }
}

/// Where the logo goes and how large it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoPlacement {
    pub x: i32,
    pub y: i32,
    /// Scaled image size.
    pub width: u32,
    pub height: u32,
    /// Size of the drawn box on screen; swapped relative to the image on
    /// screens rotated by a quarter turn.
    pub box_width: u32,
    pub box_height: u32,
}

impl LogoPlacement {
    /// Top edge of the loading animation, just below the logo.
    pub fn animation_y(&self, dpi: u32) -> i32 {
        self.y + self.box_height as i32 + mm_to_px(dpi, ANIMATION_GAP_MM) as i32
    }
}

/// Scale an `image_width` x `image_height` logo for the screen and centre it.
///
/// Sizes are fractional for vector images.
pub fn place_logo(
    metrics: &ScreenMetrics,
    image_width: f32,
    image_height: f32,
    transposed: bool,
) -> LogoPlacement {
    let (w, h) = (image_width.max(1.0), image_height.max(1.0));

    let logo_px = if w < h * 1.1 {
        mm_to_px(metrics.dpi, TALL_LOGO_MM)
    } else {
        metrics.logo_px
    };

    let scale = logo_px / w.min(h);
    let mut width = w * scale + 0.5;
    let mut height = h * scale + 0.5;

    let limit = metrics.max_logo_px();
    if width > limit {
        let shrink = limit / width;
        width = limit;
        height *= shrink;
    }

    let (width, height) = ((width as u32).max(1), (height as u32).max(1));
    let (box_width, box_height) = if transposed {
        (height, width)
    } else {
        (width, height)
    };

    LogoPlacement {
        x: metrics.width as i32 / 2 - box_width as i32 / 2,
        y: metrics.height as i32 / 2 - box_height as i32 / 2,
        width,
        height,
        box_width,
        box_height,
    }
}

/// Left edge that centres a `width` wide text block.
pub fn message_x(metrics: &ScreenMetrics, width: u32) -> i32 {
    (metrics.width as i32 - width as i32) / 2
}

/// Top edge of the bottom message, a fixed gap above the bottom of the
/// screen.
pub fn bottom_message_y(metrics: &ScreenMetrics, height: u32) -> i32 {
    let gap = mm_to_px(metrics.dpi, B_MESSAGE_OFFSET_MM) as f64;
    (metrics.height as f64 - height as f64 - gap) as i32
}

/// Top edge of the message.
///
/// With a bottom message at `(y, size_pt)` it sits just above that;
/// otherwise two lines' worth of its own size above the bottom edge.
pub fn message_y(metrics: &ScreenMetrics, height: u32, size_pt: u32, bottom: Option<(i32, u32)>) -> i32 {
    let pt_px = |pt: u32| mm_to_px(metrics.dpi, pt as f32 * PT_TO_MM) as f64;
    match bottom {
        Some((bottom_y, bottom_pt)) => (bottom_y as f64 - height as f64 - pt_px(bottom_pt) * 0.6) as i32,
        None => (metrics.height as f64 - height as f64 - pt_px(size_pt) * 2.0) as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(width: u32, height: u32, width_mm: u32, height_mm: u32) -> Geometry {
        Geometry {
            width,
            height,
            width_mm,
            height_mm,
            ..Geometry::default()
        }
    }

    #[test]
    fn test_mm_to_px() {
        assert!((mm_to_px(254, 10.0) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_unknown_size_falls_back_to_300_dpi() {
        let m = calculate_dpi(&geometry(720, 1440, 0, 0), None, 45.0);
        assert_eq!(m.dpi, 300);
        // 60.96 mm wide, counted as 60.
        assert_eq!((m.width_mm, m.height_mm), (60, 121));
        assert_eq!(m.px_per_mm, 12);
        assert_eq!(m.logo_px, 540.0);
    }

    #[test]
    fn test_fractional_size_from_requested_dpi_is_truncated() {
        // 200 px at 300 dpi is 16.93 mm.
        let m = calculate_dpi(&geometry(200, 100, 90, 45), Some(300), 45.0);
        assert_eq!((m.width_mm, m.height_mm), (16, 8));
        assert_eq!(m.px_per_mm, 12);
        // 45 mm does not fit: 75% of 200 px at 12 px/mm is 12.5 mm.
        assert_eq!(m.max_logo_mm, 12);
        assert_eq!(m.max_logo_px(), 144.0);
    }

    #[test]
    fn test_max_logo_is_whole_millimetres() {
        let m = calculate_dpi(&geometry(1920, 1080, 500, 281), None, 30.7);
        assert_eq!(m.max_logo_mm, 30);
        assert_eq!(m.logo_px, 90.0);
    }

    #[test]
    fn test_dpi_from_panel_size() {
        // 1920 px over 500 mm is 97.5 dpi.
        let m = calculate_dpi(&geometry(1920, 1080, 500, 281), None, 45.0);
        assert_eq!(m.dpi, 97);
        assert_eq!(m.px_per_mm, 3);
        // Large panel: the logo is capped at the maximum size.
        assert_eq!(m.logo_px, 45.0 * 3.0);
    }

    #[test]
    fn test_explicit_dpi_wins() {
        let m = calculate_dpi(&geometry(1000, 1000, 500, 500), Some(254), 45.0);
        assert_eq!(m.dpi, 254);
        assert_eq!(m.px_per_mm, 10);
        assert_eq!(m.width_mm, 100);
    }

    #[test]
    fn test_max_logo_clamped_to_narrow_screen() {
        // 10 px/mm, 200 px wide: 45 mm would be 450 px.
        let m = calculate_dpi(&geometry(200, 400, 20, 40), None, 45.0);
        assert_eq!(m.px_per_mm, 10);
        assert_eq!(m.max_logo_mm, 15);
        assert_eq!(m.logo_px, 150.0);
    }

    #[test]
    fn test_wide_logo_is_centred_and_limited() {
        let m = calculate_dpi(&geometry(1920, 1080, 500, 281), None, 45.0);
        let p = place_logo(&m, 400.0, 100.0, false);
        assert_eq!(p.width, 135);
        assert_eq!(p.height, 33);
        assert_eq!(p.x, 960 - 67);
        assert_eq!(p.y, 540 - 16);
    }

    #[test]
    fn test_tall_logo_uses_fixed_size() {
        let m = calculate_dpi(&geometry(1000, 1000, 100, 100), None, 45.0);
        assert_eq!(m.dpi, 254);
        let p = place_logo(&m, 100.0, 100.0, false);
        // 25 mm at 10 px/mm.
        assert_eq!((p.width, p.height), (250, 250));
        assert_eq!((p.x, p.y), (375, 375));
    }

    #[test]
    fn test_transposed_box() {
        let m = calculate_dpi(&geometry(1000, 1000, 100, 100), None, 45.0);
        let p = place_logo(&m, 200.0, 100.0, true);
        assert_eq!((p.box_width, p.box_height), (p.height, p.width));
    }

    #[test]
    fn test_fractional_image_size() {
        let m = calculate_dpi(&geometry(1000, 1000, 100, 100), None, 45.0);
        // Scaled to 676 x 450.5, then limited to 45 mm.
        let p = place_logo(&m, 150.5, 100.25, false);
        assert_eq!(p.width, 450);
        assert_eq!(p.height, 299);
    }

    #[test]
    fn test_message_positions() {
        // 254 dpi: 10 px per mm.
        let m = calculate_dpi(&geometry(1000, 1000, 100, 100), None, 45.0);
        assert_eq!(message_x(&m, 200), 400);
        // 3 mm above the bottom edge.
        let bottom = bottom_message_y(&m, 20);
        assert_eq!(bottom, 1000 - 20 - 30);
        // 0.6 of 6 pt (22.8 px) above the bottom message: 906.3.
        assert_eq!(message_y(&m, 30, 9, Some((bottom, 6))), 906);
        // Without one, two lines of 9 pt (34.2 px each) above the edge: 901.6.
        assert_eq!(message_y(&m, 30, 9, None), 901);
    }

    #[test]
    fn test_message_wider_than_screen() {
        let m = calculate_dpi(&geometry(100, 100, 10, 10), None, 45.0);
        assert_eq!(message_x(&m, 101), 0);
        assert_eq!(message_x(&m, 104), -2);
    }

    #[test]
    fn test_animation_sits_below_logo() {
        let m = calculate_dpi(&geometry(1000, 1000, 100, 100), None, 45.0);
        let p = place_logo(&m, 100.0, 100.0, false);
        assert_eq!(p.animation_y(m.dpi), 375 + 250 + 50);
    }
}
