//! The drawing window.
//!
//! Every primitive takes window-relative coordinates. The window translates
//! them by its absolute origin (panning base plus window offset) and clips
//! the result to the window intersected with the screen, so that no write
//! can ever leave the mapped buffer. Clipping is silent: a draw that falls
//! entirely outside simply does nothing.

use std::ops::Range;

use crate::surface::{ClipRect, Geometry};
use crate::{GraphicsError, Result};

/// A clipped, offset drawing rectangle inside a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Absolute position of window-relative `(0, 0)`.
    origin_x: i64,
    origin_y: i64,
    width: u32,
    height: u32,
    // Clip bounds, absolute, half-open, already limited to the screen.
    min_x: i64,
    min_y: i64,
    max_x: i64,
    max_y: i64,
}

impl Window {
    /// Window at `(x, y)` relative to the visible area of `geometry`.
    ///
    /// A window reaching past the screen is accepted; the overflow is
    /// logged and clipped away.
    pub fn new(x: i32, y: i32, width: u32, height: u32, geometry: &Geometry) -> Self {
        let origin_x = geometry.base_x as i64 + x as i64;
        let origin_y = geometry.base_y as i64 + y as i64;
        let end_x = origin_x + width as i64;
        let end_y = origin_y + height as i64;
        // The visible area starts at the panning base.
        let (screen_x, screen_y) = (geometry.base_x as i64, geometry.base_y as i64);
        let screen_w = screen_x + geometry.width as i64;
        let screen_h = screen_y + geometry.height as i64;

        if origin_x < screen_x || origin_y < screen_y || end_x > screen_w || end_y > screen_h {
            log::warn!(
                "window {width}x{height}+{x}+{y} exceeds the {}x{} screen, clipping",
                geometry.width,
                geometry.height
            );
        }

        Self {
            origin_x,
            origin_y,
            width,
            height,
            min_x: origin_x.max(screen_x),
            min_y: origin_y.max(screen_y),
            max_x: end_x.min(screen_w),
            max_y: end_y.min(screen_h),
        }
    }

    /// The whole visible screen.
    pub fn full(geometry: &Geometry) -> Self {
        Self::new(0, 0, geometry.width, geometry.height, geometry)
    }

    /// A `width` x `height` window centred on the screen.
    pub fn centered(width: u32, height: u32, geometry: &Geometry) -> Result<Self> {
        if width > geometry.width || height > geometry.height {
            return Err(GraphicsError::InvalidWindow {
                width,
                height,
                screen_width: geometry.width,
                screen_height: geometry.height,
            });
        }
        let x = ((geometry.width - width) / 2) as i32;
        let y = ((geometry.height - height) / 2) as i32;
        Ok(Self::new(x, y, width, height, geometry))
    }

    /// Requested width, before clipping.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Requested height, before clipping.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Absolute region that drawing through this window may touch.
    pub fn bounds(&self) -> ClipRect {
        ClipRect {
            x: self.min_x as usize,
            y: self.min_y as usize,
            width: (self.max_x - self.min_x).max(0) as usize,
            height: (self.max_y - self.min_y).max(0) as usize,
        }
    }

    /// Absolute position of window-relative `(0, 0)`.
    pub fn origin(&self) -> (i64, i64) {
        (self.origin_x, self.origin_y)
    }

    /// Visible columns and rows in window-relative coordinates, or `None`
    /// when nothing of the window is on screen.
    pub fn visible(&self) -> Option<(Range<i64>, Range<i64>)> {
        if self.max_x <= self.min_x || self.max_y <= self.min_y {
            return None;
        }
        Some((
            self.min_x - self.origin_x..self.max_x - self.origin_x,
            self.min_y - self.origin_y..self.max_y - self.origin_y,
        ))
    }

    /// Absolute position of a window-relative point, if visible.
    #[inline]
    pub fn clip_point(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        let ax = self.origin_x + x as i64;
        let ay = self.origin_y + y as i64;
        if ax < self.min_x || ax >= self.max_x || ay < self.min_y || ay >= self.max_y {
            return None;
        }
        Some((ax as usize, ay as usize))
    }

    /// Visible part of the row `[x, x + len)` at `y`, as `(x, y, len)`.
    pub fn clip_hspan(&self, x: i32, y: i32, len: i32) -> Option<(usize, usize, usize)> {
        let ay = self.origin_y + y as i64;
        if ay < self.min_y || ay >= self.max_y {
            return None;
        }
        let (start, len) = clip_axis(self.origin_x + x as i64, len as i64, self.min_x, self.max_x)?;
        Some((start, ay as usize, len))
    }

    /// Visible part of the column `[y, y + len)` at `x`, as `(x, y, len)`.
    pub fn clip_vspan(&self, x: i32, y: i32, len: i32) -> Option<(usize, usize, usize)> {
        let ax = self.origin_x + x as i64;
        if ax < self.min_x || ax >= self.max_x {
            return None;
        }
        let (start, len) = clip_axis(self.origin_y + y as i64, len as i64, self.min_y, self.max_y)?;
        Some((ax as usize, start, len))
    }

    /// Visible part of a rectangle. Negative extents grow from the anchor
    /// towards smaller coordinates.
    pub fn clip_rect(&self, x: i32, y: i32, width: i32, height: i32) -> Option<ClipRect> {
        let (x, width) = normalize(x as i64, width as i64);
        let (y, height) = normalize(y as i64, height as i64);
        let (ax, w) = clip_axis(self.origin_x + x, width, self.min_x, self.max_x)?;
        let (ay, h) = clip_axis(self.origin_y + y, height, self.min_y, self.max_y)?;
        Some(ClipRect {
            x: ax,
            y: ay,
            width: w,
            height: h,
        })
    }
}

fn normalize(start: i64, len: i64) -> (i64, i64) {
    if len < 0 {
        (start + len, -len)
    } else {
        (start, len)
    }
}

/// Intersect `[start, start + len)` with `[min, max)`.
fn clip_axis(start: i64, len: i64, min: i64, max: i64) -> Option<(usize, usize)> {
    if len <= 0 {
        return None;
    }
    let lo = start.max(min);
    let hi = (start + len).min(max);
    if hi <= lo {
        return None;
    }
    Some((lo as usize, (hi - lo) as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen(width: u32, height: u32) -> Geometry {
        Geometry {
            width,
            height,
            ..Geometry::default()
        }
    }

    #[test]
    fn test_point_translation_and_clipping() {
        let win = Window::new(10, 10, 100, 100, &screen(200, 200));
        assert_eq!(win.clip_point(0, 0), Some((10, 10)));
        assert_eq!(win.clip_point(99, 99), Some((109, 109)));
        assert_eq!(win.clip_point(100, 0), None);
        assert_eq!(win.clip_point(-1, 5), None);
    }

    #[test]
    fn test_hspan_negative_start() {
        let win = Window::new(10, 10, 100, 100, &screen(200, 200));
        assert_eq!(win.clip_hspan(-5, 0, 20), Some((10, 10, 15)));
        assert_eq!(win.clip_hspan(90, 0, 50), Some((100, 10, 10)));
        assert_eq!(win.clip_hspan(0, 100, 5), None);
        assert_eq!(win.clip_hspan(-30, 0, 20), None);
        assert_eq!(win.clip_hspan(0, 0, -4), None);
    }

    #[test]
    fn test_vspan_symmetric() {
        let win = Window::new(10, 10, 100, 100, &screen(200, 200));
        assert_eq!(win.clip_vspan(0, -5, 20), Some((10, 10, 15)));
        assert_eq!(win.clip_vspan(100, 0, 5), None);
    }

    #[test]
    fn test_rect_normalizes_negative_extent() {
        let win = Window::new(0, 0, 50, 50, &screen(50, 50));
        let rect = win.clip_rect(10, 10, -5, -5).unwrap();
        assert_eq!(
            rect,
            ClipRect {
                x: 5,
                y: 5,
                width: 5,
                height: 5
            }
        );
    }

    #[test]
    fn test_window_limited_to_screen() {
        let win = Window::new(150, 150, 100, 100, &screen(200, 200));
        assert_eq!(win.width(), 100);
        let bounds = win.bounds();
        assert_eq!((bounds.width, bounds.height), (50, 50));
        assert_eq!(win.clip_point(60, 10), None);
    }

    #[test]
    fn test_panning_base_offsets_origin() {
        let geom = Geometry {
            width: 100,
            height: 100,
            base_x: 4,
            base_y: 2,
            ..Geometry::default()
        };
        let win = Window::new(1, 1, 10, 10, &geom);
        assert_eq!(win.clip_point(0, 0), Some((5, 3)));
    }

    #[test]
    fn test_panned_screen_clips_to_visible_area() {
        let geom = Geometry {
            width: 100,
            height: 50,
            base_x: 20,
            base_y: 50,
            ..Geometry::default()
        };
        let win = Window::full(&geom);
        assert_eq!(
            win.bounds(),
            ClipRect {
                x: 20,
                y: 50,
                width: 100,
                height: 50
            }
        );
        assert_eq!(win.clip_point(99, 49), Some((119, 99)));
        assert_eq!(win.clip_point(100, 0), None);
        assert_eq!(win.clip_point(0, 50), None);
        assert_eq!(win.clip_point(-1, 0), None);

        // A window hanging off the right edge stops at the visible area.
        let win = Window::new(90, 0, 20, 10, &geom);
        assert_eq!(win.clip_hspan(0, 0, 20), Some((110, 50, 10)));
        assert_eq!(win.clip_hspan(0, -1, 20), None);
    }

    #[test]
    fn test_visible_range_is_window_relative() {
        let win = Window::new(-5, 150, 100, 100, &screen(200, 200));
        assert_eq!(win.visible(), Some((5..100, 0..50)));
        assert_eq!(win.origin(), (-5, 150));
        let off = Window::new(300, 0, 10, 10, &screen(200, 200));
        assert_eq!(off.visible(), None);
    }

    #[test]
    fn test_centered() {
        let win = Window::centered(100, 50, &screen(300, 200)).unwrap();
        assert_eq!(win.clip_point(0, 0), Some((100, 75)));
        let err = Window::centered(400, 50, &screen(300, 200));
        assert!(matches!(err, Err(GraphicsError::InvalidWindow { .. })));
    }

    #[test]
    fn test_extreme_coordinates_do_not_wrap() {
        let win = Window::new(0, 0, 10, 10, &screen(10, 10));
        assert_eq!(win.clip_hspan(i32::MAX, 0, i32::MAX), None);
        assert_eq!(win.clip_hspan(i32::MIN, 0, i32::MAX), None);
        assert_eq!(win.clip_rect(i32::MIN, i32::MIN, i32::MAX, i32::MAX), None);
    }
}
