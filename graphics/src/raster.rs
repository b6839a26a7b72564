//! Rasterization primitives.
//!
//! A [`Canvas`] borrows a surface's write buffer for the duration of a
//! drawing call and writes packed framebuffer words into it. Coordinates are
//! window-relative; all clipping goes through [`Window`].

use crate::format::BYTES_PER_PIXEL;
use crate::surface::ClipRect;
use crate::window::Window;

/// Drawing target: a pixel buffer, its layout and the active window.
pub struct Canvas<'a> {
    buf: &'a mut [u8],
    pitch: usize,
    screen_width: usize,
    window: &'a Window,
}

impl<'a> Canvas<'a> {
    /// `screen_width` is in pixels; `pitch` in bytes.
    pub fn new(buf: &'a mut [u8], pitch: usize, screen_width: usize, window: &'a Window) -> Self {
        Self {
            buf,
            pitch,
            screen_width,
            window,
        }
    }

    pub fn window(&self) -> &Window {
        self.window
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        y * self.pitch + x * BYTES_PER_PIXEL
    }

    #[inline]
    fn put(&mut self, x: usize, y: usize, color: u32) {
        let off = self.offset(x, y);
        if let Some(px) = self.buf.get_mut(off..off + BYTES_PER_PIXEL) {
            px.copy_from_slice(&color.to_ne_bytes());
        }
    }

    fn fill_span(&mut self, x: usize, y: usize, len: usize, color: u32) {
        let start = self.offset(x, y);
        let end = (start + len * BYTES_PER_PIXEL).min(self.buf.len());
        if start >= end {
            return;
        }
        let word = color.to_ne_bytes();
        for px in self.buf[start..end].chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&word);
        }
    }

    fn fill_clip(&mut self, rect: ClipRect, color: u32) {
        for row in rect.y..rect.y + rect.height {
            self.fill_span(rect.x, row, rect.width, color);
        }
    }

    /// Set one pixel.
    #[inline]
    pub fn draw_pixel(&mut self, x: i32, y: i32, color: u32) {
        if let Some((ax, ay)) = self.window.clip_point(x, y) {
            self.put(ax, ay, color);
        }
    }

    /// Packed word at a window-relative position, if visible.
    pub fn read_pixel(&self, x: i32, y: i32) -> Option<u32> {
        let (ax, ay) = self.window.clip_point(x, y)?;
        let off = self.offset(ax, ay);
        let px = self.buf.get(off..off + BYTES_PER_PIXEL)?;
        Some(u32::from_ne_bytes([px[0], px[1], px[2], px[3]]))
    }

    pub fn draw_hline(&mut self, x: i32, y: i32, len: i32, color: u32) {
        if let Some((ax, ay, len)) = self.window.clip_hspan(x, y, len) {
            self.fill_span(ax, ay, len, color);
        }
    }

    pub fn draw_vline(&mut self, x: i32, y: i32, len: i32, color: u32) {
        if let Some((ax, ay, len)) = self.window.clip_vspan(x, y, len) {
            for row in ay..ay + len {
                self.put(ax, row, color);
            }
        }
    }

    /// Fill a rectangle; negative extents grow towards smaller coordinates.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        if let Some(rect) = self.window.clip_rect(x, y, w, h) {
            self.fill_clip(rect, color);
        }
    }

    /// One-pixel rectangle outline.
    pub fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        let right = x.saturating_add(w).saturating_sub(1);
        let bottom = y.saturating_add(h).saturating_sub(1);
        self.draw_hline(x, y, w, color);
        self.draw_vline(x, y, h, color);
        self.draw_vline(right, y, h, color);
        self.draw_hline(x, bottom, w, color);
    }

    /// Midpoint line from `(x0, y0)` to `(x1, y1)`, both endpoints included.
    ///
    /// Plots exactly `max(|dx|, |dy|) + 1` points. The endpoints are
    /// ordered along the major axis first, so a line and its reverse cover
    /// the same pixels.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
        let swap_xy = (y1 - y0).abs() > (x1 - x0).abs();

        // Work in (major, minor) coordinates.
        let (mut a0, mut b0, mut a1, mut b1) = if swap_xy {
            (y0, x0, y1, x1)
        } else {
            (x0, y0, x1, y1)
        };
        if a0 > a1 {
            std::mem::swap(&mut a0, &mut a1);
            std::mem::swap(&mut b0, &mut b1);
        }

        let da = a1 - a0;
        let db = (b1 - b0).abs();
        let sb = if b1 > b0 { 1 } else { -1 };
        let inc_e = db << 1;
        let inc_ne = (db - da) << 1;
        let mut d = (db << 1) - da;

        let mut b = b0;
        for a in a0..=a1 {
            let (x, y) = if swap_xy { (b, a) } else { (a, b) };
            self.draw_pixel_wide(x, y, color);
            if d <= 0 {
                d += inc_e;
            } else {
                d += inc_ne;
                b += sb;
            }
        }
    }

    /// Circle outline centred on `(cx, cy)`.
    ///
    /// Kennedy's octant stepping, with the outline offset of each step
    /// computed directly. Only steps whose row or column crosses the window
    /// are visited, so the cost is bounded by the window, not the radius.
    pub fn draw_circle(&mut self, cx: i32, cy: i32, r: i32, color: u32) {
        if r < 0 {
            return;
        }
        let (cx, cy, r) = (cx as i64, cy as i64, r as i64);
        let Some((cols, rows)) = self.window.visible() else {
            return;
        };

        // Octant steps landing on a visible row (cy ± y) or column (cx ± y).
        let steps = [
            rows.start - cy..rows.end - cy,
            cy - rows.end + 1..cy - rows.start + 1,
            cols.start - cx..cols.end - cx,
            cx - cols.end + 1..cx - cols.start + 1,
        ];
        for range in steps {
            for y in range.start.max(0)..range.end.min(r + 1) {
                let x = outline_x(r, y);
                if x < y {
                    break;
                }
                for (px, py) in [
                    (cx + x, cy + y),
                    (cx - x, cy + y),
                    (cx - x, cy - y),
                    (cx + x, cy - y),
                    (cx + y, cy + x),
                    (cx - y, cy + x),
                    (cx - y, cy - x),
                    (cx + y, cy - x),
                ] {
                    self.draw_pixel_wide(px, py, color);
                }
            }
        }
    }

    /// Filled disc: every offset with `dx² + dy² <= r² + r`.
    ///
    /// Each visible row is written as one span.
    pub fn fill_circle(&mut self, cx: i32, cy: i32, r: i32, color: u32) {
        if r < 0 {
            return;
        }
        let (cx, cy, r) = (cx as i64, cy as i64, r as i64);
        let Some((cols, rows)) = self.window.visible() else {
            return;
        };
        let (ox, oy) = self.window.origin();
        let r2 = r * r + r;

        for y in (cy - r).max(rows.start)..(cy + r + 1).min(rows.end) {
            let dy = y - cy;
            let half = isqrt((r2 - dy * dy) as i128) as i64;
            let left = (cx - half).max(cols.start);
            let right = (cx + half + 1).min(cols.end);
            if left < right {
                self.fill_span((ox + left) as usize, (oy + y) as usize, (right - left) as usize, color);
            }
        }
    }

    /// Fill the whole window.
    pub fn clear_window(&mut self, color: u32) {
        let rect = self.window.bounds();
        self.fill_clip(rect, color);
    }

    /// Fill the whole surface, ignoring the window.
    pub fn clear_screen(&mut self, color: u32) {
        let row_bytes = self.screen_width * BYTES_PER_PIXEL;
        if self.pitch == row_bytes {
            let word = color.to_ne_bytes();
            for px in self.buf.chunks_exact_mut(BYTES_PER_PIXEL) {
                px.copy_from_slice(&word);
            }
            return;
        }
        let rows = if self.pitch == 0 {
            0
        } else {
            self.buf.len() / self.pitch
        };
        for row in 0..rows {
            self.fill_span(0, row, self.screen_width, color);
        }
    }

    #[inline]
    fn draw_pixel_wide(&mut self, x: i64, y: i64, color: u32) {
        if let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) {
            self.draw_pixel(x, y, color);
        }
    }
}

/// Outline offset at octant step `y` of a radius `r` circle: the largest
/// `x` with `2x² - 2x + 1 + 2y² - 2r² <= 0`, which is where Kennedy's
/// incremental error term leaves it. Negative when the step has none.
fn outline_x(r: i64, y: i64) -> i64 {
    if y == 0 {
        return r;
    }
    let (r, y) = (r as i128, y as i128);
    let d = 4 * r * r - 4 * y * y - 1;
    if d < 0 {
        return -1;
    }
    ((1 + isqrt(d)) / 2) as i64
}

fn isqrt(n: i128) -> i128 {
    if n <= 0 {
        return 0;
    }
    let mut x = (n as f64).sqrt() as i128;
    while x * x > n {
        x -= 1;
    }
    while (x + 1) * (x + 1) <= n {
        x += 1;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Geometry;
    use std::collections::HashSet;

    const W: usize = 32;
    const H: usize = 32;

    fn geometry() -> Geometry {
        Geometry {
            width: W as u32,
            height: H as u32,
            ..Geometry::default()
        }
    }

    fn lit(buf: &[u8], pitch: usize) -> HashSet<(usize, usize)> {
        let mut out = HashSet::new();
        for y in 0..H {
            for x in 0..W {
                let off = y * pitch + x * 4;
                if buf[off..off + 4] != [0, 0, 0, 0] {
                    out.insert((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn test_pixel_and_read_back() {
        let mut buf = vec![0u8; W * H * 4];
        let win = Window::full(&geometry());
        let mut canvas = Canvas::new(&mut buf, W * 4, W, &win);
        canvas.draw_pixel(3, 4, 0x00ab_cdef);
        assert_eq!(canvas.read_pixel(3, 4), Some(0x00ab_cdef));
        assert_eq!(canvas.read_pixel(4, 4), Some(0));
        assert_eq!(canvas.read_pixel(W as i32, 0), None);
    }

    #[test]
    fn test_line_point_count() {
        let mut buf = vec![0u8; W * H * 4];
        let win = Window::full(&geometry());
        let mut canvas = Canvas::new(&mut buf, W * 4, W, &win);
        canvas.draw_line(2, 3, 20, 9, 1);
        drop(canvas);
        assert_eq!(lit(&buf, W * 4).len(), 19);
    }

    #[test]
    fn test_line_reverse_same_pixels() {
        let win = Window::full(&geometry());
        let mut a = vec![0u8; W * H * 4];
        let mut b = vec![0u8; W * H * 4];
        Canvas::new(&mut a, W * 4, W, &win).draw_line(1, 1, 14, 6, 1);
        Canvas::new(&mut b, W * 4, W, &win).draw_line(14, 6, 1, 1, 1);
        assert_eq!(lit(&a, W * 4), lit(&b, W * 4));
    }

    #[test]
    fn test_steep_line_one_pixel_per_row() {
        let mut buf = vec![0u8; W * H * 4];
        let win = Window::full(&geometry());
        Canvas::new(&mut buf, W * 4, W, &win).draw_line(5, 0, 8, 20, 1);
        let pixels = lit(&buf, W * 4);
        assert_eq!(pixels.len(), 21);
        for y in 0..=20 {
            assert_eq!(pixels.iter().filter(|p| p.1 == y).count(), 1);
        }
    }

    #[test]
    fn test_rect_outline() {
        let mut buf = vec![0u8; W * H * 4];
        let win = Window::full(&geometry());
        Canvas::new(&mut buf, W * 4, W, &win).draw_rect(2, 2, 5, 4, 1);
        let pixels = lit(&buf, W * 4);
        // 2 * 5 + 2 * (4 - 2)
        assert_eq!(pixels.len(), 14);
        assert!(pixels.contains(&(6, 5)));
        assert!(!pixels.contains(&(3, 3)));
    }

    #[test]
    fn test_circle_radius_zero() {
        let mut buf = vec![0u8; W * H * 4];
        let win = Window::full(&geometry());
        let mut canvas = Canvas::new(&mut buf, W * 4, W, &win);
        canvas.fill_circle(10, 10, 0, 1);
        canvas.draw_circle(20, 20, 0, 1);
        drop(canvas);
        let pixels = lit(&buf, W * 4);
        assert_eq!(pixels, HashSet::from([(10, 10), (20, 20)]));
    }

    #[test]
    fn test_circle_outline_extremes() {
        let mut buf = vec![0u8; W * H * 4];
        let win = Window::full(&geometry());
        Canvas::new(&mut buf, W * 4, W, &win).draw_circle(15, 15, 6, 1);
        let pixels = lit(&buf, W * 4);
        for p in [(21, 15), (9, 15), (15, 21), (15, 9)] {
            assert!(pixels.contains(&p), "missing {p:?}");
        }
        assert!(!pixels.contains(&(15, 15)));
    }

    #[test]
    fn test_fill_circle_radius_one() {
        let mut buf = vec![0u8; W * H * 4];
        let win = Window::full(&geometry());
        Canvas::new(&mut buf, W * 4, W, &win).fill_circle(5, 5, 1, 1);
        // r² + r = 2 admits the diagonals too
        assert_eq!(lit(&buf, W * 4).len(), 9);
    }

    /// Kennedy's stepping, run to completion.
    fn stepped_outline(cx: i64, cy: i64, r: i64) -> HashSet<(i64, i64)> {
        let mut out = HashSet::new();
        let (mut x, mut y, mut xch, mut ych, mut rerr) = (r, 0i64, 1 - 2 * r, 1i64, 0i64);
        while x >= y {
            for p in [
                (cx + x, cy + y),
                (cx - x, cy + y),
                (cx - x, cy - y),
                (cx + x, cy - y),
                (cx + y, cy + x),
                (cx - y, cy + x),
                (cx - y, cy - x),
                (cx + y, cy - x),
            ] {
                out.insert(p);
            }
            y += 1;
            rerr += ych;
            ych += 2;
            if 2 * rerr + xch > 0 {
                x -= 1;
                rerr += xch;
                xch += 2;
            }
        }
        out
    }

    #[test]
    fn test_circle_outline_matches_stepping() {
        // A window offset into the screen, so some outlines are cut.
        let win = Window::new(3, 5, 24, 20, &geometry());
        for r in 0..40 {
            for (cx, cy) in [(12, 10), (0, 0), (30, -4)] {
                let mut buf = vec![0u8; W * H * 4];
                Canvas::new(&mut buf, W * 4, W, &win).draw_circle(cx, cy, r, 1);
                let expected: HashSet<(usize, usize)> = stepped_outline(cx as i64, cy as i64, r as i64)
                    .into_iter()
                    .filter_map(|(x, y)| win.clip_point(x as i32, y as i32))
                    .collect();
                assert_eq!(lit(&buf, W * 4), expected, "r {r} at ({cx}, {cy})");
            }
        }
    }

    #[test]
    fn test_fill_circle_matches_disc_equation() {
        let win = Window::new(3, 5, 24, 20, &geometry());
        for r in 0..30i64 {
            let mut buf = vec![0u8; W * H * 4];
            Canvas::new(&mut buf, W * 4, W, &win).fill_circle(10, 4, r as i32, 1);
            let mut expected = HashSet::new();
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx * dx + dy * dy <= r * r + r {
                        if let Some(p) = win.clip_point(10 + dx as i32, 4 + dy as i32) {
                            expected.insert(p);
                        }
                    }
                }
            }
            assert_eq!(lit(&buf, W * 4), expected, "r {r}");
        }
    }

    #[test]
    fn test_huge_radius_only_visits_the_window() {
        let win = Window::full(&geometry());
        let r = i32::MAX / 2;

        let mut buf = vec![0u8; W * H * 4];
        Canvas::new(&mut buf, W * 4, W, &win).fill_circle(0, 0, r, 1);
        assert_eq!(lit(&buf, W * 4).len(), W * H);

        // The outline passes far around the screen.
        let mut buf = vec![0u8; W * H * 4];
        Canvas::new(&mut buf, W * 4, W, &win).draw_circle(0, 0, r, 1);
        assert!(lit(&buf, W * 4).is_empty());

        // Its top is flat across a screen it grazes.
        let mut buf = vec![0u8; W * H * 4];
        Canvas::new(&mut buf, W * 4, W, &win).draw_circle(16, 16 + r, r, 1);
        let expected: HashSet<(usize, usize)> = (0..W).map(|x| (x, 16)).collect();
        assert_eq!(lit(&buf, W * 4), expected);
    }

    #[test]
    fn test_clear_screen_with_padded_pitch() {
        let pitch = W * 4 + 16;
        let mut buf = vec![0u8; pitch * H];
        let win = Window::full(&geometry());
        Canvas::new(&mut buf, pitch, W, &win).clear_screen(0x0102_0304);
        for y in 0..H {
            let row = &buf[y * pitch..(y + 1) * pitch];
            assert_eq!(&row[..4], &0x0102_0304u32.to_ne_bytes());
            assert!(row[W * 4..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_clear_window_only_touches_window() {
        let mut buf = vec![0u8; W * H * 4];
        let win = Window::new(4, 4, 8, 8, &geometry());
        Canvas::new(&mut buf, W * 4, W, &win).clear_window(7);
        let pixels = lit(&buf, W * 4);
        assert_eq!(pixels.len(), 64);
        assert!(pixels.iter().all(|&(x, y)| (4..12).contains(&x) && (4..12).contains(&y)));
    }
}
