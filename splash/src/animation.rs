//! Loading animation: a row of dots bobbing on a sine wave.

use std::f32::consts::PI;

use bootsplash_graphics::Display;

use crate::layout::mm_to_px;

const DOTS: i32 = 3;

/// Three dots centred under the logo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CirclesWave {
    left: i32,
    spacing: f32,
    y_offset: i32,
    radius: i32,
    amplitude: f32,
}

impl CirclesWave {
    /// Dots sized for `dpi`, resting on the line `y_offset`.
    pub fn new(screen_width: u32, y_offset: i32, dpi: u32) -> Self {
        let radius = mm_to_px(dpi, 1.0) as i32;
        let spacing = radius as f32 * 3.5;
        let left = (screen_width as f32 / 2.0 - spacing * (DOTS - 1) as f32 / 2.0) as i32;
        Self {
            left,
            spacing,
            y_offset,
            radius,
            amplitude: radius as f32,
        }
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Centre of every dot at animation tick `frame`.
    pub fn positions(&self, frame: f64) -> [(i32, i32); DOTS as usize] {
        let f = (frame * 2.5).round() as f32;
        let mut out = [(0, 0); DOTS as usize];
        for (i, pos) in out.iter_mut().enumerate() {
            let x = self.left + (i as f32 * self.spacing) as i32;
            let y = self.y_offset + ((f / 60.0 * PI + i as f32).sin() * self.amplitude) as i32;
            *pos = (x, y);
        }
        out
    }

    /// The box one dot can ever cover, plus a small margin, as
    /// `(x, y, w, h)` around horizontal centre `x`.
    fn trail(&self, x: i32) -> (i32, i32, i32, i32) {
        let amplitude = self.amplitude as i32;
        (
            x - self.radius - 3,
            self.y_offset - amplitude - self.radius - 3,
            self.radius * 2 + 6,
            amplitude * 2 + self.radius * 2 + 6,
        )
    }

    /// Erase the previous frame and draw frame `frame`.
    pub fn draw(&self, display: &mut Display, frame: f64, foreground: u32, background: u32) {
        for (x, y) in self.positions(frame) {
            let (tx, ty, tw, th) = self.trail(x);
            display.fill_rect(tx, ty, tw, th, background);
            display.fill_circle(x, y, self.radius, foreground);
        }
    }
}
