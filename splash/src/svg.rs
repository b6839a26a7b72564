//! Vector logo rendering.
//!
//! SVG documents are parsed with usvg and rasterized by resvg into the
//! straight-alpha RGBA8 layout the display blitter takes.

use std::path::Path;

use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;

use crate::error::SplashError;

/// Whether `path` names an SVG document.
pub fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

/// A parsed SVG logo.
pub struct SvgImage {
    tree: usvg::Tree,
}

impl SvgImage {
    pub fn load(path: &Path) -> Result<Self, SplashError> {
        let invalid = |reason: String| SplashError::SvgLoad {
            path: path.to_path_buf(),
            reason,
        };
        let data = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        Self::parse(&data).map_err(|e| invalid(e.to_string()))
    }

    pub fn parse(data: &str) -> Result<Self, usvg::Error> {
        let options = usvg::Options::default();
        let tree = usvg::Tree::from_str(data, &options)?;
        Ok(Self { tree })
    }

    /// Intrinsic size in user units.
    pub fn size(&self) -> (f32, f32) {
        let size = self.tree.size();
        (size.width(), size.height())
    }

    /// Rasterize into a `width` x `height` RGBA8 buffer.
    ///
    /// The scale is taken from the width and truncated to two decimals;
    /// whatever falls outside the buffer is cut off.
    pub fn render(&self, width: u32, height: u32) -> Option<Vec<u8>> {
        let (svg_width, _) = self.size();
        if svg_width <= 0.0 {
            return None;
        }
        let scale = render_scale(width, svg_width);
        log::debug!("rasterizing SVG at {width}x{height}, scale {scale}");
        rasterize(&self.tree, width, height, Transform::from_scale(scale, scale))
    }
}

/// Scale that fits `svg_width` user units into `width` pixels, truncated to
/// two decimals.
pub fn render_scale(width: u32, svg_width: f32) -> f32 {
    (width as f32 / svg_width * 100.0).floor() / 100.0
}

/// Render `tree` with `transform` into a fresh `width` x `height` RGBA8
/// buffer, transparent where nothing is drawn.
pub fn rasterize(tree: &usvg::Tree, width: u32, height: u32, transform: Transform) -> Option<Vec<u8>> {
    let mut pixmap = Pixmap::new(width, height)?;
    resvg::render(tree, transform, &mut pixmap.as_mut());

    // The pixmap is premultiplied.
    let mut out = Vec::with_capacity(width as usize * height as usize * 4);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Some(out)
}
