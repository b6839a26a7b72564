//! Messages set in an SVG font.
//!
//! The font is an SVG `<font>` document: one `<glyph>` per character with
//! its outline as path data in font units, y pointing up, baseline at zero.
//! Text is measured and wrapped with the glyph advances, then the outlines
//! are assembled into a document and rasterized through resvg.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use bootsplash_graphics::Color;
use resvg::tiny_skia::Transform;
use resvg::usvg;

use crate::config::PT_TO_MM;
use crate::error::SplashError;
use crate::svg::rasterize;

/// Width every line starts out with, in pixels.
const LINE_START: u32 = 2;

/// Share of the screen width a line may fill before it wraps.
const WRAP_WIDTH: f32 = 0.95;

#[derive(Debug, Clone, PartialEq)]
struct Glyph {
    advance: f32,
    path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SvgFont {
    ascent: f32,
    descent: f32,
    default_advance: f32,
    missing: Option<Glyph>,
    glyphs: HashMap<char, Glyph>,
}

/// Wrapped text at one scale, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub scale: f32,
    pub line_height: u32,
    pub width: u32,
    pub height: u32,
}

impl SvgFont {
    pub fn load(path: &Path) -> Result<Self, SplashError> {
        let invalid = |reason: String| SplashError::FontLoad {
            path: path.to_path_buf(),
            reason,
        };
        let data = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let font = Self::parse(&data).map_err(invalid)?;
        log::debug!(
            "font {}: {} glyphs, ascent {}, descent {}",
            path.display(),
            font.glyphs.len(),
            font.ascent,
            font.descent
        );
        Ok(font)
    }

    pub fn parse(data: &str) -> Result<Self, String> {
        let doc = roxmltree::Document::parse(data).map_err(|e| e.to_string())?;
        let font = doc
            .descendants()
            .find(|n| n.has_tag_name("font"))
            .ok_or("no <font> element")?;
        let face = font
            .children()
            .find(|n| n.has_tag_name("font-face"))
            .ok_or("no <font-face> element")?;

        let default_advance = number(font, "horiz-adv-x").unwrap_or(0.0);
        let ascent = number(face, "ascent").ok_or("<font-face> has no ascent")?;
        let descent = number(face, "descent").unwrap_or(0.0);
        if ascent - descent <= 0.0 {
            return Err(format!("ascent {ascent} over descent {descent} leaves no line height"));
        }

        let mut glyphs = HashMap::new();
        let mut missing = None;
        for node in font.children().filter(|n| n.is_element()) {
            match node.tag_name().name() {
                "glyph" => {
                    // Ligatures are not used.
                    let mut chars = node.attribute("unicode").unwrap_or_default().chars();
                    if let (Some(c), None) = (chars.next(), chars.next()) {
                        glyphs.insert(c, glyph(node, default_advance));
                    }
                }
                "missing-glyph" => missing = Some(glyph(node, default_advance)),
                _ => {}
            }
        }
        if glyphs.is_empty() {
            return Err("font has no glyphs".to_string());
        }

        Ok(Self {
            ascent,
            descent,
            default_advance,
            missing,
            glyphs,
        })
    }

    /// Scale from font units to pixels for a `size_pt` font.
    pub fn scale_for(&self, size_pt: u32, px_per_mm: u32) -> f32 {
        size_pt as f32 * PT_TO_MM / (self.ascent - self.descent) * px_per_mm as f32
    }

    /// Rounded advance of `c` in pixels. Characters without a glyph advance
    /// by the font's default.
    fn advance_px(&self, c: char, scale: f32) -> u32 {
        let advance = self.glyphs.get(&c).map_or(self.default_advance, |g| g.advance);
        (advance * scale).round() as u32
    }

    fn line_width(&self, line: &str, scale: f32) -> u32 {
        LINE_START + line.chars().map(|c| self.advance_px(c, scale)).sum::<u32>()
    }

    /// Break `text` into lines no wider than most of `screen_width`.
    ///
    /// A line that has run past the limit is broken at its last space, or
    /// before the current character when it has none. `\n` always breaks.
    /// Fails when a single character is wider than the limit.
    pub fn layout(&self, text: &str, scale: f32, screen_width: u32) -> Result<TextBlock, SplashError> {
        let limit = screen_width as f32 * WRAP_WIDTH;
        let chars: Vec<char> = text.chars().collect();
        let mut lines = Vec::new();
        let mut line: Vec<char> = Vec::new();
        let mut width = LINE_START;

        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '\n' {
                lines.push(std::mem::take(&mut line));
                width = LINE_START;
                i += 1;
                continue;
            }
            if width as f32 > limit {
                match line.iter().rposition(|&ch| ch == ' ') {
                    // The word after the space moves down.
                    Some(space) => {
                        i -= line.len() - space - 1;
                        line.truncate(space);
                    }
                    // Not even one character fits.
                    None if line.len() <= 1 => {
                        return Err(SplashError::TextTooLong {
                            text: text.to_string(),
                        })
                    }
                    None => {}
                }
                lines.push(std::mem::take(&mut line));
                width = LINE_START;
                continue;
            }
            line.push(c);
            width += self.advance_px(c, scale);
            i += 1;
        }
        lines.push(line);

        let lines: Vec<String> = lines.into_iter().map(String::from_iter).collect();
        let line_height = ((self.ascent - self.descent) * scale) as u32;
        let width = lines
            .iter()
            .map(|l| self.line_width(l, scale))
            .max()
            .unwrap_or(LINE_START);
        Ok(TextBlock {
            height: line_height * lines.len() as u32,
            lines,
            scale,
            line_height,
            width,
        })
    }

    /// Rasterize `block` in `color` into a `block.width` x `block.height`
    /// RGBA8 buffer.
    pub fn render(&self, block: &TextBlock, color: Color) -> Option<Vec<u8>> {
        let s = block.scale;
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}"><g fill="rgb({},{},{})">"#,
            block.width, block.height, color.r, color.g, color.b
        );
        for (row, line) in block.lines.iter().enumerate() {
            let baseline = (row as u32 * block.line_height) as f32 + self.ascent * s;
            let mut x = 0.0;
            for c in line.chars() {
                let outline = self
                    .glyphs
                    .get(&c)
                    .or(self.missing.as_ref())
                    .and_then(|g| g.path.as_deref());
                if let Some(d) = outline {
                    let _ = write!(
                        svg,
                        r#"<path transform="matrix({s} 0 0 {} {x} {baseline})" d="{}"/>"#,
                        -s,
                        escape_attribute(d)
                    );
                }
                x += self.advance_px(c, s) as f32;
            }
        }
        svg.push_str("</g></svg>");

        let tree = usvg::Tree::from_str(&svg, &usvg::Options::default()).ok()?;
        rasterize(&tree, block.width, block.height, Transform::identity())
    }
}

fn number(node: roxmltree::Node<'_, '_>, name: &str) -> Option<f32> {
    node.attribute(name)?.trim().parse().ok()
}

fn glyph(node: roxmltree::Node<'_, '_>, default_advance: f32) -> Glyph {
    Glyph {
        advance: number(node, "horiz-adv-x").unwrap_or(default_advance),
        path: node.attribute("d").map(str::to_string),
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}
