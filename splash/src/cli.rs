use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::Deserialize;

/// Early-boot splash screen: logo, messages and a loading animation on a raw
/// display.
#[derive(Parser, Debug, Default)]
#[command(name = "bootsplash", version, about)]
pub struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Logo image: SVG, or PNG.
    #[arg(short = 's', long = "image")]
    pub image: Option<PathBuf>,

    /// SVG font for the messages (default: /usr/share/bootsplash/OpenSans-Regular.svg).
    #[arg(short, long)]
    pub font: Option<PathBuf>,

    /// Message shown near the bottom of the screen.
    #[arg(short, long)]
    pub message: Option<String>,

    /// Message shown at the very bottom, below the message.
    #[arg(short, long)]
    pub bottom_message: Option<String>,

    /// Message font size in pt (default: 9).
    #[arg(short = 'p', long)]
    pub font_size: Option<u32>,

    /// Bottom message font size in pt (default: 6).
    #[arg(short = 'o', long)]
    pub bottom_font_size: Option<u32>,

    /// Maximum logo size in millimetres (default: 45).
    #[arg(short = 'q', long)]
    pub max_logo_mm: Option<f32>,

    /// Custom DPI instead of the one derived from the panel size.
    #[arg(short, long)]
    pub dpi: Option<u32>,

    /// Error mode: show the logo without the loading animation.
    #[arg(short, long, default_value_t = false)]
    pub error: bool,

    /// Display backend.
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Display device node (default: /dev/dri/card0 or /dev/fb0).
    #[arg(long)]
    pub device: Option<PathBuf>,

    /// Terminal switched to graphics mode by the fb backend (default: /dev/tty).
    #[arg(long)]
    pub tty: Option<PathBuf>,

    /// Leave the terminal in text mode.
    #[arg(long, default_value_t = false)]
    pub no_tty_graphics: bool,

    /// Draw into a shadow buffer and copy on flush (fb backend).
    #[arg(long, default_value_t = false)]
    pub shadow: bool,

    /// Animation frame rate (default: 60).
    #[arg(long)]
    pub fps: Option<u32>,

    /// Background colour as RRGGBB (default: 000000).
    #[arg(long)]
    pub background: Option<String>,

    /// Render one frame off-screen at WIDTHxHEIGHT instead of using a device.
    #[arg(long, value_name = "WxH", requires = "output")]
    pub headless: Option<String>,

    /// PNG file the headless frame is written to.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// TOML configuration file; command-line flags take precedence.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Which kind of display device to drive.
#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// KMS dumb buffers, page flipped.
    #[default]
    Drm,
    /// Legacy fbdev framebuffer.
    Fb,
}
