//! Splash configuration.
//!
//! Compiled-in defaults, the optional TOML configuration file, and the
//! resolved [`Settings`] the render loop runs with. Command-line flags win
//! over file values, which win over the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bootsplash_graphics::fbdev::{DEFAULT_FB_DEVICE, DEFAULT_TTY};
use bootsplash_graphics::kms::DEFAULT_DRM_DEVICE;
use bootsplash_graphics::{AcquireFlags, Color};
use serde::Deserialize;

use crate::cli::{Backend, Cli};
use crate::error::SplashError;

/// Largest logo edge in millimetres.
pub const DEFAULT_MAX_LOGO_MM: f32 = 45.0;

/// Animation frame rate.
pub const DEFAULT_FPS: u32 = 60;

/// Animation ticks per second, independent of the frame rate.
pub const TICK_RATE: f64 = 60.0;

/// DPI assumed when the panel does not report its size.
pub const FALLBACK_DPI: u32 = 300;

/// Logo size used for tall images, in millimetres.
pub const TALL_LOGO_MM: f32 = 25.0;

/// Gap between the logo and the animation, in millimetres.
pub const ANIMATION_GAP_MM: f32 = 5.0;

/// How often the idle loop checks for a stop request when not animating.
pub const IDLE_POLL: Duration = Duration::from_millis(100);

/// SVG font messages are set in.
pub const DEFAULT_FONT_PATH: &str = "/usr/share/bootsplash/OpenSans-Regular.svg";

/// Message font size in points.
pub const FONT_SIZE_PT: u32 = 9;

/// Bottom message font size in points.
pub const FONT_SIZE_B_PT: u32 = 6;

/// Gap between the bottom message and the bottom edge, in millimetres.
pub const B_MESSAGE_OFFSET_MM: f32 = 3.0;

/// Millimetres per point, as used for on-screen text.
pub const PT_TO_MM: f32 = 0.38;

// ── File format ──────────────────────────────────────────────────────

/// Contents of a configuration file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub image: Option<PathBuf>,
    pub max_logo_mm: Option<f32>,
    pub dpi: Option<u32>,
    pub animation: Option<bool>,
    pub backend: Option<Backend>,
    pub device: Option<PathBuf>,
    pub tty: Option<PathBuf>,
    pub tty_graphics: Option<bool>,
    pub shadow: Option<bool>,
    pub fps: Option<u32>,
    pub background: Option<String>,
    pub font: Option<PathBuf>,
    pub message: Option<String>,
    pub bottom_message: Option<String>,
    pub font_size: Option<u32>,
    pub bottom_font_size: Option<u32>,
}

/// Parse a configuration file from disk.
pub fn parse_config(path: &Path) -> Result<FileConfig, SplashError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SplashError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            SplashError::Io(e)
        }
    })?;
    parse_config_str(&content)
}

/// Parse a configuration file from a TOML string.
pub fn parse_config_str(content: &str) -> Result<FileConfig, SplashError> {
    toml::from_str(content).map_err(|e| SplashError::ConfigParse(format!("invalid TOML: {e}")))
}

// ── Resolved settings ────────────────────────────────────────────────

/// Everything the splash needs to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub image: Option<PathBuf>,
    pub max_logo_mm: f32,
    pub dpi: Option<u32>,
    pub animation: bool,
    pub backend: Backend,
    pub device: PathBuf,
    pub tty: PathBuf,
    pub flags: AcquireFlags,
    pub fps: u32,
    pub background: Color,
    pub font: PathBuf,
    /// Shown above the bottom message.
    pub message: Option<String>,
    pub bottom_message: Option<String>,
    pub font_size: u32,
    pub bottom_font_size: u32,
    /// Off-screen size and output file, when rendering headless.
    pub headless: Option<Headless>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headless {
    pub width: u32,
    pub height: u32,
    pub output: PathBuf,
}

impl Settings {
    /// Read the configuration file named on the command line, if any, and
    /// resolve.
    pub fn load(cli: &Cli) -> Result<Self, SplashError> {
        let file = match &cli.config {
            Some(path) => {
                log::debug!("loading configuration from {}", path.display());
                parse_config(path)?
            }
            None => FileConfig::default(),
        };
        Self::resolve(cli, file)
    }

    /// Merge command line and file values over the defaults.
    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self, SplashError> {
        let backend = cli.backend.or(file.backend).unwrap_or_default();
        let default_device = match backend {
            Backend::Drm => DEFAULT_DRM_DEVICE,
            Backend::Fb => DEFAULT_FB_DEVICE,
        };

        let max_logo_mm = cli
            .max_logo_mm
            .or(file.max_logo_mm)
            .unwrap_or(DEFAULT_MAX_LOGO_MM);
        if !(max_logo_mm > 0.0 && max_logo_mm.is_finite()) {
            return Err(SplashError::InvalidOption {
                name: "max_logo_mm",
                reason: format!("{max_logo_mm} is not a positive size"),
            });
        }

        let dpi = cli.dpi.or(file.dpi).filter(|&dpi| dpi > 0);

        let fps = cli.fps.or(file.fps).unwrap_or(DEFAULT_FPS);
        if fps == 0 {
            return Err(SplashError::InvalidOption {
                name: "fps",
                reason: "must be at least 1".to_string(),
            });
        }

        let font_size = cli.font_size.or(file.font_size).unwrap_or(FONT_SIZE_PT);
        let bottom_font_size = cli
            .bottom_font_size
            .or(file.bottom_font_size)
            .unwrap_or(FONT_SIZE_B_PT);
        for (name, size) in [("font_size", font_size), ("bottom_font_size", bottom_font_size)] {
            if size == 0 {
                return Err(SplashError::InvalidOption {
                    name,
                    reason: "must be at least 1 pt".to_string(),
                });
            }
        }

        let background = match cli.background.as_deref().or(file.background.as_deref()) {
            Some(value) => parse_color(value)?,
            None => Color::BLACK,
        };

        let mut flags = AcquireFlags::empty();
        if cli.no_tty_graphics || file.tty_graphics == Some(false) {
            flags |= AcquireFlags::NO_TTY_GRAPHICS;
        }
        if cli.shadow || file.shadow.unwrap_or(false) {
            flags |= AcquireFlags::SHADOW_BUFFER;
        }

        let headless = match (&cli.headless, &cli.output) {
            (Some(size), Some(output)) => {
                let (width, height) = parse_size(size)?;
                Some(Headless {
                    width,
                    height,
                    output: output.clone(),
                })
            }
            _ => None,
        };

        Ok(Self {
            image: cli.image.clone().or(file.image),
            max_logo_mm,
            dpi,
            animation: !cli.error && file.animation.unwrap_or(true),
            backend,
            device: cli
                .device
                .clone()
                .or(file.device)
                .unwrap_or_else(|| PathBuf::from(default_device)),
            tty: cli
                .tty
                .clone()
                .or(file.tty)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TTY)),
            flags,
            fps,
            background,
            font: cli
                .font
                .clone()
                .or(file.font)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FONT_PATH)),
            message: cli.message.clone().or(file.message),
            bottom_message: cli.bottom_message.clone().or(file.bottom_message),
            font_size,
            bottom_font_size,
            headless,
        })
    }

    /// Time budget of one animation frame.
    pub fn frame_time(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps as f64)
    }
}

/// Parse `RRGGBB`, with or without a leading `#`.
pub fn parse_color(value: &str) -> Result<Color, SplashError> {
    let hex = value.strip_prefix('#').unwrap_or(value);
    if hex.len() != 6 {
        return Err(SplashError::InvalidColor {
            value: value.to_string(),
        });
    }
    u32::from_str_radix(hex, 16)
        .map(Color::from_hex)
        .map_err(|_| SplashError::InvalidColor {
            value: value.to_string(),
        })
}

/// Parse `WIDTHxHEIGHT`, both non-zero.
pub fn parse_size(value: &str) -> Result<(u32, u32), SplashError> {
    let invalid = || SplashError::InvalidSize {
        value: value.to_string(),
    };
    let (w, h) = value.split_once(['x', 'X']).ok_or_else(invalid)?;
    let w: u32 = w.trim().parse().map_err(|_| invalid())?;
    let h: u32 = h.trim().parse().map_err(|_| invalid())?;
    if w == 0 || h == 0 {
        return Err(invalid());
    }
    Ok((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&Cli::default(), FileConfig::default()).unwrap();
        assert_eq!(settings.backend, Backend::Drm);
        assert_eq!(settings.device, PathBuf::from("/dev/dri/card0"));
        assert_eq!(settings.tty, PathBuf::from("/dev/tty"));
        assert_eq!(settings.fps, 60);
        assert_eq!(settings.max_logo_mm, 45.0);
        assert!(settings.animation);
        assert!(settings.flags.is_empty());
        assert_eq!(settings.background, Color::BLACK);
        assert_eq!(settings.headless, None);
        assert_eq!(settings.font, PathBuf::from(DEFAULT_FONT_PATH));
        assert_eq!((settings.font_size, settings.bottom_font_size), (9, 6));
        assert_eq!(settings.message, None);
    }

    #[test]
    fn test_messages_from_file_and_cli() {
        let file = parse_config_str(
            r#"
            font = "/usr/share/fonts/splash.svg"
            message = "Starting"
            bottom_message = "Unlock with your passphrase"
            bottom_font_size = 8
            "#,
        )
        .unwrap();
        let cli = Cli {
            message: Some("Booting".to_string()),
            font_size: Some(12),
            ..Cli::default()
        };
        let settings = Settings::resolve(&cli, file).unwrap();
        assert_eq!(settings.font, PathBuf::from("/usr/share/fonts/splash.svg"));
        assert_eq!(settings.message.as_deref(), Some("Booting"));
        assert_eq!(
            settings.bottom_message.as_deref(),
            Some("Unlock with your passphrase")
        );
        assert_eq!((settings.font_size, settings.bottom_font_size), (12, 8));
    }

    #[test]
    fn test_zero_font_size_rejected() {
        let cli = Cli {
            bottom_font_size: Some(0),
            ..Cli::default()
        };
        assert!(matches!(
            Settings::resolve(&cli, FileConfig::default()),
            Err(SplashError::InvalidOption {
                name: "bottom_font_size",
                ..
            })
        ));
    }

    #[test]
    fn test_fb_backend_default_device() {
        let cli = Cli {
            backend: Some(Backend::Fb),
            ..Cli::default()
        };
        let settings = Settings::resolve(&cli, FileConfig::default()).unwrap();
        assert_eq!(settings.device, PathBuf::from("/dev/fb0"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = parse_config_str(
            r#"
            backend = "fb"
            fps = 30
            max_logo_mm = 30.0
            background = "102030"
            shadow = true
            tty_graphics = false
            "#,
        )
        .unwrap();
        let cli = Cli {
            fps: Some(24),
            error: true,
            ..Cli::default()
        };
        let settings = Settings::resolve(&cli, file).unwrap();
        assert_eq!(settings.backend, Backend::Fb);
        assert_eq!(settings.fps, 24);
        assert_eq!(settings.max_logo_mm, 30.0);
        assert_eq!(settings.background, Color::new(0x10, 0x20, 0x30));
        assert!(!settings.animation);
        assert!(settings
            .flags
            .contains(AcquireFlags::SHADOW_BUFFER | AcquireFlags::NO_TTY_GRAPHICS));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = parse_config_str("colour = \"ffffff\"").unwrap_err();
        assert!(matches!(err, SplashError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SplashError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splash.toml");
        std::fs::write(&path, "image = \"/usr/share/logo.png\"\ndpi = 200\n").unwrap();
        let cli = Cli {
            config: Some(path),
            ..Cli::default()
        };
        let settings = Settings::load(&cli).unwrap();
        assert_eq!(settings.image, Some(PathBuf::from("/usr/share/logo.png")));
        assert_eq!(settings.dpi, Some(200));
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#ff8000").unwrap(), Color::new(255, 128, 0));
        assert_eq!(parse_color("000000").unwrap(), Color::BLACK);
        assert!(parse_color("fff").is_err());
        assert!(parse_color("zzzzzz").is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("720x1440").unwrap(), (720, 1440));
        assert!(parse_size("720").is_err());
        assert!(parse_size("0x10").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        let cli = Cli {
            fps: Some(0),
            ..Cli::default()
        };
        assert!(matches!(
            Settings::resolve(&cli, FileConfig::default()),
            Err(SplashError::InvalidOption { name: "fps", .. })
        ));
        let cli = Cli {
            max_logo_mm: Some(-1.0),
            ..Cli::default()
        };
        assert!(Settings::resolve(&cli, FileConfig::default()).is_err());
    }
}
