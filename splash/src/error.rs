use std::path::PathBuf;
use std::process::ExitCode;

use bootsplash_graphics::GraphicsError;

/// All errors produced by bootsplash.
///
/// Variants are split into two categories:
/// - **Infrastructure errors** (exit code 2): no usable display, bad config, I/O failures
/// - **Operational errors** (exit code 1): bad input the user can correct
#[derive(thiserror::Error, Debug)]
pub enum SplashError {
    // ── Infrastructure errors (exit code 2) ──────────────────────────

    #[error("Display error: {0}")]
    Display(#[from] GraphicsError),

    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Cannot install {signal} handler: {source}")]
    SignalSetup {
        signal: &'static str,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ── Operational errors (exit code 1) ─────────────────────────────

    #[error("Cannot load image {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Cannot write {path}: {source}")]
    ImageSave {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Cannot load SVG {path}: {reason}")]
    SvgLoad { path: PathBuf, reason: String },

    #[error("Cannot load SVG font {path}: {reason}")]
    FontLoad { path: PathBuf, reason: String },

    #[error("Text is too long to fit on screen: '{text}'")]
    TextTooLong { text: String },

    #[error("Invalid colour '{value}', expected RRGGBB")]
    InvalidColor { value: String },

    #[error("Invalid size '{value}', expected WIDTHxHEIGHT")]
    InvalidSize { value: String },

    #[error("Invalid value for {name}: {reason}")]
    InvalidOption { name: &'static str, reason: String },
}

impl SplashError {
    /// Map each error variant to its process exit code.
    ///
    /// - `2`: infrastructure error (display, config file, I/O)
    /// - `1`: operational failure (bad image, font or option value)
    pub fn exit_code(&self) -> ExitCode {
        match self {
            // Infrastructure errors → 2
            Self::Display(_)
            | Self::ConfigNotFound { .. }
            | Self::ConfigParse(_)
            | Self::SignalSetup { .. }
            | Self::Io(_) => ExitCode::from(2),

            // Operational errors → 1
            Self::ImageLoad { .. }
            | Self::ImageSave { .. }
            | Self::SvgLoad { .. }
            | Self::FontLoad { .. }
            | Self::TextTooLong { .. }
            | Self::InvalidColor { .. }
            | Self::InvalidSize { .. }
            | Self::InvalidOption { .. } => ExitCode::from(1),
        }
    }
}
