//! Early-boot splash screen.
//!
//! Draws a logo, optional messages and a small loading animation on a raw
//! Linux display using [`bootsplash_graphics`], until SIGTERM or SIGINT
//! arrives.

pub mod animation;
pub mod cli;
pub mod config;
pub mod error;
pub mod layout;
pub mod run;
pub mod svg;
pub mod text;

pub use config::Settings;
pub use error::SplashError;
