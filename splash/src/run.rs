//! The splash itself: acquire a display, draw the logo and messages, animate
//! until told to stop, leave the logo and messages on screen.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use bootsplash_graphics::{Color, Display, MemorySurface, PresentModel};
use image::imageops::{self, FilterType};

use crate::animation::CirclesWave;
use crate::cli::Backend;
use crate::config::{Headless, Settings, IDLE_POLL, TICK_RATE};
use crate::error::SplashError;
use crate::layout::{
    bottom_message_y, calculate_dpi, message_x, message_y, place_logo, LogoPlacement, ScreenMetrics,
};
use crate::svg::{is_svg, SvgImage};
use crate::text::SvgFont;

/// Messages are drawn in gray.
const MESSAGE_COLOR: Color = Color::GRAY;

static STOP: AtomicBool = AtomicBool::new(false);

extern "C" fn on_stop_signal(_signal: libc::c_int) {
    STOP.store(true, Ordering::SeqCst);
}

/// Route SIGTERM and SIGINT to the flag the render loop polls.
pub fn install_stop_handlers() -> Result<&'static AtomicBool, SplashError> {
    for (signal, name) in [(libc::SIGTERM, "SIGTERM"), (libc::SIGINT, "SIGINT")] {
        // SAFETY: the handler only stores to an atomic, which is
        // async-signal-safe; the sigaction struct is fully initialised.
        let rc = unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_stop_signal as libc::sighandler_t;
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signal, &action, std::ptr::null_mut())
        };
        if rc != 0 {
            return Err(SplashError::SignalSetup {
                signal: name,
                source: std::io::Error::last_os_error(),
            });
        }
    }
    Ok(&STOP)
}

/// The logo scaled to its final size.
struct Logo {
    pixels: Vec<u8>,
    placement: LogoPlacement,
}

/// A line or block of text, rasterized and placed.
struct Message {
    pixels: Vec<u8>,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

/// Everything drawn on screen, laid out for one display.
pub struct Scene {
    logo: Option<Logo>,
    messages: Vec<Message>,
    wave: Option<CirclesWave>,
    key: Color,
    background: u32,
    foreground: u32,
}

impl Scene {
    /// Lay out the logo and animation for `display`.
    pub fn prepare(display: &Display, settings: &Settings) -> Result<Self, SplashError> {
        let geometry = display.geometry();
        let metrics = calculate_dpi(&geometry, settings.dpi, settings.max_logo_mm);

        let transposed = geometry.rotation.is_transposed();
        let logo = match &settings.image {
            Some(path) => Some(load_logo(path, &metrics, transposed)?),
            None => None,
        };

        // A font that cannot be used costs the messages, not the splash.
        let messages = if settings.message.is_some() || settings.bottom_message.is_some() {
            load_messages(settings, &metrics, transposed).unwrap_or_else(|err| {
                log::error!("cannot render messages: {err}");
                Vec::new()
            })
        } else {
            Vec::new()
        };

        let wave = settings.animation.then(|| {
            let y = match &logo {
                Some(logo) => logo.placement.animation_y(metrics.dpi),
                None => geometry.height as i32 / 2,
            };
            CirclesWave::new(geometry.width, y, metrics.dpi)
        });

        Ok(Self {
            logo,
            messages,
            wave,
            key: settings.background,
            background: display.make_color(settings.background),
            foreground: display.colors().white,
        })
    }

    /// Background, logo and messages.
    pub fn draw_static(&self, display: &mut Display) {
        display.clear_screen(self.background);
        self.draw_logo(display);
        self.draw_messages(display);
    }

    pub fn draw_logo(&self, display: &mut Display) {
        let Some(logo) = &self.logo else {
            return;
        };
        let p = &logo.placement;
        if let Err(err) = display.blit(&logo.pixels, p.x, p.y, p.width, p.height, self.key, false) {
            log::error!("cannot draw logo: {err}");
        }
    }

    pub fn draw_messages(&self, display: &mut Display) {
        for m in &self.messages {
            if let Err(err) = display.blit(&m.pixels, m.x, m.y, m.width, m.height, self.key, false) {
                log::error!("cannot draw message: {err}");
            }
        }
    }

    /// Animation frame at `tick`; nothing in error mode.
    pub fn draw_frame(&self, display: &mut Display, tick: f64) {
        if let Some(wave) = &self.wave {
            wave.draw(display, tick, self.foreground, self.background);
        }
    }

    pub fn is_animated(&self) -> bool {
        self.wave.is_some()
    }
}

/// Load and scale the logo: SVG is rasterized at its final size, anything
/// else goes through the image decoders.
fn load_logo(path: &Path, metrics: &ScreenMetrics, transposed: bool) -> Result<Logo, SplashError> {
    if is_svg(path) {
        let image = SvgImage::load(path)?;
        let (width, height) = image.size();
        let placement = place_logo(metrics, width, height, transposed);
        log_placement(path, width, height, &placement);
        let pixels = image
            .render(placement.width, placement.height)
            .ok_or_else(|| SplashError::SvgLoad {
                path: path.to_path_buf(),
                reason: format!("cannot rasterize at {}x{}", placement.width, placement.height),
            })?;
        return Ok(Logo { pixels, placement });
    }

    let image = image::open(path)
        .map_err(|source| SplashError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    let placement = place_logo(metrics, image.width() as f32, image.height() as f32, transposed);
    log_placement(path, image.width() as f32, image.height() as f32, &placement);
    let scaled = imageops::resize(&image, placement.width, placement.height, FilterType::Triangle);
    Ok(Logo {
        pixels: scaled.into_raw(),
        placement,
    })
}

fn log_placement(path: &Path, width: f32, height: f32, placement: &LogoPlacement) {
    log::info!(
        "logo {} {width}x{height} drawn at {}x{} ({}, {})",
        path.display(),
        placement.width,
        placement.height,
        placement.x,
        placement.y
    );
}

/// Set the bottom message and the message in the configured font and place
/// them, bottom message first.
fn load_messages(
    settings: &Settings,
    metrics: &ScreenMetrics,
    transposed: bool,
) -> Result<Vec<Message>, SplashError> {
    let font = SvgFont::load(&settings.font)?;
    let set = |text: &str, size_pt: u32| -> Result<(Message, u32), SplashError> {
        let block = font.layout(text, font.scale_for(size_pt, metrics.px_per_mm), metrics.width)?;
        let pixels = font
            .render(&block, MESSAGE_COLOR)
            .ok_or_else(|| SplashError::FontLoad {
                path: settings.font.clone(),
                reason: format!("cannot rasterize '{text}'"),
            })?;
        let (box_width, box_height) = if transposed {
            (block.height, block.width)
        } else {
            (block.width, block.height)
        };
        log::debug!("message '{text}' at {size_pt} pt: {} lines, {box_width}x{box_height}", block.lines.len());
        let message = Message {
            pixels,
            x: message_x(metrics, box_width),
            y: 0,
            width: block.width,
            height: block.height,
        };
        Ok((message, box_height))
    };

    let mut messages = Vec::new();
    let mut bottom = None;
    if let Some(text) = &settings.bottom_message {
        let (mut message, box_height) = set(text, settings.bottom_font_size)?;
        message.y = bottom_message_y(metrics, box_height);
        bottom = Some((message.y, settings.bottom_font_size));
        messages.push(message);
    }
    if let Some(text) = &settings.message {
        let (mut message, box_height) = set(text, settings.font_size)?;
        message.y = message_y(metrics, box_height, settings.font_size, bottom);
        messages.push(message);
    }
    Ok(messages)
}

fn present(display: &mut Display) {
    display.flush_window();
    // Failures are logged by the display; the next frame retries.
    let _ = display.flush_surface();
}

/// Show the static scene, animate until `stop` is set, then leave the logo
/// on screen.
pub fn show(display: &mut Display, scene: &Scene, settings: &Settings, stop: &AtomicBool) {
    scene.draw_static(display);
    present(display);
    if display.present_model() == PresentModel::PageFlip {
        // The buffer now at the back has never been drawn.
        scene.draw_static(display);
    }

    let frame_time = settings.frame_time();
    let epoch = Instant::now();
    while !stop.load(Ordering::SeqCst) {
        if !scene.is_animated() {
            std::thread::sleep(IDLE_POLL);
            continue;
        }
        let start = Instant::now();
        let tick = (epoch.elapsed().as_secs_f64() * TICK_RATE).floor();
        scene.draw_frame(display, tick);
        present(display);
        if let Some(rest) = frame_time.checked_sub(start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    log::debug!("stop requested");
    scene.draw_logo(display);
    scene.draw_messages(display);
    present(display);
}

/// Render a single frame off-screen and write it out as an image.
fn render_headless(settings: &Settings, headless: &Headless) -> Result<(), SplashError> {
    let mut display =
        Display::from_surface(MemorySurface::new(headless.width, headless.height, PresentModel::Direct));
    let scene = Scene::prepare(&display, settings)?;
    scene.draw_static(&mut display);
    scene.draw_frame(&mut display, 0.0);
    present(&mut display);

    let rgba = display.snapshot_rgba();
    image::save_buffer(
        &headless.output,
        &rgba,
        headless.width,
        headless.height,
        image::ColorType::Rgba8,
    )
    .map_err(|source| SplashError::ImageSave {
        path: headless.output.clone(),
        source,
    })?;
    log::info!("wrote {}", headless.output.display());
    Ok(())
}

/// Run the splash until `stop` is set.
pub fn run(settings: &Settings, stop: &AtomicBool) -> Result<(), SplashError> {
    if let Some(headless) = &settings.headless {
        return render_headless(settings, headless);
    }

    let mut display = match settings.backend {
        Backend::Drm => Display::acquire_drm(Some(settings.device.as_path()))?,
        Backend::Fb => Display::acquire_fb(
            settings.flags,
            Some(settings.device.as_path()),
            Some(settings.tty.as_path()),
        )?,
    };

    // On error the display is dropped, which releases it as well.
    let scene = Scene::prepare(&display, settings)?;
    show(&mut display, &scene, settings, stop);
    display.release();
    Ok(())
}
