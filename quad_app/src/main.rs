//! Textured quad demo application
//!
//! Opens a resizable window and draws a rotating textured quad until the
//! window is closed or Escape is pressed.

use glfw::{Action, Key, WindowEvent};
use quad_engine::core::{ApplicationConfig, Config, ConfigError};
use quad_engine::render::backends::vulkan::{FrameOutcome, VulkanError, VulkanRenderer, Window, WindowError};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "config/quad.toml";

/// Longest block on window events when no frame was drawn
const IDLE_WAIT_SECS: f64 = 0.25;

#[derive(Error, Debug)]
enum AppError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("window: {0}")]
    Window(#[from] WindowError),

    #[error("renderer: {0}")]
    Vulkan(#[from] VulkanError),
}

struct QuadApp {
    // Dropped before the window so the surface outlives the renderer
    renderer: VulkanRenderer,
    window: Window,
    frames_presented: u64,
}

impl QuadApp {
    fn new(config: &ApplicationConfig) -> Result<Self, AppError> {
        log::info!("Creating window...");
        let mut window = Window::new(&config.window)?;

        log::info!("Creating Vulkan renderer...");
        let renderer = VulkanRenderer::new(&mut window, &config.renderer)?;

        Ok(Self {
            renderer,
            window,
            frames_presented: 0,
        })
    }

    fn run(&mut self) -> Result<(), AppError> {
        while !self.window.should_close() {
            self.window.poll_events();

            let mut reported_size = None;
            for event in self.window.drain_events() {
                match event {
                    WindowEvent::Key(Key::Escape, _, Action::Press, _) => {
                        self.window.set_should_close(true);
                    }
                    WindowEvent::FramebufferSize(width, height) => {
                        log::debug!("Framebuffer resized to {}x{}", width, height);
                        reported_size = Some((width, height));
                    }
                    _ => {}
                }
            }
            // Only the latest size matters; it may already match the swapchain
            if let Some((width, height)) = reported_size {
                self.renderer.report_framebuffer_size(width, height);
            }

            let outcome = self.renderer.draw_frame(&mut self.window)?;
            if outcome == FrameOutcome::Presented {
                self.frames_presented += 1;
            }
            if let Some(timeout) = idle_wait(outcome) {
                self.window.wait_events_timeout(timeout);
            }
        }

        self.renderer.wait_idle()?;
        log::info!(
            "Presented {} frames, rebuilt the swapchain {} times",
            self.frames_presented,
            self.renderer.rebuild_count()
        );
        Ok(())
    }
}

/// How long to block on window events after a frame, if at all
///
/// A skipped frame did no GPU work, so nothing else paces the loop.
fn idle_wait(outcome: FrameOutcome) -> Option<f64> {
    match outcome {
        FrameOutcome::Skipped => Some(IDLE_WAIT_SECS),
        FrameOutcome::Presented | FrameOutcome::Rebuilt => None,
    }
}

fn load_config() -> Result<ApplicationConfig, AppError> {
    let path = std::env::var("QUAD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = ApplicationConfig::load_or_default(&path)?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

fn run() -> Result<(), AppError> {
    let config = load_config()?;

    env_logger::Builder::from_default_env()
        .filter_level(config.engine.level_filter())
        .parse_default_env()
        .init();

    log::info!("Starting textured quad demo");

    let mut app = QuadApp::new(&config)?;
    app.run()
}

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC occurred: {}", panic_info);

        if let Some(location) = panic_info.location() {
            eprintln!("Panic location: {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    if let Err(e) = run() {
        if log::log_enabled!(log::Level::Error) {
            log::error!("Fatal: {}", e);
        } else {
            eprintln!("Fatal: {}", e);
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_frames_block_on_events() {
        assert_eq!(idle_wait(FrameOutcome::Skipped), Some(IDLE_WAIT_SECS));
        assert!(IDLE_WAIT_SECS > 0.0);
    }

    #[test]
    fn test_drawn_frames_do_not_block() {
        assert_eq!(idle_wait(FrameOutcome::Presented), None);
        assert_eq!(idle_wait(FrameOutcome::Rebuilt), None);
    }
}
