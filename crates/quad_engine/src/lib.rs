//! # Quad Engine
//!
//! A Vulkan renderer that draws a single textured quad. The interesting part is
//! underneath: frame pacing across several frames in flight and the swapchain
//! lifecycle, including transparent recreation when the window surface goes
//! stale (resize, minimize, out-of-date presentation).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quad_engine::core::ApplicationConfig;
//! use quad_engine::render::backends::vulkan::{VulkanRenderer, Window};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::default();
//!     let mut window = Window::new(&config.window)?;
//!     let mut renderer = VulkanRenderer::new(&mut window, &config.renderer)?;
//!
//!     while !window.should_close() {
//!         window.poll_events();
//!         for event in window.drain_events() {
//!             if let glfw::WindowEvent::FramebufferSize(width, height) = event {
//!                 renderer.report_framebuffer_size(width, height);
//!             }
//!         }
//!         renderer.draw_frame(&mut window)?;
//!     }
//!
//!     renderer.wait_idle()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
