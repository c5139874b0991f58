//! # Core Module
//!
//! Shared configuration types used by the renderer and the application.

pub mod config;

pub use config::{
    ApplicationConfig,
    EngineConfig,
    PresentModeFallback,
    ShaderConfig,
    VulkanRendererConfig,
    WindowConfig,
    Config,
    ConfigError,
};
