//! # Configuration
//!
//! Window, renderer and engine settings for the quad renderer. Every structure
//! is serializable (TOML or RON through [`Config`]), has defaults, and offers
//! `with_*` builder setters so callers can construct an immutable value up front
//! and hand it to the renderer.

use serde::{Serialize, Deserialize};
use std::path::{Path, PathBuf};

pub use crate::config::{Config, ConfigError};

/// Maximum number of frames the renderer will allow in flight
pub const MAX_SUPPORTED_FRAMES_IN_FLIGHT: usize = 8;

/// # Shader Configuration
///
/// Locations of the compiled SPIR-V blobs for the quad pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Create shader config with automatic path resolution
    ///
    /// Tries the usual output locations so the binary works from the workspace
    /// root as well as from its own directory.
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        let shader_dirs = [
            "target/shaders/",
            "shaders/",
            "resources/shaders/",
            "../target/shaders/",
            "./",
        ];

        let find = |name: &str| {
            shader_dirs
                .iter()
                .map(|dir| format!("{}{}", dir, name))
                .find(|candidate| Path::new(candidate).exists())
                .unwrap_or_else(|| format!("target/shaders/{}", name))
        };

        Self {
            vertex_shader_path: find(base_vertex),
            fragment_shader_path: find(base_fragment),
        }
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution("quad.vert.spv", "quad.frag.spv")
    }
}

/// Present mode used when mailbox is unavailable
///
/// FIFO is always the last resort since every device supports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeFallback {
    /// Present immediately, may tear
    #[default]
    Immediate,
    /// Relaxed vsync
    FifoRelaxed,
    /// Strict vsync
    Fifo,
}

/// # Window Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial client width in screen coordinates
    pub width: u32,
    /// Initial client height in screen coordinates
    pub height: u32,
}

impl WindowConfig {
    /// Create a new window configuration
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("Window size must be non-zero, got {}x{}", self.width, self.height));
        }
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new("Textured quad with Vulkan", 800, 600)
    }
}

/// # Vulkan Renderer Configuration
///
/// Everything the device context and swapchain negotiation need, passed in
/// explicitly rather than read from globals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VulkanRendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Application version (major, minor, patch)
    pub application_version: (u32, u32, u32),
    /// Shader configuration
    pub shaders: ShaderConfig,
    /// Maximum frames in flight
    pub max_frames_in_flight: usize,
    /// Whether to enable Vulkan validation layers (`None` follows the build type)
    pub enable_validation: Option<bool>,
    /// Layers requested when validation is enabled
    pub validation_layers: Vec<String>,
    /// Instance extensions requested on top of the ones the window needs
    pub instance_extensions: Vec<String>,
    /// Clear color for the render pass (RGBA)
    pub clear_color: [f32; 4],
    /// Present mode used when mailbox is unavailable
    pub present_mode_fallback: PresentModeFallback,
    /// Texture sampled by the quad
    pub texture_path: PathBuf,
}

impl VulkanRendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            application_version: (1, 0, 0),
            shaders: ShaderConfig::default(),
            max_frames_in_flight: 2,
            enable_validation: None,
            validation_layers: vec!["VK_LAYER_KHRONOS_validation".to_string()],
            instance_extensions: Vec::new(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            present_mode_fallback: PresentModeFallback::default(),
            texture_path: PathBuf::from("resources/textures/texture.png"),
        }
    }

    /// Set application version
    pub fn with_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.application_version = (major, minor, patch);
        self
    }

    /// Set custom shader configuration
    pub fn with_shaders(mut self, shaders: ShaderConfig) -> Self {
        self.shaders = shaders;
        self
    }

    /// Set maximum frames in flight
    pub fn with_max_frames_in_flight(mut self, frames: usize) -> Self {
        self.max_frames_in_flight = frames;
        self
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Replace the requested validation layers
    pub fn with_validation_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validation_layers = layers.into_iter().map(Into::into).collect();
        self
    }

    /// Request an additional instance extension
    pub fn with_instance_extension(mut self, extension: impl Into<String>) -> Self {
        self.instance_extensions.push(extension.into());
        self
    }

    /// Set the clear color
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the present mode used when mailbox is unavailable
    pub fn with_present_mode_fallback(mut self, fallback: PresentModeFallback) -> Self {
        self.present_mode_fallback = fallback;
        self
    }

    /// Set the texture path
    pub fn with_texture_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.texture_path = path.into();
        self
    }

    /// Whether validation layers should be enabled for this build
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the configuration
    ///
    /// Shader paths are deliberately not checked here: missing shaders put the
    /// renderer in its no-pipeline mode instead of failing startup.
    pub fn validate(&self) -> Result<(), String> {
        if self.application_name.is_empty() {
            return Err("Application name cannot be empty".to_string());
        }

        if self.max_frames_in_flight == 0 {
            return Err("Max frames in flight must be at least 1".to_string());
        }

        if self.max_frames_in_flight > MAX_SUPPORTED_FRAMES_IN_FLIGHT {
            return Err(format!(
                "Max frames in flight should not exceed {}",
                MAX_SUPPORTED_FRAMES_IN_FLIGHT
            ));
        }

        if self.validation_enabled() && self.validation_layers.is_empty() {
            return Err("Validation enabled but no validation layers requested".to_string());
        }

        Ok(())
    }
}

impl Default for VulkanRendererConfig {
    fn default() -> Self {
        Self::new("Textured Quad")
    }
}

/// # Engine Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Parsed log level, `Info` when the string is not recognised
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Window configuration
    pub window: WindowConfig,
    /// Rendering system configuration
    pub renderer: VulkanRendererConfig,
}

impl ApplicationConfig {
    /// Create a new application configuration with defaults
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            engine: EngineConfig::default(),
            window: WindowConfig::default(),
            renderer: VulkanRendererConfig::new(app_name),
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), String> {
        self.window.validate()?;
        self.renderer.validate()?;
        Ok(())
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_defaults() {
        let config = VulkanRendererConfig::default();
        assert_eq!(config.max_frames_in_flight, 2);
        assert_eq!(config.present_mode_fallback, PresentModeFallback::Immediate);
        assert_eq!(config.validation_layers, vec!["VK_LAYER_KHRONOS_validation".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_defaults() {
        let window = WindowConfig::default();
        assert_eq!((window.width, window.height), (800, 600));
        assert!(window.validate().is_ok());
        assert!(WindowConfig::new("x", 0, 600).validate().is_err());
    }

    #[test]
    fn test_frames_in_flight_bounds() {
        assert!(VulkanRendererConfig::default().with_max_frames_in_flight(0).validate().is_err());
        assert!(VulkanRendererConfig::default().with_max_frames_in_flight(1).validate().is_ok());
        assert!(VulkanRendererConfig::default()
            .with_max_frames_in_flight(MAX_SUPPORTED_FRAMES_IN_FLIGHT + 1)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validation_requires_layers() {
        let config = VulkanRendererConfig::default()
            .with_validation(true)
            .with_validation_layers(Vec::<String>::new());
        assert!(config.validate().is_err());

        let config = config.with_validation(false);
        assert!(config.validate().is_ok());
        assert!(!config.validation_enabled());
    }

    #[test]
    fn test_builder_chain() {
        let config = VulkanRendererConfig::new("Quad")
            .with_version(2, 1, 0)
            .with_clear_color([0.1, 0.2, 0.3, 1.0])
            .with_present_mode_fallback(PresentModeFallback::Fifo)
            .with_instance_extension("VK_KHR_get_physical_device_properties2")
            .with_texture_path("textures/brick.png");

        assert_eq!(config.application_version, (2, 1, 0));
        assert_eq!(config.clear_color, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(config.present_mode_fallback, PresentModeFallback::Fifo);
        assert_eq!(config.instance_extensions.len(), 1);
        assert_eq!(config.texture_path, PathBuf::from("textures/brick.png"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let source = r#"
            [engine]
            log_level = "debug"

            [window]
            width = 1024

            [renderer]
            max_frames_in_flight = 3
            present_mode_fallback = "fifo_relaxed"
        "#;

        let config: ApplicationConfig = toml::from_str(source).unwrap();
        assert_eq!(config.engine.level_filter(), log::LevelFilter::Debug);
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.renderer.max_frames_in_flight, 3);
        assert_eq!(config.renderer.present_mode_fallback, PresentModeFallback::FifoRelaxed);
        assert_eq!(config.renderer.application_name, "Textured Quad");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ron_round_trip_preserves_fallback() {
        let config = ApplicationConfig::new("Quad");
        let text = ron::ser::to_string(&config).unwrap();
        let parsed: ApplicationConfig = ron::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_log_level_defaults_to_info() {
        let engine = EngineConfig::new().with_log_level("chatty");
        assert_eq!(engine.level_filter(), log::LevelFilter::Info);
    }
}
