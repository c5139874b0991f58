//! Vulkan backend implementation
//!
//! Organized into initialization, resources, rendering and state modules.

/// Vulkan initialization types (context, surface, window)
pub mod initialization;

/// Vulkan resource management (buffers, textures, descriptors)
pub mod resources;

/// Vulkan rendering operations (shaders, pipelines, render passes, commands)
pub mod rendering;

/// Swapchain lifecycle and frame synchronization
pub mod state;

/// Main Vulkan renderer implementation
pub mod renderer;

// Re-export main renderer
pub use renderer::VulkanRenderer;

// Re-export core initialization types
pub use initialization::context::{
    find_memory_type, DeviceConfig, PhysicalDeviceInfo, QueueFamilies, VulkanContext, VulkanError, VulkanResult,
};
pub use initialization::surface::{wait_for_drawable_extent, SurfaceProvider};
pub use initialization::window::{Window, WindowError, WindowResult};

// Re-export resource types
pub use resources::buffer::Buffer;
pub use resources::texture::{layout_transition_masks, ImageData, LayoutTransition, Texture};
pub use resources::uniform_buffer::{FrameUniforms, UniformBufferObject};
pub use resources::descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorSetWriter};
pub use resources::scene::{QuadMesh, SceneResources};

// Re-export rendering types
pub use rendering::shader::{FileShaderProvider, GraphicsPipeline, ShaderError, ShaderModule, ShaderProvider, ShaderSet};
pub use rendering::render_pass::RenderPass;
pub use rendering::commands::{ActiveRenderPass, CommandPool, CommandRecorder};
pub use rendering::command_recorder::{PrerecordedCommands, QuadDraw};
pub use rendering::vertex_layout::VulkanVertexLayout;

// Re-export state types
pub use state::framebuffer::Framebuffers;
pub use state::images_in_flight::ImagesInFlight;
pub use state::resize_monitor::{ResizeHandle, ResizeMonitor};
pub use state::swapchain::{Swapchain, SwapchainSettings, SwapchainSupport};
pub use state::sync::FrameSync;
pub use state::swapchain_manager::SwapchainManager;
pub use state::sync_manager::{
    classify_acquire, classify_present, AcquireOutcome, FrameBackend, FrameOutcome, PresentOutcome, SyncManager,
};
