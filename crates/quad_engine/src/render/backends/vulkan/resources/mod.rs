//! Vulkan resource management
//!
//! Buffers, the texture, descriptor sets, per-image uniforms and the
//! swapchain-independent scene resources.

/// Buffers and staging uploads
pub mod buffer;

/// Texture loading and upload
pub mod texture;

/// Uniform buffer objects and per-image uniforms
pub mod uniform_buffer;

/// Descriptor set management
pub mod descriptor_set;

/// Quad mesh, texture and descriptor layout created at startup
pub mod scene;

pub use buffer::Buffer;
pub use texture::{layout_transition_masks, ImageData, LayoutTransition, Texture};
pub use uniform_buffer::{FrameUniforms, UniformBufferObject};
pub use descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorSetWriter};
pub use scene::{QuadMesh, SceneResources};
