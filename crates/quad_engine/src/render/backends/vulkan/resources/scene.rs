//! Swapchain-independent scene resources
//!
//! The quad's geometry, its texture and the descriptor set layout survive
//! swapchain rebuilds; only the per-image uniforms are recreated.

use ash::vk;
use crate::core::VulkanRendererConfig;
use crate::render::primitives::{QUAD_INDICES, QUAD_VERTICES};
use crate::render::backends::vulkan::{
    Buffer, CommandPool, DescriptorSetLayout, ImageData, Texture, VulkanContext, VulkanResult,
};

/// Device-local vertex and index buffers for the quad
pub struct QuadMesh {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
}

impl QuadMesh {
    /// Upload the quad geometry
    pub fn new(context: &VulkanContext, transfer_pool: &CommandPool) -> VulkanResult<Self> {
        let vertex_buffer = Buffer::device_local_with_data(
            context,
            transfer_pool,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            &QUAD_VERTICES,
        )?;
        let index_buffer = Buffer::device_local_with_data(
            context,
            transfer_pool,
            vk::BufferUsageFlags::INDEX_BUFFER,
            &QUAD_INDICES,
        )?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: QUAD_INDICES.len() as u32,
        })
    }

    /// Vertex buffer handle
    pub fn vertex_buffer(&self) -> vk::Buffer {
        self.vertex_buffer.handle()
    }

    /// Index buffer handle (u16 indices)
    pub fn index_buffer(&self) -> vk::Buffer {
        self.index_buffer.handle()
    }

    /// Number of indices to draw
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// Resources created once at startup
pub struct SceneResources {
    /// Quad geometry
    pub mesh: QuadMesh,
    /// Sampled texture
    pub texture: Texture,
    /// Layout of the per-image descriptor sets
    pub descriptor_layout: DescriptorSetLayout,
}

impl SceneResources {
    /// Upload geometry and texture and create the descriptor layout
    pub fn new(context: &VulkanContext, config: &VulkanRendererConfig) -> VulkanResult<Self> {
        let transfer_pool = CommandPool::new_transient(context.raw_device(), context.graphics_queue_family())?;

        let mesh = QuadMesh::new(context, &transfer_pool)?;
        let image = ImageData::load_or_checkerboard(&config.texture_path);
        let texture = Texture::from_image_data(context, &transfer_pool, &image)?;
        let descriptor_layout = DescriptorSetLayout::quad(context.device())?;

        log::info!("Scene resources ready");

        Ok(Self {
            mesh,
            texture,
            descriptor_layout,
        })
    }
}
