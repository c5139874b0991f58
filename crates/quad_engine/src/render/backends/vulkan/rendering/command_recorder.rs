//! Per-image command recording
//!
//! One primary command buffer per swapchain image, recorded once when the
//! swapchain is built and replayed every frame. The buffers use
//! `SIMULTANEOUS_USE` since the same image's buffer can be resubmitted while a
//! previous submission is still pending on another frame slot.

use ash::{vk, Device};
use crate::render::backends::vulkan::{
    CommandPool, CommandRecorder, FrameUniforms, Framebuffers, GraphicsPipeline, QuadMesh, RenderPass, VulkanResult,
};

/// Everything a quad draw references, for one swapchain generation
pub struct QuadDraw<'a> {
    /// Color render pass
    pub render_pass: &'a RenderPass,
    /// One framebuffer per swapchain image
    pub framebuffers: &'a Framebuffers,
    /// Render area
    pub extent: vk::Extent2D,
    /// Quad pipeline
    pub pipeline: &'a GraphicsPipeline,
    /// Vertex and index buffers
    pub mesh: &'a QuadMesh,
    /// Per-image descriptor sets
    pub uniforms: &'a FrameUniforms,
    /// Clear color (RGBA)
    pub clear_color: [f32; 4],
}

impl QuadDraw<'_> {
    fn record_into(&self, recorder: &mut CommandRecorder, image_index: usize) -> VulkanResult<()> {
        recorder.begin(vk::CommandBufferUsageFlags::SIMULTANEOUS_USE)?;

        let clear_values = RenderPass::clear_values(self.clear_color);
        let mut pass = recorder.render_pass(
            self.render_pass.handle(),
            self.framebuffers.handles()[image_index],
            self.extent,
            &clear_values,
        )?;
        pass.bind_pipeline(self.pipeline.handle());
        pass.bind_geometry(self.mesh.vertex_buffer(), self.mesh.index_buffer());
        pass.bind_descriptor_set(self.pipeline.layout(), self.uniforms.descriptor_set(image_index));
        pass.draw_indexed(self.mesh.index_count());

        Ok(())
    }
}

/// Command buffers recorded for one swapchain generation, indexed by image
pub struct PrerecordedCommands {
    device: Device,
    command_pool: vk::CommandPool,
    command_buffers: Vec<vk::CommandBuffer>,
}

impl PrerecordedCommands {
    /// Allocate and record one command buffer per framebuffer
    pub fn record(device: &Device, pool: &CommandPool, draw: &QuadDraw<'_>) -> VulkanResult<Self> {
        // Owned before recording starts so a failure part-way still frees every buffer
        let commands = Self {
            device: device.clone(),
            command_pool: pool.handle(),
            command_buffers: pool.allocate(draw.framebuffers.len() as u32)?,
        };

        for (image_index, &command_buffer) in commands.command_buffers.iter().enumerate() {
            let mut recorder = CommandRecorder::new(device.clone(), command_buffer);
            draw.record_into(&mut recorder, image_index)?;
            recorder.finish()?;
        }

        log::debug!("Recorded {} command buffers", commands.command_buffers.len());
        Ok(commands)
    }

    /// Command buffer for a swapchain image
    pub fn command_buffer(&self, image_index: usize) -> vk::CommandBuffer {
        self.command_buffers[image_index]
    }

    /// Number of recorded buffers
    pub fn len(&self) -> usize {
        self.command_buffers.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.command_buffers.is_empty()
    }
}

impl Drop for PrerecordedCommands {
    fn drop(&mut self) {
        unsafe {
            self.device.free_command_buffers(self.command_pool, &self.command_buffers);
        }
    }
}
