//! Command buffer management
//!
//! [`CommandPool`] hands out primary buffers and runs one-shot transfer work.
//! [`CommandRecorder`] tracks whether its buffer is mid-recording and opens an
//! [`ActiveRenderPass`] scope that ends the pass when dropped.

use ash::{vk, Device};
use crate::render::backends::vulkan::{LayoutTransition, VulkanResult, VulkanError};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    handle: vk::CommandPool,
}

impl CommandPool {
    /// Pool for the per-image buffers recorded at swapchain build time
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        Self::create(device, queue_family_index, vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
    }

    /// Pool for short-lived upload buffers
    pub fn new_transient(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        Self::create(device, queue_family_index, vk::CommandPoolCreateFlags::TRANSIENT)
    }

    fn create(device: Device, queue_family_index: u32, flags: vk::CommandPoolCreateFlags) -> VulkanResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::builder()
            .flags(flags)
            .queue_family_index(queue_family_index);

        let handle = unsafe { device.create_command_pool(&create_info, None).map_err(VulkanError::Api)? };

        Ok(Self { device, handle })
    }

    /// Allocate `count` primary command buffers
    pub fn allocate(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.handle)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe { self.device.allocate_command_buffers(&allocate_info).map_err(VulkanError::Api) }
    }

    /// Return buffers to the pool; none of them may be pending execution
    pub fn free(&self, command_buffers: &[vk::CommandBuffer]) {
        if !command_buffers.is_empty() {
            unsafe { self.device.free_command_buffers(self.handle, command_buffers) };
        }
    }

    /// Pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.handle
    }

    /// Record with `record`, submit to `queue` and block until the queue is idle
    ///
    /// Used for staging uploads at startup, where stalling is acceptable.
    pub fn submit_one_shot<F>(&self, queue: vk::Queue, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&mut CommandRecorder),
    {
        let command_buffer = self.allocate(1)?.into_iter().next().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "Command buffer allocation returned nothing".to_string(),
        })?;

        let result = self.record_and_submit(command_buffer, queue, record);
        self.free(&[command_buffer]);
        result
    }

    fn record_and_submit<F>(&self, command_buffer: vk::CommandBuffer, queue: vk::Queue, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&mut CommandRecorder),
    {
        let mut recorder = CommandRecorder::new(self.device.clone(), command_buffer);
        recorder.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        record(&mut recorder);
        let command_buffers = [recorder.finish()?];

        let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers).build();

        unsafe {
            self.device
                .queue_submit(queue, &[submit_info], vk::Fence::null())
                .and_then(|()| self.device.queue_wait_idle(queue))
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        // Frees any buffers still allocated from the pool
        unsafe { self.device.destroy_command_pool(self.handle, None) };
    }
}

/// Records into one primary command buffer
pub struct CommandRecorder {
    device: Device,
    command_buffer: vk::CommandBuffer,
    recording: bool,
}

impl CommandRecorder {
    /// Wrap an allocated command buffer
    pub fn new(device: Device, command_buffer: vk::CommandBuffer) -> Self {
        Self {
            device,
            command_buffer,
            recording: false,
        }
    }

    /// Start recording with the given usage flags
    pub fn begin(&mut self, usage: vk::CommandBufferUsageFlags) -> VulkanResult<()> {
        if self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer already recording".to_string(),
            });
        }

        let begin_info = vk::CommandBufferBeginInfo::builder().flags(usage);
        unsafe {
            self.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        self.recording = true;
        Ok(())
    }

    /// Open a render pass over the whole framebuffer with inline contents
    pub fn render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_values: &[vk::ClearValue],
    ) -> VulkanResult<ActiveRenderPass<'_>> {
        self.ensure_recording()?;

        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(clear_values);

        unsafe {
            self.device
                .cmd_begin_render_pass(self.command_buffer, &begin_info, vk::SubpassContents::INLINE);
        }

        Ok(ActiveRenderPass { recorder: self })
    }

    /// Copy `size` bytes from the start of `src` to the start of `dst`
    pub fn copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, size: vk::DeviceSize) {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe { self.device.cmd_copy_buffer(self.command_buffer, src, dst, &[region]) };
    }

    /// Copy tightly packed pixels from `src` into mip 0 of a color image in `TRANSFER_DST_OPTIMAL`
    pub fn copy_buffer_to_image(&mut self, src: vk::Buffer, image: vk::Image, extent: vk::Extent2D) {
        let region = vk::BufferImageCopy {
            buffer_offset: 0,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            },
            image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
            image_extent: vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            },
        };

        unsafe {
            self.device.cmd_copy_buffer_to_image(
                self.command_buffer,
                src,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
    }

    /// Record an image layout transition barrier
    pub fn transition_image(&mut self, transition: &LayoutTransition, barrier: vk::ImageMemoryBarrier) {
        unsafe {
            self.device.cmd_pipeline_barrier(
                self.command_buffer,
                transition.src_stage,
                transition.dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }

    /// Stop recording and hand back the buffer
    pub fn finish(mut self) -> VulkanResult<vk::CommandBuffer> {
        self.ensure_recording()?;

        unsafe {
            self.device
                .end_command_buffer(self.command_buffer)
                .map_err(VulkanError::Api)?;
        }

        self.recording = false;
        Ok(self.command_buffer)
    }

    fn ensure_recording(&self) -> VulkanResult<()> {
        if self.recording {
            Ok(())
        } else {
            Err(VulkanError::InvalidOperation {
                reason: "Command buffer not recording".to_string(),
            })
        }
    }
}

/// Render pass scope; ends the pass when dropped
pub struct ActiveRenderPass<'a> {
    recorder: &'a mut CommandRecorder,
}

impl ActiveRenderPass<'_> {
    /// Bind a graphics pipeline
    pub fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        let CommandRecorder { device, command_buffer, .. } = &*self.recorder;
        unsafe { device.cmd_bind_pipeline(*command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline) };
    }

    /// Bind a vertex buffer at binding 0 and a `u16` index buffer
    pub fn bind_geometry(&mut self, vertex_buffer: vk::Buffer, index_buffer: vk::Buffer) {
        let CommandRecorder { device, command_buffer, .. } = &*self.recorder;
        unsafe {
            device.cmd_bind_vertex_buffers(*command_buffer, 0, &[vertex_buffer], &[0]);
            device.cmd_bind_index_buffer(*command_buffer, index_buffer, 0, vk::IndexType::UINT16);
        }
    }

    /// Bind one descriptor set at set 0
    pub fn bind_descriptor_set(&mut self, layout: vk::PipelineLayout, set: vk::DescriptorSet) {
        let CommandRecorder { device, command_buffer, .. } = &*self.recorder;
        unsafe {
            device.cmd_bind_descriptor_sets(
                *command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                &[set],
                &[],
            );
        }
    }

    /// Draw `index_count` indices as a single instance
    pub fn draw_indexed(&mut self, index_count: u32) {
        let CommandRecorder { device, command_buffer, .. } = &*self.recorder;
        unsafe { device.cmd_draw_indexed(*command_buffer, index_count, 1, 0, 0, 0) };
    }
}

impl Drop for ActiveRenderPass<'_> {
    fn drop(&mut self) {
        unsafe {
            self.recorder.device.cmd_end_render_pass(self.recorder.command_buffer);
        }
    }
}
