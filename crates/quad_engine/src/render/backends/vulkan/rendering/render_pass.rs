//! Color-only render pass for drawing straight into swapchain images

use ash::{vk, Device};
use crate::render::backends::vulkan::{VulkanResult, VulkanError};

/// Single-subpass render pass: clear, draw, leave the image presentable
///
/// Recreated on every swapchain rebuild because the attachment format follows
/// the negotiated surface format.
pub struct RenderPass {
    device: Device,
    handle: vk::RenderPass,
    color_format: vk::Format,
}

impl RenderPass {
    /// Build the pass for swapchain images of `color_format`
    pub fn new_color_pass(device: Device, color_format: vk::Format) -> VulkanResult<Self> {
        let attachments = [vk::AttachmentDescription {
            format: color_format,
            samples: vk::SampleCountFlags::TYPE_1,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
            ..Default::default()
        }];

        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];

        let subpasses = [vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .build()];

        // Attachment writes wait for the image-available semaphore's stage
        let dependencies = [vk::SubpassDependency {
            src_subpass: vk::SUBPASS_EXTERNAL,
            dst_subpass: 0,
            src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            src_access_mask: vk::AccessFlags::empty(),
            dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            ..Default::default()
        }];

        let create_info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let handle = unsafe { device.create_render_pass(&create_info, None).map_err(VulkanError::Api)? };

        log::debug!("Created color render pass for {:?}", color_format);

        Ok(Self {
            device,
            handle,
            color_format,
        })
    }

    /// Clear values matching the pass's single attachment
    pub fn clear_values(color: [f32; 4]) -> [vk::ClearValue; 1] {
        [vk::ClearValue {
            color: vk::ClearColorValue { float32: color },
        }]
    }

    /// Render pass handle
    pub fn handle(&self) -> vk::RenderPass {
        self.handle
    }

    /// Format of the color attachment
    pub fn color_format(&self) -> vk::Format {
        self.color_format
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_render_pass(self.handle, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_values_carry_color() {
        let values = RenderPass::clear_values([0.1, 0.2, 0.3, 1.0]);
        let color = unsafe { values[0].color.float32 };
        assert_eq!(color, [0.1, 0.2, 0.3, 1.0]);
    }
}
