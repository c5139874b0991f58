//! Swapchain framebuffers

use ash::{vk, Device};
use crate::render::backends::vulkan::{VulkanResult, VulkanError};

/// One color-only framebuffer per swapchain image view, indexed like the images
pub struct Framebuffers {
    device: Device,
    handles: Vec<vk::Framebuffer>,
}

impl Framebuffers {
    /// Wrap each view in a framebuffer compatible with `render_pass`
    pub fn for_views(
        device: &Device,
        render_pass: vk::RenderPass,
        views: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let mut framebuffers = Self {
            device: device.clone(),
            handles: Vec::with_capacity(views.len()),
        };

        for view in views {
            let attachments = [*view];
            let create_info = vk::FramebufferCreateInfo::builder()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            // Pushed one at a time so Drop cleans up the ones already made on failure
            let handle = unsafe { device.create_framebuffer(&create_info, None).map_err(VulkanError::Api)? };
            framebuffers.handles.push(handle);
        }

        Ok(framebuffers)
    }

    /// All handles in image order
    pub fn handles(&self) -> &[vk::Framebuffer] {
        &self.handles
    }

    /// Number of framebuffers
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether there are none
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Drop for Framebuffers {
    fn drop(&mut self) {
        for &framebuffer in &self.handles {
            unsafe { self.device.destroy_framebuffer(framebuffer, None) };
        }
    }
}
