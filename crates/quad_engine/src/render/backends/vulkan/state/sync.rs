//! Per-slot synchronization objects
//!
//! Each frame in flight owns two binary semaphores and one fence. The
//! semaphores order acquire, render and present on the GPU; the fence lets the
//! CPU wait until the slot's previous submission is finished with its
//! command buffer and uniforms.

use ash::{vk, Device};
use crate::render::backends::vulkan::{VulkanResult, VulkanError};

/// Synchronization objects for one in-flight frame slot
pub struct FrameSync {
    device: Device,
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
}

impl FrameSync {
    /// Create the slot's semaphores and a signaled fence
    ///
    /// The fence starts signaled so the first wait on a fresh slot returns at once.
    pub fn new(device: &Device) -> VulkanResult<Self> {
        // Null handles are ignored by the destroy calls if creation stops part-way
        let mut sync = Self {
            device: device.clone(),
            image_available: vk::Semaphore::null(),
            render_finished: vk::Semaphore::null(),
            in_flight: vk::Fence::null(),
        };

        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);

        unsafe {
            sync.image_available = device.create_semaphore(&semaphore_info, None).map_err(VulkanError::Api)?;
            sync.render_finished = device.create_semaphore(&semaphore_info, None).map_err(VulkanError::Api)?;
            sync.in_flight = device.create_fence(&fence_info, None).map_err(VulkanError::Api)?;
        }

        Ok(sync)
    }

    /// Signaled by the presentation engine once the acquired image may be written
    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available
    }

    /// Signaled by the graphics queue when the slot's commands complete
    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished
    }

    /// Fence guarding the slot's last submission
    pub fn in_flight(&self) -> vk::Fence {
        self.in_flight
    }

    /// Block until the slot's last submission has completed
    pub fn wait_in_flight(&self, timeout: u64) -> VulkanResult<()> {
        unsafe {
            self.device
                .wait_for_fences(&[self.in_flight], true, timeout)
                .map_err(VulkanError::Api)
        }
    }

    /// Unsignal the fence right before it is handed to a queue submit
    pub fn reset_in_flight(&self) -> VulkanResult<()> {
        unsafe { self.device.reset_fences(&[self.in_flight]).map_err(VulkanError::Api) }
    }
}

impl Drop for FrameSync {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.in_flight, None);
            self.device.destroy_semaphore(self.render_finished, None);
            self.device.destroy_semaphore(self.image_available, None);
        }
    }
}
