//! Vulkan renderer
//!
//! Ties the device context, scene resources, swapchain manager and frame
//! synchronizer together. [`VulkanRenderer::draw_frame`] hands a short-lived
//! [`FrameBackend`] over the Vulkan objects to the [`SyncManager`], which
//! decides the order of waits, submits, presents and rebuilds.

use ash::vk;
use std::time::Instant;

use crate::core::VulkanRendererConfig;
use crate::render::backends::vulkan::*;

/// Renderer for the textured quad
///
/// Fields drop in declaration order, so per-frame objects and the swapchain go
/// before the scene resources and the device context.
pub struct VulkanRenderer {
    frames: SyncManager,
    swapchain: SwapchainManager,
    scene: SceneResources,
    resize: ResizeMonitor,
    start_time: Instant,
    degraded_reported: bool,
    context: VulkanContext,
}

impl VulkanRenderer {
    /// Create the renderer for a window
    ///
    /// Blocks while the window is minimized. Missing shaders are not an error:
    /// the renderer runs without a pipeline and skips every frame.
    pub fn new(window: &mut Window, config: &VulkanRendererConfig) -> VulkanResult<Self> {
        config.validate().map_err(VulkanError::InitializationFailed)?;

        log::info!(
            "Initializing Vulkan renderer \"{}\" with {} frames in flight",
            config.application_name,
            config.max_frames_in_flight
        );

        let device_config = DeviceConfig::from_renderer_config(config);
        let context = VulkanContext::new(window, &device_config)?;

        let shaders = match ShaderSet::load(&FileShaderProvider, &config.shaders) {
            Ok(shaders) => Some(shaders),
            Err(e) => {
                log::warn!("{}; continuing without a graphics pipeline", e);
                None
            }
        };

        let scene = SceneResources::new(&context, config)?;

        let window_extent = wait_for_drawable_extent(window);
        let swapchain = SwapchainManager::new(&context, config, shaders, &scene, window_extent)?;
        let frames = SyncManager::new(context.device(), config.max_frames_in_flight)?;

        log::info!("Vulkan renderer ready");

        Ok(Self {
            frames,
            swapchain,
            scene,
            resize: ResizeMonitor::new(),
            start_time: Instant::now(),
            degraded_reported: false,
            context,
        })
    }

    /// Handle for reporting that the window surface changed
    pub fn resize_handle(&self) -> ResizeHandle {
        self.resize.handle()
    }

    /// Report the window's framebuffer size from a resize event
    ///
    /// Marks the surface stale only when the size differs from the swapchain extent.
    pub fn report_framebuffer_size(&self, width: i32, height: i32) {
        let reported = (width.max(0) as u32, height.max(0) as u32);
        match self.swapchain.extent() {
            Ok(extent) => {
                self.resize.mark_if_resized((extent.width, extent.height), reported);
            }
            Err(_) => self.resize.mark_stale(),
        }
    }

    /// Render and present one frame, rebuilding the swapchain when the surface changed
    pub fn draw_frame<W: SurfaceProvider + ?Sized>(&mut self, window: &mut W) -> VulkanResult<FrameOutcome> {
        if !self.swapchain.has_pipeline() {
            if !self.degraded_reported {
                log::warn!("No graphics pipeline; frames are skipped");
                self.degraded_reported = true;
            }
            return Ok(FrameOutcome::Skipped);
        }

        let mut frame = ActiveFrame {
            context: &self.context,
            swapchain: &mut self.swapchain,
            scene: &self.scene,
            window,
            elapsed_secs: self.start_time.elapsed().as_secs_f32(),
        };

        self.frames.draw_frame(&mut frame, &self.resize)
    }

    /// Block until the GPU has finished all submitted work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        self.context.wait_idle()
    }

    /// Number of frame slots
    pub fn frames_in_flight(&self) -> usize {
        self.frames.frames_in_flight()
    }

    /// Current swapchain extent
    pub fn swapchain_extent(&self) -> VulkanResult<vk::Extent2D> {
        self.swapchain.extent()
    }

    /// Number of swapchain rebuilds so far
    pub fn rebuild_count(&self) -> u64 {
        self.swapchain.rebuild_count()
    }

    /// The device context
    pub fn context(&self) -> &VulkanContext {
        &self.context
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        if let Err(e) = self.context.wait_idle() {
            log::error!("Device wait failed during renderer shutdown: {}", e);
        }
    }
}

/// Vulkan side of one frame
struct ActiveFrame<'a, W: ?Sized> {
    context: &'a VulkanContext,
    swapchain: &'a mut SwapchainManager,
    scene: &'a SceneResources,
    window: &'a mut W,
    elapsed_secs: f32,
}

impl<'a, W: SurfaceProvider + ?Sized> FrameBackend for ActiveFrame<'a, W> {
    type Slot = FrameSync;

    fn wait_for_slot(&mut self, slot: &FrameSync) -> VulkanResult<()> {
        slot.wait_in_flight(u64::MAX)
    }

    fn acquire_image(&mut self, slot: &FrameSync) -> VulkanResult<AcquireOutcome> {
        let swapchain = self.swapchain.swapchain()?;
        let result = unsafe {
            swapchain.loader().acquire_next_image(
                swapchain.handle(),
                u64::MAX,
                slot.image_available(),
                vk::Fence::null(),
            )
        };
        classify_acquire(result)
    }

    fn prepare_image(&mut self, slot: &FrameSync, image_index: u32) -> VulkanResult<()> {
        // Another slot may still be rendering into this image
        if let Some(previous) = self.swapchain.claim_image(image_index, slot.in_flight())? {
            unsafe {
                self.context
                    .device()
                    .wait_for_fences(&[previous], true, u64::MAX)
                    .map_err(VulkanError::Api)?;
            }
        }

        let aspect = UniformBufferObject::aspect(self.swapchain.extent()?);
        let ubo = UniformBufferObject::at(self.elapsed_secs, aspect);
        self.swapchain.update_uniforms(image_index, &ubo)
    }

    fn submit(&mut self, slot: &FrameSync, image_index: u32) -> VulkanResult<()> {
        let command_buffers = [self.swapchain.command_buffer(image_index)?];
        let wait_semaphores = [slot.image_available()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [slot.render_finished()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        slot.reset_in_flight()?;

        unsafe {
            self.context
                .device()
                .queue_submit(self.context.graphics_queue(), &[submit_info], slot.in_flight())
                .map_err(VulkanError::Api)
        }
    }

    fn present(&mut self, slot: &FrameSync, image_index: u32) -> VulkanResult<PresentOutcome> {
        let swapchain = self.swapchain.swapchain()?;
        let wait_semaphores = [slot.render_finished()];
        let swapchains = [swapchain.handle()];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            swapchain
                .loader()
                .queue_present(self.context.present_queue(), &present_info)
        };
        classify_present(result)
    }

    fn rebuild(&mut self) -> VulkanResult<()> {
        self.swapchain.rebuild(self.context, self.scene, self.window)
    }
}
