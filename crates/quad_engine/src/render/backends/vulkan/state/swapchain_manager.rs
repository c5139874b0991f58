//! Swapchain lifecycle
//!
//! Owns everything derived from the swapchain and rebuilds it as a unit. The
//! render pass and pipeline are rebuilt as well: the pipeline bakes viewport
//! and scissor from the extent, and the render pass follows the surface format.

use ash::vk;
use crate::core::VulkanRendererConfig;
use crate::render::backends::vulkan::{
    wait_for_drawable_extent, CommandPool, FrameUniforms, Framebuffers, GraphicsPipeline, ImagesInFlight,
    PrerecordedCommands, QuadDraw, RenderPass, SceneResources, ShaderSet, SurfaceProvider, Swapchain, SwapchainSettings,
    SwapchainSupport, UniformBufferObject, VulkanContext, VulkanError, VulkanResult, VulkanVertexLayout,
};

/// One swapchain generation
///
/// Fields drop in declaration order, consumers before producers.
struct SwapchainResources {
    commands: Option<PrerecordedCommands>,
    framebuffers: Framebuffers,
    uniforms: FrameUniforms,
    pipeline: Option<GraphicsPipeline>,
    render_pass: RenderPass,
    swapchain: Swapchain,
}

/// Refuse to build over a generation that was never torn down
fn ensure_torn_down<T>(generation: Option<&T>) -> VulkanResult<()> {
    match generation {
        Some(_) => Err(VulkanError::InvalidOperation {
            reason: "Swapchain already built; tear down first".to_string(),
        }),
        None => Ok(()),
    }
}

/// Builds, tears down and rebuilds the swapchain and its dependents
pub struct SwapchainManager {
    resources: Option<SwapchainResources>,
    images_in_flight: ImagesInFlight,
    command_pool: CommandPool,
    shaders: Option<ShaderSet>,
    present_mode_fallback: vk::PresentModeKHR,
    clear_color: [f32; 4],
    rebuilds: u64,
}

impl SwapchainManager {
    /// Build the first swapchain for a drawable window extent
    ///
    /// Without shaders the swapchain still exists but nothing is recorded.
    pub fn new(
        context: &VulkanContext,
        config: &VulkanRendererConfig,
        shaders: Option<ShaderSet>,
        scene: &SceneResources,
        window_extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        log::debug!("Creating SwapchainManager...");

        let command_pool = CommandPool::new(context.raw_device(), context.graphics_queue_family())?;

        let mut manager = Self {
            resources: None,
            images_in_flight: ImagesInFlight::default(),
            command_pool,
            shaders,
            present_mode_fallback: config.present_mode_fallback.into(),
            clear_color: config.clear_color,
            rebuilds: 0,
        };
        manager.build(context, scene, window_extent)?;
        Ok(manager)
    }

    /// Negotiate and create the swapchain and everything that depends on it
    pub fn build(
        &mut self,
        context: &VulkanContext,
        scene: &SceneResources,
        window_extent: vk::Extent2D,
    ) -> VulkanResult<()> {
        ensure_torn_down(self.resources.as_ref())?;

        let support = SwapchainSupport::query(context)?;
        let settings = SwapchainSettings::negotiate(
            &support,
            (window_extent.width, window_extent.height),
            self.present_mode_fallback,
        )?;

        let swapchain = Swapchain::new(context, settings)?;
        let extent = swapchain.extent();
        let render_pass = RenderPass::new_color_pass(context.raw_device(), swapchain.format().format)?;

        let pipeline = match &self.shaders {
            Some(shaders) => {
                let (binding, attributes) = VulkanVertexLayout::get_input_state();
                let bindings = [binding];
                let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
                    .vertex_binding_descriptions(&bindings)
                    .vertex_attribute_descriptions(&attributes)
                    .build();
                Some(GraphicsPipeline::new(
                    context.device(),
                    render_pass.handle(),
                    extent,
                    shaders,
                    &vertex_input,
                    &[scene.descriptor_layout.handle()],
                )?)
            }
            None => None,
        };

        let framebuffers = Framebuffers::for_views(
            context.device(),
            render_pass.handle(),
            swapchain.image_views(),
            extent,
        )?;

        let uniforms = FrameUniforms::new(
            context,
            &scene.descriptor_layout,
            &scene.texture,
            swapchain.image_count(),
        )?;

        let commands = match &pipeline {
            Some(pipeline) => Some(PrerecordedCommands::record(
                context.device(),
                &self.command_pool,
                &QuadDraw {
                    render_pass: &render_pass,
                    framebuffers: &framebuffers,
                    extent,
                    pipeline,
                    mesh: &scene.mesh,
                    uniforms: &uniforms,
                    clear_color: self.clear_color,
                },
            )?),
            None => None,
        };

        log::info!(
            "Swapchain built: {} images, {}x{}, {:?}, {:?}",
            swapchain.image_count(),
            extent.width,
            extent.height,
            render_pass.color_format(),
            settings.present_mode
        );

        self.images_in_flight.reset(swapchain.image_count());
        self.resources = Some(SwapchainResources {
            commands,
            framebuffers,
            uniforms,
            pipeline,
            render_pass,
            swapchain,
        });
        Ok(())
    }

    /// Destroy the current generation; the device must be idle
    pub fn teardown(&mut self) {
        if let Some(resources) = self.resources.take() {
            log::debug!("Tearing down swapchain ({} images)", resources.swapchain.image_count());
            drop(resources);
        }
    }

    /// Wait until the window is drawable and the device idle, then rebuild
    pub fn rebuild<W: SurfaceProvider + ?Sized>(
        &mut self,
        context: &VulkanContext,
        scene: &SceneResources,
        window: &mut W,
    ) -> VulkanResult<()> {
        let window_extent = wait_for_drawable_extent(window);
        context.wait_idle()?;

        self.teardown();
        self.build(context, scene, window_extent)?;

        self.rebuilds += 1;
        log::debug!("Swapchain rebuild #{} complete", self.rebuilds);
        Ok(())
    }

    fn resources(&self) -> VulkanResult<&SwapchainResources> {
        self.resources.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "Swapchain is not built".to_string(),
        })
    }

    /// The current swapchain
    pub fn swapchain(&self) -> VulkanResult<&Swapchain> {
        self.resources().map(|r| &r.swapchain)
    }

    /// Whether a pipeline exists (false in degraded mode)
    pub fn has_pipeline(&self) -> bool {
        self.shaders.is_some()
    }

    /// Current swapchain extent
    pub fn extent(&self) -> VulkanResult<vk::Extent2D> {
        self.swapchain().map(Swapchain::extent)
    }

    /// Number of completed rebuilds
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Prerecorded command buffer for an image
    pub fn command_buffer(&self, image_index: u32) -> VulkanResult<vk::CommandBuffer> {
        self.resources()?
            .commands
            .as_ref()
            .map(|commands| commands.command_buffer(image_index as usize))
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: "No command buffers recorded without a pipeline".to_string(),
            })
    }

    /// Record that `fence` now guards rendering into `image_index`
    ///
    /// Returns the fence of another slot still rendering into that image, if any.
    pub fn claim_image(&mut self, image_index: u32, fence: vk::Fence) -> VulkanResult<Option<vk::Fence>> {
        let image_count = self.resources()?.swapchain.image_count();
        if image_index as usize >= image_count {
            return Err(VulkanError::InvalidOperation {
                reason: format!("Image {} out of range for {} swapchain images", image_index, image_count),
            });
        }
        Ok(self.images_in_flight.claim(image_index, fence))
    }

    /// Write the uniforms read when drawing into `image_index`
    pub fn update_uniforms(&self, image_index: u32, ubo: &UniformBufferObject) -> VulkanResult<()> {
        self.resources()?.uniforms.update(image_index as usize, ubo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_refused_until_torn_down() {
        let mut generation = Some(ImagesInFlight::new(2));
        assert!(matches!(
            ensure_torn_down(generation.as_ref()),
            Err(VulkanError::InvalidOperation { .. })
        ));

        generation.take();
        assert!(ensure_torn_down(generation.as_ref()).is_ok());
        // A second teardown/build cycle behaves the same
        generation = Some(ImagesInFlight::new(3));
        assert!(ensure_torn_down(generation.as_ref()).is_err());
        generation.take();
        assert!(ensure_torn_down(generation.as_ref()).is_ok());
    }
}
