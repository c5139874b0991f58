//! Uniform buffer objects
//!
//! Each swapchain image gets its own host-visible uniform buffer and descriptor
//! set, so updating the uniforms for one image never races the GPU reading
//! another image's copy.

use ash::vk;
use std::f32::consts::FRAC_PI_2;
use std::f32::consts::FRAC_PI_4;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::backends::vulkan::{
    Buffer, DescriptorPool, DescriptorSetLayout, DescriptorSetWriter, Texture, VulkanContext, VulkanResult,
};

/// Model, view and projection matrices, column-major as GLSL expects
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformBufferObject {
    /// Model to world
    pub model: [[f32; 4]; 4],
    /// World to view
    pub view: [[f32; 4]; 4],
    /// View to Vulkan clip space
    pub proj: [[f32; 4]; 4],
}

// Three 4x4 f32 matrices, no padding
unsafe impl bytemuck::Pod for UniformBufferObject {}
unsafe impl bytemuck::Zeroable for UniformBufferObject {}

impl UniformBufferObject {
    /// Rotation speed of the quad around Z
    pub const RADIANS_PER_SECOND: f32 = FRAC_PI_2;

    /// Uniforms for the quad `elapsed_secs` after startup, viewed at `aspect`
    pub fn at(elapsed_secs: f32, aspect: f32) -> Self {
        let model = Mat4::rotation_z(elapsed_secs * Self::RADIANS_PER_SECOND);
        let view = Mat4::look_at(Vec3::new(2.0, 2.0, 2.0), Vec3::zeros(), Vec3::z());
        let proj = Mat4::perspective(FRAC_PI_4, aspect, 0.1, 10.0);

        Self {
            model: model.into(),
            view: view.into(),
            proj: proj.into(),
        }
    }

    /// Aspect ratio of an extent, guarding against a zero height
    pub fn aspect(extent: vk::Extent2D) -> f32 {
        extent.width as f32 / extent.height.max(1) as f32
    }
}

/// Per-image uniform buffers and the descriptor sets that bind them
///
/// Built and destroyed together with the swapchain since the count follows the image count.
pub struct FrameUniforms {
    buffers: Vec<Buffer>,
    descriptor_sets: Vec<vk::DescriptorSet>,
    // Owns the descriptor sets
    _pool: DescriptorPool,
}

impl FrameUniforms {
    /// Allocate `image_count` buffers and sets, pointing each set at its buffer and the texture
    pub fn new(
        context: &VulkanContext,
        layout: &DescriptorSetLayout,
        texture: &Texture,
        image_count: usize,
    ) -> VulkanResult<Self> {
        let count = image_count as u32;
        let pool = DescriptorPool::for_quad(context.raw_device(), count)?;

        let size = std::mem::size_of::<UniformBufferObject>() as vk::DeviceSize;
        let buffers = (0..image_count)
            .map(|_| {
                Buffer::new(
                    context,
                    size,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
                )
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        let layouts = vec![layout.handle(); image_count];
        let descriptor_sets = pool.allocate_descriptor_sets(&layouts)?;

        let writer = buffers
            .iter()
            .zip(&descriptor_sets)
            .fold(DescriptorSetWriter::new(), |writer, (buffer, &set)| {
                writer
                    .write_buffer(set, 0, buffer.handle(), 0, size)
                    .write_image(
                        set,
                        1,
                        texture.image_view(),
                        texture.sampler(),
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    )
            });
        writer.update(context.device());

        log::debug!("Created {} per-image uniform buffers and descriptor sets", image_count);

        Ok(Self {
            buffers,
            descriptor_sets,
            _pool: pool,
        })
    }

    /// Overwrite the uniforms for one image; the GPU must not be reading them
    pub fn update(&self, image_index: usize, ubo: &UniformBufferObject) -> VulkanResult<()> {
        self.buffers[image_index].write_data(std::slice::from_ref(ubo))
    }

    /// Descriptor set bound when drawing into `image_index`
    pub fn descriptor_set(&self, image_index: usize) -> vk::DescriptorSet {
        self.descriptor_sets[image_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec4;
    use approx::assert_relative_eq;

    fn matrix(columns: [[f32; 4]; 4]) -> Mat4 {
        Mat4::from(columns)
    }

    #[test]
    fn test_model_rotates_quarter_turn_per_second() {
        let ubo = UniformBufferObject::at(1.0, 1.0);
        let rotated = matrix(ubo.model) * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(rotated, Vec4::new(0.0, 1.0, 0.0, 1.0), epsilon = 1e-5);

        let start = UniformBufferObject::at(0.0, 1.0);
        assert_relative_eq!(matrix(start.model), Mat4::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_origin_projects_to_screen_center() {
        let ubo = UniformBufferObject::at(0.0, 800.0 / 600.0);
        let clip = matrix(ubo.proj) * matrix(ubo.view) * matrix(ubo.model) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;

        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_size_matches_std140_layout() {
        assert_eq!(std::mem::size_of::<UniformBufferObject>(), 3 * 64);
    }

    #[test]
    fn test_aspect_guards_zero_height() {
        assert_relative_eq!(UniformBufferObject::aspect(vk::Extent2D { width: 800, height: 600 }), 800.0 / 600.0);
        assert_relative_eq!(UniformBufferObject::aspect(vk::Extent2D { width: 800, height: 0 }), 800.0);
    }
}
