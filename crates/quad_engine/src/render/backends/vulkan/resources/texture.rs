//! Vulkan texture management
//!
//! Loads an RGBA8 image with the `image` crate (or generates a checkerboard
//! when the file is unusable), uploads it through a staging buffer and creates
//! the view and sampler the fragment shader reads from.

use ash::vk;
use std::path::Path;
use crate::render::backends::vulkan::{Buffer, CommandPool, VulkanContext, VulkanResult, VulkanError};

/// Decoded RGBA8 pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Tightly packed RGBA8 rows
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Decode an image file into RGBA8
    pub fn load<P: AsRef<Path>>(path: P) -> VulkanResult<Self> {
        let image = image::open(path.as_ref())?.to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self {
            width,
            height,
            pixels: image.into_raw(),
        })
    }

    /// Load the file, or fall back to a checkerboard if it cannot be decoded
    pub fn load_or_checkerboard<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(data) => {
                log::info!("Loaded texture {:?} ({}x{})", path.as_ref(), data.width, data.height);
                data
            }
            Err(e) => {
                log::warn!("Texture {:?} unavailable ({}), using checkerboard", path.as_ref(), e);
                Self::checkerboard(256, 32)
            }
        }
    }

    /// Square magenta and dark grey checkerboard
    pub fn checkerboard(size: u32, cell: u32) -> Self {
        const LIGHT: [u8; 4] = [255, 0, 255, 255];
        const DARK: [u8; 4] = [40, 40, 40, 255];

        let cell = cell.max(1);
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let texel = if (x / cell + y / cell) % 2 == 0 { LIGHT } else { DARK };
                pixels.extend_from_slice(&texel);
            }
        }

        Self {
            width: size,
            height: size,
            pixels,
        }
    }
}

/// Access masks and stages for one image layout transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutTransition {
    /// Accesses that must complete before the transition
    pub src_access: vk::AccessFlags,
    /// Accesses that wait for the transition
    pub dst_access: vk::AccessFlags,
    /// Stage the barrier waits on
    pub src_stage: vk::PipelineStageFlags,
    /// Stage that waits on the barrier
    pub dst_stage: vk::PipelineStageFlags,
}

/// Barrier parameters for the two transitions a texture upload needs
///
/// Any other pair is a programming error.
pub fn layout_transition_masks(old: vk::ImageLayout, new: vk::ImageLayout) -> VulkanResult<LayoutTransition> {
    match (old, new) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => Ok(LayoutTransition {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::TRANSFER_WRITE,
            src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags::TRANSFER,
        }),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => Ok(LayoutTransition {
            src_access: vk::AccessFlags::TRANSFER_WRITE,
            dst_access: vk::AccessFlags::SHADER_READ,
            src_stage: vk::PipelineStageFlags::TRANSFER,
            dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
        }),
        _ => Err(VulkanError::UnsupportedLayoutTransition { old, new }),
    }
}

const COLOR_RANGE: vk::ImageSubresourceRange = vk::ImageSubresourceRange {
    aspect_mask: vk::ImageAspectFlags::COLOR,
    base_mip_level: 0,
    level_count: 1,
    base_array_layer: 0,
    layer_count: 1,
};

/// Sampled 2D texture with image, view and sampler
pub struct Texture {
    device: ash::Device,
    image: vk::Image,
    image_view: vk::ImageView,
    sampler: vk::Sampler,
    memory: vk::DeviceMemory,
    extent: vk::Extent2D,
}

impl Texture {
    /// Upload pixels into a device-local sRGB image
    pub fn from_image_data(
        context: &VulkanContext,
        transfer_pool: &CommandPool,
        image_data: &ImageData,
    ) -> VulkanResult<Self> {
        let device = context.raw_device();
        let extent = vk::Extent2D {
            width: image_data.width,
            height: image_data.height,
        };
        let format = vk::Format::R8G8B8A8_SRGB;

        let image_create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe {
            device.create_image(&image_create_info, None)
                .map_err(VulkanError::Api)?
        };

        let memory_requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory = context
            .find_memory_type(memory_requirements.memory_type_bits, vk::MemoryPropertyFlags::DEVICE_LOCAL)
            .and_then(|memory_type_index| {
                let allocate_info = vk::MemoryAllocateInfo::builder()
                    .allocation_size(memory_requirements.size)
                    .memory_type_index(memory_type_index);
                unsafe { device.allocate_memory(&allocate_info, None).map_err(VulkanError::Api) }
            });
        let memory = match memory {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };

        // From here on Drop owns cleanup; null view and sampler are ignored by the destroy calls
        let mut texture = Self {
            device,
            image,
            image_view: vk::ImageView::null(),
            sampler: vk::Sampler::null(),
            memory,
            extent,
        };

        unsafe {
            texture.device.bind_image_memory(image, memory, 0)
                .map_err(VulkanError::Api)?;
        }

        texture.upload(context, transfer_pool, &image_data.pixels)?;

        let view_create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(COLOR_RANGE);

        texture.image_view = unsafe {
            texture.device.create_image_view(&view_create_info, None)
                .map_err(VulkanError::Api)?
        };

        let max_anisotropy = context.max_sampler_anisotropy().min(16.0);
        let sampler_create_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(true)
            .max_anisotropy(max_anisotropy)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .min_lod(0.0)
            .max_lod(0.0);

        texture.sampler = unsafe {
            texture.device.create_sampler(&sampler_create_info, None)
                .map_err(VulkanError::Api)?
        };

        log::debug!(
            "Created {}x{} texture (anisotropy {})",
            extent.width,
            extent.height,
            max_anisotropy
        );

        Ok(texture)
    }

    fn upload(&self, context: &VulkanContext, transfer_pool: &CommandPool, pixels: &[u8]) -> VulkanResult<()> {
        let staging = Buffer::new(
            context,
            pixels.len() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.write_data(pixels)?;

        let (to_transfer, to_transfer_masks) =
            self.barrier(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL)?;
        let (to_shader, to_shader_masks) =
            self.barrier(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)?;

        transfer_pool.submit_one_shot(context.graphics_queue(), |recorder| {
            recorder.transition_image(&to_transfer_masks, to_transfer);
            recorder.copy_buffer_to_image(staging.handle(), self.image, self.extent);
            recorder.transition_image(&to_shader_masks, to_shader);
        })
    }

    fn barrier(
        &self,
        old: vk::ImageLayout,
        new: vk::ImageLayout,
    ) -> VulkanResult<(vk::ImageMemoryBarrier, LayoutTransition)> {
        let masks = layout_transition_masks(old, new)?;
        let barrier = vk::ImageMemoryBarrier::builder()
            .old_layout(old)
            .new_layout(new)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(COLOR_RANGE)
            .src_access_mask(masks.src_access)
            .dst_access_mask(masks.dst_access)
            .build();
        Ok((barrier, masks))
    }

    /// Get the image view for descriptor set binding
    pub fn image_view(&self) -> vk::ImageView {
        self.image_view
    }

    /// Get the sampler for descriptor set binding
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }

    /// Texture size in pixels
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
            self.device.destroy_image_view(self.image_view, None);
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_transitions() {
        let upload = layout_transition_masks(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL).unwrap();
        assert_eq!(upload.src_access, vk::AccessFlags::empty());
        assert_eq!(upload.dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(upload.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(upload.dst_stage, vk::PipelineStageFlags::TRANSFER);

        let sample = layout_transition_masks(
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        )
        .unwrap();
        assert_eq!(sample.src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(sample.dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(sample.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    }

    #[test]
    fn test_other_transitions_rejected() {
        let result = layout_transition_masks(vk::ImageLayout::UNDEFINED, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert!(matches!(
            result,
            Err(VulkanError::UnsupportedLayoutTransition {
                old: vk::ImageLayout::UNDEFINED,
                new: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            })
        ));

        assert!(layout_transition_masks(
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL
        )
        .is_err());
    }

    #[test]
    fn test_checkerboard_layout() {
        let board = ImageData::checkerboard(4, 2);
        assert_eq!((board.width, board.height), (4, 4));
        assert_eq!(board.pixels.len(), 4 * 4 * 4);

        let texel = |x: usize, y: usize| &board.pixels[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
        assert_eq!(texel(0, 0), texel(1, 1));
        assert_ne!(texel(0, 0), texel(2, 0));
        assert_ne!(texel(0, 0), texel(0, 2));
        assert_eq!(texel(0, 0), texel(2, 2));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let data = ImageData::load_or_checkerboard("no/such/texture.png");
        assert_eq!((data.width, data.height), (256, 256));
        assert!(ImageData::load("no/such/texture.png").is_err());
    }
}
