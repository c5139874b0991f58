//! Vulkan-specific vertex layout definitions
//!
//! Keeps the vertex input descriptions out of the backend-agnostic
//! [`Vertex`] type.

use ash::vk;
use std::mem::{offset_of, size_of};
use crate::render::primitives::Vertex;

/// Vulkan vertex layout for the engine's [`Vertex`] type
pub struct VulkanVertexLayout;

impl VulkanVertexLayout {
    /// Per-vertex binding 0 with the stride of [`Vertex`]
    pub fn get_binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Position at location 0, color at 1, texture coordinate at 2
    pub fn get_attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Vertex, position) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Vertex, color) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Vertex, tex_coord) as u32,
            },
        ]
    }

    /// Binding and attributes together for pipeline creation
    pub fn get_input_state() -> (vk::VertexInputBindingDescription, [vk::VertexInputAttributeDescription; 3]) {
        (Self::get_binding_description(), Self::get_attribute_descriptions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_offsets() {
        let attributes = VulkanVertexLayout::get_attribute_descriptions();
        let offsets: Vec<u32> = attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 20]);

        let locations: Vec<u32> = attributes.iter().map(|a| a.location).collect();
        assert_eq!(locations, vec![0, 1, 2]);
    }

    #[test]
    fn test_binding_stride() {
        let binding = VulkanVertexLayout::get_binding_description();
        assert_eq!(binding.stride, 28);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
    }
}
