//! Vulkan swapchain management
//!
//! Negotiation of the swap surface is split into pure functions over the
//! queried surface support so the selection rules can be tested without a
//! device. [`Swapchain`] owns the resulting swapchain and its image views.

use ash::{vk, Device};
use ash::extensions::khr::Swapchain as SwapchainLoader;
use crate::core::PresentModeFallback;
use crate::render::backends::vulkan::{VulkanContext, VulkanResult, VulkanError};

/// Everything the surface reports about what a swapchain may look like
#[derive(Debug, Clone)]
pub struct SwapchainSupport {
    /// Image count, extent and transform limits
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported format and color space pairs
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported presentation modes
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupport {
    /// Query the surface through the context
    pub fn query(context: &VulkanContext) -> VulkanResult<Self> {
        let loader = context.surface_loader();
        let device = context.physical_device().device;
        let surface = context.surface();

        unsafe {
            let capabilities = loader
                .get_physical_device_surface_capabilities(device, surface)
                .map_err(VulkanError::Api)?;
            let formats = loader
                .get_physical_device_surface_formats(device, surface)
                .map_err(VulkanError::Api)?;
            let present_modes = loader
                .get_physical_device_surface_present_modes(device, surface)
                .map_err(VulkanError::Api)?;

            Ok(Self {
                capabilities,
                formats,
                present_modes,
            })
        }
    }
}

impl From<PresentModeFallback> for vk::PresentModeKHR {
    fn from(fallback: PresentModeFallback) -> Self {
        match fallback {
            PresentModeFallback::Immediate => vk::PresentModeKHR::IMMEDIATE,
            PresentModeFallback::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
            PresentModeFallback::Fifo => vk::PresentModeKHR::FIFO,
        }
    }
}

/// Prefer 8-bit BGRA sRGB, otherwise take the first format offered
pub fn choose_surface_format(available: &[vk::SurfaceFormatKHR]) -> VulkanResult<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|sf| sf.format == vk::Format::B8G8R8A8_SRGB && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| available.first())
        .copied()
        .ok_or_else(|| VulkanError::UnsupportedSurface("surface reports no formats".to_string()))
}

/// Mailbox if offered, then the configured fallback, then FIFO
pub fn choose_present_mode(
    available: &[vk::PresentModeKHR],
    fallback: vk::PresentModeKHR,
) -> VulkanResult<vk::PresentModeKHR> {
    if available.is_empty() {
        return Err(VulkanError::UnsupportedSurface("surface reports no present modes".to_string()));
    }

    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        Ok(vk::PresentModeKHR::MAILBOX)
    } else if available.contains(&fallback) {
        Ok(fallback)
    } else {
        // FIFO support is required of every implementation
        Ok(vk::PresentModeKHR::FIFO)
    }
}

/// Surface's current extent, or the window size clamped into the allowed range
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, window_size: (u32, u32)) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    vk::Extent2D {
        width: window_size.0.clamp(min.width, max.width),
        height: window_size.1.clamp(min.height, max.height),
    }
}

/// One more than the minimum, capped at the maximum when the surface has one
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

/// The negotiated swap surface contract
#[derive(Debug, Clone, Copy)]
pub struct SwapchainSettings {
    /// Image format and color space
    pub surface_format: vk::SurfaceFormatKHR,
    /// Presentation mode
    pub present_mode: vk::PresentModeKHR,
    /// Image extent in pixels
    pub extent: vk::Extent2D,
    /// Minimum number of images requested
    pub image_count: u32,
    /// Transform to apply at presentation
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainSettings {
    /// Negotiate settings from queried support and the window's pixel size
    pub fn negotiate(
        support: &SwapchainSupport,
        window_size: (u32, u32),
        fallback: vk::PresentModeKHR,
    ) -> VulkanResult<Self> {
        Ok(Self {
            surface_format: choose_surface_format(&support.formats)?,
            present_mode: choose_present_mode(&support.present_modes, fallback)?,
            extent: choose_extent(&support.capabilities, window_size),
            image_count: choose_image_count(&support.capabilities),
            pre_transform: support.capabilities.current_transform,
        })
    }
}

/// Swapchain management wrapper with RAII cleanup
///
/// Owns the swapchain and one view per image; views are destroyed before the swapchain.
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    settings: SwapchainSettings,
}

impl Swapchain {
    /// Create a swapchain with already negotiated settings
    pub fn new(context: &VulkanContext, settings: SwapchainSettings) -> VulkanResult<Self> {
        let device = context.raw_device();
        let swapchain_loader = context.swapchain_loader().clone();

        let physical = context.physical_device();
        let queue_families = [physical.graphics_family, physical.present_family];

        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(context.surface())
            .min_image_count(settings.image_count)
            .image_format(settings.surface_format.format)
            .image_color_space(settings.surface_format.color_space)
            .image_extent(settings.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(settings.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(settings.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        create_info = if physical.graphics_family == physical.present_family {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        } else {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&queue_families)
        };

        let swapchain = unsafe {
            swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let images = match unsafe { swapchain_loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(VulkanError::Api(e));
            }
        };

        let mut image_views = Vec::with_capacity(images.len());
        for &image in &images {
            match create_image_view(&device, image, settings.surface_format.format) {
                Ok(view) => image_views.push(view),
                Err(e) => {
                    unsafe {
                        for &view in &image_views {
                            device.destroy_image_view(view, None);
                        }
                        swapchain_loader.destroy_swapchain(swapchain, None);
                    }
                    return Err(e);
                }
            }
        }

        log::debug!(
            "Created swapchain: {} images, {:?}, {:?}, {}x{}",
            images.len(),
            settings.surface_format.format,
            settings.present_mode,
            settings.extent.width,
            settings.extent.height
        );

        Ok(Self {
            device,
            swapchain_loader,
            swapchain,
            images,
            image_views,
            settings,
        })
    }

    /// Get swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.settings.extent
    }

    /// Get surface format
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.settings.surface_format
    }

    /// Settings the swapchain was created with
    pub fn settings(&self) -> &SwapchainSettings {
        &self.settings
    }

    /// Get image views
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Get swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Get swapchain loader
    pub fn loader(&self) -> &SwapchainLoader {
        &self.swapchain_loader
    }

    /// Number of images the implementation actually created
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

fn create_image_view(device: &Device, image: vk::Image, format: vk::Format) -> VulkanResult<vk::ImageView> {
    let create_info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe {
        device.create_image_view(&create_info, None)
            .map_err(VulkanError::Api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(min_count: u32, max_count: u32, current: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min_count,
            max_image_count: max_count,
            current_extent: vk::Extent2D { width: current.0, height: current.1 },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        }
    }

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    #[test]
    fn test_undefined_extent_clamped_per_axis() {
        let caps = capabilities(2, 8, (u32::MAX, u32::MAX));
        let extent = choose_extent(&caps, (5000, 300));
        assert_eq!((extent.width, extent.height), (4096, 300));
    }

    #[test]
    fn test_defined_extent_wins_over_window() {
        let caps = capabilities(2, 8, (1024, 768));
        let extent = choose_extent(&caps, (5000, 300));
        assert_eq!((extent.width, extent.height), (1024, 768));
    }

    #[test]
    fn test_present_mode_preference() {
        let fallback = vk::PresentModeKHR::IMMEDIATE;

        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes, fallback).unwrap(), vk::PresentModeKHR::MAILBOX);

        let modes = [vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes, fallback).unwrap(), vk::PresentModeKHR::FIFO);

        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(choose_present_mode(&modes, fallback).unwrap(), vk::PresentModeKHR::IMMEDIATE);

        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(
            choose_present_mode(&modes, PresentModeFallback::Fifo.into()).unwrap(),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn test_no_present_modes_is_fatal() {
        assert!(matches!(
            choose_present_mode(&[], vk::PresentModeKHR::IMMEDIATE),
            Err(VulkanError::UnsupportedSurface(_))
        ));
    }

    #[test]
    fn test_surface_format_preference() {
        let preferred = format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR);
        let other = format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR);

        assert_eq!(choose_surface_format(&[other, preferred]).unwrap(), preferred);
        assert_eq!(choose_surface_format(&[other]).unwrap(), other);
        assert!(choose_surface_format(&[]).is_err());
    }

    #[test]
    fn test_image_count() {
        assert_eq!(choose_image_count(&capabilities(2, 0, (800, 600))), 3);
        assert_eq!(choose_image_count(&capabilities(2, 8, (800, 600))), 3);
        assert_eq!(choose_image_count(&capabilities(3, 3, (800, 600))), 3);
    }

    #[test]
    fn test_defined_extent_ignores_window_hint_across_negotiations() {
        let support = SwapchainSupport {
            capabilities: capabilities(2, 0, (1280, 720)),
            formats: vec![
                format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
                format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };

        let first = SwapchainSettings::negotiate(&support, (800, 600), vk::PresentModeKHR::IMMEDIATE).unwrap();
        let second = SwapchainSettings::negotiate(&support, (1920, 1080), vk::PresentModeKHR::IMMEDIATE).unwrap();

        assert_eq!(first.extent, vk::Extent2D { width: 1280, height: 720 });
        assert_eq!(second.extent, first.extent);
        assert_eq!(first.image_count, second.image_count);
        assert_eq!(first.surface_format, second.surface_format);
        assert_eq!(first.present_mode, vk::PresentModeKHR::FIFO);
    }
}
