//! Vulkan context management
//!
//! Owns the instance, surface, physical device selection and logical device.
//! Everything else in the backend borrows from the context and is dropped before it.

use ash::{Device, Entry, Instance};
use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::vk;
use std::collections::HashSet;
use std::ffi::{CStr, CString};
use thiserror::Error;

use crate::core::VulkanRendererConfig;
use crate::render::backends::vulkan::initialization::window::{Window, WindowError};
use crate::render::backends::vulkan::rendering::shader::ShaderError;

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Requested validation layers are not installed
    #[error("Required validation layers not found: {layers:?}")]
    MissingValidationLayers {
        /// Layers that were requested but not reported by the loader
        layers: Vec<String>,
    },

    /// No physical device can render to the surface
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// No suitable memory type found for allocation
    #[error("No suitable memory type found (filter {type_filter:#b}, properties {properties:?})")]
    NoSuitableMemoryType {
        /// Bitmask of acceptable memory type indices
        type_filter: u32,
        /// Required property flags
        properties: vk::MemoryPropertyFlags,
    },

    /// The surface does not offer what the swapchain needs
    #[error("Unsupported surface: {0}")]
    UnsupportedSurface(String),

    /// Image layout transition outside the supported set
    #[error("Unsupported layout transition: {old:?} -> {new:?}")]
    UnsupportedLayoutTransition {
        /// Layout the image is in
        old: vk::ImageLayout,
        /// Layout that was requested
        new: vk::ImageLayout,
    },

    /// Shader loading failed
    #[error("Shader error: {0}")]
    Shader(#[from] ShaderError),

    /// Texture file could not be decoded
    #[error("Texture error: {0}")]
    Texture(#[from] image::ImageError),

    /// Window system failure
    #[error("Window error: {0}")]
    Window(#[from] WindowError),
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

/// Instance-level settings, passed explicitly into [`VulkanContext::new`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    application_name: String,
    application_version: (u32, u32, u32),
    enable_validation: bool,
    validation_layers: Vec<String>,
    instance_extensions: Vec<String>,
}

impl DeviceConfig {
    /// Create a configuration with validation disabled and no extra extensions
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            application_version: (1, 0, 0),
            enable_validation: false,
            validation_layers: Vec::new(),
            instance_extensions: Vec::new(),
        }
    }

    /// Build the device configuration from renderer settings
    pub fn from_renderer_config(config: &VulkanRendererConfig) -> Self {
        let (major, minor, patch) = config.application_version;
        Self::new(config.application_name.clone())
            .with_version(major, minor, patch)
            .with_validation(config.validation_enabled())
            .with_validation_layers(config.validation_layers.iter().cloned())
            .with_instance_extensions(config.instance_extensions.iter().cloned())
    }

    /// Set application version
    pub fn with_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.application_version = (major, minor, patch);
        self
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = enabled;
        self
    }

    /// Set the validation layers requested when validation is enabled
    pub fn with_validation_layers<I: IntoIterator<Item = String>>(mut self, layers: I) -> Self {
        self.validation_layers = layers.into_iter().collect();
        self
    }

    /// Add instance extensions on top of the ones the window requires
    pub fn with_instance_extensions<I: IntoIterator<Item = String>>(mut self, extensions: I) -> Self {
        self.instance_extensions.extend(extensions);
        self
    }

    /// Whether validation is on
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation
    }

    /// Layers that will actually be enabled on the instance
    pub fn enabled_layers(&self) -> &[String] {
        if self.enable_validation {
            &self.validation_layers
        } else {
            &[]
        }
    }

    /// Full instance extension list: window extensions, configured extras, then debug utils
    pub fn enabled_extensions(&self, window_extensions: &[String]) -> Vec<String> {
        let mut extensions: Vec<String> = Vec::with_capacity(window_extensions.len() + self.instance_extensions.len() + 1);
        for ext in window_extensions.iter().chain(self.instance_extensions.iter()) {
            if !extensions.contains(ext) {
                extensions.push(ext.clone());
            }
        }

        if self.enable_validation {
            let debug_utils = DebugUtils::name().to_string_lossy().into_owned();
            if !extensions.contains(&debug_utils) {
                extensions.push(debug_utils);
            }
        }

        extensions
    }
}

/// Layers from `requested` that are not present in `available`
pub fn missing_layers(requested: &[String], available: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|layer| !available.contains(layer))
        .cloned()
        .collect()
}

fn to_cstrings(names: &[String]) -> VulkanResult<Vec<CString>> {
    names
        .iter()
        .map(|name| {
            CString::new(name.as_str())
                .map_err(|_| VulkanError::InitializationFailed(format!("Invalid name: {:?}", name)))
        })
        .collect()
}

/// Vulkan instance wrapper with RAII cleanup
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl VulkanInstance {
    /// Create a new Vulkan instance
    ///
    /// Fails with [`VulkanError::MissingValidationLayers`] when validation is
    /// requested and any configured layer is absent.
    pub fn new(config: &DeviceConfig, window_extensions: &[String]) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to load Vulkan: {:?}", e)))?;

        if config.validation_enabled() {
            let available: Vec<String> = entry
                .enumerate_instance_layer_properties()
                .map_err(VulkanError::Api)?
                .iter()
                .map(|layer| unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) }.to_string_lossy().into_owned())
                .collect();

            let missing = missing_layers(config.enabled_layers(), &available);
            if !missing.is_empty() {
                return Err(VulkanError::MissingValidationLayers { layers: missing });
            }
        }

        let app_name = CString::new(config.application_name.as_str())
            .map_err(|_| VulkanError::InitializationFailed("Application name contains NUL".to_string()))?;
        let engine_name = CString::new("QuadEngine")
            .map_err(|_| VulkanError::InitializationFailed("Engine name contains NUL".to_string()))?;
        let (major, minor, patch) = config.application_version;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, major, minor, patch))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let extension_names = to_cstrings(&config.enabled_extensions(window_extensions))?;
        let extension_ptrs: Vec<*const std::os::raw::c_char> = extension_names.iter().map(|ext| ext.as_ptr()).collect();

        let layer_names = to_cstrings(config.enabled_layers())?;
        let layer_ptrs: Vec<*const std::os::raw::c_char> = layer_names.iter().map(|name| name.as_ptr()).collect();

        log::debug!(
            "Creating instance with extensions {:?} and layers {:?}",
            extension_names,
            layer_names
        );

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe {
            entry.create_instance(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let debug_utils = if config.validation_enabled() {
            let loader = DebugUtils::new(&entry, &instance);
            match Self::setup_debug_messenger(&loader) {
                Ok(messenger) => Some((loader, messenger)),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
        })
    }

    fn setup_debug_messenger(debug_utils: &DebugUtils) -> VulkanResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
            )
            .pfn_user_callback(Some(debug_callback));

        unsafe {
            debug_utils.create_debug_utils_messenger(&create_info, None)
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((loader, messenger)) = self.debug_utils.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

/// Log level for a validation message severity
pub fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> log::Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::Level::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::Level::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::Level::Info
    } else {
        log::Level::Debug
    }
}

/// Routes validation messages into the `log` facade
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || (*callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    log::log!(severity_level(message_severity), "[{:?}] {}", message_type, message);

    vk::FALSE
}

/// Find a memory type index matching `type_filter` with all of `properties`
pub fn find_memory_type(
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
) -> VulkanResult<u32> {
    (0..memory_properties.memory_type_count)
        .find(|&i| {
            (type_filter & (1 << i)) != 0
                && memory_properties.memory_types[i as usize].property_flags.contains(properties)
        })
        .ok_or(VulkanError::NoSuitableMemoryType { type_filter, properties })
}

/// Queue family indices used for rendering and presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    /// Family that records and executes draw commands
    pub graphics_family: u32,
    /// Family that presents to the surface
    pub present_family: u32,
}

impl QueueFamilies {
    /// Pick families from `families`, preferring one that can both draw and present
    ///
    /// `supports_present` is asked about each family index in order.
    pub fn find<F>(families: &[vk::QueueFamilyProperties], mut supports_present: F) -> VulkanResult<Option<Self>>
    where
        F: FnMut(u32) -> VulkanResult<bool>,
    {
        let mut graphics = None;
        let mut present = None;

        for (index, family) in (0u32..).zip(families) {
            let draws = family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
            let presents = supports_present(index)?;

            if draws && presents {
                return Ok(Some(Self {
                    graphics_family: index,
                    present_family: index,
                }));
            }
            if draws {
                graphics.get_or_insert(index);
            }
            if presents {
                present.get_or_insert(index);
            }
        }

        Ok(graphics.zip(present).map(|(graphics_family, present_family)| Self {
            graphics_family,
            present_family,
        }))
    }

    /// Whether graphics and presentation use different families
    pub fn is_split(&self) -> bool {
        self.graphics_family != self.present_family
    }
}

/// Physical device selection and capabilities
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Memory heaps and types
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Index of the graphics queue family
    pub graphics_family: u32,
    /// Index of the presentation queue family
    pub present_family: u32,
}

impl PhysicalDeviceInfo {
    /// Select the first physical device able to render and present to `surface`
    pub fn select_suitable_device(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> VulkanResult<Self> {
        let devices = unsafe {
            instance.enumerate_physical_devices()
                .map_err(VulkanError::Api)?
        };

        for device in devices {
            match Self::evaluate_device(instance, device, surface, surface_loader) {
                Ok(device_info) => {
                    log::info!("Selected GPU: {}", device_info.name());
                    return Ok(device_info);
                }
                Err(reason) => {
                    let properties = unsafe { instance.get_physical_device_properties(device) };
                    let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy();
                    log::debug!("Skipping GPU {}: {}", name, reason);
                }
            }
        }

        Err(VulkanError::NoSuitableDevice)
    }

    fn evaluate_device(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> VulkanResult<Self> {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let features = unsafe { instance.get_physical_device_features(device) };
        let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };
        let queue_families = unsafe {
            instance.get_physical_device_queue_family_properties(device)
        };

        let QueueFamilies { graphics_family, present_family } =
            QueueFamilies::find(&queue_families, |index| unsafe {
                surface_loader
                    .get_physical_device_surface_support(device, index, surface)
                    .map_err(VulkanError::Api)
            })?
            .ok_or_else(|| {
                VulkanError::InitializationFailed("No queue families for graphics and presentation".to_string())
            })?;

        let extensions = unsafe {
            instance.enumerate_device_extension_properties(device)
                .map_err(VulkanError::Api)?
        };

        let has_swapchain = extensions.iter().any(|available| {
            let extension_name = unsafe { CStr::from_ptr(available.extension_name.as_ptr()) };
            extension_name == SwapchainLoader::name()
        });

        if !has_swapchain {
            return Err(VulkanError::InitializationFailed(
                "Swapchain extension not supported".to_string()
            ));
        }

        let (formats, present_modes) = unsafe {
            (
                surface_loader.get_physical_device_surface_formats(device, surface).map_err(VulkanError::Api)?,
                surface_loader.get_physical_device_surface_present_modes(device, surface).map_err(VulkanError::Api)?,
            )
        };

        if formats.is_empty() || present_modes.is_empty() {
            return Err(VulkanError::UnsupportedSurface(
                "Device reports no surface formats or present modes".to_string()
            ));
        }

        if features.sampler_anisotropy != vk::TRUE {
            return Err(VulkanError::InitializationFailed(
                "Sampler anisotropy not supported".to_string()
            ));
        }

        Ok(Self {
            device,
            properties,
            memory_properties,
            graphics_family,
            present_family,
        })
    }

    /// Human-readable device name
    pub fn name(&self) -> String {
        unsafe { CStr::from_ptr(self.properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

/// Logical device wrapper with RAII cleanup
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Graphics operations queue
    pub graphics_queue: vk::Queue,
    /// Surface presentation queue
    pub present_queue: vk::Queue,
    /// Swapchain extension loader
    pub swapchain_loader: SwapchainLoader,
}

impl LogicalDevice {
    /// Create a new logical device with one queue per unique family
    pub fn new(
        instance: &Instance,
        physical_device_info: &PhysicalDeviceInfo,
    ) -> VulkanResult<Self> {
        let unique_families: HashSet<u32> = [
            physical_device_info.graphics_family,
            physical_device_info.present_family,
        ].into_iter().collect();

        let priorities = [1.0];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let required_extensions = [SwapchainLoader::name().as_ptr()];

        let device_features = vk::PhysicalDeviceFeatures::builder()
            .sampler_anisotropy(true)
            .build();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&required_extensions)
            .enabled_features(&device_features);

        let device = unsafe {
            instance.create_device(physical_device_info.device, &create_info, None)
                .map_err(VulkanError::Api)?
        };

        let graphics_queue = unsafe {
            device.get_device_queue(physical_device_info.graphics_family, 0)
        };

        let present_queue = unsafe {
            device.get_device_queue(physical_device_info.present_family, 0)
        };

        let swapchain_loader = SwapchainLoader::new(instance, &device);

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            swapchain_loader,
        })
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

/// Main Vulkan context that owns all core Vulkan resources
///
/// Fields drop in declaration order: the logical device goes before the instance.
pub struct VulkanContext {
    surface: vk::SurfaceKHR,
    surface_loader: Surface,
    physical_device: PhysicalDeviceInfo,
    device: LogicalDevice,
    instance: VulkanInstance,
}

impl VulkanContext {
    /// Create a new Vulkan context for the window
    pub fn new(window: &Window, config: &DeviceConfig) -> VulkanResult<Self> {
        let window_extensions = window.required_instance_extensions()?;
        let instance = VulkanInstance::new(config, &window_extensions)?;

        let surface_loader = Surface::new(&instance.entry, &instance.instance);
        let surface = window.create_vulkan_surface(instance.instance.handle())?;

        let physical_device = match PhysicalDeviceInfo::select_suitable_device(
            &instance.instance, surface, &surface_loader
        ) {
            Ok(info) => info,
            Err(e) => {
                unsafe { surface_loader.destroy_surface(surface, None) };
                return Err(e);
            }
        };

        let device = match LogicalDevice::new(&instance.instance, &physical_device) {
            Ok(device) => device,
            Err(e) => {
                unsafe { surface_loader.destroy_surface(surface, None) };
                return Err(e);
            }
        };

        log::info!(
            "Vulkan context ready (graphics family {}, present family {}, validation {})",
            physical_device.graphics_family,
            physical_device.present_family,
            config.validation_enabled()
        );

        Ok(Self {
            surface,
            surface_loader,
            physical_device,
            device,
            instance,
        })
    }

    /// Get a reference to the Vulkan instance
    pub fn instance(&self) -> &Instance {
        &self.instance.instance
    }

    /// Get the surface handle
    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Get the surface loader
    pub fn surface_loader(&self) -> &Surface {
        &self.surface_loader
    }

    /// Get the physical device info
    pub fn physical_device(&self) -> &PhysicalDeviceInfo {
        &self.physical_device
    }

    /// Get the logical device
    pub fn device(&self) -> &Device {
        &self.device.device
    }

    /// Get a cloned Device handle for RAII wrappers
    pub fn raw_device(&self) -> Device {
        self.device.device.clone()
    }

    /// Get the swapchain loader
    pub fn swapchain_loader(&self) -> &SwapchainLoader {
        &self.device.swapchain_loader
    }

    /// Get the graphics queue
    pub fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue
    }

    /// Get the present queue
    pub fn present_queue(&self) -> vk::Queue {
        self.device.present_queue
    }

    /// Get the graphics queue family index
    pub fn graphics_queue_family(&self) -> u32 {
        self.physical_device.graphics_family
    }

    /// Memory type index for an allocation
    pub fn find_memory_type(&self, type_filter: u32, properties: vk::MemoryPropertyFlags) -> VulkanResult<u32> {
        find_memory_type(type_filter, properties, &self.physical_device.memory_properties)
    }

    /// Largest sampler anisotropy the device supports
    pub fn max_sampler_anisotropy(&self) -> f32 {
        self.physical_device.properties.limits.max_sampler_anisotropy
    }

    /// Block until the device has finished all submitted work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe {
            self.device.device.device_wait_idle()
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device.device_wait_idle();
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties::default();
        props.memory_type_count = flags.len() as u32;
        for (i, &flag) in flags.iter().enumerate() {
            props.memory_types[i].property_flags = flag;
        }
        props
    }

    #[test]
    fn test_find_memory_type_respects_filter_and_flags() {
        let props = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);

        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        assert_eq!(find_memory_type(0b111, host, &props).unwrap(), 2);
        assert_eq!(find_memory_type(0b111, vk::MemoryPropertyFlags::HOST_VISIBLE, &props).unwrap(), 1);
        assert_eq!(find_memory_type(0b001, vk::MemoryPropertyFlags::DEVICE_LOCAL, &props).unwrap(), 0);
    }

    #[test]
    fn test_find_memory_type_no_match() {
        let props = memory_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        let result = find_memory_type(0b1, vk::MemoryPropertyFlags::HOST_VISIBLE, &props);
        assert!(matches!(result, Err(VulkanError::NoSuitableMemoryType { type_filter: 0b1, .. })));

        // Type excluded by the filter even though its flags match
        let result = find_memory_type(0b10, vk::MemoryPropertyFlags::DEVICE_LOCAL, &props);
        assert!(result.is_err());
    }

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_queue_families_prefer_shared_family() {
        let families = [
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
        ];
        let found = QueueFamilies::find(&families, |index| Ok(index != 0)).unwrap().unwrap();
        assert_eq!(found, QueueFamilies { graphics_family: 2, present_family: 2 });
        assert!(!found.is_split());
    }

    #[test]
    fn test_queue_families_split() {
        let families = [family(vk::QueueFlags::GRAPHICS), family(vk::QueueFlags::TRANSFER)];
        let found = QueueFamilies::find(&families, |index| Ok(index == 1)).unwrap().unwrap();
        assert_eq!(found, QueueFamilies { graphics_family: 0, present_family: 1 });
        assert!(found.is_split());
    }

    #[test]
    fn test_queue_families_missing_present() {
        let families = [family(vk::QueueFlags::GRAPHICS)];
        assert_eq!(QueueFamilies::find(&families, |_| Ok(false)).unwrap(), None);

        let failed = QueueFamilies::find(&families, |_| Err(VulkanError::Api(vk::Result::ERROR_SURFACE_LOST_KHR)));
        assert!(failed.is_err());
    }

    #[test]
    fn test_severity_levels() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as Severity;
        assert_eq!(severity_level(Severity::ERROR), log::Level::Error);
        assert_eq!(severity_level(Severity::WARNING), log::Level::Warn);
        assert_eq!(severity_level(Severity::INFO), log::Level::Info);
        assert_eq!(severity_level(Severity::VERBOSE), log::Level::Debug);
    }

    #[test]
    fn test_missing_layers() {
        let requested = vec!["VK_LAYER_KHRONOS_validation".to_string()];
        let available = vec!["VK_LAYER_MESA_overlay".to_string()];
        assert_eq!(missing_layers(&requested, &available), requested);

        let available = vec!["VK_LAYER_KHRONOS_validation".to_string()];
        assert!(missing_layers(&requested, &available).is_empty());
    }

    #[test]
    fn test_layers_only_enabled_with_validation() {
        let config = DeviceConfig::new("Quad")
            .with_validation_layers(vec!["VK_LAYER_KHRONOS_validation".to_string()]);
        assert!(config.enabled_layers().is_empty());

        let config = config.with_validation(true);
        assert_eq!(config.enabled_layers().len(), 1);
    }

    #[test]
    fn test_enabled_extensions_adds_debug_utils_once() {
        let window = vec!["VK_KHR_surface".to_string(), "VK_KHR_xcb_surface".to_string()];
        let config = DeviceConfig::new("Quad")
            .with_instance_extensions(vec!["VK_KHR_surface".to_string()]);

        assert_eq!(config.enabled_extensions(&window), window);

        let config = config.with_validation(true);
        let extensions = config.enabled_extensions(&window);
        assert_eq!(extensions.len(), 3);
        assert_eq!(extensions.last().map(String::as_str), Some("VK_EXT_debug_utils"));
    }

    #[test]
    fn test_device_config_from_renderer_config() {
        let renderer = VulkanRendererConfig::new("Quad")
            .with_validation(true)
            .with_instance_extension("VK_KHR_portability_enumeration");
        let config = DeviceConfig::from_renderer_config(&renderer);

        assert!(config.validation_enabled());
        assert_eq!(config.enabled_layers(), renderer.validation_layers.as_slice());
        assert!(config.enabled_extensions(&[]).contains(&"VK_KHR_portability_enumeration".to_string()));
    }
}
