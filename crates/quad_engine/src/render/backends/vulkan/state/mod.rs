// Vulkan state management

pub mod framebuffer;
pub mod images_in_flight;
pub mod resize_monitor;
pub mod swapchain;
pub mod sync;
pub mod swapchain_manager;
pub mod sync_manager;

pub use framebuffer::*;
pub use images_in_flight::*;
pub use resize_monitor::*;
pub use swapchain::*;
pub use sync::*;
pub use swapchain_manager::*;
pub use sync_manager::*;
