//! Rendering
//!
//! Backend-agnostic primitives plus the Vulkan backend.

pub mod backends;
pub mod primitives;

pub use primitives::{Vertex, QUAD_INDICES, QUAD_VERTICES};
