//! Foundation module - math types and transforms shared by the renderer

pub mod math;
