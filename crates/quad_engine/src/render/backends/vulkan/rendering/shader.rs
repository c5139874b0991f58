//! Shader loading and graphics pipeline creation
//!
//! SPIR-V is read once through a [`ShaderProvider`] and kept as words in a
//! [`ShaderSet`], so the pipeline can be rebuilt on every swapchain rebuild
//! without touching the filesystem again. The pipeline bakes viewport and
//! scissor from the swapchain extent; it has no dynamic state.

use ash::{vk, Device};
use std::ffi::CStr;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::ShaderConfig;
use crate::render::backends::vulkan::{VulkanResult, VulkanError};

/// Entry point shared by both stages, nul-terminated
const ENTRY_POINT: &[u8] = b"main\0";

fn entry_point() -> VulkanResult<&'static CStr> {
    CStr::from_bytes_with_nul(ENTRY_POINT).map_err(|e| VulkanError::InvalidOperation {
        reason: format!("Invalid shader entry point: {}", e),
    })
}

/// Shader loading errors
#[derive(Error, Debug)]
pub enum ShaderError {
    /// The SPIR-V file could not be read
    #[error("Failed to read shader {path:?}: {source}")]
    Io {
        /// File that was requested
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not a SPIR-V module
    #[error("Invalid SPIR-V in {name}: {reason}")]
    InvalidSpirv {
        /// Logical name of the shader
        name: String,
        /// What was wrong with it
        reason: String,
    },
}

/// Source of SPIR-V blobs by logical name
pub trait ShaderProvider {
    /// Load the SPIR-V words for `name`
    fn load_spirv(&self, name: &str) -> Result<Vec<u32>, ShaderError>;
}

/// Reads SPIR-V from files; the logical name is the path
#[derive(Debug, Default, Clone, Copy)]
pub struct FileShaderProvider;

impl ShaderProvider for FileShaderProvider {
    fn load_spirv(&self, name: &str) -> Result<Vec<u32>, ShaderError> {
        let path = Path::new(name);
        let bytes = std::fs::read(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Read {} bytes of SPIR-V from {:?}", bytes.len(), path);
        parse_spirv(name, &bytes)
    }
}

/// Decode SPIR-V bytes into words, checking size and magic number
pub fn parse_spirv(name: &str, bytes: &[u8]) -> Result<Vec<u32>, ShaderError> {
    ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|e| ShaderError::InvalidSpirv {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Vertex and fragment SPIR-V for the quad pipeline
#[derive(Debug, Clone)]
pub struct ShaderSet {
    /// Vertex stage words
    pub vertex: Vec<u32>,
    /// Fragment stage words
    pub fragment: Vec<u32>,
}

impl ShaderSet {
    /// Load both stages named by the configuration
    pub fn load<P: ShaderProvider + ?Sized>(provider: &P, config: &ShaderConfig) -> Result<Self, ShaderError> {
        Ok(Self {
            vertex: provider.load_spirv(&config.vertex_shader_path)?,
            fragment: provider.load_spirv(&config.fragment_shader_path)?,
        })
    }
}

/// SPIR-V shader module wrapper with automatic resource management
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create shader module from SPIR-V words
    pub fn from_words(device: &Device, code: &[u32]) -> VulkanResult<Self> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(code);

        let module = unsafe {
            device.create_shader_module(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device: device.clone(), module })
    }

    /// Get shader module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// Create shader stage create info
    pub fn create_stage_info(&self, stage: vk::ShaderStageFlags, entry_point: &CStr) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(entry_point)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Graphics pipeline wrapper with RAII cleanup
pub struct GraphicsPipeline {
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Build the quad pipeline for one swapchain extent
    pub fn new(
        device: &Device,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
        shaders: &ShaderSet,
        vertex_input_info: &vk::PipelineVertexInputStateCreateInfo,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
    ) -> VulkanResult<Self> {
        // Modules are only needed until the pipeline exists
        let vertex_shader = ShaderModule::from_words(device, &shaders.vertex)?;
        let fragment_shader = ShaderModule::from_words(device, &shaders.fragment)?;

        let entry = entry_point()?;
        let shader_stages = [
            vertex_shader.create_stage_info(vk::ShaderStageFlags::VERTEX, entry),
            fragment_shader.create_stage_info(vk::ShaderStageFlags::FRAGMENT, entry),
        ];

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewports = [vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }];
        let scissors = [vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        }];
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            // Projection flips Y, which flips winding
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build();
        let color_blend_attachments = [color_blend_attachment];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(descriptor_set_layouts);
        let layout = unsafe {
            device.create_pipeline_layout(&layout_info, None)
                .map_err(VulkanError::Api)?
        };

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(vertex_input_info)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_info.build()],
                None,
            )
        };

        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, err)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(VulkanError::Api(err));
            }
        };

        log::debug!("Created graphics pipeline for {}x{}", extent.width, extent.height);

        Ok(Self {
            device: device.clone(),
            pipeline,
            layout,
        })
    }

    /// Get pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get layout handle
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    struct MapProvider;

    impl ShaderProvider for MapProvider {
        fn load_spirv(&self, name: &str) -> Result<Vec<u32>, ShaderError> {
            match name {
                "vert" => Ok(vec![SPIRV_MAGIC, 1]),
                "frag" => Ok(vec![SPIRV_MAGIC, 2]),
                other => Err(ShaderError::InvalidSpirv {
                    name: other.to_string(),
                    reason: "unknown".to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_entry_point_is_main() {
        let entry = entry_point().unwrap();
        assert_eq!(entry.to_str().unwrap(), "main");
    }

    #[test]
    fn test_parse_valid_words() {
        let mut bytes = SPIRV_MAGIC.to_le_bytes().to_vec();
        bytes.extend_from_slice(&7u32.to_le_bytes());

        let words = parse_spirv("test", &bytes).unwrap();
        assert_eq!(words, vec![SPIRV_MAGIC, 7]);
    }

    #[test]
    fn test_parse_rejects_truncated_and_wrong_magic() {
        assert!(matches!(parse_spirv("short", &[1, 2, 3]), Err(ShaderError::InvalidSpirv { .. })));
        assert!(matches!(
            parse_spirv("magic", &0xdead_beefu32.to_le_bytes()),
            Err(ShaderError::InvalidSpirv { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = FileShaderProvider.load_spirv("definitely/not/here.spv");
        assert!(matches!(result, Err(ShaderError::Io { .. })));
    }

    #[test]
    fn test_file_provider_reads_words() {
        let path = std::env::temp_dir().join("quad_engine_shader_test.spv");
        std::fs::write(&path, SPIRV_MAGIC.to_le_bytes()).unwrap();

        let words = FileShaderProvider.load_spirv(path.to_str().unwrap()).unwrap();
        assert_eq!(words, vec![SPIRV_MAGIC]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_shader_set_loads_both_stages() {
        let config = ShaderConfig::new("vert", "frag");
        let set = ShaderSet::load(&MapProvider, &config).unwrap();
        assert_eq!(set.vertex[1], 1);
        assert_eq!(set.fragment[1], 2);

        let config = ShaderConfig::new("vert", "missing");
        assert!(ShaderSet::load(&MapProvider, &config).is_err());
    }
}
