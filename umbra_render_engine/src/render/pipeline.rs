/// Pipeline trait and pipeline descriptors

use std::sync::Arc;

use crate::render::{BindingSlotDesc, RenderPass, ShaderSet, TextureFormat};

/// Graphics pipeline trait
///
/// Marker trait - backends hold the pipeline and its layout.
pub trait Pipeline: Send + Sync {}

/// Geometry primitives assembled from the vertex stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
    /// Patches fed to the tessellation stages
    PatchList,
}

/// Triangle facing used for culling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

/// Which triangle faces are discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Back,
    Front,
}

/// Per-vertex or per-instance attribute stepping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInputRate {
    Vertex,
    Instance,
}

/// Format of a single vertex attribute
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexAttributeFormat {
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
}

/// One vertex buffer binding
#[derive(Debug, Clone, Copy)]
pub struct VertexBindingDesc {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// One attribute within a vertex buffer binding
#[derive(Debug, Clone, Copy)]
pub struct VertexAttributeDesc {
    pub location: u32,
    pub binding: u32,
    pub format: VertexAttributeFormat,
    pub offset: u32,
}

/// Complete vertex input layout for a pipeline
#[derive(Debug, Clone)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBindingDesc>,
    pub attributes: Vec<VertexAttributeDesc>,
}

/// Descriptor for creating a graphics pipeline
///
/// Viewport and scissor are baked from `extent`, so pipelines are
/// recreated whenever the swapchain is rebuilt.
pub struct PipelineDesc {
    /// Shader stages (vertex mandatory, up to five stages total)
    pub shaders: ShaderSet,
    /// Vertex input layout
    pub vertex_layout: VertexLayout,
    /// Render pass the pipeline renders within
    pub render_pass: Arc<dyn RenderPass>,
    /// Binding slots the pipeline layout exposes at set 0
    pub binding_layout: Vec<BindingSlotDesc>,
    /// Fixed viewport/scissor extent (width, height)
    pub extent: (u32, u32),
    pub topology: PrimitiveTopology,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    /// Number of color attachments in the pass (0 for the depth-only
    /// shadow pipeline)
    pub color_attachment_count: u32,
    /// Control points per patch when tessellation stages are present
    pub patch_control_points: u32,
}

impl PipelineDesc {
    /// Standard opaque-geometry configuration for a pass with one
    /// color attachment
    pub fn opaque(
        shaders: ShaderSet,
        vertex_layout: VertexLayout,
        render_pass: Arc<dyn RenderPass>,
        binding_layout: Vec<BindingSlotDesc>,
        extent: (u32, u32),
    ) -> Self {
        let topology = if shaders.has_tessellation() {
            PrimitiveTopology::PatchList
        } else {
            PrimitiveTopology::TriangleList
        };
        Self {
            shaders,
            vertex_layout,
            render_pass,
            binding_layout,
            extent,
            topology,
            cull_mode: CullMode::Back,
            front_face: FrontFace::Clockwise,
            depth_test: true,
            depth_write: true,
            color_attachment_count: 1,
            patch_control_points: 3,
        }
    }
}

/// Depth format preference order for the color pass depth buffer,
/// resolved against device support at startup
pub const DEPTH_FORMAT_CANDIDATES: [TextureFormat; 3] = [
    TextureFormat::D32_SFLOAT,
    TextureFormat::D32_SFLOAT_S8_UINT,
    TextureFormat::D24_UNORM_S8_UINT,
];

/// Format the shadow map is always created with
pub const SHADOW_MAP_FORMAT: TextureFormat = TextureFormat::D32_SFLOAT;
