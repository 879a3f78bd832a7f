/// Render graph - the ordered chain of passes drawn every frame
///
/// The graph owns the pass definitions (attachments and dependencies),
/// the attachment images that connect them (shadow map, depth buffer),
/// and the framebuffers bound to each swapchain image. The canonical
/// graph is two passes: a depth-only shadow map pass whose output is
/// sampled by the color pass. Internally the chain is N passes with
/// explicit forward edges, validated at construction.
///
/// GPU-side ordering between consecutive passes is enforced at
/// submission time through the frame scheduler's semaphores; the edges
/// recorded here declare which stage/access pairs that ordering
/// protects.

use std::sync::Arc;

use crate::engine_debug;
use crate::error::{Error, Result};
use crate::render::{
    AccessKinds, AttachmentDesc, Framebuffer, FramebufferDesc, GraphicsDevice, ImageLayout,
    LoadOp, PassDependencyDesc, PipelineStages, RenderPass, RenderPassDesc, RenderTarget,
    SamplerDesc, StoreOp, Swapchain, Texture, TextureDesc, TextureFormat, TextureUsage,
    DEPTH_FORMAT_CANDIDATES, SHADOW_MAP_FORMAT,
};

/// Index of the shadow map pass in the chain
pub const SHADOW_PASS: usize = 0;
/// Index of the color pass in the chain
pub const COLOR_PASS: usize = 1;

/// One pass in the chain with its per-swapchain-image framebuffers
pub struct PassNode {
    name: &'static str,
    handle: Arc<dyn RenderPass>,
    framebuffers: Vec<Arc<dyn Framebuffer>>,
}

impl PassNode {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn handle(&self) -> &Arc<dyn RenderPass> {
        &self.handle
    }

    /// Framebuffer bound to one swapchain image
    pub fn framebuffer(&self, image_index: usize) -> &Arc<dyn Framebuffer> {
        &self.framebuffers[image_index]
    }
}

/// Ordering edge between two passes of the chain
///
/// Source is the earlier pass, destination the later one. The one hard
/// constraint in the canonical graph: the color pass's fragment stage
/// must not sample the shadow map before the shadow pass's depth
/// writes complete. Draws within a single pass stay unordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyEdge {
    pub src_pass: usize,
    pub dst_pass: usize,
    pub src_stages: PipelineStages,
    pub src_access: AccessKinds,
    pub dst_stages: PipelineStages,
    pub dst_access: AccessKinds,
}

/// Validate that edges form a forward chain over `pass_count` passes
///
/// Every edge must point forward, and each consecutive pass pair must
/// be connected - the submission order relies on it.
pub fn validate_chain(pass_count: usize, edges: &[DependencyEdge]) -> Result<()> {
    for edge in edges {
        if edge.src_pass >= pass_count || edge.dst_pass >= pass_count {
            return Err(Error::InvalidResource(format!(
                "dependency edge {} -> {} references a pass outside the chain",
                edge.src_pass, edge.dst_pass
            )));
        }
        if edge.src_pass >= edge.dst_pass {
            return Err(Error::InvalidResource(format!(
                "dependency edge {} -> {} is not forward",
                edge.src_pass, edge.dst_pass
            )));
        }
    }
    for pair in 0..pass_count.saturating_sub(1) {
        let connected = edges
            .iter()
            .any(|e| e.src_pass == pair && e.dst_pass == pair + 1);
        if !connected {
            return Err(Error::InvalidResource(format!(
                "passes {} and {} have no dependency edge",
                pair,
                pair + 1
            )));
        }
    }
    Ok(())
}

/// The pass chain and its attachment resources
pub struct RenderGraph {
    passes: Vec<PassNode>,
    edges: Vec<DependencyEdge>,

    /// Depth map written by the shadow pass and sampled by the color
    /// pass (carries its own clamp-to-edge bilinear sampler)
    shadow_map: Arc<dyn Texture>,
    shadow_target: Arc<dyn RenderTarget>,

    /// Color pass depth buffer, cleared every frame and discarded.
    /// The target keeps the underlying image alive.
    depth_target: Arc<dyn RenderTarget>,

    depth_format: TextureFormat,
    color_format: TextureFormat,
    extent: (u32, u32),

    /// Swapchain generation the framebuffers were built against
    generation: u64,
}

impl RenderGraph {
    /// Build the shadow + color chain against the current swapchain
    pub fn new(device: &Arc<dyn GraphicsDevice>, swapchain: &dyn Swapchain) -> Result<Self> {
        let depth_format = device.find_depth_format(&DEPTH_FORMAT_CANDIDATES)?;
        let color_format = swapchain.format();
        let extent = (swapchain.width(), swapchain.height());

        let shadow_pass_desc = RenderPassDesc {
            color_attachments: Vec::new(),
            depth_attachment: Some(AttachmentDesc {
                format: SHADOW_MAP_FORMAT,
                samples: 1,
                load_op: LoadOp::Clear,
                // Kept for sampling in the color pass
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::DepthStencilAttachment,
            }),
            dependencies: Vec::new(),
        };

        let color_pass_desc = RenderPassDesc {
            color_attachments: vec![AttachmentDesc {
                format: color_format,
                samples: 1,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::PresentSrc,
            }],
            depth_attachment: Some(AttachmentDesc {
                format: depth_format,
                samples: 1,
                load_op: LoadOp::Clear,
                // Not used after drawing finishes
                store_op: StoreOp::DontCare,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::DepthStencilAttachment,
            }),
            dependencies: vec![PassDependencyDesc {
                src_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                src_access: AccessKinds::empty(),
                dst_stages: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
                dst_access: AccessKinds::COLOR_ATTACHMENT_READ
                    | AccessKinds::COLOR_ATTACHMENT_WRITE,
            }],
        };

        let edges = vec![DependencyEdge {
            src_pass: SHADOW_PASS,
            dst_pass: COLOR_PASS,
            src_stages: PipelineStages::LATE_FRAGMENT_TESTS,
            src_access: AccessKinds::DEPTH_STENCIL_ATTACHMENT_WRITE,
            dst_stages: PipelineStages::FRAGMENT_SHADER,
            dst_access: AccessKinds::SHADER_READ,
        }];
        validate_chain(2, &edges)?;

        let shadow_handle = device.create_render_pass(&shadow_pass_desc)?;
        let color_handle = device.create_render_pass(&color_pass_desc)?;

        let (shadow_map, shadow_target, depth_target) =
            Self::create_attachments(device, extent, depth_format)?;

        let mut graph = Self {
            passes: vec![
                PassNode {
                    name: "shadow",
                    handle: shadow_handle,
                    framebuffers: Vec::new(),
                },
                PassNode {
                    name: "color",
                    handle: color_handle,
                    framebuffers: Vec::new(),
                },
            ],
            edges,
            shadow_map,
            shadow_target,
            depth_target,
            depth_format,
            color_format,
            extent,
            generation: swapchain.generation(),
        };
        graph.create_framebuffers(device, swapchain)?;

        engine_debug!(
            "umbra::RenderGraph",
            "Pass chain built: {} passes at {}x{}, depth format {:?}",
            graph.passes.len(),
            extent.0,
            extent.1,
            depth_format
        );
        Ok(graph)
    }

    /// Recreate attachment images and framebuffers for the current
    /// swapchain extent
    ///
    /// The pass handles survive a rebuild - attachment descriptions
    /// only change if the depth format itself changes, and that is
    /// fixed at startup.
    pub fn rebuild(
        &mut self,
        device: &Arc<dyn GraphicsDevice>,
        swapchain: &dyn Swapchain,
    ) -> Result<()> {
        self.extent = (swapchain.width(), swapchain.height());
        self.color_format = swapchain.format();

        let (shadow_map, shadow_target, depth_target) =
            Self::create_attachments(device, self.extent, self.depth_format)?;
        self.shadow_map = shadow_map;
        self.shadow_target = shadow_target;
        self.depth_target = depth_target;

        self.create_framebuffers(device, swapchain)?;
        self.generation = swapchain.generation();

        engine_debug!(
            "umbra::RenderGraph",
            "Pass chain rebuilt for {}x{} (swapchain generation {})",
            self.extent.0,
            self.extent.1,
            self.generation
        );
        Ok(())
    }

    fn create_attachments(
        device: &Arc<dyn GraphicsDevice>,
        extent: (u32, u32),
        depth_format: TextureFormat,
    ) -> Result<(Arc<dyn Texture>, Arc<dyn RenderTarget>, Arc<dyn RenderTarget>)> {
        let shadow_map = device.create_texture(TextureDesc {
            width: extent.0,
            height: extent.1,
            format: SHADOW_MAP_FORMAT,
            usage: TextureUsage::SampledDepthAttachment,
            sampler: Some(SamplerDesc::linear_clamp()),
            initial_data: None,
        })?;
        let shadow_target = device.create_render_target(&shadow_map)?;

        let depth_texture = device.create_texture(TextureDesc {
            width: extent.0,
            height: extent.1,
            format: depth_format,
            usage: TextureUsage::DepthAttachment,
            sampler: None,
            initial_data: None,
        })?;
        let depth_target = device.create_render_target(&depth_texture)?;

        Ok((shadow_map, shadow_target, depth_target))
    }

    fn create_framebuffers(
        &mut self,
        device: &Arc<dyn GraphicsDevice>,
        swapchain: &dyn Swapchain,
    ) -> Result<()> {
        let image_count = swapchain.image_count();

        let mut shadow_framebuffers = Vec::with_capacity(image_count);
        for _ in 0..image_count {
            shadow_framebuffers.push(device.create_framebuffer(&FramebufferDesc {
                render_pass: self.passes[SHADOW_PASS].handle.clone(),
                attachments: vec![self.shadow_target.clone()],
                width: self.extent.0,
                height: self.extent.1,
            })?);
        }
        self.passes[SHADOW_PASS].framebuffers = shadow_framebuffers;

        let mut color_framebuffers = Vec::with_capacity(image_count);
        for image_index in 0..image_count {
            color_framebuffers.push(device.create_framebuffer(&FramebufferDesc {
                render_pass: self.passes[COLOR_PASS].handle.clone(),
                attachments: vec![
                    swapchain.color_target(image_index)?,
                    self.depth_target.clone(),
                ],
                width: self.extent.0,
                height: self.extent.1,
            })?);
        }
        self.passes[COLOR_PASS].framebuffers = color_framebuffers;

        Ok(())
    }

    /// Number of passes in the chain
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Pass accessor
    pub fn pass(&self, index: usize) -> &PassNode {
        &self.passes[index]
    }

    /// Declared ordering edges
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// The shadow map, for binding into shadow-receiving renderables
    pub fn shadow_map(&self) -> Arc<dyn Texture> {
        self.shadow_map.clone()
    }

    /// Depth format resolved at startup
    pub fn depth_format(&self) -> TextureFormat {
        self.depth_format
    }

    /// Swapchain color format the color pass renders to
    pub fn color_format(&self) -> TextureFormat {
        self.color_format
    }

    /// Extent the framebuffers are currently built for
    pub fn extent(&self) -> (u32, u32) {
        self.extent
    }

    /// Swapchain generation the framebuffers were built against
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
#[path = "render_graph_tests.rs"]
mod tests;
