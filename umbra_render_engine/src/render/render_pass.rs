/// RenderPass trait - attachment and dependency configuration
///
/// A render pass describes how attachments are loaded, stored, and
/// transitioned while rendering, plus the ordering dependencies its
/// work has against earlier GPU work. The two passes the engine builds
/// (shadow map pass and color pass) are both expressed through this
/// one descriptor.

use bitflags::bitflags;

use crate::render::TextureFormat;

/// Render pass trait
///
/// Marker trait - backends hold the actual GPU render pass handle.
pub trait RenderPass: Send + Sync {}

/// Descriptor for creating a render pass
#[derive(Debug, Clone)]
pub struct RenderPassDesc {
    /// Color attachments, in attachment-index order
    pub color_attachments: Vec<AttachmentDesc>,
    /// Optional depth attachment, placed after the color attachments
    pub depth_attachment: Option<AttachmentDesc>,
    /// Dependencies of this pass's subpass on external work
    pub dependencies: Vec<PassDependencyDesc>,
}

/// Descriptor for a single attachment in a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDesc {
    /// Pixel format
    pub format: TextureFormat,
    /// Number of samples (1 = no MSAA)
    pub samples: u32,
    /// What to do with existing content when the pass begins
    pub load_op: LoadOp,
    /// What to do with rendered content when the pass ends
    pub store_op: StoreOp,
    /// Layout the attachment starts in
    pub initial_layout: ImageLayout,
    /// Layout the attachment is transitioned to when the pass ends
    pub final_layout: ImageLayout,
}

/// Load operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    /// Load existing content
    Load,
    /// Clear the content
    Clear,
    /// Don't care about existing content
    DontCare,
}

/// Store operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// Store the rendered content
    Store,
    /// Don't care about storing the content
    DontCare,
}

/// Image layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    /// Undefined layout (initial state)
    Undefined,
    /// Layout for color attachment
    ColorAttachment,
    /// Layout for depth/stencil attachment
    DepthStencilAttachment,
    /// Layout for shader read-only access
    ShaderReadOnly,
    /// Layout for transfer source
    TransferSrc,
    /// Layout for transfer destination
    TransferDst,
    /// Layout for presenting to swapchain
    PresentSrc,
}

bitflags! {
    /// Pipeline stages referenced by pass dependencies
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE              = 0x01;
        const VERTEX_SHADER            = 0x02;
        const EARLY_FRAGMENT_TESTS     = 0x04;
        const FRAGMENT_SHADER          = 0x08;
        const LATE_FRAGMENT_TESTS      = 0x10;
        const COLOR_ATTACHMENT_OUTPUT  = 0x20;
        const BOTTOM_OF_PIPE           = 0x40;
    }
}

bitflags! {
    /// Memory access kinds referenced by pass dependencies
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessKinds: u32 {
        const COLOR_ATTACHMENT_READ          = 0x01;
        const COLOR_ATTACHMENT_WRITE         = 0x02;
        const DEPTH_STENCIL_ATTACHMENT_READ  = 0x04;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 0x08;
        const SHADER_READ                    = 0x10;
    }
}

/// Dependency of a pass's subpass on work outside the pass
///
/// Source is the earlier work, destination is this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassDependencyDesc {
    pub src_stages: PipelineStages,
    pub src_access: AccessKinds,
    pub dst_stages: PipelineStages,
    pub dst_access: AccessKinds,
}
