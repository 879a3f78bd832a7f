/// RenderTarget and Framebuffer traits

use std::sync::Arc;

use crate::render::{RenderPass, TextureFormat};

/// A single attachable image view (swapchain image, depth buffer,
/// shadow map)
pub trait RenderTarget: Send + Sync {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn format(&self) -> TextureFormat;
}

/// Descriptor for creating a framebuffer
///
/// Attachment order must match the owning render pass: color
/// attachments first, depth attachment last.
pub struct FramebufferDesc {
    pub render_pass: Arc<dyn RenderPass>,
    pub attachments: Vec<Arc<dyn RenderTarget>>,
    pub width: u32,
    pub height: u32,
}

/// A framebuffer binding concrete targets to a render pass
pub trait Framebuffer: Send + Sync {
    fn width(&self) -> u32;

    fn height(&self) -> u32;
}
