/// RenderTarget - Vulkan implementation of the RenderTarget trait

use std::sync::Arc;

use ash::vk;
use umbra_render_engine::umbra::render::{
    RenderTarget as RendererRenderTarget, Texture, TextureFormat,
};

/// Attachable view of one image
///
/// The view is owned elsewhere (by the texture it came from, or by the
/// swapchain) - this wrapper never destroys it. The optional texture
/// handle keeps the backing image alive for texture-derived targets.
pub struct RenderTarget {
    pub(crate) view: vk::ImageView,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) format: TextureFormat,
    /// Keeps the backing image alive; `None` for swapchain targets
    #[allow(dead_code)]
    pub(crate) keep_alive: Option<Arc<dyn Texture>>,
}

impl RendererRenderTarget for RenderTarget {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}
