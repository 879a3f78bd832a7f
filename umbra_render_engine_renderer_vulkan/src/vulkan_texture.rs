/// Texture - Vulkan implementation of the Texture trait

use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use umbra_render_engine::umbra::render::{Texture as RendererTexture, TextureInfo};

use crate::vulkan_context::GpuContext;

/// Vulkan texture implementation
///
/// The sampler handle, when present, is owned by the device's sampler
/// cache and must not be destroyed here.
pub struct Texture {
    /// Shared GPU context
    pub(crate) ctx: Arc<GpuContext>,
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// Vulkan image view
    pub(crate) view: vk::ImageView,
    /// Cached sampler for combined-image-sampler bindings
    pub(crate) sampler: Option<vk::Sampler>,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    /// Read-only texture properties
    pub(crate) info: TextureInfo,
}

impl RendererTexture for Texture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}
