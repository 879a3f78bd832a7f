/// Fence and Semaphore - Vulkan implementations of the sync traits

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ash::vk;
use umbra_render_engine::umbra::render::{Fence as RendererFence, Semaphore as RendererSemaphore};

use crate::vulkan_context::GpuContext;

static NEXT_SYNC_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_sync_id() -> u64 {
    NEXT_SYNC_ID.fetch_add(1, Ordering::Relaxed)
}

/// Vulkan fence implementation
pub struct Fence {
    pub(crate) ctx: Arc<GpuContext>,
    pub(crate) fence: vk::Fence,
    pub(crate) id: u64,
}

impl RendererFence for Fence {
    fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}

/// Vulkan semaphore implementation
pub struct Semaphore {
    pub(crate) ctx: Arc<GpuContext>,
    pub(crate) semaphore: vk::Semaphore,
    pub(crate) id: u64,
}

impl RendererSemaphore for Semaphore {
    fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}
