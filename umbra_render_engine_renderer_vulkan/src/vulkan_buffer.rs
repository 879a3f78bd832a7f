/// Buffer - Vulkan implementation of the Buffer trait

use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use umbra_render_engine::umbra::render::Buffer as RendererBuffer;
use umbra_render_engine::umbra::{Error, Result};
use umbra_render_engine::engine_error;

use crate::vulkan_context::GpuContext;

/// Vulkan buffer implementation
///
/// Host-visible buffers stay persistently mapped through the
/// allocator; device-local buffers are populated once through a
/// staging copy at creation and reject map access afterwards.
pub struct Buffer {
    /// Shared GPU context (device, allocator, queue, command pool)
    pub(crate) ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    /// Buffer size
    pub(crate) size: u64,
}

impl Buffer {
    fn mapped_ptr(&self) -> Result<*mut u8> {
        let allocation = self.allocation.as_ref().ok_or_else(|| {
            Error::BackendError("buffer has no allocation".to_string())
        })?;
        allocation
            .mapped_ptr()
            .map(|p| p.as_ptr() as *mut u8)
            .ok_or_else(|| Error::InvalidResource("buffer is not CPU-accessible".to_string()))
    }
}

impl RendererBuffer for Buffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.size {
            engine_error!(
                "umbra::vulkan",
                "Buffer update of {} bytes at offset {} exceeds size {}",
                data.len(),
                offset,
                self.size
            );
            return Err(Error::InvalidResource("buffer update out of range".to_string()));
        }

        let mapped = self.mapped_ptr()?;
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                mapped.offset(offset as isize),
                data.len(),
            );
        }
        Ok(())
    }

    fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        if offset + len as u64 > self.size {
            return Err(Error::InvalidResource("buffer read out of range".to_string()));
        }

        let mapped = self.mapped_ptr()?;
        let mut out = vec![0u8; len];
        unsafe {
            std::ptr::copy_nonoverlapping(
                mapped.offset(offset as isize),
                out.as_mut_ptr(),
                len,
            );
        }
        Ok(out)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if the lock fails - the buffer must still go
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
