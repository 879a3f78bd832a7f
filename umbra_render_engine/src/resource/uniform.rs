/// Uniform buffer - one logical buffer, many physical sub-buffers
///
/// A logical uniform buffer is materialized as `image_count * count`
/// physical host-visible buffers so that writing one frame's data never
/// races with the GPU still reading another frame's copy. Writes go to
/// the sub-buffer selected by the current frame slot; descriptor writes
/// read the sub-buffer for a given swapchain image. Because the
/// partitioning dedicates sub-buffers to frame slots, the map/copy/
/// unmap sequence needs no extra locking.

use std::sync::Arc;

use bytemuck::Pod;

use crate::error::{Error, Result};
use crate::render::{Buffer, BufferDesc, BufferUsage, GraphicsDevice, MemoryLocation};

/// A logical uniform buffer partitioned across swapchain images and
/// frame slots
pub struct UniformBuffer {
    /// Physical sub-buffers, `image_count * count` of them
    buffers: Vec<Arc<dyn Buffer>>,
    /// Size of one element in bytes
    element_size: u64,
    /// Logical elements per swapchain image
    count: usize,
}

impl UniformBuffer {
    /// Create the physical sub-buffers
    ///
    /// # Arguments
    ///
    /// * `element_size` - Byte size of the uniform payload
    /// * `count` - Logical elements (usually 1)
    /// * `image_count` - Swapchain image count the storage is sized for
    pub fn new(
        device: &Arc<dyn GraphicsDevice>,
        element_size: u64,
        count: usize,
        image_count: usize,
    ) -> Result<Arc<Self>> {
        if element_size == 0 {
            return Err(Error::InvalidResource(
                "uniform element size must be non-zero".to_string(),
            ));
        }
        if count == 0 || image_count == 0 {
            return Err(Error::InvalidResource(
                "uniform buffer needs at least one element and one image".to_string(),
            ));
        }

        let total = image_count * count;
        let mut buffers = Vec::with_capacity(total);
        for _ in 0..total {
            buffers.push(device.create_buffer(BufferDesc {
                size: element_size,
                usage: BufferUsage::Uniform,
                location: MemoryLocation::HostVisible,
                initial_data: None,
            })?);
        }

        Ok(Arc::new(Self {
            buffers,
            element_size,
            count,
        }))
    }

    /// Typed constructor sized for `T`
    pub fn for_type<T: Pod>(
        device: &Arc<dyn GraphicsDevice>,
        count: usize,
        image_count: usize,
    ) -> Result<Arc<Self>> {
        Self::new(device, std::mem::size_of::<T>() as u64, count, image_count)
    }

    /// Byte size of one element
    pub fn element_size(&self) -> u64 {
        self.element_size
    }

    /// Logical elements per swapchain image
    pub fn count(&self) -> usize {
        self.count
    }

    /// Total number of physical sub-buffers
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Physical sub-buffer index written for a frame slot
    ///
    /// Uniform storage is partitioned by frame slot, not just by
    /// swapchain image: `(buffers / frames_in_flight) * slot + index`.
    pub fn physical_index(
        &self,
        frame_slot: usize,
        logical_index: usize,
        frames_in_flight: usize,
    ) -> usize {
        (self.buffers.len() / frames_in_flight) * frame_slot + logical_index
    }

    /// Sub-buffer a binding group for `image_index` reads from
    ///
    /// `None` when the buffer was sized for fewer swapchain images than
    /// the index implies (stale across a rebuild that changed the image
    /// count).
    pub fn buffer_for_image(
        &self,
        image_index: usize,
        logical_index: usize,
    ) -> Option<&Arc<dyn Buffer>> {
        self.buffers.get(self.count * image_index + logical_index)
    }

    /// Write raw bytes into the sub-buffer for the given frame slot
    pub fn write_bytes(
        &self,
        frame_slot: usize,
        logical_index: usize,
        frames_in_flight: usize,
        data: &[u8],
    ) -> Result<()> {
        if data.len() as u64 != self.element_size {
            return Err(Error::InvalidResource(format!(
                "uniform write of {} bytes into {}-byte element",
                data.len(),
                self.element_size
            )));
        }
        let index = self.physical_index(frame_slot, logical_index, frames_in_flight);
        self.buffers[index].update(0, data)
    }

    /// Write a typed value into the sub-buffer for the given frame slot
    pub fn write<T: Pod>(
        &self,
        frame_slot: usize,
        logical_index: usize,
        frames_in_flight: usize,
        value: &T,
    ) -> Result<()> {
        self.write_bytes(
            frame_slot,
            logical_index,
            frames_in_flight,
            bytemuck::bytes_of(value),
        )
    }

    /// Read the bytes currently held by a frame slot's sub-buffer
    pub fn read_bytes(
        &self,
        frame_slot: usize,
        logical_index: usize,
        frames_in_flight: usize,
    ) -> Result<Vec<u8>> {
        let index = self.physical_index(frame_slot, logical_index, frames_in_flight);
        self.buffers[index].read(0, self.element_size as usize)
    }
}

#[cfg(test)]
#[path = "uniform_tests.rs"]
mod tests;
