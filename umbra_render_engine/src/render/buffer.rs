/// Buffer trait - GPU buffer resource

use crate::error::Result;

/// What a buffer is used for at draw time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex data
    Vertex,
    /// Index data
    Index,
    /// Uniform data read by shaders
    Uniform,
}

/// Which memory a buffer lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryLocation {
    /// GPU-local memory, populated through a staging copy
    DeviceLocal,
    /// Host-visible memory, written with a map/copy/unmap sequence
    HostVisible,
}

/// Descriptor for creating a buffer
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Draw-time usage
    pub usage: BufferUsage,
    /// Target memory
    pub location: MemoryLocation,
    /// Initial contents, uploaded through a staging buffer for
    /// device-local memory
    pub initial_data: Option<Vec<u8>>,
}

/// GPU buffer resource trait
pub trait Buffer: Send + Sync {
    /// Buffer size in bytes
    fn size(&self) -> u64;

    /// Write bytes into a host-visible buffer
    ///
    /// Maps, copies, unmaps. Fails for device-local buffers.
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Read bytes back from a host-visible buffer
    ///
    /// Fails for device-local buffers.
    fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>>;
}
