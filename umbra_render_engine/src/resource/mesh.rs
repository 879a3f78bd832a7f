/// Mesh - vertex and index buffers for one piece of geometry
///
/// Meshes are shared: many renderables may reference one mesh. The
/// buffers live in device-local memory and are populated through the
/// staging path at creation.

use std::sync::Arc;

use crate::engine_info;
use crate::error::{Error, Result};
use crate::render::{Buffer, BufferDesc, BufferUsage, GraphicsDevice, IndexType, MemoryLocation};
use crate::resource::Vertex;

/// Geometry resource: one vertex buffer and one index buffer
pub struct Mesh {
    vertex_buffer: Arc<dyn Buffer>,
    index_buffer: Arc<dyn Buffer>,
    index_count: u32,
}

impl Mesh {
    /// Upload vertex and index data into device-local buffers
    pub fn new(
        device: &Arc<dyn GraphicsDevice>,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<Arc<Self>> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(Error::InvalidResource(
                "mesh needs at least one vertex and one index".to_string(),
            ));
        }
        if indices.len() % 3 != 0 {
            return Err(Error::InvalidResource(format!(
                "index count {} is not a whole number of triangles",
                indices.len()
            )));
        }

        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let vertex_buffer = device.create_buffer(BufferDesc {
            size: vertex_bytes.len() as u64,
            usage: BufferUsage::Vertex,
            location: MemoryLocation::DeviceLocal,
            initial_data: Some(vertex_bytes.to_vec()),
        })?;

        let index_bytes: &[u8] = bytemuck::cast_slice(indices);
        let index_buffer = device.create_buffer(BufferDesc {
            size: index_bytes.len() as u64,
            usage: BufferUsage::Index,
            location: MemoryLocation::DeviceLocal,
            initial_data: Some(index_bytes.to_vec()),
        })?;

        engine_info!(
            "umbra::Mesh",
            "Mesh uploaded: {} vertices, {} indices",
            vertices.len(),
            indices.len()
        );

        Ok(Arc::new(Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }))
    }

    pub fn vertex_buffer(&self) -> &Arc<dyn Buffer> {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &Arc<dyn Buffer> {
        &self.index_buffer
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Index width the index buffer is encoded with
    pub fn index_type(&self) -> IndexType {
        IndexType::U32
    }
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
