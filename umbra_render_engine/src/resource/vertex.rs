/// Vertex format shared by every mesh
///
/// Loaders hand the engine vertices in this layout; the engine only
/// uploads them as opaque bytes and describes the layout to pipeline
/// creation. Deduplicating vertices is the loader's job.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

use crate::render::{
    VertexAttributeDesc, VertexAttributeFormat, VertexBindingDesc, VertexInputRate, VertexLayout,
};

/// One mesh vertex: position, color, normal, tangent, texture coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: Vec4,
    pub color: Vec4,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub tex_coord: Vec2,
}

impl Vertex {
    /// Vertex input layout matching this struct, binding 0
    pub fn layout() -> VertexLayout {
        VertexLayout {
            bindings: vec![VertexBindingDesc {
                binding: 0,
                stride: std::mem::size_of::<Vertex>() as u32,
                input_rate: VertexInputRate::Vertex,
            }],
            attributes: vec![
                VertexAttributeDesc {
                    location: 0,
                    binding: 0,
                    format: VertexAttributeFormat::R32G32B32A32_SFLOAT,
                    offset: std::mem::offset_of!(Vertex, pos) as u32,
                },
                VertexAttributeDesc {
                    location: 1,
                    binding: 0,
                    format: VertexAttributeFormat::R32G32B32A32_SFLOAT,
                    offset: std::mem::offset_of!(Vertex, color) as u32,
                },
                VertexAttributeDesc {
                    location: 2,
                    binding: 0,
                    format: VertexAttributeFormat::R32G32B32_SFLOAT,
                    offset: std::mem::offset_of!(Vertex, normal) as u32,
                },
                VertexAttributeDesc {
                    location: 3,
                    binding: 0,
                    format: VertexAttributeFormat::R32G32B32_SFLOAT,
                    offset: std::mem::offset_of!(Vertex, tangent) as u32,
                },
                VertexAttributeDesc {
                    location: 4,
                    binding: 0,
                    format: VertexAttributeFormat::R32G32_SFLOAT,
                    offset: std::mem::offset_of!(Vertex, tex_coord) as u32,
                },
            ],
        }
    }
}

#[cfg(test)]
#[path = "vertex_tests.rs"]
mod tests;
