/// BindingGroup trait and binding slot descriptors
///
/// A BindingGroup is an immutable set of GPU resource bindings for one
/// swapchain image - the engine's abstraction over descriptor sets.
///
/// Key properties:
/// - Immutable after creation (no race conditions)
/// - Mutated only during renderable registration, never during
///   steady-state per-frame recording
/// - Pool managed internally by the backend, pre-sized at device
///   creation

use std::sync::Arc;

use bitflags::bitflags;

use crate::render::{Buffer, Texture};

// ============================================================================
// Binding types and layout description
// ============================================================================

/// Kind of resource bound at a given slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Uniform buffer (read-only structured data)
    UniformBuffer,
    /// Combined image sampler (texture + sampler in one binding)
    CombinedImageSampler,
}

bitflags! {
    /// Shader stage visibility flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX                  = 0x01;
        const TESSELLATION_CONTROL    = 0x02;
        const TESSELLATION_EVALUATION = 0x04;
        const GEOMETRY                = 0x08;
        const FRAGMENT                = 0x10;
    }
}

impl ShaderStageFlags {
    /// The common vertex + fragment visibility
    pub const VERTEX_FRAGMENT: Self = Self::VERTEX.union(Self::FRAGMENT);
}

/// Description of a single binding slot within a binding group layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingSlotDesc {
    /// Binding number (corresponds to `layout(binding = N)` in GLSL)
    pub binding: u32,
    /// Kind of resource at this binding
    pub kind: BindingKind,
    /// Number of descriptors at this binding (>1 for arrays)
    pub count: u32,
    /// Shader stages that access this binding
    pub stage_flags: ShaderStageFlags,
}

// ============================================================================
// Binding resources (concrete data passed at creation time)
// ============================================================================

/// A concrete resource to bind into a BindingGroup slot
#[derive(Clone)]
pub enum BindingResource {
    /// Uniform buffer binding (one physical sub-buffer)
    UniformBuffer(Arc<dyn Buffer>),
    /// Sampled texture; the sampler travels with the texture
    SampledTexture(Arc<dyn Texture>),
}

impl BindingResource {
    /// The binding kind this resource satisfies
    pub fn kind(&self) -> BindingKind {
        match self {
            BindingResource::UniformBuffer(_) => BindingKind::UniformBuffer,
            BindingResource::SampledTexture(_) => BindingKind::CombinedImageSampler,
        }
    }
}

// ============================================================================
// BindingGroup trait
// ============================================================================

/// An immutable set of GPU resource bindings.
///
/// The layout and pool are managed internally by the backend. Once
/// created, a BindingGroup cannot be modified - create a new one to
/// change resources.
pub trait BindingGroup: Send + Sync {
    /// Returns the set index this BindingGroup was created for
    fn set_index(&self) -> u32;
}
