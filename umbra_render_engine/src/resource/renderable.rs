/// Renderable - one drawable object and its resource bindings
///
/// A renderable bundles a shared mesh, a shader stage set, and a table
/// of declared binding slots (uniform buffers, combined image
/// samplers). The slot table is a fixed array indexed by binding
/// number, each entry a tagged union of the slot kinds, so kind
/// mismatches fail at bind time and nothing is left to check at draw
/// time. A renderable joins the draw list only after `finalize`
/// succeeds, which requires every declared slot to be filled.

use std::sync::Arc;

use crate::engine_error;
use crate::error::{Error, Result};
use crate::render::{
    BindingGroup, BindingKind, BindingResource, BindingSlotDesc, GraphicsDevice, Pipeline,
    ShaderSet, ShaderStageFlags, Texture,
};
use crate::resource::{Mesh, UniformBuffer};

/// Resource bound into a declared slot
enum SlotResource {
    Empty,
    Uniform(Arc<UniformBuffer>),
    Texture(Arc<dyn Texture>),
}

impl SlotResource {
    fn is_filled(&self) -> bool {
        !matches!(self, SlotResource::Empty)
    }
}

/// One declared binding slot
struct BindingSlot {
    kind: BindingKind,
    stages: ShaderStageFlags,
    count: u32,
    resource: SlotResource,
}

/// One drawable object: mesh + shader set + binding slots
pub struct Renderable {
    mesh: Option<Arc<Mesh>>,
    shaders: Option<ShaderSet>,

    /// Slot table indexed by binding number; `None` = undeclared
    slots: Vec<Option<BindingSlot>>,

    /// Pipeline created at instantiation (and on swapchain rebuild)
    pipeline: Option<Arc<dyn Pipeline>>,

    /// One binding group per swapchain image, written at finalize
    binding_groups: Vec<Arc<dyn BindingGroup>>,
}

impl Renderable {
    pub fn new() -> Self {
        Self {
            mesh: None,
            shaders: None,
            slots: Vec::new(),
            pipeline: None,
            binding_groups: Vec::new(),
        }
    }

    /// Attach the shared mesh
    pub fn set_mesh(&mut self, mesh: Arc<Mesh>) {
        self.mesh = Some(mesh);
    }

    /// Attach the shader stage set
    pub fn set_shaders(&mut self, shaders: ShaderSet) {
        self.shaders = Some(shaders);
    }

    /// Register one expected binding slot
    ///
    /// # Arguments
    ///
    /// * `kind` - Resource kind the slot accepts
    /// * `stages` - Shader stages that read the slot
    /// * `binding` - Binding number (`layout(binding = N)`)
    /// * `count` - Descriptor arity (>1 for arrays)
    pub fn declare_binding(
        &mut self,
        kind: BindingKind,
        stages: ShaderStageFlags,
        binding: u32,
        count: u32,
    ) -> Result<()> {
        let index = binding as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        if self.slots[index].is_some() {
            return Err(Error::BindingContract(format!(
                "binding slot {} declared twice",
                binding
            )));
        }
        self.slots[index] = Some(BindingSlot {
            kind,
            stages,
            count,
            resource: SlotResource::Empty,
        });
        Ok(())
    }

    fn slot_mut(&mut self, binding: u32, kind: BindingKind) -> Result<&mut BindingSlot> {
        let slot = self
            .slots
            .get_mut(binding as usize)
            .and_then(|s| s.as_mut())
            .ok_or_else(|| {
                Error::BindingContract(format!("binding slot {} was never declared", binding))
            })?;
        if slot.kind != kind {
            return Err(Error::BindingContract(format!(
                "binding slot {} declared as {:?}, resource is {:?}",
                binding, slot.kind, kind
            )));
        }
        Ok(slot)
    }

    /// Fill a declared uniform-buffer slot
    pub fn bind_uniform_buffer(&mut self, ubo: Arc<UniformBuffer>, binding: u32) -> Result<()> {
        let slot = self.slot_mut(binding, BindingKind::UniformBuffer)?;
        slot.resource = SlotResource::Uniform(ubo);
        Ok(())
    }

    /// Fill a declared combined-image-sampler slot
    pub fn bind_texture(&mut self, texture: Arc<dyn Texture>, binding: u32) -> Result<()> {
        let slot = self.slot_mut(binding, BindingKind::CombinedImageSampler)?;
        slot.resource = SlotResource::Texture(texture);
        Ok(())
    }

    /// Number of declared slots
    pub fn declared_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Number of declared slots with a resource bound
    pub fn filled_count(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.resource.is_filled())
            .count()
    }

    /// Whether every declared slot has a matching resource
    pub fn is_complete(&self) -> bool {
        self.slots
            .iter()
            .flatten()
            .all(|s| s.resource.is_filled())
    }

    /// Declared slots in binding order, for pipeline layout creation
    pub fn layout_entries(&self) -> Vec<BindingSlotDesc> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(binding, slot)| {
                slot.as_ref().map(|s| BindingSlotDesc {
                    binding: binding as u32,
                    kind: s.kind,
                    count: s.count,
                    stage_flags: s.stages,
                })
            })
            .collect()
    }

    /// Allocate and write one binding group per swapchain image
    ///
    /// Only valid once the filled-slot count equals the declared-slot
    /// count and mesh + shaders are attached. Each image's group reads
    /// the uniform sub-buffer dedicated to that image.
    pub fn finalize(
        &mut self,
        device: &Arc<dyn GraphicsDevice>,
        image_count: usize,
    ) -> Result<()> {
        if !self.is_complete() {
            let err = Error::BindingContract(format!(
                "finalize with {} of {} binding slots filled",
                self.filled_count(),
                self.declared_count()
            ));
            engine_error!("umbra::Renderable", "{}", err);
            return Err(err);
        }
        if self.mesh.is_none() {
            return Err(Error::BindingContract(
                "finalize without a mesh attached".to_string(),
            ));
        }
        if self.shaders.is_none() {
            return Err(Error::BindingContract(
                "finalize without shaders attached".to_string(),
            ));
        }

        let layout = self.layout_entries();
        let mut groups = Vec::with_capacity(image_count);
        for image_index in 0..image_count {
            let mut resources = Vec::with_capacity(layout.len());
            for slot in self.slots.iter().flatten() {
                match &slot.resource {
                    SlotResource::Uniform(ubo) => {
                        let buffer = ubo.buffer_for_image(image_index, 0).ok_or_else(|| {
                            Error::BindingContract(format!(
                                "uniform buffer sized for {} sub-buffers has none for image {}",
                                ubo.buffer_count(),
                                image_index
                            ))
                        })?;
                        resources.push(BindingResource::UniformBuffer(buffer.clone()));
                    }
                    SlotResource::Texture(texture) => {
                        resources.push(BindingResource::SampledTexture(texture.clone()));
                    }
                    SlotResource::Empty => unreachable!("checked by is_complete"),
                }
            }
            groups.push(device.create_binding_group(&layout, &resources)?);
        }
        self.binding_groups = groups;
        Ok(())
    }

    /// Recreate the per-image binding groups after a swapchain rebuild
    pub fn refresh_binding_groups(
        &mut self,
        device: &Arc<dyn GraphicsDevice>,
        image_count: usize,
    ) -> Result<()> {
        self.binding_groups.clear();
        self.finalize(device, image_count)
    }

    /// Whether the renderable is eligible for draw submission
    pub fn is_drawable(&self) -> bool {
        !self.binding_groups.is_empty() && self.pipeline.is_some()
    }

    /// Attach the pipeline created for this renderable
    pub fn set_pipeline(&mut self, pipeline: Arc<dyn Pipeline>) {
        self.pipeline = Some(pipeline);
    }

    pub fn pipeline(&self) -> Option<&Arc<dyn Pipeline>> {
        self.pipeline.as_ref()
    }

    /// Binding group for one swapchain image
    pub fn binding_group(&self, image_index: usize) -> &Arc<dyn BindingGroup> {
        &self.binding_groups[image_index]
    }

    pub fn mesh(&self) -> Option<&Arc<Mesh>> {
        self.mesh.as_ref()
    }

    pub fn shaders(&self) -> Option<&ShaderSet> {
        self.shaders.as_ref()
    }
}

impl Default for Renderable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "renderable_tests.rs"]
mod tests;
