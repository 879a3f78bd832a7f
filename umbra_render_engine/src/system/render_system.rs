/// Render system - the facade wiring device, swapchain, frame ring,
/// pass chain and renderables into `draw_frame`
///
/// One render system drives one swapchain. A single CPU thread calls
/// `draw_frame`; all rendering work runs on the device's own execution
/// units through asynchronous submissions. Per frame the CPU may block
/// in exactly two places: on the reused frame slot's fence and inside
/// swapchain image acquisition.

use std::sync::Arc;

use bytemuck::Pod;
use glam::Mat4;
use slotmap::{new_key_type, SlotMap};

use crate::engine_info;
use crate::error::{Error, Result};
use crate::frame::{FrameScheduler, DEFAULT_FRAMES_IN_FLIGHT};
use crate::render::{
    BindingGroup, BindingKind, BindingResource, BindingSlotDesc, CommandList, CullMode,
    FrontFace, GraphicsDevice, Pipeline, PipelineDesc, PrimitiveTopology, SamplerDesc, Shader,
    ShaderDesc, ShaderSet, ShaderStage, ShaderStageFlags, Swapchain, Texture, TextureDesc,
    TextureFormat, TextureUsage,
};
use crate::render_graph::{RenderGraph, COLOR_PASS, SHADOW_PASS};
use crate::resource::{Mesh, Renderable, UniformBuffer, Vertex};
use crate::system::recorder;

new_key_type! {
    /// Handle to a renderable registered with the render system
    pub struct RenderableKey;
}

/// Render system configuration
#[derive(Debug, Clone)]
pub struct RenderSystemConfig {
    /// Frame ring depth (2 = double buffering)
    pub frames_in_flight: usize,
    /// Initial background clear color
    pub clear_color: [f32; 4],
}

impl Default for RenderSystemConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Primary type responsible for rendering operations
///
/// Field order matters for teardown: recorded commands, renderables
/// and sync objects release their device resources before the device
/// handle itself drops.
pub struct RenderSystem {
    scheduler: FrameScheduler,
    graph: RenderGraph,

    renderables: SlotMap<RenderableKey, Renderable>,
    draw_order: Vec<RenderableKey>,

    /// Vertex-only shader the shadow pass runs with
    shadow_shader: Arc<dyn Shader>,
    /// Pipeline shared by every renderable in the shadow pass
    shadow_pipeline: Arc<dyn Pipeline>,
    /// Light view-projection for the shadow-casting light source
    shadow_caster_ubo: Arc<UniformBuffer>,
    /// Per-image binding groups feeding the shadow pipeline
    shadow_binding_groups: Vec<Arc<dyn BindingGroup>>,

    /// Recorded command lists, one per swapchain image and pass
    shadow_commands: Vec<Box<dyn CommandList>>,
    color_commands: Vec<Box<dyn CommandList>>,

    clear_color: [f32; 4],
    /// Latest window framebuffer size, used on rebuild
    window_size: (u32, u32),
    resize_pending: bool,

    swapchain: Box<dyn Swapchain>,
    device: Arc<dyn GraphicsDevice>,
}

impl RenderSystem {
    /// Wire up the render system against an existing device and
    /// swapchain
    ///
    /// # Arguments
    ///
    /// * `device` - The process's graphics device
    /// * `swapchain` - Presentable image chain created by the backend
    /// * `shadow_vertex_spv` - Precompiled bytecode of the shadow
    ///   pass's vertex shader
    /// * `config` - Ring depth and initial clear color
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        swapchain: Box<dyn Swapchain>,
        shadow_vertex_spv: &[u8],
        config: RenderSystemConfig,
    ) -> Result<Self> {
        let graph = RenderGraph::new(&device, swapchain.as_ref())?;
        let scheduler =
            FrameScheduler::new(device.clone(), config.frames_in_flight, graph.pass_count())?;

        let shadow_shader = device.create_shader(ShaderDesc::new(
            shadow_vertex_spv.to_vec(),
            ShaderStage::Vertex,
        ))?;

        let image_count = swapchain.image_count();
        let shadow_caster_ubo = UniformBuffer::for_type::<Mat4>(&device, 1, image_count)?;
        let shadow_binding_groups =
            Self::create_shadow_groups(&device, &shadow_caster_ubo, image_count)?;
        let shadow_pipeline =
            Self::create_shadow_pipeline(&device, &graph, &shadow_shader)?;

        let window_size = (swapchain.width(), swapchain.height());

        let mut system = Self {
            device,
            swapchain,
            scheduler,
            graph,
            renderables: SlotMap::with_key(),
            draw_order: Vec::new(),
            shadow_shader,
            shadow_pipeline,
            shadow_caster_ubo,
            shadow_binding_groups,
            shadow_commands: Vec::new(),
            color_commands: Vec::new(),
            clear_color: config.clear_color,
            window_size,
            resize_pending: false,
        };
        system.rerecord()?;

        engine_info!(
            "umbra::RenderSystem",
            "Render system ready: {} swapchain images, {} frames in flight",
            system.swapchain.image_count(),
            system.scheduler.frames_in_flight()
        );
        Ok(system)
    }

    /// Binding layout of the shadow pipeline: one uniform buffer with
    /// the light's view-projection, read by the vertex stage
    fn shadow_layout() -> Vec<BindingSlotDesc> {
        vec![BindingSlotDesc {
            binding: 0,
            kind: BindingKind::UniformBuffer,
            count: 1,
            stage_flags: ShaderStageFlags::VERTEX,
        }]
    }

    fn create_shadow_groups(
        device: &Arc<dyn GraphicsDevice>,
        ubo: &Arc<UniformBuffer>,
        image_count: usize,
    ) -> Result<Vec<Arc<dyn BindingGroup>>> {
        let layout = Self::shadow_layout();
        let mut groups = Vec::with_capacity(image_count);
        for image_index in 0..image_count {
            let buffer = ubo.buffer_for_image(image_index, 0).ok_or_else(|| {
                Error::InvalidResource(format!(
                    "shadow caster buffer has no sub-buffer for image {}",
                    image_index
                ))
            })?;
            groups.push(device.create_binding_group(
                &layout,
                &[BindingResource::UniformBuffer(buffer.clone())],
            )?);
        }
        Ok(groups)
    }

    fn create_shadow_pipeline(
        device: &Arc<dyn GraphicsDevice>,
        graph: &RenderGraph,
        shadow_shader: &Arc<dyn Shader>,
    ) -> Result<Arc<dyn Pipeline>> {
        device.create_pipeline(&PipelineDesc {
            shaders: ShaderSet::vertex_only(shadow_shader.clone()),
            vertex_layout: Vertex::layout(),
            render_pass: graph.pass(SHADOW_PASS).handle().clone(),
            binding_layout: Self::shadow_layout(),
            extent: graph.extent(),
            topology: PrimitiveTopology::TriangleList,
            cull_mode: CullMode::Back,
            front_face: FrontFace::Clockwise,
            depth_test: true,
            depth_write: true,
            color_attachment_count: 0,
            patch_control_points: 3,
        })
    }

    // ------------------------------------------------------------------
    // Resource creation
    // ------------------------------------------------------------------

    /// Upload a mesh from loader-supplied vertices and triangle indices
    pub fn create_mesh(&self, vertices: &[Vertex], indices: &[u32]) -> Result<Arc<Mesh>> {
        Mesh::new(&self.device, vertices, indices)
    }

    /// Upload a texture from raw decoded pixels (RGBA, 8 bits per
    /// channel)
    pub fn create_texture(&self, pixels: &[u8], width: u32, height: u32) -> Result<Arc<dyn Texture>> {
        if pixels.len() as u64 != width as u64 * height as u64 * 4 {
            return Err(Error::InvalidResource(format!(
                "texture data is {} bytes, {}x{} RGBA needs {}",
                pixels.len(),
                width,
                height,
                width as u64 * height as u64 * 4
            )));
        }
        self.device.create_texture(TextureDesc {
            width,
            height,
            format: TextureFormat::R8G8B8A8_SRGB,
            usage: TextureUsage::Sampled,
            sampler: Some(SamplerDesc::linear_repeat()),
            initial_data: Some(pixels.to_vec()),
        })
    }

    /// Wrap precompiled shader bytecode into a shader module
    pub fn create_shader(&self, code: Vec<u8>, stage: ShaderStage) -> Result<Arc<dyn Shader>> {
        self.device.create_shader(ShaderDesc::new(code, stage))
    }

    /// Create a uniform buffer sized for `T`, with storage partitioned
    /// across swapchain images
    pub fn create_uniform_buffer<T: Pod>(&self, count: usize) -> Result<Arc<UniformBuffer>> {
        UniformBuffer::for_type::<T>(&self.device, count, self.swapchain.image_count())
    }

    /// Write a uniform value into the physical sub-buffer owned by the
    /// frame slot being prepared
    pub fn update_uniform_buffer<T: Pod>(
        &self,
        ubo: &UniformBuffer,
        value: &T,
        logical_index: usize,
    ) -> Result<()> {
        ubo.write(
            self.scheduler.current_slot(),
            logical_index,
            self.scheduler.frames_in_flight(),
            value,
        )
    }

    /// A fresh renderable to configure and instantiate
    pub fn create_renderable(&self) -> Renderable {
        Renderable::new()
    }

    /// Finalize a configured renderable and add it to the draw list
    ///
    /// Creates the per-image binding groups and the renderable's color
    /// pass pipeline, then re-records every command list to include the
    /// new draw calls.
    pub fn instantiate_renderable(&mut self, mut renderable: Renderable) -> Result<RenderableKey> {
        let image_count = self.swapchain.image_count();
        renderable.finalize(&self.device, image_count)?;

        let shaders = renderable
            .shaders()
            .cloned()
            .ok_or_else(|| Error::BindingContract("renderable has no shaders".to_string()))?;
        let pipeline = self.device.create_pipeline(&PipelineDesc::opaque(
            shaders,
            Vertex::layout(),
            self.graph.pass(COLOR_PASS).handle().clone(),
            renderable.layout_entries(),
            self.graph.extent(),
        ))?;
        renderable.set_pipeline(pipeline);

        let key = self.renderables.insert(renderable);
        self.draw_order.push(key);
        self.rerecord()?;
        Ok(key)
    }

    /// Remove a renderable from the draw list
    pub fn remove_renderable(&mut self, key: RenderableKey) -> Result<()> {
        if self.renderables.remove(key).is_none() {
            return Err(Error::InvalidResource(
                "renderable was never instantiated or already removed".to_string(),
            ));
        }
        self.draw_order.retain(|k| *k != key);
        self.device.wait_idle()?;
        self.rerecord()
    }

    // ------------------------------------------------------------------
    // Frame state
    // ------------------------------------------------------------------

    /// Set the background clear color
    ///
    /// The clear value is baked into the recorded command lists, so
    /// this waits for the device to go idle and re-records everything.
    pub fn set_clear_color(&mut self, color: [f32; 4]) -> Result<()> {
        self.device.wait_idle()?;
        self.clear_color = color;
        self.rerecord()
    }

    /// Set the view-projection of the shadow-casting light source
    ///
    /// One light is supported; its matrix feeds the shadow pass's
    /// vertex stage for the frame slot being prepared.
    pub fn set_light_matrix(&self, matrix: &Mat4) -> Result<()> {
        self.shadow_caster_ubo.write(
            self.scheduler.current_slot(),
            0,
            self.scheduler.frames_in_flight(),
            matrix,
        )
    }

    /// The shadow map, for binding into shadow-receiving renderables
    pub fn shadow_map(&self) -> Arc<dyn Texture> {
        self.graph.shadow_map()
    }

    /// Note a window resize; the swapchain is rebuilt at the start of
    /// the next frame
    pub fn handle_resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.window_size = (width, height);
            self.resize_pending = true;
        }
    }

    // ------------------------------------------------------------------
    // Per-frame driving
    // ------------------------------------------------------------------

    /// Draw one frame
    ///
    /// Waits for the reused frame slot, acquires an image, submits the
    /// shadow pass then the color pass (chained through semaphores),
    /// and queues presentation. A stale surface at acquire or present
    /// triggers the rebuild protocol and the frame is skipped - never
    /// surfaced to the caller as a failure. The frame ring advances
    /// once per call regardless of abandonment.
    pub fn draw_frame(&mut self) -> Result<()> {
        if self.resize_pending {
            self.resize_pending = false;
            self.rebuild_swapchain()?;
        }

        let image_index = match self.scheduler.begin_frame(self.swapchain.as_mut()) {
            Ok(index) => index,
            Err(Error::SurfaceOutdated) => {
                self.rebuild_swapchain()?;
                self.scheduler.end_frame();
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let image = image_index as usize;

        self.scheduler
            .submit_pass(SHADOW_PASS, self.shadow_commands[image].as_ref())?;
        self.scheduler
            .submit_pass(COLOR_PASS, self.color_commands[image].as_ref())?;

        match self.scheduler.present(self.swapchain.as_mut(), image_index) {
            Ok(()) => {}
            Err(Error::SurfaceOutdated) => {
                // Rendering work already submitted is unaffected; only
                // this frame's presentation is discarded.
                self.rebuild_swapchain()?;
            }
            Err(e) => {
                self.scheduler.end_frame();
                return Err(e);
            }
        }

        self.scheduler.end_frame();
        Ok(())
    }

    /// Tear down and recreate everything tied to the swapchain
    /// generation: image views, pass framebuffers, pipelines, binding
    /// groups and recorded command lists
    fn rebuild_swapchain(&mut self) -> Result<()> {
        self.device.wait_idle()?;

        let (width, height) = self.window_size;
        self.swapchain.recreate(width, height)?;
        self.graph.rebuild(&self.device, self.swapchain.as_ref())?;

        let image_count = self.swapchain.image_count();
        if self.shadow_caster_ubo.buffer_count() != image_count {
            self.shadow_caster_ubo =
                UniformBuffer::for_type::<Mat4>(&self.device, 1, image_count)?;
        }
        self.shadow_binding_groups =
            Self::create_shadow_groups(&self.device, &self.shadow_caster_ubo, image_count)?;
        self.shadow_pipeline =
            Self::create_shadow_pipeline(&self.device, &self.graph, &self.shadow_shader)?;

        let keys: Vec<RenderableKey> = self.draw_order.clone();
        for key in keys {
            let Some(renderable) = self.renderables.get_mut(key) else {
                continue;
            };
            let shaders = renderable
                .shaders()
                .cloned()
                .ok_or_else(|| Error::BindingContract("renderable has no shaders".to_string()))?;
            let pipeline = self.device.create_pipeline(&PipelineDesc::opaque(
                shaders,
                Vertex::layout(),
                self.graph.pass(COLOR_PASS).handle().clone(),
                renderable.layout_entries(),
                self.graph.extent(),
            ))?;
            renderable.set_pipeline(pipeline);
            renderable.refresh_binding_groups(&self.device, image_count)?;
        }

        self.rerecord()
    }

    /// Re-record every command list from the current render state
    fn rerecord(&mut self) -> Result<()> {
        let renderables: Vec<&Renderable> = self
            .draw_order
            .iter()
            .filter_map(|key| self.renderables.get(*key))
            .collect();
        let (shadow, color) = recorder::record_all(
            &self.device,
            &self.graph,
            &self.shadow_pipeline,
            &self.shadow_binding_groups,
            &renderables,
            self.clear_color,
            self.swapchain.image_count(),
        )?;
        self.shadow_commands = shadow;
        self.color_commands = color;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn swapchain(&self) -> &dyn Swapchain {
        self.swapchain.as_ref()
    }

    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn renderable(&self, key: RenderableKey) -> Option<&Renderable> {
        self.renderables.get(key)
    }

    pub fn renderable_count(&self) -> usize {
        self.renderables.len()
    }

    /// Wait for all GPU work to finish, for orderly teardown
    pub fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }
}

#[cfg(test)]
#[path = "render_system_tests.rs"]
mod tests;
