/// GraphicsDevice trait - main device factory and submission interface

use std::sync::Arc;

use crate::error::Result;
use crate::render::{
    BindingGroup, BindingResource, BindingSlotDesc, Buffer, BufferDesc, CommandList, Fence,
    Framebuffer, FramebufferDesc, Pipeline, PipelineDesc, RenderPass, RenderPassDesc,
    RenderTarget, Semaphore, Shader, ShaderDesc, Texture, TextureDesc, TextureFormat,
};

/// Static sizing of the backend descriptor pool
///
/// The pool is pre-sized at device creation and never grows;
/// exhausting it is a fatal `OutOfMemory`.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorPoolLimits {
    /// Maximum number of binding groups
    pub max_sets: u32,
    /// Maximum number of uniform-buffer descriptors
    pub max_uniform_buffers: u32,
    /// Maximum number of combined image-sampler descriptors
    pub max_image_samplers: u32,
}

impl Default for DescriptorPoolLimits {
    fn default() -> Self {
        Self {
            max_sets: 40,
            max_uniform_buffers: 40,
            max_image_samplers: 40,
        }
    }
}

/// Device configuration
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Static descriptor pool sizing
    pub pool_limits: DescriptorPoolLimits,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Umbra Application".to_string(),
            app_version: (1, 0, 0),
            pool_limits: DescriptorPoolLimits::default(),
        }
    }
}

/// Main graphics device trait
///
/// The central factory interface for GPU resources plus the
/// queue-facing operations the frame scheduler drives every frame.
/// Implemented by backend devices (e.g. VulkanDevice) and by the mock
/// device used in tests.
///
/// Factory calls and binding-group creation are setup-time operations;
/// only `wait_for_fence`, `reset_fence`, `submit` and `wait_idle` run
/// during steady-state frames.
pub trait GraphicsDevice: Send + Sync {
    // ------------------------------------------------------------------
    // Resource factories
    // ------------------------------------------------------------------

    /// Create a buffer, staging the initial data for device-local memory
    fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a texture, staging and layout-transitioning initial pixels
    fn create_texture(&self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Wrap precompiled shader bytecode into a shader module
    fn create_shader(&self, desc: ShaderDesc) -> Result<Arc<dyn Shader>>;

    /// Create a render pass from its attachment and dependency layout
    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    /// Create an attachable view of a texture (depth buffer, shadow map)
    fn create_render_target(&self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn RenderTarget>>;

    /// Create a framebuffer binding targets to a render pass
    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>>;

    /// Create a graphics pipeline
    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Create a command list ready for recording
    fn create_command_list(&self) -> Result<Box<dyn CommandList>>;

    /// Create a CPU-waitable fence, optionally already signaled
    fn create_fence(&self, signaled: bool) -> Result<Arc<dyn Fence>>;

    /// Create a GPU-to-GPU ordering semaphore
    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>>;

    /// Allocate one binding group from the internal descriptor pool and
    /// write every declared slot
    ///
    /// The pool is statically sized at device creation; exhaustion is a
    /// fatal `OutOfMemory`.
    fn create_binding_group(
        &self,
        layout: &[BindingSlotDesc],
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>>;

    /// Pick the first of `candidates` usable as a depth attachment
    fn find_depth_format(&self, candidates: &[TextureFormat]) -> Result<TextureFormat>;

    // ------------------------------------------------------------------
    // Submission and synchronization
    // ------------------------------------------------------------------

    /// Block until the fence is signaled
    fn wait_for_fence(&self, fence: &Arc<dyn Fence>) -> Result<()>;

    /// Return the fence to the unsignaled state
    fn reset_fence(&self, fence: &Arc<dyn Fence>) -> Result<()>;

    /// Issue one asynchronous GPU submission
    ///
    /// The submission waits for every semaphore in `wait`, runs
    /// `commands`, signals every semaphore in `signal`, and signals
    /// `fence` (when given) once all work completes.
    fn submit(
        &self,
        commands: &[&dyn CommandList],
        wait: &[&Arc<dyn Semaphore>],
        signal: &[&Arc<dyn Semaphore>],
        fence: Option<&Arc<dyn Fence>>,
    ) -> Result<()>;

    /// Wait for all GPU operations to complete
    fn wait_idle(&self) -> Result<()>;
}
