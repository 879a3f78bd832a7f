/// Mock graphics device for unit tests (no GPU required)
///
/// Every queue-facing call is appended to a shared event log, so tests
/// can assert the exact order of fence waits, submissions and
/// presents. Fences behave like the real thing in miniature: a submit
/// carrying a fence signals it, waiting on an unsignaled fence fails
/// instead of hanging.

#[cfg(test)]
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
#[cfg(test)]
use std::sync::{Arc, Mutex};

#[cfg(test)]
use crate::error::{Error, Result};
#[cfg(test)]
use crate::render::{
    BindingGroup, BindingResource, BindingSlotDesc, Buffer, BufferDesc, ClearValue, CommandList,
    Fence, Framebuffer, FramebufferDesc, GraphicsDevice, IndexType, MemoryLocation, Pipeline,
    PipelineDesc, RenderPass, RenderPassDesc, RenderTarget, Semaphore, Shader, ShaderDesc,
    ShaderStage, Swapchain, Texture, TextureDesc, TextureFormat, TextureInfo,
};

// ============================================================================
// Event log
// ============================================================================

/// One observed device operation
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    WaitFence { fence: u64 },
    ResetFence { fence: u64 },
    Acquire { image_index: u32, signal: u64 },
    Submit { wait: Vec<u64>, signal: Vec<u64>, fence: Option<u64> },
    Present { image_index: u32, wait: u64 },
    SwapchainRecreated { width: u32, height: u32 },
    WaitIdle,
}

/// State shared between the mock device and its swapchains
#[cfg(test)]
pub struct MockState {
    pub events: Mutex<Vec<DeviceEvent>>,
    next_id: AtomicU64,
    /// Next acquire reports the surface out of date (one-shot)
    pub fail_next_acquire: AtomicBool,
    /// Next present reports the surface out of date (one-shot)
    pub fail_next_present: AtomicBool,
}

#[cfg(test)]
impl MockState {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            fail_next_acquire: AtomicBool::new(false),
            fail_next_present: AtomicBool::new(false),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn record(&self, event: DeviceEvent) {
        self.events.lock().unwrap().push(event);
    }

    /// Snapshot of the event log
    pub fn events(&self) -> Vec<DeviceEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Number of swapchain rebuilds observed
    pub fn recreate_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, DeviceEvent::SwapchainRecreated { .. }))
            .count()
    }
}

// ============================================================================
// Mock synchronization primitives
// ============================================================================

#[cfg(test)]
pub struct MockFence {
    pub id: u64,
    pub signaled: Mutex<bool>,
}

#[cfg(test)]
impl Fence for MockFence {
    fn id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
pub struct MockSemaphore {
    pub id: u64,
}

#[cfg(test)]
impl Semaphore for MockSemaphore {
    fn id(&self) -> u64 {
        self.id
    }
}

// ============================================================================
// Mock resources
// ============================================================================

#[cfg(test)]
pub struct MockBuffer {
    pub size: u64,
    pub location: MemoryLocation,
    pub data: Mutex<Vec<u8>>,
}

#[cfg(test)]
impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if self.location != MemoryLocation::HostVisible {
            return Err(Error::InvalidResource(
                "update on device-local buffer".to_string(),
            ));
        }
        let mut stored = self.data.lock().unwrap();
        let offset = offset as usize;
        if offset + data.len() > stored.len() {
            return Err(Error::InvalidResource("buffer update out of range".to_string()));
        }
        stored[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        if self.location != MemoryLocation::HostVisible {
            return Err(Error::InvalidResource(
                "read on device-local buffer".to_string(),
            ));
        }
        let stored = self.data.lock().unwrap();
        let offset = offset as usize;
        if offset + len > stored.len() {
            return Err(Error::InvalidResource("buffer read out of range".to_string()));
        }
        Ok(stored[offset..offset + len].to_vec())
    }
}

#[cfg(test)]
pub struct MockTexture {
    pub info: TextureInfo,
}

#[cfg(test)]
impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

#[cfg(test)]
pub struct MockShader {
    pub stage: ShaderStage,
}

#[cfg(test)]
impl Shader for MockShader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

#[cfg(test)]
pub struct MockRenderPass {
    pub color_attachment_count: usize,
    pub has_depth: bool,
    pub dependency_count: usize,
}

#[cfg(test)]
impl RenderPass for MockRenderPass {}

#[cfg(test)]
pub struct MockRenderTarget {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

#[cfg(test)]
impl RenderTarget for MockRenderTarget {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

#[cfg(test)]
pub struct MockFramebuffer {
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
impl Framebuffer for MockFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
pub struct MockPipeline;

#[cfg(test)]
impl Pipeline for MockPipeline {}

#[cfg(test)]
pub struct MockBindingGroup {
    pub set_index: u32,
    pub resource_kinds: Vec<crate::render::BindingKind>,
}

#[cfg(test)]
impl BindingGroup for MockBindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

#[cfg(test)]
pub struct MockCommandList {
    pub commands: Vec<String>,
}

#[cfg(test)]
impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        self.commands.push("begin".to_string());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.commands.push("end".to_string());
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        _render_pass: &Arc<dyn RenderPass>,
        _framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.commands
            .push(format!("begin_render_pass clears={}", clear_values.len()));
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.commands.push("end_render_pass".to_string());
        Ok(())
    }

    fn bind_pipeline(&mut self, _pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.commands.push("bind_pipeline".to_string());
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        _binding_group: &Arc<dyn BindingGroup>,
    ) -> Result<()> {
        self.commands.push(format!("bind_binding_group set={}", set_index));
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, _buffer: &Arc<dyn Buffer>, _offset: u64) -> Result<()> {
        self.commands.push("bind_vertex_buffer".to_string());
        Ok(())
    }

    fn bind_index_buffer(
        &mut self,
        _buffer: &Arc<dyn Buffer>,
        _offset: u64,
        _index_type: IndexType,
    ) -> Result<()> {
        self.commands.push("bind_index_buffer".to_string());
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
    ) -> Result<()> {
        self.commands.push(format!("draw_indexed {}", index_count));
        Ok(())
    }
}

// ============================================================================
// Mock swapchain
// ============================================================================

#[cfg(test)]
pub struct MockSwapchain {
    state: Arc<MockState>,
    image_count: usize,
    width: u32,
    height: u32,
    generation: u64,
    next_image: u32,
}

#[cfg(test)]
impl MockSwapchain {
    pub fn new(state: Arc<MockState>, image_count: usize, width: u32, height: u32) -> Self {
        Self {
            state,
            image_count,
            width,
            height,
            generation: 0,
            next_image: 0,
        }
    }
}

#[cfg(test)]
impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self, signal: &Arc<dyn Semaphore>) -> Result<u32> {
        if self.state.fail_next_acquire.swap(false, Ordering::SeqCst) {
            return Err(Error::SurfaceOutdated);
        }
        let image_index = self.next_image;
        self.next_image = (self.next_image + 1) % self.image_count as u32;
        self.state.record(DeviceEvent::Acquire {
            image_index,
            signal: signal.id(),
        });
        Ok(image_index)
    }

    fn present(&mut self, image_index: u32, wait: &Arc<dyn Semaphore>) -> Result<()> {
        if self.state.fail_next_present.swap(false, Ordering::SeqCst) {
            return Err(Error::SurfaceOutdated);
        }
        self.state.record(DeviceEvent::Present {
            image_index,
            wait: wait.id(),
        });
        Ok(())
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.width = width;
        self.height = height;
        self.generation += 1;
        self.next_image = 0;
        self.state.record(DeviceEvent::SwapchainRecreated { width, height });
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.image_count
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        TextureFormat::B8G8R8A8_SRGB
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn color_target(&self, _image_index: usize) -> Result<Arc<dyn RenderTarget>> {
        Ok(Arc::new(MockRenderTarget {
            width: self.width,
            height: self.height,
            format: TextureFormat::B8G8R8A8_SRGB,
        }))
    }
}

// ============================================================================
// Mock device
// ============================================================================

/// Mock GraphicsDevice recording every queue-facing call
#[cfg(test)]
pub struct MockDevice {
    state: Arc<MockState>,
}

#[cfg(test)]
impl MockDevice {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState::new()),
        }
    }

    /// Shared state handle, kept by tests for event inspection
    pub fn state(&self) -> Arc<MockState> {
        self.state.clone()
    }

    /// Build a swapchain sharing this device's event log
    pub fn new_swapchain(&self, image_count: usize, width: u32, height: u32) -> Box<dyn Swapchain> {
        Box::new(MockSwapchain::new(self.state.clone(), image_count, width, height))
    }
}

#[cfg(test)]
impl GraphicsDevice for MockDevice {
    fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        let mut data = vec![0u8; desc.size as usize];
        if let Some(initial) = &desc.initial_data {
            data[..initial.len()].copy_from_slice(initial);
        }
        Ok(Arc::new(MockBuffer {
            size: desc.size,
            location: desc.location,
            data: Mutex::new(data),
        }))
    }

    fn create_texture(&self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        Ok(Arc::new(MockTexture {
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                usage: desc.usage,
            },
        }))
    }

    fn create_shader(&self, desc: ShaderDesc) -> Result<Arc<dyn Shader>> {
        Ok(Arc::new(MockShader { stage: desc.stage }))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        Ok(Arc::new(MockRenderPass {
            color_attachment_count: desc.color_attachments.len(),
            has_depth: desc.depth_attachment.is_some(),
            dependency_count: desc.dependencies.len(),
        }))
    }

    fn create_render_target(&self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn RenderTarget>> {
        let info = texture.info();
        Ok(Arc::new(MockRenderTarget {
            width: info.width,
            height: info.height,
            format: info.format,
        }))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        Ok(Arc::new(MockFramebuffer {
            width: desc.width,
            height: desc.height,
        }))
    }

    fn create_pipeline(&self, _desc: &PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        Ok(Arc::new(MockPipeline))
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList { commands: Vec::new() }))
    }

    fn create_fence(&self, signaled: bool) -> Result<Arc<dyn Fence>> {
        Ok(Arc::new(MockFence {
            id: self.state.next_id(),
            signaled: Mutex::new(signaled),
        }))
    }

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>> {
        Ok(Arc::new(MockSemaphore {
            id: self.state.next_id(),
        }))
    }

    fn create_binding_group(
        &self,
        layout: &[BindingSlotDesc],
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>> {
        if layout.len() != resources.len() {
            return Err(Error::InvalidResource(format!(
                "binding group layout has {} slots, {} resources given",
                layout.len(),
                resources.len()
            )));
        }
        Ok(Arc::new(MockBindingGroup {
            set_index: 0,
            resource_kinds: resources.iter().map(|r| r.kind()).collect(),
        }))
    }

    fn find_depth_format(&self, candidates: &[TextureFormat]) -> Result<TextureFormat> {
        candidates.first().copied().ok_or_else(|| {
            Error::InitializationFailed("no depth format candidates".to_string())
        })
    }

    fn wait_for_fence(&self, fence: &Arc<dyn Fence>) -> Result<()> {
        // Downcast to MockFence to inspect the signaled flag
        let mock = unsafe {
            &*(fence.as_ref() as *const dyn Fence as *const MockFence)
        };
        if !*mock.signaled.lock().unwrap() {
            return Err(Error::BackendError(format!(
                "fence {} wait timed out (never signaled)",
                fence.id()
            )));
        }
        self.state.record(DeviceEvent::WaitFence { fence: fence.id() });
        Ok(())
    }

    fn reset_fence(&self, fence: &Arc<dyn Fence>) -> Result<()> {
        let mock = unsafe {
            &*(fence.as_ref() as *const dyn Fence as *const MockFence)
        };
        *mock.signaled.lock().unwrap() = false;
        self.state.record(DeviceEvent::ResetFence { fence: fence.id() });
        Ok(())
    }

    fn submit(
        &self,
        _commands: &[&dyn CommandList],
        wait: &[&Arc<dyn Semaphore>],
        signal: &[&Arc<dyn Semaphore>],
        fence: Option<&Arc<dyn Fence>>,
    ) -> Result<()> {
        // The mock "GPU" completes instantly: the fence is signaled as
        // part of the submission itself.
        if let Some(fence) = fence {
            let mock = unsafe {
                &*(fence.as_ref() as *const dyn Fence as *const MockFence)
            };
            *mock.signaled.lock().unwrap() = true;
        }
        self.state.record(DeviceEvent::Submit {
            wait: wait.iter().map(|s| s.id()).collect(),
            signal: signal.iter().map(|s| s.id()).collect(),
            fence: fence.map(|f| f.id()),
        });
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.state.record(DeviceEvent::WaitIdle);
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod tests;
