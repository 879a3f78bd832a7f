/// VulkanDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Owns instance, physical/logical device, queues, the statically
/// sized descriptor pool, the command pools and the sampler cache.
/// All factory methods hand out resources that share the GpuContext,
/// so device teardown waits for the last resource to drop.

use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation as GpuMemoryLocation;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::Window;

use umbra_render_engine::umbra::render::{
    BindingGroup as RendererBindingGroup, BindingResource, BindingSlotDesc,
    Buffer as RendererBuffer, BufferDesc, CommandList as RendererCommandList, DeviceConfig,
    Fence as RendererFence, Framebuffer as RendererFramebuffer, FramebufferDesc,
    GraphicsDevice, MemoryLocation, Pipeline as RendererPipeline, PipelineDesc,
    RenderPass as RendererRenderPass, RenderPassDesc, RenderTarget as RendererRenderTarget,
    Semaphore as RendererSemaphore, Shader as RendererShader, ShaderDesc,
    Swapchain as RendererSwapchain, Texture as RendererTexture, TextureDesc, TextureFormat,
    TextureInfo, TextureUsage,
};
use umbra_render_engine::umbra::{Error, Result};
use umbra_render_engine::{engine_err, engine_info};

use crate::vulkan_binding_group::BindingGroup;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_list::CommandList;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    aspect_mask_for, binding_kind_to_vk, format_to_vk, stage_flags_to_vk,
};
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_render_pass::{Framebuffer, RenderPass};
use crate::vulkan_render_target::RenderTarget;
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_shader::Shader;
use crate::vulkan_swapchain::VulkanSwapchain;
use crate::vulkan_sync::{next_sync_id, Fence, Semaphore};
use crate::vulkan_texture::Texture;

/// Vulkan graphics device
pub struct VulkanDevice {
    ctx: Arc<GpuContext>,

    /// Statically sized pool every binding group allocates from
    descriptor_pool: vk::DescriptorPool,

    /// Pool for long-lived, re-recordable command lists
    command_pool: Mutex<vk::CommandPool>,

    /// One sampler per distinct descriptor, shared across textures
    sampler_cache: SamplerCache,
}

impl VulkanDevice {
    /// Bring up the whole device: instance, surface, physical device
    /// selection, logical device with graphics + present queues,
    /// allocator, command pools, and the descriptor pool
    pub fn new(window: &Window, config: DeviceConfig) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                Error::InitializationFailed(format!("Failed to load Vulkan: {}", e))
            })?;

            // Instance
            let app_name = CString::new(config.app_name.as_str()).map_err(|e| {
                Error::InitializationFailed(format!("Invalid app name: {}", e))
            })?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(
                    0,
                    config.app_version.0,
                    config.app_version.1,
                    config.app_version.2,
                ))
                .engine_name(c"Umbra")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window.display_handle().map_err(|e| {
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            #[allow(unused_mut)]
            let mut extension_names =
                ash_window::enumerate_required_extensions(display_handle.as_raw())
                    .map_err(|e| {
                        Error::InitializationFailed(format!(
                            "Failed to get required extensions: {:?}",
                            e
                        ))
                    })?
                    .to_vec();

            #[allow(unused_mut)]
            let mut layer_names: Vec<*const i8> = Vec::new();
            #[cfg(feature = "vulkan-validation")]
            if config.enable_validation {
                layer_names.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            #[cfg(feature = "vulkan-validation")]
            let debug = if config.enable_validation {
                Some(crate::vulkan_debug::DebugMessenger::new(&entry, &instance)?)
            } else {
                None
            };

            // Surface
            let window_handle = window.window_handle().map_err(|e| {
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // Physical device with graphics + present support
            let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
                Error::InitializationFailed(format!(
                    "Failed to enumerate physical devices: {:?}",
                    e
                ))
            })?;

            let mut selected = None;
            for physical_device in physical_devices {
                let queue_families =
                    instance.get_physical_device_queue_family_properties(physical_device);
                let graphics = queue_families
                    .iter()
                    .enumerate()
                    .find(|(_, qf)| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                    .map(|(i, _)| i as u32);
                let present = (0..queue_families.len() as u32).find(|&i| {
                    surface_loader
                        .get_physical_device_surface_support(physical_device, i, surface)
                        .unwrap_or(false)
                });
                if let (Some(graphics), Some(present)) = (graphics, present) {
                    selected = Some((physical_device, graphics, present));
                    break;
                }
            }
            let (physical_device, graphics_family, present_family) =
                selected.ok_or_else(|| {
                    Error::InitializationFailed(
                        "No GPU with graphics and presentation support found".to_string(),
                    )
                })?;

            // Logical device; queues may alias one family
            let queue_priorities = [1.0];
            let mut unique_families = vec![graphics_family];
            if present_family != graphics_family {
                unique_families.push(present_family);
            }
            let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
                .iter()
                .map(|&family| {
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(family)
                        .queue_priorities(&queue_priorities)
                })
                .collect();

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let features = vk::PhysicalDeviceFeatures::default().tessellation_shader(true);
            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(graphics_family, 0);
            let present_queue = device.get_device_queue(present_family, 0);

            // GPU allocator
            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            // Upload pool for one-shot transfers
            let upload_pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT);
            let upload_command_pool = device
                .create_command_pool(&upload_pool_info, None)
                .map_err(|e| {
                    Error::InitializationFailed(format!("Failed to create upload pool: {:?}", e))
                })?;

            // Pool for re-recordable command lists
            let command_pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = device
                .create_command_pool(&command_pool_info, None)
                .map_err(|e| {
                    Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
                })?;

            // Statically sized descriptor pool; exhaustion is fatal
            let limits = config.pool_limits;
            let pool_sizes = [
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::UNIFORM_BUFFER,
                    descriptor_count: limits.max_uniform_buffers,
                },
                vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    descriptor_count: limits.max_image_samplers,
                },
            ];
            let pool_info = vk::DescriptorPoolCreateInfo::default()
                .pool_sizes(&pool_sizes)
                .max_sets(limits.max_sets);
            let descriptor_pool = device
                .create_descriptor_pool(&pool_info, None)
                .map_err(|e| {
                    Error::InitializationFailed(format!(
                        "Failed to create descriptor pool: {:?}",
                        e
                    ))
                })?;

            let ctx = Arc::new(GpuContext {
                _entry: entry,
                instance,
                physical_device,
                device,
                allocator: ManuallyDrop::new(Arc::new(Mutex::new(allocator))),
                graphics_queue,
                graphics_queue_family: graphics_family,
                present_queue,
                present_queue_family: present_family,
                surface,
                surface_loader,
                upload_command_pool: Mutex::new(upload_command_pool),
                #[cfg(feature = "vulkan-validation")]
                debug,
            });

            engine_info!(
                "umbra::vulkan",
                "Device ready: graphics family {}, present family {}",
                graphics_family,
                present_family
            );

            Ok(Self {
                ctx,
                descriptor_pool,
                command_pool: Mutex::new(command_pool),
                sampler_cache: SamplerCache::new(),
            })
        }
    }

    /// Create the swapchain for the window this device was built
    /// against
    pub fn create_swapchain(
        &self,
        framebuffer_size: (u32, u32),
        desired_image_count: u32,
    ) -> Result<Box<dyn RendererSwapchain>> {
        Ok(Box::new(VulkanSwapchain::new(
            self.ctx.clone(),
            framebuffer_size,
            desired_image_count,
        )?))
    }

    /// Shared GPU context, for backend-level helpers
    pub fn context(&self) -> Arc<GpuContext> {
        self.ctx.clone()
    }

    fn allocate(
        &self,
        requirements: vk::MemoryRequirements,
        location: GpuMemoryLocation,
        linear: bool,
        name: &str,
    ) -> Result<Allocation> {
        self.ctx
            .allocator
            .lock()
            .map_err(|_| Error::BackendError("allocator lock poisoned".to_string()))?
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|_| Error::OutOfMemory)
    }

    /// Staging path: host-visible scratch buffer holding `data`
    fn create_staging_buffer(&self, data: &[u8]) -> Result<(vk::Buffer, Allocation)> {
        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(data.len() as u64)
                .usage(vk::BufferUsageFlags::TRANSFER_SRC)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            let buffer = self.ctx.device.create_buffer(&create_info, None).map_err(|e| {
                engine_err!("umbra::vulkan", "Failed to create staging buffer: {:?}", e)
            })?;

            let requirements = self.ctx.device.get_buffer_memory_requirements(buffer);
            let allocation =
                self.allocate(requirements, GpuMemoryLocation::CpuToGpu, true, "staging")?;
            self.ctx
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to bind staging memory: {:?}", e)
                })?;

            let mapped = allocation
                .mapped_ptr()
                .ok_or_else(|| Error::BackendError("staging buffer not mapped".to_string()))?
                .as_ptr() as *mut u8;
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped, data.len());

            Ok((buffer, allocation))
        }
    }

    fn free_staging_buffer(&self, buffer: vk::Buffer, allocation: Allocation) {
        unsafe {
            if let Ok(mut allocator) = self.ctx.allocator.lock() {
                allocator.free(allocation).ok();
            }
            self.ctx.device.destroy_buffer(buffer, None);
        }
    }

    /// Move an image between layouts with the matching stage/access
    /// barriers (transfer and shader-read moves, plus the initial
    /// depth-attachment move)
    fn transition_image_layout(
        &self,
        image: vk::Image,
        format: TextureFormat,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) -> Result<()> {
        let (src_access, src_stage) = match old_layout {
            vk::ImageLayout::UNDEFINED => (
                vk::AccessFlags::empty(),
                vk::PipelineStageFlags::TOP_OF_PIPE,
            ),
            vk::ImageLayout::TRANSFER_DST_OPTIMAL => (
                vk::AccessFlags::TRANSFER_WRITE,
                vk::PipelineStageFlags::TRANSFER,
            ),
            _ => {
                return Err(Error::InvalidResource(format!(
                    "unsupported source layout {:?}",
                    old_layout
                )))
            }
        };
        let (dst_access, dst_stage) = match new_layout {
            vk::ImageLayout::TRANSFER_DST_OPTIMAL => (
                vk::AccessFlags::TRANSFER_WRITE,
                vk::PipelineStageFlags::TRANSFER,
            ),
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (
                vk::AccessFlags::SHADER_READ,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
            ),
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => (
                vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            ),
            _ => {
                return Err(Error::InvalidResource(format!(
                    "unsupported target layout {:?}",
                    new_layout
                )))
            }
        };

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect_mask_for(format),
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .src_access_mask(src_access)
            .dst_access_mask(dst_access);

        let cmd = self.ctx.begin_one_shot_commands()?;
        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                cmd,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
        self.ctx.end_one_shot_commands(cmd)
    }
}

impl GraphicsDevice for VulkanDevice {
    fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<dyn RendererBuffer>> {
        unsafe {
            let base_usage = match desc.usage {
                umbra_render_engine::umbra::render::BufferUsage::Vertex => {
                    vk::BufferUsageFlags::VERTEX_BUFFER
                }
                umbra_render_engine::umbra::render::BufferUsage::Index => {
                    vk::BufferUsageFlags::INDEX_BUFFER
                }
                umbra_render_engine::umbra::render::BufferUsage::Uniform => {
                    vk::BufferUsageFlags::UNIFORM_BUFFER
                }
            };
            let usage = match desc.location {
                MemoryLocation::DeviceLocal => base_usage | vk::BufferUsageFlags::TRANSFER_DST,
                MemoryLocation::HostVisible => base_usage,
            };

            let create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            let buffer = self.ctx.device.create_buffer(&create_info, None).map_err(|e| {
                engine_err!("umbra::vulkan", "Failed to create buffer: {:?}", e)
            })?;

            let requirements = self.ctx.device.get_buffer_memory_requirements(buffer);
            let location = match desc.location {
                MemoryLocation::DeviceLocal => GpuMemoryLocation::GpuOnly,
                MemoryLocation::HostVisible => GpuMemoryLocation::CpuToGpu,
            };
            let allocation = self.allocate(requirements, location, true, "buffer")?;
            self.ctx
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to bind buffer memory: {:?}", e)
                })?;

            let result = Buffer {
                ctx: self.ctx.clone(),
                buffer,
                allocation: Some(allocation),
                size: desc.size,
            };

            if let Some(initial) = &desc.initial_data {
                match desc.location {
                    MemoryLocation::HostVisible => {
                        result.update(0, initial)?;
                    }
                    MemoryLocation::DeviceLocal => {
                        // Stage through a host-visible scratch buffer
                        let (staging, staging_alloc) = self.create_staging_buffer(initial)?;
                        let copy = vk::BufferCopy {
                            src_offset: 0,
                            dst_offset: 0,
                            size: initial.len() as u64,
                        };
                        let cmd = self.ctx.begin_one_shot_commands()?;
                        self.ctx
                            .device
                            .cmd_copy_buffer(cmd, staging, result.buffer, &[copy]);
                        let submit = self.ctx.end_one_shot_commands(cmd);
                        self.free_staging_buffer(staging, staging_alloc);
                        submit?;
                    }
                }
            }

            Ok(Arc::new(result))
        }
    }

    fn create_texture(&self, desc: TextureDesc) -> Result<Arc<dyn RendererTexture>> {
        unsafe {
            let usage = match desc.usage {
                TextureUsage::Sampled => {
                    vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST
                }
                TextureUsage::DepthAttachment => vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
                TextureUsage::SampledDepthAttachment => {
                    vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED
                }
            };

            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format_to_vk(desc.format))
                .extent(vk::Extent3D {
                    width: desc.width,
                    height: desc.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = self.ctx.device.create_image(&image_info, None).map_err(|e| {
                engine_err!("umbra::vulkan", "Failed to create image: {:?}", e)
            })?;

            let requirements = self.ctx.device.get_image_memory_requirements(image);
            let allocation =
                self.allocate(requirements, GpuMemoryLocation::GpuOnly, false, "texture")?;
            self.ctx
                .device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to bind image memory: {:?}", e)
                })?;

            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format_to_vk(desc.format))
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: aspect_mask_for(desc.format),
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = self.ctx.device.create_image_view(&view_info, None).map_err(|e| {
                engine_err!("umbra::vulkan", "Failed to create image view: {:?}", e)
            })?;

            let sampler = match desc.sampler {
                Some(sampler_desc) => {
                    Some(self.sampler_cache.get(&self.ctx.device, sampler_desc)?)
                }
                None => None,
            };

            let texture = Texture {
                ctx: self.ctx.clone(),
                image,
                view,
                sampler,
                allocation: Some(allocation),
                info: TextureInfo {
                    width: desc.width,
                    height: desc.height,
                    format: desc.format,
                    usage: desc.usage,
                },
            };

            if let Some(pixels) = &desc.initial_data {
                // Staged upload with layout transitions around the copy
                let (staging, staging_alloc) = self.create_staging_buffer(pixels)?;
                self.transition_image_layout(
                    image,
                    desc.format,
                    vk::ImageLayout::UNDEFINED,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                )?;

                let region = vk::BufferImageCopy {
                    buffer_offset: 0,
                    buffer_row_length: 0,
                    buffer_image_height: 0,
                    image_subresource: vk::ImageSubresourceLayers {
                        aspect_mask: aspect_mask_for(desc.format),
                        mip_level: 0,
                        base_array_layer: 0,
                        layer_count: 1,
                    },
                    image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
                    image_extent: vk::Extent3D {
                        width: desc.width,
                        height: desc.height,
                        depth: 1,
                    },
                };
                let cmd = self.ctx.begin_one_shot_commands()?;
                self.ctx.device.cmd_copy_buffer_to_image(
                    cmd,
                    staging,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
                let submit = self.ctx.end_one_shot_commands(cmd);
                self.free_staging_buffer(staging, staging_alloc);
                submit?;

                self.transition_image_layout(
                    image,
                    desc.format,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                )?;
            } else if desc.format.is_depth() {
                self.transition_image_layout(
                    image,
                    desc.format,
                    vk::ImageLayout::UNDEFINED,
                    vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
                )?;
            }

            Ok(Arc::new(texture))
        }
    }

    fn create_shader(&self, desc: ShaderDesc) -> Result<Arc<dyn RendererShader>> {
        unsafe {
            if desc.code.len() % 4 != 0 {
                return Err(Error::InvalidResource(
                    "shader bytecode must be aligned to 4 bytes".to_string(),
                ));
            }
            let code_u32 =
                std::slice::from_raw_parts(desc.code.as_ptr() as *const u32, desc.code.len() / 4);
            let create_info = vk::ShaderModuleCreateInfo::default().code(code_u32);
            let module = self
                .ctx
                .device
                .create_shader_module(&create_info, None)
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to create shader module: {:?}", e)
                })?;

            let entry_point = CString::new(desc.entry_point.as_str()).map_err(|e| {
                Error::InvalidResource(format!("invalid shader entry point: {}", e))
            })?;

            Ok(Arc::new(Shader {
                ctx: self.ctx.clone(),
                module,
                stage: desc.stage,
                entry_point,
            }))
        }
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RendererRenderPass>> {
        Ok(Arc::new(RenderPass::new(self.ctx.clone(), desc)?))
    }

    fn create_render_target(
        &self,
        texture: &Arc<dyn RendererTexture>,
    ) -> Result<Arc<dyn RendererRenderTarget>> {
        let vk_texture = unsafe {
            &*(texture.as_ref() as *const dyn RendererTexture as *const Texture)
        };
        let info = *texture.info();
        Ok(Arc::new(RenderTarget {
            view: vk_texture.view,
            width: info.width,
            height: info.height,
            format: info.format,
            keep_alive: Some(texture.clone()),
        }))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn RendererFramebuffer>> {
        unsafe {
            let vk_pass = &*(desc.render_pass.as_ref() as *const dyn RendererRenderPass
                as *const RenderPass);

            let attachments: Vec<vk::ImageView> = desc
                .attachments
                .iter()
                .map(|target| {
                    let vk_target = &*(target.as_ref() as *const dyn RendererRenderTarget
                        as *const RenderTarget);
                    vk_target.view
                })
                .collect();

            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(vk_pass.render_pass)
                .attachments(&attachments)
                .width(desc.width)
                .height(desc.height)
                .layers(1);

            let framebuffer = self
                .ctx
                .device
                .create_framebuffer(&framebuffer_info, None)
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to create framebuffer: {:?}", e)
                })?;

            Ok(Arc::new(Framebuffer {
                ctx: self.ctx.clone(),
                framebuffer,
                width: desc.width,
                height: desc.height,
            }))
        }
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn RendererPipeline>> {
        Ok(Arc::new(Pipeline::new(self.ctx.clone(), desc)?))
    }

    fn create_command_list(&self) -> Result<Box<dyn RendererCommandList>> {
        let pool = self.command_pool.lock().map_err(|_| {
            Error::BackendError("command pool lock poisoned".to_string())
        })?;
        unsafe {
            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = self
                .ctx
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to allocate command buffer: {:?}", e)
                })?[0];

            Ok(Box::new(CommandList {
                ctx: self.ctx.clone(),
                pool: *pool,
                command_buffer,
            }))
        }
    }

    fn create_fence(&self, signaled: bool) -> Result<Arc<dyn RendererFence>> {
        unsafe {
            let flags = if signaled {
                vk::FenceCreateFlags::SIGNALED
            } else {
                vk::FenceCreateFlags::empty()
            };
            let create_info = vk::FenceCreateInfo::default().flags(flags);
            let fence = self.ctx.device.create_fence(&create_info, None).map_err(|e| {
                engine_err!("umbra::vulkan", "Failed to create fence: {:?}", e)
            })?;
            Ok(Arc::new(Fence {
                ctx: self.ctx.clone(),
                fence,
                id: next_sync_id(),
            }))
        }
    }

    fn create_semaphore(&self) -> Result<Arc<dyn RendererSemaphore>> {
        unsafe {
            let create_info = vk::SemaphoreCreateInfo::default();
            let semaphore = self
                .ctx
                .device
                .create_semaphore(&create_info, None)
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to create semaphore: {:?}", e)
                })?;
            Ok(Arc::new(Semaphore {
                ctx: self.ctx.clone(),
                semaphore,
                id: next_sync_id(),
            }))
        }
    }

    fn create_binding_group(
        &self,
        layout: &[BindingSlotDesc],
        resources: &[BindingResource],
    ) -> Result<Arc<dyn RendererBindingGroup>> {
        if layout.len() != resources.len() {
            return Err(Error::InvalidResource(format!(
                "binding group layout has {} slots, {} resources given",
                layout.len(),
                resources.len()
            )));
        }

        unsafe {
            let bindings: Vec<vk::DescriptorSetLayoutBinding> = layout
                .iter()
                .map(|slot| {
                    vk::DescriptorSetLayoutBinding::default()
                        .binding(slot.binding)
                        .descriptor_type(binding_kind_to_vk(slot.kind))
                        .descriptor_count(slot.count)
                        .stage_flags(stage_flags_to_vk(slot.stage_flags))
                })
                .collect();
            let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
            let set_layout = self
                .ctx
                .device
                .create_descriptor_set_layout(&layout_info, None)
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to create descriptor set layout: {:?}", e)
                })?;

            let set_layouts = [set_layout];
            let alloc_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(self.descriptor_pool)
                .set_layouts(&set_layouts);
            let descriptor_set = match self.ctx.device.allocate_descriptor_sets(&alloc_info) {
                Ok(sets) => sets[0],
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY)
                | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {
                    self.ctx.device.destroy_descriptor_set_layout(set_layout, None);
                    // The pool is pre-sized statically; no growth path
                    return Err(Error::OutOfMemory);
                }
                Err(e) => {
                    self.ctx.device.destroy_descriptor_set_layout(set_layout, None);
                    return Err(engine_err!(
                        "umbra::vulkan",
                        "Failed to allocate descriptor set: {:?}",
                        e
                    ));
                }
            };

            // Infos must outlive the update call
            let mut buffer_infos = Vec::new();
            let mut image_infos = Vec::new();
            for resource in resources {
                match resource {
                    BindingResource::UniformBuffer(buffer) => {
                        let vk_buffer =
                            &*(buffer.as_ref() as *const dyn RendererBuffer as *const Buffer);
                        buffer_infos.push(vk::DescriptorBufferInfo {
                            buffer: vk_buffer.buffer,
                            offset: 0,
                            range: vk_buffer.size,
                        });
                    }
                    BindingResource::SampledTexture(texture) => {
                        let vk_texture =
                            &*(texture.as_ref() as *const dyn RendererTexture as *const Texture);
                        let sampler = vk_texture.sampler.ok_or_else(|| {
                            Error::InvalidResource(
                                "texture bound as combined image sampler has no sampler"
                                    .to_string(),
                            )
                        })?;
                        let image_layout = if texture.info().format.is_depth() {
                            vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
                        } else {
                            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
                        };
                        image_infos.push(vk::DescriptorImageInfo {
                            sampler,
                            image_view: vk_texture.view,
                            image_layout,
                        });
                    }
                }
            }

            let mut writes = Vec::with_capacity(layout.len());
            let mut next_buffer = 0;
            let mut next_image = 0;
            for (slot, resource) in layout.iter().zip(resources.iter()) {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(slot.binding)
                    .dst_array_element(0)
                    .descriptor_type(binding_kind_to_vk(slot.kind));
                let write = match resource {
                    BindingResource::UniformBuffer(_) => {
                        let info = std::slice::from_ref(&buffer_infos[next_buffer]);
                        next_buffer += 1;
                        write.buffer_info(info)
                    }
                    BindingResource::SampledTexture(_) => {
                        let info = std::slice::from_ref(&image_infos[next_image]);
                        next_image += 1;
                        write.image_info(info)
                    }
                };
                writes.push(write);
            }
            self.ctx.device.update_descriptor_sets(&writes, &[]);

            Ok(Arc::new(BindingGroup {
                ctx: self.ctx.clone(),
                descriptor_set,
                set_layout,
                set_index: 0,
            }))
        }
    }

    fn find_depth_format(&self, candidates: &[TextureFormat]) -> Result<TextureFormat> {
        for &candidate in candidates {
            let props = unsafe {
                self.ctx.instance.get_physical_device_format_properties(
                    self.ctx.physical_device,
                    format_to_vk(candidate),
                )
            };
            if props
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            {
                return Ok(candidate);
            }
        }
        Err(Error::InitializationFailed(
            "no supported depth attachment format".to_string(),
        ))
    }

    fn wait_for_fence(&self, fence: &Arc<dyn RendererFence>) -> Result<()> {
        let vk_fence =
            unsafe { &*(fence.as_ref() as *const dyn RendererFence as *const Fence) };
        unsafe {
            self.ctx
                .device
                .wait_for_fences(&[vk_fence.fence], true, u64::MAX)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to wait for fence: {:?}", e))
        }
    }

    fn reset_fence(&self, fence: &Arc<dyn RendererFence>) -> Result<()> {
        let vk_fence =
            unsafe { &*(fence.as_ref() as *const dyn RendererFence as *const Fence) };
        unsafe {
            self.ctx
                .device
                .reset_fences(&[vk_fence.fence])
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to reset fence: {:?}", e))
        }
    }

    fn submit(
        &self,
        commands: &[&dyn RendererCommandList],
        wait: &[&Arc<dyn RendererSemaphore>],
        signal: &[&Arc<dyn RendererSemaphore>],
        fence: Option<&Arc<dyn RendererFence>>,
    ) -> Result<()> {
        unsafe {
            let wait_semaphores: Vec<vk::Semaphore> = wait
                .iter()
                .map(|s| {
                    let vk_semaphore =
                        &*(s.as_ref() as *const dyn RendererSemaphore as *const Semaphore);
                    vk_semaphore.semaphore
                })
                .collect();
            let signal_semaphores: Vec<vk::Semaphore> = signal
                .iter()
                .map(|s| {
                    let vk_semaphore =
                        &*(s.as_ref() as *const dyn RendererSemaphore as *const Semaphore);
                    vk_semaphore.semaphore
                })
                .collect();
            let command_buffers: Vec<vk::CommandBuffer> = commands
                .iter()
                .map(|c| {
                    let vk_list = &*(*c as *const dyn RendererCommandList as *const CommandList);
                    vk_list.command_buffer
                })
                .collect();
            let wait_stages: Vec<vk::PipelineStageFlags> = wait
                .iter()
                .map(|_| vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
                .collect();

            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);

            let vk_fence = fence
                .map(|f| {
                    let vk_fence =
                        &*(f.as_ref() as *const dyn RendererFence as *const Fence);
                    vk_fence.fence
                })
                .unwrap_or_else(vk::Fence::null);

            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], vk_fence)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to submit commands: {:?}", e))
        }
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .device_wait_idle()
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to wait idle: {:?}", e))
        }
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();

            self.ctx
                .device
                .destroy_descriptor_pool(self.descriptor_pool, None);
            if let Ok(pool) = self.command_pool.lock() {
                self.ctx.device.destroy_command_pool(*pool, None);
            }
            self.sampler_cache.destroy(&self.ctx.device);
            // Instance and device go down with the last GpuContext
            // reference
        }
    }
}
