/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// Manages presentation to the window, separated from rendering logic.
/// Handles image acquisition, presentation, and swapchain recreation
/// on resize or staleness. Format, present mode and extent selection
/// run through the engine-level policy so the behavior matches the
/// mock used in tests.

use std::sync::Arc;

use ash::vk;
use umbra_render_engine::umbra::render::{
    choose_extent, choose_present_mode, choose_surface_format, clamp_image_count, PresentMode,
    RenderTarget as RendererRenderTarget, Semaphore as RendererSemaphore, SurfaceCaps,
    SurfaceFormat, Swapchain as RendererSwapchain, TextureFormat,
};
use umbra_render_engine::umbra::{Error, Result};
use umbra_render_engine::{engine_bail, engine_err, engine_info};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{format_to_vk, present_mode_to_vk, vk_to_format};
use crate::vulkan_render_target::RenderTarget;
use crate::vulkan_sync::Semaphore as VulkanSemaphore;

/// Vulkan swapchain implementation
pub struct VulkanSwapchain {
    ctx: Arc<GpuContext>,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: TextureFormat,
    present_mode: PresentMode,
    extent: vk::Extent2D,
    desired_image_count: u32,
    generation: u64,
}

impl VulkanSwapchain {
    /// Create the chain against the context's surface
    ///
    /// # Arguments
    ///
    /// * `framebuffer_size` - Current window framebuffer size, used
    ///   when the surface reports the any-size sentinel
    /// * `desired_image_count` - Requested chain length, clamped to
    ///   the surface bounds
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        framebuffer_size: (u32, u32),
        desired_image_count: u32,
    ) -> Result<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);

        let mut swapchain = Self {
            ctx,
            swapchain_loader,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            image_views: Vec::new(),
            format: TextureFormat::Undefined,
            present_mode: PresentMode::Fifo,
            extent: vk::Extent2D::default(),
            desired_image_count,
            generation: 0,
        };
        swapchain.create_chain(framebuffer_size)?;

        engine_info!(
            "umbra::vulkan",
            "Swapchain created: {} images, {:?}, {:?}, {}x{}",
            swapchain.images.len(),
            swapchain.format,
            swapchain.present_mode,
            swapchain.extent.width,
            swapchain.extent.height
        );
        Ok(swapchain)
    }

    fn query_caps(&self) -> Result<(SurfaceCaps, vk::SurfaceCapabilitiesKHR)> {
        let caps = unsafe {
            self.ctx
                .surface_loader
                .get_physical_device_surface_capabilities(
                    self.ctx.physical_device,
                    self.ctx.surface,
                )
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to get surface capabilities: {:?}", e)
                })?
        };
        let policy_caps = SurfaceCaps {
            min_image_count: caps.min_image_count,
            max_image_count: caps.max_image_count,
            current_extent: (caps.current_extent.width, caps.current_extent.height),
            min_extent: (caps.min_image_extent.width, caps.min_image_extent.height),
            max_extent: (caps.max_image_extent.width, caps.max_image_extent.height),
        };
        Ok((policy_caps, caps))
    }

    /// Run the selection policy and (re)build the chain
    fn create_chain(&mut self, framebuffer_size: (u32, u32)) -> Result<()> {
        let (policy_caps, caps) = self.query_caps()?;

        let formats = unsafe {
            self.ctx
                .surface_loader
                .get_physical_device_surface_formats(self.ctx.physical_device, self.ctx.surface)
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to query surface formats: {:?}", e)
                })?
        };
        let policy_formats: Vec<SurfaceFormat> = formats
            .iter()
            .map(|f| SurfaceFormat {
                format: vk_to_format(f.format),
                srgb_color_space: f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR,
            })
            .collect();
        let chosen_format = choose_surface_format(&policy_formats)?;
        let color_space = formats
            .iter()
            .find(|f| vk_to_format(f.format) == chosen_format.format)
            .map(|f| f.color_space)
            .unwrap_or(vk::ColorSpaceKHR::SRGB_NONLINEAR);

        let present_modes = unsafe {
            self.ctx
                .surface_loader
                .get_physical_device_surface_present_modes(
                    self.ctx.physical_device,
                    self.ctx.surface,
                )
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to query present modes: {:?}", e)
                })?
        };
        let policy_modes: Vec<PresentMode> = present_modes
            .iter()
            .filter_map(|m| crate::vulkan_format::present_mode_from_vk(*m))
            .collect();
        let present_mode = choose_present_mode(&policy_modes)?;

        let (width, height) = choose_extent(&policy_caps, framebuffer_size);
        let extent = vk::Extent2D { width, height };
        let image_count = clamp_image_count(&policy_caps, self.desired_image_count);

        // Graphics and present queues may come from different families
        let family_indices = [
            self.ctx.graphics_queue_family,
            self.ctx.present_queue_family,
        ];
        let distinct_families = family_indices[0] != family_indices[1];

        let old_swapchain = self.swapchain;
        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.ctx.surface)
            .min_image_count(image_count)
            .image_format(format_to_vk(chosen_format.format))
            .image_color_space(color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode_to_vk(present_mode))
            .clipped(true)
            .old_swapchain(old_swapchain);
        create_info = if distinct_families {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let swapchain = unsafe {
            self.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to create swapchain: {:?}", e)
                })?
        };

        unsafe {
            if old_swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }
        }
        self.swapchain = swapchain;
        self.extent = extent;
        self.format = chosen_format.format;
        self.present_mode = present_mode;

        self.images = unsafe {
            self.swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| {
                    engine_err!("umbra::vulkan", "Failed to get swapchain images: {:?}", e)
                })?
        };

        self.image_views = self
            .images
            .iter()
            .map(|&image| {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format_to_vk(self.format))
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                unsafe { self.ctx.device.create_image_view(&view_info, None) }
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                engine_err!("umbra::vulkan", "Failed to create swapchain image views: {:?}", e)
            })?;

        Ok(())
    }

    /// Present mode the selection policy settled on
    pub fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    fn destroy_views(&mut self) {
        unsafe {
            for view in self.image_views.drain(..) {
                self.ctx.device.destroy_image_view(view, None);
            }
        }
    }
}

impl RendererSwapchain for VulkanSwapchain {
    fn acquire_next_image(&mut self, signal: &Arc<dyn RendererSemaphore>) -> Result<u32> {
        let vk_semaphore = unsafe {
            &*(signal.as_ref() as *const dyn RendererSemaphore as *const VulkanSemaphore)
        };

        unsafe {
            match self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                vk_semaphore.semaphore,
                vk::Fence::null(),
            ) {
                Ok((image_index, _is_suboptimal)) => Ok(image_index),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(Error::SurfaceOutdated),
                Err(e) => {
                    engine_bail!("umbra::vulkan", "Failed to acquire swapchain image: {:?}", e)
                }
            }
        }
    }

    fn present(&mut self, image_index: u32, wait: &Arc<dyn RendererSemaphore>) -> Result<()> {
        let vk_semaphore = unsafe {
            &*(wait.as_ref() as *const dyn RendererSemaphore as *const VulkanSemaphore)
        };

        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [vk_semaphore.semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            match self
                .swapchain_loader
                .queue_present(self.ctx.present_queue, &present_info)
            {
                // A suboptimal chain still presented, but must be
                // rebuilt before the next frame
                Ok(false) => Ok(()),
                Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(Error::SurfaceOutdated),
                Err(e) => {
                    engine_bail!("umbra::vulkan", "Failed to present swapchain image: {:?}", e)
                }
            }
        }
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            self.ctx.device.device_wait_idle().map_err(|e| {
                engine_err!("umbra::vulkan", "Failed to wait idle before swapchain recreate: {:?}", e)
            })?;
        }

        self.destroy_views();
        self.create_chain((width, height))?;
        self.generation += 1;

        engine_info!(
            "umbra::vulkan",
            "Swapchain recreated: generation {}, {}x{}",
            self.generation,
            self.extent.width,
            self.extent.height
        );
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn color_target(&self, image_index: usize) -> Result<Arc<dyn RendererRenderTarget>> {
        let view = self.image_views.get(image_index).copied().ok_or_else(|| {
            Error::InvalidResource(format!(
                "swapchain image index {} out of range (count: {})",
                image_index,
                self.images.len()
            ))
        })?;
        Ok(Arc::new(RenderTarget {
            view,
            width: self.extent.width,
            height: self.extent.height,
            format: self.format,
            keep_alive: None,
        }))
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
            self.destroy_views();
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
        }
    }
}
