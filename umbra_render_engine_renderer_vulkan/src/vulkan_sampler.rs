/// Sampler cache - one Vulkan sampler per distinct SamplerDesc
///
/// Samplers are tiny immutable objects; textures share them through
/// this cache instead of creating one each. Owned by VulkanDevice and
/// destroyed with it.

use std::sync::Mutex;

use ash::vk;
use rustc_hash::FxHashMap;
use umbra_render_engine::umbra::render::SamplerDesc;
use umbra_render_engine::umbra::Result;
use umbra_render_engine::engine_err;

use crate::vulkan_format::{address_mode_to_vk, filter_to_vk};

pub(crate) struct SamplerCache {
    samplers: Mutex<FxHashMap<SamplerDesc, vk::Sampler>>,
}

impl SamplerCache {
    pub(crate) fn new() -> Self {
        Self {
            samplers: Mutex::new(FxHashMap::default()),
        }
    }

    /// Get or create the sampler for a descriptor
    pub(crate) fn get(&self, device: &ash::Device, desc: SamplerDesc) -> Result<vk::Sampler> {
        let mut samplers = self.samplers.lock().map_err(|_| {
            umbra_render_engine::umbra::Error::BackendError("sampler cache lock poisoned".to_string())
        })?;

        if let Some(sampler) = samplers.get(&desc) {
            return Ok(*sampler);
        }

        let address_mode = address_mode_to_vk(desc.address_mode);
        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(filter_to_vk(desc.mag_filter))
            .min_filter(filter_to_vk(desc.min_filter))
            .address_mode_u(address_mode)
            .address_mode_v(address_mode)
            .address_mode_w(address_mode)
            .anisotropy_enable(false)
            .max_anisotropy(1.0)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(desc.compare_enable)
            .compare_op(if desc.compare_enable {
                vk::CompareOp::LESS
            } else {
                vk::CompareOp::ALWAYS
            })
            .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(100.0);

        let sampler = unsafe {
            device
                .create_sampler(&create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create sampler: {:?}", e))?
        };
        samplers.insert(desc, sampler);
        Ok(sampler)
    }

    /// Destroy every cached sampler (device teardown)
    pub(crate) fn destroy(&self, device: &ash::Device) {
        if let Ok(mut samplers) = self.samplers.lock() {
            for (_, sampler) in samplers.drain() {
                unsafe {
                    device.destroy_sampler(sampler, None);
                }
            }
        }
    }
}
