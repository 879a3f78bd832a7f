//! Unit tests for the enum conversions (no GPU required)

use ash::vk;
use umbra_render_engine::umbra::render::{PresentMode, TextureFormat};

use crate::vulkan_format::*;

#[test]
fn test_color_formats_round_trip() {
    for format in [
        TextureFormat::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM,
        TextureFormat::D32_SFLOAT,
        TextureFormat::D32_SFLOAT_S8_UINT,
        TextureFormat::D24_UNORM_S8_UINT,
    ] {
        assert_eq!(vk_to_format(format_to_vk(format)), format);
    }
}

#[test]
fn test_unknown_vk_format_maps_to_undefined() {
    assert_eq!(
        vk_to_format(vk::Format::R16G16B16A16_SFLOAT),
        TextureFormat::Undefined
    );
}

#[test]
fn test_present_modes_round_trip() {
    for mode in [PresentMode::Mailbox, PresentMode::Immediate, PresentMode::Fifo] {
        assert_eq!(present_mode_from_vk(present_mode_to_vk(mode)), Some(mode));
    }
    assert_eq!(
        present_mode_from_vk(vk::PresentModeKHR::FIFO_RELAXED),
        None
    );
}

#[test]
fn test_depth_aspect_masks() {
    assert_eq!(
        aspect_mask_for(TextureFormat::D32_SFLOAT),
        vk::ImageAspectFlags::DEPTH
    );
    assert_eq!(
        aspect_mask_for(TextureFormat::D24_UNORM_S8_UINT),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
    assert_eq!(
        aspect_mask_for(TextureFormat::R8G8B8A8_SRGB),
        vk::ImageAspectFlags::COLOR
    );
}
