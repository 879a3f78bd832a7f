//! Unit tests for the swapchain surface selection policy

use crate::error::Error;
use crate::render::{
    choose_extent, choose_present_mode, choose_surface_format, clamp_image_count, PresentMode,
    SurfaceCaps, SurfaceFormat, TextureFormat,
};

fn caps(current: (u32, u32)) -> SurfaceCaps {
    SurfaceCaps {
        min_image_count: 2,
        max_image_count: 8,
        current_extent: current,
        min_extent: (64, 64),
        max_extent: (4096, 4096),
    }
}

// ============================================================================
// Surface format
// ============================================================================

#[test]
fn test_format_prefers_srgb() {
    let available = [
        SurfaceFormat {
            format: TextureFormat::R8G8B8A8_UNORM,
            srgb_color_space: true,
        },
        SurfaceFormat {
            format: TextureFormat::B8G8R8A8_SRGB,
            srgb_color_space: true,
        },
    ];
    let chosen = choose_surface_format(&available).unwrap();
    assert_eq!(chosen.format, TextureFormat::B8G8R8A8_SRGB);
}

#[test]
fn test_format_falls_back_to_first_entry() {
    let available = [
        SurfaceFormat {
            format: TextureFormat::B8G8R8A8_UNORM,
            srgb_color_space: true,
        },
        SurfaceFormat {
            format: TextureFormat::R8G8B8A8_UNORM,
            srgb_color_space: true,
        },
    ];
    let chosen = choose_surface_format(&available).unwrap();
    assert_eq!(chosen.format, TextureFormat::B8G8R8A8_UNORM);
}

#[test]
fn test_single_undefined_entry_substitutes_default() {
    let available = [SurfaceFormat {
        format: TextureFormat::Undefined,
        srgb_color_space: true,
    }];
    let chosen = choose_surface_format(&available).unwrap();
    assert_eq!(chosen.format, TextureFormat::B8G8R8A8_SRGB);
}

#[test]
fn test_no_formats_is_fatal() {
    let err = choose_surface_format(&[]).unwrap_err();
    assert!(matches!(err, Error::InitializationFailed(_)));
}

// ============================================================================
// Present mode
// ============================================================================

#[test]
fn test_present_mode_prefers_mailbox() {
    let available = [PresentMode::Fifo, PresentMode::Immediate, PresentMode::Mailbox];
    assert_eq!(choose_present_mode(&available).unwrap(), PresentMode::Mailbox);
}

#[test]
fn test_present_mode_immediate_over_fifo() {
    let available = [PresentMode::Fifo, PresentMode::Immediate];
    assert_eq!(
        choose_present_mode(&available).unwrap(),
        PresentMode::Immediate
    );
}

#[test]
fn test_present_mode_fifo_fallback() {
    let available = [PresentMode::Fifo];
    assert_eq!(choose_present_mode(&available).unwrap(), PresentMode::Fifo);
}

#[test]
fn test_no_present_modes_is_fatal() {
    let err = choose_present_mode(&[]).unwrap_err();
    assert!(matches!(err, Error::InitializationFailed(_)));
}

// ============================================================================
// Extent
// ============================================================================

#[test]
fn test_fixed_extent_used_verbatim() {
    let extent = choose_extent(&caps((1280, 720)), (1920, 1080));
    assert_eq!(extent, (1280, 720));
}

#[test]
fn test_any_size_sentinel_uses_framebuffer_size() {
    let extent = choose_extent(&caps((u32::MAX, u32::MAX)), (1920, 1080));
    assert_eq!(extent, (1920, 1080));
}

#[test]
fn test_any_size_sentinel_clamps_to_bounds() {
    let extent = choose_extent(&caps((u32::MAX, u32::MAX)), (10_000, 8));
    assert_eq!(extent, (4096, 64));
}

// ============================================================================
// Image count
// ============================================================================

#[test]
fn test_image_count_clamped_to_surface_bounds() {
    assert_eq!(clamp_image_count(&caps((1, 1)), 1), 2);
    assert_eq!(clamp_image_count(&caps((1, 1)), 3), 3);
    assert_eq!(clamp_image_count(&caps((1, 1)), 100), 8);
}

#[test]
fn test_zero_max_means_unbounded() {
    let caps = SurfaceCaps {
        min_image_count: 2,
        max_image_count: 0,
        current_extent: (1, 1),
        min_extent: (1, 1),
        max_extent: (1, 1),
    };
    assert_eq!(clamp_image_count(&caps, 64), 64);
}
