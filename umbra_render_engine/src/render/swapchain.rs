/// Swapchain trait and surface selection policy
///
/// The trait covers the presentable image chain itself; the free
/// functions implement the format/present-mode/extent selection rules
/// shared by every backend. Keeping the policy here lets it run under
/// tests without a device.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::render::{RenderTarget, Semaphore, TextureFormat};

/// Presentation mode, ordered here by preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentMode {
    /// Lowest latency without tearing; replaces queued images
    Mailbox,
    /// May tear, no queue wait
    Immediate,
    /// Queue-based, guaranteed available everywhere
    Fifo,
}

/// A color format / color space pair reported by the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceFormat {
    pub format: TextureFormat,
    pub srgb_color_space: bool,
}

/// Surface capability report used for swapchain creation
///
/// Mirrors what the platform reports: image count bounds, the fixed
/// current extent (or a sentinel allowing any size), and extent bounds.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceCaps {
    pub min_image_count: u32,
    /// 0 means no upper bound
    pub max_image_count: u32,
    /// (u32::MAX, u32::MAX) means the surface takes any size and the
    /// window framebuffer size decides
    pub current_extent: (u32, u32),
    pub min_extent: (u32, u32),
    pub max_extent: (u32, u32),
}

/// Choose the surface format for the swapchain
///
/// Prefers 32-bit sRGB; falls back to the first supported entry. A
/// single `Undefined` entry means the surface accepts anything, and a
/// fixed default is substituted. No formats at all makes the device
/// unusable.
pub fn choose_surface_format(available: &[SurfaceFormat]) -> Result<SurfaceFormat> {
    if available.is_empty() {
        return Err(Error::InitializationFailed(
            "Surface reports no supported image formats".to_string(),
        ));
    }

    if available.len() == 1 && available[0].format == TextureFormat::Undefined {
        return Ok(SurfaceFormat {
            format: TextureFormat::B8G8R8A8_SRGB,
            srgb_color_space: true,
        });
    }

    Ok(available
        .iter()
        .find(|f| {
            matches!(
                f.format,
                TextureFormat::B8G8R8A8_SRGB | TextureFormat::R8G8B8A8_SRGB
            )
        })
        .copied()
        .unwrap_or(available[0]))
}

/// Choose the present mode for the swapchain
///
/// Preference order: mailbox, then immediate, then FIFO. FIFO support
/// is guaranteed by every conformant platform, so an empty report is a
/// fatal device error.
pub fn choose_present_mode(available: &[PresentMode]) -> Result<PresentMode> {
    if available.is_empty() {
        return Err(Error::InitializationFailed(
            "Surface reports no supported present modes".to_string(),
        ));
    }

    for preferred in [PresentMode::Mailbox, PresentMode::Immediate] {
        if available.contains(&preferred) {
            return Ok(preferred);
        }
    }
    Ok(PresentMode::Fifo)
}

/// Choose the swapchain extent
///
/// A fixed current extent is used verbatim; the any-size sentinel makes
/// the window framebuffer size authoritative, clamped to the reported
/// bounds.
pub fn choose_extent(caps: &SurfaceCaps, framebuffer_size: (u32, u32)) -> (u32, u32) {
    if caps.current_extent.0 != u32::MAX {
        return caps.current_extent;
    }
    (
        framebuffer_size
            .0
            .clamp(caps.min_extent.0, caps.max_extent.0),
        framebuffer_size
            .1
            .clamp(caps.min_extent.1, caps.max_extent.1),
    )
}

/// Clamp the desired image count to the surface bounds
pub fn clamp_image_count(caps: &SurfaceCaps, desired: u32) -> u32 {
    let count = desired.max(caps.min_image_count);
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}

/// Swapchain trait - the presentable image chain
///
/// Every per-image resource (framebuffer, command list, binding group)
/// must be rebuilt together whenever `generation()` changes; holding a
/// resource across a rebuild is an error, not a silent no-op.
pub trait Swapchain: Send + Sync {
    /// Request the next presentable image, signaling `signal` when the
    /// image is actually available to render into
    ///
    /// Returns `Error::SurfaceOutdated` when the chain no longer
    /// matches the surface.
    fn acquire_next_image(&mut self, signal: &Arc<dyn Semaphore>) -> Result<u32>;

    /// Queue presentation of an image, waiting on `wait` first
    ///
    /// Returns `Error::SurfaceOutdated` when the chain must be rebuilt;
    /// the frame's rendering work is unaffected, only its presentation
    /// is discarded.
    fn present(&mut self, image_index: u32, wait: &Arc<dyn Semaphore>) -> Result<()>;

    /// Tear down per-image views and rerun creation against the
    /// current surface, bumping the generation counter
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;

    /// Number of images in the chain
    fn image_count(&self) -> usize;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn format(&self) -> TextureFormat;

    /// Rebuild counter, incremented by every `recreate`
    fn generation(&self) -> u64;

    /// Attachable view of one swapchain image
    fn color_target(&self, image_index: usize) -> Result<Arc<dyn RenderTarget>>;
}

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;
