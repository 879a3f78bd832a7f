/// Texture trait - GPU image resource with an optional sampler

/// Pixel formats used by the engine
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    D32_SFLOAT,
    D32_SFLOAT_S8_UINT,
    D24_UNORM_S8_UINT,
    /// Reported by some drivers when any format may be used
    Undefined,
}

impl TextureFormat {
    /// Whether this is a depth (or depth/stencil) format
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::D32_SFLOAT
                | TextureFormat::D32_SFLOAT_S8_UINT
                | TextureFormat::D24_UNORM_S8_UINT
        )
    }

    /// Whether this format carries a stencil aspect
    pub fn has_stencil(&self) -> bool {
        matches!(
            self,
            TextureFormat::D32_SFLOAT_S8_UINT | TextureFormat::D24_UNORM_S8_UINT
        )
    }
}

/// How a texture is used by the render graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUsage {
    /// Sampled in shaders, uploaded once through the staging path
    Sampled,
    /// Depth attachment, never sampled (the color pass depth buffer)
    DepthAttachment,
    /// Depth attachment written by one pass and sampled by a later one
    /// (the shadow map)
    SampledDepthAttachment,
}

/// Texture filtering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

/// Sampler addressing mode outside [0, 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Repeat,
    ClampToEdge,
}

/// Descriptor for the sampler baked into a combined image sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub address_mode: AddressMode,
    /// Depth-compare sampling; disabled for plain textures and for the
    /// shadow map (the comparison is done in the fragment shader)
    pub compare_enable: bool,
}

impl SamplerDesc {
    /// Bilinear filtering with repeat addressing, for material textures
    pub fn linear_repeat() -> Self {
        Self {
            mag_filter: Filter::Linear,
            min_filter: Filter::Linear,
            address_mode: AddressMode::Repeat,
            compare_enable: false,
        }
    }

    /// Bilinear filtering clamped to edge, comparison disabled - the
    /// configuration the shadow map is sampled with
    pub fn linear_clamp() -> Self {
        Self {
            mag_filter: Filter::Linear,
            min_filter: Filter::Linear,
            address_mode: AddressMode::ClampToEdge,
            compare_enable: false,
        }
    }
}

/// Descriptor for creating a texture
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    /// Sampler for sampled usages; attachment-only textures carry none
    pub sampler: Option<SamplerDesc>,
    /// Raw decoded pixel bytes, uploaded through the staging path and
    /// transitioned to shader-read layout
    pub initial_data: Option<Vec<u8>>,
}

/// Read-only texture properties
#[derive(Debug, Clone, Copy)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

/// GPU texture resource trait
pub trait Texture: Send + Sync {
    /// Texture properties
    fn info(&self) -> &TextureInfo;
}
