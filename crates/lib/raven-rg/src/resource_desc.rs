use crate::error::RgError;
use crate::executor::ExecuteParams;

/// Largest supersampling factor of screen relative textures.
pub const MAX_SCREEN_SCALE: f32 = 16.0;

/// Pixel formats a graph texture can be created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8Unorm,
    Rg8Unorm,
    Rgba8Unorm,
    Rgba8Srgb,
    Bgra8Unorm,
    Bgra8Srgb,
    R16Float,
    Rg16Float,
    Rgba16Float,
    R32Float,
    Rg32Float,
    Rgba32Float,
    R32Uint,
    Rg32Uint,
    B10G11R11Float,
    A2B10G10R10Unorm,
    Depth16Unorm,
    Depth32Float,
    Depth24UnormStencil8,
    Depth32FloatStencil8,
}

impl TextureFormat {
    #[inline]
    pub fn is_depth(self) -> bool {
        matches!(self,
            TextureFormat::Depth16Unorm |
            TextureFormat::Depth32Float |
            TextureFormat::Depth24UnormStencil8 |
            TextureFormat::Depth32FloatStencil8
        )
    }

    #[inline]
    pub fn has_stencil(self) -> bool {
        matches!(self, TextureFormat::Depth24UnormStencil8 | TextureFormat::Depth32FloatStencil8)
    }
}

impl Default for TextureFormat {
    fn default() -> Self {
        TextureFormat::Rgba8Unorm
    }
}

/// Size of a texture, either in pixels or relative to the rendering resolution of the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureSize {
    Explicit {
        width: u32,
        height: u32,
    },
    Scale {
        x: f32,
        y: f32,
    },
}

impl TextureSize {
    /// Same size as the rendering resolution.
    pub const FULL_SCREEN: TextureSize = TextureSize::Scale { x: 1.0, y: 1.0 };

    /// Resolve into pixels. Scaled sizes never collapse below one pixel.
    pub fn resolve(&self, rendering_width: u32, rendering_height: u32) -> (u32, u32) {
        match *self {
            TextureSize::Explicit { width, height } => (width, height),
            TextureSize::Scale { x, y } => {
                let width = (rendering_width as f32 * x).round() as u32;
                let height = (rendering_height as f32 * y).round() as u32;
                (width.max(1), height.max(1))
            }
        }
    }
}

/// Sample count of multisampled render targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MsaaSamples {
    None,
    X2,
    X4,
    X8,
}

impl MsaaSamples {
    #[inline]
    pub fn count(self) -> u32 {
        match self {
            MsaaSamples::None => 1,
            MsaaSamples::X2 => 2,
            MsaaSamples::X4 => 4,
            MsaaSamples::X8 => 8,
        }
    }

    pub fn from_count(count: u32) -> Option<Self> {
        match count {
            1 => Some(MsaaSamples::None),
            2 => Some(MsaaSamples::X2),
            4 => Some(MsaaSamples::X4),
            8 => Some(MsaaSamples::X8),
            _ => None,
        }
    }
}

impl Default for MsaaSamples {
    fn default() -> Self {
        MsaaSamples::None
    }
}

/// Description of a texture created by the render graph.
///
/// Nothing is allocated at declaration time, the physical texture is drawn from the
/// transient resource cache when the first pass using it executes.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureDesc {
    /// `None` means full screen.
    pub size: Option<TextureSize>,
    /// `None` means [`TextureFormat::default`].
    pub format: Option<TextureFormat>,
    pub slices: u32,
    /// Take the sample count from [`ExecuteParams::msaa_samples`].
    pub msaa: bool,
    /// Bind as a multisampled texture instead of resolving it before sampling.
    pub bind_ms: bool,
    pub random_write: bool,
    /// Clear the texture when it is first acquired in a frame.
    pub clear_buffer: bool,
    pub clear_color: [f32; 4],
    pub name: String,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            size: None,
            format: None,
            slices: 1,
            msaa: false,
            bind_ms: false,
            random_write: false,
            clear_buffer: false,
            clear_color: [0.0; 4],
            name: String::new(),
        }
    }
}

impl TextureDesc {
    pub fn new_2d(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            size: Some(TextureSize::Explicit { width, height }),
            format: Some(format),
            ..Default::default()
        }
    }

    pub fn screen_scaled(x: f32, y: f32, format: TextureFormat) -> Self {
        Self {
            size: Some(TextureSize::Scale { x, y }),
            format: Some(format),
            ..Default::default()
        }
    }

    pub fn full_screen(format: TextureFormat) -> Self {
        Self::screen_scaled(1.0, 1.0, format)
    }

    #[inline]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    #[inline]
    pub fn with_slices(mut self, slices: u32) -> Self {
        self.slices = slices;
        self
    }

    #[inline]
    pub fn with_msaa(mut self, bind_ms: bool) -> Self {
        self.msaa = true;
        self.bind_ms = bind_ms;
        self
    }

    #[inline]
    pub fn with_random_write(mut self) -> Self {
        self.random_write = true;
        self
    }

    #[inline]
    pub fn with_clear(mut self, color: [f32; 4]) -> Self {
        self.clear_buffer = true;
        self.clear_color = color;
        self
    }

    #[inline]
    pub fn format(&self) -> TextureFormat {
        self.format.unwrap_or_default()
    }

    #[inline]
    pub fn size(&self) -> TextureSize {
        self.size.unwrap_or(TextureSize::FULL_SCREEN)
    }

    pub(crate) fn validate(&self) -> Result<(), RgError> {
        let invalid = |reason| Err(RgError::InvalidDescriptor { name: self.name.clone(), reason });

        if self.size.is_none() && self.format.is_none() {
            return invalid("neither size nor format is set");
        }

        match self.size {
            Some(TextureSize::Explicit { width, height }) if width == 0 || height == 0 => {
                return invalid("texture dimensions must not be zero");
            }
            Some(TextureSize::Scale { x, y }) if !(x > 0.0 && y > 0.0) => {
                return invalid("screen scale must be strictly positive");
            }
            Some(TextureSize::Scale { x, y }) if !(x <= MAX_SCREEN_SCALE && y <= MAX_SCREEN_SCALE) => {
                return invalid("screen scale is too large");
            }
            _ => {}
        }

        if self.slices == 0 {
            return invalid("slice count must not be zero");
        }
        if self.bind_ms && !self.msaa {
            return invalid("bind_ms requires an msaa texture");
        }
        if self.msaa && self.random_write {
            return invalid("multisampled textures can not be random-write");
        }

        Ok(())
    }

    /// Resolve the final physical description with the parameters of the frame.
    pub fn resolve(&self, params: &ExecuteParams) -> ResolvedTextureDesc {
        let (width, height) = self.size().resolve(params.rendering_width, params.rendering_height);
        let samples = if self.msaa { params.msaa_samples.count() } else { 1 };

        ResolvedTextureDesc {
            key: TextureKey {
                width,
                height,
                format: self.format(),
                slices: self.slices,
                samples,
                random_write: self.random_write,
                bind_ms: self.bind_ms && samples > 1,
            },
            name: self.name.clone(),
            clear_color: self.clear_buffer.then_some(self.clear_color),
        }
    }
}

/// Everything that makes two physical textures interchangeable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureKey {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub slices: u32,
    pub samples: u32,
    pub random_write: bool,
    pub bind_ms: bool,
}

/// Texture description with every screen relative parameter resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTextureDesc {
    pub key: TextureKey,
    pub name: String,
    pub clear_color: Option<[f32; 4]>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderQueueRange {
    Opaque,
    Transparent,
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortingCriteria {
    None,
    CommonOpaque,
    CommonTransparent,
    FrontToBack,
    BackToFront,
}

/// Per-object data requested by the draws of a renderer list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PerObjectData {
    pub lightmaps: bool,
    pub light_probes: bool,
    pub motion_vectors: bool,
}

/// Filtering and sorting criteria of a renderer list.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererListDesc {
    /// Shader pass names the draws are collected from.
    pub pass_names: Vec<String>,
    pub queue_range: RenderQueueRange,
    pub sorting: SortingCriteria,
    pub layer_mask: u32,
    pub per_object_data: PerObjectData,
    pub exclude_motion_vector_objects: bool,
    pub name: String,
}

impl RendererListDesc {
    pub fn new(pass_names: &[&str], queue_range: RenderQueueRange) -> Self {
        Self {
            pass_names: pass_names.iter().map(|name| (*name).to_owned()).collect(),
            queue_range,
            sorting: match queue_range {
                RenderQueueRange::Transparent => SortingCriteria::CommonTransparent,
                _ => SortingCriteria::CommonOpaque,
            },
            layer_mask: !0,
            per_object_data: PerObjectData::default(),
            exclude_motion_vector_objects: false,
            name: String::new(),
        }
    }

    #[inline]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    #[inline]
    pub fn with_sorting(mut self, sorting: SortingCriteria) -> Self {
        self.sorting = sorting;
        self
    }

    #[inline]
    pub fn with_layer_mask(mut self, layer_mask: u32) -> Self {
        self.layer_mask = layer_mask;
        self
    }

    #[inline]
    pub fn with_per_object_data(mut self, per_object_data: PerObjectData) -> Self {
        self.per_object_data = per_object_data;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), RgError> {
        if self.pass_names.is_empty() {
            return Err(RgError::InvalidDescriptor {
                name: self.name.clone(),
                reason: "renderer list has no shader pass name",
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(msaa_samples: MsaaSamples) -> ExecuteParams {
        ExecuteParams {
            rendering_width: 1280,
            rendering_height: 720,
            msaa_samples,
        }
    }

    #[test]
    fn reject_empty_texture_desc() {
        let err = TextureDesc::default().with_name("empty").validate().unwrap_err();
        assert!(matches!(err, RgError::InvalidDescriptor { ref name, .. } if name == "empty"));
    }

    #[test]
    fn reject_degenerate_texture_desc() {
        assert!(TextureDesc::new_2d(0, 16, TextureFormat::R8Unorm).validate().is_err());
        assert!(TextureDesc::screen_scaled(0.5, 0.0, TextureFormat::R8Unorm).validate().is_err());
        assert!(TextureDesc::screen_scaled(f32::NAN, 1.0, TextureFormat::R8Unorm).validate().is_err());
        assert!(TextureDesc::new_2d(16, 16, TextureFormat::R8Unorm).with_slices(0).validate().is_err());
        assert!(TextureDesc::full_screen(TextureFormat::Rgba16Float).with_msaa(false).with_random_write().validate().is_err());
    }

    #[test]
    fn reject_unbounded_screen_scale() {
        assert!(TextureDesc::screen_scaled(f32::INFINITY, 1.0, TextureFormat::R8Unorm).validate().is_err());
        assert!(TextureDesc::screen_scaled(1.0, 1.0e30, TextureFormat::R8Unorm).validate().is_err());
        assert!(TextureDesc::screen_scaled(MAX_SCREEN_SCALE, 2.0, TextureFormat::R8Unorm).validate().is_ok());
    }

    #[test]
    fn texture_desc_defaults() {
        // only the format: full screen
        let desc = TextureDesc { format: Some(TextureFormat::R32Float), ..Default::default() };
        desc.validate().unwrap();
        assert_eq!(desc.resolve(&params(MsaaSamples::None)).key.width, 1280);

        // only the size: default format
        let desc = TextureDesc { size: Some(TextureSize::Explicit { width: 4, height: 4 }), ..Default::default() };
        desc.validate().unwrap();
        assert_eq!(desc.resolve(&params(MsaaSamples::None)).key.format, TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn resolve_screen_relative_desc() {
        let desc = TextureDesc::screen_scaled(0.5, 0.25, TextureFormat::Rgba16Float)
            .with_msaa(true)
            .with_clear([0.0, 0.0, 0.0, 1.0]);

        let resolved = desc.resolve(&params(MsaaSamples::X4));
        assert_eq!((resolved.key.width, resolved.key.height), (640, 180));
        assert_eq!(resolved.key.samples, 4);
        assert!(resolved.key.bind_ms);
        assert_eq!(resolved.clear_color, Some([0.0, 0.0, 0.0, 1.0]));

        // msaa disabled for the frame, the texture falls back to one sample
        let resolved = desc.resolve(&params(MsaaSamples::None));
        assert_eq!(resolved.key.samples, 1);
        assert!(!resolved.key.bind_ms);
    }

    #[test]
    fn tiny_scale_keeps_one_pixel() {
        assert_eq!(TextureSize::Scale { x: 0.0001, y: 0.0001 }.resolve(100, 100), (1, 1));
    }

    #[test]
    fn reject_renderer_list_without_pass_names() {
        assert!(RendererListDesc::new(&[], RenderQueueRange::All).validate().is_err());
        assert!(RendererListDesc::new(&["Forward"], RenderQueueRange::Opaque).validate().is_ok());
    }
}
