//! Static configuration of the segmentation pipeline.

/// Default path of the multi-class block atlas.
pub const DEFAULT_ATLAS_SURFACE: &str = "textures/atlas/blocks.png";
/// Default path of the sky surface.
pub const DEFAULT_SKY_SURFACE: &str = "textures/environment/sky.png";

/// Engine-specific settings of the segmentation pipeline.
///
/// Unlike [`ColorSpec`](crate::colormap::ColorSpec), which changes per mission, these
/// values describe the host engine and are fixed when the
/// [`DualPassRenderer`](crate::renderer::DualPassRenderer) is created.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentationConfig {
    /// Surface whose single draw call covers many classes at once.
    ///
    /// Without a current object, binding this surface never yields a flat color.
    pub atlas_surface: String,
    /// Surface drawn for the sky. Resolves to the configured sky color.
    pub sky_surface: String,
    /// Whether the override shader derives atlas colors from texture coordinates.
    ///
    /// When `true`, atlas draws keep the override program bound and receive the `-1`
    /// sentinel on all three color channels. When `false`, the override program is
    /// unbound for atlas draws and the engine's own coloring stands.
    pub atlas_uv_fallback: bool,
    /// Number of per-draw override entries allocated up front by
    /// [`WgpuBackend::new`](crate::backend::WgpuBackend::new).
    pub uniform_capacity: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        SegmentationConfig {
            atlas_surface: DEFAULT_ATLAS_SURFACE.to_string(),
            sky_surface: DEFAULT_SKY_SURFACE.to_string(),
            atlas_uv_fallback: false,
            uniform_capacity: 256,
        }
    }
}
