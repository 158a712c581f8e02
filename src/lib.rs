/*!
# segmap3d

Ground-truth semantic segmentation frames for real-time 3D renderers.

On demand, every frame is rendered twice: once into an offscreen target where each
visible surface is replaced by a flat color keyed to its semantic class, then once
normally into the main target. The flat-colored frame can be read back as BGRA bytes,
pixel-aligned with the normal frame, to train or evaluate segmentation models.

## How it plugs into an engine

The host engine keeps drawing its scene the way it always does, and fires four hooks:

* [`DualPassRenderer::on_render_frame`](renderer::DualPassRenderer::on_render_frame)
  wraps the scene draw of a frame;
* [`FrameHooks::on_object_render_begin`](renderer::FrameHooks::on_object_render_begin)
  and [`FrameHooks::on_object_render_end`](renderer::FrameHooks::on_object_render_end)
  (or the scoped [`FrameHooks::with_object`](renderer::FrameHooks::with_object))
  surround the draw of each classified object;
* [`FrameHooks::on_surface_bind`](renderer::FrameHooks::on_surface_bind) fires whenever
  a texture is bound.

During the segmentation pass, each surface bind selects a color:

* the color of the current object's class, or a deterministic fallback;
* otherwise the color configured for the surface (the sky surface gets the sky color);
* the multi-class atlas keeps its own coloring;
* anything else is black.

All GPU work goes through the [`RenderBackend`](backend::RenderBackend) trait.
[`WgpuBackend`](backend::WgpuBackend) implements it with wgpu.

## Features

* `serde`: (de)serialization of [`ColorSpec`](colormap::ColorSpec) and
  [`SegmentationConfig`](config::SegmentationConfig).
*/
#![allow(clippy::module_inception)]
#![allow(clippy::type_complexity)]

pub use glamx;
#[doc(hidden)]
pub use pollster;

pub mod backend;
pub mod builtin;
pub mod color;
pub mod colormap;
pub mod config;
pub mod context;
pub mod control;
pub mod error;
pub mod readout;
pub mod renderer;
pub mod resource;

pub mod prelude {
    pub use crate::backend::*;
    pub use crate::color::*;
    pub use crate::colormap::*;
    pub use crate::config::*;
    pub use crate::context::*;
    pub use crate::control::*;
    pub use crate::error::{Result, SegmentationError};
    pub use crate::readout::*;
    pub use crate::renderer::*;
    pub use glamx::Mat4;
}
