//! Engine callbacks fired while a scene is drawn.

use std::ops::{Deref, DerefMut};

use crate::backend::RenderBackend;
use crate::builtin::{OverrideProgramCache, ATLAS_SENTINEL};
use crate::colormap::{decide, ClassId, ColorMapState, Decision};
use crate::config::SegmentationConfig;

/// Render-thread state of the segmentation pipeline.
///
/// Owned by the [`DualPassRenderer`](super::DualPassRenderer) and lent to the scene
/// callback through [`FrameHooks`] for the duration of one pass.
pub struct SegmentationContext<P> {
    pub(crate) state: ColorMapState,
    pub(crate) program: OverrideProgramCache<P>,
    pub(crate) atlas_uv_fallback: bool,
}

impl<P> SegmentationContext<P> {
    /// Creates a disabled context.
    pub fn new(config: &SegmentationConfig) -> Self {
        SegmentationContext {
            state: ColorMapState::new(config),
            program: OverrideProgramCache::new(),
            atlas_uv_fallback: config.atlas_uv_fallback,
        }
    }

    /// The color map state.
    pub fn state(&self) -> &ColorMapState {
        &self.state
    }

    /// The override program cache.
    pub fn program(&self) -> &OverrideProgramCache<P> {
        &self.program
    }
}

/// The hook points a host engine fires while drawing one pass of a frame.
///
/// A `FrameHooks` is handed to the scene callback of
/// [`DualPassRenderer::on_render_frame`](super::DualPassRenderer::on_render_frame). The
/// host calls [`Self::on_surface_bind`] whenever it binds a texture, wraps each object
/// draw in an object scope, and issues its draws through [`Self::backend`].
pub struct FrameHooks<'a, B: RenderBackend> {
    context: &'a mut SegmentationContext<B::Program>,
    backend: &'a mut B,
}

impl<'a, B: RenderBackend> FrameHooks<'a, B> {
    pub(crate) fn new(
        context: &'a mut SegmentationContext<B::Program>,
        backend: &'a mut B,
    ) -> Self {
        FrameHooks { context, backend }
    }

    /// The backend, for issuing draws.
    pub fn backend(&mut self) -> &mut B {
        self.backend
    }

    /// The color map state.
    pub fn state(&self) -> &ColorMapState {
        &self.context.state
    }

    /// Whether this pass is the segmentation pass.
    pub fn is_segmentation_pass(&self) -> bool {
        self.context.state.is_producing()
    }

    /// The engine started drawing an object of class `class`.
    ///
    /// Must be paired with [`Self::on_object_render_end`]. Prefer
    /// [`Self::object_scope`] or [`Self::with_object`], which end the scope on every
    /// exit path.
    pub fn on_object_render_begin(&mut self, class: ClassId) {
        self.context.state.begin_object(class);
    }

    /// The engine finished drawing the current object. Always clears it.
    pub fn on_object_render_end(&mut self) {
        self.context.state.end_object();
    }

    /// Begins an object scope that ends when the returned guard is dropped.
    pub fn object_scope(&mut self, class: ClassId) -> ObjectScope<'_, 'a, B> {
        self.on_object_render_begin(class);
        ObjectScope { hooks: self }
    }

    /// Draws an object of class `class` with `draw`.
    ///
    /// The object scope ends when `draw` returns, fails or panics.
    pub fn with_object<R>(&mut self, class: ClassId, draw: impl FnOnce(&mut Self) -> R) -> R {
        let mut scope = self.object_scope(class);
        draw(&mut *scope)
    }

    /// The engine bound `surface` for the upcoming draws.
    ///
    /// During the segmentation pass this activates the override program with the
    /// decided color, or restores the engine's program for pass-through surfaces.
    /// Outside of it the override program is always deactivated.
    pub fn on_surface_bind(&mut self, surface: &str) {
        if !self.context.state.is_producing() {
            self.backend.use_program(None);
            return;
        }

        let Some(program) = self.context.program.ensure_ready(&mut *self.backend) else {
            self.backend.use_program(None);
            return;
        };

        match decide(&self.context.state, surface) {
            Decision::Color(c) => program.apply_color(&mut *self.backend, c),
            Decision::Passthrough if self.context.atlas_uv_fallback => {
                program.apply(&mut *self.backend, [ATLAS_SENTINEL; 3])
            }
            Decision::Passthrough => self.backend.use_program(None),
        }
    }
}

/// Guard returned by [`FrameHooks::object_scope`].
///
/// Gives access to the hooks while the object is current and ends the object scope
/// when dropped.
pub struct ObjectScope<'h, 'a, B: RenderBackend> {
    hooks: &'h mut FrameHooks<'a, B>,
}

impl<'a, B: RenderBackend> Deref for ObjectScope<'_, 'a, B> {
    type Target = FrameHooks<'a, B>;

    fn deref(&self) -> &FrameHooks<'a, B> {
        self.hooks
    }
}

impl<'a, B: RenderBackend> DerefMut for ObjectScope<'_, 'a, B> {
    fn deref_mut(&mut self) -> &mut FrameHooks<'a, B> {
        self.hooks
    }
}

impl<B: RenderBackend> Drop for ObjectScope<'_, '_, B> {
    fn drop(&mut self) {
        self.hooks.on_object_render_end();
    }
}
