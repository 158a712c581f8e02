//! Per-frame orchestration of the segmentation and normal passes.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::backend::RenderBackend;
use crate::colormap::{ColorMapState, ColorSpec};
use crate::config::SegmentationConfig;
use crate::control::{ControlHandle, ControlInbox};
use crate::error::Result;
use crate::readout::{self, CapturedFrame};
use crate::renderer::{FrameHooks, SegmentationContext};
use crate::resource::OffscreenTargetManager;

/// The pass a [`DualPassRenderer`] is in, or last ran.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PassState {
    /// Segmentation is off: each frame is one normal pass.
    Disabled,
    /// The scene is being drawn into the offscreen target with flat colors.
    SegmentationPass,
    /// The scene is being drawn into the main target, unmodified.
    NormalPass,
}

/// Wraps a host's scene rendering to produce a segmentation frame alongside each
/// normal frame.
///
/// The host hands its whole scene draw to [`Self::on_render_frame`] as a callback.
/// With segmentation disabled the callback runs once, exactly as without this
/// renderer. With segmentation enabled it runs twice: first into the offscreen target
/// with color overrides, then into the main target, unmodified.
///
/// The segmentation pass is closed on every exit path of the scene callback, so a
/// failing or panicking pass never leaves the offscreen target bound.
///
/// # Example
/// ```no_run
/// use segmap3d::prelude::*;
///
/// # fn main() -> segmap3d::error::Result<()> {
/// let ctxt = pollster::block_on(Context::headless())?;
/// let config = SegmentationConfig::default();
/// let backend = WgpuBackend::new(ctxt, 640, 480, &config);
/// let mut renderer = DualPassRenderer::new(backend, config);
///
/// renderer.configure(&ColorSpec::new().class_colors(["minecraft:pig"], &[10, 20, 30]));
/// renderer.enable();
///
/// renderer.on_render_frame(|hooks| {
///     hooks.on_surface_bind("textures/environment/sky.png");
///     // ... draw the sky through hooks.backend() ...
///     hooks.with_object(ClassId::from("minecraft:pig"), |hooks| {
///         hooks.on_surface_bind("textures/entity/pig/pig.png");
///         // ... draw the pig ...
///     });
///     Ok(())
/// })?;
///
/// let mut pixels = vec![0; 640 * 480 * 4];
/// let (width, height) = renderer.read_frame(640, 480, &mut pixels)?;
/// # Ok(())
/// # }
/// ```
pub struct DualPassRenderer<B: RenderBackend> {
    backend: B,
    context: SegmentationContext<B::Program>,
    targets: Mutex<OffscreenTargetManager<B::Target>>,
    inbox: ControlInbox,
    pass: PassState,
}

impl<B: RenderBackend> DualPassRenderer<B> {
    /// Creates a renderer with segmentation disabled.
    pub fn new(backend: B, config: SegmentationConfig) -> Self {
        DualPassRenderer {
            backend,
            context: SegmentationContext::new(&config),
            targets: Mutex::new(OffscreenTargetManager::new()),
            inbox: ControlInbox::new(),
            pass: PassState::Disabled,
        }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably (e.g. to resize the main target between frames).
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The color map state.
    pub fn state(&self) -> &ColorMapState {
        &self.context.state
    }

    /// The render-thread segmentation context.
    pub fn context(&self) -> &SegmentationContext<B::Program> {
        &self.context
    }

    /// The pass currently running, or the last one that ran.
    pub fn pass_state(&self) -> PassState {
        self.pass
    }

    /// A handle for configuring the renderer and requesting frames from other threads.
    pub fn control_handle(&self) -> ControlHandle {
        self.inbox.handle()
    }

    /// The offscreen target manager.
    pub fn targets(&self) -> MutexGuard<'_, OffscreenTargetManager<B::Target>> {
        lock(&self.targets)
    }

    /// Replaces the color tables. Render thread only; see [`ControlHandle`] otherwise.
    pub fn configure(&mut self, spec: &ColorSpec) {
        self.context.state.configure(spec);
    }

    /// Turns segmentation on from the next frame.
    pub fn enable(&mut self) {
        self.context.state.enable();
    }

    /// Turns segmentation off from the next frame.
    pub fn disable(&mut self) {
        self.context.state.disable();
    }

    /// Applies configuration and enable changes queued through [`ControlHandle`].
    ///
    /// Called automatically at the start of [`Self::on_render_frame`].
    pub fn service_control(&mut self) {
        let pending = self.inbox.take_pending();
        if let Some(spec) = pending.spec {
            self.context.state.configure(&spec);
        }
        match pending.enabled {
            Some(true) => self.context.state.enable(),
            Some(false) => self.context.state.disable(),
            None => {}
        }
    }

    /// Renders one frame.
    ///
    /// `render_scene` draws the full scene once, firing the hooks as it goes. It is
    /// called once when segmentation is disabled and twice when it is enabled. Queued
    /// frame requests are answered once the frame is done.
    ///
    /// # Errors
    /// Offscreen target allocation failures, in which case nothing is drawn, and errors
    /// returned by `render_scene`. The normal pass runs even if the segmentation pass
    /// failed; the first error is returned once both passes are done.
    pub fn on_render_frame<F>(&mut self, mut render_scene: F) -> Result<()>
    where
        F: FnMut(&mut FrameHooks<'_, B>) -> Result<()>,
    {
        self.service_control();
        lock(&self.targets).begin_frame();

        let result = if self.context.state.is_enabled() {
            self.render_dual(&mut render_scene)
        } else {
            self.pass = PassState::Disabled;
            render_scene(&mut FrameHooks::new(&mut self.context, &mut self.backend))
        };

        self.backend.end_frame();
        self.service_frame_requests();
        result
    }

    fn render_dual<F>(&mut self, render_scene: &mut F) -> Result<()>
    where
        F: FnMut(&mut FrameHooks<'_, B>) -> Result<()>,
    {
        let mut pass =
            SegmentationPassGuard::begin(&mut self.context, &mut self.backend, &self.targets)?;
        self.pass = PassState::SegmentationPass;
        let segmentation = render_scene(&mut pass.hooks());
        drop(pass);
        if let Err(e) = &segmentation {
            log::warn!("segmentation pass failed: {}", e);
        }

        self.pass = PassState::NormalPass;
        let normal = render_scene(&mut FrameHooks::new(&mut self.context, &mut self.backend));
        segmentation.and(normal)
    }

    /// Copies the most recent frame into `out` and returns the dimensions read.
    ///
    /// See [`readout::read_frame`] for the source selection and buffer contract.
    pub fn read_frame(&mut self, width: u32, height: u32, out: &mut [u8]) -> Result<(u32, u32)> {
        let targets = lock(&self.targets);
        readout::read_frame(&mut self.backend, &*targets, width, height, out)
    }

    /// Answers every frame request queued through [`ControlHandle::request_frame`].
    ///
    /// Called automatically at the end of [`Self::on_render_frame`].
    pub fn service_frame_requests(&mut self) {
        while let Some(request) = self.inbox.next_frame_request() {
            let mut buffer = request.buffer;
            let frame = self
                .read_frame(request.width, request.height, &mut buffer)
                .map(|(width, height)| CapturedFrame {
                    buffer,
                    width,
                    height,
                });
            if let Err(e) = &frame {
                log::warn!(
                    "{}x{} frame request failed: {}",
                    request.width,
                    request.height,
                    e
                );
            }
            // The requester may have given up waiting.
            let _ = request.reply.send(frame);
        }
    }

    /// Disables segmentation and releases the offscreen target.
    pub fn shutdown(&mut self) {
        self.context.state.disable();
        self.backend.use_program(None);
        lock(&self.targets).release(&mut self.backend);
        self.pass = PassState::Disabled;
    }
}

/// The segmentation pass of one frame.
///
/// Dropping it ends the pass, deactivates the override program and rebinds the main
/// target, including when the scene callback panics.
struct SegmentationPassGuard<'r, B: RenderBackend> {
    context: &'r mut SegmentationContext<B::Program>,
    backend: &'r mut B,
    targets: &'r Mutex<OffscreenTargetManager<B::Target>>,
}

impl<'r, B: RenderBackend> SegmentationPassGuard<'r, B> {
    fn begin(
        context: &'r mut SegmentationContext<B::Program>,
        backend: &'r mut B,
        targets: &'r Mutex<OffscreenTargetManager<B::Target>>,
    ) -> Result<Self> {
        let (width, height) = backend.main_target_size();
        {
            let mut targets = lock(targets);
            targets.ensure(&mut *backend, width, height)?;
            targets.begin_pass(&mut *backend);
        }
        context.state.begin_segmentation_pass();

        Ok(SegmentationPassGuard {
            context,
            backend,
            targets,
        })
    }

    fn hooks(&mut self) -> FrameHooks<'_, B> {
        FrameHooks::new(&mut *self.context, &mut *self.backend)
    }
}

impl<B: RenderBackend> Drop for SegmentationPassGuard<'_, B> {
    fn drop(&mut self) {
        self.context.state.end_segmentation_pass();
        self.backend.use_program(None);
        lock(self.targets).end_pass(&mut *self.backend);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
