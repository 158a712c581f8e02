//! Owner of the offscreen target receiving the segmentation pass.

use crate::backend::RenderBackend;
use crate::error::Result;

/// Clear color of the segmentation target: fully transparent.
pub const TRANSPARENT: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

struct SizedTarget<T> {
    target: T,
    width: u32,
    height: u32,
}

/// Allocates, resizes and binds the segmentation render target.
///
/// The target is created on the first [`Self::ensure`] and only reallocated when the
/// requested size changes. The manager also remembers whether the target was drawn
/// into during the current frame, which decides the read-back source.
pub struct OffscreenTargetManager<T> {
    current: Option<SizedTarget<T>>,
    used_this_frame: bool,
}

impl<T> Default for OffscreenTargetManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OffscreenTargetManager<T> {
    /// Creates a manager without any target.
    pub fn new() -> Self {
        OffscreenTargetManager {
            current: None,
            used_this_frame: false,
        }
    }

    /// Makes sure a `width` x `height` target exists.
    ///
    /// Repeated calls with the same size do nothing. A different size destroys the
    /// old target before the new one is allocated.
    pub fn ensure<B>(&mut self, backend: &mut B, width: u32, height: u32) -> Result<()>
    where
        B: RenderBackend<Target = T>,
    {
        if let Some(current) = &self.current {
            if current.width == width && current.height == height {
                return Ok(());
            }
        }

        if let Some(old) = self.current.take() {
            log::debug!(
                "resizing segmentation target {}x{} -> {}x{}",
                old.width,
                old.height,
                width,
                height
            );
            backend.destroy_target(old.target);
        } else {
            log::debug!("allocating segmentation target {}x{}", width, height);
        }

        let target = backend.create_target(width, height)?;
        self.current = Some(SizedTarget {
            target,
            width,
            height,
        });
        Ok(())
    }

    /// Binds the target and clears it to transparent.
    ///
    /// Does nothing if no target was allocated.
    pub fn begin_pass<B>(&mut self, backend: &mut B)
    where
        B: RenderBackend<Target = T>,
    {
        if let Some(current) = &self.current {
            backend.bind_target(Some(&current.target));
            backend.clear_bound_target(TRANSPARENT);
            self.used_this_frame = true;
        }
    }

    /// Rebinds the main target so the normal pass is unaffected.
    pub fn end_pass<B>(&mut self, backend: &mut B)
    where
        B: RenderBackend<Target = T>,
    {
        if self.current.is_some() {
            backend.bind_target(None);
        }
    }

    /// Forgets that the target was drawn into. Called at the start of every frame.
    pub fn begin_frame(&mut self) {
        self.used_this_frame = false;
    }

    /// Whether the segmentation pass of the current frame wrote into the target.
    pub fn used_this_frame(&self) -> bool {
        self.used_this_frame && self.current.is_some()
    }

    /// The current target, if any.
    pub fn target(&self) -> Option<&T> {
        self.current.as_ref().map(|c| &c.target)
    }

    /// The size of the current target, if any.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.current.as_ref().map(|c| (c.width, c.height))
    }

    /// Destroys the target, if any.
    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: RenderBackend<Target = T>,
    {
        if let Some(old) = self.current.take() {
            log::debug!("releasing segmentation target {}x{}", old.width, old.height);
            backend.destroy_target(old.target);
        }
        self.used_this_frame = false;
    }
}
