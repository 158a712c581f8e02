//! Lazily built override shader used to draw flat segmentation colors.

use crate::backend::{RenderBackend, ShaderStage, UniformLocation};
use crate::color::{self, SegColor};

/// WGSL source of the override vertex stage.
pub const OVERRIDE_VERTEX_SOURCE: &str = include_str!("override_color_vs.wgsl");
/// WGSL source of the override fragment stage.
pub const OVERRIDE_FRAGMENT_SOURCE: &str = include_str!("override_color_fs.wgsl");

/// Names of the three integer color uniforms, in R, G, B order.
pub const COLOR_UNIFORMS: [&str; 3] = ["color_r", "color_g", "color_b"];

/// Value pushed on every color channel to request atlas UV coloring.
pub const ATLAS_SENTINEL: i32 = -1;

/// A linked override program and its color uniform handles.
pub struct OverrideProgram<P> {
    program: P,
    color_uniforms: Option<[UniformLocation; 3]>,
}

impl<P> OverrideProgram<P> {
    /// The linked program.
    pub fn program(&self) -> &P {
        &self.program
    }

    /// Activates this program and pushes `rgb` on the three color uniforms.
    pub fn apply<B>(&self, backend: &mut B, rgb: [i32; 3])
    where
        B: RenderBackend<Program = P>,
    {
        backend.use_program(Some(&self.program));

        // A program whose uniforms were optimized away still draws, with whatever
        // values the uniforms hold.
        if let Some(locations) = self.color_uniforms {
            for (location, value) in locations.into_iter().zip(rgb) {
                backend.set_uniform_i32(&self.program, location, value);
            }
        }
    }

    /// Activates this program with a flat color.
    pub fn apply_color<B>(&self, backend: &mut B, c: SegColor)
    where
        B: RenderBackend<Program = P>,
    {
        self.apply(backend, color::to_uniforms(c))
    }
}

enum ProgramState<P> {
    Uninitialized,
    Ready(OverrideProgram<P>),
    Unavailable,
}

/// Builds the override program on first use and keeps it for the process lifetime.
///
/// A failed build latches the cache to "unavailable": it is never retried, and every
/// draw keeps its normal coloring.
pub struct OverrideProgramCache<P> {
    state: ProgramState<P>,
}

impl<P> Default for OverrideProgramCache<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> OverrideProgramCache<P> {
    /// Creates an empty cache. Nothing is compiled until [`Self::ensure_ready`].
    pub fn new() -> Self {
        OverrideProgramCache {
            state: ProgramState::Uninitialized,
        }
    }

    /// Whether a previous build failed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self.state, ProgramState::Unavailable)
    }

    /// Whether the program is built and usable.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ProgramState::Ready(_))
    }

    /// Builds the program if needed and returns it, or `None` if it is unavailable.
    pub fn ensure_ready<B>(&mut self, backend: &mut B) -> Option<&OverrideProgram<P>>
    where
        B: RenderBackend<Program = P>,
    {
        if let ProgramState::Uninitialized = self.state {
            self.state = match build(backend) {
                Ok(program) => ProgramState::Ready(program),
                Err(log) => {
                    log::error!("segmentation override shader unavailable: {}", log);
                    ProgramState::Unavailable
                }
            };
        }

        match &self.state {
            ProgramState::Ready(program) => Some(program),
            _ => None,
        }
    }
}

fn build<B: RenderBackend>(backend: &mut B) -> Result<OverrideProgram<B::Program>, String> {
    let vertex = backend
        .compile_shader(ShaderStage::Vertex, "override_color_vs", OVERRIDE_VERTEX_SOURCE)
        .map_err(|e| format!("vertex shader compile error: {}", e))?;

    let fragment = match backend.compile_shader(
        ShaderStage::Fragment,
        "override_color_fs",
        OVERRIDE_FRAGMENT_SOURCE,
    ) {
        Ok(fragment) => fragment,
        Err(e) => {
            backend.release_shader(vertex);
            return Err(format!("fragment shader compile error: {}", e));
        }
    };

    let linked = backend.link_program("override_color_program", &vertex, &fragment);

    // Only the linked program is kept.
    backend.release_shader(vertex);
    backend.release_shader(fragment);

    let program = linked.map_err(|e| format!("link error: {}", e))?;

    let [r, g, b] = COLOR_UNIFORMS.map(|name| backend.uniform_location(&program, name));
    let color_uniforms = match (r, g, b) {
        (Some(r), Some(g), Some(b)) => Some([r, g, b]),
        _ => {
            log::warn!("override shader is missing color uniforms, colors will not be set");
            None
        }
    };

    log::debug!("segmentation override shader ready");

    Ok(OverrideProgram {
        program,
        color_uniforms,
    })
}
