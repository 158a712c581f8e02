//! The GPU seam of the segmentation pipeline.
//!
//! Everything the pipeline does to the GPU goes through [`RenderBackend`]. The
//! [`WgpuBackend`] implementation drives a real device; hosts with their own
//! renderer can provide another implementation.

pub use self::wgpu_backend::{OverrideDraw, OverrideUniforms, WgpuBackend, WgpuProgram};
pub use crate::resource::WgpuTarget;

mod wgpu_backend;

use crate::error::Result;

/// Pipeline stage of a shader object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
}

/// Backend-specific handle of a uniform inside a linked program.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// GPU operations needed by the segmentation pipeline.
///
/// All methods are called from the render thread only. "Program" state is modal: after
/// `use_program(Some(p))`, subsequent draws of the host use `p` until the next
/// `use_program` call. `use_program(None)` restores the host's own pipelines.
pub trait RenderBackend {
    /// A compiled, unlinked shader object.
    type Shader;
    /// A linked program.
    type Program;
    /// An offscreen render target (color + depth).
    type Target;

    /// Compiles one shader stage. Returns the compiler log on failure.
    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> std::result::Result<Self::Shader, String>;

    /// Links a vertex and a fragment shader. Returns the linker log on failure.
    fn link_program(
        &mut self,
        label: &str,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> std::result::Result<Self::Program, String>;

    /// Resolves a named uniform of a linked program.
    fn uniform_location(&self, program: &Self::Program, name: &str) -> Option<UniformLocation>;

    /// Releases a shader object. Linked programs stay valid.
    fn release_shader(&mut self, shader: Self::Shader);

    /// Activates `program` for subsequent draws, or restores the host pipelines.
    fn use_program(&mut self, program: Option<&Self::Program>);

    /// Sets an integer uniform of `program` for subsequent draws.
    fn set_uniform_i32(&mut self, program: &Self::Program, location: UniformLocation, value: i32);

    /// Size of the host's main render target.
    fn main_target_size(&self) -> (u32, u32);

    /// Allocates an offscreen target.
    fn create_target(&mut self, width: u32, height: u32) -> Result<Self::Target>;

    /// Releases an offscreen target.
    fn destroy_target(&mut self, target: Self::Target);

    /// Makes `target` the render destination, or the main target for `None`.
    fn bind_target(&mut self, target: Option<&Self::Target>);

    /// Clears the bound render destination to `rgba` and resets its depth.
    fn clear_bound_target(&mut self, rgba: [f32; 4]);

    /// Copies the top-left `width` x `height` pixels of `source` (the main target for
    /// `None`) into `out` as tightly packed BGRA rows.
    ///
    /// `out` holds exactly `width * height * 4` bytes.
    fn read_pixels(
        &mut self,
        source: Option<&Self::Target>,
        width: u32,
        height: u32,
        out: &mut [u8],
    ) -> Result<()>;

    /// Called once all passes of a frame were issued.
    fn end_frame(&mut self) {}
}
