//! GPU resource managers

pub use crate::resource::dynamic_buffer::DynamicUniformBuffer;
pub use crate::resource::offscreen_target::{OffscreenTargetManager, TRANSPARENT};
pub use crate::resource::render_target::WgpuTarget;

mod dynamic_buffer;
mod offscreen_target;
mod render_target;
