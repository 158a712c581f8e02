//! Hook dispatching and the dual-pass frame orchestration.

pub use self::dual_pass::{DualPassRenderer, PassState};
pub use self::hooks::{FrameHooks, ObjectScope, SegmentationContext};

mod dual_pass;
mod hooks;
