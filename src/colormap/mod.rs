//! Color map state and the per-draw color decision.

pub use self::decision::{decide, fallback_color, Decision};
pub use self::spec::{ColorSpec, MOON_SURFACE, SUN_SURFACE};
pub use self::state::{ClassId, ColorMapState, StateObjectScope};

mod decision;
mod spec;
mod state;
