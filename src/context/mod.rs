//! GPU context shared with the host renderer.

pub use self::context::Context;

mod context;
