//! Built-in shaders.

pub use self::override_program::{
    OverrideProgram, OverrideProgramCache, ATLAS_SENTINEL, COLOR_UNIFORMS,
    OVERRIDE_FRAGMENT_SOURCE, OVERRIDE_VERTEX_SOURCE,
};

mod override_program;
