//! Per-draw color decision.

use crate::color::{self, SegColor};
use crate::colormap::{ClassId, ColorMapState};

/// Outcome of [`decide`] for one surface bind.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Draw the upcoming geometry in this flat color.
    Color(SegColor),
    /// Leave the engine's own per-pixel coloring in place.
    Passthrough,
}

impl Decision {
    /// The decided color as `0xFFRRGGBB`, or `None` for pass-through.
    pub fn argb(&self) -> Option<u32> {
        match self {
            Decision::Color(c) => Some(color::opaque_argb(*c)),
            Decision::Passthrough => None,
        }
    }
}

/// Picks the override color for draws following a bind of `surface`.
///
/// In order:
/// 1. an object is being drawn: its class color, or [`fallback_color`] when unmapped;
/// 2. the surface has a configured color (the sky surface resolves to the sky color);
/// 3. the surface is the multi-class atlas: [`Decision::Passthrough`];
/// 4. otherwise [`color::UNCLASSIFIED`].
pub fn decide(state: &ColorMapState, surface: &str) -> Decision {
    if let Some(class) = state.current_object() {
        let c = state
            .class_color(class)
            .unwrap_or_else(|| fallback_color(class));
        return Decision::Color(c);
    }

    if let Some(c) = state.surface_color(surface) {
        return Decision::Color(c);
    }

    if surface == state.sky_surface() {
        return Decision::Color(state.sky_color());
    }

    if surface == state.atlas_surface() {
        return Decision::Passthrough;
    }

    Decision::Color(color::UNCLASSIFIED)
}

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Color of a class with no configured mapping.
///
/// A 32-bit FNV-1a hash of the identifier, truncated to 24 bits. The result only
/// depends on the identifier bytes, so it is stable across runs, platforms and
/// toolchains. Distinct classes may collide.
pub fn fallback_color(class: &ClassId) -> SegColor {
    let hash = class
        .as_str()
        .bytes()
        .fold(FNV_OFFSET_BASIS, |h, b| (h ^ b as u32).wrapping_mul(FNV_PRIME));
    color::unpack(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::ColorSpec;
    use crate::config::{SegmentationConfig, DEFAULT_ATLAS_SURFACE, DEFAULT_SKY_SURFACE};

    fn configured() -> ColorMapState {
        let mut state = ColorMapState::new(&SegmentationConfig::default());
        state.configure(
            &ColorSpec::new()
                .class_colors(["minecraft:pig", "minecraft:cow"], &[10, 20, 30])
                .surface_color("textures/misc/water.png", &[0, 0, 200])
                .sky(&[40, 50, 60])
                .with_celestial_defaults(),
        );
        state
    }

    #[test]
    fn mapped_class_gets_its_color() {
        let mut state = configured();
        state.begin_object(ClassId::from("minecraft:cow"));
        let d = decide(&state, "textures/entity/cow.png");
        assert_eq!(d, Decision::Color(SegColor::new(10, 20, 30)));
        assert_eq!(d.argb(), Some(0xFF0A_141E));
    }

    #[test]
    fn object_wins_over_surface_table() {
        let mut state = configured();
        state.begin_object(ClassId::from("minecraft:pig"));
        assert_eq!(
            decide(&state, "textures/misc/water.png"),
            Decision::Color(SegColor::new(10, 20, 30))
        );
        assert_eq!(
            decide(&state, DEFAULT_ATLAS_SURFACE),
            Decision::Color(SegColor::new(10, 20, 30))
        );
    }

    #[test]
    fn unmapped_class_is_deterministic() {
        let mut state = configured();
        let zombie = ClassId::from("minecraft:zombie");
        state.begin_object(zombie.clone());
        let first = decide(&state, "a.png");
        let second = decide(&state, "b.png");
        assert_eq!(first, second);
        assert_eq!(first, Decision::Color(fallback_color(&zombie)));

        // FNV-1a("a") = 0xe40c292c
        assert_eq!(color::pack(fallback_color(&ClassId::from("a"))), 0x0c_292c);
    }

    #[test]
    fn surfaces_without_object() {
        let state = configured();
        assert_eq!(
            decide(&state, "textures/misc/water.png"),
            Decision::Color(SegColor::new(0, 0, 200))
        );
        assert_eq!(
            decide(&state, DEFAULT_SKY_SURFACE),
            Decision::Color(SegColor::new(40, 50, 60))
        );
        assert_eq!(
            decide(&state, "textures/environment/sun.png"),
            Decision::Color(color::SUN)
        );
        assert_eq!(decide(&state, DEFAULT_ATLAS_SURFACE), Decision::Passthrough);
        assert_eq!(
            decide(&state, "textures/gui/widgets.png"),
            Decision::Color(color::UNCLASSIFIED)
        );
        assert_eq!(Decision::Passthrough.argb(), None);
    }
}
