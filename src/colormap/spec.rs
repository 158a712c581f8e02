//! Color tables supplied by configuration.

use crate::color::{self, SegColor};

/// Path of the sun texture, colored by [`ColorSpec::with_celestial_defaults`].
pub const SUN_SURFACE: &str = "textures/environment/sun.png";
/// Path of the moon texture, colored by [`ColorSpec::with_celestial_defaults`].
pub const MOON_SURFACE: &str = "textures/environment/moon_phases.png";

/// Class and surface color tables for one mission.
///
/// A `ColorSpec` is built once and handed to
/// [`ColorMapState::configure`](crate::colormap::ColorMapState::configure), which
/// replaces any previously configured tables wholesale.
///
/// # Example
/// ```
/// use segmap3d::colormap::ColorSpec;
///
/// let spec = ColorSpec::new()
///     .class_colors(["minecraft:pig", "minecraft:cow"], &[255, 0, 128])
///     .surface_color("textures/misc/water.png", &[0, 0, 255])
///     .sky(&[40, 50, 60])
///     .with_celestial_defaults();
/// assert_eq!(spec.classes().count(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorSpec {
    class_colors: Vec<(Vec<String>, SegColor)>,
    surface_colors: Vec<(String, SegColor)>,
    sky: SegColor,
}

impl ColorSpec {
    /// An empty spec: no classes, no surfaces, black sky.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns one color to a set of class identifiers.
    ///
    /// `rgb` is a raw `[R, G, B]` triple; missing bytes are zero-filled.
    pub fn class_colors<I, S>(mut self, classes: I, rgb: &[u8]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.class_colors.push((
            classes.into_iter().map(Into::into).collect(),
            color::from_bytes(rgb),
        ));
        self
    }

    /// Assigns a color to a surface path.
    pub fn surface_color(mut self, surface: impl Into<String>, rgb: &[u8]) -> Self {
        self.surface_colors
            .push((surface.into(), color::from_bytes(rgb)));
        self
    }

    /// Sets the sky color.
    pub fn sky(mut self, rgb: &[u8]) -> Self {
        self.sky = color::from_bytes(rgb);
        self
    }

    /// Adds the sun and moon surface colors unless they were already given.
    pub fn with_celestial_defaults(mut self) -> Self {
        for (surface, c) in [(SUN_SURFACE, color::SUN), (MOON_SURFACE, color::MOON)] {
            if !self.surface_colors.iter().any(|(s, _)| s == surface) {
                self.surface_colors.push((surface.to_string(), c));
            }
        }
        self
    }

    /// Iterates over `(class, color)` pairs. Later entries win on duplicates.
    pub fn classes(&self) -> impl Iterator<Item = (&str, SegColor)> {
        self.class_colors
            .iter()
            .flat_map(|(ids, c)| ids.iter().map(move |id| (id.as_str(), *c)))
    }

    /// Iterates over `(surface, color)` pairs. Later entries win on duplicates.
    pub fn surfaces(&self) -> impl Iterator<Item = (&str, SegColor)> {
        self.surface_colors.iter().map(|(s, c)| (s.as_str(), *c))
    }

    /// The sky color.
    pub fn sky_color(&self) -> SegColor {
        self.sky
    }
}
