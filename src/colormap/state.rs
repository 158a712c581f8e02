//! Transient and configured state of the color map.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::color::{self, SegColor};
use crate::colormap::ColorSpec;
use crate::config::SegmentationConfig;

/// Identifier of a semantic class (e.g. an entity type such as `"minecraft:pig"`).
///
/// Cheap to clone; hosts usually create one per entity type and reuse it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(Arc<str>);

impl ClassId {
    /// Creates a new class identifier.
    pub fn new(id: &str) -> Self {
        ClassId(Arc::from(id))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClassId {
    fn from(id: &str) -> Self {
        ClassId::new(id)
    }
}

impl From<String> for ClassId {
    fn from(id: String) -> Self {
        ClassId(Arc::from(id))
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({:?})", &*self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the color decision needs, for one render context.
///
/// The state is owned by the [`DualPassRenderer`](crate::renderer::DualPassRenderer) and
/// only mutated from the render thread. `current_object` and the pass flag are
/// transient: both are cleared at every pass boundary so nothing leaks across frames.
#[derive(Debug)]
pub struct ColorMapState {
    enabled: bool,
    segmentation_pass_active: bool,
    current_object: Option<ClassId>,
    class_colors: HashMap<ClassId, SegColor>,
    surface_colors: HashMap<String, SegColor>,
    sky_color: SegColor,
    atlas_surface: String,
    sky_surface: String,
}

impl Default for ColorMapState {
    fn default() -> Self {
        Self::new(&SegmentationConfig::default())
    }
}

impl ColorMapState {
    /// Creates a disabled, empty state using the surface roles of `config`.
    pub fn new(config: &SegmentationConfig) -> Self {
        ColorMapState {
            enabled: false,
            segmentation_pass_active: false,
            current_object: None,
            class_colors: HashMap::new(),
            surface_colors: HashMap::new(),
            sky_color: color::UNCLASSIFIED,
            atlas_surface: config.atlas_surface.clone(),
            sky_surface: config.sky_surface.clone(),
        }
    }

    /// Replaces all color tables with the content of `spec`.
    pub fn configure(&mut self, spec: &ColorSpec) {
        self.class_colors = spec
            .classes()
            .map(|(id, c)| (ClassId::new(id), c))
            .collect();
        self.surface_colors = spec
            .surfaces()
            .map(|(s, c)| (s.to_string(), c))
            .collect();
        self.sky_color = spec.sky_color();
        log::info!(
            "color map configured: {} classes, {} surfaces, sky #{:06x}",
            self.class_colors.len(),
            self.surface_colors.len(),
            color::pack(self.sky_color)
        );
    }

    /// Turns the override pipeline on.
    pub fn enable(&mut self) {
        if !self.enabled {
            log::info!("segmentation enabled");
        }
        self.enabled = true;
    }

    /// Turns the override pipeline off. Takes effect on the next frame.
    pub fn disable(&mut self) {
        if self.enabled {
            log::info!("segmentation disabled");
        }
        self.enabled = false;
    }

    /// Whether the override pipeline runs at all.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Marks the start of the segmentation pass of the current frame.
    pub fn begin_segmentation_pass(&mut self) {
        self.current_object = None;
        self.segmentation_pass_active = true;
    }

    /// Marks the end of the segmentation pass. Also drops any current object.
    pub fn end_segmentation_pass(&mut self) {
        self.current_object = None;
        self.segmentation_pass_active = false;
    }

    /// Whether the segmentation pass of the current frame is running.
    #[inline]
    pub fn is_segmentation_pass_active(&self) -> bool {
        self.segmentation_pass_active
    }

    /// Whether draws must currently be recolored.
    #[inline]
    pub fn is_producing(&self) -> bool {
        self.enabled && self.segmentation_pass_active
    }

    /// Records that the engine started drawing an object of class `class`.
    ///
    /// Object scopes do not nest: beginning a second object replaces the first.
    pub fn begin_object(&mut self, class: ClassId) {
        if let Some(previous) = &self.current_object {
            log::warn!(
                "object {} began while {} was still being drawn",
                class,
                previous
            );
        }
        self.current_object = Some(class);
    }

    /// Records that the engine finished drawing the current object.
    pub fn end_object(&mut self) {
        self.current_object = None;
    }

    /// Runs `f` with `class` as the current object.
    ///
    /// The current object is cleared when `f` returns, including when it panics.
    pub fn with_object<R>(&mut self, class: ClassId, f: impl FnOnce(&mut Self) -> R) -> R {
        let mut scope = self.object_scope(class);
        f(&mut *scope)
    }

    /// Begins an object scope that ends when the returned guard is dropped.
    pub fn object_scope(&mut self, class: ClassId) -> StateObjectScope<'_> {
        self.begin_object(class);
        StateObjectScope { state: self }
    }

    /// The class of the object currently being drawn, if any.
    #[inline]
    pub fn current_object(&self) -> Option<&ClassId> {
        self.current_object.as_ref()
    }

    /// The configured color of `class`, if any.
    pub fn class_color(&self, class: &ClassId) -> Option<SegColor> {
        self.class_colors.get(class).copied()
    }

    /// The configured color of `surface`, if any.
    pub fn surface_color(&self, surface: &str) -> Option<SegColor> {
        self.surface_colors.get(surface).copied()
    }

    /// The sky color.
    #[inline]
    pub fn sky_color(&self) -> SegColor {
        self.sky_color
    }

    /// The designated multi-class atlas surface.
    #[inline]
    pub fn atlas_surface(&self) -> &str {
        &self.atlas_surface
    }

    /// The designated sky surface.
    #[inline]
    pub fn sky_surface(&self) -> &str {
        &self.sky_surface
    }
}

/// Guard returned by [`ColorMapState::object_scope`]. Clears the current object on drop.
pub struct StateObjectScope<'a> {
    state: &'a mut ColorMapState,
}

impl Deref for StateObjectScope<'_> {
    type Target = ColorMapState;

    fn deref(&self) -> &ColorMapState {
        self.state
    }
}

impl DerefMut for StateObjectScope<'_> {
    fn deref_mut(&mut self) -> &mut ColorMapState {
        self.state
    }
}

impl Drop for StateObjectScope<'_> {
    fn drop(&mut self) {
        self.state.end_object();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn pig() -> ClassId {
        ClassId::from("minecraft:pig")
    }

    #[test]
    fn configure_replaces_tables_wholesale() {
        let mut state = ColorMapState::default();
        state.configure(
            &ColorSpec::new()
                .class_colors(["minecraft:pig"], &[1, 2, 3])
                .surface_color("a.png", &[4, 5, 6]),
        );
        state.configure(&ColorSpec::new().class_colors(["minecraft:cow"], &[7, 8, 9]));

        assert_eq!(state.class_color(&pig()), None);
        assert_eq!(
            state.class_color(&ClassId::from("minecraft:cow")),
            Some(SegColor::new(7, 8, 9))
        );
        assert_eq!(state.surface_color("a.png"), None);
    }

    #[test]
    fn producing_requires_enable_and_pass() {
        let mut state = ColorMapState::default();
        state.begin_segmentation_pass();
        assert!(!state.is_producing());
        state.enable();
        assert!(state.is_producing());
        state.end_segmentation_pass();
        assert!(!state.is_producing());
    }

    #[test]
    fn object_scope_clears_on_error() {
        let mut state = ColorMapState::default();
        let result: Result<(), &str> = state.with_object(pig(), |s| {
            assert_eq!(s.current_object(), Some(&pig()));
            Err("draw failed")
        });
        assert!(result.is_err());
        assert_eq!(state.current_object(), None);
    }

    #[test]
    fn object_scope_clears_on_panic() {
        let mut state = ColorMapState::default();
        let result = catch_unwind(AssertUnwindSafe(|| {
            state.with_object(pig(), |_| panic!("draw exploded"));
        }));
        assert!(result.is_err());
        assert_eq!(state.current_object(), None);
    }

    #[test]
    fn pass_boundaries_drop_current_object() {
        let mut state = ColorMapState::default();
        state.begin_object(pig());
        state.end_segmentation_pass();
        assert_eq!(state.current_object(), None);

        state.begin_object(pig());
        state.begin_segmentation_pass();
        assert_eq!(state.current_object(), None);
    }
}
