//! The rendering surface a map session draws on.

use weathermap_core::{Location, LocationId};

use crate::render::MarkerVisual;

/// Opaque reference to a marker placed on a [`MapSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerHandle(pub u64);

/// A map widget: places markers and updates their appearance.
///
/// Implementations only draw. They never decide what a marker should look
/// like; that comes from [`crate::render::marker_visual`].
pub trait MapSurface {
    /// Places a new marker for `location` and returns its handle. Called
    /// exactly once per location.
    fn place_marker(
        &mut self,
        id: LocationId,
        location: &Location,
        visual: &MarkerVisual,
    ) -> MarkerHandle;

    /// Replaces icon, size, opacity, and popup body of an existing marker.
    fn apply(&mut self, handle: MarkerHandle, visual: &MarkerVisual);

    /// Adds the marker to, or removes it from, the visible map.
    fn set_visible(&mut self, handle: MarkerHandle, visible: bool);

    /// Opens the marker's popup with the given body.
    fn open_popup(&mut self, handle: MarkerHandle, popup: &str);
}
