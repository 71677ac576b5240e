//! Marker state, rendering, and filtering for the weather map.
//!
//! The map itself is an external collaborator reached through
//! [`MapSurface`]. Everything here runs on a single task: [`MapSession`] is
//! the only writer of the [`MarkerStore`].

pub mod filter;
pub mod render;
pub mod session;
pub mod store;
pub mod surface;

pub use filter::{FilterState, WeatherCategory};
pub use render::{marker_visual, reconcile, IconAsset, MarkerVisual};
pub use session::{MapSession, SessionCommand, SessionError};
pub use store::{MarkerEntry, MarkerStore};
pub use surface::{MapSurface, MarkerHandle};
