#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map marker synchronization for observation reports.
//!
//! [`MarkerSync`] owns a [`MapSurface`] for its whole lifetime and keeps the
//! surface's markers equal to the valid records of the latest dataset.
//! Drawing is deferred until the surface signals [`MapEvent::Ready`], each
//! sync replaces the previous marker set, and teardown releases every
//! marker, listener and the surface itself.
//!
//! The rendering engine is hidden behind [`MapSurface`]. [`MemorySurface`]
//! is an in-memory implementation for headless hosts and tests.

pub mod bounds;
pub mod memory;
pub mod settings;
pub mod surface;
pub mod sync;

pub use bounds::ViewportBounds;
pub use memory::{MemoryMapState, MemorySurface};
pub use settings::{MapSettings, SetupError};
pub use surface::{
    FitOptions, ListenerId, MapEvent, MapSurface, MarkerId, MarkerPopup, MarkerSpec,
};
pub use sync::{MarkerSync, SyncOutcome, SyncState};
