//! The capability set a map rendering engine must provide.
//!
//! [`crate::MarkerSync`] only ever holds a [`MapSurface`] and the opaque
//! ids it hands out, never engine-specific objects. Any engine that can
//! place markers, fit bounds and report resizes can sit behind this trait.

use std::time::Duration;

use serde::Serialize;
use strikenet_report_models::{Coordinates, ReportDetails};

use crate::ViewportBounds;

/// Default padding, in pixels, around fitted bounds.
pub const DEFAULT_FIT_PADDING: u32 = 60;

/// Default duration of the animated fit transition.
pub const DEFAULT_FIT_DURATION: Duration = Duration::from_millis(800);

/// Opaque handle of a marker placed on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MarkerId(pub u64);

/// Opaque handle of a registered resize listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ListenerId(pub u64);

/// Content attached to a marker and shown when it is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerPopup {
    /// Text details of the report.
    pub details: ReportDetails,
    /// Resolved photo URL, if any.
    pub image_url: Option<String>,
}

/// Everything a surface needs to draw one marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSpec {
    /// Anchor position.
    pub position: Coordinates,
    /// Popup content.
    pub popup: MarkerPopup,
}

/// How a surface should animate to new bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitOptions {
    /// Padding around the bounds in pixels.
    pub padding: u32,
    /// Length of the animated transition.
    pub duration: Duration,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            padding: DEFAULT_FIT_PADDING,
            duration: DEFAULT_FIT_DURATION,
        }
    }
}

/// Signals a surface delivers back to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    /// The drawing surface has a measured size and can accept markers.
    Ready,
    /// The host window or container changed size.
    Resized,
    /// A marker was clicked.
    MarkerClicked(MarkerId),
}

/// Operations a map engine exposes to the marker synchronizer.
pub trait MapSurface: Send {
    /// Places a marker and returns its handle.
    fn add_marker(&mut self, spec: MarkerSpec) -> MarkerId;

    /// Removes a marker and its click handler.
    fn remove_marker(&mut self, id: MarkerId);

    /// Moves the viewport so `bounds` is fully visible.
    fn fit_bounds(&mut self, bounds: ViewportBounds, options: FitOptions);

    /// Re-measures the drawing surface.
    fn resize(&mut self);

    /// Starts forwarding host resizes as [`MapEvent::Resized`].
    fn add_resize_listener(&mut self) -> ListenerId;

    /// Stops forwarding host resizes for `id`.
    fn remove_resize_listener(&mut self, id: ListenerId);

    /// Releases the engine's drawing resources. The surface is unusable
    /// afterwards.
    fn release(&mut self);
}
