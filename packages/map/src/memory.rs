//! A [`MapSurface`] that keeps its state in memory.
//!
//! Used by the command-line host, which has no drawing engine, and by
//! tests. Clones share the same state so a caller can hand one clone to
//! [`crate::MarkerSync`] and inspect the other.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{FitOptions, ListenerId, MapSurface, MarkerId, MarkerSpec, ViewportBounds};

/// Observable state of a [`MemorySurface`].
#[derive(Debug, Clone, Default)]
pub struct MemoryMapState {
    /// Markers currently on the surface.
    pub markers: BTreeMap<MarkerId, MarkerSpec>,
    /// Every `fit_bounds` call, in order.
    pub fits: Vec<(ViewportBounds, FitOptions)>,
    /// Number of `resize` calls.
    pub resizes: u64,
    /// Registered resize listeners.
    pub listeners: BTreeSet<ListenerId>,
    /// Whether `release` has been called.
    pub released: bool,
    /// Operations attempted after `release`.
    pub calls_after_release: u64,
    next_id: u64,
}

impl MemoryMapState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_live(&mut self, op: &str) -> bool {
        if self.released {
            log::warn!("Map surface {op} after release");
            self.calls_after_release += 1;
            return false;
        }
        true
    }
}

/// In-memory map surface.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    state: Arc<Mutex<MemoryMapState>>,
}

impl MemorySurface {
    /// Creates an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> MemoryMapState {
        self.lock().clone()
    }

    /// Number of markers currently placed.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.lock().markers.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryMapState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MapSurface for MemorySurface {
    fn add_marker(&mut self, spec: MarkerSpec) -> MarkerId {
        let mut state = self.lock();
        let id = MarkerId(state.next_id());
        if state.check_live("add_marker") {
            state.markers.insert(id, spec);
        }
        id
    }

    fn remove_marker(&mut self, id: MarkerId) {
        let mut state = self.lock();
        if state.check_live("remove_marker") && state.markers.remove(&id).is_none() {
            log::warn!("Removing unknown marker {id:?}");
        }
    }

    fn fit_bounds(&mut self, bounds: ViewportBounds, options: FitOptions) {
        let mut state = self.lock();
        if state.check_live("fit_bounds") {
            state.fits.push((bounds, options));
        }
    }

    fn resize(&mut self) {
        let mut state = self.lock();
        if state.check_live("resize") {
            state.resizes += 1;
        }
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        let mut state = self.lock();
        let id = ListenerId(state.next_id());
        if state.check_live("add_resize_listener") {
            state.listeners.insert(id);
        }
        id
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        let mut state = self.lock();
        if state.check_live("remove_resize_listener") {
            state.listeners.remove(&id);
        }
    }

    fn release(&mut self) {
        let mut state = self.lock();
        if state.check_live("release") {
            state.released = true;
        }
    }
}
