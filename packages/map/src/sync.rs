//! Keeps a map surface's marker set consistent with a report dataset.

use std::collections::BTreeMap;
use std::sync::Arc;

use strikenet_report_models::{ReportDetails, ReportRecord};
use strikenet_source::ImageResolver;
use strum_macros::{AsRefStr, Display};

use crate::{
    FitOptions, ListenerId, MapEvent, MapSettings, MapSurface, MarkerId, MarkerPopup, MarkerSpec,
    SetupError, ViewportBounds,
};

/// Lifecycle of a [`MarkerSync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SyncState {
    /// Configuration was invalid; no surface was ever opened.
    Failed,
    /// The surface exists but has not signalled [`MapEvent::Ready`].
    AwaitingReady,
    /// Markers can be drawn.
    Ready,
    /// [`MarkerSync::teardown`] has run.
    TornDown,
}

/// Result of a [`MarkerSync::sync`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Markers were replaced.
    Applied {
        /// Markers now on the surface.
        markers: usize,
        /// Records dropped for invalid coordinates.
        dropped: usize,
        /// Whether the viewport was fitted.
        fitted: bool,
    },
    /// The map is not ready; the dataset will be applied on
    /// [`MapEvent::Ready`].
    Deferred,
    /// The component failed setup or was torn down.
    Inactive,
}

/// Owns a map surface and the markers drawn on it.
///
/// Markers are only created once the surface reports
/// [`MapEvent::Ready`]; datasets passed to [`MarkerSync::sync`] earlier are
/// held and the latest one is applied at that point. Every sync replaces
/// the full marker set, so repeated syncs never accumulate duplicates.
/// Dropping the component tears it down.
pub struct MarkerSync<S: MapSurface> {
    surface: Option<S>,
    state: SyncState,
    setup_error: Option<SetupError>,
    resize_listener: Option<ListenerId>,
    resolver: Arc<dyn ImageResolver>,
    fit: FitOptions,
    pending: Option<Vec<ReportRecord>>,
    markers: BTreeMap<MarkerId, ReportRecord>,
    selected: Option<ReportRecord>,
    last_bounds: Option<ViewportBounds>,
}

impl<S: MapSurface> MarkerSync<S> {
    /// Validates `settings` and opens a surface with `open`.
    ///
    /// When the access token is missing, `open` is never called and the
    /// component stays in [`SyncState::Failed`] with the error available
    /// from [`MarkerSync::setup_error`].
    pub fn initialize<F>(settings: &MapSettings, resolver: Arc<dyn ImageResolver>, open: F) -> Self
    where
        F: FnOnce(&MapSettings, &str) -> S,
    {
        let mut sync = Self {
            surface: None,
            state: SyncState::Failed,
            setup_error: None,
            resize_listener: None,
            resolver,
            fit: settings.fit,
            pending: None,
            markers: BTreeMap::new(),
            selected: None,
            last_bounds: None,
        };

        match settings.access_token() {
            Ok(token) => {
                let mut surface = open(settings, token);
                sync.resize_listener = Some(surface.add_resize_listener());
                sync.surface = Some(surface);
                sync.state = SyncState::AwaitingReady;
                log::info!("Map surface opened, waiting for ready signal");
            }
            Err(e) => {
                log::error!("Map setup failed: {e}");
                sync.setup_error = Some(e);
            }
        }

        sync
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SyncState {
        self.state
    }

    /// The setup failure, if initialization failed. Survives teardown.
    #[must_use]
    pub const fn setup_error(&self) -> Option<&SetupError> {
        self.setup_error.as_ref()
    }

    /// Whether the surface has signalled readiness.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == SyncState::Ready
    }

    /// The owned surface, until teardown.
    #[must_use]
    pub const fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Number of markers currently drawn.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Drawn markers and the records they represent.
    pub fn markers(&self) -> impl Iterator<Item = (MarkerId, &ReportRecord)> {
        self.markers.iter().map(|(id, record)| (*id, record))
    }

    /// Bounds fitted by the last sync pass, if any.
    #[must_use]
    pub const fn last_bounds(&self) -> Option<ViewportBounds> {
        self.last_bounds
    }

    /// The report whose marker was clicked last.
    #[must_use]
    pub const fn selected(&self) -> Option<&ReportRecord> {
        self.selected.as_ref()
    }

    /// Display details of the selected report.
    #[must_use]
    pub fn selected_details(&self) -> Option<ReportDetails> {
        self.selected.as_ref().map(ReportDetails::from)
    }

    /// Dismisses the current selection.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Requests that the surface show exactly the valid records in
    /// `records`.
    pub async fn sync(&mut self, records: Vec<ReportRecord>) -> SyncOutcome {
        match self.state {
            SyncState::Ready => self.apply(records).await,
            SyncState::AwaitingReady => {
                log::debug!("Map not ready, deferring {} reports", records.len());
                self.pending = Some(records);
                SyncOutcome::Deferred
            }
            SyncState::Failed | SyncState::TornDown => {
                log::debug!("Ignoring sync on {} map", self.state);
                SyncOutcome::Inactive
            }
        }
    }

    /// Handles a signal from the surface.
    pub async fn handle_event(&mut self, event: MapEvent) {
        match event {
            MapEvent::Ready => self.on_ready().await,
            MapEvent::Resized => {
                if self.resize_listener.is_some()
                    && let Some(surface) = self.surface.as_mut()
                {
                    surface.resize();
                }
            }
            MapEvent::MarkerClicked(id) => {
                if let Some(record) = self.markers.get(&id) {
                    log::debug!("Selected report at marker {id:?}");
                    self.selected = Some(record.clone());
                } else {
                    log::warn!("Click on unknown marker {id:?}");
                }
            }
        }
    }

    /// Removes all markers, detaches the resize listener and releases the
    /// surface. Safe to call any number of times, including after a setup
    /// failure.
    pub fn teardown(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            for id in std::mem::take(&mut self.markers).into_keys() {
                surface.remove_marker(id);
            }
            if let Some(listener) = self.resize_listener.take() {
                surface.remove_resize_listener(listener);
            }
            surface.release();
            log::info!("Map surface released");
        }

        self.markers.clear();
        self.resize_listener = None;
        self.pending = None;
        self.selected = None;
        self.last_bounds = None;
        self.state = SyncState::TornDown;
    }

    async fn on_ready(&mut self) {
        if self.state != SyncState::AwaitingReady {
            log::debug!("Ignoring ready signal in state {}", self.state);
            return;
        }
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        // Measure before the first draw.
        surface.resize();
        self.state = SyncState::Ready;
        log::info!("Map ready");

        if let Some(records) = self.pending.take() {
            self.apply(records).await;
        }
    }

    async fn apply(&mut self, records: Vec<ReportRecord>) -> SyncOutcome {
        let total = records.len();
        let mut planned = Vec::with_capacity(total);

        for record in records {
            let Some(position) = record.coordinates() else {
                log::debug!(
                    "Skipping report with invalid coordinates ({:?}, {:?})",
                    record.latitude,
                    record.longitude
                );
                continue;
            };
            let popup = MarkerPopup {
                details: ReportDetails::from(&record),
                image_url: resolve_image(self.resolver.as_ref(), &record).await,
            };
            planned.push((record, MarkerSpec { position, popup }));
        }

        let markers = planned.len();
        let dropped = total - markers;
        let bounds = ViewportBounds::covering(planned.iter().map(|(_, spec)| spec.position));

        self.replace_markers(planned);

        let fitted = match (bounds, self.surface.as_mut()) {
            (Some(bounds), Some(surface)) => {
                surface.fit_bounds(bounds, self.fit);
                true
            }
            _ => false,
        };
        self.last_bounds = bounds;

        log::info!("Synced {markers} markers ({dropped} reports dropped)");
        SyncOutcome::Applied {
            markers,
            dropped,
            fitted,
        }
    }

    /// Removes every marker from the previous pass, then installs
    /// `planned`.
    fn replace_markers(&mut self, planned: Vec<(ReportRecord, MarkerSpec)>) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        for id in std::mem::take(&mut self.markers).into_keys() {
            surface.remove_marker(id);
        }
        for (record, spec) in planned {
            let id = surface.add_marker(spec);
            self.markers.insert(id, record);
        }
    }
}

impl<S: MapSurface> Drop for MarkerSync<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn resolve_image(resolver: &dyn ImageResolver, record: &ReportRecord) -> Option<String> {
    let image_ref = record.image_ref()?;
    match resolver.resolve_image_url(image_ref).await {
        Ok(url) => url,
        Err(e) => {
            log::warn!("Could not resolve image {image_ref}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use strikenet_report_models::Coordinates;
    use strikenet_source::{NoImageResolver, SourceError};

    use super::*;
    use crate::MemorySurface;

    struct PrefixResolver;

    #[async_trait]
    impl ImageResolver for PrefixResolver {
        async fn resolve_image_url(
            &self,
            image_ref: &str,
        ) -> Result<Option<String>, SourceError> {
            Ok(Some(format!("https://img.test/{image_ref}")))
        }
    }

    struct FailingResolver;

    #[async_trait]
    impl ImageResolver for FailingResolver {
        async fn resolve_image_url(
            &self,
            image_ref: &str,
        ) -> Result<Option<String>, SourceError> {
            Err(SourceError::Url {
                message: format!("no bucket for {image_ref}"),
            })
        }
    }

    fn settings() -> MapSettings {
        MapSettings::with_token(Some("pk.test".to_string()))
    }

    fn mount(resolver: Arc<dyn ImageResolver>) -> (MarkerSync<MemorySurface>, MemorySurface) {
        let surface = MemorySurface::new();
        let handle = surface.clone();
        let sync = MarkerSync::initialize(&settings(), resolver, move |_, _| surface);
        (sync, handle)
    }

    async fn mount_ready() -> (MarkerSync<MemorySurface>, MemorySurface) {
        let (mut sync, handle) = mount(Arc::new(PrefixResolver));
        sync.handle_event(MapEvent::Ready).await;
        (sync, handle)
    }

    fn fox() -> ReportRecord {
        ReportRecord::at(34.0, -118.2)
            .with_image("fox.jpg")
            .with_invasive(false)
    }

    #[tokio::test]
    async fn single_record_creates_one_marker_and_fits_point() {
        let (mut sync, map) = mount_ready().await;

        let outcome = sync.sync(vec![fox()]).await;
        assert_eq!(
            outcome,
            SyncOutcome::Applied {
                markers: 1,
                dropped: 0,
                fitted: true
            }
        );

        let state = map.snapshot();
        assert_eq!(state.markers.len(), 1);
        assert_eq!(state.fits.len(), 1);
        let (bounds, options) = state.fits[0];
        assert!(bounds.is_point());
        assert_eq!(bounds.center(), Coordinates::new(34.0, -118.2));
        assert_eq!(options, FitOptions::default());
        assert_eq!(options.padding, 60);
    }

    #[tokio::test]
    async fn nan_coordinates_create_nothing_and_skip_fit() {
        let (mut sync, map) = mount_ready().await;

        let record = ReportRecord {
            latitude: "NaN".into(),
            longitude: (-80.1).into(),
            ..ReportRecord::default()
        };
        let outcome = sync.sync(vec![record]).await;

        assert_eq!(
            outcome,
            SyncOutcome::Applied {
                markers: 0,
                dropped: 1,
                fitted: false
            }
        );
        assert_eq!(map.marker_count(), 0);
        assert!(map.snapshot().fits.is_empty());
        assert_eq!(sync.last_bounds(), None);
    }

    #[tokio::test]
    async fn marker_count_matches_valid_records() {
        let (mut sync, map) = mount_ready().await;

        let records = vec![
            fox(),
            ReportRecord::at(26.1224, -80.1373),
            ReportRecord {
                latitude: "26.7".into(),
                longitude: "-80.05".into(),
                ..ReportRecord::default()
            },
            ReportRecord::at(f64::INFINITY, 0.0),
            ReportRecord::at(95.0, 0.0),
            ReportRecord::default(),
        ];
        sync.sync(records).await;

        assert_eq!(sync.marker_count(), 3);
        assert_eq!(map.marker_count(), 3);
    }

    #[tokio::test]
    async fn repeated_sync_replaces_markers() {
        let (mut sync, map) = mount_ready().await;
        let records = vec![fox(), ReportRecord::at(26.1224, -80.1373)];

        sync.sync(records.clone()).await;
        let first_ids: Vec<MarkerId> = map.snapshot().markers.into_keys().collect();
        sync.sync(records).await;

        let state = map.snapshot();
        assert_eq!(state.markers.len(), 2);
        assert_eq!(state.fits.len(), 2);
        assert!(first_ids.iter().all(|id| !state.markers.contains_key(id)));
    }

    #[tokio::test]
    async fn shrinking_dataset_removes_stale_markers() {
        let (mut sync, map) = mount_ready().await;

        sync.sync(vec![fox(), ReportRecord::at(26.1224, -80.1373)])
            .await;
        sync.sync(vec![fox()]).await;
        assert_eq!(map.marker_count(), 1);

        sync.sync(Vec::new()).await;
        assert_eq!(map.marker_count(), 0);
        // The empty pass must not move the viewport.
        assert_eq!(map.snapshot().fits.len(), 2);
    }

    #[tokio::test]
    async fn sync_before_ready_is_deferred() {
        let (mut sync, map) = mount(Arc::new(PrefixResolver));

        assert_eq!(sync.sync(vec![fox()]).await, SyncOutcome::Deferred);
        assert_eq!(
            sync.sync(vec![fox(), ReportRecord::at(1.0, 1.0)]).await,
            SyncOutcome::Deferred
        );
        assert_eq!(map.marker_count(), 0);
        assert_eq!(map.snapshot().resizes, 0);

        sync.handle_event(MapEvent::Ready).await;

        let state = map.snapshot();
        assert!(sync.is_ready());
        assert_eq!(state.resizes, 1);
        assert_eq!(state.markers.len(), 2, "latest deferred dataset wins");
        assert_eq!(state.fits.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_ready_does_not_resync() {
        let (mut sync, map) = mount(Arc::new(PrefixResolver));
        sync.sync(vec![fox()]).await;
        sync.handle_event(MapEvent::Ready).await;
        sync.handle_event(MapEvent::Ready).await;

        let state = map.snapshot();
        assert_eq!(state.resizes, 1);
        assert_eq!(state.fits.len(), 1);
    }

    #[tokio::test]
    async fn popup_carries_details_and_image() {
        let (mut sync, map) = mount_ready().await;
        sync.sync(vec![fox().with_species("fox")]).await;

        let spec = map.snapshot().markers.into_values().next().unwrap();
        assert_eq!(spec.popup.image_url.as_deref(), Some("https://img.test/fox.jpg"));
        assert_eq!(spec.popup.details.species, "fox");
        assert_eq!(spec.popup.details.invasive, "false");
    }

    #[tokio::test]
    async fn failed_image_resolution_degrades_to_no_image() {
        let (mut sync, map) = mount(Arc::new(FailingResolver));
        sync.handle_event(MapEvent::Ready).await;
        sync.sync(vec![fox()]).await;

        let spec = map.snapshot().markers.into_values().next().unwrap();
        assert_eq!(spec.popup.image_url, None);
    }

    #[tokio::test]
    async fn record_without_image_has_no_image() {
        let (mut sync, map) = mount_ready().await;
        sync.sync(vec![ReportRecord::at(1.0, 2.0)]).await;

        let spec = map.snapshot().markers.into_values().next().unwrap();
        assert_eq!(spec.popup.image_url, None);
    }

    #[tokio::test]
    async fn click_selects_and_dismiss_clears() {
        let (mut sync, map) = mount_ready().await;
        sync.sync(vec![fox().with_species("fox"), ReportRecord::at(1.0, 2.0)])
            .await;

        let (id, _) = map
            .snapshot()
            .markers
            .into_iter()
            .find(|(_, spec)| spec.popup.details.species == "fox")
            .unwrap();
        sync.handle_event(MapEvent::MarkerClicked(id)).await;

        assert_eq!(sync.selected().and_then(|r| r.species_name.as_deref()), Some("fox"));
        assert_eq!(
            sync.selected_details().map(|d| d.position),
            Some(Some("-118.20000, 34.00000".to_string()))
        );

        sync.clear_selection();
        assert!(sync.selected().is_none());
        assert_eq!(map.marker_count(), 2, "selection does not touch markers");
    }

    #[tokio::test]
    async fn click_on_unknown_marker_is_ignored() {
        let (mut sync, _map) = mount_ready().await;
        sync.handle_event(MapEvent::MarkerClicked(MarkerId(999))).await;
        assert!(sync.selected().is_none());
    }

    #[tokio::test]
    async fn resize_is_forwarded_while_mounted() {
        let (mut sync, map) = mount_ready().await;
        sync.handle_event(MapEvent::Resized).await;
        sync.handle_event(MapEvent::Resized).await;
        assert_eq!(map.snapshot().resizes, 3);

        sync.teardown();
        sync.handle_event(MapEvent::Resized).await;
        assert_eq!(map.snapshot().calls_after_release, 0);
    }

    #[tokio::test]
    async fn teardown_releases_everything_and_is_idempotent() {
        let (mut sync, map) = mount_ready().await;
        sync.sync(vec![fox(), ReportRecord::at(1.0, 2.0)]).await;
        assert_eq!(map.snapshot().listeners.len(), 1);

        sync.teardown();
        sync.teardown();

        let state = map.snapshot();
        assert!(state.markers.is_empty());
        assert!(state.listeners.is_empty());
        assert!(state.released);
        assert_eq!(state.calls_after_release, 0);
        assert_eq!(sync.state(), SyncState::TornDown);
        assert_eq!(sync.marker_count(), 0);

        assert_eq!(sync.sync(vec![fox()]).await, SyncOutcome::Inactive);
        sync.handle_event(MapEvent::Ready).await;
        sync.handle_event(MapEvent::MarkerClicked(MarkerId(1))).await;
        assert_eq!(map.marker_count(), 0);
        assert_eq!(map.snapshot().calls_after_release, 0);
    }

    #[tokio::test]
    async fn teardown_before_ready_drops_pending_dataset() {
        let (mut sync, map) = mount(Arc::new(NoImageResolver));
        sync.sync(vec![fox()]).await;
        sync.teardown();
        sync.handle_event(MapEvent::Ready).await;

        assert_eq!(map.marker_count(), 0);
        assert!(map.snapshot().released);
    }

    #[tokio::test]
    async fn drop_tears_down() {
        let (mut sync, map) = mount_ready().await;
        sync.sync(vec![fox()]).await;
        drop(sync);

        let state = map.snapshot();
        assert!(state.markers.is_empty());
        assert!(state.released);
    }

    #[tokio::test]
    async fn missing_token_never_opens_a_surface() {
        let opened = AtomicBool::new(false);
        let mut sync = MarkerSync::initialize(
            &MapSettings::with_token(None),
            Arc::new(NoImageResolver),
            |_, _| {
                opened.store(true, Ordering::SeqCst);
                MemorySurface::new()
            },
        );

        assert!(!opened.load(Ordering::SeqCst));
        assert_eq!(sync.state(), SyncState::Failed);
        assert!(matches!(
            sync.setup_error(),
            Some(SetupError::MissingAccessToken { .. })
        ));
        assert!(sync.surface().is_none());

        assert_eq!(sync.sync(vec![fox()]).await, SyncOutcome::Inactive);
        sync.handle_event(MapEvent::Ready).await;
        sync.teardown();
        sync.teardown();
        assert!(sync.setup_error().is_some());
        assert_eq!(sync.marker_count(), 0);
    }

    #[tokio::test]
    async fn open_receives_settings_and_trimmed_token() {
        let mut seen = None;
        let settings = MapSettings::with_token(Some(" pk.abc ".to_string()));
        let _sync = MarkerSync::initialize(&settings, Arc::new(NoImageResolver), |s, token| {
            seen = Some((s.style.clone(), token.to_string()));
            MemorySurface::new()
        });
        assert_eq!(
            seen,
            Some((
                "mapbox://styles/mapbox/streets-v12".to_string(),
                "pk.abc".to_string()
            ))
        );
    }
}
