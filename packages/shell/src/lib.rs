#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The StrikeNet page shell.
//!
//! [`Shell`] owns the sighting map ([`MarkerSync`]) and hosts the report
//! control ([`ReportFlow`]) next to it. The two never talk to each other:
//! a submitted report shows up on the map only after the next fetch.

pub mod config;

use std::sync::Arc;

use serde::Serialize;
use strikenet_map::{MapEvent, MapSettings, MapSurface, MarkerSync, SyncOutcome};
use strikenet_report::{ReportFlow, SubmitError};
use strikenet_report_models::{ReportDetails, ReportRecord, Toast};
use strikenet_source::{ImageResolver, ReportSource, SourceError};

pub use config::ShellConfig;

/// Errors building the shell's collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// A report source or image resolver could not be created.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The report submitter could not be created.
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// What the page currently shows, in a form a host can print or send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellStatus {
    /// Static message rendered instead of the map.
    pub map_error: Option<String>,
    /// Inline message for a failed report fetch.
    pub data_error: Option<String>,
    /// Map lifecycle state.
    pub map_state: String,
    /// Markers on the map.
    pub marker_count: usize,
    /// Popup content of the selected marker.
    pub selected: Option<ReportDetails>,
    /// Report flow state.
    pub report_state: String,
    /// Whether the report control accepts presses.
    pub trigger_enabled: bool,
    /// Visible toasts, oldest first.
    pub toasts: Vec<Toast>,
}

/// The page: a map plus the report control.
pub struct Shell<S: MapSurface> {
    map: MarkerSync<S>,
    reports: Arc<ReportFlow>,
    source: Arc<dyn ReportSource>,
    data_error: Option<String>,
}

impl<S: MapSurface> Shell<S> {
    /// Mounts the map and attaches the report flow.
    ///
    /// A map setup failure does not prevent mounting; the shell renders
    /// the setup message and the report control stays usable.
    pub fn mount<F>(
        settings: &MapSettings,
        resolver: Arc<dyn ImageResolver>,
        source: Arc<dyn ReportSource>,
        reports: Arc<ReportFlow>,
        open: F,
    ) -> Self
    where
        F: FnOnce(&MapSettings, &str) -> S,
    {
        let map = MarkerSync::initialize(settings, resolver, open);
        Self {
            map,
            reports,
            source,
            data_error: None,
        }
    }

    /// Fetches reports once and hands them to the map.
    ///
    /// A failed fetch is not retried. Its message stays visible until the
    /// next successful load and the map is synced with an empty dataset.
    pub async fn load_reports(&mut self) -> SyncOutcome {
        log::info!("Loading reports from {}", self.source.name());
        match self.source.fetch_reports().await {
            Ok(records) => {
                log::info!("Fetched {} reports", records.len());
                self.data_error = None;
                self.map.sync(records).await
            }
            Err(e) => {
                log::error!("Failed to load reports: {e}");
                self.data_error = Some(e.to_string());
                self.map.sync(Vec::new()).await
            }
        }
    }

    /// Replaces the map's dataset with pushed records.
    pub async fn push_reports(&mut self, records: Vec<ReportRecord>) -> SyncOutcome {
        self.map.sync(records).await
    }

    /// Forwards a map surface signal.
    pub async fn handle_map_event(&mut self, event: MapEvent) {
        self.map.handle_event(event).await;
    }

    /// The map component.
    #[must_use]
    pub const fn map(&self) -> &MarkerSync<S> {
        &self.map
    }

    /// Mutable access to the map component, e.g. to dismiss a popup.
    pub const fn map_mut(&mut self) -> &mut MarkerSync<S> {
        &mut self.map
    }

    /// The report flow.
    #[must_use]
    pub const fn report_flow(&self) -> &Arc<ReportFlow> {
        &self.reports
    }

    /// Message for the last failed fetch, if any.
    #[must_use]
    pub fn data_error(&self) -> Option<&str> {
        self.data_error.as_deref()
    }

    /// Tears down the map. Safe to call repeatedly.
    pub fn unmount(&mut self) {
        self.map.teardown();
    }

    /// Snapshot of everything the page shows.
    #[must_use]
    pub fn status(&self) -> ShellStatus {
        ShellStatus {
            map_error: self.map.setup_error().map(ToString::to_string),
            data_error: self.data_error.clone(),
            map_state: self.map.state().to_string(),
            marker_count: self.map.marker_count(),
            selected: self.map.selected_details(),
            report_state: self.reports.state().to_string(),
            trigger_enabled: self.reports.is_trigger_enabled(),
            toasts: self.reports.toasts().toasts(),
        }
    }
}
