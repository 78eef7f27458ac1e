//! The capture-and-submit state machine.
//!
//! A report cycle always runs in the same order: acquire a fresh position,
//! open the capture surface, upload the chosen photo with that position.
//! Transitions are listed in [`FlowState::next`]; every method of
//! [`ReportFlow`] goes through that table, so a cycle can neither skip a
//! step nor overlap a running upload.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use strikenet_report_models::{Coordinates, ToastId};
use strum_macros::{AsRefStr, Display};

use crate::{
    CaptureSurface, CapturedFile, GeolocationError, Geolocator, PositionOptions,
    ReportSubmission, ReportSubmitter, SubmitError, ToastQueue,
};

/// Toast text after a successful upload.
pub const SUBMITTED_MESSAGE: &str = "Report submitted!";

/// The position captured when a cycle started. Consumed by the upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingCapture {
    /// Where the user was when they triggered the report.
    pub coordinates: Coordinates,
}

/// Where a report cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum FlowState {
    /// Nothing in progress.
    Idle,
    /// Waiting for the device position.
    AwaitingPermission,
    /// The chooser is open. If the user dismissed it, this state simply
    /// lingers until the next trigger replaces the pending position.
    AwaitingCapture {
        /// Position to tag the photo with.
        pending: PendingCapture,
    },
    /// An upload is in flight.
    Submitting,
}

/// Inputs that move a [`FlowState`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowEvent {
    /// The user pressed the report control.
    Trigger,
    /// A fresh position arrived.
    PositionAcquired(Coordinates),
    /// The position request failed.
    PositionFailed,
    /// The user chose a photo.
    CaptureSelected,
    /// The upload finished, successfully or not.
    SubmitFinished,
}

impl FlowState {
    /// The transition table. Returns `None` for a pair that is not allowed.
    #[must_use]
    pub const fn next(&self, event: FlowEvent) -> Option<Self> {
        match (self, event) {
            (Self::Idle | Self::AwaitingCapture { .. }, FlowEvent::Trigger) => {
                Some(Self::AwaitingPermission)
            }
            (Self::AwaitingPermission, FlowEvent::PositionAcquired(coordinates)) => {
                Some(Self::AwaitingCapture {
                    pending: PendingCapture { coordinates },
                })
            }
            (Self::AwaitingPermission, FlowEvent::PositionFailed)
            | (Self::Submitting, FlowEvent::SubmitFinished) => Some(Self::Idle),
            (Self::AwaitingCapture { .. }, FlowEvent::CaptureSelected) => Some(Self::Submitting),
            _ => None,
        }
    }

    /// The pending position, if the chooser is open.
    #[must_use]
    pub const fn pending(&self) -> Option<PendingCapture> {
        match self {
            Self::AwaitingCapture { pending } => Some(*pending),
            _ => None,
        }
    }
}

/// Why a flow step did not complete.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// The step is not allowed right now (e.g. a trigger during upload).
    #[error("Report flow is busy ({state})")]
    Busy {
        /// State the flow was in.
        state: FlowState,
    },

    /// The position could not be acquired.
    #[error(transparent)]
    Permission(#[from] GeolocationError),

    /// A photo arrived without a position, or no photo arrived.
    #[error("Missing {missing} for report")]
    MissingContext {
        /// What was missing.
        missing: &'static str,
    },

    /// The upload failed.
    #[error(transparent)]
    Submission(#[from] SubmitError),
}

/// Drives report cycles and posts their outcomes as toasts.
///
/// Methods take `&self` so that a host can share the flow across tasks;
/// the state lock is never held across an await, so a trigger arriving
/// during an upload sees [`FlowState::Submitting`] and is rejected.
pub struct ReportFlow {
    state: Mutex<FlowState>,
    geolocator: Arc<dyn Geolocator>,
    capture: Arc<dyn CaptureSurface>,
    submitter: Arc<dyn ReportSubmitter>,
    toasts: ToastQueue,
    position_options: PositionOptions,
}

impl ReportFlow {
    /// Creates an idle flow.
    #[must_use]
    pub fn new(
        geolocator: Arc<dyn Geolocator>,
        capture: Arc<dyn CaptureSurface>,
        submitter: Arc<dyn ReportSubmitter>,
        toasts: ToastQueue,
    ) -> Self {
        Self {
            state: Mutex::new(FlowState::Idle),
            geolocator,
            capture,
            submitter,
            toasts,
            position_options: PositionOptions::default(),
        }
    }

    /// Overrides the position request options.
    #[must_use]
    pub fn with_position_options(mut self, options: PositionOptions) -> Self {
        self.position_options = options;
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> FlowState {
        *self.lock()
    }

    /// The position waiting for a photo, if any.
    #[must_use]
    pub fn pending(&self) -> Option<PendingCapture> {
        self.lock().pending()
    }

    /// Whether the report control should accept presses.
    #[must_use]
    pub fn is_trigger_enabled(&self) -> bool {
        !matches!(*self.lock(), FlowState::Submitting)
    }

    /// The toast queue outcomes are posted to.
    #[must_use]
    pub const fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    /// Dismisses a toast early.
    pub fn dismiss_toast(&self, id: ToastId) -> bool {
        self.toasts.dismiss(id)
    }

    /// Starts a cycle: discards any stale pending position, requests a
    /// fresh one, and opens the capture surface.
    ///
    /// # Errors
    ///
    /// * [`FlowError::Busy`] while a position request or upload is running
    ///   (no toast).
    /// * [`FlowError::Permission`] if the position could not be acquired
    ///   (error toast).
    pub async fn trigger(&self) -> Result<Coordinates, FlowError> {
        self.advance(FlowEvent::Trigger)?;
        let guard = ResetOnDrop::new(self);
        log::info!("Requesting device position");

        let options = self.position_options;
        let result =
            match tokio::time::timeout(options.timeout, self.geolocator.current_position(options))
                .await
            {
                Ok(Ok(position)) if position.is_valid() => Ok(position),
                Ok(Ok(position)) => Err(GeolocationError::PositionUnavailable {
                    message: format!(
                        "invalid position {}, {}",
                        position.latitude, position.longitude
                    ),
                }),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(GeolocationError::Timeout),
            };

        match result {
            Ok(position) => {
                self.advance(FlowEvent::PositionAcquired(position))?;
                guard.disarm();
                log::info!(
                    "Position acquired at {}, {}; opening capture",
                    position.latitude,
                    position.longitude
                );
                self.capture.open();
                Ok(position)
            }
            Err(e) => {
                self.advance(FlowEvent::PositionFailed)?;
                guard.disarm();
                log::warn!("Position request failed: {e}");
                self.toasts.error(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Handles the user's choice from the capture surface and uploads it
    /// with the pending position.
    ///
    /// # Errors
    ///
    /// * [`FlowError::Busy`] if an upload is already running (no toast).
    /// * [`FlowError::MissingContext`] if `file` is `None` or there is no
    ///   pending position (error toast, nothing is uploaded).
    /// * [`FlowError::Submission`] if the upload fails (error toast).
    pub async fn on_capture_selected(&self, file: Option<CapturedFile>) -> Result<(), FlowError> {
        let pending = {
            let mut state = self.lock();
            if *state == FlowState::Submitting {
                return Err(FlowError::Busy { state: *state });
            }
            let pending = state.pending();
            if file.is_some()
                && let Some(next) = state.next(FlowEvent::CaptureSelected)
            {
                *state = next;
            }
            pending
        };

        let (Some(pending), Some(file)) = (pending, file) else {
            let err = FlowError::MissingContext {
                missing: if pending.is_some() { "photo" } else { "location" },
            };
            log::warn!("{err}");
            self.toasts.error(err.to_string());
            return Err(err);
        };

        let guard = ResetOnDrop::new(self);
        let submission = ReportSubmission {
            file,
            coordinates: pending.coordinates,
        };
        let result = self.submitter.submit(submission).await;
        self.advance(FlowEvent::SubmitFinished)?;
        guard.disarm();

        match result {
            Ok(()) => {
                log::info!("Report submitted");
                self.toasts.success(SUBMITTED_MESSAGE);
                self.capture.reset();
                Ok(())
            }
            Err(e) => {
                log::warn!("Report submission failed: {e}");
                self.toasts.error(e.to_string());
                Err(e.into())
            }
        }
    }

    fn advance(&self, event: FlowEvent) -> Result<FlowState, FlowError> {
        let mut state = self.lock();
        let next = state.next(event).ok_or(FlowError::Busy { state: *state })?;
        log::trace!("Report flow {} -> {next} on {event:?}", *state);
        *state = next;
        Ok(next)
    }

    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the flow to idle if a step is abandoned mid-await (the future
/// was dropped), so the control never stays disabled.
struct ResetOnDrop<'a> {
    flow: &'a ReportFlow,
    armed: bool,
}

impl<'a> ResetOnDrop<'a> {
    const fn new(flow: &'a ReportFlow) -> Self {
        Self { flow, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            log::warn!("Report step abandoned, returning to idle");
            *self.flow.lock() = FlowState::Idle;
        }
    }
}
