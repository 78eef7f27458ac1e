#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geo-tagged photo reports.
//!
//! [`ReportFlow`] runs one report cycle at a time: it asks a
//! [`Geolocator`] for a fresh position, opens a [`CaptureSurface`], and
//! uploads the chosen [`CapturedFile`] with that position through a
//! [`ReportSubmitter`]. Every outcome the user should see is posted to a
//! [`ToastQueue`].

pub mod capture;
pub mod flow;
pub mod geolocation;
pub mod submit;
pub mod toast;

pub use capture::{CaptureRequest, CaptureSurface, CapturedFile, ChannelCapture};
pub use flow::{FlowError, FlowEvent, FlowState, PendingCapture, ReportFlow, SUBMITTED_MESSAGE};
pub use geolocation::{
    DEFAULT_POSITION_TIMEOUT, FixedGeolocator, GeolocationError, Geolocator, PositionOptions,
    UnsupportedGeolocator,
};
pub use submit::{DEFAULT_API_BASE, HttpReportSubmitter, ReportSubmission, ReportSubmitter, SubmitError};
pub use toast::{DEFAULT_TOAST_DURATION, ToastQueue};
