#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Report data source and image URL resolver contracts.
//!
//! The map never talks to a backend directly. A host supplies a
//! [`ReportSource`] that yields the current batch of [`ReportRecord`]s and
//! an [`ImageResolver`] that turns a record's opaque image key into a
//! displayable URL. Neither contract retries on its own: a failed fetch is
//! reported once and the host decides what to render.

pub mod http;
pub mod images;
pub mod mock;

use async_trait::async_trait;
use strikenet_report_models::ReportRecord;

pub use http::HttpReportSource;
pub use images::{NoImageResolver, PublicUrlResolver};
pub use mock::MockReportSource;

/// Errors that can occur while fetching reports or resolving images.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered with a non-success status.
    #[error("Report fetch failed: HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// A URL could not be built from the configured base.
    #[error("Invalid URL: {message}")]
    Url {
        /// Description of what went wrong.
        message: String,
    },
}

/// Anything that can produce the current set of reports.
///
/// Called once per map mount. Implementations must not retry internally.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Short label used in log messages (e.g. `"http"`, `"mock"`).
    fn name(&self) -> &str;

    /// Fetches the current batch of reports.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the batch cannot be fetched or decoded.
    async fn fetch_reports(&self) -> Result<Vec<ReportRecord>, SourceError>;
}

/// Resolves a report's image storage key to a displayable URL.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// Returns the URL for `image_ref`, or `None` if the image has no
    /// public location.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if resolution fails. Callers treat this the
    /// same as `Ok(None)`.
    async fn resolve_image_url(&self, image_ref: &str) -> Result<Option<String>, SourceError>;
}
