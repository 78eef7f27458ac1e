//! Fixed in-memory report dataset.
//!
//! Stands in for the backend while it is unavailable. Ships the four
//! South Florida iguana sightings used during field testing.

use async_trait::async_trait;
use strikenet_report_models::ReportRecord;

use crate::{ReportSource, SourceError};

/// A [`ReportSource`] that always returns the same records.
#[derive(Debug, Clone)]
pub struct MockReportSource {
    records: Vec<ReportRecord>,
}

impl MockReportSource {
    /// Creates a source that returns `records` on every fetch.
    #[must_use]
    pub const fn new(records: Vec<ReportRecord>) -> Self {
        Self { records }
    }

    /// The built-in South Florida dataset.
    #[must_use]
    pub fn south_florida() -> Self {
        let iguana = |lat: f64, lng: f64, image: &str| {
            ReportRecord::at(lat, lng)
                .with_species("iguana")
                .with_image(image)
                .with_invasive(true)
        };

        Self::new(vec![
            iguana(26.3683, -80.1289, "iguana0001.jpg"),
            iguana(26.1224, -80.1373, "iguana0002.jpg"),
            iguana(25.7296, -80.2428, "iguana0003.jpg"),
            iguana(26.7153, -80.0534, "iguana0004.jpg"),
        ])
    }
}

impl Default for MockReportSource {
    fn default() -> Self {
        Self::south_florida()
    }
}

#[async_trait]
impl ReportSource for MockReportSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_reports(&self) -> Result<Vec<ReportRecord>, SourceError> {
        log::debug!("Serving {} mock reports", self.records.len());
        Ok(self.records.clone())
    }
}
