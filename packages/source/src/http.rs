//! Report source backed by the StrikeNet REST API.
//!
//! Issues a single `GET {api_base}/reports` and decodes the body as a JSON
//! array of [`ReportRecord`]s. There is no retry loop here: a failure is
//! reported to the map host, which renders it inline and shows an empty
//! map underneath.

use async_trait::async_trait;
use reqwest::Url;
use strikenet_report_models::ReportRecord;

use crate::{ReportSource, SourceError};

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Fetches reports over HTTP.
#[derive(Debug, Clone)]
pub struct HttpReportSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpReportSource {
    /// Creates a source that reads `{api_base}/reports`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Url`] if `api_base` is not a valid base URL.
    pub fn new(client: reqwest::Client, api_base: &str) -> Result<Self, SourceError> {
        let url = endpoint(api_base, "reports")?;
        Ok(Self { client, url })
    }

    /// The resolved endpoint URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ReportSource for HttpReportSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_reports(&self) -> Result<Vec<ReportRecord>, SourceError> {
        log::info!("Fetching reports from {}", self.url);

        let response = self.client.get(self.url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::warn!("Report fetch returned HTTP {status}");
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        match serde_json::from_str::<Vec<ReportRecord>>(&text) {
            Ok(records) => {
                log::info!("Fetched {} reports", records.len());
                Ok(records)
            }
            Err(e) => {
                let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
                log::error!(
                    "Report body is not a JSON array of reports.\n  \
                     url: {}\n  \
                     received: {} bytes\n  \
                     parse error: {e}\n  \
                     body preview: {preview}",
                    self.url,
                    text.len(),
                );
                Err(SourceError::Json(e))
            }
        }
    }
}

/// Appends `path` to `api_base`, keeping any existing path prefix.
///
/// `https://render.com/strikenet` + `reports` gives
/// `https://render.com/strikenet/reports`.
///
/// # Errors
///
/// Returns [`SourceError::Url`] if `api_base` cannot be parsed or cannot
/// carry path segments.
pub fn endpoint(api_base: &str, path: &str) -> Result<Url, SourceError> {
    let mut url = Url::parse(api_base).map_err(|e| SourceError::Url {
        message: format!("{api_base}: {e}"),
    })?;
    url.path_segments_mut()
        .map_err(|()| SourceError::Url {
            message: format!("{api_base}: cannot be a base URL"),
        })?
        .pop_if_empty()
        .push(path);
    Ok(url)
}
