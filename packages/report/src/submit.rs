//! Report submission endpoint.
//!
//! A report is a single multipart `POST` with three fields: `file` (the
//! photo), `latitude` and `longitude` (decimal strings). Any 2xx status is
//! success; everything else is a failure carrying the status code.

use async_trait::async_trait;
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use strikenet_report_models::Coordinates;

use crate::CapturedFile;

/// Default API base for report submission.
pub const DEFAULT_API_BASE: &str = "https://render.com/strikenet";

/// Errors from submitting a report.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The request could not be sent or the response could not be read.
    #[error("Upload failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("Upload failed: HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The endpoint URL could not be built.
    #[error("Invalid URL: {message}")]
    Url {
        /// Description of what went wrong.
        message: String,
    },
}

/// One photo and the position it was taken at.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSubmission {
    /// The captured photo.
    pub file: CapturedFile,
    /// Where the photo was taken.
    pub coordinates: Coordinates,
}

/// Anything that can accept a report.
#[async_trait]
pub trait ReportSubmitter: Send + Sync {
    /// Uploads one report.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] on transport failure or a non-2xx status.
    async fn submit(&self, submission: ReportSubmission) -> Result<(), SubmitError>;
}

/// Submits reports as multipart form posts.
#[derive(Debug, Clone)]
pub struct HttpReportSubmitter {
    client: reqwest::Client,
    url: Url,
}

impl HttpReportSubmitter {
    /// Creates a submitter posting to `{api_base}/report`.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Url`] if `api_base` is not a usable base URL.
    pub fn new(client: reqwest::Client, api_base: &str) -> Result<Self, SubmitError> {
        let mut url = Url::parse(api_base).map_err(|e| SubmitError::Url {
            message: format!("{api_base}: {e}"),
        })?;
        url.path_segments_mut()
            .map_err(|()| SubmitError::Url {
                message: format!("{api_base}: cannot be a base URL"),
            })?
            .pop_if_empty()
            .push("report");
        Ok(Self { client, url })
    }

    /// The resolved endpoint URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ReportSubmitter for HttpReportSubmitter {
    async fn submit(&self, submission: ReportSubmission) -> Result<(), SubmitError> {
        let ReportSubmission { file, coordinates } = submission;
        log::info!(
            "Submitting {} ({} bytes) at {}, {}",
            file.file_name,
            file.bytes.len(),
            coordinates.latitude,
            coordinates.longitude
        );

        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = Form::new()
            .part("file", part)
            .text("latitude", coordinates.latitude.to_string())
            .text("longitude", coordinates.longitude.to_string());

        let response = self
            .client
            .post(self.url.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            log::info!("Report accepted with HTTP {status}");
            Ok(())
        } else {
            log::warn!("Report rejected with HTTP {status}");
            Err(SubmitError::Status {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    use super::*;

    /// Accepts one request, answers with `status_line`, and hands the raw
    /// request bytes back.
    async fn serve_once(status_line: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request.ends_with(b"--\r\n") || request.ends_with(b"0\r\n\r\n") {
                    break;
                }
            }
            let response =
                format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
        });

        (format!("http://{addr}/strikenet"), rx)
    }

    fn submission() -> ReportSubmission {
        ReportSubmission {
            file: CapturedFile::new("photo.jpg", b"jpegdata".to_vec()),
            coordinates: Coordinates::new(40.0, -75.0),
        }
    }

    #[test]
    fn endpoint_is_report_under_base() {
        let submitter =
            HttpReportSubmitter::new(reqwest::Client::new(), DEFAULT_API_BASE).unwrap();
        assert_eq!(
            submitter.url().as_str(),
            "https://render.com/strikenet/report"
        );
        assert!(HttpReportSubmitter::new(reqwest::Client::new(), "nope").is_err());
    }

    #[tokio::test]
    async fn posts_multipart_fields() {
        let (base, request) = serve_once("HTTP/1.1 201 Created").await;
        let submitter = HttpReportSubmitter::new(reqwest::Client::new(), &base).unwrap();

        submitter.submit(submission()).await.unwrap();

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /strikenet/report "));
        assert!(request.contains("multipart/form-data"));
        assert!(request.contains("name=\"file\"; filename=\"photo.jpg\""));
        assert!(request.contains("image/jpeg"));
        assert!(request.contains("jpegdata"));
        assert!(request.contains("name=\"latitude\"\r\n\r\n40\r\n"));
        assert!(request.contains("name=\"longitude\"\r\n\r\n-75\r\n"));
    }

    #[tokio::test]
    async fn non_2xx_is_a_status_error() {
        let (base, _request) = serve_once("HTTP/1.1 500 Internal Server Error").await;
        let submitter = HttpReportSubmitter::new(reqwest::Client::new(), &base).unwrap();

        let err = submitter.submit(submission()).await.unwrap_err();
        assert!(matches!(err, SubmitError::Status { status: 500 }));
        assert_eq!(err.to_string(), "Upload failed: HTTP 500");
    }
}
