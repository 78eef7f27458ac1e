//! File capture surface contract and captured file payloads.
//!
//! Opening the capture surface (camera or file picker) does not return a
//! file. The host reports the user's choice later through
//! [`crate::ReportFlow::on_capture_selected`], or never, if the user
//! dismisses the picker.

use std::path::Path;

use tokio::sync::mpsc;

/// A photo chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFile {
    /// File name sent with the upload.
    pub file_name: String,
    /// MIME type of the contents.
    pub content_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl CapturedFile {
    /// Creates a captured file, guessing the MIME type from the name.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Reads a file from disk.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo")
            .to_string();
        Ok(Self::new(file_name, bytes))
    }
}

/// A native file chooser or camera.
pub trait CaptureSurface: Send + Sync {
    /// Shows the chooser. Returns immediately.
    fn open(&self);

    /// Clears the current selection so the same file can be chosen again.
    fn reset(&self);
}

/// Requests a [`ChannelCapture`] sends to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureRequest {
    /// Show the chooser.
    Open,
    /// Clear the chooser's selection.
    Reset,
}

/// Forwards capture requests over a channel to whatever owns the real
/// chooser.
#[derive(Debug, Clone)]
pub struct ChannelCapture {
    tx: mpsc::UnboundedSender<CaptureRequest>,
}

impl ChannelCapture {
    /// Creates the surface and the receiving end for the host.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CaptureRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, request: CaptureRequest) {
        if self.tx.send(request).is_err() {
            log::warn!("Capture host is gone, dropping {request:?}");
        }
    }
}

impl CaptureSurface for ChannelCapture {
    fn open(&self) {
        self.send(CaptureRequest::Open);
    }

    fn reset(&self) {
        self.send(CaptureRequest::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_content_type() {
        assert_eq!(CapturedFile::new("photo.JPG", vec![]).content_type, "image/jpeg");
        assert_eq!(CapturedFile::new("a.webp", vec![]).content_type, "image/webp");
        assert_eq!(
            CapturedFile::new("shots/iguana.jpeg", vec![]).content_type,
            "image/jpeg"
        );
        assert_eq!(
            CapturedFile::new("notes", vec![]).content_type,
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn reads_file_from_disk() {
        let path = std::env::temp_dir().join("strikenet_capture_test.png");
        tokio::fs::write(&path, b"\x89PNG").await.unwrap();

        let file = CapturedFile::from_path(&path).await.unwrap();
        assert_eq!(file.file_name, "strikenet_capture_test.png");
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.bytes, b"\x89PNG");

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[test]
    fn channel_capture_forwards_requests() {
        let (capture, mut rx) = ChannelCapture::new();
        capture.open();
        capture.reset();
        assert_eq!(rx.try_recv().unwrap(), CaptureRequest::Open);
        assert_eq!(rx.try_recv().unwrap(), CaptureRequest::Reset);

        drop(rx);
        capture.open();
    }
}
