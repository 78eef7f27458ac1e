//! Device geolocation contract.

use std::time::Duration;

use async_trait::async_trait;
use strikenet_report_models::Coordinates;

/// How long a position request may take before it counts as failed.
pub const DEFAULT_POSITION_TIMEOUT: Duration = Duration::from_secs(15);

/// Options for a position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Ask for GPS-grade accuracy.
    pub high_accuracy: bool,
    /// Upper bound on the request.
    pub timeout: Duration,
    /// Oldest cached fix the device may return. Zero forces a fresh fix.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: DEFAULT_POSITION_TIMEOUT,
            maximum_age: Duration::ZERO,
        }
    }
}

/// Reasons a position could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    /// The user or platform refused location access.
    #[error("User denied Geolocation")]
    PermissionDenied,

    /// The device could not determine a position.
    #[error("Position unavailable: {message}")]
    PositionUnavailable {
        /// Platform-provided detail.
        message: String,
    },

    /// No fix arrived within the requested timeout.
    #[error("Timeout expired")]
    Timeout,

    /// The host has no geolocation capability.
    #[error("Geolocation not supported")]
    Unsupported,
}

impl GeolocationError {
    /// The W3C `GeolocationPositionError` code, where one exists.
    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        match self {
            Self::PermissionDenied => Some(1),
            Self::PositionUnavailable { .. } => Some(2),
            Self::Timeout => Some(3),
            Self::Unsupported => None,
        }
    }
}

/// A source of the device's current position.
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Requests the current position.
    ///
    /// # Errors
    ///
    /// Returns [`GeolocationError`] if permission is denied, no fix is
    /// available, or the request times out.
    async fn current_position(
        &self,
        options: PositionOptions,
    ) -> Result<Coordinates, GeolocationError>;
}

/// Always reports the same position. Used by hosts that take the position
/// from the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedGeolocator {
    position: Coordinates,
}

impl FixedGeolocator {
    /// Creates a geolocator pinned to `position`.
    #[must_use]
    pub const fn new(position: Coordinates) -> Self {
        Self { position }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinates, GeolocationError> {
        Ok(self.position)
    }
}

/// A host without geolocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedGeolocator;

#[async_trait]
impl Geolocator for UnsupportedGeolocator {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinates, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_force_fresh_fix() {
        let options = PositionOptions::default();
        assert!(options.high_accuracy);
        assert_eq!(options.timeout, Duration::from_millis(15_000));
        assert_eq!(options.maximum_age, Duration::ZERO);
    }

    #[test]
    fn error_codes() {
        assert_eq!(GeolocationError::PermissionDenied.code(), Some(1));
        assert_eq!(GeolocationError::Timeout.code(), Some(3));
        assert_eq!(GeolocationError::Unsupported.code(), None);
        assert_eq!(
            GeolocationError::Unsupported.to_string(),
            "Geolocation not supported"
        );
    }
}
