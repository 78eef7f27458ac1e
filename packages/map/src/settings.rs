//! Map configuration and setup errors.

use strikenet_report_models::Coordinates;

use crate::FitOptions;

/// Environment variable holding the map service access token.
pub const ACCESS_TOKEN_VAR: &str = "MAPBOX_TOKEN";

/// Default map style.
pub const DEFAULT_STYLE: &str = "mapbox://styles/mapbox/streets-v12";

/// Default initial centre (South Florida).
pub const DEFAULT_CENTER: Coordinates = Coordinates::new(25.7617, -80.1918);

/// Default initial zoom level.
pub const DEFAULT_ZOOM: f64 = 8.0;

/// Configuration problems that prevent a map from being created.
///
/// These are not recoverable at runtime. The owning component keeps the
/// error and renders it instead of a live map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    /// The access token is missing or blank.
    #[error("Missing Mapbox token. Set {variable} in the environment")]
    MissingAccessToken {
        /// Name of the variable that should hold the token.
        variable: String,
    },
}

/// Settings used to open a map surface.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    /// Map service access token.
    pub access_token: Option<String>,
    /// Style URL.
    pub style: String,
    /// Initial centre before any bounds are fitted.
    pub center: Coordinates,
    /// Initial zoom level.
    pub zoom: f64,
    /// Fit behaviour applied after each sync.
    pub fit: FitOptions,
}

impl MapSettings {
    /// Default settings with the given token.
    #[must_use]
    pub fn with_token(access_token: Option<String>) -> Self {
        Self {
            access_token,
            style: DEFAULT_STYLE.to_string(),
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            fit: FitOptions::default(),
        }
    }

    /// Reads the token from [`ACCESS_TOKEN_VAR`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::with_token(std::env::var(ACCESS_TOKEN_VAR).ok())
    }

    /// Returns the non-blank access token.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::MissingAccessToken`] if no usable token is
    /// configured.
    pub fn access_token(&self) -> Result<&str, SetupError> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SetupError::MissingAccessToken {
                variable: ACCESS_TOKEN_VAR.to_string(),
            })
    }
}
