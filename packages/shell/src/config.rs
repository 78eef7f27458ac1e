//! Environment configuration for the shell.

use std::sync::Arc;

use strikenet_map::MapSettings;
use strikenet_map::settings::ACCESS_TOKEN_VAR;
use strikenet_report::{DEFAULT_API_BASE, HttpReportSubmitter, ReportSubmitter};
use strikenet_source::{
    HttpReportSource, ImageResolver, MockReportSource, NoImageResolver, PublicUrlResolver,
    ReportSource,
};

use crate::ShellError;

/// Overrides the report API base URL.
pub const API_BASE_VAR: &str = "STRIKENET_API_BASE";

/// Public base URL that image keys are resolved against.
pub const IMAGE_BASE_VAR: &str = "STRIKENET_IMAGE_BASE";

/// Serve the built-in sample dataset instead of calling the API.
pub const MOCK_REPORTS_VAR: &str = "STRIKENET_MOCK_REPORTS";

/// Everything the shell needs from its environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellConfig {
    /// Map settings, including the access token.
    pub map: MapSettings,
    /// Base URL for `GET /reports` and `POST /report`.
    pub api_base: String,
    /// Where report images are hosted, if anywhere.
    pub image_base: Option<String>,
    /// Use [`MockReportSource`] instead of the API.
    pub mock_reports: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            map: MapSettings::with_token(None),
            api_base: DEFAULT_API_BASE.to_string(),
            image_base: None,
            mock_reports: false,
        }
    }
}

impl ShellConfig {
    /// Reads the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            map: MapSettings::with_token(lookup(ACCESS_TOKEN_VAR)),
            api_base: non_blank(API_BASE_VAR).unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            image_base: non_blank(IMAGE_BASE_VAR),
            mock_reports: non_blank(MOCK_REPORTS_VAR).is_some_and(|v| is_truthy(&v)),
        }
    }

    /// The report source this config selects.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Source`] if the API base is not a valid URL.
    pub fn report_source(
        &self,
        client: &reqwest::Client,
    ) -> Result<Arc<dyn ReportSource>, ShellError> {
        if self.mock_reports {
            log::info!("Using mock report source");
            return Ok(Arc::new(MockReportSource::south_florida()));
        }
        let source = HttpReportSource::new(client.clone(), &self.api_base)?;
        log::info!("Using report source at {}", source.url());
        Ok(Arc::new(source))
    }

    /// The image resolver this config selects.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Source`] if the image base is not a valid URL.
    pub fn image_resolver(&self) -> Result<Arc<dyn ImageResolver>, ShellError> {
        match &self.image_base {
            Some(base) => Ok(Arc::new(PublicUrlResolver::new(base)?)),
            None => {
                log::debug!("{IMAGE_BASE_VAR} not set, popups will have no images");
                Ok(Arc::new(NoImageResolver))
            }
        }
    }

    /// The report submitter this config selects.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Submit`] if the API base is not a valid URL.
    pub fn report_submitter(
        &self,
        client: &reqwest::Client,
    ) -> Result<Arc<dyn ReportSubmitter>, ShellError> {
        Ok(Arc::new(HttpReportSubmitter::new(
            client.clone(),
            &self.api_base,
        )?))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ShellConfig {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ShellConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]);
        assert_eq!(config, ShellConfig::default());
        assert_eq!(config.api_base, "https://render.com/strikenet");
        assert!(config.map.access_token().is_err());
        assert!(!config.mock_reports);
    }

    #[test]
    fn reads_every_variable() {
        let config = config(&[
            ("MAPBOX_TOKEN", "pk.test"),
            ("STRIKENET_API_BASE", " http://localhost:8080/api "),
            ("STRIKENET_IMAGE_BASE", "https://cdn.example.com/img/"),
            ("STRIKENET_MOCK_REPORTS", "TRUE"),
        ]);
        assert_eq!(config.map.access_token().unwrap(), "pk.test");
        assert_eq!(config.api_base, "http://localhost:8080/api");
        assert_eq!(
            config.image_base.as_deref(),
            Some("https://cdn.example.com/img/")
        );
        assert!(config.mock_reports);
    }

    #[test]
    fn blank_values_fall_back() {
        let config = config(&[
            ("STRIKENET_API_BASE", "  "),
            ("STRIKENET_IMAGE_BASE", ""),
            ("STRIKENET_MOCK_REPORTS", "0"),
        ]);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(config.image_base.is_none());
        assert!(!config.mock_reports);
    }

    #[test]
    fn selects_sources() {
        let client = reqwest::Client::new();
        let mock = config(&[("STRIKENET_MOCK_REPORTS", "1")]);
        assert_eq!(mock.report_source(&client).unwrap().name(), "mock");

        let http = config(&[]);
        assert_eq!(http.report_source(&client).unwrap().name(), "http");

        let broken = config(&[("STRIKENET_API_BASE", "not a url")]);
        assert!(matches!(
            broken.report_source(&client),
            Err(ShellError::Source(_))
        ));
        assert!(matches!(
            broken.report_submitter(&client),
            Err(ShellError::Submit(_))
        ));
        assert!(
            config(&[("STRIKENET_IMAGE_BASE", "relative/")])
                .image_resolver()
                .is_err()
        );
    }
}
