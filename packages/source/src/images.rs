//! Image URL resolvers.

use async_trait::async_trait;
use reqwest::Url;

use crate::{ImageResolver, SourceError};

/// Resolves image keys against a public storage bucket URL.
///
/// `https://cdn.example.com/reports/` + `fox.jpg` becomes
/// `https://cdn.example.com/reports/fox.jpg`. Keys are percent-encoded as
/// a single path segment.
#[derive(Debug, Clone)]
pub struct PublicUrlResolver {
    base: Url,
}

impl PublicUrlResolver {
    /// Creates a resolver rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Url`] if `base_url` is not an absolute URL
    /// that can carry path segments.
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        let base = Url::parse(base_url).map_err(|e| SourceError::Url {
            message: format!("{base_url}: {e}"),
        })?;
        if base.cannot_be_a_base() {
            return Err(SourceError::Url {
                message: format!("{base_url}: cannot be a base URL"),
            });
        }
        Ok(Self { base })
    }
}

#[async_trait]
impl ImageResolver for PublicUrlResolver {
    async fn resolve_image_url(&self, image_ref: &str) -> Result<Option<String>, SourceError> {
        let key = image_ref.trim();
        if key.is_empty() {
            return Ok(None);
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| SourceError::Url {
                message: format!("{}: cannot be a base URL", self.base),
            })?
            .pop_if_empty()
            .push(key);

        Ok(Some(url.to_string()))
    }
}

/// Resolver for deployments without image hosting.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImageResolver;

#[async_trait]
impl ImageResolver for NoImageResolver {
    async fn resolve_image_url(&self, _image_ref: &str) -> Result<Option<String>, SourceError> {
        Ok(None)
    }
}
