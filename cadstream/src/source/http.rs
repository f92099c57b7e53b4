//! Model files served over HTTP.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use tracing::trace;

use crate::loading::{BoxFuture, FetchError};

use super::ModelSource;

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Serves files beneath a base URL using an async reqwest client.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    /// Create a source with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a named file.
    pub fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }

    async fn get(&self, url: String) -> Result<Bytes, FetchError> {
        let response = self.client.get(&url).send().await.map_err(|e| FetchError::Http {
            url: url.clone(),
            source: e.into(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Http {
            url: url.clone(),
            source: e.into(),
        })?;
        trace!(url = %url, bytes = body.len(), "Downloaded model file");
        Ok(body)
    }
}

impl ModelSource for HttpSource {
    fn fetch_file<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Bytes, FetchError>> {
        Box::pin(self.get(self.url_for(name)))
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_single_slash() {
        let source = HttpSource::new("https://models.example.com/plant/").unwrap();
        assert_eq!(source.base_url(), "https://models.example.com/plant");
        assert_eq!(source.url_for("scene.json"), "https://models.example.com/plant/scene.json");
        assert_eq!(source.url_for("/mesh_3.ctm"), "https://models.example.com/plant/mesh_3.ctm");
    }
}
