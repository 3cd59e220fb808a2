//! Status endpoint clients.

use async_trait::async_trait;
use error_stack::Report;
use error_stack::ResultExt;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use tracing::info;
use url::Url;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::error::SourceResult;

/// Something that can be asked for the current node list.
///
/// Implementations return the raw body; shape validation is the store's job.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch one status body.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Network`] on transport failure or timeout
    /// - [`SourceError::Http`] on a non-success status
    /// - [`SourceError::Validation`] if the body is not JSON
    async fn fetch(&self) -> SourceResult<Value>;
}

/// `GET <origin>/api/status` over HTTP
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    http: Client,
    url: Url,
}

impl HttpStatusSource {
    /// create source
    pub fn new(config: &SourceConfig) -> SourceResult<Self> {
        let url = config.status_url()?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .change_context(SourceError::Configuration {
                message: "Failed to create HTTP client".into(),
            })?;

        info!(url = %url, timeout_ms = config.request_timeout.as_millis() as u64, "Status source created");

        Ok(Self { http, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self) -> SourceResult<Value> {
        debug!(url = %self.url, "Fetching status");
        let response = self
            .http
            .get(self.url.clone())
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| {
                let message = e.to_string();
                Report::new(e).change_context(SourceError::Network { message })
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Report::new(SourceError::Http {
                status: status.as_u16(),
            })
            .attach_printable(format!("url: {}", self.url)));
        }

        response
            .json::<Value>()
            .await
            .change_context(SourceError::validation("body is not JSON"))
    }
}
