//! HTTP client for a remote CrowdJuke submission store.

use crate::api::{NewSubmission, SubmissionStore, SubmitRequest, SubmitResponse};
use crate::error::{Error, Result};
use async_trait::async_trait;
use cjqueue::Track;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Default timeout for store HTTP requests
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "cjstore/0.1.0";

/// Error body of the CrowdJuke HTTP surface
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client of a remote CrowdJuke deployment's submission API.
///
/// Speaks the same wire format as `cjserver`; display sessions use it to
/// poll a store they do not host themselves.
///
/// # Example
///
/// ```no_run
/// use cjstore::{RemoteStore, SubmissionStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = RemoteStore::builder()
///         .api_base("https://jukebox.example.com/api")
///         .build()?;
///
///     let latest = store.fetch_latest("dagapur").await?;
///     println!("latest: {:?}", latest.map(|t| t.title));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    api_base: String,
    cron_key: Option<String>,
}

impl RemoteStore {
    /// Create a builder for configuring the client
    pub fn builder() -> RemoteStoreBuilder {
        RemoteStoreBuilder::default()
    }

    /// Get the internal HTTP client
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}/{}", self.api_base, path))?)
    }
}

#[async_trait]
impl SubmissionStore for RemoteStore {
    async fn insert(&self, submission: NewSubmission) -> Result<Track> {
        let url = self.endpoint("submit")?;
        let body = SubmitRequest {
            location: submission.location_id,
            youtube_link: submission.media_ref,
            name: submission.submitted_by,
        };

        let response = self.client.post(url).json(&body).send().await?;

        if response.status().is_success() {
            let accepted: SubmitResponse = response.json().await?;
            return Ok(accepted.track);
        }

        let status = response.status();
        match response.json::<ErrorBody>().await {
            Ok(err) if err.error == "duplicate_song" => Err(Error::DuplicateSubmission),
            Ok(err) if err.error == "Invalid location" => {
                Err(Error::InvalidLocation(body.location))
            }
            Ok(err) => Err(Error::other(err.error)),
            Err(_) => Err(Error::UnexpectedStatus(status.as_u16())),
        }
    }

    async fn fetch_latest(&self, location_id: &str) -> Result<Option<Track>> {
        let mut url = self.endpoint("latest")?;
        url.query_pairs_mut().append_pair("location", location_id);

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if status.is_success() {
            Ok(Some(response.json().await?))
        } else {
            Err(Error::UnexpectedStatus(status.as_u16()))
        }
    }

    async fn recent(&self, location_id: &str, _within: Duration) -> Result<Vec<Track>> {
        // The retention window is applied server side.
        let mut url = self.endpoint("entries")?;
        url.query_pairs_mut().append_pair("location", location_id);

        let response = self.client.get(url).send().await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Error::UnexpectedStatus(response.status().as_u16()))
        }
    }

    async fn clear(&self, location_id: &str) -> Result<u64> {
        let mut url = self.endpoint("admin/clear")?;
        url.query_pairs_mut().append_pair("location", location_id);

        let mut request = self.client.post(url);
        if let Some(key) = &self.cron_key {
            request = request.header("x-cron-key", key);
        }

        let response = request.send().await?;

        if response.status().is_success() {
            #[derive(Deserialize)]
            struct Cleared {
                dropped: u64,
            }
            let cleared: Cleared = response.json().await?;
            Ok(cleared.dropped)
        } else {
            Err(Error::UnexpectedStatus(response.status().as_u16()))
        }
    }
}

/// Builder for configuring a RemoteStore
#[derive(Debug)]
pub struct RemoteStoreBuilder {
    client: Option<Client>,
    api_base: Option<String>,
    request_timeout: Duration,
    user_agent: String,
    cron_key: Option<String>,
}

impl Default for RemoteStoreBuilder {
    fn default() -> Self {
        Self {
            client: None,
            api_base: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cron_key: None,
        }
    }
}

impl RemoteStoreBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the API base URL (e.g. `https://host:8080/api`)
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the shared secret for the admin cleanup endpoint
    pub fn cron_key(mut self, key: impl Into<String>) -> Self {
        self.cron_key = Some(key.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<RemoteStore> {
        let api_base = self
            .api_base
            .ok_or_else(|| Error::other("api_base is required"))?;
        let api_base = api_base.trim_end_matches('/').to_string();

        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.request_timeout)
                .build()?,
        };

        Ok(RemoteStore {
            client,
            api_base,
            cron_key: self.cron_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_api_base() {
        assert!(RemoteStore::builder().build().is_err());
    }

    #[test]
    fn test_builder_normalises_trailing_slash() {
        let store = RemoteStore::builder()
            .api_base("http://localhost:8080/api/")
            .build()
            .unwrap();
        assert_eq!(
            store.endpoint("latest").unwrap().as_str(),
            "http://localhost:8080/api/latest"
        );
    }
}
