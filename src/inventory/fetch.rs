//! Remote fetcher for the conductor inventory service.
//!
//! A single blocking GET, no retries. The request URL is
//! `{base}/api/generator/rivik.ansible-inventory?projects=<names>`.

use reqwest::StatusCode;
use tracing::debug;

use crate::error::{Error, Result};

/// Generator endpoint producing the dynamic inventory document
pub const INVENTORY_ENDPOINT: &str = "api/generator/rivik.ansible-inventory";

/// Transport used by the loader to obtain the raw inventory document
#[cfg_attr(test, mockall::automock)]
pub trait Fetch: Send + Sync {
    /// Fetch the raw document for the given work groups
    fn fetch(&self, base_url: &str, work_groups: &[String]) -> Result<Vec<u8>>;
}

/// Build the request URL for a work group selection
pub fn inventory_url(base_url: &str, work_groups: &[String]) -> String {
    format!(
        "{}/{}?projects={}",
        base_url.trim_end_matches('/'),
        INVENTORY_ENDPOINT,
        work_groups.join(",")
    )
}

/// HTTP fetcher backed by a blocking `reqwest` client
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: reqwest::blocking::Client,
}

impl RemoteFetcher {
    /// Create a fetcher with the client's default settings
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Create a fetcher around an existing client
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Fetch for RemoteFetcher {
    fn fetch(&self, base_url: &str, work_groups: &[String]) -> Result<Vec<u8>> {
        let url = inventory_url(base_url, work_groups);
        debug!(url = %url, "fetching inventory");

        let response = self.client.get(&url).send().map_err(|e| {
            if e.is_timeout() {
                Error::transport(&url, format!("request timed out: {}", e))
            } else if e.is_connect() {
                Error::transport(&url, format!("connection failed: {}", e))
            } else {
                Error::transport(&url, format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::http_status(
                &url,
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
            ));
        }

        let body = response
            .bytes()
            .map_err(|e| Error::transport(&url, format!("failed to read response body: {}", e)))?;

        debug!(url = %url, bytes = body.len(), "fetched inventory");
        Ok(body.to_vec())
    }
}
