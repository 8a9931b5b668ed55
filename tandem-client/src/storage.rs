//! Content-storage client
//!
//! The content store keeps artifact archives under
//! `<base_url>/<repo>/<branch>/<run_number>/<artifact>.zip`.

use reqwest::Client;
use tandem_core::dto::storage::{StorageRef, StoreTarget};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::{check_reachable, handle_empty_response, join_url, normalize_base_url};

/// HTTP client for the content-storage service
#[derive(Debug, Clone)]
pub struct StorageClient {
    base_url: String,
    client: Client,
}

impl StorageClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the stored archive, each path segment percent-encoded
    pub fn url_for(&self, target: &StoreTarget) -> Result<String> {
        join_url(&self.base_url, target.segments())
    }

    /// Checks the store answers at all, whatever the status
    pub async fn check_available(&self) -> Result<()> {
        check_reachable(&self.client, &self.base_url).await
    }

    /// Uploads an artifact archive
    ///
    /// Uploads carry no whole-request timeout; a stalled transfer is cut off
    /// by the client's read timeout.
    pub async fn store(&self, target: &StoreTarget, content: Vec<u8>) -> Result<StorageRef> {
        if content.is_empty() {
            return Err(ClientError::InvalidRequest(format!(
                "refusing to store empty archive {}",
                target.file_name()
            )));
        }

        let url = self.url_for(target)?;
        debug!("Storing {} bytes at {}", content.len(), url);

        let response = self.upload_request(&url, content).send().await?;

        handle_empty_response(response).await?;
        Ok(StorageRef { url })
    }

    fn upload_request(&self, url: &str, content: Vec<u8>) -> reqwest::RequestBuilder {
        self.client
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/zip")
            .body(content)
    }
}
