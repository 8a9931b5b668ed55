//! HTTP implementations of the content store and tagging service, and the
//! connector that wires every client to one shared reqwest client

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tandem_client::{GitHubClient, Result, StorageClient, TaggingClient};
use tandem_core::dto::storage::{StorageRef, StoreTarget};
use tandem_core::dto::tagging::TagRequest;

use super::{ContentStore, RepositoryHost, ServiceConnector, TagService};

#[async_trait]
impl ContentStore for StorageClient {
    fn location(&self) -> &str {
        self.base_url()
    }

    async fn check_available(&self) -> Result<()> {
        StorageClient::check_available(self).await
    }

    async fn store(&self, target: &StoreTarget, content: Vec<u8>) -> Result<StorageRef> {
        StorageClient::store(self, target, content).await
    }
}

#[async_trait]
impl TagService for TaggingClient {
    fn location(&self) -> &str {
        self.base_url()
    }

    async fn check_available(&self) -> Result<()> {
        TaggingClient::check_available(self).await
    }

    async fn tag(&self, request: &TagRequest) -> Result<()> {
        self.tag_artifact(request).await
    }
}

/// Builds HTTP clients that share one connection pool
pub struct HttpConnector {
    http: Client,
    github: Arc<GitHubClient>,
}

impl HttpConnector {
    /// # Arguments
    /// * `http` - Shared reqwest client (timeouts, user agent)
    /// * `github_url` - GitHub API base URL
    /// * `uid` / `token` - GitHub basic auth credentials
    pub fn new(http: Client, github_url: &str, uid: &str, token: &str) -> Self {
        let github = GitHubClient::with_client(github_url, http.clone()).with_basic_auth(uid, token);
        Self {
            http,
            github: Arc::new(github),
        }
    }
}

impl ServiceConnector for HttpConnector {
    fn repository_host(&self) -> Arc<dyn RepositoryHost> {
        self.github.clone()
    }

    fn content_store(&self, base_url: &str) -> Arc<dyn ContentStore> {
        Arc::new(StorageClient::with_client(base_url, self.http.clone()))
    }

    fn tag_service(&self, base_url: &str) -> Arc<dyn TagService> {
        Arc::new(TaggingClient::with_client(base_url, self.http.clone()))
    }
}
