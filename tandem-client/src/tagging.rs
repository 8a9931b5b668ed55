//! Tagging service client

use reqwest::Client;
use tandem_core::dto::tagging::{TagRequest, TaggedArtifact};

use crate::error::Result;
use crate::{REQUEST_TIMEOUT, check_reachable, handle_empty_response, join_url, normalize_base_url};

/// HTTP client for the tagging/notification service
#[derive(Debug, Clone)]
pub struct TaggingClient {
    base_url: String,
    client: Client,
}

impl TaggingClient {
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

    fn artifact_url(&self, req: &TagRequest) -> Result<String> {
        join_url(
            &self.base_url,
            [
                "api",
                "repos",
                req.repo_name.as_str(),
                "branches",
                req.branch.as_str(),
                "tags",
                req.tag.as_str(),
                "artifacts",
                req.artifact_name.as_str(),
            ],
        )
    }

    /// Check that the service answers at all
    pub async fn check_available(&self) -> Result<()> {
        check_reachable(&self.client, &self.base_url).await
    }

    /// Record a stored artifact under a tag
    ///
    /// Tagging the same artifact twice overwrites the earlier entry, so a
    /// retried tick is harmless.
    pub async fn tag_artifact(&self, req: &TagRequest) -> Result<()> {
        let url = self.artifact_url(req)?;
        let response = self
            .client
            .put(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&TaggedArtifact::from(req))
            .send()
            .await?;

        handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TagRequest {
        TagRequest {
            repo_name: "proton-builder".to_string(),
            branch: "main".to_string(),
            tag: "untested".to_string(),
            run_number: 3,
            build_url: None,
            build_updated_at: None,
            artifact_name: "dist".to_string(),
            storage_url: "http://localhost:8081/proton-builder/main/3/dist.zip".to_string(),
            artifact_created_at: None,
        }
    }

    #[test]
    fn test_artifact_url() {
        let client = TaggingClient::new("http://localhost:8080");
        assert_eq!(
            client.artifact_url(&request()).unwrap(),
            "http://localhost:8080/api/repos/proton-builder/branches/main/tags/untested/artifacts/dist"
        );
    }

    #[test]
    fn test_artifact_url_escapes_each_segment() {
        let client = TaggingClient::new("http://localhost:8080");
        let mut req = request();
        req.branch = "release/1.0".to_string();
        req.artifact_name = "python 3.9".to_string();

        assert_eq!(
            client.artifact_url(&req).unwrap(),
            "http://localhost:8080/api/repos/proton-builder/branches/release%2F1.0/tags/untested/artifacts/python%203.9"
        );
    }
}
