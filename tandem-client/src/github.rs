//! GitHub REST API client

use reqwest::{Client, Method, RequestBuilder};
use tandem_core::domain::repo::RepoCoordinate;
use tandem_core::dto::github::RepositoryInfo;

use crate::error::Result;
use crate::{REQUEST_TIMEOUT, handle_response, normalize_base_url};

/// Media type GitHub recommends for REST API requests
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// HTTP client for the GitHub REST API
///
/// Endpoints are grouped by area:
/// - Repository metadata (this file)
/// - Commits and repository dispatches (`commits.rs`)
/// - Workflow runs and artifacts (`actions.rs`)
#[derive(Debug, Clone)]
pub struct GitHubClient {
    /// Base URL of the API (e.g., "https://api.github.com")
    pub(crate) base_url: String,
    /// HTTP client instance
    pub(crate) client: Client,
    /// Basic auth credentials (user id, token)
    auth: Option<(String, String)>,
}

impl GitHubClient {
    /// Create a new unauthenticated GitHub client
    ///
    /// # Example
    /// ```
    /// use tandem_client::GitHubClient;
    ///
    /// let client = GitHubClient::new("https://api.github.com");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new GitHub client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            client,
            auth: None,
        }
    }

    /// Authenticate every request with basic auth
    pub fn with_basic_auth(mut self, uid: impl Into<String>, token: impl Into<String>) -> Self {
        self.auth = Some((uid.into(), token.into()));
        self
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn repo_url(&self, repo: &RepoCoordinate) -> String {
        format!("{}/repos/{}/{}", self.base_url, repo.owner, repo.name)
    }

    /// Starts a metadata request, bounded by [`REQUEST_TIMEOUT`]
    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.transfer(method, url).timeout(REQUEST_TIMEOUT)
    }

    /// Starts a request carrying the GitHub accept header and credentials,
    /// with no whole-request timeout
    pub(crate) fn transfer(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT);

        match &self.auth {
            Some((uid, token)) => builder.basic_auth(uid, Some(token)),
            None => builder,
        }
    }

    // =============================================================================
    // Repository
    // =============================================================================

    /// Get repository metadata
    ///
    /// # Arguments
    /// * `repo` - The repository to look up
    ///
    /// # Returns
    /// The repository metadata, including whether it is disabled
    pub async fn repository(&self, repo: &RepoCoordinate) -> Result<RepositoryInfo> {
        let url = self.repo_url(repo);
        let response = self.request(Method::GET, &url).send().await?;

        handle_response(response).await
    }
}
