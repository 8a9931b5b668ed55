//! Tandem HTTP Clients
//!
//! Small, type-safe async clients for the three services the Tandem pollers
//! talk to:
//! - [`GitHubClient`]: commits, repository dispatches, workflow runs and
//!   artifact downloads
//! - [`StorageClient`]: uploads artifact archives to the content store
//! - [`TaggingClient`]: records tags against stored artifacts
//!
//! # Example
//!
//! ```no_run
//! use tandem_client::GitHubClient;
//! use tandem_core::domain::repo::RepoCoordinate;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tandem_client::ClientError> {
//!     let client = GitHubClient::new("https://api.github.com");
//!     let repo = RepoCoordinate::new("acme", "proton");
//!
//!     let sha = client.latest_commit(&repo, "main").await?;
//!     println!("main is at {}", sha);
//!     Ok(())
//! }
//! ```

pub mod error;
mod actions;
mod commits;
mod github;
mod storage;
mod tagging;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use github::GitHubClient;
pub use storage::StorageClient;
pub use tagging::TaggingClient;

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// User agent sent with every request (GitHub rejects requests without one)
pub const USER_AGENT: &str = concat!("tandem-poller/", env!("CARGO_PKG_VERSION"));

/// Time allowed to establish a connection to any service
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest pause between two reads of a response body. Bounds stalled
/// artifact transfers without capping how long a large one may take.
pub const READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Whole-request timeout for metadata calls (everything except artifact
/// downloads and uploads)
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds the reqwest client shared by all service clients
///
/// The client itself carries no total timeout: metadata calls add
/// [`REQUEST_TIMEOUT`] per request, while artifact transfers are only bounded
/// by [`READ_TIMEOUT`] so that large archives can finish.
pub fn default_http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .read_timeout(READ_TIMEOUT)
        .build()
        .map_err(ClientError::RequestFailed)
}

fn normalize_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

// =============================================================================
// Response Handlers
// =============================================================================

/// Handle an API response and deserialize JSON
///
/// Checks the status code and returns an appropriate error if the request
/// failed, or deserializes the response body if successful.
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = check_status(response).await?;

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Handle an API response that returns no content (e.g., PUT/POST operations)
async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    check_status(response).await?;
    Ok(())
}

/// Handle an API response whose body is raw bytes
async fn handle_bytes_response(response: reqwest::Response) -> Result<Vec<u8>> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    Ok(bytes.to_vec())
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(response)
}

/// Checks that a service answers HTTP at all
///
/// Any response, including an error status, counts as "running": only a
/// failure to get a response is reported.
async fn check_reachable(client: &Client, url: &str) -> Result<()> {
    client.get(url).timeout(REQUEST_TIMEOUT).send().await?;
    Ok(())
}

/// Appends `segments` to `base_url`, percent-encoding each one, so a branch
/// such as `release/1.0` stays a single segment
fn join_url<I>(base_url: &str, segments: I) -> Result<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut url = reqwest::Url::parse(base_url)
        .map_err(|e| ClientError::InvalidRequest(format!("invalid base URL {}: {}", base_url, e)))?;

    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidRequest(format!("{} cannot be a base URL", base_url)))?
        .pop_if_empty()
        .extend(segments);

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_trims_trailing_slashes() {
        assert_eq!(normalize_base_url("http://localhost:8080/"), "http://localhost:8080");
        assert_eq!(normalize_base_url("http://localhost:8080"), "http://localhost:8080");
    }

    #[test]
    fn test_user_agent_names_the_poller() {
        assert!(USER_AGENT.starts_with("tandem-poller/"));
    }

    #[test]
    fn test_join_url_escapes_each_segment() {
        assert_eq!(
            join_url("http://localhost:8081", ["proton", "release/1.0", "3", "dist.zip"]).unwrap(),
            "http://localhost:8081/proton/release%2F1.0/3/dist.zip"
        );
        assert_eq!(
            join_url("http://localhost:8081/bodega", ["proton"]).unwrap(),
            "http://localhost:8081/bodega/proton"
        );
    }

    #[test]
    fn test_join_url_rejects_invalid_base() {
        assert!(matches!(
            join_url("not a url", ["x"]),
            Err(ClientError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_default_http_client_builds() {
        assert!(default_http_client().is_ok());
    }
}
