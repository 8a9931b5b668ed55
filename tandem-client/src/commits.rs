//! Commit and dispatch endpoints

use reqwest::Method;
use tandem_core::domain::repo::RepoCoordinate;
use tandem_core::dto::github::{CommitInfo, RepositoryDispatch};

use crate::GitHubClient;
use crate::error::{ClientError, Result};
use crate::{handle_empty_response, handle_response};

impl GitHubClient {
    // =============================================================================
    // Commits
    // =============================================================================

    /// Get the hash of the most recent commit on a branch
    ///
    /// # Arguments
    /// * `repo` - The source repository
    /// * `branch` - Branch (or any ref) to resolve
    ///
    /// # Returns
    /// The full commit SHA
    pub async fn latest_commit(&self, repo: &RepoCoordinate, branch: &str) -> Result<String> {
        let url = format!("{}/commits/{}", self.repo_url(repo), branch);
        let response = self.request(Method::GET, &url).send().await?;

        let commit: CommitInfo = handle_response(response).await?;
        if commit.sha.is_empty() {
            return Err(ClientError::ParseError(format!(
                "empty commit sha for {}@{}",
                repo, branch
            )));
        }

        Ok(commit.sha)
    }

    // =============================================================================
    // Dispatch
    // =============================================================================

    /// Fire a repository dispatch event on the build repository
    ///
    /// # Arguments
    /// * `repo` - The repository whose workflows listen for the event
    /// * `dispatch` - Event type and payload
    pub async fn dispatch(&self, repo: &RepoCoordinate, dispatch: &RepositoryDispatch) -> Result<()> {
        let url = format!("{}/dispatches", self.repo_url(repo));
        let response = self
            .request(Method::POST, &url)
            .json(dispatch)
            .send()
            .await?;

        handle_empty_response(response).await
    }
}
