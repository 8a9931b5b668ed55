//! Workflow run and artifact endpoints

use reqwest::{Method, RequestBuilder};
use tandem_core::domain::repo::RepoCoordinate;
use tandem_core::dto::github::{ArtifactInfo, ArtifactList, WorkflowRunInfo, WorkflowRunList};

use crate::GitHubClient;
use crate::error::Result;
use crate::{handle_bytes_response, handle_response};

/// GitHub caps `per_page` at 100
const MAX_PER_PAGE: usize = 100;

impl GitHubClient {
    // =============================================================================
    // Workflow Runs
    // =============================================================================

    /// List the most recent workflow runs of a repository, newest first
    ///
    /// # Arguments
    /// * `repo` - The build repository
    /// * `limit` - Number of runs to request (capped at 100)
    pub async fn list_workflow_runs(
        &self,
        repo: &RepoCoordinate,
        limit: usize,
    ) -> Result<Vec<WorkflowRunInfo>> {
        let url = format!("{}/actions/runs", self.repo_url(repo));
        let per_page = limit.clamp(1, MAX_PER_PAGE).to_string();
        let response = self
            .request(Method::GET, &url)
            .query(&[("per_page", per_page.as_str())])
            .send()
            .await?;

        let list: WorkflowRunList = handle_response(response).await?;
        Ok(list.workflow_runs)
    }

    /// List the artifacts attached to a workflow run
    ///
    /// # Arguments
    /// * `repo` - The build repository
    /// * `run_id` - Hosting service id of the run (not its run number)
    pub async fn list_run_artifacts(
        &self,
        repo: &RepoCoordinate,
        run_id: u64,
    ) -> Result<Vec<ArtifactInfo>> {
        let url = format!("{}/actions/runs/{}/artifacts", self.repo_url(repo), run_id);
        let per_page = MAX_PER_PAGE.to_string();
        let response = self
            .request(Method::GET, &url)
            .query(&[("per_page", per_page.as_str())])
            .send()
            .await?;

        let list: ArtifactList = handle_response(response).await?;
        Ok(list.artifacts)
    }

    // =============================================================================
    // Artifact Downloads
    // =============================================================================

    /// Download an artifact's zip archive into memory
    ///
    /// Downloads carry no whole-request timeout; a stalled transfer is cut
    /// off by the client's read timeout.
    pub async fn download_artifact(&self, repo: &RepoCoordinate, artifact_id: u64) -> Result<Vec<u8>> {
        let response = self.download_request(repo, artifact_id).send().await?;

        handle_bytes_response(response).await
    }

    fn download_request(&self, repo: &RepoCoordinate, artifact_id: u64) -> RequestBuilder {
        let url = format!("{}/actions/artifacts/{}/zip", self.repo_url(repo), artifact_id);
        self.transfer(Method::GET, &url)
    }
}
