//! GitHub implementation of [`RepositoryHost`]

use async_trait::async_trait;
use tandem_client::{GitHubClient, Result};
use tandem_core::domain::repo::RepoCoordinate;
use tandem_core::domain::workflow::{Artifact, WorkflowRun};
use tandem_core::dto::github::{RepositoryDispatch, RepositoryInfo, TriggerPayload, WorkflowRunInfo};
use tracing::debug;

use super::RepositoryHost;

#[async_trait]
impl RepositoryHost for GitHubClient {
    async fn repository(&self, repo: &RepoCoordinate) -> Result<RepositoryInfo> {
        GitHubClient::repository(self, repo).await
    }

    async fn get_latest_commit(&self, repo: &RepoCoordinate, branch: &str) -> Result<String> {
        self.latest_commit(repo, branch).await
    }

    async fn dispatch_workflow(
        &self,
        repo: &RepoCoordinate,
        event_type: &str,
        payload: &TriggerPayload,
    ) -> Result<()> {
        let dispatch = RepositoryDispatch {
            event_type: event_type.to_string(),
            client_payload: payload.clone(),
        };
        self.dispatch(repo, &dispatch).await
    }

    async fn list_workflow_runs(&self, repo: &RepoCoordinate, limit: usize) -> Result<Vec<WorkflowRun>> {
        let infos = GitHubClient::list_workflow_runs(self, repo, limit).await?;
        debug!("Found {} workflow run(s) in {}", infos.len(), repo);

        Ok(infos.into_iter().map(WorkflowRunInfo::into_run).collect())
    }

    async fn list_run_artifacts(&self, repo: &RepoCoordinate, run: &WorkflowRun) -> Result<Vec<Artifact>> {
        let infos = GitHubClient::list_run_artifacts(self, repo, run.id).await?;

        Ok(infos.into_iter().map(Artifact::from).collect())
    }

    async fn download_artifact(&self, repo: &RepoCoordinate, artifact_id: u64) -> Result<Vec<u8>> {
        GitHubClient::download_artifact(self, repo, artifact_id).await
    }
}
