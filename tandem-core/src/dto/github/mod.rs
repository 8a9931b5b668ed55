//! GitHub REST API DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::repo::RepoCoordinate;
use crate::domain::workflow::{Artifact, RunStatus, WorkflowRun};

/// `GET /repos/{owner}/{repo}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub full_name: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub archived: bool,
}

/// `GET /repos/{owner}/{repo}/commits/{ref}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
}

/// `GET /repos/{owner}/{repo}/actions/runs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRunList {
    #[serde(default)]
    pub total_count: u64,
    pub workflow_runs: Vec<WorkflowRunInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRunInfo {
    pub id: u64,
    pub run_number: u64,
    pub status: String,
    pub conclusion: Option<String>,
    pub html_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkflowRunInfo {
    pub fn run_status(&self) -> RunStatus {
        RunStatus::from_status_and_conclusion(&self.status, self.conclusion.as_deref())
    }

    /// Converts into the domain run. Artifacts are listed separately.
    pub fn into_run(self) -> WorkflowRun {
        WorkflowRun {
            id: self.id,
            run_number: self.run_number,
            status: self.run_status(),
            html_url: self.html_url,
            updated_at: self.updated_at,
            artifacts: Vec::new(),
        }
    }
}

/// `GET /repos/{owner}/{repo}/actions/runs/{run_id}/artifacts`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactList {
    #[serde(default)]
    pub total_count: u64,
    pub artifacts: Vec<ArtifactInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size_in_bytes: u64,
    #[serde(default)]
    pub expired: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<ArtifactInfo> for Artifact {
    fn from(info: ArtifactInfo) -> Self {
        Artifact {
            id: info.id,
            name: info.name,
            expired: info.expired,
            created_at: info.created_at,
        }
    }
}

/// Body of `POST /repos/{owner}/{repo}/dispatches`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryDispatch {
    pub event_type: String,
    pub client_payload: TriggerPayload,
}

/// Describes the commit that caused a build trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPayload {
    pub source_repo: String,
    pub branch: String,
    pub commit: String,
}

impl TriggerPayload {
    pub fn new(source: &RepoCoordinate, branch: &str, commit: &str) -> Self {
        Self {
            source_repo: source.full_name(),
            branch: branch.to_string(),
            commit: commit.to_string(),
        }
    }
}
