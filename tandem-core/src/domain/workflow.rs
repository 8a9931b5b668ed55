//! Workflow run domain types
//!
//! Workflow runs are fetched fresh on every artifact poller tick and never
//! persisted. Only the [`ArtifactKey`] of a processed artifact survives a tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a workflow run as reported by the hosting service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failure,
    Cancelled,
    InProgress,
    Queued,
    /// Completed with a conclusion we do not act on (neutral, skipped, ...)
    Other,
}

impl RunStatus {
    /// Maps the hosting service's `status`/`conclusion` pair onto a run status
    pub fn from_status_and_conclusion(status: &str, conclusion: Option<&str>) -> Self {
        match (status, conclusion) {
            ("completed", Some("success")) => Self::Success,
            ("completed", Some("failure")) | ("completed", Some("timed_out")) => Self::Failure,
            ("completed", Some("cancelled")) => Self::Cancelled,
            ("completed", _) => Self::Other,
            ("queued", _) | ("waiting", _) | ("pending", _) | ("requested", _) => Self::Queued,
            _ => Self::InProgress,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// A named build output attached to a workflow run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub expired: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// One execution of the build repository's automation
///
/// Run listings leave `artifacts` empty; they are listed per run, and only
/// for the runs the artifact poller actually examines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Hosting service id, used to address the run's artifacts
    pub id: u64,
    pub run_number: u64,
    pub status: RunStatus,
    pub html_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl WorkflowRun {
    /// Key under which `artifact` of this run is recorded once processed
    pub fn key_for(&self, artifact: &Artifact) -> ArtifactKey {
        ArtifactKey {
            run_number: self.run_number,
            artifact_id: artifact.id,
        }
    }
}

/// Identity of a processed artifact: `(run_number, artifact_id)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub run_number: u64,
    pub artifact_id: u64,
}
