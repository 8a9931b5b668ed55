//! Repository layer
//!
//! The capabilities the pollers consume, as traits. Pollers never talk HTTP
//! themselves: they hold these traits, which keeps them testable in
//! isolation and keeps the wire details in `tandem-client`.
//!
//! All network calls are awaited one at a time by the owning poller; a
//! poller never has two calls in flight.

mod github;
mod services;

// Re-export implementations
pub use services::HttpConnector;

use async_trait::async_trait;
use std::sync::Arc;
use tandem_client::Result;
use tandem_core::domain::repo::RepoCoordinate;
use tandem_core::domain::workflow::{Artifact, WorkflowRun};
use tandem_core::dto::github::{RepositoryInfo, TriggerPayload};
use tandem_core::dto::storage::{StorageRef, StoreTarget};
use tandem_core::dto::tagging::TagRequest;

/// Repository-hosting API as seen by the pollers
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Fetches repository metadata (used to detect disabled repositories)
    async fn repository(&self, repo: &RepoCoordinate) -> Result<RepositoryInfo>;

    /// Resolves the latest commit hash of `branch`
    async fn get_latest_commit(&self, repo: &RepoCoordinate, branch: &str) -> Result<String>;

    /// Triggers the build workflow of `repo`
    async fn dispatch_workflow(
        &self,
        repo: &RepoCoordinate,
        event_type: &str,
        payload: &TriggerPayload,
    ) -> Result<()>;

    /// Lists up to `limit` of the most recent workflow runs, without their
    /// artifacts
    async fn list_workflow_runs(&self, repo: &RepoCoordinate, limit: usize) -> Result<Vec<WorkflowRun>>;

    /// Lists the artifacts of one run
    async fn list_run_artifacts(&self, repo: &RepoCoordinate, run: &WorkflowRun) -> Result<Vec<Artifact>>;

    /// Downloads an artifact archive
    async fn download_artifact(&self, repo: &RepoCoordinate, artifact_id: u64) -> Result<Vec<u8>>;
}

/// Content-storage service
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Where this store lives, for log and error messages
    fn location(&self) -> &str;

    async fn check_available(&self) -> Result<()>;

    async fn store(&self, target: &StoreTarget, content: Vec<u8>) -> Result<StorageRef>;
}

/// Tagging/notification service
#[async_trait]
pub trait TagService: Send + Sync {
    fn location(&self) -> &str;

    async fn check_available(&self) -> Result<()>;

    async fn tag(&self, request: &TagRequest) -> Result<()>;
}

/// Hands out service clients when the registry builds pollers
///
/// The repository host is shared by every poller; the content store and
/// tagging service are built per artifact poller since each names its own.
pub trait ServiceConnector: Send + Sync {
    fn repository_host(&self) -> Arc<dyn RepositoryHost>;

    fn content_store(&self, base_url: &str) -> Arc<dyn ContentStore>;

    fn tag_service(&self, base_url: &str) -> Arc<dyn TagService>;
}
