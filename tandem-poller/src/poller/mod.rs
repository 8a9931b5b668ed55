//! Pollers
//!
//! A poller performs one unit of work per tick and reports how it went. The
//! scheduler decides what happens next based on that report; pollers never
//! sleep or loop themselves.

pub mod artifact;
pub mod commit;

pub use artifact::ArtifactPoller;
pub use commit::CommitPoller;

use async_trait::async_trait;
use tandem_core::domain::repo::RepoCoordinate;
use tracing::info;

use crate::error::PollerError;
use crate::repository::RepositoryHost;

#[async_trait]
pub trait Poller: Send {
    /// Configured name, also the key of this poller's state record
    fn name(&self) -> &str;

    /// Repository this poller watches
    fn repository(&self) -> &RepoCoordinate;

    /// Runs one poll. `Ok` means the tick completed; an error is classified
    /// by [`PollerError::is_recoverable`].
    async fn tick(&mut self) -> Result<(), PollerError>;
}

/// Fails if `repo` is disabled on the hosting service
pub(crate) async fn verify_repository(
    host: &dyn RepositoryHost,
    repo: &RepoCoordinate,
) -> Result<(), PollerError> {
    let info = host
        .repository(repo)
        .await
        .map_err(|e| PollerError::classify("get_repository", repo, e))?;

    if info.disabled {
        return Err(PollerError::DisabledRepository(repo.full_name()));
    }

    info!("Found repository {}", info.full_name);
    Ok(())
}
