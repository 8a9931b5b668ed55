//! Commit poller
//!
//! Watches one branch of a source repository. When the branch head moves,
//! triggers the build workflow of the paired build repository and records
//! the new head.
//!
//! The first successful fetch only records a baseline: there is no "new"
//! commit relative to an unknown past. After that, the trigger is always
//! issued before the new hash is persisted, so a crash in between causes at
//! most a duplicate trigger, never a missed one.

use async_trait::async_trait;
use std::sync::Arc;
use tandem_core::domain::poller::CommitPollerConfig;
use tandem_core::domain::repo::RepoCoordinate;
use tandem_core::domain::state::CommitState;
use tandem_core::dto::github::TriggerPayload;
use tracing::{debug, info};

use super::{Poller, verify_repository};
use crate::error::PollerError;
use crate::repository::RepositoryHost;
use crate::state::{StateStore, load_blocking, save_blocking};

pub struct CommitPoller {
    config: CommitPollerConfig,
    /// Build repository resolved from `trigger_artifact_poller`
    target: RepoCoordinate,
    host: Arc<dyn RepositoryHost>,
    store: Arc<dyn StateStore>,
    /// `None` until the first tick loads it
    state: Option<CommitState>,
}

impl CommitPoller {
    pub fn new(
        config: CommitPollerConfig,
        target: RepoCoordinate,
        host: Arc<dyn RepositoryHost>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            config,
            target,
            host,
            store,
            state: None,
        }
    }

    /// Loads persisted state and checks the source repository is usable
    async fn prepare(&mut self) -> Result<CommitState, PollerError> {
        let state: CommitState = load_blocking(&self.store, &self.config.name).await?;
        if state.has_baseline() {
            info!(
                poller = %self.config.name,
                "Last known commit on {}: {}", self.config.source_branch, state.last_known_hash
            );
        } else {
            info!(poller = %self.config.name, "No previous commit recorded");
        }

        verify_repository(self.host.as_ref(), &self.config.source).await?;
        Ok(state)
    }

    async fn trigger(&self, hash: &str) -> Result<(), PollerError> {
        if self.config.trigger_dry_run {
            info!(
                poller = %self.config.name,
                repo = %self.target,
                commit = hash,
                dry_run = true,
                "Dry run: would trigger build on {}", self.target
            );
            return Ok(());
        }

        let payload = TriggerPayload::new(&self.config.source, &self.config.source_branch, hash);
        self.host
            .dispatch_workflow(&self.target, &self.config.trigger_event_type, &payload)
            .await
            .map_err(|e| PollerError::unavailable("dispatch_workflow", &self.target, e))?;

        info!(
            poller = %self.config.name,
            repo = %self.target,
            commit = hash,
            dry_run = false,
            "Build triggered on {}", self.target
        );
        Ok(())
    }

    async fn record(&mut self, hash: String) -> Result<(), PollerError> {
        let state = CommitState {
            last_known_hash: hash,
        };
        save_blocking(&self.store, &self.config.name, &state).await?;
        self.state = Some(state);
        Ok(())
    }
}

#[async_trait]
impl Poller for CommitPoller {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn repository(&self) -> &RepoCoordinate {
        &self.config.source
    }

    async fn tick(&mut self) -> Result<(), PollerError> {
        let last_known = match &self.state {
            Some(state) => state.last_known_hash.clone(),
            None => {
                let state = self.prepare().await?;
                let hash = state.last_known_hash.clone();
                self.state = Some(state);
                hash
            }
        };

        let hash = self
            .host
            .get_latest_commit(&self.config.source, &self.config.source_branch)
            .await
            .map_err(|e| PollerError::classify("get_latest_commit", &self.config.source, e))?;

        if last_known.is_empty() {
            info!(
                poller = %self.config.name,
                "Recording {} as baseline for {}@{}", hash, self.config.source, self.config.source_branch
            );
            return self.record(hash).await;
        }

        if hash == last_known {
            debug!(poller = %self.config.name, "No commits since {}", last_known);
            return Ok(());
        }

        info!(
            poller = %self.config.name,
            "New commit on {}@{}: {} -> {}", self.config.source, self.config.source_branch, last_known, hash
        );
        self.trigger(&hash).await?;
        self.record(hash).await
    }
}
