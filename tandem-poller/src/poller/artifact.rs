//! Artifact poller
//!
//! Watches the completed workflow runs of a build repository. Every matching
//! artifact of a successful run is downloaded, pushed to the content store,
//! tagged, and only then recorded as seen.
//!
//! # Checkpointing
//!
//! State is saved after each artifact rather than once per tick: the upload
//! and the tag are irreversible, so the checkpoint sits right after them. A
//! failure part-way through a tick keeps everything processed before it,
//! and the failing artifact is retried on the next tick.
//!
//! # Listing cost
//!
//! Run listings carry no artifacts. Artifact lists are fetched per run,
//! newest successful run first, and the scan stops as soon as
//! `build_download_limit` runs with a wanted artifact have been found.
//!
//! # Ordering
//!
//! Runs are processed in ascending run-number order, one artifact at a time,
//! so the tagging service sees run numbers increase monotonically.

use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::sync::Arc;
use tandem_core::domain::poller::ArtifactPollerConfig;
use tandem_core::domain::repo::RepoCoordinate;
use tandem_core::domain::state::ArtifactState;
use tandem_core::domain::workflow::{Artifact, WorkflowRun};
use tandem_core::dto::storage::StoreTarget;
use tandem_core::dto::tagging::TagRequest;
use tracing::{debug, info, warn};

use super::{Poller, verify_repository};
use crate::error::PollerError;
use crate::repository::{ContentStore, RepositoryHost, TagService};
use crate::state::{StateStore, load_blocking, save_blocking};

/// Case-sensitive glob matching of artifact names
#[derive(Debug, Clone)]
pub struct ArtifactMatcher {
    set: GlobSet,
}

impl ArtifactMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern.as_ref())?);
        }
        Ok(Self {
            set: builder.build()?,
        })
    }

    /// True if `name` matches any pattern. A name matching several patterns
    /// still matches once.
    pub fn is_match(&self, name: &str) -> bool {
        self.set.is_match(name)
    }

    /// True if the artifact should be processed: matching and not expired
    pub fn wants(&self, artifact: &Artifact) -> bool {
        !artifact.expired && self.is_match(&artifact.name)
    }
}

/// Successful runs, newest first, one per run number
pub fn successful_runs(runs: Vec<WorkflowRun>) -> Vec<WorkflowRun> {
    let mut successful: Vec<WorkflowRun> = runs
        .into_iter()
        .filter(|run| run.status.is_success())
        .collect();

    successful.sort_by(|a, b| b.run_number.cmp(&a.run_number));
    successful.dedup_by_key(|run| run.run_number);
    successful
}

pub struct ArtifactPoller {
    config: ArtifactPollerConfig,
    matcher: ArtifactMatcher,
    host: Arc<dyn RepositoryHost>,
    content_store: Arc<dyn ContentStore>,
    tagger: Arc<dyn TagService>,
    store: Arc<dyn StateStore>,
    /// `None` until the first tick loads it
    state: Option<ArtifactState>,
}

impl ArtifactPoller {
    pub fn new(
        config: ArtifactPollerConfig,
        host: Arc<dyn RepositoryHost>,
        content_store: Arc<dyn ContentStore>,
        tagger: Arc<dyn TagService>,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, globset::Error> {
        let matcher = ArtifactMatcher::new(&config.artifact_name_patterns)?;
        Ok(Self {
            config,
            matcher,
            host,
            content_store,
            tagger,
            store,
            state: None,
        })
    }

    async fn prepare(&self) -> Result<ArtifactState, PollerError> {
        let state: ArtifactState = load_blocking(&self.store, &self.config.name).await?;
        info!(
            poller = %self.config.name,
            "Loaded {} previously processed artifact(s)", state.len()
        );

        verify_repository(self.host.as_ref(), &self.config.build).await?;
        Ok(state)
    }

    /// Both downstream services must answer before any artifact is fetched
    async fn check_services(&self) -> Result<(), PollerError> {
        self.content_store
            .check_available()
            .await
            .map_err(|e| PollerError::unavailable("check_content_store", self.content_store.location(), e))?;
        self.tagger
            .check_available()
            .await
            .map_err(|e| PollerError::unavailable("check_tag_service", self.tagger.location(), e))?;
        Ok(())
    }

    /// Download, store and tag one artifact. Returns the storage URL.
    async fn process(&self, run: &WorkflowRun, artifact: &Artifact) -> Result<String, PollerError> {
        let build = &self.config.build;

        let content = self
            .host
            .download_artifact(build, artifact.id)
            .await
            .map_err(|e| PollerError::unavailable("download_artifact", build, e))?;
        debug!(
            poller = %self.config.name,
            "Downloaded artifact {} ({} bytes)", artifact.name, content.len()
        );

        let target = StoreTarget {
            repo_name: build.name.clone(),
            branch: self.config.source_branch.clone(),
            run_number: run.run_number,
            artifact_name: artifact.name.clone(),
        };
        let stored = self
            .content_store
            .store(&target, content)
            .await
            .map_err(|e| PollerError::unavailable("store_artifact", self.content_store.location(), e))?;

        let request = TagRequest {
            repo_name: build.name.clone(),
            branch: self.config.source_branch.clone(),
            tag: self.config.stagger_tag.clone(),
            run_number: run.run_number,
            build_url: run.html_url.clone(),
            build_updated_at: run.updated_at,
            artifact_name: artifact.name.clone(),
            storage_url: stored.url.clone(),
            artifact_created_at: artifact.created_at,
        };
        self.tagger
            .tag(&request)
            .await
            .map_err(|e| PollerError::unavailable("tag_artifact", self.tagger.location(), e))?;

        Ok(stored.url)
    }
}

#[async_trait]
impl Poller for ArtifactPoller {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn repository(&self) -> &RepoCoordinate {
        &self.config.build
    }

    async fn tick(&mut self) -> Result<(), PollerError> {
        let mut state = match self.state.take() {
            Some(state) => state,
            None => self.prepare().await?,
        };

        let result = self.poll(&mut state).await;
        // Whatever was checkpointed during the tick stays in memory too
        self.state = Some(state);
        result
    }
}

impl ArtifactPoller {
    /// Lists artifacts of successful runs, newest first, until
    /// `build_download_limit` runs with a wanted artifact are found. Returns
    /// those runs in ascending run-number order.
    ///
    /// A run whose artifact list is gone (deleted between the two calls) is
    /// skipped; any other listing failure aborts the tick as unavailable.
    async fn relevant_runs(&self, runs: Vec<WorkflowRun>) -> Result<Vec<WorkflowRun>, PollerError> {
        let build = &self.config.build;
        let limit = self.config.build_download_limit;

        let mut relevant = Vec::new();
        for mut run in successful_runs(runs) {
            if limit.is_some_and(|limit| relevant.len() >= limit) {
                break;
            }

            run.artifacts = match self.host.list_run_artifacts(build, &run).await {
                Ok(artifacts) => artifacts,
                Err(e) if e.is_not_found() => {
                    warn!(
                        poller = %self.config.name,
                        repo = %build,
                        run = run.run_number,
                        "Artifacts of run #{} not found, skipping: {}", run.run_number, e
                    );
                    continue;
                }
                Err(e) => return Err(PollerError::unavailable("list_run_artifacts", build, e)),
            };

            if run.artifacts.iter().any(|a| self.matcher.wants(a)) {
                relevant.push(run);
            }
        }

        relevant.reverse();
        Ok(relevant)
    }

    async fn poll(&self, state: &mut ArtifactState) -> Result<(), PollerError> {
        self.check_services().await?;

        let build = &self.config.build;
        let runs = self
            .host
            .list_workflow_runs(build, self.config.run_window)
            .await
            .map_err(|e| PollerError::classify("list_workflow_runs", build, e))?;
        debug!(poller = %self.config.name, "Found {} workflow run(s)", runs.len());

        let selected = self.relevant_runs(runs).await?;

        let mut processed = 0usize;
        for run in &selected {
            for artifact in run.artifacts.iter().filter(|a| self.matcher.wants(a)) {
                let key = run.key_for(artifact);
                if state.is_seen(&key) {
                    debug!(
                        poller = %self.config.name,
                        "Run #{} artifact {} previously processed", run.run_number, artifact.name
                    );
                    continue;
                }

                let storage_url = self.process(run, artifact).await?;

                state.mark_seen(key);
                save_blocking(&self.store, &self.config.name, &*state).await?;
                processed += 1;

                info!(
                    poller = %self.config.name,
                    repo = %build,
                    run = run.run_number,
                    artifact = %artifact.name,
                    storage_url = %storage_url,
                    tag = %self.config.stagger_tag,
                    "Artifact processed"
                );
            }
        }

        if processed > 0 {
            info!(
                poller = %self.config.name,
                "Processed {} new artifact(s) from {} run(s)", processed, selected.len()
            );
        } else {
            debug!(poller = %self.config.name, "No new artifacts");
        }
        Ok(())
    }
}
