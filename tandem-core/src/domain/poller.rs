//! Poller configuration domain types
//!
//! Configuration is immutable after construction. Each poller carries its own
//! copy, so several commit/artifact pairs can run in one process without
//! sharing anything but the state store.

use std::time::Duration;

use super::repo::RepoCoordinate;

/// Default number of most recent workflow runs requested per artifact tick
pub const DEFAULT_RUN_WINDOW: usize = 50;

/// Default repository dispatch event type sent by commit pollers
pub const DEFAULT_TRIGGER_EVENT_TYPE: &str = "trigger-action";

/// Timing parameters driving a poller's scheduling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Sleep after a tick that completed normally
    pub polling_interval: Duration,
    /// Sleep after a tick that found a service unavailable
    pub error_polling_interval: Duration,
    /// Wait before the very first tick
    pub start_delay: Duration,
}

impl Schedule {
    pub fn new(polling_interval: Duration, error_polling_interval: Duration) -> Self {
        Self {
            polling_interval,
            error_polling_interval,
            start_delay: Duration::ZERO,
        }
    }

    pub fn with_start_delay(mut self, start_delay: Duration) -> Self {
        self.start_delay = start_delay;
        self
    }
}

/// Configuration of a commit poller
///
/// The dispatch target is not part of this struct: it is named indirectly
/// through `trigger_artifact_poller` and resolved by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPollerConfig {
    pub name: String,
    pub source: RepoCoordinate,
    pub source_branch: String,
    pub schedule: Schedule,
    pub trigger_artifact_poller: String,
    pub trigger_dry_run: bool,
    pub trigger_event_type: String,
}

/// Configuration of an artifact poller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPollerConfig {
    pub name: String,
    pub build: RepoCoordinate,
    pub source_branch: String,
    pub schedule: Schedule,
    /// Glob patterns (case-sensitive) selecting the artifacts to process
    pub artifact_name_patterns: Vec<String>,
    /// Cap on successful runs processed per tick, most recent first
    pub build_download_limit: Option<usize>,
    pub run_window: usize,
    pub stagger_tag: String,
    pub storage_url: String,
    pub tagging_url: String,
}

/// A named poller section, discriminated by its `class`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerConfig {
    Commit(CommitPollerConfig),
    Artifact(ArtifactPollerConfig),
}

impl PollerConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Commit(config) => &config.name,
            Self::Artifact(config) => &config.name,
        }
    }

    pub fn schedule(&self) -> Schedule {
        match self {
            Self::Commit(config) => config.schedule,
            Self::Artifact(config) => config.schedule,
        }
    }

    /// Repository this poller watches
    pub fn repository(&self) -> &RepoCoordinate {
        match self {
            Self::Commit(config) => &config.source,
            Self::Artifact(config) => &config.build,
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Commit(_) => "CommitPoller",
            Self::Artifact(_) => "ArtifactPoller",
        }
    }
}
