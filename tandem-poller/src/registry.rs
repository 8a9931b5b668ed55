//! Poller registry
//!
//! Builds every configured poller against the shared connector and state
//! store, then runs each one on its own task under a child of the shutdown
//! token. A poller that stops fatally is reported; the others keep going.

use std::collections::HashMap;
use std::sync::Arc;
use tandem_core::domain::poller::{PollerConfig, Schedule};
use tandem_core::domain::repo::RepoCoordinate;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ConfigError;
use crate::poller::{ArtifactPoller, CommitPoller, Poller};
use crate::repository::ServiceConnector;
use crate::scheduler::IntervalScheduler;
use crate::state::StateStore;

/// A poller that stopped on its own rather than through shutdown
#[derive(Debug, Clone)]
pub struct PollerFailure {
    pub poller: String,
    pub reason: String,
}

pub struct PollerHandle {
    pub name: String,
    pub class: &'static str,
    pub schedule: Schedule,
    poller: Box<dyn Poller>,
}

/// Maps each commit poller to the build repository of the artifact poller
/// it names in `trigger_artifact_poller`
pub fn resolve_trigger_targets(
    configs: &[PollerConfig],
) -> Result<HashMap<String, RepoCoordinate>, ConfigError> {
    let artifact_repos: HashMap<&str, &RepoCoordinate> = configs
        .iter()
        .filter_map(|config| match config {
            PollerConfig::Artifact(a) => Some((a.name.as_str(), &a.build)),
            PollerConfig::Commit(_) => None,
        })
        .collect();

    let mut targets = HashMap::new();
    for config in configs {
        let PollerConfig::Commit(commit) = config else {
            continue;
        };

        let target = artifact_repos
            .get(commit.trigger_artifact_poller.as_str())
            .ok_or_else(|| {
                let exists = configs
                    .iter()
                    .any(|c| c.name() == commit.trigger_artifact_poller);
                let message = if exists {
                    format!(
                        "trigger_artifact_poller \"{}\" is not an ArtifactPoller",
                        commit.trigger_artifact_poller
                    )
                } else {
                    format!(
                        "trigger_artifact_poller \"{}\" is not configured",
                        commit.trigger_artifact_poller
                    )
                };
                ConfigError::Invalid {
                    section: commit.name.clone(),
                    message,
                }
            })?;

        targets.insert(commit.name.clone(), (*target).clone());
    }

    Ok(targets)
}

pub struct PollerRegistry {
    handles: Vec<PollerHandle>,
}

impl PollerRegistry {
    pub fn build(
        configs: Vec<PollerConfig>,
        connector: &dyn ServiceConnector,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, ConfigError> {
        let mut targets = resolve_trigger_targets(&configs)?;
        let host = connector.repository_host();

        let mut handles = Vec::with_capacity(configs.len());
        for config in configs {
            let name = config.name().to_string();
            let class = config.class_name();
            let schedule = config.schedule();

            let poller: Box<dyn Poller> = match config {
                PollerConfig::Commit(commit) => {
                    let target = targets.remove(&commit.name).ok_or_else(|| ConfigError::Invalid {
                        section: commit.name.clone(),
                        message: "trigger target could not be resolved".to_string(),
                    })?;
                    Box::new(CommitPoller::new(commit, target, host.clone(), store.clone()))
                }
                PollerConfig::Artifact(artifact) => {
                    let content_store = connector.content_store(&artifact.storage_url);
                    let tagger = connector.tag_service(&artifact.tagging_url);
                    let poller = ArtifactPoller::new(
                        artifact,
                        host.clone(),
                        content_store,
                        tagger,
                        store.clone(),
                    )
                    .map_err(|e| ConfigError::Invalid {
                        section: name.clone(),
                        message: format!("invalid artifact pattern: {}", e),
                    })?;
                    Box::new(poller)
                }
            };

            info!(
                poller = %name,
                class,
                repo = %poller.repository(),
                "Registered poller, interval {:?}, error interval {:?}",
                schedule.polling_interval,
                schedule.error_polling_interval
            );
            handles.push(PollerHandle {
                name,
                class,
                schedule,
                poller,
            });
        }

        Ok(Self { handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Runs every poller until shutdown is requested or it stops fatally.
    /// Returns once all of them have stopped.
    pub async fn run(self, shutdown: CancellationToken) -> Vec<PollerFailure> {
        let mut tasks = JoinSet::new();

        for handle in self.handles {
            let PollerHandle {
                name,
                class,
                schedule,
                mut poller,
            } = handle;
            info!(poller = %name, class, "Starting poller");
            let scheduler = IntervalScheduler::new(schedule, shutdown.child_token());

            tasks.spawn(async move {
                let result = scheduler.run(poller.as_mut()).await;
                (name, result)
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((poller, Err(e))) => failures.push(PollerFailure {
                    poller,
                    reason: e.to_string(),
                }),
                Err(e) => {
                    error!("Poller task aborted: {}", e);
                    failures.push(PollerFailure {
                        poller: "<unknown>".to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        failures
    }
}
