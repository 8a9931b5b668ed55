//! Poller configuration
//!
//! Loads the TOML configuration file describing the GitHub connection, the
//! local data directory, logging and every named poller. Values in
//! `[defaults]` are merged under each `[pollers.<name>]` table, which then
//! resolves through its required `class` key to a commit or artifact poller.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tandem_core::domain::poller::{
    ArtifactPollerConfig, CommitPollerConfig, DEFAULT_RUN_WINDOW, DEFAULT_TRIGGER_EVENT_TYPE,
    PollerConfig, Schedule,
};
use tandem_core::domain::repo::RepoCoordinate;
use thiserror::Error;

use crate::poller::artifact::ArtifactMatcher;
use crate::state::validate_key;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("[{section}] {message}")]
    Invalid { section: String, message: String },

    #[error("GitHub token file {path} could not be read: {source}")]
    TokenUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("GitHub token file {0} is empty")]
    TokenEmpty(PathBuf),
}

impl ConfigError {
    fn invalid(section: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            section: section.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalConfig {
    /// Holds the GitHub token file and the poller state records
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    pub service_url: String,
    pub api_auth_uid: String,
    /// Token file name, relative to `data_dir`
    pub token_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub default_log_level: String,
}

/// Fully validated application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub local: LocalConfig,
    pub github: GitHubConfig,
    pub logging: LoggingConfig,
    /// In file order
    pub pollers: Vec<PollerConfig>,
    /// Keys no poller class recognises, reported once logging is up
    pub warnings: Vec<String>,
}

/// Keys every poller class accepts
const COMMON_KEYS: &[&str] = &[
    "class",
    "repo_owner",
    "repo_name",
    "source_branch",
    "polling_interval_secs",
    "error_polling_interval_secs",
    "start_delay_secs",
];

const COMMIT_KEYS: &[&str] = &[
    "trigger_artifact_poller",
    "trigger_dry_run",
    "trigger_event_type",
];

const ARTIFACT_KEYS: &[&str] = &[
    "build_artifact_name_list",
    "build_download_limit",
    "run_window",
    "stagger_tag",
    "bodega_url",
    "stagger_url",
];

#[derive(Debug, Deserialize)]
struct RawConfig {
    local: LocalConfig,
    github: GitHubConfig,
    logging: LoggingConfig,
    #[serde(default)]
    defaults: toml::Table,
    #[serde(default)]
    pollers: toml::Table,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "class")]
enum PollerSection {
    CommitPoller(CommitSection),
    ArtifactPoller(ArtifactSection),
}

#[derive(Debug, Deserialize)]
struct CommitSection {
    repo_owner: String,
    repo_name: String,
    source_branch: String,
    polling_interval_secs: u64,
    error_polling_interval_secs: u64,
    #[serde(default)]
    start_delay_secs: u64,
    trigger_artifact_poller: String,
    #[serde(default)]
    trigger_dry_run: bool,
    #[serde(default = "default_trigger_event_type")]
    trigger_event_type: String,
}

#[derive(Debug, Deserialize)]
struct ArtifactSection {
    repo_owner: String,
    repo_name: String,
    source_branch: String,
    polling_interval_secs: u64,
    error_polling_interval_secs: u64,
    #[serde(default)]
    start_delay_secs: u64,
    build_artifact_name_list: Vec<String>,
    #[serde(default)]
    build_download_limit: Option<usize>,
    #[serde(default = "default_run_window")]
    run_window: usize,
    stagger_tag: String,
    bodega_url: String,
    stagger_url: String,
}

fn default_trigger_event_type() -> String {
    DEFAULT_TRIGGER_EVENT_TYPE.to_string()
}

fn default_run_window() -> usize {
    DEFAULT_RUN_WINDOW
}

fn schedule(polling: u64, error_polling: u64, start_delay: u64) -> Schedule {
    Schedule::new(Duration::from_secs(polling), Duration::from_secs(error_polling))
        .with_start_delay(Duration::from_secs(start_delay))
}

impl PollerSection {
    fn into_config(self, name: &str) -> PollerConfig {
        match self {
            Self::CommitPoller(s) => PollerConfig::Commit(CommitPollerConfig {
                name: name.to_string(),
                source: RepoCoordinate::new(s.repo_owner, s.repo_name),
                source_branch: s.source_branch,
                schedule: schedule(
                    s.polling_interval_secs,
                    s.error_polling_interval_secs,
                    s.start_delay_secs,
                ),
                trigger_artifact_poller: s.trigger_artifact_poller,
                trigger_dry_run: s.trigger_dry_run,
                trigger_event_type: s.trigger_event_type,
            }),
            Self::ArtifactPoller(s) => PollerConfig::Artifact(ArtifactPollerConfig {
                name: name.to_string(),
                build: RepoCoordinate::new(s.repo_owner, s.repo_name),
                source_branch: s.source_branch,
                schedule: schedule(
                    s.polling_interval_secs,
                    s.error_polling_interval_secs,
                    s.start_delay_secs,
                ),
                artifact_name_patterns: s.build_artifact_name_list,
                build_download_limit: s.build_download_limit,
                run_window: s.run_window,
                stagger_tag: s.stagger_tag,
                storage_url: s.bodega_url,
                tagging_url: s.stagger_url,
            }),
        }
    }
}

impl AppConfig {
    /// Loads and validates a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;

        // [defaults] is shared by both classes, so only keys neither knows are suspect
        let mut warnings: Vec<String> = raw
            .defaults
            .keys()
            .filter(|key| !is_known_key(key, COMMIT_KEYS) && !is_known_key(key, ARTIFACT_KEYS))
            .map(|key| format!("[defaults] unknown key \"{}\" is ignored", key))
            .collect();

        let mut pollers = Vec::with_capacity(raw.pollers.len());
        for (name, value) in raw.pollers {
            let toml::Value::Table(table) = value else {
                return Err(ConfigError::invalid(name, "poller section must be a table"));
            };
            pollers.push(parse_poller(&name, &raw.defaults, table, &mut warnings)?);
        }

        let config = Self {
            local: raw.local,
            github: raw.github,
            logging: raw.logging,
            pollers,
            warnings,
        };
        config.validate()?;
        Ok(config)
    }

    /// Replaces `[local] data_dir`, e.g. from the command line
    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.local.data_dir = dir;
        }
        self
    }

    pub fn token_path(&self) -> PathBuf {
        self.local.data_dir.join(&self.github.token_file)
    }

    /// Reads the GitHub token, stripped of surrounding whitespace
    pub fn read_token(&self) -> Result<String, ConfigError> {
        let path = self.token_path();
        let token = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::TokenUnreadable {
                path: path.clone(),
                source,
            })?
            .trim()
            .to_string();

        if token.is_empty() {
            return Err(ConfigError::TokenEmpty(path));
        }
        Ok(token)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.github.service_url.starts_with("http://")
            && !self.github.service_url.starts_with("https://")
        {
            return Err(ConfigError::invalid(
                "github",
                "service_url must start with http:// or https://",
            ));
        }

        if self.github.api_auth_uid.is_empty() {
            return Err(ConfigError::invalid("github", "api_auth_uid cannot be empty"));
        }

        if self.pollers.is_empty() {
            return Err(ConfigError::invalid("pollers", "no pollers configured"));
        }

        for poller in &self.pollers {
            validate_poller(poller)?;
        }

        Ok(())
    }
}

fn is_known_key(key: &str, class_keys: &[&str]) -> bool {
    COMMON_KEYS.contains(&key) || class_keys.contains(&key)
}

fn parse_poller(
    name: &str,
    defaults: &toml::Table,
    table: toml::Table,
    warnings: &mut Vec<String>,
) -> Result<PollerConfig, ConfigError> {
    if !table.contains_key("class") {
        return Err(ConfigError::invalid(name, "missing required \"class\" key"));
    }

    let own_keys: Vec<String> = table.keys().cloned().collect();
    let mut merged = defaults.clone();
    merged.extend(table);

    let section: PollerSection = toml::Value::Table(merged)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::invalid(name, e.message().to_string()))?;
    let config = section.into_config(name);

    let class_keys = match &config {
        PollerConfig::Commit(_) => COMMIT_KEYS,
        PollerConfig::Artifact(_) => ARTIFACT_KEYS,
    };
    warnings.extend(
        own_keys
            .iter()
            .filter(|key| !is_known_key(key, class_keys))
            .map(|key| {
                format!(
                    "[pollers.{}] unknown key \"{}\" is ignored by {}",
                    name,
                    key,
                    config.class_name()
                )
            }),
    );

    Ok(config)
}

fn validate_poller(poller: &PollerConfig) -> Result<(), ConfigError> {
    let name = poller.name();

    validate_key(name).map_err(|_| {
        ConfigError::invalid(
            name,
            "poller names may only contain letters, digits, '-', '_' and '.'",
        )
    })?;

    let schedule = poller.schedule();
    if schedule.polling_interval.is_zero() {
        return Err(ConfigError::invalid(name, "polling_interval_secs must be greater than 0"));
    }
    if schedule.error_polling_interval.is_zero() {
        return Err(ConfigError::invalid(
            name,
            "error_polling_interval_secs must be greater than 0",
        ));
    }

    let repo = poller.repository();
    if repo.owner.is_empty() || repo.name.is_empty() {
        return Err(ConfigError::invalid(name, "repo_owner and repo_name cannot be empty"));
    }

    match poller {
        PollerConfig::Commit(config) => {
            if config.source_branch.is_empty() {
                return Err(ConfigError::invalid(name, "source_branch cannot be empty"));
            }
        }
        PollerConfig::Artifact(config) => {
            if config.artifact_name_patterns.is_empty() {
                return Err(ConfigError::invalid(
                    name,
                    "build_artifact_name_list cannot be empty",
                ));
            }
            ArtifactMatcher::new(&config.artifact_name_patterns)
                .map_err(|e| ConfigError::invalid(name, format!("invalid artifact pattern: {}", e)))?;
            if config.build_download_limit == Some(0) {
                return Err(ConfigError::invalid(
                    name,
                    "build_download_limit must be greater than 0",
                ));
            }
            if config.run_window == 0 {
                return Err(ConfigError::invalid(name, "run_window must be greater than 0"));
            }
        }
    }

    Ok(())
}
