//! Persisted poller state records
//!
//! Each poller exclusively owns one record keyed by its own name. Both
//! records default to empty, which is what a first run sees.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::workflow::ArtifactKey;

/// Checkpoint of a commit poller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitState {
    /// Empty until the first successful fetch establishes a baseline
    #[serde(default)]
    pub last_known_hash: String,
}

impl CommitState {
    pub fn has_baseline(&self) -> bool {
        !self.last_known_hash.is_empty()
    }
}

/// Checkpoint of an artifact poller
///
/// Membership only grows: a key is inserted after its artifact has been
/// downloaded, stored and tagged, and is never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactState {
    #[serde(default)]
    pub seen_artifact_ids: BTreeSet<ArtifactKey>,
}

impl ArtifactState {
    pub fn is_seen(&self, key: &ArtifactKey) -> bool {
        self.seen_artifact_ids.contains(key)
    }

    /// Records `key` as processed. Returns false if it was already present.
    pub fn mark_seen(&mut self, key: ArtifactKey) -> bool {
        self.seen_artifact_ids.insert(key)
    }

    pub fn len(&self) -> usize {
        self.seen_artifact_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen_artifact_ids.is_empty()
    }
}
