//! Poller error taxonomy
//!
//! Every error a tick can produce is classified here, at the poller boundary:
//! - `Unavailable`: a service could not be reached or answered with a
//!   transient failure. The poller switches to its error interval.
//! - `Unauthorized` / `NotFound` / `DisabledRepository`: the configuration
//!   points at something we cannot use. Fatal for this poller only.
//! - `State`: local persistence failed. Fatal for this poller, which cannot
//!   continue without durable state.
//!
//! Configuration errors are detected before any poller starts and live in
//! [`crate::config::ConfigError`].

use tandem_client::ClientError;
use thiserror::Error;

use crate::state::StateError;

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("{call} on {target} failed, service unavailable: {source}")]
    Unavailable {
        call: &'static str,
        target: String,
        #[source]
        source: ClientError,
    },

    #[error("{call} on {target} was rejected, check credentials: {source}")]
    Unauthorized {
        call: &'static str,
        target: String,
        #[source]
        source: ClientError,
    },

    #[error("{call} on {target} found nothing, check configuration: {source}")]
    NotFound {
        call: &'static str,
        target: String,
        #[source]
        source: ClientError,
    },

    #[error("repository {0} is disabled")]
    DisabledRepository(String),

    #[error(transparent)]
    State(#[from] StateError),
}

impl PollerError {
    /// Classifies a failed lookup: credentials and missing resources are
    /// configuration problems, everything else is worth retrying
    pub fn classify(call: &'static str, target: impl ToString, source: ClientError) -> Self {
        let target = target.to_string();
        if source.is_auth_error() {
            Self::Unauthorized {
                call,
                target,
                source,
            }
        } else if source.is_not_found() {
            Self::NotFound {
                call,
                target,
                source,
            }
        } else {
            Self::Unavailable {
                call,
                target,
                source,
            }
        }
    }

    /// A failure that is always retried on the next tick
    pub fn unavailable(call: &'static str, target: impl ToString, source: ClientError) -> Self {
        Self::Unavailable {
            call,
            target: target.to_string(),
            source,
        }
    }

    /// True if the poller should keep running on its error interval
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
