//! Interval scheduler
//!
//! Runs one poller's ticks strictly one after another until cancelled:
//!
//! ```text
//! [start delay] -> tick -> ok                  -> sleep(polling_interval)       -> tick ...
//!                       -> service unavailable -> sleep(error_polling_interval) -> tick ...
//!                       -> fatal               -> stop
//! ```
//!
//! Cancellation is observed while sleeping and between ticks. A tick in
//! progress always runs to completion; its network calls are bounded by the
//! HTTP client: a whole-request timeout for metadata calls, a read timeout
//! for artifact transfers.

use std::time::Duration;
use tandem_core::domain::poller::Schedule;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::PollerError;
use crate::poller::Poller;

/// How a tick went, as far as scheduling is concerned
#[derive(Debug)]
pub enum TickOutcome {
    Ok,
    ServiceUnavailable(PollerError),
    Fatal(PollerError),
}

impl From<Result<(), PollerError>> for TickOutcome {
    fn from(result: Result<(), PollerError>) -> Self {
        match result {
            Ok(()) => Self::Ok,
            Err(e) if e.is_recoverable() => Self::ServiceUnavailable(e),
            Err(e) => Self::Fatal(e),
        }
    }
}

pub struct IntervalScheduler {
    schedule: Schedule,
    cancel: CancellationToken,
}

impl IntervalScheduler {
    pub fn new(schedule: Schedule, cancel: CancellationToken) -> Self {
        Self { schedule, cancel }
    }

    /// Sleep that follows a tick with this outcome, `None` if the loop stops
    pub fn next_interval(&self, outcome: &TickOutcome) -> Option<Duration> {
        match outcome {
            TickOutcome::Ok => Some(self.schedule.polling_interval),
            TickOutcome::ServiceUnavailable(_) => Some(self.schedule.error_polling_interval),
            TickOutcome::Fatal(_) => None,
        }
    }

    /// Runs `poller` until cancellation (`Ok`) or a fatal tick (`Err`)
    pub async fn run<P: Poller + ?Sized>(&self, poller: &mut P) -> Result<(), PollerError> {
        let name = poller.name().to_string();

        if !self.schedule.start_delay.is_zero() {
            info!(poller = %name, "Initial delay: {:?}", self.schedule.start_delay);
            if !self.sleep(self.schedule.start_delay).await {
                info!(poller = %name, "Cancelled before first poll");
                return Ok(());
            }
        }

        loop {
            if self.cancel.is_cancelled() {
                info!(poller = %name, "Stopping");
                return Ok(());
            }

            let outcome = TickOutcome::from(poller.tick().await);
            let pause = self.next_interval(&outcome);

            match outcome {
                TickOutcome::Ok => {}
                TickOutcome::ServiceUnavailable(e) => {
                    warn!(poller = %name, "{}", e);
                }
                TickOutcome::Fatal(e) => {
                    error!(
                        poller = %name,
                        repo = %poller.repository(),
                        "Poller stopped: {}", e
                    );
                    return Err(e);
                }
            }

            let Some(pause) = pause else {
                return Ok(());
            };
            debug!(poller = %name, "Waiting for next poll in {:?}", pause);
            if !self.sleep(pause).await {
                info!(poller = %name, "Stopping");
                return Ok(());
            }
        }
    }

    /// Sleeps for `duration`. Returns false if cancelled first.
    async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
