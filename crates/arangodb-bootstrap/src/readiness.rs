//! Bounded readiness polling.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{BootstrapError, BootstrapResult};
use crate::output::Reporter;
use crate::runtime::ContainerRuntime;

/// Observed once the target reported ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadyResult {
    /// Number of status queries issued, the successful one included
    pub attempts: u32,
    /// Status string that satisfied the readiness check
    pub status: String,
    /// Time spent sleeping between attempts
    #[serde(rename = "waited_secs", serialize_with = "serialize_secs")]
    pub waited: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Whether a runtime status string means the service can take requests.
///
/// A paused container never counts. `(healthy)` always does otherwise, and a
/// running container (`Up ...`) counts unless its health check is still
/// starting or failing.
///
/// This is stricter than accepting every `Up` status: Docker keeps the `Up`
/// prefix for paused containers and while a health check has not passed, and
/// in both states `exec` into the server is not yet useful.
pub fn is_ready(status: &str) -> bool {
    let status = status.trim();
    if status.contains("(Paused)") {
        return false;
    }
    if status.contains("(healthy)") {
        return true;
    }
    status.starts_with("Up")
        && !status.contains("(unhealthy)")
        && !status.contains("(health: starting)")
}

/// Polls a [`ContainerRuntime`] until the target is ready or the budget runs out.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessWaiter {
    max_attempts: u32,
    poll_interval: Duration,
}

impl ReadinessWaiter {
    /// # Errors
    ///
    /// Returns [`BootstrapError::InvalidArguments`] when `max_attempts` is zero.
    pub fn new(max_attempts: u32, poll_interval: Duration) -> BootstrapResult<Self> {
        if max_attempts == 0 {
            return Err(BootstrapError::InvalidArguments(
                "max attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            poll_interval,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Upper bound on the time spent sleeping between attempts.
    pub fn budget(&self) -> Duration {
        self.poll_interval * (self.max_attempts - 1)
    }

    /// Query `target` up to `max_attempts` times, sleeping `poll_interval`
    /// between non-ready observations.
    ///
    /// A failing status query counts as "not ready" and uses up an attempt.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::ReadinessTimeout`] once every attempt saw a
    /// non-ready status, or [`BootstrapError::Cancelled`] if `cancel` fires.
    pub async fn wait_until_ready(
        &self,
        runtime: &dyn ContainerRuntime,
        target: &str,
        reporter: &Reporter,
        cancel: &CancellationToken,
    ) -> BootstrapResult<ReadyResult> {
        let started = Instant::now();

        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return Err(BootstrapError::Cancelled {
                    target: target.to_string(),
                    attempts: attempt - 1,
                });
            }

            reporter.progress(&format!(
                "Waiting for '{}' to be ready... (attempt {}/{})",
                target, attempt, self.max_attempts
            ));

            match runtime.status(target).await {
                Ok(status) if is_ready(&status) => {
                    debug!(target, attempt, %status, "target ready");
                    return Ok(ReadyResult {
                        attempts: attempt,
                        status,
                        waited: started.elapsed(),
                    });
                }
                Ok(status) => debug!(target, attempt, %status, "target not ready"),
                Err(e) => debug!(target, attempt, error = %e, "status query failed"),
            }

            if attempt < self.max_attempts {
                tokio::select! {
                    () = cancel.cancelled() => {
                        return Err(BootstrapError::Cancelled {
                            target: target.to_string(),
                            attempts: attempt,
                        });
                    }
                    () = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }

        Err(BootstrapError::ReadinessTimeout {
            target: target.to_string(),
            attempts: self.max_attempts,
            waited: started.elapsed(),
            log_hint: runtime.log_hint(target),
        })
    }
}
