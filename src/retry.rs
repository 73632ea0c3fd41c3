//! Bounded call wrapper for network-bound stages
//!
//! Retry and timeout behavior is specified per stage (attempt count,
//! per-attempt timeout, overall deadline) instead of being hand-rolled at
//! each call site.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::errors::GrainwiseError;
use crate::errors::Stage;
use crate::Result;

/// Retry policy for a single pipeline stage.
#[derive(Debug, Clone, Copy)]
pub struct BoundedCall {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Timeout applied to each individual attempt.
    pub attempt_timeout: Duration,
    /// Deadline across all attempts.
    pub overall_deadline: Duration,
}

impl BoundedCall {
    #[must_use]
    pub const fn new(
        max_attempts: u32,
        attempt_timeout: Duration,
        overall_deadline: Duration,
    ) -> Self {
        Self {
            max_attempts,
            attempt_timeout,
            overall_deadline,
        }
    }

    /// Run `operation` under this policy. Attempts are retried on any
    /// error until the attempt budget or the overall deadline runs out;
    /// deadline exhaustion surfaces as a stage timeout.
    pub async fn run<T, F, Fut>(&self, stage: Stage, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = async {
            let mut last_error: Option<GrainwiseError> = None;
            for attempt in 1..=self.max_attempts {
                match tokio::time::timeout(self.attempt_timeout, operation()).await {
                    Ok(Ok(value)) => return Ok(value),
                    Ok(Err(e)) => {
                        warn!("{stage} attempt {attempt}/{} failed: {e}", self.max_attempts);
                        last_error = Some(e);
                    }
                    Err(_) => {
                        warn!(
                            "{stage} attempt {attempt}/{} timed out after {:?}",
                            self.max_attempts, self.attempt_timeout
                        );
                        last_error = Some(GrainwiseError::StageTimeout {
                            stage,
                            timeout: self.attempt_timeout,
                        });
                    }
                }
            }
            Err(last_error.unwrap_or_else(|| GrainwiseError::transient(stage, "no attempts made")))
        };

        match tokio::time::timeout(self.overall_deadline, attempts).await {
            Ok(result) => result,
            Err(_) => Err(GrainwiseError::StageTimeout {
                stage,
                timeout: self.overall_deadline,
            }),
        }
    }
}
