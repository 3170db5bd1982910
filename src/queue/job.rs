use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use super::QueueError;
use crate::credential::Credential;
use crate::gemini::GeneratedImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracks the lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    InFlight,
    Succeeded,
    Failed,
}

/// Retry and pacing policy for the image queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries allowed for a rate-limited job before it is rejected.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles for each further retry.
    pub base_delay_ms: u64,
    /// Pause after every attempt, whatever its outcome.
    pub cooldown_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 8_000,
            cooldown_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based).
    /// delay = base_delay_ms * 2^(attempt - 1)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// One request for one image. Owned by the queue until it reaches a
/// terminal status, at which point the waiter is resolved and the job dropped.
#[derive(Debug)]
pub(crate) struct Job {
    pub id: JobId,
    pub prompt: String,
    pub credential: Credential,
    pub attempt: u32,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    waiter: oneshot::Sender<Result<GeneratedImage, QueueError>>,
}

impl Job {
    pub fn new(
        prompt: String,
        credential: Credential,
        waiter: oneshot::Sender<Result<GeneratedImage, QueueError>>,
    ) -> Self {
        Self {
            id: JobId::new(),
            prompt,
            credential,
            attempt: 0,
            status: JobStatus::Pending,
            submitted_at: Utc::now(),
            waiter,
        }
    }

    /// Milliseconds since the job was submitted.
    pub fn queued_ms(&self) -> i64 {
        (Utc::now() - self.submitted_at).num_milliseconds().max(0)
    }

    /// Resolve the waiter. A caller that stopped listening is not an error.
    pub fn finish(mut self, result: Result<GeneratedImage, QueueError>) {
        self.status = if result.is_ok() {
            JobStatus::Succeeded
        } else {
            JobStatus::Failed
        };
        if self.waiter.send(result).is_err() {
            tracing::debug!(job = %self.id, status = ?self.status, "job resolved with no listener");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_provider_limits() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.cooldown(), Duration::from_secs(10));
    }

    #[test]
    fn backoff_doubles_from_eight_seconds() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=5)
            .map(|n| policy.delay_for_attempt(n).as_secs())
            .collect();
        assert_eq!(delays, vec![8, 16, 32, 64, 128]);
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(200), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn partial_policy_deserializes_with_defaults() {
        let policy: RetryPolicy = toml::from_str("cooldown_ms = 500").unwrap();
        assert_eq!(policy.cooldown_ms, 500);
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay_ms, 8_000);
    }

    #[tokio::test]
    async fn finish_resolves_waiter() {
        let (tx, rx) = oneshot::channel();
        let job = Job::new("p".into(), Credential::new("k"), tx);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempt, 0);
        job.finish(Err(QueueError::WorkerGone));
        assert!(matches!(rx.await.unwrap(), Err(QueueError::WorkerGone)));
    }

    #[test]
    fn queued_time_counts_from_submission() {
        let (tx, _rx) = oneshot::channel();
        let mut job = Job::new("p".into(), Credential::new("k"), tx);
        assert!(job.queued_ms() < 1_000);
        job.submitted_at -= chrono::TimeDelta::seconds(3);
        assert!(job.queued_ms() >= 3_000);
    }

    #[test]
    fn finish_without_listener_does_not_panic() {
        let (tx, rx) = oneshot::channel();
        drop(rx);
        let job = Job::new("p".into(), Credential::new("k"), tx);
        job.finish(Err(QueueError::WorkerGone));
    }
}
