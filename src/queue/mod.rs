//! Process-wide serialized image generation queue.
//!
//! One worker at a time pulls the head job and makes exactly one generator
//! call. A terminal outcome is followed by the cooldown before the next head
//! is touched. Rate-limited jobs keep the head slot and wait only their
//! backoff; every other failure is terminal for that job only.

mod clock;
mod job;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub use clock::{Clock, TokioClock};
pub use job::{JobId, JobStatus, RetryPolicy};

use crate::classifier::{ErrorClass, classify};
use crate::credential::Credential;
use crate::gemini::{GeminiError, GeneratedImage, ImageGenerator};
use job::Job;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("image job {job} failed after {attempts} attempt(s) [{class}]: {source}")]
    Failed {
        job: JobId,
        class: ErrorClass,
        attempts: u32,
        #[source]
        source: GeminiError,
    },

    #[error("API key is missing")]
    MissingCredential,

    #[error("image queue worker stopped before the job resolved")]
    WorkerGone,
}

impl QueueError {
    pub fn class(&self) -> ErrorClass {
        match self {
            QueueError::Failed { class, .. } => *class,
            QueueError::MissingCredential => ErrorClass::AuthInvalid,
            QueueError::WorkerGone => ErrorClass::Other,
        }
    }
}

/// Eventual outcome of one submitted job.
#[derive(Debug)]
pub struct Submission {
    rx: oneshot::Receiver<Result<GeneratedImage, QueueError>>,
}

impl Future for Submission {
    type Output = Result<GeneratedImage, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(QueueError::WorkerGone)))
    }
}

/// Cheap to clone; all clones share one FIFO and one worker.
pub struct ImageQueue<G, C = TokioClock> {
    shared: Arc<Shared<G, C>>,
}

impl<G, C> Clone for ImageQueue<G, C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<G, C> {
    generator: G,
    clock: C,
    policy: RetryPolicy,
    state: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    worker_active: bool,
}

impl<G: ImageGenerator> ImageQueue<G, TokioClock> {
    pub fn new(generator: G, policy: RetryPolicy) -> Self {
        Self::with_clock(generator, TokioClock, policy)
    }
}

impl<G: ImageGenerator, C: Clock> ImageQueue<G, C> {
    pub fn with_clock(generator: G, clock: C, policy: RetryPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                generator,
                clock,
                policy,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.shared.policy
    }

    /// Append a job at the tail and start the worker if it is idle.
    ///
    /// Never fails synchronously: a missing credential is reported through
    /// the returned [`Submission`] without touching the queue.
    pub fn submit(&self, prompt: impl Into<String>, credential: &Credential) -> Submission {
        let (tx, rx) = oneshot::channel();
        if credential.is_empty() {
            let _ = tx.send(Err(QueueError::MissingCredential));
        } else {
            self.enqueue(Job::new(prompt.into(), credential.clone(), tx));
        }
        Submission { rx }
    }

    fn enqueue(&self, job: Job) {
        let start_worker = {
            let mut state = self.shared.state.lock();
            debug!(job = %job.id, depth = state.jobs.len() + 1, "image job enqueued");
            state.jobs.push_back(job);
            !std::mem::replace(&mut state.worker_active, true)
        };
        if start_worker {
            tokio::spawn(worker_loop(Arc::clone(&self.shared)));
        }
    }
}

async fn worker_loop<G: ImageGenerator, C: Clock>(shared: Arc<Shared<G, C>>) {
    debug!("image queue worker started");
    let _guard = WorkerGuard(&shared);

    while let Some((id, prompt, credential, attempt)) = shared.begin_attempt() {
        debug!(job = %id, attempt, "calling image generator");
        let outcome = shared.generator.generate(&prompt, &credential).await;

        // A retry waits out its backoff only; the cooldown follows terminal outcomes.
        let pause = shared
            .settle(outcome)
            .unwrap_or_else(|| shared.policy.cooldown());
        shared.clock.sleep(pause).await;
    }

    debug!("image queue worker idle");
}

/// Keeps the queue serviceable if the worker task unwinds. The in-flight
/// job is dropped (its waiter sees `WorkerGone`) and a replacement worker
/// takes over whatever is still queued.
struct WorkerGuard<'a, G: ImageGenerator, C: Clock>(&'a Arc<Shared<G, C>>);

impl<G: ImageGenerator, C: Clock> Drop for WorkerGuard<'_, G, C> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }
        let restart = {
            let mut state = self.0.state.lock();
            if let Some(job) = state.jobs.pop_front() {
                warn!(job = %job.id, "image queue worker panicked, dropping in-flight job");
            }
            state.worker_active = !state.jobs.is_empty();
            state.worker_active
        };
        if restart {
            tokio::spawn(worker_loop(Arc::clone(self.0)));
        }
    }
}

impl<G, C> Shared<G, C> {
    /// Mark the head job in flight, or retire the worker if the queue is
    /// empty. Both happen under the same lock as `enqueue`, so a job pushed
    /// concurrently either gets seen here or starts a fresh worker.
    fn begin_attempt(&self) -> Option<(JobId, String, Credential, u32)> {
        let mut state = self.state.lock();
        match state.jobs.front_mut() {
            Some(job) => {
                job.status = JobStatus::InFlight;
                Some((job.id, job.prompt.clone(), job.credential.clone(), job.attempt))
            }
            None => {
                state.worker_active = false;
                None
            }
        }
    }

    /// Apply the outcome of the head job's attempt. Returns the backoff to
    /// wait when the job stays at the head for another try.
    fn settle(&self, outcome: Result<GeneratedImage, GeminiError>) -> Option<Duration> {
        let mut state = self.state.lock();
        let class = outcome.as_ref().err().map(classify);

        if class == Some(ErrorClass::RateLimited) {
            if let Some(job) = state.jobs.front_mut() {
                if job.attempt < self.policy.max_retries {
                    job.attempt += 1;
                    job.status = JobStatus::Pending;
                    let delay = self.policy.delay_for_attempt(job.attempt);
                    warn!(
                        job = %job.id,
                        retry = job.attempt,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, retrying at head of queue"
                    );
                    return Some(delay);
                }
            }
        }

        let job = state.jobs.pop_front()?;
        drop(state);

        let attempts = job.attempt + 1;
        let queued_ms = job.queued_ms();
        match outcome {
            Ok(image) => {
                info!(job = %job.id, attempts, queued_ms, bytes = image.bytes.len(), "image generated");
                job.finish(Ok(image));
            }
            Err(source) => {
                let class = class.unwrap_or(ErrorClass::Other);
                warn!(job = %job.id, attempts, queued_ms, %class, error = %source, "image job failed");
                let id = job.id;
                job.finish(Err(QueueError::Failed {
                    job: id,
                    class,
                    attempts,
                    source,
                }));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{
        Event, EventLog, RecordingClock, ScriptedGenerator, auth_invalid, image, other_error,
        rate_limited,
    };
    use super::*;
    use std::time::Duration;

    fn recording_queue(
        generator: ScriptedGenerator,
        log: &EventLog,
    ) -> ImageQueue<ScriptedGenerator, RecordingClock> {
        ImageQueue::with_clock(generator, RecordingClock::new(log), RetryPolicy::default())
    }

    fn key() -> Credential {
        Credential::new("k")
    }

    fn secs(s: u64) -> Event {
        Event::Sleep(Duration::from_secs(s))
    }

    fn call(p: &str) -> Event {
        Event::Call(p.to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn successful_jobs_resolve_in_order_with_cooldown_between_calls() {
        let generator = ScriptedGenerator::new(|prompt, _| Ok(image(prompt)));
        let times = generator.call_times();
        let queue = ImageQueue::new(generator, RetryPolicy::default());

        let a = queue.submit("a", &key());
        let b = queue.submit("b", &key());
        let c = queue.submit("c", &key());
        let (a, b, c) = tokio::join!(a, b, c);

        assert_eq!(a.unwrap(), image("a"));
        assert_eq!(b.unwrap(), image("b"));
        assert_eq!(c.unwrap(), image("c"));

        let times = times.lock().clone();
        let prompts: Vec<_> = times.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(prompts, vec!["a", "b", "c"]);
        for pair in times.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= Duration::from_secs(10));
        }
    }

    #[tokio::test]
    async fn exhausted_rate_limit_rejects_after_five_retries_then_moves_on() {
        let log = EventLog::default();
        let generator = ScriptedGenerator::new(|prompt, _| {
            if prompt == "busy" { Err(rate_limited()) } else { Ok(image(prompt)) }
        })
        .with_log(&log);
        let queue = recording_queue(generator, &log);

        let busy = queue.submit("busy", &key());
        let next = queue.submit("next", &key());

        let err = busy.await.unwrap_err();
        match &err {
            QueueError::Failed { class, attempts, .. } => {
                assert_eq!(*class, ErrorClass::RateLimited);
                assert_eq!(*attempts, 6);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(err.class(), ErrorClass::RateLimited);
        assert_eq!(next.await.unwrap(), image("next"));

        let mut expected = Vec::new();
        for backoff in [8, 16, 32, 64, 128] {
            expected.extend([call("busy"), secs(backoff)]);
        }
        expected.extend([call("busy"), secs(10), call("next"), secs(10)]);
        assert_eq!(log.events(), expected);
    }

    #[tokio::test]
    async fn auth_invalid_is_rejected_after_one_attempt() {
        let log = EventLog::default();
        let generator = ScriptedGenerator::new(|_, _| Err(auth_invalid())).with_log(&log);
        let queue = recording_queue(generator, &log);

        let err = queue.submit("x", &key()).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::AuthInvalid);
        assert!(matches!(err, QueueError::Failed { attempts: 1, .. }));

        // Let the worker finish its cooldown and go idle.
        tokio::task::yield_now().await;
        assert_eq!(log.events(), vec![call("x"), secs(10)]);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let log = EventLog::default();
        let generator = ScriptedGenerator::new(|_, _| Err(other_error())).with_log(&log);
        let queue = recording_queue(generator, &log);

        let err = queue.submit("x", &key()).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Other);
        assert_eq!(log.calls(), vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn rate_limited_job_can_recover() {
        let log = EventLog::default();
        let generator = ScriptedGenerator::new(|prompt, seen| {
            if seen < 2 { Err(rate_limited()) } else { Ok(image(prompt)) }
        })
        .with_log(&log);
        let queue = recording_queue(generator, &log);

        assert_eq!(queue.submit("x", &key()).await.unwrap(), image("x"));
        assert_eq!(
            log.events(),
            vec![call("x"), secs(8), call("x"), secs(16), call("x"), secs(10)]
        );
    }

    #[tokio::test]
    async fn retried_job_keeps_the_head_slot() {
        let log = EventLog::default();
        let generator = ScriptedGenerator::new(|prompt, seen| {
            if prompt == "first" && seen == 0 { Err(rate_limited()) } else { Ok(image(prompt)) }
        })
        .with_log(&log);
        let queue = recording_queue(generator, &log);

        let first = queue.submit("first", &key());
        let second = queue.submit("second", &key());
        let (first, second) = tokio::join!(first, second);
        assert!(first.is_ok());
        assert!(second.is_ok());

        assert_eq!(log.calls(), vec!["first", "first", "second"]);
    }

    #[tokio::test]
    async fn missing_credential_never_reaches_generator() {
        let log = EventLog::default();
        let generator = ScriptedGenerator::new(|p, _| Ok(image(p))).with_log(&log);
        let queue = recording_queue(generator, &log);

        let err = queue.submit("x", &Credential::default()).await.unwrap_err();
        assert!(matches!(err, QueueError::MissingCredential));
        assert_eq!(err.class(), ErrorClass::AuthInvalid);
        assert!(log.events().is_empty());
    }

    #[tokio::test]
    async fn worker_restarts_after_going_idle() {
        let log = EventLog::default();
        let generator = ScriptedGenerator::new(|p, _| Ok(image(p))).with_log(&log);
        let queue = recording_queue(generator, &log);

        assert!(queue.submit("one", &key()).await.is_ok());
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(queue.submit("two", &key()).await.is_ok());
        assert_eq!(log.calls(), vec!["one", "two"]);
    }

    #[tokio::test(start_paused = true)]
    async fn never_more_than_one_call_in_flight() {
        let generator = ScriptedGenerator::new(|p, _| Ok(image(p))).with_latency(Duration::from_secs(3));
        let max_in_flight = generator.max_in_flight();
        let queue = ImageQueue::new(generator, RetryPolicy::default());

        let clones: Vec<_> = (0..4).map(|_| queue.clone()).collect();
        let handles: Vec<_> = clones
            .into_iter()
            .enumerate()
            .map(|(i, q)| tokio::spawn(async move { q.submit(format!("p{i}"), &key()).await }))
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(max_in_flight.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_gaps_follow_backoff_without_cooldown() {
        let generator = ScriptedGenerator::new(|prompt, seen| {
            if seen < 2 { Err(rate_limited()) } else { Ok(image(prompt)) }
        });
        let times = generator.call_times();
        let queue = ImageQueue::new(generator, RetryPolicy::default());

        assert!(queue.submit("x", &key()).await.is_ok());

        let times = times.lock().clone();
        let gaps: Vec<u64> = times
            .windows(2)
            .map(|pair| (pair[1].1 - pair[0].1).as_secs())
            .collect();
        assert_eq!(gaps, vec![8, 16]);
    }

    #[tokio::test]
    async fn panicking_generator_does_not_wedge_the_queue() {
        let log = EventLog::default();
        let generator = ScriptedGenerator::new(|prompt, _| {
            if prompt == "boom" {
                panic!("generator blew up");
            }
            Ok(image(prompt))
        })
        .with_log(&log);
        let queue = recording_queue(generator, &log);

        let boom = queue.submit("boom", &key());
        let next = queue.submit("next", &key());

        assert!(matches!(boom.await, Err(QueueError::WorkerGone)));
        assert_eq!(next.await.unwrap(), image("next"));

        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(queue.submit("later", &key()).await.unwrap(), image("later"));
        assert_eq!(log.calls(), vec!["boom", "next", "later"]);
    }
}
