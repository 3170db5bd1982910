//! Test doubles shared by the queue and orchestrator tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Semaphore, mpsc};
use tokio::time::Instant;

use super::Clock;
use crate::credential::Credential;
use crate::gemini::{GeminiError, GeneratedImage, ImageGenerator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Call(String),
    Sleep(Duration),
}

/// Ordered record of generator calls and clock sleeps.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    fn push(&self, event: Event) {
        self.0.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Call(p) => Some(p),
                Event::Sleep(_) => None,
            })
            .collect()
    }
}

/// Records every requested sleep and returns after a single yield.
pub(crate) struct RecordingClock {
    log: EventLog,
}

impl RecordingClock {
    pub fn new(log: &EventLog) -> Self {
        Self { log: log.clone() }
    }
}

impl Clock for RecordingClock {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.log.push(Event::Sleep(duration));
        tokio::task::yield_now()
    }
}

type Responder = dyn Fn(&str, u32) -> Result<GeneratedImage, GeminiError> + Send + Sync;

/// Generator whose answer is computed from the prompt and how many times
/// that prompt was seen before.
pub(crate) struct ScriptedGenerator {
    respond: Box<Responder>,
    seen: Mutex<HashMap<String, u32>>,
    log: Option<EventLog>,
    call_times: Arc<Mutex<Vec<(String, Instant)>>>,
    in_flight: AtomicUsize,
    max_in_flight: Arc<AtomicUsize>,
    latency: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    started: Option<mpsc::UnboundedSender<String>>,
}

impl ScriptedGenerator {
    pub fn new(
        respond: impl Fn(&str, u32) -> Result<GeneratedImage, GeminiError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            seen: Mutex::new(HashMap::new()),
            log: None,
            call_times: Arc::new(Mutex::new(Vec::new())),
            in_flight: AtomicUsize::new(0),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            latency: None,
            gate: None,
            started: None,
        }
    }

    pub fn with_log(mut self, log: &EventLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every call blocks until a permit is added to the returned semaphore.
    /// The receiver yields each prompt as its call starts.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>, mpsc::UnboundedReceiver<String>) {
        let gate = Arc::new(Semaphore::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        self.gate = Some(Arc::clone(&gate));
        self.started = Some(tx);
        (self, gate, rx)
    }

    pub fn call_times(&self) -> Arc<Mutex<Vec<(String, Instant)>>> {
        Arc::clone(&self.call_times)
    }

    pub fn max_in_flight(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.max_in_flight)
    }
}

impl ImageGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _credential: &Credential,
    ) -> Result<GeneratedImage, GeminiError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(log) = &self.log {
            log.push(Event::Call(prompt.to_string()));
        }
        self.call_times.lock().push((prompt.to_string(), Instant::now()));
        if let Some(started) = &self.started {
            let _ = started.send(prompt.to_string());
        }

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let seen = {
            let mut seen = self.seen.lock();
            let count = seen.entry(prompt.to_string()).or_insert(0);
            let before = *count;
            *count += 1;
            before
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.respond)(prompt, seen)
    }
}

pub(crate) fn image(tag: &str) -> GeneratedImage {
    GeneratedImage {
        mime_type: "image/png".to_string(),
        bytes: tag.as_bytes().to_vec(),
    }
}

pub(crate) fn rate_limited() -> GeminiError {
    GeminiError::api(Some(429), Some("RESOURCE_EXHAUSTED"), "Resource has been exhausted")
}

pub(crate) fn auth_invalid() -> GeminiError {
    GeminiError::api(Some(400), Some("INVALID_ARGUMENT"), "API key not valid")
}

pub(crate) fn other_error() -> GeminiError {
    GeminiError::EmptyResult("No image generated".to_string())
}
