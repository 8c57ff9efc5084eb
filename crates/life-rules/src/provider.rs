//! Content providers.
//!
//! A provider turns a [`ContentRequest`] into event text and choices. The
//! generator treats every provider as fallible: any error, including a
//! timeout, falls back to the local template library.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use life_events::{Attribute, EventChoice, EventType, LifeStage};

use crate::templates::{Placeholders, TemplateLibrary};

/// What the generator asks a provider for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRequest {
    pub profile_id: String,
    /// Template chosen by the generator; providers may use it as a hint
    pub template_id: String,
    pub event_type: EventType,
    pub life_stage: LifeStage,
    pub placeholders: Placeholders,
    /// Attributes currently at or below the low threshold
    pub low_attributes: Vec<Attribute>,
    pub tags: Vec<String>,
}

/// Text and choices produced by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub narrative: String,
    pub choices: Vec<EventChoice>,
}

impl GeneratedContent {
    /// Parses a provider's JSON answer and checks it.
    pub fn from_json(json: &str) -> Result<Self, ContentProviderError> {
        serde_json::from_str::<Self>(json)
            .map_err(|e| ContentProviderError::Malformed(e.to_string()))?
            .check()
    }

    /// Rejects content the engine cannot present.
    pub fn check(self) -> Result<Self, ContentProviderError> {
        if self.title.trim().is_empty() {
            return Err(ContentProviderError::Malformed("empty title".to_string()));
        }
        if self.choices.is_empty() {
            return Err(ContentProviderError::Malformed("no choices".to_string()));
        }
        Ok(self)
    }
}

/// Failure of an external content provider. Never fatal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContentProviderError {
    #[error("content provider timed out after {0:?}")]
    Timeout(Duration),
    #[error("content provider unavailable: {0}")]
    Unavailable(String),
    #[error("content provider returned malformed content: {0}")]
    Malformed(String),
}

/// Something that can write event content.
pub trait ContentProvider: Send + Sync {
    /// Name recorded as the event's content source.
    fn name(&self) -> &str;

    fn generate_content(
        &self,
        request: &ContentRequest,
    ) -> Result<GeneratedContent, ContentProviderError>;
}

/// Deterministic provider that renders from a template library.
#[derive(Debug, Clone)]
pub struct TemplateProvider {
    library: Arc<TemplateLibrary>,
}

impl TemplateProvider {
    pub fn new(library: Arc<TemplateLibrary>) -> Self {
        Self { library }
    }
}

impl ContentProvider for TemplateProvider {
    fn name(&self) -> &str {
        "templates"
    }

    fn generate_content(
        &self,
        request: &ContentRequest,
    ) -> Result<GeneratedContent, ContentProviderError> {
        let template = self.library.get(&request.template_id).ok_or_else(|| {
            ContentProviderError::Unavailable(format!("no template {}", request.template_id))
        })?;
        let p = &request.placeholders;

        GeneratedContent {
            title: p.fill(&template.title),
            description: p.fill(&template.description),
            narrative: p.fill(&template.narrative),
            choices: template
                .choices
                .iter()
                .enumerate()
                .map(|(i, c)| c.render(i, p))
                .collect(),
        }
        .check()
    }
}

/// Default cap on concurrent provider workers
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Bounds the wait on an inner provider.
///
/// The inner call runs on a worker thread. If no answer arrives within the
/// timeout the call fails with [`ContentProviderError::Timeout`]; the worker
/// is left to finish on its own and its late answer is dropped.
///
/// Abandoned workers still count against `max_in_flight`. Once that many
/// calls are running, further calls fail with
/// [`ContentProviderError::Unavailable`] without spawning, so a provider that
/// never returns holds at most `max_in_flight` threads.
pub struct TimeoutProvider<P> {
    inner: Arc<P>,
    timeout: Duration,
    max_in_flight: usize,
    in_flight: Arc<AtomicUsize>,
}

impl<P: ContentProvider + 'static> TimeoutProvider<P> {
    pub fn new(inner: P, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            timeout,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Worker threads currently running, including abandoned ones.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn reserve(&self) -> bool {
        self.in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_in_flight).then_some(n + 1)
            })
            .is_ok()
    }
}

impl<P: ContentProvider + 'static> ContentProvider for TimeoutProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn generate_content(
        &self,
        request: &ContentRequest,
    ) -> Result<GeneratedContent, ContentProviderError> {
        if !self.reserve() {
            return Err(ContentProviderError::Unavailable(format!(
                "{} provider calls still running",
                self.max_in_flight
            )));
        }

        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let in_flight = Arc::clone(&self.in_flight);
        let request = request.clone();

        let spawned = thread::Builder::new()
            .name("content-provider".to_string())
            .spawn(move || {
                let result = inner.generate_content(&request);
                in_flight.fetch_sub(1, Ordering::SeqCst);
                // Receiver may be gone after a timeout
                let _ = tx.send(result);
            });
        if let Err(e) = spawned {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(ContentProviderError::Unavailable(e.to_string()));
        }

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result.and_then(GeneratedContent::check),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(ContentProviderError::Timeout(self.timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ContentProviderError::Unavailable(
                "provider worker exited without an answer".to_string(),
            )),
        }
    }
}
