//! Step-chain engine.
//!
//! A story is a graph of steps sharing one strongly-typed model. Each step
//! reads and writes model fields, then returns a [`StepResult`] naming the
//! next step (or none, ending the chain) plus optional feedback for the user.
//!
//! ```text
//! run_chain ──► step A ──► StepResult { next: B, toast }
//!                              │
//!                              ├──► Feedback (filtered by UiMode)
//!                              ▼
//!               step B ──► StepResult { next: None, error }
//! ```
//!
//! Steps never fail outward: an `Err` returned by a step becomes a result
//! carrying the error, which the engine translates to text through the story
//! before surfacing it. Steps run strictly one after another and the engine
//! awaits between them, so a story never occupies a thread while a step waits
//! on I/O.

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

/// How much user interface a story may show. Ordered from least to most.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UiMode {
    /// No UI. Feedback goes to [`Feedback::background_toast`], which may
    /// ignore it.
    Silent,
    /// Toasts only. Dialog messages are shown as toasts.
    OnlyMessages,
    /// Dialogs and toasts.
    Gui,
}

impl UiMode {
    /// Whether toasts may be shown.
    pub fn shows_toasts(self) -> bool {
        self >= Self::OnlyMessages
    }

    /// Whether dialogs may be shown.
    pub fn shows_dialogs(self) -> bool {
        self >= Self::Gui
    }
}

/// Outcome of one step invocation. Built once by the step, then only read.
#[derive(Debug)]
pub struct StepResult<S, E> {
    next: Option<S>,
    toast: Option<String>,
    message: Option<String>,
    error: Option<E>,
}

impl<S, E> StepResult<S, E> {
    /// Continue with `step`.
    pub fn next(step: S) -> Self {
        Self {
            next: Some(step),
            toast: None,
            message: None,
            error: None,
        }
    }

    /// End the chain.
    pub fn done() -> Self {
        Self {
            next: None,
            toast: None,
            message: None,
            error: None,
        }
    }

    /// End the chain with an error.
    pub fn failed(error: E) -> Self {
        Self {
            next: None,
            toast: None,
            message: None,
            error: Some(error),
        }
    }

    /// Attach a toast.
    pub fn with_toast(mut self, text: impl Into<String>) -> Self {
        self.toast = Some(text.into());
        self
    }

    /// Attach a dialog message.
    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        self.message = Some(text.into());
        self
    }

    /// The step to run next, if any.
    pub fn next_step(&self) -> Option<&S> {
        self.next.as_ref()
    }

    /// The toast text, if any.
    pub fn toast(&self) -> Option<&str> {
        self.toast.as_deref()
    }

    /// The dialog message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The error, if any.
    pub fn error(&self) -> Option<&E> {
        self.error.as_ref()
    }
}

/// Where a story's user-facing text goes.
///
/// Implementations may be no-ops; steps must not depend on feedback being
/// shown.
pub trait Feedback: Send + Sync {
    /// Show a transient notification.
    fn show_toast(&self, text: &str);

    /// Show a dialog message.
    fn show_message(&self, text: &str);

    /// Best-effort notice while running silently. Ignored by default.
    fn background_toast(&self, _text: &str) {}
}

/// Feedback that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn show_toast(&self, _text: &str) {}
    fn show_message(&self, _text: &str) {}
}

/// A piece of feedback captured by [`RecordingFeedback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackEvent {
    /// A toast.
    Toast(String),
    /// A dialog message.
    Message(String),
    /// A background notice in silent mode.
    Background(String),
}

/// Feedback that records everything, for tests and headless callers.
#[derive(Debug, Clone, Default)]
pub struct RecordingFeedback {
    events: Arc<Mutex<Vec<FeedbackEvent>>>,
}

impl RecordingFeedback {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far.
    pub fn events(&self) -> Vec<FeedbackEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Drain all events.
    pub fn take(&self) -> Vec<FeedbackEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    fn push(&self, event: FeedbackEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Feedback for RecordingFeedback {
    fn show_toast(&self, text: &str) {
        self.push(FeedbackEvent::Toast(text.to_string()));
    }

    fn show_message(&self, text: &str) {
        self.push(FeedbackEvent::Message(text.to_string()));
    }

    fn background_toast(&self, text: &str) {
        self.push(FeedbackEvent::Background(text.to_string()));
    }
}

/// A protocol made of steps over one model.
///
/// The story value owns the capabilities its steps need (stores, cloud
/// client, text catalog). The model carries everything the steps tell each
/// other.
#[async_trait]
pub trait Story: Send + Sync {
    /// The typed state threaded through every step.
    type Model: Send;
    /// Step identifiers.
    type Step: Copy + Debug + Send + Sync;
    /// Errors a step may produce.
    type Error: std::error::Error + Send + Sync;

    /// Run one step.
    async fn run_step(
        &self,
        step: Self::Step,
        model: &mut Self::Model,
        mode: UiMode,
    ) -> Result<StepResult<Self::Step, Self::Error>, Self::Error>;

    /// Translate an error into user-facing text.
    fn describe_error(&self, error: &Self::Error) -> String;
}

/// What happened during [`run_chain`].
#[derive(Debug)]
pub struct ChainOutcome<S, E> {
    /// Steps in the order they ran.
    pub visited: Vec<S>,
    /// Error of the final step, if it failed.
    pub error: Option<E>,
}

impl<S, E> ChainOutcome<S, E> {
    /// Whether the chain ended without an error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Run a story from `first` until a step returns no next step.
pub async fn run_chain<S: Story>(
    story: &S,
    first: S::Step,
    model: &mut S::Model,
    mode: UiMode,
    feedback: &dyn Feedback,
) -> ChainOutcome<S::Step, S::Error> {
    let mut visited = Vec::new();
    let mut step = first;

    loop {
        tracing::debug!(?step, ?mode, "running step");
        visited.push(step);

        let result = match story.run_step(step, model, mode).await {
            Ok(result) => result,
            Err(error) => StepResult::failed(error),
        };
        surface(story, &result, mode, feedback);

        match result.next {
            Some(next) => step = next,
            None => {
                if let Some(error) = &result.error {
                    tracing::debug!(?step, %error, "story ended with error");
                }
                return ChainOutcome {
                    visited,
                    error: result.error,
                };
            }
        }
    }
}

fn surface<S: Story>(
    story: &S,
    result: &StepResult<S::Step, S::Error>,
    mode: UiMode,
    feedback: &dyn Feedback,
) {
    if let Some(toast) = result.toast() {
        if mode.shows_toasts() {
            feedback.show_toast(toast);
        } else {
            feedback.background_toast(toast);
        }
    }

    let error_text = result.error().map(|e| story.describe_error(e));
    for text in result.message().into_iter().chain(error_text.as_deref()) {
        if mode.shows_dialogs() {
            feedback.show_message(text);
        } else if mode.shows_toasts() {
            feedback.show_toast(text);
        } else {
            feedback.background_toast(text);
        }
    }
}
