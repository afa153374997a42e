//! Headless view that records what it was asked to render.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::binder::View;
use crate::error::CollaboratorFailure;
use crate::viewmodel::{input_channel, EventSender, InputStream};

struct Record<S> {
    rendered: Mutex<Vec<S>>,
    failures: Mutex<Vec<CollaboratorFailure>>,
    torn_down: AtomicBool,
    changed: Notify,
}

/// A [`View`] with no pixels. Its [`ViewHandle`] plays the user.
pub struct RecordingView<E, S> {
    name: String,
    input: Option<InputStream<E>>,
    record: Arc<Record<S>>,
}

/// Injects input into a [`RecordingView`] and inspects its renders.
pub struct ViewHandle<E, S> {
    events: EventSender<E>,
    record: Arc<Record<S>>,
}

impl<E, S> Clone for ViewHandle<E, S> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            record: Arc::clone(&self.record),
        }
    }
}

impl<E: Send + 'static, S> RecordingView<E, S> {
    pub fn new(name: impl Into<String>) -> (ViewHandle<E, S>, Self) {
        let (events, input) = input_channel();
        let record = Arc::new(Record {
            rendered: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            torn_down: AtomicBool::new(false),
            changed: Notify::new(),
        });
        let handle = ViewHandle {
            events,
            record: Arc::clone(&record),
        };
        let view = Self {
            name: name.into(),
            input: Some(input),
            record,
        };
        (handle, view)
    }
}

impl<E, S> View for RecordingView<E, S>
where
    E: Send + 'static,
    S: std::fmt::Debug + Send + 'static,
{
    type Event = E;
    type State = S;

    fn input_events(&mut self) -> InputStream<E> {
        self.input.take().unwrap_or_else(InputStream::empty)
    }

    fn render(&mut self, state: S) {
        tracing::debug!(view = %self.name, ?state, "render");
        self.record.rendered.lock().push(state);
        self.record.changed.notify_waiters();
    }

    fn render_failure(&mut self, failure: &CollaboratorFailure) {
        tracing::debug!(view = %self.name, %failure, "render failure");
        self.record.failures.lock().push(failure.clone());
        self.record.changed.notify_waiters();
    }

    fn tear_down(&mut self) {
        self.record.torn_down.store(true, Ordering::SeqCst);
        self.record.changed.notify_waiters();
    }
}

impl<E, S> ViewHandle<E, S> {
    /// Returns `false` once the view's input stream has been dropped.
    pub fn send(&self, event: E) -> bool {
        self.events.send(event)
    }

    pub fn render_count(&self) -> usize {
        self.record.rendered.lock().len()
    }

    pub fn failures(&self) -> Vec<CollaboratorFailure> {
        self.record.failures.lock().clone()
    }

    pub fn is_torn_down(&self) -> bool {
        self.record.torn_down.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` states have been rendered.
    pub async fn wait_for_renders(&self, count: usize) {
        self.wait_until(|| self.render_count() >= count).await;
    }

    pub async fn wait_for_failure(&self) {
        self.wait_until(|| !self.record.failures.lock().is_empty())
            .await;
    }

    pub async fn wait_for_teardown(&self) {
        self.wait_until(|| self.is_torn_down()).await;
    }

    async fn wait_until(&self, done: impl Fn() -> bool) {
        loop {
            let changed = self.record.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();
            if done() {
                return;
            }
            changed.await;
        }
    }
}

impl<E, S: Clone> ViewHandle<E, S> {
    pub fn rendered(&self) -> Vec<S> {
        self.record.rendered.lock().clone()
    }

    pub fn last_rendered(&self) -> Option<S> {
        self.record.rendered.lock().last().cloned()
    }

    /// Wait for the first rendered state matching `matches`.
    ///
    /// Resolves with the failure instead if the binding rendered one first,
    /// since no state can follow it.
    pub async fn wait_for_state(
        &self,
        matches: impl Fn(&S) -> bool,
    ) -> Result<S, CollaboratorFailure> {
        loop {
            let changed = self.record.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();
            if let Some(state) = self.record.rendered.lock().iter().find(|s| matches(s)) {
                return Ok(state.clone());
            }
            if let Some(failure) = self.record.failures.lock().first() {
                return Err(failure.clone());
            }
            changed.await;
        }
    }
}
