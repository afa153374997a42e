//! Render surface collaborator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::HostError;
use crate::host::context::ScreenDescriptor;

/// The physical presentation layer.
///
/// Each call resolves once the transition animation has settled.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    async fn present_screen(&self, descriptor: &ScreenDescriptor) -> Result<(), HostError>;

    async fn dismiss(&self) -> Result<(), HostError>;

    async fn replace_top(&self, descriptor: &ScreenDescriptor) -> Result<(), HostError>;

    /// Take a screen out from under the top of the stack. `depth_from_top`
    /// is at least 1; the visible screen does not change.
    async fn remove_screen(
        &self,
        descriptor: &ScreenDescriptor,
        depth_from_top: usize,
    ) -> Result<(), HostError>;
}

/// A transition observed by [`InMemorySurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Present(String),
    Dismiss,
    ReplaceTop(String),
    Remove(String),
}

/// Headless surface that records transitions.
///
/// Used by the demo binary and tests. An optional delay stands in for
/// animation time, and `fail_next` injects a single surface failure.
#[derive(Default)]
pub struct InMemorySurface {
    delay: Duration,
    log: Mutex<Vec<Transition>>,
    fail_next: Mutex<Option<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn transitions(&self) -> Vec<Transition> {
        self.log.lock().clone()
    }

    pub fn fail_next(&self, message: impl Into<String>) {
        *self.fail_next.lock() = Some(message.into());
    }

    /// Highest number of transitions ever running at the same time.
    pub fn max_concurrent_transitions(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn animate(&self, operation: &'static str, transition: Transition) -> Result<(), HostError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let _in_flight = scopeguard::guard(&self.in_flight, |counter| {
            counter.fetch_sub(1, Ordering::SeqCst);
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(message) = self.fail_next.lock().take() {
            return Err(HostError::Surface { operation, message });
        }

        tracing::trace!(?transition, "surface transition settled");
        self.log.lock().push(transition);
        Ok(())
    }
}

#[async_trait]
impl RenderSurface for InMemorySurface {
    async fn present_screen(&self, descriptor: &ScreenDescriptor) -> Result<(), HostError> {
        self.animate("present", Transition::Present(descriptor.route.clone()))
            .await
    }

    async fn dismiss(&self) -> Result<(), HostError> {
        self.animate("dismiss", Transition::Dismiss).await
    }

    async fn replace_top(&self, descriptor: &ScreenDescriptor) -> Result<(), HostError> {
        self.animate("replace_top", Transition::ReplaceTop(descriptor.route.clone()))
            .await
    }

    async fn remove_screen(
        &self,
        descriptor: &ScreenDescriptor,
        depth_from_top: usize,
    ) -> Result<(), HostError> {
        tracing::trace!(route = %descriptor.route, depth_from_top, "removing buried screen");
        self.animate("remove", Transition::Remove(descriptor.route.clone()))
            .await
    }
}
