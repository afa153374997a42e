//! Application shutdown signal.
//!
//! The coordinator tree lives until this fires; its run loop then tears the
//! whole flow graph down, children first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Default)]
struct Signal {
    fired: AtomicBool,
    wake: Notify,
}

/// Owner side of the shutdown signal. Hand out [`ShutdownHandle`]s to the
/// tasks that need to observe or trigger it.
#[derive(Default)]
pub struct Shutdown {
    handle: ShutdownHandle,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) {
        self.handle.signal();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.handle.is_shutting_down()
    }

    pub fn handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }
}

/// Cloneable view of the signal: any holder may fire it or wait for it.
#[derive(Clone, Default)]
pub struct ShutdownHandle {
    signal: Arc<Signal>,
}

impl ShutdownHandle {
    pub fn is_shutting_down(&self) -> bool {
        self.signal.fired.load(Ordering::SeqCst)
    }

    /// Fire the signal. Later calls are no-ops.
    pub fn signal(&self) {
        if self.signal.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("shutdown initiated");
        self.signal.wake.notify_waiters();
    }

    /// Resolve once the signal has fired, immediately if it already has.
    pub async fn wait(&self) {
        // Register before reading the flag so a concurrent signal is not missed.
        let woken = self.signal.wake.notified();
        tokio::pin!(woken);
        woken.as_mut().enable();
        if !self.is_shutting_down() {
            woken.await;
        }
    }
}
