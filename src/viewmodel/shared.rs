//! Multicast output streams.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::viewmodel::stream::{OutputEvent, OutputStream, ReceiverStream};

/// An output stream that several consumers can subscribe to.
///
/// The upstream is driven from the first `subscribe` onwards; late
/// subscribers only see events emitted after they joined. A subscriber
/// going away never disturbs the others. When the last one leaves, the
/// upstream is dropped and its in-flight work cancelled.
pub struct SharedOutput<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    upstream: Mutex<Option<OutputStream<T>>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<OutputEvent<T>>>>,
    leases: AtomicUsize,
    cancel: CancellationToken,
    finished: AtomicBool,
}

impl<T: Clone + Send + 'static> SharedOutput<T> {
    pub(crate) fn new(upstream: OutputStream<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                upstream: Mutex::new(Some(upstream)),
                subscribers: Mutex::new(Vec::new()),
                leases: AtomicUsize::new(0),
                cancel: CancellationToken::new(),
                finished: AtomicBool::new(false),
            }),
        }
    }

    /// Attach a new consumer. Must be called inside a tokio runtime.
    pub fn subscribe(&self) -> OutputStream<T> {
        if self.shared.cancel.is_cancelled() || self.shared.finished.load(Ordering::SeqCst) {
            return OutputStream::empty();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.subscribers.lock().push(tx);
        self.shared.leases.fetch_add(1, Ordering::SeqCst);

        let upstream = self.shared.upstream.lock().take();
        if let Some(upstream) = upstream {
            tokio::spawn(drive(Arc::clone(&self.shared), upstream));
        }

        OutputStream::new(Subscriber {
            events: ReceiverStream { rx },
            _lease: Lease(Arc::clone(&self.shared)),
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.leases.load(Ordering::SeqCst)
    }

    /// True once the upstream ended or every subscriber left.
    pub fn is_closed(&self) -> bool {
        self.shared.cancel.is_cancelled() || self.shared.finished.load(Ordering::SeqCst)
    }
}

async fn drive<T: Clone + Send + 'static>(shared: Arc<Shared<T>>, mut upstream: OutputStream<T>) {
    loop {
        let next = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            next = upstream.next() => next,
        };
        match next {
            Some(event) => {
                let mut subscribers = shared.subscribers.lock();
                subscribers.retain(|tx| tx.send(event.clone()).is_ok());
            }
            None => break,
        }
    }
    drop(upstream);
    shared.finished.store(true, Ordering::SeqCst);
    shared.subscribers.lock().clear();
    tracing::trace!("shared output stopped");
}

struct Subscriber<T> {
    events: ReceiverStream<OutputEvent<T>>,
    _lease: Lease<T>,
}

impl<T> Stream for Subscriber<T> {
    type Item = OutputEvent<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

struct Lease<T>(Arc<Shared<T>>);

impl<T> Drop for Lease<T> {
    fn drop(&mut self) {
        if self.0.leases.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.cancel.cancel();
        }
    }
}
