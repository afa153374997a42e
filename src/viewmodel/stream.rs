//! Input and output stream types.
//!
//! Buffering is unbounded on both sides: event volume is UI-scale and a view
//! must never block on its view model.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, FusedStream, Stream};
use tokio::sync::mpsc;

use crate::error::CollaboratorFailure;
use crate::viewmodel::shared::SharedOutput;

/// One element of an output stream. `Err` is terminal.
pub type OutputEvent<T> = Result<T, CollaboratorFailure>;

/// Sending half of a view's input channel.
pub struct EventSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventSender<T> {
    /// Returns `false` once the receiving stream is gone.
    pub fn send(&self, event: T) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Lazy, unbounded sequence of input events.
///
/// Consumed once. A new subscription needs a new stream; nothing is replayed.
pub struct InputStream<T> {
    inner: Pin<Box<dyn Stream<Item = T> + Send>>,
}

impl<T: Send + 'static> InputStream<T> {
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    pub fn empty() -> Self {
        Self::from_stream(stream::empty())
    }
}

impl<T> Stream for InputStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Create a connected sender/stream pair.
pub fn input_channel<T: Send + 'static>() -> (EventSender<T>, InputStream<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventSender { tx },
        InputStream::from_stream(ReceiverStream { rx }),
    )
}

pub(crate) struct ReceiverStream<T> {
    pub(crate) rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Stream for ReceiverStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

/// Output of a view model transform.
///
/// Ends after the first `Err`, whatever the upstream does afterwards.
/// Dropping it drops the upstream, which cancels any in-flight collaborator
/// call owned by this subscription.
pub struct OutputStream<T> {
    inner: Pin<Box<dyn Stream<Item = OutputEvent<T>> + Send>>,
    done: bool,
}

impl<T: Send + 'static> OutputStream<T> {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = OutputEvent<T>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
            done: false,
        }
    }

    /// Wrap an infallible stream.
    pub fn from_values<S>(stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        use futures::StreamExt;
        Self::new(stream.map(Ok))
    }

    pub fn empty() -> Self {
        Self::new(stream::empty())
    }

    /// A stream holding a single terminal failure.
    pub fn failed(failure: CollaboratorFailure) -> Self {
        Self::new(stream::once(async move { Err(failure) }))
    }

    /// Turn this stream into a multicast source.
    pub fn share(self) -> SharedOutput<T>
    where
        T: Clone,
    {
        SharedOutput::new(self)
    }
}

impl<T> Stream for OutputStream<T> {
    type Item = OutputEvent<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Err(failure))) => {
                self.done = true;
                Poll::Ready(Some(Err(failure)))
            }
            Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl<T> FusedStream for OutputStream<T> {
    fn is_terminated(&self) -> bool {
        self.done
    }
}
