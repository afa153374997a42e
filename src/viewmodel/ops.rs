//! Stream operators for view model transforms.
//!
//! When one input fans out into an asynchronous collaborator call, the
//! transform picks one of these to fix how results merge:
//!
//! - [`ordered`] / [`try_ordered`]: one call at a time, outputs in input
//!   order. This is the default choice.
//! - [`latest`]: last write wins. A newer input drops the call still in
//!   flight for the older one, so a stale response is never emitted.

use std::future::Future;
use std::pin::Pin;

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};

use crate::error::CollaboratorFailure;
use crate::viewmodel::stream::OutputStream;

/// Run `f` for each input in turn and emit the results in input order.
pub fn ordered<S, I, O, F, Fut>(input: S, f: F) -> impl Stream<Item = O> + Send + 'static
where
    S: Stream<Item = I> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I) -> Fut + Send + 'static,
    Fut: Future<Output = O> + Send + 'static,
{
    input.then(f)
}

/// Like [`ordered`], for calls that can fail. The first failure ends the output.
pub fn try_ordered<S, I, O, F, Fut>(input: S, f: F) -> OutputStream<O>
where
    S: Stream<Item = I> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I) -> Fut + Send + 'static,
    Fut: Future<Output = Result<O, CollaboratorFailure>> + Send + 'static,
{
    OutputStream::new(input.then(f))
}

/// Run `f` for each input; a newer input cancels the pending call.
pub fn latest<S, I, O, F, Fut>(input: S, f: F) -> BoxStream<'static, O>
where
    S: Stream<Item = I> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I) -> Fut + Send + 'static,
    Fut: Future<Output = O> + Send + 'static,
{
    let state = Latest {
        input: Box::pin(input),
        pending: None,
        input_done: false,
        f,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            match state.pending.as_mut() {
                None => {
                    if state.input_done {
                        return None;
                    }
                    match state.input.next().await {
                        Some(item) => state.pending = Some(Box::pin((state.f)(item))),
                        None => return None,
                    }
                }
                Some(call) => {
                    if state.input_done {
                        let out = call.await;
                        state.pending = None;
                        return Some((out, state));
                    }
                    let step = tokio::select! {
                        biased;
                        next = state.input.next() => Step::Input(next),
                        out = call => Step::Output(out),
                    };
                    match step {
                        Step::Input(Some(item)) => {
                            tracing::trace!("newer input supersedes in-flight call");
                            state.pending = Some(Box::pin((state.f)(item)));
                        }
                        Step::Input(None) => state.input_done = true,
                        Step::Output(out) => {
                            state.pending = None;
                            return Some((out, state));
                        }
                    }
                }
            }
        }
    })
    .boxed()
}

struct Latest<S, Fut, F> {
    input: Pin<Box<S>>,
    pending: Option<Pin<Box<Fut>>>,
    input_done: bool,
    f: F,
}

enum Step<I, O> {
    Input(Option<I>),
    Output(O),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewmodel::input_channel;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn ordered_keeps_input_order_despite_latency() {
        // Earlier inputs take longer; order must still hold.
        let input = stream::iter(vec![30u64, 20, 10]);
        let out: Vec<_> = ordered(input, |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms
        })
        .collect()
        .await;
        assert_eq!(out, vec![30, 20, 10]);
    }

    #[tokio::test]
    async fn try_ordered_stops_at_failure() {
        let input = stream::iter(vec![1, 2, 3]);
        let out: Vec<_> = try_ordered(input, |n| async move {
            if n == 2 {
                Err(CollaboratorFailure::new("svc", "boom"))
            } else {
                Ok(n)
            }
        })
        .collect()
        .await;
        assert_eq!(out, vec![Ok(1), Err(CollaboratorFailure::new("svc", "boom"))]);
    }

    #[tokio::test(start_paused = true)]
    async fn latest_drops_superseded_calls() {
        let (tx, input) = input_channel::<&'static str>();
        let mut out = latest(input, |query| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            query
        });

        tx.send("a");
        tx.send("ab");
        let first = out.next().await;
        assert_eq!(first, Some("ab"));

        tx.send("abc");
        drop(tx);
        assert_eq!(out.next().await, Some("abc"));
        assert_eq!(out.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn latest_emits_every_result_when_calls_do_not_overlap() {
        let (tx, input) = input_channel::<u32>();
        let mut out = latest(input, |n| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            n
        });

        tx.send(1);
        assert_eq!(out.next().await, Some(1));
        tx.send(2);
        assert_eq!(out.next().await, Some(2));
    }
}
