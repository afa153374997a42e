//! Model-View-Intent primitives.
//!
//! A view model whose output is pure UI state can describe its transform as
//! a reducer folded over its inputs:
//!
//! ```text
//! Intent ──→ Reducer ──→ State ──→ View
//!    ↑                              │
//!    └──────────────────────────────┘
//! ```

use futures::{future, Stream, StreamExt};

use crate::viewmodel::stream::{OutputEvent, OutputStream};

/// Marker trait for UI state objects.
///
/// States should be:
/// - Immutable (Clone to create new states)
/// - Self-contained (all data needed to render the view)
/// - Comparable (PartialEq for detecting changes)
pub trait UiState: Clone + PartialEq + Default + Send + 'static {}

/// Marker trait for intents: user actions and system events.
pub trait Intent: Send + 'static {}

/// Reducer transforms state based on intents.
///
/// The reducer is the only place where state transitions happen.
/// It must be a pure function: (State, Intent) -> State
pub trait Reducer {
    type State: UiState;
    type Intent: Intent;

    fn reduce(state: Self::State, intent: Self::Intent) -> Self::State;
}

/// Fold `input` through `R`, emitting each state that differs from the previous one.
pub fn reduce_states<R, S>(input: S, initial: R::State) -> impl Stream<Item = R::State> + Send + 'static
where
    R: Reducer + 'static,
    S: Stream<Item = R::Intent> + Send + 'static,
{
    input
        .scan(initial, |state, intent| {
            let next = R::reduce(state.clone(), intent);
            if *state == next {
                return future::ready(Some(None));
            }
            *state = next.clone();
            future::ready(Some(Some(next)))
        })
        .filter_map(future::ready)
}

/// [`reduce_states`] for intents produced by fallible collaborator calls.
///
/// A failure is forwarded as the terminal output event.
pub fn try_reduce_states<R, S>(input: S, initial: R::State) -> OutputStream<R::State>
where
    R: Reducer + 'static,
    S: Stream<Item = OutputEvent<R::Intent>> + Send + 'static,
{
    let states = input
        .scan(initial, |state, event| {
            let out = match event {
                Ok(intent) => {
                    let next = R::reduce(state.clone(), intent);
                    if *state == next {
                        None
                    } else {
                        *state = next.clone();
                        Some(Ok(next))
                    }
                }
                Err(failure) => Some(Err(failure)),
            };
            future::ready(Some(out))
        })
        .filter_map(future::ready);
    OutputStream::new(states)
}
