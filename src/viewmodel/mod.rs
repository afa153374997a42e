//! View model contract: `Input -> Output` over streams.
//!
//! A view produces an [`InputStream`]; [`ViewModel::transform`] maps it to
//! an [`OutputStream`] that a binder applies back to the view. Collaborator
//! failures arrive as a terminal `Err` on the output rather than being
//! dropped.

mod collaborator;
mod contract;
mod mvi;
mod ops;
mod shared;
mod stream;

pub use collaborator::{Collaborator, SharedCollaborator};
pub use contract::{BindGuard, ViewModel};
pub use mvi::{reduce_states, try_reduce_states, Intent, Reducer, UiState};
pub use ops::{latest, ordered, try_ordered};
pub use shared::SharedOutput;
pub use stream::{input_channel, EventSender, InputStream, OutputEvent, OutputStream};
