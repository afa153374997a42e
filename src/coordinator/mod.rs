//! Coordinator tree: ownership and lifecycle of navigation flows.
//!
//! ```text
//! CoordinatorTree ── root ──┬── child ── grandchild
//!        │                  └── child
//!        └── NavigationHost (shared, serialised)
//! ```
//!
//! A coordinator is created on demand by its parent, started once, and
//! finished exactly once. Finishing tears down its children first, then its
//! own screens and bindings, then reports a [`Completion`] to the parent.

mod context;
mod events;
mod id;
mod state;
mod traits;
mod tree;

pub use context::FlowContext;
pub use events::{Completion, FinishReason, LifecycleEvent, Navigator};
pub use id::CoordinatorId;
pub use state::LifecycleState;
pub use traits::Coordinator;
pub use tree::CoordinatorTree;
