//! Messages flowing into and out of the coordinator tree.

use std::fmt;

use tokio::sync::mpsc;

use crate::coordinator::CoordinatorId;

/// A flow event addressed to one coordinator.
pub(crate) struct Envelope<E> {
    pub(crate) target: CoordinatorId,
    pub(crate) event: E,
}

/// Cloneable handle that posts flow events to a coordinator.
///
/// Bindings use it to forward navigation-relevant outputs. Delivery happens
/// on the tree's own execution context; events reaching a coordinator that
/// is no longer active are dropped there.
pub struct Navigator<E> {
    target: CoordinatorId,
    tx: mpsc::UnboundedSender<Envelope<E>>,
}

impl<E> Clone for Navigator<E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target,
            tx: self.tx.clone(),
        }
    }
}

impl<E> Navigator<E> {
    pub(crate) fn new(target: CoordinatorId, tx: mpsc::UnboundedSender<Envelope<E>>) -> Self {
        Self { target, tx }
    }

    pub fn target(&self) -> CoordinatorId {
        self.target
    }

    /// Returns `false` when the tree has been dropped.
    pub fn send(&self, event: E) -> bool {
        self.tx
            .send(Envelope {
                target: self.target,
                event,
            })
            .is_ok()
    }
}

impl<E> fmt::Debug for Navigator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("target", &self.target)
            .finish()
    }
}

/// Why a coordinator finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The flow asked to finish itself.
    Completed,
    /// The flow was torn down by its parent, the tree or shutdown.
    Cancelled,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Completed => f.write_str("completed"),
            FinishReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Delivered to a parent when one of its children finished.
#[derive(Debug)]
pub struct Completion<E> {
    pub id: CoordinatorId,
    pub name: &'static str,
    pub reason: FinishReason,
    /// The event the child finished with, if any.
    pub result: Option<E>,
}

/// Tree-wide lifecycle notification, see [`CoordinatorTree::subscribe`](super::CoordinatorTree::subscribe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Started {
        id: CoordinatorId,
        name: &'static str,
        parent: Option<CoordinatorId>,
    },
    Finished {
        id: CoordinatorId,
        name: &'static str,
        parent: Option<CoordinatorId>,
        reason: FinishReason,
    },
}

impl LifecycleEvent {
    pub fn id(&self) -> CoordinatorId {
        match self {
            LifecycleEvent::Started { id, .. } | LifecycleEvent::Finished { id, .. } => *id,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, LifecycleEvent::Finished { .. })
    }
}
