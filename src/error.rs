//! Error types for flow coordination.
//!
//! Lifecycle misuse (`InvalidState`, `AlreadyStarted`, `AlreadyBound`, ...)
//! indicates a bug in how the flow graph was built. Collaborator failures are
//! runtime conditions and travel on a view model's output stream instead.

use std::time::Duration;

use thiserror::Error;

use crate::coordinator::{CoordinatorId, LifecycleState};

/// Errors raised by the coordinator tree and the view-model contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Operation attempted in the wrong lifecycle state.
    #[error("cannot {operation} coordinator {id} in state {state}")]
    InvalidState {
        id: CoordinatorId,
        state: LifecycleState,
        operation: &'static str,
    },

    /// `start` called on a coordinator that already left `NotStarted`.
    #[error("coordinator {id} already started (state {state})")]
    AlreadyStarted {
        id: CoordinatorId,
        state: LifecycleState,
    },

    /// A child must be `NotStarted` when it is attached.
    #[error("coordinator {id} cannot be attached in state {state}")]
    InvalidChildState {
        id: CoordinatorId,
        state: LifecycleState,
    },

    /// Coordinators never move between parents.
    #[error("coordinator {id} is already attached to {parent}")]
    AlreadyAttached {
        id: CoordinatorId,
        parent: CoordinatorId,
    },

    /// A coordinator tried to finish a node that is not its child.
    #[error("coordinator {id} is not a child of {parent}")]
    NotAChild {
        id: CoordinatorId,
        parent: CoordinatorId,
    },

    /// Only the root or an attached child can be started.
    #[error("coordinator {id} is not attached to the tree")]
    Detached { id: CoordinatorId },

    #[error("coordinator {id} does not belong to this tree")]
    UnknownCoordinator { id: CoordinatorId },

    /// The tree already owns a root.
    #[error("coordinator tree already launched")]
    AlreadyLaunched,

    /// `transform` called a second time on the same view model.
    #[error("view model '{view_model}' is already bound")]
    AlreadyBound { view_model: &'static str },

    #[error("navigation failed: {0}")]
    Navigation(#[from] HostError),
}

impl FlowError {
    /// True for errors that signal a mistake in flow-graph construction.
    pub fn is_contract_violation(&self) -> bool {
        !matches!(self, FlowError::Navigation(_))
    }

    /// Stable tag for logs.
    pub fn error_type(&self) -> &'static str {
        match self {
            FlowError::InvalidState { .. } => "invalid_state",
            FlowError::AlreadyStarted { .. } => "already_started",
            FlowError::InvalidChildState { .. } => "invalid_child_state",
            FlowError::AlreadyAttached { .. } => "already_attached",
            FlowError::NotAChild { .. } => "not_a_child",
            FlowError::Detached { .. } => "detached",
            FlowError::UnknownCoordinator { .. } => "unknown_coordinator",
            FlowError::AlreadyLaunched => "already_launched",
            FlowError::AlreadyBound { .. } => "already_bound",
            FlowError::Navigation(_) => "navigation",
        }
    }
}

/// Errors from the navigation host and its render surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The top of the stack belongs to another coordinator.
    #[error("top screen is owned by {actual:?}, not {requested}")]
    NotOwner {
        requested: CoordinatorId,
        actual: Option<CoordinatorId>,
    },

    #[error("navigation stack is empty")]
    EmptyStack,

    #[error("navigation stack is full ({max_depth} screens)")]
    StackOverflow { max_depth: usize },

    #[error("transition '{operation}' did not settle within {timeout:?}")]
    TransitionTimeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("render surface failed during '{operation}': {message}")]
    Surface {
        operation: &'static str,
        message: String,
    },
}

/// An upstream dependency of a view model failed.
///
/// Emitted as the terminal event of an output stream; the stream ends after it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{collaborator} failed: {message}")]
pub struct CollaboratorFailure {
    pub collaborator: String,
    pub message: String,
}

impl CollaboratorFailure {
    pub fn new(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }
}

pub type FlowResult<T = ()> = Result<T, FlowError>;
