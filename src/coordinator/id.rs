use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies a coordinator within one [`CoordinatorTree`](super::CoordinatorTree).
///
/// Ids are handed out sequentially by the tree and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordinatorId(u64);

impl CoordinatorId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CoordinatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for CoordinatorId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Hands out [`CoordinatorId`]s for one tree. Clones share the counter, so a
/// [`FlowContext`](super::FlowContext) can name a child before the tree
/// attaches it.
#[derive(Clone, Debug, Default)]
pub(crate) struct IdAllocator {
    issued: Arc<AtomicU64>,
}

impl IdAllocator {
    pub(crate) fn allocate(&self) -> CoordinatorId {
        CoordinatorId(self.issued.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
