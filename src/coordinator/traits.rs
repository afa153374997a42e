use async_trait::async_trait;

use crate::coordinator::{Completion, FlowContext};
use crate::error::FlowResult;

/// A node in the navigation tree.
///
/// Implementations own the state of one slice of flow. Every hook receives a
/// [`FlowContext`] through which the coordinator presents screens, binds
/// views and requests structural changes. Structural changes (starting or
/// finishing children, finishing itself) are queued and applied by the tree
/// once the hook returns.
#[async_trait]
pub trait Coordinator<E: Send + 'static>: Send + 'static {
    fn name(&self) -> &'static str;

    /// Establish the first screen of the flow.
    async fn start(&mut self, ctx: &mut FlowContext<E>) -> FlowResult;

    /// A flow event posted through a [`Navigator`](super::Navigator) or
    /// [`CoordinatorTree::dispatch`](super::CoordinatorTree::dispatch).
    async fn handle_event(&mut self, ctx: &mut FlowContext<E>, event: E) -> FlowResult {
        let _ = (ctx, event);
        Ok(())
    }

    /// A child finished and has already been detached.
    ///
    /// By default the coordinator finishes too once its last child is gone
    /// and [`flow_complete`](Self::flow_complete) holds.
    async fn child_did_finish(
        &mut self,
        ctx: &mut FlowContext<E>,
        completion: Completion<E>,
    ) -> FlowResult {
        let _ = completion;
        if ctx.pending_children() == 0 && self.flow_complete() {
            ctx.finish(None);
        }
        Ok(())
    }

    fn flow_complete(&self) -> bool {
        false
    }

    /// Called after every child has finished, before the coordinator is
    /// detached. Removes the coordinator's screens by default.
    async fn stop(&mut self, ctx: &mut FlowContext<E>) -> FlowResult {
        ctx.dismiss_all().await?;
        Ok(())
    }
}
