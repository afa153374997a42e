//! Navigation host: owns the visible stack and serialises every mutation.
//!
//! Coordinators never touch the [`NavigationContext`] directly. All pushes,
//! pops and replacements go through the host, which holds its stack lock for
//! the full duration of a surface transition. Two coordinators racing to
//! present therefore settle one after the other, never interleaved.

mod context;
mod surface;

pub use context::{NavigationContext, ScreenDescriptor, ScreenEntry, ScreenId};
pub use surface::{InMemorySurface, RenderSurface, Transition};

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::config::NavigationConfig;
use crate::coordinator::CoordinatorId;
use crate::error::HostError;

pub struct NavigationHost {
    surface: Arc<dyn RenderSurface>,
    context: Mutex<NavigationContext>,
    transition_timeout: Duration,
    max_depth: usize,
    next_screen: AtomicU64,
}

impl NavigationHost {
    pub fn new(surface: Arc<dyn RenderSurface>, config: &NavigationConfig) -> Self {
        Self::with_limits(surface, config.transition_timeout(), config.max_depth)
    }

    pub fn with_limits(
        surface: Arc<dyn RenderSurface>,
        transition_timeout: Duration,
        max_depth: usize,
    ) -> Self {
        Self {
            surface,
            context: Mutex::new(NavigationContext::default()),
            transition_timeout,
            max_depth,
            next_screen: AtomicU64::new(1),
        }
    }

    /// Push a screen owned by `owner`.
    pub async fn present(
        &self,
        owner: CoordinatorId,
        descriptor: ScreenDescriptor,
    ) -> Result<ScreenId, HostError> {
        let mut context = self.context.lock().await;
        if context.depth() >= self.max_depth {
            return Err(HostError::StackOverflow {
                max_depth: self.max_depth,
            });
        }

        self.settle("present", self.surface.present_screen(&descriptor))
            .await?;

        let id = self.next_screen_id();
        tracing::debug!(%owner, screen = %id, route = %descriptor.route, "presented screen");
        context.push(ScreenEntry {
            id,
            owner,
            descriptor,
        });
        Ok(id)
    }

    /// Replace the top screen. The top must belong to `owner`.
    ///
    /// Returns the new screen's id and the entry it replaced.
    pub async fn replace_top(
        &self,
        owner: CoordinatorId,
        descriptor: ScreenDescriptor,
    ) -> Result<(ScreenId, ScreenEntry), HostError> {
        let mut context = self.context.lock().await;
        ensure_owner(&context, owner)?;

        self.settle("replace_top", self.surface.replace_top(&descriptor))
            .await?;

        let replaced = context.pop().ok_or(HostError::EmptyStack)?;
        let id = self.next_screen_id();
        tracing::debug!(%owner, screen = %id, replaced = %replaced.id, route = %descriptor.route, "replaced top screen");
        context.push(ScreenEntry {
            id,
            owner,
            descriptor,
        });
        Ok((id, replaced))
    }

    /// Pop the top screen. The top must belong to `owner`.
    pub async fn dismiss(&self, owner: CoordinatorId) -> Result<ScreenEntry, HostError> {
        let mut context = self.context.lock().await;
        ensure_owner(&context, owner)?;

        self.settle("dismiss", self.surface.dismiss()).await?;

        let entry = context.pop().ok_or(HostError::EmptyStack)?;
        tracing::debug!(%owner, screen = %entry.id, "dismissed screen");
        Ok(entry)
    }

    /// Take every screen `owner` presented off the stack, topmost first.
    /// Returns how many were removed.
    ///
    /// Screens on top are dismissed; screens buried under another owner's
    /// screens are removed in place, leaving the visible screen as it is.
    pub async fn dismiss_all(&self, owner: CoordinatorId) -> Result<usize, HostError> {
        let mut context = self.context.lock().await;
        let positions = context.owned_positions(owner);
        let mut buried = 0;

        for index in positions.iter().copied() {
            let depth_from_top = context.depth() - 1 - index;
            if depth_from_top == 0 {
                self.settle("dismiss", self.surface.dismiss()).await?;
                context.pop();
                continue;
            }
            let Some(entry) = context.entries().get(index) else {
                continue;
            };
            self.settle(
                "remove",
                self.surface.remove_screen(&entry.descriptor, depth_from_top),
            )
            .await?;
            context.remove(index);
            buried += 1;
        }
        if !positions.is_empty() {
            tracing::debug!(%owner, count = positions.len(), buried, "dismissed owned screens");
        }
        Ok(positions.len())
    }

    /// Forget `owner`'s screens without asking the surface. Used when a
    /// finished coordinator's screens could not be dismissed.
    pub(crate) async fn discard_owned(&self, owner: CoordinatorId) -> usize {
        let mut context = self.context.lock().await;
        let positions = context.owned_positions(owner);
        for index in positions.iter().copied() {
            context.remove(index);
        }
        if !positions.is_empty() {
            tracing::warn!(%owner, count = positions.len(), "dropped screens the surface could not dismiss");
        }
        positions.len()
    }

    pub async fn snapshot(&self) -> Vec<ScreenEntry> {
        self.context.lock().await.entries().to_vec()
    }

    pub async fn depth(&self) -> usize {
        self.context.lock().await.depth()
    }

    pub async fn top(&self) -> Option<ScreenEntry> {
        self.context.lock().await.top().cloned()
    }

    /// The single coordinator whose screen is currently visible.
    pub async fn current_owner(&self) -> Option<CoordinatorId> {
        self.context.lock().await.current_owner()
    }

    fn next_screen_id(&self) -> ScreenId {
        ScreenId(self.next_screen.fetch_add(1, Ordering::Relaxed))
    }

    async fn settle<F>(&self, operation: &'static str, transition: F) -> Result<(), HostError>
    where
        F: Future<Output = Result<(), HostError>>,
    {
        match tokio::time::timeout(self.transition_timeout, transition).await {
            Ok(result) => result,
            Err(_) => Err(HostError::TransitionTimeout {
                operation,
                timeout: self.transition_timeout,
            }),
        }
    }
}

fn ensure_owner(context: &NavigationContext, owner: CoordinatorId) -> Result<(), HostError> {
    match context.current_owner() {
        None => Err(HostError::EmptyStack),
        Some(actual) if actual == owner => Ok(()),
        actual => Err(HostError::NotOwner {
            requested: owner,
            actual,
        }),
    }
}
