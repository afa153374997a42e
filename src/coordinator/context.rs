//! The handle a coordinator works through while one of its hooks runs.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::binder::{Binder, Binding, BindingId, View};
use crate::coordinator::id::IdAllocator;
use crate::coordinator::{Coordinator, CoordinatorId, LifecycleState, Navigator};
use crate::error::{FlowError, FlowResult};
use crate::host::{NavigationHost, ScreenDescriptor, ScreenEntry, ScreenId};
use crate::viewmodel::ViewModel;

/// A binding tied to the screen it renders.
pub(crate) struct ScreenBinding {
    pub(crate) screen: ScreenId,
    pub(crate) binding: Binding,
}

pub(crate) enum FlowCommand<E: Send + 'static> {
    StartChild {
        id: CoordinatorId,
        coordinator: Box<dyn Coordinator<E>>,
    },
    FinishChild(CoordinatorId),
    Finish(Option<E>),
}

/// Per-hook view of one coordinator.
///
/// Navigation calls go straight to the [`NavigationHost`]. Structural
/// requests are queued and applied by the tree after the hook returns.
pub struct FlowContext<E: Send + 'static> {
    id: CoordinatorId,
    name: &'static str,
    parent: Option<CoordinatorId>,
    pending_children: usize,
    finishing: bool,
    finish_requested: bool,
    host: Arc<NavigationHost>,
    token: CancellationToken,
    navigator: Navigator<E>,
    ids: IdAllocator,
    bindings: Vec<ScreenBinding>,
    commands: Vec<FlowCommand<E>>,
}

pub(crate) struct ContextParts {
    pub(crate) id: CoordinatorId,
    pub(crate) name: &'static str,
    pub(crate) parent: Option<CoordinatorId>,
    pub(crate) pending_children: usize,
    pub(crate) finishing: bool,
    pub(crate) token: CancellationToken,
    pub(crate) bindings: Vec<ScreenBinding>,
}

impl<E: Send + 'static> FlowContext<E> {
    pub(crate) fn new(
        parts: ContextParts,
        host: Arc<NavigationHost>,
        navigator: Navigator<E>,
        ids: IdAllocator,
    ) -> Self {
        Self {
            id: parts.id,
            name: parts.name,
            parent: parts.parent,
            pending_children: parts.pending_children,
            finishing: parts.finishing,
            finish_requested: false,
            host,
            token: parts.token,
            navigator,
            ids,
            bindings: parts.bindings,
            commands: Vec::new(),
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<ScreenBinding>, Vec<FlowCommand<E>>) {
        (self.bindings, self.commands)
    }

    pub fn id(&self) -> CoordinatorId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<CoordinatorId> {
        self.parent
    }

    /// Children attached when the hook started, plus those started since.
    pub fn pending_children(&self) -> usize {
        self.pending_children
    }

    /// True while the coordinator is being torn down or has asked to finish.
    pub fn is_finishing(&self) -> bool {
        self.finishing || self.finish_requested
    }

    pub fn host(&self) -> &Arc<NavigationHost> {
        &self.host
    }

    /// Cancelled when this coordinator finishes. Work spawned on behalf of
    /// the flow should observe it.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.token
    }

    /// A sender for events addressed to this coordinator.
    pub fn navigator(&self) -> Navigator<E> {
        self.navigator.clone()
    }

    pub async fn present(&mut self, descriptor: ScreenDescriptor) -> FlowResult<ScreenId> {
        self.ensure_running("present")?;
        Ok(self.host.present(self.id, descriptor).await?)
    }

    /// Replace this coordinator's top screen, releasing its bindings.
    pub async fn replace_top(&mut self, descriptor: ScreenDescriptor) -> FlowResult<ScreenId> {
        self.ensure_running("replace_top")?;
        let (screen, replaced) = self.host.replace_top(self.id, descriptor).await?;
        self.release_screen(replaced.id).await;
        Ok(screen)
    }

    /// Pop this coordinator's top screen, releasing its bindings.
    pub async fn dismiss(&mut self) -> FlowResult<ScreenEntry> {
        self.ensure_running("dismiss")?;
        let entry = self.host.dismiss(self.id).await?;
        self.release_screen(entry.id).await;
        Ok(entry)
    }

    /// Pop every screen this coordinator presented and release all of its
    /// bindings. Allowed while finishing.
    pub async fn dismiss_all(&mut self) -> FlowResult<usize> {
        self.release_all().await;
        Ok(self.host.dismiss_all(self.id).await?)
    }

    /// Bind `view` to `view_model` for the lifetime of `screen`.
    ///
    /// The binding is released when the screen is dismissed or replaced
    /// through this context, or when the coordinator finishes.
    pub fn bind<V, VM>(
        &mut self,
        screen: ScreenId,
        view: V,
        view_model: &mut VM,
    ) -> FlowResult<BindingId>
    where
        V: View,
        VM: ViewModel<Input = V::Event, Output = V::State>,
    {
        self.ensure_running("bind")?;
        let binding = Binder::bind(view, view_model, self.token.child_token())?;
        Ok(self.keep(screen, binding))
    }

    /// Like [`bind`](Self::bind), forwarding the flow events `route`
    /// extracts from the output to this coordinator.
    pub fn bind_routed<V, VM, R>(
        &mut self,
        screen: ScreenId,
        view: V,
        view_model: &mut VM,
        route: R,
    ) -> FlowResult<BindingId>
    where
        V: View,
        VM: ViewModel<Input = V::Event, Output = V::State>,
        R: Fn(&V::State) -> Option<E> + Send + 'static,
    {
        self.ensure_running("bind")?;
        let binding = Binder::bind_routed(
            view,
            view_model,
            self.token.child_token(),
            self.navigator(),
            route,
        )?;
        Ok(self.keep(screen, binding))
    }

    /// Queue `child` to be attached and started once this hook returns.
    pub fn start_child<C>(&mut self, child: C) -> FlowResult<CoordinatorId>
    where
        C: Coordinator<E>,
    {
        self.ensure_running("start_child")?;
        let id = self.ids.allocate();
        tracing::debug!(parent = %self.id, child = %id, name = child.name(), "queued child start");
        self.commands.push(FlowCommand::StartChild {
            id,
            coordinator: Box::new(child),
        });
        self.pending_children += 1;
        Ok(id)
    }

    /// Queue the cancellation of one of this coordinator's children.
    pub fn finish_child(&mut self, child: CoordinatorId) {
        self.commands.push(FlowCommand::FinishChild(child));
    }

    /// Queue this coordinator's own completion, handing `result` to the parent.
    pub fn finish(&mut self, result: Option<E>) {
        if self.is_finishing() {
            tracing::debug!(coordinator = %self.id, "finish already requested");
            return;
        }
        self.finish_requested = true;
        self.commands.push(FlowCommand::Finish(result));
    }

    fn ensure_running(&self, operation: &'static str) -> FlowResult {
        if self.is_finishing() {
            return Err(FlowError::InvalidState {
                id: self.id,
                state: LifecycleState::Active,
                operation,
            });
        }
        Ok(())
    }

    fn keep(&mut self, screen: ScreenId, binding: Binding) -> BindingId {
        let id = binding.id();
        tracing::debug!(coordinator = %self.id, %screen, binding = %id, view_model = binding.view_model(), "bound view");
        self.bindings.push(ScreenBinding { screen, binding });
        id
    }

    async fn release_screen(&mut self, screen: ScreenId) {
        let (released, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.bindings)
            .into_iter()
            .partition(|b| b.screen == screen);
        self.bindings = kept;
        release(released).await;
    }

    async fn release_all(&mut self) {
        release(std::mem::take(&mut self.bindings)).await;
    }
}

pub(crate) async fn release(bindings: Vec<ScreenBinding>) {
    for ScreenBinding { screen, binding } in bindings {
        let id = binding.id();
        let exit = binding.release().await;
        tracing::debug!(%screen, binding = %id, ?exit, "released binding");
    }
}
