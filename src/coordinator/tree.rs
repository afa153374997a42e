//! Arena-backed coordinator tree.
//!
//! Nodes live in a map keyed by [`CoordinatorId`]. A node owns the ids of its
//! children and records its parent's id; there are no references between
//! nodes. Finished nodes are removed from the arena, so a finished
//! coordinator can hold no children by construction.
//!
//! Every hook runs on the tree's own execution context: the tree is driven by
//! `&mut self` calls, and a hook's queued commands are applied before the
//! next hook starts. Navigation work inside hooks suspends on the
//! [`NavigationHost`], which serialises it against every other writer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{ContractConfig, ViolationPolicy};
use crate::coordinator::context::{release, ContextParts, FlowCommand, ScreenBinding};
use crate::coordinator::events::Envelope;
use crate::coordinator::id::IdAllocator;
use crate::coordinator::{
    Completion, Coordinator, CoordinatorId, FinishReason, FlowContext, LifecycleEvent,
    LifecycleState, Navigator,
};
use crate::error::{FlowError, FlowResult};
use crate::host::NavigationHost;
use crate::shutdown::ShutdownHandle;

struct Node<E: Send + 'static> {
    name: &'static str,
    /// Taken out while one of its hooks runs.
    coordinator: Option<Box<dyn Coordinator<E>>>,
    state: LifecycleState,
    finishing: bool,
    parent: Option<CoordinatorId>,
    children: Vec<CoordinatorId>,
    token: CancellationToken,
    bindings: Vec<ScreenBinding>,
}

impl<E: Send + 'static> Node<E> {
    fn new(coordinator: Box<dyn Coordinator<E>>) -> Self {
        Self {
            name: coordinator.name(),
            coordinator: Some(coordinator),
            state: LifecycleState::NotStarted,
            finishing: false,
            parent: None,
            children: Vec::new(),
            token: CancellationToken::new(),
            bindings: Vec::new(),
        }
    }

    fn is_running(&self) -> bool {
        self.state.is_active() && !self.finishing
    }
}

enum Hook<E> {
    Start,
    Event(E),
    ChildFinished(Completion<E>),
    Stop,
}

impl<E> Hook<E> {
    fn label(&self) -> &'static str {
        match self {
            Hook::Start => "start",
            Hook::Event(_) => "handle_event",
            Hook::ChildFinished(_) => "child_did_finish",
            Hook::Stop => "stop",
        }
    }
}

/// Owns the root coordinator and everything below it.
pub struct CoordinatorTree<E: Send + 'static> {
    host: Arc<NavigationHost>,
    policy: ViolationPolicy,
    nodes: HashMap<CoordinatorId, Node<E>>,
    root: Option<CoordinatorId>,
    ids: IdAllocator,
    /// Coordinators that were in the arena and have left it.
    retired: HashSet<CoordinatorId>,
    root_token: CancellationToken,
    inbox_tx: mpsc::UnboundedSender<Envelope<E>>,
    inbox_rx: mpsc::UnboundedReceiver<Envelope<E>>,
    observers: Vec<mpsc::UnboundedSender<LifecycleEvent>>,
    completion: Option<Completion<E>>,
}

impl<E: Send + 'static> CoordinatorTree<E> {
    pub fn new(host: Arc<NavigationHost>, contract: &ContractConfig) -> Self {
        Self::with_policy(host, contract.violation_policy)
    }

    pub fn with_policy(host: Arc<NavigationHost>, policy: ViolationPolicy) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            host,
            policy,
            nodes: HashMap::new(),
            root: None,
            ids: IdAllocator::default(),
            retired: HashSet::new(),
            root_token: CancellationToken::new(),
            inbox_tx,
            inbox_rx,
            observers: Vec::new(),
            completion: None,
        }
    }

    pub fn host(&self) -> &Arc<NavigationHost> {
        &self.host
    }

    /// Receive every lifecycle transition from now on.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<LifecycleEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    /// Build the root coordinator and start it. Allowed once per tree.
    pub async fn launch<F, C>(&mut self, factory: F) -> FlowResult<CoordinatorId>
    where
        F: FnOnce() -> C,
        C: Coordinator<E>,
    {
        if self.root.is_some() {
            return Err(FlowError::AlreadyLaunched);
        }
        let id = self.ids.allocate();
        let mut node = Node::new(Box::new(factory()));
        node.token = self.root_token.child_token();
        tracing::info!(root = %id, name = node.name, "launching coordinator tree");
        self.nodes.insert(id, node);
        self.root = Some(id);

        self.start_node(id).await?;
        Ok(id)
    }

    /// Register a coordinator without attaching or starting it.
    pub fn create<C>(&mut self, coordinator: C) -> CoordinatorId
    where
        C: Coordinator<E>,
    {
        let id = self.ids.allocate();
        self.nodes.insert(id, Node::new(Box::new(coordinator)));
        id
    }

    /// Attach a `NotStarted` coordinator under an active parent.
    pub fn add_child(&mut self, parent: CoordinatorId, child: CoordinatorId) -> FlowResult {
        let parent_token = match self.nodes.get(&parent) {
            Some(node) if node.is_running() => node.token.clone(),
            Some(node) => {
                return Err(FlowError::InvalidState {
                    id: parent,
                    state: node.state,
                    operation: "add_child",
                })
            }
            None => return Err(self.missing(parent, "add_child")),
        };

        let Some(node) = self.nodes.get_mut(&child) else {
            return Err(self.missing_child(child));
        };
        if node.state != LifecycleState::NotStarted {
            return Err(FlowError::InvalidChildState {
                id: child,
                state: node.state,
            });
        }
        if let Some(current) = node.parent {
            return Err(FlowError::AlreadyAttached {
                id: child,
                parent: current,
            });
        }
        node.parent = Some(parent);
        node.token = parent_token.child_token();

        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(child);
        }
        tracing::debug!(%parent, %child, "attached child");
        Ok(())
    }

    pub async fn start(&mut self, id: CoordinatorId) -> FlowResult {
        self.start_node(id).await
    }

    /// Cancel a coordinator and everything below it.
    pub async fn finish(&mut self, id: CoordinatorId) -> FlowResult {
        self.finish_node(id, FinishReason::Cancelled, None).await
    }

    /// Deliver `event` to an active coordinator right away.
    pub async fn dispatch(&mut self, target: CoordinatorId, event: E) -> FlowResult {
        match self.nodes.get(&target) {
            Some(node) if node.is_running() => {}
            Some(node) => {
                return Err(FlowError::InvalidState {
                    id: target,
                    state: node.state,
                    operation: "handle_event",
                })
            }
            None => return Err(self.missing(target, "handle_event")),
        }
        self.run_hook(target, Hook::Event(event)).await
    }

    pub fn navigator(&self, id: CoordinatorId) -> FlowResult<Navigator<E>> {
        if !self.nodes.contains_key(&id) {
            return Err(self.missing(id, "navigate"));
        }
        Ok(Navigator::new(id, self.inbox_tx.clone()))
    }

    /// Wait for the next posted event and deliver it.
    ///
    /// Returns `false` without waiting once the root has finished, or before
    /// anything was launched.
    pub async fn step(&mut self) -> bool {
        if self.root.is_none() || self.is_complete() {
            return false;
        }
        match self.inbox_rx.recv().await {
            Some(envelope) => {
                self.deliver(envelope).await;
                true
            }
            None => false,
        }
    }

    /// Deliver every event already waiting. Returns how many were handled.
    pub async fn drain(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(envelope) = self.inbox_rx.try_recv() {
            self.deliver(envelope).await;
            delivered += 1;
        }
        delivered
    }

    /// Drive the tree until the root finishes or shutdown is signalled.
    ///
    /// On shutdown the root is finished as cancelled. Returns the root's
    /// completion.
    pub async fn run(&mut self, shutdown: ShutdownHandle) -> Option<Completion<E>> {
        let root = self.root?;
        while !self.is_complete() {
            tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    tracing::info!(%root, "shutdown requested, finishing coordinator tree");
                    if self.nodes.contains_key(&root) {
                        if let Err(err) = self.finish_node(root, FinishReason::Cancelled, None).await {
                            self.report(err);
                        }
                    }
                    break;
                }
                envelope = self.inbox_rx.recv() => match envelope {
                    Some(envelope) => self.deliver(envelope).await,
                    None => break,
                },
            }
        }
        self.completion.take()
    }

    /// Lifecycle state of `id`, or `None` for ids that never entered the tree.
    pub fn state(&self, id: CoordinatorId) -> Option<LifecycleState> {
        match self.nodes.get(&id) {
            Some(node) => Some(node.state),
            None if self.retired.contains(&id) => Some(LifecycleState::Finished),
            None => None,
        }
    }

    pub fn children(&self, id: CoordinatorId) -> Vec<CoordinatorId> {
        self.nodes
            .get(&id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: CoordinatorId) -> Option<CoordinatorId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn name(&self, id: CoordinatorId) -> Option<&'static str> {
        self.nodes.get(&id).map(|node| node.name)
    }

    pub fn root(&self) -> Option<CoordinatorId> {
        self.root
    }

    /// The root and every coordinator reachable through children lists, sorted.
    pub fn reachable(&self) -> Vec<CoordinatorId> {
        let mut reached = Vec::new();
        let mut pending: Vec<CoordinatorId> = self
            .root
            .filter(|root| self.nodes.contains_key(root))
            .into_iter()
            .collect();
        while let Some(id) = pending.pop() {
            reached.push(id);
            if let Some(node) = self.nodes.get(&id) {
                pending.extend(node.children.iter().copied());
            }
        }
        reached.sort();
        reached
    }

    /// Every active coordinator, sorted.
    pub fn active(&self) -> Vec<CoordinatorId> {
        let mut active: Vec<CoordinatorId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.state.is_active())
            .map(|(id, _)| *id)
            .collect();
        active.sort();
        active
    }

    /// True once the launched root has finished.
    pub fn is_complete(&self) -> bool {
        self.root
            .is_some_and(|root| !self.nodes.contains_key(&root))
    }

    /// The coordinator owning the visible screen.
    pub async fn current(&self) -> Option<CoordinatorId> {
        self.host.current_owner().await
    }

    fn start_node(&mut self, id: CoordinatorId) -> BoxFuture<'_, FlowResult> {
        async move {
            let root = self.root;
            let Some(node) = self.nodes.get_mut(&id) else {
                return Err(self.missing(id, "start"));
            };
            match node.state {
                LifecycleState::NotStarted => {}
                LifecycleState::Active => {
                    return Err(FlowError::AlreadyStarted {
                        id,
                        state: node.state,
                    })
                }
                LifecycleState::Finished => {
                    return Err(FlowError::InvalidState {
                        id,
                        state: node.state,
                        operation: "start",
                    })
                }
            }
            if node.parent.is_none() && root != Some(id) {
                return Err(FlowError::Detached { id });
            }

            node.state = LifecycleState::Active;
            let (name, parent) = (node.name, node.parent);
            tracing::info!(coordinator = %id, name, "coordinator started");
            self.emit(LifecycleEvent::Started { id, name, parent });

            let result = self.run_hook(id, Hook::Start).await;
            if let Err(err) = &result {
                tracing::warn!(coordinator = %id, name, error = %err, "start failed, tearing flow down");
                if self.nodes.get(&id).is_some_and(Node::is_running) {
                    if let Err(teardown) =
                        self.finish_node(id, FinishReason::Cancelled, None).await
                    {
                        self.report(teardown);
                    }
                }
            }
            result
        }
        .boxed()
    }

    fn finish_node(
        &mut self,
        id: CoordinatorId,
        reason: FinishReason,
        result: Option<E>,
    ) -> BoxFuture<'_, FlowResult> {
        async move {
            let Some(node) = self.nodes.get_mut(&id) else {
                return Err(self.missing(id, "finish"));
            };
            let state = node.state;
            match state {
                LifecycleState::Active => {}
                LifecycleState::NotStarted => {
                    self.discard(id);
                    return Ok(());
                }
                LifecycleState::Finished => {
                    return Err(FlowError::InvalidState {
                        id,
                        state,
                        operation: "finish",
                    })
                }
            }
            if node.finishing {
                return Ok(());
            }
            node.finishing = true;
            let name = node.name;
            // Most recently attached first: its screens sit on top.
            let children: Vec<CoordinatorId> = node.children.iter().rev().copied().collect();
            tracing::debug!(coordinator = %id, name, %reason, children = children.len(), "finishing coordinator");

            for child in children {
                if !self.nodes.contains_key(&child) {
                    continue;
                }
                if let Err(err) = self.finish_node(child, FinishReason::Cancelled, None).await {
                    self.report(err);
                }
            }

            if let Err(err) = self.run_hook(id, Hook::Stop).await {
                self.report(err);
            }
            self.sweep_screens(id).await;

            let Some(mut node) = self.nodes.remove(&id) else {
                return Ok(());
            };
            self.retired.insert(id);
            node.token.cancel();
            release(std::mem::take(&mut node.bindings)).await;
            if let Some(parent) = node.parent {
                if let Some(parent_node) = self.nodes.get_mut(&parent) {
                    parent_node.children.retain(|c| *c != id);
                }
            }

            tracing::info!(coordinator = %id, name, %reason, "coordinator finished");
            self.emit(LifecycleEvent::Finished {
                id,
                name,
                parent: node.parent,
                reason,
            });

            let completion = Completion {
                id,
                name,
                reason,
                result,
            };
            match node.parent {
                Some(parent) => self.notify_parent(parent, completion).await,
                None => self.completion = Some(completion),
            }
            Ok(())
        }
        .boxed()
    }

    fn run_hook(&mut self, id: CoordinatorId, hook: Hook<E>) -> BoxFuture<'_, FlowResult> {
        async move {
            let label = hook.label();
            let Some(node) = self.nodes.get_mut(&id) else {
                return Err(self.missing(id, label));
            };
            let Some(mut coordinator) = node.coordinator.take() else {
                return Err(FlowError::InvalidState {
                    id,
                    state: node.state,
                    operation: label,
                });
            };
            let parts = ContextParts {
                id,
                name: node.name,
                parent: node.parent,
                pending_children: node.children.len(),
                finishing: node.finishing,
                token: node.token.clone(),
                bindings: std::mem::take(&mut node.bindings),
            };
            let mut ctx = FlowContext::new(
                parts,
                Arc::clone(&self.host),
                Navigator::new(id, self.inbox_tx.clone()),
                self.ids.clone(),
            );

            let result = match hook {
                Hook::Start => coordinator.start(&mut ctx).await,
                Hook::Event(event) => coordinator.handle_event(&mut ctx, event).await,
                Hook::ChildFinished(completion) => {
                    coordinator.child_did_finish(&mut ctx, completion).await
                }
                Hook::Stop => coordinator.stop(&mut ctx).await,
            };

            let (bindings, commands) = ctx.into_parts();
            if let Some(node) = self.nodes.get_mut(&id) {
                node.coordinator = Some(coordinator);
                node.bindings = bindings;
            }
            self.apply_commands(id, commands).await;
            result
        }
        .boxed()
    }

    fn apply_commands(
        &mut self,
        id: CoordinatorId,
        commands: Vec<FlowCommand<E>>,
    ) -> BoxFuture<'_, ()> {
        async move {
            let mut commands = commands.into_iter();
            while let Some(command) = commands.next() {
                if !self.nodes.contains_key(&id) {
                    tracing::debug!(coordinator = %id, dropped = commands.len() + 1, "coordinator finished, dropping queued commands");
                    break;
                }
                let outcome = match command {
                    FlowCommand::StartChild {
                        id: child,
                        coordinator,
                    } => self.start_queued_child(id, child, coordinator).await,
                    FlowCommand::FinishChild(child) => self.finish_queued_child(id, child).await,
                    FlowCommand::Finish(result) => {
                        self.finish_node(id, FinishReason::Completed, result).await
                    }
                };
                if let Err(err) = outcome {
                    self.report(err);
                }
            }
        }
        .boxed()
    }

    async fn start_queued_child(
        &mut self,
        parent: CoordinatorId,
        child: CoordinatorId,
        coordinator: Box<dyn Coordinator<E>>,
    ) -> FlowResult {
        self.nodes.insert(child, Node::new(coordinator));
        if let Err(err) = self.add_child(parent, child) {
            self.nodes.remove(&child);
            return Err(err);
        }
        self.start_node(child).await
    }

    async fn finish_queued_child(&mut self, parent: CoordinatorId, child: CoordinatorId) -> FlowResult {
        // Copied out so no borrow of the arena is held across the await.
        let owner = self.nodes.get(&child).map(|node| node.parent);
        match owner {
            Some(owner) if owner == Some(parent) => {
                self.finish_node(child, FinishReason::Cancelled, None).await
            }
            Some(_) => Err(FlowError::NotAChild { id: child, parent }),
            None => Err(self.missing(child, "finish")),
        }
    }

    async fn notify_parent(&mut self, parent: CoordinatorId, completion: Completion<E>) {
        if !self.nodes.get(&parent).is_some_and(Node::is_running) {
            tracing::debug!(%parent, child = %completion.id, "parent is tearing down, completion not delivered");
            return;
        }
        if let Err(err) = self.run_hook(parent, Hook::ChildFinished(completion)).await {
            self.report(err);
        }
    }

    async fn deliver(&mut self, envelope: Envelope<E>) {
        let Envelope { target, event } = envelope;
        if !self.nodes.get(&target).is_some_and(Node::is_running) {
            tracing::debug!(coordinator = %target, "dropping event for inactive coordinator");
            return;
        }
        if let Err(err) = self.run_hook(target, Hook::Event(event)).await {
            self.report(err);
        }
    }

    /// Take off the host whatever `id` still owns once its stop hook ran.
    /// A removed coordinator never owns a screen on the stack.
    async fn sweep_screens(&mut self, id: CoordinatorId) {
        let host = self.host.clone();
        match host.dismiss_all(id).await {
            Ok(0) => {}
            Ok(swept) => {
                tracing::debug!(coordinator = %id, swept, "dismissed screens left after stop");
            }
            Err(err) => {
                self.report(err.into());
                host.discard_owned(id).await;
            }
        }
    }

    /// Drop a coordinator that never started.
    fn discard(&mut self, id: CoordinatorId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        self.retired.insert(id);
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != id);
        }
        tracing::debug!(coordinator = %id, name = node.name, "discarded coordinator that never started");
    }

    fn emit(&mut self, event: LifecycleEvent) {
        self.observers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn missing(&self, id: CoordinatorId, operation: &'static str) -> FlowError {
        if self.retired.contains(&id) {
            FlowError::InvalidState {
                id,
                state: LifecycleState::Finished,
                operation,
            }
        } else {
            FlowError::UnknownCoordinator { id }
        }
    }

    fn missing_child(&self, id: CoordinatorId) -> FlowError {
        if self.retired.contains(&id) {
            FlowError::InvalidChildState {
                id,
                state: LifecycleState::Finished,
            }
        } else {
            FlowError::UnknownCoordinator { id }
        }
    }

    /// Handle an error raised while applying queued commands, where no caller
    /// is waiting for it.
    fn report(&self, err: FlowError) {
        if !err.is_contract_violation() {
            tracing::warn!(error = %err, "navigation failed while applying flow commands");
            return;
        }
        match self.policy {
            ViolationPolicy::Panic => panic!("coordinator contract violated: {err}"),
            ViolationPolicy::Report => {
                tracing::error!(error = %err, error_type = err.error_type(), "coordinator contract violated")
            }
        }
    }
}

impl<E: Send + 'static> Drop for CoordinatorTree<E> {
    fn drop(&mut self) {
        self.root_token.cancel();
    }
}
