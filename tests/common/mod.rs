//! Shared test coordinators and helpers.

#![allow(dead_code, unused_imports)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use waypoint::config::ViolationPolicy;
use waypoint::coordinator::{
    Completion, Coordinator, CoordinatorId, CoordinatorTree, FlowContext, LifecycleEvent,
};
use futures::StreamExt;
use waypoint::binder::{RecordingView, ViewHandle};
use waypoint::error::FlowResult;
use waypoint::host::{InMemorySurface, NavigationHost, ScreenDescriptor};
use waypoint::viewmodel::{BindGuard, InputStream, OutputStream, ViewModel};

/// Flow events used by the test coordinators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Success { token: String },
    Spawn(&'static str),
    Replace(&'static str),
    Done,
    Back,
}

pub fn host_with_surface() -> (Arc<InMemorySurface>, Arc<NavigationHost>) {
    let surface = Arc::new(InMemorySurface::new());
    let host = NavigationHost::with_limits(surface.clone(), Duration::from_secs(1), 64);
    (surface, Arc::new(host))
}

/// A tree that panics on any contract violation it cannot return.
pub fn strict_tree() -> (Arc<InMemorySurface>, CoordinatorTree<Flow>) {
    let (surface, host) = host_with_surface();
    (surface, CoordinatorTree::with_policy(host, ViolationPolicy::Panic))
}

/// Presents one screen named after itself.
///
/// `Done` finishes it, `Success` finishes it handing the event to the
/// parent, `Spawn` starts a nested `ScreenFlow`, `Replace` swaps its top
/// screen, `Back` pops it.
pub struct ScreenFlow {
    name: &'static str,
}

impl ScreenFlow {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Coordinator<Flow> for ScreenFlow {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn start(&mut self, ctx: &mut FlowContext<Flow>) -> FlowResult {
        ctx.present(ScreenDescriptor::new(self.name)).await?;
        Ok(())
    }

    async fn handle_event(&mut self, ctx: &mut FlowContext<Flow>, event: Flow) -> FlowResult {
        match event {
            Flow::Done => ctx.finish(None),
            Flow::Success { .. } => ctx.finish(Some(event)),
            Flow::Spawn(name) => {
                ctx.start_child(ScreenFlow::new(name))?;
            }
            Flow::Replace(route) => {
                ctx.replace_top(ScreenDescriptor::new(route)).await?;
            }
            Flow::Back => {
                ctx.dismiss().await?;
            }
        }
        Ok(())
    }
}

/// Starts one `ScreenFlow` per name as soon as it starts.
pub struct Fanout {
    name: &'static str,
    children: Vec<&'static str>,
}

impl Fanout {
    pub fn new(name: &'static str, children: Vec<&'static str>) -> Self {
        Self { name, children }
    }
}

#[async_trait]
impl Coordinator<Flow> for Fanout {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn start(&mut self, ctx: &mut FlowContext<Flow>) -> FlowResult {
        ctx.present(ScreenDescriptor::new(self.name)).await?;
        for child in self.children.iter().copied() {
            ctx.start_child(ScreenFlow::new(child))?;
        }
        Ok(())
    }
}

/// Root of the login scenario: starts `login`, and on a successful login
/// starts `dashboard`.
pub struct SessionRoot {
    pub tokens: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Coordinator<Flow> for SessionRoot {
    fn name(&self) -> &'static str {
        "root"
    }

    async fn start(&mut self, ctx: &mut FlowContext<Flow>) -> FlowResult {
        ctx.start_child(ScreenFlow::new("login"))?;
        Ok(())
    }

    async fn child_did_finish(
        &mut self,
        ctx: &mut FlowContext<Flow>,
        completion: Completion<Flow>,
    ) -> FlowResult {
        if let Some(Flow::Success { token }) = completion.result {
            self.tokens.lock().push(token);
            ctx.start_child(ScreenFlow::new("dashboard"))?;
        }
        Ok(())
    }
}

/// Upper-cases every input.
#[derive(Default)]
pub struct Shout {
    guard: BindGuard,
}

impl ViewModel for Shout {
    type Input = String;
    type Output = String;

    fn bind_guard(&self) -> &BindGuard {
        &self.guard
    }

    fn transform_input(&mut self, input: InputStream<String>) -> OutputStream<String> {
        OutputStream::from_values(input.map(|text| text.to_uppercase()))
    }
}

pub type ShoutHandle = ViewHandle<String, String>;

/// Presents one screen bound to a [`Shout`] view model and publishes the
/// view's handle. `Back` pops the screen, `Replace` swaps it for an unbound
/// one, `Done` finishes.
pub struct BoundFlow {
    pub handles: Arc<Mutex<Vec<ShoutHandle>>>,
}

#[async_trait]
impl Coordinator<Flow> for BoundFlow {
    fn name(&self) -> &'static str {
        "bound"
    }

    async fn start(&mut self, ctx: &mut FlowContext<Flow>) -> FlowResult {
        let screen = ctx.present(ScreenDescriptor::new("bound")).await?;
        let (handle, view) = RecordingView::<String, String>::new("bound");
        ctx.bind(screen, view, &mut Shout::default())?;
        self.handles.lock().push(handle);
        Ok(())
    }

    async fn handle_event(&mut self, ctx: &mut FlowContext<Flow>, event: Flow) -> FlowResult {
        match event {
            Flow::Back => {
                ctx.dismiss().await?;
            }
            Flow::Replace(route) => {
                ctx.replace_top(ScreenDescriptor::new(route)).await?;
            }
            Flow::Done => ctx.finish(None),
            _ => {}
        }
        Ok(())
    }
}

/// Ids of every `Finished` event received so far, in order.
pub fn finished_ids(events: &mut mpsc::UnboundedReceiver<LifecycleEvent>) -> Vec<CoordinatorId> {
    let mut ids = Vec::new();
    while let Ok(event) = events.try_recv() {
        if event.is_finished() {
            ids.push(event.id());
        }
    }
    ids
}

/// The no-leak invariant: the active set is exactly what the root reaches,
/// and every active coordinator's ancestor chain ends at the root.
pub fn assert_no_leaks(tree: &CoordinatorTree<Flow>) {
    let active = tree.active();
    let reachable: Vec<CoordinatorId> = tree
        .reachable()
        .into_iter()
        .filter(|id| tree.state(*id).is_some_and(|s| s.is_active()))
        .collect();
    assert_eq!(active, reachable, "active set differs from reachable set");

    for id in active {
        let mut cursor = id;
        while let Some(parent) = tree.parent(cursor) {
            cursor = parent;
        }
        assert_eq!(Some(cursor), tree.root(), "{id} does not reach the root");
    }
}
