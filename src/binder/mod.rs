//! Wires a view's input events to a view model and renders its output.
//!
//! A [`Binding`] is the subscription. It is released on every exit path:
//! explicit [`Binding::release`], cancellation of its token (the owning
//! coordinator finishing), the output stream ending, or the `Binding` being
//! dropped. The view's [`View::tear_down`] runs exactly once in each case.

mod recording;

pub use recording::{RecordingView, ViewHandle};

use std::fmt;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::coordinator::Navigator;
use crate::error::{CollaboratorFailure, FlowResult};
use crate::viewmodel::{InputStream, ViewModel};

/// A rendered screen, seen from the core.
pub trait View: Send + 'static {
    type Event: Send + 'static;
    type State: Send + 'static;

    /// Hand out the input event stream. Only the first call yields events.
    fn input_events(&mut self) -> InputStream<Self::Event>;

    fn render(&mut self, state: Self::State);

    fn render_failure(&mut self, failure: &CollaboratorFailure);

    /// Called once when the binding lets go of the view.
    fn tear_down(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindingId(Uuid);

impl BindingId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a binding ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingExit {
    /// The output stream ended normally.
    Completed,
    /// The output stream ended with a collaborator failure.
    Failed(CollaboratorFailure),
    /// The subscription was cancelled.
    Cancelled,
}

/// A live view/view-model subscription.
pub struct Binding {
    id: BindingId,
    view_model: &'static str,
    token: CancellationToken,
    task: Option<JoinHandle<BindingExit>>,
}

impl Binding {
    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn view_model(&self) -> &'static str {
        self.view_model
    }

    /// Stop applying outputs. Returns immediately; use [`release`](Self::release)
    /// to wait for the view to be torn down.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Cancel and wait until the view has been torn down.
    pub async fn release(mut self) -> BindingExit {
        self.token.cancel();
        self.join_task().await
    }

    /// Wait for the output stream to end on its own.
    pub async fn join(mut self) -> BindingExit {
        self.join_task().await
    }

    async fn join_task(&mut self) -> BindingExit {
        let Some(task) = self.task.take() else {
            return BindingExit::Cancelled;
        };
        match task.await {
            Ok(exit) => exit,
            Err(err) => {
                tracing::error!(binding = %self.id, view_model = self.view_model, error = %err, "binding task failed");
                BindingExit::Cancelled
            }
        }
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("view_model", &self.view_model)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

pub struct Binder;

impl Binder {
    /// Subscribe `view` to `view_model`.
    ///
    /// The binder only borrows the view model for the `transform` call, so it
    /// never keeps it alive past the view. Must run inside a tokio runtime.
    pub fn bind<V, VM>(view: V, view_model: &mut VM, token: CancellationToken) -> FlowResult<Binding>
    where
        V: View,
        VM: ViewModel<Input = V::Event, Output = V::State>,
    {
        Self::bind_with(view, view_model, token, |_: &V::State| {})
    }

    /// Like [`bind`](Self::bind), additionally forwarding navigation-relevant
    /// outputs to the owning coordinator. `route` sees every state before it
    /// is rendered.
    pub fn bind_routed<V, VM, E, R>(
        view: V,
        view_model: &mut VM,
        token: CancellationToken,
        navigator: Navigator<E>,
        route: R,
    ) -> FlowResult<Binding>
    where
        V: View,
        VM: ViewModel<Input = V::Event, Output = V::State>,
        E: Send + 'static,
        R: Fn(&V::State) -> Option<E> + Send + 'static,
    {
        Self::bind_with(view, view_model, token, move |state: &V::State| {
            if let Some(event) = route(state) {
                if !navigator.send(event) {
                    tracing::debug!(target_coordinator = %navigator.target(), "navigation event dropped, tree is gone");
                }
            }
        })
    }

    fn bind_with<V, VM, F>(
        mut view: V,
        view_model: &mut VM,
        token: CancellationToken,
        mut observe: F,
    ) -> FlowResult<Binding>
    where
        V: View,
        VM: ViewModel<Input = V::Event, Output = V::State>,
        F: FnMut(&V::State) + Send + 'static,
    {
        let view_model_name = std::any::type_name::<VM>();
        let mut output = view_model.transform(view.input_events())?;
        let id = BindingId::new();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            let mut view = scopeguard::guard(view, |mut view| view.tear_down());
            let exit = loop {
                let event = tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break BindingExit::Cancelled,
                    event = output.next() => event,
                };
                match event {
                    Some(Ok(state)) => {
                        if task_token.is_cancelled() {
                            break BindingExit::Cancelled;
                        }
                        observe(&state);
                        view.render(state);
                    }
                    Some(Err(failure)) => {
                        view.render_failure(&failure);
                        break BindingExit::Failed(failure);
                    }
                    None => break BindingExit::Completed,
                }
            };
            // Cancel upstream work before the view goes away.
            drop(output);
            tracing::debug!(binding = %id, view_model = view_model_name, exit = ?exit, "binding released");
            exit
        });

        tracing::debug!(binding = %id, view_model = view_model_name, "binding established");
        Ok(Binding {
            id,
            view_model: view_model_name,
            token,
            task: Some(task),
        })
    }
}
