//! Integration tests for the view model contract and the binder.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use waypoint::binder::{Binder, BindingExit, RecordingView};
use waypoint::error::{CollaboratorFailure, FlowError};
use waypoint::viewmodel::{
    input_channel, try_ordered, BindGuard, Collaborator, InputStream, OutputStream,
    SharedCollaborator, SharedOutput, ViewModel,
};

/// Answers after the requested number of milliseconds. Zero fails.
struct Delayed;

#[async_trait]
impl Collaborator for Delayed {
    type Request = u64;
    type Response = String;

    fn name(&self) -> &'static str {
        "delayed"
    }

    async fn call(&self, ms: u64) -> Result<String, CollaboratorFailure> {
        if ms == 0 {
            return Err(CollaboratorFailure::new("delayed", "zero delay"));
        }
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(format!("after-{ms}"))
    }
}

/// Holds every call open until the test answers it.
#[derive(Default)]
struct Gate {
    pending: Mutex<Vec<oneshot::Sender<String>>>,
}

#[async_trait]
impl Collaborator for Gate {
    type Request = u64;
    type Response = String;

    fn name(&self) -> &'static str {
        "gate"
    }

    async fn call(&self, _request: u64) -> Result<String, CollaboratorFailure> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().push(tx);
        rx.await
            .map_err(|_| CollaboratorFailure::new("gate", "closed"))
    }
}

/// Looks each input up through one collaborator, one call at a time.
struct Lookup {
    guard: BindGuard,
    service: SharedCollaborator<u64, String>,
}

impl Lookup {
    fn new(service: SharedCollaborator<u64, String>) -> Self {
        Self {
            guard: BindGuard::new(),
            service,
        }
    }
}

impl ViewModel for Lookup {
    type Input = u64;
    type Output = String;

    fn bind_guard(&self) -> &BindGuard {
        &self.guard
    }

    fn transform_input(&mut self, input: InputStream<u64>) -> OutputStream<String> {
        let service = Arc::clone(&self.service);
        try_ordered(input, move |ms| {
            let service = Arc::clone(&service);
            async move { service.call(ms).await }
        })
    }
}

/// Replays one shared upstream to every binding.
struct Broadcast {
    guard: BindGuard,
    output: SharedOutput<String>,
}

impl ViewModel for Broadcast {
    type Input = ();
    type Output = String;

    fn bind_guard(&self) -> &BindGuard {
        &self.guard
    }

    fn transform_input(&mut self, _input: InputStream<()>) -> OutputStream<String> {
        self.output.subscribe()
    }
}

async fn run_lookup(inputs: Vec<u64>) -> Vec<Result<String, CollaboratorFailure>> {
    let mut view_model = Lookup::new(Arc::new(Delayed));
    let input = InputStream::from_stream(futures::stream::iter(inputs));
    view_model.transform(input).unwrap().collect().await
}

/// Test that outputs follow input order even when earlier calls are slower.
#[tokio::test(start_paused = true)]
async fn test_outputs_keep_input_order_under_latency() {
    let outputs = run_lookup(vec![50, 5, 20]).await;
    assert_eq!(
        outputs,
        vec![
            Ok("after-50".to_string()),
            Ok("after-5".to_string()),
            Ok("after-20".to_string()),
        ]
    );
}

/// Test that the same inputs and responses give the same outputs.
#[tokio::test(start_paused = true)]
async fn test_transform_is_deterministic() {
    let inputs = vec![7, 3, 0, 9];
    let first = run_lookup(inputs.clone()).await;
    let second = run_lookup(inputs).await;
    assert_eq!(first, second);
    // The failure is terminal: nothing after the zero.
    assert_eq!(first.len(), 3);
    assert!(first[2].is_err());
}

/// Test that binding twice is rejected and leaves the first stream working.
#[tokio::test(start_paused = true)]
async fn test_second_transform_is_rejected() {
    let mut view_model = Lookup::new(Arc::new(Delayed));
    let (tx, input) = input_channel();
    let mut first = view_model.transform(input).unwrap();

    let err = view_model
        .transform(InputStream::empty())
        .err()
        .expect("second bind must fail");
    assert!(matches!(err, FlowError::AlreadyBound { .. }));
    assert!(view_model.is_bound());

    tx.send(10);
    assert_eq!(first.next().await, Some(Ok("after-10".to_string())));
}

/// Test that releasing a binding before the collaborator answers drops the
/// in-flight call and renders nothing.
#[tokio::test]
async fn test_release_cancels_in_flight_call() {
    let gate = Arc::new(Gate::default());
    let mut view_model = Lookup::new(gate.clone());
    let (handle, view) = RecordingView::<u64, String>::new("lookup");
    let binding = Binder::bind(view, &mut view_model, CancellationToken::new()).unwrap();

    assert!(handle.send(1));
    tokio::time::timeout(Duration::from_secs(1), async {
        while gate.pending.lock().is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("call started");

    assert_eq!(binding.release().await, BindingExit::Cancelled);
    assert!(handle.is_torn_down());
    assert!(handle.rendered().is_empty());
    assert!(handle.failures().is_empty());

    let responder = gate.pending.lock().pop().unwrap();
    assert!(responder.is_closed(), "call future should have been dropped");
}

/// Test that a collaborator failure reaches the view and ends the binding.
#[tokio::test(start_paused = true)]
async fn test_failure_is_rendered_and_ends_binding() {
    let mut view_model = Lookup::new(Arc::new(Delayed));
    let (handle, view) = RecordingView::<u64, String>::new("lookup");
    let binding = Binder::bind(view, &mut view_model, CancellationToken::new()).unwrap();

    handle.send(5);
    handle.send(0);
    handle.send(5);

    let exit = binding.join().await;
    assert_eq!(
        exit,
        BindingExit::Failed(CollaboratorFailure::new("delayed", "zero delay"))
    );
    assert_eq!(handle.rendered(), vec!["after-5".to_string()]);
    assert_eq!(handle.failures().len(), 1);
    assert!(handle.is_torn_down());
}

/// Test that cancelling one binding of a shared output leaves another
/// subscriber receiving events.
#[tokio::test]
async fn test_shared_output_survives_one_binding() {
    let (tx, upstream) = input_channel::<String>();
    let output = OutputStream::from_values(upstream).share();
    let mut observer = output.subscribe();

    let mut view_model = Broadcast {
        guard: BindGuard::new(),
        output,
    };
    let (handle, view) = RecordingView::<(), String>::new("broadcast");
    let binding = Binder::bind(view, &mut view_model, CancellationToken::new()).unwrap();

    tx.send("one".to_string());
    handle.wait_for_renders(1).await;
    assert_eq!(observer.next().await, Some(Ok("one".to_string())));

    binding.release().await;
    tx.send("two".to_string());
    assert_eq!(observer.next().await, Some(Ok("two".to_string())));
    assert_eq!(handle.rendered(), vec!["one".to_string()]);
}
