//! Integration tests for the coordinator tree driving a navigation host.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{
    assert_no_leaks, finished_ids, strict_tree, BoundFlow, Fanout, Flow, ScreenFlow, SessionRoot,
};
use parking_lot::Mutex;
use waypoint::coordinator::{
    Coordinator, FinishReason, FlowContext, LifecycleEvent, LifecycleState,
};
use waypoint::error::{FlowError, FlowResult};
use waypoint::host::{ScreenDescriptor, Transition};
use waypoint::shutdown::Shutdown;

/// Test that finishing a parent with N children emits N+1 completions,
/// every child before the parent.
#[tokio::test]
async fn test_parent_finishes_after_all_children() {
    let (_surface, mut tree) = strict_tree();
    let mut events = tree.subscribe();
    let root = tree
        .launch(|| Fanout::new("root", vec!["a", "b", "c"]))
        .await
        .unwrap();
    let children = tree.children(root);
    assert_eq!(children.len(), 3);
    assert!(finished_ids(&mut events).is_empty());

    tree.finish(root).await.unwrap();

    let finished = finished_ids(&mut events);
    assert_eq!(finished.len(), 4);
    assert_eq!(finished.last(), Some(&root));
    // Most recently started child goes first.
    let expected: Vec<_> = children.iter().rev().copied().collect();
    assert_eq!(&finished[..3], expected.as_slice());

    assert!(tree.is_complete());
    assert_eq!(tree.host().depth().await, 0);
    for id in children {
        assert_eq!(tree.state(id), Some(LifecycleState::Finished));
    }
}

/// Test that every step of a mixed start/finish sequence keeps the active
/// set equal to what the root can reach.
#[tokio::test]
async fn test_no_leaks_across_operation_sequence() {
    let (_surface, mut tree) = strict_tree();
    let root = tree.launch(|| ScreenFlow::new("root")).await.unwrap();
    assert_no_leaks(&tree);

    tree.dispatch(root, Flow::Spawn("a")).await.unwrap();
    let a = tree.children(root)[0];
    assert_no_leaks(&tree);

    tree.dispatch(a, Flow::Spawn("b")).await.unwrap();
    let b = tree.children(a)[0];
    assert_no_leaks(&tree);

    tree.dispatch(b, Flow::Done).await.unwrap();
    assert_eq!(tree.state(b), Some(LifecycleState::Finished));
    assert!(tree.children(a).is_empty());
    assert_no_leaks(&tree);

    tree.dispatch(a, Flow::Spawn("c")).await.unwrap();
    let c = tree.children(a)[0];
    assert_no_leaks(&tree);

    tree.finish(a).await.unwrap();
    assert_eq!(tree.state(a), Some(LifecycleState::Finished));
    assert_eq!(tree.state(c), Some(LifecycleState::Finished));
    assert!(tree.children(a).is_empty());
    assert_no_leaks(&tree);

    tree.dispatch(root, Flow::Spawn("d")).await.unwrap();
    let d = tree.children(root)[0];
    tree.dispatch(d, Flow::Success { token: "x".into() }).await.unwrap();
    assert_no_leaks(&tree);

    assert_eq!(tree.active(), vec![root]);
    assert_eq!(tree.reachable(), vec![root]);
    assert_eq!(tree.host().depth().await, 1);
}

/// Test the login to dashboard hand-off: the login child finishes with a
/// token and the root replaces it with a dashboard child.
#[tokio::test]
async fn test_login_hands_off_to_dashboard() {
    let (surface, mut tree) = strict_tree();
    let tokens = Arc::new(Mutex::new(Vec::new()));
    let root = tree
        .launch(|| SessionRoot {
            tokens: Arc::clone(&tokens),
        })
        .await
        .unwrap();

    let login = tree.children(root)[0];
    assert_eq!(tree.name(login), Some("login"));
    assert_eq!(tree.current().await, Some(login));

    let navigator = tree.navigator(login).unwrap();
    assert!(navigator.send(Flow::Success {
        token: "t-1".into()
    }));
    assert_eq!(tree.drain().await, 1);

    let children = tree.children(root);
    assert_eq!(children.len(), 1);
    let dashboard = children[0];
    assert_eq!(tree.name(dashboard), Some("dashboard"));
    assert_eq!(tree.state(login), Some(LifecycleState::Finished));
    assert_eq!(tree.current().await, Some(dashboard));
    assert_eq!(*tokens.lock(), vec!["t-1".to_string()]);

    assert_eq!(
        surface.transitions(),
        vec![
            Transition::Present("login".into()),
            Transition::Dismiss,
            Transition::Present("dashboard".into()),
        ]
    );
}

/// Test that the root's result is returned by `run` once it finishes.
#[tokio::test]
async fn test_root_completion_carries_result() {
    let (_surface, mut tree) = strict_tree();
    let root = tree.launch(|| ScreenFlow::new("root")).await.unwrap();
    let navigator = tree.navigator(root).unwrap();
    navigator.send(Flow::Success {
        token: "done".into(),
    });

    let shutdown = Shutdown::new();
    let completion = tree.run(shutdown.handle()).await.expect("root completed");
    assert_eq!(completion.id, root);
    assert_eq!(completion.reason, FinishReason::Completed);
    assert_eq!(
        completion.result,
        Some(Flow::Success {
            token: "done".into()
        })
    );
    assert!(tree.is_complete());
    assert!(!tree.step().await);
}

/// Test that shutdown cancels the whole tree and empties the stack.
#[tokio::test]
async fn test_shutdown_cancels_tree() {
    let (_surface, mut tree) = strict_tree();
    let mut events = tree.subscribe();
    let root = tree
        .launch(|| Fanout::new("root", vec!["a", "b"]))
        .await
        .unwrap();
    assert_eq!(tree.host().depth().await, 3);

    let shutdown = Shutdown::new();
    shutdown.signal();
    let completion = tree.run(shutdown.handle()).await.expect("root cancelled");

    assert_eq!(completion.id, root);
    assert_eq!(completion.reason, FinishReason::Cancelled);
    assert_eq!(tree.host().depth().await, 0);
    assert!(tree.active().is_empty());

    let mut cancelled = 0;
    while let Ok(event) = events.try_recv() {
        if let LifecycleEvent::Finished { reason, .. } = event {
            assert_eq!(reason, FinishReason::Cancelled);
            cancelled += 1;
        }
    }
    assert_eq!(cancelled, 3);
}

/// Test that finished coordinators reject events and navigators.
#[tokio::test]
async fn test_finished_coordinator_rejects_events() {
    let (_surface, mut tree) = strict_tree();
    let root = tree.launch(|| ScreenFlow::new("root")).await.unwrap();
    tree.dispatch(root, Flow::Spawn("child")).await.unwrap();
    let child = tree.children(root)[0];
    tree.dispatch(child, Flow::Done).await.unwrap();

    let err = tree.dispatch(child, Flow::Done).await.unwrap_err();
    assert_eq!(
        err,
        FlowError::InvalidState {
            id: child,
            state: LifecycleState::Finished,
            operation: "handle_event",
        }
    );
    assert!(tree.navigator(child).is_err());
    assert!(matches!(
        tree.start(child).await,
        Err(FlowError::InvalidState { .. })
    ));
}

/// Test that a navigator event posted before its target finished is dropped.
#[tokio::test]
async fn test_stale_navigator_event_is_dropped() {
    let (_surface, mut tree) = strict_tree();
    let root = tree.launch(|| ScreenFlow::new("root")).await.unwrap();
    tree.dispatch(root, Flow::Spawn("child")).await.unwrap();
    let child = tree.children(root)[0];

    let navigator = tree.navigator(child).unwrap();
    tree.finish(child).await.unwrap();
    assert!(navigator.send(Flow::Spawn("ghost")));

    assert_eq!(tree.drain().await, 1);
    assert!(tree.children(root).is_empty());
    assert_eq!(tree.active(), vec![root]);
}

/// Test that coordinators built outside the tree follow the attach rules.
#[tokio::test]
async fn test_manual_attach_rules() {
    let (_surface, mut tree) = strict_tree();
    let root = tree.launch(|| ScreenFlow::new("root")).await.unwrap();

    let orphan = tree.create(ScreenFlow::new("orphan"));
    assert_eq!(tree.state(orphan), Some(LifecycleState::NotStarted));
    assert_eq!(
        tree.start(orphan).await,
        Err(FlowError::Detached { id: orphan })
    );

    tree.add_child(root, orphan).unwrap();
    assert!(matches!(
        tree.add_child(root, orphan),
        Err(FlowError::AlreadyAttached { .. })
    ));
    tree.start(orphan).await.unwrap();
    assert!(matches!(
        tree.start(orphan).await,
        Err(FlowError::AlreadyStarted { .. })
    ));
    assert_eq!(tree.parent(orphan), Some(root));
    assert_no_leaks(&tree);
}

/// Test that popping a bound screen releases its binding and tears the
/// view down, while the coordinator stays active.
#[tokio::test]
async fn test_dismiss_releases_binding() {
    let (_surface, mut tree) = strict_tree();
    let handles = Arc::new(Mutex::new(Vec::new()));
    let root = tree
        .launch(|| BoundFlow {
            handles: Arc::clone(&handles),
        })
        .await
        .unwrap();
    let handle = handles.lock()[0].clone();

    assert!(handle.send("hello".into()));
    handle.wait_for_renders(1).await;
    assert_eq!(handle.rendered(), vec!["HELLO".to_string()]);

    tree.dispatch(root, Flow::Back).await.unwrap();
    assert!(handle.is_torn_down());
    assert_eq!(tree.host().depth().await, 0);
    assert_eq!(tree.state(root), Some(LifecycleState::Active));
}

/// Test that finishing a bound coordinator tears its view down.
#[tokio::test]
async fn test_finish_releases_binding() {
    let (_surface, mut tree) = strict_tree();
    let handles = Arc::new(Mutex::new(Vec::new()));
    let root = tree
        .launch(|| BoundFlow {
            handles: Arc::clone(&handles),
        })
        .await
        .unwrap();
    let handle = handles.lock()[0].clone();

    tree.dispatch(root, Flow::Done).await.unwrap();
    assert!(tree.is_complete());
    assert!(handle.is_torn_down());
    assert!(!handle.send("late".into()));
}

/// Test that replacing a bound screen tears the old view down and keeps the
/// stack depth.
#[tokio::test]
async fn test_replace_releases_binding() {
    let (surface, mut tree) = strict_tree();
    let handles = Arc::new(Mutex::new(Vec::new()));
    let root = tree
        .launch(|| BoundFlow {
            handles: Arc::clone(&handles),
        })
        .await
        .unwrap();
    let handle = handles.lock()[0].clone();
    assert!(!handle.is_torn_down());

    tree.dispatch(root, Flow::Replace("summary")).await.unwrap();

    assert!(handle.is_torn_down());
    assert!(!handle.send("late".into()));
    assert_eq!(tree.host().depth().await, 1);
    let top = tree.host().top().await.unwrap();
    assert_eq!(top.descriptor.route, "summary");
    assert_eq!(top.owner, root);
    assert_eq!(
        surface.transitions().last(),
        Some(&Transition::ReplaceTop("summary".into()))
    );
}

/// Test that an older sibling finishing under a younger sibling's screen
/// takes its own screen with it.
#[tokio::test]
async fn test_finished_sibling_leaves_no_screens() {
    let (surface, mut tree) = strict_tree();
    let root = tree.launch(|| ScreenFlow::new("root")).await.unwrap();
    tree.dispatch(root, Flow::Spawn("a")).await.unwrap();
    tree.dispatch(root, Flow::Spawn("b")).await.unwrap();
    let (a, b) = (tree.children(root)[0], tree.children(root)[1]);
    assert_eq!(tree.current().await, Some(b));

    tree.finish(a).await.unwrap();
    let owners: Vec<_> = tree
        .host()
        .snapshot()
        .await
        .into_iter()
        .map(|entry| entry.owner)
        .collect();
    assert_eq!(owners, vec![root, b]);
    assert_eq!(tree.current().await, Some(b));
    assert_no_leaks(&tree);

    tree.finish(b).await.unwrap();
    assert_eq!(tree.current().await, Some(root));
    assert_eq!(tree.state(root), Some(LifecycleState::Active));

    tree.finish(root).await.unwrap();
    assert!(tree.is_complete());
    assert_eq!(tree.host().depth().await, 0);
    assert_eq!(tree.current().await, None);
    assert_eq!(
        surface.transitions(),
        vec![
            Transition::Present("root".into()),
            Transition::Present("a".into()),
            Transition::Present("b".into()),
            Transition::Remove("a".into()),
            Transition::Dismiss,
            Transition::Dismiss,
        ]
    );
}

/// Presents a screen and keeps it when stopped.
struct Sticky;

#[async_trait]
impl Coordinator<Flow> for Sticky {
    fn name(&self) -> &'static str {
        "sticky"
    }

    async fn start(&mut self, ctx: &mut FlowContext<Flow>) -> FlowResult {
        ctx.present(ScreenDescriptor::new("sticky")).await?;
        Ok(())
    }

    async fn stop(&mut self, _ctx: &mut FlowContext<Flow>) -> FlowResult {
        Ok(())
    }
}

/// Test that screens a stop hook leaves behind are dismissed anyway.
#[tokio::test]
async fn test_screens_left_by_stop_are_dismissed() {
    let (surface, mut tree) = strict_tree();
    let root = tree.launch(|| Sticky).await.unwrap();
    assert_eq!(tree.current().await, Some(root));

    tree.finish(root).await.unwrap();

    assert!(tree.is_complete());
    assert_eq!(tree.host().depth().await, 0);
    assert_eq!(surface.transitions().last(), Some(&Transition::Dismiss));
}

/// Test that a surface failure while stopping does not strand the
/// coordinator's screen.
#[tokio::test]
async fn test_failed_stop_dismissal_is_retried() {
    let (surface, mut tree) = strict_tree();
    let root = tree.launch(|| ScreenFlow::new("root")).await.unwrap();
    surface.fail_next("surface detached");

    tree.finish(root).await.unwrap();

    assert!(tree.is_complete());
    assert_eq!(tree.host().depth().await, 0);
    assert_eq!(
        surface.transitions(),
        vec![Transition::Present("root".into()), Transition::Dismiss]
    );
}
