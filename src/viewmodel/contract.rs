//! The view model transform contract.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{FlowError, FlowResult};
use crate::viewmodel::stream::{InputStream, OutputStream};

/// Tracks whether a view model has already been bound.
///
/// Every view model owns one, created empty alongside the rest of its state.
#[derive(Debug, Default)]
pub struct BindGuard {
    bound: AtomicBool,
}

impl BindGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark as bound. Fails if this already happened.
    pub fn claim(&self, view_model: &'static str) -> FlowResult {
        if self.bound.swap(true, Ordering::SeqCst) {
            return Err(FlowError::AlreadyBound { view_model });
        }
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }
}

/// Maps a stream of `Input` events to a stream of `Output` events.
///
/// Implementors provide [`transform_input`](ViewModel::transform_input);
/// callers use [`transform`](ViewModel::transform), which enforces the
/// single-binding rule.
///
/// Given the same input sequence and the same collaborator responses, a
/// transform must produce the same output sequence. Side effects belong to
/// injected collaborators, never to the transform itself. Outputs keep the
/// causal order of the inputs that produced them unless an operator with
/// documented merge semantics (see [`latest`](super::latest)) is used.
pub trait ViewModel: Send + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    fn bind_guard(&self) -> &BindGuard;

    /// Build the output pipeline. Called at most once per instance.
    fn transform_input(&mut self, input: InputStream<Self::Input>) -> OutputStream<Self::Output>;

    fn transform(
        &mut self,
        input: InputStream<Self::Input>,
    ) -> FlowResult<OutputStream<Self::Output>> {
        let view_model = std::any::type_name::<Self>();
        self.bind_guard().claim(view_model)?;
        tracing::debug!(view_model, "view model bound");
        Ok(self.transform_input(input))
    }

    fn is_bound(&self) -> bool {
        self.bind_guard().is_bound()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, StreamExt};

    struct Doubler {
        guard: BindGuard,
    }

    impl ViewModel for Doubler {
        type Input = u32;
        type Output = u32;

        fn bind_guard(&self) -> &BindGuard {
            &self.guard
        }

        fn transform_input(&mut self, input: InputStream<u32>) -> OutputStream<u32> {
            OutputStream::from_values(input.map(|n| n * 2))
        }
    }

    #[tokio::test]
    async fn second_transform_fails_and_first_stream_survives() {
        let mut vm = Doubler {
            guard: BindGuard::new(),
        };
        let first = vm
            .transform(InputStream::from_stream(stream::iter(vec![1, 2])))
            .unwrap();
        assert!(vm.is_bound());

        let second = vm.transform(InputStream::empty());
        assert!(matches!(second, Err(FlowError::AlreadyBound { .. })));

        let outputs: Vec<_> = first.collect().await;
        assert_eq!(outputs, vec![Ok(2), Ok(4)]);
    }
}
