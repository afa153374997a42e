//! Data and service collaborators injected into view models.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CollaboratorFailure;

/// A request/response dependency (network, storage, auth, ...).
///
/// View models only ever see this shape; retries and transport are the
/// collaborator's business.
#[async_trait]
pub trait Collaborator: Send + Sync + 'static {
    type Request: Send + 'static;
    type Response: Send + 'static;

    /// Name reported in [`CollaboratorFailure`].
    fn name(&self) -> &'static str;

    async fn call(&self, request: Self::Request) -> Result<Self::Response, CollaboratorFailure>;
}

/// Shared handle to a collaborator.
pub type SharedCollaborator<Req, Resp> =
    Arc<dyn Collaborator<Request = Req, Response = Resp>>;
