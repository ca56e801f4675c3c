/// Service layer - auth, posts, saves, users and media handling
///
/// Services talk to the remote collaborators through trait objects so the
/// same code runs against the hosted backend and the in-memory store.
use std::sync::Arc;

use remote_store::{AccountService, BlobStore, DocumentStore};

pub mod auth;
pub mod media;
pub mod posts;
pub mod saves;
pub mod users;

pub use auth::AuthService;
pub use media::MediaService;
pub use posts::PostService;
pub use saves::SaveService;
pub use users::UserService;

/// Handles to the three remote collaborators
#[derive(Clone)]
pub struct Backend {
    pub documents: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub accounts: Arc<dyn AccountService>,
}

impl Backend {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        accounts: Arc<dyn AccountService>,
    ) -> Self {
        Self {
            documents,
            blobs,
            accounts,
        }
    }

    /// Use one remote for all three roles
    pub fn from_remote<R>(remote: Arc<R>) -> Self
    where
        R: DocumentStore + BlobStore + AccountService + 'static,
    {
        Self {
            documents: remote.clone(),
            blobs: remote.clone(),
            accounts: remote,
        }
    }
}
