//! Remote store client
//!
//! Contracts for the hosted backend the Snapgram client sits on:
//! - `DocumentStore`: collection documents with filter/order/cursor queries
//! - `BlobStore`: file upload, preview URLs and deletion
//! - `AccountService`: accounts and email sessions
//!
//! `HttpRemote` talks to the real service over REST; `InMemoryRemote`
//! evaluates the same contracts locally for tests and offline use.

pub mod config;
pub mod document;
pub mod error;
pub mod http;
pub mod memory;
pub mod query;
pub mod store;

pub use config::RemoteConfig;
pub use document::{Document, DocumentList};
pub use error::{StoreError, StoreResult};
pub use http::HttpRemote;
pub use memory::{Call, InMemoryRemote, Operation};
pub use query::{Query, CREATED_AT, DEFAULT_LIMIT};
pub use store::{
    Account, AccountService, BlobStore, DocumentStore, FileUpload, PreviewOptions, Session,
    StoredFile,
};

/// Generate a backend-compatible unique id (32 hex characters)
pub fn unique_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
