//! Seams for the three remote collaborators: identity, object storage and
//! translation jobs.
//!
//! Failures are classified here, at the client boundary, so the gateway can
//! react to "not found" or "already exists" without knowing anything about
//! the HTTP client underneath.

use crate::models::{
    bucket::{BucketDetails, CreateBucket},
    credential::{Credential, Scope},
    object::{ObjectPage, StoredObject},
    translation::{JobAcceptance, Manifest, TranslationJob},
};
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("remote service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed response from remote service: {0}")]
    Malformed(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict(_))
    }

    /// Map a non-success HTTP status onto the taxonomy.
    pub fn from_status(status: u16, resource: impl Into<String>, message: String) -> Self {
        match status {
            404 => RemoteError::NotFound(resource.into()),
            409 => RemoteError::Conflict(resource.into()),
            _ => RemoteError::Rejected { status, message },
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Issues two-legged (client credential) bearer tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync + 'static {
    async fn two_legged_token(&self, scopes: &[Scope]) -> RemoteResult<Credential>;
}

/// Bucket and object operations on the remote store.
#[async_trait]
pub trait BucketStore: Send + Sync + 'static {
    async fn bucket_details(
        &self,
        token: &Credential,
        bucket_key: &str,
    ) -> RemoteResult<BucketDetails>;

    async fn create_bucket(
        &self,
        token: &Credential,
        request: &CreateBucket,
    ) -> RemoteResult<BucketDetails>;

    /// Fetch one page; `start_at` is the cursor taken from the previous
    /// page's `next` link.
    async fn list_objects(
        &self,
        token: &Credential,
        bucket_key: &str,
        limit: usize,
        start_at: Option<&str>,
    ) -> RemoteResult<ObjectPage>;

    /// Upload `payload` under `object_key`. The object only becomes visible
    /// once the whole payload has been accepted; cancelling leaves nothing
    /// listable behind.
    async fn upload_object(
        &self,
        token: &Credential,
        bucket_key: &str,
        object_key: &str,
        payload: Bytes,
        cancel: CancellationToken,
    ) -> RemoteResult<StoredObject>;

    async fn delete_object(
        &self,
        token: &Credential,
        bucket_key: &str,
        object_key: &str,
    ) -> RemoteResult<()>;
}

/// Submits translation jobs and reads their manifests.
#[async_trait]
pub trait TranslationService: Send + Sync + 'static {
    async fn start_job(
        &self,
        token: &Credential,
        job: &TranslationJob,
    ) -> RemoteResult<JobAcceptance>;

    async fn manifest(&self, token: &Credential, urn: &str) -> RemoteResult<Manifest>;
}
