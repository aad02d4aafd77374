//! src/services/gateway.rs
//!
//! ResourceGateway: sequences the remote collaborators for each request.
//! Every operation acquires its own credential and re-checks the bucket, so
//! the gateway itself holds no mutable state and needs no locking.

use crate::{
    models::{
        bucket::{BucketPolicy, BucketRegion, CreateBucket},
        credential::{Credential, INTERNAL_SCOPES, PUBLIC_SCOPES},
        object::{DeleteAck, ModelSummary, StoredObject},
        translation::{JobAcceptance, Manifest, OutputFormat, TranslationJob},
    },
    services::{
        remote::{BucketStore, RemoteError, TokenIssuer, TranslationService},
        urn::{deurnify, urnify},
    },
};
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Page size used when walking the bucket listing.
pub const DEFAULT_PAGE_SIZE: usize = 64;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error(transparent)]
    Transport(RemoteError),
}

impl From<RemoteError> for GatewayError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound(what) => GatewayError::NotFound(what),
            other => GatewayError::Transport(other),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Static settings for the gateway.
#[derive(Clone, Debug)]
pub struct GatewaySettings {
    pub bucket_key: String,
    pub bucket_region: BucketRegion,
    pub bucket_policy: BucketPolicy,
    pub page_size: usize,
    pub output_format: OutputFormat,
}

impl GatewaySettings {
    pub fn new(bucket_key: impl Into<String>) -> Self {
        Self {
            bucket_key: bucket_key.into(),
            bucket_region: BucketRegion::Us,
            bucket_policy: BucketPolicy::Persistent,
            page_size: DEFAULT_PAGE_SIZE,
            output_format: OutputFormat::Svf,
        }
    }
}

/// Facade over the identity, storage and translation services.
///
/// Cheap to clone; shared as axum state.
#[derive(Clone)]
pub struct ResourceGateway {
    tokens: Arc<dyn TokenIssuer>,
    store: Arc<dyn BucketStore>,
    translator: Arc<dyn TranslationService>,
    settings: Arc<GatewaySettings>,
    shutdown: CancellationToken,
}

impl ResourceGateway {
    pub fn new(
        tokens: Arc<dyn TokenIssuer>,
        store: Arc<dyn BucketStore>,
        translator: Arc<dyn TranslationService>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            tokens,
            store,
            translator,
            settings: Arc::new(settings),
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancel uploads in flight when `shutdown` fires.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// A fresh cancellation signal for one upload, tied to server shutdown.
    pub fn upload_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    async fn internal_token(&self) -> GatewayResult<Credential> {
        Ok(self.tokens.two_legged_token(INTERNAL_SCOPES).await?)
    }

    /// Read-only credential suitable for handing to browser viewers.
    pub async fn public_token(&self) -> GatewayResult<Credential> {
        Ok(self.tokens.two_legged_token(PUBLIC_SCOPES).await?)
    }

    /// Make sure `bucket_key` exists, creating it if the store reports it
    /// missing. A concurrent creation by another request counts as success.
    pub async fn ensure_bucket(&self, bucket_key: &str) -> GatewayResult<()> {
        let token = self.internal_token().await?;
        let err = match self.store.bucket_details(&token, bucket_key).await {
            Ok(_) => return Ok(()),
            Err(err) => err,
        };
        if !err.is_not_found() {
            return Err(GatewayError::Transport(err));
        }

        info!("bucket {} not found, creating it", bucket_key);
        let request = CreateBucket {
            bucket_key: bucket_key.to_string(),
            policy_key: self.settings.bucket_policy,
            region: self.settings.bucket_region,
        };
        match self.store.create_bucket(&token, &request).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_conflict() => {
                debug!("bucket {} was created concurrently", bucket_key);
                Ok(())
            }
            Err(err) => Err(GatewayError::Transport(err)),
        }
    }

    /// Every object in the bucket, following the pagination cursor to the end.
    pub async fn list_objects(&self) -> GatewayResult<Vec<StoredObject>> {
        let bucket = &self.settings.bucket_key;
        self.ensure_bucket(bucket).await?;
        let token = self.internal_token().await?;

        let mut objects = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .store
                .list_objects(&token, bucket, self.settings.page_size, cursor.as_deref())
                .await?;
            objects.extend(page.items);

            let Some(next) = page.next else { break };
            match start_at(&next) {
                Some(start) if cursor.as_deref() != Some(start.as_str()) => cursor = Some(start),
                _ => {
                    warn!("stopping listing at unusable continuation link {}", next);
                    break;
                }
            }
        }

        debug!("listed {} objects in {}", objects.len(), bucket);
        Ok(objects)
    }

    /// Models as exposed over HTTP.
    pub async fn list_models(&self) -> GatewayResult<Vec<ModelSummary>> {
        Ok(self
            .list_objects()
            .await?
            .into_iter()
            .map(|object| ModelSummary {
                urn: urnify(&object.object_id),
                name: object.object_key,
            })
            .collect())
    }

    /// Upload `payload` as `name`, aborting if `cancel` fires.
    pub async fn upload_resource(
        &self,
        name: &str,
        payload: Bytes,
        cancel: CancellationToken,
    ) -> GatewayResult<StoredObject> {
        if name.trim().is_empty() {
            return Err(GatewayError::Validation("object name is empty".into()));
        }
        let bucket = &self.settings.bucket_key;
        self.ensure_bucket(bucket).await?;
        let token = self.internal_token().await?;

        info!("uploading {} ({} bytes)", name, payload.len());
        let object = self
            .store
            .upload_object(&token, bucket, name, payload, cancel)
            .await?;
        Ok(object)
    }

    /// Delete `name`. A missing object is reported as NotFound.
    pub async fn delete_object(&self, name: &str) -> GatewayResult<DeleteAck> {
        let bucket = &self.settings.bucket_key;
        self.ensure_bucket(bucket).await?;
        let token = self.internal_token().await?;

        self.store.delete_object(&token, bucket, name).await?;
        info!("deleted {} from {}", name, bucket);
        Ok(DeleteAck {
            bucket_key: bucket.clone(),
            object_key: name.to_string(),
            deleted: true,
        })
    }

    /// Submit a translation job. Returns once the job is accepted, not when
    /// it finishes.
    pub async fn translate_object(
        &self,
        urn: &str,
        entry_file_name: &str,
    ) -> GatewayResult<JobAcceptance> {
        let token = self.internal_token().await?;
        let job = TranslationJob::new(urn, entry_file_name, self.settings.output_format);
        debug!(
            "submitting translation for {} (archive: {})",
            urn,
            job.is_archive()
        );
        Ok(self.translator.start_job(&token, &job).await?)
    }

    /// Current manifest for `urn`, or `None` when no job has been submitted.
    pub async fn get_manifest(&self, urn: &str) -> GatewayResult<Option<Manifest>> {
        deurnify(urn).map_err(|err| GatewayError::Validation(err.to_string()))?;
        let token = self.internal_token().await?;
        match self.translator.manifest(&token, urn).await {
            Ok(manifest) => Ok(Some(manifest)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(GatewayError::Transport(err)),
        }
    }

    /// Upload a model and immediately queue its translation.
    pub async fn upload_and_translate(
        &self,
        name: &str,
        payload: Bytes,
        entry_file_name: &str,
        cancel: CancellationToken,
    ) -> GatewayResult<ModelSummary> {
        let object = self.upload_resource(name, payload, cancel).await?;
        let urn = urnify(&object.object_id);
        self.translate_object(&urn, entry_file_name).await?;
        Ok(ModelSummary {
            name: object.object_key,
            urn,
        })
    }
}

/// Extract the `startAt` cursor from a `next` page link.
fn start_at(next: &str) -> Option<String> {
    let url = Url::parse(next).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "startAt")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
