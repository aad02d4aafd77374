//! In-memory stand-in for the remote platform, used by the gateway and
//! router tests. Implements all three collaborator traits against one shared
//! state and records what was asked of it.

use crate::models::{
    bucket::{BucketDetails, CreateBucket},
    credential::{Credential, Scope, TokenResponse},
    object::{ObjectPage, StoredObject},
    translation::{JobAcceptance, Manifest, TranslationJob},
};
use crate::services::remote::{
    BucketStore, RemoteError, RemoteResult, TokenIssuer, TranslationService,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde_json::Map;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct CloudState {
    pub buckets: Vec<CreateBucket>,
    /// Objects per bucket, in listing order.
    pub objects: HashMap<String, Vec<StoredObject>>,
    pub jobs: Vec<TranslationJob>,
    pub manifests: HashMap<String, Manifest>,
    pub token_requests: Vec<Vec<Scope>>,
    pub bucket_creations: usize,
    pub list_calls: usize,
    /// Every remote call fails with this status when set.
    pub fail_with: Option<u16>,
}

/// Shape of the `next` link handed out while more items remain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NextLink {
    /// `startAt` names the first item of the following page.
    #[default]
    Cursor,
    /// `startAt` names the first item of the page just served.
    SelfReferencing,
    /// No `startAt` at all.
    WithoutCursor,
}

#[derive(Clone)]
pub struct InMemoryCloud {
    state: Arc<Mutex<CloudState>>,
    page_size: Option<usize>,
    next_link: NextLink,
}

impl InMemoryCloud {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CloudState::default())),
            page_size: None,
            next_link: NextLink::Cursor,
        }
    }

    /// Cap page sizes below whatever limit the caller asks for.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_next_link(mut self, next_link: NextLink) -> Self {
        self.next_link = next_link;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, CloudState> {
        self.state.lock().unwrap()
    }

    pub fn seed_bucket(&self, bucket_key: &str) {
        self.state().buckets.push(CreateBucket {
            bucket_key: bucket_key.into(),
            policy_key: crate::models::bucket::BucketPolicy::Persistent,
            region: crate::models::bucket::BucketRegion::Us,
        });
    }

    pub fn seed_object(&self, bucket_key: &str, object_key: &str) {
        let object = stored(bucket_key, object_key, 0);
        self.state()
            .objects
            .entry(bucket_key.to_string())
            .or_default()
            .push(object);
    }

    pub fn seed_manifest(&self, urn: &str, status: &str) {
        self.state().manifests.insert(
            urn.to_string(),
            Manifest {
                kind: Some("manifest".into()),
                status: Some(status.into()),
                progress: Some("complete".into()),
                region: Some("US".into()),
                urn: Some(urn.into()),
                has_thumbnail: Some("true".into()),
                derivatives: Vec::new(),
                extra: Map::new(),
            },
        );
    }

    fn check_failure(&self) -> RemoteResult<()> {
        match self.state().fail_with {
            Some(status) => Err(RemoteError::from_status(
                status,
                "injected",
                "injected failure".into(),
            )),
            None => Ok(()),
        }
    }

    fn bucket_exists(&self, bucket_key: &str) -> bool {
        self.state()
            .buckets
            .iter()
            .any(|bucket| bucket.bucket_key == bucket_key)
    }
}

fn stored(bucket_key: &str, object_key: &str, size: u64) -> StoredObject {
    StoredObject {
        bucket_key: bucket_key.to_string(),
        object_key: object_key.to_string(),
        object_id: format!("urn:adsk.objects:os.object:{}/{}", bucket_key, object_key),
        sha1: None,
        size: Some(size),
        content_type: Some("application/octet-stream".into()),
        location: None,
    }
}

fn details(bucket_key: &str) -> BucketDetails {
    BucketDetails {
        bucket_key: bucket_key.to_string(),
        bucket_owner: Some("owner".into()),
        created_date: Some(0),
        policy_key: None,
    }
}

#[async_trait]
impl TokenIssuer for InMemoryCloud {
    async fn two_legged_token(&self, scopes: &[Scope]) -> RemoteResult<Credential> {
        self.check_failure()?;
        let mut state = self.state();
        state.token_requests.push(scopes.to_vec());
        let response = TokenResponse {
            access_token: format!("token-{}", state.token_requests.len()),
            token_type: "Bearer".into(),
            expires_in: 3599,
        };
        Credential::issued(response, scopes, Utc::now())
            .map_err(|err| RemoteError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl BucketStore for InMemoryCloud {
    async fn bucket_details(
        &self,
        _token: &Credential,
        bucket_key: &str,
    ) -> RemoteResult<BucketDetails> {
        self.check_failure()?;
        let exists = self.bucket_exists(bucket_key);
        // Let concurrent callers observe the same answer before either acts.
        tokio::task::yield_now().await;
        if exists {
            Ok(details(bucket_key))
        } else {
            Err(RemoteError::NotFound(format!("bucket `{}`", bucket_key)))
        }
    }

    async fn create_bucket(
        &self,
        _token: &Credential,
        request: &CreateBucket,
    ) -> RemoteResult<BucketDetails> {
        self.check_failure()?;
        if self.bucket_exists(&request.bucket_key) {
            return Err(RemoteError::Conflict(format!(
                "bucket `{}`",
                request.bucket_key
            )));
        }
        let mut state = self.state();
        state.buckets.push(request.clone());
        state.bucket_creations += 1;
        Ok(details(&request.bucket_key))
    }

    async fn list_objects(
        &self,
        _token: &Credential,
        bucket_key: &str,
        limit: usize,
        start_at: Option<&str>,
    ) -> RemoteResult<ObjectPage> {
        self.check_failure()?;
        if !self.bucket_exists(bucket_key) {
            return Err(RemoteError::NotFound(format!("bucket `{}`", bucket_key)));
        }
        let page_size = self.page_size.map_or(limit, |size| size.min(limit)).max(1);
        let mut state = self.state();
        state.list_calls += 1;
        let objects = state.objects.get(bucket_key).cloned().unwrap_or_default();

        let start = match start_at {
            Some(cursor) => objects
                .iter()
                .position(|object| object.object_key == cursor)
                .unwrap_or(objects.len()),
            None => 0,
        };
        let end = (start + page_size).min(objects.len());
        let listing = format!("https://storage.test/oss/v2/buckets/{}/objects", bucket_key);
        let next = objects.get(end).map(|following| match self.next_link {
            NextLink::Cursor => format!(
                "{}?startAt={}&limit={}",
                listing, following.object_key, limit
            ),
            NextLink::SelfReferencing => format!(
                "{}?startAt={}&limit={}",
                listing, objects[start].object_key, limit
            ),
            NextLink::WithoutCursor => format!("{}?limit={}", listing, limit),
        });
        Ok(ObjectPage {
            items: objects[start..end].to_vec(),
            next,
        })
    }

    async fn upload_object(
        &self,
        _token: &Credential,
        bucket_key: &str,
        object_key: &str,
        payload: Bytes,
        cancel: CancellationToken,
    ) -> RemoteResult<StoredObject> {
        self.check_failure()?;
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }
        if !self.bucket_exists(bucket_key) {
            return Err(RemoteError::NotFound(format!("bucket `{}`", bucket_key)));
        }
        let object = stored(bucket_key, object_key, payload.len() as u64);
        let mut state = self.state();
        let objects = state.objects.entry(bucket_key.to_string()).or_default();
        objects.retain(|existing| existing.object_key != object_key);
        objects.push(object.clone());
        Ok(object)
    }

    async fn delete_object(
        &self,
        _token: &Credential,
        bucket_key: &str,
        object_key: &str,
    ) -> RemoteResult<()> {
        self.check_failure()?;
        let mut state = self.state();
        let objects = state.objects.entry(bucket_key.to_string()).or_default();
        let before = objects.len();
        objects.retain(|existing| existing.object_key != object_key);
        if objects.len() == before {
            return Err(RemoteError::NotFound(format!("object `{}`", object_key)));
        }
        Ok(())
    }
}

#[async_trait]
impl TranslationService for InMemoryCloud {
    async fn start_job(
        &self,
        _token: &Credential,
        job: &TranslationJob,
    ) -> RemoteResult<JobAcceptance> {
        self.check_failure()?;
        self.state().jobs.push(job.clone());
        Ok(JobAcceptance {
            result: Some("created".into()),
            urn: Some(job.input.urn.clone()),
            accepted_jobs: None,
        })
    }

    async fn manifest(&self, _token: &Credential, urn: &str) -> RemoteResult<Manifest> {
        self.check_failure()?;
        self.state()
            .manifests
            .get(urn)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("manifest for `{}`", urn)))
    }
}
