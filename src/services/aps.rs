//! src/services/aps.rs
//!
//! ApsClient: reqwest-backed implementation of the identity, bucket store
//! and translation collaborators. Each method is one (or, for uploads, a
//! short sequence of) REST call(s); non-success statuses are classified into
//! [`RemoteError`] before they leave this module.

use crate::{
    models::{
        bucket::{BucketDetails, CreateBucket},
        credential::{Credential, Scope, TokenResponse},
        object::{ObjectPage, StoredObject},
        translation::{JobAcceptance, Manifest, TranslationJob},
    },
    services::remote::{
        BucketStore, RemoteError, RemoteResult, TokenIssuer, TranslationService,
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::{StreamExt, TryStreamExt, stream};
use reqwest::{Client, ClientBuilder, Response, header::AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::{fmt, future::Future, ops::Range, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// The signed upload endpoint hands out at most this many part URLs per call.
const MAX_URLS_PER_REQUEST: usize = 25;
/// S3 rejects non-final parts smaller than this.
const MIN_PART_BYTES: usize = 5 * 1024 * 1024;

/// Connection settings for the platform APIs.
#[derive(Clone)]
pub struct ApsConfig {
    pub base_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub upload_chunk_bytes: usize,
    pub upload_concurrency: usize,
    pub connect_timeout: Duration,
}

impl fmt::Debug for ApsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApsConfig")
            .field("base_url", &self.base_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("upload_chunk_bytes", &self.upload_chunk_bytes)
            .field("upload_concurrency", &self.upload_concurrency)
            .finish()
    }
}

/// Client for the authentication, OSS and Model Derivative APIs.
///
/// Holds only a connection pool and configuration; no tokens are cached.
#[derive(Clone, Debug)]
pub struct ApsClient {
    http: Client,
    config: ApsConfig,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SignedUpload {
    upload_key: String,
    #[serde(default)]
    urls: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteUpload<'a> {
    upload_key: &'a str,
}

impl ApsClient {
    pub fn new(config: ApsConfig) -> RemoteResult<Self> {
        let http = ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("model-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> RemoteResult<Url> {
        let mut url = self.config.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                RemoteError::Malformed(format!(
                    "base url `{}` cannot carry a path",
                    self.config.base_url
                ))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    /// Request signed URLs for parts `first_part..first_part + parts`
    /// (1-based). Later batches reuse the upload key of the first.
    async fn signed_upload_urls(
        &self,
        token: &Credential,
        bucket_key: &str,
        object_key: &str,
        first_part: usize,
        parts: usize,
        upload_key: Option<&str>,
    ) -> RemoteResult<SignedUpload> {
        let url = self.endpoint(&[
            "oss", "v2", "buckets", bucket_key, "objects", object_key, "signeds3upload",
        ])?;
        let mut query = vec![
            ("parts", parts.to_string()),
            ("firstPart", first_part.to_string()),
        ];
        if let Some(key) = upload_key {
            query.push(("uploadKey", key.to_string()));
        }

        debug!(
            "requesting {} signed part urls for {}/{} starting at {}",
            parts, bucket_key, object_key, first_part
        );
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, token.bearer())
            .query(&query)
            .send()
            .await?;
        let response = check(response, format!("object `{}`", object_key)).await?;
        let signed: SignedUpload = response.json().await?;
        if signed.urls.len() != parts {
            return Err(RemoteError::Malformed(format!(
                "asked for {} signed urls, got {}",
                parts,
                signed.urls.len()
            )));
        }
        Ok(signed)
    }

    async fn put_part(&self, url: String, body: Bytes, part_number: usize) -> RemoteResult<()> {
        let len = body.len();
        let response = self.http.put(url).body(body).send().await?;
        check(response, format!("upload part {}", part_number)).await?;
        debug!("uploaded part {} ({} bytes)", part_number, len);
        Ok(())
    }

    async fn upload_parts(
        &self,
        token: &Credential,
        bucket_key: &str,
        object_key: &str,
        payload: &Bytes,
    ) -> RemoteResult<StoredObject> {
        let ranges = part_ranges(payload.len(), self.config.upload_chunk_bytes);
        let concurrency = self.config.upload_concurrency.max(1);
        let mut upload_key: Option<String> = None;

        for (batch_index, batch) in ranges.chunks(MAX_URLS_PER_REQUEST).enumerate() {
            let first_part = batch_index * MAX_URLS_PER_REQUEST + 1;
            let signed = self
                .signed_upload_urls(
                    token,
                    bucket_key,
                    object_key,
                    first_part,
                    batch.len(),
                    upload_key.as_deref(),
                )
                .await?;

            let puts = signed
                .urls
                .into_iter()
                .zip(batch.iter().cloned())
                .enumerate()
                .map(|(offset, (url, range))| {
                    self.put_part(url, payload.slice(range), first_part + offset)
                });
            stream::iter(puts)
                .buffer_unordered(concurrency)
                .try_collect::<Vec<()>>()
                .await?;

            upload_key.get_or_insert(signed.upload_key);
        }

        let upload_key = upload_key
            .ok_or_else(|| RemoteError::Malformed("no upload session was opened".into()))?;
        let url = self.endpoint(&[
            "oss", "v2", "buckets", bucket_key, "objects", object_key, "signeds3upload",
        ])?;
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, token.bearer())
            .json(&CompleteUpload {
                upload_key: &upload_key,
            })
            .send()
            .await?;
        let response = check(response, format!("object `{}`", object_key)).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl TokenIssuer for ApsClient {
    async fn two_legged_token(&self, scopes: &[Scope]) -> RemoteResult<Credential> {
        let url = self.endpoint(&["authentication", "v2", "token"])?;
        let scope = Scope::join(scopes);
        debug!("requesting two-legged token with scope `{}`", scope);

        let response = self
            .http
            .post(url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", scope.as_str()),
            ])
            .send()
            .await?;
        let response = check(response, "token endpoint").await?;
        let token: TokenResponse = response.json().await?;
        Credential::issued(token, scopes, Utc::now())
            .map_err(|err| RemoteError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl BucketStore for ApsClient {
    async fn bucket_details(
        &self,
        token: &Credential,
        bucket_key: &str,
    ) -> RemoteResult<BucketDetails> {
        let url = self.endpoint(&["oss", "v2", "buckets", bucket_key, "details"])?;
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await?;
        let response = check(response, format!("bucket `{}`", bucket_key)).await?;
        Ok(response.json().await?)
    }

    async fn create_bucket(
        &self,
        token: &Credential,
        request: &CreateBucket,
    ) -> RemoteResult<BucketDetails> {
        let url = self.endpoint(&["oss", "v2", "buckets"])?;
        debug!(
            "creating bucket {} in {}",
            request.bucket_key,
            request.region.as_str()
        );
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, token.bearer())
            .header("x-ads-region", request.region.as_str())
            .json(request)
            .send()
            .await?;
        let response = check(response, format!("bucket `{}`", request.bucket_key)).await?;
        Ok(response.json().await?)
    }

    async fn list_objects(
        &self,
        token: &Credential,
        bucket_key: &str,
        limit: usize,
        start_at: Option<&str>,
    ) -> RemoteResult<ObjectPage> {
        let url = self.endpoint(&["oss", "v2", "buckets", bucket_key, "objects"])?;
        let mut query = vec![("limit", limit.to_string())];
        if let Some(cursor) = start_at {
            query.push(("startAt", cursor.to_string()));
        }
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, token.bearer())
            .query(&query)
            .send()
            .await?;
        let response = check(response, format!("bucket `{}`", bucket_key)).await?;
        Ok(response.json().await?)
    }

    async fn upload_object(
        &self,
        token: &Credential,
        bucket_key: &str,
        object_key: &str,
        payload: Bytes,
        cancel: CancellationToken,
    ) -> RemoteResult<StoredObject> {
        debug!(
            "uploading {} bytes to {}/{}",
            payload.len(),
            bucket_key,
            object_key
        );
        // An unfinished signed upload is discarded by the store once its
        // upload key expires, so dropping the transfer is enough to abort.
        or_cancel(
            &cancel,
            self.upload_parts(token, bucket_key, object_key, &payload),
        )
        .await
    }

    async fn delete_object(
        &self,
        token: &Credential,
        bucket_key: &str,
        object_key: &str,
    ) -> RemoteResult<()> {
        let url = self.endpoint(&["oss", "v2", "buckets", bucket_key, "objects", object_key])?;
        let response = self
            .http
            .delete(url)
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await?;
        check(response, format!("object `{}`", object_key)).await?;
        Ok(())
    }
}

#[async_trait]
impl TranslationService for ApsClient {
    async fn start_job(
        &self,
        token: &Credential,
        job: &TranslationJob,
    ) -> RemoteResult<JobAcceptance> {
        let url = self.endpoint(&["modelderivative", "v2", "designdata", "job"])?;
        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, token.bearer())
            .json(job)
            .send()
            .await?;
        let response = check(response, format!("urn `{}`", job.input.urn)).await?;
        Ok(response.json().await?)
    }

    async fn manifest(&self, token: &Credential, urn: &str) -> RemoteResult<Manifest> {
        let url = self.endpoint(&["modelderivative", "v2", "designdata", urn, "manifest"])?;
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, token.bearer())
            .send()
            .await?;
        let response = check(response, format!("manifest for `{}`", urn)).await?;
        Ok(response.json().await?)
    }
}

/// Pass successful responses through; classify everything else.
async fn check(response: Response, resource: impl Into<String>) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    debug!("remote call failed with {}: {}", status, message);
    Err(RemoteError::from_status(status.as_u16(), resource, message))
}

/// Race `fut` against `cancel`; cancellation wins ties.
async fn or_cancel<T, F>(cancel: &CancellationToken, fut: F) -> RemoteResult<T>
where
    F: Future<Output = RemoteResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RemoteError::Cancelled),
        result = fut => result,
    }
}

/// Split `total` bytes into upload part ranges of `chunk` bytes (clamped to
/// the S3 minimum). Always yields at least one part, even for an empty body.
fn part_ranges(total: usize, chunk: usize) -> Vec<Range<usize>> {
    let chunk = chunk.max(MIN_PART_BYTES);
    if total == 0 {
        return vec![0..0];
    }
    (0..total)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(total))
        .collect()
}
