//! Represents an object (uploaded model file) stored in the bucket.

use serde::{Deserialize, Serialize};

/// Canonical object descriptor returned by the store.
///
/// `object_id` is the store-assigned identifier that the URN is derived from.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub bucket_key: String,
    pub object_key: String,
    pub object_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// One page of a bucket listing.
///
/// `next` is the full URL of the following page when more items remain; its
/// `startAt` query parameter is the continuation cursor.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ObjectPage {
    #[serde(default)]
    pub items: Vec<StoredObject>,
    #[serde(default)]
    pub next: Option<String>,
}

/// What the HTTP API exposes for each model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ModelSummary {
    pub name: String,
    pub urn: String,
}

/// Acknowledgment returned after deleting an object.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAck {
    pub bucket_key: String,
    pub object_key: String,
    pub deleted: bool,
}
