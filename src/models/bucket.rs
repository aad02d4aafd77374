//! Represents the logical bucket that holds every uploaded model.

use serde::{Deserialize, Serialize};

/// Retention policy applied when the bucket is created.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BucketPolicy {
    Transient,
    Temporary,
    Persistent,
}

/// Storage region sent as `x-ads-region` on bucket creation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BucketRegion {
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "EMEA")]
    Emea,
    #[serde(rename = "AUS")]
    Aus,
}

impl BucketRegion {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketRegion::Us => "US",
            BucketRegion::Emea => "EMEA",
            BucketRegion::Aus => "AUS",
        }
    }

    /// Case-insensitive parse of a region name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "US" => Some(BucketRegion::Us),
            "EMEA" => Some(BucketRegion::Emea),
            "AUS" => Some(BucketRegion::Aus),
            _ => None,
        }
    }
}

/// Body of a bucket creation request.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateBucket {
    pub bucket_key: String,
    pub policy_key: BucketPolicy,
    /// Sent as a header, not in the body.
    #[serde(skip)]
    pub region: BucketRegion,
}

/// Bucket metadata as reported by the store.
///
/// Only the key is relied upon; the remaining fields are informational.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BucketDetails {
    pub bucket_key: String,
    #[serde(default)]
    pub bucket_owner: Option<String>,
    #[serde(default)]
    pub created_date: Option<i64>,
    #[serde(default)]
    pub policy_key: Option<BucketPolicy>,
}
