//! Two-legged access credentials and the scopes they carry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Permission scopes understood by the identity service.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    #[serde(rename = "data:read")]
    DataRead,
    #[serde(rename = "data:write")]
    DataWrite,
    #[serde(rename = "data:create")]
    DataCreate,
    #[serde(rename = "bucket:create")]
    BucketCreate,
    #[serde(rename = "bucket:read")]
    BucketRead,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::DataRead => "data:read",
            Scope::DataWrite => "data:write",
            Scope::DataCreate => "data:create",
            Scope::BucketCreate => "bucket:create",
            Scope::BucketRead => "bucket:read",
        }
    }

    /// Space-separated form used in the token request.
    pub fn join(scopes: &[Scope]) -> String {
        scopes
            .iter()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Scopes handed to browsers for viewing translated models.
pub const PUBLIC_SCOPES: &[Scope] = &[Scope::DataRead];

/// Scopes used by the gateway itself for bucket and object operations.
pub const INTERNAL_SCOPES: &[Scope] = &[
    Scope::DataRead,
    Scope::DataCreate,
    Scope::DataWrite,
    Scope::BucketCreate,
    Scope::BucketRead,
];

/// Raw token response from the identity service.
#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: i64,
}

fn default_token_type() -> String {
    "Bearer".into()
}

/// The token's lifetime cannot be represented as an absolute expiry.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("token lifetime of {0} seconds is out of range")]
pub struct ExpiryOutOfRange(pub i64);

/// A short-lived bearer token, obtained per operation and never cached.
#[derive(Serialize, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
    #[serde(skip)]
    pub scopes: Vec<Scope>,
}

impl Credential {
    /// Stamp a token response with its absolute expiry.
    pub fn issued(
        response: TokenResponse,
        scopes: &[Scope],
        now: DateTime<Utc>,
    ) -> Result<Self, ExpiryOutOfRange> {
        let expires_at = Duration::try_seconds(response.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or(ExpiryOutOfRange(response.expires_in))?;
        Ok(Self {
            expires_at,
            access_token: response.access_token,
            token_type: response.token_type,
            expires_in: response.expires_in,
            scopes: scopes.to_vec(),
        })
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"***")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}
