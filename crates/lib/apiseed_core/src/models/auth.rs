//! Authentication domain models.
//!
//! These are internal domain models; the API crate serializes some of them
//! directly, so secret fields are skipped on output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Identity {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    /// bcrypt hash (salt embedded). `None` for OAuth-only identities.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub admin: bool,
    #[serde(rename = "oauthId", skip_serializing_if = "Option::is_none")]
    pub oauth_id: Option<String>,
    #[serde(skip_serializing, default)]
    pub oauth_token: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    #[cfg(test)]
    pub(crate) fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Input for creating an identity.
#[derive(Debug, Clone, Default)]
pub struct NewIdentity {
    pub username: String,
    pub password_hash: Option<String>,
    /// Grant the admin role if the store holds no identity at insert time.
    /// The store decides this atomically with the insert.
    pub admin_if_first: bool,
    pub oauth_id: Option<String>,
    pub oauth_token: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: identity ID (standard JWT `sub` claim).
    pub sub: String,
    pub username: String,
    pub admin: bool,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp). Absent when tokens are configured not to expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Parse the subject back into an identity ID.
    pub fn identity_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// Server-side session record. The session key is the SHA-256 hash of the
/// cookie value; the plaintext never reaches the store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRecord {
    pub id_hash: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Profile returned by an OAuth provider after a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub external_id: String,
    pub display_name: String,
    pub access_token: String,
}
