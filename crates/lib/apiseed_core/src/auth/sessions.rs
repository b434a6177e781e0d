//! Server-side sessions keyed by a cookie.
//!
//! The cookie carries a random 64-char session ID; stores only ever see its
//! SHA-256 hash. Expiry is enforced on read and by periodic purging.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::SessionRecord;

/// Session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, record: SessionRecord) -> Result<(), AuthError>;

    /// Fetch a live session. Expired sessions are reported as absent.
    async fn find(&self, id_hash: &str) -> Result<Option<SessionRecord>, AuthError>;

    async fn remove(&self, id_hash: &str) -> Result<(), AuthError>;

    /// Remove every session belonging to an identity.
    async fn remove_for_user(&self, user_id: Uuid) -> Result<(), AuthError>;

    /// Delete expired sessions, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, AuthError>;
}

/// Generate a random session ID (64 alphanumeric chars).
fn generate_session_id() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// SHA-256 hash a session ID for storage.
pub fn hash_session_id(session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Start a session for an identity. Returns the plaintext session ID for the cookie.
pub async fn create_session(
    store: &dyn SessionStore,
    user_id: Uuid,
    ttl: Duration,
) -> Result<String, AuthError> {
    let session_id = generate_session_id();
    let now = Utc::now();
    store
        .insert(SessionRecord {
            id_hash: hash_session_id(&session_id),
            user_id,
            created_at: now,
            expires_at: now + ttl,
        })
        .await?;
    Ok(session_id)
}

/// Resolve a session cookie value to the identity it belongs to.
pub async fn resolve_session(
    store: &dyn SessionStore,
    session_id: &str,
) -> Result<Option<Uuid>, AuthError> {
    let record = store.find(&hash_session_id(session_id)).await?;
    Ok(record.map(|r| r.user_id))
}

/// End a session. Unknown IDs are ignored.
pub async fn destroy_session(store: &dyn SessionStore, session_id: &str) -> Result<(), AuthError> {
    store.remove(&hash_session_id(session_id)).await
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// Session store backed by the `sessions` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, record: SessionRecord) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO sessions (id_hash, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&record.id_hash)
        .bind(record.user_id)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, id_hash: &str) -> Result<Option<SessionRecord>, AuthError> {
        let row = sqlx::query_as::<_, SessionRecord>(
            "SELECT id_hash, user_id, created_at, expires_at FROM sessions \
             WHERE id_hash = $1 AND expires_at > now()",
        )
        .bind(id_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn remove(&self, id_hash: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE id_hash = $1")
            .bind(id_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_for_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// In-process session store.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionRecord>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, record: SessionRecord) -> Result<(), AuthError> {
        self.sessions.insert(record.id_hash.clone(), record);
        Ok(())
    }

    async fn find(&self, id_hash: &str) -> Result<Option<SessionRecord>, AuthError> {
        let now = Utc::now();
        Ok(self
            .sessions
            .get(id_hash)
            .filter(|s| !s.is_expired(now))
            .map(|s| s.value().clone()))
    }

    async fn remove(&self, id_hash: &str) -> Result<(), AuthError> {
        self.sessions.remove(id_hash);
        Ok(())
    }

    async fn remove_for_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.sessions.retain(|_, s| s.user_id != user_id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, AuthError> {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired(now));
        Ok(before.saturating_sub(self.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uuid::uuidv7;

    #[tokio::test]
    async fn create_resolve_destroy() {
        let store = MemorySessionStore::new();
        let user = uuidv7();
        let sid = create_session(&store, user, Duration::hours(1)).await.unwrap();
        assert_eq!(sid.len(), 64);
        assert_eq!(resolve_session(&store, &sid).await.unwrap(), Some(user));

        destroy_session(&store, &sid).await.unwrap();
        assert_eq!(resolve_session(&store, &sid).await.unwrap(), None);
    }

    #[tokio::test]
    async fn plaintext_id_is_not_the_key() {
        let store = MemorySessionStore::new();
        let sid = create_session(&store, uuidv7(), Duration::hours(1)).await.unwrap();
        assert!(store.find(&sid).await.unwrap().is_none());
        assert!(store.find(&hash_session_id(&sid)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_sessions_are_invisible_and_purged() {
        let store = MemorySessionStore::new();
        let live = create_session(&store, uuidv7(), Duration::hours(1)).await.unwrap();
        let dead = create_session(&store, uuidv7(), Duration::seconds(-1)).await.unwrap();

        assert_eq!(resolve_session(&store, &dead).await.unwrap(), None);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(resolve_session(&store, &live).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn remove_for_user_ends_all_their_sessions() {
        let store = MemorySessionStore::new();
        let user = uuidv7();
        let other = uuidv7();
        let a = create_session(&store, user, Duration::hours(1)).await.unwrap();
        let b = create_session(&store, user, Duration::hours(1)).await.unwrap();
        let c = create_session(&store, other, Duration::hours(1)).await.unwrap();

        store.remove_for_user(user).await.unwrap();
        assert_eq!(resolve_session(&store, &a).await.unwrap(), None);
        assert_eq!(resolve_session(&store, &b).await.unwrap(), None);
        assert_eq!(resolve_session(&store, &c).await.unwrap(), Some(other));
    }
}
