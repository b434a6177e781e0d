//! Identity store: persistent user records.
//!
//! `PgIdentityStore` is the production backend; `MemoryIdentityStore` keeps
//! everything in process and backs the test suites and `--memory` runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::models::auth::{Identity, NewIdentity};
use crate::uuid::uuidv7;

/// Postgres SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Advisory lock key serializing inserts that may claim the admin role.
const FIRST_ADMIN_LOCK: i64 = 0x6170_6973_6565_6401;

/// Persistent identity records.
///
/// `create` must reject a taken `username` or `oauth_id` with
/// [`AuthError::UserExists`] without modifying the existing record, and must
/// resolve [`NewIdentity::admin_if_first`] atomically with the insert.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn create(&self, new: NewIdentity) -> Result<Identity, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, AuthError>;

    async fn find_by_oauth_id(&self, oauth_id: &str) -> Result<Option<Identity>, AuthError>;

    /// All identities, oldest first.
    async fn list(&self) -> Result<Vec<Identity>, AuthError>;

    /// Remove an identity. Returns `false` if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool, AuthError>;

    /// Replace the stored provider access token.
    async fn update_oauth_token(&self, id: Uuid, token: &str) -> Result<(), AuthError>;
}

// =============================================================================
// PostgreSQL
// =============================================================================

const IDENTITY_COLUMNS: &str = "id, username, password_hash, admin, oauth_id, oauth_token, \
     firstname, lastname, created_at, updated_at";

/// Identity store backed by the `users` table.
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn create(&self, new: NewIdentity) -> Result<Identity, AuthError> {
        let sql = format!(
            "INSERT INTO users (id, username, password_hash, admin, oauth_id, oauth_token, firstname, lastname) \
             SELECT $1, $2, $3, $4 AND NOT EXISTS (SELECT 1 FROM users), $5, $6, $7, $8 \
             RETURNING {IDENTITY_COLUMNS}"
        );
        let mut tx = self.pool.begin().await?;
        if new.admin_if_first {
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(FIRST_ADMIN_LOCK)
                .execute(&mut *tx)
                .await?;
        }
        let identity = sqlx::query_as::<_, Identity>(&sql)
            .bind(uuidv7())
            .bind(&new.username)
            .bind(&new.password_hash)
            .bind(new.admin_if_first)
            .bind(&new.oauth_id)
            .bind(&new.oauth_token)
            .bind(&new.firstname)
            .bind(&new.lastname)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db) = &e
                    && db.code().as_deref() == Some(UNIQUE_VIOLATION)
                {
                    return AuthError::UserExists(new.username.clone());
                }
                AuthError::DbError(e)
            })?;
        tx.commit().await?;
        Ok(identity)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, Identity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, AuthError> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query_as::<_, Identity>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_by_oauth_id(&self, oauth_id: &str) -> Result<Option<Identity>, AuthError> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM users WHERE oauth_id = $1");
        let row = sqlx::query_as::<_, Identity>(&sql)
            .bind(oauth_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list(&self) -> Result<Vec<Identity>, AuthError> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM users ORDER BY created_at, id");
        let rows = sqlx::query_as::<_, Identity>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_oauth_token(&self, id: Uuid, token: &str) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET oauth_token = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// In-process identity store. UUIDv7 keys keep iteration in creation order.
#[derive(Default)]
pub struct MemoryIdentityStore {
    users: RwLock<BTreeMap<Uuid, Identity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn create(&self, new: NewIdentity) -> Result<Identity, AuthError> {
        let mut users = self.users.write().await;
        let clash = users.values().any(|u| {
            u.username == new.username
                || (new.oauth_id.is_some() && u.oauth_id == new.oauth_id)
        });
        if clash {
            return Err(AuthError::UserExists(new.username));
        }
        let now = Utc::now();
        let identity = Identity {
            id: uuidv7(),
            username: new.username,
            password_hash: new.password_hash,
            admin: new.admin_if_first && users.is_empty(),
            oauth_id: new.oauth_id,
            oauth_token: new.oauth_token,
            firstname: new.firstname,
            lastname: new.lastname,
            created_at: now,
            updated_at: now,
        };
        users.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, AuthError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_oauth_id(&self, oauth_id: &str) -> Result<Option<Identity>, AuthError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.oauth_id.as_deref() == Some(oauth_id))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Identity>, AuthError> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AuthError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn update_oauth_token(&self, id: Uuid, token: &str) -> Result<(), AuthError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.oauth_token = Some(token.to_string());
            user.updated_at = Utc::now();
        }
        Ok(())
    }
}
