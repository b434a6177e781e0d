//! Store errors and the bundle of stores the application is wired with.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::auth::sessions::{MemorySessionStore, PgSessionStore, SessionStore};
use crate::city::{CityStore, MemoryCityStore, PgCityStore};
use crate::identity::{IdentityStore, MemoryIdentityStore, PgIdentityStore};
use crate::media::{BlobStore, MediaStore, MemoryBlobStore, MemoryMediaStore, PgBlobStore, PgMediaStore};

/// Resource store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Result type for resource store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The full set of stores the application runs on.
#[derive(Clone)]
pub struct Stores {
    pub identities: Arc<dyn IdentityStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub cities: Arc<dyn CityStore>,
    pub media: Arc<dyn MediaStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl Stores {
    /// PostgreSQL-backed stores sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            identities: Arc::new(PgIdentityStore::new(pool.clone())),
            sessions: Arc::new(PgSessionStore::new(pool.clone())),
            cities: Arc::new(PgCityStore::new(pool.clone())),
            media: Arc::new(PgMediaStore::new(pool.clone())),
            blobs: Arc::new(PgBlobStore::new(pool)),
        }
    }

    /// Process-local stores; all data is lost on exit.
    pub fn memory() -> Self {
        Self {
            identities: Arc::new(MemoryIdentityStore::new()),
            sessions: Arc::new(MemorySessionStore::new()),
            cities: Arc::new(MemoryCityStore::new()),
            media: Arc::new(MemoryMediaStore::new()),
            blobs: Arc::new(MemoryBlobStore::new()),
        }
    }
}
