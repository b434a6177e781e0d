//! Media persistence: metadata records plus the BLOB store holding file bytes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::media::{Blob, Media, NewMedia};
use crate::store::{Result, StoreError};
use crate::uuid::uuidv7;

/// Media metadata records.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// All media records, oldest first.
    async fn list(&self) -> Result<Vec<Media>>;

    async fn get(&self, id: Uuid) -> Result<Option<Media>>;

    async fn create(&self, new: NewMedia) -> Result<Media>;

    /// Delete a record, returning it. `None` if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<Option<Media>>;
}

/// Binary object storage addressed by generated IDs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return the new blob ID.
    async fn put(&self, filename: &str, content_type: &str, data: Vec<u8>) -> Result<Uuid>;

    async fn get(&self, id: Uuid) -> Result<Option<Blob>>;

    /// Remove a blob. Returns `false` if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// An uploaded file with its form fields, before it is persisted.
#[derive(Debug, Clone)]
pub struct Upload {
    pub owner: Uuid,
    pub originalname: String,
    pub mimetype: String,
    pub data: Vec<u8>,
    pub media_type: Option<String>,
    /// Non-file form fields, as a JSON object.
    pub metadata: serde_json::Value,
}

/// Persist an upload: bytes first, then the metadata record.
///
/// If the record cannot be written the blob is deleted again. `public_host`
/// is used to build the record's `url` (`{public_host}/media/{id}`).
pub async fn save_upload(
    media: &dyn MediaStore,
    blobs: &dyn BlobStore,
    upload: Upload,
    public_host: &str,
) -> Result<Media> {
    if !upload.metadata.is_object() {
        return Err(StoreError::Validation("metadata must be a JSON object".into()));
    }

    let id = uuidv7();
    let filename = format!("{}-{}", id.simple(), upload.originalname);
    let blob_id = blobs
        .put(&filename, &upload.mimetype, upload.data)
        .await?;

    let new = NewMedia {
        id,
        blob_id,
        user: upload.owner,
        mimetype: upload.mimetype,
        filename,
        originalname: upload.originalname,
        media_type: upload.media_type,
        metadata: upload.metadata,
        url: Some(format!("{}/media/{}", public_host.trim_end_matches('/'), id)),
    };

    match media.create(new).await {
        Ok(record) => {
            info!(id = %record.id, blob_id = %blob_id, owner = %record.user, "media saved");
            Ok(record)
        }
        Err(e) => {
            if let Err(cleanup) = blobs.delete(blob_id).await {
                warn!(blob_id = %blob_id, "failed to remove orphaned blob: {cleanup}");
            }
            Err(e)
        }
    }
}

/// Delete a media record and its blob. Returns the removed record.
pub async fn delete_media(
    media: &dyn MediaStore,
    blobs: &dyn BlobStore,
    id: Uuid,
) -> Result<Option<Media>> {
    let Some(record) = media.delete(id).await? else {
        return Ok(None);
    };
    if !blobs.delete(record.blob_id).await? {
        warn!(id = %record.id, blob_id = %record.blob_id, "media blob was already gone");
    }
    Ok(Some(record))
}

// =============================================================================
// PostgreSQL
// =============================================================================

const MEDIA_COLUMNS: &str = "id, blob_id, user_id AS \"user\", mimetype, filename, originalname, \
     media_type, metadata, url, created_at, updated_at";

/// Media store backed by the `media` table.
#[derive(Clone)]
pub struct PgMediaStore {
    pool: PgPool,
}

impl PgMediaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaStore for PgMediaStore {
    async fn list(&self) -> Result<Vec<Media>> {
        let sql = format!("SELECT {MEDIA_COLUMNS} FROM media ORDER BY created_at, id");
        Ok(sqlx::query_as::<_, Media>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Media>> {
        let sql = format!("SELECT {MEDIA_COLUMNS} FROM media WHERE id = $1");
        Ok(sqlx::query_as::<_, Media>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create(&self, new: NewMedia) -> Result<Media> {
        let sql = format!(
            "INSERT INTO media (id, blob_id, user_id, mimetype, filename, originalname, media_type, metadata, url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {MEDIA_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Media>(&sql)
            .bind(new.id)
            .bind(new.blob_id)
            .bind(new.user)
            .bind(&new.mimetype)
            .bind(&new.filename)
            .bind(&new.originalname)
            .bind(&new.media_type)
            .bind(&new.metadata)
            .bind(&new.url)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Media>> {
        let sql = format!("DELETE FROM media WHERE id = $1 RETURNING {MEDIA_COLUMNS}");
        Ok(sqlx::query_as::<_, Media>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }
}

/// Blob store backed by the `media_blobs` table (`bytea` content).
#[derive(Clone)]
pub struct PgBlobStore {
    pool: PgPool,
}

impl PgBlobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlobStore for PgBlobStore {
    async fn put(&self, filename: &str, content_type: &str, data: Vec<u8>) -> Result<Uuid> {
        let id = uuidv7();
        sqlx::query(
            "INSERT INTO media_blobs (id, filename, content_type, length, data) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(filename)
        .bind(content_type)
        .bind(data.len() as i64)
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Blob>> {
        let row = sqlx::query_as::<_, (String, String, Vec<u8>)>(
            "SELECT filename, content_type, data FROM media_blobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(filename, content_type, data)| Blob {
            id,
            filename,
            content_type,
            data,
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM media_blobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// In-process media store.
#[derive(Default)]
pub struct MemoryMediaStore {
    media: RwLock<BTreeMap<Uuid, Media>>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn list(&self) -> Result<Vec<Media>> {
        Ok(self.media.read().await.values().cloned().collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Media>> {
        Ok(self.media.read().await.get(&id).cloned())
    }

    async fn create(&self, new: NewMedia) -> Result<Media> {
        let now = Utc::now();
        let record = Media {
            id: new.id,
            blob_id: new.blob_id,
            user: new.user,
            mimetype: new.mimetype,
            filename: new.filename,
            originalname: new.originalname,
            media_type: new.media_type,
            metadata: new.metadata,
            url: new.url,
            created_at: now,
            updated_at: now,
        };
        let mut media = self.media.write().await;
        if media.contains_key(&record.id) {
            return Err(StoreError::Validation(format!(
                "media {} already exists",
                record.id
            )));
        }
        media.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Media>> {
        Ok(self.media.write().await.remove(&id))
    }
}

/// In-process blob store.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<Uuid, Blob>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, filename: &str, content_type: &str, data: Vec<u8>) -> Result<Uuid> {
        let id = uuidv7();
        self.blobs.insert(
            id,
            Blob {
                id,
                filename: filename.to_string(),
                content_type: content_type.to_string(),
                data,
            },
        );
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Blob>> {
        Ok(self.blobs.get(&id).map(|b| b.value().clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.blobs.remove(&id).is_some())
    }
}
