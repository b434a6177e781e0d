//! Media metadata records. File bytes live in the BLOB store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata for one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Media {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "blobId")]
    pub blob_id: Uuid,
    /// Owner (uploader) identity.
    pub user: Uuid,
    pub mimetype: String,
    pub filename: String,
    pub originalname: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(rename = "metaData")]
    pub metadata: serde_json::Value,
    pub url: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a media record after its bytes were stored.
///
/// The ID is chosen by the caller so the public URL can be derived from it
/// before the record is written.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub id: Uuid,
    pub blob_id: Uuid,
    pub user: Uuid,
    pub mimetype: String,
    pub filename: String,
    pub originalname: String,
    pub media_type: Option<String>,
    pub metadata: serde_json::Value,
    pub url: Option<String>,
}

/// A stored binary object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}
