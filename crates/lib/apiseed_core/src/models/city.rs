//! City records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored city, owned by the identity that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct City {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "createdBy")]
    pub created_by: Uuid,
    pub name: Option<String>,
    pub country: Option<String>,
    pub zipcode: Option<i64>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Writable city fields. Used for both create and full update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityFields {
    pub name: Option<String>,
    pub country: Option<String>,
    pub zipcode: Option<i64>,
}
