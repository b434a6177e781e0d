//! City persistence.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::city::{City, CityFields};
use crate::store::Result;
use crate::uuid::uuidv7;

/// City records. Ownership (`created_by`) is set on create and never changed.
#[async_trait]
pub trait CityStore: Send + Sync {
    /// All cities, oldest first.
    async fn list(&self) -> Result<Vec<City>>;

    async fn get(&self, id: Uuid) -> Result<Option<City>>;

    async fn create(&self, owner: Uuid, fields: CityFields) -> Result<City>;

    /// Replace the writable fields. `None` if the city does not exist.
    async fn update(&self, id: Uuid, fields: CityFields) -> Result<Option<City>>;

    /// Delete a city, returning it. `None` if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<Option<City>>;
}

// =============================================================================
// PostgreSQL
// =============================================================================

const CITY_COLUMNS: &str = "id, created_by, name, country, zipcode, created_at, updated_at";

/// City store backed by the `cities` table.
#[derive(Clone)]
pub struct PgCityStore {
    pool: PgPool,
}

impl PgCityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CityStore for PgCityStore {
    async fn list(&self) -> Result<Vec<City>> {
        let sql = format!("SELECT {CITY_COLUMNS} FROM cities ORDER BY created_at, id");
        Ok(sqlx::query_as::<_, City>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<City>> {
        let sql = format!("SELECT {CITY_COLUMNS} FROM cities WHERE id = $1");
        Ok(sqlx::query_as::<_, City>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create(&self, owner: Uuid, fields: CityFields) -> Result<City> {
        let sql = format!(
            "INSERT INTO cities (id, created_by, name, country, zipcode) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {CITY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, City>(&sql)
            .bind(uuidv7())
            .bind(owner)
            .bind(&fields.name)
            .bind(&fields.country)
            .bind(fields.zipcode)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, id: Uuid, fields: CityFields) -> Result<Option<City>> {
        let sql = format!(
            "UPDATE cities SET name = $2, country = $3, zipcode = $4, updated_at = now() \
             WHERE id = $1 RETURNING {CITY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, City>(&sql)
            .bind(id)
            .bind(&fields.name)
            .bind(&fields.country)
            .bind(fields.zipcode)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<City>> {
        let sql = format!("DELETE FROM cities WHERE id = $1 RETURNING {CITY_COLUMNS}");
        Ok(sqlx::query_as::<_, City>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// In-process city store.
#[derive(Default)]
pub struct MemoryCityStore {
    cities: RwLock<BTreeMap<Uuid, City>>,
}

impl MemoryCityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CityStore for MemoryCityStore {
    async fn list(&self) -> Result<Vec<City>> {
        Ok(self.cities.read().await.values().cloned().collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<City>> {
        Ok(self.cities.read().await.get(&id).cloned())
    }

    async fn create(&self, owner: Uuid, fields: CityFields) -> Result<City> {
        let now = Utc::now();
        let city = City {
            id: uuidv7(),
            created_by: owner,
            name: fields.name,
            country: fields.country,
            zipcode: fields.zipcode,
            created_at: now,
            updated_at: now,
        };
        self.cities.write().await.insert(city.id, city.clone());
        Ok(city)
    }

    async fn update(&self, id: Uuid, fields: CityFields) -> Result<Option<City>> {
        let mut cities = self.cities.write().await;
        Ok(cities.get_mut(&id).map(|city| {
            city.name = fields.name;
            city.country = fields.country;
            city.zipcode = fields.zipcode;
            city.updated_at = Utc::now();
            city.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<City>> {
        Ok(self.cities.write().await.remove(&id))
    }
}
