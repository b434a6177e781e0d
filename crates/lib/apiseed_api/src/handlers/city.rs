//! City handlers. Reads are public; writes require a caller, and update and
//! delete are limited to the city's creator.

use apiseed_core::access::ensure_owner;
use apiseed_core::models::city::City;
use apiseed_core::uuid::parse_id;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::Payload;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{CityRequest, CityResponse};

fn city_id(raw: &str) -> AppResult<Uuid> {
    parse_id(raw).ok_or_else(|| AppError::NotFound("City not found".into()))
}

/// Fetch a city or fail with 404.
async fn load_city(state: &AppState, id: Uuid) -> AppResult<City> {
    state
        .stores
        .cities
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("City not found".into()))
}

/// `GET /city`
pub async fn list_cities_handler(State(state): State<AppState>) -> AppResult<Json<Vec<City>>> {
    Ok(Json(state.stores.cities.list().await?))
}

/// `GET /city/{id}`
pub async fn get_city_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<City>> {
    Ok(Json(load_city(&state, city_id(&id)?).await?))
}

/// `POST /city`: the caller becomes the city's owner.
pub async fn create_city_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Payload(body): Payload<CityRequest>,
) -> AppResult<Json<CityResponse>> {
    let city = state.stores.cities.create(user.id, body.into()).await?;
    info!(id = %city.id, owner = %user.id, "city created");
    Ok(Json(CityResponse {
        status: "city saved!".into(),
        success: true,
        city,
    }))
}

/// `PUT /city/{id}`: owner only. The owner itself never changes.
pub async fn update_city_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Payload(body): Payload<CityRequest>,
) -> AppResult<Json<CityResponse>> {
    let id = city_id(&id)?;
    ensure_owner(&load_city(&state, id).await?, user.id)?;

    let city = state
        .stores
        .cities
        .update(id, body.into())
        .await?
        .ok_or_else(|| AppError::NotFound("City not found".into()))?;
    info!(id = %city.id, "city updated");
    Ok(Json(CityResponse {
        status: "city successfully updated!".into(),
        success: true,
        city,
    }))
}

/// `DELETE /city/{id}`: owner only.
pub async fn delete_city_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> AppResult<Json<CityResponse>> {
    let id = city_id(&id)?;
    ensure_owner(&load_city(&state, id).await?, user.id)?;

    let city = state
        .stores
        .cities
        .delete(id)
        .await?
        .ok_or_else(|| AppError::NotFound("City not found".into()))?;
    info!(id = %city.id, "city deleted");
    Ok(Json(CityResponse {
        status: "city successfully deleted!".into(),
        success: true,
        city,
    }))
}
