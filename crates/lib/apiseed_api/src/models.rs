//! Request and response bodies.

use apiseed_core::models::city::{City, CityFields};
use apiseed_core::models::media::Media;
use serde::{Deserialize, Serialize};

/// Error body: `{"success": false, "err": {"name", "message"}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub err: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub name: String,
    pub message: String,
}

/// Plain `{status}` acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

/// `POST /users/register` body. Missing fields read as empty and are
/// rejected by registration itself.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

/// `POST /users/login` body. Missing fields read as empty, which fails
/// like any other bad login.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login or OAuth callback.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub status: String,
    pub success: bool,
    pub token: String,
}

/// `{status, success}` acknowledgement for mutations without a payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub status: String,
    pub success: bool,
}

/// `POST`/`PUT /city` body. Unknown fields (including `createdBy`) are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct CityRequest {
    pub name: Option<String>,
    pub country: Option<String>,
    pub zipcode: Option<i64>,
}

impl From<CityRequest> for CityFields {
    fn from(req: CityRequest) -> Self {
        CityFields {
            name: req.name,
            country: req.country,
            zipcode: req.zipcode,
        }
    }
}

/// City mutation result.
#[derive(Debug, Serialize, Deserialize)]
pub struct CityResponse {
    pub status: String,
    pub success: bool,
    pub city: City,
}

/// Media upload result.
#[derive(Debug, Serialize, Deserialize)]
pub struct MediaResponse {
    pub status: String,
    pub success: bool,
    pub media: Media,
}

/// `GET /health` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
