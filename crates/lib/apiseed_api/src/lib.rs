//! # apiseed_api
//!
//! HTTP API library for apiseed.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use apiseed_core::auth::oauth::{FacebookProvider, OAuthProvider, OAuthStateStore};
use apiseed_core::store::Stores;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderName;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{city, health, media, users};
use crate::middleware::auth::{verify_admin, verify_ordinary_user};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Identity, session and resource stores.
    pub stores: Stores,
    /// API configuration.
    pub config: ApiConfig,
    /// Pending OAuth `state` parameters.
    pub oauth_states: Arc<OAuthStateStore>,
    /// Facebook login provider, when configured.
    pub facebook: Option<Arc<dyn OAuthProvider>>,
}

impl AppState {
    /// Build state from stores and config, creating the Facebook provider if
    /// credentials are configured.
    pub fn new(stores: Stores, config: ApiConfig) -> Self {
        let facebook = config
            .facebook
            .clone()
            .map(|fb| Arc::new(FacebookProvider::new(fb)) as Arc<dyn OAuthProvider>);
        Self {
            stores,
            config,
            oauth_states: Arc::new(OAuthStateStore::new()),
            facebook,
        }
    }

    /// Replace the Facebook provider.
    pub fn with_facebook(mut self, provider: Arc<dyn OAuthProvider>) -> Self {
        self.facebook = Some(provider);
        self
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            HeaderName::from_static("origin"),
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("content-type"),
            HeaderName::from_static("accept"),
            HeaderName::from_static("authorization"),
            HeaderName::from_static(middleware::auth::TOKEN_HEADER),
        ]);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::HEALTH, get(health::health_handler))
        .route(routes::USERS_REGISTER, post(users::register_handler))
        .route(routes::USERS_LOGIN, post(users::login_handler))
        .route(routes::USERS_LOGOUT, get(users::logout_handler))
        .route(routes::USERS_FACEBOOK, get(users::facebook_redirect_handler))
        .route(
            routes::USERS_FACEBOOK_CALLBACK,
            get(users::facebook_callback_handler),
        )
        .route(routes::CITY, get(city::list_cities_handler))
        .route(routes::CITY_ID, get(city::get_city_handler))
        .route(routes::MEDIA, get(media::list_media_handler))
        .route(routes::MEDIA_ID, get(media::get_media_file_handler))
        .route(routes::MEDIA_METADATA_ID, get(media::get_media_metadata_handler));

    // Protected routes (require a token or session)
    let protected = Router::new()
        .route(routes::CITY, post(city::create_city_handler))
        .route(
            routes::CITY_ID,
            axum::routing::put(city::update_city_handler).delete(city::delete_city_handler),
        )
        .route(routes::MEDIA, post(media::upload_media_handler))
        .route(routes::MEDIA_ID, delete(media::delete_media_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            verify_ordinary_user,
        ));

    // Admin routes (require an administrator)
    let admin = Router::new()
        .route(routes::USERS, get(users::list_users_handler))
        .route(routes::USERS_ID, delete(users::delete_user_handler))
        .route_layer(axum::middleware::from_fn(verify_admin))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            verify_ordinary_user,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(admin)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
