//! Account handlers: registration, login/logout, Facebook login and the
//! admin-only user list.

use apiseed_core::models::auth::Identity;
use apiseed_core::uuid::parse_id;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::warn;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::Payload;
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, StatusResponse, SuccessResponse};
use crate::services::auth::{self, SignedIn};
use crate::services::cookies::{SESSION_COOKIE, clear_session_cookie, session_cookie};

/// Attach the session cookie for a fresh sign-in.
fn with_session(state: &AppState, jar: CookieJar, signed_in: &SignedIn) -> CookieJar {
    jar.add(session_cookie(
        &signed_in.session_id,
        state.config.session_ttl.num_seconds(),
    ))
}

/// `POST /users/register`: create an account and sign it in.
pub async fn register_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Payload(body): Payload<RegisterRequest>,
) -> AppResult<(CookieJar, Json<StatusResponse>)> {
    let signed_in = auth::register(&state.stores, &state.config, &body).await?;
    Ok((
        with_session(&state, jar, &signed_in),
        Json(StatusResponse::new("Registration Successful!")),
    ))
}

/// `POST /users/login`: authenticate with username + password.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Payload(body): Payload<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let signed_in = auth::login(&state.stores, &state.config, &body).await?;
    let jar = with_session(&state, jar, &signed_in);
    Ok((
        jar,
        Json(LoginResponse {
            status: "Login successful!".into(),
            success: true,
            token: signed_in.token,
        }),
    ))
}

/// `GET /users/logout`: end the session and clear its cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<StatusResponse>)> {
    let session_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    auth::logout(&state.stores, session_id.as_deref()).await?;
    Ok((jar.add(clear_session_cookie()), Json(StatusResponse::new("Bye!"))))
}

/// `GET /users`: every account. Admin only.
pub async fn list_users_handler(State(state): State<AppState>) -> AppResult<Json<Vec<Identity>>> {
    Ok(Json(auth::list_users(&state.stores).await?))
}

/// `DELETE /users/{id}`: remove an account. Admin only.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<SuccessResponse>> {
    let id = parse_id(&id).ok_or_else(|| AppError::NotFound("User not found".into()))?;
    auth::delete_user(&state.stores, id).await?;
    Ok(Json(SuccessResponse {
        status: "user successfully deleted!".into(),
        success: true,
    }))
}

/// `GET /users/facebook`: start the Facebook login flow.
pub async fn facebook_redirect_handler(State(state): State<AppState>) -> AppResult<Redirect> {
    let provider = state
        .facebook
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Facebook login is not configured".into()))?;
    let url = provider.authorize_url(&state.oauth_states.issue())?;
    Ok(Redirect::to(&url))
}

/// Query parameters of the provider callback.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// `GET /users/facebook/callback`: finish the Facebook login flow.
pub async fn facebook_callback_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<OAuthCallbackParams>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let provider = state
        .facebook
        .clone()
        .ok_or_else(|| AppError::NotFound("Facebook login is not configured".into()))?;

    if let Some(error) = params.error {
        warn!(error = %error, "facebook login was denied");
        return Err(AppError::Unauthorized(
            params.error_description.unwrap_or(error),
        ));
    }
    let valid_state = params
        .state
        .as_deref()
        .is_some_and(|s| state.oauth_states.take(s));
    if !valid_state {
        return Err(AppError::Unauthorized("Invalid or expired OAuth state".into()));
    }
    let code = params
        .code
        .ok_or_else(|| AppError::Unauthorized("Missing authorization code".into()))?;

    let profile = provider.exchange_code(&code).await?;
    let signed_in = auth::oauth_login(&state.stores, &state.config, &profile).await?;
    let jar = with_session(&state, jar, &signed_in);
    Ok((
        jar,
        Json(LoginResponse {
            status: "Login successful!".into(),
            success: true,
            token: signed_in.token,
        }),
    ))
}
