//! Access-control middleware.
//!
//! `verify_ordinary_user` resolves the caller from a bearer token or, when no
//! token is presented, from the session cookie, and inserts an
//! [`AuthenticatedUser`] into the request extensions. `verify_admin` runs
//! after it and rejects non-administrators.

use apiseed_core::auth::jwt::verify_token;
use apiseed_core::auth::sessions::resolve_session;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::SESSION_COOKIE;

/// Header carrying the access token.
pub const TOKEN_HEADER: &str = "x-access-token";

/// Query parameter / body field carrying the access token.
const TOKEN_FIELD: &str = "token";

/// How the caller proved their identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Token,
    Session,
}

/// The resolved caller, available to handlers via `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
    pub admin: bool,
    pub method: AuthMethod,
}

/// Axum middleware: resolves the caller and injects `AuthenticatedUser`.
///
/// Token sources, first match wins: `x-access-token` header,
/// `Authorization: Bearer` header, `token` query parameter, `token` field of
/// a JSON or urlencoded body. Without a token the session cookie is used.
pub async fn verify_ordinary_user(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut request, token) = extract_token(request, state.config.max_upload_bytes).await?;

    let user = match token {
        Some(token) => {
            let claims = verify_token(&token, state.config.jwt_secret.as_bytes())?;
            let id = claims
                .identity_id()
                .ok_or_else(|| AppError::InvalidToken("Token subject is not an ID".into()))?;
            AuthenticatedUser {
                id,
                username: claims.username,
                admin: claims.admin,
                method: AuthMethod::Token,
            }
        }
        None => {
            let session_id = CookieJar::from_headers(request.headers())
                .get(SESSION_COOKIE)
                .map(|c| c.value().to_string());
            user_from_session(&state, session_id).await?
        }
    };

    debug!(user = %user.id, method = ?user.method, "request authenticated");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Axum middleware: requires an administrator. Must run after
/// [`verify_ordinary_user`].
pub async fn verify_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Unauthenticated("You are not authenticated!".into()))?;

    if !user.admin {
        debug!(user = %user.id, "non-admin rejected");
        return Err(AppError::Forbidden(
            "You are not authorized to perform this operation!".into(),
        ));
    }
    Ok(next.run(request).await)
}

/// Resolve the caller from the session cookie value.
async fn user_from_session(
    state: &AppState,
    session_id: Option<String>,
) -> Result<AuthenticatedUser, AppError> {
    let Some(session_id) = session_id else {
        return Err(AppError::Unauthenticated("No token provided!".into()));
    };

    let user_id = resolve_session(state.stores.sessions.as_ref(), &session_id)
        .await?
        .ok_or_else(|| AppError::InvalidToken("Session expired or invalid".into()))?;
    let identity = state
        .stores
        .identities
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::InvalidToken("Session user no longer exists".into()))?;

    Ok(AuthenticatedUser {
        id: identity.id,
        username: identity.username,
        admin: identity.admin,
        method: AuthMethod::Session,
    })
}

/// Find a token in headers, query or body. The body is buffered only for
/// JSON and urlencoded requests and is put back unchanged.
async fn extract_token(
    request: Request,
    body_limit: usize,
) -> Result<(Request, Option<String>), AppError> {
    if let Some(token) = token_from_headers(&request) {
        return Ok((request, Some(token)));
    }
    if let Some(token) = request.uri().query().and_then(token_from_urlencoded) {
        return Ok((request, Some(token)));
    }

    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    let is_json = content_type.starts_with("application/json");
    let is_form = content_type.starts_with("application/x-www-form-urlencoded");
    if !is_json && !is_form {
        return Ok((request, None));
    }

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, body_limit)
        .await
        .map_err(|e| AppError::Validation(format!("Could not read request body: {e}")))?;

    let token = if is_json {
        serde_json::from_slice::<serde_json::Value>(&bytes)
            .ok()
            .and_then(|v| v.get(TOKEN_FIELD)?.as_str().map(str::to_string))
    } else {
        std::str::from_utf8(&bytes).ok().and_then(token_from_urlencoded)
    };

    Ok((Request::from_parts(parts, Body::from(bytes)), token))
}

fn token_from_headers(request: &Request) -> Option<String> {
    let headers = request.headers();
    if let Some(token) = headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok())
        && !token.is_empty()
    {
        return Some(token.to_string());
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn token_from_urlencoded(encoded: &str) -> Option<String> {
    url::form_urlencoded::parse(encoded.as_bytes())
        .find(|(k, _)| k == TOKEN_FIELD)
        .map(|(_, v)| v.into_owned())
        .filter(|t| !t.is_empty())
}
