//! Authentication service: register/login/logout flows delegating to
//! `apiseed_core::auth`.

use apiseed_core::auth::AuthError;
use apiseed_core::auth::credentials::{self, Registration};
use apiseed_core::auth::jwt::issue_token;
use apiseed_core::auth::oauth::link_identity;
use apiseed_core::auth::sessions::{create_session, destroy_session};
use apiseed_core::models::auth::{Identity, ProviderProfile};
use apiseed_core::store::Stores;
use tracing::{debug, info};
use uuid::Uuid;

use crate::AppState;
use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};
use crate::models::{LoginRequest, RegisterRequest};

/// A freshly authenticated identity with its access token and session ID.
#[derive(Debug)]
pub struct SignedIn {
    pub identity: Identity,
    pub token: String,
    pub session_id: String,
}

/// Issue a token and open a session for an identity.
async fn sign_in(stores: &Stores, config: &ApiConfig, identity: Identity) -> AppResult<SignedIn> {
    let token = issue_token(&identity, config.jwt_secret.as_bytes(), config.token_ttl)?;
    let session_id = create_session(stores.sessions.as_ref(), identity.id, config.session_ttl).await?;
    Ok(SignedIn {
        identity,
        token,
        session_id,
    })
}

/// Register a new account and sign it in. The first account is an administrator.
pub async fn register(
    stores: &Stores,
    config: &ApiConfig,
    body: &RegisterRequest,
) -> AppResult<SignedIn> {
    let identity = credentials::register(
        stores.identities.as_ref(),
        Registration {
            username: &body.username,
            password: &body.password,
            firstname: body.firstname.as_deref(),
            lastname: body.lastname.as_deref(),
        },
    )
    .await?;
    sign_in(stores, config, identity).await
}

/// Authenticate with username + password.
///
/// Unknown usernames and wrong passwords get the same 401 response.
pub async fn login(stores: &Stores, config: &ApiConfig, body: &LoginRequest) -> AppResult<SignedIn> {
    let identity =
        match credentials::verify_password(stores.identities.as_ref(), &body.username, &body.password)
            .await
        {
            Ok(identity) => identity,
            Err(AuthError::NotFound | AuthError::InvalidCredentials) => {
                return Err(AppError::Unauthorized(
                    "Password or username are incorrect".into(),
                ));
            }
            Err(e) => return Err(e.into()),
        };
    info!(id = %identity.id, username = %identity.username, "user logged in");
    sign_in(stores, config, identity).await
}

/// Sign in through an OAuth provider profile, creating the identity on first login.
pub async fn oauth_login(
    stores: &Stores,
    config: &ApiConfig,
    profile: &ProviderProfile,
) -> AppResult<SignedIn> {
    let identity = link_identity(stores.identities.as_ref(), profile).await?;
    info!(id = %identity.id, username = %identity.username, "oauth login");
    sign_in(stores, config, identity).await
}

/// End a session. A missing or unknown session is not an error.
pub async fn logout(stores: &Stores, session_id: Option<&str>) -> AppResult<()> {
    if let Some(session_id) = session_id {
        destroy_session(stores.sessions.as_ref(), session_id).await?;
    }
    Ok(())
}

/// All identities, in creation order.
pub async fn list_users(stores: &Stores) -> AppResult<Vec<Identity>> {
    Ok(stores.identities.list().await?)
}

/// Delete an identity and end all of its sessions.
pub async fn delete_user(stores: &Stores, id: Uuid) -> AppResult<()> {
    if !stores.identities.delete(id).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    stores.sessions.remove_for_user(id).await?;
    info!(id = %id, "user deleted");
    Ok(())
}

/// Drop expired sessions and stale OAuth states. Returns the number of
/// sessions removed.
pub async fn purge_expired(state: &AppState) -> AppResult<u64> {
    state.oauth_states.cleanup();
    let removed = state.stores.sessions.purge_expired().await?;
    if removed > 0 {
        debug!(removed, "purged expired sessions");
    }
    Ok(removed)
}
