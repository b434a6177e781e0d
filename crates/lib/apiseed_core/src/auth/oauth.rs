//! OAuth identity federation.
//!
//! Provides the CSRF state store used between redirect and callback, the
//! Facebook provider client, and the bridge that maps a provider profile
//! onto a local identity.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use super::AuthError;
use crate::identity::IdentityStore;
use crate::models::auth::{Identity, NewIdentity, ProviderProfile};

/// TTL for pending state entries (10 minutes).
const STATE_TTL: Duration = Duration::from_secs(600);

/// Facebook Graph API version used for dialog and graph calls.
const FACEBOOK_API_VERSION: &str = "v19.0";

// =============================================================================
// State store
// =============================================================================

/// Generate a cryptographic state parameter (CSRF token).
pub fn generate_state() -> String {
    use base64::Engine;
    use rand::RngCore;

    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// In-memory store of issued state parameters.
pub struct OAuthStateStore {
    states: DashMap<String, Instant>,
}

impl OAuthStateStore {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }

    /// Issue and remember a fresh state parameter.
    pub fn issue(&self) -> String {
        let state = generate_state();
        self.states.insert(state.clone(), Instant::now());
        state
    }

    /// Consume a state parameter. Returns `false` if unknown or expired.
    pub fn take(&self, state: &str) -> bool {
        match self.states.remove(state) {
            Some((_, created_at)) => created_at.elapsed() <= STATE_TTL,
            None => false,
        }
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        self.states.retain(|_, created_at| created_at.elapsed() <= STATE_TTL);
    }
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Providers
// =============================================================================

/// An external identity provider using the authorization-code flow.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// URL the browser is redirected to in order to start the flow.
    fn authorize_url(&self, state: &str) -> Result<String, AuthError>;

    /// Exchange a callback `code` for the caller's profile.
    async fn exchange_code(&self, code: &str) -> Result<ProviderProfile, AuthError>;
}

/// Facebook application credentials.
#[derive(Debug, Clone)]
pub struct FacebookConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

/// Facebook Login via the Graph API.
pub struct FacebookProvider {
    config: FacebookConfig,
    client: reqwest::Client,
    dialog_base: String,
    graph_base: String,
}

#[derive(Debug, Deserialize)]
struct FacebookTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct FacebookProfile {
    id: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FacebookErrorEnvelope {
    error: FacebookError,
}

#[derive(Debug, Deserialize)]
struct FacebookError {
    message: String,
}

impl FacebookProvider {
    pub fn new(config: FacebookConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            dialog_base: format!("https://www.facebook.com/{FACEBOOK_API_VERSION}"),
            graph_base: format!("https://graph.facebook.com/{FACEBOOK_API_VERSION}"),
        }
    }

    /// Read a Graph API response, surfacing Facebook's error envelope.
    async fn read_json<T: for<'de> Deserialize<'de>>(
        resp: reqwest::Response,
        what: &str,
    ) -> Result<T, AuthError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| AuthError::OAuth(format!("{what}: {e}")))?;
        if !status.is_success() {
            let message = serde_json::from_str::<FacebookErrorEnvelope>(&body)
                .map(|env| env.error.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(AuthError::OAuth(format!("{what}: {message}")));
        }
        serde_json::from_str(&body).map_err(|e| AuthError::OAuth(format!("{what}: {e}")))
    }
}

#[async_trait]
impl OAuthProvider for FacebookProvider {
    fn authorize_url(&self, state: &str) -> Result<String, AuthError> {
        let mut url = Url::parse(&format!("{}/dialog/oauth", self.dialog_base))
            .map_err(|e| AuthError::Internal(format!("facebook dialog url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.callback_url)
            .append_pair("state", state);
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderProfile, AuthError> {
        let resp = self
            .client
            .get(format!("{}/oauth/access_token", self.graph_base))
            .query(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| AuthError::OAuth(format!("token exchange: {e}")))?;
        let token: FacebookTokenResponse = Self::read_json(resp, "token exchange").await?;

        let resp = self
            .client
            .get(format!("{}/me", self.graph_base))
            .query(&[
                ("fields", "id,name"),
                ("access_token", token.access_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::OAuth(format!("profile fetch: {e}")))?;
        let profile: FacebookProfile = Self::read_json(resp, "profile fetch").await?;

        debug!(external_id = %profile.id, "fetched facebook profile");
        Ok(ProviderProfile {
            display_name: profile.name.unwrap_or_else(|| profile.id.clone()),
            external_id: profile.id,
            access_token: token.access_token,
        })
    }
}

// =============================================================================
// Bridge
// =============================================================================

/// Resolve a provider profile to a local identity, creating one on first login.
///
/// New identities take the display name as username, or
/// `"{display name}-{external id}"` when that name is already taken. A lost
/// race against a concurrent first login for the same external ID resolves to
/// the identity the winner created.
pub async fn link_identity(
    store: &dyn IdentityStore,
    profile: &ProviderProfile,
) -> Result<Identity, AuthError> {
    if let Some(existing) = store.find_by_oauth_id(&profile.external_id).await? {
        store
            .update_oauth_token(existing.id, &profile.access_token)
            .await?;
        debug!(id = %existing.id, "matched existing oauth identity");
        return Ok(existing);
    }

    let candidates = [
        profile.display_name.clone(),
        format!("{}-{}", profile.display_name, profile.external_id),
    ];
    for username in candidates {
        let new = NewIdentity {
            username,
            oauth_id: Some(profile.external_id.clone()),
            oauth_token: Some(profile.access_token.clone()),
            ..Default::default()
        };
        match store.create(new).await {
            Ok(identity) => {
                info!(id = %identity.id, username = %identity.username, "created oauth identity");
                return Ok(identity);
            }
            Err(AuthError::UserExists(name)) => {
                if let Some(winner) = store.find_by_oauth_id(&profile.external_id).await? {
                    return Ok(winner);
                }
                warn!(username = %name, "oauth display name taken, trying fallback");
            }
            Err(e) => return Err(e),
        }
    }
    Err(AuthError::UserExists(profile.display_name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryIdentityStore;

    fn profile(id: &str, name: &str, token: &str) -> ProviderProfile {
        ProviderProfile {
            external_id: id.into(),
            display_name: name.into(),
            access_token: token.into(),
        }
    }

    #[tokio::test]
    async fn first_login_creates_passwordless_identity() {
        let store = MemoryIdentityStore::new();
        let identity = link_identity(&store, &profile("fb-1", "Jane Doe", "t1"))
            .await
            .unwrap();
        assert_eq!(identity.username, "Jane Doe");
        assert_eq!(identity.oauth_id.as_deref(), Some("fb-1"));
        assert!(!identity.has_password());
        assert!(!identity.admin);
    }

    #[tokio::test]
    async fn repeat_login_matches_and_refreshes_token() {
        let store = MemoryIdentityStore::new();
        let first = link_identity(&store, &profile("fb-1", "Jane", "t1"))
            .await
            .unwrap();
        let again = link_identity(&store, &profile("fb-1", "Jane Renamed", "t2"))
            .await
            .unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(store.list().await.unwrap().len(), 1);
        let stored = store.find_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(stored.oauth_token.as_deref(), Some("t2"));
    }

    #[tokio::test]
    async fn taken_display_name_falls_back() {
        let store = MemoryIdentityStore::new();
        store
            .create(NewIdentity {
                username: "Jane".into(),
                password_hash: Some("h".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let identity = link_identity(&store, &profile("fb-7", "Jane", "t"))
            .await
            .unwrap();
        assert_eq!(identity.username, "Jane-fb-7");
    }

    #[tokio::test]
    async fn concurrent_first_logins_yield_one_identity() {
        let store = std::sync::Arc::new(MemoryIdentityStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                link_identity(store.as_ref(), &profile("fb-race", "Racer", "t"))
                    .await
                    .unwrap()
                    .id
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[test]
    fn state_is_single_use() {
        let states = OAuthStateStore::new();
        let state = states.issue();
        assert!(states.take(&state));
        assert!(!states.take(&state));
        assert!(!states.take("never-issued"));
    }

    #[test]
    fn facebook_authorize_url_carries_client_and_state() {
        let provider = FacebookProvider::new(FacebookConfig {
            client_id: "app-id".into(),
            client_secret: "secret".into(),
            callback_url: "https://localhost:3443/users/facebook/callback".into(),
        });
        let url = Url::parse(&provider.authorize_url("xyz").unwrap()).unwrap();
        assert_eq!(url.host_str(), Some("www.facebook.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "app-id".into())));
        assert!(pairs.contains(&("state".into(), "xyz".into())));
        assert!(!pairs.iter().any(|(k, _)| k == "client_secret"));
    }
}
