//! API server configuration.

use apiseed_core::auth::jwt::resolve_jwt_secret;
use apiseed_core::auth::oauth::FacebookConfig;
use chrono::Duration;

/// Default access token lifetime (1 hour).
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Default session lifetime (14 days).
const DEFAULT_SESSION_TTL_SECS: i64 = 14 * 24 * 3600;

/// Default upload size limit (16 MiB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3000").
    pub bind_addr: String,
    /// PostgreSQL connection URL. `None` runs on in-memory stores.
    pub database_url: Option<String>,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Access token lifetime. `None` issues tokens without expiry.
    pub token_ttl: Option<Duration>,
    /// Session cookie lifetime.
    pub session_ttl: Duration,
    /// Scheme and host prefix for generated media URLs.
    pub public_host: String,
    /// Maximum accepted request body size for uploads.
    pub max_upload_bytes: usize,
    /// Facebook login credentials. `None` disables the Facebook routes.
    pub facebook: Option<FacebookConfig>,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                 | Default                                |
    /// |--------------------------|----------------------------------------|
    /// | `BIND_ADDR`              | `127.0.0.1:3000`                       |
    /// | `DATABASE_URL`           | unset (in-memory stores)               |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file      |
    /// | `TOKEN_TTL_SECS`         | `3600` (`0` = tokens never expire)     |
    /// | `SESSION_TTL_SECS`       | `1209600`                              |
    /// | `PUBLIC_HOST`            | `http://{BIND_ADDR}`                   |
    /// | `MAX_UPLOAD_BYTES`       | `16777216`                             |
    /// | `FACEBOOK_CLIENT_ID`, `FACEBOOK_CLIENT_SECRET`, `FACEBOOK_CALLBACK_URL` | unset |
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
        let token_ttl_secs = env_parse("TOKEN_TTL_SECS").unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        Self {
            public_host: std::env::var("PUBLIC_HOST")
                .unwrap_or_else(|_| format!("http://{bind_addr}")),
            bind_addr,
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            jwt_secret: resolve_jwt_secret(),
            token_ttl: (token_ttl_secs > 0).then(|| Duration::seconds(token_ttl_secs)),
            session_ttl: Duration::seconds(
                env_parse("SESSION_TTL_SECS").unwrap_or(DEFAULT_SESSION_TTL_SECS),
            ),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES").unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            facebook: facebook_from_env(),
        }
    }

    /// Configuration for tests: fixed secret, no Facebook, in-memory stores.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            database_url: None,
            jwt_secret: "test-secret".into(),
            token_ttl: Some(Duration::seconds(DEFAULT_TOKEN_TTL_SECS)),
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            public_host: "http://localhost:3000".into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            facebook: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn facebook_from_env() -> Option<FacebookConfig> {
    let client_id = std::env::var("FACEBOOK_CLIENT_ID").ok()?;
    let client_secret = std::env::var("FACEBOOK_CLIENT_SECRET").ok()?;
    let callback_url = std::env::var("FACEBOOK_CALLBACK_URL")
        .unwrap_or_else(|_| "https://localhost:3443/users/facebook/callback".into());
    Some(FacebookConfig {
        client_id,
        client_secret,
        callback_url,
    })
}
