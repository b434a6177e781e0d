//! JWT token generation and verification.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::info;

use super::AuthError;
use crate::models::auth::{Identity, TokenClaims};

/// Build the claims for an identity. `ttl` of `None` yields a token without `exp`.
pub fn claims_for(identity: &Identity, ttl: Option<Duration>) -> TokenClaims {
    let now = Utc::now();
    TokenClaims {
        sub: identity.id.to_string(),
        username: identity.username.clone(),
        admin: identity.admin,
        iat: now.timestamp(),
        exp: ttl.map(|ttl| (now + ttl).timestamp()),
    }
}

/// Sign claims with HS256. Identical claims and secret give identical tokens.
pub fn encode_claims(claims: &TokenClaims, secret: &[u8]) -> Result<String, AuthError> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret))
        .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
}

/// Issue a signed access token for an identity.
pub fn issue_token(
    identity: &Identity,
    secret: &[u8],
    ttl: Option<Duration>,
) -> Result<String, AuthError> {
    encode_claims(&claims_for(identity, ttl), secret)
}

/// Verify an access token, returning its claims.
///
/// A token shaped as `header.payload.signature` that fails to verify or
/// decode, in any segment, is `InvalidToken`. Input without that shape is
/// `MalformedToken`. `exp` is only enforced when the token carries one.
pub fn verify_token(token: &str, secret: &[u8]) -> Result<TokenClaims, AuthError> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::default();
    validation.required_spec_claims = HashSet::new();
    validation.validate_exp = true;
    decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            if has_jwt_shape(token) {
                AuthError::InvalidToken(e.to_string())
            } else {
                AuthError::MalformedToken(e.to_string())
            }
        })
}

/// Three non-empty dot-separated segments.
fn has_jwt_shape(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("AUTH_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("apiseed")
        .join("jwt-secret")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uuid::uuidv7;

    const SECRET: &[u8] = b"test-secret";

    fn identity(admin: bool) -> Identity {
        Identity {
            id: uuidv7(),
            username: "alice".into(),
            password_hash: None,
            admin,
            oauth_id: None,
            oauth_token: None,
            firstname: None,
            lastname: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_decodes_to_same_identity() {
        let id = identity(true);
        let token = issue_token(&id, SECRET, Some(Duration::hours(1))).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.identity_id(), Some(id.id));
        assert_eq!(claims.username, "alice");
        assert!(claims.admin);
        assert!(claims.exp.is_some());
    }

    #[test]
    fn token_without_expiry_is_accepted() {
        let id = identity(false);
        let token = issue_token(&id, SECRET, None).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.exp, None);
        assert!(!claims.admin);
    }

    #[test]
    fn signing_is_deterministic() {
        let claims = claims_for(&identity(false), None);
        assert_eq!(
            encode_claims(&claims, SECRET).unwrap(),
            encode_claims(&claims, SECRET).unwrap()
        );
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = issue_token(&identity(false), SECRET, None).unwrap();
        let err = verify_token(&token, b"other-secret").unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)), "{err:?}");
    }

    #[test]
    fn expired_token_is_invalid() {
        let mut claims = claims_for(&identity(false), None);
        claims.exp = Some(Utc::now().timestamp() - 3600);
        let token = encode_claims(&claims, SECRET).unwrap();
        let err = verify_token(&token, SECRET).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)), "{err:?}");
    }

    #[test]
    fn tampering_any_byte_is_invalid() {
        let token = issue_token(&identity(false), SECRET, None).unwrap();
        for pos in 0..token.len() {
            let original = token.as_bytes()[pos];
            if original == b'.' {
                continue;
            }
            let replacement = if original == b'A' { b'B' } else { b'A' };
            let mut bytes = token.clone().into_bytes();
            bytes[pos] = replacement;
            let tampered = String::from_utf8(bytes).unwrap();
            let err = verify_token(&tampered, SECRET).unwrap_err();
            assert!(
                matches!(err, AuthError::InvalidToken(_)),
                "byte {pos}: {err:?}"
            );
        }
    }

    #[test]
    fn garbage_is_malformed() {
        for garbage in ["not-a-jwt", "a.b", "a..c", "a.b.c.d", ""] {
            let err = verify_token(garbage, SECRET).unwrap_err();
            assert!(matches!(err, AuthError::MalformedToken(_)), "{garbage}: {err:?}");
        }
    }
}
