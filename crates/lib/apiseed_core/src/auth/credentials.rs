//! Username/password registration and verification.

use tracing::{debug, info};

use super::AuthError;
use super::password::{hash_password, verify_password as verify_hash};
use crate::identity::IdentityStore;
use crate::models::auth::{Identity, NewIdentity};

/// Registration input.
#[derive(Debug, Clone, Default)]
pub struct Registration<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub firstname: Option<&'a str>,
    pub lastname: Option<&'a str>,
}

/// Register a new password identity. The first identity ever registered is
/// made an administrator.
///
/// A taken username fails with [`AuthError::UserExists`] and leaves the
/// existing identity untouched.
pub async fn register(
    store: &dyn IdentityStore,
    registration: Registration<'_>,
) -> Result<Identity, AuthError> {
    if registration.username.trim().is_empty() {
        return Err(AuthError::ValidationError("No username was given".into()));
    }
    if registration.password.is_empty() {
        return Err(AuthError::ValidationError("No password was given".into()));
    }
    if store.find_by_username(registration.username).await?.is_some() {
        return Err(AuthError::UserExists(registration.username.to_string()));
    }

    let password_hash = hash_password(registration.password)?;

    let identity = store
        .create(NewIdentity {
            username: registration.username.to_string(),
            password_hash: Some(password_hash),
            admin_if_first: true,
            oauth_id: None,
            oauth_token: None,
            firstname: non_empty(registration.firstname),
            lastname: non_empty(registration.lastname),
        })
        .await?;

    if identity.admin {
        info!(username = %identity.username, "first user granted admin role");
    }
    info!(id = %identity.id, username = %identity.username, "registered user");
    Ok(identity)
}

/// Verify a username/password pair.
///
/// Unknown usernames are `NotFound`; a wrong password, or an identity without
/// a local password, is `InvalidCredentials`.
pub async fn verify_password(
    store: &dyn IdentityStore,
    username: &str,
    password: &str,
) -> Result<Identity, AuthError> {
    let identity = store
        .find_by_username(username)
        .await?
        .ok_or(AuthError::NotFound)?;

    let Some(hash) = identity.password_hash.as_deref() else {
        debug!(username, "password login attempted for OAuth-only identity");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_hash(password, hash)? {
        return Err(AuthError::InvalidCredentials);
    }
    Ok(identity)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::identity::MemoryIdentityStore;

    fn reg<'a>(username: &'a str, password: &'a str) -> Registration<'a> {
        Registration {
            username,
            password,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn first_user_is_admin_later_users_are_not() {
        let store = MemoryIdentityStore::new();
        let first = register(&store, reg("root", "pw")).await.unwrap();
        let second = register(&store, reg("user", "pw")).await.unwrap();
        assert!(first.admin);
        assert!(!second.admin);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_registrations_yield_one_admin() {
        let store = Arc::new(MemoryIdentityStore::new());
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let name = format!("user{i}");
                    register(&*store, reg(&name, "pw")).await.unwrap()
                })
            })
            .collect();

        let mut admins = 0;
        for handle in handles {
            if handle.await.unwrap().admin {
                admins += 1;
            }
        }
        assert_eq!(admins, 1);
    }

    #[tokio::test]
    async fn profile_fields_are_stored() {
        let store = MemoryIdentityStore::new();
        let id = register(
            &store,
            Registration {
                username: "ada",
                password: "pw",
                firstname: Some("Ada"),
                lastname: Some(""),
            },
        )
        .await
        .unwrap();
        assert_eq!(id.firstname.as_deref(), Some("Ada"));
        assert_eq!(id.lastname, None);
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_original() {
        let store = MemoryIdentityStore::new();
        let original = register(&store, reg("bob", "first")).await.unwrap();
        let err = register(&store, reg("bob", "second")).await.unwrap_err();
        assert!(matches!(err, AuthError::UserExists(_)));

        let verified = verify_password(&store, "bob", "first").await.unwrap();
        assert_eq!(verified.id, original.id);
        assert!(matches!(
            verify_password(&store, "bob", "second").await.unwrap_err(),
            AuthError::InvalidCredentials
        ));
    }

    #[tokio::test]
    async fn empty_inputs_are_rejected() {
        let store = MemoryIdentityStore::new();
        assert!(matches!(
            register(&store, reg("", "pw")).await.unwrap_err(),
            AuthError::ValidationError(_)
        ));
        assert!(matches!(
            register(&store, reg("x", "")).await.unwrap_err(),
            AuthError::ValidationError(_)
        ));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let store = MemoryIdentityStore::new();
        assert!(matches!(
            verify_password(&store, "ghost", "pw").await.unwrap_err(),
            AuthError::NotFound
        ));
    }

    #[tokio::test]
    async fn oauth_only_identity_cannot_password_login() {
        let store = MemoryIdentityStore::new();
        store
            .create(NewIdentity {
                username: "fb user".into(),
                oauth_id: Some("fb-9".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(matches!(
            verify_password(&store, "fb user", "").await.unwrap_err(),
            AuthError::InvalidCredentials
        ));
    }
}
