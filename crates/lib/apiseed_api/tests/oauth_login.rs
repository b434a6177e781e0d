//! Facebook login flow against a stand-in provider.

mod common;

use std::sync::Arc;

use apiseed_api::router;
use apiseed_core::auth::AuthError;
use apiseed_core::auth::jwt::verify_token;
use apiseed_core::auth::oauth::OAuthProvider;
use apiseed_core::models::auth::ProviderProfile;
use async_trait::async_trait;
use axum::Router;
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use common::*;

struct FakeProvider;

#[async_trait]
impl OAuthProvider for FakeProvider {
    fn authorize_url(&self, state: &str) -> Result<String, AuthError> {
        Ok(format!("https://provider.test/dialog?state={state}"))
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderProfile, AuthError> {
        match code {
            "good" => Ok(ProviderProfile {
                external_id: "1001".into(),
                display_name: "Jane Doe".into(),
                access_token: "provider-token".into(),
            }),
            _ => Err(AuthError::OAuth("Invalid verification code".into())),
        }
    }
}

fn app_with_provider() -> Router {
    router(state().with_facebook(Arc::new(FakeProvider)))
}

/// Start the flow and return the issued state parameter.
async fn begin(app: &Router) -> String {
    let resp = send(app, empty_request("GET", "/users/facebook")).await;
    assert!(resp.status.is_redirection());
    let location = resp.headers[LOCATION].to_str().unwrap();
    let url = url::Url::parse(location).unwrap();
    assert_eq!(url.host_str(), Some("provider.test"));
    url.query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("state parameter")
}

async fn callback(app: &Router, state: &str, code: &str) -> TestResponse {
    let uri = format!("/users/facebook/callback?state={state}&code={code}");
    send(app, empty_request("GET", &uri)).await
}

#[tokio::test]
async fn callback_signs_in_and_reuses_the_identity() {
    let app = app_with_provider();

    let state = begin(&app).await;
    let resp = callback(&app, &state, "good").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], "Login successful!");
    assert!(resp.session_cookie().is_some());
    let first = verify_token(resp.json()["token"].as_str().unwrap(), b"test-secret").unwrap();
    assert_eq!(first.username, "Jane Doe");
    assert!(!first.admin);

    let state = begin(&app).await;
    let resp = callback(&app, &state, "good").await;
    let second = verify_token(resp.json()["token"].as_str().unwrap(), b"test-secret").unwrap();
    assert_eq!(first.sub, second.sub);
}

#[tokio::test]
async fn state_is_single_use() {
    let app = app_with_provider();
    let state = begin(&app).await;
    assert_eq!(callback(&app, &state, "good").await.status, StatusCode::OK);
    assert_eq!(
        callback(&app, &state, "good").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn unknown_state_and_bad_code_are_401() {
    let app = app_with_provider();
    assert_eq!(
        callback(&app, "forged", "good").await.status,
        StatusCode::UNAUTHORIZED
    );

    let state = begin(&app).await;
    let resp = callback(&app, &state, "bad").await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json()["success"], false);
}

#[tokio::test]
async fn provider_denial_is_401() {
    let app = app_with_provider();
    let state = begin(&app).await;
    let uri = format!("/users/facebook/callback?state={state}&error=access_denied");
    let resp = send(&app, empty_request("GET", &uri)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn facebook_routes_are_404_when_unconfigured() {
    let app = app();
    assert_eq!(
        send(&app, empty_request("GET", "/users/facebook")).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        callback(&app, "x", "good").await.status,
        StatusCode::NOT_FOUND
    );
}
