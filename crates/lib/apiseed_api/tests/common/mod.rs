//! Shared helpers for router integration tests over in-memory stores.

#![allow(dead_code)]

use apiseed_api::config::ApiConfig;
use apiseed_api::{AppState, router};
use apiseed_core::store::Stores;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const MULTIPART_BOUNDARY: &str = "apiseed-test-boundary";

pub fn state() -> AppState {
    AppState::new(Stores::memory(), ApiConfig::for_tests())
}

pub fn app() -> Router {
    router(state())
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("response body is UTF-8")
    }

    /// Value of the session cookie set by this response, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.strip_prefix("apiseed_session="))
            .map(|v| v.split(';').next().unwrap_or("").to_string())
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

pub fn form_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

pub fn with_token(mut request: Request<Body>, token: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert("x-access-token", token.parse().expect("header value"));
    request
}

pub fn with_session(mut request: Request<Body>, session: &str) -> Request<Body> {
    request.headers_mut().insert(
        COOKIE,
        format!("apiseed_session={session}").parse().expect("header value"),
    );
    request
}

pub async fn register(app: &Router, username: &str, password: &str) -> TestResponse {
    send(
        app,
        json_request(
            "POST",
            "/users/register",
            json!({ "username": username, "password": password }),
        ),
    )
    .await
}

pub async fn login(app: &Router, username: &str, password: &str) -> TestResponse {
    send(
        app,
        json_request(
            "POST",
            "/users/login",
            json!({ "username": username, "password": password }),
        ),
    )
    .await
}

/// Register and log in, returning the access token.
pub async fn signup(app: &Router, username: &str) -> String {
    let resp = register(app, username, "secret").await;
    assert_eq!(resp.status, StatusCode::OK, "register {username}");
    let resp = login(app, username, "secret").await;
    assert_eq!(resp.status, StatusCode::OK, "login {username}");
    resp.json()["token"].as_str().expect("token").to_string()
}

/// A multipart body with one file part and some text parts.
pub fn multipart_request(
    uri: &str,
    file: Option<(&str, &str, &[u8])>,
    fields: &[(&str, &str)],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, data)) = file {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"mediaFile\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("build request")
}
