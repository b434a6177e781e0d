//! Request body extractor accepting JSON or urlencoded forms.

use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Body deserialized from `application/json` or
/// `application/x-www-form-urlencoded`. Rejections become JSON [`AppError`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Payload<T>(pub T);

fn is_form(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            ct.to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        })
}

impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(&req) {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            Ok(Payload(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            Ok(Payload(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Pair {
        a: String,
        b: Option<i64>,
    }

    fn request(content_type: Option<&str>, body: &str) -> Request {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn reads_json_and_forms() {
        let Payload(json) = Payload::<Pair>::from_request(
            request(Some("application/json"), r#"{"a":"x","b":3}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!((json.a.as_str(), json.b), ("x", Some(3)));

        let Payload(form) = Payload::<Pair>::from_request(
            request(
                Some("application/x-www-form-urlencoded; charset=utf-8"),
                "a=y%20z&b=4",
            ),
            &(),
        )
        .await
        .unwrap();
        assert_eq!((form.a.as_str(), form.b), ("y z", Some(4)));
    }

    #[tokio::test]
    async fn rejections_are_validation_errors() {
        let err = Payload::<Pair>::from_request(request(Some("application/json"), "{}"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = Payload::<Pair>::from_request(request(None, "a=1"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
