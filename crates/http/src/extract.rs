//! Request extractors that reject with [`AppError`] instead of axum's
//! plain-text rejections.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON body extractor.
///
/// Shape errors (missing or unknown fields, wrong types) become validation
/// errors; syntax and content-type problems become bad requests. Both are 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_to_error(rejection)),
        }
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(err) => AppError::validation(vec![], err.body_text()),
        other => AppError::bad_request(other.body_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::header::CONTENT_TYPE};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Payload {
        name: String,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn accepts_well_formed_json() {
        let JsonBody(payload) =
            JsonBody::<Payload>::from_request(request(Some("application/json"), r#"{"name":"x"}"#), &())
                .await
                .unwrap();
        assert_eq!(payload.name, "x");
    }

    #[tokio::test]
    async fn unknown_field_is_a_validation_error() {
        let err = JsonBody::<Payload>::from_request(
            request(Some("application/json"), r#"{"name":"x","extra":1}"#),
            &(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn syntax_error_is_a_bad_request() {
        let err = JsonBody::<Payload>::from_request(request(Some("application/json"), "{"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn missing_content_type_is_a_bad_request() {
        let err = JsonBody::<Payload>::from_request(request(None, r#"{"name":"x"}"#), &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest { .. }));
    }
}
