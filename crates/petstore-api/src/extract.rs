//! Request extractors

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON body that has been deserialized and passed its `validator` rules
///
/// Both malformed JSON and rule violations are rejected with 400 `BAD_REQUEST`
/// before the handler runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| AppError::BadRequest(rejection.body_text()))?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Path parameters whose rejection is a JSON 400 like every other error
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string whose rejection is a JSON 400 like every other error
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::post, Router};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, Validate)]
    struct Payload {
        #[validate(length(min = 3, message = "name is too short"))]
        name: String,
    }

    async fn handler(ValidatedJson(payload): ValidatedJson<Payload>) -> impl IntoResponse {
        payload.name
    }

    async fn call(body: &'static str) -> (StatusCode, String) {
        let app = Router::new().route("/", post(handler));
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("Content-Type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let (status, body) = call(r#"{"name":"rex"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "rex");
    }

    #[tokio::test]
    async fn test_rule_violation_is_bad_request() {
        let (status, body) = call(r#"{"name":"x"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("BAD_REQUEST"));
        assert!(body.contains("name is too short"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (status, body) = call("{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("BAD_REQUEST"));
    }
}
