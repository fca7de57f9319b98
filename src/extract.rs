use axum::{
    async_trait,
    body::Bytes,
    extract::{
        path::ErrorKind, rejection::PathRejection, FromRequest, FromRequestParts, Path, Request,
    },
    http::{header, request::Parts},
};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::AppError;

/// JSON body whose decode failures surface as validation errors.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));
        if !is_json {
            return Err(AppError::Validation(
                "\"body\" must be application/json".into(),
            ));
        }

        let body = Bytes::from_request(req, state).await.map_err(|e| {
            warn!(error = %e, "unreadable request body");
            AppError::Validation("\"body\" could not be read".into())
        })?;

        serde_json::from_slice(&body)
            .map(ApiJson)
            .map_err(|e| AppError::Validation(json_message(&e)))
    }
}

/// serde_json appends the position; clients only get the message.
fn json_message(err: &serde_json::Error) -> String {
    if err.is_syntax() || err.is_eof() {
        return "\"body\" must be valid JSON".into();
    }
    let message = err.to_string();
    match message.rsplit_once(" at line ") {
        Some((head, _)) => head.to_string(),
        None => message,
    }
}

/// Path parameters; a segment that does not parse is a validation error.
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| ApiPath(value))
            .map_err(path_error)
    }
}

fn path_error(rejection: PathRejection) -> AppError {
    match rejection {
        PathRejection::FailedToDeserializePathParams(e) => match e.kind() {
            ErrorKind::ParseErrorAtKey { key, .. } => {
                AppError::Validation(format!("\"{}\" must be a number", key))
            }
            _ => AppError::Validation(format!("invalid path: {}", e.body_text())),
        },
        // route table and extractor disagree
        other => AppError::Internal(anyhow::anyhow!(other.body_text())),
    }
}
