use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};
use validator::ValidationErrors;

use crate::donations::status::DonationStatus;
use crate::response::ApiResponse;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("only the fund owner can do this")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("donation status cannot change from {from} to {to}")]
    InvalidTransition {
        from: DonationStatus,
        to: DonationStatus,
    },
    #[error("upload failed")]
    Upload(#[source] anyhow::Error),
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::Upload(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Keeps the message of the first failing field, fields ordered by name.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .into_iter()
            .min_by(|a, b| a.0.cmp(&b.0))
            .and_then(|(field, errs)| {
                errs.first().map(|e| match &e.message {
                    Some(m) => m.to_string(),
                    None => format!("\"{}\" is invalid", field),
                })
            })
            .unwrap_or_else(|| "invalid input".to_string());
        AppError::Validation(message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        let body = match &self {
            AppError::Upload(cause) | AppError::Internal(cause) => {
                error!(error = ?cause, %status, "request failed");
                ApiResponse::error(message)
            }
            AppError::Validation(_) => {
                warn!(%message, "validation failed");
                ApiResponse::error(message)
            }
            _ => {
                warn!(%status, %message, "request rejected");
                ApiResponse::failed(message)
            }
        };
        (status, Json(body)).into_response()
    }
}
